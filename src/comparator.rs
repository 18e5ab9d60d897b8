// ⚖️ Field Comparator - pairwise similarity per attribute type
//
// Every comparator is a pure function over two optional values:
// - either side absent → None (field is simply not counted)
// - otherwise → similarity in [0, 1]

use crate::identity::{FieldKind, FieldValue};

// ============================================================================
// COMPARATOR TRAIT
// ============================================================================

pub trait FieldComparator: Send + Sync {
    fn compare(&self, query: Option<FieldValue<'_>>, candidate: Option<FieldValue<'_>>)
        -> Option<f64>;
}

/// Approximate comparison for personal names (and transliterations)
#[derive(Debug, Clone, Copy, Default)]
pub struct NameComparator;

/// Exact, case-insensitive comparison (gender)
#[derive(Debug, Clone, Copy, Default)]
pub struct CategoricalComparator;

/// Exact integer equality (day / month / year)
#[derive(Debug, Clone, Copy, Default)]
pub struct DatePartComparator;

/// Approximate comparison for village and sub-village
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceComparator;

impl FieldComparator for NameComparator {
    fn compare(
        &self,
        query: Option<FieldValue<'_>>,
        candidate: Option<FieldValue<'_>>,
    ) -> Option<f64> {
        let (a, b) = both_text(query, candidate)?;
        text_similarity(a, b)
    }
}

impl FieldComparator for PlaceComparator {
    fn compare(
        &self,
        query: Option<FieldValue<'_>>,
        candidate: Option<FieldValue<'_>>,
    ) -> Option<f64> {
        let (a, b) = both_text(query, candidate)?;
        text_similarity(a, b)
    }
}

impl FieldComparator for CategoricalComparator {
    fn compare(
        &self,
        query: Option<FieldValue<'_>>,
        candidate: Option<FieldValue<'_>>,
    ) -> Option<f64> {
        let (a, b) = both_text(query, candidate)?;
        let a = a.trim();
        let b = b.trim();
        if a.is_empty() || b.is_empty() {
            return None;
        }
        Some(if a.to_lowercase() == b.to_lowercase() { 1.0 } else { 0.0 })
    }
}

impl FieldComparator for DatePartComparator {
    fn compare(
        &self,
        query: Option<FieldValue<'_>>,
        candidate: Option<FieldValue<'_>>,
    ) -> Option<f64> {
        match (query?, candidate?) {
            (FieldValue::Number(a), FieldValue::Number(b)) => {
                Some(if a == b { 1.0 } else { 0.0 })
            }
            _ => None,
        }
    }
}

/// Comparator for a field kind
pub fn comparator_for(kind: FieldKind) -> &'static dyn FieldComparator {
    match kind {
        FieldKind::Name => &NameComparator,
        FieldKind::Categorical => &CategoricalComparator,
        FieldKind::DatePart => &DatePartComparator,
        FieldKind::Place => &PlaceComparator,
    }
}

pub fn compare(
    kind: FieldKind,
    query: Option<FieldValue<'_>>,
    candidate: Option<FieldValue<'_>>,
) -> Option<f64> {
    comparator_for(kind).compare(query, candidate)
}

/// Would this value survive the comparator's own normalization?
/// Punctuation-only names and places normalize to nothing and are never compared.
pub fn has_comparable_value(kind: FieldKind, value: FieldValue<'_>) -> bool {
    match (kind, value) {
        (FieldKind::Name | FieldKind::Place, FieldValue::Text(s)) => {
            !normalize_text(s).is_empty()
        }
        (FieldKind::Categorical, FieldValue::Text(s)) => !s.trim().is_empty(),
        (FieldKind::DatePart, FieldValue::Number(_)) => true,
        _ => false,
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn both_text<'a>(
    query: Option<FieldValue<'a>>,
    candidate: Option<FieldValue<'a>>,
) -> Option<(&'a str, &'a str)> {
    match (query?, candidate?) {
        (FieldValue::Text(a), FieldValue::Text(b)) => Some((a, b)),
        _ => None,
    }
}

/// Normalize free text for approximate matching
///
/// - Lowercase
/// - Punctuation becomes whitespace ("Mwangi-Otieno" → "mwangi otieno")
/// - Whitespace collapsed and trimmed
pub fn normalize_text(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalized Damerau-Levenshtein over the normalized forms.
/// Adjacent transpositions cost one edit; the measure is symmetric.
fn text_similarity(a: &str, b: &str) -> Option<f64> {
    let a = normalize_text(a);
    let b = normalize_text(b);

    if a.is_empty() || b.is_empty() {
        return None;
    }
    if a == b {
        return Some(1.0);
    }

    Some(strsim::normalized_damerau_levenshtein(&a, &b).clamp(0.0, 1.0))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Option<FieldValue<'_>> {
        Some(FieldValue::Text(s))
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  MWANGI  "), "mwangi");
        assert_eq!(normalize_text("Mwangi-Otieno"), "mwangi otieno");
        assert_eq!(normalize_text("Ng'ombe   Juma"), "ng ombe juma");
    }

    #[test]
    fn test_name_exact_ignores_case_and_whitespace() {
        assert_eq!(NameComparator.compare(text("Mwangi"), text("  mwangi ")), Some(1.0));
    }

    #[test]
    fn test_name_near_miss() {
        let sim = NameComparator.compare(text("Mwangi"), text("Mwang")).unwrap();
        assert!(sim < 1.0);
        assert!(sim > 0.7);
    }

    #[test]
    fn test_name_transposition_tolerant() {
        let swapped = NameComparator.compare(text("Amina"), text("Aimna")).unwrap();
        let substituted = NameComparator.compare(text("Amina"), text("Axyna")).unwrap();
        assert!(swapped > substituted);
    }

    #[test]
    fn test_name_dissimilar_near_zero() {
        let sim = NameComparator.compare(text("abc"), text("xyz")).unwrap();
        assert!(sim < 0.01);
    }

    #[test]
    fn test_name_symmetric() {
        let pairs = [("Mwangi", "Mwang"), ("Juma", "Jumanne"), ("Halima", "Salima")];
        for (a, b) in pairs {
            assert_eq!(
                NameComparator.compare(text(a), text(b)),
                NameComparator.compare(text(b), text(a))
            );
        }
    }

    #[test]
    fn test_absent_values_not_compared() {
        assert_eq!(NameComparator.compare(None, text("Mwangi")), None);
        assert_eq!(NameComparator.compare(text("Mwangi"), None), None);
        assert_eq!(NameComparator.compare(text("--"), text("Mwangi")), None);
        assert_eq!(DatePartComparator.compare(Some(FieldValue::Number(3)), None), None);
    }

    #[test]
    fn test_categorical_exact_only() {
        assert_eq!(CategoricalComparator.compare(text("F"), text("f")), Some(1.0));
        assert_eq!(CategoricalComparator.compare(text("F"), text("M")), Some(0.0));
        assert_eq!(CategoricalComparator.compare(text("Female"), text("Femal")), Some(0.0));
    }

    #[test]
    fn test_date_part_equality() {
        let n = |v| Some(FieldValue::Number(v));
        assert_eq!(DatePartComparator.compare(n(1990), n(1990)), Some(1.0));
        assert_eq!(DatePartComparator.compare(n(1990), n(1991)), Some(0.0));
    }

    #[test]
    fn test_place_independent_of_names() {
        assert_eq!(PlaceComparator.compare(text("Kisesa"), text("KISESA")), Some(1.0));
        let sim = compare(FieldKind::Place, text("Kisesa"), text("Kisessa")).unwrap();
        assert!(sim > 0.8 && sim < 1.0);
    }
}
