// 🪪 Register identity - the person records a query is matched against
//
// Identity: dss_id (stable external identifier, never changes)
// Values: names, transliterations, gender, birth date parts, place

use serde::{Deserialize, Serialize};

// ============================================================================
// FIELDS
// ============================================================================

/// How a field is compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    /// Personal names and their transliterations - approximate
    Name,
    /// Gender - exact, case-insensitive
    Categorical,
    /// Day / month / year - exact integer equality
    DatePart,
    /// Village / sub-village - approximate
    Place,
}

/// The twelve comparable attributes, in canonical order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    FirstName,
    MiddleName,
    LastName,
    TlFirstName,
    TlMiddleName,
    TlLastName,
    Gender,
    BirthDay,
    BirthMonth,
    BirthYear,
    Village,
    SubVillage,
}

impl Field {
    pub const ALL: [Field; 12] = [
        Field::FirstName,
        Field::MiddleName,
        Field::LastName,
        Field::TlFirstName,
        Field::TlMiddleName,
        Field::TlLastName,
        Field::Gender,
        Field::BirthDay,
        Field::BirthMonth,
        Field::BirthYear,
        Field::Village,
        Field::SubVillage,
    ];

    pub fn kind(&self) -> FieldKind {
        match self {
            Field::FirstName
            | Field::MiddleName
            | Field::LastName
            | Field::TlFirstName
            | Field::TlMiddleName
            | Field::TlLastName => FieldKind::Name,
            Field::Gender => FieldKind::Categorical,
            Field::BirthDay | Field::BirthMonth | Field::BirthYear => FieldKind::DatePart,
            Field::Village | Field::SubVillage => FieldKind::Place,
        }
    }

    /// Name-type fields feed `name_score`
    pub fn is_name(&self) -> bool {
        self.kind() == FieldKind::Name
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::FirstName => "first_name",
            Field::MiddleName => "middle_name",
            Field::LastName => "last_name",
            Field::TlFirstName => "tl_first_name",
            Field::TlMiddleName => "tl_middle_name",
            Field::TlLastName => "tl_last_name",
            Field::Gender => "gender",
            Field::BirthDay => "birth_day",
            Field::BirthMonth => "birth_month",
            Field::BirthYear => "birth_year",
            Field::Village => "village",
            Field::SubVillage => "sub_village",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A present value of one field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Number(i32),
}

/// Blank strings are treated as absent
pub(crate) fn text_value(value: &Option<String>) -> Option<FieldValue<'_>> {
    value
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(FieldValue::Text)
}

// ============================================================================
// REGISTER IDENTITY
// ============================================================================

/// One identity in the population register. Immutable once ingested.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegisterIdentity {
    pub dss_id: String,

    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub middle_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,

    /// Transliterated variants
    #[serde(default)]
    pub tl_first_name: Option<String>,
    #[serde(default)]
    pub tl_middle_name: Option<String>,
    #[serde(default)]
    pub tl_last_name: Option<String>,

    #[serde(default)]
    pub gender: Option<String>,

    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub birth_day: Option<i32>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub birth_month: Option<i32>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub birth_year: Option<i32>,

    #[serde(default)]
    pub village: Option<String>,
    #[serde(default)]
    pub sub_village: Option<String>,
}

impl RegisterIdentity {
    pub fn new(dss_id: impl Into<String>) -> Self {
        RegisterIdentity {
            dss_id: dss_id.into(),
            ..Default::default()
        }
    }

    /// Value of `field`, or `None` if absent or blank
    pub fn value(&self, field: Field) -> Option<FieldValue<'_>> {
        match field {
            Field::FirstName => text_value(&self.first_name),
            Field::MiddleName => text_value(&self.middle_name),
            Field::LastName => text_value(&self.last_name),
            Field::TlFirstName => text_value(&self.tl_first_name),
            Field::TlMiddleName => text_value(&self.tl_middle_name),
            Field::TlLastName => text_value(&self.tl_last_name),
            Field::Gender => text_value(&self.gender),
            Field::BirthDay => self.birth_day.map(FieldValue::Number),
            Field::BirthMonth => self.birth_month.map(FieldValue::Number),
            Field::BirthYear => self.birth_year.map(FieldValue::Number),
            Field::Village => text_value(&self.village),
            Field::SubVillage => text_value(&self.sub_village),
        }
    }

    /// "village / sub-village", skipping absent parts
    pub fn location(&self) -> Option<String> {
        let parts: Vec<&str> = [&self.village, &self.sub_village]
            .iter()
            .filter_map(|p| p.as_deref())
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" / "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_kinds() {
        let names: Vec<Field> = Field::ALL.iter().copied().filter(Field::is_name).collect();
        assert_eq!(names.len(), 6);
        assert_eq!(Field::Gender.kind(), FieldKind::Categorical);
        assert_eq!(Field::BirthYear.kind(), FieldKind::DatePart);
        assert_eq!(Field::SubVillage.kind(), FieldKind::Place);
    }

    #[test]
    fn test_blank_values_are_absent() {
        let mut identity = RegisterIdentity::new("DSS-1");
        identity.first_name = Some("   ".to_string());
        identity.last_name = Some("Mwangi".to_string());
        identity.birth_year = Some(1985);

        assert_eq!(identity.value(Field::FirstName), None);
        assert_eq!(identity.value(Field::LastName), Some(FieldValue::Text("Mwangi")));
        assert_eq!(identity.value(Field::BirthYear), Some(FieldValue::Number(1985)));
        assert_eq!(identity.value(Field::BirthDay), None);
    }

    #[test]
    fn test_location() {
        let mut identity = RegisterIdentity::new("DSS-1");
        assert_eq!(identity.location(), None);

        identity.village = Some("Kisesa".to_string());
        assert_eq!(identity.location().as_deref(), Some("Kisesa"));

        identity.sub_village = Some("Igekemaja".to_string());
        assert_eq!(identity.location().as_deref(), Some("Kisesa / Igekemaja"));

        identity.village = Some("".to_string());
        assert_eq!(identity.location().as_deref(), Some("Igekemaja"));
    }
}
