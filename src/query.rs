// 🔎 Match query - a partially specified identity with per-field toggles

use crate::comparator::has_comparable_value;
use crate::identity::{text_value, Field, FieldValue};
use crate::validation::{ValidationResult, Validator};
use serde::{Deserialize, Deserializer, Serialize};

/// Transient per-request query. A field takes part in scoring only when its
/// `use_*` flag is set AND the query carries a non-blank value for it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchQuery {
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub tl_first_name: Option<String>,
    pub tl_middle_name: Option<String>,
    pub tl_last_name: Option<String>,
    pub gender: Option<String>,
    #[serde(deserialize_with = "lenient_int")]
    pub birth_day: Option<i32>,
    #[serde(deserialize_with = "lenient_int")]
    pub birth_month: Option<i32>,
    #[serde(deserialize_with = "lenient_int")]
    pub birth_year: Option<i32>,
    pub village: Option<String>,
    pub sub_village: Option<String>,

    pub use_first_name: bool,
    pub use_middle_name: bool,
    pub use_last_name: bool,
    pub use_tl_first_name: bool,
    pub use_tl_middle_name: bool,
    pub use_tl_last_name: bool,
    pub use_gender: bool,
    pub use_birth_day: bool,
    pub use_birth_month: bool,
    pub use_birth_year: bool,
    pub use_village: bool,
    pub use_sub_village: bool,
}

impl MatchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a text field and enable it
    pub fn with_text(mut self, field: Field, value: &str) -> Self {
        match self.text_slot(field) {
            Some(slot) => *slot = Some(value.to_string()),
            None => return self,
        }
        self.set_enabled(field, true);
        self
    }

    /// Set a date-part field and enable it
    pub fn with_number(mut self, field: Field, value: i32) -> Self {
        match field {
            Field::BirthDay => self.birth_day = Some(value),
            Field::BirthMonth => self.birth_month = Some(value),
            Field::BirthYear => self.birth_year = Some(value),
            _ => return self,
        }
        self.set_enabled(field, true);
        self
    }

    fn text_slot(&mut self, field: Field) -> Option<&mut Option<String>> {
        match field {
            Field::FirstName => Some(&mut self.first_name),
            Field::MiddleName => Some(&mut self.middle_name),
            Field::LastName => Some(&mut self.last_name),
            Field::TlFirstName => Some(&mut self.tl_first_name),
            Field::TlMiddleName => Some(&mut self.tl_middle_name),
            Field::TlLastName => Some(&mut self.tl_last_name),
            Field::Gender => Some(&mut self.gender),
            Field::Village => Some(&mut self.village),
            Field::SubVillage => Some(&mut self.sub_village),
            Field::BirthDay | Field::BirthMonth | Field::BirthYear => None,
        }
    }

    pub fn set_enabled(&mut self, field: Field, enabled: bool) {
        let flag = match field {
            Field::FirstName => &mut self.use_first_name,
            Field::MiddleName => &mut self.use_middle_name,
            Field::LastName => &mut self.use_last_name,
            Field::TlFirstName => &mut self.use_tl_first_name,
            Field::TlMiddleName => &mut self.use_tl_middle_name,
            Field::TlLastName => &mut self.use_tl_last_name,
            Field::Gender => &mut self.use_gender,
            Field::BirthDay => &mut self.use_birth_day,
            Field::BirthMonth => &mut self.use_birth_month,
            Field::BirthYear => &mut self.use_birth_year,
            Field::Village => &mut self.use_village,
            Field::SubVillage => &mut self.use_sub_village,
        };
        *flag = enabled;
    }

    pub fn is_enabled(&self, field: Field) -> bool {
        match field {
            Field::FirstName => self.use_first_name,
            Field::MiddleName => self.use_middle_name,
            Field::LastName => self.use_last_name,
            Field::TlFirstName => self.use_tl_first_name,
            Field::TlMiddleName => self.use_tl_middle_name,
            Field::TlLastName => self.use_tl_last_name,
            Field::Gender => self.use_gender,
            Field::BirthDay => self.use_birth_day,
            Field::BirthMonth => self.use_birth_month,
            Field::BirthYear => self.use_birth_year,
            Field::Village => self.use_village,
            Field::SubVillage => self.use_sub_village,
        }
    }

    /// Query value regardless of the toggle. Blank strings, and names or places
    /// with nothing left after normalization, are absent.
    pub fn value(&self, field: Field) -> Option<FieldValue<'_>> {
        let value = match field {
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
        };
        value.filter(|v| has_comparable_value(field.kind(), *v))
    }

    /// Value only if the field is switched on
    pub fn active_value(&self, field: Field) -> Option<FieldValue<'_>> {
        if self.is_enabled(field) {
            self.value(field)
        } else {
            None
        }
    }

    /// Fields that are both enabled and present, in canonical order
    pub fn usable_fields(&self) -> Vec<Field> {
        Field::ALL
            .iter()
            .copied()
            .filter(|f| self.active_value(*f).is_some())
            .collect()
    }

    /// Stable label of the fields used, e.g. `first_name+last_name+gender`
    pub fn criteria_label(&self) -> String {
        self.usable_fields()
            .iter()
            .map(Field::as_str)
            .collect::<Vec<_>>()
            .join("+")
    }

    /// A query needs at least one usable field; "nothing enabled" never means "match everything"
    pub fn validate(&self) -> ValidationResult {
        let mut v = Validator::new("MatchQuery");

        if self.usable_fields().is_empty() {
            v.fail(
                "use_*",
                "At least one field must be enabled and carry a value",
            );
        }

        if let Some(day) = self.birth_day.filter(|_| self.use_birth_day) {
            if !(1..=31).contains(&day) {
                v.fail("birth_day", format!("Must be between 1 and 31, got {}", day));
            }
        }
        if let Some(month) = self.birth_month.filter(|_| self.use_birth_month) {
            if !(1..=12).contains(&month) {
                v.fail("birth_month", format!("Must be between 1 and 12, got {}", month));
            }
        }

        v.finish()
    }
}

/// Accepts `12`, `"12"`, `""` and `null`; gateways often send date parts as strings
fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntOrText {
        Int(i32),
        Text(String),
    }

    match Option::<IntOrText>::deserialize(deserializer)? {
        None => Ok(None),
        Some(IntOrText::Int(n)) => Ok(Some(n)),
        Some(IntOrText::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(IntOrText::Text(s)) => s
            .trim()
            .parse::<i32>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("not an integer: {:?}", s))),
    }
}
