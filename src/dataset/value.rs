//! Observation values.

use std::fmt;

/// The primary measure value of an observation.
///
/// Numbers keep their lexical form so that writing a value back produces
/// the same text. A lexical form is only classified as a number when it is
/// already in canonical JSON number form; anything else (`1.50`, `NaN`,
/// `n/a`) is kept as text.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum ObsValue {
    Number(String),
    Text(String),
    #[default]
    Missing,
}

impl ObsValue {
    /// Classify a lexical value read from a document.
    pub fn from_lexical(raw: &str) -> Self {
        if raw.is_empty() {
            return ObsValue::Missing;
        }
        match serde_json::from_str::<serde_json::Number>(raw) {
            Ok(n) if n.to_string() == raw => ObsValue::Number(raw.to_owned()),
            _ => ObsValue::Text(raw.to_owned()),
        }
    }

    pub fn number(value: f64) -> Self {
        match serde_json::Number::from_f64(value) {
            Some(n) => ObsValue::Number(n.to_string()),
            None => ObsValue::Text(value.to_string()),
        }
    }

    /// Lexical form, `None` when missing.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ObsValue::Number(s) | ObsValue::Text(s) => Some(s),
            ObsValue::Missing => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ObsValue::Number(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, ObsValue::Missing)
    }
}

impl fmt::Display for ObsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str().unwrap_or(""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_numbers() {
        assert_eq!(ObsValue::from_lexical("1.3413"), ObsValue::Number("1.3413".into()));
        assert_eq!(ObsValue::from_lexical("-7"), ObsValue::Number("-7".into()));
        assert_eq!(ObsValue::from_lexical("1.3413").as_f64(), Some(1.3413));
    }

    #[test]
    fn test_non_canonical_forms_stay_text() {
        assert_eq!(ObsValue::from_lexical("NaN"), ObsValue::Text("NaN".into()));
        assert_eq!(ObsValue::from_lexical("1.50"), ObsValue::Text("1.50".into()));
        assert_eq!(ObsValue::from_lexical("n/a"), ObsValue::Text("n/a".into()));
    }

    #[test]
    fn test_empty_is_missing() {
        assert!(ObsValue::from_lexical("").is_missing());
        assert_eq!(ObsValue::Missing.to_string(), "");
    }
}
