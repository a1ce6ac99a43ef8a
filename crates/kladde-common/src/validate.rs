use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Practical email check (HTML5 input[type=email] pattern). Anything
/// stricter rejects real addresses.
pub static EMAIL_RX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("email regex is a constant")
});

/// Accumulates validation errors for one form submission.
///
/// Field errors are keyed by form-field name and keep only the first
/// failure per field; later checks against an already-failed field are
/// skipped. Non-field errors (e.g. bad credentials) are collected in
/// order. Serializes so templates can re-render a failed form with its
/// messages in place.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Validator {
    pub non_field_errors: Vec<String>,
    pub field_errors: HashMap<String, String>,
}

impl Validator {
    pub fn valid(&self) -> bool {
        self.field_errors.is_empty() && self.non_field_errors.is_empty()
    }

    pub fn add_non_field_error(&mut self, message: impl Into<String>) {
        self.non_field_errors.push(message.into());
    }

    /// First error per field wins.
    pub fn add_field_error(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.field_errors.entry(key.into()).or_insert(message.into());
    }

    /// Records `message` under `key` when the check failed.
    pub fn check_field(&mut self, ok: bool, key: impl Into<String>, message: impl Into<String>) {
        if !ok {
            self.add_field_error(key, message);
        }
    }
}

/// True when the value contains at least one non-whitespace character.
pub fn not_blank(value: &str) -> bool {
    !value.trim().is_empty()
}

/// True when the value is at most `n` characters long (characters, not bytes).
pub fn max_chars(value: &str, n: usize) -> bool {
    value.chars().count() <= n
}

/// True when the value is at least `n` characters long.
pub fn min_chars(value: &str, n: usize) -> bool {
    value.chars().count() >= n
}

/// True when the value is one of the permitted values.
pub fn permitted_value<T: PartialEq>(value: &T, permitted: &[T]) -> bool {
    permitted.contains(value)
}

/// True when the value matches the pattern.
pub fn matches(value: &str, rx: &Regex) -> bool {
    rx.is_match(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_validator_is_valid() {
        let v = Validator::default();
        assert!(v.valid());
    }

    #[test]
    fn test_field_error_invalidates() {
        let mut v = Validator::default();
        v.add_field_error("title", "This field cannot be blank");
        assert!(!v.valid());
        assert_eq!(
            v.field_errors.get("title").map(String::as_str),
            Some("This field cannot be blank")
        );
    }

    #[test]
    fn test_non_field_error_invalidates() {
        let mut v = Validator::default();
        v.add_non_field_error("Email or password is incorrect");
        assert!(!v.valid());
        assert!(v.field_errors.is_empty());
    }

    #[test]
    fn test_first_field_error_wins() {
        let mut v = Validator::default();
        v.add_field_error("title", "first");
        v.add_field_error("title", "second");
        assert_eq!(v.field_errors.get("title").map(String::as_str), Some("first"));
        assert_eq!(v.field_errors.len(), 1);
    }

    #[test]
    fn test_check_field_records_only_failures() {
        let mut v = Validator::default();
        v.check_field(true, "title", "should not appear");
        assert!(v.valid());
        v.check_field(false, "title", "too long");
        v.check_field(false, "title", "also blank");
        assert_eq!(v.field_errors.get("title").map(String::as_str), Some("too long"));
    }

    #[test]
    fn test_errors_on_distinct_fields_accumulate() {
        let mut v = Validator::default();
        v.check_field(false, "title", "bad title");
        v.check_field(false, "content", "bad content");
        assert_eq!(v.field_errors.len(), 2);
    }

    #[test]
    fn test_not_blank() {
        assert!(not_blank("hello"));
        assert!(not_blank("  x  "));
        assert!(!not_blank(""));
        assert!(!not_blank("   "));
        assert!(!not_blank("\t\n"));
    }

    #[test]
    fn test_max_chars_counts_characters_not_bytes() {
        assert!(max_chars("abcde", 5));
        assert!(!max_chars("abcdef", 5));
        // 3 characters, 9 bytes
        assert!(max_chars("日本語", 3));
        assert!(!max_chars("日本語", 2));
    }

    #[test]
    fn test_min_chars() {
        assert!(min_chars("pa$$word", 8));
        assert!(!min_chars("short", 8));
        assert!(min_chars("", 0));
    }

    #[test]
    fn test_permitted_value() {
        assert!(permitted_value(&7, &[1, 7, 365]));
        assert!(!permitted_value(&30, &[1, 7, 365]));
        assert!(permitted_value(&"a", &["a", "b"]));
    }

    #[test]
    fn test_email_pattern() {
        assert!(matches("alice@example.com", &EMAIL_RX));
        assert!(matches("a.b+c@sub.example.co.uk", &EMAIL_RX));
        assert!(!matches("not-an-email", &EMAIL_RX));
        assert!(!matches("@example.com", &EMAIL_RX));
        assert!(!matches("alice@", &EMAIL_RX));
        assert!(!matches("alice @example.com", &EMAIL_RX));
    }
}
