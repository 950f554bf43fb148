use std::fmt;

/// Tagged data unit flowing through stacks, registers and output.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Value {
    /// Signed machine-width integer.
    Integer(i64),
    /// Text whose characters all fall in `U+0000..=U+00FF`.
    Text(String),
    /// Absence marker, distinct from an empty stack.
    Nothing,
    /// Call-frame fence token.
    Frame,
    /// Sentinel returned by `pop`/`peek` on an empty stack. Never stored.
    Bottom,
}

impl Value {
    /// Returns the integer payload, if any.
    #[must_use]
    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the text payload, if any.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns `true` for the two stack markers.
    #[must_use]
    pub const fn is_marker(&self) -> bool {
        matches!(self, Self::Frame | Self::Bottom)
    }

    /// Builds a text value, dropping characters outside the single-byte range.
    #[must_use]
    pub fn text(text: &str) -> Self {
        Self::Text(text.chars().filter(|c| u32::from(*c) <= 0xFF).collect())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::text(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
            Self::Nothing => f.write_str("None"),
            Self::Frame => f.write_str("StackFrame"),
            Self::Bottom => f.write_str("StackBottom"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Value;

    #[test]
    fn display_matches_output_rendering() {
        assert_eq!(Value::Integer(-56).to_string(), "-56");
        assert_eq!(Value::text("ECHO").to_string(), "ECHO");
        assert_eq!(Value::Nothing.to_string(), "None");
        assert_eq!(Value::Frame.to_string(), "StackFrame");
        assert_eq!(Value::Bottom.to_string(), "StackBottom");
    }

    #[test]
    fn sentinels_are_distinct() {
        assert_ne!(Value::Nothing, Value::Bottom);
        assert_ne!(Value::Bottom, Value::Frame);
        assert_ne!(Value::Nothing, Value::Frame);
    }

    #[test]
    fn text_constructor_drops_wide_characters() {
        assert_eq!(Value::text("a\u{263A}b\u{FF}"), Value::Text("ab\u{FF}".to_string()));
    }

    #[test]
    fn accessors_only_match_their_variant() {
        assert_eq!(Value::Integer(4).as_integer(), Some(4));
        assert_eq!(Value::text("4").as_integer(), None);
        assert_eq!(Value::text("cats").as_text(), Some("cats"));
        assert!(Value::Frame.is_marker());
        assert!(!Value::Nothing.is_marker());
    }
}
