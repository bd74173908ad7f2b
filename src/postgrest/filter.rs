//! Filter operations for PostgrestClient

/// Operator for filter expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// Equal to
    Eq,

    /// Greater than or equal to
    Gte,

    /// Less than or equal to
    Lte,

    /// Like (case insensitive)
    ILike,

    /// In a list of values
    In,
}

impl FilterOperator {
    /// Convert the operator to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Gte => "gte",
            FilterOperator::Lte => "lte",
            FilterOperator::ILike => "ilike",
            FilterOperator::In => "in",
        }
    }

    /// `op.value`, the right-hand side of a PostgREST filter parameter
    pub fn apply(&self, value: &str) -> String {
        format!("{}.{}", self.as_str(), value)
    }
}

/// Quote a value for use inside `in.(...)` or `or=(...)` lists
pub fn quote_list_value(value: &str) -> String {
    if value
        .chars()
        .any(|c| matches!(c, ',' | '.' | ':' | '(' | ')' | '"' | ' '))
    {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        value.to_string()
    }
}

/// `*value*` pattern for a case-insensitive substring match
pub fn contains_pattern(value: &str) -> String {
    format!("*{}*", value.replace('*', ""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_operators() {
        assert_eq!(FilterOperator::Gte.apply("3"), "gte.3");
        assert_eq!(FilterOperator::ILike.apply("*rice*"), "ilike.*rice*");
    }

    #[test]
    fn quotes_reserved_characters() {
        assert_eq!(quote_list_value("plain"), "plain");
        assert_eq!(quote_list_value("a,b"), "\"a,b\"");
        assert_eq!(quote_list_value("say \"hi\""), "\"say \\\"hi\\\"\"");
    }

    #[test]
    fn builds_contains_pattern() {
        assert_eq!(contains_pattern("stan*ford"), "*stanford*");
    }
}
