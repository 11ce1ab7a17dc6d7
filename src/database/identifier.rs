//! Identifier checks for names that cannot be bound as query parameters.

use std::sync::LazyLock;

use regex::Regex;

static LEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[_A-Za-z]+").unwrap());
static WHOLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[_A-Za-z0-9]*$").unwrap());

/// A table name must start with a letter or underscore and contain only
/// letters, digits and underscores.
pub fn check_table_name(name: &str) -> bool {
    LEADING.is_match(name) && WHOLE.is_match(name)
}

/// Database (schema) names follow the table name rules.
pub fn check_database_name(name: &str) -> bool {
    check_table_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("_abc123", true)]
    #[case("users", true)]
    #[case("A", true)]
    #[case("_", true)]
    #[case("1abc", false)]
    #[case("ab-c", false)]
    #[case("", false)]
    #[case("a b", false)]
    #[case("users;DROP", false)]
    #[case("tåble", false)]
    fn test_check_table_name(#[case] name: &str, #[case] valid: bool) {
        assert_eq!(check_table_name(name), valid);
        assert_eq!(check_database_name(name), valid);
    }
}
