//! String escaping for values interpolated into SQL text.

/// Double every apostrophe, for single-quoted SQL literals.
pub fn escape_apostrophes(s: &str) -> String {
    s.replace('\'', "''")
}

/// Double every double quote, for double-quoted identifiers.
pub fn escape_double_quotes(s: &str) -> String {
    s.replace('"', "\"\"")
}

/// Backslash-escape the characters MySQL treats specially inside string literals.
pub fn escape_mysql_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len() * 2);
    for c in s.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '\0' => result.push_str("\\\0"),
            '\r' => result.push_str("\\r"),
            '\n' => result.push_str("\\n"),
            '\x1a' => result.push_str("\\Z"),
            '"' => result.push_str("\\\""),
            '\'' => result.push_str("\\'"),
            c => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_apostrophes() {
        assert_eq!(escape_apostrophes("it's"), "it''s");
    }

    #[test]
    fn test_escape_double_quotes() {
        assert_eq!(escape_double_quotes(r#"say "hi""#), r#"say ""hi"""#);
    }

    #[test]
    fn test_escape_mysql_string() {
        assert_eq!(escape_mysql_string("a'b\"c"), r#"a\'b\"c"#);
        assert_eq!(escape_mysql_string("line\r\nend"), r"line\r\nend");
        assert_eq!(escape_mysql_string(r"C:\dir"), r"C:\\dir");
        assert_eq!(escape_mysql_string("\x1a"), r"\Z");
        assert_eq!(escape_mysql_string("\0"), "\\\0");
    }
}
