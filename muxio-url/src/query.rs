//! Query-string option tags
//!
//! Options arrive as `key=value` pairs separated by `&`. Numeric values use
//! C `strtol` conventions: the longest leading digit run counts, anything
//! after it is ignored. Boolean options treat a value with no digits as a
//! request to enable the option, so `connect` and `connect=` both enable.

/// Look up a tag in a query string.
///
/// Returns the first matching pair's value; a bare `key` with no `=` yields
/// an empty value. Returns `None` when the key does not appear.
pub fn find_tag<'a>(query: &'a str, key: &str) -> Option<&'a str> {
    for pair in query.split('&') {
        match pair.split_once('=') {
            Some((k, v)) if k == key => return Some(v),
            None if pair == key => return Some(""),
            _ => {}
        }
    }
    None
}

/// Parse the leading digit run of a value, `strtol`-style.
///
/// Returns `None` when the value does not start with a digit.
pub fn parse_int_prefix(value: &str) -> Option<u64> {
    let digits: &str = {
        let end = value
            .char_indices()
            .find(|(_, c)| !c.is_ascii_digit())
            .map(|(i, _)| i)
            .unwrap_or(value.len());
        &value[..end]
    };
    if digits.is_empty() {
        return None;
    }
    // a digit run too long for u64 is saturated rather than rejected
    Some(digits.parse::<u64>().unwrap_or(u64::MAX))
}

/// Parse a boolean option value.
///
/// Digits parse as truthiness (`0` disables, anything else enables); the
/// absence of digits is treated as a request to enable.
pub fn parse_flag(value: &str) -> bool {
    match parse_int_prefix(value) {
        Some(n) => n != 0,
        None => true,
    }
}

/// Split a comma-separated list value, dropping empty segments.
pub fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_tag() {
        let q = "ttl=16&reuse=1&localaddr=10.0.0.1";
        assert_eq!(find_tag(q, "ttl"), Some("16"));
        assert_eq!(find_tag(q, "reuse"), Some("1"));
        assert_eq!(find_tag(q, "localaddr"), Some("10.0.0.1"));
        assert_eq!(find_tag(q, "pkt_size"), None);
    }

    #[test]
    fn test_find_tag_bare_key() {
        assert_eq!(find_tag("connect&ttl=2", "connect"), Some(""));
        assert_eq!(find_tag("connect=&ttl=2", "connect"), Some(""));
    }

    #[test]
    fn test_find_tag_first_wins() {
        assert_eq!(find_tag("ttl=1&ttl=2", "ttl"), Some("1"));
    }

    #[test]
    fn test_find_tag_no_substring_match() {
        assert_eq!(find_tag("pkt_size=100", "size"), None);
        assert_eq!(find_tag("blocked=1", "block"), None);
    }

    #[test]
    fn test_parse_int_prefix() {
        assert_eq!(parse_int_prefix("16"), Some(16));
        assert_eq!(parse_int_prefix("16abc"), Some(16));
        assert_eq!(parse_int_prefix("0"), Some(0));
        assert_eq!(parse_int_prefix(""), None);
        assert_eq!(parse_int_prefix("abc"), None);
        assert_eq!(parse_int_prefix("99999999999999999999999"), Some(u64::MAX));
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("1"));
        assert!(!parse_flag("0"));
        assert!(parse_flag(""));
        assert!(parse_flag("yes"));
        assert!(parse_flag("2"));
        assert!(!parse_flag("0abc"));
    }

    #[test]
    fn test_split_list() {
        let items: Vec<_> = split_list("10.0.0.1,10.0.0.2").collect();
        assert_eq!(items, vec!["10.0.0.1", "10.0.0.2"]);

        let items: Vec<_> = split_list("").collect();
        assert!(items.is_empty());

        let items: Vec<_> = split_list("a,,b,").collect();
        assert_eq!(items, vec!["a", "b"]);
    }
}
