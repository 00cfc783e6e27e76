//! String utilities for the domain layer.

/// Truncate a string to a maximum length with ellipsis (UTF-8 safe)
///
/// Uses byte length for max_len but ensures truncation occurs at valid
/// UTF-8 character boundaries.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let target = max_len.saturating_sub(3);
        let mut end = target.min(s.len());
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    }
}

/// Collapse all whitespace runs (including newlines) into single spaces.
///
/// Used when model or search text is embedded in single-line trace reasons.
pub fn single_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_ascii() {
        assert_eq!(truncate("Louvre", 10), "Louvre");
        assert_eq!(truncate("Sagrada Familia", 10), "Sagrada...");
    }

    #[test]
    fn test_truncate_multibyte() {
        // "é" is 2 bytes: the cut must back off to a char boundary
        assert_eq!(truncate("Champs-Élysées", 30), "Champs-Élysées");
        assert_eq!(truncate("ééééé", 8), "éé...");
    }

    #[test]
    fn test_single_line() {
        assert_eq!(single_line("a\n  b\tc "), "a b c");
        assert_eq!(single_line(""), "");
    }
}
