//! Small shared helpers.

/// Truncates a string to at most `max_chars` characters, appending "..."
/// when anything was cut. Counts characters, not bytes, so multi-byte
/// text never splits mid-codepoint.
pub fn truncate_str(s: &str, max_chars: usize) -> String {
    // Cheap filter: byte length bounds character count from above.
    if s.len() <= max_chars || s.chars().count() <= max_chars {
        return s.to_string();
    }
    const SUFFIX: &str = "...";
    if max_chars <= SUFFIX.len() {
        return SUFFIX.chars().take(max_chars).collect();
    }
    let kept: String = s.chars().take(max_chars - SUFFIX.len()).collect();
    format!("{}{}", kept, SUFFIX)
}
