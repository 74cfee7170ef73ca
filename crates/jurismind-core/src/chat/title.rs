//! Conversation title derivation.
//!
//! The title is the user's first input cut to a hard cap. The cap counts
//! Unicode scalar values and the truncation marker counts toward it, so a
//! derived title is never longer than `cap` characters.

/// Appended when the input had to be cut.
pub const TRUNCATION_MARKER: char = '…';

/// Derive a title from the first user input.
///
/// - Input of at most `cap` characters is returned unchanged.
/// - Longer input keeps its first `cap - 1` characters followed by
///   [`TRUNCATION_MARKER`].
/// - A cap of zero yields an empty title.
pub fn derive_title(input: &str, cap: usize) -> String {
    let input = input.trim();
    if input.chars().count() <= cap {
        return input.to_string();
    }
    if cap == 0 {
        return String::new();
    }

    let mut title: String = input.chars().take(cap - 1).collect();
    title.push(TRUNCATION_MARKER);
    title
}
