/// Tokens shorter than this many chars are dropped.
pub const MIN_TOKEN_CHARS: usize = 3;

/// Lowercases `text`, splits it on every non-alphanumeric char and drops
/// tokens of two chars or fewer. Queries and documents go through the same
/// function.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= MIN_TOKEN_CHARS)
        .map(str::to_string)
        .collect()
}
