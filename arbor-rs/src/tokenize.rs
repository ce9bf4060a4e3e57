//! Input tokenization.

/// Split a command line on whitespace.
pub fn tokenize(input: &str) -> Vec<&str> {
    input.split_whitespace().collect()
}

/// Tokenize for completion: the last token is the one being typed, and is
/// empty when the input is empty or ends with whitespace.
pub fn tokenize_partial(input: &str) -> Vec<&str> {
    let mut tokens = tokenize(input);
    if input.is_empty() || input.ends_with(char::is_whitespace) {
        tokens.push("");
    }
    tokens
}
