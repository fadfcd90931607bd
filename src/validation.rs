//! Input-shape rules shared by registration, thread creation and replies.
//!
//! Titles and bodies are measured after trimming surrounding spaces.
//! Usernames and passwords are never trimmed: any space rejects them outright.
//! Lengths are byte lengths.

use crate::core::error::{ForumError, ForumResult};

pub const MIN_LENGTH_TITLE: usize = 10;
pub const MIN_LENGTH_CONTENT: usize = 16;
pub const MIN_LENGTH_USERNAME: usize = 6;
pub const MIN_LENGTH_PASSWORD: usize = 8;

fn trimmed_len(input: &str) -> usize {
    input.trim_matches(' ').len()
}

fn validate_credential(input: &str, min_length: usize) -> ForumResult<()> {
    if input.contains(' ') {
        Err(ForumError::ContainsSpaces)
    } else if input.len() < min_length {
        Err(ForumError::TooShort)
    } else {
        Ok(())
    }
}

pub fn validate_title(input: &str) -> ForumResult<()> {
    if trimmed_len(input) < MIN_LENGTH_TITLE {
        return Err(ForumError::TooShort);
    }
    Ok(())
}

pub fn validate_content(input: &str) -> ForumResult<()> {
    if trimmed_len(input) < MIN_LENGTH_CONTENT {
        return Err(ForumError::TooShort);
    }
    Ok(())
}

pub fn validate_username(input: &str) -> ForumResult<()> {
    validate_credential(input, MIN_LENGTH_USERNAME)
}

pub fn validate_password(input: &str) -> ForumResult<()> {
    validate_credential(input, MIN_LENGTH_PASSWORD)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_is_measured_after_trimming_spaces() {
        assert!(validate_title("Long enough title").is_ok());
        assert!(validate_title("0123456789").is_ok());
        assert!(matches!(validate_title("short"), Err(ForumError::TooShort)));
        assert!(matches!(
            validate_title("    short     "),
            Err(ForumError::TooShort)
        ));
    }

    #[test]
    fn internal_whitespace_counts_towards_title_length() {
        assert!(validate_title("a        b").is_ok());
    }

    #[test]
    fn only_spaces_are_trimmed() {
        // Tabs and newlines survive trimming and count towards the length.
        assert!(validate_title("\tabcdefgh\n").is_ok());
    }

    #[test]
    fn content_needs_sixteen_characters() {
        assert!(validate_content("this is plenty long enough").is_ok());
        assert!(matches!(validate_content("short"), Err(ForumError::TooShort)));
        assert!(matches!(
            validate_content("  0123456789abcde  "),
            Err(ForumError::TooShort)
        ));
        assert!(validate_content("  0123456789abcdef  ").is_ok());
    }

    #[test]
    fn username_rejects_spaces_before_length() {
        assert!(validate_username("Sholomobo2").is_ok());
        assert!(matches!(validate_username("a b"), Err(ForumError::ContainsSpaces)));
        assert!(matches!(
            validate_username(" padded_name "),
            Err(ForumError::ContainsSpaces)
        ));
        assert!(matches!(validate_username("short"), Err(ForumError::TooShort)));
        assert!(validate_username("sixsix").is_ok());
    }

    #[test]
    fn password_needs_eight_characters_and_no_spaces() {
        assert!(validate_password("backthemall97").is_ok());
        assert!(validate_password("12345678").is_ok());
        assert!(matches!(validate_password("1234567"), Err(ForumError::TooShort)));
        assert!(matches!(
            validate_password("has a space"),
            Err(ForumError::ContainsSpaces)
        ));
    }
}
