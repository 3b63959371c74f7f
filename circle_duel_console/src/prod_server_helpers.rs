use censor::Censor;
use circle_duel::server::MAX_DISPLAY_NAME_LENGTH;
use circle_duel::server_helpers::ServerHelpers;
use itertools::Itertools;


#[allow(clippy::useless_format)]
pub fn validate_display_name(name: &str) -> Result<(), String> {
    const MIN_NAME_LENGTH: usize = 2;

    // These words cannot be used inside display names, even with slight variations.
    const CUSTOM_CENSOR: &[&str] = &["admin", "moderator"];

    // These words cannot be used as display names to avoid confusion in the game UI.
    // They can be used inside display names, though.
    #[rustfmt::skip]
    const CUSTOM_BAN: &[&str] = &[
        "red", "blue", "person", "circle",
        "opponent", "participant", "player", "nobody", "someone",
        "server", "relay", "system",
    ];

    if name.chars().any(|ch| ch.is_control()) {
        return Err(format!("Display name cannot contain control characters."));
    }
    if !name.chars().any(|ch| ch.is_alphabetic()) {
        return Err(format!("Display name must contain at least one letter."));
    }
    if name.chars().tuple_windows().any(|(a, b)| a.is_whitespace() && b.is_whitespace()) {
        return Err(format!("Display name cannot contain several spaces in a row."));
    }
    let len = name.chars().count();
    if len < MIN_NAME_LENGTH {
        return Err(format!("Minimum display name length is {MIN_NAME_LENGTH}."));
    }
    if len > MAX_DISPLAY_NAME_LENGTH {
        return Err(format!("Maximum display name length is {MAX_DISPLAY_NAME_LENGTH}."));
    }
    if (Censor::Standard + Censor::Sex).check(name)
        || Censor::custom(CUSTOM_CENSOR.iter().copied()).check(name)
        || CUSTOM_BAN.iter().any(|s| s.eq_ignore_ascii_case(name))
    {
        return Err(format!("Please try another display name."));
    }
    Ok(())
}


pub struct ProdServerHelpers;

impl ServerHelpers for ProdServerHelpers {
    fn validate_display_name(&self, name: &str) -> Result<(), String> {
        validate_display_name(name)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_display_name_all() {
        validate_display_name("a").unwrap_err(); // too short
        validate_display_name("ab").unwrap();
        validate_display_name(&"a".repeat(MAX_DISPLAY_NAME_LENGTH)).unwrap();
        validate_display_name(&"a".repeat(MAX_DISPLAY_NAME_LENGTH + 1)).unwrap_err(); // too long

        validate_display_name("42").unwrap_err(); // no letters
        validate_display_name("Agent 42").unwrap();
        validate_display_name("Игрок").unwrap(); // non-Latin letters are fine
        validate_display_name("bad\tname").unwrap_err(); // control characters
        validate_display_name("two  spaces").unwrap_err();

        validate_display_name("Blue").unwrap_err(); // reserved word
        validate_display_name("Blue Moon").unwrap(); // reserved word inside
        validate_display_name("admin").unwrap_err(); // banned word
        validate_display_name("MainAdmin").unwrap_err(); // banned word inside
    }
}
