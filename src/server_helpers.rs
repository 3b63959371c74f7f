// Server functionality which:
//   - Is not important for testing;
//   - Can potentially pull heavy dependencies into the core crate, e.g. a profanity filter.
pub trait ServerHelpers {
    // Receives a trimmed, non-empty name that fits `MAX_DISPLAY_NAME_LENGTH`.
    fn validate_display_name(&self, name: &str) -> Result<(), String>;
}

pub struct TestServerHelpers;

impl ServerHelpers for TestServerHelpers {
    fn validate_display_name(&self, _name: &str) -> Result<(), String> { Ok(()) }
}
