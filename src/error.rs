// Broken invariants inside the relay are reported, never turned into panics: the event that
// exposed them is dropped and the relay keeps serving other sessions.

#[macro_export]
macro_rules! internal_error_message {
    () => {
        format!("Internal error at {}:{}.", file!(), line!())
    };
    ($($arg:tt)+) => {
        format!("Internal error at {}:{}: {}.", file!(), line!(), format!($($arg)*))
    };
}

#[macro_export]
macro_rules! report_internal_error {
    ($($arg:tt)+) => {
        log::error!("{}", $crate::internal_error_message!($($arg)+))
    };
}
