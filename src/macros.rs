// Logging macros. These expand to `log` calls only when the `logging`
// feature is enabled and to nothing otherwise.

macro_rules! log {
    ($($tt:tt)*) => {
        #[cfg(feature = "logging")]
        {
            $($tt)*
        }
    };
}

macro_rules! debug {
    ($($tt:tt)*) => {
        log!(log::debug!($($tt)*))
    };
}

macro_rules! trace {
    ($($tt:tt)*) => {
        log!(log::trace!($($tt)*))
    };
}
