// Logging macros that format lazily through `Logger::*_args`.
//
// The level check runs against the logger's component target, the same target
// `LoggingConfig` filters on, before `format_args!` is evaluated.

#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)*) => {{
        let logger = &$logger;
        if logger.enabled(::log::Level::Debug) {
            logger.debug_args(format_args!($($arg)*));
        }
    }}
}

#[macro_export]
macro_rules! log_info {
    ($logger:expr, $($arg:tt)*) => {{
        let logger = &$logger;
        if logger.enabled(::log::Level::Info) {
            logger.info_args(format_args!($($arg)*));
        }
    }}
}

#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $($arg:tt)*) => {{
        let logger = &$logger;
        if logger.enabled(::log::Level::Warn) {
            logger.warn_args(format_args!($($arg)*));
        }
    }}
}
