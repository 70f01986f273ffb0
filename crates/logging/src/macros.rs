//! `format!`-style logging macros gated on the active verbosity config.

/// Logs a debug-category message if `flag` is enabled at `level` or higher.
///
/// ```
/// use logging::{init, VerbosityConfig, DebugFlag, debug_log};
///
/// init(VerbosityConfig::from_verbose_level(2));
/// debug_log!(DebugFlag::Docket, 1, "parsed {} bytes", 125);
/// ```
#[macro_export]
macro_rules! debug_log {
    ($flag:expr, $level:expr, $($arg:tt)*) => {{
        let flag = $flag;
        let level = $level;
        if $crate::debug_gte(flag, level) {
            let message = ::std::format!($($arg)*);
            #[cfg(feature = "tracing")]
            ::tracing::event!(::tracing::Level::DEBUG, ?flag, level, %message);
            $crate::push_event($crate::DiagnosticEvent::Debug { flag, level, message });
        }
    }};
}

/// Logs an info-category message if `flag` is enabled at `level` or higher.
#[macro_export]
macro_rules! info_log {
    ($flag:expr, $level:expr, $($arg:tt)*) => {{
        let flag = $flag;
        let level = $level;
        if $crate::info_gte(flag, level) {
            let message = ::std::format!($($arg)*);
            #[cfg(feature = "tracing")]
            ::tracing::event!(::tracing::Level::INFO, ?flag, level, %message);
            $crate::push_event($crate::DiagnosticEvent::Info { flag, level, message });
        }
    }};
}
