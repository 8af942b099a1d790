//! Logging setup plus conditional logging macros.
//!
//! The macros check a module-level `ENABLE_LOGS` flag, so a chatty module
//! (the refresh loop logs every tick) can be silenced in one place:
//! ```ignore
//! const ENABLE_LOGS: bool = true;
//!
//! use crate::{log_info, log_warn, log_error};
//!
//! log_info!("refresh loop started");
//! ```

use log::LevelFilter;

/// Set to `1`/`true` to default to debug output.
pub const DEBUG_ENV: &str = "VITALVIEW_DEBUG";

/// Installs `env_logger`. `RUST_LOG` still wins over the default level.
pub fn init() {
    let debug = std::env::var(DEBUG_ENV)
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init();
}

#[doc(hidden)]
#[macro_export]
macro_rules! log_gated {
    ($level:expr, $($arg:tt)*) => {
        if ENABLE_LOGS {
            ::log::log!($level, $($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => { $crate::log_gated!(::log::Level::Info, $($arg)*) };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => { $crate::log_gated!(::log::Level::Warn, $($arg)*) };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => { $crate::log_gated!(::log::Level::Error, $($arg)*) };
}
