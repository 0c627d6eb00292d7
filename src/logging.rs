//! Crate-internal logging macros.
//!
//! With the `log` feature the macros forward to the `log` crate, with `defmt`
//! (and not `log`) they forward to `defmt`. Without either feature the
//! arguments are type-checked and nothing is emitted.
//!
//! Format strings stick to `{}` for strings and integers and `{:?}` for crate
//! types so they are valid for both backends.

#![allow(unused_macros)]

#[cfg(feature = "log")]
macro_rules! trace {
    ($($arg:tt)+) => (::log::trace!(target: "mqtt_rpc", $($arg)+))
}

#[cfg(feature = "log")]
macro_rules! debug {
    ($($arg:tt)+) => (::log::debug!(target: "mqtt_rpc", $($arg)+))
}

#[cfg(feature = "log")]
macro_rules! info {
    ($($arg:tt)+) => (::log::info!(target: "mqtt_rpc", $($arg)+))
}

#[cfg(feature = "log")]
macro_rules! warni {
    ($($arg:tt)+) => (::log::warn!(target: "mqtt_rpc", $($arg)+))
}

#[cfg(feature = "log")]
macro_rules! error {
    ($($arg:tt)+) => (::log::error!(target: "mqtt_rpc", $($arg)+))
}

#[cfg(all(feature = "defmt", not(feature = "log")))]
macro_rules! trace {
    ($($arg:tt)+) => (::defmt::trace!($($arg)+))
}

#[cfg(all(feature = "defmt", not(feature = "log")))]
macro_rules! debug {
    ($($arg:tt)+) => (::defmt::debug!($($arg)+))
}

#[cfg(all(feature = "defmt", not(feature = "log")))]
macro_rules! info {
    ($($arg:tt)+) => (::defmt::info!($($arg)+))
}

#[cfg(all(feature = "defmt", not(feature = "log")))]
macro_rules! warni {
    ($($arg:tt)+) => (::defmt::warn!($($arg)+))
}

#[cfg(all(feature = "defmt", not(feature = "log")))]
macro_rules! error {
    ($($arg:tt)+) => (::defmt::error!($($arg)+))
}

#[cfg(not(any(feature = "log", feature = "defmt")))]
macro_rules! trace {
    ($($arg:tt)+) => {{
        if false {
            let _ = ::core::format_args!($($arg)+);
        }
    }};
}

#[cfg(not(any(feature = "log", feature = "defmt")))]
macro_rules! debug {
    ($($arg:tt)+) => {{
        if false {
            let _ = ::core::format_args!($($arg)+);
        }
    }};
}

#[cfg(not(any(feature = "log", feature = "defmt")))]
macro_rules! info {
    ($($arg:tt)+) => {{
        if false {
            let _ = ::core::format_args!($($arg)+);
        }
    }};
}

#[cfg(not(any(feature = "log", feature = "defmt")))]
macro_rules! warni {
    ($($arg:tt)+) => {{
        if false {
            let _ = ::core::format_args!($($arg)+);
        }
    }};
}

#[cfg(not(any(feature = "log", feature = "defmt")))]
macro_rules! error {
    ($($arg:tt)+) => {{
        if false {
            let _ = ::core::format_args!($($arg)+);
        }
    }};
}

#[allow(unused_imports)]
pub(crate) use {debug, error, info, trace, warni as warn};
