//! Internal logging macros that wrap `tracing` when the feature is enabled.
//!
//! With the `tracing` feature disabled every logging call compiles to a no-op. Call sites stick to
//! `field = value,` pairs followed by a literal message so both expansions accept them.

#[cfg(feature = "tracing")]
#[allow(unused_macros)]
macro_rules! error {
    ($($arg:tt)*) => {
        tracing::error!(target: "wallet_sync", $($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
#[allow(unused_macros)]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::__trace_consume!($($arg)*)
    };
}

#[cfg(feature = "tracing")]
#[allow(unused_macros)]
macro_rules! warn {
    ($($arg:tt)*) => {
        tracing::warn!(target: "wallet_sync", $($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
#[allow(unused_macros)]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::__trace_consume!($($arg)*)
    };
}

#[cfg(feature = "tracing")]
#[allow(unused_macros)]
macro_rules! info {
    ($($arg:tt)*) => {
        tracing::info!(target: "wallet_sync", $($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
#[allow(unused_macros)]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::__trace_consume!($($arg)*)
    };
}

#[cfg(feature = "tracing")]
#[allow(unused_macros)]
macro_rules! debug {
    ($($arg:tt)*) => {
        tracing::debug!(target: "wallet_sync", $($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
#[allow(unused_macros)]
macro_rules! debug {
    ($($arg:tt)*) => {
        $crate::__trace_consume!($($arg)*)
    };
}

#[cfg(feature = "tracing")]
#[allow(unused_macros)]
macro_rules! trace {
    ($($arg:tt)*) => {
        tracing::trace!(target: "wallet_sync", $($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
#[allow(unused_macros)]
macro_rules! trace {
    ($($arg:tt)*) => {
        $crate::__trace_consume!($($arg)*)
    };
}

#[doc(hidden)]
#[macro_export]
#[cfg(not(feature = "tracing"))]
#[allow(unused_macros)]
macro_rules! __trace_consume {
    // field = %expr, rest...
    ($field:ident = % $value:expr, $($rest:tt)*) => {
        { let _ = &$value; $crate::__trace_consume!($($rest)*); }
    };
    // field = ?expr, rest...
    ($field:ident = ? $value:expr, $($rest:tt)*) => {
        { let _ = &$value; $crate::__trace_consume!($($rest)*); }
    };
    // field = expr, rest...
    ($field:ident = $value:expr, $($rest:tt)*) => {
        { let _ = &$value; $crate::__trace_consume!($($rest)*); }
    };
    ($lit:literal $($rest:tt)*) => {
        $crate::__trace_consume!($($rest)*)
    };
    () => {};
}
