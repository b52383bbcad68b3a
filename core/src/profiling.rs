//! Profiling support via Tracy.
//!
//! Sync passes over large scenes are the hot path of the render index, so the
//! drivers are instrumented with the macros below. Profiling is enabled via the
//! `profiling` Cargo feature:
//!
//! ```toml
//! [dependencies]
//! hydrant-core = { version = "0.1", features = ["profiling"] }
//! ```
//!
//! # CPU Profiling
//!
//! ```ignore
//! use hydrant_core::{profile_function, profile_scope};
//!
//! fn sync_rprim() {
//!     profile_function!();
//!
//!     {
//!         profile_scope!("populate_topology");
//!         // ...
//!     }
//! }
//! ```
//!
//! When profiling is disabled (the default), all macros compile to no-ops.

#[cfg(feature = "profiling")]
pub use tracy_client::{self, Client, plot as tracy_plot, span};

/// Create a profiling span for the current scope.
///
/// The span ends when the scope exits.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! profile_scope {
    ($name:expr) => {
        let _profile_span = $crate::profiling::span!($name);
    };
}

/// Create a profiling span (no-op when profiling disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! profile_scope {
    ($name:expr) => {};
}

/// Create a profiling span for the entire function.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! profile_function {
    () => {
        let _profile_span = $crate::profiling::span!();
    };
}

/// Create a profiling span for function (no-op when profiling disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! profile_function {
    () => {};
}

/// Plot a per-pass counter in Tracy.
///
/// ```ignore
/// profile_plot!("dirty_rprims", work.len());
/// ```
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! profile_plot {
    ($name:expr, $value:expr) => {
        $crate::profiling::tracy_plot!($name, $value as f64)
    };
}

/// Plot a value (no-op when profiling disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! profile_plot {
    ($name:expr, $value:expr) => {
        let _ = $value;
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn macros_compile_without_profiling() {
        profile_function!();
        profile_scope!("scope");
        profile_plot!("value", 3usize);
    }
}
