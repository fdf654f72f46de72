//! Profiling support via Tracy.
//!
//! Instrumentation is enabled with the `profiling` Cargo feature:
//!
//! ```bash
//! cargo run -p meshsmooth-demos --features profiling
//! ```
//!
//! Then connect the Tracy profiler (<https://github.com/wolfpld/tracy/releases>)
//! to the running process.
//!
//! ```ignore
//! use meshsmooth_core::profiling::{profile_function, profile_scope};
//!
//! fn smooth() {
//!     profile_function!();
//!
//!     {
//!         profile_scope!("group_positions");
//!         // ...
//!     }
//! }
//! ```
//!
//! When profiling is disabled (the default), all macros compile to no-ops.

#[cfg(feature = "profiling")]
pub use tracy_client::{self, Client, plot as tracy_plot, span};

/// Create a profiling span for the current scope.
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

/// Plot a value over time in Tracy.
///
/// ```ignore
/// profile_plot!("smooth_vertex_count", positions.len());
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

/// Set the name of the current thread for Tracy.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! set_thread_name {
    ($name:expr) => {
        $crate::profiling::tracy_client::set_thread_name!($name)
    };
}

/// Set thread name (no-op when profiling disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! set_thread_name {
    ($name:expr) => {};
}

pub use profile_function;
pub use profile_plot;
pub use profile_scope;
pub use set_thread_name;
