//! Types shared across the crate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::quadrature::types::QuadratureError;

/// Vacuum permittivity in F/m.
pub const E_ZERO: f64 = 8.854187818e-12;

/// 4 pi e0, the denominator of the 3D free-space Green's function scaling.
pub const FOUR_PI_E_ZERO: f64 = 4.0 * std::f64::consts::PI * E_ZERO;

/// 2 pi e0, the denominator of the 2D free-space Green's function scaling.
pub const TWO_PI_E_ZERO: f64 = 2.0 * std::f64::consts::PI * E_ZERO;

/// Magnitude guard below which a vector is left unnormalized and treated
/// as degenerate.
pub const EPS_NORMAL: f64 = 1e-12;

/// Geometric classification tolerance for point-on-vertex / point-on-edge
/// tests in the analytic kernels.
pub const EPS_GEOM: f64 = 1e-6;

/// Longest allowed conductor name.
pub const MAX_NAME_LEN: usize = 256;

/// Crate-wide error type.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Geometry too degenerate to process (zero-area panel, zero-length
    /// segment or side).
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),
    /// Conductor name exceeds [`MAX_NAME_LEN`].
    #[error("conductor name of {len} chars exceeds the {max} char limit")]
    NameTooLong {
        /// Offending length.
        len: usize,
        /// The limit.
        max: usize,
    },
    /// Quadrature rule lookup failed.
    #[error("quadrature error: {0}")]
    Quadrature(#[from] QuadratureError),
    /// Operation requires a non-empty surface.
    #[error("conductor has no panels or segments")]
    EmptySurface,
    /// Element kind does not match the conductor's surface kind.
    #[error("element kind does not match the conductor surface kind")]
    SurfaceKind,
    /// Operation is only defined on leaf elements.
    #[error("element is not a leaf")]
    NotALeaf,
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Outcome of a refinement step.
///
/// Cooperative cancellation is a normal early exit, distinguishable from
/// both success and failure, so it lives in the Ok value rather than in
/// [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refinement {
    /// The element was split.
    Subdivided,
    /// The cancellation token was set before any work was done.
    Interrupted,
}

/// Cloneable cancellation handle shared between a controller and the
/// refinement routines.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token in the not-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Refinement routines poll this at the start of
    /// each node's work.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Reset the token so the next run can proceed.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::Relaxed);
    }

    /// True once [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Explicit per-solve context passed into tree operations.
///
/// Log and error reporting go through the `log` facade and need no handle
/// here; the consumer decides where those messages are routed.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Cancellation token polled by subdivision.
    pub cancel: CancelToken,
}

impl Context {
    /// Create a context with a fresh cancellation token.
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_cancel_token() {
        let ctx = Context::new();
        assert!(!ctx.cancel.is_cancelled());

        let remote = ctx.cancel.clone();
        remote.cancel();
        assert!(ctx.cancel.is_cancelled());

        ctx.cancel.reset();
        assert!(!remote.is_cancelled());
    }
}
