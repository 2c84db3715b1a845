//! The potential/field kernel engine.
//!
//! Evaluates, for pairs of flat panels or segments (or an element
//! against itself), the electrostatic potential influence coefficient
//! and its normal derivative under a uniform unit-charge assumption.
//!
//! Conventions, preserved across every variant:
//! - point-evaluation results are per unit *total* source charge (the
//!   raw Green's-function integral divided by the source area/length);
//! - mutual results integrate that over the field element, and the
//!   `divide_by_area` flag controls the extra division by the field
//!   element's dimension;
//! - the physical 1/(4 pi e0) and 1/(2 pi e0) constants are *not*
//!   applied here. The assembly layer applies them once, at the end, so
//!   intermediate values stay comparable across variants.
//!
//! All functions are pure and deterministic; degenerate geometry is
//! rejected with [`Error::DegenerateGeometry`](crate::types::Error)
//! instead of silently propagating NaN.

pub mod segment;
pub mod triangle;

use crate::quadrature::rule_definitions::{INTERVAL_RULES, TRIANGLE_RULES};

/// Dimensionless threshold under which an edge contribution is
/// suppressed: the observation point projects onto the edge's supporting
/// line and the exact limit of the contribution is zero. The test is a
/// ratio of edge-local coordinates, not an absolute distance, so very
/// small panels are not penalized.
pub(crate) const EPS_PROJECTION: f64 = 1e-12;

/// Relative step for centered finite differencing along an element
/// normal, as a fraction of the element's characteristic size.
pub(crate) const DIFF_STEP: f64 = 1e-5;

/// Rule index used for quad-panel mutual coefficients, matching the
/// historical high-order half-numerical variant.
pub(crate) const QUAD_RULE: usize = 15;

/// Stateless handle to the kernel engine.
///
/// Construction forces the one-time initialization of the quadrature
/// tables; afterwards the tables are shared read-only, so engine handles
/// can be used freely from parallel workers.
#[derive(Debug, Default, Clone, Copy)]
pub struct PotentialEngine;

impl PotentialEngine {
    /// Create an engine handle, initializing the quadrature tables.
    pub fn new() -> Self {
        lazy_static::initialize(&TRIANGLE_RULES);
        lazy_static::initialize(&INTERVAL_RULES);
        Self
    }
}

/// Inverse hyperbolic tangent, used by the corner-potential closed
/// forms.
pub(crate) fn artanh(x: f64) -> f64 {
    0.5 * ((1.0 + x) / (1.0 - x)).ln()
}
