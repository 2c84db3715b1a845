//! Capbem
//!
//! Boundary element capacitance extraction: adaptive hierarchical
//! panel/segment refinement and analytic/numerical computation of
//! electrostatic potential influence coefficients.
#![cfg_attr(feature = "strict", deny(warnings))]
#![warn(missing_docs)]

#[macro_use]
extern crate lazy_static;

pub mod assembly;
pub mod conductor;
pub mod element;
pub mod geometry;
pub mod potential;
pub mod quadrature;
pub mod shapes;
pub mod types;
