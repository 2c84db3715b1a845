//! Dense potential-coefficient matrix assembly over leaf elements.
//!
//! This is the layer where kernel results become matrix entries for the
//! external linear solver: a distance-over-size precision ladder picks
//! the cheapest kernel variant that holds the target accuracy for each
//! pair, rows are computed in parallel (the kernels are pure and the
//! elements read-only), and the physical Green's-function scaling is
//! applied here, once, at the end.

use rayon::prelude::*;

use crate::element::{Panel, Segment};
use crate::geometry::{dist2, dist3};
use crate::potential::PotentialEngine;
use crate::types::{Result, FOUR_PI_E_ZERO, TWO_PI_E_ZERO};

/// Assembly tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct AssemblyOptions {
    /// Triangle quadrature rule index (or Gauss-Legendre order in 2D)
    /// for near interactions.
    pub rule: usize,
    /// Pairs closer than this multiple of their combined characteristic
    /// size use the half-numerical mutual kernel instead of centroid
    /// collocation.
    pub near_ratio: f64,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            rule: 13,
            near_ratio: 3.0,
        }
    }
}

/// Assemble the dense potential-coefficient matrix over leaf panels,
/// row-major, in SI units (the 1/(4 pi e0) scaling applied at the end).
///
/// Entry (i, j) is the potential averaged over panel i for unit total
/// charge on panel j: the analytic self term on the diagonal, the
/// half-numerical mutual for near pairs, centroid collocation for far
/// pairs.
pub fn assemble_panel_matrix(
    panels: &[&Panel],
    engine: &PotentialEngine,
    options: &AssemblyOptions,
) -> Result<Vec<f64>> {
    let n = panels.len();
    let rows: Result<Vec<Vec<f64>>> = (0..n)
        .into_par_iter()
        .map(|i| {
            let field = panels[i];
            let mut row = vec![0.0; n];
            for (j, source) in panels.iter().enumerate() {
                let entry = if i == j {
                    engine.auto(field)?
                } else if is_near_panel(field, source, options.near_ratio) {
                    engine.mutual_half_numerical(field, source, options.rule, true)?
                } else {
                    engine.potential(source, field.centroid())?
                };
                row[j] = entry / FOUR_PI_E_ZERO;
            }
            Ok(row)
        })
        .collect();
    Ok(rows?.into_iter().flatten().collect())
}

/// One normal-electric-field row for a dielectric interface panel,
/// in SI units; the external solver combines it with the permittivity
/// contrast.
pub fn assemble_en_field_row(
    field: &Panel,
    panels: &[&Panel],
    engine: &PotentialEngine,
    options: &AssemblyOptions,
) -> Result<Vec<f64>> {
    panels
        .par_iter()
        .map(|source| {
            let entry = if std::ptr::eq(*source, field) {
                // The principal-value self term is the solver's
                // business; the kernel row carries only the smooth part.
                0.0
            } else {
                engine.mutual_en_field_numerical(field, source, options.rule, true)?
            };
            Ok(entry / FOUR_PI_E_ZERO)
        })
        .collect()
}

/// 2D counterpart of [`assemble_panel_matrix`] over leaf segments, with
/// the 1/(2 pi e0) scaling of the 2D Green's function.
pub fn assemble_segment_matrix(
    segments: &[&Segment],
    engine: &PotentialEngine,
    options: &AssemblyOptions,
) -> Result<Vec<f64>> {
    let n = segments.len();
    let order = options.rule.min(crate::quadrature::rule_definitions::MAX_INTERVAL_ORDER);
    let rows: Result<Vec<Vec<f64>>> = (0..n)
        .into_par_iter()
        .map(|i| {
            let field = segments[i];
            let mut row = vec![0.0; n];
            for (j, source) in segments.iter().enumerate() {
                let entry = if i == j {
                    engine.auto_segment(field)?
                } else if is_near_segment(field, source, options.near_ratio) {
                    engine.mutual_half_numerical_segment(field, source, order, true)?
                } else {
                    engine.potential_opt_segment(source, field.centroid())?
                };
                row[j] = entry / TWO_PI_E_ZERO;
            }
            Ok(row)
        })
        .collect();
    Ok(rows?.into_iter().flatten().collect())
}

fn is_near_panel(field: &Panel, source: &Panel, near_ratio: f64) -> bool {
    let size = field.area().sqrt() + source.area().sqrt();
    dist3(field.centroid(), source.centroid()) < near_ratio * size
}

fn is_near_segment(field: &Segment, source: &Segment, near_ratio: f64) -> bool {
    let size = field.length() + source.length();
    dist2(field.centroid(), source.centroid()) < near_ratio * size
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::element::ElementData;
    use crate::shapes;
    use approx::assert_relative_eq;

    #[test]
    fn test_panel_matrix_structure() {
        let engine = PotentialEngine::new();
        let triangles = shapes::plate(2, 2, 1.0);
        let panels: Vec<Panel> = triangles
            .into_iter()
            .map(|t| Panel::new(t, ElementData::conductor()).unwrap())
            .collect();
        let refs: Vec<&Panel> = panels.iter().collect();
        let matrix =
            assemble_panel_matrix(&refs, &engine, &AssemblyOptions::default()).unwrap();

        let n = refs.len();
        assert_eq!(matrix.len(), n * n);
        for i in 0..n {
            // The self coefficient dominates the row.
            for j in 0..n {
                assert!(matrix[i * n + j] > 0.0);
                if i != j {
                    assert!(matrix[i * n + i] > matrix[i * n + j]);
                }
            }
        }
        // Equal-area panels give a near-symmetric matrix.
        for i in 0..n {
            for j in 0..i {
                assert_relative_eq!(
                    matrix[i * n + j],
                    matrix[j * n + i],
                    max_relative = 1e-2
                );
            }
        }
    }

    #[test]
    fn test_segment_matrix_structure() {
        let engine = PotentialEngine::new();
        let sides = shapes::polygon_loop(8, 10.0);
        let segments: Vec<Segment> = sides
            .into_iter()
            .map(|s| Segment::new(s, ElementData::conductor()).unwrap())
            .collect();
        let refs: Vec<&Segment> = segments.iter().collect();
        let matrix =
            assemble_segment_matrix(&refs, &engine, &AssemblyOptions::default()).unwrap();

        let n = refs.len();
        assert_eq!(matrix.len(), n * n);
        // A regular polygon is circulant: every row is a rotation of the
        // first.
        for i in 1..n {
            for j in 0..n {
                assert_relative_eq!(
                    matrix[i * n + (j + i) % n],
                    matrix[j],
                    max_relative = 1e-6
                );
            }
        }
    }

    #[test]
    fn test_en_field_row() {
        let engine = PotentialEngine::new();
        let triangles = shapes::plate(2, 1, 1.0);
        let panels: Vec<Panel> = triangles
            .into_iter()
            .map(|t| Panel::new(t, ElementData::dielectric(0, true)).unwrap())
            .collect();
        let refs: Vec<&Panel> = panels.iter().collect();
        let row =
            assemble_en_field_row(refs[0], &refs, &engine, &AssemblyOptions::default()).unwrap();
        assert_eq!(row.len(), refs.len());
        assert_eq!(row[0], 0.0);
    }
}
