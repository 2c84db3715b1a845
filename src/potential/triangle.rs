//! Potential and field integrals over flat triangular panels.

use crate::element::{Panel, QuadPanel};
use crate::geometry::{
    add3, cross3, dist3, dot3, newell_normal, norm3, normalize3, scale3, sub3,
};
use crate::potential::{artanh, PotentialEngine, DIFF_STEP, EPS_PROJECTION, QUAD_RULE};
use crate::quadrature::simplex_rules::triangle_rule;
use crate::types::{Error, Result, EPS_GEOM, EPS_NORMAL};

impl PotentialEngine {
    /// Analytic self-potential coefficient of a panel: the exact
    /// in-plane potential at the centroid for unit total charge.
    pub fn auto(&self, panel: &Panel) -> Result<f64> {
        Ok(single_layer(panel.vertices(), panel.centroid())? / panel.area())
    }

    /// Potential at vertex `corner` of the panel for unit total charge,
    /// via the angle-based closed form.
    pub fn corner_potential(&self, panel: &Panel, corner: usize) -> Result<f64> {
        let v = panel.vertices();
        let raw = corner_potential_raw(&v[corner], &v[(corner + 1) % 3], &v[(corner + 2) % 3])?;
        Ok(raw / panel.area())
    }

    /// Potential at a point on the panel (vertex, edge or interior) for
    /// unit total charge.
    ///
    /// Classifies the evaluation point and decomposes the panel into
    /// one, two or three corner sub-triangles whose closed-form
    /// contributions are summed and divided by the total area.
    pub fn inside_potential(&self, panel: &Panel, point: &[f64; 3]) -> Result<f64> {
        let v = panel.vertices();
        let tol = EPS_GEOM * panel.max_side_len();

        // At a vertex: the whole panel is one corner triangle.
        for i in 0..3 {
            if dist3(point, &v[i]) <= tol {
                let raw = corner_potential_raw(&v[i], &v[(i + 1) % 3], &v[(i + 2) % 3])?;
                return Ok(raw / panel.area());
            }
        }

        // On an edge: two sub-triangles against the opposite vertex.
        for i in 0..3 {
            let a = &v[i];
            let b = &v[(i + 1) % 3];
            let opposite = &v[(i + 2) % 3];
            let edge = sub3(b, a);
            let len = norm3(&edge);
            let rel = sub3(point, a);
            let along = dot3(&rel, &edge);
            if norm3(&cross3(&rel, &edge)) <= tol * len && along >= 0.0 && along <= len * len {
                let first = corner_potential_raw(point, b, opposite)?;
                let second = corner_potential_raw(point, opposite, a)?;
                return Ok((first + second) / panel.area());
            }
        }

        // Interior: three sub-triangles, one per edge.
        let mut total = 0.0;
        for i in 0..3 {
            total += corner_potential_raw(point, &v[i], &v[(i + 1) % 3])?;
        }
        Ok(total / panel.area())
    }

    /// Potential at an arbitrary point for unit total charge,
    /// dispatching between the on-panel corner decomposition and the
    /// exterior edge-sum formula.
    pub fn potential(&self, panel: &Panel, point: &[f64; 3]) -> Result<f64> {
        let v = panel.vertices();
        let tol = EPS_GEOM * panel.max_side_len();
        // Super panels carry a weighted, non-unit normal.
        let mut normal = *panel.normal();
        if normalize3(&mut normal) <= EPS_NORMAL {
            return Err(Error::DegenerateGeometry(format!(
                "zero normal on panel {panel}"
            )));
        }
        let height = dot3(&sub3(point, &v[0]), &normal);
        if height.abs() <= tol {
            let projected = sub3(point, &scale3(&normal, height));
            if point_in_triangle(v, &projected, &normal, tol) {
                return self.inside_potential(panel, &projected);
            }
        }
        self.potential_opt(panel, point)
    }

    /// Potential at an arbitrary (possibly exterior) point for unit
    /// total charge via the per-edge log/atan closed form.
    pub fn potential_opt(&self, panel: &Panel, point: &[f64; 3]) -> Result<f64> {
        Ok(single_layer(panel.vertices(), point)? / panel.area())
    }

    /// Self-potential by outer quadrature of the exact on-panel
    /// potential; converges to the Galerkin double integral with rule
    /// order.
    pub fn auto_numerical(&self, panel: &Panel, rule_index: usize) -> Result<f64> {
        let rule = triangle_rule(rule_index)?;
        let v = panel.vertices();
        let mut acc = 0.0;
        for k in 0..rule.order {
            let x = map_point(v, rule.points[2 * k], rule.points[2 * k + 1]);
            acc += rule.weights[k] * self.inside_potential(panel, &x)?;
        }
        Ok(acc)
    }

    /// Potential at a point by direct quadrature of the 1/R kernel over
    /// the panel. With `divide_by_area` the result is per unit total
    /// charge; otherwise it is the raw integral.
    pub fn potential_numerical(
        &self,
        panel: &Panel,
        point: &[f64; 3],
        rule_index: usize,
        divide_by_area: bool,
    ) -> Result<f64> {
        let rule = triangle_rule(rule_index)?;
        let v = panel.vertices();
        let near = EPS_NORMAL * panel.max_side_len();
        let mut acc = 0.0;
        for k in 0..rule.order {
            let x = map_point(v, rule.points[2 * k], rule.points[2 * k + 1]);
            let r = dist3(point, &x);
            if r <= near {
                return Err(Error::DegenerateGeometry(format!(
                    "evaluation point ({}, {}, {}) coincides with a quadrature node",
                    point[0], point[1], point[2]
                )));
            }
            acc += rule.weights[k] / r;
        }
        let raw = acc * panel.area();
        Ok(if divide_by_area { acc } else { raw })
    }

    /// Electric field component along `direction` at a point, by direct
    /// quadrature of the (r - r')/R^3 kernel over the panel.
    pub fn en_field_numerical(
        &self,
        panel: &Panel,
        point: &[f64; 3],
        direction: &[f64; 3],
        rule_index: usize,
        divide_by_area: bool,
    ) -> Result<f64> {
        let rule = triangle_rule(rule_index)?;
        let v = panel.vertices();
        let near = EPS_NORMAL * panel.max_side_len();
        let mut acc = 0.0;
        for k in 0..rule.order {
            let x = map_point(v, rule.points[2 * k], rule.points[2 * k + 1]);
            let diff = sub3(point, &x);
            let r = norm3(&diff);
            if r <= near {
                return Err(Error::DegenerateGeometry(format!(
                    "evaluation point ({}, {}, {}) coincides with a quadrature node",
                    point[0], point[1], point[2]
                )));
            }
            acc += rule.weights[k] * dot3(&diff, direction) / (r * r * r);
        }
        let raw = acc * panel.area();
        Ok(if divide_by_area { acc } else { raw })
    }

    /// Mutual potential coefficient: outer quadrature over the field
    /// panel of the exact analytic source potential.
    ///
    /// With `divide_by_area` false the result times the source area is
    /// symmetric in the two panels (Green's function reciprocity); with
    /// the flag set it is the fully averaged coefficient.
    pub fn mutual_half_numerical(
        &self,
        field: &Panel,
        source: &Panel,
        rule_index: usize,
        divide_by_area: bool,
    ) -> Result<f64> {
        let rule = triangle_rule(rule_index)?;
        let v = field.vertices();
        let mut acc = 0.0;
        for k in 0..rule.order {
            let x = map_point(v, rule.points[2 * k], rule.points[2 * k + 1]);
            acc += rule.weights[k] * self.potential(source, &x)?;
        }
        Ok(if divide_by_area {
            acc
        } else {
            acc * field.area()
        })
    }

    /// Mutual potential coefficient with both integrals numerical; the
    /// single rule index replaces the historical per-order variants.
    pub fn mutual_full_numerical(
        &self,
        field: &Panel,
        source: &Panel,
        rule_index: usize,
        divide_by_area: bool,
    ) -> Result<f64> {
        let rule = triangle_rule(rule_index)?;
        let fv = field.vertices();
        let sv = source.vertices();
        let near = EPS_NORMAL * field.max_side_len().max(source.max_side_len());
        let mut acc = 0.0;
        for k in 0..rule.order {
            let x = map_point(fv, rule.points[2 * k], rule.points[2 * k + 1]);
            for l in 0..rule.order {
                let y = map_point(sv, rule.points[2 * l], rule.points[2 * l + 1]);
                let r = dist3(&x, &y);
                if r <= near {
                    return Err(Error::DegenerateGeometry(
                        "full-numerical quadrature nodes coincide; panels touch or overlap"
                            .to_string(),
                    ));
                }
                acc += rule.weights[k] * rule.weights[l] / r;
            }
        }
        Ok(if divide_by_area {
            acc
        } else {
            acc * field.area()
        })
    }

    /// Mutual normal electric field coefficient, by centered finite
    /// differences of the analytic potential along the field panel's
    /// orientation-signed normal. Positive values point along that
    /// normal.
    pub fn mutual_en_field_numerical(
        &self,
        field: &Panel,
        source: &Panel,
        rule_index: usize,
        divide_by_area: bool,
    ) -> Result<f64> {
        let rule = triangle_rule(rule_index)?;
        let v = field.vertices();
        let mut normal = field.signed_normal();
        if normalize3(&mut normal) <= EPS_NORMAL {
            return Err(Error::DegenerateGeometry(format!(
                "zero normal on field panel {field}"
            )));
        }
        let h = DIFF_STEP * field.area().sqrt();
        let mut acc = 0.0;
        for k in 0..rule.order {
            let x = map_point(v, rule.points[2 * k], rule.points[2 * k + 1]);
            let above = add3(&x, &scale3(&normal, h));
            let below = sub3(&x, &scale3(&normal, h));
            let slope =
                (self.potential(source, &above)? - self.potential(source, &below)?) / (2.0 * h);
            acc += rule.weights[k] * slope;
        }
        let en = -acc;
        Ok(if divide_by_area { en } else { en * field.area() })
    }

    /// Self-potential coefficient of a quadrilateral panel, decomposed
    /// into two triangles.
    pub fn q_auto(&self, quad: &QuadPanel) -> Result<f64> {
        let [first, second] = quad.split()?;
        let a1 = first.area();
        let a2 = second.area();
        let p11 = self.auto(&first)?;
        let p22 = self.auto(&second)?;
        let p12 = self.mutual_half_numerical(&first, &second, QUAD_RULE, true)?;
        let p21 = self.mutual_half_numerical(&second, &first, QUAD_RULE, true)?;
        let total = a1 + a2;
        Ok((a1 * a1 * p11 + a2 * a2 * p22 + a1 * a2 * (p12 + p21)) / (total * total))
    }

    /// Mutual potential coefficient between two quadrilateral panels,
    /// each decomposed into two triangles, using the high-order
    /// half-numerical rule.
    pub fn q_mutual_half_numerical(
        &self,
        field: &QuadPanel,
        source: &QuadPanel,
        divide_by_area: bool,
    ) -> Result<f64> {
        let field_halves = field.split()?;
        let source_halves = source.split()?;
        let mut raw = 0.0;
        for f in &field_halves {
            for s in &source_halves {
                let m = self.mutual_half_numerical(f, s, QUAD_RULE, true)?;
                raw += m * f.area() * s.area();
            }
        }
        let per_unit_source = raw / source.area();
        Ok(if divide_by_area {
            per_unit_source / field.area()
        } else {
            per_unit_source
        })
    }
}

/// Map a reference-triangle point into the physical triangle.
fn map_point(v: &[[f64; 3]; 3], xi: f64, eta: f64) -> [f64; 3] {
    let e1 = sub3(&v[1], &v[0]);
    let e2 = sub3(&v[2], &v[0]);
    add3(&v[0], &add3(&scale3(&e1, xi), &scale3(&e2, eta)))
}

/// Raw integral of 1/R over the triangle, evaluated at an arbitrary
/// point via the per-edge log/atan closed form.
///
/// An edge whose supporting line contains the projection of the
/// observation point is suppressed outright: its contribution's exact
/// limit is zero, and skipping it avoids the cancellation blow-up near
/// the singular configuration.
pub(crate) fn single_layer(vertices: &[[f64; 3]; 3], point: &[f64; 3]) -> Result<f64> {
    let raw_normal = newell_normal(vertices);
    let twice_area = norm3(&raw_normal);
    if twice_area <= EPS_NORMAL {
        return Err(Error::DegenerateGeometry(
            "zero-area panel in potential evaluation".to_string(),
        ));
    }
    let unit_normal = scale3(&raw_normal, 1.0 / twice_area);

    let height = dot3(&sub3(point, &vertices[0]), &unit_normal);
    let abs_height = height.abs();
    let projection = sub3(point, &scale3(&unit_normal, height));

    let mut total = 0.0;
    for i in 0..3 {
        let a = &vertices[i];
        let b = &vertices[(i + 1) % 3];
        let edge = sub3(b, a);
        let len = norm3(&edge);
        if len <= EPS_NORMAL {
            continue;
        }
        let s_hat = scale3(&edge, 1.0 / len);
        // Outward in-plane edge normal under the winding convention.
        let u_hat = cross3(&s_hat, &unit_normal);

        let s_minus = dot3(&sub3(a, &projection), &s_hat);
        let s_plus = dot3(&sub3(b, &projection), &s_hat);
        let t0 = dot3(&sub3(a, &projection), &u_hat);

        let s_max = s_minus.abs().max(s_plus.abs());
        if s_max <= EPS_NORMAL || t0.abs() <= EPS_PROJECTION * s_max {
            continue;
        }

        let r_minus = dist3(point, a);
        let r_plus = dist3(point, b);
        let r0_sq = t0 * t0 + height * height;

        // R + s cancels catastrophically for negative s of magnitude
        // close to R; the conjugate form R + s = r0^2 / (R - s) is exact
        // and stable there.
        let upper = if s_plus > 0.0 {
            r_plus + s_plus
        } else {
            r0_sq / (r_plus - s_plus)
        };
        let lower = if s_minus > 0.0 {
            r_minus + s_minus
        } else {
            r0_sq / (r_minus - s_minus)
        };
        let log_term = (upper / lower).ln();
        let atan_plus = (t0 * s_plus / (r0_sq + abs_height * r_plus)).atan();
        let atan_minus = (t0 * s_minus / (r0_sq + abs_height * r_minus)).atan();

        total += t0 * log_term - abs_height * (atan_plus - atan_minus);
    }
    Ok(total)
}

/// Raw integral of 1/R over the triangle (p0, p1, p2) with the
/// evaluation point at p0 (Rangogni-style corner potential).
///
/// Parameterized by the perpendicular distance to the opposite side and
/// the corner/foot angles; unlike a slope parameterization this form has
/// no pole when the opposite side is at 90 degrees, so no clamping is
/// needed. The inverse-tanh arguments reach one only for collinear
/// vertices, which are reported as degenerate.
pub(crate) fn corner_potential_raw(
    p0: &[f64; 3],
    p1: &[f64; 3],
    p2: &[f64; 3],
) -> Result<f64> {
    let e1 = sub3(p1, p0);
    let c = norm3(&e1);
    let e2 = sub3(p2, p0);
    let b = norm3(&e2);
    if c <= EPS_NORMAL || b <= EPS_NORMAL {
        return Err(Error::DegenerateGeometry(
            "zero-length side at corner".to_string(),
        ));
    }
    let twice_area = norm3(&cross3(&e1, &e2));
    if twice_area <= EPS_NORMAL * b * c {
        // A flat sliver carries no area and contributes nothing.
        return Ok(0.0);
    }
    let a = dist3(p1, p2);
    let distance = twice_area / a;

    // Corner-local frame: x along p0 -> p1, p2 in the upper half plane.
    let x_hat = scale3(&e1, 1.0 / c);
    let x2 = dot3(&e2, &x_hat);
    let y2 = twice_area / c;

    let alpha = y2.atan2(x2);
    // Angle of the perpendicular from the corner to the opposite side.
    let beta = (c - x2).atan2(y2);

    let sin_upper = (alpha - beta).sin();
    let sin_lower = beta.sin();
    if sin_upper.abs() >= 1.0 - EPS_NORMAL || sin_lower.abs() >= 1.0 - EPS_NORMAL {
        return Err(Error::DegenerateGeometry(
            "grazing corner geometry".to_string(),
        ));
    }
    Ok(distance * (artanh(sin_upper) + artanh(sin_lower)))
}

/// Tolerant point-in-triangle test for a point already projected into
/// the panel plane.
fn point_in_triangle(
    vertices: &[[f64; 3]; 3],
    point: &[f64; 3],
    normal: &[f64; 3],
    tol: f64,
) -> bool {
    for i in 0..3 {
        let a = &vertices[i];
        let b = &vertices[(i + 1) % 3];
        let edge = sub3(b, a);
        let len = norm3(&edge);
        if len <= EPS_NORMAL {
            continue;
        }
        let rel = sub3(point, a);
        // Signed in-plane distance from the edge, positive inside.
        if dot3(&cross3(&edge, &rel), normal) / len < -tol {
            return false;
        }
    }
    true
}
