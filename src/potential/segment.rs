//! Potential and field integrals over 2D segments.
//!
//! The 2D free-space Green's function is -ln R; as in the 3D case the
//! physical 1/(2 pi e0) scaling is applied by the consumer, and
//! point-evaluation results are per unit total charge (the raw integral
//! divided by the source length).

use crate::element::Segment;
use crate::geometry::{dot2, normalize2};
use crate::potential::{PotentialEngine, DIFF_STEP};
use crate::quadrature::simplex_rules::interval_rule;
use crate::types::{Error, Result, EPS_NORMAL};

impl PotentialEngine {
    /// Analytic self-potential coefficient of a segment: the average
    /// over the segment of its own unit-total-charge potential,
    /// 3/2 - ln L in closed form.
    pub fn auto_segment(&self, segment: &Segment) -> Result<f64> {
        let len = segment.length();
        if len <= EPS_NORMAL {
            return Err(Error::DegenerateGeometry(format!(
                "zero-length segment {segment}"
            )));
        }
        Ok(1.5 - len.ln())
    }

    /// Potential at an arbitrary point for unit total charge, via the
    /// log/atan closed form in the segment-aligned frame.
    ///
    /// The formula degenerates gracefully: evaluation exactly at an
    /// endpoint takes the direct limit of the vanishing log term, and
    /// the arctangent term near the segment's extension uses the signed
    /// half-pi limit instead of dividing by a numerically zero offset.
    pub fn potential_opt_segment(&self, segment: &Segment, point: &[f64; 2]) -> Result<f64> {
        let frame = LocalFrame::new(segment)?;
        let (x, y) = frame.local(point);
        let len = frame.len;
        let half = len / 2.0;
        let tiny = EPS_NORMAL * len;

        let u1 = -half - x;
        let u2 = half - x;
        let rho1_sq = u1 * u1 + y * y;
        let rho2_sq = u2 * u2 + y * y;

        let mut total = len;
        if rho2_sq > tiny * tiny {
            total -= 0.5 * u2 * rho2_sq.ln();
        }
        if rho1_sq > tiny * tiny {
            total += 0.5 * u1 * rho1_sq.ln();
        }
        if y.abs() > tiny {
            total -= y * ((u2 / y).atan() - (u1 / y).atan());
        }
        Ok(total / len)
    }

    /// Electric field component along `direction` at a point, for unit
    /// total charge, via the closed-form in-frame field
    /// (Ex = ln(R1/R2), Ey = the arctangent difference).
    ///
    /// The field is singular at the segment endpoints; evaluation there
    /// is rejected as degenerate.
    pub fn en_field_segment(
        &self,
        segment: &Segment,
        point: &[f64; 2],
        direction: &[f64; 2],
    ) -> Result<f64> {
        let frame = LocalFrame::new(segment)?;
        let (x, y) = frame.local(point);
        let len = frame.len;
        let half = len / 2.0;
        let tiny = EPS_NORMAL * len;

        let u1 = -half - x;
        let u2 = half - x;
        let rho1_sq = u1 * u1 + y * y;
        let rho2_sq = u2 * u2 + y * y;
        if rho1_sq <= tiny * tiny || rho2_sq <= tiny * tiny {
            return Err(Error::DegenerateGeometry(format!(
                "field evaluation at an endpoint of segment {segment}"
            )));
        }

        let ex = 0.5 * (rho1_sq / rho2_sq).ln();
        let ey = atan_guard(u2, y, tiny) - atan_guard(u1, y, tiny);

        let e_global = [
            ex * frame.tangent[0] + ey * frame.normal[0],
            ex * frame.tangent[1] + ey * frame.normal[1],
        ];
        Ok(dot2(&e_global, direction) / len)
    }

    /// Mutual potential coefficient between segments: Gauss-Legendre
    /// outer quadrature over the field segment of the exact analytic
    /// source potential. Same flag semantics as the panel variant.
    pub fn mutual_half_numerical_segment(
        &self,
        field: &Segment,
        source: &Segment,
        order: usize,
        divide_by_length: bool,
    ) -> Result<f64> {
        let rule = interval_rule(order)?;
        let frame = LocalFrame::new(field)?;
        let half = frame.len / 2.0;
        let mut acc = 0.0;
        for k in 0..rule.order {
            let point = frame.global(half * rule.points[k]);
            acc += 0.5 * rule.weights[k] * self.potential_opt_segment(source, &point)?;
        }
        Ok(if divide_by_length {
            acc
        } else {
            acc * frame.len
        })
    }

    /// Mutual normal electric field coefficient between segments, by
    /// centered finite differences of the analytic potential along the
    /// field segment's orientation-signed normal.
    pub fn mutual_en_field_segment(
        &self,
        field: &Segment,
        source: &Segment,
        order: usize,
        divide_by_length: bool,
    ) -> Result<f64> {
        let rule = interval_rule(order)?;
        let frame = LocalFrame::new(field)?;
        let half = frame.len / 2.0;
        let mut normal = field.signed_normal();
        if normalize2(&mut normal) <= EPS_NORMAL {
            return Err(Error::DegenerateGeometry(format!(
                "zero normal on field segment {field}"
            )));
        }
        let h = DIFF_STEP * frame.len;
        let mut acc = 0.0;
        for k in 0..rule.order {
            let point = frame.global(half * rule.points[k]);
            let above = [point[0] + h * normal[0], point[1] + h * normal[1]];
            let below = [point[0] - h * normal[0], point[1] - h * normal[1]];
            let slope = (self.potential_opt_segment(source, &above)?
                - self.potential_opt_segment(source, &below)?)
                / (2.0 * h);
            acc += 0.5 * rule.weights[k] * slope;
        }
        let en = -acc;
        Ok(if divide_by_length {
            en
        } else {
            en * frame.len
        })
    }
}

/// Segment-aligned frame: origin at the midpoint, x along the segment.
struct LocalFrame {
    origin: [f64; 2],
    tangent: [f64; 2],
    normal: [f64; 2],
    len: f64,
}

impl LocalFrame {
    fn new(segment: &Segment) -> Result<Self> {
        let len = segment.length();
        if len <= EPS_NORMAL {
            return Err(Error::DegenerateGeometry(format!(
                "zero-length segment {segment}"
            )));
        }
        let v = segment.vertices();
        let tangent = [(v[1][0] - v[0][0]) / len, (v[1][1] - v[0][1]) / len];
        Ok(Self {
            origin: *segment.centroid(),
            tangent,
            normal: [-tangent[1], tangent[0]],
            len,
        })
    }

    fn local(&self, point: &[f64; 2]) -> (f64, f64) {
        let rel = [point[0] - self.origin[0], point[1] - self.origin[1]];
        (dot2(&rel, &self.tangent), dot2(&rel, &self.normal))
    }

    fn global(&self, x: f64) -> [f64; 2] {
        [
            self.origin[0] + x * self.tangent[0],
            self.origin[1] + x * self.tangent[1],
        ]
    }
}

/// atan(u / y) with the signed half-pi limit when y is numerically
/// zero, avoiding the branch discontinuity of dividing by a vanishing
/// offset on the segment's extension.
fn atan_guard(u: f64, y: f64, tiny: f64) -> f64 {
    if y.abs() > tiny {
        (u / y).atan()
    } else if u.abs() <= tiny {
        0.0
    } else {
        std::f64::consts::FRAC_PI_2.copysign(u)
    }
}
