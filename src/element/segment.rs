//! 2D segments and their refinement tree.

use std::fmt;

use crate::element::ElementData;
use crate::geometry::{norm2, normalize2};
use crate::types::{Context, Error, Refinement, Result, EPS_NORMAL};

/// A straight 2D segment, the 1D analogue of a panel.
///
/// The normal is the segment tangent rotated 90 degrees
/// counter-clockwise; a clockwise traversal of a closed contour puts
/// the normals outward.
#[derive(Debug, Clone)]
pub struct Segment {
    vertices: [[f64; 2]; 2],
    normal: [f64; 2],
    centroid: [f64; 2],
    length: f64,
    /// Physical and link bookkeeping state.
    pub data: ElementData,
    children: Option<Box<[Segment; 2]>>,
}

impl Segment {
    /// Create a leaf segment from its endpoints.
    ///
    /// Rejects degenerate (near-zero-length) segments.
    pub fn new(vertices: [[f64; 2]; 2], data: ElementData) -> Result<Self> {
        let mut segment = Self {
            vertices,
            normal: [0.0; 2],
            centroid: [0.0; 2],
            length: 0.0,
            data,
            children: None,
        };
        segment.calc_geom_par()?;
        Ok(segment)
    }

    /// True iff this segment has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Endpoint coordinates.
    pub fn vertices(&self) -> &[[f64; 2]; 2] {
        &self.vertices
    }

    /// Unit normal for leaves; length-weighted, possibly non-unit, for
    /// super segments.
    pub fn normal(&self) -> &[f64; 2] {
        &self.normal
    }

    /// Segment midpoint.
    pub fn centroid(&self) -> &[f64; 2] {
        &self.centroid
    }

    /// Segment length (sum of the children's lengths for super
    /// segments).
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Children of a super segment.
    pub fn children(&self) -> Option<&[Segment; 2]> {
        self.children.as_deref()
    }

    /// Mutable access to the children.
    pub fn children_mut(&mut self) -> Option<&mut [Segment; 2]> {
        self.children.as_deref_mut()
    }

    /// The orientation-signed normal; see the panel counterpart.
    pub fn signed_normal(&self) -> [f64; 2] {
        if self.data.dielectric && !self.data.outward_normal {
            [-self.normal[0], -self.normal[1]]
        } else {
            self.normal
        }
    }

    /// Compute length, normal and centroid from the endpoints.
    pub fn calc_geom_par(&mut self) -> Result<()> {
        let dx = self.vertices[1][0] - self.vertices[0][0];
        let dy = self.vertices[1][1] - self.vertices[0][1];
        let length = (dx * dx + dy * dy).sqrt();
        if length <= EPS_NORMAL {
            return Err(Error::DegenerateGeometry(format!(
                "zero-length segment {self}"
            )));
        }
        self.length = length;
        self.normal = [-dy / length, dx / length];
        self.centroid = [
            0.5 * (self.vertices[0][0] + self.vertices[1][0]),
            0.5 * (self.vertices[0][1] + self.vertices[1][1]),
        ];
        Ok(())
    }

    /// Build a super segment aggregating two children; the 2D mirror of
    /// the panel merge, with lengths in place of areas.
    pub fn make_super_segment(left: Segment, right: Segment) -> Segment {
        if left.data.dielectric != right.data.dielectric {
            log::error!(
                "dielectric type mismatch merging segment {left} with segment {right}"
            );
        }
        let dielectric = left.data.dielectric && right.data.dielectric;

        let length = left.length + right.length;
        let centroid = [
            (left.centroid[0] * left.length + right.centroid[0] * right.length) / length,
            (left.centroid[1] * left.length + right.centroid[1] * right.length) / length,
        ];

        let ln = left.signed_normal();
        let rn = right.signed_normal();
        let mut normal = [
            (ln[0] * left.length + rn[0] * right.length) / length,
            (ln[1] * left.length + rn[1] * right.length) / length,
        ];
        if norm2(&normal) < EPS_NORMAL {
            normal = degenerate_normal_fallback(&left, &right, length);
        }

        // Synthetic straight segment of the aggregate length through the
        // centroid, tangent consistent with the normal convention.
        let mut unit_normal = normal;
        normalize2(&mut unit_normal);
        let tangent = [unit_normal[1], -unit_normal[0]];
        let half = length / 2.0;
        let vertices = [
            [
                centroid[0] - tangent[0] * half,
                centroid[1] - tangent[1] * half,
            ],
            [
                centroid[0] + tangent[0] * half,
                centroid[1] + tangent[1] * half,
            ],
        ];

        let data = ElementData {
            dielectric,
            outward_normal: dielectric,
            dielectric_index: left.data.dielectric_index,
            ..ElementData::default()
        };

        Segment {
            vertices,
            normal,
            centroid,
            length,
            data,
            children: Some(Box::new([left, right])),
        }
    }

    /// Split a leaf at its midpoint.
    ///
    /// Checks the cancellation token before doing any work; both halves
    /// carry exactly half the parent's length.
    pub fn subdivide(&mut self, ctx: &Context) -> Result<Refinement> {
        if ctx.cancel.is_cancelled() {
            return Ok(Refinement::Interrupted);
        }
        if !self.is_leaf() {
            return Err(Error::NotALeaf);
        }

        let mid = [
            0.5 * (self.vertices[0][0] + self.vertices[1][0]),
            0.5 * (self.vertices[0][1] + self.vertices[1][1]),
        ];
        let data = ElementData {
            links: Default::default(),
            ..self.data.clone()
        };
        let mut first = Segment::new([self.vertices[0], mid], data.clone())?;
        let mut second = Segment::new([mid, self.vertices[1]], data)?;
        first.length = self.length / 2.0;
        second.length = self.length / 2.0;

        self.children = Some(Box::new([first, second]));
        Ok(Refinement::Subdivided)
    }

    /// Zero the per-hierarchy link bookkeeping over the subtree.
    pub fn reset_links_tree(&mut self) {
        self.data.reset_links();
        if let Some(children) = self.children.as_deref_mut() {
            for child in children.iter_mut() {
                child.reset_links_tree();
            }
        }
    }

    /// Uniformly scale the segment and its subtree about the origin.
    pub fn scale(&mut self, factor: f64) -> Result<()> {
        if factor <= 0.0 {
            return Err(Error::DegenerateGeometry(format!(
                "non-positive scale factor {factor}"
            )));
        }
        self.scale_unchecked(factor);
        Ok(())
    }

    fn scale_unchecked(&mut self, factor: f64) {
        for vertex in self.vertices.iter_mut() {
            vertex[0] *= factor;
            vertex[1] *= factor;
        }
        self.centroid[0] *= factor;
        self.centroid[1] *= factor;
        self.length *= factor;
        if let Some(children) = self.children.as_deref_mut() {
            for child in children.iter_mut() {
                child.scale_unchecked(factor);
            }
        }
    }

    /// Visit every leaf of the subtree rooted here.
    pub fn for_each_leaf<'a>(&'a self, visit: &mut impl FnMut(&'a Segment)) {
        match self.children.as_deref() {
            None => visit(self),
            Some(children) => {
                for child in children.iter() {
                    child.for_each_leaf(visit);
                }
            }
        }
    }

    /// Number of leaves in the subtree rooted here.
    pub fn leaf_count(&self) -> usize {
        let mut count = 0;
        self.for_each_leaf(&mut |_| count += 1);
        count
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[({}, {}) ({}, {})]",
            self.vertices[0][0], self.vertices[0][1], self.vertices[1][0], self.vertices[1][1],
        )
    }
}

impl Drop for Segment {
    // Explicit stack for the same reason as the panel teardown.
    fn drop(&mut self) {
        let mut stack = Vec::new();
        if let Some(children) = self.children.take() {
            stack.push(children);
        }
        while let Some(mut pair) = stack.pop() {
            for child in pair.iter_mut() {
                if let Some(grandchildren) = child.children.take() {
                    stack.push(grandchildren);
                }
            }
        }
    }
}

/// 2D fallback ladder for a cancelled super-segment normal.
fn degenerate_normal_fallback(left: &Segment, right: &Segment, length: f64) -> [f64; 2] {
    if norm2(&left.normal) > EPS_NORMAL {
        // Perpendicular of the left child's normal.
        let mut ortho = [-left.normal[1], left.normal[0]];
        normalize2(&mut ortho);
        return ortho;
    }
    let geometric = [
        (left.normal[0] * left.length + right.normal[0] * right.length) / length,
        (left.normal[1] * left.length + right.normal[1] * right.length) / length,
    ];
    if norm2(&geometric) >= EPS_NORMAL {
        return geometric;
    }
    [0.0, 1.0]
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_segment() -> Segment {
        Segment::new([[0.0, 0.0], [1.0, 0.0]], ElementData::conductor()).unwrap()
    }

    #[test]
    fn test_calc_geom_par() {
        let segment = unit_segment();
        assert_relative_eq!(segment.length(), 1.0);
        assert_relative_eq!(segment.centroid()[0], 0.5);
        // Tangent +x rotates counter-clockwise into normal +y.
        assert_relative_eq!(segment.normal()[0], 0.0);
        assert_relative_eq!(segment.normal()[1], 1.0);
    }

    #[test]
    fn test_degenerate_segment_rejected() {
        let result = Segment::new([[1.0, 1.0], [1.0, 1.0]], ElementData::conductor());
        assert!(matches!(result, Err(Error::DegenerateGeometry(_))));
    }

    #[test]
    fn test_subdivide() {
        let ctx = Context::new();
        let mut segment = Segment::new([[0.0, 0.0], [2.0, 2.0]], ElementData::conductor()).unwrap();
        let length = segment.length();
        assert_eq!(segment.subdivide(&ctx).unwrap(), Refinement::Subdivided);
        let children = segment.children().unwrap();
        assert_eq!(children[0].length(), length / 2.0);
        assert_eq!(children[1].length(), length / 2.0);
        assert_relative_eq!(children[0].vertices()[1][0], 1.0);
        assert_relative_eq!(children[1].vertices()[0][1], 1.0);

        ctx.cancel.cancel();
        let mut other = unit_segment();
        assert_eq!(other.subdivide(&ctx).unwrap(), Refinement::Interrupted);
        assert!(other.is_leaf());
    }

    #[test]
    fn test_make_super_segment() {
        let left = unit_segment();
        let right = Segment::new([[1.0, 0.0], [2.0, 0.0]], ElementData::conductor()).unwrap();
        let sup = Segment::make_super_segment(left, right);
        assert_relative_eq!(sup.length(), 2.0);
        assert_relative_eq!(sup.centroid()[0], 1.0);
        assert_relative_eq!(sup.normal()[1], 1.0);
        // Synthetic endpoints span the aggregate length through the
        // centroid.
        assert_relative_eq!(sup.vertices()[0][0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(sup.vertices()[1][0], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_make_super_segment_opposite_normals() {
        let left = unit_segment();
        let right = Segment::new([[1.0, 0.0], [0.0, 0.0]], ElementData::conductor()).unwrap();
        let sup = Segment::make_super_segment(left, right);
        // Cancelled average falls back to the perpendicular of the left
        // normal.
        assert!(norm2(sup.normal()) > EPS_NORMAL);
        assert_relative_eq!(sup.normal()[1], 0.0, epsilon = 1e-12);
    }

}
