//! Triangular panels and their refinement tree.

use std::fmt;

use crate::element::ElementData;
use crate::geometry::{add3, cross3, dist3, dot3, newell_normal, norm3, normalize3, scale3, sub3};
use crate::types::{Context, Error, Refinement, Result, EPS_NORMAL};

/// A flat triangular panel.
///
/// A leaf panel is an atomic piece of conductor or dielectric surface; a
/// super panel aggregates two children and carries a synthetic
/// equilateral-triangle shape of matching area and centroid in place of a
/// true polygon boundary.
#[derive(Debug, Clone)]
pub struct Panel {
    vertices: [[f64; 3]; 3],
    normal: [f64; 3],
    centroid: [f64; 3],
    side_len: [f64; 3],
    max_side_index: usize,
    max_side_len: f64,
    area: f64,
    /// Physical and link bookkeeping state.
    pub data: ElementData,
    children: Option<Box<[Panel; 2]>>,
}

impl Panel {
    /// Create a leaf panel from its three vertices.
    ///
    /// Rejects degenerate (near-zero-area) triangles.
    pub fn new(vertices: [[f64; 3]; 3], data: ElementData) -> Result<Self> {
        let mut panel = Self {
            vertices,
            normal: [0.0; 3],
            centroid: [0.0; 3],
            side_len: [0.0; 3],
            max_side_index: 0,
            max_side_len: 0.0,
            area: 0.0,
            data,
            children: None,
        };
        panel.calc_geom_par()?;
        Ok(panel)
    }

    /// True iff this panel has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Vertex coordinates.
    pub fn vertices(&self) -> &[[f64; 3]; 3] {
        &self.vertices
    }

    /// Unit normal for leaves; area-weighted, possibly non-unit, for
    /// super panels.
    pub fn normal(&self) -> &[f64; 3] {
        &self.normal
    }

    /// Panel centroid.
    pub fn centroid(&self) -> &[f64; 3] {
        &self.centroid
    }

    /// Panel area (sum of the children's areas for super panels).
    pub fn area(&self) -> f64 {
        self.area
    }

    /// Side lengths, side `i` running from vertex `i` to vertex `i + 1`.
    pub fn side_len(&self) -> &[f64; 3] {
        &self.side_len
    }

    /// Index of the longest side.
    pub fn max_side_index(&self) -> usize {
        self.max_side_index
    }

    /// Length of the longest side.
    pub fn max_side_len(&self) -> f64 {
        self.max_side_len
    }

    /// Children of a super panel.
    pub fn children(&self) -> Option<&[Panel; 2]> {
        self.children.as_deref()
    }

    /// Mutable access to the children.
    pub fn children_mut(&mut self) -> Option<&mut [Panel; 2]> {
        self.children.as_deref_mut()
    }

    /// The panel's dielectric-orientation-signed normal: flipped when the
    /// outward flag of a dielectric element is not set, so that averaging
    /// over a dielectric interface keeps a consistent
    /// permittivity-transition orientation. Conductor normals are never
    /// flipped.
    pub fn signed_normal(&self) -> [f64; 3] {
        if self.data.dielectric && !self.data.outward_normal {
            scale3(&self.normal, -1.0)
        } else {
            self.normal
        }
    }

    /// Compute side lengths, normal, area, centroid and max-side
    /// bookkeeping from the vertices.
    ///
    /// Returns the cosine of the angle opposite the longest side (law of
    /// cosines); values close to +-1 flag a thin, nearly degenerate
    /// triangle to the refinement driver.
    pub fn calc_geom_par(&mut self) -> Result<f64> {
        let l0 = dist3(&self.vertices[0], &self.vertices[1]);
        let l1 = dist3(&self.vertices[1], &self.vertices[2]);
        let l2 = dist3(&self.vertices[2], &self.vertices[0]);
        self.side_len = [l0, l1, l2];

        let mag = self.calculate_normal();
        if mag <= EPS_NORMAL {
            return Err(Error::DegenerateGeometry(format!(
                "zero-area panel {self}"
            )));
        }
        // The Newell magnitude is twice the triangle area.
        self.area = mag / 2.0;

        self.centroid = scale3(
            &add3(&add3(&self.vertices[0], &self.vertices[1]), &self.vertices[2]),
            1.0 / 3.0,
        );

        self.max_side(l0, l1, l2);

        // Law of cosines for the angle opposite the longest side.
        let c = self.max_side_len;
        let (a, b) = match self.max_side_index {
            0 => (l1, l2),
            1 => (l2, l0),
            _ => (l0, l1),
        };
        if a <= EPS_NORMAL || b <= EPS_NORMAL {
            return Err(Error::DegenerateGeometry(format!(
                "zero-length side in panel {self}"
            )));
        }
        Ok((a * a + b * b - c * c) / (2.0 * a * b))
    }

    /// Newell's method. Stores the normalized normal (left untouched when
    /// the magnitude is below the degeneracy guard) and returns the
    /// pre-normalization magnitude, which equals twice the panel area.
    pub fn calculate_normal(&mut self) -> f64 {
        self.normal = newell_normal(&self.vertices);
        normalize3(&mut self.normal)
    }

    /// Record the longest side's index and length; ties are resolved to
    /// the lowest index. Returns the index of the shortest side under the
    /// same tie-break.
    pub fn max_side(&mut self, l0: f64, l1: f64, l2: f64) -> usize {
        let lengths = [l0, l1, l2];
        let mut max_index = 0;
        let mut min_index = 0;
        for (i, &l) in lengths.iter().enumerate() {
            if l > lengths[max_index] {
                max_index = i;
            }
            if l < lengths[min_index] {
                min_index = i;
            }
        }
        self.max_side_index = max_index;
        self.max_side_len = lengths[max_index];
        min_index
    }

    /// Build a super panel aggregating two children.
    ///
    /// The children must agree on the dielectric flag; a mismatch is
    /// reported through the error log and processing continues with the
    /// conjunction as best-guess type. The super normal is the
    /// area-weighted average of the children's orientation-signed normals
    /// and is deliberately left unnormalized so that further levels of
    /// aggregation stay correctly weighted.
    pub fn make_super_panel(left: Panel, right: Panel) -> Panel {
        if left.data.dielectric != right.data.dielectric {
            log::error!(
                "dielectric type mismatch merging panel {left} with panel {right}"
            );
        }
        let dielectric = left.data.dielectric && right.data.dielectric;

        let area = left.area + right.area;
        let centroid = scale3(
            &add3(
                &scale3(&left.centroid, left.area),
                &scale3(&right.centroid, right.area),
            ),
            1.0 / area,
        );

        let mut normal = scale3(
            &add3(
                &scale3(&left.signed_normal(), left.area),
                &scale3(&right.signed_normal(), right.area),
            ),
            1.0 / area,
        );
        if norm3(&normal) < EPS_NORMAL {
            // Opposite-pointing child normals cancelled out.
            normal = degenerate_normal_fallback(&left, &right, area);
        }

        // Reference direction toward the smaller child, used to orient
        // the synthetic equilateral shape.
        let small = if left.area <= right.area { &left } else { &right };
        let mut cm_to_cs = sub3(&small.centroid, &centroid);
        if norm3(&cross3(&cm_to_cs, &normal)) < EPS_NORMAL {
            // Parallel to the normal (or zero): substitute a direction
            // rotated 45 degrees about z, then fall back to an orthogonal
            // pivot solve for normals along z.
            let c45 = std::f64::consts::FRAC_1_SQRT_2;
            cm_to_cs = [
                c45 * (normal[0] - normal[1]),
                c45 * (normal[0] + normal[1]),
                normal[2],
            ];
            if norm3(&cross3(&cm_to_cs, &normal)) < EPS_NORMAL {
                cm_to_cs = orthogonal_to(&normal).unwrap_or([1.0, 0.0, 0.0]);
            }
        }

        let mut unit_normal = normal;
        normalize3(&mut unit_normal);
        // In-plane component of the reference direction.
        let mut u = sub3(&cm_to_cs, &scale3(&unit_normal, dot3(&cm_to_cs, &unit_normal)));
        normalize3(&mut u);
        let w = cross3(&unit_normal, &u);

        // Equilateral triangle of the aggregate area on a circle around
        // the centroid, wound consistently with the normal.
        let radius = (4.0 * area / (3.0 * 3.0_f64.sqrt())).sqrt();
        let mut vertices = [[0.0; 3]; 3];
        for (k, vertex) in vertices.iter_mut().enumerate() {
            let theta = 2.0 * std::f64::consts::PI * k as f64 / 3.0;
            let dir = add3(
                &scale3(&u, theta.cos() * radius),
                &scale3(&w, theta.sin() * radius),
            );
            *vertex = add3(&centroid, &dir);
        }
        let side = radius * 3.0_f64.sqrt();

        let data = ElementData {
            dielectric,
            outward_normal: dielectric,
            dielectric_index: left.data.dielectric_index,
            ..ElementData::default()
        };

        Panel {
            vertices,
            normal,
            centroid,
            side_len: [side; 3],
            max_side_index: 0,
            max_side_len: side,
            area,
            data,
            children: Some(Box::new([left, right])),
        }
    }

    /// Split a leaf at the midpoint of its longest side.
    ///
    /// Checks the cancellation token before doing any work and reports
    /// `Interrupted` without mutation if it is set. Both children are
    /// fully constructed before the parent is touched. Each child is
    /// assigned exactly half the parent's area: a midpoint split shares
    /// the base and height between the two sub-triangles, so the halving
    /// is exact, not an approximation.
    pub fn subdivide(&mut self, ctx: &Context) -> Result<Refinement> {
        if ctx.cancel.is_cancelled() {
            return Ok(Refinement::Interrupted);
        }
        if !self.is_leaf() {
            return Err(Error::NotALeaf);
        }

        let i = self.max_side_index;
        let j = (i + 1) % 3;
        let k = (i + 2) % 3;
        let mid = scale3(&add3(&self.vertices[i], &self.vertices[j]), 0.5);

        let data = ElementData {
            links: Default::default(),
            ..self.data.clone()
        };
        let mut first = Panel::new([self.vertices[i], mid, self.vertices[k]], data.clone())?;
        let mut second = Panel::new([mid, self.vertices[j], self.vertices[k]], data)?;
        first.area = self.area / 2.0;
        second.area = self.area / 2.0;

        self.children = Some(Box::new([first, second]));
        Ok(Refinement::Subdivided)
    }

    /// Zero the per-hierarchy link bookkeeping on this node and, for
    /// super panels, on every descendant. Run before re-assembling
    /// coefficients without rebuilding geometry.
    pub fn reset_links_tree(&mut self) {
        self.data.reset_links();
        if let Some(children) = self.children.as_deref_mut() {
            for child in children.iter_mut() {
                child.reset_links_tree();
            }
        }
    }

    /// Uniformly scale the panel and its subtree about the origin.
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
            *vertex = scale3(vertex, factor);
        }
        self.centroid = scale3(&self.centroid, factor);
        for l in self.side_len.iter_mut() {
            *l *= factor;
        }
        self.max_side_len *= factor;
        self.area *= factor * factor;
        if let Some(children) = self.children.as_deref_mut() {
            for child in children.iter_mut() {
                child.scale_unchecked(factor);
            }
        }
    }

    /// Visit every leaf of the subtree rooted here.
    pub fn for_each_leaf<'a>(&'a self, visit: &mut impl FnMut(&'a Panel)) {
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

impl fmt::Display for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[({}, {}, {}) ({}, {}, {}) ({}, {}, {})]",
            self.vertices[0][0],
            self.vertices[0][1],
            self.vertices[0][2],
            self.vertices[1][0],
            self.vertices[1][1],
            self.vertices[1][2],
            self.vertices[2][0],
            self.vertices[2][1],
            self.vertices[2][2],
        )
    }
}

impl Drop for Panel {
    // Tree depth is bounded only by the subdivision driver, so the
    // teardown uses an explicit stack instead of recursing.
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

/// Fallback ladder for a cancelled super-panel normal: first a vector
/// orthogonal to the left child's normal, then the area-weighted
/// geometric (unsigned) normals, finally the z axis.
fn degenerate_normal_fallback(left: &Panel, right: &Panel, area: f64) -> [f64; 3] {
    if let Some(mut ortho) = orthogonal_to(&left.normal) {
        normalize3(&mut ortho);
        return ortho;
    }
    let geometric = scale3(
        &add3(
            &scale3(&left.normal, left.area),
            &scale3(&right.normal, right.area),
        ),
        1.0 / area,
    );
    if norm3(&geometric) >= EPS_NORMAL {
        return geometric;
    }
    [0.0, 0.0, 1.0]
}

/// Solve n . v = 0 for v component-wise, trying the x, y then z
/// component as pivot. `None` when `n` is (numerically) zero.
fn orthogonal_to(n: &[f64; 3]) -> Option<[f64; 3]> {
    if n[0].abs() > EPS_NORMAL {
        Some([-(n[1] + n[2]) / n[0], 1.0, 1.0])
    } else if n[1].abs() > EPS_NORMAL {
        Some([1.0, -(n[0] + n[2]) / n[1], 1.0])
    } else if n[2].abs() > EPS_NORMAL {
        Some([1.0, 1.0, -(n[0] + n[1]) / n[2]])
    } else {
        None
    }
}

/// A flat quadrilateral panel.
///
/// Used only to describe dumped/imported geometry; it is never
/// subdivided and is decomposed into two triangles for computation.
#[derive(Debug, Clone)]
pub struct QuadPanel {
    vertices: [[f64; 3]; 4],
    normal: [f64; 3],
    centroid: [f64; 3],
    side_len: [f64; 4],
    max_side_index: usize,
    max_side_len: f64,
    area: f64,
    /// Physical and link bookkeeping state.
    pub data: ElementData,
}

impl QuadPanel {
    /// Create a quadrilateral panel from its four vertices.
    pub fn new(vertices: [[f64; 3]; 4], data: ElementData) -> Result<Self> {
        let mut panel = Self {
            vertices,
            normal: [0.0; 3],
            centroid: [0.0; 3],
            side_len: [0.0; 4],
            max_side_index: 0,
            max_side_len: 0.0,
            area: 0.0,
            data,
        };
        panel.calc_geom_par()?;
        Ok(panel)
    }

    /// Vertex coordinates.
    pub fn vertices(&self) -> &[[f64; 3]; 4] {
        &self.vertices
    }

    /// Unit normal.
    pub fn normal(&self) -> &[f64; 3] {
        &self.normal
    }

    /// Panel centroid.
    pub fn centroid(&self) -> &[f64; 3] {
        &self.centroid
    }

    /// Panel area.
    pub fn area(&self) -> f64 {
        self.area
    }

    /// Geometry parameters for four vertices; Newell's method applies to
    /// quads unchanged.
    pub fn calc_geom_par(&mut self) -> Result<()> {
        for i in 0..4 {
            self.side_len[i] = dist3(&self.vertices[i], &self.vertices[(i + 1) % 4]);
        }

        self.normal = newell_normal(&self.vertices);
        let mag = normalize3(&mut self.normal);
        if mag <= EPS_NORMAL {
            return Err(Error::DegenerateGeometry(format!(
                "zero-area quad panel {self}"
            )));
        }
        self.area = mag / 2.0;

        let mut centroid = [0.0; 3];
        for vertex in &self.vertices {
            centroid = add3(&centroid, vertex);
        }
        self.centroid = scale3(&centroid, 0.25);

        let mut max_index = 0;
        for (i, &l) in self.side_len.iter().enumerate() {
            if l > self.side_len[max_index] {
                max_index = i;
            }
        }
        self.max_side_index = max_index;
        self.max_side_len = self.side_len[max_index];
        Ok(())
    }

    /// Decompose into two triangles sharing the 0-2 diagonal.
    pub fn split(&self) -> Result<[Panel; 2]> {
        let first = Panel::new(
            [self.vertices[0], self.vertices[1], self.vertices[2]],
            self.data.clone(),
        )?;
        let second = Panel::new(
            [self.vertices[0], self.vertices[2], self.vertices[3]],
            self.data.clone(),
        )?;
        Ok([first, second])
    }
}

impl fmt::Display for QuadPanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[({}, {}, {}) ({}, {}, {}) ({}, {}, {}) ({}, {}, {})]",
            self.vertices[0][0],
            self.vertices[0][1],
            self.vertices[0][2],
            self.vertices[1][0],
            self.vertices[1][1],
            self.vertices[1][2],
            self.vertices[2][0],
            self.vertices[2][1],
            self.vertices[2][2],
            self.vertices[3][0],
            self.vertices[3][1],
            self.vertices[3][2],
        )
    }
}
