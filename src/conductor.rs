//! Conductors and dielectric interfaces.
//!
//! A conductor owns the flat sequence of input elements for one physical
//! surface plus, after aggregation, the root of the super-element
//! hierarchy built over them.

use itertools::Itertools;
use num::complex::Complex;

use crate::element::{ElementData, Panel, QuadPanel, Segment};
use crate::types::{Error, Result, MAX_NAME_LEN};

/// Largest number of distinct outer permittivities one surface can
/// carry; element dielectric indices are a byte.
pub const MAX_OUTER_PERMITTIVITIES: usize = 256;

/// The input element sequence of a conductor: 3D panels or 2D segments,
/// never both.
#[derive(Debug)]
pub enum Surface {
    /// Triangulated 3D surface.
    Panels(Vec<Panel>),
    /// 2D contour.
    Segments(Vec<Segment>),
}

impl Surface {
    /// Number of elements in the sequence.
    pub fn len(&self) -> usize {
        match self {
            Surface::Panels(panels) => panels.len(),
            Surface::Segments(segments) => segments.len(),
        }
    }

    /// True when no elements have been added yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Root of the aggregation hierarchy over a conductor's elements.
///
/// Super nodes are owned solely by this tree; the input leaves are moved
/// into it when the hierarchy is built.
#[derive(Debug)]
pub enum Root {
    /// Root super panel (or single leaf) of a 3D surface.
    Panel(Box<Panel>),
    /// Root super segment (or single leaf) of a 2D contour.
    Segment(Box<Segment>),
}

/// One physical conductor or dielectric interface.
#[derive(Debug)]
pub struct Conductor {
    name: String,
    is_dielectric: bool,
    outer_permittivity: Complex<f64>,
    inner_permittivity: Complex<f64>,
    outer_permittivity_table: Vec<Complex<f64>>,
    dielectric_ref_point: [f64; 3],
    bbox: Option<([f64; 3], [f64; 3])>,
    input_elements: usize,
    surface: Surface,
    root: Option<Root>,
}

impl Conductor {
    /// Create a 3D conductor with an empty panel sequence.
    pub fn new_panels(name: &str) -> Result<Self> {
        Self::new(name, Surface::Panels(Vec::new()))
    }

    /// Create a 2D conductor with an empty segment sequence.
    pub fn new_segments(name: &str) -> Result<Self> {
        Self::new(name, Surface::Segments(Vec::new()))
    }

    fn new(name: &str, surface: Surface) -> Result<Self> {
        if name.len() > MAX_NAME_LEN {
            return Err(Error::NameTooLong {
                len: name.len(),
                max: MAX_NAME_LEN,
            });
        }
        Ok(Self {
            name: name.to_string(),
            is_dielectric: false,
            outer_permittivity: Complex::new(1.0, 0.0),
            inner_permittivity: Complex::new(1.0, 0.0),
            outer_permittivity_table: vec![Complex::new(1.0, 0.0)],
            dielectric_ref_point: [0.0; 3],
            bbox: None,
            input_elements: 0,
            surface,
            root: None,
        })
    }

    /// Conductor name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True for dielectric-dielectric interfaces.
    pub fn is_dielectric(&self) -> bool {
        self.is_dielectric
    }

    /// Mark this surface as a dielectric interface between `outer` and
    /// `inner` media; `ref_point` lies on the outer-permittivity side and
    /// orients the interface normals.
    pub fn set_dielectric(
        &mut self,
        outer: Complex<f64>,
        inner: Complex<f64>,
        ref_point: [f64; 3],
    ) {
        self.is_dielectric = true;
        self.outer_permittivity = outer;
        self.inner_permittivity = inner;
        self.outer_permittivity_table[0] = outer;
        self.dielectric_ref_point = ref_point;
    }

    /// Outer medium permittivity.
    pub fn outer_permittivity(&self) -> Complex<f64> {
        self.outer_permittivity
    }

    /// Inner medium permittivity.
    pub fn inner_permittivity(&self) -> Complex<f64> {
        self.inner_permittivity
    }

    /// Reference point on the outer side of a dielectric interface.
    pub fn dielectric_ref_point(&self) -> &[f64; 3] {
        &self.dielectric_ref_point
    }

    /// Register an additional outer permittivity for parts of the
    /// surface facing a different ambient medium; returns the table
    /// index to store in the elements' dielectric index.
    pub fn add_outer_permittivity(&mut self, permittivity: Complex<f64>) -> Result<u8> {
        if self.outer_permittivity_table.len() >= MAX_OUTER_PERMITTIVITIES {
            return Err(Error::DegenerateGeometry(format!(
                "more than {MAX_OUTER_PERMITTIVITIES} outer permittivities on conductor {}",
                self.name
            )));
        }
        self.outer_permittivity_table.push(permittivity);
        Ok((self.outer_permittivity_table.len() - 1) as u8)
    }

    /// Outer permittivity for a given element dielectric index.
    pub fn outer_permittivity_at(&self, index: u8) -> Complex<f64> {
        self.outer_permittivity_table
            .get(index as usize)
            .copied()
            .unwrap_or(self.outer_permittivity)
    }

    /// The input element sequence.
    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    /// Mutable access to the input element sequence.
    pub fn surface_mut(&mut self) -> &mut Surface {
        &mut self.surface
    }

    /// Root of the aggregation hierarchy, if built.
    pub fn root(&self) -> Option<&Root> {
        self.root.as_ref()
    }

    /// Mutable access to the hierarchy root.
    pub fn root_mut(&mut self) -> Option<&mut Root> {
        self.root.as_mut()
    }

    /// Number of input elements added so far.
    pub fn input_count(&self) -> usize {
        self.input_elements
    }

    /// Number of leaves currently reachable (through the hierarchy when
    /// built, otherwise the input sequence).
    pub fn leaf_count(&self) -> usize {
        match (&self.root, &self.surface) {
            (Some(Root::Panel(root)), _) => root.leaf_count(),
            (Some(Root::Segment(root)), _) => root.leaf_count(),
            (None, Surface::Panels(panels)) => {
                panels.iter().map(|p| p.leaf_count()).sum()
            }
            (None, Surface::Segments(segments)) => {
                segments.iter().map(|s| s.leaf_count()).sum()
            }
        }
    }

    /// Axis-aligned bounding box of the input vertices (3D; 2D segments
    /// use a zero z extent).
    pub fn bbox(&self) -> Option<&([f64; 3], [f64; 3])> {
        self.bbox.as_ref()
    }

    fn grow_bbox(&mut self, point: &[f64; 3]) {
        match &mut self.bbox {
            None => self.bbox = Some((*point, *point)),
            Some((lo, hi)) => {
                for i in 0..3 {
                    lo[i] = lo[i].min(point[i]);
                    hi[i] = hi[i].max(point[i]);
                }
            }
        }
    }

    fn element_data(&self, dielectric_index: u8, outward_normal: bool) -> ElementData {
        if self.is_dielectric {
            ElementData::dielectric(dielectric_index, outward_normal)
        } else {
            ElementData::conductor()
        }
    }

    /// Add a triangular panel from its vertices.
    pub fn add_panel(&mut self, vertices: [[f64; 3]; 3]) -> Result<()> {
        self.add_panel_with(vertices, 0, true)
    }

    /// Add a triangular panel with explicit dielectric bookkeeping.
    pub fn add_panel_with(
        &mut self,
        vertices: [[f64; 3]; 3],
        dielectric_index: u8,
        outward_normal: bool,
    ) -> Result<()> {
        if !matches!(self.surface, Surface::Panels(_)) {
            return Err(Error::SurfaceKind);
        }
        let data = self.element_data(dielectric_index, outward_normal);
        let panel = Panel::new(vertices, data)?;
        for vertex in &vertices {
            self.grow_bbox(vertex);
        }
        let Surface::Panels(panels) = &mut self.surface else {
            unreachable!()
        };
        panels.push(panel);
        self.input_elements += 1;
        Ok(())
    }

    /// Add a quadrilateral panel; quads are decomposed into two
    /// triangles on input and never subdivided as quads.
    pub fn add_quad_panel(&mut self, vertices: [[f64; 3]; 4]) -> Result<()> {
        if !matches!(self.surface, Surface::Panels(_)) {
            return Err(Error::SurfaceKind);
        }
        let data = self.element_data(0, true);
        let quad = QuadPanel::new(vertices, data)?;
        let [first, second] = quad.split()?;
        for vertex in &vertices {
            self.grow_bbox(vertex);
        }
        let Surface::Panels(panels) = &mut self.surface else {
            unreachable!()
        };
        panels.push(first);
        panels.push(second);
        self.input_elements += 2;
        Ok(())
    }

    /// Add a 2D segment from its endpoints.
    pub fn add_segment(&mut self, vertices: [[f64; 2]; 2]) -> Result<()> {
        self.add_segment_with(vertices, 0, true)
    }

    /// Add a 2D segment with explicit dielectric bookkeeping.
    pub fn add_segment_with(
        &mut self,
        vertices: [[f64; 2]; 2],
        dielectric_index: u8,
        outward_normal: bool,
    ) -> Result<()> {
        if !matches!(self.surface, Surface::Segments(_)) {
            return Err(Error::SurfaceKind);
        }
        let data = self.element_data(dielectric_index, outward_normal);
        let segment = Segment::new(vertices, data)?;
        for vertex in &vertices {
            self.grow_bbox(&[vertex[0], vertex[1], 0.0]);
        }
        let Surface::Segments(segments) = &mut self.surface else {
            unreachable!()
        };
        segments.push(segment);
        self.input_elements += 1;
        Ok(())
    }

    /// Build the super-element hierarchy by repeated pairwise merge
    /// passes over the input sequence, leaving the root in place of the
    /// drained sequence. The input leaves move into the tree; super
    /// nodes exist only in the tree.
    pub fn build_hierarchy(&mut self) -> Result<()> {
        if self.surface.is_empty() {
            return Err(Error::EmptySurface);
        }
        match &mut self.surface {
            Surface::Panels(panels) => {
                let mut level: Vec<Panel> = std::mem::take(panels);
                while level.len() > 1 {
                    level = merge_pass(level, Panel::make_super_panel);
                }
                self.root = Some(Root::Panel(Box::new(level.pop().unwrap())));
            }
            Surface::Segments(segments) => {
                let mut level: Vec<Segment> = std::mem::take(segments);
                while level.len() > 1 {
                    level = merge_pass(level, Segment::make_super_segment);
                }
                self.root = Some(Root::Segment(Box::new(level.pop().unwrap())));
            }
        }
        Ok(())
    }

    /// Zero the link bookkeeping over the whole tree ahead of a fresh
    /// assembly pass.
    pub fn reset_links_tree(&mut self) {
        match &mut self.root {
            Some(Root::Panel(root)) => root.reset_links_tree(),
            Some(Root::Segment(root)) => root.reset_links_tree(),
            None => match &mut self.surface {
                Surface::Panels(panels) => {
                    for panel in panels.iter_mut() {
                        panel.reset_links_tree();
                    }
                }
                Surface::Segments(segments) => {
                    for segment in segments.iter_mut() {
                        segment.reset_links_tree();
                    }
                }
            },
        }
    }

    /// Uniformly scale the conductor's geometry, reference point and
    /// bounding box about the origin.
    pub fn scale(&mut self, factor: f64) -> Result<()> {
        if factor <= 0.0 {
            return Err(Error::DegenerateGeometry(format!(
                "non-positive scale factor {factor}"
            )));
        }
        match &mut self.surface {
            Surface::Panels(panels) => {
                for panel in panels.iter_mut() {
                    panel.scale(factor)?;
                }
            }
            Surface::Segments(segments) => {
                for segment in segments.iter_mut() {
                    segment.scale(factor)?;
                }
            }
        }
        match &mut self.root {
            Some(Root::Panel(root)) => root.scale(factor)?,
            Some(Root::Segment(root)) => root.scale(factor)?,
            None => {}
        }
        for i in 0..3 {
            self.dielectric_ref_point[i] *= factor;
        }
        if let Some((lo, hi)) = &mut self.bbox {
            for i in 0..3 {
                lo[i] *= factor;
                hi[i] *= factor;
            }
        }
        Ok(())
    }

    /// Visit every leaf panel (3D surfaces only).
    pub fn for_each_leaf_panel<'a>(&'a self, visit: &mut impl FnMut(&'a Panel)) {
        match (&self.root, &self.surface) {
            (Some(Root::Panel(root)), _) => root.for_each_leaf(visit),
            (None, Surface::Panels(panels)) => {
                for panel in panels {
                    panel.for_each_leaf(visit);
                }
            }
            _ => {}
        }
    }

    /// Visit every leaf segment (2D surfaces only).
    pub fn for_each_leaf_segment<'a>(&'a self, visit: &mut impl FnMut(&'a Segment)) {
        match (&self.root, &self.surface) {
            (Some(Root::Segment(root)), _) => root.for_each_leaf(visit),
            (None, Surface::Segments(segments)) => {
                for segment in segments {
                    segment.for_each_leaf(visit);
                }
            }
            _ => {}
        }
    }
}

/// One pairwise aggregation pass: adjacent elements merge into supers,
/// an odd trailing element carries over unchanged.
fn merge_pass<T>(level: Vec<T>, merge: impl Fn(T, T) -> T) -> Vec<T> {
    let pairs = level.into_iter().chunks(2);
    pairs
        .into_iter()
        .map(|mut pair| {
            let left = pair.next().unwrap();
            match pair.next() {
                Some(right) => merge(left, right),
                None => left,
            }
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_name_length_limit() {
        let long = "x".repeat(MAX_NAME_LEN + 1);
        assert!(matches!(
            Conductor::new_panels(&long),
            Err(Error::NameTooLong { .. })
        ));
        assert!(Conductor::new_panels("plate").is_ok());
    }

    #[test]
    fn test_surface_kind_enforced() {
        let mut cond = Conductor::new_panels("plate").unwrap();
        assert!(cond.add_segment([[0.0, 0.0], [1.0, 0.0]]).is_err());
        assert!(cond
            .add_panel([[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]])
            .is_ok());
        assert_eq!(cond.input_count(), 1);
    }

    #[test]
    fn test_quad_panel_split_on_input() {
        let mut cond = Conductor::new_panels("plate").unwrap();
        cond.add_quad_panel([
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ])
        .unwrap();
        assert_eq!(cond.input_count(), 2);
        assert_eq!(cond.leaf_count(), 2);
        let (lo, hi) = cond.bbox().unwrap();
        assert_relative_eq!(lo[0], 0.0);
        assert_relative_eq!(hi[1], 1.0);
    }

    #[test]
    fn test_build_hierarchy() {
        let mut cond = Conductor::new_panels("plate").unwrap();
        for i in 0..5 {
            let x = i as f64;
            cond.add_panel([[x, 0.0, 0.0], [x + 1.0, 0.0, 0.0], [x, 1.0, 0.0]])
                .unwrap();
        }
        cond.build_hierarchy().unwrap();
        assert!(cond.surface().is_empty());
        let Some(Root::Panel(root)) = cond.root() else {
            panic!("expected a panel root");
        };
        assert!(!root.is_leaf());
        assert_eq!(root.leaf_count(), 5);
        assert_relative_eq!(root.area(), 2.5, max_relative = 1e-12);
        assert_eq!(cond.leaf_count(), 5);
    }

    #[test]
    fn test_build_hierarchy_empty() {
        let mut cond = Conductor::new_segments("wire").unwrap();
        assert!(matches!(cond.build_hierarchy(), Err(Error::EmptySurface)));
    }

    #[test]
    fn test_dielectric_permittivity_table() {
        let mut cond = Conductor::new_panels("interface").unwrap();
        cond.set_dielectric(
            Complex::new(3.9, 0.0),
            Complex::new(1.0, 0.0),
            [0.0, 0.0, 1.0],
        );
        assert!(cond.is_dielectric());
        let index = cond.add_outer_permittivity(Complex::new(11.7, -0.2)).unwrap();
        assert_eq!(index, 1);
        assert_relative_eq!(cond.outer_permittivity_at(index).re, 11.7);
        assert_relative_eq!(cond.outer_permittivity_at(0).re, 3.9);

        cond.add_panel_with(
            [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            index,
            false,
        )
        .unwrap();
        let Surface::Panels(panels) = cond.surface() else {
            unreachable!()
        };
        assert!(panels[0].data.dielectric);
        assert_eq!(panels[0].data.dielectric_index, 1);
        assert!(!panels[0].data.outward_normal);
        // Dielectric element with outward flag cleared flips its signed
        // normal.
        assert_relative_eq!(panels[0].signed_normal()[2], -1.0);
    }

    #[test]
    fn test_scale() {
        let mut cond = Conductor::new_segments("wire").unwrap();
        cond.add_segment([[-1.0, 0.0], [1.0, 0.0]]).unwrap();
        cond.build_hierarchy().unwrap();
        cond.scale(3.0).unwrap();
        let Some(Root::Segment(root)) = cond.root() else {
            panic!("expected a segment root");
        };
        assert_relative_eq!(root.length(), 6.0);
        let (lo, hi) = cond.bbox().unwrap();
        assert_relative_eq!(lo[0], -3.0);
        assert_relative_eq!(hi[0], 3.0);
    }
}
