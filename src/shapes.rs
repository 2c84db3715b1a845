//! Definition of various test shapes.

/// Triangulate a square plate of the given side in the z = 0 plane,
/// `nx` by `ny` cells, two triangles per cell, wound so normals point
/// along +z.
pub fn plate(nx: usize, ny: usize, side: f64) -> Vec<[[f64; 3]; 3]> {
    let mut triangles = Vec::with_capacity(2 * nx * ny);
    let dx = side / nx as f64;
    let dy = side / ny as f64;
    for i in 0..nx {
        for j in 0..ny {
            let x0 = i as f64 * dx;
            let y0 = j as f64 * dy;
            let p00 = [x0, y0, 0.0];
            let p10 = [x0 + dx, y0, 0.0];
            let p11 = [x0 + dx, y0 + dy, 0.0];
            let p01 = [x0, y0 + dy, 0.0];
            triangles.push([p00, p10, p11]);
            triangles.push([p00, p11, p01]);
        }
    }
    triangles
}

/// Triangulate the surface of an axis-aligned cube of the given side
/// centered at the origin, `n` by `n` cells per face, normals outward.
pub fn cube_surface(n: usize, side: f64) -> Vec<[[f64; 3]; 3]> {
    let half = side / 2.0;
    let step = side / n as f64;
    let mut triangles = Vec::with_capacity(12 * n * n);

    // Each face is spanned by two in-plane axes u, v chosen so that
    // u x v points outward.
    let faces: [([f64; 3], [f64; 3], [f64; 3]); 6] = [
        // +z and -z
        ([-half, -half, half], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([-half, half, -half], [1.0, 0.0, 0.0], [0.0, -1.0, 0.0]),
        // +x and -x
        ([half, -half, -half], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]),
        ([-half, -half, half], [0.0, 1.0, 0.0], [0.0, 0.0, -1.0]),
        // +y and -y
        ([-half, half, half], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([-half, -half, -half], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
    ];

    for (origin, u, v) in faces {
        for i in 0..n {
            for j in 0..n {
                let corner = |a: usize, b: usize| {
                    let (a, b) = (a as f64 * step, b as f64 * step);
                    [
                        origin[0] + a * u[0] + b * v[0],
                        origin[1] + a * u[1] + b * v[1],
                        origin[2] + a * u[2] + b * v[2],
                    ]
                };
                let p00 = corner(i, j);
                let p10 = corner(i + 1, j);
                let p11 = corner(i + 1, j + 1);
                let p01 = corner(i, j + 1);
                triangles.push([p00, p10, p11]);
                triangles.push([p00, p11, p01]);
            }
        }
    }
    triangles
}

/// Segments of a regular polygon of the given circumradius centered at
/// the origin. The contour is traversed clockwise: with the segment
/// normal being the counter-clockwise-rotated tangent, this puts the
/// normals outward.
pub fn polygon_loop(sides: usize, radius: f64) -> Vec<[[f64; 2]; 2]> {
    let mut segments = Vec::with_capacity(sides);
    for k in 0..sides {
        let theta0 = -2.0 * std::f64::consts::PI * k as f64 / sides as f64;
        let theta1 = -2.0 * std::f64::consts::PI * (k + 1) as f64 / sides as f64;
        segments.push([
            [radius * theta0.cos(), radius * theta0.sin()],
            [radius * theta1.cos(), radius * theta1.sin()],
        ]);
    }
    segments
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::element::{ElementData, Panel, Segment};
    use crate::geometry::{dot3, norm3, sub3};
    use approx::assert_relative_eq;

    #[test]
    fn test_plate_area_and_orientation() {
        let triangles = plate(3, 2, 2.0);
        assert_eq!(triangles.len(), 12);
        let mut area = 0.0;
        for t in triangles {
            let panel = Panel::new(t, ElementData::conductor()).unwrap();
            assert_relative_eq!(panel.normal()[2], 1.0, max_relative = 1e-12);
            area += panel.area();
        }
        assert_relative_eq!(area, 4.0, max_relative = 1e-12);
    }

    #[test]
    fn test_cube_surface_outward_normals() {
        let triangles = cube_surface(2, 2.0);
        assert_eq!(triangles.len(), 48);
        let mut area = 0.0;
        for t in triangles {
            let panel = Panel::new(t, ElementData::conductor()).unwrap();
            area += panel.area();
            // Outward: the normal agrees with the centroid direction.
            assert!(dot3(panel.normal(), panel.centroid()) > 0.0);
        }
        assert_relative_eq!(area, 24.0, max_relative = 1e-12);
    }

    #[test]
    fn test_polygon_loop_closed_and_outward() {
        let sides = polygon_loop(6, 1.0);
        assert_eq!(sides.len(), 6);
        let mut perimeter = 0.0;
        for (k, s) in sides.iter().enumerate() {
            let next = &sides[(k + 1) % 6];
            assert_relative_eq!(s[1][0], next[0][0], epsilon = 1e-12);
            assert_relative_eq!(s[1][1], next[0][1], epsilon = 1e-12);
            let segment = Segment::new(*s, ElementData::conductor()).unwrap();
            perimeter += segment.length();
            let c = segment.centroid();
            assert!(segment.normal()[0] * c[0] + segment.normal()[1] * c[1] > 0.0);
        }
        assert_relative_eq!(perimeter, 6.0, max_relative = 1e-12);
    }

    #[test]
    fn test_cube_is_closed() {
        // A closed surface has zero net vector area.
        let mut net = [0.0; 3];
        for t in cube_surface(3, 1.0) {
            let e1 = sub3(&t[1], &t[0]);
            let e2 = sub3(&t[2], &t[0]);
            let cross = crate::geometry::cross3(&e1, &e2);
            for i in 0..3 {
                net[i] += 0.5 * cross[i];
            }
        }
        assert!(norm3(&net) < 1e-12);
    }
}
