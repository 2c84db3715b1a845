//! Cross-variant consistency of the kernel engine over whole meshes.

use capbem::assembly::{assemble_panel_matrix, assemble_segment_matrix, AssemblyOptions};
use capbem::element::{ElementData, Panel, Segment};
use capbem::potential::PotentialEngine;
use capbem::shapes;
use capbem::types::{FOUR_PI_E_ZERO, TWO_PI_E_ZERO};

use approx::assert_relative_eq;
use rand::Rng;
use rand::SeedableRng;

fn random_panel(rng: &mut impl Rng, center: [f64; 3]) -> Panel {
    let vertices = [
        center,
        [
            center[0] + rng.gen_range(0.4..1.0),
            center[1] + rng.gen_range(-0.2..0.2),
            center[2],
        ],
        [
            center[0] + rng.gen_range(-0.2..0.2),
            center[1] + rng.gen_range(0.4..1.0),
            center[2] + rng.gen_range(-0.4..0.4),
        ],
    ];
    Panel::new(vertices, ElementData::conductor()).unwrap()
}

#[test]
fn test_analytic_matches_quadrature_over_random_pairs() {
    let engine = PotentialEngine::new();
    let mut rng = rand::rngs::StdRng::seed_from_u64(7);
    for _ in 0..20 {
        let panel = random_panel(&mut rng, [0.0, 0.0, 0.0]);
        let point = [
            rng.gen_range(2.0..6.0),
            rng.gen_range(2.0..6.0),
            rng.gen_range(1.0..4.0),
        ];
        let analytic = engine.potential_opt(&panel, &point).unwrap();
        let numerical = engine.potential_numerical(&panel, &point, 15, true).unwrap();
        assert_relative_eq!(analytic, numerical, max_relative = 1e-6);
    }
}

#[test]
fn test_reciprocity_over_random_pairs() {
    let engine = PotentialEngine::new();
    let mut rng = rand::rngs::StdRng::seed_from_u64(11);
    for _ in 0..10 {
        let first = random_panel(&mut rng, [0.0, 0.0, 0.0]);
        let second_center = [
            rng.gen_range(2.5..5.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(0.5..2.0),
        ];
        let second = random_panel(&mut rng, second_center);
        let m12 = engine.mutual_half_numerical(&first, &second, 13, false).unwrap();
        let m21 = engine.mutual_half_numerical(&second, &first, 13, false).unwrap();
        assert_relative_eq!(
            m12 * second.area(),
            m21 * first.area(),
            max_relative = 1e-4
        );
    }
}

#[test]
fn test_full_numerical_converges_to_half_numerical() {
    // The rule ladder of the consolidated full-numerical mutual closes
    // in on the half-numerical value as the order rises.
    let engine = PotentialEngine::new();
    let first = Panel::new(
        [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        ElementData::conductor(),
    )
    .unwrap();
    let second = Panel::new(
        [[2.0, 0.5, 0.5], [3.0, 0.5, 0.5], [2.0, 1.5, 0.5]],
        ElementData::conductor(),
    )
    .unwrap();
    let reference = engine.mutual_half_numerical(&first, &second, 19, true).unwrap();

    let errors: Vec<f64> = [1, 6, 11, 15]
        .iter()
        .map(|&rule| {
            let full = engine
                .mutual_full_numerical(&first, &second, rule, true)
                .unwrap();
            (full - reference).abs() / reference.abs()
        })
        .collect();
    assert!(errors[3] < errors[0] / 10.0);
    assert!(errors[3] < 1e-4);
}

#[test]
fn test_panel_matrix_far_entries_match_point_charges() {
    // Far apart, a matrix entry degenerates to the point-charge
    // coefficient 1/(4 pi e0 d).
    let engine = PotentialEngine::new();
    let near = Panel::new(
        [[0.0, 0.0, 0.0], [0.1, 0.0, 0.0], [0.0, 0.1, 0.0]],
        ElementData::conductor(),
    )
    .unwrap();
    let far = Panel::new(
        [[40.0, 0.0, 0.0], [40.1, 0.0, 0.0], [40.0, 0.1, 0.0]],
        ElementData::conductor(),
    )
    .unwrap();
    let refs = vec![&near, &far];
    let matrix = assemble_panel_matrix(&refs, &engine, &AssemblyOptions::default()).unwrap();
    let d = capbem::geometry::dist3(near.centroid(), far.centroid());
    let expected = 1.0 / (FOUR_PI_E_ZERO * d);
    assert_relative_eq!(matrix[1], expected, max_relative = 1e-4);
    assert_relative_eq!(matrix[2], expected, max_relative = 1e-4);
}

#[test]
fn test_segment_matrix_far_entries_match_line_charges() {
    let engine = PotentialEngine::new();
    let near = Segment::new([[-0.5, 0.0], [0.5, 0.0]], ElementData::conductor()).unwrap();
    let far = Segment::new([[99.5, 0.0], [100.5, 0.0]], ElementData::conductor()).unwrap();
    let refs = vec![&near, &far];
    let matrix = assemble_segment_matrix(&refs, &engine, &AssemblyOptions::default()).unwrap();
    let expected = -(100.0_f64).ln() / TWO_PI_E_ZERO;
    assert_relative_eq!(matrix[1], expected, max_relative = 1e-3);
    assert_relative_eq!(matrix[2], expected, max_relative = 1e-3);
}

#[test]
fn test_cube_matrix_is_positive_and_balanced() {
    let engine = PotentialEngine::new();
    let triangles = shapes::cube_surface(1, 1.0);
    let panels: Vec<Panel> = triangles
        .into_iter()
        .map(|t| Panel::new(t, ElementData::conductor()).unwrap())
        .collect();
    let refs: Vec<&Panel> = panels.iter().collect();
    let matrix = assemble_panel_matrix(&refs, &engine, &AssemblyOptions::default()).unwrap();

    let n = refs.len();
    for value in &matrix {
        assert!(*value > 0.0);
    }
    // All panels are congruent, so every diagonal entry is identical
    // and every row sum matches every other by symmetry of the cube.
    let diag = matrix[0];
    let row_sum: f64 = matrix[..n].iter().sum();
    for i in 0..n {
        assert_relative_eq!(matrix[i * n + i], diag, max_relative = 1e-9);
        let sum: f64 = matrix[i * n..(i + 1) * n].iter().sum();
        assert_relative_eq!(sum, row_sum, max_relative = 1e-6);
    }
}
