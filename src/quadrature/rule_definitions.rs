//! Literal definitions of the quadrature rule tables.
//!
//! The triangle table has 20 slots. Indices 1..=19 are meaningful; the
//! 16-point and 64-point slots (indices 14 and 18) are deliberately left
//! unimplemented (`order == 0`) and must never be dispatched to. The
//! symmetric rules are literature values (Strang & Fix, Dunavant); the
//! remaining slots are conical-product rules collapsed from Gauss-Legendre
//! interval rules. All tables are built once and immutable afterwards.

use crate::quadrature::types::{IntervalRule, TriangleRule};

/// Number of slots in the triangle rule table.
pub const NRULES: usize = 20;

/// Largest Gauss-Legendre interval rule carried in the table.
pub const MAX_INTERVAL_ORDER: usize = 8;

/// Gauss-Legendre abscissae and weights on [-1, 1].
fn gauss_legendre(order: usize) -> Option<(Vec<f64>, Vec<f64>)> {
    match order {
        1 => Some((vec![0.0], vec![2.0])),
        2 => Some((
            vec![-0.5773502691896257, 0.5773502691896257],
            vec![1.0, 1.0],
        )),
        3 => Some((
            vec![-0.7745966692414834, 0.0, 0.7745966692414834],
            vec![
                0.5555555555555556,
                0.8888888888888888,
                0.5555555555555556,
            ],
        )),
        4 => Some((
            vec![
                -0.8611363115940526,
                -0.3399810435848563,
                0.3399810435848563,
                0.8611363115940526,
            ],
            vec![
                0.3478548451374538,
                0.6521451548625461,
                0.6521451548625461,
                0.3478548451374538,
            ],
        )),
        5 => Some((
            vec![
                -0.9061798459386640,
                -0.5384693101056831,
                0.0,
                0.5384693101056831,
                0.9061798459386640,
            ],
            vec![
                0.2369268850561891,
                0.4786286704993665,
                0.5688888888888889,
                0.4786286704993665,
                0.2369268850561891,
            ],
        )),
        6 => Some((
            vec![
                -0.9324695142031521,
                -0.6612093864662645,
                -0.2386191860831969,
                0.2386191860831969,
                0.6612093864662645,
                0.9324695142031521,
            ],
            vec![
                0.1713244923791704,
                0.3607615730481386,
                0.4679139345726910,
                0.4679139345726910,
                0.3607615730481386,
                0.1713244923791704,
            ],
        )),
        7 => Some((
            vec![
                -0.9491079123427585,
                -0.7415311855993945,
                -0.4058451513773972,
                0.0,
                0.4058451513773972,
                0.7415311855993945,
                0.9491079123427585,
            ],
            vec![
                0.1294849661688697,
                0.2797053914892766,
                0.3818300505051189,
                0.4179591836734694,
                0.3818300505051189,
                0.2797053914892766,
                0.1294849661688697,
            ],
        )),
        8 => Some((
            vec![
                -0.9602898564975363,
                -0.7966664774136267,
                -0.5255324099163290,
                -0.1834346424956498,
                0.1834346424956498,
                0.5255324099163290,
                0.7966664774136267,
                0.9602898564975363,
            ],
            vec![
                0.1012285362903763,
                0.2223810344533745,
                0.3137066458778873,
                0.3626837833783620,
                0.3626837833783620,
                0.3137066458778873,
                0.2223810344533745,
                0.1012285362903763,
            ],
        )),
        9 => Some((
            vec![
                -0.9681602395076261,
                -0.8360311073266358,
                -0.6133714327005904,
                -0.3242534234038089,
                0.0,
                0.3242534234038089,
                0.6133714327005904,
                0.8360311073266358,
                0.9681602395076261,
            ],
            vec![
                0.0812743883615744,
                0.1806481606948574,
                0.2606106964029354,
                0.3123470770400029,
                0.3302393550012598,
                0.3123470770400029,
                0.2606106964029354,
                0.1806481606948574,
                0.0812743883615744,
            ],
        )),
        _ => None,
    }
}

/// Build a rule from an explicit point/weight list.
fn symmetric_rule(degree: usize, points: &[[f64; 2]], weights: &[f64]) -> TriangleRule {
    TriangleRule {
        order: weights.len(),
        degree,
        points: points.iter().flatten().copied().collect(),
        weights: weights.to_vec(),
    }
}

/// Conical-product rule on the triangle, collapsed from the n-point
/// Gauss-Legendre interval rule via x = u, y = v (1 - u). The (1 - u)
/// Jacobian is folded into the weights, which are normalized to sum to 1.
fn conical_product(n: usize) -> TriangleRule {
    let (nodes, gl_weights) = gauss_legendre(n).unwrap();
    let mut points = Vec::with_capacity(2 * n * n);
    let mut weights = Vec::with_capacity(n * n);
    for i in 0..n {
        let u = 0.5 * (nodes[i] + 1.0);
        let wu = 0.5 * gl_weights[i];
        for j in 0..n {
            let v = 0.5 * (nodes[j] + 1.0);
            let wv = 0.5 * gl_weights[j];
            points.push(u);
            points.push(v * (1.0 - u));
            weights.push(2.0 * wu * wv * (1.0 - u));
        }
    }
    TriangleRule {
        order: n * n,
        degree: 2 * n - 2,
        points,
        weights,
    }
}

const THIRD: f64 = 1.0 / 3.0;

lazy_static! {
    /// The triangle rule table. Weights of every implemented slot sum to
    /// 1; slots 14 (16 points) and 18 (64 points) have `order == 0`.
    pub static ref TRIANGLE_RULES: Vec<TriangleRule> = {
        let mut rules = vec![TriangleRule::unimplemented(); NRULES];

        // 1: centroid rule.
        rules[1] = symmetric_rule(1, &[[THIRD, THIRD]], &[1.0]);
        // 2: vertex rule (Strang & Fix).
        rules[2] = symmetric_rule(
            1,
            &[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]],
            &[THIRD, THIRD, THIRD],
        );
        // 3: edge midpoint rule.
        rules[3] = symmetric_rule(
            2,
            &[[0.5, 0.0], [0.5, 0.5], [0.0, 0.5]],
            &[THIRD, THIRD, THIRD],
        );
        // 4: interior 3-point rule.
        let a = 2.0 / 3.0;
        let b = 1.0 / 6.0;
        rules[4] = symmetric_rule(2, &[[b, b], [a, b], [b, a]], &[THIRD, THIRD, THIRD]);
        // 5: 4-point rule with negative centroid weight.
        rules[5] = symmetric_rule(
            3,
            &[[THIRD, THIRD], [0.2, 0.2], [0.6, 0.2], [0.2, 0.6]],
            &[-0.5625, 0.5208333333333333, 0.5208333333333333, 0.5208333333333333],
        );
        // 6: 2x2 conical product.
        rules[6] = conical_product(2);
        // 7: 6-point rule of degree 3 (Strang & Fix).
        let (a, b, c) = (
            0.659027622374092,
            0.231933368553031,
            0.109039009072877,
        );
        rules[7] = symmetric_rule(
            3,
            &[[b, c], [c, b], [a, c], [c, a], [a, b], [b, a]],
            &[1.0 / 6.0; 6],
        );
        // 8: 6-point rule of degree 4 (Dunavant).
        let (a1, b1, w1) = (
            0.816847572980459,
            0.091576213509771,
            0.109951743655322,
        );
        let (a2, b2, w2) = (
            0.108103018168070,
            0.445948490915965,
            0.223381589678011,
        );
        rules[8] = symmetric_rule(
            4,
            &[[b1, b1], [a1, b1], [b1, a1], [b2, b2], [a2, b2], [b2, a2]],
            &[w1, w1, w1, w2, w2, w2],
        );
        // 9: 7-point rule of degree 3 (vertices, edge midpoints, centroid).
        rules[9] = symmetric_rule(
            3,
            &[
                [0.0, 0.0],
                [1.0, 0.0],
                [0.0, 1.0],
                [0.5, 0.0],
                [0.5, 0.5],
                [0.0, 0.5],
                [THIRD, THIRD],
            ],
            &[
                0.05,
                0.05,
                0.05,
                0.1333333333333333,
                0.1333333333333333,
                0.1333333333333333,
                0.45,
            ],
        );
        // 10: 7-point rule of degree 5.
        let (a1, b1, w1) = (
            0.797426985353087,
            0.101286507323456,
            0.125939180544827,
        );
        let (a2, b2, w2) = (
            0.059715871789770,
            0.470142064105115,
            0.132394152788506,
        );
        rules[10] = symmetric_rule(
            5,
            &[
                [THIRD, THIRD],
                [b1, b1],
                [a1, b1],
                [b1, a1],
                [b2, b2],
                [a2, b2],
                [b2, a2],
            ],
            &[0.225, w1, w1, w1, w2, w2, w2],
        );
        // 11: 3x3 conical product.
        rules[11] = conical_product(3);
        // 12: 12-point rule of degree 6 (Dunavant).
        let (a1, b1, w1) = (
            0.873821971016996,
            0.063089014491502,
            0.050844906370207,
        );
        let (a2, b2, w2) = (
            0.501426509658179,
            0.249286745170910,
            0.116786275726379,
        );
        let (p, q, r, w3) = (
            0.636502499121399,
            0.310352451033785,
            0.053145049844816,
            0.082851075618374,
        );
        rules[12] = symmetric_rule(
            6,
            &[
                [b1, b1],
                [a1, b1],
                [b1, a1],
                [b2, b2],
                [a2, b2],
                [b2, a2],
                [q, r],
                [r, q],
                [p, r],
                [r, p],
                [p, q],
                [q, p],
            ],
            &[w1, w1, w1, w2, w2, w2, w3, w3, w3, w3, w3, w3],
        );
        // 13: 13-point rule of degree 7 (Strang & Fix).
        let (a1, b1, w1) = (
            0.479308067841923,
            0.260345966079038,
            0.175615257433204,
        );
        let (a2, b2, w2) = (
            0.869739794195568,
            0.065130102902216,
            0.053347235608839,
        );
        let (p, q, r, w3) = (
            0.638444188569809,
            0.312865496004875,
            0.048690315425316,
            0.077113760890257,
        );
        rules[13] = symmetric_rule(
            7,
            &[
                [THIRD, THIRD],
                [b1, b1],
                [a1, b1],
                [b1, a1],
                [b2, b2],
                [a2, b2],
                [b2, a2],
                [q, r],
                [r, q],
                [p, r],
                [r, p],
                [p, q],
                [q, p],
            ],
            &[
                -0.149570044467670,
                w1,
                w1,
                w1,
                w2,
                w2,
                w2,
                w3,
                w3,
                w3,
                w3,
                w3,
                w3,
            ],
        );
        // 14: the 16-point slot, never filled in.
        // 15..17: higher conical products.
        rules[15] = conical_product(5);
        rules[16] = conical_product(6);
        rules[17] = conical_product(7);
        // 18: the 64-point slot, never filled in.
        rules[19] = conical_product(9);

        rules
    };

    /// Gauss-Legendre interval rules, index = number of points.
    pub static ref INTERVAL_RULES: Vec<IntervalRule> = {
        let mut rules = Vec::with_capacity(MAX_INTERVAL_ORDER + 1);
        rules.push(IntervalRule {
            order: 0,
            points: Vec::new(),
            weights: Vec::new(),
        });
        for n in 1..=MAX_INTERVAL_ORDER {
            let (points, weights) = gauss_legendre(n).unwrap();
            rules.push(IntervalRule {
                order: n,
                points,
                weights,
            });
        }
        rules
    };
}
