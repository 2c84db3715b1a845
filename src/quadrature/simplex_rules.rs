//! Rule lookup on the reference triangle and interval.

use crate::quadrature::rule_definitions::{
    INTERVAL_RULES, MAX_INTERVAL_ORDER, NRULES, TRIANGLE_RULES,
};
use crate::quadrature::types::{IntervalRule, QuadratureError, TriangleRule};

/// Return the triangle rule stored at `index` (1..=19).
///
/// Fails fast with [`QuadratureError::RuleNotImplemented`] for the
/// deliberately empty slots so a mis-selected rule can never be read as a
/// zero-length table.
pub fn triangle_rule(index: usize) -> Result<&'static TriangleRule, QuadratureError> {
    if index == 0 || index >= NRULES {
        return Err(QuadratureError::RuleNotFound(index));
    }
    let rule = &TRIANGLE_RULES[index];
    if rule.order == 0 {
        return Err(QuadratureError::RuleNotImplemented(index));
    }
    Ok(rule)
}

/// Return the `order`-point Gauss-Legendre rule on [-1, 1].
pub fn interval_rule(order: usize) -> Result<&'static IntervalRule, QuadratureError> {
    if order == 0 || order > MAX_INTERVAL_ORDER {
        return Err(QuadratureError::RuleNotFound(order));
    }
    Ok(&INTERVAL_RULES[order])
}

/// Indices of the implemented triangle rules.
pub fn available_rules() -> Vec<usize> {
    (1..NRULES)
        .filter(|&i| TRIANGLE_RULES[i].order > 0)
        .collect()
}
