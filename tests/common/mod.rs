//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use ns_formatters::formatters::{collect_children, SyntheticProvider};
use ns_formatters::{FormatContext, Value};

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}

/// Names of all children a provider produces for `value`, `-` for absent ones
pub fn child_names(
    provider: &mut dyn SyntheticProvider,
    cx: &FormatContext<'_>,
    value: &Value,
) -> Vec<String> {
    collect_children(provider, cx, value)
        .into_iter()
        .map(|child| child.map(|c| c.name().to_string()).unwrap_or_else(|| "-".to_string()))
        .collect()
}
