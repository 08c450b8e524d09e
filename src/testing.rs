//! Assertion helpers shared by unit and integration tests.
//!
//! ```ignore
//! use oblivious_boost::assert_approx_eq;
//! use oblivious_boost::testing::{assert_scores_eq, DEFAULT_TOLERANCE};
//! ```

use approx::AbsDiffEq;

/// Default tolerance for score comparisons.
///
/// Compiled scores differ from the naive tree-by-tree sum only through summation
/// order, so this is loose for scores of order one.
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

/// Assert that two `f64` values are approximately equal.
///
/// # Examples
///
/// ```
/// # use oblivious_boost::assert_approx_eq;
/// assert_approx_eq!(1.0, 1.0001, 0.001);
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $tolerance:expr) => {{
        let left_val: f64 = $left;
        let right_val: f64 = $right;
        let tol: f64 = $tolerance;
        let diff = (left_val - right_val).abs();
        if !(diff <= tol) {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`\n right: `{:?}`\n  diff: `{:?}` > tolerance `{:?}`",
                left_val, right_val, diff, tol
            );
        }
    }};
    ($left:expr, $right:expr, $tolerance:expr, $($arg:tt)+) => {{
        let left_val: f64 = $left;
        let right_val: f64 = $right;
        let tol: f64 = $tolerance;
        let diff = (left_val - right_val).abs();
        if !(diff <= tol) {
            panic!(
                "assertion failed: `(left ≈ right)` - {}\n  left: `{:?}`\n right: `{:?}`\n  diff: `{:?}` > tolerance `{:?}`",
                format_args!($($arg)+), left_val, right_val, diff, tol
            );
        }
    }};
}

/// Git-style diff of the rows that differ.
fn diff_scores(actual: &[f64], expected: &[f64], epsilon: f64) -> String {
    let mut result = format!("Epsilon: {epsilon:.0e}\n\n");
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        if !a.abs_diff_eq(e, epsilon) {
            result.push_str(&format!("[{i:3}] - {e:>14.8}  (expected)\n"));
            result.push_str(&format!("      + {a:>14.8}  (actual, Δ={:+.2e})\n", a - e));
        }
    }
    result
}

/// Assert that two score slices are approximately equal element-wise.
///
/// # Panics
///
/// Panics if lengths differ or any element differs by more than `epsilon`,
/// showing a diff of the differing rows.
pub fn assert_scores_eq(actual: &[f64], expected: &[f64], epsilon: f64, context: &str) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "{context}: length mismatch - got {}, expected {}",
        actual.len(),
        expected.len()
    );

    if !actual.abs_diff_eq(expected, epsilon) {
        let diff_count = actual
            .iter()
            .zip(expected)
            .filter(|(a, e)| !a.abs_diff_eq(e, epsilon))
            .count();
        let diff_output = diff_scores(actual, expected, epsilon);
        panic!(
            "\n{context}: {diff_count}/{} values differ\n\n{diff_output}",
            actual.len()
        );
    }
}
