//! Table fixtures for tests and examples.
//!
//! All tables share the header `id,value`: `id` is the 1-based data row index and `value`
//! is the cell under test, written verbatim so that empty or malformed cells can be staged.

use crate::error::{IoContext, Result};
use std::fs;
use std::path::Path;

/// CSV text for an `id,value` table.
///
/// ```
/// use rangefold::testing::value_table;
///
/// assert_eq!(value_table(&["1.5", "", "x"]), "id,value\n1,1.5\n2,\n3,x\n");
/// ```
#[must_use]
pub fn value_table<V: AsRef<str>>(values: &[V]) -> String {
    let mut out = String::from("id,value\n");
    for (i, v) in values.iter().enumerate() {
        out.push_str(&format!("{},{}\n", i + 1, v.as_ref()));
    }
    out
}

/// Write [`value_table`] to `path`.
///
/// # Errors
/// If the file cannot be written.
pub fn write_value_table<V: AsRef<str>>(path: impl AsRef<Path>, values: &[V]) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, value_table(values)).at(path)
}

/// Cells `"1"` through `"n"`.
#[must_use]
pub fn counting_values(n: u64) -> Vec<String> {
    (1..=n).map(|v| v.to_string()).collect()
}

/// `n` deterministic pseudo-random cells with two decimals, e.g. tip amounts.
///
/// Also returns their exact sum in cents.
#[must_use]
pub fn amount_values(n: u64, seed: u64) -> (Vec<String>, u64) {
    let mut state = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
    let mut cents_total = 0u64;
    let values = (0..n)
        .map(|_| {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            let cents = (state >> 33) % 2_000;
            cents_total += cents;
            format!("{}.{:02}", cents / 100, cents % 100)
        })
        .collect();
    (values, cents_total)
}
