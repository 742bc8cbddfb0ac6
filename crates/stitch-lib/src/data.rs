//! Synthetic `u32` column generation for benchmark datasets.

use anyhow::{bail, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::info;

use crate::column::RawColumn;

/// Generate `cols` independent columns of `rows` values, each drawn
/// uniformly from `[0, floor(rows * cardinality)]`. Lower cardinality
/// rates produce more duplicate keys and therefore larger equality
/// groups.
///
/// With `Some(seed)` the dataset is reproducible; each column derives its
/// own stream from the base seed so the parallel fill stays
/// deterministic. `None` draws from OS entropy.
pub fn generate_columns(
    rows: usize,
    cols: usize,
    cardinality: f64,
    seed: Option<u64>,
) -> Result<Vec<RawColumn>> {
    if !(cardinality > 0.0 && cardinality <= 1.0) {
        bail!("cardinality rate {cardinality} outside (0, 1]");
    }
    if cols == 0 {
        bail!("at least one column required");
    }

    let max_value = (rows as f64 * cardinality).floor() as u32;
    let columns: Vec<RawColumn> = (0..cols)
        .into_par_iter()
        .map(|col| {
            let mut rng = match seed {
                Some(base) => StdRng::seed_from_u64(
                    base ^ (col as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15),
                ),
                None => StdRng::from_entropy(),
            };
            (0..rows).map(|_| rng.gen_range(0..=max_value)).collect()
        })
        .collect();

    info!("generated {cols} columns x {rows} rows, values in [0, {max_value}]");
    Ok(columns)
}
