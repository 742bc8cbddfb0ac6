//! Multi-round stitch-plan execution over registered raw columns.
//!
//! A plan names which raw columns are stitched together in each round.
//! The executor threads a [`SortingState`] by move through the rounds:
//! round 0 sorts the whole column and discovers the initial partition,
//! middle rounds sort within the incoming groups and refine them, and the
//! last round sorts within groups and extracts the final permutation.

mod stats;

pub use stats::{PlanStats, TimingType};

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use tracing::info;

use crate::column::{RawColumn, SortingState, StitchedColumn, MAX_COMPARE_FACTOR};
use crate::timer::Timer;

/// One entry per round; each round lists the raw-column indices stitched
/// together for that round.
pub type StitchPlan = Vec<Vec<usize>>;

/// Check a plan against the registered column count before running it.
/// Rejects empty plans, empty rounds, out-of-range column indices,
/// rounds wider than the supported compare factor, and columns repeated
/// across rounds (repeats would silently break the skip accounting).
pub fn validate_plan(plan: &StitchPlan, num_columns: usize) -> Result<()> {
    if plan.is_empty() {
        bail!("plan has no rounds");
    }
    let mut seen = vec![false; num_columns];
    for (round, columns) in plan.iter().enumerate() {
        if columns.is_empty() {
            bail!("round {round} stitches no columns");
        }
        if columns.len() > MAX_COMPARE_FACTOR {
            bail!(
                "round {round} stitches {} columns, at most {MAX_COMPARE_FACTOR} supported",
                columns.len()
            );
        }
        for &col in columns {
            if col >= num_columns {
                bail!("round {round} references column {col}, only {num_columns} registered");
            }
            if seen[col] {
                bail!("column {col} appears in more than one round");
            }
            seen[col] = true;
        }
    }
    Ok(())
}

/// Runs registered plans over registered columns and writes one report
/// block per plan to the owned report file.
pub struct Benchmark {
    plans: Vec<StitchPlan>,
    raw_data: Vec<RawColumn>,
    output: BufWriter<File>,
}

impl Benchmark {
    /// Create a benchmark writing its report to `report_path`. The file
    /// is owned for the benchmark's whole lifetime.
    pub fn new(report_path: impl AsRef<Path>) -> Result<Self> {
        let path = report_path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("failed to create report file {}", path.display()))?;
        Ok(Self {
            plans: Vec::new(),
            raw_data: Vec::new(),
            output: BufWriter::new(file),
        })
    }

    pub fn register_plan(&mut self, plan: StitchPlan) {
        self.plans.push(plan);
    }

    pub fn register_plans(&mut self, plans: impl IntoIterator<Item = StitchPlan>) {
        self.plans.extend(plans);
    }

    /// Register the dataset. All columns must have the same length.
    pub fn register_data(&mut self, data: Vec<RawColumn>) -> Result<()> {
        let row_count = match data.first() {
            Some(column) => column.len(),
            None => bail!("no columns supplied"),
        };
        for (idx, column) in data.iter().enumerate() {
            if column.len() != row_count {
                bail!(
                    "column {idx} has {} rows, expected {row_count}",
                    column.len()
                );
            }
        }
        info!("registered {} columns x {} rows", data.len(), row_count);
        self.raw_data = data;
        Ok(())
    }

    pub fn plans(&self) -> &[StitchPlan] {
        &self.plans
    }

    pub fn row_count(&self) -> usize {
        self.raw_data.first().map(Vec::len).unwrap_or(0)
    }

    pub fn column_count(&self) -> usize {
        self.raw_data.len()
    }

    /// Execute one plan `num_runs` times, recording timings into `stats`
    /// and appending its summary to the report. Returns the final row
    /// permutation of the last run.
    pub fn run_plan(
        &mut self,
        plan_idx: usize,
        stats: &mut PlanStats,
        num_runs: usize,
    ) -> Result<Vec<u32>> {
        let plan = self
            .plans
            .get(plan_idx)
            .cloned()
            .ok_or_else(|| {
                anyhow!("plan index {plan_idx} out of range, {} registered", self.plans.len())
            })?;
        validate_plan(&plan, self.raw_data.len())?;

        let row_count = self.raw_data[0].len();
        let round_count = plan.len();

        let mut global_timer = Timer::new();
        let mut round_timer = Timer::new();
        let mut operator_timer = Timer::new();

        let mut final_indices = Vec::new();
        for _run in 0..num_runs {
            let mut state = SortingState::identity(row_count);
            global_timer.start();

            for (round, round_cols) in plan.iter().enumerate() {
                round_timer.start();
                let columns: Vec<&RawColumn> =
                    round_cols.iter().map(|&col| &self.raw_data[col]).collect();

                operator_timer.start();
                let mut stitched = StitchedColumn::stitch(&columns, &state.indices)?;
                operator_timer.stop();
                stats.record(TimingType::Stitch, round, operator_timer.elapsed_ms());

                operator_timer.start();
                if round == 0 {
                    stitched.sort();
                } else {
                    stitched.sort_groups(&state.groups);
                }
                operator_timer.stop();
                stats.record(TimingType::Sort, round, operator_timer.elapsed_ms());

                operator_timer.start();
                if round + 1 < round_count {
                    let next = if round == 0 {
                        stitched.group_and_index()
                    } else {
                        stitched.group_and_index_within(&state.groups)
                    };
                    operator_timer.stop();
                    let unique = next.groups.iter().filter(|g| g.length == 1).count();
                    stats.record_unique_groups(round, unique);
                    state = next;
                } else {
                    final_indices = stitched.index_only();
                    operator_timer.stop();
                }
                stats.record(TimingType::Group, round, operator_timer.elapsed_ms());

                round_timer.stop();
                stats.record(TimingType::Round, round, round_timer.elapsed_ms());
            }

            global_timer.stop();
            stats.record_total(global_timer.elapsed_ms());
        }

        stats.write_summary(&mut self.output)?;
        self.output.flush()?;
        Ok(final_indices)
    }

    /// Run every registered plan in registration order.
    pub fn run_all_plans(&mut self, num_runs: usize) -> Result<()> {
        let row_count = self.row_count();
        let column_count = self.column_count();
        for plan_idx in 0..self.plans.len() {
            let plan = self.plans[plan_idx].clone();
            info!("running plan {}/{}: {plan:?}", plan_idx + 1, self.plans.len());
            let mut stats = PlanStats::new(plan, row_count, column_count);
            self.run_plan(plan_idx, &mut stats, num_runs)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_empty_plan() {
        assert!(validate_plan(&vec![], 4).is_err());
    }

    #[test]
    fn test_validate_rejects_empty_round() {
        assert!(validate_plan(&vec![vec![0], vec![]], 4).is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_column() {
        assert!(validate_plan(&vec![vec![0, 4]], 4).is_err());
    }

    #[test]
    fn test_validate_rejects_wide_round() {
        assert!(validate_plan(&vec![vec![0, 1, 2, 3, 4]], 5).is_err());
    }

    #[test]
    fn test_validate_rejects_repeated_column() {
        assert!(validate_plan(&vec![vec![0, 1], vec![1]], 4).is_err());
    }

    #[test]
    fn test_validate_accepts_catalogue_shapes() {
        for plan in [
            vec![vec![0, 1, 2, 3]],
            vec![vec![0, 1], vec![2], vec![3]],
            vec![vec![0], vec![1], vec![2], vec![3]],
        ] {
            validate_plan(&plan, 4).unwrap();
        }
    }
}
