//! Per-plan timing and group-count statistics.
//!
//! Each plan run records durations for the stitch/sort/group operators and
//! the round and plan totals; summaries report upper medians so a single
//! slow repetition does not skew the numbers.

use std::io::Write;

use anyhow::Result;

use super::StitchPlan;

/// Which measured duration a sample belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingType {
    Stitch,
    Sort,
    Group,
    Round,
}

/// Timing and group-count samples for one plan.
pub struct PlanStats {
    plan: StitchPlan,
    row_count: usize,
    column_count: usize,
    stitch_timing: Vec<Vec<f64>>,
    sort_timing: Vec<Vec<f64>>,
    group_timing: Vec<Vec<f64>>,
    round_total_timing: Vec<Vec<f64>>,
    total_timing: Vec<f64>,
    /// Number of length-1 groups after each partition-producing round
    /// (every round except the last).
    unique_group_counts: Vec<usize>,
}

impl PlanStats {
    pub fn new(plan: StitchPlan, row_count: usize, column_count: usize) -> Self {
        let rounds = plan.len();
        Self {
            plan,
            row_count,
            column_count,
            stitch_timing: vec![Vec::new(); rounds],
            sort_timing: vec![Vec::new(); rounds],
            group_timing: vec![Vec::new(); rounds],
            round_total_timing: vec![Vec::new(); rounds],
            total_timing: Vec::new(),
            unique_group_counts: vec![0; rounds.saturating_sub(1)],
        }
    }

    /// Record one operator duration in milliseconds.
    pub fn record(&mut self, timing_type: TimingType, round: usize, elapsed_ms: f64) {
        match timing_type {
            TimingType::Stitch => self.stitch_timing[round].push(elapsed_ms),
            TimingType::Sort => self.sort_timing[round].push(elapsed_ms),
            TimingType::Group => self.group_timing[round].push(elapsed_ms),
            TimingType::Round => self.round_total_timing[round].push(elapsed_ms),
        }
    }

    /// Record a whole-plan duration in milliseconds.
    pub fn record_total(&mut self, elapsed_ms: f64) {
        self.total_timing.push(elapsed_ms);
    }

    /// Record the number of length-1 groups after `round`. The count is a
    /// property of the data, so repeated runs overwrite the same slot.
    pub fn record_unique_groups(&mut self, round: usize, count: usize) {
        self.unique_group_counts[round] = count;
    }

    /// Drop all recorded samples, keeping the plan shape.
    pub fn clear(&mut self) {
        for timing in self
            .stitch_timing
            .iter_mut()
            .chain(self.sort_timing.iter_mut())
            .chain(self.group_timing.iter_mut())
            .chain(self.round_total_timing.iter_mut())
        {
            timing.clear();
        }
        self.total_timing.clear();
        self.unique_group_counts.fill(0);
    }

    /// Fraction of per-row column reads that later rounds never perform
    /// because earlier rounds already isolated the row in a length-1
    /// group, as an integer percentage of all `rows x columns` reads the
    /// plan names.
    pub fn skipped_data_rate(&self) -> u32 {
        let total_width: usize = self.plan.iter().map(Vec::len).sum();
        let denominator = (self.row_count * total_width) as u64;
        if denominator == 0 {
            return 0;
        }
        let mut skipped = 0u64;
        let mut prev_unique = 0usize;
        let mut stitched_width = 0usize;
        for (round, unique) in self.unique_group_counts.iter().enumerate() {
            stitched_width += self.plan[round].len();
            let newly_unique = unique.saturating_sub(prev_unique) as u64;
            skipped += newly_unique * (total_width - stitched_width) as u64;
            prev_unique = *unique;
        }
        (100 * skipped / denominator) as u32
    }

    /// Upper median: sort ascending, pick index `n / 2`. Zero when no
    /// samples were recorded.
    fn median(timing: &[f64]) -> f64 {
        if timing.is_empty() {
            return 0.0;
        }
        let mut sorted = timing.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        sorted[timing.len() / 2]
    }

    /// Write the textual report block for this plan.
    pub fn write_summary(&self, out: &mut impl Write) -> Result<()> {
        let rounds: Vec<String> = self
            .plan
            .iter()
            .map(|round| {
                let cols: Vec<String> = round.iter().map(usize::to_string).collect();
                format!("[{}]", cols.join(","))
            })
            .collect();
        writeln!(out, "Plan: {}", rounds.join(" "))?;
        writeln!(out, "Row count: {}", self.row_count)?;
        writeln!(out, "Column count: {}", self.column_count)?;
        writeln!(out, "Skipped data rate: {}%", self.skipped_data_rate())?;
        writeln!(out, "Unique group counts:")?;
        for (round, unique) in self.unique_group_counts.iter().enumerate() {
            writeln!(out, "[Round {}] {}/{}", round, unique, self.row_count)?;
        }
        writeln!(out, "Total time: {:.3} ms", Self::median(&self.total_timing))?;
        for round in 0..self.plan.len() {
            writeln!(
                out,
                "Round {} : Stitch: {:.3} ms, Sort: {:.3} ms, Group: {:.3} ms, Total: {:.3} ms",
                round,
                Self::median(&self.stitch_timing[round]),
                Self::median(&self.sort_timing[round]),
                Self::median(&self.group_timing[round]),
                Self::median(&self.round_total_timing[round]),
            )?;
        }
        writeln!(out)?;
        Ok(())
    }
}
