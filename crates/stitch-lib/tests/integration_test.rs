use std::fs;

use tempfile::TempDir;

use stitch_lib::bench::{Benchmark, PlanStats};
use stitch_lib::column::RawColumn;
use stitch_lib::data::generate_columns;
use stitch_lib::verify::is_valid_sort;
use stitch_lib::StitchPlan;

/// Run one plan over `data` in a scratch directory, returning the final
/// permutation and the report text.
fn run_plan(data: Vec<RawColumn>, plan: StitchPlan, num_runs: usize) -> (Vec<u32>, String) {
    let temp_dir = TempDir::new().unwrap();
    let report_path = temp_dir.path().join("report.txt");

    let mut benchmark = Benchmark::new(&report_path).unwrap();
    benchmark.register_plan(plan.clone());
    benchmark.register_data(data).unwrap();

    let mut stats = PlanStats::new(plan, benchmark.row_count(), benchmark.column_count());
    let final_indices = benchmark.run_plan(0, &mut stats, num_runs).unwrap();

    let report = fs::read_to_string(&report_path).unwrap();
    (final_indices, report)
}

#[test]
fn test_single_round_plan_sorts_all_columns() {
    let data = generate_columns(500, 4, 0.05, Some(11)).unwrap();
    let plan: StitchPlan = vec![vec![0, 1, 2, 3]];
    let (final_indices, report) = run_plan(data.clone(), plan, 3);

    let cols: Vec<&RawColumn> = data.iter().collect();
    assert!(is_valid_sort(&cols, &final_indices));
    assert!(report.contains("Plan: [0,1,2,3]"));
    assert!(report.contains("Skipped data rate: 0%"));
}

#[test]
fn test_multi_round_plans_sort_plan_columns_in_order() {
    let data = generate_columns(400, 4, 0.02, Some(23)).unwrap();
    let plans: Vec<StitchPlan> = vec![
        vec![vec![0, 1], vec![2], vec![3]],
        vec![vec![0, 1], vec![2, 3]],
        vec![vec![0], vec![1, 2, 3]],
        vec![vec![0], vec![1], vec![2], vec![3]],
    ];
    for plan in plans {
        let (final_indices, _) = run_plan(data.clone(), plan.clone(), 2);
        let flat: Vec<usize> = plan.concat();
        let cols: Vec<&RawColumn> = flat.iter().map(|&c| &data[c]).collect();
        assert!(is_valid_sort(&cols, &final_indices), "plan {plan:?} mis-sorted");
    }
}

#[test]
fn test_run_all_plans_writes_one_block_per_plan() {
    let temp_dir = TempDir::new().unwrap();
    let report_path = temp_dir.path().join("report.txt");

    let mut benchmark = Benchmark::new(&report_path).unwrap();
    benchmark.register_plans(vec![
        vec![vec![0, 1]],
        vec![vec![0], vec![1]],
        vec![vec![1], vec![0]],
    ]);
    benchmark
        .register_data(generate_columns(200, 2, 0.1, Some(3)).unwrap())
        .unwrap();
    benchmark.run_all_plans(2).unwrap();

    let report = fs::read_to_string(&report_path).unwrap();
    assert_eq!(report.matches("Plan: ").count(), 3);
    assert_eq!(report.matches("Row count: 200").count(), 3);
}

#[test]
fn test_report_counts_unique_groups_and_skipped_data() {
    let col0: RawColumn = vec![1, 2, 2, 1, 1, 4];
    let col1: RawColumn = vec![4, 2, 2, 4, 1, 4];
    let col2: RawColumn = vec![6, 9, 8, 5, 4, 3];
    let plan: StitchPlan = vec![vec![0, 1], vec![2]];
    let (final_indices, report) = run_plan(vec![col0, col1, col2], plan, 1);

    assert_eq!(final_indices, vec![4, 3, 0, 2, 1, 5]);
    // Round 0 leaves groups of sizes [1, 2, 2, 1]: two unique rows, each
    // skipping the single column of round 1 -> 2 / 18 reads avoided.
    assert!(report.contains("[Round 0] 2/6"));
    assert!(report.contains("Skipped data rate: 11%"));
}

#[test]
fn test_distinct_first_round_makes_all_groups_unique() {
    let col0: RawColumn = vec![5, 3, 9, 1];
    let col1: RawColumn = vec![7, 7, 7, 7];
    let (final_indices, report) = run_plan(vec![col0, col1], vec![vec![0], vec![1]], 1);

    assert_eq!(final_indices, vec![3, 1, 0, 2]);
    assert!(report.contains("[Round 0] 4/4"));
    // Every row unique after round 0, so the whole of round 1's column
    // could be skipped: 4 * 1 / 8.
    assert!(report.contains("Skipped data rate: 50%"));
}

#[test]
fn test_all_equal_keys_stay_one_group() {
    let col0: RawColumn = vec![7; 64];
    let col1: RawColumn = vec![7; 64];
    let (final_indices, report) = run_plan(vec![col0, col1], vec![vec![0], vec![1]], 1);

    let mut sorted_ids = final_indices.clone();
    sorted_ids.sort_unstable();
    assert_eq!(sorted_ids, (0..64).collect::<Vec<u32>>());
    assert!(report.contains("[Round 0] 0/64"));
    assert!(report.contains("Skipped data rate: 0%"));
}

#[test]
fn test_empty_dataset() {
    let (final_indices, report) = run_plan(vec![vec![], vec![]], vec![vec![0], vec![1]], 1);
    assert!(final_indices.is_empty());
    assert!(report.contains("Row count: 0"));
    assert!(report.contains("Skipped data rate: 0%"));
}

#[test]
fn test_invalid_plans_are_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let report_path = temp_dir.path().join("report.txt");

    let invalid: Vec<StitchPlan> = vec![
        vec![],
        vec![vec![0], vec![]],
        vec![vec![0, 2]],
        vec![vec![0, 1], vec![1]],
        vec![vec![0, 1, 0, 1, 0]],
    ];
    for plan in invalid {
        let mut benchmark = Benchmark::new(&report_path).unwrap();
        benchmark.register_plan(plan.clone());
        benchmark
            .register_data(vec![vec![1, 2], vec![3, 4]])
            .unwrap();
        assert!(
            benchmark.run_all_plans(1).is_err(),
            "plan {plan:?} should be rejected"
        );
    }
}

#[test]
fn test_ragged_columns_are_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let mut benchmark = Benchmark::new(temp_dir.path().join("report.txt")).unwrap();
    let err = benchmark
        .register_data(vec![vec![1, 2, 3], vec![4, 5]])
        .unwrap_err();
    assert!(err.to_string().contains("expected 3"));
}

#[test]
fn test_unknown_plan_index_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let mut benchmark = Benchmark::new(temp_dir.path().join("report.txt")).unwrap();
    benchmark.register_data(vec![vec![1, 2]]).unwrap();
    let mut stats = PlanStats::new(vec![vec![0]], 2, 1);
    assert!(benchmark.run_plan(0, &mut stats, 1).is_err());
}
