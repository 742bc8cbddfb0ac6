use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use stitch_lib::bench::Benchmark;
use stitch_lib::data::generate_columns;
use stitch_lib::StitchPlan;

/// L3 cache size assumed when sizing the default dataset (12 MiB; varies
/// across CPUs).
const L3_CACHE_SIZE: usize = 12 * 1024 * 1024;
/// How far the default dataset exceeds the L3-resident row count.
const SCALE_FACTOR: usize = 50;
/// Default rows per column.
const DEFAULT_ROWS: usize = (L3_CACHE_SIZE / 8) * SCALE_FACTOR;

#[derive(Parser)]
#[command(name = "stitch-bench")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Multi-round stitch-sort timing benchmark", long_about = None)]
struct Cli {
    /// Report output file
    #[arg(short, long, value_name = "FILE", required = true)]
    out: PathBuf,

    /// Rows per generated column
    #[arg(long, default_value_t = DEFAULT_ROWS)]
    rows: usize,

    /// Number of generated columns
    #[arg(long, default_value_t = 4)]
    cols: usize,

    /// Cardinality rate in (0, 1]; values are drawn from [0, rows * card]
    #[arg(long, default_value_t = 0.5)]
    card: f64,

    /// Repetitions per plan (medians are reported)
    #[arg(long, default_value_t = 5)]
    runs: usize,

    /// Seed for a reproducible dataset (default: OS entropy)
    #[arg(long)]
    seed: Option<u64>,
}

/// The plan catalogue exercised over the generated dataset. Four columns
/// get the full set of round splits; other widths get the widest legal
/// stitching and the one-column-per-round baseline.
fn plan_catalogue(num_columns: usize) -> Vec<StitchPlan> {
    if num_columns == 4 {
        return vec![
            vec![vec![0, 1, 2, 3]],
            vec![vec![0, 1], vec![2], vec![3]],
            vec![vec![0, 1], vec![2, 3]],
            vec![vec![0], vec![1, 2], vec![3]],
            vec![vec![0], vec![1], vec![2, 3]],
            vec![vec![0, 1, 2], vec![3]],
            vec![vec![0], vec![1, 2, 3]],
            vec![vec![0], vec![1], vec![2], vec![3]],
        ];
    }

    let all: Vec<usize> = (0..num_columns).collect();
    let chunked: StitchPlan = all.chunks(4).map(<[usize]>::to_vec).collect();
    let singles: StitchPlan = all.iter().map(|&col| vec![col]).collect();
    let mut plans = vec![chunked];
    if plans[0] != singles {
        plans.push(singles);
    }
    plans
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let plans = plan_catalogue(cli.cols);
    info!(
        "dataset: {} rows x {} columns, cardinality {}, {} plans x {} runs",
        cli.rows,
        cli.cols,
        cli.card,
        plans.len(),
        cli.runs
    );

    let mut benchmark = Benchmark::new(&cli.out)?;
    benchmark.register_plans(plans);
    let data = generate_columns(cli.rows, cli.cols, cli.card, cli.seed)?;
    benchmark.register_data(data)?;
    benchmark.run_all_plans(cli.runs)?;

    info!("report written to {}", cli.out.display());
    Ok(())
}
