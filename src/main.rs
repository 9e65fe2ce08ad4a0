//! offerlift: Offer Completion Modelling CLI
//!
//! Cleans a customer/offer table, tunes a classifier by cross-validated
//! precision, reports held-out performance and feature importance, and
//! optionally scores a second table.

use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use polars::prelude::*;

use offerlift::cli::{confirm_training, Cli};
use offerlift::model::{ParamGrid, PredictiveModel, SearchStrategy, TrainFullOptions};
use offerlift::pipeline::{
    count_label_classes, dataset_stats, drop_columns, load_dataset, require_columns, save_dataset,
    unique_label_values, SplitOptions,
};
use offerlift::report::{display_training_report, export_training_report, ExportParams};
use offerlift::utils::{
    create_spinner, finish_with_success, print_banner, print_completion, print_config,
    print_count, print_info, print_step_header, print_step_time, print_success, print_warning,
    RunConfig,
};

/// Name of the probability column added to scored output
const SCORE_COLUMN: &str = "completion_probability";

fn main() -> Result<()> {
    let cli = Cli::parse();

    let param_grid = match &cli.param_grid {
        Some(path) => ParamGrid::from_file(path)?,
        None => cli.estimator.default_grid(),
    };
    let grid_source = cli
        .param_grid
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "built-in".to_string());
    let scored_output = cli.scored_output_path();

    print_banner(env!("CARGO_PKG_VERSION"));
    print_config(&RunConfig {
        input: &cli.input,
        target: &cli.target,
        positive_value: &cli.positive_value,
        grid_source: &grid_source,
        cv_folds: cli.cv_folds,
        test_size: cli.test_size,
        output: scored_output.as_deref(),
    });

    // Step 1: Load dataset
    print_step_header(1, "Load Data");
    let step_start = Instant::now();
    let spinner = create_spinner("Loading dataset...");
    let df = load_dataset(&cli.input, cli.infer_schema_length)?;
    finish_with_success(&spinner, "Dataset loaded");

    let (df, unknown) = drop_columns(df, &cli.drop_columns);
    for name in &unknown {
        print_warning(&format!("Column '{}' not found; nothing dropped", name));
    }

    let (rows, cols, memory_mb) = dataset_stats(&df);
    println!("\n    {} Dataset Statistics:", style("✧").cyan());
    println!("      Rows: {}", rows);
    println!("      Columns: {}", cols);
    println!("      Estimated memory: {:.2} MB", memory_mb);

    require_columns(&df, &[cli.target.as_str()])?;
    let (positives, negatives, nulls) =
        count_label_classes(&df, &cli.target, &cli.positive_value)?;
    print_count(
        "positive rows",
        positives,
        Some(&format!("({} negative, {} without label)", negatives, nulls)),
    );
    if positives == 0 {
        let found = unique_label_values(&df, &cli.target)?;
        anyhow::bail!(
            "No rows in '{}' match positive value '{}' (found: {})",
            cli.target,
            cli.positive_value,
            found.join(", ")
        );
    }
    print_step_time(step_start.elapsed());

    // Step 2: Tune and train
    print_step_header(2, "Tune and Train");
    let candidates = param_grid.candidates()?.len();
    let evaluated = match cli.search_strategy() {
        SearchStrategy::Randomized { n_iter, .. } => n_iter.min(candidates),
        SearchStrategy::Exhaustive => candidates,
    };
    print_count("parameter candidates", evaluated, Some(&format!("from {} in grid", candidates)));

    if !cli.no_confirm && !confirm_training(evaluated, cli.cv_folds)? {
        println!("Cancelled by user.");
        return Ok(());
    }

    let step_start = Instant::now();
    let estimator = cli.estimator.build();
    let mut model = PredictiveModel::new()
        .with_cv_folds(cli.cv_folds)
        .with_strategy(cli.search_strategy())
        .with_progress(true);

    let options = TrainFullOptions {
        split: SplitOptions {
            test_size: cli.test_size,
            seed: cli.seed,
        },
        top_features: cli.top_features,
    };
    let report = model
        .train_full(
            &df,
            &cli.target,
            &cli.positive_value,
            estimator.as_ref(),
            &param_grid,
            options,
        )
        .context("Training failed")?;
    print_success("Model trained");
    print_step_time(step_start.elapsed());

    display_training_report(&report, cli.top_features);

    if let Some(path) = &cli.report {
        let input_file = cli.input.display().to_string();
        export_training_report(
            &report,
            model.preparation().statistics(),
            path,
            &ExportParams {
                input_file: &input_file,
                label_column: &cli.target,
                positive_value: &cli.positive_value,
                test_size: cli.test_size,
                seed: cli.seed,
            },
        )?;
        println!();
        print_info(&format!("Training report written to {}", path.display()));
    }

    // Step 3: Score new data
    if let (Some(score_path), Some(output_path)) = (&cli.score, &scored_output) {
        print_step_header(3, "Score Data");
        let step_start = Instant::now();
        let spinner = create_spinner("Scoring rows...");

        let scoring = load_dataset(score_path, cli.infer_schema_length)?;
        let (scoring, _) = drop_columns(scoring, &cli.drop_columns);
        let features = if scoring.get_column_index(&cli.target).is_some() {
            scoring.drop(&cli.target)?
        } else {
            scoring.clone()
        };

        let probabilities = model
            .predict(features)
            .with_context(|| format!("Failed to score {}", score_path.display()))?;

        let mut scored = scoring;
        scored.with_column(Series::new(SCORE_COLUMN.into(), probabilities))?;
        save_dataset(&mut scored, output_path)?;

        finish_with_success(
            &spinner,
            &format!("Saved {} scored rows to {}", scored.height(), output_path.display()),
        );
        print_step_time(step_start.elapsed());
    }

    print_completion();

    Ok(())
}
