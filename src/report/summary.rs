//! Training report tables

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, CellAlignment, Color, Table};
use console::style;

use crate::model::{format_params, CvResult, FeatureImportance, TrainingReport};
use crate::pipeline::{FeatureDistribution, QuantileSummary};

/// Number of cross-validation candidates listed in the console report
const CV_ROWS: usize = 5;

fn header(cells: &[&str]) -> Vec<Cell> {
    cells
        .iter()
        .map(|c| Cell::new(c).add_attribute(Attribute::Bold))
        .collect()
}

fn score_color(score: f64) -> Color {
    if score >= 0.8 {
        Color::Green
    } else if score >= 0.6 {
        Color::Yellow
    } else {
        Color::Red
    }
}

fn print_section(icon: &str, title: &str) {
    println!();
    println!("    {} {}", style(icon).cyan(), style(title).white().bold());
    println!("    {}", style("─".repeat(50)).dim());
    println!();
}

fn print_indented(table: &Table) {
    for line in table.to_string().lines() {
        println!("    {}", line);
    }
}

/// Model, split sizes and held-out metrics.
pub fn metrics_table(report: &TrainingReport) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(header(&["Metric", "Value"]));

    table.add_row(vec![Cell::new("Estimator"), Cell::new(&report.estimator)]);
    table.add_row(vec![
        Cell::new("Best Parameters"),
        Cell::new(format_params(&report.best_params)),
    ]);
    table.add_row(vec![
        Cell::new(format!("CV Precision ({} folds)", report.cv_folds)),
        Cell::new(format!("{:.4}", report.best_cv_precision)),
    ]);
    table.add_row(vec![
        Cell::new("Train Rows (positive)"),
        Cell::new(format!("{} ({})", report.train.rows, report.train.positives)),
    ]);
    table.add_row(vec![
        Cell::new("Test Rows (positive)"),
        Cell::new(format!("{} ({})", report.test.rows, report.test.positives)),
    ]);

    let m = &report.test_metrics;
    for (name, value) in [
        ("Test Precision", m.precision),
        ("Test Recall", m.recall),
        ("Test F1", m.f1),
        ("Test Accuracy", m.confusion.accuracy()),
    ] {
        table.add_row(vec![
            Cell::new(name),
            Cell::new(format!("{:.4}", value))
                .fg(score_color(value))
                .add_attribute(Attribute::Bold),
        ]);
    }

    table
}

/// Highest-scoring cross-validation candidates, best first.
pub fn cv_results_table(results: &[CvResult], limit: usize) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(header(&["Rank", "Parameters", "Mean Precision", "Std"]));

    let mut ranked: Vec<&CvResult> = results.iter().collect();
    ranked.sort_by_key(|r| r.rank);

    for r in ranked.into_iter().take(limit) {
        table.add_row(vec![
            Cell::new(r.rank),
            Cell::new(format_params(&r.params)),
            Cell::new(format!("{:.4}", r.mean_score)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.4}", r.std_score)).set_alignment(CellAlignment::Right),
        ]);
    }

    table
}

/// The `limit` most important features.
pub fn importance_table(importances: &[FeatureImportance], limit: usize) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(header(&["#", "Feature", "Importance"]));

    for (i, f) in importances.iter().take(limit).enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&f.feature),
            Cell::new(format!("{:.4}", f.importance)).set_alignment(CellAlignment::Right),
        ]);
    }

    table
}

fn summary_cells(label: &str, summary: Option<&QuantileSummary>) -> Vec<Cell> {
    let mut cells = vec![Cell::new(label)];
    match summary {
        Some(s) => {
            cells.push(Cell::new(s.count));
            for v in [s.min, s.q1, s.median, s.q3, s.max, s.mean] {
                cells.push(Cell::new(format!("{:.2}", v)).set_alignment(CellAlignment::Right));
            }
        }
        None => {
            cells.push(Cell::new(0));
            cells.extend((0..6).map(|_| Cell::new("-").fg(Color::DarkGrey)));
        }
    }
    cells
}

/// Quantiles of each feature for the positive and negative class.
pub fn distribution_table(distributions: &[FeatureDistribution]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(header(&[
        "Feature", "Class", "Count", "Min", "Q1", "Median", "Q3", "Max", "Mean",
    ]));

    for d in distributions {
        let mut positive = vec![Cell::new(&d.feature).add_attribute(Attribute::Bold)];
        positive.extend(summary_cells("positive", d.positive.as_ref()));
        table.add_row(positive);

        let mut negative = vec![Cell::new("")];
        negative.extend(summary_cells("negative", d.negative.as_ref()));
        table.add_row(negative);
    }

    table
}

/// Print the full training report to stdout.
pub fn display_training_report(report: &TrainingReport, top_features: usize) {
    print_section("📋", "TRAINING SUMMARY");
    print_indented(&metrics_table(report));

    print_section("🔎", "CROSS-VALIDATION");
    print_indented(&cv_results_table(&report.cv_results, CV_ROWS));

    print_section("⭐", "IMPORTANT FEATURES");
    print_indented(&importance_table(&report.feature_importance, top_features));

    if !report.distributions.is_empty() {
        print_section("📊", "DISTRIBUTION BY LABEL");
        print_indented(&distribution_table(&report.distributions));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EvaluationMetrics, ParamSet, SplitSummary};

    #[test]
    fn test_metrics_table_lists_test_scores() {
        // 2 true positives, 1 false positive, 1 true negative
        let report = TrainingReport {
            estimator: "DecisionTreeClassifier".into(),
            best_params: ParamSet::new(),
            best_cv_precision: 0.5,
            cv_folds: 3,
            cv_results: Vec::new(),
            train: SplitSummary {
                rows: 12,
                positives: 3,
            },
            test: SplitSummary {
                rows: 4,
                positives: 2,
            },
            test_metrics: EvaluationMetrics::evaluate(&[1, 1, 0, 0], &[1, 1, 1, 0]).unwrap(),
            feature_importance: Vec::new(),
            distributions: Vec::new(),
        };
        let rendered = metrics_table(&report).to_string();
        assert!(rendered.contains("Test Precision"));
        assert!(rendered.contains("0.6667"));
        assert!(rendered.contains("Test Accuracy"));
        assert!(rendered.contains("0.7500"));
        assert!(rendered.contains("12 (3)"));
    }

    #[test]
    fn test_importance_table_respects_limit() {
        let importances = vec![
            FeatureImportance {
                feature: "reward".into(),
                importance: 0.7,
            },
            FeatureImportance {
                feature: "income".into(),
                importance: 0.3,
            },
        ];
        let rendered = importance_table(&importances, 1).to_string();
        assert!(rendered.contains("reward"));
        assert!(rendered.contains("0.7000"));
        assert!(!rendered.contains("income"));
    }

    #[test]
    fn test_distribution_table_marks_empty_class() {
        let distributions = vec![FeatureDistribution {
            feature: "age".into(),
            positive: QuantileSummary::from_values(&[30.0, 40.0]),
            negative: None,
        }];
        let rendered = distribution_table(&distributions).to_string();
        assert!(rendered.contains("age"));
        assert!(rendered.contains("35.00"));
        assert!(rendered.contains("negative"));
    }
}
