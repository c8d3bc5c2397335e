//! End-to-end tests: configuration and data loaded from disk, checks run
//! through the orchestrator, results rendered by the formatters.

use arrow::array::{ArrayRef, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use ddlx_check::config::TableChecksConfig;
use ddlx_check::constraints::{CompletenessConstraint, PatternConstraint, UniquenessConstraint};
use ddlx_check::core::{
    CheckDefinition, CheckStatus, ConstraintStatus, Level, Orchestrator, OrchestratorConfig,
    SubCheck,
};
use ddlx_check::formatters::{HumanFormatter, JsonFormatter, MarkdownFormatter};
use ddlx_check::prelude::ReportFormatter;
use ddlx_check::sources::{CsvOptions, Dataset};
use std::io::Write;
use std::sync::Arc;
use tempfile::TempDir;

const PRODUCTS_CSV: &str = "Id,Price,Comment\n1,0.5,cheap\n2,3.0,fine\n3,2.5,ok\n3,10.0,pricey\n";

const PRODUCTS_CONFIG: &str = r#"{
    "table": "Test",
    "level": "error",
    "columns": [
        {
            "name": "Id",
            "rules": [
                { "rules": [{ "type": "non_null" }] },
                { "filter": "Price > 1", "rules": [{ "type": "regex_pattern", "pattern": "^\\d+$" }] },
                { "rules": [{ "type": "uniqueness" }] }
            ]
        },
        { "name": "Missing", "rules": [{ "rules": [{ "type": "non_null" }] }] },
        { "name": "Comment", "rules": [{ "rules": [{ "type": "contains_value", "value": "i", "threshold": 0.5 }] }] }
    ]
}"#;

fn write_file(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path
}

fn people() -> Dataset {
    let schema = Arc::new(Schema::new(vec![
        Field::new("name", DataType::Utf8, false),
        Field::new("age", DataType::Int64, false),
        Field::new("email", DataType::Utf8, true),
    ]));
    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from(vec!["ann", "ben", "cat", "dan"])) as ArrayRef,
            Arc::new(Int64Array::from(vec![42, 15, 33, 70])),
            Arc::new(StringArray::from(vec![
                Some("ann@example.com"),
                None,
                Some("cat@example.com"),
                None,
            ])),
        ],
    )
    .unwrap();
    Dataset::from_batches("people", vec![batch]).unwrap()
}

#[tokio::test]
async fn test_config_run_from_disk() {
    let dir = TempDir::new().unwrap();
    let data_path = write_file(&dir, "products.csv", PRODUCTS_CSV);
    let config_path = write_file(&dir, "checks.json", PRODUCTS_CONFIG);

    let config = TableChecksConfig::from_path(&config_path).unwrap();
    let dataset = Dataset::from_csv(&data_path, CsvOptions::default())
        .await
        .unwrap();
    let orchestrator = config.orchestrator(OrchestratorConfig::default()).unwrap();
    assert_eq!(orchestrator.column_level_checks().len(), 3);

    let report = orchestrator.check_table(&dataset).await;

    // The check on a column the file does not have fails on its own.
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].check_name, "column_level_checks_missing");
    assert!(report.failures[0].message.contains("Missing"));

    let constraints: Vec<_> = report
        .results
        .rows()
        .iter()
        .map(|r| r.constraint.as_str())
        .collect();
    assert_eq!(
        constraints,
        vec![
            "completeness(Id)",
            "uniqueness(Id)",
            "pattern_match(Id)",
            "contains_value(Comment)",
        ]
    );

    let rows = report.results.rows();
    assert!(rows.iter().all(|r| r.check_category == "column level"));
    assert!(rows.iter().all(|r| r.check_level == Level::Error));
    assert_eq!(rows[0].columns, "test.id");
    assert_eq!(rows[3].columns, "test.comment");

    // Id 3 appears twice: two of four values are unique.
    assert_eq!(rows[1].metric, Some(0.5));
    assert_eq!(rows[1].constraint_status, ConstraintStatus::Failure);
    assert_eq!(rows[1].check_status, CheckStatus::Error);

    assert_eq!(rows[2].filter.as_deref(), Some("Price > 1"));
    assert_eq!(rows[2].metric, Some(1.0));
    assert!(rows[2].check.ends_with("with filter Price > 1"));
    assert_eq!(rows[2].check_status, CheckStatus::Success);

    // "pricey" and "fine" contain an i; "cheap" and "ok" do not.
    assert_eq!(rows[3].metric, Some(0.5));
    assert_eq!(rows[3].constraint_status, ConstraintStatus::Success);
}

#[tokio::test]
async fn test_filtered_then_unfiltered_sub_checks() {
    let dataset = people();
    let check = CheckDefinition::builder("emails")
        .target("people.email")
        .sub_check(
            SubCheck::filtered("adults have email", "age > 18")
                .constraint(CompletenessConstraint::complete("email").unwrap()),
        )
        .sub_check(
            SubCheck::unfiltered("everyone has email")
                .constraint(CompletenessConstraint::complete("email").unwrap()),
        )
        .build();

    let outcome = Orchestrator::new().run_check(&dataset, &check).await;
    let table = outcome.table().unwrap();
    assert_eq!(table.len(), 2);

    // ann, cat and dan are adults; dan has no email.
    let adults = &table.rows()[0];
    assert_eq!(adults.filter.as_deref(), Some("age > 18"));
    let ratio = adults.metric.unwrap();
    assert!((ratio - 2.0 / 3.0).abs() < 1e-9);

    let everyone = &table.rows()[1];
    assert_eq!(everyone.filter, None);
    assert_eq!(everyone.metric, Some(0.5));

    // The filter did not leak into the dataset.
    assert_eq!(dataset.row_count().await.unwrap(), 4);
}

#[tokio::test]
async fn test_filter_with_keyword_in_literal() {
    let dataset = people();
    let check = CheckDefinition::builder("emails")
        .sub_check(
            SubCheck::filtered("not placeholders", "name <> 'drop me; update later'")
                .constraint(CompletenessConstraint::complete("email").unwrap()),
        )
        .build();

    let outcome = Orchestrator::new().run_check(&dataset, &check).await;
    let table = outcome.table().unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(table.rows()[0].metric, Some(0.5));
    assert_eq!(
        table.rows()[0].filter.as_deref(),
        Some("name <> 'drop me; update later'")
    );
}

#[tokio::test]
async fn test_failing_second_check_keeps_first_rows() {
    let dataset = people();
    let checks = vec![
        Arc::new(
            CheckDefinition::builder("col_a")
                .sub_check(
                    SubCheck::unfiltered("names are unique")
                        .constraint(UniquenessConstraint::unique("name").unwrap()),
                )
                .build(),
        ),
        Arc::new(
            CheckDefinition::builder("col_b")
                .sub_check(
                    SubCheck::unfiltered("col_b matches")
                        .constraint(PatternConstraint::regex("col_b", "^x$", 1.0).unwrap()),
                )
                .build(),
        ),
    ];

    let report = Orchestrator::new().run_all(&dataset, &checks).await;
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results.rows()[0].check, "names are unique");
    assert_eq!(
        report.failure_pairs(),
        vec![(
            "col_b".to_string(),
            "failure: Column 'col_b' not found in dataset".to_string()
        )]
    );
}

#[tokio::test]
async fn test_no_successful_check_reports_empty_table() {
    let dataset = people();
    let checks: Vec<_> = ["x", "y"]
        .iter()
        .map(|column| {
            Arc::new(
                CheckDefinition::builder(*column)
                    .sub_check(
                        SubCheck::unfiltered(*column)
                            .constraint(CompletenessConstraint::complete(*column).unwrap()),
                    )
                    .build(),
            )
        })
        .collect();

    let report = Orchestrator::new().run_all(&dataset, &checks).await;
    assert!(report.results.is_empty());
    assert_eq!(report.failures.len(), 2);

    let human = HumanFormatter::new().format(&report).unwrap();
    assert!(human.contains("No results"));
    let markdown = MarkdownFormatter::new().format(&report).unwrap();
    assert!(markdown.contains("No results"));

    let json: serde_json::Value =
        serde_json::from_str(&JsonFormatter::new().format(&report).unwrap()).unwrap();
    assert_eq!(json["results"].as_array().unwrap().len(), 0);
    assert_eq!(json["failures"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_repeated_runs_match() {
    let dataset = people();
    let orchestrator = Orchestrator::builder()
        .column_level_check(
            CheckDefinition::builder("emails")
                .sub_check(
                    SubCheck::filtered("adults", "age > 18")
                        .constraint(CompletenessConstraint::complete("email").unwrap()),
                )
                .build(),
        )
        .column_level_check(
            CheckDefinition::builder("nope")
                .sub_check(
                    SubCheck::unfiltered("nope")
                        .constraint(CompletenessConstraint::complete("nope").unwrap()),
                )
                .build(),
        )
        .config(OrchestratorConfig::default().with_max_concurrent_checks(2))
        .build()
        .unwrap();

    let first = orchestrator.check_table(&dataset).await;
    let second = orchestrator.check_table(&dataset).await;
    assert_eq!(first.results, second.results);
    assert_eq!(first.failures, second.failures);
}
