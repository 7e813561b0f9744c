//! Human-readable rendering of engine reports

use comfy_table::{Cell, ContentArrangement, Table, presets::UTF8_FULL};
use pgkeep_standards::{
    BestPracticesReport, CheckDetails, OperationStatsSnapshot, OverallHealth, SequenceRepairReport,
    TriggerRepairReport, ValidationReport,
};

fn table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.iter().map(|h| Cell::new(*h)));
    table
}

fn detail_lines(details: &CheckDetails) -> Vec<String> {
    match details {
        CheckDetails::Sequences { problem_sequences } => problem_sequences
            .iter()
            .map(|s| format!("sequence {s}"))
            .collect(),
        CheckDetails::Triggers { missing_triggers } => missing_triggers
            .iter()
            .map(|t| format!("missing trigger on {t}"))
            .collect(),
        CheckDetails::Structure { errors, warnings } => errors
            .iter()
            .chain(warnings.iter())
            .flat_map(|(table, messages)| messages.iter().map(move |m| format!("{table}: {m}")))
            .collect(),
        CheckDetails::Performance { issues } => issues.clone(),
        CheckDetails::Indexes {
            unused_indexes,
            duplicate_indexes,
        } => unused_indexes
            .iter()
            .map(|i| format!("unused index {i}"))
            .chain(duplicate_indexes.iter().map(|group| {
                format!(
                    "duplicate indexes on {}: {}",
                    group.table_name,
                    group.indexes.join(", ")
                )
            }))
            .collect(),
    }
}

pub fn render_health(health: &OverallHealth, verbose: bool) -> String {
    let mut checks = table(&["Check", "Status", "Score", "Message"]);
    for (kind, result) in &health.checks {
        checks.add_row(vec![
            Cell::new(kind.name()),
            Cell::new(result.status.to_string()),
            Cell::new(result.score),
            Cell::new(&result.message),
        ]);
    }

    let mut out = format!("Overall health score: {}/100\n{checks}\n", health.overall_score);

    if verbose {
        for (kind, result) in &health.checks {
            let Some(details) = &result.details else {
                continue;
            };
            out.push_str(&format!("\n{kind}:\n"));
            for line in detail_lines(details) {
                out.push_str(&format!("  - {line}\n"));
            }
        }
    }

    if !health.recommendations.is_empty() {
        out.push_str("\nRecommendations:\n");
        for recommendation in &health.recommendations {
            out.push_str(&format!("  - {recommendation}\n"));
        }
    }

    out
}

pub fn render_validation(report: &ValidationReport) -> String {
    if report.valid() && report.warnings().is_empty() {
        return format!(
            "All {} tables match their validation rules.\n",
            report.tables_checked()
        );
    }

    let mut findings = table(&["Table", "Severity", "Finding"]);
    for validation in &report.tables {
        for finding in &validation.findings {
            let severity = if finding.is_error() { "error" } else { "warning" };
            findings.add_row(vec![
                Cell::new(&validation.table),
                Cell::new(severity),
                Cell::new(finding.to_string()),
            ]);
        }
    }

    let verdict = if report.valid() { "valid" } else { "invalid" };
    format!(
        "{findings}\n{} tables checked, structure {verdict}\n",
        report.tables_checked()
    )
}

pub fn render_sequences(report: &SequenceRepairReport) -> String {
    if report.sequences_fixed.is_empty() {
        return format!("No sequences needed fixing ({:.3}s)\n", report.time_taken);
    }
    let mut out = format!(
        "Fixed {} sequences in {:.3}s:\n",
        report.sequences_fixed.len(),
        report.time_taken
    );
    for sequence in &report.sequences_fixed {
        out.push_str(&format!("  - {sequence}\n"));
    }
    out
}

pub fn render_triggers(report: &TriggerRepairReport) -> String {
    let created = report.created();
    let mut out = format!(
        "Created {} triggers, skipped {} tables in {:.3}s\n",
        created.len(),
        report.skipped().len(),
        report.time_taken
    );
    for table in created {
        out.push_str(&format!("  + {table}\n"));
    }
    out
}

pub fn render_best_practices(report: &BestPracticesReport) -> String {
    let mode = if report.dry_run { "would be" } else { "were" };
    let mut out = format!("Processed {} tables\n", report.tables_processed);
    out.push_str(&format!(
        "{} sequences {mode} fixed, {} triggers {mode} created\n",
        report.sequences_fixed.len(),
        report.triggers_created.len()
    ));
    for sequence in &report.sequences_fixed {
        out.push_str(&format!("  sequence {sequence}\n"));
    }
    for table in &report.triggers_created {
        out.push_str(&format!("  trigger on {table}\n"));
    }
    out
}

pub fn render_stats(stats: &OperationStatsSnapshot) -> String {
    let mut ops = table(&["Operation", "Count", "Average (s)", "Last (s)"]);
    for (name, stat) in &stats.operations {
        ops.add_row(vec![
            Cell::new(name),
            Cell::new(stat.count),
            Cell::new(format!("{:.3}", stat.average_time)),
            Cell::new(format!("{:.3}", stat.last_time)),
        ]);
    }
    format!("{ops}\n{} operations recorded\n", stats.total_operations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgkeep_standards::{Finding, HealthCheckKind, TableValidation, aggregate, score_sequences};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_health_lists_recommendations() {
        let sequences = score_sequences(2, vec!["orders_id_seq".into()]);
        let health = aggregate([(HealthCheckKind::Sequences, sequences)].into_iter().collect());

        let rendered = render_health(&health, true);
        assert!(rendered.contains("sequences"));
        assert!(rendered.contains("sequence orders_id_seq"));
        assert!(rendered.contains("Recommendations:"));
    }

    #[test]
    fn test_render_valid_report() {
        let report = ValidationReport {
            tables: vec![TableValidation::new("user_types")],
        };
        assert_eq!(
            render_validation(&report),
            "All 1 tables match their validation rules.\n"
        );
    }

    #[test]
    fn test_render_invalid_report() {
        let mut validation = TableValidation::new("user_types");
        validation.findings.push(Finding::MissingColumn {
            column: "name".into(),
        });
        let report = ValidationReport {
            tables: vec![validation],
        };
        let rendered = render_validation(&report);
        assert!(rendered.contains("Missing required column: name"));
        assert!(rendered.contains("structure invalid"));
    }

    #[test]
    fn test_render_empty_sequence_report() {
        let report = SequenceRepairReport::default();
        assert!(render_sequences(&report).starts_with("No sequences needed fixing"));
    }

    #[test]
    fn test_render_dry_run() {
        let report = BestPracticesReport {
            tables_processed: 2,
            dry_run: true,
            sequences_fixed: vec!["orders_id_seq".into()],
            triggers_created: vec![],
        };
        let rendered = render_best_practices(&report);
        assert!(rendered.contains("1 sequences would be fixed"));
    }
}
