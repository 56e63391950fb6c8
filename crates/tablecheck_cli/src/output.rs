use anyhow::Result;
use colored::*;
use serde_json::json;
use tablecheck_core::{TableStatus, ValidationReport};
use tablecheck_validator::NormalizedSchema;

pub fn print_validation_report(report: &ValidationReport, format: &str) -> Result<()> {
    match format {
        "json" => print_json_report(report),
        _ => {
            print_text_report(report);
            Ok(())
        }
    }
}

fn print_text_report(report: &ValidationReport) {
    println!("\n{}", "═".repeat(60));
    println!("{}", "  VALIDATION REPORT".bold());
    println!("{}", "═".repeat(60));

    if report.valid {
        println!(
            "\n{} {}",
            "✓".green().bold(),
            "Validation PASSED".green().bold()
        );
    } else {
        println!(
            "\n{} {}",
            "✗".red().bold(),
            "Validation FAILED".red().bold()
        );
    }

    for table in &report.tables {
        let status = match table.status {
            TableStatus::Validated if table.violations.is_empty() => "validated".green(),
            TableStatus::Validated => "invalid".red(),
            TableStatus::Partial => "partial".yellow(),
            TableStatus::Skipped => "skipped".yellow(),
        };
        println!(
            "\n{} [{}] {} row(s)",
            table.resource.bold(),
            status,
            table.row_count
        );

        for error in &table.errors {
            println!("  {} {}", "!".yellow().bold(), error.yellow());
        }
        for (i, violation) in table.violations.iter().enumerate() {
            let rows: Vec<String> = violation.rows.iter().map(|r| r.to_string()).collect();
            let location = match (violation.fields.as_slice(), rows.is_empty()) {
                (fields, true) => fields.join(", "),
                (fields, false) => format!("{} @ row {}", fields.join(", "), rows.join(", ")),
            };
            println!(
                "  {}. {} {}: {}",
                i + 1,
                violation.kind.to_string().red(),
                location,
                violation.message
            );
        }
    }

    println!("\n{}", "Summary:".bold());
    println!("  Tables validated:      {}", report.stats.tables_validated);
    println!("  Records validated:     {}", report.stats.records_validated);
    println!("  Fields checked:        {}", report.stats.fields_checked);
    println!("  Constraints evaluated: {}", report.stats.constraints_evaluated);
    println!("  Total violations:      {}", report.violation_count());
    println!("  Total errors:          {}", report.error_count());
    println!("  Duration:              {}ms", report.stats.duration_ms);
    println!("{}", "═".repeat(60));
}

fn print_json_report(report: &ValidationReport) -> Result<()> {
    let output = json!({
        "valid": report.valid,
        "tables": report.tables,
        "summary": {
            "violation_count": report.violation_count(),
            "error_count": report.error_count(),
            "stats": report.stats,
        }
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Prints the checks each resource runs after normalization.
pub fn print_plan(schema: &NormalizedSchema, format: &str) -> Result<()> {
    if format == "json" {
        let resources: Vec<_> = schema
            .entries()
            .map(|(name, entry)| match entry {
                Ok(table) => json!({
                    "name": name,
                    "valid": true,
                    "schema": table.schema(),
                    "constraints": table.constraint_count(),
                }),
                Err(e) => json!({
                    "name": name,
                    "valid": false,
                    "error": e.to_string(),
                }),
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({ "resources": resources }))?
        );
        return Ok(());
    }

    for (name, entry) in schema.entries() {
        match entry {
            Ok(table) => {
                println!("\n{}", name.bold());
                println!("  Fields:      {}", table.schema().fields.len());
                for field in &table.schema().fields {
                    let mut flags = Vec::new();
                    if field.constraints.is_required() {
                        flags.push("required");
                    }
                    if field.constraints.is_unique() {
                        flags.push("unique");
                    }
                    println!(
                        "    - {} ({}){}",
                        field.name,
                        field.field_type,
                        if flags.is_empty() {
                            String::new()
                        } else {
                            format!(" [{}]", flags.join(", "))
                        }
                    );
                }
                if !table.primary_key().is_empty() {
                    println!("  Primary key: {}", table.primary_key().join(", "));
                }
                for key in table.unique_keys() {
                    println!("  Unique key:  ({})", key.join(", "));
                }
                for fk in table.foreign_keys() {
                    println!(
                        "  Foreign key: ({}) -> {}.({})",
                        fk.fields.join(", "),
                        fk.reference_resource(name),
                        fk.reference.fields.join(", ")
                    );
                }
                println!("  Constraints: {}", table.constraint_count());
            }
            Err(e) => {
                println!("\n{} {}", name.bold(), "[invalid]".red());
                println!("  {}", e.to_string().red());
            }
        }
    }
    Ok(())
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message.green());
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message.red());
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}
