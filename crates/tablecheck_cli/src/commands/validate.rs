use anyhow::{Context, Result};
use std::path::Path;
use tablecheck_core::ValidationContext;
use tablecheck_parser::parse_file;
use tablecheck_validator::Validator;
use tracing::info;

use crate::{output, read};

/// Flags of the `validate` command.
#[derive(Debug, Clone, Copy)]
pub struct Options {
    pub schema_only: bool,
    pub sample_size: Option<usize>,
    pub first_invalid_only: bool,
    pub parallel: bool,
}

pub async fn execute(descriptor_path: &str, options: Options, format: &str) -> Result<()> {
    info!("Validating package: {}", descriptor_path);
    info!("Schema only: {}", options.schema_only);
    if let Some(size) = options.sample_size {
        info!("Sample size: {}", size);
    }

    let path = Path::new(descriptor_path);
    let package = parse_file(path)
        .with_context(|| format!("Failed to parse descriptor file: {}", descriptor_path))?;

    let text = format != "json";
    if text {
        output::print_info(&format!(
            "Package loaded: {} ({} resource(s))",
            package.name.as_deref().unwrap_or("unnamed"),
            package.resources.len()
        ));
    }

    let mut context = ValidationContext::new()
        .with_parallel(options.parallel)
        .with_schema_only(options.schema_only)
        .with_first_invalid_only(options.first_invalid_only);
    if let Some(size) = options.sample_size {
        context = context.with_sample_size(size);
    }

    // Read failures stay in the source so the report carries their cause.
    let loaded = if options.schema_only {
        if text {
            output::print_info("Schema-only mode: no data read");
        }
        read::LoadedTables::default()
    } else {
        let loaded = read::load_tables(&package, path).await;
        for (resource, error) in &loaded.failures {
            output::print_error(&format!("Could not read resource '{}': {}", resource, error));
        }
        loaded
    };

    // CPU-bound, so it runs on the blocking pool.
    let report = tokio::task::spawn_blocking(move || {
        Validator::new(context).validate_package(&package, &loaded)
    })
    .await
    .context("Validation task failed")?;

    output::print_validation_report(&report, format)?;

    if !report.valid {
        std::process::exit(1);
    }

    Ok(())
}
