use anyhow::{Context, Result};
use std::path::Path;
use tablecheck_parser::parse_file;
use tablecheck_validator::NormalizedSchema;
use tracing::{info, warn};

use crate::output;

pub async fn execute(descriptor_path: &str, format: &str) -> Result<()> {
    info!("Checking package descriptor: {}", descriptor_path);

    let path = Path::new(descriptor_path);
    let package = parse_file(path)
        .with_context(|| format!("Failed to parse descriptor file: {}", descriptor_path))?;

    let schema = NormalizedSchema::from_package(&package);
    let errors: Vec<_> = schema.errors().collect();
    for (resource, error) in &errors {
        warn!("Resource '{}': {}", resource, error);
    }

    if format != "json" {
        output::print_info(&format!(
            "Package loaded: {} ({} resource(s))",
            package.name.as_deref().unwrap_or("unnamed"),
            package.resources.len()
        ));
    }

    output::print_plan(&schema, format)?;

    if !errors.is_empty() {
        output::print_error(&format!(
            "{} resource(s) have an invalid schema",
            errors.len()
        ));
        std::process::exit(1);
    }

    if format != "json" {
        output::print_success("Package descriptor is valid");
    }

    Ok(())
}
