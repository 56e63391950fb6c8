//! Parser for tabular package descriptors (JSON/YAML/TOML formats).
//!
//! This module loads package descriptors from JSON, YAML and TOML files into
//! the strongly-typed `Package` structure.
//!
//! # Example
//!
//! ```rust
//! use tablecheck_parser::parse_json;
//!
//! let json = r#"{
//!   "name": "registry",
//!   "resources": [{
//!     "name": "people",
//!     "path": "people.csv",
//!     "schema": {
//!       "fields": [{"name": "id", "type": "integer"}],
//!       "primaryKey": "id"
//!     }
//!   }]
//! }"#;
//!
//! let package = parse_json(json).expect("Failed to parse descriptor");
//! assert_eq!(package.resources[0].name, "people");
//! ```

use std::path::Path;
use tablecheck_core::Package;
use thiserror::Error;

/// Errors that can occur during descriptor parsing.
#[derive(Debug, Error)]
pub enum ParserError {
    /// JSON parsing or deserialization failed
    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing or deserialization failed
    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml_ng::Error),

    /// TOML parsing or deserialization failed
    #[error("Failed to parse TOML: {0}")]
    TomlError(String),

    /// File I/O error
    #[error("File I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Unsupported file format
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Invalid file extension
    #[error("Invalid or missing file extension")]
    InvalidExtension,
}

/// Result type alias for parser operations.
pub type Result<T> = std::result::Result<T, ParserError>;

/// Supported descriptor file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorFormat {
    /// JSON format (.json)
    Json,
    /// YAML format (.yml, .yaml)
    Yaml,
    /// TOML format (.toml)
    Toml,
}

/// Parse a package descriptor from a JSON string.
pub fn parse_json(content: &str) -> Result<Package> {
    let package: Package = serde_json::from_str(content)?;
    Ok(package)
}

/// Parse a package descriptor from a YAML string.
///
/// # Example
///
/// ```rust
/// use tablecheck_parser::parse_yaml;
///
/// let yaml = r#"
/// resources:
///   - name: teams
///     schema:
///       fields:
///         - name: id
///           type: integer
///       primaryKey: [id]
/// "#;
///
/// let package = parse_yaml(yaml).unwrap();
/// assert_eq!(package.resources[0].schema.primary_key, vec!["id"]);
/// ```
pub fn parse_yaml(content: &str) -> Result<Package> {
    let package: Package = serde_yaml_ng::from_str(content)?;
    Ok(package)
}

/// Parse a package descriptor from a TOML string.
///
/// # Example
///
/// ```rust
/// use tablecheck_parser::parse_toml;
///
/// let toml = r#"
/// [[resources]]
/// name = "teams"
///
/// [[resources.schema.fields]]
/// name = "id"
/// type = "integer"
/// "#;
///
/// let package = parse_toml(toml).unwrap();
/// assert_eq!(package.resources[0].schema.fields.len(), 1);
/// ```
pub fn parse_toml(content: &str) -> Result<Package> {
    let package: Package =
        toml::from_str(content).map_err(|e| ParserError::TomlError(e.to_string()))?;
    Ok(package)
}

/// Parse a package descriptor from a string in the given format.
pub fn parse_str(content: &str, format: DescriptorFormat) -> Result<Package> {
    match format {
        DescriptorFormat::Json => parse_json(content),
        DescriptorFormat::Yaml => parse_yaml(content),
        DescriptorFormat::Toml => parse_toml(content),
    }
}

/// Detect the descriptor format from a file path based on its extension.
///
/// # Supported Extensions
///
/// * `.json` → `DescriptorFormat::Json`
/// * `.yaml`, `.yml` → `DescriptorFormat::Yaml`
/// * `.toml` → `DescriptorFormat::Toml`
///
/// # Errors
///
/// Returns `ParserError::InvalidExtension` if the file has no extension.
/// Returns `ParserError::UnsupportedFormat` if the extension is not recognized.
pub fn detect_format(path: &Path) -> Result<DescriptorFormat> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or(ParserError::InvalidExtension)?;

    match extension.to_lowercase().as_str() {
        "json" => Ok(DescriptorFormat::Json),
        "yaml" | "yml" => Ok(DescriptorFormat::Yaml),
        "toml" => Ok(DescriptorFormat::Toml),
        other => Err(ParserError::UnsupportedFormat(other.to_string())),
    }
}

/// Parse a package descriptor from a file with automatic format detection.
///
/// # Example
///
/// ```no_run
/// use tablecheck_parser::parse_file;
/// use std::path::Path;
///
/// let package = parse_file(Path::new("data/datapackage.json")).unwrap();
/// println!("Loaded {} resource(s)", package.resources.len());
/// ```
pub fn parse_file(path: &Path) -> Result<Package> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    parse_str(&content, format)
}
