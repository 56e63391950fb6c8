//! CSV ingestion into the column-oriented table model.

use anyhow::{anyhow, bail, Context, Result};
use std::borrow::Cow;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tablecheck_core::{Dialect, Package, TableDescriptor};
use tablecheck_validator::{Table, TableSource};
use tracing::{debug, warn};

/// Tables read for a package, plus the resources that could not be read.
#[derive(Debug, Default)]
pub struct LoadedTables {
    pub tables: HashMap<String, Table>,
    pub failures: Vec<(String, String)>,
}

impl TableSource for LoadedTables {
    fn table(&self, resource: &str) -> Option<&Table> {
        self.tables.get(resource)
    }

    fn unavailable_reason(&self, resource: &str) -> Option<&str> {
        self.failures
            .iter()
            .find(|(name, _)| name == resource)
            .map(|(_, reason)| reason.as_str())
    }
}

/// Reads the data of every resource of a package.
///
/// Paths are resolved relative to the directory of the descriptor. A
/// resource that fails to load is left out of `tables`, so validation
/// reports it as unavailable.
pub async fn load_tables(package: &Package, descriptor_path: &Path) -> LoadedTables {
    let base = descriptor_path.parent().unwrap_or_else(|| Path::new(""));
    let mut loaded = LoadedTables::default();

    for resource in &package.resources {
        if loaded.tables.contains_key(&resource.name) {
            continue;
        }
        match load_resource(resource, base).await {
            Ok(table) => {
                debug!("Loaded resource '{}': {} row(s)", resource.name, table.len());
                loaded.tables.insert(resource.name.clone(), table);
            }
            Err(e) => {
                warn!("Could not read resource '{}': {:#}", resource.name, e);
                loaded.failures.push((resource.name.clone(), format!("{:#}", e)));
            }
        }
    }

    loaded
}

async fn load_resource(resource: &TableDescriptor, base: &Path) -> Result<Table> {
    if resource.path.is_empty() {
        bail!("resource has no data path");
    }

    let mut header: Option<Vec<String>> = None;
    let mut rows = Vec::new();
    for path in &resource.path {
        let full: PathBuf = base.join(path);
        let bytes = tokio::fs::read(&full)
            .await
            .with_context(|| format!("Failed to read data file: {}", full.display()))?;
        let (file_header, file_rows) = read_csv(&bytes, &resource.dialect)
            .with_context(|| format!("Failed to parse CSV file: {}", full.display()))?;

        if let Some(file_header) = file_header {
            if header.is_none() {
                header = Some(file_header);
            } else if header.as_ref() != Some(&file_header) {
                bail!(
                    "header of {} does not match the first data file",
                    full.display()
                );
            }
        }
        rows.extend(file_rows);
    }

    let header = header.unwrap_or_else(|| {
        resource
            .schema
            .fields
            .iter()
            .map(|f| f.name.clone())
            .collect()
    });
    Ok(Table::from_rows(
        &header,
        rows,
        &resource.schema.missing_values,
    )?)
}

/// Parses CSV bytes with a resource dialect.
///
/// Returns the header (when the dialect has one) and the remaining records.
pub fn read_csv(bytes: &[u8], dialect: &Dialect) -> Result<(Option<Vec<String>>, Vec<Vec<String>>)> {
    let delimiter = ascii(dialect.delimiter, "delimiter")?;
    let quote = ascii(dialect.quote_char, "quoteChar")?;
    let comment = dialect
        .comment_char
        .map(|c| ascii(c, "commentChar"))
        .transpose()?;

    let input = if dialect.skip_initial_space {
        Cow::Owned(skip_initial_space(bytes, delimiter, quote, comment))
    } else {
        Cow::Borrowed(bytes)
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .quote(quote)
        .double_quote(dialect.double_quote)
        .comment(comment)
        .has_headers(false)
        .flexible(true)
        .from_reader(input.as_ref());

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record?;
        records.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }

    if dialect.header && !records.is_empty() {
        let header = records.remove(0);
        Ok((Some(header), records))
    } else {
        Ok((None, records))
    }
}

/// Drops the spaces that open an unquoted field.
///
/// This runs before the CSV reader splits fields, so a quote that follows
/// `delimiter, ` still opens a quoted field and spaces inside quotes are kept.
fn skip_initial_space(bytes: &[u8], delimiter: u8, quote: u8, comment: Option<u8>) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut quoted = false;
    let mut just_closed = false;
    let mut field_start = true;
    let mut line_start = true;
    let mut in_comment = false;

    for &b in bytes {
        if in_comment {
            out.push(b);
            if b == b'\n' {
                in_comment = false;
                line_start = true;
                field_start = true;
            }
            continue;
        }
        if quoted {
            out.push(b);
            if b == quote {
                quoted = false;
                just_closed = true;
            }
            continue;
        }
        if line_start && Some(b) == comment {
            in_comment = true;
            out.push(b);
            continue;
        }
        line_start = false;
        if field_start && b == b' ' {
            continue;
        }

        // A doubled quote reopens the field it just closed.
        if b == quote && (field_start || just_closed) {
            quoted = true;
        }
        just_closed = false;
        field_start = false;
        if b == delimiter {
            field_start = true;
        } else if b == b'\n' || b == b'\r' {
            field_start = true;
            line_start = true;
        }
        out.push(b);
    }
    out
}

fn ascii(c: char, option: &str) -> Result<u8> {
    u8::try_from(c)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| anyhow!("dialect {} '{}' is not a single ASCII character", option, c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_default_dialect() {
        let (header, rows) = read_csv(b"id,name\n1,\"a, b\"\n2,\n", &Dialect::default()).unwrap();
        assert_eq!(header, Some(strings(&["id", "name"])));
        assert_eq!(rows, vec![strings(&["1", "a, b"]), strings(&["2", ""])]);
    }

    #[test]
    fn test_custom_dialect() {
        let dialect = Dialect {
            delimiter: ';',
            quote_char: '\'',
            header: false,
            comment_char: Some('#'),
            ..Dialect::default()
        };
        let (header, rows) = read_csv(b"# note\n1;'x;y'\n", &dialect).unwrap();
        assert_eq!(header, None);
        assert_eq!(rows, vec![strings(&["1", "x;y"])]);
    }

    #[test]
    fn test_skip_initial_space_keeps_quoting() {
        let (_, rows) = read_csv(
            b"id,name\n1, \"Smith, J\"\n2,\"  padded\"\n3,   plain  \n",
            &Dialect::default(),
        )
        .unwrap();
        assert_eq!(
            rows,
            vec![
                strings(&["1", "Smith, J"]),
                strings(&["2", "  padded"]),
                strings(&["3", "plain  "]),
            ]
        );
    }

    #[test]
    fn test_skip_initial_space_with_doubled_quotes() {
        let (_, rows) = read_csv(b"a,b\n\"x \"\", y\", z\n", &Dialect::default()).unwrap();
        assert_eq!(rows, vec![strings(&["x \", y", "z"])]);
    }

    #[test]
    fn test_initial_space_kept_when_disabled() {
        let dialect = Dialect {
            skip_initial_space: false,
            ..Dialect::default()
        };
        let (_, rows) = read_csv(b"a,b\n1, 2\n", &dialect).unwrap();
        assert_eq!(rows, vec![strings(&["1", " 2"])]);
    }

    #[test]
    fn test_unavailable_reason() {
        let loaded = LoadedTables {
            tables: HashMap::new(),
            failures: vec![("ghosts".to_string(), "no such file".to_string())],
        };
        assert_eq!(loaded.unavailable_reason("ghosts"), Some("no such file"));
        assert_eq!(loaded.unavailable_reason("teams"), None);
    }

    #[test]
    fn test_non_ascii_delimiter_is_rejected() {
        let dialect = Dialect {
            delimiter: '§',
            ..Dialect::default()
        };
        assert!(read_csv(b"a", &dialect).is_err());
    }
}
