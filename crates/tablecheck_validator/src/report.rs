//! Report assembly.
//!
//! Every check returns its own list of violations. The assembler merges them
//! per table in the order they are handed over and finalizes the statistics.

use std::fmt::Display;
use std::time::Instant;
use tablecheck_core::{TableReport, TableStatus, ValidationReport, ValidationStats, Violation};

/// Collects per-table outcomes into a `ValidationReport`.
///
/// Tables are addressed by their position in the package, so resources that
/// share a name still get separate reports.
#[derive(Debug)]
pub struct ReportAssembler {
    tables: Vec<TableReport>,
    stats: ValidationStats,
    started: Instant,
}

impl ReportAssembler {
    /// Starts a report with one empty table report per resource.
    pub fn new<I, S>(resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tables: resources.into_iter().map(TableReport::new).collect(),
            stats: ValidationStats::default(),
            started: Instant::now(),
        }
    }

    /// Marks a table as not validated at all.
    pub fn skip(&mut self, position: usize, error: impl Display) {
        if let Some(table) = self.tables.get_mut(position) {
            *table = TableReport::skipped(table.resource.clone(), error.to_string());
        }
    }

    /// Records an error that kept some checks of a table from running.
    pub fn error(&mut self, position: usize, error: impl Display) {
        if let Some(table) = self.tables.get_mut(position) {
            table.add_error(error.to_string());
        }
    }

    /// Appends the violations of one check.
    pub fn extend(&mut self, position: usize, violations: Vec<Violation>) {
        if let Some(table) = self.tables.get_mut(position) {
            table.violations.extend(violations);
        }
    }

    /// Records the number of rows validated for a table.
    pub fn rows(&mut self, position: usize, row_count: usize) {
        if let Some(table) = self.tables.get_mut(position) {
            table.row_count = row_count;
            self.stats.records_validated += row_count;
        }
    }

    /// Counts fields and constraints checked.
    pub fn checked(&mut self, fields: usize, constraints: usize) {
        self.stats.fields_checked += fields;
        self.stats.constraints_evaluated += constraints;
    }

    /// Returns the status a table currently has.
    pub fn status(&self, position: usize) -> Option<TableStatus> {
        self.tables.get(position).map(|t| t.status)
    }

    /// Finalizes the report.
    pub fn finish(self) -> ValidationReport {
        let mut stats = self.stats;
        stats.tables_validated = self
            .tables
            .iter()
            .filter(|t| t.status != TableStatus::Skipped)
            .count();
        stats.duration_ms = self.started.elapsed().as_millis() as u64;
        ValidationReport::new(self.tables, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tablecheck_core::ConstraintKind;

    #[test]
    fn test_merges_in_hand_over_order() {
        let mut assembler = ReportAssembler::new(["people", "teams"]);
        let violation = |row| {
            Violation::field(
                "people",
                "age",
                Some(row),
                ConstraintKind::MinimumConstraint,
                "below",
            )
        };
        assembler.extend(0, vec![violation(3), violation(5)]);
        assembler.extend(0, vec![violation(1)]);
        assembler.rows(0, 10);
        assembler.rows(1, 4);
        assembler.checked(3, 7);

        let report = assembler.finish();
        let rows: Vec<Option<usize>> = report.violations().map(Violation::row).collect();
        assert_eq!(rows, vec![Some(3), Some(5), Some(1)]);
        assert_eq!(report.stats.records_validated, 14);
        assert_eq!(report.stats.fields_checked, 3);
        assert_eq!(report.stats.constraints_evaluated, 7);
        assert_eq!(report.stats.tables_validated, 2);
        assert!(!report.valid);
    }

    #[test]
    fn test_skipped_and_partial_tables() {
        let mut assembler = ReportAssembler::new(["people", "teams", "t"]);
        assembler.skip(1, "unknown field 'x'");
        assembler.error(0, "resource 'teams' is not available");
        assert_eq!(assembler.status(0), Some(TableStatus::Partial));
        assert_eq!(assembler.status(1), Some(TableStatus::Skipped));
        assert_eq!(assembler.status(9), None);

        let report = assembler.finish();
        assert_eq!(report.stats.tables_validated, 2);
        assert_eq!(report.error_count(), 2);
        assert!(!report.valid);
        assert!(report.table("t").unwrap().is_valid());
    }
}
