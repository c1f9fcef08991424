use anyhow::{Context, Result};
use chrono::NaiveDate;
use comfy_table::Table;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::types::{InstanceRecord, OutputFormat};

pub const HEADER: [&str; 3] = ["Project ID", "Instance", "Database Version"];

/// `cloudsql_version_<MonthName><Year>.csv`, e.g. `cloudsql_version_March2025.csv`.
pub fn csv_file_name(date: NaiveDate) -> String {
    date.format("cloudsql_version_%B%Y.csv").to_string()
}

pub fn build_table(records: &[InstanceRecord]) -> Table {
    let mut table = Table::new();
    table.set_header(HEADER.to_vec());
    for record in records {
        table.add_row(vec![
            record.project_id.as_str(),
            record.instance.as_str(),
            record.database_version.as_str(),
        ]);
    }
    table
}

pub fn print_table<W: Write>(records: &[InstanceRecord], out: &mut W) -> Result<()> {
    writeln!(out, "{}", build_table(records))?;
    Ok(())
}

/// The header row is written explicitly so an empty report still has one.
pub fn write_csv<W: Write>(records: &[InstanceRecord], writer: W) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv_writer.write_record(HEADER)?;
    for record in records {
        csv_writer.serialize(record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Writes the CSV report to `path`. A file that fails midway is removed.
pub fn write_csv_file(records: &[InstanceRecord], path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create CSV file {}", path.display()))?;

    if let Err(e) = write_csv(records, file) {
        let _ = fs::remove_file(path);
        return Err(e.context(format!("Failed to write CSV file {}", path.display())));
    }
    Ok(())
}

/// Renders `records` either as a table on `out` or as a CSV file inside `dir`.
/// Returns the path of the CSV file when one was written.
pub fn report<W: Write>(
    format: OutputFormat,
    records: &[InstanceRecord],
    dir: &Path,
    date: NaiveDate,
    out: &mut W,
) -> Result<Option<PathBuf>> {
    match format {
        OutputFormat::Csv => {
            let file_name = csv_file_name(date);
            let path = dir.join(&file_name);
            write_csv_file(records, &path)?;
            info!(path = %path.display(), rows = records.len(), "Wrote CSV report");
            writeln!(out, "Results written to {}", file_name)?;
            Ok(Some(path))
        }
        OutputFormat::Table => {
            print_table(records, out)?;
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(project: &str, name: &str, version: &str) -> InstanceRecord {
        InstanceRecord {
            project_id: project.to_string(),
            instance: name.to_string(),
            database_version: version.to_string(),
        }
    }

    #[test]
    fn test_csv_file_name() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        assert_eq!(csv_file_name(date), "cloudsql_version_March2025.csv");

        let date = NaiveDate::from_ymd_opt(2024, 12, 1).unwrap();
        assert_eq!(csv_file_name(date), "cloudsql_version_December2024.csv");
    }

    #[test]
    fn test_write_csv_header_and_rows() {
        let records = vec![
            record("p1", "db-a", "MYSQL_8_0"),
            record("p1", "db,b", "POSTGRES_15"),
        ];
        let mut buf = Vec::new();
        write_csv(&records, &mut buf).unwrap();

        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "Project ID,Instance,Database Version\np1,db-a,MYSQL_8_0\np1,\"db,b\",POSTGRES_15\n"
        );
    }

    #[test]
    fn test_write_csv_header_only() {
        let mut buf = Vec::new();
        write_csv(&[], &mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "Project ID,Instance,Database Version\n"
        );
    }

    #[test]
    fn test_table_rows_match_records() {
        let records = vec![
            record("p1", "db-a", "MYSQL_8_0"),
            record("p2", "db-b", "SQLSERVER_2019_STANDARD"),
        ];
        let table = build_table(&records);
        assert_eq!(table.row_iter().count(), 2);

        let rendered = table.to_string();
        let header_pos = rendered.find("Project ID").unwrap();
        assert!(header_pos < rendered.find("Instance").unwrap());
        assert!(rendered.find("Instance").unwrap() < rendered.find("Database Version").unwrap());
        assert!(rendered.find("db-a").unwrap() < rendered.find("db-b").unwrap());
    }

    #[test]
    fn test_empty_table_has_header() {
        let mut out = Vec::new();
        print_table(&[], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Project ID"));
        assert!(text.contains("Database Version"));
    }
}
