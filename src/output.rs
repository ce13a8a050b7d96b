use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use crate::config::Schema;
use crate::types::Record;
use crate::util::format_int;

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Write records back out in the input's own column layout.
///
/// Records are already validated, so this is a plain re-serialization. The
/// recovered column is only written when the records carry it.
pub fn export_records(path: &Path, records: &[Record], schema: &Schema) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let with_recovered = records.iter().any(|r| r.cases_recovered().is_some());

    let mut header = vec![
        schema.date_column.as_str(),
        schema.region_column.as_str(),
        schema.new_cases_column.as_str(),
        schema.new_deaths_column.as_str(),
    ];
    if with_recovered {
        header.push(schema.recovered_column.as_str());
    }
    wtr.write_record(&header)?;

    for r in records {
        let mut row = vec![
            r.date().format(&schema.date_format).to_string(),
            r.region().to_string(),
            r.new_cases().to_string(),
            r.new_deaths().to_string(),
        ];
        if with_recovered {
            row.push(r.cases_recovered().map(|v| v.to_string()).unwrap_or_default());
        }
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// A report preview: the title line(s), then up to `max_rows` rows as a
/// markdown table, then a "showing n of m" line when rows were cut.
pub fn render_preview<T>(title: &str, rows: &[T], max_rows: usize) -> String
where
    T: Tabled + Clone,
{
    let mut out = format!("{title}\n");
    if rows.is_empty() {
        out.push_str("(no rows)\n");
        return out;
    }
    let shown: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    let n_shown = shown.len();
    out.push_str(&Table::new(shown).with(Style::markdown()).to_string());
    out.push('\n');
    if n_shown < rows.len() {
        out.push_str(&format!(
            "(showing {} of {} rows)\n",
            format_int(n_shown),
            format_int(rows.len())
        ));
    }
    out
}

pub fn preview_table<T>(title: &str, rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("{}", render_preview(title, rows, max_rows));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load;
    use crate::types::{Bucket, PeriodValueRow};
    use chrono::NaiveDate;

    #[test]
    fn exported_records_load_back_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filtered.csv");
        let d = NaiveDate::from_ymd_opt(2021, 4, 2).unwrap();
        let records = vec![
            Record::new("Kedah", d, Bucket::Year, 12.0, 1.0, Some(3.0)),
            Record::new("Kedah", d.succ_opt().unwrap(), Bucket::Year, 0.0, 0.0, Some(9.0)),
        ];
        export_records(&path, &records, &Schema::default()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("date,state,cases_new,deaths_new,cases_recovered\n"));
        assert!(text.contains("2021-04-02,Kedah,12,1,3"));

        let back = load(&path, &Schema::default()).unwrap();
        assert_eq!(back.rejections.rejected(), 0);
        assert_eq!(back.records.records(), records.as_slice());
    }

    #[test]
    fn export_uses_configured_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.csv");
        let schema = Schema {
            region_column: "region".to_string(),
            date_format: "%d/%m/%Y".to_string(),
            ..Schema::default()
        };
        let d = NaiveDate::from_ymd_opt(2020, 12, 31).unwrap();
        export_records(&path, &[Record::new("Sabah", d, Bucket::Year, 1.0, 0.0, None)], &schema)
            .unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "date,region,cases_new,deaths_new\n31/12/2020,Sabah,1,0\n");
    }

    #[test]
    fn writes_csv_and_json() {
        let dir = tempfile::tempdir().unwrap();
        let rows = vec![PeriodValueRow {
            period: "2021".to_string(),
            value: "10".to_string(),
        }];
        let csv_path = dir.path().join("r.csv");
        write_csv(&csv_path, &rows).unwrap();
        assert_eq!(
            std::fs::read_to_string(&csv_path).unwrap(),
            "Period,Value\n2021,10\n"
        );
        let json_path = dir.path().join("r.json");
        write_json(&json_path, &rows).unwrap();
        assert!(std::fs::read_to_string(&json_path).unwrap().contains("\"Period\": \"2021\""));
    }

    #[test]
    fn preview_is_titled_and_notes_truncation() {
        let rows: Vec<PeriodValueRow> = (2020..2023)
            .map(|y| PeriodValueRow {
                period: y.to_string(),
                value: "1".to_string(),
            })
            .collect();
        let text = render_preview("Report 1: new_cases over time", &rows, 2);
        assert!(text.starts_with("Report 1: new_cases over time\n"));
        assert!(text.contains("| Period | Value |"));
        assert!(text.contains("2021"));
        assert!(!text.contains("2022"));
        assert!(text.contains("(showing 2 of 3 rows)"));

        let full = render_preview("All", &rows, usize::MAX);
        assert!(full.contains("2022"));
        assert!(!full.contains("showing"));
    }

    #[test]
    fn empty_preview_says_so() {
        let rows: Vec<PeriodValueRow> = Vec::new();
        assert_eq!(render_preview("Report 2", &rows, 5), "Report 2\n(no rows)\n");
    }
}
