//! Year-over-year pivot report.
//!
//! One block per usage type. Each block has a row per calendar month plus a
//! yearly total, and a `COST <year>` / `USAGE <year>` column pair per year.

use usage_core::error::Result;
use usage_core::formatting::{format_cost, format_usage};
use usage_core::models::UsageType;
use usage_data::summary::{Summary, MONTHS};

use crate::table_view::TextTable;

pub const MONTH_HEADER: &str = "MONTH";
pub const YEARLY_TOTAL: &str = "Yearly Total";

/// Build the pivot table for one usage type.
pub fn pivot_table(summary: &Summary, usage_type: UsageType) -> TextTable {
    let years: Vec<i32> = summary.years().collect();

    let mut headers = vec![MONTH_HEADER.to_string()];
    for year in &years {
        headers.push(format!("COST {}", year));
        headers.push(format!("USAGE {}", year));
    }
    let mut table = TextTable::new(headers);

    for month in MONTHS {
        let mut row = vec![month.to_string()];
        for year in &years {
            let totals = summary.get(*year, usage_type);
            let monthly = totals.and_then(|t| t.month(month));
            let unit = totals.map(|t| t.unit_label()).unwrap_or_default();
            row.push(format_cost(monthly.and_then(|m| m.cost)));
            row.push(format_usage(monthly.and_then(|m| m.usage), unit));
        }
        table.push_row(row);
    }

    let mut total_row = vec![YEARLY_TOTAL.to_string()];
    for year in &years {
        let totals = summary.get(*year, usage_type);
        let unit = totals.map(|t| t.unit_label()).unwrap_or_default();
        total_row.push(format_cost(totals.and_then(|t| t.total_cost)));
        total_row.push(format_usage(totals.and_then(|t| t.total_usage), unit));
    }
    table.push_row(total_row);

    table
}

/// Render every usage-type block, separated by a blank line.
pub fn render_report(summary: &Summary) -> String {
    UsageType::ALL
        .iter()
        .map(|usage_type| {
            format!(
                "{}\n{}",
                usage_type.label(),
                pivot_table(summary, *usage_type).render()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render the summary as pretty-printed JSON.
pub fn render_json(summary: &Summary) -> Result<String> {
    Ok(serde_json::to_string_pretty(summary)?)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use usage_core::models::{CanonicalRecord, Record, Units, CANONICAL_COLUMNS};
    use usage_core::table::Table;
    use usage_data::summary::summarize;

    fn reading(
        date: (i32, u32, u32),
        kind: &str,
        usage: Option<f64>,
        units: Option<Units>,
        cost: Option<f64>,
    ) -> Record {
        CanonicalRecord {
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            kind: kind.to_string(),
            usage,
            units,
            cost,
        }
        .into()
    }

    fn sample_summary() -> Summary {
        let table = Table::new(
            CANONICAL_COLUMNS,
            vec![
                reading((2022, 1, 3), "Electric usage", Some(100.0), Some(Units::Kwh), Some(30.0)),
                reading((2023, 1, 3), "Electric usage", Some(90.0), Some(Units::Kwh), Some(28.5)),
                reading((2023, 2, 3), "Electric usage", Some(80.0), Some(Units::Kwh), None),
                reading((2023, 2, 9), "Natural gas usage", Some(4.0), None, Some(6.0)),
            ],
        );
        summarize(&table).unwrap()
    }

    #[test]
    fn test_pivot_headers_pair_per_year() {
        let table = pivot_table(&sample_summary(), UsageType::Electric);
        assert_eq!(
            table.headers(),
            &["MONTH", "COST 2022", "USAGE 2022", "COST 2023", "USAGE 2023"]
        );
    }

    #[test]
    fn test_pivot_has_twelve_months_and_total() {
        let table = pivot_table(&sample_summary(), UsageType::Electric);
        let labels: Vec<&str> = table.rows().iter().map(|r| r[0].as_str()).collect();
        assert_eq!(labels.len(), 13);
        assert_eq!(labels[0], "1");
        assert_eq!(labels[11], "12");
        assert_eq!(labels[12], YEARLY_TOTAL);
    }

    #[test]
    fn test_pivot_cells() {
        let table = pivot_table(&sample_summary(), UsageType::Electric);
        let rows = table.rows();
        assert_eq!(rows[0], vec!["1", "$30.00", "100.00 kWh", "$28.50", "90.00 kWh"]);
        assert_eq!(rows[1], vec!["2", "N/A", "N/A", "N/A", "80.00 kWh"]);
        assert_eq!(rows[12], vec![YEARLY_TOTAL, "$30.00", "100.00 kWh", "$28.50", "170.00 kWh"]);
    }

    #[test]
    fn test_pivot_unknown_unit_and_empty_year() {
        let table = pivot_table(&sample_summary(), UsageType::NaturalGas);
        let rows = table.rows();
        assert_eq!(rows[1], vec!["2", "N/A", "N/A", "$6.00", "4.00 unknown"]);
        assert_eq!(rows[12], vec![YEARLY_TOTAL, "N/A", "N/A", "$6.00", "4.00 unknown"]);
    }

    #[test]
    fn test_render_report_has_both_blocks() {
        let report = render_report(&sample_summary());
        let electric = report.find("Electric usage").unwrap();
        let gas = report.find("Natural gas usage").unwrap();
        assert!(electric < gas);
        assert_eq!(report.matches(YEARLY_TOTAL).count(), 2);
    }

    // ── exports on disk ───────────────────────────────────────────────────────

    fn write_csv(dir: &std::path::Path, name: &str, lines: &[&str]) {
        use std::io::Write;
        let mut file = std::fs::File::create(dir.join(name)).unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
    }

    fn cells(line: &str) -> Vec<&str> {
        line.split_whitespace().collect()
    }

    #[tokio::test]
    async fn test_report_from_exports_on_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        write_csv(
            dir.path(),
            "electric.csv",
            &[
                "Name,Test Account",
                "",
                "TYPE,DATE,USAGE (kWh),COST",
                "Electric usage,2023-01-10,100,$10.00",
                "Electric usage,2023-02-10,150,\"$1,020.50\"",
                "Electric usage,2023-03-10,,$5.00",
            ],
        );
        write_csv(
            dir.path(),
            "gas.csv",
            &[
                "TYPE,DATE,USAGE (therms),COST",
                "Natural gas usage,2023-01-12,10.5,$12.00",
                "Natural gas usage,2023-02-12,8,$9.50",
                "Natural gas usage,2023-03-12,6.25,$7.25",
            ],
        );

        let outcome = usage_runtime::pipeline::ReportPipeline::new(dir.path())
            .jobs(2)
            .run()
            .await
            .unwrap();
        let report = render_report(&outcome.summary);

        let blocks: Vec<&str> = report.split("\n\n").collect();
        assert_eq!(blocks.len(), 2);

        let electric: Vec<&str> = blocks[0].lines().collect();
        let gas: Vec<&str> = blocks[1].lines().collect();
        assert_eq!(electric[0], "Electric usage");
        assert_eq!(gas[0], "Natural gas usage");

        for block in [&electric, &gas] {
            // label, header, rule, 12 months, total
            assert_eq!(block.len(), 16);
            assert_eq!(cells(block[1]), vec!["MONTH", "COST", "2023", "USAGE", "2023"]);
            for month in 4..=12 {
                let month_label = month.to_string();
                assert_eq!(
                    cells(block[2 + month]),
                    vec![month_label.as_str(), "N/A", "N/A"]
                );
            }
        }

        assert_eq!(cells(electric[3]), vec!["1", "$10.00", "100.00", "kWh"]);
        assert_eq!(cells(electric[4]), vec!["2", "$1020.50", "150.00", "kWh"]);
        assert_eq!(cells(electric[5]), vec!["3", "$5.00", "N/A"]);
        assert_eq!(
            cells(electric[15]),
            vec!["Yearly", "Total", "$1035.50", "250.00", "kWh"]
        );

        assert_eq!(cells(gas[5]), vec!["3", "$7.25", "6.25", "therms"]);
        assert_eq!(
            cells(gas[15]),
            vec!["Yearly", "Total", "$28.75", "24.75", "therms"]
        );
    }

    #[test]
    fn test_render_json() {
        let json = render_json(&sample_summary()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["2023"]["Electric usage"]["total_usage"], 170.0);
    }
}
