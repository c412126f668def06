//! CSV export of ambassador reports.

use crate::core::report::CodeStats;
use std::borrow::Cow;

/// Column headers of the export, in order.
pub const CSV_HEADER: [&str; 4] = ["Discount Code", "Month", "Total Usage", "Validated Orders"];

/// `Content-Type` of the export.
pub const CSV_CONTENT_TYPE: &str = "text/csv";

/// `Content-Disposition` of the export.
pub const CSV_CONTENT_DISPOSITION: &str = "attachment; filename=\"ambassador_coupons.csv\"";

const LINE_END: &str = "\r\n";

fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\r', '\n']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// Renders the report: a header line, then one line per (code, month) pair.
#[must_use]
pub fn render_csv(report: &[CodeStats]) -> String {
    let mut csv = CSV_HEADER.join(",");
    csv.push_str(LINE_END);

    for code in report {
        let name = escape_field(&code.code);
        for month in &code.stats {
            csv.push_str(&format!(
                "{name},{},{},{}{LINE_END}",
                escape_field(&month.month),
                month.total_usage,
                month.validated_orders
            ));
        }
    }

    csv
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::stats::MonthlyUsage;

    fn code_stats(code: &str, months: &[(&str, i64, i64)]) -> CodeStats {
        CodeStats {
            code: code.to_string(),
            code_id: 1,
            stats: months
                .iter()
                .map(|(month, total, validated)| MonthlyUsage {
                    month: (*month).to_string(),
                    total_usage: *total,
                    validated_orders: *validated,
                })
                .collect(),
        }
    }

    #[test]
    fn test_single_pair_is_two_lines() {
        let csv = render_csv(&[code_stats("SUMMER10", &[("2024-01", 3, 2)])]);

        assert_eq!(
            csv,
            "Discount Code,Month,Total Usage,Validated Orders\r\nSUMMER10,2024-01,3,2\r\n"
        );
        assert_eq!(csv.lines().count(), 2);
    }

    #[test]
    fn test_empty_report_is_header_only() {
        let csv = render_csv(&[code_stats("IDLE", &[])]);
        assert_eq!(csv, "Discount Code,Month,Total Usage,Validated Orders\r\n");
    }

    #[test]
    fn test_rows_follow_report_order() {
        let csv = render_csv(&[
            code_stats("A", &[("2024-02", 1, 1), ("2024-01", 4, 0)]),
            code_stats("B", &[("2024-02", 2, 2)]),
        ]);
        let rows: Vec<&str> = csv.lines().skip(1).collect();
        assert_eq!(rows, vec!["A,2024-02,1,1", "A,2024-01,4,0", "B,2024-02,2,2"]);
    }

    #[test]
    fn test_code_with_separator_is_quoted() {
        let csv = render_csv(&[code_stats("SAVE,\"20\"", &[("2024-01", 1, 0)])]);
        assert!(csv.ends_with("\"SAVE,\"\"20\"\"\",2024-01,1,0\r\n"));
    }
}
