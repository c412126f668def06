//! HTML pages of the ambassador portal.

use crate::{
    core::report::CodeStats,
    entities::partner,
    web::{EXPORT_PATH, JSON_PATH},
};

const CHART_BAR_WIDTH: usize = 28;
const CHART_BAR_GAP: usize = 12;
const CHART_PLOT_HEIGHT: i64 = 100;

/// Escapes text for use inside HTML element content and attribute values.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Inline SVG bar chart of a code's statistics, oldest month on the left.
///
/// Each month gets a bar for total usage with the validated orders drawn over it.
#[must_use]
pub fn usage_chart(code: &CodeStats) -> String {
    let peak = code
        .stats
        .iter()
        .map(|month| month.total_usage)
        .max()
        .unwrap_or(0)
        .max(1);
    let width = code.stats.len() * (CHART_BAR_WIDTH + CHART_BAR_GAP) + CHART_BAR_GAP;
    let baseline = CHART_PLOT_HEIGHT + 10;

    let mut svg = format!(
        "<svg class=\"usage-chart\" role=\"img\" width=\"{width}\" height=\"{}\" \
         aria-label=\"Usage of {}\">\n",
        baseline + 20,
        escape_html(&code.code)
    );
    for (i, month) in code.stats.iter().rev().enumerate() {
        let x = CHART_BAR_GAP + i * (CHART_BAR_WIDTH + CHART_BAR_GAP);
        let total = month.total_usage * CHART_PLOT_HEIGHT / peak;
        let validated = month.validated_orders * CHART_PLOT_HEIGHT / peak;
        let label = escape_html(&month.month);
        svg.push_str(&format!(
            "<rect class=\"total\" x=\"{x}\" y=\"{}\" width=\"{CHART_BAR_WIDTH}\" height=\"{total}\"><title>{label}: {} uses</title></rect>\n",
            baseline - total,
            month.total_usage
        ));
        svg.push_str(&format!(
            "<rect class=\"validated\" x=\"{x}\" y=\"{}\" width=\"{CHART_BAR_WIDTH}\" height=\"{validated}\"><title>{label}: {} validated</title></rect>\n",
            baseline - validated,
            month.validated_orders
        ));
        svg.push_str(&format!(
            "<text x=\"{x}\" y=\"{}\" font-size=\"9\">{label}</text>\n",
            baseline + 14
        ));
    }
    svg.push_str("</svg>\n");
    svg
}

fn code_section(code: &CodeStats) -> String {
    let name = escape_html(&code.code);
    let mut section = format!(
        "<section class=\"coupon\" data-code=\"{id}\">\n<h2>{name}</h2>\n",
        id = code.code_id
    );

    if code.stats.is_empty() {
        section.push_str("<p class=\"text-muted\">No data available for this period</p>\n");
    } else {
        section.push_str(&usage_chart(code));
        section.push_str(
            "<table>\n<thead><tr><th>Month</th><th>Total Usage</th><th>Validated Orders</th></tr></thead>\n<tbody>\n",
        );
        for month in &code.stats {
            section.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                escape_html(&month.month),
                month.total_usage,
                month.validated_orders
            ));
        }
        section.push_str("</tbody>\n</table>\n");
    }

    section.push_str("</section>\n");
    section
}

/// The portal page listing every owned code with its monthly statistics.
#[must_use]
pub fn portal_page(partner: &partner::Model, report: &[CodeStats], months: u32) -> String {
    let body = if report.is_empty() {
        "<p>No discount codes are linked to your account.</p>\n".to_string()
    } else {
        report.iter().map(code_section).collect()
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>My Discount Codes</title>
</head>
<body>
<h1>My Discount Codes</h1>
<p>Welcome, {name}. Usage over the last {months} months.</p>
<p><a href="{EXPORT_PATH}?months={months}">Export CSV</a> | <a href="{JSON_PATH}?months={months}">JSON</a></p>
{body}</body>
</html>
"#,
        name = escape_html(&partner.name),
    )
}

/// A minimal error page. `message` must not contain internal details.
#[must_use]
pub fn error_page(message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Error</title>
</head>
<body>
<h1>Something went wrong</h1>
<p>{}</p>
</body>
</html>
"#,
        escape_html(message)
    )
}
