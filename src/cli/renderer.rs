use colored::{control, Colorize};

use crate::core::models::report::ReportData;

/// Render the post-run console summary as a colored (or plain) string.
///
/// Layout:
/// ```text
///  Summary (2 subscriptions)
///   March 2025   12843.77 INR
///   April 2025    9100.00 INR
///   May 2025         0.00 INR
/// ```
pub fn render_summary(report: &ReportData, currency: &str, use_color: bool) -> String {
    control::set_override(use_color);

    let mut lines: Vec<String> = Vec::new();

    let count = report.rows.len();
    let header = format!(
        " Summary ({} subscription{})",
        count,
        if count == 1 { "" } else { "s" }
    );
    lines.push(header.bold().to_string());

    let name_width = report
        .totals
        .entries()
        .iter()
        .map(|e| e.period.len())
        .max()
        .unwrap_or(0);
    let amount_width = report
        .totals
        .entries()
        .iter()
        .map(|e| format!("{:.2}", e.total).len())
        .max()
        .unwrap_or(0);

    for entry in report.totals.entries() {
        // Pad before coloring so ANSI codes don't skew the columns.
        let period = format!("{:<name_width$}", entry.period);
        let amount = format!("{:>amount_width$}", format!("{:.2}", entry.total));
        lines.push(format!("  {}   {} {}", period.cyan(), amount, currency));
    }

    lines.join("\n")
}
