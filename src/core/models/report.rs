use std::fmt;

use serde::Serialize;

use crate::core::periods::ReportingPeriod;

/// Literal text written for a failed or unresolved measurement. Distinct
/// from a true zero cost.
pub const NOT_AVAILABLE: &str = "N/A";

/// Cost of one subscription over one reporting period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CostCell {
    Amount(f64),
    NotAvailable,
}

impl CostCell {
    pub fn amount(&self) -> Option<f64> {
        match self {
            Self::Amount(v) => Some(*v),
            Self::NotAvailable => None,
        }
    }
}

impl fmt::Display for CostCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // `{}` on f64 is shortest-roundtrip, so written values parse
            // back exactly.
            Self::Amount(v) => write!(f, "{}", v),
            Self::NotAvailable => write!(f, "{}", NOT_AVAILABLE),
        }
    }
}

/// One report line: a subscription and its cost per period, aligned with
/// the run's period order.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionRow {
    pub subscription_id: String,
    pub display_name: String,
    pub costs: Vec<CostCell>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PeriodTotal {
    pub period: String,
    pub total: f64,
}

/// Running totals per period, in period order. Keyed by period identity
/// (index), never by month-name ordering.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryTotals {
    entries: Vec<PeriodTotal>,
}

impl SummaryTotals {
    pub fn new(periods: &[ReportingPeriod]) -> Self {
        Self {
            entries: periods
                .iter()
                .map(|p| PeriodTotal {
                    period: p.name.clone(),
                    total: 0.0,
                })
                .collect(),
        }
    }

    pub fn add(&mut self, period_index: usize, amount: f64) {
        if let Some(entry) = self.entries.get_mut(period_index) {
            entry.total += amount;
        }
    }

    pub fn entries(&self) -> &[PeriodTotal] {
        &self.entries
    }

    pub fn total_for(&self, period_name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| e.period == period_name)
            .map(|e| e.total)
    }
}

/// Everything one run aggregates: the periods it covered, the per-
/// subscription rows in input order, and the per-period grand totals.
#[derive(Debug, Clone, Serialize)]
pub struct ReportData {
    pub periods: Vec<ReportingPeriod>,
    pub rows: Vec<SubscriptionRow>,
    pub totals: SummaryTotals,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::periods::last_three_full_months;
    use chrono::{TimeZone, Utc};

    fn periods() -> [ReportingPeriod; 3] {
        last_three_full_months(Utc.with_ymd_and_hms(2025, 6, 15, 0, 0, 0).unwrap())
    }

    #[test]
    fn cost_cell_displays_exact_decimal() {
        assert_eq!(CostCell::Amount(123.45).to_string(), "123.45");
        assert_eq!(CostCell::Amount(0.0).to_string(), "0");
        assert_eq!(CostCell::NotAvailable.to_string(), "N/A");
    }

    #[test]
    fn cost_cell_display_round_trips() {
        let original = 7431.0078125_f64;
        let text = CostCell::Amount(original).to_string();
        let parsed: f64 = text.parse().unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn totals_start_at_zero_in_period_order() {
        let totals = SummaryTotals::new(&periods());
        let names: Vec<&str> = totals.entries().iter().map(|e| e.period.as_str()).collect();
        assert_eq!(names, vec!["March 2025", "April 2025", "May 2025"]);
        assert!(totals.entries().iter().all(|e| e.total == 0.0));
    }

    #[test]
    fn totals_accumulate_by_index() {
        let mut totals = SummaryTotals::new(&periods());
        totals.add(0, 10.0);
        totals.add(0, 2.5);
        totals.add(2, 1.0);
        assert_eq!(totals.total_for("March 2025"), Some(12.5));
        assert_eq!(totals.total_for("April 2025"), Some(0.0));
        assert_eq!(totals.total_for("May 2025"), Some(1.0));
    }

    #[test]
    fn totals_ignore_out_of_range_index() {
        let mut totals = SummaryTotals::new(&periods());
        totals.add(9, 100.0);
        assert!(totals.entries().iter().all(|e| e.total == 0.0));
    }

    #[test]
    fn cost_cell_serializes_amount_as_number() {
        let json = serde_json::to_value(CostCell::Amount(5.5)).unwrap();
        assert_eq!(json, serde_json::json!(5.5));
        let json = serde_json::to_value(CostCell::NotAvailable).unwrap();
        assert_eq!(json, serde_json::json!(null));
    }
}
