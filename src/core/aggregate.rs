use crate::core::billing::BillingApi;
use crate::core::models::report::{CostCell, ReportData, SubscriptionRow, SummaryTotals};
use crate::core::periods::ReportingPeriod;

/// Walk the configured subscriptions sequentially and build the report.
///
/// A failed display-name lookup skips the subscription entirely: no row, no
/// contribution to the totals. A failed cost query for a single period
/// records the `N/A` sentinel for that cell and moves on; it never aborts
/// the subscription or the run. Both failure kinds are logged to stderr.
pub async fn aggregate<B: BillingApi>(
    api: &B,
    subscription_ids: &[String],
    periods: &[ReportingPeriod; 3],
    currency: &str,
) -> ReportData {
    let mut totals = SummaryTotals::new(periods);
    let mut rows = Vec::with_capacity(subscription_ids.len());

    for subscription_id in subscription_ids {
        let display_name = match api.display_name(subscription_id).await {
            Ok(name) => name,
            Err(e) => {
                eprintln!(
                    "-> Error fetching details for subscription {}: {:#}",
                    subscription_id, e
                );
                continue;
            }
        };
        eprintln!("-> Processing subscription: {} ({})", display_name, subscription_id);

        let mut costs = Vec::with_capacity(periods.len());
        for (index, period) in periods.iter().enumerate() {
            match api.period_cost(subscription_id, period).await {
                Ok(amount) => {
                    eprintln!("   Cost for {}: {:.2} {}", period.name, amount, currency);
                    totals.add(index, amount);
                    costs.push(CostCell::Amount(amount));
                }
                Err(e) => {
                    eprintln!("   Error fetching cost for {}: {:#}", period.name, e);
                    costs.push(CostCell::NotAvailable);
                }
            }
        }

        rows.push(SubscriptionRow {
            subscription_id: subscription_id.clone(),
            display_name,
            costs,
        });
    }

    ReportData {
        periods: periods.to_vec(),
        rows,
        totals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::periods::last_three_full_months;
    use anyhow::{anyhow, Result};
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;

    /// Deterministic stand-in: subscriptions absent from `names` fail
    /// lookup; (subscription, period) pairs mapped to `Err` fail the query;
    /// unmapped pairs return zero, like an empty result set.
    struct FakeBilling {
        names: HashMap<String, String>,
        costs: HashMap<(String, String), Result<f64, String>>,
    }

    impl FakeBilling {
        fn new() -> Self {
            Self {
                names: HashMap::new(),
                costs: HashMap::new(),
            }
        }

        fn with_name(mut self, id: &str, name: &str) -> Self {
            self.names.insert(id.to_string(), name.to_string());
            self
        }

        fn with_cost(mut self, id: &str, period: &str, amount: f64) -> Self {
            self.costs
                .insert((id.to_string(), period.to_string()), Ok(amount));
            self
        }

        fn with_failure(mut self, id: &str, period: &str, message: &str) -> Self {
            self.costs
                .insert((id.to_string(), period.to_string()), Err(message.to_string()));
            self
        }
    }

    impl BillingApi for FakeBilling {
        async fn display_name(&self, subscription_id: &str) -> Result<String> {
            self.names
                .get(subscription_id)
                .cloned()
                .ok_or_else(|| anyhow!("subscription '{}' not found", subscription_id))
        }

        async fn period_cost(
            &self,
            subscription_id: &str,
            period: &ReportingPeriod,
        ) -> Result<f64> {
            match self
                .costs
                .get(&(subscription_id.to_string(), period.name.clone()))
            {
                Some(Ok(amount)) => Ok(*amount),
                Some(Err(message)) => Err(anyhow!("{}", message)),
                None => Ok(0.0),
            }
        }
    }

    fn periods() -> [ReportingPeriod; 3] {
        // March, April, May 2025
        last_three_full_months(Utc.with_ymd_and_hms(2025, 6, 15, 0, 0, 0).unwrap())
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn failed_lookup_skips_subscription_entirely() {
        let api = FakeBilling::new()
            .with_name("sub-A", "Prod")
            .with_cost("sub-A", "March 2025", 100.0)
            .with_cost("sub-A", "April 2025", 200.0)
            .with_cost("sub-A", "May 2025", 300.0)
            .with_cost("sub-B", "March 2025", 999.0);

        let report = aggregate(&api, &ids(&["sub-A", "sub-B"]), &periods(), "INR").await;

        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].subscription_id, "sub-A");
        assert_eq!(report.rows[0].display_name, "Prod");
        assert_eq!(report.totals.total_for("March 2025"), Some(100.0));
        assert_eq!(report.totals.total_for("April 2025"), Some(200.0));
        assert_eq!(report.totals.total_for("May 2025"), Some(300.0));
    }

    #[tokio::test]
    async fn failed_period_query_records_sentinel_and_continues() {
        let api = FakeBilling::new()
            .with_name("sub-A", "Prod")
            .with_cost("sub-A", "March 2025", 10.0)
            .with_failure("sub-A", "April 2025", "HTTP 500 from cost query")
            .with_cost("sub-A", "May 2025", 30.0);

        let report = aggregate(&api, &ids(&["sub-A"]), &periods(), "INR").await;

        let row = &report.rows[0];
        assert_eq!(row.costs[0], CostCell::Amount(10.0));
        assert_eq!(row.costs[1], CostCell::NotAvailable);
        assert_eq!(row.costs[2], CostCell::Amount(30.0));
        // The failed period contributes nothing, not a sentinel.
        assert_eq!(report.totals.total_for("April 2025"), Some(0.0));
        assert_eq!(report.totals.total_for("March 2025"), Some(10.0));
    }

    #[tokio::test]
    async fn totals_are_the_sum_of_present_cells() {
        let api = FakeBilling::new()
            .with_name("sub-A", "Prod")
            .with_name("sub-B", "Dev")
            .with_cost("sub-A", "March 2025", 1.5)
            .with_cost("sub-B", "March 2025", 2.5)
            .with_failure("sub-B", "May 2025", "boom")
            .with_cost("sub-A", "May 2025", 7.0);

        let report = aggregate(&api, &ids(&["sub-A", "sub-B"]), &periods(), "INR").await;

        for entry in report.totals.entries() {
            let index = report
                .periods
                .iter()
                .position(|p| p.name == entry.period)
                .unwrap();
            let sum: f64 = report
                .rows
                .iter()
                .filter_map(|row| row.costs[index].amount())
                .sum();
            assert_eq!(entry.total, sum);
        }
        assert_eq!(report.totals.total_for("March 2025"), Some(4.0));
        assert_eq!(report.totals.total_for("May 2025"), Some(7.0));
    }

    #[tokio::test]
    async fn empty_result_counts_as_zero_cell_not_sentinel() {
        // No cost mapping at all: the fake returns 0.0, like a query with
        // no rows.
        let api = FakeBilling::new().with_name("sub-A", "Prod");

        let report = aggregate(&api, &ids(&["sub-A"]), &periods(), "INR").await;

        assert!(report.rows[0]
            .costs
            .iter()
            .all(|c| *c == CostCell::Amount(0.0)));
        assert_eq!(report.totals.total_for("March 2025"), Some(0.0));
    }

    #[tokio::test]
    async fn rows_preserve_input_order() {
        let api = FakeBilling::new()
            .with_name("sub-C", "Charlie")
            .with_name("sub-A", "Alpha")
            .with_name("sub-B", "Bravo");

        let report = aggregate(&api, &ids(&["sub-C", "sub-A", "sub-B"]), &periods(), "INR").await;

        let order: Vec<&str> = report
            .rows
            .iter()
            .map(|r| r.subscription_id.as_str())
            .collect();
        assert_eq!(order, vec!["sub-C", "sub-A", "sub-B"]);
    }

    #[tokio::test]
    async fn all_lookups_failing_yields_empty_report() {
        let api = FakeBilling::new();

        let report = aggregate(&api, &ids(&["sub-A", "sub-B"]), &periods(), "INR").await;

        assert!(report.rows.is_empty());
        assert!(report.totals.entries().iter().all(|e| e.total == 0.0));
    }
}
