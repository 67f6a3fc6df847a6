pub mod auth;
pub mod client;

use anyhow::Result;

use crate::core::periods::ReportingPeriod;

/// Seam between the aggregation loop and the billing service. Lets the
/// aggregator be driven by a deterministic stand-in in tests.
pub trait BillingApi {
    /// Resolve a subscription's human-readable display name.
    async fn display_name(&self, subscription_id: &str) -> Result<String>;

    /// Total pre-tax cost for one subscription over one period. An empty
    /// result set from the service is a valid zero, not an error.
    async fn period_cost(&self, subscription_id: &str, period: &ReportingPeriod) -> Result<f64>;
}

/// Validate that a resolved endpoint URL uses HTTPS.
///
/// Endpoint overrides must pass this before credentials are attached, to
/// prevent exfiltration over plain HTTP or other schemes.
pub fn validate_endpoint(url: &str) -> Result<()> {
    if !url.starts_with("https://") {
        anyhow::bail!("endpoint must use HTTPS, got: {}", url);
    }
    Ok(())
}
