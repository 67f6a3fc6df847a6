use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::billing::auth::ArmToken;
use crate::core::billing::{validate_endpoint, BillingApi};
use crate::core::periods::ReportingPeriod;

const DEFAULT_ARM_ENDPOINT: &str = "https://management.azure.com";
const SUBSCRIPTION_API_VERSION: &str = "2022-12-01";
const COST_QUERY_API_VERSION: &str = "2023-03-01";

/// Azure Resource Manager client scoped to one run's bearer token.
pub struct BillingClient {
    http: reqwest::Client,
    token: ArmToken,
    base_url: String,
}

impl BillingClient {
    pub fn new(http: reqwest::Client, token: ArmToken) -> Result<Self> {
        let base_url = std::env::var("AZCOST_ARM_ENDPOINT")
            .unwrap_or_else(|_| DEFAULT_ARM_ENDPOINT.to_string());
        validate_endpoint(&base_url)?;
        Ok(Self {
            http,
            token,
            base_url,
        })
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.token.access_token)
    }
}

// --- Subscription lookup ---

#[derive(Deserialize)]
struct SubscriptionResponse {
    #[serde(rename = "displayName")]
    display_name: Option<String>,
}

// --- Cost Management query ---

#[derive(Serialize)]
struct QueryDefinition {
    #[serde(rename = "type")]
    query_type: &'static str,
    timeframe: &'static str,
    #[serde(rename = "timePeriod")]
    time_period: TimePeriod,
    dataset: Dataset,
}

#[derive(Serialize)]
struct TimePeriod {
    from: String,
    to: String,
}

#[derive(Serialize)]
struct Dataset {
    granularity: &'static str,
    aggregation: Aggregation,
}

#[derive(Serialize)]
struct Aggregation {
    #[serde(rename = "totalCost")]
    total_cost: AggregationExpr,
}

#[derive(Serialize)]
struct AggregationExpr {
    name: &'static str,
    function: &'static str,
}

impl QueryDefinition {
    /// Single pre-tax total over a custom range, no time-granularity
    /// breakdown.
    fn for_period(period: &ReportingPeriod) -> Self {
        Self {
            query_type: "ActualCost",
            timeframe: "Custom",
            time_period: TimePeriod {
                from: arm_timestamp(&period.start),
                to: arm_timestamp(&period.end),
            },
            dataset: Dataset {
                granularity: "None",
                aggregation: Aggregation {
                    total_cost: AggregationExpr {
                        name: "PreTaxCost",
                        function: "Sum",
                    },
                },
            },
        }
    }
}

#[derive(Deserialize)]
struct QueryResult {
    properties: Option<QueryProperties>,
}

#[derive(Deserialize)]
struct QueryProperties {
    rows: Option<Vec<Vec<serde_json::Value>>>,
}

fn arm_timestamp(instant: &DateTime<Utc>) -> String {
    instant.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Extract the total from a query result. No rows means the service has no
/// cost data for the range, which is a true zero. A present row with a
/// non-numeric first column is a malformed result and an error.
fn total_from_rows(rows: &[Vec<serde_json::Value>]) -> Result<f64> {
    let Some(first) = rows.first() else {
        return Ok(0.0);
    };
    first
        .first()
        .and_then(serde_json::Value::as_f64)
        .context("cost query returned a row without a numeric total")
}

impl BillingApi for BillingClient {
    async fn display_name(&self, subscription_id: &str) -> Result<String> {
        let url = format!(
            "{}/subscriptions/{}?api-version={}",
            self.base_url, subscription_id, SUBSCRIPTION_API_VERSION
        );

        let response = self
            .http
            .get(&url)
            .header("Authorization", self.bearer())
            .header("Accept", "application/json")
            .send()
            .await
            .context("failed to send subscription lookup request")?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            anyhow::bail!("unauthorized - the ARM token was rejected");
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            anyhow::bail!("subscription '{}' not found", subscription_id);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("HTTP {} from subscription lookup: {}", status.as_u16(), body);
        }

        let sub: SubscriptionResponse = response
            .json()
            .await
            .context("failed to parse subscription lookup response")?;
        sub.display_name
            .context("subscription lookup response had no displayName")
    }

    async fn period_cost(&self, subscription_id: &str, period: &ReportingPeriod) -> Result<f64> {
        let url = format!(
            "{}/subscriptions/{}/providers/Microsoft.CostManagement/query?api-version={}",
            self.base_url, subscription_id, COST_QUERY_API_VERSION
        );

        let response = self
            .http
            .post(&url)
            .header("Authorization", self.bearer())
            .header("Accept", "application/json")
            .json(&QueryDefinition::for_period(period))
            .send()
            .await
            .context("failed to send cost query request")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("HTTP {} from cost query: {}", status.as_u16(), body);
        }

        let result: QueryResult = response
            .json()
            .await
            .context("failed to parse cost query response")?;
        let rows = result
            .properties
            .context("cost query response had no properties")?
            .rows
            .unwrap_or_default();
        total_from_rows(&rows)
    }
}
