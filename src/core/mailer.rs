use std::path::Path;

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::core::billing::validate_endpoint;
use crate::core::config::split_list;
use crate::core::models::report::SummaryTotals;

const DEFAULT_SENDGRID_ENDPOINT: &str = "https://api.sendgrid.com";
const ATTACHMENT_CONTENT_TYPE: &str = "text/csv";

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("{0} environment variable is not set")]
    MissingConfig(&'static str),
    #[error("No recipient addresses found in RECEIVER_EMAILS")]
    NoRecipients,
    #[error("invalid delivery endpoint: {0}")]
    BadEndpoint(String),
    #[error("Failed to read report file '{path}': {source}")]
    ReadAttachment {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("mail delivery request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("delivery service returned HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

impl DeliveryError {
    /// Configuration problems are detected before any delivery call and
    /// reported as such; everything else is a send failure.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::MissingConfig(_) | Self::NoRecipients)
    }
}

/// Sender, recipients, and the delivery credential, resolved up front so a
/// half-configured environment never reaches the delivery API.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub sender: String,
    pub recipients: Vec<String>,
    api_key: String,
}

impl MailConfig {
    pub fn from_env() -> Result<Self, DeliveryError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, DeliveryError> {
        let require = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(DeliveryError::MissingConfig(name))
        };
        let api_key = require("SENDGRID_API_KEY")?;
        let sender = require("SENDER_EMAIL")?;
        let recipients = split_list(&require("RECEIVER_EMAILS")?);
        if recipients.is_empty() {
            return Err(DeliveryError::NoRecipients);
        }
        Ok(Self {
            sender,
            recipients,
            api_key,
        })
    }
}

// --- SendGrid v3 mail/send payload ---

#[derive(Serialize)]
struct MailRequest {
    personalizations: Vec<Personalization>,
    from: EmailAddress,
    subject: String,
    content: Vec<Content>,
    attachments: Vec<AttachmentPayload>,
}

#[derive(Serialize)]
struct Personalization {
    to: Vec<EmailAddress>,
}

#[derive(Serialize)]
struct EmailAddress {
    email: String,
}

#[derive(Serialize)]
struct Content {
    #[serde(rename = "type")]
    content_type: &'static str,
    value: String,
}

#[derive(Serialize)]
struct AttachmentPayload {
    content: String,
    #[serde(rename = "type")]
    content_type: &'static str,
    filename: String,
    disposition: &'static str,
}

pub fn subject_line(now: DateTime<Utc>) -> String {
    format!("Azure Cost Report - {}", now.format("%B %Y"))
}

fn html_body(totals: &SummaryTotals, currency: &str, now: DateTime<Utc>) -> String {
    let mut summary_rows = String::new();
    for entry in totals.entries() {
        summary_rows.push_str(&format!(
            "<tr><td>{}</td><td>{:.2} {}</td></tr>\n",
            entry.period, entry.total, currency
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<style>
  body {{ font-family: Arial, sans-serif; line-height: 1.6; color: #333; }}
  .container {{ max-width: 800px; margin: 0 auto; padding: 20px; }}
  .header {{ background-color: #0078d4; color: white; padding: 20px; text-align: center; }}
  .summary {{ background-color: #e8f4f8; padding: 15px; border-radius: 5px; }}
  table {{ width: 100%; border-collapse: collapse; margin: 15px 0; }}
  th, td {{ padding: 12px; text-align: left; border-bottom: 1px solid #ddd; }}
  th {{ background-color: #f2f2f2; }}
</style>
</head>
<body>
<div class="container">
  <div class="header"><h1>Azure Cost Report</h1></div>
  <p>Please find attached the Azure cost report for the last three months,
  broken down by subscription.</p>
  <div class="summary">
    <h3>Cost Summary</h3>
    <table>
      <tr><th>Period</th><th>Total Cost ({currency})</th></tr>
{summary_rows}    </table>
  </div>
  <ul>
    <li><strong>Cost type:</strong> Pre-tax actual costs</li>
    <li><strong>Generated on:</strong> {generated}</li>
  </ul>
  <p>This is an automated report. Please do not reply to this email.</p>
</div>
</body>
</html>
"#,
        currency = currency,
        summary_rows = summary_rows,
        generated = now.format("%Y-%m-%d %H:%M:%S UTC"),
    )
}

fn text_body(totals: &SummaryTotals, currency: &str, now: DateTime<Utc>) -> String {
    let mut body = String::from(
        "Azure Cost Report\n\n\
         Please find attached the Azure cost report for the last three months,\n\
         broken down by subscription.\n\nCost Summary:\n",
    );
    for entry in totals.entries() {
        body.push_str(&format!("{}: {:.2} {}\n", entry.period, entry.total, currency));
    }
    body.push_str(&format!(
        "\nCost type: Pre-tax actual costs\nGenerated on: {}\n",
        now.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    body
}

fn build_request(
    config: &MailConfig,
    totals: &SummaryTotals,
    currency: &str,
    filename: &str,
    attachment_bytes: &[u8],
    now: DateTime<Utc>,
) -> MailRequest {
    MailRequest {
        personalizations: vec![Personalization {
            to: config
                .recipients
                .iter()
                .map(|email| EmailAddress {
                    email: email.clone(),
                })
                .collect(),
        }],
        from: EmailAddress {
            email: config.sender.clone(),
        },
        subject: subject_line(now),
        // SendGrid requires text/plain before text/html.
        content: vec![
            Content {
                content_type: "text/plain",
                value: text_body(totals, currency, now),
            },
            Content {
                content_type: "text/html",
                value: html_body(totals, currency, now),
            },
        ],
        attachments: vec![AttachmentPayload {
            content: base64::engine::general_purpose::STANDARD.encode(attachment_bytes),
            content_type: ATTACHMENT_CONTENT_TYPE,
            filename: filename.to_string(),
            disposition: "attachment",
        }],
    }
}

fn sendgrid_endpoint() -> Result<String, DeliveryError> {
    let endpoint = std::env::var("AZCOST_SENDGRID_ENDPOINT")
        .unwrap_or_else(|_| DEFAULT_SENDGRID_ENDPOINT.to_string());
    validate_endpoint(&endpoint).map_err(|e| DeliveryError::BadEndpoint(e.to_string()))?;
    Ok(endpoint)
}

/// Read the written report back, attach it, and make the single delivery
/// call. Returns the delivery status code on success. The report file is
/// untouched either way.
pub async fn send_report(
    client: &reqwest::Client,
    config: &MailConfig,
    report_path: &Path,
    totals: &SummaryTotals,
    currency: &str,
    now: DateTime<Utc>,
) -> Result<u16, DeliveryError> {
    let bytes = std::fs::read(report_path).map_err(|source| DeliveryError::ReadAttachment {
        path: report_path.display().to_string(),
        source,
    })?;
    let filename = report_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "azure_cost_report.csv".to_string());

    let request = build_request(config, totals, currency, &filename, &bytes, now);

    let url = format!("{}/v3/mail/send", sendgrid_endpoint()?);
    let response = client
        .post(&url)
        .header("Authorization", format!("Bearer {}", config.api_key))
        .json(&request)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(DeliveryError::Rejected {
            status: status.as_u16(),
            body,
        });
    }
    Ok(status.as_u16())
}
