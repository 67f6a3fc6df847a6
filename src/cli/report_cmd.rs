use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;

use crate::cli::output::{OutputFormat, OutputOptions};
use crate::cli::renderer;
use crate::core::aggregate::aggregate;
use crate::core::billing::auth::{authenticate, ServicePrincipal};
use crate::core::billing::client::BillingClient;
use crate::core::config::{AppConfig, RunConfig};
use crate::core::mailer::{self, MailConfig};
use crate::core::periods::last_three_full_months;
use crate::core::report_file::write_report;

/// Run the whole pipeline: authenticate, aggregate, write the CSV, send the
/// mail. Configuration, authentication, and file-write failures abort with
/// `?`; a send failure after a successful write is reported with the
/// surviving file path and still fails the run.
pub async fn run(
    output_dir: Option<PathBuf>,
    skip_send: bool,
    opts: &OutputOptions,
) -> Result<()> {
    let config = AppConfig::load().unwrap_or_default();
    let run_config = RunConfig::resolve(&config)?;
    let currency = config.settings.currency.clone();

    let http = reqwest::Client::new();

    eprintln!("Authenticating with Azure via service principal...");
    let principal = ServicePrincipal::from_env()?;
    let token = authenticate(&http, &principal)
        .await
        .context("Authentication failed; no report was generated")?;
    eprintln!("Authentication successful.");

    let billing = BillingClient::new(http.clone(), token)?;
    let now = Utc::now();
    let periods = last_three_full_months(now);

    eprintln!(
        "\nGenerating cost report for {} subscription{}.",
        run_config.subscription_ids.len(),
        if run_config.subscription_ids.len() == 1 { "" } else { "s" }
    );
    eprintln!(
        "Reporting period: {} to {}\n",
        periods[0].name, periods[2].name
    );
    if opts.verbose {
        for period in &periods {
            eprintln!("  {}: {} .. {}", period.name, period.start, period.end);
        }
    }

    let report = aggregate(&billing, &run_config.subscription_ids, &periods, &currency).await;

    let dir = output_dir
        .or_else(|| config.settings.output_dir.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));
    let report_path = write_report(&dir, &report, now)?;
    eprintln!("\nCost report saved to {}", report_path.display());

    match opts.format {
        OutputFormat::Text => {
            println!("\n{}", renderer::render_summary(&report, &currency, opts.use_color));
        }
        OutputFormat::Json => {
            let json = if opts.pretty {
                serde_json::to_string_pretty(&report)?
            } else {
                serde_json::to_string(&report)?
            };
            println!("{}", json);
        }
    }

    if skip_send {
        eprintln!("\nSkipping email delivery (--skip-send).");
        return Ok(());
    }

    eprintln!("\nSending email with cost report...");
    let send_result = match MailConfig::from_env() {
        Ok(mail_config) => {
            mailer::send_report(&http, &mail_config, &report_path, &report.totals, &currency, now)
                .await
        }
        Err(e) => Err(e),
    };

    match send_result {
        Ok(status) => {
            eprintln!("Email sent successfully (HTTP {}).", status);
            Ok(())
        }
        Err(e) if e.is_configuration() => {
            eprintln!("Email configuration error: {:#}", e);
            anyhow::bail!(
                "Email was not attempted; report remains at {}",
                report_path.display()
            );
        }
        Err(e) => {
            eprintln!("Failed to send email: {:#}", e);
            anyhow::bail!(
                "Email delivery failed; report remains at {}",
                report_path.display()
            );
        }
    }
}
