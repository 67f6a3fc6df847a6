use anyhow::Result;

use crate::cli::output::OutputOptions;
use crate::core::config::AppConfig;

/// Required environment, checked by name only; values are never printed.
const REQUIRED_ENV: &[(&str, &str)] = &[
    ("SUBSCRIPTION_IDS", "comma-separated subscription IDs"),
    ("AZURE_TENANT_ID", "service principal tenant"),
    ("AZURE_CLIENT_ID", "service principal client ID"),
    ("AZURE_CLIENT_SECRET", "service principal secret"),
    ("SENDGRID_API_KEY", "delivery API key"),
    ("SENDER_EMAIL", "sender address"),
    ("RECEIVER_EMAILS", "comma-separated recipients"),
];

pub fn init(_opts: &OutputOptions) -> Result<()> {
    let path = AppConfig::config_path();
    if path.exists() {
        eprintln!("Config file already exists at {}", path.display());
        eprintln!("Remove it first if you want to regenerate.");
        return Ok(());
    }

    match AppConfig::default().save() {
        Ok(path) => {
            println!("Generated config at {}", path.display());
            println!("  Edit it to set currency, output_dir, or fallback subscriptions.");
        }
        Err(e) => {
            eprintln!("Failed to generate config: {}", e);
            std::process::exit(1);
        }
    }
    Ok(())
}

pub fn check(_opts: &OutputOptions) -> Result<()> {
    let path = AppConfig::config_path();
    if path.exists() {
        let config = match AppConfig::load() {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to load config: {}", e);
                std::process::exit(1);
            }
        };
        let issues = config.validate();
        if issues.is_empty() {
            println!("Config is valid: {}", path.display());
        } else {
            eprintln!("Config issues found in {}:", path.display());
            for issue in &issues {
                eprintln!("  - {}", issue);
            }
            std::process::exit(1);
        }
    } else {
        println!("No config file at {} (defaults apply).", path.display());
    }

    println!("\nEnvironment:");
    let mut missing = false;
    for (name, what) in REQUIRED_ENV {
        let set = std::env::var(name).map(|v| !v.trim().is_empty()).unwrap_or(false);
        if set {
            println!("  {} is set ({})", name, what);
        } else {
            println!("  {} is NOT set ({})", name, what);
            missing = true;
        }
    }
    if missing {
        eprintln!("\nSome required environment variables are missing.");
        std::process::exit(1);
    }
    Ok(())
}
