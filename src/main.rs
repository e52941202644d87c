use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lead_campaigns::config::Config;
use lead_campaigns::content::{ContentGenerator, GenerativeClient};
use lead_campaigns::dispatch::CampaignEngine;
use lead_campaigns::mailer::build_transport;
use lead_campaigns::models::{DispatchMode, LeadRecord, TierCounts};
use lead_campaigns::store::StaticLeadStore;

/// Runs one tiered campaign dispatch over a JSON export of scored leads.
///
/// Usage: campaign-runner <leads.json> [high] [medium] [low] [--test]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lead_campaigns=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let test_mode = if let Some(pos) = args.iter().position(|a| a == "--test") {
        args.remove(pos);
        true
    } else {
        false
    };

    let leads_path = args
        .first()
        .cloned()
        .context("usage: campaign-runner <leads.json> [high] [medium] [low] [--test]")?;
    let counts = TierCounts {
        high: parse_count(args.get(1), 0)?,
        medium: parse_count(args.get(2), 0)?,
        low: parse_count(args.get(3), 0)?,
    };

    let raw = tokio::fs::read_to_string(&leads_path)
        .await
        .with_context(|| format!("Failed to read leads file {}", leads_path))?;
    let records: Vec<LeadRecord> =
        serde_json::from_str(&raw).with_context(|| format!("Invalid leads JSON in {}", leads_path))?;
    tracing::info!("Loaded {} lead record(s) from {}", records.len(), leads_path);

    let store = Arc::new(StaticLeadStore::new(records));
    let transport = build_transport(&config);
    let backend = match &config.generative {
        Some(backend) => Some(
            GenerativeClient::new(backend).context("Failed to build generative client")?,
        ),
        None => None,
    };
    let generator = ContentGenerator::new(backend, config.sender.clone());
    let engine = CampaignEngine::new(
        store,
        transport,
        generator,
        Duration::from_millis(config.send_delay_ms),
    );

    let mode = if test_mode {
        DispatchMode::Test
    } else {
        DispatchMode::Live
    };
    let report = engine.dispatch(counts, mode).await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn parse_count(arg: Option<&String>, default: usize) -> anyhow::Result<usize> {
    match arg {
        Some(value) => value
            .parse::<usize>()
            .with_context(|| format!("Invalid tier count: {}", value)),
        None => Ok(default),
    }
}
