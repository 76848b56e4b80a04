use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use daps_client::cache::key_set_cache::KeySetCache;
use daps_client::config::proc_loader::{file_to_config, load_identity};
use daps_client::observability::metrics::encode_metrics;
use daps_client::resilience::retry::RetrySettings;
use daps_client::sources::daps::DapsTokenAcquirer;
use daps_client::sources::jwks::HttpKeySetSource;
use daps_client::utils::logging;
use daps_client::utils::logging::LogLevel;
use daps_client::{TokenProvider, TokenVerifier, ValidationRuleChain};
use reqwest::Client;
use tracing::info;

const DEFAULT_HTTP_TIMEOUT_MS: u64 = 5000;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = "daps-client.yaml")]
    config: String,
    #[arg(long, env = "LOG_LEVEL" , value_enum)]
    log_level: Option<LogLevel>,
    /// print Prometheus metrics to stderr before exiting
    #[arg(long)]
    print_metrics: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the current DAT
    Token,
    /// Print the current DAT as a DynamicAttributeToken document
    Dat,
    /// Verify an inbound DAT and print the rule report
    Verify { token: String },
    /// Print id and algorithm of the DAPS verification key
    PublicKey,
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Load YAML config, init logging
    // -------------------------------

    let args = Args::parse();
    let service_config = file_to_config(Path::new(&args.config)).await?;
    logging::run(&service_config, args.log_level);

    // -------------------------------
    // 2. Create request client
    // -------------------------------

    let timeout_ms = service_config
        .settings
        .http
        .as_ref()
        .and_then(|http| http.timeout_ms)
        .unwrap_or(DEFAULT_HTTP_TIMEOUT_MS);
    let client = Client::builder()
        .timeout(Duration::from_millis(timeout_ms))
        .build()
        .context("cannot build http client")?;

    // -------------------------------
    // 3. Wire key cache, acquirer, provider and verifier
    // -------------------------------

    let daps = &service_config.daps;
    let key_set = Arc::new(KeySetCache::new(
        HttpKeySetSource::new(daps.key_url.to_owned(), client.clone()),
        daps.key_id.to_owned(),
    ));
    let identity = load_identity(&service_config.identity)?;
    let acquirer = DapsTokenAcquirer::new(client, identity, daps.assertion_settings());
    let provider = TokenProvider::new(daps.token_url.to_owned(), acquirer, key_set.clone());

    let validation = &service_config.validation;
    let verifier = TokenVerifier::new(
        key_set,
        ValidationRuleChain::dat_defaults(validation.issuer.as_deref(), validation.audience.as_deref()),
    );
    let retry = RetrySettings::from(service_config.settings.retry.as_ref());

    // -------------------------------
    // 4. Run command
    // -------------------------------

    info!("daps client starting...");
    match args.command {
        Command::Token => {
            let token = retry.run_with_retry(|| provider.provide_token()).await?;
            println!("{token}");
        }
        Command::Dat => {
            let dat = retry.run_with_retry(|| provider.dat()).await?;
            println!("{}", serde_json::to_string_pretty(&dat)?);
        }
        Command::Verify { token } => {
            // a rejected token stays rejected, no retry
            let report = verifier.verify(&token).await?;
            for outcome in &report.result.outcomes {
                println!("{:<12} {:?}", outcome.rule, outcome.result);
            }
            if report.is_accepted() {
                println!("accepted");
            } else {
                println!("rejected: {}", report.violations().join("; "));
            }
        }
        Command::PublicKey => {
            let key = retry.run_with_retry(|| provider.public_key()).await?;
            println!("kid={:?} alg={:?}", key.key_id, key.algorithm);
        }
    }

    if args.print_metrics {
        eprintln!("{}", encode_metrics().await?);
    }
    Ok(())
}
