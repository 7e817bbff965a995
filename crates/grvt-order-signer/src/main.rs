/*
[INPUT]:  CLI arguments, optional YAML configuration file, OS shutdown signals
[OUTPUT]: Signed order report on stdout, optional submission result
[POS]:    Binary entry point
[UPDATE]: When changing CLI flags, startup flow, or shutdown handling
*/

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use grvt_order_adapter::GrvtClient;
use grvt_order_signer::workflow::{self, InstrumentSource};
use grvt_order_signer::SignerConfig;

#[derive(Parser, Debug)]
#[command(name = "grvt-order-signer", version, about = "Sign GRVT orders with EIP-712 and optionally submit them")]
struct Cli {
    #[arg(long = "config", value_name = "PATH")]
    config_path: Option<PathBuf>,
    /// dev, staging, testnet or prod
    #[arg(long = "env", value_name = "ENV")]
    env: Option<String>,
    /// Order JSON, wrapped (`{"order": {...}}`) or bare
    #[arg(long = "order", value_name = "PATH")]
    order_path: PathBuf,
    /// Instrument JSON map; fetched from the exchange when omitted
    #[arg(long = "instruments", value_name = "PATH")]
    instruments_path: Option<PathBuf>,
    /// Write fetched instruments to this file
    #[arg(long = "save-instruments", value_name = "PATH", conflicts_with = "instruments_path")]
    save_instruments: Option<PathBuf>,
    /// File holding the hex private key
    #[arg(long = "private-key-file", value_name = "PATH")]
    private_key_file: Option<PathBuf>,
    /// Variable holding the hex private key, used when no key file is given
    #[arg(long = "private-key-env", value_name = "NAME", default_value = "GRVT_PRIVATE_KEY")]
    private_key_env: String,
    /// Submit the signed order after printing it
    #[arg(long = "submit")]
    submit: bool,
    /// Account to submit for; defaults to the config file account
    #[arg(long = "account", value_name = "ACCOUNT")]
    account: Option<String>,
    /// Variable holding the API key used for submission
    #[arg(long = "api-key-env", value_name = "NAME")]
    api_key_env: Option<String>,
    /// Also write the report to this file
    #[arg(long = "output", value_name = "PATH")]
    output_path: Option<PathBuf>,
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(&args.log_level)?;

    let shutdown = CancellationToken::new();
    setup_signal_handlers(shutdown.clone());

    tokio::select! {
        result = run(args) => result,
        () = shutdown.cancelled() => {
            warn!("interrupted before completion");
            Ok(())
        }
    }
}

async fn run(args: Cli) -> Result<()> {
    let config = match &args.config_path {
        Some(path) => load_config(path)?,
        None => SignerConfig::default(),
    };
    let env = config.environment(args.env.as_deref())?;
    info!(env = %env, order = %args.order_path.display(), "starting grvt-order-signer");

    let submit_account = if args.submit {
        let account = args
            .account
            .clone()
            .or_else(|| config.account.as_ref().map(|account| account.id.clone()))
            .context("--submit needs --account or an account in the config file")?;
        Some(account)
    } else {
        None
    };

    let mut client = GrvtClient::new(config.client_config(env)).context("build client")?;
    if let Some(account) = &submit_account {
        let var = args
            .api_key_env
            .clone()
            .or_else(|| config.account.as_ref().map(|account| account.api_key_env.clone()))
            .unwrap_or_else(|| "GRVT_API_KEY".to_string());
        let api_key = std::env::var(&var).with_context(|| format!("read API key from ${var}"))?;
        client = client.with_api_key(account.clone(), api_key);
    }

    let source = match args.instruments_path.clone().or_else(|| config.instruments_file.clone()) {
        Some(path) => InstrumentSource::File(path),
        None => InstrumentSource::Fetch {
            save_to: args.save_instruments.clone(),
        },
    };
    let catalog = workflow::load_catalog(&client, &source).await?;
    let order = workflow::load_order(&args.order_path)?;
    let key = read_signing_key(&args)?;

    let signed = workflow::sign(&client, catalog, &order, &key)?;
    let report = workflow::report(&signed);
    let rendered = serde_json::to_string_pretty(&report).context("render report")?;
    println!("{rendered}");

    if let Some(path) = &args.output_path {
        std::fs::write(path, &rendered).with_context(|| format!("write report to {}", path.display()))?;
        info!(path = %path.display(), "report written");
    }

    if let Some(account) = &submit_account {
        let response = workflow::submit(&client, account, &signed).await?;
        println!(
            "{}",
            serde_json::to_string_pretty(&response).context("render submission response")?
        );
        info!(account = %account, "order submitted");
    }

    Ok(())
}

fn init_tracing(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(log_level).context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!(err))
        .context("initialize tracing subscriber")?;
    Ok(())
}

fn load_config(path: &PathBuf) -> Result<SignerConfig> {
    let path_str = path
        .to_str()
        .context("config path must be valid utf-8")?;
    SignerConfig::from_file(path_str).context("load config")
}

fn read_signing_key(args: &Cli) -> Result<grvt_order_adapter::SigningKey> {
    let raw = match &args.private_key_file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("read private key file {}", path.display()))?,
        None => match std::env::var(&args.private_key_env) {
            Ok(value) => value,
            Err(_) => bail!(
                "no private key: pass --private-key-file or set ${}",
                args.private_key_env
            ),
        },
    };
    workflow::parse_signing_key(&raw)
}

fn setup_signal_handlers(shutdown: CancellationToken) {
    let shutdown_clone = shutdown.clone();
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to install SIGINT handler");
            return;
        }
        info!("received SIGINT");
        shutdown_clone.cancel();
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let shutdown_clone = shutdown.clone();
        tokio::spawn(async move {
            match signal(SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                    info!("received SIGTERM");
                    shutdown_clone.cancel();
                }
                Err(err) => {
                    warn!(error = %err, "failed to install SIGTERM handler");
                }
            }
        });
    }
}
