use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use infergate::config::DEFAULT_IAM_URL;
use infergate::transport::{ServerConfig, serve};
use infergate::{BrokerConfig, BrokerService, INFERGATE_VERSION};

/// Prediction broker for a token-guarded hosted inference endpoint.
#[derive(Debug, Parser)]
#[command(name = "infergate", version)]
struct Args {
    /// API key exchanged for bearer tokens.
    #[arg(long, env = "IBM_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Inference deployment URL that predictions are forwarded to.
    #[arg(long, env = "IBM_DEPLOYMENT_URL")]
    deployment_url: Option<String>,

    /// Identity token endpoint.
    #[arg(long, env = "IBM_IAM_URL", default_value = DEFAULT_IAM_URL)]
    iam_url: String,

    /// Externally reachable base URL of this service, pinged to stay awake.
    #[arg(long, env = "PUBLIC_URL")]
    public_url: Option<String>,

    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    #[arg(long, env = "PORT", default_value_t = 5000)]
    port: u16,

    /// Deadline for forwarded predictions.
    #[arg(long, env = "PREDICT_TIMEOUT", default_value = "90s", value_parser = humantime::parse_duration)]
    predict_timeout: Duration,

    /// Deadline for each warm-up call.
    #[arg(long, env = "WARMUP_TIMEOUT", default_value = "25s", value_parser = humantime::parse_duration)]
    warmup_timeout: Duration,

    #[arg(long, env = "WARMUP_INTERVAL", default_value = "4m", value_parser = humantime::parse_duration)]
    warmup_interval: Duration,

    #[arg(long, env = "SELF_PING_INTERVAL", default_value = "10m", value_parser = humantime::parse_duration)]
    self_ping_interval: Duration,
}

impl Args {
    fn into_config(self) -> BrokerConfig {
        // Blank values in a .env file count as unset.
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let mut config = BrokerConfig {
            deployment_url: non_empty(self.deployment_url),
            iam_url: self.iam_url,
            public_url: non_empty(self.public_url),
            server: ServerConfig {
                host: self.host,
                port: self.port,
            },
            predict_timeout: self.predict_timeout,
            warmup_timeout: self.warmup_timeout,
            warmup_interval: self.warmup_interval,
            self_ping_interval: self.self_ping_interval,
            ..BrokerConfig::default()
        };
        if let Some(key) = non_empty(self.api_key) {
            config = config.with_credential(key);
        }
        config
    }
}

/// Initialize tracing with INFERGATE_LOG and LOG_FORMAT support.
fn init_tracing() {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let base_level = match std::env::var("INFERGATE_LOG").as_deref() {
            Ok("debug") => "debug",
            Ok("warn") | Ok("warning") => "warn",
            Ok("error") => "error",
            _ => "info",
        };

        EnvFilter::new(format!(
            "infergate={level},infergate_server={level},tower_http=info",
            level = base_level
        ))
    };

    let use_json = std::env::var("LOG_FORMAT").as_deref() == Ok("json");

    if use_json {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr));
        let _ = subscriber.try_init();
    } else {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr));
        let _ = subscriber.try_init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("infergate {}", INFERGATE_VERSION);

    let config = Args::parse().into_config();
    config.validate().context("invalid configuration")?;
    let server_config = config.server.clone();

    let service = Arc::new(BrokerService::new(config).context("failed to build broker")?);
    service.log_configuration();
    service.start_background_tasks();

    serve(server_config, service).await
}
