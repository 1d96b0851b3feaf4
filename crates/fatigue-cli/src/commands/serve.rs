//! Serve command - load the model and run the HTTP API.

use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use fatigue_adapters::{load_classifier, DEFAULT_MODEL_PATH};
use fatigue_core::INPUT_SIZE;
use fatigue_http::AppState;
use tracing::{info, warn};

use super::{parse_image_size, parse_positive};
use crate::config::AppConfig;

mod defaults {
    pub const HOST: &str = "0.0.0.0";
    pub const PORT: u16 = 8000;
    pub const BODY_LIMIT_MB: usize = 10;
}

/// Arguments for the HTTP server.
#[derive(Args, Clone, Debug)]
pub struct ServeArgs {
    /// Address to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, value_parser = parse_positive::<u16>)]
    pub port: Option<u16>,

    /// Model artifact to load
    #[arg(long, value_name = "PATH")]
    pub model_path: Option<PathBuf>,

    /// Square input size the model was trained with
    #[arg(long, value_parser = parse_image_size)]
    pub input_size: Option<u32>,

    /// Maximum upload size in MiB
    #[arg(long, value_parser = parse_positive::<usize>)]
    pub body_limit_mb: Option<usize>,
}

impl ServeArgs {
    /// Apply configuration file values, respecting CLI precedence.
    #[must_use]
    pub fn with_config(mut args: Self, config: &AppConfig) -> Self {
        if args.host.is_none() {
            args.host.clone_from(&config.server.host);
        }
        args.port = args.port.or(config.server.port);
        if args.model_path.is_none() {
            args.model_path.clone_from(&config.model.path);
        }
        args.input_size = args.input_size.or(config.model.input_size);
        args.body_limit_mb = args.body_limit_mb.or(config.server.body_limit_mb);
        args
    }

    fn host(&self) -> &str {
        self.host.as_deref().unwrap_or(defaults::HOST)
    }

    fn port(&self) -> u16 {
        self.port.unwrap_or(defaults::PORT)
    }

    fn model_path(&self) -> &Path {
        self.model_path
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_MODEL_PATH))
    }

    fn input_size(&self) -> u32 {
        self.input_size.unwrap_or(INPUT_SIZE)
    }

    fn body_limit(&self) -> usize {
        self.body_limit_mb
            .unwrap_or(defaults::BODY_LIMIT_MB)
            .saturating_mul(1024 * 1024)
    }

    fn addr(&self) -> Result<SocketAddr> {
        (self.host(), self.port())
            .to_socket_addrs()
            .with_context(|| format!("Invalid bind address {}:{}", self.host(), self.port()))?
            .next()
            .with_context(|| format!("No address found for {}", self.host()))
    }
}

/// Run the serve command.
///
/// Expects `args` to have been processed through `with_config()` first.
pub fn run(args: &ServeArgs) -> Result<()> {
    let addr = args.addr()?;

    let state = match load_classifier(args.model_path(), args.input_size()) {
        Some(classifier) => AppState::with_classifier(classifier),
        None => {
            warn!("Serving without a model; /predict will answer 503");
            AppState::without_model()
        }
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    info!("Starting server on {addr}");
    runtime.block_on(fatigue_http::serve(addr, state, args.body_limit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_args() -> ServeArgs {
        ServeArgs {
            host: None,
            port: None,
            model_path: None,
            input_size: None,
            body_limit_mb: None,
        }
    }

    #[test]
    fn test_defaults() {
        let args = ServeArgs::with_config(empty_args(), &AppConfig::default());
        assert_eq!(args.host(), "0.0.0.0");
        assert_eq!(args.port(), 8000);
        assert_eq!(args.model_path(), Path::new("Model/fatigue_model.safetensors"));
        assert_eq!(args.input_size(), 256);
        assert_eq!(args.body_limit(), 10 * 1024 * 1024);
    }

    #[test]
    fn test_cli_overrides_config() {
        let mut config = AppConfig::default();
        config.server.port = Some(9000);
        config.server.host = Some("127.0.0.1".to_string());

        let args = ServeArgs {
            port: Some(7000),
            ..empty_args()
        };
        let args = ServeArgs::with_config(args, &config);

        assert_eq!(args.port(), 7000);
        assert_eq!(args.host(), "127.0.0.1");
    }

    #[test]
    fn test_addr_from_ip() {
        let args = ServeArgs {
            host: Some("127.0.0.1".to_string()),
            port: Some(8123),
            ..empty_args()
        };
        assert_eq!(args.addr().ok(), "127.0.0.1:8123".parse::<SocketAddr>().ok());
    }
}
