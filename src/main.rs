//! srunkeep - keeps an SRUN campus portal login alive
//!
//! Polls a test URL on a fixed interval; when the network drops, rejoins
//! the configured WiFi and runs the portal login state machine, recording
//! outcomes in the audit log.

use anyhow::Result;
use clap::Parser;
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use srunkeep::config::Config;
use srunkeep::logsink::LogSink;
use srunkeep::models::{Credentials, LoginOutcome, SuccessReason};
use srunkeep::portal::{HttpBackend, SrunPortal};
use srunkeep::utils;

#[derive(Parser, Debug)]
#[command(name = "srunkeep")]
#[command(about = "SRUN Campus Portal Auto Login Client", long_about = None)]
struct Args {
    /// Run in daemon mode (continuous monitoring)
    #[arg(short, long)]
    daemon: bool,

    /// Config file path (default: config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Override the configured username
    #[arg(long)]
    username: Option<String>,

    /// Override the configured password
    #[arg(long)]
    password: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut cfg = Config::load(args.config.as_deref())?;
    if let Some(username) = args.username {
        cfg.username = username;
    }
    if let Some(password) = args.password {
        cfg.password = password;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&cfg.logging.level)),
        )
        .init();

    tracing::info!("srunkeep - SRUN Campus Portal Auto Login");
    tracing::info!("========================================");

    if cfg.username.is_empty() || cfg.password.is_empty() {
        anyhow::bail!("username and password must be set (config.toml or --username/--password)");
    }

    let sink = if cfg.enable_logging {
        let sink = LogSink::open(Path::new(&cfg.log_file))?;
        tracing::info!("audit log: {}", sink.path().display());
        sink.append(&format!("session start, user {}", cfg.username));
        sink.append(&format!("check interval: {}s", cfg.check_interval));
        Some(sink)
    } else {
        None
    };

    let backend = HttpBackend::new(&cfg)?;
    let portal = SrunPortal::new(
        backend,
        Credentials {
            username: cfg.username.clone(),
            password: cfg.password.clone(),
        },
        cfg.fallback_ip.clone(),
    );

    if args.daemon {
        run_daemon(&cfg, &portal, sink.as_ref()).await
    } else {
        tick(&cfg, &portal, sink.as_ref()).await;
        Ok(())
    }
}

/// Daemon mode: one serialized check-and-recover cycle per interval.
/// Nothing from a failed cycle survives into the next one, and an
/// interrupt between cycles shuts down cleanly.
async fn run_daemon(
    cfg: &Config,
    portal: &SrunPortal<HttpBackend>,
    sink: Option<&LogSink>,
) -> Result<()> {
    let interval = Duration::from_secs(cfg.check_interval);
    tracing::info!("daemon mode, checking every {}s", cfg.check_interval);

    loop {
        tick(cfg, portal, sink).await;

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupt received, shutting down");
                if let Some(sink) = sink {
                    sink.append("interrupt received, session end");
                }
                return Ok(());
            }
        }
    }
}

/// One cycle: probe, and if the network is down, rejoin WiFi and log in.
async fn tick(cfg: &Config, portal: &SrunPortal<HttpBackend>, sink: Option<&LogSink>) {
    if portal.online().await {
        tracing::debug!("network up, next check in {}s", cfg.check_interval);
        return;
    }

    tracing::warn!("network down, starting recovery");
    if let Some(sink) = sink {
        sink.append("network down, starting recovery");
    }

    if !cfg.wifi_ssid.is_empty() {
        match utils::connect_wifi(&cfg.wifi_ssid) {
            Ok(true) => {
                tracing::info!("wifi '{}' is up", cfg.wifi_ssid);
                // Give the adapter a moment before talking to the portal.
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
            Ok(false) => {
                tracing::warn!(
                    "could not join '{}', will retry next interval",
                    cfg.wifi_ssid
                );
                if let Some(sink) = sink {
                    sink.append(&format!("wifi join failed ({})", cfg.wifi_ssid));
                }
                return;
            }
            Err(e) => {
                tracing::warn!("wifi control failed: {e}");
                if let Some(sink) = sink {
                    sink.append(&format!("wifi control failed: {e}"));
                }
                return;
            }
        }
    }

    match portal.login().await {
        Ok(LoginOutcome::Success { reason }) => {
            let message = match reason {
                SuccessReason::LoginOk => "login successful",
                SuccessReason::AlreadyOnline => "login successful (ip already online)",
                SuccessReason::VerifiedOnline => "login successful (verified by probe)",
            };
            tracing::info!("{message}");
            if let Some(sink) = sink {
                sink.append(message);
            }
        }
        Ok(LoginOutcome::Failed { message }) => {
            tracing::error!("login failed: {message}");
            if let Some(sink) = sink {
                sink.append(&format!("login failed: {message}"));
            }
        }
        Err(e) => {
            tracing::error!("login attempt errored: {e}");
            if let Some(sink) = sink {
                sink.append(&format!("login attempt errored: {e}"));
            }
        }
    }
}
