mod cli;
mod report;
mod shutdown;

use std::io::IsTerminal;
use std::time::Duration;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use riskscan_client_core::document::DocumentFile;
use riskscan_client_core::settings::ensure_settings;
use riskscan_client_engine::gateway::{AnalysisGateway as _, HttpGateway};
use riskscan_client_engine::{SessionConfig, SessionEvent, SessionPhase, start_session};

use crate::cli::Cli;
use crate::report::{format_report, phase_label};
use crate::shutdown::{ShutdownController, ShutdownEvent, spawn_ctrl_c_handler};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let interactive = std::io::stdin().is_terminal();
    let settings = match ensure_settings(interactive && cli.backend_url.is_none()) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("warning: failed to read/write settings: {err:#}");
            None
        }
    };
    let backend_url = cli.resolve_backend_url(settings.as_ref())?;

    let gateway = HttpGateway::new(backend_url)?;

    if cli.health {
        let status = gateway
            .health_check()
            .await
            .map_err(|err| anyhow::anyhow!("health check failed: {err}"))?;
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    // clap enforces FILE unless --health was given.
    let path = cli.file.clone().unwrap_or_default();
    let document = match DocumentFile::load(&path) {
        Ok(document) => document,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(2);
        }
    };

    let session = start_session(
        gateway,
        SessionConfig {
            poll_interval: Duration::from_millis(cli.poll_interval_ms),
            max_attempts: cli.max_attempts,
        },
    );
    let mut events = session.subscribe();

    let shutdown = std::sync::Arc::new(ShutdownController::new());
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::mpsc::unbounded_channel::<ShutdownEvent>();
    spawn_ctrl_c_handler(shutdown.clone(), shutdown_tx);

    let bar = if !cli.no_progress && std::io::stderr().is_terminal() {
        Some(make_progress_bar()?)
    } else {
        None
    };

    session.submit(document);

    let exit_code = loop {
        tokio::select! {
            ev_opt = shutdown_rx.recv() => {
                match ev_opt {
                    Some(ShutdownEvent::Abandon) | None => {
                        session.reset();
                        if let Some(bar) = &bar {
                            bar.finish_and_clear();
                        }
                        eprintln!("Analysis abandoned.");
                        break 130;
                    }
                    Some(ShutdownEvent::Immediate) => break 130,
                }
            }
            evt = events.recv() => {
                let evt = match evt {
                    Ok(v) => v,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break 1,
                };

                match evt {
                    SessionEvent::PhaseChanged { phase } => {
                        if let Some(bar) = &bar {
                            bar.set_message(phase_label(phase));
                        } else if matches!(phase, SessionPhase::Submitting | SessionPhase::Polling) {
                            eprintln!("{}...", phase_label(phase));
                        }
                    }
                    SessionEvent::Progress { percent } => {
                        if let Some(bar) = &bar {
                            bar.set_position(percent.round() as u64);
                        }
                    }
                    SessionEvent::Completed { result } => {
                        if let Some(bar) = &bar {
                            bar.finish_and_clear();
                        }
                        if cli.json {
                            println!("{}", serde_json::to_string_pretty(result.as_ref())?);
                        } else {
                            print!("{}", format_report(&result));
                        }
                        break 0;
                    }
                    SessionEvent::Failed { error } => {
                        if let Some(bar) = &bar {
                            bar.finish_and_clear();
                        }
                        eprintln!("error: {error}");
                        break 1;
                    }
                    SessionEvent::WasReset => {}
                }
            }
        }
    };

    session.shutdown();
    tokio::select! {
        _ = session.wait() => {}
        _ = wait_for_immediate(&mut shutdown_rx) => std::process::exit(130),
    }

    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}

fn make_progress_bar() -> anyhow::Result<ProgressBar> {
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{msg:<20} [{bar:30.cyan/blue}] {pos:>3}%")?
            .progress_chars("##-"),
    );
    bar.set_message(phase_label(SessionPhase::Idle));
    Ok(bar)
}

/// Resolves on a second CTRL+C; otherwise never.
async fn wait_for_immediate(rx: &mut tokio::sync::mpsc::UnboundedReceiver<ShutdownEvent>) {
    loop {
        match rx.recv().await {
            Some(ShutdownEvent::Immediate) => return,
            Some(ShutdownEvent::Abandon) => {}
            None => std::future::pending::<()>().await,
        }
    }
}
