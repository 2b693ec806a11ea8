//! `memoseq` - icon sequence memory game

use std::sync::atomic::{AtomicI32, Ordering};

use clap::Parser;
use tokio::signal::unix::{Signal, SignalKind, signal};
use tokio_util::sync::CancellationToken;

use memoseq::cli::args::Cli;
use memoseq::cli::commands;
use memoseq::error::ExitCode;
use memoseq::observability::init_logging;

/// Exit code of the first shutdown signal, 0 if none arrived.
static SIGNAL_EXIT: AtomicI32 = AtomicI32::new(0);

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            std::process::exit(if e.use_stderr() {
                ExitCode::USAGE_ERROR
            } else {
                ExitCode::SUCCESS
            });
        }
    };

    init_logging(cli.log_format, cli.verbose, cli.quiet, cli.color);

    let cancel = CancellationToken::new();
    tokio::spawn(watch_signals(cancel.clone()));

    let result = commands::dispatch(cli, cancel).await;

    match result {
        Ok(()) => {
            let code = SIGNAL_EXIT.load(Ordering::SeqCst);
            std::process::exit(if code == 0 { ExitCode::SUCCESS } else { code });
        }
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}

/// Cancels `cancel` on the first SIGINT/SIGTERM and exits on the second.
async fn watch_signals(cancel: CancellationToken) {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => Some(sigterm),
        Err(e) => {
            tracing::warn!(error = %e, "SIGTERM handler unavailable");
            None
        }
    };

    let code = next_signal(&mut sigterm).await;
    SIGNAL_EXIT.store(code, Ordering::SeqCst);
    eprintln!("\nShutting down gracefully... (press Ctrl+C again to force)");
    cancel.cancel();

    let code = next_signal(&mut sigterm).await;
    std::process::exit(code);
}

async fn next_signal(sigterm: &mut Option<Signal>) -> i32 {
    let terminate = async {
        match sigterm.as_mut() {
            Some(sigterm) => {
                sigterm.recv().await;
            }
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => ExitCode::INTERRUPTED,
        () = terminate => ExitCode::TERMINATED,
    }
}
