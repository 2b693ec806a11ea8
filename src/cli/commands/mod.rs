//! CLI command dispatch and handlers
//!
//! Routes parsed CLI arguments to the appropriate command handler and
//! holds the session plumbing shared by `play` and `simulate`.

pub mod completions;
pub mod play;
pub mod simulate;
pub mod validate;
pub mod version;

use std::path::Path;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::cli::args::{Cli, Commands, GameArgs};
use crate::config::{ConfigLoader, GameConfig};
use crate::error::MemoseqError;
use crate::observability::{EventEmitter, SessionEvent, StopReason, spawn_forwarder};
use crate::phase::GamePhaseMachine;
use crate::presenter::Presenter;
use crate::selector::RandomSelector;

/// Capacity of the user action channel feeding the machine.
const ACTION_CAPACITY: usize = 32;

/// Dispatch a parsed CLI invocation to the appropriate command handler.
///
/// # Errors
///
/// Returns an error if the dispatched command handler fails.
pub async fn dispatch(cli: Cli, cancel: CancellationToken) -> Result<(), MemoseqError> {
    match cli.command {
        Commands::Play(args) => play::run(&args, cancel).await,
        Commands::Simulate(args) => simulate::run(&args, cancel).await,
        Commands::Validate(args) => validate::run(&args),
        Commands::Completions(args) => {
            completions::run(&args);
            Ok(())
        }
        Commands::Version(args) => {
            version::run(&args);
            Ok(())
        }
    }
}

/// Loads the configuration at `path`, or the defaults, logging warnings.
fn load_config(path: Option<&Path>) -> Result<Arc<GameConfig>, MemoseqError> {
    if let Some(path) = path {
        tracing::info!(config = %path.display(), "loading configuration");
    }
    let load_result = ConfigLoader::new().load_or_default(path)?;

    for warning in &load_result.warnings {
        tracing::warn!(
            location = warning.location.as_deref().unwrap_or("<unknown>"),
            "{}",
            warning.message
        );
    }

    Ok(load_result.config)
}

/// A machine plus its optional event file.
struct Session {
    machine: GamePhaseMachine,
    emitter: Option<Arc<EventEmitter>>,
    forwarder: Option<JoinHandle<()>>,
    forward_cancel: CancellationToken,
}

impl Session {
    /// Builds the machine and starts forwarding its events. The machine
    /// is not started.
    fn open(
        config: &GameConfig,
        presenter: Arc<dyn Presenter>,
        args: &GameArgs,
    ) -> Result<Self, MemoseqError> {
        let selector = args
            .seed
            .map_or_else(RandomSelector::from_os_rng, RandomSelector::seeded);
        let machine = GamePhaseMachine::with_selector(config, presenter, selector)?;
        let forward_cancel = CancellationToken::new();

        let (emitter, forwarder) = if let Some(path) = &args.events {
            tracing::info!(events = %path.display(), "writing event stream");
            let emitter = Arc::new(if path.as_os_str() == "-" {
                EventEmitter::stderr()
            } else {
                EventEmitter::from_file(path)?
            });
            emitter.emit(SessionEvent::SessionStarted {
                pool_size: config.icon_pool()?.len(),
                seed: args.seed,
            });
            let forwarder = spawn_forwarder(
                Arc::clone(&emitter),
                machine.subscribe(),
                forward_cancel.clone(),
            );
            (Some(emitter), Some(forwarder))
        } else {
            (None, None)
        };

        Ok(Self {
            machine,
            emitter,
            forwarder,
            forward_cancel,
        })
    }

    const fn machine(&self) -> &GamePhaseMachine {
        &self.machine
    }

    /// Stops the machine and flushes the event stream.
    async fn close(self, reason: StopReason) {
        self.machine.shutdown();
        self.forward_cancel.cancel();
        if let Some(forwarder) = self.forwarder {
            let _ = forwarder.await;
        }
        if let Some(emitter) = self.emitter {
            emitter.emit(SessionEvent::SessionStopped { reason });
            tracing::debug!(events = emitter.event_count(), "event stream closed");
        }
    }
}

fn stop_reason(cancel: &CancellationToken) -> StopReason {
    if cancel.is_cancelled() {
        StopReason::Cancelled
    } else {
        StopReason::Completed
    }
}
