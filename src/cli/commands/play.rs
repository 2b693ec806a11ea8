//! Interactive terminal game.
//!
//! Reads one command per stdin line and feeds it to the machine's action
//! channel.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{ACTION_CAPACITY, Session, load_config, stop_reason};
use crate::cli::args::PlayArgs;
use crate::cli::terminal::TerminalPresenter;
use crate::error::MemoseqError;
use crate::icon::Icon;
use crate::phase::{GamePhaseMachine, UserAction};

const HELP: &str = "commands: n = new round, 1-6 or an icon name = tap, h = help, q = quit";

/// One parsed line of input.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Action(UserAction),
    Help,
    Quit,
}

/// Play the game in the terminal.
///
/// # Errors
///
/// Returns a config error if the configuration cannot be loaded, a game
/// error if its icons cannot fill the grid, or an I/O error if the event
/// file cannot be created.
pub async fn run(args: &PlayArgs, cancel: CancellationToken) -> Result<(), MemoseqError> {
    let config = load_config(args.game.config.as_deref())?;
    let session = Session::open(&config, Arc::new(TerminalPresenter::stdout()), &args.game)?;
    let machine = session.machine().clone();

    println!("{HELP}");
    machine.start();

    let (tx, rx) = mpsc::channel(ACTION_CAPACITY);
    let reader = tokio::spawn(read_commands(machine.clone(), tx));
    let result = machine.run(rx, cancel.clone()).await;
    reader.abort();

    session.close(stop_reason(&cancel)).await;
    result.map_err(MemoseqError::from)
}

async fn read_commands(machine: GamePhaseMachine, tx: mpsc::Sender<UserAction>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }
        let action = match parse_command(&line, &machine.grid()) {
            Some(Command::Action(action)) => action,
            Some(Command::Help) => {
                println!("{HELP}");
                continue;
            }
            Some(Command::Quit) => break,
            None => {
                println!("no such slot: {}", line.trim());
                continue;
            }
        };
        if tx.send(action).await.is_err() {
            break;
        }
    }
    tracing::debug!("input closed");
}

/// Parses one input line. Slot numbers are 1-based; anything that is not
/// a keyword or a number is taken as an icon name.
fn parse_command(line: &str, grid: &[Icon]) -> Option<Command> {
    let word = line.trim();
    match word.to_ascii_lowercase().as_str() {
        "n" | "new" => return Some(Command::Action(UserAction::NewGame)),
        "h" | "help" | "?" => return Some(Command::Help),
        "q" | "quit" | "exit" => return Some(Command::Quit),
        _ => {}
    }

    if let Ok(number) = word.parse::<usize>() {
        let icon = grid.get(number.checked_sub(1)?)?;
        return Some(Command::Action(UserAction::Tap(icon.clone())));
    }
    Some(Command::Action(UserAction::Tap(Icon::new(word))))
}
