//! Cancellable phase chains
//!
//! A chain is an ordered run of asynchronous steps tied to one
//! [`ChainKind`]. Each kind has a single [`ChainSlot`]: binding a new
//! chain cancels whatever the slot held before, so at most one chain of
//! a kind is ever live.
//!
//! Two mechanisms back that guarantee:
//!
//! - The chain body runs inside [`spawn_chain`], which races it against
//!   the chain's cancellation token and drops it at the next suspension
//!   point once cancelled. No further step runs.
//! - Before a step mutates shared state it presents its [`ChainTicket`]
//!   to the slot ([`ChainSlot::is_current`]) under the same lock that
//!   supersede takes. A continuation that lost the race becomes a
//!   no-op.

use std::future::Future;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// The chain kinds the phase machine runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainKind {
    /// Selection draw and grid entrance.
    Setup,
    /// Sequence draw; hands over to `Reveal`.
    Round,
    /// Sequence display ending with the timer start.
    Reveal,
    /// Win acknowledgement and grid exit; ends by starting `Setup`.
    Win,
}

impl ChainKind {
    /// Every kind, in slot order.
    pub const ALL: [Self; 4] = [Self::Setup, Self::Round, Self::Reveal, Self::Win];

    /// Returns the kind name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Round => "round",
            Self::Reveal => "reveal",
            Self::Win => "win",
        }
    }
}

impl std::fmt::Display for ChainKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one bound chain.
///
/// Cloned into the chain body; compared against the slot whenever the
/// body wants to touch shared state.
#[derive(Debug, Clone)]
pub struct ChainTicket {
    kind: ChainKind,
    generation: u64,
    token: CancellationToken,
}

impl ChainTicket {
    /// Kind of the chain this ticket belongs to.
    #[must_use]
    pub const fn kind(&self) -> ChainKind {
        self.kind
    }

    /// Generation number within the kind's slot.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the chain has been superseded or cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the chain is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }
}

#[derive(Debug)]
struct BoundChain {
    generation: u64,
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

/// Single-slot holder of the active chain of one kind.
#[derive(Debug)]
pub struct ChainSlot {
    kind: ChainKind,
    next_generation: u64,
    bound: Option<BoundChain>,
}

impl ChainSlot {
    /// Creates an empty slot.
    #[must_use]
    pub const fn new(kind: ChainKind) -> Self {
        Self {
            kind,
            next_generation: 0,
            bound: None,
        }
    }

    /// Cancels the bound chain, if any, and binds a new one.
    ///
    /// Returns the new chain's ticket and whether a live chain was
    /// superseded.
    pub fn supersede(&mut self) -> (ChainTicket, bool) {
        let superseded = self.cancel();
        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1);

        let token = CancellationToken::new();
        self.bound = Some(BoundChain {
            generation,
            token: token.clone(),
            task: None,
        });

        (
            ChainTicket {
                kind: self.kind,
                generation,
                token,
            },
            superseded,
        )
    }

    /// Records the task running the chain identified by `ticket`.
    ///
    /// Ignored when the ticket is no longer current.
    pub fn attach(&mut self, ticket: &ChainTicket, task: JoinHandle<()>) {
        match self.bound.as_mut() {
            Some(bound) if bound.generation == ticket.generation => bound.task = Some(task),
            _ => trace!(kind = %self.kind, "attach for a chain that is no longer bound"),
        }
    }

    /// Cancels the bound chain. Returns `true` if one was live.
    pub fn cancel(&mut self) -> bool {
        let Some(bound) = self.bound.take() else {
            return false;
        };
        bound.token.cancel();
        let finished = bound.task.as_ref().is_some_and(JoinHandle::is_finished);
        debug!(kind = %self.kind, generation = bound.generation, "chain cancelled");
        !finished
    }

    /// Whether `ticket` identifies the chain currently bound here.
    #[must_use]
    pub fn is_current(&self, ticket: &ChainTicket) -> bool {
        ticket.kind == self.kind
            && !ticket.is_cancelled()
            && self
                .bound
                .as_ref()
                .is_some_and(|bound| bound.generation == ticket.generation)
    }

    /// Whether a chain is bound.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.bound.is_some()
    }

    /// Unbinds a chain that ran to completion. No-op if `ticket` has
    /// been superseded meanwhile.
    pub fn finish(&mut self, ticket: &ChainTicket) {
        if self.is_current(ticket) {
            self.bound = None;
            trace!(kind = %self.kind, generation = ticket.generation, "chain finished");
        }
    }
}

/// One slot per [`ChainKind`].
#[derive(Debug)]
pub struct ActiveChains {
    slots: [ChainSlot; 4],
}

impl Default for ActiveChains {
    fn default() -> Self {
        Self::new()
    }
}

impl ActiveChains {
    /// Creates empty slots for every kind.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: [
                ChainSlot::new(ChainKind::Setup),
                ChainSlot::new(ChainKind::Round),
                ChainSlot::new(ChainKind::Reveal),
                ChainSlot::new(ChainKind::Win),
            ],
        }
    }

    const fn index(kind: ChainKind) -> usize {
        match kind {
            ChainKind::Setup => 0,
            ChainKind::Round => 1,
            ChainKind::Reveal => 2,
            ChainKind::Win => 3,
        }
    }

    /// Returns the slot for `kind`.
    #[must_use]
    pub const fn slot(&self, kind: ChainKind) -> &ChainSlot {
        &self.slots[Self::index(kind)]
    }

    /// Returns the slot for `kind` mutably.
    pub const fn slot_mut(&mut self, kind: ChainKind) -> &mut ChainSlot {
        &mut self.slots[Self::index(kind)]
    }

    /// Whether `ticket` is the current chain of its kind.
    #[must_use]
    pub fn is_current(&self, ticket: &ChainTicket) -> bool {
        self.slot(ticket.kind()).is_current(ticket)
    }

    /// Cancels every bound chain.
    pub fn cancel_all(&mut self) {
        for slot in &mut self.slots {
            slot.cancel();
        }
    }
}

/// Runs a chain body on the runtime until it completes or its ticket is
/// cancelled, whichever comes first.
pub fn spawn_chain<F>(ticket: ChainTicket, body: F) -> JoinHandle<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        tokio::select! {
            biased;
            () = ticket.cancelled() => {
                debug!(kind = %ticket.kind(), generation = ticket.generation(), "chain superseded mid-flight");
            }
            () = body => {
                trace!(kind = %ticket.kind(), generation = ticket.generation(), "chain body completed");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[test]
    fn supersede_issues_increasing_generations() {
        let mut slot = ChainSlot::new(ChainKind::Round);
        let (first, superseded) = slot.supersede();
        assert!(!superseded);
        let (second, superseded) = slot.supersede();
        assert!(superseded);
        assert!(second.generation() > first.generation());
        assert!(first.is_cancelled());
        assert!(!slot.is_current(&first));
        assert!(slot.is_current(&second));
    }

    #[test]
    fn finish_ignores_stale_tickets() {
        let mut slot = ChainSlot::new(ChainKind::Setup);
        let (stale, _) = slot.supersede();
        let (live, _) = slot.supersede();
        slot.finish(&stale);
        assert!(slot.is_active());
        slot.finish(&live);
        assert!(!slot.is_active());
    }

    #[test]
    fn tickets_are_not_valid_across_kinds() {
        let mut chains = ActiveChains::new();
        let (setup, _) = chains.slot_mut(ChainKind::Setup).supersede();
        let (round, _) = chains.slot_mut(ChainKind::Round).supersede();
        assert_eq!(setup.generation(), round.generation());
        assert!(!chains.slot(ChainKind::Round).is_current(&setup));
        assert!(chains.is_current(&setup));
        assert!(chains.is_current(&round));
    }

    #[test]
    fn cancel_all_invalidates_every_ticket() {
        let mut chains = ActiveChains::new();
        let tickets: Vec<_> = ChainKind::ALL
            .iter()
            .map(|kind| chains.slot_mut(*kind).supersede().0)
            .collect();
        chains.cancel_all();
        assert!(tickets.iter().all(|t| !chains.is_current(t)));
        assert!(tickets.iter().all(ChainTicket::is_cancelled));
    }

    #[test]
    fn cancel_on_empty_slot_reports_nothing_live() {
        let mut slot = ChainSlot::new(ChainKind::Win);
        assert!(!slot.cancel());
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_chain_runs_no_further_steps() {
        let steps = Arc::new(AtomicUsize::new(0));
        let mut slot = ChainSlot::new(ChainKind::Reveal);

        let (ticket, _) = slot.supersede();
        let counter = Arc::clone(&steps);
        let task = spawn_chain(ticket.clone(), async move {
            for _ in 0..6 {
                tokio::time::sleep(Duration::from_secs(1)).await;
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        slot.attach(&ticket, task);

        tokio::time::sleep(Duration::from_millis(2500)).await;
        let (_replacement, superseded) = slot.supersede();
        assert!(superseded);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(steps.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn completed_chain_is_not_reported_as_superseded() {
        let mut slot = ChainSlot::new(ChainKind::Setup);
        let (ticket, _) = slot.supersede();
        let task = spawn_chain(ticket.clone(), async {});
        slot.attach(&ticket, task);
        tokio::time::sleep(Duration::from_millis(10)).await;

        let (_, superseded) = slot.supersede();
        assert!(!superseded);
    }
}
