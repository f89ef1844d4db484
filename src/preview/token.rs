//! Generation-counter cancellation tokens for in-flight renders.
//!
//! ## Why a counter and not a flag?
//!
//! A shared boolean "in-flight" flag has an ABA problem: render A clears the
//! flag that render B set, and a stale paint slips through. A monotonically
//! increasing generation makes staleness checkable from the render's side —
//! a token is valid exactly while no newer token has been issued, so the
//! surface is always owned by the most recent request.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Issues [`RenderToken`]s; the newest issued token is the only valid one.
#[derive(Debug, Default)]
pub struct RenderGate {
    current: Arc<AtomicU64>,
}

impl RenderGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invalidate all outstanding tokens and issue a fresh one.
    pub fn issue(&self) -> RenderToken {
        let generation = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        RenderToken {
            generation,
            current: Arc::clone(&self.current),
        }
    }

    /// Invalidate all outstanding tokens without issuing a new one.
    pub fn cancel_all(&self) {
        self.current.fetch_add(1, Ordering::SeqCst);
    }
}

/// Handed to a render task; checked before applying results.
#[derive(Debug, Clone)]
pub struct RenderToken {
    generation: u64,
    current: Arc<AtomicU64>,
}

impl RenderToken {
    /// True once a newer token has been issued (or the gate cancelled all).
    pub fn is_cancelled(&self) -> bool {
        self.current.load(Ordering::SeqCst) != self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_is_live() {
        let gate = RenderGate::new();
        let token = gate.issue();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn newer_token_cancels_older() {
        let gate = RenderGate::new();
        let first = gate.issue();
        let second = gate.issue();
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
    }

    #[test]
    fn cancel_all_invalidates_without_successor() {
        let gate = RenderGate::new();
        let token = gate.issue();
        gate.cancel_all();
        assert!(token.is_cancelled());
    }

    #[test]
    fn clones_share_fate() {
        let gate = RenderGate::new();
        let token = gate.issue();
        let twin = token.clone();
        gate.issue();
        assert!(token.is_cancelled());
        assert!(twin.is_cancelled());
    }
}
