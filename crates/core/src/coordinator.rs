//! Per-fingerprint request coalescing.
//!
//! The first caller to [`Coordinator::join`] a fingerprint becomes the leader
//! and receives a [`Flight`]. Later callers get a [`Waiter`] that resolves to
//! whatever the leader publishes. The in-flight map is guarded by a plain
//! mutex that is only held while inserting, cloning, or removing a handle;
//! it is never held across an await.
//!
//! Dropping a `Flight` without completing it (cancellation, panic, timeout
//! at a higher level) removes it from the map and wakes every waiter with a
//! cancellation error, so the next caller can lead a fresh attempt.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use crate::GenerationError;
use crate::fingerprint::Fingerprint;

/// Result shared between a leader and its followers.
pub type Outcome = Result<String, GenerationError>;

type Slot = watch::Receiver<Option<Outcome>>;

/// Tracks generations currently in progress.
#[derive(Debug, Default)]
pub struct Coordinator {
    in_flight: Mutex<HashMap<Fingerprint, Slot>>,
}

/// The caller's part in a coalesced generation.
#[derive(Debug)]
pub enum Role<'a> {
    Leader(Flight<'a>),
    Follower(Waiter),
}

impl Coordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the generation for `fingerprint`, leading it if none is running.
    pub fn join(&self, fingerprint: Fingerprint) -> Role<'_> {
        let mut in_flight = self.lock();
        if let Some(slot) = in_flight.get(&fingerprint) {
            return Role::Follower(Waiter { slot: slot.clone() });
        }

        let (sender, slot) = watch::channel(None);
        in_flight.insert(fingerprint, slot);
        Role::Leader(Flight { coordinator: self, fingerprint, sender })
    }

    /// Number of generations currently in progress.
    pub fn in_flight(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Fingerprint, Slot>> {
        // The map stays consistent even if a holder panicked.
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Leadership of one generation attempt.
#[derive(Debug)]
pub struct Flight<'a> {
    coordinator: &'a Coordinator,
    fingerprint: Fingerprint,
    sender: watch::Sender<Option<Outcome>>,
}

impl Flight<'_> {
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    /// Publish the outcome to every follower and release leadership.
    pub fn complete(self, outcome: Outcome) {
        self.sender.send_replace(Some(outcome));
    }
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        self.coordinator.lock().remove(&self.fingerprint);
    }
}

/// A follower's handle on someone else's generation.
#[derive(Debug)]
pub struct Waiter {
    slot: Slot,
}

impl Waiter {
    /// Suspend until the leader completes or is dropped.
    pub async fn wait(mut self) -> Outcome {
        match self.slot.wait_for(Option::is_some).await {
            Ok(outcome) => (*outcome).clone().unwrap_or_else(|| Err(GenerationError::cancelled())),
            Err(_) => Err(GenerationError::cancelled()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn fp(byte: u8) -> Fingerprint {
        Fingerprint::from_bytes([byte; Fingerprint::LEN])
    }

    #[test]
    fn test_first_join_leads() {
        let coordinator = Coordinator::new();
        let first = coordinator.join(fp(1));
        let second = coordinator.join(fp(1));
        assert!(matches!(first, Role::Leader(_)));
        assert!(matches!(second, Role::Follower(_)));
        assert_eq!(coordinator.in_flight(), 1);
    }

    #[test]
    fn test_different_fingerprints_lead_independently() {
        let coordinator = Coordinator::new();
        let a = coordinator.join(fp(1));
        let b = coordinator.join(fp(2));
        assert!(matches!(a, Role::Leader(_)));
        assert!(matches!(b, Role::Leader(_)));
        assert_eq!(coordinator.in_flight(), 2);
    }

    #[tokio::test]
    async fn test_followers_receive_leader_outcome() {
        let coordinator = Coordinator::new();
        let Role::Leader(flight) = coordinator.join(fp(1)) else { panic!("expected leader") };
        let Role::Follower(waiter) = coordinator.join(fp(1)) else { panic!("expected follower") };

        flight.complete(Ok("code".to_string()));
        assert_eq!(waiter.wait().await, Ok("code".to_string()));
        assert_eq!(coordinator.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_failure_is_shared() {
        let coordinator = Coordinator::new();
        let Role::Leader(flight) = coordinator.join(fp(1)) else { panic!("expected leader") };
        let Role::Follower(waiter) = coordinator.join(fp(1)) else { panic!("expected follower") };

        flight.complete(Err(GenerationError::new("boom")));
        assert_eq!(waiter.wait().await, Err(GenerationError::new("boom")));
        assert!(matches!(coordinator.join(fp(1)), Role::Leader(_)));
    }

    #[tokio::test]
    async fn test_dropped_leader_cancels_followers() {
        let coordinator = Coordinator::new();
        let flight = coordinator.join(fp(1));
        let Role::Follower(waiter) = coordinator.join(fp(1)) else { panic!("expected follower") };

        drop(flight);
        let outcome = tokio::time::timeout(Duration::from_secs(1), waiter.wait())
            .await
            .expect("waiter must not hang");
        assert_eq!(outcome, Err(GenerationError::cancelled()));
        assert_eq!(coordinator.in_flight(), 0);
    }
}
