//! Host-side record of which parties listen to one event name.

use crate::transport::PartyId;

use log::debug;

/// Parties subscribed to one event name, each at most once.
///
/// The set stores party ids only and never keeps a party's resources alive.
/// A party that disappears without unsubscribing stays in the set until the
/// next call to [`live`](Self::live), which drops it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriberSet {
    parties: Vec<PartyId>,
}

impl SubscriberSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `party`; `false` if it was already present.
    pub fn insert(&mut self, party: PartyId) -> bool {
        if self.parties.contains(&party) {
            return false;
        }
        self.parties.push(party);
        true
    }

    /// Remove `party`; `false` if it was not present.
    pub fn remove(&mut self, party: PartyId) -> bool {
        let before = self.parties.len();
        self.parties.retain(|existing| *existing != party);
        self.parties.len() != before
    }

    pub fn contains(&self, party: PartyId) -> bool {
        self.parties.contains(&party)
    }

    pub fn len(&self) -> usize {
        self.parties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parties.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = PartyId> + '_ {
        self.parties.iter().copied()
    }

    /// Drop every party `is_alive` rejects and return a snapshot of the rest.
    ///
    /// Callers iterate the snapshot, so the set may change while they deliver.
    pub fn live<F>(&mut self, is_alive: F) -> Vec<PartyId>
    where
        F: Fn(PartyId) -> bool,
    {
        self.parties.retain(|&party| {
            let alive = is_alive(party);
            if !alive {
                debug!("Dropping vanished subscriber {party}");
            }
            alive
        });
        self.parties.clone()
    }
}
