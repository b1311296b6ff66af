use crate::error::SessionError;
use crate::negotiation::{NegotiationEvent, NegotiationState};
use crate::session::RemoteParty;
use bmate_core::PartyId;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Read-only view of the parties and their states, shared with UI consumers.
#[derive(Debug, Clone, Default)]
pub struct PartyDirectory {
    states: Arc<DashMap<PartyId, NegotiationState>>,
}

impl PartyDirectory {
    pub fn get(&self, id: &PartyId) -> Option<NegotiationState> {
        self.states.get(id).map(|s| *s)
    }

    pub fn contains(&self, id: &PartyId) -> bool {
        self.states.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Parties ordered by id.
    pub fn snapshot(&self) -> Vec<(PartyId, NegotiationState)> {
        let mut parties: Vec<_> = self
            .states
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        parties.sort_by(|a, b| a.0.cmp(&b.0));
        parties
    }
}

/// Owns every [`RemoteParty`] of the session. Only the session loop mutates it.
#[derive(Default)]
pub struct PartyRegistry {
    parties: HashMap<PartyId, RemoteParty>,
    directory: PartyDirectory,
    epoch: u64,
}

impl PartyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the party, creating it in `idle` when absent.
    pub fn add_party(&mut self, id: PartyId) -> &mut RemoteParty {
        let directory = &self.directory;
        self.parties.entry(id.clone()).or_insert_with(|| {
            info!("Party {} added", id);
            directory.states.insert(id.clone(), NegotiationState::Idle);
            RemoteParty::new(id)
        })
    }

    pub fn remove_party(&mut self, id: &PartyId) -> Option<RemoteParty> {
        self.directory.states.remove(id);
        let party = self.parties.remove(id)?;
        info!("Party {} removed in state {}", id, party.state);
        Some(party)
    }

    pub fn find(&self, id: &PartyId) -> Option<&RemoteParty> {
        self.parties.get(id)
    }

    pub fn find_mut(&mut self, id: &PartyId) -> Option<&mut RemoteParty> {
        self.parties.get_mut(id)
    }

    /// Runs `event` through the party's state machine.
    pub fn apply(
        &mut self,
        id: &PartyId,
        event: NegotiationEvent,
    ) -> Result<NegotiationState, SessionError> {
        let party = self
            .parties
            .get_mut(id)
            .ok_or_else(|| SessionError::Negotiation {
                party: id.clone(),
                reason: "unknown party".into(),
            })?;

        let next = party
            .state
            .next(event)
            .map_err(|illegal| SessionError::IllegalTransition {
                party: id.clone(),
                state: illegal.state,
                event: illegal.event,
            })?;

        debug!("Party {}: {} -> {} ({})", id, party.state, next, event);
        party.state = next;
        self.directory.states.insert(id.clone(), next);
        Ok(next)
    }

    pub fn next_epoch(&mut self) -> u64 {
        self.epoch += 1;
        self.epoch
    }

    /// Removes every party, handing them back so their connections can be
    /// closed.
    pub fn clear(&mut self) -> Vec<RemoteParty> {
        self.directory.states.clear();
        self.parties.drain().map(|(_, party)| party).collect()
    }

    pub fn ids(&self) -> Vec<PartyId> {
        let mut ids: Vec<_> = self.parties.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.parties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parties.is_empty()
    }

    pub fn directory(&self) -> PartyDirectory {
        self.directory.clone()
    }
}
