//! Candidate arena - the per-run candidate forest
//!
//! Candidates are stored by id and parent links are id references, which
//! keeps the structure serializable and free of cycles: a candidate can only
//! be inserted after its parent.

use super::candidate::{Candidate, CandidateId};
use crate::core::error::DomainError;
use crate::phase::PhaseId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateArena {
    candidates: HashMap<CandidateId, Candidate>,
    /// Insertion order, for stable iteration
    order: Vec<CandidateId>,
}

impl CandidateArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a candidate. Its parent, if any, must already be present.
    pub fn insert(&mut self, candidate: Candidate) -> Result<CandidateId, DomainError> {
        if let Some(parent) = candidate.parent
            && !self.candidates.contains_key(&parent)
        {
            return Err(DomainError::UnknownParent {
                candidate: candidate.id.to_string(),
                parent: parent.to_string(),
            });
        }
        let id = candidate.id;
        if self.candidates.insert(id, candidate).is_none() {
            self.order.push(id);
        }
        Ok(id)
    }

    pub fn get(&self, id: &CandidateId) -> Option<&Candidate> {
        self.candidates.get(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// All candidates in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.order.iter().filter_map(|id| self.candidates.get(id))
    }

    /// Candidates produced by the given phase, in insertion order
    pub fn by_phase(&self, phase: PhaseId) -> Vec<&Candidate> {
        self.iter().filter(|c| c.phase == phase).collect()
    }

    /// The refinement chain ending at `id`, ordered root first.
    pub fn chain(&self, id: &CandidateId) -> Vec<&Candidate> {
        let mut chain = Vec::new();
        let mut cursor = self.candidates.get(id);
        while let Some(candidate) = cursor {
            chain.push(candidate);
            cursor = candidate.parent.and_then(|p| self.candidates.get(&p));
        }
        chain.reverse();
        chain
    }

    /// Number of phases the candidate's chain passed through
    pub fn chain_len(&self, id: &CandidateId) -> usize {
        self.chain(id).len()
    }

    /// The first-phase ancestor of a candidate
    pub fn root_of(&self, id: &CandidateId) -> Option<&Candidate> {
        self.chain(id).into_iter().next()
    }

    pub fn into_candidates(self) -> Vec<Candidate> {
        let mut candidates = self.candidates;
        self.order
            .into_iter()
            .filter_map(|id| candidates.remove(&id))
            .collect()
    }
}
