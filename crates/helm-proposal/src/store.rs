// store.rs — ProposalStore trait and the journal-backed implementation.
//
// The trait is the persistence seam for proposal records. The default
// implementation keeps one JSONL journal per project inside the project's
// storage namespace, so proposals live next to the commit history they
// describe. Status updates rewrite the journal through an atomic rename,
// preserving creation order.

use std::sync::Arc;

use uuid::Uuid;

use helm_store::{StoreError, VersionedStore};

use crate::proposal::Proposal;

/// Journal file name inside the project namespace.
pub const PROPOSALS_JOURNAL: &str = "proposals.jsonl";

/// Persistence seam for proposal records.
pub trait ProposalStore {
    /// Persist a new proposal.
    fn save(&self, project: &str, proposal: &Proposal) -> Result<(), StoreError>;

    /// Replace a stored proposal (matched by ID). Returns false if no
    /// proposal with that ID exists.
    fn update(&self, project: &str, proposal: &Proposal) -> Result<bool, StoreError>;

    /// All proposals for a project, in creation order.
    fn list(&self, project: &str) -> Result<Vec<Proposal>, StoreError>;

    /// A specific proposal by ID.
    fn get(&self, project: &str, id: Uuid) -> Result<Option<Proposal>, StoreError>;
}

/// JSONL journal-backed ProposalStore.
pub struct JournalProposalStore {
    store: Arc<VersionedStore>,
}

impl JournalProposalStore {
    pub fn new(store: Arc<VersionedStore>) -> Self {
        Self { store }
    }
}

impl ProposalStore for JournalProposalStore {
    fn save(&self, project: &str, proposal: &Proposal) -> Result<(), StoreError> {
        self.store
            .append_line(project, PROPOSALS_JOURNAL, &serde_json::to_string(proposal)?)
    }

    fn update(&self, project: &str, proposal: &Proposal) -> Result<bool, StoreError> {
        let mut found = false;
        let mut lines = Vec::new();
        for line in self.store.read_lines(project, PROPOSALS_JOURNAL)? {
            let stored: Proposal = serde_json::from_str(&line)?;
            if stored.proposal_id == proposal.proposal_id {
                lines.push(serde_json::to_string(proposal)?);
                found = true;
            } else {
                lines.push(line);
            }
        }
        if found {
            self.store
                .rewrite_lines(project, PROPOSALS_JOURNAL, &lines)?;
        }
        Ok(found)
    }

    fn list(&self, project: &str) -> Result<Vec<Proposal>, StoreError> {
        let mut proposals = Vec::new();
        for line in self.store.read_lines(project, PROPOSALS_JOURNAL)? {
            proposals.push(serde_json::from_str(&line)?);
        }
        Ok(proposals)
    }

    fn get(&self, project: &str, id: Uuid) -> Result<Option<Proposal>, StoreError> {
        Ok(self
            .list(project)?
            .into_iter()
            .find(|p| p.proposal_id == id))
    }
}
