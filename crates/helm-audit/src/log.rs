// log.rs — Append-only audit log backed by the project's events journal.
//
// Events persist as JSONL in `events.jsonl` inside the project's storage
// namespace, co-located with the commit history they describe. The log
// assigns per-project sequence numbers; on first touch after a restart the
// next number is recovered from the journal's last line.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use helm_store::VersionedStore;

use crate::error::AuditError;
use crate::event::{AuditEvent, EventType};

/// Journal file name inside the project namespace.
pub const EVENTS_JOURNAL: &str = "events.jsonl";

/// Limits for audit queries.
#[derive(Debug, Clone)]
pub struct AuditConfig {
    /// Upper bound for a query's page size; larger requests are clamped.
    pub max_page_size: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self { max_page_size: 100 }
    }
}

/// Filters for querying events. All fields are conjunctive; `None` matches
/// everything. Timestamp bounds are inclusive.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub event_type: Option<EventType>,
    pub actor: Option<String>,
    pub since: Option<chrono::DateTime<chrono::Utc>>,
    pub until: Option<chrono::DateTime<chrono::Utc>>,
}

/// Offset-based pagination window.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

/// An append-only, per-project ordered record of domain events.
pub struct AuditLog {
    store: Arc<VersionedStore>,
    config: AuditConfig,
    /// Next sequence number per project. The inner mutex is held across the
    /// journal write so numbers are assigned in write order.
    seqs: Mutex<HashMap<String, Arc<Mutex<Option<u64>>>>>,
}

impl AuditLog {
    pub fn new(store: Arc<VersionedStore>) -> Self {
        Self::with_config(store, AuditConfig::default())
    }

    pub fn with_config(store: Arc<VersionedStore>, config: AuditConfig) -> Self {
        Self {
            store,
            config,
            seqs: Mutex::new(HashMap::new()),
        }
    }

    /// Append an event and persist it durably before returning.
    pub fn append(
        &self,
        project: &str,
        event_type: EventType,
        actor: &str,
        payload: serde_json::Value,
        commit: Option<String>,
    ) -> Result<AuditEvent, AuditError> {
        let counter = self.counter_for(project);
        let mut next = counter.lock().unwrap_or_else(|e| e.into_inner());

        let seq = match *next {
            Some(seq) => seq,
            None => self.recover_next_seq(project)?,
        };
        let event = AuditEvent::record(seq, project, event_type, actor, payload, commit);
        self.store
            .append_line(project, EVENTS_JOURNAL, &serde_json::to_string(&event)?)?;
        *next = Some(seq + 1);

        tracing::info!(project, seq, event = %event.event_type, "recorded audit event");
        Ok(event)
    }

    /// Query events ordered by sequence number ascending.
    ///
    /// Returns the page of events plus the total number of events matching
    /// the filter (before pagination). An offset beyond the total yields an
    /// empty page, not an error.
    pub fn query(
        &self,
        project: &str,
        filter: &EventFilter,
        page: Page,
    ) -> Result<(Vec<AuditEvent>, usize), AuditError> {
        let mut matched = Vec::new();
        for line in self.store.read_lines(project, EVENTS_JOURNAL)? {
            let event: AuditEvent = serde_json::from_str(&line)?;
            if Self::matches(filter, &event) {
                matched.push(event);
            }
        }

        let total = matched.len();
        let limit = page.limit.min(self.config.max_page_size);
        let events = matched
            .into_iter()
            .skip(page.offset)
            .take(limit)
            .collect();
        Ok((events, total))
    }

    fn matches(filter: &EventFilter, event: &AuditEvent) -> bool {
        if let Some(event_type) = filter.event_type {
            if event.event_type != event_type {
                return false;
            }
        }
        if let Some(actor) = &filter.actor {
            if &event.actor != actor {
                return false;
            }
        }
        if let Some(since) = filter.since {
            if event.timestamp < since {
                return false;
            }
        }
        if let Some(until) = filter.until {
            if event.timestamp > until {
                return false;
            }
        }
        true
    }

    fn counter_for(&self, project: &str) -> Arc<Mutex<Option<u64>>> {
        let mut seqs = self.seqs.lock().unwrap_or_else(|e| e.into_inner());
        seqs.entry(project.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone()
    }

    /// Read the journal's last event to find the next sequence number.
    fn recover_next_seq(&self, project: &str) -> Result<u64, AuditError> {
        let lines = self.store.read_lines(project, EVENTS_JOURNAL)?;
        match lines.last() {
            Some(line) => {
                let event: AuditEvent = serde_json::from_str(line)?;
                Ok(event.seq + 1)
            }
            None => Ok(1),
        }
    }
}
