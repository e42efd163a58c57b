// engine.rs — ProposalEngine: the propose/apply/reject orchestrator.
//
// Propose validates structure and records a pending proposal without
// touching the commit history. Apply re-reads every target, checks each
// change's drift token against the path's current history head, applies the
// diffs, and commits the results as one checkpoint; only then is the
// proposal resolved and the audit event appended. A failed commit leaves
// the proposal pending and the history untouched, so retrying is safe.

use std::sync::Arc;

use uuid::Uuid;

use helm_audit::{AuditLog, EventType};
use helm_diff::{Applied, ChangeType, DiffError};
use helm_store::{
    ProjectMeta, StagedChanges, StoreError, VersionedStore, PROJECT_META_PATH, RESERVED_PREFIX,
};
use helm_workflow::{WorkflowState, WORKFLOW_STATE_PATH};

use crate::error::EngineError;
use crate::proposal::{ArtifactKind, ChangeSpec, Proposal, ProposalStatus, ProposedChange};
use crate::store::{JournalProposalStore, ProposalStore};

/// The outcome of a successful apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyResult {
    /// Hash of the commit that materialized the proposal.
    pub commit: String,
    /// Paths changed by the commit, in change order.
    pub changed_paths: Vec<String>,
}

/// Orchestrates the proposal lifecycle for project documents.
pub struct ProposalEngine {
    store: Arc<VersionedStore>,
    audit: Arc<AuditLog>,
    proposals: Box<dyn ProposalStore + Send + Sync>,
}

impl ProposalEngine {
    /// An engine with the default journal-backed proposal store.
    pub fn new(store: Arc<VersionedStore>, audit: Arc<AuditLog>) -> Self {
        let proposals = Box::new(JournalProposalStore::new(store.clone()));
        Self {
            store,
            audit,
            proposals,
        }
    }

    /// An engine with a custom proposal store backend.
    pub fn with_proposal_store(
        store: Arc<VersionedStore>,
        audit: Arc<AuditLog>,
        proposals: Box<dyn ProposalStore + Send + Sync>,
    ) -> Self {
        Self {
            store,
            audit,
            proposals,
        }
    }

    // ── Projects ──

    /// Create a project: one commit carrying the meta record and the initial
    /// workflow state (`initiating`), plus a `project_created` audit event.
    pub fn create_project(
        &self,
        key: &str,
        name: &str,
        actor: &str,
    ) -> Result<ProjectMeta, EngineError> {
        if name.trim().is_empty() {
            return Err(EngineError::Validation {
                field: "name".to_string(),
                reason: "project name must not be empty".to_string(),
            });
        }

        let meta = ProjectMeta::new(key, name);
        let mut staged = StagedChanges::new();
        staged.put(
            WORKFLOW_STATE_PATH,
            serde_json::to_string_pretty(&WorkflowState::initial(actor))
                .map_err(StoreError::from)?,
        );

        let commit = self
            .store
            .create_project(&meta, staged, "create project", actor)
            .map_err(|err| match err {
                StoreError::InvalidKey { key } => EngineError::Validation {
                    field: "key".to_string(),
                    reason: format!("invalid project key '{}'", key),
                },
                StoreError::ProjectExists { key } => EngineError::Conflict {
                    path: key,
                    reason: "project already exists".to_string(),
                },
                other => EngineError::Storage(other),
            })?;

        self.audit.append(
            key,
            EventType::ProjectCreated,
            actor,
            serde_json::json!({ "key": key, "name": name }),
            Some(commit.hash.clone()),
        )?;

        tracing::info!(project = key, commit = %commit.hash, "created project");
        Ok(meta)
    }

    /// Update a project's display name: one commit, one `project_updated`
    /// event. The key is immutable.
    pub fn update_project_name(
        &self,
        key: &str,
        name: &str,
        actor: &str,
    ) -> Result<ProjectMeta, EngineError> {
        self.ensure_project(key)?;
        if name.trim().is_empty() {
            return Err(EngineError::Validation {
                field: "name".to_string(),
                reason: "project name must not be empty".to_string(),
            });
        }

        let base = self.store.last_commit(key)?.map(|commit| commit.hash);
        let renamed = self.store.project_meta(key)?.renamed(name);
        let mut staged = StagedChanges::new();
        staged.put(
            PROJECT_META_PATH,
            serde_json::to_string_pretty(&renamed).map_err(StoreError::from)?,
        );
        let commit = self
            .store
            .commit(key, "update project name", actor, staged, base.as_deref())
            .map_err(|err| Self::map_commit_error(key, err))?;

        self.audit.append(
            key,
            EventType::ProjectUpdated,
            actor,
            serde_json::json!({ "key": key, "name": name }),
            Some(commit.hash),
        )?;
        Ok(renamed)
    }

    /// The project's current meta record.
    pub fn project_meta(&self, key: &str) -> Result<ProjectMeta, EngineError> {
        self.ensure_project(key)?;
        Ok(self.store.project_meta(key)?)
    }

    // ── Proposals ──

    /// Propose a single-file change.
    #[allow(clippy::too_many_arguments)]
    pub fn propose(
        &self,
        project: &str,
        change_type: ChangeType,
        path: &str,
        diff_text: &str,
        kind: ArtifactKind,
        author: &str,
        rationale: &str,
    ) -> Result<Proposal, EngineError> {
        self.propose_changes(
            project,
            vec![ChangeSpec {
                change_type,
                path: path.to_string(),
                diff_text: diff_text.to_string(),
                kind,
            }],
            author,
            rationale,
        )
    }

    /// Propose an ordered set of per-file changes sharing one proposal ID.
    ///
    /// Validates structure only and records the proposal as pending; the
    /// commit history is not touched. Each change captures a drift token —
    /// the hash of the last commit that touched its path — for apply-time
    /// comparison.
    pub fn propose_changes(
        &self,
        project: &str,
        specs: Vec<ChangeSpec>,
        author: &str,
        rationale: &str,
    ) -> Result<Proposal, EngineError> {
        self.ensure_project(project)?;
        if specs.is_empty() {
            return Err(EngineError::Validation {
                field: "changes".to_string(),
                reason: "a proposal needs at least one change".to_string(),
            });
        }

        let mut changes = Vec::with_capacity(specs.len());
        for spec in specs {
            Self::validate_artifact_path(&spec.path)?;
            if changes.iter().any(|c: &ProposedChange| c.path == spec.path) {
                return Err(EngineError::Validation {
                    field: format!("changes['{}']", spec.path),
                    reason: "duplicate target path within one proposal".to_string(),
                });
            }
            helm_diff::validate(spec.change_type, &spec.diff_text)
                .map_err(|err| Self::map_diff_error(&spec.path, err))?;

            let base = self
                .store
                .history(project, &spec.path)?
                .first()
                .map(|commit| commit.hash.clone());
            changes.push(ProposedChange {
                change_type: spec.change_type,
                path: spec.path,
                diff_text: spec.diff_text,
                kind: spec.kind,
                base,
            });
        }

        let proposal = Proposal::new(project, changes, author, rationale);
        self.proposals.save(project, &proposal)?;

        self.audit.append(
            project,
            EventType::ProposalCreated,
            author,
            serde_json::json!({
                "proposal_id": proposal.proposal_id,
                "paths": proposal.paths(),
            }),
            None,
        )?;

        tracing::debug!(project, proposal = %proposal.proposal_id, "stored pending proposal");
        Ok(proposal)
    }

    /// Apply a pending proposal: re-validate every change against current
    /// content, commit the results atomically, resolve the proposal, and
    /// append a `proposal_applied` event linked to the commit.
    pub fn apply(&self, project: &str, id: Uuid) -> Result<ApplyResult, EngineError> {
        self.ensure_project(project)?;
        let proposal = self.load_proposal(project, id)?;
        if !proposal.is_pending() {
            return Err(EngineError::InvalidState {
                id,
                status: proposal.status,
            });
        }

        let base = self.store.last_commit(project)?.map(|commit| commit.hash);
        let mut staged = StagedChanges::new();
        let mut changed_paths = Vec::with_capacity(proposal.changes.len());

        for change in &proposal.changes {
            // Drift token check: the last commit touching this path must be
            // the one the proposal was created against.
            let current_base = self
                .store
                .history(project, &change.path)?
                .first()
                .map(|commit| commit.hash.clone());
            if current_base != change.base {
                return Err(EngineError::Conflict {
                    path: change.path.clone(),
                    reason: "content changed since the proposal was created".to_string(),
                });
            }

            let current = self.store.try_read_file(project, &change.path)?;
            let applied =
                helm_diff::apply(change.change_type, current.as_deref(), &change.diff_text)
                    .map_err(|err| Self::map_diff_error(&change.path, err))?;
            match applied {
                Applied::Content(content) => staged.put(change.path.as_str(), content),
                Applied::Deleted => staged.remove(change.path.as_str()),
            }
            changed_paths.push(change.path.clone());
        }

        let message = format!("apply proposal {}", proposal.proposal_id);
        let commit = self
            .store
            .commit(project, &message, &proposal.author, staged, base.as_deref())
            .map_err(|err| Self::map_commit_error(project, err))?;

        let resolved = proposal.mark_applied(commit.hash.clone());
        if !self.proposals.update(project, &resolved)? {
            return Err(EngineError::ProposalNotFound {
                project: project.to_string(),
                id,
            });
        }

        self.audit.append(
            project,
            EventType::ProposalApplied,
            &resolved.author,
            serde_json::json!({
                "proposal_id": resolved.proposal_id,
                "paths": changed_paths,
            }),
            Some(commit.hash.clone()),
        )?;

        tracing::info!(project, proposal = %id, commit = %commit.hash, "applied proposal");
        Ok(ApplyResult {
            commit: commit.hash,
            changed_paths,
        })
    }

    /// Reject a pending proposal. Records the reason and appends a
    /// `proposal_rejected` event; the commit history is not touched.
    pub fn reject(&self, project: &str, id: Uuid, reason: &str) -> Result<Proposal, EngineError> {
        self.ensure_project(project)?;
        let proposal = self.load_proposal(project, id)?;
        if !proposal.is_pending() {
            return Err(EngineError::InvalidState {
                id,
                status: proposal.status,
            });
        }

        let resolved = proposal.mark_rejected(reason);
        if !self.proposals.update(project, &resolved)? {
            return Err(EngineError::ProposalNotFound {
                project: project.to_string(),
                id,
            });
        }

        self.audit.append(
            project,
            EventType::ProposalRejected,
            &resolved.author,
            serde_json::json!({
                "proposal_id": resolved.proposal_id,
                "reason": reason,
            }),
            None,
        )?;

        tracing::info!(project, proposal = %id, "rejected proposal");
        Ok(resolved)
    }

    /// Proposals for a project, ordered by creation time ascending. A
    /// change-type filter matches proposals containing any change of that
    /// type.
    pub fn list(
        &self,
        project: &str,
        status: Option<ProposalStatus>,
        change_type: Option<ChangeType>,
    ) -> Result<Vec<Proposal>, EngineError> {
        self.ensure_project(project)?;
        let mut proposals = self.proposals.list(project)?;
        if let Some(status) = status {
            proposals.retain(|p| p.status == status);
        }
        if let Some(change_type) = change_type {
            proposals.retain(|p| p.changes.iter().any(|c| c.change_type == change_type));
        }
        Ok(proposals)
    }

    /// A specific proposal by ID.
    pub fn get(&self, project: &str, id: Uuid) -> Result<Proposal, EngineError> {
        self.ensure_project(project)?;
        self.load_proposal(project, id)
    }

    // ── Internals ──

    fn ensure_project(&self, key: &str) -> Result<(), EngineError> {
        if self.store.project_exists(key) {
            Ok(())
        } else {
            Err(EngineError::ProjectNotFound {
                key: key.to_string(),
            })
        }
    }

    fn load_proposal(&self, project: &str, id: Uuid) -> Result<Proposal, EngineError> {
        self.proposals
            .get(project, id)?
            .ok_or_else(|| EngineError::ProposalNotFound {
                project: project.to_string(),
                id,
            })
    }

    /// Artifact paths must be storable and must not reach into the engine's
    /// reserved records.
    fn validate_artifact_path(path: &str) -> Result<(), EngineError> {
        helm_store::validate_path(path).map_err(|err| EngineError::Validation {
            field: format!("path '{}'", path),
            reason: err.to_string(),
        })?;
        if path.starts_with(RESERVED_PREFIX) {
            return Err(EngineError::Validation {
                field: format!("path '{}'", path),
                reason: format!("'{}' is reserved for engine records", RESERVED_PREFIX),
            });
        }
        Ok(())
    }

    /// Conflicts (drift, duplicate targets) and structural problems arrive
    /// as one error type from the diff layer; split them here.
    fn map_diff_error(path: &str, err: DiffError) -> EngineError {
        if err.is_conflict() {
            EngineError::Conflict {
                path: path.to_string(),
                reason: err.to_string(),
            }
        } else {
            EngineError::Validation {
                field: format!("diff for '{}'", path),
                reason: err.to_string(),
            }
        }
    }

    /// A moved head means the read-validate window was raced — a conflict,
    /// not a storage fault. Everything else is a storage error.
    fn map_commit_error(project: &str, err: StoreError) -> EngineError {
        match err {
            StoreError::HeadMoved { .. } => EngineError::Conflict {
                path: project.to_string(),
                reason: err.to_string(),
            },
            other => EngineError::Storage(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helm_audit::{EventFilter, Page};
    use helm_workflow::{WorkflowPhase, WorkflowStateMachine};
    use tempfile::tempdir;

    struct Ctx {
        store: Arc<VersionedStore>,
        audit: Arc<AuditLog>,
        engine: ProposalEngine,
    }

    fn setup(dir: &std::path::Path) -> Ctx {
        let store = Arc::new(VersionedStore::open(dir.join("store")).unwrap());
        let audit = Arc::new(AuditLog::new(store.clone()));
        let engine = ProposalEngine::new(store.clone(), audit.clone());
        Ctx {
            store,
            audit,
            engine,
        }
    }

    fn all_events(ctx: &Ctx, project: &str) -> Vec<helm_audit::AuditEvent> {
        ctx.audit
            .query(
                project,
                &EventFilter::default(),
                Page {
                    limit: 100,
                    offset: 0,
                },
            )
            .unwrap()
            .0
    }

    fn propose_create(ctx: &Ctx, project: &str, path: &str, content: &str) -> Proposal {
        ctx.engine
            .propose(
                project,
                ChangeType::Create,
                path,
                content,
                ArtifactKind::Plan,
                "alice",
                "seed document",
            )
            .unwrap()
    }

    #[test]
    fn create_project_sets_meta_workflow_and_event() {
        let dir = tempdir().unwrap();
        let ctx = setup(dir.path());

        let meta = ctx.engine.create_project("p1", "Apollo", "pm-1").unwrap();
        assert_eq!(meta.key, "p1");
        assert_eq!(meta.name, "Apollo");

        // One commit carrying both reserved records.
        assert_eq!(ctx.store.log("p1").unwrap().len(), 1);
        let state: WorkflowState = serde_json::from_str(
            &ctx.store.read_file("p1", WORKFLOW_STATE_PATH).unwrap(),
        )
        .unwrap();
        assert_eq!(state.phase, WorkflowPhase::Initiating);

        let events = all_events(&ctx, "p1");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::ProjectCreated);
        assert!(events[0].commit.is_some());
    }

    #[test]
    fn duplicate_project_key_is_a_conflict() {
        let dir = tempdir().unwrap();
        let ctx = setup(dir.path());
        ctx.engine.create_project("p1", "Apollo", "pm-1").unwrap();

        let result = ctx.engine.create_project("p1", "Apollo Again", "pm-1");
        assert!(matches!(result, Err(EngineError::Conflict { .. })));
    }

    #[test]
    fn invalid_project_key_is_a_validation_error() {
        let dir = tempdir().unwrap();
        let ctx = setup(dir.path());

        let result = ctx.engine.create_project("bad key!", "Apollo", "pm-1");
        assert!(matches!(
            result,
            Err(EngineError::Validation { ref field, .. }) if field == "key"
        ));
    }

    #[test]
    fn update_project_name_commits_and_logs() {
        let dir = tempdir().unwrap();
        let ctx = setup(dir.path());
        ctx.engine.create_project("p1", "Apollo", "pm-1").unwrap();

        let renamed = ctx
            .engine
            .update_project_name("p1", "Apollo Phase 2", "pm-1")
            .unwrap();
        assert_eq!(renamed.name, "Apollo Phase 2");
        assert_eq!(ctx.engine.project_meta("p1").unwrap().name, "Apollo Phase 2");
        assert_eq!(ctx.store.log("p1").unwrap().len(), 2);

        let events = all_events(&ctx, "p1");
        assert_eq!(events.last().unwrap().event_type, EventType::ProjectUpdated);
    }

    #[test]
    fn propose_stores_pending_without_touching_history() {
        let dir = tempdir().unwrap();
        let ctx = setup(dir.path());
        ctx.engine.create_project("p1", "Apollo", "pm-1").unwrap();
        let commits_before = ctx.store.log("p1").unwrap().len();

        let proposal = propose_create(&ctx, "p1", "artifacts/plan.md", "# Plan\n");

        assert_eq!(proposal.status, ProposalStatus::Pending);
        assert_eq!(ctx.store.log("p1").unwrap().len(), commits_before);
        assert!(ctx
            .store
            .try_read_file("p1", "artifacts/plan.md")
            .unwrap()
            .is_none());

        let events = all_events(&ctx, "p1");
        assert_eq!(events.last().unwrap().event_type, EventType::ProposalCreated);
        assert!(events.last().unwrap().commit.is_none());
    }

    #[test]
    fn propose_against_unknown_project_fails() {
        let dir = tempdir().unwrap();
        let ctx = setup(dir.path());

        let result = ctx.engine.propose(
            "ghost",
            ChangeType::Create,
            "a.md",
            "content\n",
            ArtifactKind::Other,
            "alice",
            "r",
        );
        assert!(matches!(result, Err(EngineError::ProjectNotFound { .. })));
    }

    #[test]
    fn propose_malformed_update_diff_is_rejected_and_not_stored() {
        let dir = tempdir().unwrap();
        let ctx = setup(dir.path());
        ctx.engine.create_project("p1", "Apollo", "pm-1").unwrap();

        let result = ctx.engine.propose(
            "p1",
            ChangeType::Update,
            "plan.md",
            "this is not a unified diff",
            ArtifactKind::Plan,
            "alice",
            "r",
        );
        assert!(matches!(result, Err(EngineError::Validation { .. })));
        assert!(ctx.engine.list("p1", None, None).unwrap().is_empty());
    }

    #[test]
    fn propose_reserved_path_is_rejected() {
        let dir = tempdir().unwrap();
        let ctx = setup(dir.path());
        ctx.engine.create_project("p1", "Apollo", "pm-1").unwrap();

        let result = ctx.engine.propose(
            "p1",
            ChangeType::Create,
            ".helm/workflow.json",
            "{}",
            ArtifactKind::Other,
            "alice",
            "r",
        );
        assert!(matches!(result, Err(EngineError::Validation { .. })));
    }

    #[test]
    fn propose_with_no_changes_is_rejected() {
        let dir = tempdir().unwrap();
        let ctx = setup(dir.path());
        ctx.engine.create_project("p1", "Apollo", "pm-1").unwrap();

        let result = ctx
            .engine
            .propose_changes("p1", Vec::new(), "alice", "empty");
        assert!(matches!(result, Err(EngineError::Validation { .. })));
    }

    #[test]
    fn propose_with_duplicate_paths_is_rejected() {
        let dir = tempdir().unwrap();
        let ctx = setup(dir.path());
        ctx.engine.create_project("p1", "Apollo", "pm-1").unwrap();

        let spec = |path: &str| ChangeSpec {
            change_type: ChangeType::Create,
            path: path.to_string(),
            diff_text: "content\n".to_string(),
            kind: ArtifactKind::Plan,
        };
        let result = ctx
            .engine
            .propose_changes("p1", vec![spec("a.md"), spec("a.md")], "alice", "dup");
        assert!(matches!(result, Err(EngineError::Validation { .. })));
    }

    #[test]
    fn apply_create_then_update_grows_history() {
        let dir = tempdir().unwrap();
        let ctx = setup(dir.path());
        ctx.engine.create_project("p1", "Apollo", "pm-1").unwrap();

        // Create the plan.
        let created = propose_create(&ctx, "p1", "artifacts/plan.md", "# Plan\nscope\n");
        ctx.engine.apply("p1", created.proposal_id).unwrap();
        assert_eq!(ctx.store.history("p1", "artifacts/plan.md").unwrap().len(), 1);

        // Update it with a diff adding a line.
        let diff = "@@ -1,2 +1,3 @@\n # Plan\n scope\n+schedule\n";
        let updated = ctx
            .engine
            .propose(
                "p1",
                ChangeType::Update,
                "artifacts/plan.md",
                diff,
                ArtifactKind::Plan,
                "alice",
                "add schedule",
            )
            .unwrap();
        let result = ctx.engine.apply("p1", updated.proposal_id).unwrap();

        assert_eq!(
            ctx.store.read_file("p1", "artifacts/plan.md").unwrap(),
            "# Plan\nscope\nschedule\n"
        );
        assert_eq!(ctx.store.history("p1", "artifacts/plan.md").unwrap().len(), 2);

        let resolved = ctx.engine.get("p1", updated.proposal_id).unwrap();
        assert_eq!(resolved.status, ProposalStatus::Applied);
        assert_eq!(resolved.applied_commit.as_deref(), Some(result.commit.as_str()));

        // One proposal_applied event linked to the new commit.
        let filter = EventFilter {
            event_type: Some(EventType::ProposalApplied),
            ..Default::default()
        };
        let (events, total) = ctx
            .audit
            .query("p1", &filter, Page { limit: 10, offset: 0 })
            .unwrap();
        assert_eq!(total, 2); // the create apply and the update apply
        assert_eq!(events[1].commit.as_deref(), Some(result.commit.as_str()));
    }

    #[test]
    fn multi_file_proposal_applies_as_one_commit() {
        let dir = tempdir().unwrap();
        let ctx = setup(dir.path());
        ctx.engine.create_project("p1", "Apollo", "pm-1").unwrap();
        let commits_before = ctx.store.log("p1").unwrap().len();

        let spec = |path: &str, content: &str| ChangeSpec {
            change_type: ChangeType::Create,
            path: path.to_string(),
            diff_text: content.to_string(),
            kind: ArtifactKind::Report,
        };
        let proposal = ctx
            .engine
            .propose_changes(
                "p1",
                vec![
                    spec("reports/week-1.md", "# Week 1\n"),
                    spec("reports/week-2.md", "# Week 2\n"),
                ],
                "alice",
                "weekly reports",
            )
            .unwrap();
        let result = ctx.engine.apply("p1", proposal.proposal_id).unwrap();

        assert_eq!(
            result.changed_paths,
            vec!["reports/week-1.md", "reports/week-2.md"]
        );
        assert_eq!(ctx.store.log("p1").unwrap().len(), commits_before + 1);
        assert_eq!(ctx.store.read_file("p1", "reports/week-1.md").unwrap(), "# Week 1\n");
        assert_eq!(ctx.store.read_file("p1", "reports/week-2.md").unwrap(), "# Week 2\n");
    }

    #[test]
    fn competing_creates_second_apply_conflicts() {
        let dir = tempdir().unwrap();
        let ctx = setup(dir.path());
        ctx.engine.create_project("p1", "Apollo", "pm-1").unwrap();

        let first = propose_create(&ctx, "p1", "artifacts/new.md", "first\n");
        let second = propose_create(&ctx, "p1", "artifacts/new.md", "second\n");

        ctx.engine.apply("p1", first.proposal_id).unwrap();
        let result = ctx.engine.apply("p1", second.proposal_id);

        assert!(matches!(result, Err(EngineError::Conflict { .. })));
        // The losing proposal stays pending and content is untouched.
        assert_eq!(
            ctx.engine.get("p1", second.proposal_id).unwrap().status,
            ProposalStatus::Pending
        );
        assert_eq!(ctx.store.read_file("p1", "artifacts/new.md").unwrap(), "first\n");
    }

    #[test]
    fn drift_is_detected_at_apply_time() {
        let dir = tempdir().unwrap();
        let ctx = setup(dir.path());
        ctx.engine.create_project("p1", "Apollo", "pm-1").unwrap();

        let seed = propose_create(&ctx, "p1", "plan.md", "line one\nline two\n");
        ctx.engine.apply("p1", seed.proposal_id).unwrap();

        // Two competing updates proposed against the same content.
        let diff_a = "@@ -1,2 +1,2 @@\n line one\n-line two\n+line 2a\n";
        let diff_b = "@@ -1,2 +1,2 @@\n line one\n-line two\n+line 2b\n";
        let propose_update = |diff: &str| {
            ctx.engine
                .propose(
                    "p1",
                    ChangeType::Update,
                    "plan.md",
                    diff,
                    ArtifactKind::Plan,
                    "alice",
                    "tweak",
                )
                .unwrap()
        };
        let a = propose_update(diff_a);
        let b = propose_update(diff_b);

        // B lands first; A's world has drifted.
        ctx.engine.apply("p1", b.proposal_id).unwrap();
        let result = ctx.engine.apply("p1", a.proposal_id);

        assert!(matches!(result, Err(EngineError::Conflict { .. })));
        assert_eq!(
            ctx.store.read_file("p1", "plan.md").unwrap(),
            "line one\nline 2b\n"
        );
        assert_eq!(
            ctx.engine.get("p1", a.proposal_id).unwrap().status,
            ProposalStatus::Pending
        );
    }

    #[test]
    fn reject_records_reason_without_commit() {
        let dir = tempdir().unwrap();
        let ctx = setup(dir.path());
        ctx.engine.create_project("p1", "Apollo", "pm-1").unwrap();
        let proposal = propose_create(&ctx, "p1", "plan.md", "# Plan\n");
        let commits_before = ctx.store.log("p1").unwrap().len();

        let resolved = ctx
            .engine
            .reject("p1", proposal.proposal_id, "out of scope")
            .unwrap();

        assert_eq!(resolved.status, ProposalStatus::Rejected);
        assert_eq!(resolved.reject_reason.as_deref(), Some("out of scope"));
        assert_eq!(ctx.store.log("p1").unwrap().len(), commits_before);

        let events = all_events(&ctx, "p1");
        let last = events.last().unwrap();
        assert_eq!(last.event_type, EventType::ProposalRejected);
        assert!(last.commit.is_none());
        assert_eq!(last.payload["reason"], "out of scope");
    }

    #[test]
    fn resolved_proposals_cannot_be_reapplied_or_rejected() {
        let dir = tempdir().unwrap();
        let ctx = setup(dir.path());
        ctx.engine.create_project("p1", "Apollo", "pm-1").unwrap();

        let applied = propose_create(&ctx, "p1", "a.md", "a\n");
        ctx.engine.apply("p1", applied.proposal_id).unwrap();
        let rejected = propose_create(&ctx, "p1", "b.md", "b\n");
        ctx.engine.reject("p1", rejected.proposal_id, "no").unwrap();

        // Idempotent failure regardless of repetition.
        for _ in 0..2 {
            assert!(matches!(
                ctx.engine.apply("p1", applied.proposal_id),
                Err(EngineError::InvalidState { .. })
            ));
            assert!(matches!(
                ctx.engine.reject("p1", applied.proposal_id, "late"),
                Err(EngineError::InvalidState { .. })
            ));
            assert!(matches!(
                ctx.engine.apply("p1", rejected.proposal_id),
                Err(EngineError::InvalidState { .. })
            ));
        }
    }

    #[test]
    fn unknown_proposal_is_not_found() {
        let dir = tempdir().unwrap();
        let ctx = setup(dir.path());
        ctx.engine.create_project("p1", "Apollo", "pm-1").unwrap();

        let ghost = Uuid::new_v4();
        assert!(matches!(
            ctx.engine.apply("p1", ghost),
            Err(EngineError::ProposalNotFound { .. })
        ));
        assert!(matches!(
            ctx.engine.get("p1", ghost),
            Err(EngineError::ProposalNotFound { .. })
        ));
    }

    #[test]
    fn list_filters_by_status_and_change_type() {
        let dir = tempdir().unwrap();
        let ctx = setup(dir.path());
        ctx.engine.create_project("p1", "Apollo", "pm-1").unwrap();

        let a = propose_create(&ctx, "p1", "a.md", "a\n");
        ctx.engine.apply("p1", a.proposal_id).unwrap();
        let _b = propose_create(&ctx, "p1", "b.md", "b\n");
        let c = ctx
            .engine
            .propose(
                "p1",
                ChangeType::Delete,
                "a.md",
                "",
                ArtifactKind::Plan,
                "alice",
                "retire",
            )
            .unwrap();

        let all = ctx.engine.list("p1", None, None).unwrap();
        assert_eq!(all.len(), 3);
        // Creation order ascending.
        assert!(all[0].created_at <= all[1].created_at);
        assert!(all[1].created_at <= all[2].created_at);

        let pending = ctx
            .engine
            .list("p1", Some(ProposalStatus::Pending), None)
            .unwrap();
        assert_eq!(pending.len(), 2);

        let deletes = ctx
            .engine
            .list("p1", None, Some(ChangeType::Delete))
            .unwrap();
        assert_eq!(deletes.len(), 1);
        assert_eq!(deletes[0].proposal_id, c.proposal_id);
    }

    #[test]
    fn audit_trail_records_operations_in_order() {
        let dir = tempdir().unwrap();
        let ctx = setup(dir.path());
        ctx.engine.create_project("p1", "Apollo", "pm-1").unwrap();

        let a = propose_create(&ctx, "p1", "a.md", "a\n");
        ctx.engine.apply("p1", a.proposal_id).unwrap();
        let b = propose_create(&ctx, "p1", "b.md", "b\n");
        ctx.engine.reject("p1", b.proposal_id, "no").unwrap();

        let events = all_events(&ctx, "p1");
        let types: Vec<EventType> = events.iter().map(|e| e.event_type).collect();
        assert_eq!(
            types,
            vec![
                EventType::ProjectCreated,
                EventType::ProposalCreated,
                EventType::ProposalApplied,
                EventType::ProposalCreated,
                EventType::ProposalRejected,
            ]
        );
        let seqs: Vec<u64> = events.iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn delete_proposal_tombstones_the_artifact() {
        let dir = tempdir().unwrap();
        let ctx = setup(dir.path());
        ctx.engine.create_project("p1", "Apollo", "pm-1").unwrap();

        let created = propose_create(&ctx, "p1", "old-report.md", "obsolete\n");
        ctx.engine.apply("p1", created.proposal_id).unwrap();

        let delete = ctx
            .engine
            .propose(
                "p1",
                ChangeType::Delete,
                "old-report.md",
                "",
                ArtifactKind::Report,
                "alice",
                "superseded",
            )
            .unwrap();
        ctx.engine.apply("p1", delete.proposal_id).unwrap();

        assert!(ctx.store.try_read_file("p1", "old-report.md").unwrap().is_none());
        // History keeps both the write and the deletion.
        assert_eq!(ctx.store.history("p1", "old-report.md").unwrap().len(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn storage_failure_during_apply_leaves_proposal_pending() {
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let ctx = setup(dir.path());
        ctx.engine.create_project("p1", "Apollo", "pm-1").unwrap();
        let proposal = propose_create(&ctx, "p1", "plan.md", "# Plan\n");
        let commits_before = ctx.store.log("p1").unwrap().len();

        // Make the blob directory unwritable so the commit fails mid-write.
        let objects = dir.path().join("store").join("p1").join("objects");
        let writable = fs::metadata(&objects).unwrap().permissions();
        fs::set_permissions(&objects, fs::Permissions::from_mode(0o555)).unwrap();

        let result = ctx.engine.apply("p1", proposal.proposal_id);
        fs::set_permissions(&objects, writable).unwrap();

        assert!(matches!(result, Err(EngineError::Storage(_))));
        assert_eq!(
            ctx.engine.get("p1", proposal.proposal_id).unwrap().status,
            ProposalStatus::Pending
        );
        assert_eq!(ctx.store.log("p1").unwrap().len(), commits_before);
        // No proposal_applied event was emitted.
        let events = all_events(&ctx, "p1");
        assert!(events
            .iter()
            .all(|e| e.event_type != EventType::ProposalApplied));
    }

    #[test]
    fn full_lifecycle_with_workflow_transitions() {
        let dir = tempdir().unwrap();
        let ctx = setup(dir.path());
        let machine = WorkflowStateMachine::new(ctx.store.clone(), ctx.audit.clone());

        ctx.engine.create_project("p1", "Apollo", "pm-1").unwrap();

        // Direct jump is illegal; the two-step path is not.
        assert!(machine
            .transition("p1", WorkflowPhase::Executing, "pm-1", None)
            .is_err());
        machine
            .transition("p1", WorkflowPhase::Planning, "pm-1", None)
            .unwrap();

        let proposal = propose_create(&ctx, "p1", "artifacts/plan.md", "# Plan\n");
        ctx.engine.apply("p1", proposal.proposal_id).unwrap();

        machine
            .transition("p1", WorkflowPhase::Executing, "pm-1", Some("plan approved"))
            .unwrap();

        let events = all_events(&ctx, "p1");
        let types: Vec<EventType> = events.iter().map(|e| e.event_type).collect();
        assert_eq!(
            types,
            vec![
                EventType::ProjectCreated,
                EventType::WorkflowStateChanged,
                EventType::ProposalCreated,
                EventType::ProposalApplied,
                EventType::WorkflowStateChanged,
            ]
        );
        assert_eq!(machine.state("p1").unwrap().phase, WorkflowPhase::Executing);
    }
}
