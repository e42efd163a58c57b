// store.rs — VersionedStore: per-project commit history, blobs, and journals.
//
// On disk, each project owns one namespace directory:
//
//   <root>/<key>/objects/<sha256>    content-addressed blobs (write-once)
//   <root>/<key>/commits.jsonl       append-only commit log, one Commit per line
//   <root>/<key>/<name>.jsonl        journals for co-located metadata
//                                    (audit events, proposal records)
//
// Commit protocol: blobs are written first, then the commit line is appended
// and flushed. A failure at any point before the append leaves no visible
// trace — readers only ever see fully recorded commits. Commits to the same
// project are serialized by a per-project mutex; commits to different
// projects do not block each other.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::commit::{Commit, CommitRef, FileEntry, StagedChanges, StagedEntry};
use crate::error::StoreError;
use crate::hasher;
use crate::project::{validate_path, validate_project_key, ProjectMeta, PROJECT_META_PATH};

const COMMIT_LOG: &str = "commits.jsonl";
const OBJECTS_DIR: &str = "objects";

/// Content-addressed, commit-based storage of per-project files.
pub struct VersionedStore {
    root: PathBuf,
    /// Per-project mutation locks, created lazily. At most one commit is in
    /// flight per project at any time.
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl VersionedStore {
    /// Open (or create) a store rooted at the given directory.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|source| StoreError::Io {
            path: root.clone(),
            source,
        })?;
        Ok(Self {
            root,
            locks: Mutex::new(HashMap::new()),
        })
    }

    /// Whether a project namespace exists.
    pub fn project_exists(&self, key: &str) -> bool {
        self.project_dir(key).join(COMMIT_LOG).exists()
    }

    /// Create a project namespace and record its initial commit.
    ///
    /// The meta record is staged at its reserved path alongside whatever the
    /// caller staged (e.g. the initial workflow record), so project creation
    /// is exactly one commit.
    pub fn create_project(
        &self,
        meta: &ProjectMeta,
        mut staged: StagedChanges,
        message: &str,
        author: &str,
    ) -> Result<Commit, StoreError> {
        validate_project_key(&meta.key)?;
        if self.project_exists(&meta.key) {
            return Err(StoreError::ProjectExists {
                key: meta.key.clone(),
            });
        }

        let objects = self.project_dir(&meta.key).join(OBJECTS_DIR);
        fs::create_dir_all(&objects).map_err(|source| StoreError::Io {
            path: objects,
            source,
        })?;
        // Touch the commit log so the namespace is recognized from here on.
        let log_path = self.commit_log_path(&meta.key);
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .map_err(|source| StoreError::Io {
                path: log_path,
                source,
            })?;

        staged.put(PROJECT_META_PATH, serde_json::to_string_pretty(meta)?);
        self.commit(&meta.key, message, author, staged, None)
    }

    /// Read the project meta record at head.
    pub fn project_meta(&self, key: &str) -> Result<ProjectMeta, StoreError> {
        let raw = self.read_file(key, PROJECT_META_PATH)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Read a file's content at head. Fails with `NotFound` if the path has
    /// no live entry (never written, or deleted).
    pub fn read_file(&self, project: &str, path: &str) -> Result<String, StoreError> {
        self.try_read_file(project, path)?
            .ok_or_else(|| StoreError::NotFound {
                project: project.to_string(),
                path: path.to_string(),
            })
    }

    /// Read a file's content at head, or `None` if it has no live entry.
    pub fn try_read_file(&self, project: &str, path: &str) -> Result<Option<String>, StoreError> {
        self.ensure_project(project)?;
        let head = match self.last_commit(project)? {
            Some(head) => head,
            None => return Ok(None),
        };
        match head.entry(path) {
            Some(FileEntry::Blob { hash }) => Ok(Some(self.read_blob(project, hash)?)),
            Some(FileEntry::Tombstone) | None => Ok(None),
        }
    }

    /// Atomically persist all staged changes as one durable checkpoint.
    ///
    /// `base` is the head hash the caller prepared its changes against
    /// (`None` = expecting an empty history). If the actual head differs,
    /// the commit fails with `HeadMoved` and nothing is written — the
    /// caller's read-validate window was raced and it must re-read and retry.
    pub fn commit(
        &self,
        project: &str,
        message: &str,
        author: &str,
        staged: StagedChanges,
        base: Option<&str>,
    ) -> Result<Commit, StoreError> {
        self.ensure_project(project)?;
        for path in staged.paths() {
            validate_path(path)?;
        }

        let lock = self.lock_for(project);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let head = self.last_commit(project)?;
        let actual = head.as_ref().map(|c| c.hash.clone());
        if actual.as_deref() != base {
            return Err(StoreError::HeadMoved {
                project: project.to_string(),
                expected: base.map(str::to_string),
                actual,
            });
        }

        let mut files = head.map(|c| c.files).unwrap_or_default();
        for (path, entry) in staged.into_entries() {
            match entry {
                StagedEntry::Put(content) => {
                    let hash = self.write_blob(project, &content)?;
                    files.insert(path, FileEntry::Blob { hash });
                }
                StagedEntry::Remove => {
                    let live = files.get(&path).is_some_and(FileEntry::is_live);
                    if !live {
                        return Err(StoreError::NotFound {
                            project: project.to_string(),
                            path,
                        });
                    }
                    files.insert(path, FileEntry::Tombstone);
                }
            }
        }

        let commit = Commit::new(actual, message, author, files)?;
        self.append_commit_line(project, &commit)?;
        tracing::info!(
            project,
            commit = %commit.hash,
            message,
            "recorded commit"
        );
        Ok(commit)
    }

    /// Commits that changed the given path, most-recent first.
    pub fn history(&self, project: &str, path: &str) -> Result<Vec<CommitRef>, StoreError> {
        self.ensure_project(project)?;
        let commits = self.read_commits(project)?;
        let mut touched = Vec::new();
        for (idx, commit) in commits.iter().enumerate() {
            let previous = if idx == 0 {
                None
            } else {
                commits[idx - 1].entry(path)
            };
            if commit.entry(path) != previous {
                touched.push(commit.to_ref());
            }
        }
        touched.reverse();
        Ok(touched)
    }

    /// All commits for a project, most-recent first.
    pub fn log(&self, project: &str) -> Result<Vec<CommitRef>, StoreError> {
        self.ensure_project(project)?;
        let mut refs: Vec<CommitRef> = self
            .read_commits(project)?
            .iter()
            .map(Commit::to_ref)
            .collect();
        refs.reverse();
        Ok(refs)
    }

    /// The current head commit, or `None` if the project has no commits yet.
    pub fn last_commit(&self, project: &str) -> Result<Option<Commit>, StoreError> {
        self.ensure_project(project)?;
        Ok(self.read_commits(project)?.pop())
    }

    // ── Journals ──
    //
    // Append-only JSONL files co-located in the project namespace, used by
    // the audit log and the proposal table. Journals are not part of the
    // commit history; they carry their own ordering.

    /// Append one line to a project journal and flush it to disk.
    pub fn append_line(&self, project: &str, journal: &str, line: &str) -> Result<(), StoreError> {
        self.ensure_project(project)?;
        let path = self.project_dir(project).join(journal);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{}", line).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        writer
            .flush()
            .map_err(|source| StoreError::Io { path, source })
    }

    /// Read all lines of a project journal, oldest first. Missing journal
    /// reads as empty; blank lines are skipped.
    pub fn read_lines(&self, project: &str, journal: &str) -> Result<Vec<String>, StoreError> {
        self.ensure_project(project)?;
        let path = self.project_dir(project).join(journal);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        let reader = BufReader::new(file);
        let mut lines = Vec::new();
        for line in reader.lines() {
            let line = line.map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            if !line.trim().is_empty() {
                lines.push(line);
            }
        }
        Ok(lines)
    }

    /// Replace a project journal's contents. Writes to a temp file first and
    /// renames over the original, so readers see either the old journal or
    /// the new one, never a torn write.
    pub fn rewrite_lines(
        &self,
        project: &str,
        journal: &str,
        lines: &[String],
    ) -> Result<(), StoreError> {
        self.ensure_project(project)?;
        let path = self.project_dir(project).join(journal);
        let tmp = self.project_dir(project).join(format!("{}.tmp", journal));

        let file = File::create(&tmp).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        let mut writer = BufWriter::new(file);
        for line in lines {
            writeln!(writer, "{}", line).map_err(|source| StoreError::Io {
                path: tmp.clone(),
                source,
            })?;
        }
        writer.flush().map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| StoreError::Io { path, source })
    }

    // ── Internals ──

    fn project_dir(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    fn commit_log_path(&self, key: &str) -> PathBuf {
        self.project_dir(key).join(COMMIT_LOG)
    }

    fn ensure_project(&self, key: &str) -> Result<(), StoreError> {
        if self.project_exists(key) {
            Ok(())
        } else {
            Err(StoreError::UnknownProject {
                key: key.to_string(),
            })
        }
    }

    fn lock_for(&self, project: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks
            .entry(project.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Write a blob if it is not already present. Content addressing makes
    /// this idempotent; an interrupted write before the commit line lands is
    /// invisible to readers.
    fn write_blob(&self, project: &str, content: &str) -> Result<String, StoreError> {
        let hash = hasher::hash_str(content);
        let path = self.project_dir(project).join(OBJECTS_DIR).join(&hash);
        if !path.exists() {
            fs::write(&path, content).map_err(|source| StoreError::Io { path, source })?;
        }
        Ok(hash)
    }

    fn read_blob(&self, project: &str, hash: &str) -> Result<String, StoreError> {
        let path = self.project_dir(project).join(OBJECTS_DIR).join(hash);
        fs::read_to_string(&path).map_err(|source| StoreError::Io { path, source })
    }

    fn append_commit_line(&self, project: &str, commit: &Commit) -> Result<(), StoreError> {
        let path = self.commit_log_path(project);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{}", serde_json::to_string(commit)?).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        writer
            .flush()
            .map_err(|source| StoreError::Io { path, source })
    }

    fn read_commits(&self, project: &str) -> Result<Vec<Commit>, StoreError> {
        let path = self.commit_log_path(project);
        let file = File::open(&path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        let reader = BufReader::new(file);
        let mut commits = Vec::new();
        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            if line.trim().is_empty() {
                continue;
            }
            let commit: Commit =
                serde_json::from_str(&line).map_err(|_| StoreError::CorruptCommit {
                    project: project.to_string(),
                    line: line_num + 1,
                })?;
            commits.push(commit);
        }
        Ok(commits)
    }
}
