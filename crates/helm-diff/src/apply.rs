// apply.rs — Change application with context validation.
//
// One handler per change type, matched exhaustively. Update hunks are
// validated against the current content at their stated positions; any
// mismatch is a conflict, not a best-effort fuzz. This is the guard that
// keeps a stale diff from silently clobbering content that changed after
// the diff was produced.

use crate::change::ChangeType;
use crate::error::DiffError;
use crate::patch::{Hunk, HunkLine, Patch};

/// The outcome of applying a change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// The resulting file content.
    Content(String),
    /// The file is deleted; the store records a tombstone.
    Deleted,
}

/// Propose-time structural validation of diff text for a change type.
///
/// This checks shape only; whether the diff still applies against current
/// content is re-checked at apply time.
pub fn validate(change_type: ChangeType, diff_text: &str) -> Result<(), DiffError> {
    match change_type {
        ChangeType::Create => {
            // Either a diff against empty content, or the full new content
            // taken verbatim — only the former needs to parse.
            if looks_like_diff(diff_text) {
                Patch::parse(diff_text)?;
            }
            Ok(())
        }
        ChangeType::Update => {
            let patch = Patch::parse(diff_text)?;
            if patch.is_empty() {
                return Err(DiffError::Malformed {
                    line: 1,
                    reason: "update diff has no hunks".to_string(),
                });
            }
            Ok(())
        }
        ChangeType::Delete => {
            if !diff_text.trim().is_empty() {
                return Err(DiffError::Malformed {
                    line: 1,
                    reason: "delete change must not carry diff content".to_string(),
                });
            }
            Ok(())
        }
    }
}

/// Apply a change to the current content (if any), producing the new state.
///
/// - `Create`: `current` must be absent; the diff text is either the full
///   new content or a unified diff against empty content.
/// - `Update`: `current` must be present; every hunk must match it.
/// - `Delete`: `current` must be present; the result is a tombstone.
pub fn apply(
    change_type: ChangeType,
    current: Option<&str>,
    diff_text: &str,
) -> Result<Applied, DiffError> {
    match change_type {
        ChangeType::Create => {
            if current.is_some() {
                return Err(DiffError::TargetExists);
            }
            let content = if looks_like_diff(diff_text) {
                apply_patch("", &Patch::parse(diff_text)?)?
            } else {
                diff_text.to_string()
            };
            Ok(Applied::Content(content))
        }
        ChangeType::Update => {
            let current = current.ok_or(DiffError::MissingTarget)?;
            let patch = Patch::parse(diff_text)?;
            if patch.is_empty() {
                return Err(DiffError::Malformed {
                    line: 1,
                    reason: "update diff has no hunks".to_string(),
                });
            }
            Ok(Applied::Content(apply_patch(current, &patch)?))
        }
        ChangeType::Delete => {
            if current.is_none() {
                return Err(DiffError::MissingTarget);
            }
            Ok(Applied::Deleted)
        }
    }
}

/// Whether text is diff-shaped rather than verbatim content.
fn looks_like_diff(text: &str) -> bool {
    text.lines()
        .find(|line| !line.trim().is_empty())
        .is_some_and(|line| {
            line.starts_with("--- ") || line.starts_with("@@") || line.starts_with("diff ")
        })
}

/// Apply a parsed patch against current content.
fn apply_patch(current: &str, patch: &Patch) -> Result<String, DiffError> {
    let old_lines: Vec<&str> = current.lines().collect();
    let mut out: Vec<String> = Vec::new();
    let mut cursor = 0usize;

    for (idx, hunk) in patch.hunks.iter().enumerate() {
        let hunk_num = idx + 1;
        let start = hunk_start_index(hunk);

        if start < cursor {
            return Err(DiffError::HunkMismatch {
                hunk: hunk_num,
                line: start + 1,
                reason: "hunks overlap or are out of order".to_string(),
            });
        }
        if start > old_lines.len() {
            return Err(DiffError::HunkMismatch {
                hunk: hunk_num,
                line: start + 1,
                reason: "hunk starts past the end of the file".to_string(),
            });
        }

        out.extend(old_lines[cursor..start].iter().map(|s| s.to_string()));
        let mut pos = start;

        for line in &hunk.lines {
            match line {
                HunkLine::Context(expected) => {
                    check_line(&old_lines, pos, expected, hunk_num, "context")?;
                    out.push(expected.clone());
                    pos += 1;
                }
                HunkLine::Remove(expected) => {
                    check_line(&old_lines, pos, expected, hunk_num, "removed line")?;
                    pos += 1;
                }
                HunkLine::Add(added) => {
                    out.push(added.clone());
                }
            }
        }
        cursor = pos;
    }

    out.extend(old_lines[cursor..].iter().map(|s| s.to_string()));

    let mut result = out.join("\n");
    if !result.is_empty() && !patch.no_trailing_newline {
        result.push('\n');
    }
    Ok(result)
}

/// Where a hunk's old range begins as a 0-based index. A zero-length old
/// range (`-N,0`) inserts after line N, so the index is N itself.
fn hunk_start_index(hunk: &Hunk) -> usize {
    if hunk.old_len == 0 {
        hunk.old_start
    } else {
        hunk.old_start.saturating_sub(1)
    }
}

fn check_line(
    old_lines: &[&str],
    pos: usize,
    expected: &str,
    hunk_num: usize,
    what: &str,
) -> Result<(), DiffError> {
    match old_lines.get(pos) {
        Some(actual) if *actual == expected => Ok(()),
        Some(actual) => Err(DiffError::HunkMismatch {
            hunk: hunk_num,
            line: pos + 1,
            reason: format!("{} mismatch: expected '{}', found '{}'", what, expected, actual),
        }),
        None => Err(DiffError::HunkMismatch {
            hunk: hunk_num,
            line: pos + 1,
            reason: format!("{} extends past the end of the file", what),
        }),
    }
}
