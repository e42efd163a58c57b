// patch.rs — Unified diff parser.
//
// Accepts the standard unified format: optional `---`/`+++` file headers,
// `@@ -a,b +c,d @@` hunk headers, and body lines prefixed with ' ', '-',
// or '+'. `\ No newline at end of file` markers are honored for the final
// line. Line counts in each hunk header are checked against the body, so a
// truncated or hand-mangled diff is rejected at parse time rather than
// producing garbage content.

use crate::error::DiffError;

/// One parsed hunk: a contiguous region of change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    /// 1-based first line of the old range (0 with `old_len == 0` means
    /// "insert before the first line").
    pub old_start: usize,
    pub old_len: usize,
    pub new_start: usize,
    pub new_len: usize,
    pub lines: Vec<HunkLine>,
}

/// One body line of a hunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HunkLine {
    /// Present in both old and new content; must match on apply.
    Context(String),
    /// Removed from the old content; must match on apply.
    Remove(String),
    /// Added to the new content.
    Add(String),
}

/// A parsed unified diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    pub hunks: Vec<Hunk>,
    /// Set when the diff ends with a `\ No newline at end of file` marker on
    /// the new side: the applied result must not end with a newline.
    pub no_trailing_newline: bool,
}

impl Patch {
    /// Parse unified diff text.
    pub fn parse(text: &str) -> Result<Self, DiffError> {
        let mut hunks: Vec<Hunk> = Vec::new();
        let mut no_trailing_newline = false;
        let mut lines = text.lines().enumerate().peekable();

        while let Some((idx, line)) = lines.next() {
            let line_num = idx + 1;

            if line.starts_with("@@") {
                let (old_start, old_len, new_start, new_len) =
                    parse_hunk_header(line, line_num)?;
                if old_len == 0 && new_len == 0 {
                    return Err(DiffError::Malformed {
                        line: line_num,
                        reason: "hunk has no body".to_string(),
                    });
                }

                // Consume exactly the number of body lines the header
                // declares; running out early means the diff is truncated.
                let mut body = Vec::new();
                let mut old_seen = 0;
                let mut new_seen = 0;
                let mut last_was_removal = false;
                while old_seen < old_len || new_seen < new_len {
                    let Some((body_idx, body_line)) = lines.next() else {
                        return Err(DiffError::Malformed {
                            line: line_num,
                            reason: format!(
                                "hunk body ends early: {}/{} old and {}/{} new lines",
                                old_seen, old_len, new_seen, new_len
                            ),
                        });
                    };
                    match body_line.chars().next() {
                        Some(' ') => {
                            body.push(HunkLine::Context(body_line[1..].to_string()));
                            old_seen += 1;
                            new_seen += 1;
                            last_was_removal = false;
                        }
                        Some('-') => {
                            body.push(HunkLine::Remove(body_line[1..].to_string()));
                            old_seen += 1;
                            last_was_removal = true;
                        }
                        Some('+') => {
                            body.push(HunkLine::Add(body_line[1..].to_string()));
                            new_seen += 1;
                            last_was_removal = false;
                        }
                        // Marker for the preceding line. Only the new side
                        // affects the applied result.
                        Some('\\') => {
                            if !last_was_removal {
                                no_trailing_newline = true;
                            }
                        }
                        // Some producers emit a fully empty line for empty
                        // context instead of a single space.
                        None => {
                            body.push(HunkLine::Context(String::new()));
                            old_seen += 1;
                            new_seen += 1;
                            last_was_removal = false;
                        }
                        _ => {
                            return Err(DiffError::Malformed {
                                line: body_idx + 1,
                                reason: format!(
                                    "unexpected line in hunk body: '{}'",
                                    truncate(body_line)
                                ),
                            });
                        }
                    }
                }

                // A marker directly after the hunk flags the final line.
                if let Some((_, peeked)) = lines.peek() {
                    if peeked.starts_with('\\') {
                        if !last_was_removal {
                            no_trailing_newline = true;
                        }
                        lines.next();
                    }
                }

                hunks.push(Hunk {
                    old_start,
                    old_len,
                    new_start,
                    new_len,
                    lines: body,
                });
                continue;
            }

            // Tolerated noise outside hunks: file headers and blank lines.
            let is_preamble = line.is_empty()
                || line.starts_with("--- ")
                || line.starts_with("+++ ")
                || line.starts_with("diff ")
                || line.starts_with("index ");
            if !is_preamble {
                return Err(DiffError::Malformed {
                    line: line_num,
                    reason: format!("expected hunk header, found '{}'", truncate(line)),
                });
            }
        }

        Ok(Self {
            hunks,
            no_trailing_newline,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }
}

/// Parse `@@ -a[,b] +c[,d] @@[ section]`.
fn parse_hunk_header(line: &str, line_num: usize) -> Result<(usize, usize, usize, usize), DiffError> {
    let malformed = |reason: &str| DiffError::Malformed {
        line: line_num,
        reason: reason.to_string(),
    };

    let mut tokens = line.split_whitespace();
    let (opener, old, new) = match (tokens.next(), tokens.next(), tokens.next(), tokens.next()) {
        (Some(opener), Some(old), Some(new), Some("@@")) => (opener, old, new),
        _ => return Err(malformed("hunk header is not '@@ -a,b +c,d @@'")),
    };
    if opener != "@@" {
        return Err(malformed("hunk header is not '@@ -a,b +c,d @@'"));
    }

    let old = old
        .strip_prefix('-')
        .ok_or_else(|| malformed("old range must start with '-'"))?;
    let new = new
        .strip_prefix('+')
        .ok_or_else(|| malformed("new range must start with '+'"))?;

    let (old_start, old_len) =
        parse_range(old).ok_or_else(|| malformed("old range is not numeric"))?;
    let (new_start, new_len) =
        parse_range(new).ok_or_else(|| malformed("new range is not numeric"))?;
    Ok((old_start, old_len, new_start, new_len))
}

/// Parse `a,b` or bare `a` (length defaults to 1).
fn parse_range(s: &str) -> Option<(usize, usize)> {
    match s.split_once(',') {
        Some((start, len)) => Some((start.parse().ok()?, len.parse().ok()?)),
        None => Some((s.parse().ok()?, 1)),
    }
}

fn truncate(line: &str) -> String {
    if line.chars().count() > 40 {
        let head: String = line.chars().take(40).collect();
        format!("{}…", head)
    } else {
        line.to_string()
    }
}
