//! Hidden `<!-- ghp-branch: name -->` marker linking an issue to a git branch.

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::{Match, Regex};
use tracing::debug;

static MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<!--[ \t]*ghp-branch:[ \t]*(.+?)[ \t]*-->").expect("valid branch marker regex")
});

pub fn format_marker(branch: &str) -> String {
    format!("<!-- ghp-branch: {} -->", branch.trim())
}

/// Branch recorded in `body`, if any.
pub fn parse_branch_link(body: &str) -> Option<String> {
    MARKER_RE
        .captures(body)
        .map(|caps| caps[1].trim().to_string())
        .filter(|b| !b.is_empty())
}

/// Records `branch` in `body`, replacing an existing marker where it stands or
/// appending one after a blank line. Stray extra markers are dropped so that
/// exactly one remains.
pub fn set_branch_link(body: &str, branch: &str) -> String {
    let marker = format_marker(branch);

    if !MARKER_RE.is_match(body) {
        debug!(branch, "appending branch marker");
        let trimmed = body.trim();
        return if trimmed.is_empty() {
            marker
        } else {
            format!("{trimmed}\n\n{marker}")
        };
    }

    debug!(branch, "replacing branch marker in place");
    rewrite_markers(body, Some(&marker))
}

/// Span to cut for a marker: its whole line (with the line break) when
/// nothing but whitespace shares the line, otherwise just the marker.
fn removal_span(body: &str, m: &Match<'_>) -> Range<usize> {
    let line_start = body[..m.start()].rfind('\n').map_or(0, |i| i + 1);
    let line_end = body[m.end()..]
        .find('\n')
        .map_or(body.len(), |i| m.end() + i);

    let alone = body[line_start..m.start()].trim().is_empty()
        && body[m.end()..line_end].trim().is_empty();
    if !alone {
        return m.range();
    }
    // Take the line break along with the line.
    line_start..(line_end + 1).min(body.len())
}

/// Replaces the first marker with `replacement` and removes the others.
/// With no replacement every marker is removed.
fn rewrite_markers(body: &str, mut replacement: Option<&str>) -> String {
    let mut out = String::with_capacity(body.len());
    let mut last = 0;

    for m in MARKER_RE.find_iter(body) {
        match replacement.take() {
            Some(marker) => {
                out.push_str(&body[last..m.start()]);
                out.push_str(marker);
                last = m.end();
            }
            None => {
                let span = removal_span(body, &m);
                let start = span.start.max(last);
                out.push_str(&body[last..start]);
                last = span.end.max(last);
            }
        }
    }
    out.push_str(&body[last..]);
    out
}

/// Strips the marker and trims the result. Everything else is kept.
pub fn remove_branch_link(body: &str) -> String {
    rewrite_markers(body, None).trim().to_string()
}
