//! Line-scoped text rewriting rules.
//!
//! Every operation scans the buffer's current snapshot once, plans its
//! edits against that snapshot, and applies them as a single batch. The
//! returned flag is `true` when at least one line matched and was edited.
//!
//! Matching is purely textual. "Trimmed" comparisons strip surrounding
//! whitespace from the line; anchor comparisons use the line's full text
//! without its terminator.

use crate::edit::{EditError, Line, SpanEdit, TextBuffer};
use serde::Deserialize;

/// For every line containing `old`, replace only the first occurrence on
/// that line.
pub fn replace_first_occurrence_per_line(
    buffer: &mut TextBuffer,
    old: &str,
    new: &str,
) -> Result<bool, EditError> {
    if old.is_empty() {
        return Ok(false);
    }

    let edits: Vec<SpanEdit> = buffer
        .lines()
        .filter_map(|line| {
            line.text.find(old).map(|idx| {
                let start = line.start + idx;
                SpanEdit::replace(start, start + old.len(), new)
            })
        })
        .collect();

    Ok(buffer.apply_batch(edits)? > 0)
}

/// Remove every line whose trimmed text equals a member of `lines`,
/// terminator included.
pub fn delete_exact_lines<S: AsRef<str>>(
    buffer: &mut TextBuffer,
    lines: &[S],
) -> Result<bool, EditError> {
    delete_where(buffer, |line| {
        let trimmed = line.trimmed();
        lines.iter().any(|candidate| candidate.as_ref() == trimmed)
    })
}

/// Remove every line whose trimmed text starts with any of `prefixes`.
///
/// Empty prefixes are ignored; they would otherwise match every line.
pub fn delete_lines_by_prefix<S: AsRef<str>>(
    buffer: &mut TextBuffer,
    prefixes: &[S],
) -> Result<bool, EditError> {
    delete_where(buffer, |line| {
        let trimmed = line.trimmed();
        prefixes
            .iter()
            .map(AsRef::as_ref)
            .any(|prefix| !prefix.is_empty() && trimmed.starts_with(prefix))
    })
}

fn delete_where<F>(buffer: &mut TextBuffer, mut predicate: F) -> Result<bool, EditError>
where
    F: FnMut(&Line<'_>) -> bool,
{
    let edits: Vec<SpanEdit> = buffer
        .lines()
        .filter(|line| predicate(line))
        .map(|line| SpanEdit::delete(line.start, line.end_including_terminator()))
        .collect();

    Ok(buffer.apply_batch(edits)? > 0)
}

/// Insert `block` immediately after the terminator of every line whose text
/// equals `anchor`.
///
/// An unterminated anchor line (the last line of a buffer without a trailing
/// newline) gets the buffer's line ending before the block.
pub fn insert_after_anchor_line(
    buffer: &mut TextBuffer,
    anchor: &str,
    block: &str,
) -> Result<bool, EditError> {
    if block.is_empty() {
        return Ok(false);
    }

    let line_ending = buffer.line_ending();
    let edits: Vec<SpanEdit> = buffer
        .lines()
        .filter(|line| line.text == anchor)
        .map(|line| {
            if line.has_terminator() {
                SpanEdit::insert(line.end_including_terminator(), block)
            } else {
                SpanEdit::insert(line.end(), format!("{line_ending}{block}"))
            }
        })
        .collect();

    Ok(buffer.apply_batch(edits)? > 0)
}

/// Insert `block` at the start of every line whose text equals `anchor`.
pub fn insert_before_anchor_line(
    buffer: &mut TextBuffer,
    anchor: &str,
    block: &str,
) -> Result<bool, EditError> {
    if block.is_empty() {
        return Ok(false);
    }

    let edits: Vec<SpanEdit> = buffer
        .lines()
        .filter(|line| line.text == anchor)
        .map(|line| SpanEdit::insert(line.start, block))
        .collect();

    Ok(buffer.apply_batch(edits)? > 0)
}

/// A substring replacement applied to the first match on each line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Replacement {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Placement {
    Before,
    #[default]
    After,
}

/// A block inserted next to every line matching `anchor`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Insertion {
    pub anchor: String,
    pub text: String,
    #[serde(default)]
    pub placement: Placement,
}

impl Insertion {
    pub fn apply(&self, buffer: &mut TextBuffer) -> Result<bool, EditError> {
        match self.placement {
            Placement::After => insert_after_anchor_line(buffer, &self.anchor, &self.text),
            Placement::Before => insert_before_anchor_line(buffer, &self.anchor, &self.text),
        }
    }
}

/// The four line-rule kinds bundled together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    pub delete_lines: Vec<String>,
    pub delete_prefixes: Vec<String>,
    pub replacements: Vec<Replacement>,
    pub insertions: Vec<Insertion>,
}

/// Which rules of a [`RuleSet`] fired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformReport {
    pub deleted_exact: bool,
    pub deleted_prefix: bool,
    pub replacements: usize,
    pub insertions: usize,
}

impl TransformReport {
    pub fn changed(&self) -> bool {
        self.deleted_exact || self.deleted_prefix || self.replacements > 0 || self.insertions > 0
    }
}

impl RuleSet {
    pub fn is_empty(&self) -> bool {
        self.delete_lines.is_empty()
            && self.delete_prefixes.is_empty()
            && self.replacements.is_empty()
            && self.insertions.is_empty()
    }

    /// Apply deletes, then replacements, then insertions. Each rule is its
    /// own pass over a fresh snapshot.
    pub fn apply(&self, buffer: &mut TextBuffer) -> Result<TransformReport, EditError> {
        let mut report = TransformReport {
            deleted_exact: delete_exact_lines(buffer, &self.delete_lines)?,
            deleted_prefix: delete_lines_by_prefix(buffer, &self.delete_prefixes)?,
            ..TransformReport::default()
        };

        for replacement in &self.replacements {
            if replace_first_occurrence_per_line(buffer, &replacement.from, &replacement.to)? {
                report.replacements += 1;
            }
        }

        for insertion in &self.insertions {
            if insertion.apply(buffer)? {
                report.insertions += 1;
            }
        }

        Ok(report)
    }
}
