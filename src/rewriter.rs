//! Applies planned docstring edits back onto the original source text.
//!
//! The original buffer is never mutated: edits carry spans into the original
//! and are applied in descending start order onto a copy, so every span stays
//! valid for the whole pass. Each replace/remove edit carries the text it
//! expects to find; a mismatch means the file changed under us and the whole
//! rewrite is abandoned.

use crate::error::Error;
use crate::types::{Edit, EditResult, Span};
use std::path::Path;

/// Outcome of applying one file's edits.
#[derive(Debug)]
pub struct Applied {
    /// Units whose edits were declined at the confirmation boundary.
    pub declined: Vec<String>,
    /// Unified-style diff of the applied edits; empty when nothing changed.
    pub diff: String,
    /// The rewritten source text.
    pub text: String,
}

/// Decides, per unit, whether a planned edit is applied. Declining drops
/// that one edit; everything else proceeds.
pub trait Confirm {
    /// True to apply the edit, false to drop it.
    fn confirm(&self, edit: &EditResult) -> bool;
}

/// The default confirmation policy: apply every edit.
pub struct ConfirmAll;

impl Confirm for ConfirmAll {
    fn confirm(&self, _edit: &EditResult) -> bool {
        return true;
    }
}

/// Apply `edits` to `original`, returning the rewritten text, a diff of
/// what changed, and the units whose edits were declined. Spans are
/// validated (bounds, overlap, expected text) before a single byte moves;
/// any mismatch is a `RewriteConflict` and `original` is left untouched.
pub fn apply(
    file: &Path,
    original: &str,
    mut edits: Vec<EditResult>,
    confirm: &dyn Confirm,
) -> Result<Applied, Error> {
    edits.sort_by(|a, b| return b.edit.start().cmp(&a.edit.start()));

    let mut floor = usize::MAX;
    for item in &edits {
        let occupied = match &item.edit {
            Edit::Insert { at, .. } => *at..*at,
            Edit::Remove { span, .. } | Edit::Replace { span, .. } => span.clone(),
        };
        if occupied.start > occupied.end || occupied.end > original.len() {
            return Err(conflict(file, &item.unit, "edit span is out of bounds"));
        }
        if occupied.end > floor {
            return Err(conflict(file, &item.unit, "edit spans overlap"));
        }
        floor = occupied.start;
        if let Edit::Remove { expected, span } | Edit::Replace { expected, span, .. } = &item.edit {
            match original.get(span.clone()) {
                Some(actual) if actual == expected => {}
                Some(_) => {
                    return Err(conflict(file, &item.unit, "text at the edit span has changed"));
                }
                None => {
                    return Err(conflict(file, &item.unit, "edit span is not a character boundary"));
                }
            }
        }
        if let Edit::Insert { at, .. } = &item.edit {
            if !original.is_char_boundary(*at) {
                return Err(conflict(file, &item.unit, "insertion point is not a character boundary"));
            }
        }
    }

    let mut text = original.to_string();
    let mut applied: Vec<&EditResult> = Vec::new();
    let mut declined: Vec<String> = Vec::new();
    for item in &edits {
        if !confirm.confirm(item) {
            declined.push(item.unit.clone());
            continue;
        }
        match &item.edit {
            Edit::Insert { at, text: insertion } => text.insert_str(*at, insertion),
            Edit::Remove { span, .. } => text.replace_range(span.clone(), ""),
            Edit::Replace { span, text: replacement, .. } => {
                text.replace_range(span.clone(), replacement);
            }
        }
        applied.push(item);
    }

    let diff = render_diff(original, &applied);
    return Ok(Applied {
        declined,
        diff,
        text,
    });
}

/// Build a `RewriteConflict` for one unit's edit.
fn conflict(file: &Path, unit: &str, what: &str) -> Error {
    return Error::RewriteConflict {
        file: file.to_path_buf(),
        reason: format!("unit `{unit}`: {what}"),
    };
}

/// The line-expanded region an edit touches, as (bounds, old text, new
/// text), for one diff hunk.
fn hunk_regions(original: &str, span: &Span, replacement: &str) -> (Span, String, String) {
    let bounds = line_bounds(original, span);
    let old_region = original.get(bounds.clone()).unwrap_or("").to_string();
    let head = original.get(bounds.start..span.start).unwrap_or("");
    let tail = original.get(span.end..bounds.end).unwrap_or("");
    let new_region = format!("{head}{replacement}{tail}");
    return (bounds, old_region, new_region);
}

/// Expand a byte range to whole lines: back to the previous line start,
/// forward past the next newline.
fn line_bounds(text: &str, range: &Span) -> Span {
    let start = text.get(..range.start).map_or(0, |head| {
        return head.rfind('\n').map_or(0, |i| return i.saturating_add(1));
    });
    let end = text.get(range.end..).map_or(text.len(), |tail| {
        return tail
            .find('\n')
            .map_or(text.len(), |i| return range.end.saturating_add(i).saturating_add(1));
    });
    return start..end;
}

/// 1-based line number of a byte offset.
fn line_number(text: &str, offset: usize) -> usize {
    let breaks = text.get(..offset).map_or(0, |head| return head.matches('\n').count());
    return breaks.saturating_add(1);
}

/// Render a unified-style diff from the applied edits. Every hunk is a
/// known span, so no generic diff algorithm is involved: the hunk's old
/// side is the affected original lines and its new side is those lines
/// with the edit spliced in.
fn render_diff(original: &str, applied: &[&EditResult]) -> String {
    if applied.is_empty() {
        return String::new();
    }
    let mut out = String::new();
    let mut added: usize = 0;
    let mut removed: usize = 0;
    for item in applied.iter().rev() {
        let (bounds, old_region, new_region) = match &item.edit {
            Edit::Insert { at, text } => (*at..*at, String::new(), text.clone()),
            Edit::Remove { span, .. } => hunk_regions(original, span, ""),
            Edit::Replace { span, text, .. } => hunk_regions(original, span, text),
        };
        let old_count = old_region.lines().count();
        let new_count = new_region.lines().count();
        let old_line = line_number(original, bounds.start);
        let old_header = if old_count == 0 {
            old_line.saturating_sub(1)
        } else {
            old_line
        };
        let new_line = old_line.saturating_add(added).saturating_sub(removed);
        let new_header = if new_count == 0 {
            new_line.saturating_sub(1)
        } else {
            new_line
        };
        out.push_str(&format!(
            "@@ -{old_header},{old_count} +{new_header},{new_count} @@ {}\n",
            item.unit
        ));
        for line in old_region.lines() {
            out.push_str(&format!("-{line}\n"));
        }
        for line in new_region.lines() {
            out.push_str(&format!("+{line}\n"));
        }
        added = added.saturating_add(new_count);
        removed = removed.saturating_add(old_count);
    }
    return out;
}

/// Render the full inserted line(s) for a created docstring: the body
/// indent, the literal, and a trailing newline.
pub fn render_insert(text: &str, indent: &str) -> String {
    return format!("{indent}{}\n", render_literal(text, indent));
}

/// Render docstring text as a triple-quoted literal. Single-line text
/// stays on one line; multi-line text is re-indented to the body indent
/// with the closing delimiter on its own line.
pub fn render_literal(text: &str, indent: &str) -> String {
    if !text.contains('\n') {
        return format!("\"\"\"{text}\"\"\"");
    }
    let mut literal = String::from("\"\"\"");
    for (i, line) in text.lines().enumerate() {
        if i > 0 {
            literal.push('\n');
            if !line.is_empty() {
                literal.push_str(indent);
            }
        }
        literal.push_str(line);
    }
    literal.push('\n');
    literal.push_str(indent);
    literal.push_str("\"\"\"");
    return literal;
}

/// Widen a docstring literal's span to what a strip removes: when the
/// literal owns its line(s), the whole lines go, plus one following blank
/// line; when other tokens share the final line, only the literal goes.
pub fn strip_span(original: &str, docstring: &Span) -> Span {
    let line_start = original.get(..docstring.start).map_or(docstring.start, |head| {
        return head.rfind('\n').map_or(0, |i| return i.saturating_add(1));
    });
    let prefix = original.get(line_start..docstring.start).unwrap_or("");
    let rest = original.get(docstring.end..).unwrap_or("");
    let (tail_on_line, after_line) = match rest.find('\n') {
        Some(i) => (
            rest.get(..i).unwrap_or(""),
            rest.get(i.saturating_add(1)..).unwrap_or(""),
        ),
        None => (rest, ""),
    };

    let owns_line = prefix.chars().all(char::is_whitespace)
        && tail_on_line.chars().all(char::is_whitespace);
    if !owns_line {
        return docstring.clone();
    }

    let mut end = match rest.find('\n') {
        Some(i) => docstring.end.saturating_add(i).saturating_add(1),
        None => original.len(),
    };
    if let Some(next_break) = after_line.find('\n') {
        let next_line = after_line.get(..next_break).unwrap_or("x");
        if next_line.trim().is_empty() {
            end = end.saturating_add(next_break).saturating_add(1);
        }
    }
    return line_start..end;
}

#[cfg(test)]
mod tests {
    use super::{apply, render_insert, render_literal, strip_span, Confirm, ConfirmAll};
    use crate::error::Error;
    use crate::types::{Edit, EditResult};
    use std::path::Path;

    struct DeclineAll;

    impl Confirm for DeclineAll {
        fn confirm(&self, _edit: &EditResult) -> bool {
            return false;
        }
    }

    fn file() -> &'static Path {
        return Path::new("sample.py");
    }

    #[test]
    fn no_edits_reproduce_the_original() {
        let original = "def foo():\n    pass\n";
        let applied = apply(file(), original, Vec::new(), &ConfirmAll).unwrap();
        assert_eq!(applied.text, original);
        assert!(applied.diff.is_empty());
        assert!(applied.declined.is_empty());
    }

    #[test]
    fn create_inserts_a_canonical_one_liner() {
        let original = "def foo():\n    pass\n";
        let edits = vec![EditResult {
            edit: Edit::Insert {
                at: 11,
                text: render_insert("Does nothing.", "    "),
            },
            unit: "foo".to_string(),
        }];
        let applied = apply(file(), original, edits, &ConfirmAll).unwrap();
        assert_eq!(applied.text, "def foo():\n    \"\"\"Does nothing.\"\"\"\n    pass\n");
    }

    #[test]
    fn multi_line_literal_closes_on_its_own_line() {
        let literal = render_literal("First line.\n\nMore detail.", "    ");
        assert_eq!(
            literal,
            "\"\"\"First line.\n\n    More detail.\n    \"\"\""
        );
    }

    #[test]
    fn replace_swaps_only_the_literal() {
        let original = "def foo():\n    \"\"\"Old.\"\"\"\n    pass\n";
        let span = 15..25;
        assert_eq!(original.get(span.clone()).unwrap(), "\"\"\"Old.\"\"\"");
        let edits = vec![EditResult {
            edit: Edit::Replace {
                expected: "\"\"\"Old.\"\"\"".to_string(),
                span,
                text: render_literal("New.", "    "),
            },
            unit: "foo".to_string(),
        }];
        let applied = apply(file(), original, edits, &ConfirmAll).unwrap();
        assert_eq!(applied.text, "def foo():\n    \"\"\"New.\"\"\"\n    pass\n");
    }

    #[test]
    fn bytes_outside_the_spans_are_preserved() {
        let original = "# header\ndef foo():\n    \"\"\"Old.\"\"\"\n    pass\n# footer\n";
        let span = 24..34;
        assert_eq!(original.get(span.clone()).unwrap(), "\"\"\"Old.\"\"\"");
        let edits = vec![EditResult {
            edit: Edit::Replace {
                expected: "\"\"\"Old.\"\"\"".to_string(),
                span: span.clone(),
                text: "\"\"\"New and longer.\"\"\"".to_string(),
            },
            unit: "foo".to_string(),
        }];
        let applied = apply(file(), original, edits, &ConfirmAll).unwrap();
        assert!(applied.text.starts_with("# header\ndef foo():\n    "));
        assert!(applied.text.ends_with("\n    pass\n# footer\n"));
    }

    #[test]
    fn changed_text_is_a_rewrite_conflict() {
        let original = "def foo():\n    \"\"\"Old.\"\"\"\n    pass\n";
        let edits = vec![EditResult {
            edit: Edit::Remove {
                expected: "\"\"\"Different.\"\"\"".to_string(),
                span: 15..25,
            },
            unit: "foo".to_string(),
        }];
        let err = apply(file(), original, edits, &ConfirmAll).unwrap_err();
        assert!(matches!(err, Error::RewriteConflict { .. }));
    }

    #[test]
    fn out_of_bounds_span_is_a_rewrite_conflict() {
        let original = "def foo():\n    pass\n";
        let edits = vec![EditResult {
            edit: Edit::Remove {
                expected: String::new(),
                span: 10..999,
            },
            unit: "foo".to_string(),
        }];
        let err = apply(file(), original, edits, &ConfirmAll).unwrap_err();
        assert!(matches!(err, Error::RewriteConflict { .. }));
    }

    #[test]
    fn overlapping_edits_are_a_rewrite_conflict() {
        let original = "def foo():\n    \"\"\"Old.\"\"\"\n    pass\n";
        let edits = vec![
            EditResult {
                edit: Edit::Remove {
                    expected: "\"\"\"Old.\"\"\"".to_string(),
                    span: 15..25,
                },
                unit: "foo".to_string(),
            },
            EditResult {
                edit: Edit::Remove {
                    expected: "\"Old.\"\"\"\n".to_string(),
                    span: 17..26,
                },
                unit: "foo".to_string(),
            },
        ];
        let err = apply(file(), original, edits, &ConfirmAll).unwrap_err();
        assert!(matches!(err, Error::RewriteConflict { .. }));
    }

    #[test]
    fn declined_edit_leaves_the_text_alone() {
        let original = "def foo():\n    \"\"\"Old.\"\"\"\n    pass\n";
        let edits = vec![EditResult {
            edit: Edit::Remove {
                expected: "\"\"\"Old.\"\"\"".to_string(),
                span: 15..25,
            },
            unit: "foo".to_string(),
        }];
        let applied = apply(file(), original, edits, &DeclineAll).unwrap();
        assert_eq!(applied.text, original);
        assert_eq!(applied.declined, vec!["foo".to_string()]);
        assert!(applied.diff.is_empty());
    }

    #[test]
    fn strip_takes_the_whole_line_when_the_literal_owns_it() {
        let original = "def foo():\n    \"\"\"Doc.\"\"\"\n    pass\n";
        let span = strip_span(original, &(15..25));
        assert_eq!(original.get(span).unwrap(), "    \"\"\"Doc.\"\"\"\n");
    }

    #[test]
    fn strip_takes_one_following_blank_line() {
        let original = "def foo():\n    \"\"\"Doc.\"\"\"\n\n    pass\n";
        let span = strip_span(original, &(15..25));
        assert_eq!(original.get(span).unwrap(), "    \"\"\"Doc.\"\"\"\n\n");
    }

    #[test]
    fn strip_leaves_a_shared_line_intact() {
        let original = "def foo():\n    \"\"\"Doc.\"\"\"  # note\n    pass\n";
        let span = strip_span(original, &(15..25));
        assert_eq!(span, 15..25);
    }

    #[test]
    fn strip_at_end_of_file_without_newline() {
        let original = "def foo():\n    pass\n    \"\"\"tail\"\"\"";
        let span = strip_span(original, &(24..34));
        assert_eq!(original.get(span).unwrap(), "    \"\"\"tail\"\"\"");
    }

    #[test]
    fn diff_shows_removed_and_added_lines() {
        let original = "def foo():\n    pass\n";
        let edits = vec![EditResult {
            edit: Edit::Insert {
                at: 11,
                text: render_insert("Does nothing.", "    "),
            },
            unit: "foo".to_string(),
        }];
        let applied = apply(file(), original, edits, &ConfirmAll).unwrap();
        assert!(applied.diff.contains("@@"));
        assert!(applied.diff.contains("+    \"\"\"Does nothing.\"\"\""));
    }

    #[test]
    fn edits_apply_in_descending_order_regardless_of_input_order() {
        let original = "def a():\n    pass\n\ndef b():\n    pass\n";
        let edits = vec![
            EditResult {
                edit: Edit::Insert {
                    at: 9,
                    text: render_insert("First.", "    "),
                },
                unit: "a".to_string(),
            },
            EditResult {
                edit: Edit::Insert {
                    at: 28,
                    text: render_insert("Second.", "    "),
                },
                unit: "b".to_string(),
            },
        ];
        let applied = apply(file(), original, edits, &ConfirmAll).unwrap();
        assert_eq!(
            applied.text,
            "def a():\n    \"\"\"First.\"\"\"\n    pass\n\ndef b():\n    \"\"\"Second.\"\"\"\n    pass\n"
        );
    }
}
