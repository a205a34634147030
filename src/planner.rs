//! The action decision table: a pure mapping from requested modes, docstring
//! state, and validation outcome to what happens to one unit.

use crate::types::{Action, DocstringSlot, DocstringState, Modes, Verdict};

/// A planned action with its explanation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// The action to take.
    pub action: Action,
    /// Why this action was chosen.
    pub reason: String,
}

/// Decide what to do with one unit. No I/O, no oracle calls.
///
/// Rules, in priority order: strip wins only when requested alone and the
/// docstring is present and (when validating) did not pass; create never
/// overwrites; update never creates; when create and update are both
/// requested, the unit's state picks the rule; an `Unknown` outcome gates
/// like a failed validation, so unverifiable content is re-generated or
/// removed rather than silently trusted. Contradictory mode sets reaching
/// this function resolve to skip. Plans that cannot be applied without
/// breaking the body (a one-liner signature, a docstring that is the only
/// statement) resolve to skip with an explicit reason.
pub fn decide(
    modes: Modes,
    state: DocstringState,
    outcome: Option<&Verdict>,
    slot: &DocstringSlot,
) -> Decision {
    if modes.strip && (modes.create || modes.update) {
        return decision(Action::Skip, "conflicting modes requested, nothing done");
    }

    if modes.strip {
        if state == DocstringState::Absent {
            return decision(Action::Skip, "no docstring to strip");
        }
        if modes.validate && outcome.is_some_and(|v| return v.passed()) {
            return decision(Action::Skip, "docstring validated, keeping it");
        }
        if slot.sole_statement {
            return decision(Action::Skip, "docstring is the body's only statement");
        }
        if modes.validate {
            return decision(Action::Strip, "docstring failed validation");
        }
        return decision(Action::Strip, "strip requested");
    }

    if modes.create && state == DocstringState::Absent {
        if slot.body_on_signature_line {
            return decision(Action::Skip, "body shares the signature line");
        }
        return decision(Action::Create, "no docstring present");
    }

    if modes.create && state == DocstringState::Present && !modes.update {
        return decision(Action::Skip, "already documented, -c without -u");
    }

    if modes.update {
        if state == DocstringState::Absent {
            return decision(Action::Skip, "nothing to update, -u never creates");
        }
        if modes.validate && outcome.is_some_and(|v| return v.passed()) {
            return decision(Action::Skip, "docstring validated, keeping it");
        }
        if modes.validate {
            return decision(Action::Update, "docstring failed validation");
        }
        return decision(Action::Update, "update requested");
    }

    if modes.validate {
        return decision(Action::ValidateOnly, "validation requested, no edit modes");
    }

    return decision(Action::Skip, "no modes requested");
}

/// Build a decision from an action and a static reason.
fn decision(action: Action, reason: &str) -> Decision {
    return Decision {
        action,
        reason: reason.to_string(),
    };
}
