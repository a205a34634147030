//! The per-file pipeline: parse the unit tree, resolve filters, classify
//! docstring state, plan actions, drive the oracle, and rewrite the source.
//!
//! Everything here is sequential and deterministic. The oracle is the only
//! collaborator that can block or fail transiently; its calls run under the
//! attempts budget and a failed budget never aborts the run: the affected
//! unit is reported and skipped. Only an unreadable or unparsable file, a
//! rewrite conflict, or a missing model stops a file.

use crate::error::{Error, OracleError};
use crate::grammar;
use crate::oracle::{call_with_attempts, Oracle};
use crate::planner;
use crate::rewriter::{self, Confirm};
use crate::selector;
use crate::types::{
    Action, DocstringSlot, DocstringState, Edit, EditResult, FileOutcome, Modes, SourceUnit,
    Verdict,
};
use crate::units;
use std::path::Path;
use tracing::{debug, info, warn};

/// Knobs for one engine run, shared by every file in it.
#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    /// Retry budget for each oracle call.
    pub attempts: u32,
    /// Maximum unit nesting depth to process.
    pub depth: u32,
    /// The requested docstring operations.
    pub modes: Modes,
}

/// Run the whole pipeline for one file's source text. Returns the rewritten
/// text together with per-unit reports and filter warnings; the caller
/// decides whether to print, diff, or persist it.
pub fn document_file(
    path: &Path,
    source: &str,
    filters: &[String],
    options: &EngineOptions,
    oracle: &dyn Oracle,
    confirm: &dyn Confirm,
) -> Result<FileOutcome, Error> {
    let language = grammar::language_for_path(path)?;
    let root = units::build_tree(path, source, &language)?;
    let selection = selector::select(&root, filters, options.depth);
    for warning in &selection.warnings {
        warn!("{warning}");
    }

    let mut edits: Vec<EditResult> = Vec::new();
    let mut failed_validations: u32 = 0;
    let mut reports: Vec<String> = Vec::new();

    for unit in &selection.units {
        info!("Examining {}: {}", unit.kind.label(), unit.qualified_path());
        let Some(slot) = unit.slot.as_ref() else {
            continue;
        };
        let state = if slot.docstring.is_some() {
            DocstringState::Present
        } else {
            DocstringState::Absent
        };
        let code = units::unit_source(unit, source);

        let outcome = if options.modes.validate && state == DocstringState::Present {
            let verdict = validate_unit(slot, code, source, options.attempts, oracle)?;
            if !verdict.passed() {
                failed_validations = failed_validations.saturating_add(1);
            }
            reports.push(format!(
                "Validation report for {}: {}: {}",
                unit.name,
                if verdict.passed() { "PASS" } else { "FAILED" },
                verdict.assessment()
            ));
            Some(verdict)
        } else {
            None
        };

        let decision = planner::decide(options.modes, state, outcome.as_ref(), slot);
        let (action_taken, edit) =
            execute(&decision, unit, slot, code, source, options.attempts, oracle)?;
        if let Some(edit) = edit {
            edits.push(edit);
        }
        reports.push(format!("{}: {action_taken}", unit.name));
    }

    let applied = rewriter::apply(path, source, edits, confirm)?;
    for declined in &applied.declined {
        reports.push(format!("{declined}: edit declined, leaving as-is"));
    }
    let modified = applied.text != source;
    let diff = if applied.diff.is_empty() {
        None
    } else {
        Some(applied.diff)
    };
    return Ok(FileOutcome {
        diff,
        failed_validations,
        modified,
        reports,
        text: applied.text,
        warnings: selection.warnings,
    });
}

/// Turn one decision into a report phrase and, for the edit actions, a
/// pending edit. Generation failures downgrade to a reported no-op.
fn execute(
    decision: &planner::Decision,
    unit: &SourceUnit,
    slot: &DocstringSlot,
    code: &str,
    source: &str,
    attempts: u32,
    oracle: &dyn Oracle,
) -> Result<(String, Option<EditResult>), Error> {
    match decision.action {
        Action::Create => {
            info!("Creating a new docstring");
            match generate_text(code, None, attempts, oracle)? {
                Some(text) => {
                    debug!("new docstring: {text}");
                    let edit = EditResult {
                        edit: Edit::Insert {
                            at: slot.insert_at,
                            text: rewriter::render_insert(&text, &slot.indent),
                        },
                        unit: unit.qualified_path(),
                    };
                    return Ok(("created a new docstring".to_string(), Some(edit)));
                }
                None => {
                    return Ok((
                        "failed to create new docstring, leaving as-is".to_string(),
                        None,
                    ));
                }
            }
        }
        Action::Skip => {
            debug!("skipping {}: {}", unit.qualified_path(), decision.reason);
            return Ok(("did nothing".to_string(), None));
        }
        Action::Strip => {
            info!("Stripping existing docstring");
            let Some(span) = slot.docstring.clone() else {
                return Ok(("did nothing".to_string(), None));
            };
            let removal = rewriter::strip_span(source, &span);
            let expected = source.get(removal.clone()).unwrap_or("").to_string();
            let edit = EditResult {
                edit: Edit::Remove {
                    expected,
                    span: removal,
                },
                unit: unit.qualified_path(),
            };
            return Ok(("stripped existing docstring".to_string(), Some(edit)));
        }
        Action::Update => {
            info!("Replacing existing docstring");
            let Some(span) = slot.docstring.clone() else {
                return Ok(("did nothing".to_string(), None));
            };
            let expected = source.get(span.clone()).unwrap_or("").to_string();
            match generate_text(code, Some(&expected), attempts, oracle)? {
                Some(text) => {
                    debug!("new docstring: {text}");
                    let edit = EditResult {
                        edit: Edit::Replace {
                            expected,
                            span,
                            text: rewriter::render_literal(&text, &slot.indent),
                        },
                        unit: unit.qualified_path(),
                    };
                    return Ok(("updated existing docstring".to_string(), Some(edit)));
                }
                None => {
                    return Ok((
                        "failed to update existing docstring, leaving as-is".to_string(),
                        None,
                    ));
                }
            }
        }
        Action::ValidateOnly => return Ok(("did nothing".to_string(), None)),
    }
}

/// Generate docstring text within the attempts budget. `None` means the
/// budget ran out. A missing model is fatal to the run; retrying or moving
/// to the next unit cannot fix it.
fn generate_text(
    code: &str,
    prior: Option<&str>,
    attempts: u32,
    oracle: &dyn Oracle,
) -> Result<Option<String>, Error> {
    match call_with_attempts(attempts, || return oracle.generate(code, prior)) {
        Ok(text) => return Ok(Some(text)),
        Err(OracleError::ModelNotInstalled { model }) => {
            return Err(Error::Oracle(OracleError::ModelNotInstalled { model }));
        }
        Err(err) => {
            debug!("generation failed: {err}");
            return Ok(None);
        }
    }
}

/// Consult the oracle about one existing docstring. An exhausted budget
/// becomes an `Unknown` verdict rather than an error; a missing model is
/// fatal to the run.
fn validate_unit(
    slot: &DocstringSlot,
    code: &str,
    source: &str,
    attempts: u32,
    oracle: &dyn Oracle,
) -> Result<Verdict, Error> {
    info!("Validating existing docstring");
    let literal = slot
        .docstring
        .clone()
        .and_then(|span| return source.get(span))
        .unwrap_or("");
    match call_with_attempts(attempts, || return oracle.validate(code, literal)) {
        Ok(verdict) => return Ok(verdict),
        Err(OracleError::ModelNotInstalled { model }) => {
            return Err(Error::Oracle(OracleError::ModelNotInstalled { model }));
        }
        Err(err) => {
            return Ok(Verdict::Unknown {
                reason: err.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{document_file, EngineOptions};
    use crate::error::{Error, OracleError};
    use crate::oracle::Oracle;
    use crate::rewriter::ConfirmAll;
    use crate::types::{Modes, Verdict};
    use std::cell::Cell;
    use std::path::Path;

    struct ScriptedOracle<G, V>
    where
        G: Fn() -> Result<String, OracleError>,
        V: Fn() -> Result<Verdict, OracleError>,
    {
        generate_calls: Cell<u32>,
        generate_reply: G,
        validate_calls: Cell<u32>,
        validate_reply: V,
    }

    impl<G, V> Oracle for ScriptedOracle<G, V>
    where
        G: Fn() -> Result<String, OracleError>,
        V: Fn() -> Result<Verdict, OracleError>,
    {
        fn generate(
            &self,
            _unit_source: &str,
            _prior: Option<&str>,
        ) -> Result<String, OracleError> {
            self.generate_calls.set(self.generate_calls.get() + 1);
            return (self.generate_reply)();
        }

        fn validate(&self, _unit_source: &str, _docstring: &str) -> Result<Verdict, OracleError> {
            self.validate_calls.set(self.validate_calls.get() + 1);
            return (self.validate_reply)();
        }
    }

    fn scripted<G, V>(generate_reply: G, validate_reply: V) -> ScriptedOracle<G, V>
    where
        G: Fn() -> Result<String, OracleError>,
        V: Fn() -> Result<Verdict, OracleError>,
    {
        return ScriptedOracle {
            generate_calls: Cell::new(0),
            generate_reply,
            validate_calls: Cell::new(0),
            validate_reply,
        };
    }

    fn options(modes: Modes) -> EngineOptions {
        return EngineOptions {
            attempts: 3,
            depth: 1,
            modes,
        };
    }

    fn valid() -> Result<Verdict, OracleError> {
        return Ok(Verdict::Valid {
            assessment: "correct".to_string(),
        });
    }

    #[test]
    fn create_adds_a_docstring_where_none_exists() {
        let source = "def foo():\n    pass\n";
        let oracle = scripted(|| return Ok("Does nothing.".to_string()), valid);
        let modes = Modes {
            create: true,
            ..Modes::default()
        };
        let outcome = document_file(
            Path::new("sample.py"),
            source,
            &[],
            &options(modes),
            &oracle,
            &ConfirmAll,
        )
        .unwrap();
        assert_eq!(outcome.text, "def foo():\n    \"\"\"Does nothing.\"\"\"\n    pass\n");
        assert!(outcome.modified);
        assert!(outcome.reports.contains(&"foo: created a new docstring".to_string()));
        assert_eq!(oracle.validate_calls.get(), 0);
    }

    #[test]
    fn create_skips_a_unit_that_is_already_documented() {
        let source = "def foo():\n    \"\"\"Does nothing.\"\"\"\n    pass\n";
        let oracle = scripted(|| return Ok("unused".to_string()), valid);
        let modes = Modes {
            create: true,
            ..Modes::default()
        };
        let outcome = document_file(
            Path::new("sample.py"),
            source,
            &[],
            &options(modes),
            &oracle,
            &ConfirmAll,
        )
        .unwrap();
        assert_eq!(outcome.text, source);
        assert!(!outcome.modified);
        assert!(outcome.reports.contains(&"foo: did nothing".to_string()));
        assert_eq!(oracle.generate_calls.get(), 0);
    }

    #[test]
    fn no_modes_reproduce_the_original_text() {
        let source = "def foo():\n    \"\"\"Doc.\"\"\"\n    pass\n\ndef bar():\n    pass\n";
        let oracle = scripted(|| return Ok("unused".to_string()), valid);
        let outcome = document_file(
            Path::new("sample.py"),
            source,
            &[],
            &options(Modes::default()),
            &oracle,
            &ConfirmAll,
        )
        .unwrap();
        assert_eq!(outcome.text, source);
        assert!(!outcome.modified);
        assert_eq!(oracle.generate_calls.get(), 0);
        assert_eq!(oracle.validate_calls.get(), 0);
    }

    #[test]
    fn update_keeps_a_docstring_that_validates() {
        let source = "def foo():\n    \"\"\"Old.\"\"\"\n    pass\n";
        let oracle = scripted(|| return Ok("unused".to_string()), valid);
        let modes = Modes {
            update: true,
            validate: true,
            ..Modes::default()
        };
        let outcome = document_file(
            Path::new("sample.py"),
            source,
            &[],
            &options(modes),
            &oracle,
            &ConfirmAll,
        )
        .unwrap();
        assert_eq!(outcome.text, source);
        assert!(outcome
            .reports
            .contains(&"Validation report for foo: PASS: correct".to_string()));
        assert_eq!(outcome.failed_validations, 0);
        assert_eq!(oracle.generate_calls.get(), 0);
    }

    #[test]
    fn update_replaces_a_docstring_that_fails_validation() {
        let source = "def foo():\n    \"\"\"Old.\"\"\"\n    pass\n";
        let oracle = scripted(
            || return Ok("Accurate now.".to_string()),
            || {
                return Ok(Verdict::Invalid {
                    assessment: "the docstring lies".to_string(),
                });
            },
        );
        let modes = Modes {
            update: true,
            validate: true,
            ..Modes::default()
        };
        let outcome = document_file(
            Path::new("sample.py"),
            source,
            &[],
            &options(modes),
            &oracle,
            &ConfirmAll,
        )
        .unwrap();
        assert_eq!(outcome.text, "def foo():\n    \"\"\"Accurate now.\"\"\"\n    pass\n");
        assert!(outcome
            .reports
            .contains(&"Validation report for foo: FAILED: the docstring lies".to_string()));
        assert!(outcome.reports.contains(&"foo: updated existing docstring".to_string()));
        assert_eq!(outcome.failed_validations, 1);
    }

    #[test]
    fn strip_removes_the_docstring_line() {
        let source = "def foo():\n    \"\"\"Old.\"\"\"\n    pass\n";
        let oracle = scripted(|| return Ok("unused".to_string()), valid);
        let modes = Modes {
            strip: true,
            ..Modes::default()
        };
        let outcome = document_file(
            Path::new("sample.py"),
            source,
            &[],
            &options(modes),
            &oracle,
            &ConfirmAll,
        )
        .unwrap();
        assert_eq!(outcome.text, "def foo():\n    pass\n");
        assert!(outcome.reports.contains(&"foo: stripped existing docstring".to_string()));
        assert_eq!(oracle.validate_calls.get(), 0);
    }

    #[test]
    fn strip_then_create_composes_to_create() {
        let documented = "def foo():\n    \"\"\"Stale.\"\"\"\n    pass\n";
        let oracle = scripted(|| return Ok("Does nothing.".to_string()), valid);
        let strip = Modes {
            strip: true,
            ..Modes::default()
        };
        let stripped = document_file(
            Path::new("sample.py"),
            documented,
            &[],
            &options(strip),
            &oracle,
            &ConfirmAll,
        )
        .unwrap();
        assert_eq!(stripped.text, "def foo():\n    pass\n");

        let create = Modes {
            create: true,
            ..Modes::default()
        };
        let created = document_file(
            Path::new("sample.py"),
            &stripped.text,
            &[],
            &options(create),
            &oracle,
            &ConfirmAll,
        )
        .unwrap();
        assert_eq!(created.text, "def foo():\n    \"\"\"Does nothing.\"\"\"\n    pass\n");
    }

    #[test]
    fn unreachable_oracle_gates_strip_like_a_failed_validation() {
        let source = "def foo():\n    \"\"\"Old.\"\"\"\n    pass\n";
        let oracle = scripted(
            || return Ok("unused".to_string()),
            || {
                return Err(OracleError::MalformedReply {
                    reason: "server down".to_string(),
                });
            },
        );
        let modes = Modes {
            strip: true,
            validate: true,
            ..Modes::default()
        };
        let outcome = document_file(
            Path::new("sample.py"),
            source,
            &[],
            &options(modes),
            &oracle,
            &ConfirmAll,
        )
        .unwrap();
        assert_eq!(outcome.text, "def foo():\n    pass\n");
        assert_eq!(outcome.failed_validations, 1);
        assert_eq!(oracle.validate_calls.get(), 3);
    }

    #[test]
    fn generation_failure_leaves_the_unit_as_is() {
        let source = "def foo():\n    pass\n";
        let oracle = scripted(
            || {
                return Err(OracleError::MalformedReply {
                    reason: "gibberish".to_string(),
                });
            },
            valid,
        );
        let modes = Modes {
            create: true,
            ..Modes::default()
        };
        let outcome = document_file(
            Path::new("sample.py"),
            source,
            &[],
            &options(modes),
            &oracle,
            &ConfirmAll,
        )
        .unwrap();
        assert_eq!(outcome.text, source);
        assert!(outcome
            .reports
            .contains(&"foo: failed to create new docstring, leaving as-is".to_string()));
        assert_eq!(oracle.generate_calls.get(), 3);
    }

    #[test]
    fn missing_model_aborts_the_file() {
        let source = "def foo():\n    pass\n";
        let oracle = scripted(
            || {
                return Err(OracleError::ModelNotInstalled {
                    model: "llama3".to_string(),
                });
            },
            valid,
        );
        let modes = Modes {
            create: true,
            ..Modes::default()
        };
        let err = document_file(
            Path::new("sample.py"),
            source,
            &[],
            &options(modes),
            &oracle,
            &ConfirmAll,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::Oracle(OracleError::ModelNotInstalled { .. })
        ));
        assert_eq!(oracle.generate_calls.get(), 1);
    }

    #[test]
    fn unknown_filter_warns_and_the_rest_proceed() {
        let source = "def foo():\n    pass\n";
        let oracle = scripted(|| return Ok("Does nothing.".to_string()), valid);
        let modes = Modes {
            create: true,
            ..Modes::default()
        };
        let filters = vec!["foo".to_string(), "bar".to_string()];
        let outcome = document_file(
            Path::new("sample.py"),
            source,
            &filters,
            &options(modes),
            &oracle,
            &ConfirmAll,
        )
        .unwrap();
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.reports.contains(&"foo: created a new docstring".to_string()));
        assert!(outcome.modified);
    }

    #[test]
    fn validate_only_reports_without_editing() {
        let source = "def foo():\n    \"\"\"Doc.\"\"\"\n    pass\n";
        let oracle = scripted(|| return Ok("unused".to_string()), valid);
        let modes = Modes {
            validate: true,
            ..Modes::default()
        };
        let outcome = document_file(
            Path::new("sample.py"),
            source,
            &[],
            &options(modes),
            &oracle,
            &ConfirmAll,
        )
        .unwrap();
        assert_eq!(outcome.text, source);
        assert!(!outcome.modified);
        assert!(outcome
            .reports
            .contains(&"Validation report for foo: PASS: correct".to_string()));
        assert!(outcome.reports.contains(&"foo: did nothing".to_string()));
    }

    #[test]
    fn out_of_depth_filter_warns_and_excludes_the_unit() {
        let source = "class Config:\n    def validate(self):\n        pass\n";
        let oracle = scripted(|| return Ok("unused".to_string()), valid);
        let modes = Modes {
            create: true,
            ..Modes::default()
        };
        let filters = vec!["Config.validate".to_string()];
        let outcome = document_file(
            Path::new("sample.py"),
            source,
            &filters,
            &options(modes),
            &oracle,
            &ConfirmAll,
        )
        .unwrap();
        assert_eq!(outcome.warnings.len(), 1);
        assert!(!outcome.modified);
        assert_eq!(oracle.generate_calls.get(), 0);
    }

    #[test]
    fn syntax_errors_are_fatal_to_the_file() {
        let source = "def foo(:\n";
        let oracle = scripted(|| return Ok("unused".to_string()), valid);
        let err = document_file(
            Path::new("sample.py"),
            source,
            &[],
            &options(Modes::default()),
            &oracle,
            &ConfirmAll,
        )
        .unwrap_err();
        assert!(matches!(err, Error::ParseFailed { .. }));
    }
}
