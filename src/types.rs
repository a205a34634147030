/// Core domain types for docsmith units, selections, and edit plans.
use std::ops::Range;

/// What to do with one unit's docstring. Decided by the planner from the
/// requested modes and the unit's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Insert a new docstring where none exists.
    Create,
    /// Leave the unit untouched.
    Skip,
    /// Remove the existing docstring.
    Strip,
    /// Replace the existing docstring.
    Update,
    /// Report the validation outcome without editing.
    ValidateOnly,
}

/// Where a unit's docstring lives, or would live. Recorded at parse time so
/// the planner and rewriter never re-inspect the syntax tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocstringSlot {
    /// True when the body shares a line with the signature (`def f(): pass`).
    pub body_on_signature_line: bool,
    /// Byte range of the existing docstring literal, delimiters included.
    pub docstring: Option<Span>,
    /// Leading whitespace of the first body statement, kept verbatim.
    pub indent: String,
    /// Byte offset of the line start of the first body statement.
    pub insert_at: usize,
    /// True when the docstring is the body's only statement.
    pub sole_statement: bool,
}

/// Whether a unit currently carries a docstring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocstringState {
    /// No docstring in the unit's slot.
    Absent,
    /// A docstring literal occupies the slot.
    Present,
}

/// A single text change against the original source. Spans always index the
/// original text; the rewriter applies edits in descending start order so
/// lower-offset spans stay valid during the pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    /// Insert `text` at byte offset `at`.
    Insert {
        /// Byte offset in the original text.
        at: usize,
        /// Text to insert.
        text: String,
    },
    /// Delete `span`, whose current content must equal `expected`.
    Remove {
        /// Original text the span is expected to hold.
        expected: String,
        /// Byte range to delete.
        span: Span,
    },
    /// Replace `span`, whose current content must equal `expected`, with `text`.
    Replace {
        /// Original text the span is expected to hold.
        expected: String,
        /// Byte range to replace.
        span: Span,
        /// Replacement text.
        text: String,
    },
}

impl Edit {
    /// Byte offset where this edit takes effect, used for ordering.
    pub fn start(&self) -> usize {
        return match self {
            Edit::Insert { at, .. } => *at,
            Edit::Remove { span, .. } | Edit::Replace { span, .. } => span.start,
        };
    }
}

/// One unit's pending edit, consumed by the rewrite pass. At most one per unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditResult {
    /// The text change to apply.
    pub edit: Edit,
    /// Qualified path of the unit the edit belongs to.
    pub unit: String,
}

/// Everything the engine produced for one file. The caller decides whether
/// to print, diff, or persist `text`.
#[derive(Debug)]
pub struct FileOutcome {
    /// Unified-style diff of the applied edits, when any edit was applied.
    pub diff: Option<String>,
    /// Number of units whose validation did not pass.
    pub failed_validations: u32,
    /// True when `text` differs from the original source.
    pub modified: bool,
    /// Per-unit report lines in document order.
    pub reports: Vec<String>,
    /// The rewritten source text (identical to the input when unmodified).
    pub text: String,
    /// Unresolved or out-of-depth filter warnings.
    pub warnings: Vec<PathWarning>,
}

/// The set of requested docstring operations for a run.
#[allow(
    clippy::struct_excessive_bools,
    reason = "mirrors the four independent CLI mode flags"
)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modes {
    /// Create docstrings for units that lack one.
    pub create: bool,
    /// Remove existing docstrings.
    pub strip: bool,
    /// Replace existing docstrings.
    pub update: bool,
    /// Check existing docstrings against the code.
    pub validate: bool,
}

/// A filter path that resolved to nothing usable. Reported, never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathWarning {
    /// The filter names a real unit that sits deeper than the depth bound.
    ExceedsDepth {
        /// The configured depth bound.
        depth: u32,
        /// The filter string as supplied.
        filter: String,
        /// The depth that would reach the unit.
        required: u32,
    },
    /// No unit in the file matches the filter.
    UnknownPath {
        /// The filter string as supplied.
        filter: String,
    },
}

impl std::fmt::Display for PathWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return match self {
            PathWarning::ExceedsDepth { depth, filter, required } => write!(
                f,
                "you specified `{filter}` to be processed, but the depth setting ({depth}) is too low to process it; increase it with --depth {required}"
            ),
            PathWarning::UnknownPath { filter } => {
                write!(f, "`{filter}` does not match any documentable unit in this file")
            },
        };
    }
}

/// Output of qualified-path resolution.
#[derive(Debug)]
pub struct Selection<'a> {
    /// Selected units, deduplicated, ordered by span start.
    pub units: Vec<&'a SourceUnit>,
    /// One warning per filter that resolved to nothing.
    pub warnings: Vec<PathWarning>,
}

/// A node representing one documentable construct. The module root has depth
/// 0 and no docstring slot; named units have `depth == path.len()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    /// Child units in declaration order, strictly nested within `span`.
    pub children: Vec<SourceUnit>,
    /// Number of enclosing documentable scopes.
    pub depth: u32,
    /// What kind of construct this is.
    pub kind: UnitKind,
    /// Declared identifier (file stem for the module root).
    pub name: String,
    /// Name segments from the module root, root excluded.
    pub path: Vec<String>,
    /// Docstring slot, present for kinds that can carry a docstring.
    pub slot: Option<DocstringSlot>,
    /// Full source extent of the unit, decorators included.
    pub span: Span,
}

impl SourceUnit {
    /// The dotted path used in filters, reports, and warnings.
    pub fn qualified_path(&self) -> String {
        return self.path.join(".");
    }
}

/// Half-open byte range into the original source text.
pub type Span = Range<usize>;

/// The kind of documentable construct a unit represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    /// A `class` definition.
    Class,
    /// A `def` at module level or nested in another function.
    Function,
    /// A `def` directly inside a class body.
    Method,
    /// The file itself: an addressing container, not a docstring target.
    Module,
}

impl UnitKind {
    /// Lowercase noun for log lines and reports.
    pub fn label(self) -> &'static str {
        return match self {
            UnitKind::Class => "class",
            UnitKind::Function => "function",
            UnitKind::Method => "method",
            UnitKind::Module => "module",
        };
    }
}

/// The oracle's judgement of an existing docstring. Transient per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The oracle judged the docstring inaccurate or off-convention.
    Invalid {
        /// The oracle's explanation of what failed.
        assessment: String,
    },
    /// No verdict: the oracle was unreachable or exhausted its attempts.
    Unknown {
        /// Why no verdict was reached.
        reason: String,
    },
    /// The oracle judged the docstring accurate.
    Valid {
        /// The oracle's reply text.
        assessment: String,
    },
}

impl Verdict {
    /// The text shown after PASS/FAILED in validation report lines.
    pub fn assessment(&self) -> &str {
        return match self {
            Verdict::Invalid { assessment } | Verdict::Valid { assessment } => assessment,
            Verdict::Unknown { reason } => reason,
        };
    }

    /// True only for a positive validation.
    pub fn passed(&self) -> bool {
        return matches!(self, Verdict::Valid { .. });
    }
}
