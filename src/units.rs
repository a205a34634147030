use std::path::Path;

use tree_sitter::{Language, Node, Parser, Tree};

use crate::error::Error;
use crate::types::{DocstringSlot, SourceUnit, Span, UnitKind};

/// Maximum source file size (16 MiB).
const MAX_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// Parse source text into a tree of documentable units.
///
/// The returned root is a `Module` unit spanning the whole file; nested
/// functions, classes, and methods hang off it in declaration order. The
/// tree is deterministic: identical text yields an identical tree.
///
/// # Errors
///
/// Returns `Error::FileTooLarge` for oversized input, or `Error::ParseFailed`
/// when the grammar cannot be loaded or the source contains syntax errors.
pub fn build_tree(
    file_path: &Path,
    source: &str,
    language: &Language,
) -> Result<SourceUnit, Error> {
    let source_len: u64 = source.len().try_into().unwrap_or(u64::MAX);
    if source_len > MAX_FILE_SIZE {
        return Err(Error::FileTooLarge {
            file: file_path.to_path_buf(),
            max_bytes: MAX_FILE_SIZE,
            size_bytes: source_len,
        });
    }

    let tree = parse_source(file_path, source, language)?;
    let root_node = tree.root_node();
    if root_node.has_error() {
        return Err(Error::ParseFailed {
            file: file_path.to_path_buf(),
            reason: "source contains syntax errors".to_string(),
        });
    }

    let name = file_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("module")
        .to_string();

    let mut root = SourceUnit {
        children: Vec::new(),
        depth: 0,
        kind: UnitKind::Module,
        name,
        path: Vec::new(),
        slot: None,
        span: 0..source.len(),
    };
    collect_units(root_node, source, false, &mut root);
    Ok(root)
}

/// Extract a unit's full source text (decorators included).
pub fn unit_source<'a>(unit: &SourceUnit, source: &'a str) -> &'a str {
    source.get(unit.span.clone()).unwrap_or("")
}

/// Parse source into a tree-sitter tree.
///
/// # Errors
///
/// Returns `Error::ParseFailed` if the language cannot be set or parsing fails.
fn parse_source(file_path: &Path, source: &str, language: &Language) -> Result<Tree, Error> {
    let mut parser = Parser::new();
    parser.set_language(language).map_err(|e| Error::ParseFailed {
        file: file_path.to_path_buf(),
        reason: e.to_string(),
    })?;

    parser.parse(source, None).ok_or_else(|| Error::ParseFailed {
        file: file_path.to_path_buf(),
        reason: "tree-sitter returned None".to_string(),
    })
}

// ── Tree walk ──────────────────────────────────────────────────────────

/// Walk a scope's children, turning definitions into units of `parent` and
/// descending through non-definition compound statements (a `def` inside an
/// `if` block still belongs to the enclosing scope, at the same depth).
fn collect_units(scope: Node<'_>, source: &str, in_class_body: bool, parent: &mut SourceUnit) {
    let mut cursor = scope.walk();
    for child in scope.named_children(&mut cursor) {
        match child.kind() {
            "class_definition" | "function_definition" => {
                if let Some(unit) = unit_from_definition(child, child, source, in_class_body, parent) {
                    parent.children.push(unit);
                }
            },
            "decorated_definition" => {
                let Some(def) = child.child_by_field_name("definition") else {
                    continue;
                };
                if let Some(unit) = unit_from_definition(child, def, source, in_class_body, parent) {
                    parent.children.push(unit);
                }
            },
            _ => collect_units(child, source, in_class_body, parent),
        }
    }
}

/// Build one unit from a definition node. `outer` provides the span (the
/// `decorated_definition` wrapper when decorators are present), `def` the
/// name and body.
fn unit_from_definition(
    outer: Node<'_>,
    def: Node<'_>,
    source: &str,
    in_class_body: bool,
    parent: &SourceUnit,
) -> Option<SourceUnit> {
    let kind = match def.kind() {
        "class_definition" => UnitKind::Class,
        "function_definition" if in_class_body => UnitKind::Method,
        "function_definition" => UnitKind::Function,
        _ => return None,
    };

    let name_node = def.child_by_field_name("name")?;
    let name = name_node.utf8_text(source.as_bytes()).ok()?.to_string();
    let body = def.child_by_field_name("body")?;

    let mut path = parent.path.clone();
    path.push(name.clone());

    let mut unit = SourceUnit {
        children: Vec::new(),
        depth: parent.depth.saturating_add(1),
        kind,
        name,
        path,
        slot: Some(docstring_slot(body, source)),
        span: outer.start_byte()..outer.end_byte(),
    };
    collect_units(body, source, kind == UnitKind::Class, &mut unit);
    Some(unit)
}

// ── Docstring slot ─────────────────────────────────────────────────────

/// Inspect a definition's body block and record where its docstring is, or
/// where one would go. Comments are not statements: a docstring may sit
/// after a leading comment, and a body holding only comments besides its
/// docstring still counts as sole-statement.
fn docstring_slot(body: Node<'_>, source: &str) -> DocstringSlot {
    let first_child = body.named_child(0);
    let first_statement = {
        let mut cursor = body.walk();
        body.named_children(&mut cursor).find(|c| c.kind() != "comment")
    };
    let docstring = first_statement.and_then(docstring_span);

    let statement_count = {
        let mut cursor = body.walk();
        body.named_children(&mut cursor).filter(|c| c.kind() != "comment").count()
    };

    let first_start = first_child.map_or_else(|| body.start_byte(), |c| c.start_byte());
    let line_start = source
        .get(..first_start)
        .and_then(|prefix| prefix.rfind('\n'))
        .map_or(0, |i| i.saturating_add(1));
    let prefix = source.get(line_start..first_start).unwrap_or("");
    let body_on_signature_line = !prefix.chars().all(char::is_whitespace);
    let sole_statement = docstring.is_some() && statement_count == 1;

    DocstringSlot {
        body_on_signature_line,
        docstring,
        indent: if body_on_signature_line { String::new() } else { prefix.to_string() },
        insert_at: line_start,
        sole_statement,
    }
}

/// The byte span of a statement's docstring literal, delimiters included.
/// Only a plain leading string counts; an f-string (anything with
/// interpolation) is an expression, not documentation.
fn docstring_span(stmt: Node<'_>) -> Option<Span> {
    if stmt.kind() != "expression_statement" || stmt.named_child_count() != 1 {
        return None;
    }
    let literal = stmt.named_child(0)?;
    if literal.kind() != "string" {
        return None;
    }
    let mut cursor = literal.walk();
    if literal.named_children(&mut cursor).any(|c| c.kind() == "interpolation") {
        return None;
    }
    Some(literal.start_byte()..literal.end_byte())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::build_tree;
    use crate::types::UnitKind;

    fn parse(source: &str) -> crate::types::SourceUnit {
        let language = tree_sitter_python::LANGUAGE.into();
        build_tree(Path::new("sample.py"), source, &language).unwrap()
    }

    #[test]
    fn module_root_has_no_slot() {
        let root = parse("def foo():\n    pass\n");
        assert_eq!(root.kind, UnitKind::Module);
        assert_eq!(root.depth, 0);
        assert!(root.slot.is_none());
        assert_eq!(root.name, "sample");
    }

    #[test]
    fn nested_units_carry_paths_and_depths() {
        let source = "class Config:\n    def validate(self):\n        pass\n\ndef helper():\n    pass\n";
        let root = parse(source);
        assert_eq!(root.children.len(), 2);

        let class = &root.children[0];
        assert_eq!(class.kind, UnitKind::Class);
        assert_eq!(class.depth, 1);
        assert_eq!(class.qualified_path(), "Config");

        let method = &class.children[0];
        assert_eq!(method.kind, UnitKind::Method);
        assert_eq!(method.depth, 2);
        assert_eq!(method.qualified_path(), "Config.validate");

        let helper = &root.children[1];
        assert_eq!(helper.kind, UnitKind::Function);
        assert_eq!(helper.qualified_path(), "helper");
    }

    #[test]
    fn docstring_span_covers_delimiters() {
        let source = "def foo():\n    \"\"\"Does nothing.\"\"\"\n    pass\n";
        let root = parse(source);
        let slot = root.children[0].slot.as_ref().unwrap();
        let span = slot.docstring.clone().unwrap();
        assert_eq!(&source[span], "\"\"\"Does nothing.\"\"\"");
        assert_eq!(slot.indent, "    ");
        assert!(!slot.sole_statement);
    }

    #[test]
    fn missing_docstring_records_insertion_point() {
        let source = "def foo():\n    pass\n";
        let root = parse(source);
        let slot = root.children[0].slot.as_ref().unwrap();
        assert!(slot.docstring.is_none());
        assert_eq!(slot.insert_at, source.find("    pass").unwrap());
        assert_eq!(slot.indent, "    ");
        assert!(!slot.body_on_signature_line);
    }

    #[test]
    fn one_liner_body_is_flagged() {
        let root = parse("def foo(): pass\n");
        let slot = root.children[0].slot.as_ref().unwrap();
        assert!(slot.body_on_signature_line);
    }

    #[test]
    fn sole_statement_docstring_is_flagged() {
        let root = parse("def foo():\n    \"\"\"Only me.\"\"\"\n");
        let slot = root.children[0].slot.as_ref().unwrap();
        assert!(slot.sole_statement);
    }

    #[test]
    fn fstring_is_not_a_docstring() {
        let source = "def foo():\n    f\"{1}\"\n    pass\n";
        let root = parse(source);
        let slot = root.children[0].slot.as_ref().unwrap();
        assert!(slot.docstring.is_none());
    }

    #[test]
    fn decorated_span_includes_decorators() {
        let source = "@wraps\ndef foo():\n    pass\n";
        let root = parse(source);
        let unit = &root.children[0];
        assert_eq!(unit.span.start, 0);
        assert_eq!(unit.name, "foo");
    }

    #[test]
    fn def_inside_if_belongs_to_module_scope() {
        let source = "if True:\n    def foo():\n        pass\n";
        let root = parse(source);
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].depth, 1);
        assert_eq!(root.children[0].qualified_path(), "foo");
    }

    #[test]
    fn syntax_errors_are_rejected() {
        let language = tree_sitter_python::LANGUAGE.into();
        let result = build_tree(Path::new("bad.py"), "def (:\n", &language);
        assert!(result.is_err());
    }

    #[test]
    fn docstring_after_leading_comment_is_found() {
        let source = "def foo():\n    # setup\n    \"\"\"Doc.\"\"\"\n    pass\n";
        let root = parse(source);
        let slot = root.children[0].slot.as_ref().unwrap();
        assert!(slot.docstring.is_some());
    }
}
