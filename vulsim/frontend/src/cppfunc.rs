//! Extraction of hand-written C++ function bodies.
//!
//! Logic blocks of a combine can live in ordinary C++ files so that they stay
//! compilable and testable on their own. The file is parsed with the
//! tree-sitter C++ grammar and the body of a top-level function definition is
//! returned as the text strictly between its outermost braces.
use std::borrow::Cow;
use std::path::Path;
use tree_sitter as ts;
use vulsim_utils::{Error, VulResult};

/// Node kinds whose children are still at file scope.
const CONDITIONAL_GROUPS: [&str; 4] =
    ["preproc_if", "preproc_ifdef", "preproc_elif", "preproc_else"];

/// Join a backslash followed by trailing blanks with the next line.
///
/// Compilers accept `\ ` at the end of a line as a continuation, the grammar
/// only accepts `\` immediately followed by the newline.
fn splice_lines(source: &str) -> Cow<'_, str> {
    let is_loose = |line: &str| {
        let content = line.trim_end_matches(['\n', '\r']);
        let trimmed = content.trim_end_matches([' ', '\t']);
        trimmed.len() < content.len() && trimmed.ends_with('\\')
    };
    if !source.split_inclusive('\n').any(is_loose) {
        return Cow::Borrowed(source);
    }
    let mut out = String::with_capacity(source.len());
    for line in source.split_inclusive('\n') {
        if is_loose(line) {
            let content = line.trim_end_matches(['\n', '\r']);
            out.push_str(content.trim_end_matches([' ', '\t']));
            out.push_str(&line[content.len()..]);
        } else {
            out.push_str(line);
        }
    }
    Cow::Owned(out)
}

/// The identifier a function definition declares, if it is unqualified.
fn declared_name(def: ts::Node<'_>) -> Option<ts::Node<'_>> {
    let mut decl = def.child_by_field_name("declarator")?;
    while decl.kind() != "function_declarator" {
        decl = match decl.kind() {
            // `int *f()`, `int &f()` and `int (f)()`
            "pointer_declarator"
            | "reference_declarator"
            | "parenthesized_declarator" => {
                decl.named_child(decl.named_child_count().checked_sub(1)?)?
            }
            _ => return None,
        };
    }
    decl.child_by_field_name("declarator")
        .filter(|id| id.kind() == "identifier")
}

/// Text between the braces of a `compound_statement`.
fn block_contents<'s>(body: ts::Node<'_>, source: &'s str) -> Option<&'s str> {
    let open = body.child(0)?;
    let close = body.child(body.child_count().checked_sub(1)?)?;
    if open.kind() != "{" || close.kind() != "}" || close.is_missing() {
        return None;
    }
    source.get(open.end_byte()..close.start_byte())
}

/// Search the file-scope children of `node` for a definition of `name`.
fn find_definition<'t>(
    node: ts::Node<'t>,
    name: &str,
    source: &str,
) -> Option<ts::Node<'t>> {
    let mut cursor = node.walk();
    let children: Vec<_> = node.named_children(&mut cursor).collect();
    children.into_iter().find_map(|child| match child.kind() {
        "function_definition" => declared_name(child)
            .and_then(|id| id.utf8_text(source.as_bytes()).ok())
            .filter(|id| *id == name)
            .map(|_| child),
        kind if CONDITIONAL_GROUPS.contains(&kind) => {
            find_definition(child, name, source)
        }
        _ => None,
    })
}

/// Find the body of the top-level function `name` in `source`.
///
/// Returns the text strictly between the outermost braces of the first
/// matching definition, trimmed at both ends. Declarations without a body,
/// qualified definitions (`Class::name`) and definitions nested in a
/// namespace, class or linkage block are skipped. Definitions inside
/// `#if`/`#ifdef` groups are found. `Ok(None)` means no definition matches.
fn find_function_body(source: &str, name: &str) -> VulResult<Option<String>> {
    let source = splice_lines(source);
    let mut parser = ts::Parser::new();
    parser
        .set_language(tree_sitter_cpp::language())
        .map_err(|err| Error::misc(format!("C++ grammar unavailable: {err:?}")))?;
    let Some(tree) = parser.parse(source.as_bytes(), None) else {
        return Err(Error::misc("C++ parser produced no tree"));
    };

    let Some(def) = find_definition(tree.root_node(), name, &source) else {
        return Ok(None);
    };
    let Some(body) = def.child_by_field_name("body") else {
        return Ok(None);
    };
    if body.has_error() {
        log::warn!(
            "Body of `{name}` has syntax errors at line {}; extracting it as written",
            body.start_position().row + 1
        );
    }
    Ok(block_contents(body, &source).map(|text| text.trim().to_string()))
}

/// Read `path` and extract the body of the top-level function `name`.
///
/// `Ok(None)` means the file was read but contains no matching definition.
pub fn extract_function_body(
    path: &Path,
    name: &str,
) -> VulResult<Option<String>> {
    let source = std::fs::read_to_string(path).map_err(|err| {
        Error::invalid_file(format!(
            "Failed to read C++ source {}: {err}",
            path.display()
        ))
    })?;
    let body =
        find_function_body(&source, name).map_err(|e| e.with_file(path))?;
    log::debug!(
        "extracting `{name}` from {}: {}",
        path.display(),
        if body.is_some() { "found" } else { "not found" }
    );
    Ok(body)
}
