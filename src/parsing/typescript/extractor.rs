//! Module reference extraction for TypeScript/JavaScript sources
//!
//! **Tree-sitter grammar**: tree-sitter-typescript TSX dialect, which also
//! accepts plain JavaScript and JSX.
//!
//! Only top-level statements are inspected:
//! - `import ... from "x"`, `export * from "x"`, `export { a } from "x"`
//! - `const a = require("x")` (any variable declarator whose value is an
//!   allow-listed call)
//! - `require("x");`, `jest.mock("x");` as bare expression statements
//!
//! References inside function bodies, blocks or conditionals are not
//! reported. Statements that contain syntax errors are skipped; the rest of
//! the file is still processed.

use crate::types::{Position, RawReference};
use std::cell::RefCell;
use tree_sitter::{Language, Node, Parser, Point};

thread_local! {
    static PARSER: RefCell<Option<Parser>> = const { RefCell::new(None) };
}

fn create_parser() -> Result<Parser, String> {
    let mut parser = Parser::new();
    let language: Language = tree_sitter_typescript::LANGUAGE_TSX.into();
    parser
        .set_language(&language)
        .map_err(|e| format!("Failed to set TSX language: {e}"))?;
    Ok(parser)
}

/// Extracts raw module references from source text.
#[derive(Debug, Clone, Default)]
pub struct ReferenceExtractor {
    /// Dotted callee names such as `require` or `jest.mock`
    expression_references: Vec<String>,
}

impl ReferenceExtractor {
    pub fn new(expression_references: Vec<String>) -> Self {
        Self {
            expression_references,
        }
    }

    pub fn expression_references(&self) -> &[String] {
        &self.expression_references
    }

    /// Return references to other modules in source order.
    ///
    /// Never fails: unparsable input yields an empty list.
    pub fn extract(&self, code: &str) -> Vec<RawReference> {
        PARSER.with_borrow_mut(|slot| {
            if slot.is_none() {
                match create_parser() {
                    Ok(parser) => *slot = Some(parser),
                    Err(e) => {
                        tracing::warn!("[typescript] {e}");
                        return Vec::new();
                    }
                }
            }
            let Some(parser) = slot.as_mut() else {
                return Vec::new();
            };

            let Some(tree) = parser.parse(code, None) else {
                tracing::debug!("[typescript] parser returned no tree");
                return Vec::new();
            };

            let root = tree.root_node();
            let mut references = Vec::new();
            let mut cursor = root.walk();
            for statement in root.named_children(&mut cursor) {
                if statement.has_error() {
                    tracing::trace!(
                        "[typescript] skipping statement with syntax errors at line {}",
                        statement.start_position().row + 1
                    );
                    continue;
                }
                self.extract_from_statement(statement, code, &mut references);
            }
            references
        })
    }

    fn extract_from_statement(&self, node: Node, code: &str, references: &mut Vec<RawReference>) {
        match node.kind() {
            "import_statement" | "export_statement" => {
                if let Some(source) = node.child_by_field_name("source") {
                    if let Some(reference) = string_literal_reference(source, code) {
                        references.push(reference);
                    }
                } else if let Some(declaration) = node.child_by_field_name("declaration") {
                    // `export const a = require("x")`
                    if matches!(declaration.kind(), "lexical_declaration" | "variable_declaration") {
                        self.extract_from_statement(declaration, code, references);
                    }
                }
            }
            "lexical_declaration" | "variable_declaration" => {
                let mut cursor = node.walk();
                for declarator in node.named_children(&mut cursor) {
                    if declarator.kind() != "variable_declarator" {
                        continue;
                    }
                    if let Some(value) = declarator.child_by_field_name("value") {
                        if let Some(reference) = self.call_reference(value, code) {
                            references.push(reference);
                        }
                    }
                }
            }
            "expression_statement" => {
                if let Some(expression) = node.named_child(0) {
                    if let Some(reference) = self.call_reference(expression, code) {
                        references.push(reference);
                    }
                }
            }
            _ => {}
        }
    }

    /// Reference for an allow-listed call whose first argument is a plain string.
    fn call_reference(&self, node: Node, code: &str) -> Option<RawReference> {
        if node.kind() != "call_expression" {
            return None;
        }

        let callee = callee_name(node.child_by_field_name("function")?, code)?;
        if !self.expression_references.iter().any(|e| *e == callee) {
            return None;
        }

        let arguments = node.child_by_field_name("arguments")?;
        let mut cursor = arguments.walk();
        let first = arguments
            .named_children(&mut cursor)
            .find(|arg| arg.kind() != "comment")?;
        string_literal_reference(first, code)
    }
}

/// Render a callee as dotted text: `require`, `jest.mock`, `a.b.c`.
fn callee_name(node: Node, code: &str) -> Option<String> {
    match node.kind() {
        "identifier" | "property_identifier" | "import" => Some(code[node.byte_range()].to_string()),
        "member_expression" => {
            let object = callee_name(node.child_by_field_name("object")?, code)?;
            let property = node.child_by_field_name("property")?;
            Some(format!("{object}.{}", &code[property.byte_range()]))
        }
        _ => None,
    }
}

/// Build a reference from a `"..."`, `'...'` or substitution-free template literal.
fn string_literal_reference(node: Node, code: &str) -> Option<RawReference> {
    match node.kind() {
        "string" => {}
        "template_string" => {
            let mut cursor = node.walk();
            if node
                .named_children(&mut cursor)
                .any(|child| child.kind() == "template_substitution")
            {
                return None;
            }
        }
        _ => return None,
    }

    let literal = &code[node.byte_range()];
    // Quotes are single ASCII bytes on both ends
    let text = literal.get(1..literal.len().saturating_sub(1))?;

    Some(RawReference {
        path: unescape(text),
        start: position_at(code, node.start_byte(), node.start_position()),
        end: position_at(code, node.end_byte(), node.end_position()),
    })
}

/// Decode JavaScript string escapes (`\n`, `\x62`, `\u0062`, `\u{62}`, line
/// continuations). Unknown escapes yield the escaped character itself.
fn unescape(text: &str) -> String {
    if !text.contains('\\') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(escaped) = chars.next() else {
            out.push('\\');
            break;
        };
        match escaped {
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' => out.push('\0'),
            // line continuation
            '\n' | '\u{2028}' | '\u{2029}' => {}
            '\r' => {
                chars.next_if_eq(&'\n');
            }
            'x' => {
                let hex: String = (0..2).map_while(|_| chars.next_if(char::is_ascii_hexdigit)).collect();
                push_code_point(&mut out, &hex, 'x');
            }
            'u' if chars.next_if_eq(&'{').is_some() => {
                let hex: String = std::iter::from_fn(|| chars.next_if(|c| *c != '}')).collect();
                chars.next_if_eq(&'}');
                push_code_point(&mut out, &hex, 'u');
            }
            'u' => {
                let hex: String = (0..4).map_while(|_| chars.next_if(char::is_ascii_hexdigit)).collect();
                push_code_point(&mut out, &hex, 'u');
            }
            other => out.push(other),
        }
    }
    out
}

/// Push the character for `hex`, or the escape verbatim when it is malformed.
fn push_code_point(out: &mut String, hex: &str, kind: char) {
    match u32::from_str_radix(hex, 16).ok().and_then(char::from_u32) {
        Some(c) => out.push(c),
        None => {
            out.push('\\');
            out.push(kind);
            out.push_str(hex);
        }
    }
}

/// Convert a tree-sitter point (byte column) to a UTF-16 column position.
fn position_at(code: &str, byte: usize, point: Point) -> Position {
    let line_start = byte.saturating_sub(point.column);
    let character = code
        .get(line_start..byte)
        .map(|prefix| prefix.encode_utf16().count())
        .unwrap_or(point.column);
    Position::new(point.row as u32, character as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> ReferenceExtractor {
        ReferenceExtractor::new(vec![
            "require".to_string(),
            "require.actual".to_string(),
            "jest.mock".to_string(),
        ])
    }

    fn paths(code: &str) -> Vec<String> {
        extractor().extract(code).into_iter().map(|r| r.path).collect()
    }

    #[test]
    fn test_empty_source() {
        assert!(extractor().extract("").is_empty());
    }

    #[test]
    fn test_imports_and_reexports() {
        let code = r#"
import a from "./a";
import { b, c } from "b";
import * as c from "../c";
import { x as d } from "d/test";
import "./side-effect";

export class A {}
const B = {};

export * from "./e";
export { B };
export { f } from './f';
"#;
        assert_eq!(
            paths(code),
            vec!["./a", "b", "../c", "d/test", "./side-effect", "./e", "./f"]
        );
    }

    #[test]
    fn test_require_like_calls() {
        let code = r#"
require("a");
const b = require("b");
const { c } = require("../c");
const d = require("d"),
    { e } = require("./e");

require.actual("aa");
require.nonactual("ab");
const f = another("k");

jest.mock("a");
jest.dontMock("b");
"#;
        assert_eq!(paths(code), vec!["a", "b", "../c", "d", "./e", "aa", "a"]);
    }

    #[test]
    fn test_call_argument_must_be_plain_string() {
        let code = r#"
const name = "./dyn";
require(name);
require(`./tpl/${name}`);
require(`./plain-template`);
require();
"#;
        assert_eq!(paths(code), vec!["./plain-template"]);
    }

    #[test]
    fn test_nested_references_are_ignored() {
        let code = r#"
function load() {
    const a = require("./inside-function");
    return a;
}
if (process.env.X) {
    require("./inside-if");
}
const lazy = () => require("./inside-arrow");
const top = require("./top");
"#;
        assert_eq!(paths(code), vec!["./top"]);
    }

    #[test]
    fn test_typescript_and_jsx_syntax() {
        let code = r#"
import type { Props } from "./types";
import React from "react";
const Button = (props: Props): JSX.Element => <button>{props.label}</button>;
export default Button;
"#;
        assert_eq!(paths(code), vec!["./types", "react"]);
    }

    #[test]
    fn test_positions_cover_the_string_literal() {
        let code = "import a from \"./a\";\nconst b = require('./b');\n";
        let refs = extractor().extract(code);
        assert_eq!(refs.len(), 2);

        assert_eq!(refs[0].start, Position::new(0, 14));
        assert_eq!(refs[0].end, Position::new(0, 19));
        assert_eq!(refs[1].start, Position::new(1, 18));
        assert_eq!(refs[1].end, Position::new(1, 23));
    }

    #[test]
    fn test_positions_use_utf16_columns() {
        // "é" is two bytes in UTF-8 but one UTF-16 unit
        let code = "/* é */ const b = require(\"./x\");";
        let refs = extractor().extract(code);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].start, Position::new(0, 26));
        assert_eq!(refs[0].end, Position::new(0, 31));
    }

    #[test]
    fn test_syntax_errors_do_not_abort_extraction() {
        let code = r#"import a from "./a";
impor { b } from "./b";
"#;
        let found = paths(code);
        assert_eq!(found.first().map(String::as_str), Some("./a"));
        assert!(!found.contains(&"./b".to_string()));
    }

    #[test]
    fn test_garbage_input_yields_nothing() {
        assert!(extractor().extract("}}}{{{ ((( \"./a\"").is_empty());
    }

    #[test]
    fn test_no_expression_references_configured() {
        let extractor = ReferenceExtractor::new(Vec::new());
        let refs = extractor.extract("const a = require(\"./a\");\nimport b from \"./b\";");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].path, "./b");
    }

    #[test]
    fn test_exported_variable_declarations() {
        let code = "export const a = require(\"./a\");\nexport let b = require(\"./b\"), c = 1;\nexport var d = require.actual(\"./d\");\nexport const e = 1;\n";
        assert_eq!(paths(code), vec!["./a", "./b", "./d"]);

        let refs = extractor().extract(code);
        assert_eq!(refs[0].start, Position::new(0, 25));
        assert_eq!(refs[0].end, Position::new(0, 30));
    }

    #[test]
    fn test_escapes_are_decoded() {
        let code = r#"
import a from "./a\u0062";
import b from './\x63d';
import c from "./e\u{66}";
import d from "./it\'s";
import e from "./plain";
"#;
        assert_eq!(paths(code), vec!["./ab", "./cd", "./ef", "./it's", "./plain"]);
    }

    #[test]
    fn test_unescape_malformed_sequences_are_kept() {
        assert_eq!(unescape(r"./a\u{zz}"), r"./a\uzz");
        assert_eq!(unescape(r"./a\q"), "./aq");
        assert_eq!(unescape("./a\\\nb"), "./ab");
        assert_eq!(unescape("./no-escapes"), "./no-escapes");
    }
}
