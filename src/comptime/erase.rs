//! Type erasure
//!
//! TypeScript-only syntax is blanked to whitespace of the same byte length,
//! so offsets in the erased text still point at the original source. Enums
//! are the exception: they have runtime semantics and are lowered to the
//! usual IIFE form.

use thiserror::Error;

use crate::frontend::parser::ast::{EnumDecl, Stmt, StmtKind};
use crate::frontend::parser::visit::{self, Visitor};
use crate::frontend::parser::ParseOutput;
use crate::util::edit::{EditBuffer, EditError};
use crate::util::span::Span;

/// Local that carries each member's value inside a lowered enum
const ENUM_VALUE: &str = "__enum_value";

/// Erasure failure
#[derive(Debug, Clone, Error)]
pub enum EraseError {
    #[error("{construct} at offset {offset} has runtime semantics and cannot be erased")]
    Unsupported { construct: &'static str, offset: usize },

    #[error(transparent)]
    Edit(#[from] EditError),
}

/// Erase the TypeScript syntax of `source`, as recorded while parsing it
///
/// # Arguments
/// * `source` - Text that was parsed with TypeScript syntax enabled
/// * `parsed` - Parse output of `source`
///
/// # Returns
/// Plain JavaScript text
pub fn erase_types(
    source: &str,
    parsed: &ParseOutput,
) -> Result<String, EraseError> {
    if let Some(u) = parsed.unerasable.first() {
        return Err(EraseError::Unsupported {
            construct: u.construct,
            offset: u.span.start,
        });
    }

    let spans = outermost(&parsed.type_spans);
    let mut blank = EditBuffer::new(source);
    for span in &spans {
        blank.overwrite(span.start, span.end, blank_text(&source[span.start..span.end]))?;
    }
    let blanked = blank.finish();

    let mut enums = EnumCollector::default();
    visit::walk_stmts(&mut enums, &parsed.module.body);
    if enums.found.is_empty() {
        return Ok(blanked);
    }

    let mut lowered = EditBuffer::new(&blanked);
    for (span, decl) in enums.found {
        if spans.iter().any(|s| s.contains(span)) {
            continue;
        }
        lowered.overwrite(span.start, span.end, lower_enum(decl, &blanked))?;
    }
    Ok(lowered.finish())
}

/// Drop spans nested in an earlier, wider one
fn outermost(spans: &[Span]) -> Vec<Span> {
    let mut sorted: Vec<Span> = spans.iter().copied().filter(|s| !s.is_empty()).collect();
    sorted.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));
    let mut out: Vec<Span> = Vec::with_capacity(sorted.len());
    for span in sorted {
        match out.last() {
            Some(last) if span.start < last.end => {}
            _ => out.push(span),
        }
    }
    out
}

/// Whitespace with the same byte length, keeping line breaks
fn blank_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\n' | '\r' => out.push(c),
            c => out.extend(std::iter::repeat(' ').take(c.len_utf8())),
        }
    }
    out
}

#[derive(Default)]
struct EnumCollector<'a> {
    found: Vec<(Span, &'a EnumDecl)>,
}

impl<'a> Visitor<'a> for EnumCollector<'a> {
    fn visit_stmt(
        &mut self,
        stmt: &'a Stmt,
    ) {
        if let StmtKind::Enum(decl) = &stmt.kind {
            self.found.push((stmt.span, decl));
        }
        visit::walk_stmt(self, stmt);
    }
}

/// `var E; (function (E) { ... })(E || (E = {}));`
///
/// Members are also declared as locals so initializers can refer to earlier
/// members by name. Numeric members get a reverse mapping.
fn lower_enum(
    decl: &EnumDecl,
    text: &str,
) -> String {
    let name = &decl.name.name;
    let mut out = format!("var {name}; (function ({name}) {{ var {ENUM_VALUE};");
    for (i, member) in decl.members.iter().enumerate() {
        let key = serde_json::to_string(&member.name).unwrap_or_else(|_| format!("\"{}\"", member.name));
        let value = match &member.init {
            Some(init) => format!("({})", text.get(init.span.start..init.span.end).unwrap_or("undefined").trim()),
            None if i == 0 => "0".to_string(),
            None => format!("{ENUM_VALUE} + 1"),
        };
        out.push_str(&format!(
            " {ENUM_VALUE} = {value}; {name}[{key}] = {ENUM_VALUE}; if (typeof {ENUM_VALUE} !== \"string\") {name}[{ENUM_VALUE}] = {key};"
        ));
        if is_identifier(&member.name) {
            out.push_str(&format!(" var {} = {ENUM_VALUE};", member.name));
        }
    }
    out.push_str(&format!(" }})({name} || ({name} = {{}}));"));
    out
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '$' || c == '_' || unicode_ident::is_xid_start(c) => {}
        _ => return false,
    }
    chars.all(|c| c == '$' || unicode_ident::is_xid_continue(c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parser::{parse, ParseOptions};

    fn erase(source: &str) -> Result<String, EraseError> {
        let parsed = parse(source, ParseOptions::typescript()).unwrap();
        erase_types(source, &parsed)
    }

    #[test]
    fn test_annotations_blanked_in_place() {
        let source = "const x: number = 1;\nfunction f(a: string): void {}\n";
        let erased = erase(source).unwrap();
        assert_eq!(erased.len(), source.len());
        assert!(!erased.contains("number"));
        assert!(!erased.contains("void"));
        assert_eq!(erased.find("= 1"), source.find("= 1"));
        parse(&erased, ParseOptions::javascript()).unwrap();
    }

    #[test]
    fn test_type_declarations_removed() {
        let erased = erase("interface A { x: number }\ntype B = A;\nexport const c = 1;\n").unwrap();
        assert!(!erased.contains("interface"));
        assert!(!erased.contains("type B"));
        assert!(erased.contains("export const c = 1;"));
    }

    #[test]
    fn test_enum_lowered() {
        let erased = erase("enum Color { Red, Green = 5, Blue }").unwrap();
        assert!(erased.starts_with("var Color; (function (Color)"));
        parse(&erased, ParseOptions::javascript()).unwrap();
    }

    #[test]
    fn test_unerasable_rejected() {
        let err = erase("class A { constructor(private x: number) {} }").unwrap_err();
        assert!(matches!(err, EraseError::Unsupported { construct: "parameter property", .. }));
    }

    #[test]
    fn test_outermost_spans() {
        let spans = [Span::new(5, 9), Span::new(0, 10), Span::new(12, 14), Span::new(13, 14)];
        assert_eq!(outermost(&spans), vec![Span::new(0, 10), Span::new(12, 14)]);
    }

    #[test]
    fn test_blank_text_keeps_lines() {
        assert_eq!(blank_text("a\nbé"), " \n   ");
    }
}
