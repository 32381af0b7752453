//! Target and dependency analysis
//!
//! Finds the expressions of one file that must be evaluated at build time and,
//! for each, the declarations it needs.
//!
//! A *consumer* is a use of a binding introduced by a tagged import
//! (`import { x } from "./m" with { type: "comptime" }`). Its *target* is the
//! largest expression reached by walking up through member accesses, calls,
//! tagged templates, updates and `new` while the consumer stays in operand
//! position. Parentheses and type assertions end the walk.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::trace;

use crate::frontend::parser::ast::*;
use crate::frontend::parser::visit::{walk_expr, walk_stmt, walk_stmts, Visitor};
use crate::frontend::program::{Bindings, DeclId, DeclKind, ParsedFile};
use crate::util::span::{SourceFile, Span};

/// An expression to evaluate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub span: Span,
    /// Innermost statement containing the target
    pub statement: Span,
    /// Set when the target is a shorthand property `{ name }`, which must be
    /// replaced by `name: <value>`
    pub shorthand: Option<String>,
}

/// One entry of a [`DeclarationSlice`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SliceItem {
    /// Import binding, rendered as a dynamic import
    Import(DeclId),
    /// Statement declaring one or more needed bindings
    Statement(Span),
    /// The needed declarators of a `var`/`let`/`const` statement, in order
    Declarators { kind: VarKind, declarators: Vec<Span> },
}

impl SliceItem {
    fn position(
        &self,
        bindings: &Bindings,
    ) -> usize {
        match self {
            SliceItem::Import(id) => bindings.decl(*id).span.start,
            SliceItem::Statement(span) => span.start,
            SliceItem::Declarators { declarators, .. } => declarators.first().map_or(0, |d| d.start),
        }
    }
}

/// Everything a target depends on, in source order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclarationSlice {
    pub items: Vec<SliceItem>,
    /// Every declaration reached, sorted
    pub decls: Vec<DeclId>,
}

/// A target together with its slice
#[derive(Debug, Clone)]
pub struct AnalyzedTarget {
    pub target: Target,
    pub slice: DeclarationSlice,
}

/// Result of analyzing one file
#[derive(Debug, Clone, Default)]
pub struct FileAnalysis {
    /// Spans of import statements tagged `type: "comptime"`
    pub tagged_imports: Vec<Span>,
    /// Non-overlapping targets sorted by position
    pub targets: Vec<AnalyzedTarget>,
}

impl FileAnalysis {
    pub fn is_empty(&self) -> bool {
        self.tagged_imports.is_empty() && self.targets.is_empty()
    }
}

/// Analyze one parsed file
pub fn analyze(
    source: &SourceFile,
    parsed: &ParsedFile,
) -> FileAnalysis {
    if source.is_declaration_file() {
        return FileAnalysis::default();
    }
    let tagged_imports = tagged_imports(&parsed.module);
    if tagged_imports.is_empty() {
        return FileAnalysis::default();
    }

    let targets = collapse(find_targets(&parsed.module, &parsed.bindings));
    trace!("{}: {} targets", source.name(), targets.len());
    let targets = targets
        .into_iter()
        .map(|target| {
            let slice = slice(&parsed.module, &parsed.bindings, target.span);
            AnalyzedTarget { target, slice }
        })
        .collect();
    FileAnalysis {
        tagged_imports,
        targets,
    }
}

/// Import statements carrying a `comptime` attribute
pub fn tagged_imports(module: &Module) -> Vec<Span> {
    module
        .body
        .iter()
        .filter(|stmt| matches!(&stmt.kind, StmtKind::Import(import) if import.is_comptime()))
        .map(|stmt| stmt.span)
        .collect()
}

/// Every target, unordered and possibly nested
pub fn find_targets(
    module: &Module,
    bindings: &Bindings,
) -> Vec<Target> {
    let mut finder = TargetFinder {
        bindings,
        operands: HashSet::new(),
        statements: Vec::new(),
        found: Vec::new(),
    };
    walk_stmts(&mut finder, &module.body);
    finder.found
}

/// Keep outermost targets: sorted by start, each kept only if it starts at
/// or after the end of the previous kept one
pub fn collapse(mut targets: Vec<Target>) -> Vec<Target> {
    targets.sort_by_key(|t| (t.span.start, std::cmp::Reverse(t.span.end)));
    let mut kept: Vec<Target> = Vec::with_capacity(targets.len());
    for target in targets {
        match kept.last() {
            Some(prev) if target.span.start < prev.span.end => {}
            _ => kept.push(target),
        }
    }
    kept
}

/// Declarations the expression at `target` transitively depends on
///
/// `var`/`let`/`const` statements contribute only the declarators the slice
/// needs. A statement containing the target never contributes code that would
/// run the target a second time: of its declarators only those before the
/// target (or initialized with a function) are taken, and other statements
/// around it only when they are function or class declarations.
pub fn slice(
    module: &Module,
    bindings: &Bindings,
    target: Span,
) -> DeclarationSlice {
    let index = StatementIndex::build(module);
    let mut seen: HashSet<DeclId> = HashSet::new();
    let mut imports: Vec<DeclId> = Vec::new();
    let mut statements: Vec<Span> = Vec::new();
    let mut declarators: BTreeMap<Span, (VarKind, Vec<Span>)> = BTreeMap::new();
    // statements and declarators taken so far
    let mut included: Vec<Span> = Vec::new();
    let mut work = vec![target];

    while let Some(scope) = work.pop() {
        for reference in bindings.refs_in(scope) {
            let Some(id) = reference.decl else {
                continue;
            };
            if !seen.insert(id) {
                continue;
            }
            let decl = bindings.decl(id);
            if decl.ambient || matches!(decl.kind, DeclKind::Param | DeclKind::Catch) {
                continue;
            }
            // in scope already
            if target.contains(decl.span) || included.iter().any(|s| s.contains(decl.span)) {
                continue;
            }
            if decl.is_import() {
                imports.push(id);
                continue;
            }
            let region = match index.statements.get(&decl.stmt).map(|stmt| &stmt.kind) {
                Some(StmtKind::Var(var)) => {
                    let Some(d) = var.decls.iter().find(|d| d.span.contains(decl.span)) else {
                        continue;
                    };
                    let runs_target = decl.stmt.contains(target) && d.span.end > target.start;
                    if runs_target && !has_function_init(d) {
                        continue;
                    }
                    if !included.contains(&d.span) {
                        declarators.entry(decl.stmt).or_insert_with(|| (var.kind, Vec::new())).1.push(d.span);
                    }
                    d.span
                }
                kind => {
                    let declares_only = matches!(kind, Some(StmtKind::Function(_) | StmtKind::Class(_)));
                    if decl.stmt.contains(target) && !declares_only {
                        continue;
                    }
                    if !statements.contains(&decl.stmt) {
                        statements.push(decl.stmt);
                    }
                    decl.stmt
                }
            };
            if !included.contains(&region) {
                included.push(region);
                work.push(region);
            }
        }
    }

    // a region found before an enclosing one is redundant
    let enclosed = |span: &Span| included.iter().any(|o| o != span && o.contains(*span));
    let mut items: Vec<SliceItem> = imports.into_iter().map(SliceItem::Import).collect();
    items.extend(statements.iter().filter(|s| !enclosed(s)).copied().map(SliceItem::Statement));
    for (_, (kind, mut spans)) in declarators {
        spans.retain(|d| !enclosed(d));
        spans.sort_by_key(|d| d.start);
        if !spans.is_empty() {
            items.push(SliceItem::Declarators {
                kind,
                declarators: spans,
            });
        }
    }
    items.sort_by_key(|item| item.position(bindings));

    let mut decls: Vec<DeclId> = seen.into_iter().collect();
    decls.sort_unstable();
    DeclarationSlice { items, decls }
}

/// Declarator whose initializer only creates a function
fn has_function_init(declarator: &VarDeclarator) -> bool {
    matches!(
        declarator.init.as_ref().map(|e| &e.kind),
        Some(ExprKind::Function(_) | ExprKind::Arrow(_))
    )
}

/// Every statement of a module by span, nested ones included
struct StatementIndex<'a> {
    statements: HashMap<Span, &'a Stmt>,
}

impl<'a> StatementIndex<'a> {
    fn build(module: &'a Module) -> Self {
        let mut index = StatementIndex {
            statements: HashMap::new(),
        };
        walk_stmts(&mut index, &module.body);
        index
    }
}

impl<'a> Visitor<'a> for StatementIndex<'a> {
    fn visit_stmt(
        &mut self,
        stmt: &'a Stmt,
    ) {
        self.statements.insert(stmt.span, stmt);
        walk_stmt(self, stmt);
    }
}

struct TargetFinder<'a> {
    bindings: &'a Bindings,
    /// Expressions in operand position of a chain node
    operands: HashSet<*const Expr>,
    statements: Vec<Span>,
    found: Vec<Target>,
}

impl<'a> TargetFinder<'a> {
    fn is_consumer(
        &self,
        ident: &Ident,
    ) -> bool {
        self.bindings
            .resolve(ident.span)
            .map(|id| matches!(self.bindings.decl(id).kind, DeclKind::Import { comptime: true, .. }))
            .unwrap_or(false)
    }

    fn statement(
        &self,
        fallback: Span,
    ) -> Span {
        self.statements.last().copied().unwrap_or(fallback)
    }
}

/// Operand a chain node passes the walk up through
fn chain_operand(expr: &Expr) -> Option<&Expr> {
    match &expr.kind {
        ExprKind::Member { object, .. } => Some(object),
        ExprKind::Call { callee, .. } | ExprKind::New { callee, .. } => Some(callee),
        ExprKind::TaggedTemplate { tag, .. } => Some(tag),
        ExprKind::Update { arg, .. } => Some(arg),
        ExprKind::OptChain(inner) => Some(inner),
        _ => None,
    }
}

/// Bottom of the operand chain below `expr`
fn chain_root(expr: &Expr) -> &Expr {
    let mut current = expr;
    while let Some(operand) = chain_operand(current) {
        current = operand;
    }
    current
}

impl<'a> Visitor<'a> for TargetFinder<'a> {
    fn visit_stmt(
        &mut self,
        stmt: &'a Stmt,
    ) {
        self.statements.push(stmt.span);
        walk_stmt(self, stmt);
        self.statements.pop();
    }

    fn visit_expr(
        &mut self,
        expr: &'a Expr,
    ) {
        if let Some(operand) = chain_operand(expr) {
            self.operands.insert(operand as *const Expr);
        }
        let is_top = !self.operands.contains(&(expr as *const Expr));
        if is_top {
            if let ExprKind::Ident(ident) = &chain_root(expr).kind {
                if self.is_consumer(ident) {
                    self.found.push(Target {
                        span: expr.span,
                        statement: self.statement(expr.span),
                        shorthand: None,
                    });
                }
            }
        }
        if let ExprKind::Object(props) = &expr.kind {
            for prop in props {
                if let Prop::Shorthand(ident) = prop {
                    if self.is_consumer(ident) {
                        self.found.push(Target {
                            span: ident.span,
                            statement: self.statement(ident.span),
                            shorthand: Some(ident.name.clone()),
                        });
                    }
                }
            }
        }
        walk_expr(self, expr);
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::frontend::parser::{parse, ParseOptions};

    fn analyze_text(text: &str) -> (SourceFile, FileAnalysis) {
        let source = SourceFile::new(PathBuf::from("/p/main.ts"), text);
        let output = parse(text, ParseOptions::typescript()).unwrap();
        let bindings = Bindings::bind(&output.module);
        let parsed = ParsedFile {
            module: output.module,
            bindings,
        };
        let analysis = analyze(&source, &parsed);
        (source, analysis)
    }

    fn target_texts(text: &str) -> Vec<String> {
        let (source, analysis) = analyze_text(text);
        analysis
            .targets
            .iter()
            .map(|t| source.source_text(t.target.span).to_string())
            .collect()
    }

    fn slice_texts(text: &str) -> Vec<String> {
        let (source, analysis) = analyze_text(text);
        let output = parse(text, ParseOptions::typescript()).unwrap();
        let bindings = Bindings::bind(&output.module);
        analysis.targets[0]
            .slice
            .items
            .iter()
            .map(|item| match item {
                SliceItem::Import(id) => format!("import {}", bindings.decl(*id).name),
                SliceItem::Statement(span) => source.source_text(*span).to_string(),
                SliceItem::Declarators { kind, declarators } => {
                    let parts: Vec<&str> = declarators.iter().map(|d| source.source_text(*d)).collect();
                    format!("{} {};", kind.keyword(), parts.join(", "))
                }
            })
            .collect()
    }

    const HEADER: &str = "import { comptime } from \"comptime.ts\" with { type: \"comptime\" };\n";

    #[test]
    fn test_untagged_imports_have_no_targets() {
        let (_, analysis) = analyze_text("import { comptime } from \"comptime.ts\";\nconst x = comptime(1);\n");
        assert!(analysis.is_empty());
    }

    #[test]
    fn test_target_boundaries() {
        let text = format!(
            "{}const a = comptime(1 + 2);\nconst b = comptime.value.deep;\nconst c = (comptime)(3);\nconst d = new comptime.Thing(1).x;\n",
            HEADER
        );
        assert_eq!(
            target_texts(&text),
            ["comptime(1 + 2)", "comptime.value.deep", "comptime", "new comptime.Thing(1).x"]
        );
    }

    #[test]
    fn test_tagged_templates_and_optional_chains() {
        let text = format!("{}const a = comptime`x`;\nconst b = comptime?.a.b();\n", HEADER);
        assert_eq!(target_texts(&text), ["comptime`x`", "comptime?.a.b()"]);
    }

    #[test]
    fn test_arguments_are_separate_targets() {
        let text = format!("{}const a = f(comptime(1), comptime(2));\n", HEADER);
        assert_eq!(target_texts(&text), ["comptime(1)", "comptime(2)"]);
    }

    #[test]
    fn test_nested_targets_collapse() {
        let text = format!("{}const a = comptime(comptime(1) + 1);\n", HEADER);
        assert_eq!(target_texts(&text), ["comptime(comptime(1) + 1)"]);
    }

    #[test]
    fn test_shorthand_property() {
        let (_, analysis) = analyze_text(&format!("{}const o = {{ comptime }};\n", HEADER));
        assert_eq!(analysis.targets[0].target.shorthand.as_deref(), Some("comptime"));
    }

    #[test]
    fn test_collapse_is_outermost_first() {
        let t = |start, end| Target {
            span: Span::new(start, end),
            statement: Span::new(0, 100),
            shorthand: None,
        };
        let kept = collapse(vec![t(5, 8), t(0, 10), t(12, 20), t(10, 12), t(15, 16)]);
        let spans: Vec<(usize, usize)> = kept.iter().map(|t| (t.span.start, t.span.end)).collect();
        assert_eq!(spans, [(0, 10), (10, 12), (12, 20)]);
    }

    #[test]
    fn test_slice_follows_dependencies() {
        let text = format!(
            "{}import {{ helper }} from \"./helper\";\nconst unused = 0;\nconst base = 2;\nfunction twice(n: number) {{ return n * base; }}\nexport const result = comptime(helper(twice(3)));\n",
            HEADER
        );
        assert_eq!(
            slice_texts(&text),
            [
                "import comptime",
                "import helper",
                "const base = 2;",
                "function twice(n: number) { return n * base; }",
            ]
        );
    }

    #[test]
    fn test_slice_handles_cycles_and_shared_statements() {
        let text = format!(
            "{}const a = 1, b = a + 1;\nfunction even(n) {{ return n == 0 || odd(n - 1); }}\nfunction odd(n) {{ return n != 0 && even(n - 1); }}\nconst x = comptime([a, b, even(4)]);\n",
            HEADER
        );
        assert_eq!(
            slice_texts(&text),
            [
                "import comptime",
                "const a = 1, b = a + 1;",
                "function even(n) { return n == 0 || odd(n - 1); }",
                "function odd(n) { return n != 0 && even(n - 1); }",
            ]
        );
    }

    #[test]
    fn test_slice_takes_only_needed_declarators() {
        let text = format!(
            "{}let el = document.body, base = 2, unused = f();\nconst x = comptime(base);\n",
            HEADER
        );
        assert_eq!(slice_texts(&text), ["import comptime", "let base = 2;"]);
    }

    #[test]
    fn test_slice_never_repeats_the_target_statement() {
        let text = format!(
            "{}const base = 2, first = comptime(base), later = 3;\nconst again = [base, comptime(first, later)];\n",
            HEADER
        );
        assert_eq!(slice_texts(&text), ["import comptime", "const base = 2;"]);

        // the second target may use the first one's statement, but not its own
        let (source, analysis) = analyze_text(&text);
        let second = &analysis.targets[1];
        assert_eq!(source.source_text(second.target.span), "comptime(first, later)");
        let output = parse(&text, ParseOptions::typescript()).unwrap();
        let bindings = Bindings::bind(&output.module);
        let statements: Vec<String> = second
            .slice
            .items
            .iter()
            .filter_map(|item| match item {
                SliceItem::Declarators { declarators, .. } => Some(
                    declarators
                        .iter()
                        .map(|d| source.source_text(*d))
                        .collect::<Vec<_>>()
                        .join(", "),
                ),
                SliceItem::Import(id) => Some(format!("import {}", bindings.decl(*id).name)),
                SliceItem::Statement(span) => Some(source.source_text(*span).to_string()),
            })
            .collect();
        assert_eq!(
            statements,
            ["import comptime", "base = 2, first = comptime(base), later = 3"]
        );
    }

    #[test]
    fn test_functions_around_the_target_are_kept() {
        let text = format!(
            "{}const f = () => comptime(g()), n = comptime(1);\nfunction g(): number {{ return h(); }}\nfunction h() {{ return 1; }}\n",
            HEADER
        );
        let (source, analysis) = analyze_text(&text);
        assert_eq!(source.source_text(analysis.targets[0].target.span), "comptime(g())");
        assert_eq!(
            slice_texts(&text),
            [
                "import comptime",
                "function g(): number { return h(); }",
                "function h() { return 1; }",
            ]
        );
    }

    #[test]
    fn test_slice_skips_ambient_and_local_declarations() {
        let text = format!(
            "{}declare const env: string;\nconst x = comptime(((k: number) => {{ const y = k; return y; }})(env.length));\n",
            HEADER
        );
        assert_eq!(slice_texts(&text), ["import comptime"]);
    }

    #[test]
    fn test_declaration_files_are_skipped() {
        let source = SourceFile::new(PathBuf::from("/p/types.d.ts"), HEADER);
        let output = parse(HEADER, ParseOptions::typescript()).unwrap();
        let bindings = Bindings::bind(&output.module);
        let parsed = ParsedFile {
            module: output.module,
            bindings,
        };
        assert!(analyze(&source, &parsed).is_empty());
    }
}
