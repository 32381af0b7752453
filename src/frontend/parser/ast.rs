//! Abstract Syntax Tree types
//!
//! Every node carries the byte span of its source text. Type annotations are
//! parsed for their extent only; their spans are collected separately by the
//! parser (see [`super::ParseOutput`]) so that erasure can blank them out.

use std::sync::Arc;

pub use crate::frontend::lexer::TemplateChunk;
use crate::util::span::Span;

/// A parsed source file or function body
#[derive(Debug, Clone)]
pub struct Module {
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// Identifier with location
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

/// String literal with location (module specifiers, attribute values)
#[derive(Debug, Clone, PartialEq)]
pub struct StrLit {
    pub value: String,
    pub span: Span,
}

/// Literal values
#[derive(Debug, Clone, PartialEq)]
pub enum Lit {
    Null,
    Bool(bool),
    Number(f64),
    /// Decimal digits
    BigInt(String),
    String(String),
    Regex { pattern: String, flags: String },
}

/// Expression
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

/// Expression kind
#[derive(Debug, Clone)]
pub enum ExprKind {
    Ident(Ident),
    This,
    Super,
    Lit(Lit),
    Template(Template),
    TaggedTemplate {
        tag: Box<Expr>,
        quasi: Template,
    },
    Array(Vec<Option<ExprOrSpread>>),
    Object(Vec<Prop>),
    Function(Arc<Function>),
    Arrow(Arc<Function>),
    Class(Arc<Class>),
    Unary {
        op: UnaryOp,
        arg: Box<Expr>,
    },
    Update {
        op: UpdateOp,
        prefix: bool,
        arg: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Assign {
        op: AssignOp,
        target: Box<Pattern>,
        value: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        cons: Box<Expr>,
        alt: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<ExprOrSpread>,
        optional: bool,
    },
    New {
        callee: Box<Expr>,
        args: Vec<ExprOrSpread>,
    },
    Member {
        object: Box<Expr>,
        property: MemberProp,
        optional: bool,
    },
    /// Wraps a member/call chain containing `?.` so it short-circuits as a whole
    OptChain(Box<Expr>),
    Seq(Vec<Expr>),
    Paren(Box<Expr>),
    Await(Box<Expr>),
    /// `yield arg` / `yield* arg`
    Yield {
        arg: Option<Box<Expr>>,
        delegate: bool,
    },
    /// `import(specifier)`
    Import(Box<Expr>),
    /// `import.meta` / `new.target`
    MetaProperty { meta: String, property: String },
    /// `e as T`, `e satisfies T`, `<T>e`, `e!`: evaluates to `e`
    TypeCast(Box<Expr>),
}

/// Property of a member expression
#[derive(Debug, Clone)]
pub enum MemberProp {
    /// `.name` (a field name, never a binding)
    Ident(Ident),
    /// `.#name`
    Private(Ident),
    /// `[expr]`
    Computed(Box<Expr>),
}

/// Argument or array element, possibly spread
#[derive(Debug, Clone)]
pub struct ExprOrSpread {
    pub spread: bool,
    pub expr: Expr,
}

/// Template literal
#[derive(Debug, Clone)]
pub struct Template {
    pub quasis: Vec<TemplateChunk>,
    pub exprs: Vec<Expr>,
    pub span: Span,
}

/// Property key
#[derive(Debug, Clone)]
pub enum PropName {
    Ident(Ident),
    Str(StrLit),
    Num(f64, Span),
    Computed(Box<Expr>),
    Private(Ident),
}

impl PropName {
    /// Static key text, if the key is not computed
    pub fn static_name(&self) -> Option<String> {
        match self {
            PropName::Ident(id) => Some(id.name.clone()),
            PropName::Str(s) => Some(s.value.clone()),
            PropName::Num(n, _) => Some(crate::runtime::value::number_to_string(*n)),
            PropName::Private(id) => Some(format!("#{}", id.name)),
            PropName::Computed(_) => None,
        }
    }
}

/// Getter/setter/method discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Method,
    Getter,
    Setter,
}

/// Object literal member
#[derive(Debug, Clone)]
pub enum Prop {
    KeyValue { key: PropName, value: Expr },
    Shorthand(Ident),
    Method { key: PropName, kind: MethodKind, func: Arc<Function> },
    Spread(Expr),
}

/// Binding or assignment pattern
#[derive(Debug, Clone)]
pub struct Pattern {
    pub kind: PatternKind,
    pub span: Span,
}

/// Pattern kind
#[derive(Debug, Clone)]
pub enum PatternKind {
    Ident(Ident),
    Object {
        props: Vec<ObjectPatProp>,
        rest: Option<Box<Pattern>>,
    },
    Array {
        elems: Vec<Option<Pattern>>,
        rest: Option<Box<Pattern>>,
    },
    /// `target = default`
    Default {
        target: Box<Pattern>,
        default: Box<Expr>,
    },
    /// Member expression target (assignment patterns only)
    Expr(Box<Expr>),
}

/// `key: pattern` inside an object pattern
#[derive(Debug, Clone)]
pub struct ObjectPatProp {
    pub key: PropName,
    pub value: Pattern,
}

/// Function, arrow function, method or constructor
#[derive(Debug, Clone)]
pub struct Function {
    pub name: Option<Ident>,
    pub params: Vec<Param>,
    pub body: FunctionBody,
    pub is_async: bool,
    pub is_arrow: bool,
    pub is_generator: bool,
    pub span: Span,
}

/// Function body
#[derive(Debug, Clone)]
pub enum FunctionBody {
    Block(Vec<Stmt>),
    /// Concise arrow body
    Expr(Box<Expr>),
    /// Overload signature, abstract or ambient declaration
    None,
}

/// Function parameter
#[derive(Debug, Clone)]
pub struct Param {
    pub pattern: Pattern,
    pub rest: bool,
    pub span: Span,
}

/// Class declaration or expression
#[derive(Debug, Clone)]
pub struct Class {
    pub name: Option<Ident>,
    pub super_class: Option<Box<Expr>>,
    pub members: Vec<ClassMember>,
    pub span: Span,
}

/// Class member
#[derive(Debug, Clone)]
pub enum ClassMember {
    Constructor(Arc<Function>),
    Method {
        key: PropName,
        kind: MethodKind,
        func: Arc<Function>,
        is_static: bool,
    },
    Field {
        key: PropName,
        value: Option<Expr>,
        is_static: bool,
        span: Span,
    },
    StaticBlock(Vec<Stmt>),
}

/// Statement
#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

/// Statement kind
#[derive(Debug, Clone)]
pub enum StmtKind {
    Expr(Expr),
    Var(VarDecl),
    Function(Arc<Function>),
    Class(Arc<Class>),
    Enum(EnumDecl),
    Import(ImportDecl),
    Export(ExportDecl),
    /// `interface` or `type` alias: no runtime value
    TypeDecl(Ident),
    /// `namespace X { ... }` / `module X { ... }`
    Namespace { name: Ident, body: Vec<Stmt> },
    /// `declare ...`: ambient, no runtime value
    Declare(Box<Stmt>),
    Block(Vec<Stmt>),
    If {
        test: Expr,
        cons: Box<Stmt>,
        alt: Option<Box<Stmt>>,
    },
    For {
        init: Option<ForInit>,
        test: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
    },
    ForIn {
        left: ForHead,
        right: Expr,
        body: Box<Stmt>,
    },
    ForOf {
        left: ForHead,
        right: Expr,
        body: Box<Stmt>,
        is_await: bool,
    },
    While {
        test: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        test: Expr,
    },
    Return(Option<Expr>),
    Break(Option<Ident>),
    Continue(Option<Ident>),
    Throw(Expr),
    Try {
        block: Vec<Stmt>,
        handler: Option<CatchClause>,
        finalizer: Option<Vec<Stmt>>,
    },
    Switch {
        discriminant: Expr,
        cases: Vec<SwitchCase>,
    },
    Labeled {
        label: Ident,
        body: Box<Stmt>,
    },
    Empty,
    Debugger,
}

/// `var` / `let` / `const`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Var,
    Let,
    Const,
}

impl VarKind {
    pub fn keyword(self) -> &'static str {
        match self {
            VarKind::Var => "var",
            VarKind::Let => "let",
            VarKind::Const => "const",
        }
    }
}

/// Variable declaration statement
#[derive(Debug, Clone)]
pub struct VarDecl {
    pub kind: VarKind,
    pub decls: Vec<VarDeclarator>,
}

/// One `pattern = init` in a declaration
#[derive(Debug, Clone)]
pub struct VarDeclarator {
    pub pattern: Pattern,
    pub init: Option<Expr>,
    pub span: Span,
}

/// `for (init; ...)` initializer
#[derive(Debug, Clone)]
pub enum ForInit {
    Var(VarDecl),
    Expr(Expr),
}

/// Left side of `for-in` / `for-of`
#[derive(Debug, Clone)]
pub enum ForHead {
    Var(VarKind, Pattern),
    Pattern(Pattern),
}

/// `catch (param) { body }`
#[derive(Debug, Clone)]
pub struct CatchClause {
    pub param: Option<Pattern>,
    pub body: Vec<Stmt>,
}

/// `case test: body` (`test` is `None` for `default`)
#[derive(Debug, Clone)]
pub struct SwitchCase {
    pub test: Option<Expr>,
    pub body: Vec<Stmt>,
}

/// `enum Name { A, B = 2 }`
#[derive(Debug, Clone)]
pub struct EnumDecl {
    pub name: Ident,
    pub members: Vec<EnumMember>,
    pub is_const: bool,
}

/// Enum member
#[derive(Debug, Clone)]
pub struct EnumMember {
    pub name: String,
    pub span: Span,
    pub init: Option<Expr>,
}

/// Import statement
#[derive(Debug, Clone)]
pub struct ImportDecl {
    pub default: Option<Ident>,
    pub namespace: Option<Ident>,
    pub named: Vec<ImportSpecifier>,
    pub source: StrLit,
    pub attributes: Vec<ImportAttribute>,
    /// `import type ...`
    pub type_only: bool,
}

impl ImportDecl {
    /// Whether any attribute value is `comptime`
    pub fn is_comptime(&self) -> bool {
        self.attributes.iter().any(|a| a.value.value == "comptime")
    }
}

/// `imported as local` inside `{ ... }`
#[derive(Debug, Clone)]
pub struct ImportSpecifier {
    pub imported: String,
    pub local: Ident,
    /// `import { type X }`
    pub type_only: bool,
    pub span: Span,
}

/// `key: "value"` inside `with { ... }` / `assert { ... }`
#[derive(Debug, Clone)]
pub struct ImportAttribute {
    pub key: String,
    pub value: StrLit,
}

/// Export forms
#[derive(Debug, Clone)]
pub enum ExportDecl {
    /// `export <declaration>`
    Decl(Box<Stmt>),
    /// `export default <expr | function | class>`
    Default(Box<DefaultExport>),
    /// `export { a as b } [from "m"]`
    Named {
        specifiers: Vec<ExportSpecifier>,
        source: Option<StrLit>,
        type_only: bool,
    },
    /// `export * [as ns] from "m"`
    All {
        alias: Option<String>,
        source: StrLit,
    },
}

/// What an `export default` carries
#[derive(Debug, Clone)]
pub enum DefaultExport {
    Function(Arc<Function>),
    Class(Arc<Class>),
    Expr(Expr),
}

/// `local as exported`
#[derive(Debug, Clone)]
pub struct ExportSpecifier {
    pub local: Ident,
    pub exported: String,
    pub type_only: bool,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
    Not,
    BitNot,
    Typeof,
    Void,
    Delete,
}

/// `++` / `--`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    Inc,
    Dec,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Exp,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Shl,
    Shr,
    UShr,
    BitAnd,
    BitOr,
    BitXor,
    In,
    Instanceof,
}

/// Short-circuiting operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

/// Assignment operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    /// Compound arithmetic/bitwise assignment
    Binary(BinaryOp),
    /// `&&=`, `||=`, `??=`
    Logical(LogicalOp),
}
