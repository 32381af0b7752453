//! Token types

use crate::util::span::Span;

/// Lexer error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LexError {
    #[error("Unterminated string literal starting at offset {offset}")]
    UnterminatedString { offset: usize },
    #[error("Unterminated template literal starting at offset {offset}")]
    UnterminatedTemplate { offset: usize },
    #[error("Unterminated regular expression starting at offset {offset}")]
    UnterminatedRegex { offset: usize },
    #[error("Unterminated block comment starting at offset {offset}")]
    UnterminatedComment { offset: usize },
    #[error("Invalid escape sequence at offset {offset}")]
    InvalidEscape { offset: usize },
    #[error("Invalid number literal '{text}' at offset {offset}")]
    InvalidNumber { text: String, offset: usize },
    #[error("Unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },
}

impl LexError {
    /// Byte offset the error points at
    pub fn offset(&self) -> usize {
        match self {
            LexError::UnterminatedString { offset }
            | LexError::UnterminatedTemplate { offset }
            | LexError::UnterminatedRegex { offset }
            | LexError::UnterminatedComment { offset }
            | LexError::InvalidEscape { offset }
            | LexError::InvalidNumber { offset, .. }
            | LexError::UnexpectedChar { offset, .. } => *offset,
        }
    }
}

/// Reserved words
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Break,
    Case,
    Catch,
    Class,
    Const,
    Continue,
    Debugger,
    Default,
    Delete,
    Do,
    Else,
    Enum,
    Export,
    Extends,
    False,
    Finally,
    For,
    Function,
    If,
    Import,
    In,
    Instanceof,
    New,
    Null,
    Return,
    Super,
    Switch,
    This,
    Throw,
    True,
    Try,
    Typeof,
    Var,
    Void,
    While,
    With,
}

impl Keyword {
    /// Reserved word for an identifier-shaped string
    pub fn from_str(s: &str) -> Option<Keyword> {
        Some(match s {
            "break" => Keyword::Break,
            "case" => Keyword::Case,
            "catch" => Keyword::Catch,
            "class" => Keyword::Class,
            "const" => Keyword::Const,
            "continue" => Keyword::Continue,
            "debugger" => Keyword::Debugger,
            "default" => Keyword::Default,
            "delete" => Keyword::Delete,
            "do" => Keyword::Do,
            "else" => Keyword::Else,
            "enum" => Keyword::Enum,
            "export" => Keyword::Export,
            "extends" => Keyword::Extends,
            "false" => Keyword::False,
            "finally" => Keyword::Finally,
            "for" => Keyword::For,
            "function" => Keyword::Function,
            "if" => Keyword::If,
            "import" => Keyword::Import,
            "in" => Keyword::In,
            "instanceof" => Keyword::Instanceof,
            "new" => Keyword::New,
            "null" => Keyword::Null,
            "return" => Keyword::Return,
            "super" => Keyword::Super,
            "switch" => Keyword::Switch,
            "this" => Keyword::This,
            "throw" => Keyword::Throw,
            "true" => Keyword::True,
            "try" => Keyword::Try,
            "typeof" => Keyword::Typeof,
            "var" => Keyword::Var,
            "void" => Keyword::Void,
            "while" => Keyword::While,
            "with" => Keyword::With,
            _ => return None,
        })
    }

    /// Source spelling
    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Break => "break",
            Keyword::Case => "case",
            Keyword::Catch => "catch",
            Keyword::Class => "class",
            Keyword::Const => "const",
            Keyword::Continue => "continue",
            Keyword::Debugger => "debugger",
            Keyword::Default => "default",
            Keyword::Delete => "delete",
            Keyword::Do => "do",
            Keyword::Else => "else",
            Keyword::Enum => "enum",
            Keyword::Export => "export",
            Keyword::Extends => "extends",
            Keyword::False => "false",
            Keyword::Finally => "finally",
            Keyword::For => "for",
            Keyword::Function => "function",
            Keyword::If => "if",
            Keyword::Import => "import",
            Keyword::In => "in",
            Keyword::Instanceof => "instanceof",
            Keyword::New => "new",
            Keyword::Null => "null",
            Keyword::Return => "return",
            Keyword::Super => "super",
            Keyword::Switch => "switch",
            Keyword::This => "this",
            Keyword::Throw => "throw",
            Keyword::True => "true",
            Keyword::Try => "try",
            Keyword::Typeof => "typeof",
            Keyword::Var => "var",
            Keyword::Void => "void",
            Keyword::While => "while",
            Keyword::With => "with",
        }
    }
}

/// Punctuators
///
/// `>` is always lexed alone; the parser glues adjacent `>`/`=` tokens back into
/// `>=`, `>>`, `>>>` and their assignment forms so that nested type arguments
/// (`Array<Array<number>>`) close cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Punct {
    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Semicolon,
    Comma,
    Dot,
    DotDotDot,
    QuestionDot,
    Question,
    QuestionQuestion,
    QuestionQuestionEq,
    Colon,
    At,
    Hash,
    Arrow,
    Lt,
    Le,
    Gt,
    Eq,
    EqEq,
    EqEqEq,
    NotEq,
    NotEqEq,
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    Percent,
    PlusPlus,
    MinusMinus,
    LtLt,
    Amp,
    Pipe,
    Caret,
    Tilde,
    Bang,
    AmpAmp,
    PipePipe,
    AmpAmpEq,
    PipePipeEq,
    PlusEq,
    MinusEq,
    StarEq,
    StarStarEq,
    SlashEq,
    PercentEq,
    LtLtEq,
    AmpEq,
    PipeEq,
    CaretEq,
}

impl Punct {
    /// Source spelling
    pub fn as_str(self) -> &'static str {
        match self {
            Punct::LBrace => "{",
            Punct::RBrace => "}",
            Punct::LParen => "(",
            Punct::RParen => ")",
            Punct::LBracket => "[",
            Punct::RBracket => "]",
            Punct::Semicolon => ";",
            Punct::Comma => ",",
            Punct::Dot => ".",
            Punct::DotDotDot => "...",
            Punct::QuestionDot => "?.",
            Punct::Question => "?",
            Punct::QuestionQuestion => "??",
            Punct::QuestionQuestionEq => "??=",
            Punct::Colon => ":",
            Punct::At => "@",
            Punct::Hash => "#",
            Punct::Arrow => "=>",
            Punct::Lt => "<",
            Punct::Le => "<=",
            Punct::Gt => ">",
            Punct::Eq => "=",
            Punct::EqEq => "==",
            Punct::EqEqEq => "===",
            Punct::NotEq => "!=",
            Punct::NotEqEq => "!==",
            Punct::Plus => "+",
            Punct::Minus => "-",
            Punct::Star => "*",
            Punct::StarStar => "**",
            Punct::Slash => "/",
            Punct::Percent => "%",
            Punct::PlusPlus => "++",
            Punct::MinusMinus => "--",
            Punct::LtLt => "<<",
            Punct::Amp => "&",
            Punct::Pipe => "|",
            Punct::Caret => "^",
            Punct::Tilde => "~",
            Punct::Bang => "!",
            Punct::AmpAmp => "&&",
            Punct::PipePipe => "||",
            Punct::AmpAmpEq => "&&=",
            Punct::PipePipeEq => "||=",
            Punct::PlusEq => "+=",
            Punct::MinusEq => "-=",
            Punct::StarEq => "*=",
            Punct::StarStarEq => "**=",
            Punct::SlashEq => "/=",
            Punct::PercentEq => "%=",
            Punct::LtLtEq => "<<=",
            Punct::AmpEq => "&=",
            Punct::PipeEq => "|=",
            Punct::CaretEq => "^=",
        }
    }
}

/// One piece of a template literal, as lexed
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateChunk {
    /// Cooked value (`None` if it contains an invalid escape)
    pub cooked: Option<String>,
    /// Raw source text between the delimiters
    pub raw: String,
}

/// Token kind
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Identifiers, including contextual keywords (`as`, `type`, `async`, ...)
    Identifier(String),
    /// Reserved word
    Keyword(Keyword),
    /// `#name` private class member
    PrivateName(String),
    Number(f64),
    /// Decimal digits of a bigint literal, without the `n`
    BigInt(String),
    String(String),
    /// `` `text` `` with no substitutions
    NoSubstitutionTemplate(TemplateChunk),
    /// `` `text${ ``
    TemplateHead(TemplateChunk),
    /// `}text${`
    TemplateMiddle(TemplateChunk),
    /// `` }text` ``
    TemplateTail(TemplateChunk),
    Regex { pattern: String, flags: String },
    Punct(Punct),
    Eof,
}

impl TokenKind {
    /// Whether this token is the given punctuator
    #[inline]
    pub fn is_punct(
        &self,
        p: Punct,
    ) -> bool {
        matches!(self, TokenKind::Punct(q) if *q == p)
    }

    /// Whether this token is the given reserved word
    #[inline]
    pub fn is_keyword(
        &self,
        k: Keyword,
    ) -> bool {
        matches!(self, TokenKind::Keyword(q) if *q == k)
    }

    /// Whether this token is the identifier `name`
    #[inline]
    pub fn is_ident(
        &self,
        name: &str,
    ) -> bool {
        matches!(self, TokenKind::Identifier(s) if s == name)
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            TokenKind::Identifier(name) => write!(f, "identifier '{}'", name),
            TokenKind::Keyword(kw) => write!(f, "'{}'", kw.as_str()),
            TokenKind::PrivateName(name) => write!(f, "'#{}'", name),
            TokenKind::Number(_) | TokenKind::BigInt(_) => write!(f, "number literal"),
            TokenKind::String(_) => write!(f, "string literal"),
            TokenKind::NoSubstitutionTemplate(_)
            | TokenKind::TemplateHead(_)
            | TokenKind::TemplateMiddle(_)
            | TokenKind::TemplateTail(_) => write!(f, "template literal"),
            TokenKind::Regex { .. } => write!(f, "regular expression"),
            TokenKind::Punct(p) => write!(f, "'{}'", p.as_str()),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}

/// Token with location
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// A line terminator appeared between the previous token and this one
    pub newline_before: bool,
}
