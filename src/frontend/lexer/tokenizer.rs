//! Tokenizer implementation
//! Main lexer structure and token generation logic

use super::literals::{
    is_identifier_char, is_identifier_start, scan_number, scan_string, scan_template_chunk,
};
use super::tokens::*;
use crate::util::span::Span;

/// Main lexer structure
pub struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    /// One entry per open `{`: `true` when it opened a template substitution
    braces: Vec<bool>,
    /// Whether a `/` at this point starts a regular expression
    regex_allowed: bool,
    pub error: Option<LexError>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: 0,
            braces: Vec::new(),
            regex_allowed: true,
            error: None,
        }
    }

    /// Current byte offset
    #[inline]
    pub fn offset(&self) -> usize {
        self.pos
    }

    /// Rewind to an earlier offset
    #[inline]
    pub fn reset_to(
        &mut self,
        offset: usize,
    ) {
        self.pos = offset;
    }

    /// Source text from `start` to the current offset
    #[inline]
    pub fn slice_from(
        &self,
        start: usize,
    ) -> &'a str {
        &self.source[start..self.pos]
    }

    /// Peek at next character
    #[inline]
    pub fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    /// Peek `n` characters ahead
    #[inline]
    pub fn peek_at(
        &self,
        n: usize,
    ) -> Option<char> {
        self.source[self.pos..].chars().nth(n)
    }

    /// Advance to next character
    #[inline]
    pub fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Skip whitespace and comments, reporting whether a newline was crossed
    fn skip_trivia(&mut self) -> Result<bool, LexError> {
        let mut newline = false;
        while let Some(c) = self.peek() {
            match c {
                '\n' | '\u{2028}' | '\u{2029}' => {
                    newline = true;
                    self.advance();
                }
                c if c.is_whitespace() || c == '\u{feff}' => {
                    self.advance();
                }
                '/' if self.peek_at(1) == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                '/' if self.peek_at(1) == Some('*') => {
                    let start = self.pos;
                    self.advance();
                    self.advance();
                    loop {
                        match self.advance() {
                            None => return Err(LexError::UnterminatedComment { offset: start }),
                            Some('*') if self.peek() == Some('/') => {
                                self.advance();
                                break;
                            }
                            Some('\n') => newline = true,
                            Some(_) => {}
                        }
                    }
                }
                '#' if self.pos == 0 && self.peek_at(1) == Some('!') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
        Ok(newline)
    }

    /// Produce the next token, or `None` at end of input / after an error
    pub fn next_token(&mut self) -> Option<Token> {
        if self.error.is_some() {
            return None;
        }
        match self.lex_token() {
            Ok(Some(token)) => {
                self.regex_allowed = regex_allowed_after(&token.kind);
                Some(token)
            }
            Ok(None) => None,
            Err(err) => {
                self.error = Some(err);
                None
            }
        }
    }

    fn lex_token(&mut self) -> Result<Option<Token>, LexError> {
        let newline_before = self.skip_trivia()?;
        let start = self.pos;
        let Some(c) = self.peek() else {
            return Ok(None);
        };

        let kind = match c {
            '"' | '\'' => scan_string(self)?,
            '`' => {
                self.advance();
                let (chunk, open) = scan_template_chunk(self)?;
                if open {
                    self.braces.push(true);
                    TokenKind::TemplateHead(chunk)
                } else {
                    TokenKind::NoSubstitutionTemplate(chunk)
                }
            }
            '0'..='9' => scan_number(self)?,
            '.' if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => scan_number(self)?,
            '#' if self.peek_at(1).is_some_and(is_identifier_start) => {
                self.advance();
                let name = self.scan_identifier_text();
                TokenKind::PrivateName(name)
            }
            c if is_identifier_start(c) || c == '\\' => {
                let name = self.scan_identifier_text();
                match Keyword::from_str(&name) {
                    Some(kw) => TokenKind::Keyword(kw),
                    None => TokenKind::Identifier(name),
                }
            }
            '/' if self.regex_allowed => self.scan_regex()?,
            '}' if self.braces.last() == Some(&true) => {
                self.braces.pop();
                self.advance();
                let (chunk, open) = scan_template_chunk(self)?;
                if open {
                    self.braces.push(true);
                    TokenKind::TemplateMiddle(chunk)
                } else {
                    TokenKind::TemplateTail(chunk)
                }
            }
            _ => TokenKind::Punct(self.scan_punct()?),
        };

        Ok(Some(Token {
            kind,
            span: Span::new(start, self.pos),
            newline_before,
        }))
    }

    fn scan_identifier_text(&mut self) -> String {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if is_identifier_char(c) {
                name.push(c);
                self.advance();
            } else if c == '\\' && self.peek_at(1) == Some('u') {
                // `\uXXXX` escapes in identifiers
                let save = self.pos;
                self.advance();
                self.advance();
                let hex: String = (0..4).filter_map(|_| self.advance()).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(ch) => name.push(ch),
                    None => {
                        self.reset_to(save);
                        break;
                    }
                }
            } else {
                break;
            }
        }
        name
    }

    fn scan_regex(&mut self) -> Result<TokenKind, LexError> {
        let start = self.pos;
        self.advance();
        let mut pattern = String::new();
        let mut in_class = false;
        loop {
            match self.advance() {
                None | Some('\n') => return Err(LexError::UnterminatedRegex { offset: start }),
                Some('\\') => {
                    pattern.push('\\');
                    match self.advance() {
                        Some(c) if c != '\n' => pattern.push(c),
                        _ => return Err(LexError::UnterminatedRegex { offset: start }),
                    }
                }
                Some('[') => {
                    in_class = true;
                    pattern.push('[');
                }
                Some(']') => {
                    in_class = false;
                    pattern.push(']');
                }
                Some('/') if !in_class => break,
                Some(c) => pattern.push(c),
            }
        }
        let mut flags = String::new();
        while let Some(c) = self.peek() {
            if is_identifier_char(c) {
                flags.push(c);
                self.advance();
            } else {
                break;
            }
        }
        Ok(TokenKind::Regex { pattern, flags })
    }

    fn scan_punct(&mut self) -> Result<Punct, LexError> {
        let rest = &self.source[self.pos..];
        // longest match first
        const TABLE: &[(&str, Punct)] = &[
            ("...", Punct::DotDotDot),
            ("===", Punct::EqEqEq),
            ("!==", Punct::NotEqEq),
            ("**=", Punct::StarStarEq),
            ("<<=", Punct::LtLtEq),
            ("&&=", Punct::AmpAmpEq),
            ("||=", Punct::PipePipeEq),
            ("??=", Punct::QuestionQuestionEq),
            ("=>", Punct::Arrow),
            ("==", Punct::EqEq),
            ("!=", Punct::NotEq),
            ("<=", Punct::Le),
            ("<<", Punct::LtLt),
            ("**", Punct::StarStar),
            ("++", Punct::PlusPlus),
            ("--", Punct::MinusMinus),
            ("&&", Punct::AmpAmp),
            ("||", Punct::PipePipe),
            ("??", Punct::QuestionQuestion),
            ("+=", Punct::PlusEq),
            ("-=", Punct::MinusEq),
            ("*=", Punct::StarEq),
            ("/=", Punct::SlashEq),
            ("%=", Punct::PercentEq),
            ("&=", Punct::AmpEq),
            ("|=", Punct::PipeEq),
            ("^=", Punct::CaretEq),
            ("{", Punct::LBrace),
            ("}", Punct::RBrace),
            ("(", Punct::LParen),
            (")", Punct::RParen),
            ("[", Punct::LBracket),
            ("]", Punct::RBracket),
            (";", Punct::Semicolon),
            (",", Punct::Comma),
            (".", Punct::Dot),
            ("?", Punct::Question),
            (":", Punct::Colon),
            ("@", Punct::At),
            ("#", Punct::Hash),
            ("<", Punct::Lt),
            (">", Punct::Gt),
            ("=", Punct::Eq),
            ("+", Punct::Plus),
            ("-", Punct::Minus),
            ("*", Punct::Star),
            ("/", Punct::Slash),
            ("%", Punct::Percent),
            ("&", Punct::Amp),
            ("|", Punct::Pipe),
            ("^", Punct::Caret),
            ("~", Punct::Tilde),
            ("!", Punct::Bang),
        ];

        // `?.` followed by a digit is a conditional followed by a number
        if rest.starts_with("?.") && !rest[2..].starts_with(|c: char| c.is_ascii_digit()) {
            self.pos += 2;
            return Ok(Punct::QuestionDot);
        }

        for (text, punct) in TABLE {
            if rest.starts_with(text) {
                self.pos += text.len();
                match punct {
                    Punct::LBrace => self.braces.push(false),
                    Punct::RBrace => {
                        self.braces.pop();
                    }
                    _ => {}
                }
                return Ok(*punct);
            }
        }

        let ch = self.peek().unwrap_or('\0');
        Err(LexError::UnexpectedChar {
            ch,
            offset: self.pos,
        })
    }
}

/// Whether a `/` following this token begins a regular expression literal
fn regex_allowed_after(kind: &TokenKind) -> bool {
    match kind {
        TokenKind::Identifier(_)
        | TokenKind::PrivateName(_)
        | TokenKind::Number(_)
        | TokenKind::BigInt(_)
        | TokenKind::String(_)
        | TokenKind::NoSubstitutionTemplate(_)
        | TokenKind::TemplateTail(_)
        | TokenKind::Regex { .. } => false,
        TokenKind::Keyword(kw) => !matches!(
            kw,
            Keyword::This | Keyword::Super | Keyword::True | Keyword::False | Keyword::Null
        ),
        TokenKind::Punct(p) => !matches!(
            p,
            Punct::RParen | Punct::RBracket | Punct::RBrace | Punct::PlusPlus | Punct::MinusMinus
        ),
        _ => true,
    }
}
