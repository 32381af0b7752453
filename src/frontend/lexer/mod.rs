//! Lexer module
//! TypeScript/JavaScript tokenizer split into token definitions, the main
//! tokenizer loop and literal scanning helpers.

pub mod literals;
pub mod tokenizer;
pub mod tokens;

// Re-export types
pub use tokenizer::Lexer;
pub use tokens::{Keyword, LexError, Punct, TemplateChunk, Token, TokenKind};

use crate::util::span::Span;

/// Tokenize source code
///
/// The returned vector always ends with a single `Eof` token.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    tracing::trace!("lexing {} bytes", source.len());

    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();

    while let Some(token) = lexer.next_token() {
        tokens.push(token);
    }

    if let Some(err) = lexer.error {
        return Err(err);
    }

    let end = source.len();
    tokens.push(Token {
        kind: TokenKind::Eof,
        span: Span::new(end, end),
        newline_before: true,
    });
    tracing::trace!("lexed {} tokens", tokens.len());
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_simple_tokenization() {
        let tokens = tokenize("abc").unwrap();
        assert_eq!(tokens.len(), 2);
        assert!(matches!(tokens[0].kind, TokenKind::Identifier(_)));
        assert_eq!(tokens[1].kind, TokenKind::Eof);
    }

    #[test]
    fn test_keywords_and_contextual() {
        let k = kinds("const type = import");
        assert_eq!(k[0], TokenKind::Keyword(Keyword::Const));
        assert_eq!(k[1], TokenKind::Identifier("type".into()));
        assert_eq!(k[2], TokenKind::Punct(Punct::Eq));
        assert_eq!(k[3], TokenKind::Keyword(Keyword::Import));
    }

    #[test]
    fn test_template_with_substitution() {
        let k = kinds("`a${b}c${ {d} }e`");
        assert!(matches!(&k[0], TokenKind::TemplateHead(c) if c.raw == "a"));
        assert_eq!(k[1], TokenKind::Identifier("b".into()));
        assert!(matches!(&k[2], TokenKind::TemplateMiddle(c) if c.raw == "c"));
        assert_eq!(k[3], TokenKind::Punct(Punct::LBrace));
        assert_eq!(k[5], TokenKind::Punct(Punct::RBrace));
        assert!(matches!(&k[6], TokenKind::TemplateTail(c) if c.raw == "e"));
    }

    #[test]
    fn test_regex_vs_division() {
        let k = kinds("a / b");
        assert_eq!(k[1], TokenKind::Punct(Punct::Slash));
        let k = kinds("x = /ab+c/gi");
        assert_eq!(
            k[2],
            TokenKind::Regex {
                pattern: "ab+c".into(),
                flags: "gi".into()
            }
        );
    }

    #[test]
    fn test_gt_is_never_glued() {
        let k = kinds("a >>= b");
        assert_eq!(k[1], TokenKind::Punct(Punct::Gt));
        assert_eq!(k[2], TokenKind::Punct(Punct::Gt));
        assert_eq!(k[3], TokenKind::Punct(Punct::Eq));
    }

    #[test]
    fn test_newline_tracking() {
        let tokens = tokenize("a\n// c\nb /* x\n */ c").unwrap();
        assert!(!tokens[0].newline_before);
        assert!(tokens[1].newline_before);
        assert!(tokens[2].newline_before);
    }

    #[test]
    fn test_optional_chaining_vs_conditional() {
        let k = kinds("a?.b");
        assert_eq!(k[1], TokenKind::Punct(Punct::QuestionDot));
        let k = kinds("a?.5:1");
        assert_eq!(k[1], TokenKind::Punct(Punct::Question));
        assert_eq!(k[2], TokenKind::Number(0.5));
    }

    #[test]
    fn test_unterminated_string() {
        assert!(matches!(
            tokenize("'abc"),
            Err(LexError::UnterminatedString { offset: 0 })
        ));
    }
}
