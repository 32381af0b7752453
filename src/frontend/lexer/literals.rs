//! Literal scanning helpers: numbers, strings, escapes, identifiers

use super::tokenizer::Lexer;
use super::tokens::{LexError, TemplateChunk, TokenKind};

/// Check if character can start an identifier
#[inline]
pub fn is_identifier_start(c: char) -> bool {
    c == '$' || c == '_' || unicode_ident::is_xid_start(c)
}

/// Check if character can continue an identifier
#[inline]
pub fn is_identifier_char(c: char) -> bool {
    c == '$' || c == '\u{200c}' || c == '\u{200d}' || unicode_ident::is_xid_continue(c)
}

/// Scan a numeric literal starting at the current position
pub fn scan_number(lexer: &mut Lexer<'_>) -> Result<TokenKind, LexError> {
    let start = lexer.offset();
    let first = lexer.peek().unwrap_or('0');
    let second = lexer.peek_at(1);

    let radix = match (first, second) {
        ('0', Some('x' | 'X')) => 16,
        ('0', Some('o' | 'O')) => 8,
        ('0', Some('b' | 'B')) => 2,
        _ => 10,
    };

    if radix != 10 {
        lexer.advance();
        lexer.advance();
        let digits = take_digits(lexer, |c| c.is_digit(radix));
        if lexer.peek() == Some('n') {
            lexer.advance();
            let value = num_bigint::BigInt::parse_bytes(digits.as_bytes(), radix).ok_or_else(|| {
                LexError::InvalidNumber {
                    text: lexer.slice_from(start).to_string(),
                    offset: start,
                }
            })?;
            return Ok(TokenKind::BigInt(value.to_string()));
        }
        return u128::from_str_radix(&digits, radix)
            .map(|v| TokenKind::Number(v as f64))
            .map_err(|_| LexError::InvalidNumber {
                text: lexer.slice_from(start).to_string(),
                offset: start,
            });
    }

    let mut text = take_digits(lexer, |c| c.is_ascii_digit());
    if lexer.peek() == Some('n') {
        lexer.advance();
        return Ok(TokenKind::BigInt(text));
    }
    if lexer.peek() == Some('.') {
        lexer.advance();
        text.push('.');
        text.push_str(&take_digits(lexer, |c| c.is_ascii_digit()));
    }
    if matches!(lexer.peek(), Some('e' | 'E')) {
        let sign = lexer.peek_at(1);
        let has_exponent = match sign {
            Some('+' | '-') => lexer.peek_at(2).is_some_and(|c| c.is_ascii_digit()),
            Some(c) => c.is_ascii_digit(),
            None => false,
        };
        if has_exponent {
            lexer.advance();
            text.push('e');
            if let Some(s @ ('+' | '-')) = lexer.peek() {
                lexer.advance();
                text.push(s);
            }
            text.push_str(&take_digits(lexer, |c| c.is_ascii_digit()));
        }
    }
    if lexer.peek().is_some_and(is_identifier_start) {
        return Err(LexError::InvalidNumber {
            text: lexer.slice_from(start).to_string(),
            offset: start,
        });
    }

    text.parse::<f64>()
        .map(TokenKind::Number)
        .map_err(|_| LexError::InvalidNumber {
            text: lexer.slice_from(start).to_string(),
            offset: start,
        })
}

/// Take digits accepted by `accept`, skipping numeric separators
fn take_digits(
    lexer: &mut Lexer<'_>,
    accept: impl Fn(char) -> bool,
) -> String {
    let mut digits = String::new();
    while let Some(c) = lexer.peek() {
        if accept(c) {
            digits.push(c);
            lexer.advance();
        } else if c == '_' && lexer.peek_at(1).is_some_and(&accept) {
            lexer.advance();
        } else {
            break;
        }
    }
    digits
}

/// Scan a quoted string literal; the opening quote is the current character
pub fn scan_string(lexer: &mut Lexer<'_>) -> Result<TokenKind, LexError> {
    let start = lexer.offset();
    let quote = lexer.advance().unwrap_or('"');
    let mut value = String::new();

    loop {
        match lexer.peek() {
            None | Some('\n') => return Err(LexError::UnterminatedString { offset: start }),
            Some(c) if c == quote => {
                lexer.advance();
                return Ok(TokenKind::String(value));
            }
            Some('\\') => {
                lexer.advance();
                if let Some(c) = scan_escape(lexer)? {
                    value.push_str(&c);
                }
            }
            Some(c) => {
                lexer.advance();
                value.push(c);
            }
        }
    }
}

/// Scan one template chunk after the opening `` ` `` or closing `}`
///
/// Returns the chunk and whether it ended with `${` (true) or a backtick.
pub fn scan_template_chunk(lexer: &mut Lexer<'_>) -> Result<(TemplateChunk, bool), LexError> {
    let start = lexer.offset();
    let mut cooked = Some(String::new());
    let mut raw = String::new();

    loop {
        match lexer.peek() {
            None => return Err(LexError::UnterminatedTemplate { offset: start }),
            Some('`') => {
                lexer.advance();
                return Ok((TemplateChunk { cooked, raw }, false));
            }
            Some('$') if lexer.peek_at(1) == Some('{') => {
                lexer.advance();
                lexer.advance();
                return Ok((TemplateChunk { cooked, raw }, true));
            }
            Some('\\') => {
                let esc_start = lexer.offset();
                lexer.advance();
                let escaped = scan_escape(lexer);
                raw.push_str(lexer.slice_from(esc_start));
                match (escaped, cooked.as_mut()) {
                    (Ok(Some(s)), Some(c)) => c.push_str(&s),
                    (Ok(None), _) => {}
                    (Err(_), _) => cooked = None,
                    (Ok(Some(_)), None) => {}
                }
            }
            Some('\r') => {
                lexer.advance();
                if lexer.peek() == Some('\n') {
                    lexer.advance();
                }
                raw.push('\n');
                if let Some(c) = cooked.as_mut() {
                    c.push('\n');
                }
            }
            Some(c) => {
                lexer.advance();
                raw.push(c);
                if let Some(cooked) = cooked.as_mut() {
                    cooked.push(c);
                }
            }
        }
    }
}

/// Scan an escape sequence after the backslash
///
/// Returns `None` for a line continuation.
fn scan_escape(lexer: &mut Lexer<'_>) -> Result<Option<String>, LexError> {
    let offset = lexer.offset();
    let Some(c) = lexer.advance() else {
        return Err(LexError::InvalidEscape { offset });
    };
    let ch = match c {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        'b' => '\u{8}',
        'f' => '\u{c}',
        'v' => '\u{b}',
        '0' if !lexer.peek().is_some_and(|c| c.is_ascii_digit()) => '\0',
        'x' => {
            let hex = take_exact_hex(lexer, 2).ok_or(LexError::InvalidEscape { offset })?;
            char::from_u32(hex).ok_or(LexError::InvalidEscape { offset })?
        }
        'u' => {
            let code = if lexer.peek() == Some('{') {
                lexer.advance();
                let mut value = 0u32;
                let mut any = false;
                while let Some(d) = lexer.peek().and_then(|c| c.to_digit(16)) {
                    lexer.advance();
                    value = value.saturating_mul(16).saturating_add(d);
                    any = true;
                }
                if !any || lexer.advance() != Some('}') {
                    return Err(LexError::InvalidEscape { offset });
                }
                value
            } else {
                let high = take_exact_hex(lexer, 4).ok_or(LexError::InvalidEscape { offset })?;
                if (0xD800..0xDC00).contains(&high)
                    && lexer.peek() == Some('\\')
                    && lexer.peek_at(1) == Some('u')
                {
                    let save = lexer.offset();
                    lexer.advance();
                    lexer.advance();
                    match take_exact_hex(lexer, 4) {
                        Some(low) if (0xDC00..0xE000).contains(&low) => {
                            0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)
                        }
                        _ => {
                            lexer.reset_to(save);
                            0xFFFD
                        }
                    }
                } else {
                    high
                }
            };
            char::from_u32(code).unwrap_or('\u{FFFD}')
        }
        '\r' => {
            if lexer.peek() == Some('\n') {
                lexer.advance();
            }
            return Ok(None);
        }
        '\n' | '\u{2028}' | '\u{2029}' => return Ok(None),
        c if c.is_ascii_digit() => return Err(LexError::InvalidEscape { offset }),
        other => other,
    };
    Ok(Some(ch.to_string()))
}

fn take_exact_hex(
    lexer: &mut Lexer<'_>,
    count: usize,
) -> Option<u32> {
    let mut value = 0u32;
    for _ in 0..count {
        let d = lexer.peek()?.to_digit(16)?;
        lexer.advance();
        value = value * 16 + d;
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use crate::frontend::lexer::{tokenize, TokenKind};

    fn first(source: &str) -> TokenKind {
        tokenize(source).unwrap()[0].kind.clone()
    }

    #[test]
    fn test_numbers() {
        assert_eq!(first("42"), TokenKind::Number(42.0));
        assert_eq!(first("1_000.5"), TokenKind::Number(1000.5));
        assert_eq!(first("0xff"), TokenKind::Number(255.0));
        assert_eq!(first("1e3"), TokenKind::Number(1000.0));
        assert_eq!(first(".5"), TokenKind::Number(0.5));
        assert_eq!(first("12n"), TokenKind::BigInt("12".into()));
        assert_eq!(first("0x10n"), TokenKind::BigInt("16".into()));
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(first(r#""a\nb""#), TokenKind::String("a\nb".into()));
        assert_eq!(first(r"'A\x42'"), TokenKind::String("AB".into()));
        assert_eq!(first(r"'\u{1F600}'"), TokenKind::String("\u{1F600}".into()));
        assert_eq!(first(r"'😀'"), TokenKind::String("\u{1F600}".into()));
    }

    #[test]
    fn test_invalid_number_suffix() {
        assert!(tokenize("3in").is_err());
    }
}
