//! Boxed text rendering
//!
//! ```text
//! ┌───────── Compile Error ─┐
//! │ ...                     │
//! └─────────────────────────┘
//! ```

use super::codes::Phase;

const TOP_LEFT: char = '┌';
const TOP_RIGHT: char = '┐';
const BOTTOM_LEFT: char = '└';
const BOTTOM_RIGHT: char = '┘';
const HORIZONTAL: char = '─';
const VERTICAL: char = '│';

/// Draw a single-line border around `text`, each line padded by one space
///
/// A title sits right-aligned in the top border.
pub fn boxed(
    text: &str,
    title: Option<&str>,
) -> String {
    let lines: Vec<String> = text.split('\n').map(|l| format!(" {} ", l.trim_end_matches('\r'))).collect();
    let title = title.map(|t| format!(" {} ", t));
    let title_width = title.as_deref().map(|t| width(t) + 1).unwrap_or(0);
    let inner = lines.iter().map(|l| width(l)).max().unwrap_or(0).max(title_width);

    let mut out = String::new();
    out.push(TOP_LEFT);
    match &title {
        Some(title) => {
            out.extend(std::iter::repeat(HORIZONTAL).take(inner - title_width));
            out.push_str(title);
            out.push(HORIZONTAL);
        }
        None => out.extend(std::iter::repeat(HORIZONTAL).take(inner)),
    }
    out.push(TOP_RIGHT);
    out.push('\n');
    for line in &lines {
        out.push(VERTICAL);
        out.push_str(line);
        out.extend(std::iter::repeat(' ').take(inner - width(line)));
        out.push(VERTICAL);
        out.push('\n');
    }
    out.push(BOTTOM_LEFT);
    out.extend(std::iter::repeat(HORIZONTAL).take(inner));
    out.push(BOTTOM_RIGHT);
    out
}

/// Full error text of a phase: `context` plus the boxed code explanation,
/// framed as a compile error
pub fn compile_error(
    phase: Phase,
    context: Option<&str>,
) -> String {
    let def = phase.definition();
    let explanation = format!("{}\nSee: {}", def.message, def.url());
    let body = match context {
        Some(context) => format!("{}\n\n{}", context, boxed(&explanation, None)),
        None => explanation,
    };
    format!("\n\n{}\n", boxed(&body, Some("Compile Error")))
}

/// Display width, counting tabs as one column like every other char
fn width(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boxed_pads_lines() {
        let out = boxed("ab\nc", None);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines, ["┌────┐", "│ ab │", "│ c  │", "└────┘"]);
    }

    #[test]
    fn test_title_right_aligned() {
        let out = boxed("x", Some("T"));
        assert_eq!(out.lines().next(), Some("┌ T ─┐"));
        assert!(out.lines().all(|l| l.chars().count() == 6));
    }

    #[test]
    fn test_compile_error_embeds_code_link() {
        let out = compile_error(Phase::Evaluate, Some("context here"));
        assert!(out.starts_with("\n\n┌"));
        assert!(out.contains("Compile Error"));
        assert!(out.contains("context here"));
        assert!(out.contains("Error occurred while evaluating the expression."));
        assert!(out.contains("See: https://comptime.js.org/errors#ct_err_evaluate"));
        assert!(out.ends_with("┘\n"));
    }
}
