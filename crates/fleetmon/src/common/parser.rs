use std::fmt::Write;

use anyhow::anyhow;
use chumsky::Parser;
use chumsky::error::{Simple, SimpleReason};
use chumsky::primitive::{end, filter};
use colored::Color;

/// Parser over the characters of a short command-line or configuration value.
pub trait CharParser<T>: Parser<char, T, Error = Simple<char>> + Sized {
    fn parse_text(&self, input: &str) -> anyhow::Result<T> {
        self.parse(input)
            .map_err(|errors| anyhow!("{}", format_errors_cli(input, errors)))
    }
}
impl<T, P> CharParser<T> for P where P: Parser<char, T, Error = Simple<char>> {}

#[cfg(not(test))]
fn color_string<S: AsRef<str>>(string: S, color: Color) -> colored::ColoredString {
    use colored::Colorize;
    string.as_ref().color(color)
}

#[cfg(test)]
fn color_string<S: AsRef<str>>(string: S, _color: Color) -> String {
    string.as_ref().to_string()
}

fn expected_tokens(error: &Simple<char>) -> String {
    let mut expected: Vec<String> = error
        .expected()
        .map(|token| match token {
            Some(c) => format!("`{c}`"),
            None => "end of input".to_string(),
        })
        .collect();
    if expected.is_empty() {
        return "something else".to_string();
    }
    expected.sort_unstable();
    expected.join(" or ")
}

/// Renders the first parse error as a header line followed by the input with
/// a note placed under the offending position.
pub fn format_errors_cli(input: &str, errors: Vec<Simple<char>>) -> String {
    let Some(error) = errors.into_iter().next() else {
        return format!("Cannot parse `{input}`");
    };

    let mut output = String::new();
    let found = match error.found() {
        Some(c) => format!("Unexpected token `{c}`"),
        None => "Unexpected end of input".to_string(),
    };
    let label = error
        .label()
        .map(|label| format!(" while attempting to parse {}", color_string(label, Color::Yellow)))
        .unwrap_or_default();
    writeln!(
        output,
        "{found} found{label}, expected {}:",
        color_string(expected_tokens(&error), Color::Blue)
    )
    .unwrap();

    if input.is_empty() {
        output.push_str("(the input was empty)");
        return output;
    }

    let note = match error.reason() {
        SimpleReason::Custom(message) => message.clone(),
        _ => found,
    };
    let offset = input.chars().take(error.span().start).count();
    writeln!(output, "  {input}").unwrap();
    writeln!(
        output,
        "  {}{}",
        " ".repeat(offset),
        color_string(format!("--- {note}"), Color::Red)
    )
    .unwrap();
    output
}

/// Parses a 4-byte unsigned integer written in decimal digits.
pub fn parse_u32() -> impl CharParser<u32> {
    filter(|c: &char| c.is_ascii_digit())
        .repeated()
        .at_least(1)
        .collect::<String>()
        .labelled("number")
        .try_map(|digits, span| {
            digits
                .parse::<u32>()
                .map_err(|_| Simple::custom(span, "Cannot parse as 4-byte unsigned integer"))
        })
}

/// Fails if any input follows the text consumed by `parser`.
pub fn all_consuming<T>(parser: impl CharParser<T>) -> impl CharParser<T> {
    parser.then_ignore(end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::utils::expect_parser_error;

    #[test]
    fn test_parse_u32() {
        assert_eq!(parse_u32().parse_text("0").unwrap(), 0);
        assert_eq!(parse_u32().parse_text("1").unwrap(), 1);
        assert_eq!(parse_u32().parse_text("1019").unwrap(), 1019);
        assert_eq!(parse_u32().parse_text("007").unwrap(), 7);
    }

    #[test]
    fn test_parse_u32_empty() {
        let error = expect_parser_error(parse_u32(), "");
        assert!(error.starts_with("Unexpected end of input found"));
        assert!(error.ends_with("(the input was empty)"));
    }

    #[test]
    fn test_parse_u32_overflow() {
        let error = expect_parser_error(all_consuming(parse_u32()), "99999999999");
        assert!(error.contains("Cannot parse as 4-byte unsigned integer"));
    }

    #[test]
    fn test_error_note_under_offending_token() {
        let error = expect_parser_error(all_consuming(parse_u32()), "12x");
        assert!(error.starts_with("Unexpected token `x` found"));
        assert!(error.ends_with("  12x\n    --- Unexpected token `x`\n"));
    }

    #[test]
    fn test_parse_u32_trailing_input() {
        assert!(all_consuming(parse_u32()).parse_text("12x").is_err());
        assert!(all_consuming(parse_u32()).parse_text("1_2").is_err());
    }
}
