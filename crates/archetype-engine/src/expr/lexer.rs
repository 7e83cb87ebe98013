// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Tokenizer for the expression language.
//!
//! The overall scan is hand-rolled (a single pass with a cursor), but the
//! three literal sub-grammars — quoted strings, integers, and list
//! literals — are parsed with `nom` combinators, since those have enough
//! internal structure (escaping, separators) to benefit from it without
//! needing `nom` to arbitrate operator precedence, which it fits poorly.

use super::token::{Operand, Operator, Token};
use nom::branch::alt;
use nom::bytes::complete::{tag, take_while};
use nom::character::complete::{char as nom_char, digit1, multispace0};
use nom::combinator::{map, map_res, opt, recognize, value};
use nom::multi::separated_list0;
use nom::sequence::{delimited, pair, preceded};
use nom::IResult;
use thiserror::Error;

/// Failure to tokenize or parse expression source text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("expression format error at column {column}: {message}")]
pub struct ExprFormatError {
    /// 1-indexed column where the scan failed.
    pub column: usize,
    /// Human-readable description.
    pub message: String,
}

impl ExprFormatError {
    fn at(column: usize, message: impl Into<String>) -> Self {
        ExprFormatError {
            column,
            message: message.into(),
        }
    }
}

fn parse_quoted_string(input: &str) -> IResult<&str, String> {
    map(
        delimited(nom_char('\''), take_while(|c| c != '\''), nom_char('\'')),
        |s: &str| s.to_string(),
    )(input)
}

fn parse_int(input: &str) -> IResult<&str, i64> {
    map_res(recognize(pair(opt(nom_char('-')), digit1)), |s: &str| {
        s.parse::<i64>()
    })(input)
}

fn parse_bool(input: &str) -> IResult<&str, bool> {
    alt((value(true, tag("true")), value(false, tag("false"))))(input)
}

fn parse_list(input: &str) -> IResult<&str, Vec<String>> {
    delimited(
        nom_char('['),
        separated_list0(
            delimited(multispace0, nom_char(','), multispace0),
            preceded(multispace0, parse_quoted_string),
        ),
        preceded(multispace0, nom_char(']')),
    )(input)
}

fn is_path_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.'
}

/// Tokenizes a bare expression body (no outer `` ` `` or `#{}` delimiters —
/// those are stripped by the caller before tokenizing).
pub fn tokenize(input: &str) -> Result<Vec<Token>, ExprFormatError> {
    let mut tokens = Vec::new();
    let mut rest = input;
    let mut consumed = 0usize;

    loop {
        let trimmed = rest.trim_start();
        consumed += rest.len() - trimmed.len();
        rest = trimmed;
        if rest.is_empty() {
            break;
        }

        let column = consumed + 1;
        let mut chars = rest.chars();
        let c0 = chars.next().unwrap();

        if let Some(tok) = match_fixed_operator(rest) {
            let (op, len) = tok;
            tokens.push(Token::Operator(op));
            rest = &rest[len..];
            consumed += len;
            continue;
        }

        if c0 == '\'' {
            let (remaining, s) = parse_quoted_string(rest)
                .map_err(|_| ExprFormatError::at(column, "unterminated string literal"))?;
            let len = rest.len() - remaining.len();
            tokens.push(Token::Operand(Operand::Str(s)));
            rest = remaining;
            consumed += len;
            continue;
        }

        if c0 == '[' {
            let (remaining, items) = parse_list(rest)
                .map_err(|_| ExprFormatError::at(column, "invalid list literal"))?;
            let len = rest.len() - remaining.len();
            tokens.push(Token::Operand(Operand::List(items)));
            rest = remaining;
            consumed += len;
            continue;
        }

        if c0 == '$' && rest.as_bytes().get(1) == Some(&b'{') {
            let inner_start = &rest[2..];
            let end = inner_start
                .find('}')
                .ok_or_else(|| ExprFormatError::at(column, "unterminated ${...} reference"))?;
            let path = &inner_start[..end];
            tokens.push(Token::Variable(path.to_string()));
            let len = 2 + end + 1;
            rest = &rest[len..];
            consumed += len;
            continue;
        }

        if c0.is_ascii_digit() || (c0 == '-' && chars.next().is_some_and(|n| n.is_ascii_digit())) {
            let (remaining, i) = parse_int(rest)
                .map_err(|_| ExprFormatError::at(column, "invalid integer literal"))?;
            let len = rest.len() - remaining.len();
            tokens.push(Token::Operand(Operand::Int(i)));
            rest = remaining;
            consumed += len;
            continue;
        }

        if c0.is_ascii_alphabetic() || c0 == '_' || c0 == '~' {
            let ident_len = rest
                .char_indices()
                .find(|&(_, c)| !(is_path_char(c) || c == '~'))
                .map(|(i, _)| i)
                .unwrap_or(rest.len());
            let ident = &rest[..ident_len];
            match ident {
                "true" | "false" => {
                    let (remaining, b) = parse_bool(rest).expect("matched literal prefix");
                    tokens.push(Token::Operand(Operand::Bool(b)));
                    let len = rest.len() - remaining.len();
                    rest = remaining;
                    consumed += len;
                }
                "contains" => {
                    tokens.push(Token::Operator(Operator::Contains));
                    rest = &rest[ident_len..];
                    consumed += ident_len;
                }
                _ => {
                    tokens.push(Token::Variable(ident.to_string()));
                    rest = &rest[ident_len..];
                    consumed += ident_len;
                }
            }
            continue;
        }

        return Err(ExprFormatError::at(
            column,
            format!("unexpected character '{c0}'"),
        ));
    }

    Ok(tokens)
}

fn match_fixed_operator(input: &str) -> Option<(Operator, usize)> {
    const TWO_CHAR: &[(&str, Operator)] = &[
        ("&&", Operator::And),
        ("||", Operator::Or),
        ("==", Operator::Eq),
        ("!=", Operator::Ne),
        (">=", Operator::Ge),
        ("<=", Operator::Le),
    ];
    for (sym, op) in TWO_CHAR {
        if input.starts_with(sym) {
            return Some((*op, sym.len()));
        }
    }
    const ONE_CHAR: &[(char, Operator)] = &[
        ('!', Operator::Not),
        ('>', Operator::Gt),
        ('<', Operator::Lt),
        ('(', Operator::LParen),
        (')', Operator::RParen),
        ('?', Operator::Question),
        (':', Operator::Colon),
    ];
    let c0 = input.chars().next()?;
    for (sym, op) in ONE_CHAR {
        if c0 == *sym {
            return Some((*op, c0.len_utf8()));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_contains_expression() {
        let toks = tokenize("${var1} contains ${var2}").unwrap();
        assert_eq!(
            toks,
            vec![
                Token::Variable("var1".into()),
                Token::Operator(Operator::Contains),
                Token::Variable("var2".into()),
            ]
        );
    }

    #[test]
    fn tokenizes_bare_variable_and_list_literal() {
        let toks = tokenize("heat == ['cold']").unwrap();
        assert_eq!(
            toks,
            vec![
                Token::Variable("heat".into()),
                Token::Operator(Operator::Eq),
                Token::Operand(Operand::List(vec!["cold".to_string()])),
            ]
        );
    }

    #[test]
    fn tokenizes_tilde_prefixed_path() {
        let toks = tokenize("~heat contains 'cold'").unwrap();
        assert_eq!(
            toks,
            vec![
                Token::Variable("~heat".into()),
                Token::Operator(Operator::Contains),
                Token::Operand(Operand::Str("cold".into())),
            ]
        );
    }

    #[test]
    fn unterminated_string_is_format_error() {
        let err = tokenize("'unterminated").unwrap_err();
        assert_eq!(err.column, 1);
    }

    #[test]
    fn ternary_and_grouping_tokens() {
        let toks = tokenize("(a && b) ? 'x' : 'y'").unwrap();
        assert!(toks.contains(&Token::Operator(Operator::LParen)));
        assert!(toks.contains(&Token::Operator(Operator::Question)));
        assert!(toks.contains(&Token::Operator(Operator::Colon)));
    }
}
