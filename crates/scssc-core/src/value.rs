//! Typed value expressions and unit-aware arithmetic.
//!
//! Declaration values are re-lexed and parsed once by a small
//! precedence-climbing expression parser producing `{number, unit}`
//! values (`*`/`/` bind tighter than `+`/`-`). There is no repeated
//! string substitution: a value either evaluates in this single pass or
//! fails with `InvalidArithmeticOperation`.
//!
//! A value string is a sequence of space- or comma-separated components
//! (`1px solid red`, `Arial, sans-serif`); only numeric components are
//! computed, everything else is carried through verbatim. Calls to
//! builtins are evaluated through the function registry; unknown calls
//! (`calc(...)`, `var(...)`, vendor functions) pass through with their
//! argument text untouched, or raise `FunctionNotFound` in strict mode.
//!
//! Errors raised here carry no source location; the processor attaches
//! the owning declaration's position.

use crate::error::{CompilerError, ErrorKind, Result};
use crate::functions::BUILTINS;
use crate::lexer::{Lexer, Token, TokenKind};

/// A typed value produced by expression evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A number with an optional unit (`6`, `1.5em`, `50%`)
    Number { value: f64, unit: Option<String> },
    /// Anything carried through as text: keywords, strings, colors,
    /// passthrough function calls
    Literal(String),
}

impl Value {
    pub fn render(&self) -> String {
        match self {
            Value::Number { value, unit } => {
                let mut out = format_number(*value);
                if let Some(unit) = unit {
                    out.push_str(unit);
                }
                out
            }
            Value::Literal(text) => text.clone(),
        }
    }

    fn describe(&self) -> String {
        match self {
            Value::Number { .. } => self.render(),
            Value::Literal(text) => format!("`{}`", text),
        }
    }
}

/// Render a number the way CSS expects: no trailing `.0`, small rounding
/// noise from f64 arithmetic clipped off.
pub fn format_number(value: f64) -> String {
    let rounded = (value * 1e6).round() / 1e6;
    if rounded == rounded.trunc() && rounded.abs() < 1e15 {
        format!("{}", rounded as i64)
    } else {
        format!("{}", rounded)
    }
}

/// Evaluate a (variable-substituted) value string into its final CSS
/// text. `strict` turns unknown function calls into errors.
pub fn evaluate(text: &str, strict: bool) -> Result<String> {
    let tokens = Lexer::new(text).tokenize()?;
    let mut cursor = Cursor {
        src: text,
        tokens,
        pos: 0,
        strict,
    };
    let mut out = String::new();
    loop {
        match cursor.peek().kind {
            TokenKind::Eof => break,
            TokenKind::Comment => {
                cursor.advance();
            }
            TokenKind::Comma => {
                cursor.advance();
                out.push(',');
            }
            TokenKind::Bang => {
                cursor.advance();
                let name = cursor.advance();
                push_component(&mut out, &format!("!{}", name.text));
            }
            _ => {
                let value = cursor.parse_expr()?;
                push_component(&mut out, &value.render());
            }
        }
    }
    Ok(out)
}

fn push_component(out: &mut String, piece: &str) {
    if !out.is_empty() {
        out.push(' ');
    }
    out.push_str(piece);
}

struct Cursor<'a> {
    src: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    strict: bool,
}

impl Cursor<'_> {
    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or_else(|| {
            self.tokens
                .last()
                .expect("token sequence always ends with Eof")
        })
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn parse_expr(&mut self) -> Result<Value> {
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => '+',
                TokenKind::Minus => '-',
                _ => break,
            };
            self.advance();
            let rhs = self.parse_term()?;
            lhs = apply(op, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn parse_term(&mut self) -> Result<Value> {
        let mut lhs = self.parse_factor()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => '*',
                TokenKind::Slash => '/',
                _ => break,
            };
            self.advance();
            let rhs = self.parse_factor()?;
            lhs = apply(op, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn parse_factor(&mut self) -> Result<Value> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Minus => {
                self.advance();
                match self.parse_factor()? {
                    Value::Number { value, unit } => Ok(Value::Number {
                        value: -value,
                        unit,
                    }),
                    other => Err(arith_error(format!(
                        "cannot negate non-numeric value {}",
                        other.describe()
                    ))),
                }
            }
            TokenKind::Number => {
                self.advance();
                parse_number(&token.text)
            }
            TokenKind::LParen => {
                self.advance();
                let value = self.parse_expr()?;
                if self.peek().kind != TokenKind::RParen {
                    return Err(arith_error(format!(
                        "expected `)`, found {}",
                        self.peek().kind.name()
                    )));
                }
                self.advance();
                Ok(value)
            }
            TokenKind::Ident => {
                if self.tokens.get(self.pos + 1).map(|t| t.kind) == Some(TokenKind::LParen) {
                    self.parse_call()
                } else {
                    self.advance();
                    Ok(Value::Literal(token.text))
                }
            }
            TokenKind::RParen => Err(arith_error("unexpected `)` in value expression")),
            // Strings, colors, leftover variables, and anything else the
            // expression grammar does not compute travel through as text
            _ => {
                self.advance();
                Ok(Value::Literal(token.text))
            }
        }
    }

    fn parse_call(&mut self) -> Result<Value> {
        let name = self.advance(); // identifier
        let builtin = BUILTINS.get(name.text.as_str()).copied();
        let Some(builtin) = builtin else {
            if self.strict {
                return Err(CompilerError::new(
                    ErrorKind::FunctionNotFound,
                    format!("no function named `{}`", name.text),
                )
                .with_suggestion("only builtin functions are available; check the spelling"));
            }
            return self.passthrough_call(&name);
        };
        self.advance(); // `(`
        let mut args = Vec::new();
        if self.peek().kind != TokenKind::RParen {
            loop {
                args.push(self.parse_expr()?);
                if self.peek().kind == TokenKind::Comma {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        if self.peek().kind != TokenKind::RParen {
            return Err(arith_error(format!(
                "expected `)` to close `{}(`, found {}",
                name.text,
                self.peek().kind.name()
            )));
        }
        self.advance();
        builtin(&args).map_err(|e| {
            CompilerError::new(e.kind, format!("in `{}()`: {}", name.text, e.message))
        })
    }

    /// Forward an unknown call verbatim, from the name through its
    /// matching `)`. The argument text is not evaluated, so `calc()`
    /// expressions survive untouched.
    fn passthrough_call(&mut self, name: &Token) -> Result<Value> {
        self.advance(); // `(`
        let mut depth = 1usize;
        let mut end = self.peek().end;
        while depth > 0 {
            let token = self.advance();
            match token.kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => {
                    depth -= 1;
                    end = token.end;
                }
                TokenKind::Eof => {
                    return Err(arith_error(format!(
                        "unterminated call to `{}(`",
                        name.text
                    )));
                }
                _ => {}
            }
        }
        Ok(Value::Literal(self.src[name.start..end].to_string()))
    }
}

/// Split a numeric literal into value and unit (`10px` -> 10, `px`).
fn parse_number(text: &str) -> Result<Value> {
    let split = text
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_digit() || *c == '.' || *c == '-'))
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let (digits, unit) = text.split_at(split);
    let value: f64 = digits
        .parse()
        .map_err(|_| arith_error(format!("malformed number `{}`", text)))?;
    Ok(Value::Number {
        value,
        unit: if unit.is_empty() {
            None
        } else {
            Some(unit.to_string())
        },
    })
}

fn arith_error(message: impl Into<String>) -> CompilerError {
    CompilerError::new(ErrorKind::InvalidArithmeticOperation, message)
}

/// Unit-aware binary arithmetic.
///
/// `+`/`-` require equal units or one absent; `*` allows at most one
/// united operand; `/` cancels equal units and keeps the numerator's
/// unit over a unitless divisor.
pub fn apply(op: char, lhs: Value, rhs: Value) -> Result<Value> {
    let (Value::Number { value: l, unit: lu }, Value::Number { value: r, unit: ru }) =
        (&lhs, &rhs)
    else {
        return Err(arith_error(format!(
            "cannot apply `{}` to {} and {}",
            op,
            lhs.describe(),
            rhs.describe()
        )));
    };
    let (l, r) = (*l, *r);
    match op {
        '+' | '-' => {
            let unit = match (lu, ru) {
                (Some(a), Some(b)) if a == b => Some(a.clone()),
                (Some(a), Some(b)) => {
                    return Err(arith_error(format!(
                        "incompatible units `{}` and `{}`",
                        a, b
                    )));
                }
                (Some(u), None) | (None, Some(u)) => Some(u.clone()),
                (None, None) => None,
            };
            let value = if op == '+' { l + r } else { l - r };
            Ok(Value::Number { value, unit })
        }
        '*' => {
            let unit = match (lu, ru) {
                (Some(a), Some(b)) => {
                    return Err(arith_error(format!(
                        "cannot multiply `{}` by `{}`",
                        a, b
                    )));
                }
                (Some(u), None) | (None, Some(u)) => Some(u.clone()),
                (None, None) => None,
            };
            Ok(Value::Number { value: l * r, unit })
        }
        '/' => {
            if r == 0.0 {
                return Err(arith_error("division by zero"));
            }
            let unit = match (lu, ru) {
                (Some(a), Some(b)) if a == b => None,
                (Some(a), Some(b)) => {
                    return Err(arith_error(format!(
                        "cannot divide `{}` by `{}`",
                        a, b
                    )));
                }
                (Some(u), None) => Some(u.clone()),
                (None, Some(b)) => {
                    return Err(arith_error(format!(
                        "cannot divide a unitless number by `{}`",
                        b
                    )));
                }
                (None, None) => None,
            };
            Ok(Value::Number { value: l / r, unit })
        }
        _ => Err(arith_error(format!("unsupported operator `{}`", op))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(text: &str) -> String {
        evaluate(text, false).unwrap()
    }

    #[test]
    fn multiplication_keeps_the_unit() {
        assert_eq!(eval("2px * 3"), "6px");
        assert_eq!(eval("3 * 2px"), "6px");
    }

    #[test]
    fn precedence_is_mul_div_before_add_sub() {
        assert_eq!(eval("1px + 2px * 3"), "7px");
        assert_eq!(eval("(1px + 2px) * 3"), "9px");
    }

    #[test]
    fn division_cancels_equal_units() {
        assert_eq!(eval("10px / 2px"), "5");
        assert_eq!(eval("10px / 2"), "5px");
    }

    #[test]
    fn incompatible_units_fail() {
        let err = evaluate("1px + 2em", false).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArithmeticOperation);
        let err = evaluate("2px * 2px", false).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArithmeticOperation);
    }

    #[test]
    fn division_by_zero_fails() {
        let err = evaluate("1px / 0", false).unwrap_err();
        assert!(err.message.contains("division by zero"));
    }

    #[test]
    fn non_arithmetic_values_pass_through() {
        assert_eq!(eval("1px solid red"), "1px solid red");
        assert_eq!(eval("Arial, sans-serif"), "Arial, sans-serif");
        assert_eq!(eval("red !important"), "red !important");
        assert_eq!(eval("\"hello\""), "\"hello\"");
    }

    #[test]
    fn negative_numbers_and_lists() {
        assert_eq!(eval("-4px"), "-4px");
        assert_eq!(eval("0 -2px"), "0 -2px");
        assert_eq!(eval("10px - 2px"), "8px");
    }

    #[test]
    fn unknown_calls_pass_through_verbatim() {
        assert_eq!(eval("calc(100% - 10px)"), "calc(100% - 10px)");
        assert_eq!(eval("var(--gap, 4px)"), "var(--gap, 4px)");
    }

    #[test]
    fn unknown_calls_fail_in_strict_mode() {
        let err = evaluate("wiggle(3)", true).unwrap_err();
        assert_eq!(err.kind, ErrorKind::FunctionNotFound);
    }

    #[test]
    fn builtin_calls_are_evaluated() {
        assert_eq!(eval("round(2.6px)"), "3px");
        assert_eq!(eval("max(1px, 3px, 2px)"), "3px");
        assert_eq!(eval("percentage(0.5)"), "50%");
    }

    #[test]
    fn number_formatting_drops_trailing_zeroes() {
        assert_eq!(format_number(6.0), "6");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(1.0 / 3.0), "0.333333");
    }
}
