//! The builtin function registry.
//!
//! A static, immutable map of pure functions. It is the only state shared
//! between concurrent compilations, and it is never mutated after
//! initialization. Color-channel arithmetic (`lighten`, `mix`, ...) is
//! deliberately absent.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::error::{CompilerError, ErrorKind, Result};
use crate::value::Value;

/// A builtin: evaluated arguments in, one value out.
pub type BuiltinFn = fn(&[Value]) -> Result<Value>;

/// Registry of builtin functions, keyed by call name.
pub static BUILTINS: Lazy<HashMap<&'static str, BuiltinFn>> = Lazy::new(|| {
    let mut map: HashMap<&'static str, BuiltinFn> = HashMap::new();
    map.insert("round", builtin_round);
    map.insert("floor", builtin_floor);
    map.insert("ceil", builtin_ceil);
    map.insert("abs", builtin_abs);
    map.insert("percentage", builtin_percentage);
    map.insert("min", builtin_min);
    map.insert("max", builtin_max);
    map.insert("quote", builtin_quote);
    map.insert("unquote", builtin_unquote);
    map
});

fn arg_error(message: impl Into<String>) -> CompilerError {
    CompilerError::new(ErrorKind::InvalidArithmeticOperation, message)
}

fn single_number(args: &[Value]) -> Result<(f64, Option<&str>)> {
    match args {
        [Value::Number { value, unit }] => Ok((*value, unit.as_deref())),
        [other] => Err(arg_error(format!(
            "expected a number, got `{}`",
            other.render()
        ))),
        _ => Err(arg_error(format!("expected 1 argument, got {}", args.len()))),
    }
}

fn number(value: f64, unit: Option<&str>) -> Value {
    Value::Number {
        value,
        unit: unit.map(String::from),
    }
}

fn builtin_round(args: &[Value]) -> Result<Value> {
    let (v, u) = single_number(args)?;
    Ok(number(v.round(), u))
}

fn builtin_floor(args: &[Value]) -> Result<Value> {
    let (v, u) = single_number(args)?;
    Ok(number(v.floor(), u))
}

fn builtin_ceil(args: &[Value]) -> Result<Value> {
    let (v, u) = single_number(args)?;
    Ok(number(v.ceil(), u))
}

fn builtin_abs(args: &[Value]) -> Result<Value> {
    let (v, u) = single_number(args)?;
    Ok(number(v.abs(), u))
}

fn builtin_percentage(args: &[Value]) -> Result<Value> {
    match single_number(args)? {
        (v, None) => Ok(number(v * 100.0, Some("%"))),
        (_, Some(u)) => Err(arg_error(format!(
            "percentage() takes a unitless number, got `{}`",
            u
        ))),
    }
}

/// Shared by `min`/`max`: all arguments must be numbers with equal (or
/// absent) units; the result keeps the first unit seen.
fn extremum(args: &[Value], pick_max: bool) -> Result<Value> {
    if args.is_empty() {
        return Err(arg_error("expected at least 1 argument"));
    }
    let mut best: Option<f64> = None;
    let mut unit: Option<&str> = None;
    for arg in args {
        let Value::Number { value, unit: u } = arg else {
            return Err(arg_error(format!(
                "expected numbers, got `{}`",
                arg.render()
            )));
        };
        match (unit, u.as_deref()) {
            (Some(a), Some(b)) if a != b => {
                return Err(arg_error(format!(
                    "incompatible units `{}` and `{}`",
                    a, b
                )));
            }
            (None, Some(b)) => unit = Some(b),
            _ => {}
        }
        best = Some(match best {
            None => *value,
            Some(b) if pick_max => b.max(*value),
            Some(b) => b.min(*value),
        });
    }
    Ok(number(best.expect("non-empty args"), unit))
}

fn builtin_min(args: &[Value]) -> Result<Value> {
    extremum(args, false)
}

fn builtin_max(args: &[Value]) -> Result<Value> {
    extremum(args, true)
}

fn builtin_quote(args: &[Value]) -> Result<Value> {
    match args {
        [value] => {
            let text = value.render();
            if text.starts_with('"') && text.ends_with('"') {
                Ok(Value::Literal(text))
            } else {
                Ok(Value::Literal(format!("\"{}\"", text.trim_matches('\''))))
            }
        }
        _ => Err(arg_error(format!("expected 1 argument, got {}", args.len()))),
    }
}

fn builtin_unquote(args: &[Value]) -> Result<Value> {
    match args {
        [value] => {
            let text = value.render();
            let trimmed = text
                .strip_prefix('"')
                .and_then(|t| t.strip_suffix('"'))
                .or_else(|| text.strip_prefix('\'').and_then(|t| t.strip_suffix('\'')))
                .unwrap_or(&text);
            Ok(Value::Literal(trimmed.to_string()))
        }
        _ => Err(arg_error(format!("expected 1 argument, got {}", args.len()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(v: f64, unit: Option<&str>) -> Value {
        number(v, unit)
    }

    #[test]
    fn rounding_family_keeps_units() {
        assert_eq!(
            builtin_round(&[num(2.6, Some("px"))]).unwrap(),
            num(3.0, Some("px"))
        );
        assert_eq!(builtin_floor(&[num(2.6, None)]).unwrap(), num(2.0, None));
        assert_eq!(
            builtin_ceil(&[num(2.1, Some("em"))]).unwrap(),
            num(3.0, Some("em"))
        );
        assert_eq!(builtin_abs(&[num(-4.0, Some("px"))]).unwrap(), num(4.0, Some("px")));
    }

    #[test]
    fn percentage_requires_unitless() {
        assert_eq!(
            builtin_percentage(&[num(0.25, None)]).unwrap(),
            num(25.0, Some("%"))
        );
        assert!(builtin_percentage(&[num(0.25, Some("px"))]).is_err());
    }

    #[test]
    fn min_max_check_units() {
        let args = [num(1.0, Some("px")), num(3.0, Some("px")), num(2.0, None)];
        assert_eq!(builtin_max(&args).unwrap(), num(3.0, Some("px")));
        assert_eq!(builtin_min(&args).unwrap(), num(1.0, Some("px")));
        assert!(builtin_max(&[num(1.0, Some("px")), num(2.0, Some("em"))]).is_err());
    }

    #[test]
    fn quote_and_unquote() {
        assert_eq!(
            builtin_quote(&[Value::Literal("hello".into())]).unwrap(),
            Value::Literal("\"hello\"".into())
        );
        assert_eq!(
            builtin_unquote(&[Value::Literal("\"hello\"".into())]).unwrap(),
            Value::Literal("hello".into())
        );
    }

    #[test]
    fn registry_contains_the_documented_builtins() {
        for name in ["round", "floor", "ceil", "abs", "percentage", "min", "max", "quote", "unquote"] {
            assert!(BUILTINS.contains_key(name), "missing builtin {}", name);
        }
    }
}
