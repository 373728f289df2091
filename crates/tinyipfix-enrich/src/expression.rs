//! Sandboxed numeric expressions over named bindings.
//!
//! Arithmetic is done in double precision throughout: integer literals are
//! rewritten as float literals before compiling, so `1 / 16` is `0.0625`.
//!
//! Expressions are compiled once and cached by source text. The engine is
//! built raw with only arithmetic and math functions registered, and capped
//! in operations and nesting depth, so a bad descriptor cannot stall the
//! pipeline.

use std::collections::HashMap;

use rhai::packages::{ArithmeticPackage, BasicMathPackage, LogicPackage, Package};
use rhai::{AST, Dynamic, Engine, Scope};

use crate::error::EnrichError;
use crate::value::FieldValue;

const MAX_OPERATIONS: u64 = 10_000;
const MAX_EXPR_DEPTH: usize = 32;
const MAX_FUNCTION_EXPR_DEPTH: usize = 16;
const MAX_STRING_SIZE: usize = 256;

#[derive(Debug)]
pub struct ExpressionEvaluator {
    engine: Engine,
    cache: HashMap<String, AST>,
}

impl ExpressionEvaluator {
    pub fn new() -> Self {
        let mut engine = Engine::new_raw();
        engine.register_global_module(ArithmeticPackage::new().as_shared_module());
        engine.register_global_module(LogicPackage::new().as_shared_module());
        engine.register_global_module(BasicMathPackage::new().as_shared_module());
        engine.set_max_operations(MAX_OPERATIONS);
        engine.set_max_expr_depths(MAX_EXPR_DEPTH, MAX_FUNCTION_EXPR_DEPTH);
        engine.set_max_string_size(MAX_STRING_SIZE);
        Self {
            engine,
            cache: HashMap::new(),
        }
    }

    /// Evaluate `expression` with each `(name, value)` bound as a float.
    ///
    /// Integral results come back as [`FieldValue::Integer`].
    pub fn evaluate(
        &mut self,
        expression: &str,
        bindings: &[(&str, f64)],
    ) -> Result<FieldValue, EnrichError> {
        let failed = |reason: String| EnrichError::ExpressionEvaluation {
            expression: expression.to_string(),
            reason,
        };

        if !self.cache.contains_key(expression) {
            let ast = self
                .engine
                .compile_expression(promote_integer_literals(expression))
                .map_err(|e| failed(e.to_string()))?;
            self.cache.insert(expression.to_string(), ast);
        }
        let ast = &self.cache[expression];

        let mut scope = Scope::new();
        for (name, value) in bindings {
            scope.push(*name, *value);
        }

        let result = self
            .engine
            .eval_ast_with_scope::<Dynamic>(&mut scope, ast)
            .map_err(|e| failed(e.to_string()))?;

        if let Ok(v) = result.as_float() {
            Ok(FieldValue::from_float(v))
        } else if let Ok(v) = result.as_int() {
            Ok(FieldValue::Integer(v))
        } else {
            Err(failed(format!(
                "expected a number, got {}",
                result.type_name()
            )))
        }
    }

    /// Number of distinct expressions compiled so far.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

/// Rewrite every integer literal outside quotes as a float literal.
///
/// `0x`, `0o` and `0b` literals become their decimal value; float literals,
/// identifiers and quoted text are copied unchanged.
fn promote_integer_literals(expression: &str) -> String {
    let chars: Vec<char> = expression.chars().collect();
    let mut out = String::with_capacity(expression.len() + 8);
    let mut quote: Option<char> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if let Some(q) = quote {
            out.push(c);
            if c == '\\' {
                if let Some(&escaped) = chars.get(i + 1) {
                    out.push(escaped);
                    i += 1;
                }
            } else if c == q {
                quote = None;
            }
            i += 1;
            continue;
        }

        if matches!(c, '"' | '\'' | '`') {
            quote = Some(c);
            out.push(c);
            i += 1;
        } else if c.is_alphabetic() || c == '_' {
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                out.push(chars[i]);
                i += 1;
            }
        } else if c.is_ascii_digit() {
            let start = i;
            i = number_end(&chars, i);
            let literal: String = chars[start..i].iter().collect();
            match integer_literal(&literal) {
                Some(promoted) => out.push_str(&promoted),
                None => out.push_str(&literal),
            }
        } else {
            out.push(c);
            i += 1;
        }
    }
    out
}

/// End of the numeric literal starting at `start`, fraction and exponent included.
fn number_end(chars: &[char], start: usize) -> usize {
    let word = |mut i: usize| {
        while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
            i += 1;
        }
        i
    };
    let radix = chars.get(start) == Some(&'0')
        && matches!(chars.get(start + 1), Some('x' | 'X' | 'o' | 'O' | 'b' | 'B'));

    let mut i = word(start);
    if radix {
        return i;
    }
    if chars.get(i) == Some(&'.') && chars.get(i + 1).is_some_and(char::is_ascii_digit) {
        i = word(i + 1);
    }
    if matches!(chars.get(i - 1), Some('e' | 'E'))
        && matches!(chars.get(i), Some('+' | '-'))
        && chars.get(i + 1).is_some_and(char::is_ascii_digit)
    {
        i = word(i + 1);
    }
    i
}

/// Float spelling of an integer literal, `None` for anything else.
fn integer_literal(literal: &str) -> Option<String> {
    let digits: String = literal.chars().filter(|&c| c != '_').collect();
    let (radix, body) = match digits.get(..2) {
        Some("0x" | "0X") => (16, &digits[2..]),
        Some("0o" | "0O") => (8, &digits[2..]),
        Some("0b" | "0B") => (2, &digits[2..]),
        _ => (10, digits.as_str()),
    };
    if body.is_empty() {
        return None;
    }
    if radix == 10 {
        return body
            .chars()
            .all(|c| c.is_ascii_digit())
            .then(|| format!("{body}.0"));
    }
    u64::from_str_radix(body, radix).ok().map(|v| format!("{v}.0"))
}

impl Default for ExpressionEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(expr: &str, bindings: &[(&str, f64)]) -> Result<FieldValue, EnrichError> {
        ExpressionEvaluator::new().evaluate(expr, bindings)
    }

    #[test]
    fn test_float_division() {
        assert_eq!(eval("x / 100", &[("x", 2345.0)]).unwrap(), FieldValue::Float(23.45));
    }

    #[test]
    fn test_integral_result_is_integer() {
        assert_eq!(eval("x * 2", &[("x", 21.0)]).unwrap(), FieldValue::Integer(42));
        assert_eq!(eval("7", &[]).unwrap(), FieldValue::Integer(7));
    }

    #[test]
    fn test_references_and_math_functions() {
        let v = eval("(x - 32.0) * 5.0 / 9.0 + h", &[("h", 1.0), ("x", 212.0)]).unwrap();
        assert_eq!(v, FieldValue::Integer(101));
        let v = eval("sqrt(x)", &[("x", 16.0)]).unwrap();
        assert_eq!(v, FieldValue::Integer(4));
    }

    #[test]
    fn test_unknown_variable_fails() {
        let err = eval("x + y", &[("x", 1.0)]).unwrap_err();
        assert!(matches!(err, EnrichError::ExpressionEvaluation { ref expression, .. } if expression == "x + y"));
    }

    #[test]
    fn test_syntax_error_fails() {
        assert!(eval("x +", &[("x", 1.0)]).is_err());
    }

    #[test]
    fn test_statements_are_rejected() {
        assert!(eval("let y = 1; y", &[]).is_err());
    }

    #[test]
    fn test_non_numeric_result_fails() {
        let err = eval("x > 1", &[("x", 2.0)]).unwrap_err();
        assert!(err.to_string().contains("expected a number"));
    }

    #[test]
    fn test_integer_literals_divide_as_floats() {
        assert_eq!(eval("x * (1 / 16)", &[("x", 32.0)]).unwrap(), FieldValue::Integer(2));
        assert_eq!(eval("x + 7 / 2", &[("x", 0.0)]).unwrap(), FieldValue::Float(3.5));
        assert_eq!(eval("0x10 / 32", &[]).unwrap(), FieldValue::Float(0.5));
    }

    #[test]
    fn test_large_literal_products_do_not_overflow() {
        let v = eval("x + 100000 * 100000 * 100000 * 100000", &[("x", 0.0)]).unwrap();
        assert_eq!(v, FieldValue::Float(1e20));
    }

    #[test]
    fn test_promote_integer_literals() {
        assert_eq!(promote_integer_literals("x * (1 / 16)"), "x * (1.0 / 16.0)");
        assert_eq!(promote_integer_literals("2.5 + 0x1F + 1_000"), "2.5 + 31.0 + 1000.0");
        assert_eq!(promote_integer_literals("t1 + 1.5e-3 - 2e3"), "t1 + 1.5e-3 - 2e3");
        assert_eq!(promote_integer_literals("\"12\" + '3'"), "\"12\" + '3'");
        assert_eq!(promote_integer_literals("pow(x, 2)"), "pow(x, 2.0)");
    }

    #[test]
    fn test_cache_reuses_compiled_expressions() {
        let mut evaluator = ExpressionEvaluator::new();
        for x in 0..5 {
            evaluator.evaluate("x + 1", &[("x", f64::from(x))]).unwrap();
        }
        evaluator.evaluate("x + 2", &[("x", 0.0)]).unwrap();
        assert_eq!(evaluator.cached(), 2);
    }
}
