//! Calculator tool, evaluates numeric mathematical expressions.
//!
//! Supports `+ - * / % ^`, unary signs, parentheses, decimals, scientific
//! notation, the constants `pi` and `e`, common functions (`sqrt`, `sin`,
//! `log(x, base)`, `pow(a, b)`, `min`, `max`, ...) and the angle units
//! `deg`/`degrees` and `rad`/`radians`. Uses a recursive-descent parser.
//!
//! Free variables are rejected so the model searches for unknown values
//! before calculating with them.

use async_trait::async_trait;
use agentchat_core::error::ToolError;
use agentchat_core::tool::Tool;
use tracing::debug;

const NAME: &str = "calculator";
const MAX_EXPRESSION_LEN: usize = 200;

pub const VARIABLES_NOT_ALLOWED: &str =
    "Variables not allowed. Use numeric expressions only. Search for unknown values first.";
pub const EXPRESSION_TOO_LONG: &str = "Expression too long. Maximum 200 characters.";
pub const NUMBER_TOO_LARGE: &str = "Number too large";
pub const INVALID_CALCULATION: &str = "Invalid calculation";

/// Words that may appear bare in an expression.
const ALLOWED_WORDS: &[&str] = &["pi", "e", "deg", "degrees", "rad", "radians"];

pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Evaluate NUMERIC math expressions (2+2, sqrt(16), 10^5). Use ONLY numbers and operators. \
         For unknown values, search first then calculate with the result. \
         Supports sqrt, pow, sin, cos, log, etc."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "The NUMERIC mathematical expression to evaluate. Use only numbers and math operators. \
                                    Examples: \"2 + 2\", \"sqrt(16)\", \"sin(pi/2)\", \"2^3\", \"log(10)\". \
                                    For unknown values, search first then use the numeric result."
                }
            },
            "required": ["expression"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String, ToolError> {
        let expr = arguments["expression"]
            .as_str()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ToolError::failed(NAME, "Invalid expression"))?;

        let cleaned = validate_input(expr).map_err(|reason| ToolError::failed(NAME, reason))?;
        debug!(expression = %cleaned, "Evaluating expression");

        let value = evaluate(&cleaned).map_err(|e| ToolError::failed(NAME, e.to_string()))?;
        let formatted = sanitize(value).map_err(|reason| ToolError::failed(NAME, reason))?;

        Ok(format!("Result: {formatted}"))
    }
}

/// Trim, strip thousands separators, and reject free variables and
/// over-long input.
pub fn validate_input(expr: &str) -> Result<String, &'static str> {
    let cleaned: String = expr.trim().chars().filter(|&c| c != ',').collect();

    if bare_words(&cleaned)
        .iter()
        .any(|w| !ALLOWED_WORDS.contains(&w.to_ascii_lowercase().as_str()))
    {
        return Err(VARIABLES_NOT_ALLOWED);
    }

    if cleaned.chars().count() > MAX_EXPRESSION_LEN {
        return Err(EXPRESSION_TOO_LONG);
    }

    Ok(cleaned)
}

/// Purely alphabetic words of two or more letters that are not immediately
/// followed by `(`.
fn bare_words(input: &str) -> Vec<&str> {
    let bytes = input.as_bytes();
    let is_word = |b: u8| b.is_ascii_alphanumeric() || b == b'_';
    let mut words = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if !is_word(bytes[i]) {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && is_word(bytes[i]) {
            i += 1;
        }
        let word = &input[start..i];
        let alphabetic = word.bytes().all(|b| b.is_ascii_alphabetic());
        if alphabetic && word.len() >= 2 && bytes.get(i) != Some(&b'(') {
            words.push(word);
        }
    }

    words
}

/// Render a result, rejecting non-finite values.
fn sanitize(value: f64) -> Result<String, &'static str> {
    if value.is_infinite() {
        return Err(NUMBER_TOO_LARGE);
    }
    if value.is_nan() {
        return Err(INVALID_CALCULATION);
    }
    // Normalize negative zero
    let value = if value == 0.0 { 0.0 } else { value };
    Ok(format!("{value}"))
}

/// Evaluation failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalcError {
    #[error("Variables not allowed. Use numeric expressions only. Search for unknown values first.")]
    UndefinedSymbol(String),

    #[error("Calculator error: {0}")]
    Syntax(String),
}

// ── Recursive-descent expression evaluator ────────────────────────────────

/// Evaluate a mathematical expression string.
pub fn evaluate(expr: &str) -> Result<f64, CalcError> {
    let tokens = tokenize(expr)?;
    let mut parser = Parser::new(&tokens);
    let result = parser.parse_expr()?;
    if let Some(tok) = parser.peek() {
        return Err(CalcError::Syntax(format!(
            "Unexpected token at position {}: {:?}",
            parser.pos, tok
        )));
    }
    Ok(result)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    Comma,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, CalcError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let single = match c {
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '*' => Some(Token::Star),
            '/' => Some(Token::Slash),
            '%' => Some(Token::Percent),
            '^' => Some(Token::Caret),
            ',' => Some(Token::Comma),
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            _ => None,
        };
        if let Some(tok) = single {
            tokens.push(tok);
            i += 1;
            continue;
        }

        if c.is_whitespace() {
            i += 1;
        } else if c.is_ascii_digit() || c == '.' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            // Exponent only when digits follow it
            if i < chars.len() && matches!(chars[i], 'e' | 'E') {
                let mut j = i + 1;
                if j < chars.len() && matches!(chars[j], '+' | '-') {
                    j += 1;
                }
                if j < chars.len() && chars[j].is_ascii_digit() {
                    i = j;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
            }
            let num_str: String = chars[start..i].iter().collect();
            let num: f64 = num_str
                .parse()
                .map_err(|_| CalcError::Syntax(format!("Invalid number: {num_str}")))?;
            tokens.push(Token::Number(num));
        } else if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
        } else {
            return Err(CalcError::Syntax(format!("Unexpected character: '{c}'")));
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn consume(&mut self) -> Option<&'a Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<(), CalcError> {
        match self.consume() {
            Some(tok) if *tok == expected => Ok(()),
            _ => Err(CalcError::Syntax(format!("Expected {what}"))),
        }
    }

    // expr = term (('+' | '-') term)*
    fn parse_expr(&mut self) -> Result<f64, CalcError> {
        let mut left = self.parse_term()?;
        while let Some(op) = self.peek() {
            match op {
                Token::Plus => {
                    self.consume();
                    left += self.parse_term()?;
                }
                Token::Minus => {
                    self.consume();
                    left -= self.parse_term()?;
                }
                _ => break,
            }
        }
        Ok(left)
    }

    // term = unary (('*' | '/' | '%') unary)*
    fn parse_term(&mut self) -> Result<f64, CalcError> {
        let mut left = self.parse_unary()?;
        while let Some(op) = self.peek() {
            match op {
                Token::Star => {
                    self.consume();
                    left *= self.parse_unary()?;
                }
                Token::Slash => {
                    self.consume();
                    // x / 0 yields ±inf (or NaN), rejected when rendering
                    left /= self.parse_unary()?;
                }
                Token::Percent => {
                    self.consume();
                    let right = self.parse_unary()?;
                    left = modulo(left, right);
                }
                _ => break,
            }
        }
        Ok(left)
    }

    // unary = ('-' | '+') unary | power
    fn parse_unary(&mut self) -> Result<f64, CalcError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.consume();
                Ok(-self.parse_unary()?)
            }
            Some(Token::Plus) => {
                self.consume();
                self.parse_unary()
            }
            _ => self.parse_power(),
        }
    }

    // power = postfix ('^' unary)?   (right-associative)
    fn parse_power(&mut self) -> Result<f64, CalcError> {
        let base = self.parse_postfix()?;
        if let Some(Token::Caret) = self.peek() {
            self.consume();
            let exponent = self.parse_unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    // postfix = primary unit?
    fn parse_postfix(&mut self) -> Result<f64, CalcError> {
        let value = self.parse_primary()?;
        if let Some(Token::Ident(name)) = self.peek() {
            match name.to_ascii_lowercase().as_str() {
                "deg" | "degrees" => {
                    self.consume();
                    return Ok(value.to_radians());
                }
                "rad" | "radians" => {
                    self.consume();
                    return Ok(value);
                }
                _ => {}
            }
        }
        Ok(value)
    }

    // primary = NUMBER | IDENT | IDENT '(' args ')' | '(' expr ')'
    fn parse_primary(&mut self) -> Result<f64, CalcError> {
        match self.consume() {
            Some(Token::Number(n)) => Ok(*n),
            Some(Token::LParen) => {
                let val = self.parse_expr()?;
                self.expect(Token::RParen, "closing parenthesis")?;
                Ok(val)
            }
            Some(Token::Ident(name)) => {
                if let Some(Token::LParen) = self.peek() {
                    self.consume();
                    let args = self.parse_args()?;
                    return call_function(name, &args);
                }
                match name.to_ascii_lowercase().as_str() {
                    "pi" => Ok(std::f64::consts::PI),
                    "e" => Ok(std::f64::consts::E),
                    _ => Err(CalcError::UndefinedSymbol(name.clone())),
                }
            }
            Some(tok) => Err(CalcError::Syntax(format!("Unexpected token: {tok:?}"))),
            None => Err(CalcError::Syntax("Unexpected end of expression".into())),
        }
    }

    // args = (expr (',' expr)*)? ')'
    fn parse_args(&mut self) -> Result<Vec<f64>, CalcError> {
        let mut args = Vec::new();
        if let Some(Token::RParen) = self.peek() {
            self.consume();
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr()?);
            match self.consume() {
                Some(Token::Comma) => continue,
                Some(Token::RParen) => return Ok(args),
                _ => return Err(CalcError::Syntax("Expected ',' or ')'".into())),
            }
        }
    }
}

/// Modulo with the sign of the divisor.
fn modulo(a: f64, b: f64) -> f64 {
    if b == 0.0 {
        return a;
    }
    a - b * (a / b).floor()
}

fn call_function(name: &str, args: &[f64]) -> Result<f64, CalcError> {
    let arity = |n: usize| -> Result<(), CalcError> {
        if args.len() == n {
            Ok(())
        } else {
            Err(CalcError::Syntax(format!(
                "{name}() expects {n} argument(s), got {}",
                args.len()
            )))
        }
    };

    let value = match name.to_ascii_lowercase().as_str() {
        "sqrt" => {
            arity(1)?;
            args[0].sqrt()
        }
        "abs" => {
            arity(1)?;
            args[0].abs()
        }
        "sin" => {
            arity(1)?;
            args[0].sin()
        }
        "cos" => {
            arity(1)?;
            args[0].cos()
        }
        "tan" => {
            arity(1)?;
            args[0].tan()
        }
        "asin" => {
            arity(1)?;
            args[0].asin()
        }
        "acos" => {
            arity(1)?;
            args[0].acos()
        }
        "atan" => {
            arity(1)?;
            args[0].atan()
        }
        "exp" => {
            arity(1)?;
            args[0].exp()
        }
        "ln" => {
            arity(1)?;
            args[0].ln()
        }
        "log" => match args {
            [x] => x.ln(),
            [x, base] => x.ln() / base.ln(),
            _ => {
                return Err(CalcError::Syntax(format!(
                    "log() expects 1 or 2 arguments, got {}",
                    args.len()
                )));
            }
        },
        "log10" => {
            arity(1)?;
            args[0].log10()
        }
        "log2" => {
            arity(1)?;
            args[0].log2()
        }
        "floor" => {
            arity(1)?;
            args[0].floor()
        }
        "ceil" => {
            arity(1)?;
            args[0].ceil()
        }
        "round" => {
            arity(1)?;
            args[0].round()
        }
        "pow" => {
            arity(2)?;
            args[0].powf(args[1])
        }
        "min" | "max" => {
            if args.is_empty() {
                return Err(CalcError::Syntax(format!("{name}() needs at least one argument")));
            }
            let pick: fn(f64, f64) -> f64 = if name.eq_ignore_ascii_case("min") { f64::min } else { f64::max };
            args.iter().copied().reduce(pick).unwrap_or(f64::NAN)
        }
        _ => return Err(CalcError::UndefinedSymbol(name.to_string())),
    };

    Ok(value)
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(expr: &str, expected: f64) {
        let got = evaluate(expr).unwrap();
        assert!((got - expected).abs() < 1e-9, "{expr} = {got}, expected {expected}");
    }

    #[test]
    fn operator_precedence() {
        assert_eq!(evaluate("2 + 3 * 4").unwrap(), 14.0);
        assert_eq!(evaluate("(2 + 3) * 4").unwrap(), 20.0);
        assert_eq!(evaluate("((1 + 2) * (3 + 4))").unwrap(), 21.0);
    }

    #[test]
    fn power_is_right_associative_and_binds_tighter_than_negation() {
        assert_eq!(evaluate("2^3^2").unwrap(), 512.0);
        assert_eq!(evaluate("-2^2").unwrap(), -4.0);
        assert_eq!(evaluate("2^-1").unwrap(), 0.5);
        assert_eq!(evaluate("10^5").unwrap(), 100000.0);
    }

    #[test]
    fn modulo_and_scientific_notation() {
        assert_eq!(evaluate("10 % 3").unwrap(), 1.0);
        approx("1.5e3 + 2E-1", 1500.2);
    }

    #[test]
    fn functions_and_constants() {
        approx("sqrt(16)", 4.0);
        approx("sin(pi/2)", 1.0);
        approx("log(e)", 1.0);
        approx("log(8, 2)", 3.0);
        approx("log10(1000)", 3.0);
        approx("pow(2, 10)", 1024.0);
        approx("max(1, 7, 3) - min(4, 2)", 5.0);
        approx("abs(-3) + floor(2.7) + ceil(0.2) + round(1.5)", 8.0);
    }

    #[test]
    fn angle_units() {
        approx("sin(90 deg)", 1.0);
        approx("cos(180 degrees)", -1.0);
        approx("sin(pi rad / 2)", 1.0);
    }

    #[test]
    fn division_by_zero_is_infinite() {
        assert!(evaluate("1 / 0").unwrap().is_infinite());
    }

    #[test]
    fn syntax_errors() {
        assert!(matches!(evaluate("2 +"), Err(CalcError::Syntax(_))));
        assert!(matches!(evaluate(""), Err(CalcError::Syntax(_))));
        assert!(matches!(evaluate("(1 + 2"), Err(CalcError::Syntax(_))));
        assert!(matches!(evaluate("pow(2)"), Err(CalcError::Syntax(_))));
        assert!(matches!(evaluate("2 $ 3"), Err(CalcError::Syntax(_))));
    }

    #[test]
    fn unknown_symbols_are_variables() {
        assert_eq!(evaluate("x + 1"), Err(CalcError::UndefinedSymbol("x".into())));
        assert!(matches!(evaluate("foo(2)"), Err(CalcError::UndefinedSymbol(_))));
    }

    #[test]
    fn validation_rejects_words_and_long_input() {
        assert_eq!(validate_input(" 1,000 + 2 ").unwrap(), "1000 + 2");
        assert_eq!(validate_input("sqrt(16) * pi").unwrap(), "sqrt(16) * pi");
        assert_eq!(validate_input("sin(90 DEG)").unwrap(), "sin(90 DEG)");
        assert_eq!(validate_input("price * 2"), Err(VARIABLES_NOT_ALLOWED));
        // A function name followed by a space is a bare word
        assert_eq!(validate_input("sqrt (16)"), Err(VARIABLES_NOT_ALLOWED));
        assert_eq!(validate_input(&"1+".repeat(101)), Err(EXPRESSION_TOO_LONG));
    }

    #[tokio::test]
    async fn tool_execute() {
        let result = CalculatorTool
            .execute(serde_json::json!({"expression": "2+2"}))
            .await
            .unwrap();
        assert_eq!(result, "Result: 4");
    }

    #[tokio::test]
    async fn tool_formats_decimals() {
        let result = CalculatorTool
            .execute(serde_json::json!({"expression": "10 / 4"}))
            .await
            .unwrap();
        assert_eq!(result, "Result: 2.5");
    }

    #[tokio::test]
    async fn tool_rejects_non_finite_results() {
        let err = CalculatorTool
            .execute(serde_json::json!({"expression": "1/0"}))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), NUMBER_TOO_LARGE);

        let err = CalculatorTool
            .execute(serde_json::json!({"expression": "sqrt(-1)"}))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), INVALID_CALCULATION);
    }

    #[tokio::test]
    async fn tool_missing_expression() {
        let err = CalculatorTool.execute(serde_json::json!({})).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid expression");

        let err = CalculatorTool
            .execute(serde_json::json!({"expression": "   "}))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid expression");
    }

    #[tokio::test]
    async fn tool_reports_variables_and_syntax_errors() {
        let err = CalculatorTool
            .execute(serde_json::json!({"expression": "y * 3"}))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), VARIABLES_NOT_ALLOWED);

        let err = CalculatorTool
            .execute(serde_json::json!({"expression": "3 *"}))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Calculator error:"));
        assert_eq!(err.tool_name(), Some("calculator"));
    }

    #[test]
    fn tool_definition() {
        let def = CalculatorTool.to_definition();
        assert_eq!(def.name, "calculator");
        assert_eq!(def.parameters["required"][0], "expression");
    }
}
