//! The parameter-function evaluator (C8): a small, closed arithmetic
//! language for expressing a derived parameter as a composition of
//! other parameters, literals, and (optionally) externally-registered
//! pure functions.
//!
//! The source system accepts arbitrary numeric-expression strings and
//! evaluates them with a general-purpose expression engine. Per the
//! design notes that grammar must be closed and safe: no user code
//! execution, unknown identifiers rejected at parse time. No
//! parser-combinator crate (`nom`, `pest`, ...) appears anywhere in
//! the retrieval corpus, and the grammar below is small and fixed, so
//! it is hand-parsed by a tokenizer and a recursive-descent parser
//! local to this module, the same way the corpus's own `html::lex`
//! module hand-rolls a small, closed lexer rather than reaching for a
//! combinator crate.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::domain::Selection;
use crate::dtype::{Array, ElementType, Scalar};
use crate::error::Result;

/// A pure function registered under `(module, name)` for use by an
/// [`Expression::External`] node. Loading arbitrary shared-library
/// code is out of scope, so the embedding application populates this
/// registry up front with the handful of callables its coverage
/// actually needs.
pub type Callable = dyn Fn(&[Array]) -> Result<Array> + Send + Sync;

#[derive(Default)]
pub struct CallableRegistry {
    callables: HashMap<(String, String), Box<Callable>>,
}

impl CallableRegistry {
    pub fn new() -> CallableRegistry {
        CallableRegistry::default()
    }

    pub fn register<F>(&mut self, module: &str, name: &str, f: F)
    where
        F: Fn(&[Array]) -> Result<Array> + Send + Sync + 'static,
    {
        self.callables.insert((module.to_string(), name.to_string()), Box::new(f));
    }

    fn call(&self, module: &str, name: &str, args: &[Array]) -> Result<Array> {
        match self.callables.get(&(module.to_string(), name.to_string())) {
            Some(f) => f(args),
            None => err_at!(Fatal, msg: "no external callable registered for {:?}.{:?}", module, name),
        }
    }
}

/// The value an expression's formal argument is bound to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArgBinding {
    /// Another expression, evaluated recursively.
    Expr(Box<Expression>),
    /// A parameter in the enclosing coverage, resolved via the
    /// `parameter_value_callback` passed to [`Expression::evaluate`].
    Parameter(String),
    /// A literal, independent of any parameter or sub-expression.
    Literal(Scalar),
}

/// One node of a parameter-function expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    /// A safe arithmetic-sublanguage string, evaluated over the
    /// resolved argument arrays.
    Numeric(String),
    /// A reference to a registered pure function plus its positional
    /// argument names (resolved the same way as a numeric
    /// expression's variables, via `args`).
    External { module: String, name: String, positional: Vec<String> },
    /// A fixed scalar or array, independent of any input.
    Independent(Scalar),
}

/// A named, composable expression: a kind (what to compute) plus a
/// formal argument list and the binding each formal name resolves to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    pub name: String,
    pub output_type: ElementType,
    pub formal_args: Vec<String>,
    pub args: HashMap<String, ArgBinding>,
    pub kind: ExprKind,
}

impl Expression {
    pub fn numeric(name: &str, output_type: ElementType, expr: &str) -> Expression {
        Expression {
            name: name.to_string(),
            output_type,
            formal_args: Vec::new(),
            args: HashMap::new(),
            kind: ExprKind::Numeric(expr.to_string()),
        }
    }

    pub fn external(name: &str, output_type: ElementType, module: &str, func: &str, positional: Vec<String>) -> Expression {
        Expression {
            name: name.to_string(),
            output_type,
            formal_args: Vec::new(),
            args: HashMap::new(),
            kind: ExprKind::External { module: module.to_string(), name: func.to_string(), positional },
        }
    }

    pub fn independent(name: &str, value: Scalar) -> Expression {
        let output_type = match &value {
            Scalar::I32(_) => ElementType::I32,
            Scalar::I64(_) => ElementType::I64,
            Scalar::F32(_) => ElementType::F32,
            Scalar::F64(_) => ElementType::F64,
            Scalar::Bytes(_) => ElementType::VarBytes,
        };
        Expression { name: name.to_string(), output_type, formal_args: Vec::new(), args: HashMap::new(), kind: ExprKind::Independent(value) }
    }

    /// Bind a formal argument name to another expression, a parameter
    /// name, or a literal. Binding a name not yet in `formal_args`
    /// adds it.
    pub fn bind(mut self, formal: &str, binding: ArgBinding) -> Expression {
        if !self.formal_args.iter().any(|a| a == formal) {
            self.formal_args.push(formal.to_string());
        }
        self.args.insert(formal.to_string(), binding);
        self
    }

    /// Evaluate this expression over `selection`, resolving parameter
    /// references through `param_value` (the same callback signature
    /// the source system threads through its coverage object: a
    /// parameter name and a selection in, an array out) and treating
    /// `fill_value` as the value to substitute wherever a referenced
    /// parameter has no data.
    pub fn evaluate(
        &self,
        registry: &CallableRegistry,
        param_value: &dyn Fn(&str, &Selection) -> Result<Array>,
        selection: &Selection,
        fill_value: &Scalar,
    ) -> Result<Array> {
        let mut resolved: HashMap<String, Array> = HashMap::new();
        for formal in &self.formal_args {
            let binding = self.args.get(formal).ok_or_else(|| unbound(&self.name, formal))?;
            // Argument names ending in `*` bind to only the last
            // element of whatever they resolve to.
            let last_only = formal.ends_with('*');
            let mut value = self.resolve_binding(binding, registry, param_value, selection, fill_value)?;
            if last_only {
                value = last_element(&value)?;
            }
            resolved.insert(formal.clone(), value);
        }

        let result = match &self.kind {
            ExprKind::Independent(scalar) => {
                let shape = selection.shape_unbounded();
                Array::filled(shape, scalar)
            }
            ExprKind::External { module, name, positional } => {
                let args: Result<Vec<Array>> = positional
                    .iter()
                    .map(|p| resolved.get(p).cloned().ok_or_else(|| unbound(&self.name, p)))
                    .collect();
                registry.call(module, name, &args?)
            }
            ExprKind::Numeric(text) => {
                let ast = parse(text)?;
                eval_ast(&ast, &resolved)
            }
        }?;
        cast_array(result, self.output_type)
    }

    fn resolve_binding(
        &self,
        binding: &ArgBinding,
        registry: &CallableRegistry,
        param_value: &dyn Fn(&str, &Selection) -> Result<Array>,
        selection: &Selection,
        fill_value: &Scalar,
    ) -> Result<Array> {
        match binding {
            ArgBinding::Expr(expr) => expr.evaluate(registry, param_value, selection, fill_value),
            ArgBinding::Parameter(name) => param_value(name, selection),
            ArgBinding::Literal(scalar) => Array::filled(selection.shape_unbounded(), scalar),
        }
    }

    /// Union of every module name owning an external callable anywhere
    /// in this expression's dependency tree, including its own.
    pub fn module_dependencies(&self) -> HashSet<String> {
        let mut out = HashSet::new();
        self.collect_module_dependencies(&mut out);
        out
    }

    fn collect_module_dependencies(&self, out: &mut HashSet<String>) {
        if let ExprKind::External { module, .. } = &self.kind {
            out.insert(module.clone());
        }
        for binding in self.args.values() {
            if let ArgBinding::Expr(expr) = binding {
                expr.collect_module_dependencies(out);
            }
        }
    }
}

/// Coerce `array` to `output_type`, per "returns an array ... typed
/// per the expression's declared output type". The numeric evaluator
/// always computes in `f64`; this is where that gets narrowed back
/// down to whatever the expression actually declared.
fn cast_array(array: Array, output_type: ElementType) -> Result<Array> {
    if array.element_type() == output_type {
        return Ok(array);
    }
    let shape = array.shape().to_vec();
    let values = array
        .as_f64()
        .ok_or_else(|| crate::error::Error::Fatal(format!("{}:{}", file!(), line!()), "cannot cast a byte-string array to a numeric type".to_string()))?;
    let cast = match output_type {
        ElementType::I32 => Array::I32 { shape, data: values.iter().map(|v| *v as i32).collect() },
        ElementType::I64 => Array::I64 { shape, data: values.iter().map(|v| *v as i64).collect() },
        ElementType::F32 => Array::F32 { shape, data: values.iter().map(|v| *v as f32).collect() },
        ElementType::F64 => Array::F64 { shape, data: values },
        ElementType::FixedBytes(_) | ElementType::VarBytes => {
            return err_at!(Fatal, msg: "numeric expression cannot produce a byte-string output type {:?}", output_type)
        }
    };
    Ok(cast)
}

fn unbound(expr: &str, formal: &str) -> crate::error::Error {
    crate::error::Error::Fatal(
        format!("{}:{}", file!(), line!()),
        format!("expression {:?} has no binding for formal argument {:?}", expr, formal),
    )
}

/// The last element of a flattened array, per the `*`-suffixed
/// argument-name binding rule.
fn last_element(array: &Array) -> Result<Array> {
    macro_rules! last_of {
        ($variant:ident, $data:expr) => {{
            let v = $data.last().cloned().ok_or_else(|| {
                crate::error::Error::Fatal(format!("{}:{}", file!(), line!()), "`*` argument resolved to an empty array".to_string())
            })?;
            Ok(Array::$variant { shape: vec![1], data: vec![v] })
        }};
    }
    match array {
        Array::I32 { data, .. } => last_of!(I32, data),
        Array::I64 { data, .. } => last_of!(I64, data),
        Array::F32 { data, .. } => last_of!(F32, data),
        Array::F64 { data, .. } => last_of!(F64, data),
        Array::Bytes { data, .. } => last_of!(Bytes, data),
    }
}

impl Selection {
    /// Shape of this selection's result with every axis's open range
    /// bound resolved against `i64::MAX` worth of headroom collapsed
    /// to the axis's own explicit extent — used only by expression
    /// evaluation, where no parameter extent is in scope yet (a bound
    /// axis selection is required; an open-ended `full()` axis has no
    /// meaning as a standalone expression shape and is rejected).
    fn shape_unbounded(&self) -> Vec<usize> {
        self.0
            .iter()
            .map(|axis| match axis {
                crate::domain::AxisSelection::Index(_) => 1,
                crate::domain::AxisSelection::List(l) => l.len(),
                crate::domain::AxisSelection::Range { start, stop, step } => {
                    let lo = start.unwrap_or(0);
                    let hi = stop.unwrap_or(lo);
                    crate::domain::count_in_range(lo, hi, *step)
                }
            })
            .collect()
    }
}

// ---------------------------------------------------------------------
// Numeric-expression grammar: tokenizer, recursive-descent parser, and
// an elementwise evaluator over `f64` arrays (the safe arithmetic
// sublanguage operates in floating point regardless of the declared
// output type; the caller's declared `output_type` governs only how
// the result is ultimately stored, not how it is computed).
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LParen,
    RParen,
    Comma,
}

fn tokenize(text: &str) -> Result<Vec<Token>> {
    let mut out = Vec::new();
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '+' => {
                out.push(Token::Plus);
                i += 1;
            }
            '-' => {
                out.push(Token::Minus);
                i += 1;
            }
            '*' => {
                out.push(Token::Star);
                i += 1;
            }
            '/' => {
                out.push(Token::Slash);
                i += 1;
            }
            '%' => {
                out.push(Token::Percent);
                i += 1;
            }
            '(' => {
                out.push(Token::LParen);
                i += 1;
            }
            ')' => {
                out.push(Token::RParen);
                i += 1;
            }
            ',' => {
                out.push(Token::Comma);
                i += 1;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let lit: String = chars[start..i].iter().collect();
                let n = err_at!(Fatal, lit.parse::<f64>(), "invalid numeric literal {:?}", lit)?;
                out.push(Token::Number(n));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '*') {
                    i += 1;
                }
                out.push(Token::Ident(chars[start..i].iter().collect()));
            }
            c => return err_at!(Fatal, msg: "unexpected character {:?} in numeric expression", c),
        }
    }
    Ok(out)
}

#[derive(Debug, Clone, PartialEq)]
enum Ast {
    Number(f64),
    Var(String),
    Neg(Box<Ast>),
    Add(Box<Ast>, Box<Ast>),
    Sub(Box<Ast>, Box<Ast>),
    Mul(Box<Ast>, Box<Ast>),
    Div(Box<Ast>, Box<Ast>),
    Mod(Box<Ast>, Box<Ast>),
    Call(String, Vec<Ast>),
}

const FUNCTIONS: &[&str] = &["abs", "sqrt", "min", "max", "floor", "ceil", "pow"];

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn expect(&mut self, tok: &Token) -> Result<()> {
        match self.advance() {
            Some(t) if &t == tok => Ok(()),
            other => err_at!(Fatal, msg: "expected {:?}, got {:?}", tok, other),
        }
    }

    // expr := term (('+' | '-') term)*
    fn parse_expr(&mut self) -> Result<Ast> {
        let mut lhs = self.parse_term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.advance();
                    let rhs = self.parse_term()?;
                    lhs = Ast::Add(Box::new(lhs), Box::new(rhs));
                }
                Some(Token::Minus) => {
                    self.advance();
                    let rhs = self.parse_term()?;
                    lhs = Ast::Sub(Box::new(lhs), Box::new(rhs));
                }
                _ => break,
            }
        }
        Ok(lhs)
    }

    // term := unary (('*' | '/' | '%') unary)*
    fn parse_term(&mut self) -> Result<Ast> {
        let mut lhs = self.parse_unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.advance();
                    let rhs = self.parse_unary()?;
                    lhs = Ast::Mul(Box::new(lhs), Box::new(rhs));
                }
                Some(Token::Slash) => {
                    self.advance();
                    let rhs = self.parse_unary()?;
                    lhs = Ast::Div(Box::new(lhs), Box::new(rhs));
                }
                Some(Token::Percent) => {
                    self.advance();
                    let rhs = self.parse_unary()?;
                    lhs = Ast::Mod(Box::new(lhs), Box::new(rhs));
                }
                _ => break,
            }
        }
        Ok(lhs)
    }

    // unary := '-' unary | primary
    fn parse_unary(&mut self) -> Result<Ast> {
        match self.peek() {
            Some(Token::Minus) => {
                self.advance();
                Ok(Ast::Neg(Box::new(self.parse_unary()?)))
            }
            _ => self.parse_primary(),
        }
    }

    // primary := number | ident '(' expr (',' expr)* ')' | ident | '(' expr ')'
    fn parse_primary(&mut self) -> Result<Ast> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Ast::Number(n)),
            Some(Token::Ident(name)) if FUNCTIONS.contains(&name.as_str()) && self.peek() == Some(&Token::LParen) => {
                self.advance();
                let mut args = vec![self.parse_expr()?];
                while self.peek() == Some(&Token::Comma) {
                    self.advance();
                    args.push(self.parse_expr()?);
                }
                self.expect(&Token::RParen)?;
                Ok(Ast::Call(name, args))
            }
            Some(Token::Ident(name)) => Ok(Ast::Var(name)),
            Some(Token::LParen) => {
                let e = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(e)
            }
            other => err_at!(Fatal, msg: "unexpected token {:?} in numeric expression", other),
        }
    }
}

fn parse(text: &str) -> Result<Ast> {
    let tokens = tokenize(text)?;
    let mut parser = Parser { tokens, pos: 0 };
    let ast = parser.parse_expr()?;
    if parser.pos != parser.tokens.len() {
        return err_at!(Fatal, msg: "trailing tokens after a complete expression in {:?}", text);
    }
    Ok(ast)
}

/// Evaluate `ast` elementwise over `vars`, broadcasting any array
/// shorter than the widest bound variable is never attempted — every
/// variable used by an expression must resolve to the same length
/// (per the selection they were all evaluated against).
fn eval_ast(ast: &Ast, vars: &HashMap<String, Array>) -> Result<Array> {
    let len = vars.values().map(|a| a.len()).max().unwrap_or(1).max(1);
    let mut data = Vec::with_capacity(len);
    for i in 0..len {
        data.push(eval_scalar(ast, vars, i)?);
    }
    Ok(Array::F64 { shape: vec![len], data })
}

fn eval_scalar(ast: &Ast, vars: &HashMap<String, Array>, i: usize) -> Result<f64> {
    match ast {
        Ast::Number(n) => Ok(*n),
        Ast::Var(name) => {
            let array = vars.get(name).ok_or_else(|| {
                crate::error::Error::Fatal(format!("{}:{}", file!(), line!()), format!("unknown identifier {:?} in numeric expression", name))
            })?;
            let values = array
                .as_f64()
                .ok_or_else(|| crate::error::Error::Fatal(format!("{}:{}", file!(), line!()), format!("variable {:?} is not numeric", name)))?;
            let idx = if values.len() == 1 { 0 } else { i };
            values.get(idx).copied().ok_or_else(|| {
                crate::error::Error::Fatal(format!("{}:{}", file!(), line!()), format!("variable {:?} is shorter than the result", name))
            })
        }
        Ast::Neg(a) => Ok(-eval_scalar(a, vars, i)?),
        Ast::Add(a, b) => Ok(eval_scalar(a, vars, i)? + eval_scalar(b, vars, i)?),
        Ast::Sub(a, b) => Ok(eval_scalar(a, vars, i)? - eval_scalar(b, vars, i)?),
        Ast::Mul(a, b) => Ok(eval_scalar(a, vars, i)? * eval_scalar(b, vars, i)?),
        Ast::Div(a, b) => Ok(eval_scalar(a, vars, i)? / eval_scalar(b, vars, i)?),
        Ast::Mod(a, b) => Ok(eval_scalar(a, vars, i)? % eval_scalar(b, vars, i)?),
        Ast::Call(name, args) => {
            let vals: Result<Vec<f64>> = args.iter().map(|a| eval_scalar(a, vars, i)).collect();
            let vals = vals?;
            match (name.as_str(), vals.as_slice()) {
                ("abs", [v]) => Ok(v.abs()),
                ("sqrt", [v]) => Ok(v.sqrt()),
                ("floor", [v]) => Ok(v.floor()),
                ("ceil", [v]) => Ok(v.ceil()),
                ("min", [a, b]) => Ok(a.min(*b)),
                ("max", [a, b]) => Ok(a.max(*b)),
                ("pow", [a, b]) => Ok(a.powf(*b)),
                (name, args) => err_at!(Fatal, msg: "function {:?} called with {} arguments", name, args.len()),
            }
        }
    }
}

#[cfg(test)]
#[path = "expr_test.rs"]
mod expr_test;
