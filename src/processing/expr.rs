//! Filter expressions: parsing into an [`Expr`] tree and binding it to a [`Schema`].
//!
//! Grammar (keywords are case-insensitive):
//!
//! ```text
//! expr     := or
//! or       := and (("or" | "|" | "||") and)*
//! and      := not (("and" | "&" | "&&") not)*
//! not      := ("not" | "~" | "!") not | primary
//! primary  := "(" expr ")" | operand [cmp operand | "is" ["not"] "null"]
//! cmp      := "==" | "=" | "!=" | "<>" | "<" | "<=" | ">" | ">="
//! operand  := identifier | `quoted identifier` | number | 'string' | "string" | true | false
//! ```
//!
//! A bare operand must be a `Bool` column. Binding resolves column names to indices and coerces
//! literals to the column type (a string literal compared with a `Date` column is parsed as
//! `YYYY-MM-DD`). A comparison involving a missing value is false, except `!=`, which is true.
//!
//! ```rust
//! use data_pipeline::processing::expr::Expr;
//! use data_pipeline::types::{DataType, Field, Schema, Value};
//!
//! let schema = Schema::new(vec![
//!     Field::new("Name", DataType::Utf8),
//!     Field::new("Score", DataType::Int64),
//! ]);
//! let expr: Expr = "Score > 80 and Name != 'B'".parse().unwrap();
//! let predicate = expr.bind(&schema).unwrap();
//! assert!(predicate.matches(&[Value::Utf8("A".into()), Value::Int64(90)]));
//! assert!(!predicate.matches(&[Value::Utf8("B".into()), Value::Int64(90)]));
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::{PipelineError, PipelineResult};
use crate::types::{DataType, Schema, Value};

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

/// A literal in an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
}

/// A column reference or a literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Column(String),
    Literal(Literal),
}

/// Parsed (unbound) filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `left op right`
    Compare {
        left: Operand,
        op: CompareOp,
        right: Operand,
    },
    /// `operand is [not] null`
    IsNull { operand: Operand, negated: bool },
    /// A bare boolean operand.
    Operand(Operand),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Parse an expression string.
    pub fn parse(input: &str) -> PipelineResult<Self> {
        let tokens = tokenize(input)?;
        if tokens.is_empty() {
            return Err(PipelineError::invalid_expression("empty expression"));
        }
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.parse_or()?;
        if let Some((tok, at)) = parser.tokens.get(parser.pos) {
            return Err(PipelineError::invalid_expression(format!(
                "unexpected {tok} at offset {at}"
            )));
        }
        Ok(expr)
    }

    /// Column names referenced by the expression, in first-use order.
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Compare { left, right, .. } => {
                push_column(left, out);
                push_column(right, out);
            }
            Self::IsNull { operand, .. } | Self::Operand(operand) => push_column(operand, out),
            Self::Not(inner) => inner.collect_columns(out),
            Self::And(a, b) | Self::Or(a, b) => {
                a.collect_columns(out);
                b.collect_columns(out);
            }
        }
    }

    /// Resolve column references against `schema` and type-check every comparison.
    pub fn bind(&self, schema: &Schema) -> PipelineResult<Predicate> {
        Ok(Predicate {
            schema: schema.clone(),
            root: bind_node(self, schema)?,
        })
    }
}

impl FromStr for Expr {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Column(name) if is_plain_identifier(name) => f.write_str(name),
            Self::Column(name) => write!(f, "`{name}`"),
            Self::Literal(Literal::Int(v)) => write!(f, "{v}"),
            Self::Literal(Literal::Float(v)) => write!(f, "{v:?}"),
            Self::Literal(Literal::Bool(v)) => write!(f, "{v}"),
            Self::Literal(Literal::Str(s)) => {
                write!(f, "'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compare { left, op, right } => write!(f, "{left} {} {right}", op.symbol()),
            Self::IsNull { operand, negated } => {
                let not = if *negated { " not" } else { "" };
                write!(f, "{operand} is{not} null")
            }
            Self::Operand(operand) => write!(f, "{operand}"),
            Self::Not(inner) => write!(f, "not ({inner})"),
            Self::And(a, b) => write!(f, "({a}) and ({b})"),
            Self::Or(a, b) => write!(f, "({a}) or ({b})"),
        }
    }
}

fn push_column<'a>(operand: &'a Operand, out: &mut Vec<&'a str>) {
    if let Operand::Column(name) = operand {
        if !out.contains(&name.as_str()) {
            out.push(name.as_str());
        }
    }
}

fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '.')
        && keyword(name).is_none()
}

// ---------------------------------------------------------------------------------------------
// Tokenizer

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    Cmp(CompareOp),
    LParen,
    RParen,
    And,
    Or,
    Not,
    Is,
    Null,
    True,
    False,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(s) => write!(f, "identifier '{s}'"),
            Self::Int(v) => write!(f, "number {v}"),
            Self::Float(v) => write!(f, "number {v}"),
            Self::Str(s) => write!(f, "string '{s}'"),
            Self::Cmp(op) => write!(f, "'{}'", op.symbol()),
            Self::LParen => f.write_str("'('"),
            Self::RParen => f.write_str("')'"),
            Self::And => f.write_str("'and'"),
            Self::Or => f.write_str("'or'"),
            Self::Not => f.write_str("'not'"),
            Self::Is => f.write_str("'is'"),
            Self::Null => f.write_str("'null'"),
            Self::True => f.write_str("'true'"),
            Self::False => f.write_str("'false'"),
        }
    }
}

fn keyword(word: &str) -> Option<Token> {
    match word.to_ascii_lowercase().as_str() {
        "and" => Some(Token::And),
        "or" => Some(Token::Or),
        "not" => Some(Token::Not),
        "is" => Some(Token::Is),
        "null" | "none" => Some(Token::Null),
        "true" => Some(Token::True),
        "false" => Some(Token::False),
        _ => None,
    }
}

fn tokenize(input: &str) -> PipelineResult<Vec<(Token, usize)>> {
    let chars: Vec<(usize, char)> = input.char_indices().collect();
    let mut tokens: Vec<(Token, usize)> = Vec::new();
    let mut i = 0;

    let peek = |i: usize| chars.get(i).map(|&(_, c)| c);

    while let Some(&(at, c)) = chars.get(i) {
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let prev_is_operand = matches!(
            tokens.last(),
            Some((
                Token::Ident(_)
                    | Token::Int(_)
                    | Token::Float(_)
                    | Token::Str(_)
                    | Token::RParen
                    | Token::True
                    | Token::False
                    | Token::Null,
                _
            ))
        );

        match c {
            '(' => {
                tokens.push((Token::LParen, at));
                i += 1;
            }
            ')' => {
                tokens.push((Token::RParen, at));
                i += 1;
            }
            '=' => {
                i += if peek(i + 1) == Some('=') { 2 } else { 1 };
                tokens.push((Token::Cmp(CompareOp::Eq), at));
            }
            '!' if peek(i + 1) == Some('=') => {
                tokens.push((Token::Cmp(CompareOp::Ne), at));
                i += 2;
            }
            '!' | '~' => {
                tokens.push((Token::Not, at));
                i += 1;
            }
            '<' => {
                let (op, len) = match peek(i + 1) {
                    Some('=') => (CompareOp::Le, 2),
                    Some('>') => (CompareOp::Ne, 2),
                    _ => (CompareOp::Lt, 1),
                };
                tokens.push((Token::Cmp(op), at));
                i += len;
            }
            '>' => {
                let (op, len) = match peek(i + 1) {
                    Some('=') => (CompareOp::Ge, 2),
                    _ => (CompareOp::Gt, 1),
                };
                tokens.push((Token::Cmp(op), at));
                i += len;
            }
            '&' => {
                i += if peek(i + 1) == Some('&') { 2 } else { 1 };
                tokens.push((Token::And, at));
            }
            '|' => {
                i += if peek(i + 1) == Some('|') { 2 } else { 1 };
                tokens.push((Token::Or, at));
            }
            '\'' | '"' => {
                let (s, next) = read_string(&chars, i, c)?;
                tokens.push((Token::Str(s), at));
                i = next;
            }
            '`' => {
                let (s, next) = read_string(&chars, i, '`')?;
                if s.is_empty() {
                    return Err(PipelineError::invalid_expression(format!(
                        "empty quoted identifier at offset {at}"
                    )));
                }
                tokens.push((Token::Ident(s), at));
                i = next;
            }
            c if c.is_ascii_digit()
                || (c == '.' && peek(i + 1).is_some_and(|n| n.is_ascii_digit()))
                || (c == '-'
                    && !prev_is_operand
                    && peek(i + 1).is_some_and(|n| n.is_ascii_digit() || n == '.')) =>
            {
                let (tok, next) = read_number(input, &chars, i)?;
                tokens.push((tok, at));
                i = next;
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while peek(i).is_some_and(|n| n.is_alphanumeric() || n == '_' || n == '.') {
                    i += 1;
                }
                let end = chars.get(i).map(|&(p, _)| p).unwrap_or(input.len());
                let word = &input[chars[start].0..end];
                tokens.push((keyword(word).unwrap_or_else(|| Token::Ident(word.to_string())), at));
            }
            other => {
                return Err(PipelineError::invalid_expression(format!(
                    "unexpected character '{other}' at offset {at}"
                )));
            }
        }
    }

    Ok(tokens)
}

fn read_string(chars: &[(usize, char)], start: usize, quote: char) -> PipelineResult<(String, usize)> {
    let mut out = String::new();
    let mut i = start + 1;
    while let Some(&(_, c)) = chars.get(i) {
        match c {
            '\\' if quote != '`' => {
                match chars.get(i + 1) {
                    Some(&(_, escaped)) => out.push(escaped),
                    None => break,
                }
                i += 2;
            }
            c if c == quote => return Ok((out, i + 1)),
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    Err(PipelineError::invalid_expression(format!(
        "unterminated quote starting at offset {}",
        chars[start].0
    )))
}

fn read_number(input: &str, chars: &[(usize, char)], start: usize) -> PipelineResult<(Token, usize)> {
    let mut i = start;
    if chars[i].1 == '-' {
        i += 1;
    }
    let mut is_float = false;
    while let Some(&(_, c)) = chars.get(i) {
        if c.is_ascii_digit() {
            i += 1;
        } else if c == '.' && !is_float {
            is_float = true;
            i += 1;
        } else if (c == 'e' || c == 'E')
            && chars.get(i + 1).is_some_and(|&(_, n)| n.is_ascii_digit() || n == '-' || n == '+')
        {
            is_float = true;
            i += 2;
        } else {
            break;
        }
    }
    let begin = chars[start].0;
    let end = chars.get(i).map(|&(p, _)| p).unwrap_or(input.len());
    let text = &input[begin..end];

    let bad = |e: &dyn fmt::Display| {
        PipelineError::invalid_expression(format!("bad number '{text}' at offset {begin}: {e}"))
    };
    let tok = if is_float {
        Token::Float(text.parse::<f64>().map_err(|e| bad(&e))?)
    } else {
        Token::Int(text.parse::<i64>().map_err(|e| bad(&e))?)
    };
    Ok((tok, i))
}

// ---------------------------------------------------------------------------------------------
// Parser

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn unexpected(&self, wanted: &str) -> PipelineError {
        match self.tokens.get(self.pos) {
            Some((tok, at)) => PipelineError::invalid_expression(format!(
                "expected {wanted}, found {tok} at offset {at}"
            )),
            None => PipelineError::invalid_expression(format!(
                "expected {wanted}, found end of expression"
            )),
        }
    }

    fn parse_or(&mut self) -> PipelineResult<Expr> {
        let mut left = self.parse_and()?;
        while self.eat(&Token::Or) {
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> PipelineResult<Expr> {
        let mut left = self.parse_not()?;
        while self.eat(&Token::And) {
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> PipelineResult<Expr> {
        if self.eat(&Token::Not) {
            return Ok(Expr::Not(Box::new(self.parse_not()?)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> PipelineResult<Expr> {
        if self.eat(&Token::LParen) {
            let inner = self.parse_or()?;
            if !self.eat(&Token::RParen) {
                return Err(self.unexpected("')'"));
            }
            return Ok(inner);
        }

        let left = self.parse_operand()?;
        match self.peek() {
            Some(Token::Cmp(op)) => {
                let op = *op;
                self.pos += 1;
                let right = self.parse_operand()?;
                Ok(Expr::Compare { left, op, right })
            }
            Some(Token::Is) => {
                self.pos += 1;
                let negated = self.eat(&Token::Not);
                if !self.eat(&Token::Null) {
                    return Err(self.unexpected("'null'"));
                }
                Ok(Expr::IsNull {
                    operand: left,
                    negated,
                })
            }
            _ => Ok(Expr::Operand(left)),
        }
    }

    fn parse_operand(&mut self) -> PipelineResult<Operand> {
        let operand = match self.peek() {
            Some(Token::Ident(name)) => Operand::Column(name.clone()),
            Some(Token::Int(v)) => Operand::Literal(Literal::Int(*v)),
            Some(Token::Float(v)) => Operand::Literal(Literal::Float(*v)),
            Some(Token::Str(s)) => Operand::Literal(Literal::Str(s.clone())),
            Some(Token::True) => Operand::Literal(Literal::Bool(true)),
            Some(Token::False) => Operand::Literal(Literal::Bool(false)),
            _ => return Err(self.unexpected("a column name or literal")),
        };
        self.pos += 1;
        Ok(operand)
    }
}

// ---------------------------------------------------------------------------------------------
// Binding + evaluation

/// An [`Expr`] bound to a [`Schema`]: column references resolved and literals typed.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    schema: Schema,
    root: Node,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Compare { left: Bound, op: CompareOp, right: Bound },
    IsNull { operand: Bound, negated: bool },
    Truthy(Bound),
    Not(Box<Node>),
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
}

#[derive(Debug, Clone, PartialEq)]
enum Bound {
    Column(usize),
    Const(Value),
}

impl Predicate {
    /// The schema this predicate was bound against.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Evaluate the predicate against one row (in bound schema order).
    pub fn matches(&self, row: &[Value]) -> bool {
        eval(&self.root, row)
    }
}

fn resolve<'a>(operand: &'a Bound, row: &'a [Value]) -> &'a Value {
    match operand {
        Bound::Column(idx) => row.get(*idx).unwrap_or(&Value::Null),
        Bound::Const(v) => v,
    }
}

fn eval(node: &Node, row: &[Value]) -> bool {
    match node {
        Node::Compare { left, op, right } => {
            let (l, r) = (resolve(left, row), resolve(right, row));
            match l.compare(r) {
                Some(ord) => match op {
                    CompareOp::Eq => ord.is_eq(),
                    CompareOp::Ne => ord.is_ne(),
                    CompareOp::Lt => ord.is_lt(),
                    CompareOp::Le => ord.is_le(),
                    CompareOp::Gt => ord.is_gt(),
                    CompareOp::Ge => ord.is_ge(),
                },
                None => *op == CompareOp::Ne,
            }
        }
        Node::IsNull { operand, negated } => resolve(operand, row).is_null() != *negated,
        Node::Truthy(operand) => matches!(resolve(operand, row), Value::Bool(true)),
        Node::Not(inner) => !eval(inner, row),
        Node::And(a, b) => eval(a, row) && eval(b, row),
        Node::Or(a, b) => eval(a, row) || eval(b, row),
    }
}

fn literal_value(lit: &Literal) -> (Value, DataType) {
    match lit {
        Literal::Int(v) => (Value::Int64(*v), DataType::Int64),
        Literal::Float(v) => (Value::Float64(*v), DataType::Float64),
        Literal::Str(s) => (Value::Utf8(s.clone()), DataType::Utf8),
        Literal::Bool(b) => (Value::Bool(*b), DataType::Bool),
    }
}

fn bind_column(name: &str, schema: &Schema) -> PipelineResult<(usize, DataType)> {
    let idx = schema.index_of(name).ok_or_else(|| {
        PipelineError::invalid_expression(format!(
            "unknown column '{name}' (columns: {:?})",
            schema.field_names().collect::<Vec<_>>()
        ))
    })?;
    Ok((idx, schema.fields[idx].data_type))
}

/// Coerce a literal to `target` so it can be compared against a column of that type.
fn coerce_literal(lit: &Literal, target: DataType, column: &str) -> PipelineResult<Value> {
    let (value, ty) = literal_value(lit);
    if ty.is_comparable_with(target) {
        return Ok(value);
    }
    if let (Literal::Str(s), DataType::Date) = (lit, target) {
        return crate::ingestion::infer::parse_date_str(s)
            .map(Value::Date)
            .ok_or_else(|| {
                PipelineError::invalid_expression(format!(
                    "'{s}' is not a date (YYYY-MM-DD) for column '{column}'"
                ))
            });
    }
    Err(PipelineError::invalid_expression(format!(
        "cannot compare column '{column}' ({target}) with {ty} literal {}",
        Operand::Literal(lit.clone())
    )))
}

fn bind_node(expr: &Expr, schema: &Schema) -> PipelineResult<Node> {
    Ok(match expr {
        Expr::Compare { left, op, right } => {
            let (l, r) = match (left, right) {
                (Operand::Column(a), Operand::Column(b)) => {
                    let (ia, ta) = bind_column(a, schema)?;
                    let (ib, tb) = bind_column(b, schema)?;
                    if !ta.is_comparable_with(tb) {
                        return Err(PipelineError::invalid_expression(format!(
                            "cannot compare column '{a}' ({ta}) with column '{b}' ({tb})"
                        )));
                    }
                    (Bound::Column(ia), Bound::Column(ib))
                }
                (Operand::Column(a), Operand::Literal(lit)) => {
                    let (ia, ta) = bind_column(a, schema)?;
                    (Bound::Column(ia), Bound::Const(coerce_literal(lit, ta, a)?))
                }
                (Operand::Literal(lit), Operand::Column(b)) => {
                    let (ib, tb) = bind_column(b, schema)?;
                    (Bound::Const(coerce_literal(lit, tb, b)?), Bound::Column(ib))
                }
                (Operand::Literal(a), Operand::Literal(b)) => {
                    let ((va, ta), (vb, tb)) = (literal_value(a), literal_value(b));
                    if !ta.is_comparable_with(tb) {
                        return Err(PipelineError::invalid_expression(format!(
                            "cannot compare {ta} literal with {tb} literal"
                        )));
                    }
                    (Bound::Const(va), Bound::Const(vb))
                }
            };
            Node::Compare {
                left: l,
                op: *op,
                right: r,
            }
        }
        Expr::IsNull { operand, negated } => match operand {
            Operand::Column(name) => Node::IsNull {
                operand: Bound::Column(bind_column(name, schema)?.0),
                negated: *negated,
            },
            Operand::Literal(lit) => Node::IsNull {
                operand: Bound::Const(literal_value(lit).0),
                negated: *negated,
            },
        },
        Expr::Operand(operand) => match operand {
            Operand::Column(name) => {
                let (idx, ty) = bind_column(name, schema)?;
                if ty != DataType::Bool {
                    return Err(PipelineError::invalid_expression(format!(
                        "column '{name}' ({ty}) is not a boolean condition; add a comparison"
                    )));
                }
                Node::Truthy(Bound::Column(idx))
            }
            Operand::Literal(Literal::Bool(b)) => Node::Truthy(Bound::Const(Value::Bool(*b))),
            Operand::Literal(lit) => {
                return Err(PipelineError::invalid_expression(format!(
                    "literal {} is not a boolean condition",
                    Operand::Literal(lit.clone())
                )));
            }
        },
        Expr::Not(inner) => Node::Not(Box::new(bind_node(inner, schema)?)),
        Expr::And(a, b) => Node::And(
            Box::new(bind_node(a, schema)?),
            Box::new(bind_node(b, schema)?),
        ),
        Expr::Or(a, b) => Node::Or(
            Box::new(bind_node(a, schema)?),
            Box::new(bind_node(b, schema)?),
        ),
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::types::Field;

    fn schema() -> Schema {
        Schema::new(vec![
            Field::new("Name", DataType::Utf8),
            Field::new("Score", DataType::Int64),
            Field::new("Date", DataType::Date),
            Field::new("active", DataType::Bool),
            Field::new("Unit Price", DataType::Float64),
        ])
    }

    fn row(name: &str, score: Option<i64>, date: (i32, u32, u32), active: bool) -> Vec<Value> {
        vec![
            Value::Utf8(name.to_string()),
            score.map(Value::Int64).unwrap_or(Value::Null),
            Value::Date(NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap()),
            Value::Bool(active),
            Value::Float64(2.5),
        ]
    }

    fn matches(expr: &str, row: &[Value]) -> bool {
        Expr::parse(expr).unwrap().bind(&schema()).unwrap().matches(row)
    }

    #[test]
    fn parses_simple_comparison() {
        let expr = Expr::parse("Score > 80").unwrap();
        assert_eq!(
            expr,
            Expr::Compare {
                left: Operand::Column("Score".to_string()),
                op: CompareOp::Gt,
                right: Operand::Literal(Literal::Int(80)),
            }
        );
        assert_eq!(expr.columns(), vec!["Score"]);
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let expr = Expr::parse("a == 1 or b == 2 and c == 3").unwrap();
        match expr {
            Expr::Or(_, right) => assert!(matches!(*right, Expr::And(_, _))),
            other => panic!("unexpected tree: {other:?}"),
        }
    }

    #[test]
    fn evaluates_boolean_combinators_and_symbols() {
        let r = row("A", Some(90), (2024, 1, 1), true);
        assert!(matches("Score > 80 and Name == 'A'", &r));
        assert!(matches("Score < 10 | Name == \"A\"", &r));
        assert!(!matches("not (Score >= 90)", &r));
        assert!(matches("active && Score != 70", &r));
        assert!(matches("~active or `Unit Price` <= 2.5", &r));
        assert!(matches("80 < Score", &r));
        assert!(matches("Score <> -5", &r));
    }

    #[test]
    fn date_columns_compare_against_iso_strings() {
        let r = row("A", Some(90), (2024, 1, 2), true);
        assert!(matches("Date > '2024-01-01'", &r));
        assert!(!matches("Date < '2024-01-02'", &r));
    }

    #[test]
    fn missing_values_fail_comparisons_except_not_equal() {
        let r = row("A", None, (2024, 1, 2), true);
        assert!(!matches("Score > 80", &r));
        assert!(!matches("Score == 80", &r));
        assert!(matches("Score != 80", &r));
        assert!(matches("Score is null", &r));
        assert!(!matches("Score is not null", &r));
    }

    #[test]
    fn malformed_expressions_are_rejected() {
        for bad in ["", "Score >", "Score > 80 and", "(Score > 80", "Score > 'x", "Score # 3", "> 3"] {
            let err = Expr::parse(bad).unwrap_err();
            assert!(
                matches!(err, PipelineError::InvalidExpression { .. }),
                "expected InvalidExpression for {bad:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn binding_rejects_unknown_columns_and_type_mismatches() {
        let schema = schema();
        for bad in ["Missing > 1", "Score > 'abc'", "Name > 3", "Date == '01/02/2024'", "Score", "Name == Score"] {
            let err = Expr::parse(bad).unwrap().bind(&schema).unwrap_err();
            assert!(
                matches!(err, PipelineError::InvalidExpression { .. }),
                "expected InvalidExpression for {bad:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn display_output_parses_back_to_the_same_tree() {
        let expr = Expr::parse("not (Score >= 80.5 or `Unit Price` is not null) and Name == 'O\\'Neil'")
            .unwrap();
        let reparsed = Expr::parse(&expr.to_string()).unwrap();
        assert_eq!(reparsed, expr);
    }
}
