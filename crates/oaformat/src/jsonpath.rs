//! Path expressions for addressing overlay targets.
//!
//! A practical subset of JSONPath:
//!
//! | syntax                    | meaning                                   |
//! |---------------------------|-------------------------------------------|
//! | `$`                       | document root                             |
//! | `.name`, `['name']`       | object member                             |
//! | `[0]`, `[-1]`             | array element, negative from the end      |
//! | `.*`, `[*]`               | every child                               |
//! | `['a','b']`, `[0,2]`      | union                                     |
//! | `..name`, `..*`, `..[0]`  | recursive descent                         |
//! | `[?(@.in == 'query')]`    | filter; also `[?@.flag]`, `!`, `&&`, `||` |
//!
//! Filters compare with `==`, `!=`, `<`, `<=`, `>`, `>=` against string,
//! number, boolean and null literals. A bare `@.field` tests that the field
//! exists.
//!
//! Resolution yields the concrete [`Key`] path of every matched node, so the
//! caller can mutate through the parent.

use crate::error::{Error, Result};
use crate::walk::{self, Key};
use serde_json::Value;
use std::cmp::Ordering;

/// A parsed path expression.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonPath {
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq)]
struct Segment {
    recursive: bool,
    selectors: Vec<Selector>,
}

#[derive(Debug, Clone, PartialEq)]
enum Selector {
    Name(String),
    Index(i64),
    Wildcard,
    Filter(Expr),
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Exists(Vec<String>),
    Truthy(Value),
    Compare(Operand, CmpOp, Operand),
}

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    /// Path relative to `@`.
    Current(Vec<String>),
    Literal(Value),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl JsonPath {
    /// Parse `expression`.
    ///
    /// ```
    /// use oaformat::jsonpath::JsonPath;
    ///
    /// assert!(JsonPath::parse("$.paths['/pets'].get").is_ok());
    /// assert!(JsonPath::parse("paths").is_err());
    /// ```
    pub fn parse(expression: &str) -> Result<Self> {
        Parser::new(expression).parse()
    }

    /// True for the bare root expression `$`.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Paths of all nodes under `root` the expression selects, in document
    /// order per segment, without duplicates.
    pub fn resolve(&self, root: &Value) -> Vec<Vec<Key>> {
        let mut current: Vec<Vec<Key>> = vec![Vec::new()];
        for segment in &self.segments {
            let mut next = Vec::new();
            for path in &current {
                let Some(node) = walk::get(root, path) else {
                    continue;
                };
                if segment.recursive {
                    walk::for_each(node, |relative, descendant| {
                        let mut base = path.clone();
                        base.extend_from_slice(relative);
                        select(descendant, &base, &segment.selectors, &mut next);
                    });
                } else {
                    select(node, path, &segment.selectors, &mut next);
                }
            }
            dedup(&mut next);
            current = next;
        }
        current
    }
}

/// Parse `expression` and resolve it against `root`.
///
/// ```
/// use oaformat::jsonpath::query;
/// use oaformat::walk::Key;
/// use serde_json::json;
///
/// let doc = json!({"tags": [{"name": "a"}, {"name": "b"}]});
/// let hits = query(&doc, "$.tags[?(@.name == 'b')]").unwrap();
/// assert_eq!(hits, vec![vec![Key::name("tags"), Key::Index(1)]]);
/// ```
pub fn query(root: &Value, expression: &str) -> Result<Vec<Vec<Key>>> {
    Ok(JsonPath::parse(expression)?.resolve(root))
}

fn dedup(paths: &mut Vec<Vec<Key>>) {
    let mut seen = std::collections::HashSet::new();
    paths.retain(|p| seen.insert(p.clone()));
}

fn select(node: &Value, path: &[Key], selectors: &[Selector], out: &mut Vec<Vec<Key>>) {
    let child = |key: Key| {
        let mut p = path.to_vec();
        p.push(key);
        p
    };
    for selector in selectors {
        match (selector, node) {
            (Selector::Name(name), Value::Object(map)) => {
                if map.contains_key(name) {
                    out.push(child(Key::name(name.as_str())));
                }
            }
            (Selector::Index(index), Value::Array(items)) => {
                let len = items.len() as i64;
                let resolved = if *index < 0 { len + index } else { *index };
                if (0..len).contains(&resolved) {
                    out.push(child(Key::Index(resolved as usize)));
                }
            }
            (Selector::Wildcard, Value::Object(map)) => {
                out.extend(map.keys().map(|k| child(Key::name(k.as_str()))));
            }
            (Selector::Wildcard, Value::Array(items)) => {
                out.extend((0..items.len()).map(|i| child(Key::Index(i))));
            }
            (Selector::Filter(expr), Value::Object(map)) => {
                for (k, v) in map {
                    if expr.eval(v) {
                        out.push(child(Key::name(k.as_str())));
                    }
                }
            }
            (Selector::Filter(expr), Value::Array(items)) => {
                for (i, v) in items.iter().enumerate() {
                    if expr.eval(v) {
                        out.push(child(Key::Index(i)));
                    }
                }
            }
            _ => {}
        }
    }
}

// ============================================================================
// Filter evaluation
// ============================================================================

impl Expr {
    fn eval(&self, current: &Value) -> bool {
        match self {
            Expr::Or(a, b) => a.eval(current) || b.eval(current),
            Expr::And(a, b) => a.eval(current) && b.eval(current),
            Expr::Not(inner) => !inner.eval(current),
            Expr::Exists(fields) => lookup(current, fields).is_some(),
            Expr::Truthy(value) => !matches!(value, Value::Null | Value::Bool(false)),
            Expr::Compare(left, op, right) => {
                let left = left.value(current);
                let right = right.value(current);
                compare(left, *op, right)
            }
        }
    }
}

impl Operand {
    fn value<'v>(&'v self, current: &'v Value) -> Option<&'v Value> {
        match self {
            Operand::Current(fields) => lookup(current, fields),
            Operand::Literal(value) => Some(value),
        }
    }
}

fn lookup<'v>(current: &'v Value, fields: &[String]) -> Option<&'v Value> {
    fields.iter().try_fold(current, |node, field| match node {
        Value::Object(map) => map.get(field),
        Value::Array(items) => field.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn compare(left: Option<&Value>, op: CmpOp, right: Option<&Value>) -> bool {
    let equal = match (left, right) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => a.as_f64() == b.as_f64(),
        (Some(a), Some(b)) => a == b,
        (None, None) => true,
        _ => false,
    };
    match op {
        CmpOp::Eq => equal,
        CmpOp::Ne => !equal,
        _ => {
            let ordering = match (left, right) {
                (Some(Value::Number(a)), Some(Value::Number(b))) => {
                    a.as_f64().zip(b.as_f64()).and_then(|(a, b)| a.partial_cmp(&b))
                }
                (Some(Value::String(a)), Some(Value::String(b))) => Some(a.cmp(b)),
                _ => None,
            };
            match (op, ordering) {
                (CmpOp::Lt, Some(o)) => o == Ordering::Less,
                (CmpOp::Le, Some(o)) => o != Ordering::Greater,
                (CmpOp::Gt, Some(o)) => o == Ordering::Greater,
                (CmpOp::Ge, Some(o)) => o != Ordering::Less,
                _ => false,
            }
        }
    }
}

// ============================================================================
// Parser
// ============================================================================

struct Parser<'s> {
    source: &'s str,
    chars: Vec<char>,
    pos: usize,
}

impl<'s> Parser<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, reason: impl Into<String>) -> Error {
        Error::InvalidPath {
            expression: self.source.to_string(),
            offset: self.pos,
            reason: reason.into(),
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn starts_with(&self, s: &str) -> bool {
        s.chars()
            .enumerate()
            .all(|(i, ch)| self.chars.get(self.pos + i) == Some(&ch))
    }

    fn eat(&mut self, s: &str) -> bool {
        if self.starts_with(s) {
            self.pos += s.chars().count();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, ch: char) -> Result<()> {
        self.skip_ws();
        if self.peek() == Some(ch) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", ch)))
        }
    }

    fn parse(mut self) -> Result<JsonPath> {
        self.skip_ws();
        if !self.eat("$") {
            return Err(self.error("expected '$'"));
        }
        let mut segments = Vec::new();
        loop {
            self.skip_ws();
            let Some(ch) = self.peek() else { break };
            let segment = match ch {
                '.' if self.starts_with("..") => {
                    self.pos += 2;
                    let selectors = match self.peek() {
                        Some('[') => self.parse_bracket()?,
                        _ => vec![self.parse_dot_member()?],
                    };
                    Segment {
                        recursive: true,
                        selectors,
                    }
                }
                '.' => {
                    self.pos += 1;
                    Segment {
                        recursive: false,
                        selectors: vec![self.parse_dot_member()?],
                    }
                }
                '[' => Segment {
                    recursive: false,
                    selectors: self.parse_bracket()?,
                },
                other => return Err(self.error(format!("unexpected character '{}'", other))),
            };
            segments.push(segment);
        }
        Ok(JsonPath { segments })
    }

    /// `*` or a bare member name, up to the next `.`, `[` or `]`.
    fn parse_dot_member(&mut self) -> Result<Selector> {
        if self.eat("*") {
            return Ok(Selector::Wildcard);
        }
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| !matches!(c, '.' | '[' | ']') && !c.is_whitespace())
        {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error("expected a member name"));
        }
        Ok(Selector::Name(self.chars[start..self.pos].iter().collect()))
    }

    fn parse_bracket(&mut self) -> Result<Vec<Selector>> {
        self.expect('[')?;
        self.skip_ws();
        if self.eat("?") {
            let expr = self.parse_or()?;
            self.expect(']')?;
            return Ok(vec![Selector::Filter(expr)]);
        }
        if self.eat("*") {
            self.expect(']')?;
            return Ok(vec![Selector::Wildcard]);
        }
        let mut selectors = Vec::new();
        loop {
            self.skip_ws();
            let selector = match self.peek() {
                Some(q @ ('\'' | '"')) => Selector::Name(self.parse_quoted(q)?),
                Some(c) if c == '-' || c.is_ascii_digit() => Selector::Index(self.parse_integer()?),
                _ => return Err(self.error("expected a quoted name, an index, '*' or '?'")),
            };
            selectors.push(selector);
            self.skip_ws();
            if !self.eat(",") {
                break;
            }
        }
        self.expect(']')?;
        Ok(selectors)
    }

    fn parse_quoted(&mut self, quote: char) -> Result<String> {
        self.advance();
        let mut out = String::new();
        loop {
            match self.advance() {
                Some(c) if c == quote => return Ok(out),
                Some('\\') => match self.advance() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(c) => out.push(c),
                    None => return Err(self.error("unterminated string")),
                },
                Some(c) => out.push(c),
                None => return Err(self.error("unterminated string")),
            }
        }
    }

    fn parse_integer(&mut self) -> Result<i64> {
        let start = self.pos;
        self.eat("-");
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse().map_err(|_| {
            self.pos = start;
            self.error("invalid index")
        })
    }

    fn parse_number(&mut self) -> Result<Value> {
        let start = self.pos;
        self.eat("-");
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+'))
        {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        serde_json::from_str::<serde_json::Number>(&text)
            .map(Value::Number)
            .map_err(|_| {
                self.pos = start;
                self.error("invalid number")
            })
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        loop {
            self.skip_ws();
            if self.eat("||") {
                left = Expr::Or(Box::new(left), Box::new(self.parse_and()?));
            } else {
                return Ok(left);
            }
        }
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            self.skip_ws();
            if self.eat("&&") {
                left = Expr::And(Box::new(left), Box::new(self.parse_unary()?));
            } else {
                return Ok(left);
            }
        }
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        self.skip_ws();
        if self.peek() == Some('!') && !self.starts_with("!=") {
            self.pos += 1;
            return Ok(Expr::Not(Box::new(self.parse_unary()?)));
        }
        if self.eat("(") {
            let inner = self.parse_or()?;
            self.expect(')')?;
            return Ok(inner);
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let left = self.parse_operand()?;
        self.skip_ws();
        let op = if self.eat("==") {
            CmpOp::Eq
        } else if self.eat("!=") {
            CmpOp::Ne
        } else if self.eat("<=") {
            CmpOp::Le
        } else if self.eat(">=") {
            CmpOp::Ge
        } else if self.eat("<") {
            CmpOp::Lt
        } else if self.eat(">") {
            CmpOp::Gt
        } else {
            return Ok(match left {
                Operand::Current(fields) => Expr::Exists(fields),
                Operand::Literal(value) => Expr::Truthy(value),
            });
        };
        let right = self.parse_operand()?;
        Ok(Expr::Compare(left, op, right))
    }

    fn parse_operand(&mut self) -> Result<Operand> {
        self.skip_ws();
        match self.peek() {
            Some('@') => {
                self.pos += 1;
                let mut fields = Vec::new();
                loop {
                    if self.peek() == Some('.') {
                        self.pos += 1;
                        let start = self.pos;
                        while self
                            .peek()
                            .is_some_and(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '$'))
                        {
                            self.pos += 1;
                        }
                        if self.pos == start {
                            return Err(self.error("expected a field name"));
                        }
                        fields.push(self.chars[start..self.pos].iter().collect());
                    } else if self.peek() == Some('[') {
                        self.pos += 1;
                        self.skip_ws();
                        let field = match self.peek() {
                            Some(q @ ('\'' | '"')) => self.parse_quoted(q)?,
                            _ => self.parse_integer()?.to_string(),
                        };
                        self.expect(']')?;
                        fields.push(field);
                    } else {
                        return Ok(Operand::Current(fields));
                    }
                }
            }
            Some(q @ ('\'' | '"')) => Ok(Operand::Literal(Value::String(self.parse_quoted(q)?))),
            Some(c) if c == '-' || c.is_ascii_digit() => Ok(Operand::Literal(self.parse_number()?)),
            _ => {
                for (word, value) in [
                    ("true", Value::Bool(true)),
                    ("false", Value::Bool(false)),
                    ("null", Value::Null),
                ] {
                    if self.eat(word) {
                        return Ok(Operand::Literal(value));
                    }
                }
                Err(self.error("expected '@' or a literal"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> Value {
        json!({
            "info": {"title": "t"},
            "tags": [{"name": "pets"}, {"name": "store", "x-internal": true}],
            "paths": {
                "/pets": {
                    "get": {
                        "parameters": [
                            {"name": "limit", "in": "query", "schema": {"maximum": 100}},
                            {"name": "id", "in": "path"}
                        ]
                    },
                    "post": {"x-internal": true}
                },
                "/store": {"get": {}}
            }
        })
    }

    fn paths(expr: &str) -> Vec<String> {
        query(&doc(), expr)
            .unwrap()
            .iter()
            .map(|p| walk::path_string(p))
            .collect()
    }

    #[test]
    fn test_root() {
        let path = JsonPath::parse("$").unwrap();
        assert!(path.is_root());
        assert_eq!(path.resolve(&doc()), vec![Vec::<Key>::new()]);
    }

    #[test]
    fn test_dot_and_bracket_members() {
        assert_eq!(paths("$.info.title"), vec!["info.title"]);
        assert_eq!(paths("$.paths['/pets'].get"), vec!["paths./pets.get"]);
        assert_eq!(paths("$[\"paths\"][\"/store\"]"), vec!["paths./store"]);
        assert!(paths("$.info.missing").is_empty());
    }

    #[test]
    fn test_indices_and_unions() {
        assert_eq!(paths("$.tags[0].name"), vec!["tags.0.name"]);
        assert_eq!(paths("$.tags[-1]"), vec!["tags.1"]);
        assert!(paths("$.tags[5]").is_empty());
        assert_eq!(paths("$.paths['/pets','/store']"), vec!["paths./pets", "paths./store"]);
    }

    #[test]
    fn test_wildcards() {
        assert_eq!(paths("$.paths.*"), vec!["paths./pets", "paths./store"]);
        assert_eq!(paths("$.tags[*].name"), vec!["tags.0.name", "tags.1.name"]);
    }

    #[test]
    fn test_recursive_descent() {
        assert_eq!(
            paths("$..x-internal"),
            vec!["tags.1.x-internal", "paths./pets.post.x-internal"]
        );
        assert_eq!(paths("$.paths..parameters[0].name"), vec!["paths./pets.get.parameters.0.name"]);
    }

    #[test]
    fn test_filters() {
        assert_eq!(
            paths("$.paths['/pets'].get.parameters[?(@.in == 'query')]"),
            vec!["paths./pets.get.parameters.0"]
        );
        assert_eq!(paths("$.paths['/pets'][?(@.x-internal)]"), vec!["paths./pets.post"]);
        assert_eq!(paths("$.tags[?(!@.x-internal)]"), vec!["tags.0"]);
        assert_eq!(
            paths("$..parameters[?(@.schema.maximum >= 100 && @.name != 'id')]"),
            vec!["paths./pets.get.parameters.0"]
        );
        assert_eq!(
            paths("$..parameters[?(@.in == 'path' || @.name == 'limit')].name"),
            vec!["paths./pets.get.parameters.0.name", "paths./pets.get.parameters.1.name"]
        );
    }

    #[test]
    fn test_syntax_errors_report_offset() {
        for bad in ["paths", "$.", "$[", "$['open", "$[?(@.a == )]", "$.a]"] {
            match JsonPath::parse(bad) {
                Err(Error::InvalidPath { expression, .. }) => assert_eq!(expression, bad),
                other => panic!("{} parsed as {:?}", bad, other),
            }
        }
        match JsonPath::parse("$.a]") {
            Err(Error::InvalidPath { offset, .. }) => assert_eq!(offset, 3),
            other => panic!("unexpected {:?}", other),
        }
    }
}
