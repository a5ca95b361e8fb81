//! Filter expressions compiled from the client's `where` document.
//!
//! Only an allow-listed operator set is accepted; everything else is rejected as bad query
//! syntax instead of being forwarded to the store.

use crate::error::AppError;
use crate::store::Document;
use regex::Regex;
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Escapes with the same meaning in the in-process engine and in Postgres `like_regex`.
const PORTABLE_ESCAPES: &str = "dDsSwW.\\*+?()[]{}|^$/-nt";

/// Rejects constructs the two regex dialects read differently (`\b`, `\p{..}`, inline groups).
fn check_portable(source: &str) -> Result<(), AppError> {
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(e) if PORTABLE_ESCAPES.contains(e) => {}
                Some(e) => return Err(AppError::BadQuerySyntax(format!("unsupported $regex escape '\\{}'", e))),
                None => return Err(AppError::BadQuerySyntax("$regex ends with '\\'".into())),
            },
            '(' if chars.peek() == Some(&'?') => {
                chars.next();
                if chars.next() != Some(':') {
                    return Err(AppError::BadQuerySyntax("$regex supports only (?:...) groups".into()));
                }
            }
            _ => {}
        }
    }
    Ok(())
}

/// Compiled `$regex` clause. Equality compares source and flags only.
#[derive(Clone, Debug)]
pub struct Pattern {
    pub source: String,
    /// Subset of `imsx`.
    pub flags: String,
    compiled: Regex,
}

impl Pattern {
    pub fn new(source: &str, flags: &str) -> Result<Self, AppError> {
        if let Some(bad) = flags.chars().find(|c| !"imsx".contains(*c)) {
            return Err(AppError::BadQuerySyntax(format!("unsupported $options flag '{}'", bad)));
        }
        check_portable(source)?;
        let expr = if flags.is_empty() {
            source.to_string()
        } else {
            format!("(?{}){}", flags, source)
        };
        let compiled = Regex::new(&expr)
            .map_err(|e| AppError::BadQuerySyntax(format!("invalid $regex: {}", e)))?;
        Ok(Pattern {
            source: source.to_string(),
            flags: flags.to_string(),
            compiled,
        })
    }

    pub fn is_match(&self, s: &str) -> bool {
        self.compiled.is_match(s)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.flags == other.flags
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    Ne(String, Value),
    Gt(String, Value),
    Gte(String, Value),
    Lt(String, Value),
    Lte(String, Value),
    In(String, Vec<Value>),
    NotIn(String, Vec<Value>),
    Exists(String, bool),
    Regex(String, Pattern),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

fn bad(msg: impl Into<String>) -> AppError {
    AppError::BadQuerySyntax(msg.into())
}

impl Filter {
    /// Matches every document.
    pub fn all() -> Filter {
        Filter::And(Vec::new())
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Filter::And(v) if v.is_empty())
    }

    /// Conjunction that flattens nested ANDs and drops match-all operands.
    pub fn and(self, other: Filter) -> Filter {
        let mut parts = Vec::new();
        for f in [self, other] {
            match f {
                Filter::And(inner) => parts.extend(inner),
                f => parts.push(f),
            }
        }
        if parts.len() == 1 {
            if let Some(only) = parts.pop() {
                return only;
            }
        }
        Filter::And(parts)
    }

    pub fn from_json(value: &Value) -> Result<Filter, AppError> {
        match value {
            Value::Object(obj) => Self::from_object(obj),
            _ => Err(bad("where must be a JSON object")),
        }
    }

    pub fn from_object(obj: &Map<String, Value>) -> Result<Filter, AppError> {
        let mut clauses = Vec::new();
        for (key, val) in obj {
            match key.as_str() {
                "$and" => clauses.push(Filter::And(Self::clause_list(key, val)?)),
                "$or" => clauses.push(Filter::Or(Self::clause_list(key, val)?)),
                op if op.starts_with('$') => {
                    return Err(bad(format!("unsupported operator '{}'", op)));
                }
                path => {
                    check_path(path)?;
                    clauses.extend(Self::field_clauses(path, val)?);
                }
            }
        }
        if clauses.len() == 1 {
            if let Some(only) = clauses.pop() {
                return Ok(only);
            }
        }
        Ok(Filter::And(clauses))
    }

    fn clause_list(op: &str, val: &Value) -> Result<Vec<Filter>, AppError> {
        let items = val
            .as_array()
            .filter(|a| !a.is_empty())
            .ok_or_else(|| bad(format!("{} expects a non-empty array", op)))?;
        items
            .iter()
            .map(|item| match item {
                Value::Object(o) => Self::from_object(o),
                _ => Err(bad(format!("{} entries must be objects", op))),
            })
            .collect()
    }

    fn field_clauses(path: &str, val: &Value) -> Result<Vec<Filter>, AppError> {
        let ops = match val {
            Value::Object(o) if o.keys().any(|k| k.starts_with('$')) => o,
            _ => return Ok(vec![Filter::Eq(path.to_string(), val.clone())]),
        };
        if ops.keys().any(|k| !k.starts_with('$')) {
            return Err(bad(format!("'{}' mixes operators and plain fields", path)));
        }
        let p = || path.to_string();
        let mut out = Vec::with_capacity(ops.len());
        for (op, arg) in ops {
            let clause = match op.as_str() {
                "$eq" => Filter::Eq(p(), arg.clone()),
                "$ne" => Filter::Ne(p(), arg.clone()),
                "$gt" => Filter::Gt(p(), arg.clone()),
                "$gte" => Filter::Gte(p(), arg.clone()),
                "$lt" => Filter::Lt(p(), arg.clone()),
                "$lte" => Filter::Lte(p(), arg.clone()),
                "$in" | "$nin" => {
                    let values = arg
                        .as_array()
                        .ok_or_else(|| bad(format!("{} on '{}' expects an array", op, path)))?
                        .clone();
                    if op == "$in" {
                        Filter::In(p(), values)
                    } else {
                        Filter::NotIn(p(), values)
                    }
                }
                "$exists" => {
                    let b = arg
                        .as_bool()
                        .ok_or_else(|| bad(format!("$exists on '{}' expects a boolean", path)))?;
                    Filter::Exists(p(), b)
                }
                "$regex" => {
                    let source = arg
                        .as_str()
                        .ok_or_else(|| bad(format!("$regex on '{}' expects a string", path)))?;
                    let flags = match ops.get("$options") {
                        None => "",
                        Some(Value::String(s)) => s.as_str(),
                        Some(_) => return Err(bad("$options expects a string")),
                    };
                    Filter::Regex(p(), Pattern::new(source, flags)?)
                }
                "$options" => {
                    if !ops.contains_key("$regex") {
                        return Err(bad(format!("$options on '{}' requires $regex", path)));
                    }
                    continue;
                }
                other => return Err(bad(format!("unsupported operator '{}'", other))),
            };
            out.push(clause);
        }
        Ok(out)
    }

    /// Evaluate against a document (used by stores without a native query language).
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::Eq(path, v) => eq_matches(&resolve(doc, path), v),
            Filter::Ne(path, v) => !eq_matches(&resolve(doc, path), v),
            Filter::Gt(path, v) => range_matches(&resolve(doc, path), v, |o| o == Ordering::Greater),
            Filter::Gte(path, v) => range_matches(&resolve(doc, path), v, |o| o != Ordering::Less),
            Filter::Lt(path, v) => range_matches(&resolve(doc, path), v, |o| o == Ordering::Less),
            Filter::Lte(path, v) => range_matches(&resolve(doc, path), v, |o| o != Ordering::Greater),
            Filter::In(path, vs) => {
                let found = resolve(doc, path);
                vs.iter().any(|v| eq_matches(&found, v))
            }
            Filter::NotIn(path, vs) => {
                let found = resolve(doc, path);
                !vs.iter().any(|v| eq_matches(&found, v))
            }
            Filter::Exists(path, want) => !resolve(doc, path).is_empty() == *want,
            Filter::Regex(path, pattern) => flatten(&resolve(doc, path))
                .into_iter()
                .any(|v| v.as_str().map(|s| pattern.is_match(s)).unwrap_or(false)),
            Filter::And(parts) => parts.iter().all(|f| f.matches(doc)),
            Filter::Or(parts) => parts.iter().any(|f| f.matches(doc)),
        }
    }
}

fn check_path(path: &str) -> Result<(), AppError> {
    if path.split('.').any(|seg| seg.is_empty() || seg.starts_with('$')) {
        return Err(bad(format!("invalid field path '{}'", path)));
    }
    Ok(())
}

/// Values at a dotted path; arrays of objects fan out, numeric segments index arrays.
pub fn resolve<'a>(doc: &'a Document, path: &str) -> Vec<&'a Value> {
    let mut segs = path.split('.');
    let mut current: Vec<&Value> = match segs.next() {
        Some(first) => doc.get(first).into_iter().collect(),
        None => return Vec::new(),
    };
    for seg in segs {
        let mut next = Vec::new();
        for v in current {
            match v {
                Value::Object(m) => next.extend(m.get(seg)),
                Value::Array(items) => {
                    if let Ok(i) = seg.parse::<usize>() {
                        next.extend(items.get(i));
                    }
                    for item in items {
                        if let Value::Object(m) = item {
                            next.extend(m.get(seg));
                        }
                    }
                }
                _ => {}
            }
        }
        current = next;
    }
    current
}

/// Candidates plus the elements of array candidates.
fn flatten<'a>(found: &[&'a Value]) -> Vec<&'a Value> {
    let mut out = Vec::with_capacity(found.len());
    for &v in found {
        out.push(v);
        if let Value::Array(items) = v {
            out.extend(items.iter());
        }
    }
    out
}

fn eq_matches(found: &[&Value], target: &Value) -> bool {
    if target.is_null() && found.is_empty() {
        return true;
    }
    flatten(found).into_iter().any(|v| values_equal(v, target))
}

fn range_matches(found: &[&Value], target: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    flatten(found)
        .into_iter()
        .filter_map(|v| compare_same_type(v, target))
        .any(accept)
}

pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Ordering within one type bracket; `None` across brackets (no match for range operators).
fn compare_same_type(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}
