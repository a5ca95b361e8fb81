//! Builds parameterized SQL over `(seq, id, doc JSONB)` collection tables.
//! Filters compile to `jsonb_path_exists` predicates; every client value travels as a bind parameter.

use crate::query::{Filter, Pattern, QueryDescriptor, SortDirection};
use crate::store::ID_FIELD;
use serde_json::{json, Value};

/// A bind parameter. Typed so the driver sends the right OID.
#[derive(Clone, Debug, PartialEq)]
pub enum SqlParam {
    Text(String),
    TextArray(Vec<String>),
    Json(Value),
    I64(i64),
}

/// Quote identifier for PostgreSQL.
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

pub fn qualified_table(schema: &str, collection: &str) -> String {
    format!("{}.{}", quoted(schema), quoted(collection))
}

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, p: SqlParam) -> usize {
        self.params.push(p);
        self.params.len()
    }
}

/// `a.b.0.c` as a jsonpath accessor; numeric segments index arrays.
fn json_path(path: &str) -> String {
    let mut out = String::from("$");
    for seg in path.split('.') {
        if !seg.is_empty() && seg.bytes().all(|b| b.is_ascii_digit()) {
            out.push_str(&format!("[{}]", seg));
        } else {
            out.push('.');
            out.push_str(&jsonpath_string(seg));
        }
    }
    out
}

fn jsonpath_string(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

fn path_segments(path: &str) -> Vec<String> {
    path.split('.').map(str::to_string).collect()
}

/// `jsonb_path_exists(doc, <path> ? (@ <op> $v), {v: value})`
fn compare(q: &mut QueryBuf, path: &str, op: &str, value: &Value) -> String {
    let jp = q.push_param(SqlParam::Text(format!("{} ? (@ {} $v)", json_path(path), op)));
    let vars = q.push_param(SqlParam::Json(json!({ "v": value })));
    format!("jsonb_path_exists(doc, ${}::jsonpath, ${}::jsonb)", jp, vars)
}

fn exists(q: &mut QueryBuf, path: &str) -> String {
    let jp = q.push_param(SqlParam::Text(json_path(path)));
    format!("jsonb_path_exists(doc, ${}::jsonpath)", jp)
}

fn equals(q: &mut QueryBuf, path: &str, value: &Value) -> String {
    match value {
        Value::String(s) if path == ID_FIELD => {
            let n = q.push_param(SqlParam::Text(s.clone()));
            format!("id = ${}", n)
        }
        Value::Null => {
            let present = exists(q, path);
            let is_null = compare(q, path, "==", value);
            format!("(NOT {} OR {})", present, is_null)
        }
        // jsonpath cannot compare containers; match the whole value or any array element.
        Value::Object(_) | Value::Array(_) => {
            let p = q.push_param(SqlParam::TextArray(path_segments(path)));
            let whole = q.push_param(SqlParam::Json(value.clone()));
            let wrapped = q.push_param(SqlParam::Json(Value::Array(vec![value.clone()])));
            format!(
                "((doc #> ${p}::text[]) = ${whole}::jsonb OR (jsonb_typeof(doc #> ${p}::text[]) = 'array' AND (doc #> ${p}::text[]) @> ${wrapped}::jsonb))",
            )
        }
        _ => compare(q, path, "==", value),
    }
}

fn regex(q: &mut QueryBuf, path: &str, pattern: &Pattern) -> String {
    let mut expr = format!("{} ? (@ like_regex {}", json_path(path), jsonpath_string(&pattern.source));
    if !pattern.flags.is_empty() {
        expr.push_str(&format!(" flag {}", jsonpath_string(&pattern.flags)));
    }
    expr.push(')');
    let jp = q.push_param(SqlParam::Text(expr));
    format!("jsonb_path_exists(doc, ${}::jsonpath)", jp)
}

fn join(parts: Vec<String>, sep: &str, empty: &str) -> String {
    if parts.is_empty() {
        empty.to_string()
    } else {
        format!("({})", parts.join(sep))
    }
}

/// SQL predicate for `filter`, pushing its parameters onto `q`.
fn predicate(q: &mut QueryBuf, filter: &Filter) -> String {
    match filter {
        Filter::Eq(path, v) => equals(q, path, v),
        Filter::Ne(path, v) => format!("NOT {}", equals(q, path, v)),
        Filter::Gt(path, v) => compare(q, path, ">", v),
        Filter::Gte(path, v) => compare(q, path, ">=", v),
        Filter::Lt(path, v) => compare(q, path, "<", v),
        Filter::Lte(path, v) => compare(q, path, "<=", v),
        Filter::In(path, vs) => {
            let parts = vs.iter().map(|v| equals(q, path, v)).collect();
            join(parts, " OR ", "FALSE")
        }
        Filter::NotIn(path, vs) => {
            let parts = vs.iter().map(|v| equals(q, path, v)).collect();
            format!("NOT {}", join(parts, " OR ", "FALSE"))
        }
        Filter::Exists(path, true) => exists(q, path),
        Filter::Exists(path, false) => format!("NOT {}", exists(q, path)),
        Filter::Regex(path, pattern) => regex(q, path, pattern),
        Filter::And(parts) => {
            let parts = parts.iter().map(|f| predicate(q, f)).collect();
            join(parts, " AND ", "TRUE")
        }
        Filter::Or(parts) => {
            let parts = parts.iter().map(|f| predicate(q, f)).collect();
            join(parts, " OR ", "FALSE")
        }
    }
}

fn where_clause(q: &mut QueryBuf, filter: &Filter) -> String {
    if filter.is_all() {
        String::new()
    } else {
        format!(" WHERE {}", predicate(q, filter))
    }
}

/// SELECT with filter, ORDER BY sort keys then insertion order, LIMIT/OFFSET.
pub fn select_many(schema: &str, collection: &str, query: &QueryDescriptor) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(schema, collection);
    let where_clause = where_clause(&mut q, &query.filter);

    let mut order = Vec::with_capacity(query.sort.len() + 1);
    for key in &query.sort {
        let p = q.push_param(SqlParam::TextArray(path_segments(&key.field)));
        let expr = if query.collation.case_insensitive() {
            format!("lower(doc #>> ${}::text[])", p)
        } else {
            format!("doc #> ${}::text[]", p)
        };
        let dir = match key.direction {
            SortDirection::Ascending => "ASC NULLS FIRST",
            SortDirection::Descending => "DESC NULLS LAST",
        };
        order.push(format!("{} {}", expr, dir));
    }
    order.push("seq".to_string());

    let limit = q.push_param(SqlParam::I64(i64::try_from(query.limit).unwrap_or(i64::MAX)));
    let offset = q.push_param(SqlParam::I64(i64::try_from(query.skip).unwrap_or(i64::MAX)));
    q.sql = format!(
        "SELECT doc FROM {}{} ORDER BY {} LIMIT ${} OFFSET ${}",
        table,
        where_clause,
        order.join(", "),
        limit,
        offset
    );
    q
}

pub fn count(schema: &str, collection: &str, filter: &Filter) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(schema, collection);
    let where_clause = where_clause(&mut q, filter);
    q.sql = format!("SELECT COUNT(*) AS n FROM {}{}", table, where_clause);
    q
}

pub fn select_one(schema: &str, collection: &str, filter: &Filter) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(schema, collection);
    let where_clause = where_clause(&mut q, filter);
    q.sql = format!("SELECT doc FROM {}{} ORDER BY seq LIMIT 1", table, where_clause);
    q
}

/// INSERT with the store-assigned id; the document carries the same id under `_id`.
pub fn insert(schema: &str, collection: &str, id: &str, doc: Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(schema, collection);
    let id_param = q.push_param(SqlParam::Text(id.to_string()));
    let doc_param = q.push_param(SqlParam::Json(doc));
    q.sql = format!(
        "INSERT INTO {} (id, doc) VALUES (${}, ${}::jsonb) RETURNING doc",
        table, id_param, doc_param
    );
    q
}

/// Shallow merge by id. `_id` is re-applied from the id column so a patch cannot change it.
pub fn update(schema: &str, collection: &str, id: &str, patch: Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(schema, collection);
    let id_param = q.push_param(SqlParam::Text(id.to_string()));
    let patch_param = q.push_param(SqlParam::Json(patch));
    q.sql = format!(
        "UPDATE {} SET doc = (doc || ${}::jsonb) || jsonb_build_object('{}', id) WHERE id = ${} RETURNING doc",
        table, patch_param, ID_FIELD, id_param
    );
    q
}

pub fn delete(schema: &str, collection: &str, id: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(schema, collection);
    let id_param = q.push_param(SqlParam::Text(id.to_string()));
    q.sql = format!("DELETE FROM {} WHERE id = ${} RETURNING doc", table, id_param);
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Collation, SortKey};

    #[test]
    fn paths_are_quoted_for_jsonpath() {
        assert_eq!(json_path("faces.0.personId"), r#"$."faces"[0]."personId""#);
        assert_eq!(json_path(r#"we"ird"#), r#"$."we\"ird""#);
    }

    #[test]
    fn empty_filter_has_no_where() {
        let q = count("faceplay", "images", &Filter::all());
        assert_eq!(q.sql, r#"SELECT COUNT(*) AS n FROM "faceplay"."images""#);
        assert!(q.params.is_empty());
    }

    #[test]
    fn id_equality_uses_the_key_column() {
        let f = Filter::Eq("_id".into(), json!("685b7426961a92e9ec1d2a1d"));
        let q = select_one("faceplay", "users", &f);
        assert_eq!(
            q.sql,
            r#"SELECT doc FROM "faceplay"."users" WHERE id = $1 ORDER BY seq LIMIT 1"#
        );
        assert_eq!(q.params, vec![SqlParam::Text("685b7426961a92e9ec1d2a1d".into())]);
    }

    #[test]
    fn values_are_bound_not_inlined() {
        let f = Filter::Eq("name".into(), json!("x'; DROP TABLE users; --"))
            .and(Filter::Gt("n".into(), json!(3)));
        let q = select_one("faceplay", "persons", &f);
        assert!(!q.sql.contains("DROP"));
        assert!(q.sql.contains("jsonb_path_exists(doc, $1::jsonpath, $2::jsonb) AND jsonb_path_exists(doc, $3::jsonpath, $4::jsonb)"));
        assert_eq!(q.params[0], SqlParam::Text(r#"$."name" ? (@ == $v)"#.into()));
        assert_eq!(q.params[1], SqlParam::Json(json!({"v": "x'; DROP TABLE users; --"})));
        assert_eq!(q.params[2], SqlParam::Text(r#"$."n" ? (@ > $v)"#.into()));
    }

    #[test]
    fn empty_in_matches_nothing() {
        let q = count("s", "c", &Filter::In("a".into(), vec![]));
        assert!(q.sql.ends_with("WHERE FALSE"));
        let q = count("s", "c", &Filter::NotIn("a".into(), vec![]));
        assert!(q.sql.ends_with("WHERE NOT FALSE"));
    }

    #[test]
    fn regex_flags_go_into_the_path() {
        let p = Pattern::new("^an\"n", "i").unwrap();
        let q = count("s", "c", &Filter::Regex("name".into(), p));
        assert_eq!(q.params, vec![SqlParam::Text(r#"$."name" ? (@ like_regex "^an\"n" flag "i")"#.into())]);
    }

    #[test]
    fn select_many_orders_then_pages() {
        let query = QueryDescriptor {
            sort: vec![SortKey::desc("createdAt")],
            collation: Collation { strength: 2, ..Collation::default() },
            limit: 5,
            skip: 10,
            ..QueryDescriptor::default()
        };
        let q = select_many("faceplay", "images", &query);
        assert_eq!(
            q.sql,
            r#"SELECT doc FROM "faceplay"."images" ORDER BY lower(doc #>> $1::text[]) DESC NULLS LAST, seq LIMIT $2 OFFSET $3"#
        );
        assert_eq!(
            q.params,
            vec![
                SqlParam::TextArray(vec!["createdAt".into()]),
                SqlParam::I64(5),
                SqlParam::I64(10)
            ]
        );
    }

    #[test]
    fn update_merges_and_pins_id() {
        let q = update("faceplay", "users", "abc", json!({"firstName": "A"}));
        assert_eq!(
            q.sql,
            r#"UPDATE "faceplay"."users" SET doc = (doc || $2::jsonb) || jsonb_build_object('_id', id) WHERE id = $1 RETURNING doc"#
        );
    }
}
