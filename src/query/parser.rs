//! Flat string parameters (`where`, `sort`, `limit`, ...) into a `QueryDescriptor`.

use crate::error::AppError;
use crate::query::descriptor::{Collation, Projection, QueryDescriptor, SortDirection, SortKey};
use crate::query::filter::Filter;
use crate::query::{DEFAULT_LIMIT, MAX_LIMIT};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Query string as delivered by the transport: every value is a string.
pub type RawQuery = HashMap<String, String>;

fn param<'a>(raw: &'a RawQuery, key: &str) -> Option<&'a str> {
    raw.get(key).map(|s| s.trim()).filter(|s| !s.is_empty())
}

fn parse_json(key: &str, s: &str) -> Result<Value, AppError> {
    serde_json::from_str(s).map_err(|e| AppError::BadQuerySyntax(format!("{}: {}", key, e)))
}

/// Positive integer or `None` (absent, unparsable, zero or negative).
fn positive(raw: &RawQuery, key: &str) -> Option<u64> {
    param(raw, key)
        .and_then(|s| s.parse::<i64>().ok())
        .filter(|n| *n >= 1)
        .map(|n| n as u64)
}

pub fn parse(raw: &RawQuery) -> Result<QueryDescriptor, AppError> {
    let (filter, where_doc) = match param(raw, "where") {
        Some(s) => match parse_json("where", s)? {
            Value::Object(obj) => (Filter::from_object(&obj)?, obj),
            _ => return Err(AppError::BadQuerySyntax("where must be a JSON object".into())),
        },
        None => (Filter::all(), Map::new()),
    };

    let sort = match param(raw, "sort") {
        Some(s) => parse_sort(s)?,
        None => Vec::new(),
    };

    let limit = positive(raw, "limit").unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let page = positive(raw, "page").unwrap_or(1);
    let skip = positive(raw, "skip").unwrap_or_else(|| (page - 1).saturating_mul(limit));

    let projection = match param(raw, "select") {
        Some(s) => Some(parse_select(s)?),
        None => None,
    };
    let populate = param(raw, "populate").map(split_list).unwrap_or_default();
    let collation = match param(raw, "collation") {
        Some(s) => parse_collation(s)?,
        None => Collation::default(),
    };

    Ok(QueryDescriptor {
        filter,
        where_doc,
        sort,
        page,
        limit,
        skip,
        projection,
        populate,
        collation,
    })
}

fn split_list(s: &str) -> Vec<String> {
    s.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_sort(s: &str) -> Result<Vec<SortKey>, AppError> {
    if s.starts_with('{') {
        let obj = match parse_json("sort", s)? {
            Value::Object(o) => o,
            _ => return Err(AppError::BadQuerySyntax("sort must be a JSON object".into())),
        };
        return obj
            .into_iter()
            .map(|(field, dir)| {
                let direction = match &dir {
                    Value::Number(n) if n.as_i64() == Some(1) => SortDirection::Ascending,
                    Value::Number(n) if n.as_i64() == Some(-1) => SortDirection::Descending,
                    Value::String(d) => match d.to_ascii_lowercase().as_str() {
                        "asc" | "ascending" => SortDirection::Ascending,
                        "desc" | "descending" => SortDirection::Descending,
                        _ => return Err(AppError::BadQuerySyntax(format!("sort direction for '{}': {}", field, dir))),
                    },
                    _ => return Err(AppError::BadQuerySyntax(format!("sort direction for '{}': {}", field, dir))),
                };
                Ok(SortKey { field, direction })
            })
            .collect();
    }
    Ok(split_list(s)
        .into_iter()
        .filter_map(|f| match f.strip_prefix('-') {
            Some("") => None,
            Some(rest) => Some(SortKey::desc(rest)),
            None => Some(SortKey::asc(f)),
        })
        .collect())
}

fn parse_select(s: &str) -> Result<Projection, AppError> {
    let mut include = Vec::new();
    let mut exclude = Vec::new();
    if s.starts_with('{') {
        let obj = match parse_json("select", s)? {
            Value::Object(o) => o,
            _ => return Err(AppError::BadQuerySyntax("select must be a JSON object".into())),
        };
        for (field, flag) in obj {
            match flag.as_i64() {
                Some(1) => include.push(field),
                Some(0) => exclude.push(field),
                _ => return Err(AppError::BadQuerySyntax(format!("select flag for '{}' must be 0 or 1", field))),
            }
        }
    } else {
        for f in split_list(s) {
            match f.strip_prefix('-') {
                Some(rest) if !rest.is_empty() => exclude.push(rest.to_string()),
                Some(_) => {}
                None => include.push(f),
            }
        }
    }
    match (include.is_empty(), exclude.is_empty()) {
        (false, true) => Ok(Projection::Include(include)),
        (true, false) => Ok(Projection::Exclude(exclude)),
        (true, true) => Err(AppError::BadQuerySyntax("select lists no fields".into())),
        (false, false) => Err(AppError::BadQuerySyntax("select cannot mix inclusion and exclusion".into())),
    }
}

fn parse_collation(s: &str) -> Result<Collation, AppError> {
    if !s.starts_with('{') {
        return Ok(Collation {
            locale: s.to_string(),
            ..Collation::default()
        });
    }
    let obj = match parse_json("collation", s)? {
        Value::Object(o) => o,
        _ => return Err(AppError::BadQuerySyntax("collation must be a JSON object".into())),
    };
    let mut collation = Collation::default();
    if let Some(locale) = obj.get("locale") {
        collation.locale = locale
            .as_str()
            .ok_or_else(|| AppError::BadQuerySyntax("collation.locale must be a string".into()))?
            .to_string();
    }
    if let Some(strength) = obj.get("strength") {
        collation.strength = strength
            .as_u64()
            .filter(|n| (1..=5).contains(n))
            .ok_or_else(|| AppError::BadQuerySyntax("collation.strength must be 1-5".into()))? as u8;
    }
    Ok(collation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn raw(pairs: &[(&str, &str)]) -> RawQuery {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn defaults_when_empty() {
        let d = parse(&RawQuery::new()).unwrap();
        assert!(d.filter.is_all());
        assert!(d.where_doc.is_empty());
        assert!(d.sort.is_empty());
        assert_eq!((d.page, d.limit, d.skip), (1, 10, 0));
        assert_eq!(d.collation, Collation::default());
        assert!(d.projection.is_none());
    }

    #[test]
    fn odd_numbers_are_normalized() {
        for (limit, page) in [("0", "0"), ("-5", "-1"), ("abc", "x"), ("", "")] {
            let d = parse(&raw(&[("limit", limit), ("page", page)])).unwrap();
            assert_eq!((d.limit, d.page, d.skip), (10, 1, 0), "{limit} {page}");
        }
        let d = parse(&raw(&[("limit", "5000")])).unwrap();
        assert_eq!(d.limit, MAX_LIMIT);
    }

    #[test]
    fn pagination_arithmetic() {
        for page in 1..=7u64 {
            for limit in [1u64, 3, 10, 25] {
                let d = parse(&raw(&[("page", &page.to_string()), ("limit", &limit.to_string())])).unwrap();
                assert_eq!(d.skip, (page - 1) * limit);
            }
        }
    }

    #[test]
    fn explicit_skip_wins() {
        let d = parse(&raw(&[("page", "4"), ("limit", "10"), ("skip", "3")])).unwrap();
        assert_eq!(d.skip, 3);
        let d = parse(&raw(&[("page", "4"), ("limit", "10"), ("skip", "0")])).unwrap();
        assert_eq!(d.skip, 30);
    }

    #[test]
    fn where_round_trip() {
        let filters = [
            json!({}),
            json!({"userId": "685b7426961a92e9ec1d2a1d"}),
            json!({"name": {"$regex": "Trump", "$options": "i"}, "status": {"$in": ["uploaded", "completed"]}}),
            json!({"$or": [{"faces.personId": "p1"}, {"createdAt": {"$gte": "2025-01-01"}}]}),
        ];
        for f in filters {
            let d = parse(&raw(&[("where", &serde_json::to_string(&f).unwrap())])).unwrap();
            assert_eq!(Value::Object(d.where_doc.clone()), f);
        }
    }

    #[test]
    fn malformed_where_is_bad_query_syntax() {
        for w in ["not-json", "{\"a\":", "[1,2]", "42"] {
            let err = parse(&raw(&[("where", w)])).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::BadQuerySyntax, "{w}");
        }
    }

    #[test]
    fn sort_forms() {
        let d = parse(&raw(&[("sort", "name")])).unwrap();
        assert_eq!(d.sort, vec![SortKey::asc("name")]);
        let d = parse(&raw(&[("sort", "name -createdAt")])).unwrap();
        assert_eq!(d.sort, vec![SortKey::asc("name"), SortKey::desc("createdAt")]);
        let d = parse(&raw(&[("sort", r#"{"createdAt": -1}"#)])).unwrap();
        assert_eq!(d.sort, vec![SortKey::desc("createdAt")]);
        let d = parse(&raw(&[("sort", r#"{"name": "asc"}"#)])).unwrap();
        assert_eq!(d.sort, vec![SortKey::asc("name")]);
        assert_eq!(
            parse(&raw(&[("sort", r#"{"name": 2}"#)])).unwrap_err().kind(),
            ErrorKind::BadQuerySyntax
        );
        assert_eq!(
            parse(&raw(&[("sort", "{broken")])).unwrap_err().kind(),
            ErrorKind::BadQuerySyntax
        );
    }

    #[test]
    fn select_populate_collation() {
        let d = parse(&raw(&[("select", "name email"), ("populate", "playgroundId"), ("collation", "fr")])).unwrap();
        assert_eq!(d.projection, Some(Projection::Include(vec!["name".into(), "email".into()])));
        assert_eq!(d.populate, vec!["playgroundId".to_string()]);
        assert_eq!(d.collation.locale, "fr");
        let d = parse(&raw(&[("select", "-password"), ("collation", r#"{"locale":"en","strength":2}"#)])).unwrap();
        assert_eq!(d.projection, Some(Projection::Exclude(vec!["password".into()])));
        assert!(d.collation.case_insensitive());
        assert_eq!(
            parse(&raw(&[("select", "name -password")])).unwrap_err().kind(),
            ErrorKind::BadQuerySyntax
        );
    }
}
