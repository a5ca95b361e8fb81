//! Normalized query descriptor handed to the engine and the store adapters.

use crate::query::filter::Filter;
use crate::store::Document;
use serde_json::{Map, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        SortKey {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        SortKey {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }
}

/// Field selection. `_id` is always kept.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Projection {
    Include(Vec<String>),
    Exclude(Vec<String>),
}

impl Projection {
    pub fn apply(&self, mut doc: Document) -> Document {
        let top = |f: &String| f.split('.').next().unwrap_or("").to_string();
        match self {
            Projection::Include(fields) => {
                let keep: Vec<String> = fields.iter().map(top).collect();
                doc.retain(|k, _| k == "_id" || keep.iter().any(|f| f == k));
                doc
            }
            Projection::Exclude(fields) => {
                for f in fields {
                    if f != "_id" {
                        doc.remove(&top(f));
                    }
                }
                doc
            }
        }
    }
}

/// String comparison rules for sorting. Strength 1 and 2 ignore case.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Collation {
    pub locale: String,
    pub strength: u8,
}

impl Collation {
    pub fn case_insensitive(&self) -> bool {
        self.strength <= 2
    }
}

impl Default for Collation {
    fn default() -> Self {
        Collation {
            locale: "en".into(),
            strength: 3,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct QueryDescriptor {
    /// Compiled filter; may carry clauses added by the transport layer (owner scope).
    pub filter: Filter,
    /// The client's `where` document exactly as parsed.
    pub where_doc: Map<String, Value>,
    /// Empty means store-default order.
    pub sort: Vec<SortKey>,
    pub page: u64,
    pub limit: u64,
    /// Effective offset: explicit skip if ≥ 1, else `(page - 1) * limit`.
    pub skip: u64,
    pub projection: Option<Projection>,
    pub populate: Vec<String>,
    pub collation: Collation,
}

impl Default for QueryDescriptor {
    fn default() -> Self {
        QueryDescriptor {
            filter: Filter::all(),
            where_doc: Map::new(),
            sort: Vec::new(),
            page: 1,
            limit: crate::query::DEFAULT_LIMIT,
            skip: 0,
            projection: None,
            populate: Vec::new(),
            collation: Collation::default(),
        }
    }
}

impl QueryDescriptor {
    /// Restrict results to records whose `field` equals `value`, regardless of the client filter.
    pub fn scoped_to(mut self, field: &str, value: impl Into<Value>) -> Self {
        let filter = std::mem::replace(&mut self.filter, Filter::all());
        self.filter = filter.and(Filter::Eq(field.to_string(), value.into()));
        self
    }
}
