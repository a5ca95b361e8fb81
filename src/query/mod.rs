//! Query descriptor parsing and filter expressions.

mod descriptor;
pub mod filter;
mod parser;

pub use descriptor::{Collation, Projection, QueryDescriptor, SortDirection, SortKey};
pub use filter::{Filter, Pattern};
pub use parser::{parse, RawQuery};

pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 1000;
