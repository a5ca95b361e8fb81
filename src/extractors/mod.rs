pub mod identity;

pub use identity::{Caller, USER_ID_HEADER};
