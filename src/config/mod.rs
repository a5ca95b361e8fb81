pub mod settings;
pub mod types;

pub use settings::{Settings, StoreBackend};
pub use types::*;
