pub mod schema;

pub use schema::{Config, SessionConfig, StoreConfig};
