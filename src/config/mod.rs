pub mod schema;

pub use schema::{Config, FetchConfig, GatewayConfig, StorageConfig, UrlLogConfig};
