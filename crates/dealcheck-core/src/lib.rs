pub mod config;
pub mod error;
pub mod evaluate;
pub mod types;

pub use config::{load_app_config, load_app_config_from_env, AppConfig};
pub use error::ConfigError;
pub use evaluate::{evaluate, PRICE_MARGIN};
pub use types::{CanonicalItem, Coordinate, Recommendation, StoreLocation, Verdict};
