pub mod aggregator;
pub mod error;
mod groceryserver;
mod kroger;
pub mod provider;

pub use aggregator::{Aggregator, ScanResolution};
pub use error::ProviderError;
pub use groceryserver::GroceryServerProvider;
pub use kroger::KrogerProvider;
pub use provider::{Credential, RetailProvider};
