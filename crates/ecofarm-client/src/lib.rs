pub mod client;
pub mod credentials;
pub mod error;
mod types;

pub use client::{PriceClient, API_KEY_HEADER};
pub use credentials::{CredentialError, CredentialStore};
pub use error::ClientError;
pub use types::HealthStatus;
