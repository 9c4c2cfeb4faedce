//! Async discovery client for agents.txt manifests.
//!
//! ```rust,no_run
//! # async fn run() -> Result<(), agentstxt_client::ClientError> {
//! use agentstxt_client::{ClientConfig, DiscoveryClient};
//!
//! let client = DiscoveryClient::new(ClientConfig::from_env())?;
//! let result = client.discover_any("https://example.com").await?;
//! match result.document {
//!     Some(doc) => println!("{} declares {} capabilities", doc.site.name, doc.capabilities.len()),
//!     None => eprintln!("{}", result.errors[0]),
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod discovery;
pub mod error;

pub use config::ClientConfig;
pub use discovery::{DiscoveryClient, JSON_PATHS, POLICY_PATHS, TEXT_PATHS};
pub use error::ClientError;
