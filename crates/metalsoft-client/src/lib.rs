//! Metalsoft API Client
//!
//! A Rust client for the Metalsoft developer API, covering the calls the
//! Cluster API provider needs: infrastructures, networks, subnets and
//! variables.
//!
//! # Example
//!
//! ```no_run
//! use metalsoft_client::{Credentials, CreateInfrastructureRequest, MetalsoftClient, MetalsoftClientTrait};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Credentials come from METALSOFT_CREDENTIALS_FILE_PATH or METALSOFT_* variables
//! let client = MetalsoftClient::new(Credentials::load()?)?;
//!
//! let infra = client
//!     .create_infrastructure(&CreateInfrastructureRequest {
//!         infrastructure_label: "cluster-api-demo".to_string(),
//!         datacenter_name: "dc1".to_string(),
//!     })
//!     .await?;
//! let networks = client.list_networks(infra.infrastructure_id).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod credentials;
pub mod error;
pub mod models;
pub mod ref_codes;
#[path = "trait.rs"]
pub mod metalsoft_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::MetalsoftClient;
pub use credentials::Credentials;
pub use error::MetalsoftError;
pub use models::*;
pub use metalsoft_trait::MetalsoftClientTrait;
#[cfg(feature = "test-util")]
pub use mock::{MockMetalsoftClient, MockOperation};
