//! Core library for the zkshare toolkit.
//!
//! Publishes circuit artifacts to content-addressed storage and deploys
//! verifiers for them to a ledger:
//!
//! - [`store::ContentStore`]: upload with local fallback, cached download
//!   through a static gateway list, pinning.
//! - [`gallery::GalleryIndex`]: the locally persisted list of published circuits.
//! - [`chain::ChainClient`]: environment selection, cost estimates, balances.
//! - [`deploy::DeploymentOrchestrator`] and [`verify::VerificationOrchestrator`]:
//!   staged ledger operations with progress reporting and an external
//!   [`signer::TransactionSigner`].
//!
//! Services are constructed explicitly and shared by the caller; the crate
//! keeps no global state.

pub mod artifact;
pub mod chain;
pub mod cid;
pub mod config;
pub mod deploy;
pub mod encoding;
pub mod error;
pub mod estimator;
pub mod gallery;
pub mod kv;
pub mod progress;
pub mod records;
pub mod signer;
pub mod store;
pub mod verify;
