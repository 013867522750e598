//! Signed HTTP client for the subset of the OCI Block Storage API used to
//! list and delete boot volume and block volume backups.

mod backups;
mod client;
mod error;
pub mod profile;
pub mod retry;
pub mod signer;
pub mod types;

pub use client::{API_VERSION, BlockstorageClient, ClientOptions, endpoint_for_region};
pub use error::SdkError;
pub use profile::{OciProfile, ProfileError};
pub use retry::RetryPolicy;
pub use signer::RequestSigner;
pub use types::{BootVolumeBackup, VolumeBackup};
