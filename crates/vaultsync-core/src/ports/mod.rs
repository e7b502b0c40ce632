//! Port definitions (hexagonal architecture interfaces)
//!
//! Ports are interfaces that the sync engine depends on, but whose
//! implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`ILocalFileSystem`] - Vault enumeration, reads and writes
//! - [`IRemoteDrive`] - Namespace resolution and file operations on the drive

pub mod local_filesystem;
pub mod remote_drive;

pub use local_filesystem::ILocalFileSystem;
pub use remote_drive::IRemoteDrive;
