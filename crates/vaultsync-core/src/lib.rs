//! VaultSync Core - Domain types, configuration and ports
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain types** - `VaultPath`, `RemoteId`, `StorageMode`, `NamespaceHandle`,
//!   `LocalFileRef`, `RemoteFileRef`
//! - **Port definitions** - Traits for adapters: `ILocalFileSystem`, `IRemoteDrive`
//! - **Configuration** - Typed YAML configuration with defaults and validation
//!
//! # Architecture
//!
//! The domain module contains pure logic with no I/O. Ports define trait
//! interfaces that the drive and sync crates implement and consume.

pub mod config;
pub mod domain;
pub mod ports;
