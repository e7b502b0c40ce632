//! Integration tests for vaultsync-drive
//!
//! Uses wiremock to simulate the Drive API and token endpoint and verifies
//! end-to-end behavior of the token store, the retry policy, namespace
//! resolution and file operations.

mod common;

mod test_auth;
mod test_client;
mod test_files;
mod test_namespace;
