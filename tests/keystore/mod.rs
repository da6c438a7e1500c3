//! Shared key store integration tests.
//!
//! Tests the KeyStore contract against all implementations.
//! Each implementation module imports these test functions and runs them.

pub mod keystore_tests;
