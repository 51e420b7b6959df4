//! Integration tests for kitchen-ssh
//!
//! These tests spawn the actual binary and test end-to-end behavior.
//! None of them reach a real instance.

mod cli_tests;
