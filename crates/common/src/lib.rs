//! Utilities shared by the vault bridge services.

pub mod logging;
