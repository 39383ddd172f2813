//! Utility modules

pub mod keys;
