//! Shared configuration for gcsfile.
//!
//! This crate owns everything that is read from the process environment or
//! from configuration files. The storage crate never looks at the
//! environment itself; it receives a fully loaded [`GcpConfig`].

pub mod config;

pub use config::GcpConfig;
