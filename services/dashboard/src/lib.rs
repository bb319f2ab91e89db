//! services/dashboard/src/lib.rs
//!
//! The outer shell around `bookshare_core`: configuration, the HTTP adapter for
//! the lending API, and the dashboard loader that feeds the reconciler.

pub mod adapters;
pub mod config;
pub mod dashboard;
pub mod error;
