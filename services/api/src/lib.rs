//! services/api/src/lib.rs
//!
//! The forum service: credential handling, the content repository, the
//! notification pipeline, store adapters and the HTTP surface.

pub mod adapters;
pub mod auth;
pub mod config;
pub mod error;
pub mod forum;
pub mod web;
