//! Core types, matching logic and operations for the job board.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage is reached through [`store::JobBoardStore`]; delivery through
//! [`notify::Notifier`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod application;
pub mod error;
pub mod identity;
pub mod job;
pub mod matcher;
pub mod messaging;
pub mod notify;
pub mod profile;
pub mod recommend;
pub mod saved_search;
pub mod search;
pub mod staged;
pub mod store;
pub mod tokenize;

#[cfg(test)]
mod fixtures;

pub use error::{Error, Result};
