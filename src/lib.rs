//! Interactive terminal chat loop: config layering, line editing, retry
//! and backoff, token accounting, and session summaries for a pluggable
//! `Agent` backend.

pub mod accounting;
pub mod agent;
pub mod cli;
pub mod colors;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod export;
pub mod invoker;
pub mod orchestrator;
pub mod session;
pub mod template;
pub mod terminal;
