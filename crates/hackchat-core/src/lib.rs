//! Core domain + application logic for the HackChat relay bot.
//!
//! This crate is framework-agnostic. Telegram lives behind the messaging port
//! (`messaging::port::MessagingPort`) implemented in the adapter crate.

pub mod audit;
pub mod broadcast;
pub mod config;
pub mod directory;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod history;
pub mod ingest;
pub mod logging;
pub mod messaging;
pub mod relay;

pub use errors::{Error, Result};
pub use relay::Relay;
