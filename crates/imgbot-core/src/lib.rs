//! Core domain + application logic for the image generation bot.
//!
//! This crate is intentionally framework-agnostic. Telegram and the inference
//! API live behind ports (traits) implemented in adapter crates.

pub mod bot;
pub mod config;
pub mod domain;
pub mod errors;
pub mod inference;
pub mod logging;
pub mod messaging;
pub mod staging;

pub use errors::{Error, Result};
