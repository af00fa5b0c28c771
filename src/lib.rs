pub mod common;
pub mod core;
pub mod daemon;
pub mod error;

pub use anyhow::Result;
