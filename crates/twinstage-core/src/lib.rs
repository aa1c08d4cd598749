//! Core types, config, errors, and the host bridge for Twinstage.

pub mod bridge;
pub mod config;
pub mod error;
pub mod geom;

pub use error::{Result, TwinstageError};
