//! Client for the PenalSui penalty-shootout contract on Sui.

pub mod config;
pub mod constants;
pub mod crypto;
pub mod decoder;
pub mod error;
pub mod models;
pub mod rpc;
pub mod services;
pub mod utils;

pub use config::Config;
pub use error::{AppError, Result};
