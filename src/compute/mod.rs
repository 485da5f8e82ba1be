//! Compute module - Network construction and evolutionary search.

mod community;
mod matrix;
mod network;

pub mod evolution;

pub use community::*;
pub use matrix::*;
pub use network::*;
