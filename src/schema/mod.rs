//! Schema module - Configuration, genome layout and fitness record types.

mod config;
mod evolution;
mod fitness;
mod genome;

pub use config::*;
pub use evolution::*;
pub use fitness::*;
pub use genome::*;
