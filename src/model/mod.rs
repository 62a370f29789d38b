pub mod config;
pub mod entry;

pub use config::*;
pub use entry::*;
