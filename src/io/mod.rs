pub mod atomic;
pub mod config_io;
pub mod store_io;
