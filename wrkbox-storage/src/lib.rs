mod config;
mod error;
mod writer;
mod xlsx;

pub use config::*;
pub use error::*;
pub use writer::*;
pub use xlsx::*;
