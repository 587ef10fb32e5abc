pub mod config;
pub mod error;
pub mod metric;
pub mod threshold;

pub use config::Config;
pub use error::*;
pub use metric::*;
pub use threshold::*;
