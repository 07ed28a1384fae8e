pub mod error;
mod logging;

pub use logging::{init_logging, LoggingOptions};
