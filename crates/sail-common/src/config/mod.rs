mod loader;
mod reader;

pub use loader::*;
pub use reader::*;
