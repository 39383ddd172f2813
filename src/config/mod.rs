//! Configuration loading and merging
//!
//! Handles loading from config files, defaults, and environment variables
//! with proper precedence (Env > File > Defaults).

mod decode;
pub mod defaults;
pub mod env;
pub mod file_type;
mod loader;
mod merge;
pub mod resolver;

pub use defaults::Defaults;
pub use env::Environment;
pub use file_type::ConfigFileType;
pub use resolver::{resolve, Resolver};
