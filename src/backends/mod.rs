//! Backend implementations

pub mod console;
pub mod lifecycle;
pub mod rotating_file;
pub mod unique_file;

pub use console::{ConsoleBackend, ConsoleConfig};
pub use rotating_file::{RotatingFileBackend, RotatingFileConfig};
pub use unique_file::{UniqueFileBackend, UniqueFileConfig};

pub use crate::core::Backend;
