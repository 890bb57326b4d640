// Utility functions
pub mod blocking;
pub mod crypto;
pub mod error;
pub mod text;

pub use blocking::*;
pub use error::*;
