pub mod error;
pub mod instruction;
pub mod keys;

pub use error::{InvalidationError, Result};
pub use instruction::{InvalidationInstruction, RefetchType};
pub use keys::{KeySegment, QueryKey};
