//! Blockchain models.

pub use address::*;
pub use block::*;
pub use message::*;
pub use transaction::*;

pub mod address;
pub mod block;
pub mod message;
pub mod transaction;
