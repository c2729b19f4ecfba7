//! The `ton-ccip` prelude.
//!
//! This brings into scope a number of traits and commonly used types.

pub use crate::boc::{Boc, BocRepr};
pub use crate::cell::{Cell, CellBuilder, CellSlice, HashBytes, Load, Store};
pub use crate::dict::{Dict, DictKey};
pub use crate::error::{CodecError, CodecErrorKind, ResultExt};
pub use crate::models::{BlockId, BlockIdShort, ShardIdent, StdAddr};
pub use crate::num::Tokens;
