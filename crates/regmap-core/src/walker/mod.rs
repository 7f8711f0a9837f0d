//! Type walking: the type-chain resolver and the two renderers built on it.

pub mod chain;
pub mod enums;
pub mod regmap;

pub use chain::{Terminal, TypeChain};
pub use enums::EnumBuilder;
pub use regmap::RegisterMapBuilder;

use crate::debuginfo::Die;
use crate::error::Result;
use crate::source::CommentDecoder;
use crate::types::AttributeSet;

/// Attributes decoded at the declaration site of `die`; none when DWARF
/// gives it no site (base types, compiler-generated entities).
pub(crate) fn declared_attributes(decoder: &CommentDecoder, die: &Die) -> Result<AttributeSet>
{
    match &die.decl {
        Some(site) => decoder.decode(site),
        None => Ok(AttributeSet::new()),
    }
}
