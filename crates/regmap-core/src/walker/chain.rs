//! # Type-Chain Resolver
//!
//! Follows an entity's `type` references (typedefs, qualifiers, arrays,
//! pointers) until the chain ends and records which links were seen.

use gimli::constants;
use tracing::warn;

use crate::debuginfo::{DebugInfo, DieId};

/// Longest chain followed before giving up.
pub const MAX_TYPE_REF_DEPTH: usize = 32;

/// Scalar or aggregate type a chain ends in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal
{
    Base(DieId),
    Struct(DieId),
    Union(DieId),
}

impl Terminal
{
    pub fn id(self) -> DieId
    {
        match self {
            Terminal::Base(id) | Terminal::Struct(id) | Terminal::Union(id) => id,
        }
    }
}

/// Links of interest found along a type chain. When a kind repeats, the last
/// link of that kind wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TypeChain
{
    pub array: Option<DieId>,
    pub terminal: Option<Terminal>,
    pub enumeration: Option<DieId>,
}

impl TypeChain
{
    /// Walk the chain starting at the `type` reference of `entity`.
    pub fn resolve(info: &DebugInfo, entity: DieId) -> Self
    {
        let mut chain = Self::default();
        for link in links(info, entity) {
            match info[link].tag {
                constants::DW_TAG_array_type => chain.array = Some(link),
                constants::DW_TAG_base_type => chain.terminal = Some(Terminal::Base(link)),
                constants::DW_TAG_structure_type => chain.terminal = Some(Terminal::Struct(link)),
                constants::DW_TAG_union_type => chain.terminal = Some(Terminal::Union(link)),
                constants::DW_TAG_enumeration_type => chain.enumeration = Some(link),
                _ => {}
            }
        }
        chain
    }

    /// True if any link of the chain of `entity` is an enumeration type.
    pub fn is_enumeration(info: &DebugInfo, entity: DieId) -> bool
    {
        links(info, entity).any(|link| info[link].tag == constants::DW_TAG_enumeration_type)
    }
}

/// Successive `type` targets of `entity`, at most [`MAX_TYPE_REF_DEPTH`].
fn links(info: &DebugInfo, entity: DieId) -> impl Iterator<Item = DieId> + '_
{
    let mut next = info.type_of(entity);
    let mut depth = 0usize;
    std::iter::from_fn(move || {
        let current = next?;
        if depth == MAX_TYPE_REF_DEPTH {
            warn!(entity = info[entity].short_name(), "type chain too long, truncated");
            return None;
        }
        depth += 1;
        next = info.type_of(current);
        Some(current)
    })
}
