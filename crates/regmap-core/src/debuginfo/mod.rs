//! # Debug Information
//!
//! Read-only view of a program's DWARF entities, flattened into an arena.
//!
//! [`BinaryImage`](image::BinaryImage) loads the sections of a firmware file and
//! [`loader`] converts every DIE into a [`Die`]: tag, short name, declaration
//! site, resolved `type` reference, tree links and the handful of constant
//! attributes the register-map walk needs. The walkers only ever borrow a
//! finished [`DebugInfo`].
//!
//! The arena can also be assembled by hand, which is how the walkers are
//! tested without a cross compiler:
//!
//! ```rust
//! use regmap_core::debuginfo::{DebugInfo, Die};
//! use gimli::constants;
//!
//! let mut info = DebugInfo::new();
//! let cu = info.push(None, Die::new(constants::DW_TAG_compile_unit).with_name("main.c"));
//! let u8_ty = info.push(
//!     Some(cu),
//!     Die::new(constants::DW_TAG_base_type)
//!         .with_name("unsigned char")
//!         .with_attr(constants::DW_AT_byte_size, 1),
//! );
//! info.push(
//!     Some(cu),
//!     Die::new(constants::DW_TAG_variable).with_name("flags").with_type(u8_ty),
//! );
//! assert_eq!(info.compile_units().count(), 1);
//! ```

pub mod image;
pub mod loader;

use std::ops::Index;
use std::path::PathBuf;

use gimli::{constants, DwAt, DwTag, EndianArcSlice, RunTimeEndian};
use smallvec::SmallVec;

pub use image::BinaryImage;

use crate::types::DeclarationSite;

pub(crate) type OwnedReader = EndianArcSlice<RunTimeEndian>;
pub(crate) type OwnedDwarf = gimli::Dwarf<OwnedReader>;

/// Constant-valued attributes retained per entity.
pub const CONSTANT_ATTRIBUTES: &[DwAt] = &[
    constants::DW_AT_byte_size,
    constants::DW_AT_data_member_location,
    constants::DW_AT_bit_offset,
    constants::DW_AT_data_bit_offset,
    constants::DW_AT_bit_size,
    constants::DW_AT_const_value,
    constants::DW_AT_count,
    constants::DW_AT_upper_bound,
];

/// Index of an entity inside a [`DebugInfo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DieId(usize);

/// One debugging information entry.
#[derive(Debug, Clone)]
pub struct Die
{
    pub tag: DwTag,
    pub name: Option<String>,
    pub decl: Option<DeclarationSite>,
    pub type_ref: Option<DieId>,
    pub parent: Option<DieId>,
    pub children: Vec<DieId>,
    attrs: SmallVec<[(DwAt, u64); 4]>,
}

impl Die
{
    pub fn new(tag: DwTag) -> Self
    {
        Self {
            tag,
            name: None,
            decl: None,
            type_ref: None,
            parent: None,
            children: Vec::new(),
            attrs: SmallVec::new(),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self
    {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_decl(mut self, path: impl Into<PathBuf>, line: u64) -> Self
    {
        self.decl = Some(DeclarationSite::new(path, line));
        self
    }

    #[must_use]
    pub fn with_type(mut self, ty: DieId) -> Self
    {
        self.type_ref = Some(ty);
        self
    }

    #[must_use]
    pub fn with_attr(mut self, name: DwAt, value: u64) -> Self
    {
        self.set_attr(name, value);
        self
    }

    /// Store a constant attribute, replacing any previous value.
    pub fn set_attr(&mut self, name: DwAt, value: u64)
    {
        match self.attrs.iter_mut().find(|(at, _)| *at == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name, value)),
        }
    }

    pub fn attr(&self, name: DwAt) -> Option<u64>
    {
        self.attrs.iter().find(|(at, _)| *at == name).map(|(_, value)| *value)
    }

    /// Short name, empty for anonymous entities.
    pub fn short_name(&self) -> &str
    {
        self.name.as_deref().unwrap_or_default()
    }
}

/// Arena of every entity of one program image.
#[derive(Debug, Clone, Default)]
pub struct DebugInfo
{
    dies: Vec<Die>,
    units: Vec<DieId>,
}

impl DebugInfo
{
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Add `die` under `parent` (or as a root) and return its id.
    ///
    /// Roots tagged `DW_TAG_compile_unit` are recorded as compile units in
    /// insertion order.
    pub fn push(&mut self, parent: Option<DieId>, mut die: Die) -> DieId
    {
        let id = DieId(self.dies.len());
        die.parent = parent;
        if let Some(parent) = parent {
            self.dies[parent.0].children.push(id);
        } else if die.tag == constants::DW_TAG_compile_unit {
            self.units.push(id);
        }
        self.dies.push(die);
        id
    }

    pub(crate) fn get_mut(&mut self, id: DieId) -> Option<&mut Die>
    {
        self.dies.get_mut(id.0)
    }

    pub fn len(&self) -> usize
    {
        self.dies.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.dies.is_empty()
    }

    pub fn compile_units(&self) -> impl Iterator<Item = DieId> + '_
    {
        self.units.iter().copied()
    }

    pub fn children(&self, id: DieId) -> impl Iterator<Item = DieId> + '_
    {
        self[id].children.iter().copied()
    }

    /// Follow the `type` reference of `id`.
    pub fn type_of(&self, id: DieId) -> Option<DieId>
    {
        self[id].type_ref
    }

    pub fn parent(&self, id: DieId) -> Option<DieId>
    {
        self[id].parent
    }
}

impl Index<DieId> for DebugInfo
{
    type Output = Die;

    fn index(&self, id: DieId) -> &Die
    {
        &self.dies[id.0]
    }
}
