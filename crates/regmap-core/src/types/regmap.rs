//! Output entity model: register-map entries and enumeration descriptors.
//!
//! Entries serialize as ordered JSON objects with their `@regmap` attributes
//! inlined as keys. Attribute keys are written as-is, duplicates included.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use super::AttributeSet;

/// Classification of a register-map entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind
{
    /// Scalar, carrying the base type's name (e.g. `unsigned short`)
    Base(String),
    Struct,
    Union,
}

impl EntryKind
{
    /// Value of the `type` key.
    pub fn type_name(&self) -> &str
    {
        match self {
            EntryKind::Base(name) => name,
            EntryKind::Struct => "struct",
            EntryKind::Union => "union",
        }
    }

    pub fn is_aggregate(&self) -> bool
    {
        matches!(self, EntryKind::Struct | EntryKind::Union)
    }
}

/// One variable or aggregate member in the register map.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterMapEntry
{
    pub name: String,
    pub kind: EntryKind,
    pub attributes: AttributeSet,
    pub array_count: Option<u64>,
    /// Only set for nested members.
    pub byte_offset: Option<u64>,
    pub byte_size: Option<u64>,
    /// Only set for base-type bitfield members. MSB-relative within the
    /// storage unit, or the raw LSB-relative `DW_AT_data_bit_offset` when
    /// that is all the producer emitted.
    pub bit_offset: Option<u64>,
    pub bit_size: Option<u64>,
    /// Members of a struct or union, in declaration order.
    pub members: Vec<RegisterMapEntry>,
}

impl RegisterMapEntry
{
    pub fn new(name: impl Into<String>, kind: EntryKind) -> Self
    {
        Self {
            name: name.into(),
            kind,
            attributes: AttributeSet::new(),
            array_count: None,
            byte_offset: None,
            byte_size: None,
            bit_offset: None,
            bit_size: None,
            members: Vec::new(),
        }
    }

    /// Direct member by name.
    pub fn member(&self, name: &str) -> Option<&RegisterMapEntry>
    {
        self.members.iter().find(|member| member.name == name)
    }
}

impl Serialize for RegisterMapEntry
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error>
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", self.kind.type_name())?;
        map.serialize_entry("name", &self.name)?;
        for (key, value) in self.attributes.iter() {
            map.serialize_entry(key, value)?;
        }
        let layout = [
            ("array_count", self.array_count),
            ("byte_offset", self.byte_offset),
            ("byte_size", self.byte_size),
            ("bit_offset", self.bit_offset),
            ("bit_size", self.bit_size),
        ];
        for (key, value) in layout {
            if let Some(value) = value {
                map.serialize_entry(key, &value)?;
            }
        }
        if self.kind.is_aggregate() {
            map.serialize_entry("members", &self.members)?;
        }
        map.end()
    }
}

/// One constant of an enumeration.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumeratorEntry
{
    pub name: String,
    pub value: u64,
    pub attributes: AttributeSet,
}

impl Serialize for EnumeratorEntry
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error>
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("name", &self.name)?;
        map.serialize_entry("value", &self.value)?;
        for (key, value) in self.attributes.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// An enumeration-typed variable and its constants.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDescriptor
{
    pub name: String,
    pub attributes: AttributeSet,
    pub enumerators: Vec<EnumeratorEntry>,
}

impl EnumDescriptor
{
    pub fn enumerator(&self, name: &str) -> Option<&EnumeratorEntry>
    {
        self.enumerators.iter().find(|constant| constant.name == name)
    }
}

impl Serialize for EnumDescriptor
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error>
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("name", &self.name)?;
        for (key, value) in self.attributes.iter() {
            map.serialize_entry(key, value)?;
        }
        map.serialize_entry("enumerators", &self.enumerators)?;
        map.end()
    }
}

/// The complete output: `{ "regmap": [...], "enums": [...] }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegisterMapDocument
{
    pub regmap: Vec<RegisterMapEntry>,
    pub enums: Vec<EnumDescriptor>,
}

impl RegisterMapDocument
{
    /// Root register-map entry by variable name.
    pub fn entry(&self, name: &str) -> Option<&RegisterMapEntry>
    {
        self.regmap.iter().find(|entry| entry.name == name)
    }

    pub fn enumeration(&self, name: &str) -> Option<&EnumDescriptor>
    {
        self.enums.iter().find(|descriptor| descriptor.name == name)
    }
}
