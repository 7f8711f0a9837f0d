//! Firmware image parsing and DWARF section loading.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use gimli::{Dwarf, EndianArcSlice, RunTimeEndian, SectionId};
use object::{Object, ObjectSection};
use tracing::debug;

use super::loader::Loader;
use super::{DebugInfo, OwnedDwarf, OwnedReader};
use crate::error::{RegmapError, Result};

const DWARF_SECTIONS: &[(SectionId, &[&str])] = &[
    (SectionId::DebugAbbrev, &[".debug_abbrev", "__debug_abbrev"]),
    (SectionId::DebugAddr, &[".debug_addr", "__debug_addr"]),
    (SectionId::DebugInfo, &[".debug_info", "__debug_info"]),
    (SectionId::DebugLine, &[".debug_line", "__debug_line"]),
    (SectionId::DebugLineStr, &[".debug_line_str", "__debug_line_str"]),
    (SectionId::DebugRanges, &[".debug_ranges", "__debug_ranges"]),
    (SectionId::DebugRngLists, &[".debug_rnglists", "__debug_rnglists"]),
    (SectionId::DebugStr, &[".debug_str", "__debug_str"]),
    (SectionId::DebugStrOffsets, &[".debug_str_offsets", "__debug_str_offsets"]),
    (SectionId::DebugTypes, &[".debug_types", "__debug_types"]),
    (SectionId::DebugLoc, &[".debug_loc", "__debug_loc"]),
    (SectionId::DebugLocLists, &[".debug_loclists", "__debug_loclists"]),
];

fn load_section_bytes(file: &object::File<'_>, names: &[&str]) -> Result<Option<Arc<[u8]>>>
{
    for name in names {
        if let Some(section) = file.section_by_name(name) {
            let data = section
                .uncompressed_data()
                .map_err(|err| RegmapError::InvalidImage(format!("failed to read {name}: {err}")))?;
            return Ok(Some(match data {
                Cow::Borrowed(bytes) => Arc::<[u8]>::from(bytes),
                Cow::Owned(vec) => vec.into(),
            }));
        }
    }

    Ok(None)
}

/// A firmware image with its DWARF sections in memory.
pub struct BinaryImage
{
    path: PathBuf,
    endian: RunTimeEndian,
    debug_sections: HashMap<SectionId, Arc<[u8]>>,
}

impl BinaryImage
{
    /// Read and parse the object file at `path`.
    ///
    /// ## Errors
    ///
    /// [`RegmapError::InvalidImage`] if the file cannot be read, is not a
    /// recognised object format, or a DWARF section cannot be decompressed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self>
    {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|err| RegmapError::InvalidImage(format!("{}: {err}", path.display())))?;
        let file = object::File::parse(&*bytes)
            .map_err(|err| RegmapError::InvalidImage(format!("failed to parse {}: {err}", path.display())))?;

        let endian = if file.is_little_endian() {
            RunTimeEndian::Little
        } else {
            RunTimeEndian::Big
        };

        let mut sections = HashMap::new();
        for (id, aliases) in DWARF_SECTIONS {
            if let Some(data) = load_section_bytes(&file, aliases)? {
                debug!(section = id.name(), bytes = data.len(), "loaded DWARF section");
                sections.insert(*id, data);
            }
        }

        if !sections.contains_key(&SectionId::DebugInfo) {
            return Err(RegmapError::InvalidImage(format!(
                "{} has no .debug_info section",
                path.display()
            )));
        }

        Ok(Self {
            path: path.to_path_buf(),
            endian,
            debug_sections: sections,
        })
    }

    fn section_reader(&self, id: SectionId) -> OwnedReader
    {
        let data = self
            .debug_sections
            .get(&id)
            .cloned()
            .unwrap_or_else(|| Arc::<[u8]>::from(Vec::new()));
        EndianArcSlice::new(data, self.endian)
    }

    fn dwarf(&self) -> Result<OwnedDwarf>
    {
        Dwarf::load(|section| Ok::<_, gimli::Error>(self.section_reader(section)))
            .map_err(|err| crate::error::map_dwarf_error("failed to load DWARF", err))
    }

    /// Decode every compile and type unit into a [`DebugInfo`] arena.
    ///
    /// ## Errors
    ///
    /// Returns [`RegmapError::Dwarf`] when a unit cannot be decoded.
    pub fn debug_info(&self) -> Result<DebugInfo>
    {
        let dwarf = self.dwarf()?;
        let info = Loader::new(&dwarf).load()?;
        debug!(path = %self.path.display(), entities = info.len(), "decoded debug information");
        Ok(info)
    }
}
