//! Conversion of gimli DIE trees into a [`DebugInfo`] arena.
//!
//! Units are collected first so that cross-unit (`DW_FORM_ref_addr`) and
//! type-signature (`DW_FORM_ref_sig8`) references can be resolved once every
//! entity has an id.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use gimli::{
    constants, AttributeValue, DebuggingInformationEntry, DwAt, EntriesTreeNode, Expression, Operation, Reader, Unit,
    UnitSectionOffset, UnitType,
};
use tracing::{debug, trace};

use super::{DebugInfo, Die, DieId, OwnedDwarf, OwnedReader, CONSTANT_ATTRIBUTES};
use crate::error::{map_dwarf_error, Result};
use crate::types::DeclarationSite;

/// `(unit index, offset within unit)`
type EntryKey = (usize, usize);

#[derive(Default)]
struct Arena
{
    info: DebugInfo,
    offsets: HashMap<EntryKey, DieId>,
    pending: Vec<(DieId, usize, AttributeValue<OwnedReader>)>,
}

pub(crate) struct Loader<'a>
{
    dwarf: &'a OwnedDwarf,
}

impl<'a> Loader<'a>
{
    pub(crate) fn new(dwarf: &'a OwnedDwarf) -> Self
    {
        Self { dwarf }
    }

    fn units(&self) -> Result<Vec<Unit<OwnedReader>>>
    {
        let mut units = Vec::new();
        let mut headers = self.dwarf.units();
        while let Some(header) = headers
            .next()
            .map_err(|err| map_dwarf_error("reading .debug_info unit header", err))?
        {
            units.push(
                self.dwarf
                    .unit(header)
                    .map_err(|err| map_dwarf_error("parsing compilation unit", err))?,
            );
        }

        let mut type_headers = self.dwarf.type_units();
        while let Some(header) = type_headers
            .next()
            .map_err(|err| map_dwarf_error("reading .debug_types unit header", err))?
        {
            units.push(
                self.dwarf
                    .unit(header)
                    .map_err(|err| map_dwarf_error("parsing type unit", err))?,
            );
        }

        Ok(units)
    }

    pub(crate) fn load(&self) -> Result<DebugInfo>
    {
        let units = self.units()?;
        let mut arena = Arena::default();

        for (index, unit) in units.iter().enumerate() {
            self.load_unit(&mut arena, index, unit)?;
        }

        let Arena {
            mut info,
            offsets,
            pending,
        } = arena;

        let mut unresolved = 0usize;
        for (id, unit_index, value) in pending {
            let target = Self::resolve_reference(&units, unit_index, &value).and_then(|key| offsets.get(&key));
            match (target, info.get_mut(id)) {
                (Some(&target), Some(die)) => die.type_ref = Some(target),
                _ => unresolved += 1,
            }
        }
        if unresolved > 0 {
            debug!(unresolved, "type references left unresolved");
        }

        debug!(units = units.len(), entities = info.len(), "loaded DWARF units");
        Ok(info)
    }

    fn load_unit(&self, arena: &mut Arena, index: usize, unit: &Unit<OwnedReader>) -> Result<()>
    {
        let mut tree = unit
            .entries_tree(None)
            .map_err(|err| map_dwarf_error("building unit tree", err))?;
        let root = tree.root().map_err(|err| map_dwarf_error("navigating unit root", err))?;

        let comp_dir = match root
            .entry()
            .attr(constants::DW_AT_comp_dir)
            .map_err(|err| map_dwarf_error("reading DW_AT_comp_dir", err))?
        {
            Some(attr) => Some(PathBuf::from(self.attr_to_string(unit, attr.value())?)),
            None => None,
        };

        trace!(unit = index, comp_dir = ?comp_dir, "loading unit");
        self.load_node(arena, index, unit, comp_dir.as_deref(), root, None)
    }

    fn load_node(
        &self,
        arena: &mut Arena,
        index: usize,
        unit: &Unit<OwnedReader>,
        comp_dir: Option<&Path>,
        node: EntriesTreeNode<'_, '_, '_, OwnedReader>,
        parent: Option<DieId>,
    ) -> Result<()>
    {
        let id = self.load_entry(arena, index, unit, comp_dir, node.entry(), parent)?;

        let mut children = node.children();
        while let Some(child) = children.next().map_err(|err| map_dwarf_error("iterating children", err))? {
            self.load_node(arena, index, unit, comp_dir, child, Some(id))?;
        }
        Ok(())
    }

    fn load_entry(
        &self,
        arena: &mut Arena,
        index: usize,
        unit: &Unit<OwnedReader>,
        comp_dir: Option<&Path>,
        entry: &DebuggingInformationEntry<'_, '_, OwnedReader>,
        parent: Option<DieId>,
    ) -> Result<DieId>
    {
        let mut die = Die::new(entry.tag());
        die.name = self.entry_name(unit, entry)?;
        die.decl = self.decl_site(unit, comp_dir, entry)?;
        for &name in CONSTANT_ATTRIBUTES {
            if let Some(value) = self.constant_attr(unit, entry, name)? {
                die.set_attr(name, value);
            }
        }

        let id = arena.info.push(parent, die);
        arena.offsets.insert((index, entry.offset().0), id);

        if let Some(attr) = entry
            .attr(constants::DW_AT_type)
            .map_err(|err| map_dwarf_error("reading DW_AT_type", err))?
        {
            arena.pending.push((id, index, attr.value()));
        }

        Ok(id)
    }

    fn entry_name(
        &self,
        unit: &Unit<OwnedReader>,
        entry: &DebuggingInformationEntry<'_, '_, OwnedReader>,
    ) -> Result<Option<String>>
    {
        match entry
            .attr(constants::DW_AT_name)
            .map_err(|err| map_dwarf_error("reading DW_AT_name", err))?
        {
            Some(attr) => Ok(Some(self.attr_to_string(unit, attr.value())?)),
            None => Ok(None),
        }
    }

    fn decl_site(
        &self,
        unit: &Unit<OwnedReader>,
        comp_dir: Option<&Path>,
        entry: &DebuggingInformationEntry<'_, '_, OwnedReader>,
    ) -> Result<Option<DeclarationSite>>
    {
        let Some(file) = entry
            .attr(constants::DW_AT_decl_file)
            .map_err(|err| map_dwarf_error("reading DW_AT_decl_file", err))?
        else {
            return Ok(None);
        };
        let Some(line) = entry
            .attr(constants::DW_AT_decl_line)
            .map_err(|err| map_dwarf_error("reading DW_AT_decl_line", err))?
            .and_then(|attr| attr.udata_value())
        else {
            return Ok(None);
        };

        let index = match file.value() {
            AttributeValue::FileIndex(index) => Some(index),
            other => other.udata_value(),
        };
        let Some(index) = index else {
            return Ok(None);
        };

        Ok(self
            .file_path(unit, comp_dir, index)?
            .map(|path| DeclarationSite::new(path, line)))
    }

    /// Absolute path of line-program file `index`: comp_dir, then include
    /// directory, then file name, each replacing the prefix when absolute.
    fn file_path(&self, unit: &Unit<OwnedReader>, comp_dir: Option<&Path>, index: u64) -> Result<Option<PathBuf>>
    {
        let Some(program) = unit.line_program.as_ref() else {
            return Ok(None);
        };
        let header = program.header();
        let Some(file) = header.file(index) else {
            trace!(index, "invalid file index");
            return Ok(None);
        };

        let mut path = comp_dir.map(Path::to_path_buf).unwrap_or_default();
        if let Some(directory) = file.directory(header) {
            path.push(self.attr_to_string(unit, directory)?);
        }
        path.push(self.attr_to_string(unit, file.path_name())?);
        Ok(Some(path))
    }

    #[allow(clippy::cast_sign_loss)]
    fn constant_attr(
        &self,
        unit: &Unit<OwnedReader>,
        entry: &DebuggingInformationEntry<'_, '_, OwnedReader>,
        name: DwAt,
    ) -> Result<Option<u64>>
    {
        let Some(attr) = entry
            .attr(name)
            .map_err(|err| map_dwarf_error(&format!("reading {name}"), err))?
        else {
            return Ok(None);
        };

        if let AttributeValue::Exprloc(expression) = attr.value() {
            return Self::evaluate_constant(unit, expression);
        }

        Ok(attr.udata_value().or_else(|| attr.sdata_value().map(|value| value as u64)))
    }

    /// Location expressions of the form `DW_OP_plus_uconst N` or
    /// `DW_OP_constu N`, as older producers emit for member offsets.
    fn evaluate_constant(unit: &Unit<OwnedReader>, expression: Expression<OwnedReader>) -> Result<Option<u64>>
    {
        let mut operations = expression.operations(unit.encoding());
        let first = operations
            .next()
            .map_err(|err| map_dwarf_error("decoding location expression", err))?;
        let second = operations
            .next()
            .map_err(|err| map_dwarf_error("decoding location expression", err))?;

        Ok(match (first, second) {
            (Some(Operation::PlusConstant { value } | Operation::UnsignedConstant { value }), None) => Some(value),
            _ => None,
        })
    }

    fn attr_to_string(&self, unit: &Unit<OwnedReader>, value: AttributeValue<OwnedReader>) -> Result<String>
    {
        let reader = self
            .dwarf
            .attr_string(unit, value)
            .map_err(|err| map_dwarf_error("resolving DWARF string", err))?;
        let owned = match reader.to_string() {
            Ok(cow) => cow.into_owned(),
            Err(_) => reader
                .to_string_lossy()
                .map_err(|err| map_dwarf_error("decoding DWARF string", err))?
                .into_owned(),
        };
        Ok(owned)
    }

    fn resolve_reference(
        units: &[Unit<OwnedReader>],
        unit_index: usize,
        value: &AttributeValue<OwnedReader>,
    ) -> Option<EntryKey>
    {
        match value {
            AttributeValue::UnitRef(offset) => Some((unit_index, offset.0)),
            AttributeValue::DebugInfoRef(offset) => {
                let target = UnitSectionOffset::from(*offset);
                units
                    .iter()
                    .enumerate()
                    .find_map(|(index, unit)| target.to_unit_offset(unit).map(|offset| (index, offset.0)))
            }
            AttributeValue::DebugTypesRef(signature) => {
                units
                    .iter()
                    .enumerate()
                    .find_map(|(index, unit)| match unit.header.type_() {
                        UnitType::Type {
                            type_signature,
                            type_offset,
                        }
                        | UnitType::SplitType {
                            type_signature,
                            type_offset,
                        } if type_signature == *signature => Some((index, type_offset.0)),
                        _ => None,
                    })
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests
{
    use std::fs;
    use std::sync::Arc;

    use gimli::write::{self, EndianVec, LineProgram, LineString, Reference, Sections, UnitEntryId};
    use gimli::{DwTag, EndianArcSlice, Encoding, Format, LineEncoding, LittleEndian, RunTimeEndian};
    use tempfile::TempDir;

    use super::*;
    use crate::config::CompileUnitFilter;
    use crate::extract::Extractor;
    use crate::types::EntryKind;

    const ENCODING: Encoding = Encoding {
        format: Format::Dwarf32,
        version: 4,
        address_size: 4,
    };

    const REGS_H: &str = r#"#include <stdint.h>

struct regs {
    // @regmap brief: "Control"
    unsigned int ctrl;
    // @regmap brief: "Status"
    unsigned int status;
    unsigned int scratch;
};
"#;

    const REGS_C: &str = r#"#include "regs.h"

// @regmap address: 1073741824
struct regs regs;
"#;

    fn string(text: &str) -> write::AttributeValue
    {
        write::AttributeValue::String(text.as_bytes().to_vec())
    }

    fn add(unit: &mut write::Unit, parent: UnitEntryId, tag: DwTag, attrs: Vec<(DwAt, write::AttributeValue)>) -> UnitEntryId
    {
        let id = unit.add(parent, tag);
        for (name, value) in attrs {
            unit.get_mut(id).set(name, value);
        }
        id
    }

    /// Two compile units: `regs.c` declares `struct regs` (in `include/regs.h`)
    /// and a variable of it; `board.c` refers to the struct across units.
    fn firmware(comp_dir: &str) -> write::Dwarf
    {
        let mut dwarf = write::Dwarf::new();

        let line_program = LineProgram::new(
            ENCODING,
            LineEncoding::default(),
            LineString::String(comp_dir.as_bytes().to_vec()),
            None,
            LineString::String(b"regs.c".to_vec()),
            None,
        );
        let regs_unit = dwarf.units.add(write::Unit::new(ENCODING, line_program));
        let regs_struct = {
            let unit = dwarf.units.get_mut(regs_unit);
            let include = unit.line_program.add_directory(LineString::String(b"include".to_vec()));
            let header = unit.line_program.add_file(LineString::String(b"regs.h".to_vec()), include, None);
            let current = unit.line_program.default_directory();
            let source = unit.line_program.add_file(LineString::String(b"regs.c".to_vec()), current, None);

            let root = unit.root();
            unit.get_mut(root).set(constants::DW_AT_name, string("regs.c"));
            unit.get_mut(root).set(constants::DW_AT_comp_dir, string(comp_dir));

            let uint = add(
                unit,
                root,
                constants::DW_TAG_base_type,
                vec![
                    (constants::DW_AT_name, string("unsigned int")),
                    (constants::DW_AT_byte_size, write::AttributeValue::Udata(4)),
                ],
            );
            let decl = |line: u64| {
                vec![
                    (constants::DW_AT_decl_file, write::AttributeValue::FileIndex(Some(header))),
                    (constants::DW_AT_decl_line, write::AttributeValue::Udata(line)),
                ]
            };

            let mut attrs = vec![
                (constants::DW_AT_name, string("regs")),
                (constants::DW_AT_byte_size, write::AttributeValue::Udata(12)),
            ];
            attrs.extend(decl(3));
            let regs_struct = add(unit, root, constants::DW_TAG_structure_type, attrs);

            let mut plus_uconst = write::Expression::new();
            plus_uconst.op_plus_uconst(8);
            let mut two_ops = write::Expression::new();
            two_ops.op_constu(1);
            two_ops.op_plus_uconst(2);
            let members = [
                ("ctrl", 5, write::AttributeValue::Udata(0)),
                ("status", 7, write::AttributeValue::Exprloc(plus_uconst)),
                ("scratch", 8, write::AttributeValue::Exprloc(two_ops)),
            ];
            for (name, line, location) in members {
                let mut attrs = vec![
                    (constants::DW_AT_name, string(name)),
                    (constants::DW_AT_type, write::AttributeValue::UnitRef(uint)),
                    (constants::DW_AT_data_member_location, location),
                ];
                attrs.extend(decl(line));
                add(unit, regs_struct, constants::DW_TAG_member, attrs);
            }

            let fifo = add(
                unit,
                root,
                constants::DW_TAG_array_type,
                vec![(constants::DW_AT_type, write::AttributeValue::UnitRef(uint))],
            );
            add(
                unit,
                fifo,
                constants::DW_TAG_subrange_type,
                vec![(constants::DW_AT_count, write::AttributeValue::Sdata(-1))],
            );

            let mode = add(
                unit,
                root,
                constants::DW_TAG_enumeration_type,
                vec![(constants::DW_AT_name, string("MODE"))],
            );
            for (name, value) in [("MODE_OFF", write::AttributeValue::Udata(0)), ("MODE_FAULT", write::AttributeValue::Sdata(-3))] {
                add(
                    unit,
                    mode,
                    constants::DW_TAG_enumerator,
                    vec![(constants::DW_AT_name, string(name)), (constants::DW_AT_const_value, value)],
                );
            }

            add(
                unit,
                root,
                constants::DW_TAG_variable,
                vec![
                    (constants::DW_AT_name, string("regs")),
                    (constants::DW_AT_type, write::AttributeValue::UnitRef(regs_struct)),
                    (constants::DW_AT_decl_file, write::AttributeValue::FileIndex(Some(source))),
                    (constants::DW_AT_decl_line, write::AttributeValue::Udata(4)),
                ],
            );
            regs_struct
        };

        let board_unit = dwarf.units.add(write::Unit::new(ENCODING, LineProgram::none()));
        let unit = dwarf.units.get_mut(board_unit);
        let root = unit.root();
        unit.get_mut(root).set(constants::DW_AT_name, string("board.c"));
        add(
            unit,
            root,
            constants::DW_TAG_variable,
            vec![
                (constants::DW_AT_name, string("board_regs")),
                (
                    constants::DW_AT_type,
                    write::AttributeValue::DebugInfoRef(Reference::Entry(regs_unit, regs_struct)),
                ),
            ],
        );

        dwarf
    }

    fn load(mut dwarf: write::Dwarf) -> DebugInfo
    {
        let mut sections = Sections::new(EndianVec::new(LittleEndian));
        dwarf.write(&mut sections).unwrap();

        let owned: OwnedDwarf = gimli::Dwarf::load(|id| -> std::result::Result<OwnedReader, gimli::Error> {
            let bytes: Arc<[u8]> = sections
                .get(id)
                .map_or_else(|| Arc::from(Vec::new()), |section| Arc::from(section.slice()));
            Ok(EndianArcSlice::new(bytes, RunTimeEndian::Little))
        })
        .unwrap();
        Loader::new(&owned).load().unwrap()
    }

    fn find(info: &DebugInfo, name: &str) -> DieId
    {
        let mut stack: Vec<DieId> = info.compile_units().collect();
        while let Some(id) = stack.pop() {
            if info[id].name.as_deref() == Some(name) {
                return id;
            }
            stack.extend(info.children(id));
        }
        panic!("no entity named {name}");
    }

    #[test]
    fn units_and_names_are_loaded()
    {
        let info = load(firmware("/work"));

        let units: Vec<_> = info.compile_units().map(|unit| info[unit].short_name().to_string()).collect();
        assert_eq!(units, ["regs.c", "board.c"]);

        let regs = find(&info, "regs");
        let members: Vec<_> = info.children(regs).map(|member| info[member].short_name().to_string()).collect();
        assert_eq!(members, ["ctrl", "status", "scratch"]);
    }

    #[test]
    fn decl_file_joins_comp_dir_include_dir_and_name()
    {
        let info = load(firmware("/work"));

        let ctrl = &info[find(&info, "ctrl")];
        let site = ctrl.decl.as_ref().unwrap();
        assert_eq!(site.path(), Path::new("/work/include/regs.h"));
        assert_eq!(site.line(), 5);

        let variable = info
            .children(info.compile_units().next().unwrap())
            .find(|&id| info[id].tag == constants::DW_TAG_variable)
            .unwrap();
        let site = info[variable].decl.as_ref().unwrap();
        assert_eq!(site.path(), Path::new("/work/regs.c"));
        assert_eq!(site.line(), 4);

        assert!(info[find(&info, "board_regs")].decl.is_none());
    }

    #[test]
    fn member_locations_accept_constants_and_plus_uconst()
    {
        let info = load(firmware("/work"));
        let location = |name: &str| info[find(&info, name)].attr(constants::DW_AT_data_member_location);

        assert_eq!(location("ctrl"), Some(0));
        assert_eq!(location("status"), Some(8));
        // Only single-operation expressions are understood.
        assert_eq!(location("scratch"), None);
    }

    #[test]
    fn signed_constants_are_stored_twos_complement()
    {
        let info = load(firmware("/work"));

        assert_eq!(info[find(&info, "MODE_OFF")].attr(constants::DW_AT_const_value), Some(0));
        assert_eq!(
            info[find(&info, "MODE_FAULT")].attr(constants::DW_AT_const_value),
            Some((-3i64) as u64)
        );

        let fifo = info
            .children(info.compile_units().next().unwrap())
            .find(|&id| info[id].tag == constants::DW_TAG_array_type)
            .unwrap();
        let subrange = info.children(fifo).next().unwrap();
        assert_eq!(info[subrange].attr(constants::DW_AT_count), Some(u64::MAX));
        assert!(crate::walker::regmap::array_count(&info, fifo, "fifo").is_err());
    }

    #[test]
    fn type_references_resolve_within_and_across_units()
    {
        let info = load(firmware("/work"));
        let regs_struct = info
            .children(info.compile_units().next().unwrap())
            .find(|&id| info[id].tag == constants::DW_TAG_structure_type)
            .unwrap();

        assert_eq!(info.type_of(find(&info, "board_regs")), Some(regs_struct));
        let uint = info.type_of(find(&info, "ctrl")).unwrap();
        assert_eq!(info[uint].short_name(), "unsigned int");
        assert_eq!(info[uint].attr(constants::DW_AT_byte_size), Some(4));
    }

    #[test]
    fn extraction_reads_comments_through_loaded_paths()
    {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("include")).unwrap();
        fs::write(dir.path().join("include/regs.h"), REGS_H).unwrap();
        fs::write(dir.path().join("regs.c"), REGS_C).unwrap();

        let info = load(firmware(&dir.path().to_string_lossy()));
        let document = Extractor::new()
            .extract(&info, &CompileUnitFilter::from_names(["regs.c"]))
            .unwrap();

        assert_eq!(document.regmap.len(), 1);
        let regs = document.entry("regs").unwrap();
        assert_eq!(regs.kind, EntryKind::Struct);
        assert_eq!(regs.attributes.get("address"), Some(&serde_json::json!(1_073_741_824)));
        assert_eq!(regs.byte_size, Some(12));

        let status = regs.member("status").unwrap();
        assert_eq!(status.byte_offset, Some(8));
        assert_eq!(status.attributes.get("brief"), Some(&serde_json::json!("Status")));
        assert_eq!(regs.member("ctrl").unwrap().attributes.get("brief"), Some(&serde_json::json!("Control")));
        assert!(regs.member("scratch").unwrap().attributes.is_empty());

        let everything = Extractor::new().extract(&info, &CompileUnitFilter::all()).unwrap();
        let board = everything.entry("board_regs").unwrap();
        assert_eq!(board.members.len(), 3);
    }
}
