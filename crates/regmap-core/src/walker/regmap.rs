//! # Register-Map Builder
//!
//! Renders a base/struct/union-typed variable, and recursively the members of
//! aggregates, into [`RegisterMapEntry`] trees.
//!
//! `bit_offset` is taken verbatim from `DW_AT_bit_offset`: bits from the most
//! significant bit of the member's storage unit. DWARF 4+ producers emit
//! `DW_AT_data_bit_offset` instead, counted from the least significant bit at
//! the start of the containing aggregate. That value is used as a fallback
//! without conversion, so the two conventions share the key and consumers
//! must know which producer built the image.

use gimli::constants;
use tracing::{trace, warn};

use super::chain::{Terminal, TypeChain};
use super::declared_attributes;
use crate::debuginfo::{DebugInfo, DieId};
use crate::error::{RegmapError, Result};
use crate::source::CommentDecoder;
use crate::types::{EntryKind, RegisterMapEntry};

pub struct RegisterMapBuilder<'a>
{
    info: &'a DebugInfo,
    decoder: &'a CommentDecoder,
    /// Aggregates being expanded on the current path, outermost first.
    expanding: Vec<DieId>,
}

impl<'a> RegisterMapBuilder<'a>
{
    pub fn new(info: &'a DebugInfo, decoder: &'a CommentDecoder) -> Self
    {
        Self {
            info,
            decoder,
            expanding: Vec::new(),
        }
    }

    /// Render `entity` at nesting `depth` (0 for top-level variables).
    ///
    /// Returns `Ok(None)` when the type chain ends in no base, struct or union
    /// type.
    ///
    /// ## Errors
    ///
    /// Propagates malformed `@regmap` attributes and array types without a
    /// usable element count, from this entity or any nested member.
    pub fn render(&mut self, entity: DieId, depth: usize) -> Result<Option<RegisterMapEntry>>
    {
        let info = self.info;
        let chain = TypeChain::resolve(info, entity);
        let Some(terminal) = chain.terminal else {
            trace!(entity = info[entity].short_name(), "no base, struct or union type, skipped");
            return Ok(None);
        };

        let die = &info[entity];
        let ty = &info[terminal.id()];

        let kind = match terminal {
            Terminal::Base(_) => EntryKind::Base(ty.short_name().to_string()),
            Terminal::Struct(_) => EntryKind::Struct,
            Terminal::Union(_) => EntryKind::Union,
        };
        let mut entry = RegisterMapEntry::new(die.short_name(), kind);

        entry.attributes = declared_attributes(self.decoder, ty)?;
        entry.attributes.append(declared_attributes(self.decoder, die)?);

        if let Some(array) = chain.array {
            entry.array_count = Some(array_count(info, array, die.short_name())?);
        }

        if depth > 0 {
            entry.byte_offset = die.attr(constants::DW_AT_data_member_location);
        }

        entry.byte_size = ty.attr(constants::DW_AT_byte_size);

        if let Terminal::Base(_) = terminal {
            entry.bit_offset = die
                .attr(constants::DW_AT_bit_offset)
                .or_else(|| die.attr(constants::DW_AT_data_bit_offset));
            entry.bit_size = die.attr(constants::DW_AT_bit_size);
        }

        if let Terminal::Struct(aggregate) | Terminal::Union(aggregate) = terminal {
            entry.members = self.render_members(aggregate, entry.name.as_str(), depth)?;
        }

        Ok(Some(entry))
    }

    fn render_members(&mut self, aggregate: DieId, owner: &str, depth: usize) -> Result<Vec<RegisterMapEntry>>
    {
        if self.expanding.contains(&aggregate) {
            warn!(
                entity = owner,
                ty = self.info[aggregate].short_name(),
                "recursive aggregate, members not expanded again"
            );
            return Ok(Vec::new());
        }

        self.expanding.push(aggregate);
        let members = self.collect_members(aggregate, depth);
        self.expanding.pop();
        members
    }

    fn collect_members(&mut self, aggregate: DieId, depth: usize) -> Result<Vec<RegisterMapEntry>>
    {
        let info = self.info;
        let mut members = Vec::new();
        for child in info.children(aggregate) {
            if info[child].tag != constants::DW_TAG_member {
                continue;
            }
            if let Some(member) = self.render(child, depth + 1)? {
                members.push(member);
            }
        }
        Ok(members)
    }
}

/// Element count of `array`, from its last subrange: `DW_AT_count` when
/// non-zero, otherwise `DW_AT_upper_bound + 1`.
///
/// Both are stored as `u64`; a value above `i64::MAX` came from a negative
/// signed form and counts as absent.
///
/// ## Errors
///
/// [`RegmapError::UnresolvableArrayCount`] when neither yields a count.
pub fn array_count(info: &DebugInfo, array: DieId, name: &str) -> Result<u64>
{
    let subrange = info
        .children(array)
        .filter(|&child| info[child].tag == constants::DW_TAG_subrange_type)
        .last();

    let count = subrange.map_or(0, |subrange| {
        let die = &info[subrange];
        match non_negative(die.attr(constants::DW_AT_count)) {
            Some(count) if count > 0 => count,
            _ => non_negative(die.attr(constants::DW_AT_upper_bound)).map_or(0, |upper_bound| upper_bound + 1),
        }
    });

    if count == 0 {
        return Err(RegmapError::UnresolvableArrayCount { name: name.to_string() });
    }
    Ok(count)
}

fn non_negative(value: Option<u64>) -> Option<u64>
{
    value.filter(|&value| i64::try_from(value).is_ok())
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::debuginfo::Die;

    fn array_with(subrange: Die) -> (DebugInfo, DieId)
    {
        let mut info = DebugInfo::new();
        let array = info.push(None, Die::new(constants::DW_TAG_array_type));
        info.push(Some(array), subrange);
        (info, array)
    }

    #[test]
    fn count_attribute_wins()
    {
        let (info, array) = array_with(
            Die::new(constants::DW_TAG_subrange_type)
                .with_attr(constants::DW_AT_count, 5)
                .with_attr(constants::DW_AT_upper_bound, 9),
        );
        assert_eq!(array_count(&info, array, "x").unwrap(), 5);
    }

    #[test]
    fn upper_bound_is_zero_based()
    {
        let (info, array) = array_with(Die::new(constants::DW_TAG_subrange_type).with_attr(constants::DW_AT_upper_bound, 2));
        assert_eq!(array_count(&info, array, "threads").unwrap(), 3);
    }

    #[test]
    fn zero_count_falls_back_to_upper_bound()
    {
        let (info, array) = array_with(
            Die::new(constants::DW_TAG_subrange_type)
                .with_attr(constants::DW_AT_count, 0)
                .with_attr(constants::DW_AT_upper_bound, 3),
        );
        assert_eq!(array_count(&info, array, "x").unwrap(), 4);
    }

    #[test]
    fn flexible_array_is_fatal()
    {
        // upper bound -1 as stored two's complement
        let (info, array) = array_with(Die::new(constants::DW_TAG_subrange_type).with_attr(constants::DW_AT_upper_bound, u64::MAX));
        let err = array_count(&info, array, "tail").unwrap_err();
        assert!(matches!(err, RegmapError::UnresolvableArrayCount { ref name } if name == "tail"));
    }

    #[test]
    fn negative_count_is_fatal()
    {
        // `DW_FORM_sdata -1` as stored by the loader.
        let (info, array) = array_with(Die::new(constants::DW_TAG_subrange_type).with_attr(constants::DW_AT_count, u64::MAX));
        assert!(matches!(
            array_count(&info, array, "x"),
            Err(RegmapError::UnresolvableArrayCount { .. })
        ));
    }

    #[test]
    fn negative_count_falls_back_to_upper_bound()
    {
        let (info, array) = array_with(
            Die::new(constants::DW_TAG_subrange_type)
                .with_attr(constants::DW_AT_count, (-4i64) as u64)
                .with_attr(constants::DW_AT_upper_bound, 3),
        );
        assert_eq!(array_count(&info, array, "x").unwrap(), 4);
    }

    #[test]
    fn negative_upper_bound_is_fatal()
    {
        let (info, array) =
            array_with(Die::new(constants::DW_TAG_subrange_type).with_attr(constants::DW_AT_upper_bound, (-5i64) as u64));
        assert!(array_count(&info, array, "x").is_err());
    }

    #[test]
    fn missing_subrange_is_fatal()
    {
        let mut info = DebugInfo::new();
        let array = info.push(None, Die::new(constants::DW_TAG_array_type));
        assert!(array_count(&info, array, "x").is_err());
    }

    #[test]
    fn last_subrange_is_used()
    {
        let (mut info, array) = array_with(Die::new(constants::DW_TAG_subrange_type).with_attr(constants::DW_AT_upper_bound, 1));
        info.push(
            Some(array),
            Die::new(constants::DW_TAG_subrange_type).with_attr(constants::DW_AT_upper_bound, 2),
        );
        assert_eq!(array_count(&info, array, "grid").unwrap(), 3);
    }
}
