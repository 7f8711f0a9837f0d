//! # Enum Builder
//!
//! Renders enumeration-typed variables into [`EnumDescriptor`]s.
//!
//! Enumerator values are unsigned. A negative constant (`DW_FORM_sdata`) is
//! emitted as its 64-bit two's complement, so `-1` becomes
//! `18446744073709551615` rather than being dropped or written as `null`.

use gimli::constants;
use tracing::trace;

use super::chain::TypeChain;
use super::declared_attributes;
use crate::debuginfo::{DebugInfo, DieId};
use crate::error::Result;
use crate::source::CommentDecoder;
use crate::types::{AttributeSet, EnumDescriptor, EnumeratorEntry};

pub struct EnumBuilder<'a>
{
    info: &'a DebugInfo,
    decoder: &'a CommentDecoder,
}

impl<'a> EnumBuilder<'a>
{
    pub fn new(info: &'a DebugInfo, decoder: &'a CommentDecoder) -> Self
    {
        Self { info, decoder }
    }

    /// Render `entity` if its type chain reaches an enumeration type.
    ///
    /// Attributes are those of the enumeration type followed by those of the
    /// variable. Enumerators without a constant value are left out.
    ///
    /// ## Errors
    ///
    /// Propagates malformed `@regmap` attributes of the enumeration, the
    /// variable or any enumerator.
    pub fn render(&self, entity: DieId) -> Result<Option<EnumDescriptor>>
    {
        let info = self.info;
        let Some(enumeration) = TypeChain::resolve(info, entity).enumeration else {
            return Ok(None);
        };

        let die = &info[entity];
        let ty = &info[enumeration];

        let mut attributes = declared_attributes(self.decoder, ty)?;
        attributes.append(declared_attributes(self.decoder, die)?);

        let mut enumerators = Vec::new();
        for child in info.children(enumeration) {
            let constant = &info[child];
            if constant.tag != constants::DW_TAG_enumerator {
                continue;
            }
            let Some(value) = constant.attr(constants::DW_AT_const_value) else {
                trace!(constant = constant.short_name(), "enumerator without constant value, skipped");
                continue;
            };

            let attributes = match &ty.decl {
                Some(site) => self.decoder.decode_enum_constant(site, constant.short_name())?,
                None => AttributeSet::new(),
            };

            enumerators.push(EnumeratorEntry {
                name: constant.short_name().to_string(),
                value,
                attributes,
            });
        }

        Ok(Some(EnumDescriptor {
            name: die.short_name().to_string(),
            attributes,
            enumerators,
        }))
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::debuginfo::Die;

    #[test]
    fn negative_enumerator_is_twos_complement()
    {
        let mut info = DebugInfo::new();
        let cu = info.push(None, Die::new(constants::DW_TAG_compile_unit).with_name("level.c"));
        let enumeration = info.push(Some(cu), Die::new(constants::DW_TAG_enumeration_type).with_name("LEVEL"));
        for (name, value) in [("LEVEL_UNSET", -1i64), ("LEVEL_LOW", 0)] {
            let constant = Die::new(constants::DW_TAG_enumerator)
                .with_name(name)
                .with_attr(constants::DW_AT_const_value, value as u64);
            info.push(Some(enumeration), constant);
        }
        let variable = info.push(
            Some(cu),
            Die::new(constants::DW_TAG_variable).with_name("level").with_type(enumeration),
        );

        let decoder = CommentDecoder::new();
        let descriptor = EnumBuilder::new(&info, &decoder).render(variable).unwrap().unwrap();

        assert_eq!(descriptor.name, "level");
        assert_eq!(descriptor.enumerator("LEVEL_UNSET").unwrap().value, u64::MAX);
        assert_eq!(descriptor.enumerator("LEVEL_LOW").unwrap().value, 0);
        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(json["enumerators"][0]["value"], serde_json::json!(18_446_744_073_709_551_615u64));
    }
}
