//! # Orchestration
//!
//! Selects top-level variables of the chosen compile units, routes each to the
//! enum or register-map renderer, and assembles the output document.

use std::path::Path;

use gimli::constants;
use tracing::{debug, info, trace};

use crate::config::{CompileUnitFilter, ExtractOptions};
use crate::debuginfo::{BinaryImage, DebugInfo, DieId};
use crate::error::Result;
use crate::source::CommentDecoder;
use crate::types::RegisterMapDocument;
use crate::walker::{EnumBuilder, RegisterMapBuilder, TypeChain};

/// Drives one extraction over a [`DebugInfo`], owning the comment decoder and
/// therefore the source line cache.
#[derive(Debug, Default)]
pub struct Extractor
{
    decoder: CommentDecoder,
}

impl Extractor
{
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Build the register map of every variable declared at the top level of
    /// the compile units selected by `filter`.
    ///
    /// Entries keep first-encountered order across units and variables.
    ///
    /// ## Errors
    ///
    /// Aborts on the first fatal condition; no partial document is returned.
    pub fn extract(&self, info: &DebugInfo, filter: &CompileUnitFilter) -> Result<RegisterMapDocument>
    {
        let (registers, enumerations) = Self::classify(info, filter);

        let mut document = RegisterMapDocument::default();

        let mut builder = RegisterMapBuilder::new(info, &self.decoder);
        for variable in registers {
            if let Some(entry) = builder.render(variable, 0)? {
                document.regmap.push(entry);
            }
        }

        let builder = EnumBuilder::new(info, &self.decoder);
        for variable in enumerations {
            if let Some(descriptor) = builder.render(variable)? {
                document.enums.push(descriptor);
            }
        }

        info!(
            regmap = document.regmap.len(),
            enums = document.enums.len(),
            sources = self.decoder.cache().len(),
            "register map extracted"
        );
        Ok(document)
    }

    /// Top-level variables of the selected units, split into non-enum and
    /// enum-typed ones.
    fn classify(info: &DebugInfo, filter: &CompileUnitFilter) -> (Vec<DieId>, Vec<DieId>)
    {
        let mut registers = Vec::new();
        let mut enumerations = Vec::new();

        for unit in info.compile_units() {
            let unit_name = info[unit].short_name();
            if !filter.matches(unit_name) {
                trace!(unit = unit_name, "compile unit not selected");
                continue;
            }
            debug!(unit = unit_name, "visiting compile unit");

            for child in info.children(unit) {
                if info[child].tag != constants::DW_TAG_variable {
                    continue;
                }
                if TypeChain::is_enumeration(info, child) {
                    trace!(variable = info[child].short_name(), "routed to enums");
                    enumerations.push(child);
                } else {
                    trace!(variable = info[child].short_name(), "routed to regmap");
                    registers.push(child);
                }
            }
        }

        (registers, enumerations)
    }
}

/// Load `firmware` and extract its register map with `options`.
///
/// ## Errors
///
/// Fails if the image cannot be loaded or on any fatal extraction condition.
pub fn extract_firmware(firmware: &Path, options: &ExtractOptions) -> Result<RegisterMapDocument>
{
    let image = BinaryImage::open(firmware)?;
    let info = image.debug_info()?;
    Extractor::new().extract(&info, &options.compile_units)
}
