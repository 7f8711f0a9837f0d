//! # Comment Attribute Decoder
//!
//! Mines `@regmap key: value` attributes from the single-line comments that
//! directly precede a declaration:
//!
//! ```c
//! // @regmap brief: "A drop of golden sun"
//! // @regmap address: 2048
//! volatile uint16_t ray;
//! ```
//!
//! Scanning starts on the line above the declaration and walks upward.
//! Blank lines are skipped and `@regmap` lines are collected. Block comments
//! are never mined, and `@regmap` lines above one are not reached. Any other
//! line, including a plain `//` comment, ends the block. Each collected line is
//! split at its first `:` into a key and a JSON literal value.
//!
//! Enumerators carry no declaration site in DWARF, so
//! [`CommentDecoder::decode_enum_constant`] locates them heuristically: the
//! first line after the enumeration's own declaration that starts with the
//! constant's identifier. A miss yields no attributes rather than an error.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, trace};

use super::cache::{SourceCache, SourceLines};
use crate::error::{RegmapError, Result};
use crate::types::{AttributeSet, DeclarationSite};

static BLANK: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[ \t]*$").expect("valid regex"));
static BLOCK_BEGIN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[ \t]*/\*").expect("valid regex"));
static BLOCK_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*/[ \t]*$").expect("valid regex"));
static REGMAP_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[ \t]*//[ \t]*@regmap[ \t]*").expect("valid regex"));
static KEY_VALUE_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]*:[ \t]*").expect("valid regex"));

/// Decodes `@regmap` attributes for declaration sites, reading source files
/// through an owned [`SourceCache`].
#[derive(Debug, Default)]
pub struct CommentDecoder
{
    cache: SourceCache,
}

impl CommentDecoder
{
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    pub fn cache(&self) -> &SourceCache
    {
        &self.cache
    }

    /// Attributes of the comment block directly above `site`.
    ///
    /// ## Errors
    ///
    /// Fails on the first malformed `@regmap` line: no `:` separator, a value
    /// containing `""`, or a value that is not valid JSON.
    pub fn decode(&self, site: &DeclarationSite) -> Result<AttributeSet>
    {
        let lines = self.cache.fetch(site.path());
        Self::decode_lines(&lines, site)
    }

    /// Attributes of enumerator `name` of the enumeration declared at
    /// `enum_site`.
    ///
    /// ## Errors
    ///
    /// Same as [`CommentDecoder::decode`] once the constant's line is found.
    pub fn decode_enum_constant(&self, enum_site: &DeclarationSite, name: &str) -> Result<AttributeSet>
    {
        let lines = self.cache.fetch(enum_site.path());
        match Self::find_enum_constant(&lines, enum_site.line(), name) {
            Some(line) => Self::decode_lines(&lines, &enum_site.at_line(line)),
            None => {
                debug!(constant = name, site = %enum_site, "enumerator declaration not found");
                Ok(AttributeSet::new())
            }
        }
    }

    fn decode_lines(lines: &SourceLines, site: &DeclarationSite) -> Result<AttributeSet>
    {
        let mut attributes = AttributeSet::new();
        for (number, text) in Self::collect_block(lines, site.line()) {
            let (key, value) = parse_attribute(&site.at_line(number), text)?;
            attributes.push(key, value);
        }
        if !attributes.is_empty() {
            trace!(site = %site, count = attributes.len(), "decoded attributes");
        }
        Ok(attributes)
    }

    /// `@regmap` lines of the comment block above `line`, top to bottom.
    fn collect_block(lines: &SourceLines, line: u64) -> Vec<(u64, &str)>
    {
        let mut block = Vec::new();
        if !lines.contains(line) {
            return block;
        }

        let mut within_block_comment = false;
        for number in (1..line).rev() {
            let Some(text) = lines.line(number) else {
                break;
            };

            if BLANK.is_match(text) {
                continue;
            }
            if within_block_comment {
                if BLOCK_END.is_match(text) {
                    within_block_comment = false;
                }
                continue;
            }
            if BLOCK_BEGIN.is_match(text) {
                within_block_comment = true;
                continue;
            }
            if REGMAP_PREFIX.is_match(text) {
                block.push((number, text));
                continue;
            }
            break;
        }

        block.reverse();
        block
    }

    /// First line after `enum_line` that declares `name`.
    fn find_enum_constant(lines: &SourceLines, enum_line: u64, name: &str) -> Option<u64>
    {
        let pattern = Regex::new(&format!(r"^[ \t]*{}([ \t=}},]|$)", regex::escape(name))).ok()?;
        (enum_line.saturating_add(1)..)
            .map_while(|number| lines.line(number).map(|text| (number, text)))
            .find(|(_, text)| pattern.is_match(text))
            .map(|(number, _)| number)
    }
}

/// Split one `@regmap` comment line into its key and JSON value.
///
/// The line is split at every `:` along with the blanks around it; the first
/// piece is the key and the rest are rejoined with a bare `:` as the value.
///
/// `site` names the comment line itself, for error reporting.
pub(crate) fn parse_attribute(site: &DeclarationSite, line: &str) -> Result<(String, Value)>
{
    let text = REGMAP_PREFIX.replace(line, "");
    let mut pieces = KEY_VALUE_SEPARATOR.split(&text);
    let key = pieces.next().unwrap_or_default();
    let rest: Vec<&str> = pieces.collect();
    if rest.is_empty() {
        return Err(RegmapError::IncompleteAttribute {
            site: site.clone(),
            text: text.to_string(),
        });
    }
    let raw = rest.join(":");

    if raw.contains("\"\"") {
        return Err(RegmapError::DoubledQuote {
            site: site.clone(),
            text: text.to_string(),
        });
    }

    let value = serde_json::from_str(&raw).map_err(|source| RegmapError::InvalidAttributeValue {
        site: site.clone(),
        key: key.to_string(),
        source,
    })?;
    Ok((key.to_string(), value))
}
