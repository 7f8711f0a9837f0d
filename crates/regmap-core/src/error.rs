//! # Error Types
//!
//! Every fatal condition of an extraction run is an `Err(RegmapError)`
//! propagated to the outermost caller. Nothing below `main` terminates the
//! process. The first error aborts the whole run and no partial document is
//! produced.

use thiserror::Error;

use crate::types::DeclarationSite;

/// Main error type for register-map extraction.
///
/// ## Error Categories
///
/// 1. **Attribute syntax**: IncompleteAttribute, DoubledQuote, InvalidAttributeValue
/// 2. **Layout**: UnresolvableArrayCount
/// 3. **Input image**: InvalidImage, Dwarf
/// 4. **I/O and output**: Io, Json
#[derive(Error, Debug)]
pub enum RegmapError
{
    /// A `@regmap` line without a `key: value` separator
    #[error("{site}: regmap attribute `{text}` is incomplete")]
    IncompleteAttribute
    {
        /// Location of the offending comment line
        site: DeclarationSite,
        /// The attribute text after the `@regmap` prefix
        text: String,
    },

    /// A `@regmap` value containing `""`, usually an unescaped inner quote
    #[error("{site}: a double \" has been written in `{text}`")]
    DoubledQuote
    {
        /// Location of the offending comment line
        site: DeclarationSite,
        /// The attribute text after the `@regmap` prefix
        text: String,
    },

    /// A `@regmap` value that is not a JSON literal
    #[error("{site}: could not parse value of regmap attribute `{key}`: {source}")]
    InvalidAttributeValue
    {
        /// Location of the offending comment line
        site: DeclarationSite,
        /// Attribute key
        key: String,
        /// Underlying JSON parse error
        source: serde_json::Error,
    },

    /// An array type whose subrange yields no usable element count
    #[error("could not determine array count of `{name}`")]
    UnresolvableArrayCount
    {
        /// Name of the variable or member with the array type
        name: String,
    },

    /// The firmware image is missing, unreadable or not an object file
    #[error("invalid firmware image: {0}")]
    InvalidImage(String),

    /// The DWARF sections could not be decoded
    #[error("{context}: {source}")]
    Dwarf
    {
        /// What was being decoded
        context: String,
        /// Underlying gimli error
        source: gimli::Error,
    },

    /// I/O error while writing the document or reading the image
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization of the output document failed
    #[error("JSON output error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Map a gimli DWARF error to a `RegmapError` with context.
pub(crate) fn map_dwarf_error(context: &str, err: gimli::Error) -> RegmapError
{
    RegmapError::Dwarf {
        context: context.to_string(),
        source: err,
    }
}

/// Convenience type alias for `Result<T, RegmapError>`
///
/// ```rust
/// use regmap_core::error::Result;
/// fn foo() -> Result<()>
/// {
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, RegmapError>;
