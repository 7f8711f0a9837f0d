//! # regmap-core
//!
//! Register-map extraction from firmware debug information.
//!
//! Given a firmware image with DWARF debug information, every top-level
//! variable of the selected compile units is described as JSON: its type, byte
//! and bit layout, array shape and nested members, together with free-form
//! attributes written next to its declaration as `// @regmap key: value`
//! comments.
//!
//! ## Pipeline
//!
//! 1. [`debuginfo`] loads the image (`object`) and flattens its DWARF (`gimli`)
//!    into a read-only arena.
//! 2. [`extract::Extractor`] picks the variables and routes each one to the
//!    enum or register-map renderer in [`walker`].
//! 3. The renderers walk type chains and ask [`source::CommentDecoder`] for the
//!    attributes of every entity and of its type.
//! 4. [`output`] writes the resulting [`types::RegisterMapDocument`].
//!
//! ```rust,no_run
//! use regmap_core::prelude::*;
//!
//! fn main() -> Result<()>
//! {
//!     let options = ExtractOptions {
//!         compile_units: CompileUnitFilter::from_names(["main.c"]),
//!         ..ExtractOptions::default()
//!     };
//!     let document = extract_firmware("firmware.elf".as_ref(), &options)?;
//!     regmap_core::output::write_document(&document, std::io::stdout().lock(), options.indent)
//! }
//! ```

pub mod config;
pub mod debuginfo;
pub mod error;
pub mod extract;
pub mod output;
pub mod prelude;
pub mod source;
pub mod types;
pub mod walker;

pub use error::{RegmapError, Result};
pub use extract::{extract_firmware, Extractor};
pub use types::RegisterMapDocument;
