//! Common imports for users of the library.

pub use crate::config::{CompileUnitFilter, ExtractOptions};
pub use crate::debuginfo::{BinaryImage, DebugInfo, Die, DieId};
pub use crate::error::{RegmapError, Result};
pub use crate::extract::{extract_firmware, Extractor};
pub use crate::types::{AttributeSet, DeclarationSite, EnumDescriptor, RegisterMapDocument, RegisterMapEntry};
