//! Value types shared by the decoder, the builders and the output document.

pub mod attributes;
pub mod regmap;
pub mod site;

pub use attributes::AttributeSet;
pub use regmap::{EntryKind, EnumDescriptor, EnumeratorEntry, RegisterMapDocument, RegisterMapEntry};
pub use site::DeclarationSite;
