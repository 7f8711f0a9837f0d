//! JSON emission of the register-map document.

use std::io::Write;

use serde::Serialize;
use serde_json::ser::{CompactFormatter, PrettyFormatter, Serializer};

use crate::error::Result;
use crate::types::RegisterMapDocument;

/// Write `document` to `writer`, indented by `indent` spaces per level
/// (compact when 0), followed by a newline.
///
/// ## Errors
///
/// Returns [`RegmapError::Io`](crate::error::RegmapError::Io) or
/// [`RegmapError::Json`](crate::error::RegmapError::Json) if writing fails.
pub fn write_document<W: Write>(document: &RegisterMapDocument, mut writer: W, indent: usize) -> Result<()>
{
    if indent == 0 {
        let mut serializer = Serializer::with_formatter(&mut writer, CompactFormatter);
        document.serialize(&mut serializer)?;
    } else {
        let spaces = vec![b' '; indent];
        let mut serializer = Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(&spaces));
        document.serialize(&mut serializer)?;
    }
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// [`write_document`] into a `String`.
///
/// ## Errors
///
/// Only fails if serialization fails.
pub fn to_json_string(document: &RegisterMapDocument, indent: usize) -> Result<String>
{
    let mut buffer = Vec::new();
    write_document(document, &mut buffer, indent)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::types::{EntryKind, RegisterMapEntry};

    #[test]
    fn empty_document_has_both_collections()
    {
        let text = to_json_string(&RegisterMapDocument::default(), 0).unwrap();
        assert_eq!(text, "{\"regmap\":[],\"enums\":[]}\n");
    }

    #[test]
    fn indentation_is_configurable()
    {
        let mut document = RegisterMapDocument::default();
        document
            .regmap
            .push(RegisterMapEntry::new("x", EntryKind::Base("int".into())));

        let text = to_json_string(&document, 4).unwrap();
        assert!(text.starts_with("{\n    \"regmap\": [\n        {\n"));
        assert!(text.ends_with("}\n"));
    }
}
