//! Extraction options.

use std::collections::BTreeSet;
use std::path::Path;

/// Default JSON indentation, in spaces.
pub const DEFAULT_INDENT: usize = 2;

/// Compile units whose variables are visited, by base file name.
///
/// An empty filter selects every unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileUnitFilter
{
    names: BTreeSet<String>,
}

impl CompileUnitFilter
{
    /// Select every compile unit.
    #[must_use]
    pub fn all() -> Self
    {
        Self::default()
    }

    /// Select units by name. Directory components are ignored, so `src/main.c`
    /// and `main.c` are the same filter entry.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            names: names.into_iter().map(|name| base_name(name.as_ref()).to_string()).collect(),
        }
    }

    /// The unit a firmware image is assumed to be built from: its file name
    /// with the extension replaced by `.c` (`app.elf` selects `app.c`).
    pub fn for_firmware(path: &Path) -> Self
    {
        let Some(file_name) = path.file_name() else {
            return Self::all();
        };
        let unit = Path::new(file_name).with_extension("c");
        Self::from_names([unit.to_string_lossy()])
    }

    pub fn is_all(&self) -> bool
    {
        self.names.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str>
    {
        self.names.iter().map(String::as_str)
    }

    /// Whether a unit named `unit_name` (as in its `DW_AT_name`) is selected.
    pub fn matches(&self, unit_name: &str) -> bool
    {
        self.is_all() || self.names.contains(base_name(unit_name))
    }
}

/// Last path component, splitting on both `/` and `\` since firmware is often
/// built on Windows hosts.
fn base_name(path: &str) -> &str
{
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Options of one extraction run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions
{
    pub compile_units: CompileUnitFilter,
    /// Spaces per indentation level; 0 writes compact JSON.
    pub indent: usize,
}

impl Default for ExtractOptions
{
    fn default() -> Self
    {
        Self {
            compile_units: CompileUnitFilter::all(),
            indent: DEFAULT_INDENT,
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn empty_filter_matches_everything()
    {
        let filter = CompileUnitFilter::all();
        assert!(filter.is_all());
        assert!(filter.matches("/build/src/anything.c"));
    }

    #[test]
    fn matches_on_base_name()
    {
        let filter = CompileUnitFilter::from_names(["src/main.c", "regs.c"]);
        assert!(filter.matches("/home/fw/src/main.c"));
        assert!(filter.matches("C:\\fw\\src\\regs.c"));
        assert!(filter.matches("regs.c"));
        assert!(!filter.matches("/home/fw/src/other.c"));
        assert_eq!(filter.names().collect::<Vec<_>>(), ["main.c", "regs.c"]);
    }

    #[test]
    fn firmware_name_selects_like_named_unit()
    {
        let filter = CompileUnitFilter::for_firmware(Path::new("/out/c_to_json_2.elf"));
        assert_eq!(filter.names().collect::<Vec<_>>(), ["c_to_json_2.c"]);

        let filter = CompileUnitFilter::for_firmware(Path::new("firmware"));
        assert_eq!(filter.names().collect::<Vec<_>>(), ["firmware.c"]);
    }
}
