//! Declaration sites.

use std::fmt;
use std::path::{Path, PathBuf};

/// Where an entity is declared in source: absolute file path and 1-based line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeclarationSite
{
    path: PathBuf,
    line: u64,
}

impl DeclarationSite
{
    pub fn new(path: impl Into<PathBuf>, line: u64) -> Self
    {
        Self {
            path: path.into(),
            line,
        }
    }

    pub fn path(&self) -> &Path
    {
        &self.path
    }

    pub fn line(&self) -> u64
    {
        self.line
    }

    /// Same file, different line.
    #[must_use]
    pub fn at_line(&self, line: u64) -> Self
    {
        Self {
            path: self.path.clone(),
            line,
        }
    }
}

impl fmt::Display for DeclarationSite
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}:{}", self.path.display(), self.line)
    }
}
