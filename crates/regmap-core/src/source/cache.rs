//! # Source Line Cache
//!
//! Loads a source file once and serves its lines by 1-based line number for
//! the rest of the run. Files are assumed not to change while the tool runs,
//! so there is no invalidation.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, warn};

/// Lines of one source file.
///
/// Index 0 holds the file path itself so that indices match 1-based line
/// numbers. An unreadable file is just that one element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLines
{
    lines: Vec<String>,
}

impl SourceLines
{
    /// Split `text` into lines, tolerating CRLF endings.
    pub fn from_text(path: &Path, text: &str) -> Self
    {
        let mut lines = Vec::with_capacity(text.len() / 32 + 1);
        lines.push(path.display().to_string());
        lines.extend(text.lines().map(str::to_string));
        Self { lines }
    }

    fn unreadable(path: &Path) -> Self
    {
        Self {
            lines: vec![path.display().to_string()],
        }
    }

    /// Line `number` (1-based). `None` past the end of the file or for 0.
    pub fn line(&self, number: u64) -> Option<&str>
    {
        if number == 0 {
            return None;
        }
        let index = usize::try_from(number).ok()?;
        self.lines.get(index).map(String::as_str)
    }

    /// Number of slots, including the path at index 0.
    pub fn len(&self) -> usize
    {
        self.lines.len()
    }

    /// True when the file could not be read or is empty.
    pub fn is_empty(&self) -> bool
    {
        self.lines.len() <= 1
    }

    /// Whether `number` names a line of this file.
    pub fn contains(&self, number: u64) -> bool
    {
        number > 0 && usize::try_from(number).is_ok_and(|index| index < self.lines.len())
    }
}

/// Memoizing loader of [`SourceLines`], keyed by path.
///
/// Entries are created on first request and shared afterwards. The lock only
/// guards insertion; a poisoned lock is recovered since entries are never
/// mutated after creation.
#[derive(Debug, Default)]
pub struct SourceCache
{
    files: RwLock<HashMap<PathBuf, Arc<SourceLines>>>,
}

impl SourceCache
{
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Lines of `path`, reading the file on the first request only.
    pub fn fetch(&self, path: &Path) -> Arc<SourceLines>
    {
        if let Some(existing) = self.files.read().unwrap_or_else(PoisonError::into_inner).get(path) {
            return existing.clone();
        }

        let mut files = self.files.write().unwrap_or_else(PoisonError::into_inner);
        files
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Self::read(path)))
            .clone()
    }

    /// Number of distinct files requested so far.
    pub fn len(&self) -> usize
    {
        self.files.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.len() == 0
    }

    fn read(path: &Path) -> SourceLines
    {
        match fs::read(path) {
            Ok(bytes) => {
                let lines = SourceLines::from_text(path, &String::from_utf8_lossy(&bytes));
                debug!(path = %path.display(), lines = lines.len() - 1, "cached source file");
                lines
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "source file unavailable, no attributes will be decoded from it");
                SourceLines::unreadable(path)
            }
        }
    }
}
