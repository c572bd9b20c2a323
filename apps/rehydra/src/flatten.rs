//! # Header Flattening
//!
//! Concatenates headers into one stream, replacing every line that starts
//! with `#include "name"` by the contents of `name`. Angle-bracket includes
//! and all other lines pass through untouched.
//!
//! Each header is emitted at most once per `HeaderFlattener`, so include
//! cycles terminate and shared headers are not duplicated. Include names are
//! resolved against the flattener's base directory, not against the
//! including file, and compared by canonical path, so `a.h` and `./a.h` are
//! the same header.
//!
//! Lines are handled as bytes: headers need not be valid UTF-8.

use crate::error::AppError;
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};

const INCLUDE_PREFIX: &[u8] = b"#include \"";

/// One flattening run. The visited set lives and dies with this value.
#[derive(Debug)]
pub struct HeaderFlattener {
    base: PathBuf,
    visited: BTreeSet<PathBuf>,
}

impl HeaderFlattener {
    /// Create a flattener resolving include names against `base`.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            visited: BTreeSet::new(),
        }
    }

    /// Flatten each header in order into `out`.
    pub fn flatten_all<W: Write>(&mut self, headers: &[String], out: &mut W) -> Result<(), AppError> {
        for header in headers {
            self.flatten(header, out)?;
        }
        Ok(())
    }

    /// Flatten one header into `out`. Does nothing if it was already emitted.
    pub fn flatten<W: Write>(&mut self, header: &str, out: &mut W) -> Result<(), AppError> {
        let path = self.base.join(header);
        let key = path.canonicalize().map_err(|e| AppError::io(&path, e))?;
        if !self.visited.insert(key.clone()) {
            tracing::trace!(header = %header, "already emitted");
            return Ok(());
        }

        tracing::debug!(path = %key.display(), "flattening header");
        let content = std::fs::read(&key).map_err(|e| AppError::io(&path, e))?;

        for line in content.split_inclusive(|&b| b == b'\n') {
            match include_target(line) {
                Some(nested) => self.flatten(&nested, out)?,
                None => out
                    .write_all(line)
                    .map_err(|e| AppError::io(Path::new("<output>"), e))?,
            }
        }
        Ok(())
    }

    /// Headers emitted so far.
    pub fn visited(&self) -> impl Iterator<Item = &Path> {
        self.visited.iter().map(PathBuf::as_path)
    }
}

/// The quoted name of an `#include "..."` line.
fn include_target(line: &[u8]) -> Option<Cow<'_, str>> {
    let rest = line.strip_prefix(INCLUDE_PREFIX)?;
    let name = match rest.iter().position(|&b| b == b'"') {
        Some(end) => &rest[..end],
        None => rest.trim_ascii_end(),
    };
    Some(String::from_utf8_lossy(name))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn include_target_parsing() {
        assert_eq!(include_target(b"#include \"Func.h\"\n").as_deref(), Some("Func.h"));
        assert_eq!(
            include_target(b"#include \"a/b.h\" // \xff\n").as_deref(),
            Some("a/b.h")
        );
        assert_eq!(include_target(b"#include <vector>\n"), None);
        assert_eq!(include_target(b"  #include \"x.h\"\n"), None);
        assert_eq!(include_target(b"#include \"open.h\r\n").as_deref(), Some("open.h"));
    }

    #[test]
    fn missing_header_is_an_error() {
        let mut flattener = HeaderFlattener::new("/nonexistent-rehydra-dir");
        let mut out = Vec::new();
        assert!(matches!(
            flattener.flatten("nope.h", &mut out),
            Err(AppError::Io { .. })
        ));
        assert!(out.is_empty());
    }
}
