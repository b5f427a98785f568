//! Source location tracking for diagnostics.
//!
//! Configuration bodies come from an external parser, so spans carry the
//! file name directly instead of an index into a source map.
//!
//! # Design
//!
//! - `Pos` - a single position (line, column, byte offset)
//! - `Span` - a half-open range between two positions in one file
//!
//! # Examples
//!
//! ```
//! # use tessera_config::foundation::{Pos, Span};
//! let span = Span::new("main.tf", Pos::new(3, 5, 40), Pos::new(3, 12, 47));
//! assert_eq!(span.to_string(), "main.tf:3,5-12");
//! assert_eq!(span.len(), 7);
//! ```

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A position in a source file.
///
/// Lines and columns are 1-based, the byte offset is 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pos {
    /// Line number (1-based)
    pub line: u32,
    /// Column number (1-based, counted in characters)
    pub column: u32,
    /// Byte offset from the start of the file
    pub byte: u32,
}

impl Pos {
    /// Create a new position.
    pub fn new(line: u32, column: u32, byte: u32) -> Self {
        Self { line, column, byte }
    }

    /// Position of the first character in a file.
    pub fn start() -> Self {
        Self::new(1, 1, 0)
    }
}

impl Default for Pos {
    fn default() -> Self {
        Self::start()
    }
}

/// Source range reference.
///
/// The file name is reference-counted so spans stay cheap to clone when the
/// same body hands out many of them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Name of the file this range belongs to (may be empty for synthetic ranges)
    pub file: Arc<str>,
    /// Start position (inclusive)
    pub start: Pos,
    /// End position (exclusive)
    pub end: Pos,
}

impl Span {
    /// Create a new span.
    pub fn new(file: impl Into<Arc<str>>, start: Pos, end: Pos) -> Self {
        Self {
            file: file.into(),
            start,
            end,
        }
    }

    /// Create a zero-length span at the start of a file.
    pub fn zero(file: impl Into<Arc<str>>) -> Self {
        Self::new(file, Pos::start(), Pos::start())
    }

    /// Span used for values that never had a source location.
    pub fn synthetic() -> Self {
        Self::zero("")
    }

    /// Check if this span is zero-length.
    pub fn is_empty(&self) -> bool {
        self.start.byte == self.end.byte
    }

    /// Get the length of this span in bytes.
    ///
    /// # Panics
    /// Panics if end < start (malformed span).
    pub fn len(&self) -> u32 {
        assert!(
            self.end.byte >= self.start.byte,
            "malformed span: end ({}) < start ({})",
            self.end.byte,
            self.start.byte
        );
        self.end.byte - self.start.byte
    }

    /// Merge two spans (returns span covering both).
    ///
    /// Panics if spans are from different files.
    pub fn merge(&self, other: &Span) -> Span {
        assert_eq!(
            self.file, other.file,
            "cannot merge spans from different files"
        );
        Span {
            file: self.file.clone(),
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl Default for Span {
    fn default() -> Self {
        Self::synthetic()
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start.line == self.end.line {
            write!(
                f,
                "{}:{},{}-{}",
                self.file, self.start.line, self.start.column, self.end.column
            )
        } else {
            write!(
                f,
                "{}:{},{}-{},{}",
                self.file, self.start.line, self.start.column, self.end.line, self.end.column
            )
        }
    }
}
