/// Identifies a registered source within a `Session`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceId(pub u32);

/// An opaque source position attached to every AST node.
///
/// Anchors are produced by the front end and only carried through
/// specialization; the engine never derives new positions. Nodes built by
/// rewriting reuse the anchor of the node they replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Anchor {
    pub source: SourceId,
    /// 1-based line, 0 when unknown.
    pub line: u32,
    /// 1-based column, 0 when unknown.
    pub column: u32,
}

impl Anchor {
    pub fn new(source: SourceId, line: u32, column: u32) -> Self {
        Self { source, line, column }
    }

    /// An anchor that points nowhere. Used for synthetic nodes and tests.
    pub fn unknown() -> Self {
        Self { source: SourceId(u32::MAX), line: 0, column: 0 }
    }

    pub fn is_known(&self) -> bool {
        self.source != SourceId(u32::MAX)
    }
}

impl std::fmt::Display for Anchor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_known() {
            write!(f, "{}:{}", self.line, self.column)
        } else {
            write!(f, "<unknown>")
        }
    }
}
