use std::sync::Arc;

use crate::package::PackageVariant;

/// One decision point: a package, its ranked candidates, and how far the
/// search has got through them.
#[derive(Debug, Clone)]
pub struct Frame {
    node: String,
    candidates: Vec<Arc<PackageVariant>>,
    next: usize,
    /// Graph undo mark taken before the first candidate was tried
    mark: usize,
}

impl Frame {
    pub fn new(node: impl Into<String>, candidates: Vec<Arc<PackageVariant>>, mark: usize) -> Self {
        Self {
            node: node.into(),
            candidates,
            next: 0,
            mark,
        }
    }

    pub fn node(&self) -> &str {
        &self.node
    }

    pub fn mark(&self) -> usize {
        self.mark
    }

    /// Take the next untried candidate
    pub fn next_candidate(&mut self) -> Option<Arc<PackageVariant>> {
        let candidate = self.candidates.get(self.next).cloned()?;
        self.next += 1;
        Some(candidate)
    }

    pub fn tried(&self) -> usize {
        self.next
    }
}

/// Explicit stack of decision points, innermost last.
///
/// Backtracking pops exhausted frames and resumes the one below; nothing
/// recurses, so depth is bounded only by the number of packages.
#[derive(Debug, Default)]
pub struct DecisionStack {
    frames: Vec<Frame>,
}

impl DecisionStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    pub fn top_mut(&mut self) -> Option<&mut Frame> {
        self.frames.last_mut()
    }

    /// Current decision level
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
