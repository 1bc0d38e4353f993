use std::sync::Arc;

use super::graph::RequirementGraph;
use crate::package::PackageVariant;

/// Ranks sibling variants of one package version.
///
/// A variant scores one point per sub-requirement the current graph admits.
/// Higher scores come first; equal scores keep declaration order (lowest
/// variant index first). Ranking reads the graph and never mutates it.
#[derive(Debug, Clone, Copy, Default)]
pub struct VariantSelector;

impl VariantSelector {
    pub fn new() -> Self {
        Self
    }

    /// Number of the variant's requirements compatible with the graph
    pub fn score(&self, variant: &PackageVariant, graph: &RequirementGraph) -> usize {
        variant.requires.iter().filter(|r| graph.admits(r)).count()
    }

    /// Candidates sorted by preference, best first
    pub fn rank(
        &self,
        candidates: &[Arc<PackageVariant>],
        graph: &RequirementGraph,
    ) -> Vec<Arc<PackageVariant>> {
        let mut scored: Vec<(usize, &Arc<PackageVariant>)> = candidates
            .iter()
            .map(|c| (self.score(c, graph), c))
            .collect();
        scored.sort_by(|(sa, a), (sb, b)| sb.cmp(sa).then_with(|| a.index.cmp(&b.index)));
        scored.into_iter().map(|(_, c)| Arc::clone(c)).collect()
    }

    /// The preferred candidate
    pub fn select(
        &self,
        candidates: &[Arc<PackageVariant>],
        graph: &RequirementGraph,
    ) -> Option<Arc<PackageVariant>> {
        self.rank(candidates, graph).into_iter().next()
    }

    /// Rank each run of same-version candidates, keeping the runs in order
    pub fn rank_by_version(
        &self,
        candidates: &[Arc<PackageVariant>],
        graph: &RequirementGraph,
    ) -> Vec<Arc<PackageVariant>> {
        let mut ranked = Vec::with_capacity(candidates.len());
        for group in candidates.chunk_by(|a, b| a.version == b.version) {
            ranked.extend(self.rank(group, graph));
        }
        ranked
    }
}
