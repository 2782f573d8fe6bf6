//! Counters gathered while building a hierarchy.

use serde::Serialize;

/// Leaf sizes of this many triangles or more share the last bucket.
pub const LEAF_HISTOGRAM_BUCKETS: usize = 64;

/// Shape of a finished build.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildStats {
    pub node_count: usize,
    pub leaf_count: usize,
    /// Nodes per depth, up to the deepest level reached; index 0 is the
    /// root level.
    pub depth_counts: Vec<usize>,
    /// Leaves per triangle count, with the last bucket collecting
    /// everything at or above `LEAF_HISTOGRAM_BUCKETS - 1`.
    pub leaf_sizes: Vec<usize>,
    /// Ranges left as leaves because no SAH split beat the leaf cost.
    pub no_good_split: usize,
    /// Ranges left as leaves because the chosen plane put every triangle on one side.
    pub all_one_side: usize,
    /// Ranges left as leaves because the split axis had no usable extent.
    pub degenerate_axis: usize,
    /// Triangles assigned to leaves; equals the input size after a build.
    pub triangles_placed: usize,
    pub max_depth_reached: u32,
}

impl Default for BuildStats {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildStats {
    pub fn new() -> Self {
        Self {
            node_count: 0,
            leaf_count: 0,
            depth_counts: Vec::new(),
            leaf_sizes: vec![0; LEAF_HISTOGRAM_BUCKETS],
            no_good_split: 0,
            all_one_side: 0,
            degenerate_axis: 0,
            triangles_placed: 0,
            max_depth_reached: 0,
        }
    }

    pub(super) fn record_node(&mut self, depth: u32) {
        self.node_count += 1;
        let depth_index = depth as usize;
        if self.depth_counts.len() <= depth_index {
            self.depth_counts.resize(depth_index + 1, 0);
        }
        self.depth_counts[depth_index] += 1;
        self.max_depth_reached = self.max_depth_reached.max(depth);
    }

    pub(super) fn record_leaf(&mut self, count: usize) {
        self.leaf_count += 1;
        self.leaf_sizes[count.min(LEAF_HISTOGRAM_BUCKETS - 1)] += 1;
        self.triangles_placed += count;
    }

    /// Mean triangles per leaf.
    pub fn average_leaf_size(&self) -> f32 {
        if self.leaf_count == 0 {
            0.0
        } else {
            self.triangles_placed as f32 / self.leaf_count as f32
        }
    }

    /// Write the node and leaf histograms to the log.
    pub fn log_summary(&self) {
        log::info!(
            "BVH: {} nodes, {} leaves, max depth {}, {:.2} triangles per leaf",
            self.node_count,
            self.leaf_count,
            self.max_depth_reached,
            self.average_leaf_size()
        );

        for (depth, count) in self.depth_counts.iter().enumerate() {
            if *count > 0 {
                log::info!("  level {:2}: {} nodes", depth, count);
            }
        }

        let last = LEAF_HISTOGRAM_BUCKETS - 1;
        for (size, count) in self.leaf_sizes.iter().enumerate() {
            if *count == 0 {
                continue;
            }
            if size == last {
                log::info!("  {}+ triangles: {} leaves", size, count);
            } else {
                log::info!("  {:2} triangles: {} leaves", size, count);
            }
        }

        if self.no_good_split + self.all_one_side + self.degenerate_axis > 0 {
            log::info!(
                "  leaf fallbacks: {} no good split, {} all one side, {} degenerate axis",
                self.no_good_split,
                self.all_one_side,
                self.degenerate_axis
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_histogram_saturates() {
        let mut stats = BuildStats::new();
        stats.record_leaf(3);
        stats.record_leaf(63);
        stats.record_leaf(500);

        assert_eq!(stats.leaf_sizes[3], 1);
        assert_eq!(stats.leaf_sizes[LEAF_HISTOGRAM_BUCKETS - 1], 2);
        assert_eq!(stats.triangles_placed, 566);
        assert!((stats.average_leaf_size() - 566.0 / 3.0).abs() < 1e-3);
    }

    #[test]
    fn test_record_node_tracks_depth() {
        let mut stats = BuildStats::new();
        stats.record_node(0);
        stats.record_node(2);
        stats.record_node(2);

        assert_eq!(stats.depth_counts, vec![1, 0, 2]);
        assert_eq!(stats.max_depth_reached, 2);
        assert_eq!(stats.node_count, 3);
    }

    #[test]
    fn test_log_summary_after_build() {
        let _ = env_logger::builder().is_test(true).try_init();
        let (_, _, stats) = crate::bvh::tests::build_soup(300, 1, &tsoup_core::BuildConfig::default());

        stats.log_summary();
        assert_eq!(stats.leaf_sizes.iter().sum::<usize>(), stats.leaf_count);
        assert_eq!(stats.depth_counts.iter().sum::<usize>(), stats.node_count);
        assert_eq!(stats.node_count, 2 * stats.leaf_count - 1);
    }
}
