//! Recursive top-down construction.

use std::time::{Duration, Instant};

use tsoup_core::{BuildConfig, TriangleSet};
use tsoup_math::Aabb;

use super::sah::{self, Split};
use super::{BuildError, BuildStats, BvhNode, BvhResult, NodeKind};

const PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

/// Builds nodes into an arena in creation order (children before parents).
/// Ids are made dense and in-order afterwards by the indexer.
pub(super) struct Builder<'a> {
    triangles: &'a mut TriangleSet,
    config: &'a BuildConfig,
    nodes: Vec<BvhNode>,
    stats: BuildStats,
    last_progress: Instant,
}

impl<'a> Builder<'a> {
    pub fn new(triangles: &'a mut TriangleSet, config: &'a BuildConfig) -> Self {
        Self {
            triangles,
            config,
            nodes: Vec::new(),
            stats: BuildStats::new(),
            last_progress: Instant::now(),
        }
    }

    /// Build over the whole set. Returns the arena, the root's arena slot
    /// and the gathered statistics.
    pub fn run(mut self) -> BvhResult<(Vec<BvhNode>, u32, BuildStats)> {
        let start = Instant::now();
        let count = self.triangles.len();
        let root = self.build(0, count, 0)?;

        log::info!(
            "Built BVH over {} triangles in {:.3} seconds",
            count,
            start.elapsed().as_secs_f32()
        );
        Ok((self.nodes, root, self.stats))
    }

    fn build(&mut self, start: usize, count: usize, depth: u32) -> BvhResult<u32> {
        self.stats.record_node(depth);

        let bounds = self.vertex_bounds(start, count);

        if depth >= self.config.max_depth || count <= self.config.leaf_max as usize {
            return self.leaf(start, count, bounds);
        }

        let mut centroids = Aabb::EMPTY;
        for triangle in &self.triangles.triangles()[start..start + count] {
            centroids.add_exact_point(triangle.centroid);
        }
        let axis = centroids.longest_axis();

        let extent = bounds.upper(axis) - bounds.lower(axis);
        if !extent.is_finite() {
            log::warn!("non-finite {:?} extent over [{}, {})", axis, start, start + count);
        }
        if !extent.is_finite() || extent <= 0.0 {
            log::debug!("degenerate {:?} extent over [{}, {})", axis, start, start + count);
            self.stats.degenerate_axis += 1;
            return self.leaf(start, count, bounds);
        }

        let range = &self.triangles.triangles()[start..start + count];
        let Some(split) = sah::find_best_split(range, &bounds, axis, self.config) else {
            log::debug!("no good split over [{}, {})", start, start + count);
            self.stats.no_good_split += 1;
            return self.leaf(start, count, bounds);
        };

        let middle = self.partition(start, count, &split)?;
        if middle == start || middle == start + count {
            log::debug!("all one side over [{}, {})", start, start + count);
            self.stats.all_one_side += 1;
            return self.leaf(start, count, bounds);
        }

        let negative = self.build(start, middle - start, depth + 1)?;
        let positive = self.build(middle, start + count - middle, depth + 1)?;

        self.push(BvhNode {
            bounds,
            start: start as u32,
            count: count as u32,
            kind: NodeKind::Internal {
                negative,
                positive,
                axis: split.axis,
                cost: split.cost,
            },
        })
    }

    /// Padded box around every vertex of the range.
    fn vertex_bounds(&self, start: usize, count: usize) -> Aabb {
        let mut bounds = Aabb::EMPTY;
        for i in start..start + count {
            for position in self.triangles.get(i).positions {
                bounds.add_point(position);
            }
        }
        bounds
    }

    fn leaf(&mut self, start: usize, count: usize, bounds: Aabb) -> BvhResult<u32> {
        self.stats.record_leaf(count);
        self.report_progress();

        self.push(BvhNode {
            bounds,
            start: start as u32,
            count: count as u32,
            kind: NodeKind::Leaf,
        })
    }

    fn push(&mut self, node: BvhNode) -> BvhResult<u32> {
        let id = u32::try_from(self.nodes.len())
            .ok()
            .filter(|&id| id != super::SENTINEL)
            .ok_or(BuildError::NodeIndexOverflow {
                count: self.nodes.len() + 1,
            })?;
        self.nodes.push(node);
        Ok(id)
    }

    /// Reorder `[start, start + count)` so triangles whose centroid lies
    /// below the split plane come first. Returns the first index of the
    /// positive side. Centroids on the plane go to the positive side.
    fn partition(&mut self, start: usize, count: usize, split: &Split) -> BvhResult<usize> {
        let axis = split.axis.index();
        let position = split.position;
        let is_negative = |set: &TriangleSet, i: usize| sah::is_below(set.indexed(i).centroid[axis], position);

        let mut left = start;
        let mut right = start + count;
        loop {
            while left < right && is_negative(self.triangles, left) {
                left += 1;
            }
            while left < right && !is_negative(self.triangles, right - 1) {
                right -= 1;
            }
            if left >= right {
                break;
            }
            self.triangles.swap(left, right - 1);
            left += 1;
            right -= 1;
        }

        if left - start != split.left_count {
            return Err(BuildError::PartitionMismatch {
                start,
                end: start + count,
                axis: split.axis,
                position,
                expected: split.left_count,
                actual: left - start,
            });
        }

        Ok(left)
    }

    fn report_progress(&mut self) {
        if self.last_progress.elapsed() >= PROGRESS_INTERVAL {
            log::info!("total treed = {}", self.stats.triangles_placed);
            self.last_progress = Instant::now();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bvh::tests::{add_unit_triangle, random_soup};
    use tsoup_math::{Axis, Vec3};

    #[test]
    fn test_partition_puts_plane_ties_on_positive_side() {
        let mut set = random_soup(64, 21);
        let config = BuildConfig::default();
        let position = set.indexed(10).centroid.x;
        let below = (0..64).filter(|&i| set.indexed(i).centroid.x < position).count();
        let split = Split {
            axis: Axis::X,
            position,
            cost: 0.0,
            left_count: below,
        };

        let mut builder = Builder::new(&mut set, &config);
        let middle = builder.partition(0, 64, &split).unwrap();
        drop(builder);

        for i in 0..64 {
            let x = set.indexed(i).centroid.x;
            if i < middle {
                assert!(x < position);
            } else {
                assert!(x >= position);
            }
        }
        // The triangle defining the plane is on the positive side.
        assert!((middle..64).any(|i| set.indexed(i).centroid.x == position));
    }

    #[test]
    fn test_partition_keeps_triangles() {
        let mut set = random_soup(100, 4);
        let mut before: Vec<Vec3> = set.triangles().iter().map(|t| t.centroid).collect();
        let config = BuildConfig::default();
        let below = (20..80).filter(|&i| set.indexed(i).centroid.y < 0.0).count();
        let split = Split {
            axis: Axis::Y,
            position: 0.0,
            cost: 0.0,
            left_count: below,
        };

        Builder::new(&mut set, &config).partition(20, 60, &split).unwrap();

        let mut after: Vec<Vec3> = set.triangles().iter().map(|t| t.centroid).collect();
        // Outside the range nothing moved.
        assert_eq!(before[..20], after[..20]);
        assert_eq!(before[80..], after[80..]);

        let key = |v: &Vec3| (v.x.to_bits(), v.y.to_bits(), v.z.to_bits());
        before.sort_by_key(key);
        after.sort_by_key(key);
        assert_eq!(before, after);
    }

    #[test]
    fn test_partition_rejects_wrong_claimed_size() {
        let mut set = random_soup(50, 8);
        let config = BuildConfig::default();
        let below = (0..50).filter(|&i| set.indexed(i).centroid.z < 0.0).count();
        let split = Split {
            axis: Axis::Z,
            position: 0.0,
            cost: 0.0,
            left_count: below + 1,
        };

        let result = Builder::new(&mut set, &config).partition(0, 50, &split);
        match result {
            Err(BuildError::PartitionMismatch { expected, actual, .. }) => {
                assert_eq!(expected, below + 1);
                assert_eq!(actual, below);
            }
            other => panic!("expected a partition mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_evenly_spaced_rows_build_without_mismatch() {
        let config = BuildConfig::default();
        for n in [16usize, 31, 45, 97] {
            for scale in [0.3f32, 1.0, 7.1, 123.4] {
                let mut set = TriangleSet::new();
                for i in 0..n {
                    add_unit_triangle(&mut set, Vec3::new(i as f32 * scale, 0.0, 0.0));
                }
                set.finish();

                let result = Builder::new(&mut set, &config).run();
                assert!(result.is_ok(), "n={n} scale={scale}: {:?}", result.err());
            }
        }
    }
}
