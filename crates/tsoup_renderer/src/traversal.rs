//! Stack-based traversal of a [`Bvh`].

use tsoup_core::TriangleSet;
use tsoup_math::{Aabb, Interval, Ray};

use crate::bvh::{Bvh, NodeKind};
use crate::triangle::{hit_triangle, SurfaceHit};

/// Work counters for a single query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraversalStats {
    /// Nodes taken off the stack (or walked to, for ropes).
    pub nodes_visited: u64,
    pub box_tests: u64,
    pub triangle_tests: u64,
}

impl TraversalStats {
    pub fn add(&mut self, other: &TraversalStats) {
        self.nodes_visited += other.nodes_visited;
        self.box_tests += other.box_tests;
        self.triangle_tests += other.triangle_tests;
    }
}

/// Entry distance of `ray` into `bounds`, or `None` if the box is missed,
/// lies outside `valid`, or starts at or beyond `closest`.
#[inline]
pub(crate) fn enter_box(bounds: &Aabb, ray: &Ray, valid: Interval, closest: f32, stats: &mut TraversalStats) -> Option<f32> {
    stats.box_tests += 1;
    let range = bounds.ray_range(ray).intersect(&valid);
    (range.is_valid() && range.min < closest).then_some(range.min)
}

/// Test every triangle of a leaf, keeping the closest accepted hit.
/// Returns true as soon as a hit is accepted when `stop_at_first` is set.
pub(crate) fn test_leaf(
    triangles: &TriangleSet,
    range: std::ops::Range<usize>,
    ray: &Ray,
    valid: Interval,
    best: &mut Option<SurfaceHit>,
    stop_at_first: bool,
    stats: &mut TraversalStats,
) -> bool {
    for index in range {
        stats.triangle_tests += 1;
        let closest = best.map_or(f32::INFINITY, |hit| hit.t);
        if let Some(hit) = hit_triangle(triangles, index, ray, valid) {
            if hit.t <= closest {
                *best = Some(hit);
                if stop_at_first {
                    return true;
                }
            }
        }
    }
    false
}

impl Bvh {
    /// Closest triangle hit by `ray` with `t` inside `valid`.
    pub fn nearest_hit(&self, triangles: &TriangleSet, ray: &Ray, valid: Interval) -> Option<SurfaceHit> {
        self.nearest_hit_with_stats(triangles, ray, valid, &mut TraversalStats::default())
    }

    /// [`nearest_hit`](Self::nearest_hit), accumulating work into `stats`.
    pub fn nearest_hit_with_stats(
        &self,
        triangles: &TriangleSet,
        ray: &Ray,
        valid: Interval,
        stats: &mut TraversalStats,
    ) -> Option<SurfaceHit> {
        self.traverse(triangles, ray, valid, false, stats)
    }

    /// True if anything blocks `ray` inside `valid`. Used for shadow rays.
    pub fn any_hit(&self, triangles: &TriangleSet, ray: &Ray, valid: Interval) -> bool {
        self.traverse(triangles, ray, valid, true, &mut TraversalStats::default())
            .is_some()
    }

    fn traverse(
        &self,
        triangles: &TriangleSet,
        ray: &Ray,
        valid: Interval,
        stop_at_first: bool,
        stats: &mut TraversalStats,
    ) -> Option<SurfaceHit> {
        let mut best: Option<SurfaceHit> = None;
        let root = self.node(self.root());
        let Some(entry) = enter_box(&root.bounds, ray, valid, f32::INFINITY, stats) else {
            return None;
        };

        // Far children are pushed at most once per level, plus the near child.
        let mut stack: Vec<(u32, f32)> = Vec::with_capacity(self.depth() as usize + 2);
        stack.push((self.root(), entry));

        while let Some((id, entry)) = stack.pop() {
            let closest = best.map_or(f32::INFINITY, |hit| hit.t);
            if entry >= closest {
                continue;
            }

            stats.nodes_visited += 1;
            let node = self.node(id);

            match node.kind {
                NodeKind::Leaf => {
                    if test_leaf(triangles, node.triangle_range(), ray, valid, &mut best, stop_at_first, stats) {
                        return best;
                    }
                }
                NodeKind::Internal { .. } => {
                    let Some((near, far)) = node.near_far(ray.direction) else {
                        continue;
                    };
                    for child in [far, near] {
                        if let Some(entry) = enter_box(&self.node(child).bounds, ray, valid, closest, stats) {
                            stack.push((child, entry));
                        }
                    }
                }
            }
        }

        best
    }
}
