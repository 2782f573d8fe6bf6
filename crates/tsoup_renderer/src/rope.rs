//! Stackless traversal links ("ropes").
//!
//! For each of the eight ray-direction octants every node gets a
//! `(hit, miss)` pair of node ids. A walker starts at the root and, at each
//! node, follows `hit` when the ray enters the node's box and `miss`
//! otherwise, until it reaches [`SENTINEL`]. Leaves have `hit == miss`: after
//! their triangles are tested the walk always continues along the miss
//! chain. The leaves reached are the same, in the same order, as a
//! near-child-first depth-first traversal of the tree for rays in that
//! octant.

use serde::Serialize;
use tsoup_core::TriangleSet;
use tsoup_math::{Interval, Octant, Ray};

use crate::bvh::{Bvh, SENTINEL};
use crate::traversal::{enter_box, test_leaf, TraversalStats};
use crate::triangle::SurfaceHit;

/// Where to go next from a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RopeLink {
    /// Next node when the ray enters this node's box.
    pub hit: u32,
    /// Next node when the ray misses this node's box.
    pub miss: u32,
}

impl RopeLink {
    pub const TERMINAL: RopeLink = RopeLink {
        hit: SENTINEL,
        miss: SENTINEL,
    };
}

/// Eight link tables, one per octant, each indexed by dense node id.
#[derive(Debug, Clone)]
pub struct Ropes {
    tables: Vec<Vec<RopeLink>>,
}

impl Ropes {
    pub fn build(bvh: &Bvh) -> Self {
        let tables = Octant::all().map(|octant| build_table(bvh, octant)).collect();
        Self { tables }
    }

    /// Table for rays in `octant`, indexed by node id.
    pub fn table(&self, octant: Octant) -> &[RopeLink] {
        &self.tables[octant.index()]
    }

    #[inline]
    pub fn link(&self, octant: Octant, node: u32) -> RopeLink {
        self.tables[octant.index()][node as usize]
    }

    /// Closest hit found by walking the rope table of the ray's octant.
    pub fn nearest_hit(&self, bvh: &Bvh, triangles: &TriangleSet, ray: &Ray, valid: Interval) -> Option<SurfaceHit> {
        self.nearest_hit_with_stats(bvh, triangles, ray, valid, &mut TraversalStats::default())
    }

    pub fn nearest_hit_with_stats(
        &self,
        bvh: &Bvh,
        triangles: &TriangleSet,
        ray: &Ray,
        valid: Interval,
        stats: &mut TraversalStats,
    ) -> Option<SurfaceHit> {
        self.walk(bvh, triangles, ray, valid, false, stats)
    }

    /// True if anything blocks `ray` inside `valid`.
    pub fn any_hit(&self, bvh: &Bvh, triangles: &TriangleSet, ray: &Ray, valid: Interval) -> bool {
        self.walk(bvh, triangles, ray, valid, true, &mut TraversalStats::default())
            .is_some()
    }

    fn walk(
        &self,
        bvh: &Bvh,
        triangles: &TriangleSet,
        ray: &Ray,
        valid: Interval,
        stop_at_first: bool,
        stats: &mut TraversalStats,
    ) -> Option<SurfaceHit> {
        let table = self.table(ray.octant());
        let mut best: Option<SurfaceHit> = None;
        let mut id = bvh.root();

        while id != SENTINEL {
            stats.nodes_visited += 1;
            let node = bvh.node(id);
            let link = table[id as usize];
            let closest = best.map_or(f32::INFINITY, |hit| hit.t);

            if enter_box(&node.bounds, ray, valid, closest, stats).is_none() {
                id = link.miss;
                continue;
            }

            if node.is_leaf()
                && test_leaf(triangles, node.triangle_range(), ray, valid, &mut best, stop_at_first, stats)
            {
                return best;
            }
            id = link.hit;
        }

        best
    }
}

/// Depth-first walk with a continuation stack of far children.
fn build_table(bvh: &Bvh, octant: Octant) -> Vec<RopeLink> {
    let direction = octant.direction();
    let mut table = vec![RopeLink::TERMINAL; bvh.len()];
    let mut continuation: Vec<u32> = Vec::with_capacity(bvh.depth() as usize + 1);
    let mut current = Some(bvh.root());

    while let Some(id) = current {
        let node = bvh.node(id);
        let next = continuation.last().copied().unwrap_or(SENTINEL);

        current = match node.near_far(direction) {
            Some((near, far)) => {
                table[id as usize] = RopeLink { hit: near, miss: next };
                continuation.push(far);
                Some(near)
            }
            None => {
                table[id as usize] = RopeLink { hit: next, miss: next };
                continuation.pop()
            }
        };
    }

    table
}
