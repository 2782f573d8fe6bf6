//! Bounding Volume Hierarchy over a [`TriangleSet`].
//!
//! The tree is stored as an arena of [`BvhNode`]s addressed by a dense `u32`
//! id. Ids follow the in-order numbering produced by the indexer: a node's
//! negative subtree comes first, then the node itself, then its positive
//! subtree. The arena is permuted after construction so that
//! `nodes()[id]` is the node with that id, which is the layout the rope
//! tables and the packed shader data are expressed against.
//!
//! Construction is a recursive binned-SAH build that partitions the
//! triangle array of the set in place; each leaf then covers a contiguous
//! `[start, start + count)` range of the permuted array.

mod builder;
mod indexer;
mod sah;
mod stats;

use thiserror::Error;
use tsoup_core::{BuildConfig, ConfigError, TriangleSet};
use tsoup_math::{Aabb, Axis, Vec3};

pub use stats::{BuildStats, LEAF_HISTOGRAM_BUCKETS};

/// Marks "no node": absent children of leaves and the end of a rope chain.
pub const SENTINEL: u32 = u32::MAX;

/// Errors that abort BVH construction.
///
/// Everything except `EmptyInput`, `Unfinished` and `Config` indicates a
/// builder bug rather than bad data.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Cannot build a BVH over an empty triangle set")]
    EmptyInput,

    #[error("Triangle set is still accepting triangles; call finish() first")]
    Unfinished,

    #[error("Invalid build configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Node count exceeds the dense id space ({count} nodes)")]
    NodeIndexOverflow { count: usize },

    #[error("Node ids are not a bijection over the arena: {0}")]
    IndexMismatch(String),

    #[error("Range [{start}, {end}) split at {position} on {axis:?} put {actual} triangles below the plane, binning counted {expected}")]
    PartitionMismatch {
        start: usize,
        end: usize,
        axis: Axis,
        position: f32,
        expected: usize,
        actual: usize,
    },
}

/// Result type for BVH construction.
pub type BvhResult<T> = Result<T, BuildError>;

/// What a node holds besides its box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeKind {
    /// Terminal node over a contiguous triangle range.
    Leaf,
    /// Two children split by a plane perpendicular to `axis`.
    Internal {
        negative: u32,
        positive: u32,
        axis: Axis,
        /// SAH cost of the chosen split.
        cost: f32,
    },
}

/// A node of the arena.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BvhNode {
    pub bounds: Aabb,
    /// First triangle of the range covered by this node's subtree.
    pub start: u32,
    /// Number of triangles covered by this node's subtree.
    pub count: u32,
    pub kind: NodeKind,
}

impl BvhNode {
    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf)
    }

    /// `[negative, positive]` child ids, or `None` for a leaf.
    pub fn children(&self) -> Option<[u32; 2]> {
        match self.kind {
            NodeKind::Internal {
                negative, positive, ..
            } => Some([negative, positive]),
            NodeKind::Leaf => None,
        }
    }

    /// Split-plane normal; zero for leaves.
    pub fn split_normal(&self) -> Vec3 {
        match self.kind {
            NodeKind::Internal { axis, .. } => axis.normal(),
            NodeKind::Leaf => Vec3::ZERO,
        }
    }

    /// `(near, far)` children for a ray travelling along `direction`.
    ///
    /// The negative child is near when the direction component on the
    /// split axis is non-negative.
    #[inline]
    pub fn near_far(&self, direction: Vec3) -> Option<(u32, u32)> {
        match self.kind {
            NodeKind::Internal {
                negative,
                positive,
                axis,
                ..
            } => {
                if direction[axis.index()] >= 0.0 {
                    Some((negative, positive))
                } else {
                    Some((positive, negative))
                }
            }
            NodeKind::Leaf => None,
        }
    }

    /// Triangle indices covered by this node.
    #[inline]
    pub fn triangle_range(&self) -> std::ops::Range<usize> {
        let start = self.start as usize;
        start..start + self.count as usize
    }
}

/// A built, frozen hierarchy.
#[derive(Debug, Clone)]
pub struct Bvh {
    nodes: Vec<BvhNode>,
    root: u32,
    depth: u32,
}

impl Bvh {
    /// Build a hierarchy over `triangles`, reordering its triangle array.
    ///
    /// The set must be finished and non-empty. After this returns the
    /// triangle order must not change again, since every leaf refers to an
    /// absolute range of it.
    pub fn build(triangles: &mut TriangleSet, config: &BuildConfig) -> BvhResult<(Self, BuildStats)> {
        config.validate()?;
        if triangles.is_empty() {
            return Err(BuildError::EmptyInput);
        }
        if !triangles.is_finished() {
            return Err(BuildError::Unfinished);
        }

        let (nodes, root, stats) = builder::Builder::new(triangles, config).run()?;
        let (nodes, root) = indexer::assign_indices(nodes, root)?;

        let bvh = Self {
            nodes,
            root,
            depth: stats.max_depth_reached,
        };
        Ok((bvh, stats))
    }

    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    /// Node with dense id `id`.
    #[inline]
    pub fn node(&self, id: u32) -> &BvhNode {
        &self.nodes[id as usize]
    }

    /// Dense id of the root.
    pub fn root(&self) -> u32 {
        self.root
    }

    /// Deepest level of the tree; the root is at depth 0.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Box around the whole scene.
    pub fn bounds(&self) -> Aabb {
        self.node(self.root).bounds
    }

    /// Leaf ids in depth-first order, negative child first.
    pub fn leaves(&self) -> Vec<u32> {
        let mut leaves = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            match self.node(id).children() {
                Some([negative, positive]) => {
                    stack.push(positive);
                    stack.push(negative);
                }
                None => leaves.push(id),
            }
        }
        leaves
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use tsoup_core::Vertex;

    fn vertex(position: Vec3) -> Vertex {
        Vertex::new(position, Vec3::Z, Vec3::ONE)
    }

    /// Unit right triangle in the plane `z = 0`, offset by `origin`.
    pub(crate) fn add_unit_triangle(set: &mut TriangleSet, origin: Vec3) {
        set.add(
            vertex(origin),
            vertex(origin + Vec3::X),
            vertex(origin + Vec3::Y),
        )
        .unwrap();
    }

    /// `count` small triangles scattered in a cube of side 20.
    pub(crate) fn random_soup(count: usize, seed: u64) -> TriangleSet {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut set = TriangleSet::new();
        for _ in 0..count {
            let base = Vec3::new(
                rng.gen_range(-10.0..10.0),
                rng.gen_range(-10.0..10.0),
                rng.gen_range(-10.0..10.0),
            );
            let mut corner = || {
                base + Vec3::new(
                    rng.gen_range(-0.5..0.5),
                    rng.gen_range(-0.5..0.5),
                    rng.gen_range(-0.5..0.5),
                )
            };
            let (a, b, c) = (corner(), corner(), corner());
            set.add(vertex(a), vertex(b), vertex(c)).unwrap();
        }
        set.finish();
        set
    }

    pub(crate) fn build_soup(count: usize, seed: u64, config: &BuildConfig) -> (TriangleSet, Bvh, BuildStats) {
        let mut set = random_soup(count, seed);
        let (bvh, stats) = Bvh::build(&mut set, config).unwrap();
        (set, bvh, stats)
    }

    /// Depth of every node, indexed by id.
    fn node_depths(bvh: &Bvh) -> Vec<u32> {
        let mut depths = vec![0; bvh.len()];
        let mut stack = vec![(bvh.root(), 0)];
        while let Some((id, depth)) = stack.pop() {
            depths[id as usize] = depth;
            if let Some([negative, positive]) = bvh.node(id).children() {
                stack.push((negative, depth + 1));
                stack.push((positive, depth + 1));
            }
        }
        depths
    }

    #[test]
    fn test_two_far_triangles_split_on_x() {
        let mut set = TriangleSet::new();
        add_unit_triangle(&mut set, Vec3::ZERO);
        add_unit_triangle(&mut set, Vec3::new(100.0, 0.0, 0.0));
        set.finish();

        let config = BuildConfig {
            leaf_max: 1,
            ..Default::default()
        };
        let (bvh, stats) = Bvh::build(&mut set, &config).unwrap();

        assert_eq!(bvh.len(), 3);
        assert_eq!(stats.node_count, 3);
        assert_eq!(stats.leaf_count, 2);

        let root = bvh.node(bvh.root());
        let NodeKind::Internal {
            negative,
            positive,
            axis,
            ..
        } = root.kind
        else {
            panic!("root should be internal");
        };
        assert_eq!(axis, Axis::X);
        assert_eq!(bvh.node(negative).count, 1);
        assert_eq!(bvh.node(positive).count, 1);
        assert!(bvh.node(negative).is_leaf() && bvh.node(positive).is_leaf());

        // In-order ids: negative leaf, root, positive leaf.
        assert_eq!((negative, bvh.root(), positive), (0, 1, 2));
        // The triangle near the origin lands on the negative side.
        assert!(set.indexed(bvh.node(negative).start as usize).centroid.x < 1.0);
    }

    #[test]
    fn test_single_triangle_is_leaf_root() {
        let mut set = TriangleSet::new();
        add_unit_triangle(&mut set, Vec3::ZERO);
        set.finish();

        let (bvh, stats) = Bvh::build(&mut set, &BuildConfig::default()).unwrap();
        assert_eq!(bvh.len(), 1);
        assert_eq!(bvh.root(), 0);
        assert!(bvh.node(0).is_leaf());
        assert_eq!(stats.leaf_count, 1);
    }

    #[test]
    fn test_build_rejects_empty_and_unfinished() {
        let mut empty = TriangleSet::new();
        empty.finish();
        assert!(matches!(
            Bvh::build(&mut empty, &BuildConfig::default()),
            Err(BuildError::EmptyInput)
        ));

        let mut open = TriangleSet::new();
        add_unit_triangle(&mut open, Vec3::ZERO);
        assert!(matches!(
            Bvh::build(&mut open, &BuildConfig::default()),
            Err(BuildError::Unfinished)
        ));
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let mut set = random_soup(4, 1);
        let config = BuildConfig {
            leaf_max: 0,
            ..Default::default()
        };
        assert!(matches!(
            Bvh::build(&mut set, &config),
            Err(BuildError::Config(_))
        ));
    }

    #[test]
    fn test_leaves_tile_triangle_array() {
        let (set, bvh, stats) = build_soup(500, 7, &BuildConfig::default());

        let mut next = 0;
        for id in bvh.leaves() {
            let range = bvh.node(id).triangle_range();
            assert_eq!(range.start, next, "gap or overlap before leaf {id}");
            next = range.end;
        }
        assert_eq!(next, set.len());
        assert_eq!(stats.triangles_placed, set.len());
    }

    #[test]
    fn test_boxes_contain_children_and_triangles() {
        let (set, bvh, _) = build_soup(400, 11, &BuildConfig::default());
        let tolerance = 1e-4;

        for node in bvh.nodes() {
            match node.children() {
                Some([negative, positive]) => {
                    let union = Aabb::surrounding(&bvh.node(negative).bounds, &bvh.node(positive).bounds);
                    assert!(node.bounds.approx_eq(&union, tolerance));
                }
                None => {
                    for i in node.triangle_range() {
                        for p in set.get(i).positions {
                            let mut point = Aabb::EMPTY;
                            point.add_exact_point(p);
                            assert!(node.bounds.contains_box(&point, 0.0));
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_leaf_size_or_depth_limit() {
        let config = BuildConfig {
            max_depth: 6,
            leaf_max: 3,
            ..Default::default()
        };
        let (_, bvh, stats) = build_soup(1000, 3, &config);
        let depths = node_depths(&bvh);

        for id in bvh.leaves() {
            let node = bvh.node(id);
            assert!(
                node.count <= config.leaf_max || depths[id as usize] == config.max_depth,
                "leaf {id} holds {} triangles at depth {}",
                node.count,
                depths[id as usize]
            );
        }
        assert!(stats.max_depth_reached <= config.max_depth);
        assert_eq!(bvh.depth(), *depths.iter().max().unwrap());
    }

    #[test]
    fn test_internal_cost_beats_leaf_cost() {
        let config = BuildConfig::default();
        let (_, bvh, _) = build_soup(800, 5, &config);

        for node in bvh.nodes() {
            if let NodeKind::Internal { cost, .. } = node.kind {
                assert!(cost < config.leaf_cost(node.count as usize));
            }
        }
    }

    #[test]
    fn test_identical_triangles_become_one_leaf() {
        let mut set = TriangleSet::new();
        for i in 0..50 {
            // Same geometry, distinct colors so the vertices don't dedupe.
            let color = Vec3::splat(i as f32 / 50.0);
            set.add(
                Vertex::new(Vec3::ZERO, Vec3::Z, color),
                Vertex::new(Vec3::X, Vec3::Z, color),
                Vertex::new(Vec3::Y, Vec3::Z, color),
            )
            .unwrap();
        }
        set.finish();

        let (bvh, stats) = Bvh::build(&mut set, &BuildConfig::default()).unwrap();
        assert_eq!(bvh.len(), 1);
        assert_eq!(bvh.node(bvh.root()).count, 50);
        assert_eq!(stats.no_good_split + stats.degenerate_axis, 1);
    }

    #[test]
    fn test_degenerate_triangles_are_tolerated() {
        let mut set = TriangleSet::new();
        // Collinear and point triangles on one line.
        for i in 0..40 {
            let p = Vec3::new(i as f32, 0.0, 0.0);
            set.add(vertex(p), vertex(p + Vec3::X * 0.5), vertex(p + Vec3::X)).unwrap();
            set.add(vertex(p), vertex(p), vertex(p)).unwrap();
        }
        set.finish();

        let (bvh, stats) = Bvh::build(&mut set, &BuildConfig::default()).unwrap();
        for node in bvh.nodes() {
            assert!(node.bounds.min.is_finite() && node.bounds.max.is_finite());
        }
        assert_eq!(stats.triangles_placed, 80);
    }

    #[test]
    fn test_infinite_coordinate_becomes_leaf() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut set = TriangleSet::new();
        for i in 0..30 {
            add_unit_triangle(&mut set, Vec3::new(i as f32 * 2.0, 0.0, 0.0));
        }
        set.add(
            vertex(Vec3::new(f32::INFINITY, 0.0, 0.0)),
            vertex(Vec3::ZERO),
            vertex(Vec3::Y),
        )
        .unwrap();
        set.finish();

        let (bvh, stats) = Bvh::build(&mut set, &BuildConfig::default()).unwrap();
        assert_eq!(stats.degenerate_axis, 1);
        assert_eq!(bvh.len(), 1);
        assert_eq!(stats.triangles_placed, 31);
    }

    #[test]
    fn test_ids_are_in_order() {
        let (_, bvh, _) = build_soup(200, 9, &BuildConfig::default());

        // Every node's id lies between all ids of its negative subtree and
        // all ids of its positive subtree.
        fn span(bvh: &Bvh, id: u32) -> (u32, u32) {
            match bvh.node(id).children() {
                Some([negative, positive]) => {
                    let (neg_lo, neg_hi) = span(bvh, negative);
                    let (pos_lo, pos_hi) = span(bvh, positive);
                    assert!(neg_hi < id && id < pos_lo);
                    (neg_lo, pos_hi)
                }
                None => (id, id),
            }
        }

        let (lo, hi) = span(&bvh, bvh.root());
        assert_eq!((lo, hi as usize), (0, bvh.len() - 1));
    }
}
