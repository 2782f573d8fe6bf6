//! Binned Surface Area Heuristic split search.

use tsoup_core::{BuildConfig, IndexedTriangle};
use tsoup_math::{Aabb, Axis};

/// Upper bound on bins per split search.
pub const MAX_BINS: usize = 40;

/// A split plane chosen by [`find_best_split`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Split {
    pub axis: Axis,
    /// Plane offset along `axis`.
    pub position: f32,
    /// SAH cost of splitting here.
    pub cost: f32,
    /// Triangles whose centroid is below `position`.
    pub left_count: usize,
}

#[derive(Debug, Clone, Copy)]
struct Bin {
    bounds: Aabb,
    count: usize,
}

impl Default for Bin {
    fn default() -> Self {
        Self {
            bounds: Aabb::EMPTY,
            count: 0,
        }
    }
}

/// Number of bins for `count` triangles.
#[inline]
pub fn bin_count(count: usize) -> usize {
    MAX_BINS.min(2 * count)
}

/// Plane test shared by binning and partitioning. NaN is never below.
#[inline]
pub fn is_below(c: f32, position: f32) -> bool {
    c - position < 0.0
}

/// Interior slab boundaries when `[lo, hi]` is split into `bins` equal slabs.
pub fn boundaries(lo: f32, hi: f32, bins: usize) -> Vec<f32> {
    (1..bins).map(|i| lo + i as f32 * (hi - lo) / bins as f32).collect()
}

/// Bin of coordinate `c`: the number of boundaries it is not below.
///
/// Values outside the range clamp to the first or last bin, NaN to the last.
#[inline]
pub fn bin_index(c: f32, boundaries: &[f32]) -> usize {
    boundaries.partition_point(|&b| !is_below(c, b))
}

/// Cheapest split of `triangles` along `axis` that beats leaving them in
/// one leaf, or `None` when nothing does.
///
/// `bounds` is the vertex box of the range; bins span its extent on
/// `axis`, which must be finite and positive.
pub fn find_best_split(
    triangles: &[IndexedTriangle],
    bounds: &Aabb,
    axis: Axis,
    config: &BuildConfig,
) -> Option<Split> {
    let bins = bin_count(triangles.len());
    let lo = bounds.lower(axis);
    let hi = bounds.upper(axis);
    let parent_area = bounds.surface_area();
    if bins < 2 || !(hi > lo) || !(parent_area > 0.0) {
        return None;
    }

    let planes = boundaries(lo, hi, bins);
    let mut slots = [Bin::default(); MAX_BINS];
    for triangle in triangles {
        let slot = &mut slots[bin_index(triangle.centroid[axis.index()], &planes)];
        slot.bounds.add_box(&triangle.bounds);
        slot.count += 1;
    }
    let slots = &slots[..bins];

    // right[i] covers bins i..bins
    let mut right = [Bin::default(); MAX_BINS];
    let mut acc = Bin::default();
    for i in (1..bins).rev() {
        acc.bounds.add_box(&slots[i].bounds);
        acc.count += slots[i].count;
        right[i] = acc;
    }

    let mut best: Option<Split> = None;
    let mut best_cost = config.leaf_cost(triangles.len());
    let mut left = Bin::default();

    for i in 1..bins {
        left.bounds.add_box(&slots[i - 1].bounds);
        left.count += slots[i - 1].count;

        let above = &right[i];
        if left.count == 0 || above.count == 0 {
            continue;
        }

        let cost = config.traversal_cost
            + config.intersection_cost
                * (left.bounds.surface_area() / parent_area * left.count as f32
                    + above.bounds.surface_area() / parent_area * above.count as f32);

        if cost < best_cost {
            best_cost = cost;
            best = Some(Split {
                axis,
                position: planes[i - 1],
                cost,
                left_count: left.count,
            });
        }
    }

    best
}
