//! A loaded scene with its acceleration structures.

use std::path::Path;
use std::time::Instant;

use tsoup_core::{load_triangles, BuildConfig, LoadOptions, TriangleSet};
use tsoup_math::{Interval, Ray};

use crate::bvh::{BuildStats, Bvh, BvhResult};
use crate::renderer::RenderResult;
use crate::rope::Ropes;
use crate::triangle::SurfaceHit;

/// Triangles, their hierarchy and its rope tables, frozen after
/// construction and shared read-only by render workers.
#[derive(Debug, Clone)]
pub struct World {
    triangles: TriangleSet,
    bvh: Bvh,
    ropes: Ropes,
    stats: BuildStats,
}

impl World {
    /// Build the hierarchy and ropes over a finished triangle set.
    pub fn build(mut triangles: TriangleSet, config: &BuildConfig) -> BvhResult<Self> {
        let (bvh, stats) = Bvh::build(&mut triangles, config)?;

        let start = Instant::now();
        let ropes = Ropes::build(&bvh);
        log::info!("Built ropes in {:.3} seconds", start.elapsed().as_secs_f32());

        Ok(Self {
            triangles,
            bvh,
            ropes,
            stats,
        })
    }

    /// Load a mesh file and build over it.
    pub fn load<P: AsRef<Path>>(path: P, options: &LoadOptions, config: &BuildConfig) -> RenderResult<Self> {
        let path = path.as_ref();
        log::info!("Loading {}", path.display());
        let triangles = load_triangles(path, options)?;
        Ok(Self::build(triangles, config)?)
    }

    pub fn triangles(&self) -> &TriangleSet {
        &self.triangles
    }

    pub fn bvh(&self) -> &Bvh {
        &self.bvh
    }

    pub fn ropes(&self) -> &Ropes {
        &self.ropes
    }

    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }

    /// Closest hit, through the stack traversal or the rope walker.
    pub fn nearest_hit(&self, ray: &Ray, valid: Interval, stackless: bool) -> Option<SurfaceHit> {
        if stackless {
            self.ropes.nearest_hit(&self.bvh, &self.triangles, ray, valid)
        } else {
            self.bvh.nearest_hit(&self.triangles, ray, valid)
        }
    }

    /// True if anything blocks `ray` inside `valid`.
    pub fn any_hit(&self, ray: &Ray, valid: Interval, stackless: bool) -> bool {
        if stackless {
            self.ropes.any_hit(&self.bvh, &self.triangles, ray, valid)
        } else {
            self.bvh.any_hit(&self.triangles, ray, valid)
        }
    }
}
