//! Tile-parallel ray casting.
//!
//! Each pixel casts one primary ray; hits are shaded with a single
//! directional light (Lambert term, optional shadow ray) and misses get the
//! background color. Tiles are claimed from a shared counter by a fixed
//! pool of workers.

use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tsoup_core::{ConfigError, LoadError};
use tsoup_math::{Interval, Ray, Vec3};

use crate::bucket::{generate_buckets, Bucket, BucketResult, DEFAULT_BUCKET_SIZE};
use crate::bvh::BuildError;
use crate::camera::Camera;
use crate::world::World;

/// Linear RGB.
pub type Color = Vec3;

/// Lower bound on the light factor, so unlit and shadowed faces stay visible.
pub const MIN_BRIGHTNESS: f32 = 0.1;

/// Distance along the normal that shadow rays start from the surface.
pub const SHADOW_OFFSET: f32 = 1e-4;

/// Exponent converting linear color back to display values.
pub const DISPLAY_GAMMA: f32 = 2.63;

/// Errors from loading, building or rendering a scene.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to load scene: {0}")]
    Load(#[from] LoadError),

    #[error("Failed to build BVH: {0}")]
    Build(#[from] BuildError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to start render workers: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Tile queue lock was poisoned by a panicking worker")]
    TileQueuePoisoned,

    #[error("Only {rendered} of {expected} tiles were rendered")]
    MissingTiles { expected: usize, rendered: usize },
}

/// Result type for rendering operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Render configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    /// Worker threads claiming tiles
    pub threads: usize,
    /// Tile edge in pixels
    pub tile_size: u32,
    /// Vertical field of view in degrees
    pub vfov: f32,
    /// Color of rays that hit nothing
    pub background: Color,
    /// Direction towards the light; need not be normalized
    pub light_direction: Vec3,
    pub cast_shadows: bool,
    /// Trace with the rope walker instead of the stack traversal
    pub stackless: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            threads: 8,
            tile_size: DEFAULT_BUCKET_SIZE,
            vfov: 40.0,
            background: Color::splat(0.2),
            light_direction: Vec3::new(1.0, 1.0, 1.0),
            cast_shadows: true,
            stackless: false,
        }
    }
}

impl RenderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("width", self.width as usize),
            ("height", self.height as usize),
            ("threads", self.threads),
            ("tile_size", self.tile_size as usize),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    name,
                    value: value.to_string(),
                    reason: "must be positive".into(),
                });
            }
        }

        if !(self.vfov > 0.0 && self.vfov < 180.0) {
            return Err(ConfigError::InvalidValue {
                name: "vfov",
                value: self.vfov.to_string(),
                reason: "must be between 0 and 180 degrees".into(),
            });
        }

        if !self.light_direction.is_finite() || self.light_direction.length_squared() == 0.0 {
            return Err(ConfigError::InvalidValue {
                name: "light_direction",
                value: format!("{:?}", self.light_direction),
                reason: "must be a finite, non-zero vector".into(),
            });
        }
        Ok(())
    }
}

/// Color seen along `ray`.
pub fn ray_color(world: &World, ray: &Ray, config: &RenderConfig) -> Color {
    let Some(hit) = world.nearest_hit(ray, Interval::FORWARD, config.stackless) else {
        return config.background;
    };

    // Two-sided: face the normal towards the viewer.
    let normal = if hit.normal.dot(ray.direction) > 0.0 {
        -hit.normal
    } else {
        hit.normal
    };

    let light = config.light_direction.normalize_or_zero();
    let mut brightness = normal.dot(light);

    if config.cast_shadows && brightness > 0.0 {
        let shadow = Ray::new(hit.point + normal * SHADOW_OFFSET, light);
        if world.any_hit(&shadow, Interval::FORWARD, config.stackless) {
            brightness = 0.0;
        }
    }

    hit.color * brightness.clamp(MIN_BRIGHTNESS, 1.0)
}

/// Linear to display value.
#[inline]
pub fn linear_to_gamma(linear: f32) -> f32 {
    if linear > 0.0 {
        linear.powf(1.0 / DISPLAY_GAMMA)
    } else {
        0.0
    }
}

/// Convert a color to 8-bit RGBA.
pub fn color_to_rgba(color: Color) -> [u8; 4] {
    let channel = |c: f32| (255.0 * linear_to_gamma(c).clamp(0.0, 1.0)).round() as u8;
    [channel(color.x), channel(color.y), channel(color.z), 255]
}

/// Simple image buffer for storing render output.
#[derive(Debug, Clone)]
pub struct ImageBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Color>,
}

impl ImageBuffer {
    /// Create a new image buffer filled with black.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::ZERO; (width * height) as usize],
        }
    }

    /// Get the pixel at (x, y).
    pub fn get(&self, x: u32, y: u32) -> Color {
        self.pixels[(y * self.width + x) as usize]
    }

    /// Set the pixel at (x, y).
    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        self.pixels[(y * self.width + x) as usize] = color;
    }

    /// Copy a rendered bucket into place.
    pub fn write_bucket(&mut self, result: &BucketResult) {
        let bucket = &result.bucket;
        for (i, color) in result.pixels.iter().enumerate() {
            let i = i as u32;
            self.set(bucket.x + i % bucket.width, bucket.y + i / bucket.width, *color);
        }
    }

    /// Convert to RGBA bytes (for display or saving).
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity((self.width * self.height * 4) as usize);
        for color in &self.pixels {
            bytes.extend_from_slice(&color_to_rgba(*color));
        }
        bytes
    }

    /// Write the image as a PNG.
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> RenderResult<()> {
        image::save_buffer(
            path.as_ref(),
            &self.to_rgba(),
            self.width,
            self.height,
            image::ColorType::Rgba8,
        )?;
        Ok(())
    }
}

/// Render a single bucket, one centered ray per pixel.
pub fn render_bucket(bucket: &Bucket, camera: &Camera, world: &World, config: &RenderConfig) -> BucketResult {
    let mut pixels = Vec::with_capacity(bucket.pixel_count() as usize);

    for local_y in 0..bucket.height {
        for local_x in 0..bucket.width {
            let ray = camera.get_ray(bucket.x + local_x, bucket.y + local_y);
            pixels.push(ray_color(world, &ray, config));
        }
    }

    BucketResult::new(*bucket, pixels)
}

/// Render the whole image with `config.threads` workers.
///
/// Every worker repeatedly claims the next unrendered bucket from a shared
/// counter until none are left. The image is assembled once all workers
/// have returned.
pub fn render(world: &World, config: &RenderConfig) -> RenderResult<ImageBuffer> {
    config.validate()?;

    let triangles = world.triangles();
    let mut camera = Camera::new()
        .with_resolution(config.width, config.height)
        .with_fov(config.vfov)
        .framing(triangles.center(), triangles.extent());
    camera.initialize();

    render_with_camera(world, &camera, config)
}

/// [`render`] from an explicit camera.
pub fn render_with_camera(world: &World, camera: &Camera, config: &RenderConfig) -> RenderResult<ImageBuffer> {
    config.validate()?;

    let start = Instant::now();
    let buckets = generate_buckets(config.width, config.height, config.tile_size);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .thread_name(|i| format!("tsoup-render-{}", i))
        .build()?;

    log::info!(
        "Rendering {}x{} in {} tiles on {} threads ({} traversal)",
        config.width,
        config.height,
        buckets.len(),
        config.threads,
        if config.stackless { "stackless" } else { "stack" }
    );

    let next_bucket = Mutex::new(0usize);
    let per_worker: Vec<RenderResult<Vec<BucketResult>>> = pool.broadcast(|_| -> RenderResult<Vec<BucketResult>> {
        let mut done = Vec::new();
        loop {
            let index = claim_bucket(&next_bucket)?;
            let Some(bucket) = buckets.get(index) else {
                break;
            };
            done.push(render_bucket(bucket, camera, world, config));
        }
        Ok(done)
    });
    let per_worker = per_worker.into_iter().collect::<RenderResult<Vec<_>>>()?;

    let mut image = ImageBuffer::new(config.width, config.height);
    let mut rendered = 0;
    for result in per_worker.iter().flatten() {
        image.write_bucket(result);
        rendered += 1;
    }
    if rendered != buckets.len() {
        return Err(RenderError::MissingTiles {
            expected: buckets.len(),
            rendered,
        });
    }

    log::info!(
        "Rendered {} tiles in {:.3} seconds",
        rendered,
        start.elapsed().as_secs_f32()
    );
    Ok(image)
}

/// Take the next tile index from the shared counter.
fn claim_bucket(next: &Mutex<usize>) -> RenderResult<usize> {
    let mut next = next.lock().map_err(|_| RenderError::TileQueuePoisoned)?;
    let index = *next;
    *next += 1;
    Ok(index)
}
