//! Flat, row-padded scene arrays for an external shading consumer.
//!
//! Every array is laid out as rows of `row_width` entries so it can be
//! uploaded as a 2D texture. Node arrays are indexed by dense node id; the
//! eight rope tables are concatenated, table `o` starting at
//! `o * row_width * node_rows`.

use serde::Serialize;
use tsoup_math::Octant;

use crate::bvh::{NodeKind, SENTINEL};
use crate::world::World;

pub const DEFAULT_ROW_WIDTH: u32 = 2048;

/// Packed scene, ready to serialize or upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneShaderData {
    pub row_width: u32,
    /// Three entries per triangle, in triangle order.
    pub vertex_count: u32,
    pub vertex_rows: u32,
    pub node_count: u32,
    pub node_rows: u32,
    /// Dense id of the root node.
    pub root: u32,

    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub colors: Vec<[f32; 3]>,

    pub box_min: Vec<[f32; 3]>,
    pub box_max: Vec<[f32; 3]>,
    /// Split-plane normal; zero for leaves.
    pub directions: Vec<[f32; 3]>,
    /// `[negative, positive]`, or `[SENTINEL, SENTINEL]` for leaves.
    pub children: Vec<[u32; 2]>,
    /// `[start, count]` triangle range of a leaf, whose first corner is
    /// vertex `3 * start`; `[0, 0]` for internal nodes.
    pub objects: Vec<[u32; 2]>,
    /// `[hit, miss]` per node, eight tables back to back.
    pub hit_miss: Vec<[u32; 2]>,
}

impl SceneShaderData {
    /// Flatten `world` into rows of `row_width` entries.
    ///
    /// # Panics
    /// Panics if `row_width` is zero.
    pub fn pack(world: &World, row_width: u32) -> Self {
        assert!(row_width > 0, "row width must be positive");

        let triangles = world.triangles();
        let bvh = world.bvh();

        let vertex_count = triangles.len() as u32 * 3;
        let vertex_rows = vertex_count.div_ceil(row_width);
        let vertex_len = (row_width * vertex_rows) as usize;

        let mut positions = Vec::with_capacity(vertex_len);
        let mut normals = Vec::with_capacity(vertex_len);
        let mut colors = Vec::with_capacity(vertex_len);
        for i in 0..triangles.len() {
            let triangle = triangles.get(i);
            for corner in 0..3 {
                positions.push(triangle.positions[corner].to_array());
                normals.push(triangle.normals[corner].to_array());
                colors.push(triangle.colors[corner].to_array());
            }
        }
        positions.resize(vertex_len, [0.0; 3]);
        normals.resize(vertex_len, [0.0; 3]);
        colors.resize(vertex_len, [0.0; 3]);

        let node_count = bvh.len() as u32;
        let node_rows = node_count.div_ceil(row_width);
        let table_len = (row_width * node_rows) as usize;

        let mut box_min = Vec::with_capacity(table_len);
        let mut box_max = Vec::with_capacity(table_len);
        let mut directions = Vec::with_capacity(table_len);
        let mut children = Vec::with_capacity(table_len);
        let mut objects = Vec::with_capacity(table_len);
        for node in bvh.nodes() {
            box_min.push(node.bounds.min.to_array());
            box_max.push(node.bounds.max.to_array());
            directions.push(node.split_normal().to_array());
            match node.kind {
                NodeKind::Internal {
                    negative, positive, ..
                } => {
                    children.push([negative, positive]);
                    objects.push([0, 0]);
                }
                NodeKind::Leaf => {
                    children.push([SENTINEL, SENTINEL]);
                    objects.push([node.start, node.count]);
                }
            }
        }
        box_min.resize(table_len, [0.0; 3]);
        box_max.resize(table_len, [0.0; 3]);
        directions.resize(table_len, [0.0; 3]);
        children.resize(table_len, [SENTINEL, SENTINEL]);
        objects.resize(table_len, [0, 0]);

        let mut hit_miss = Vec::with_capacity(table_len * Octant::COUNT);
        for octant in Octant::all() {
            let start = hit_miss.len();
            hit_miss.extend(
                world
                    .ropes()
                    .table(octant)
                    .iter()
                    .map(|link| [link.hit, link.miss]),
            );
            hit_miss.resize(start + table_len, [SENTINEL, SENTINEL]);
        }

        log::info!(
            "Packed {} vertices in {} rows and {} nodes in {} rows (row width {})",
            vertex_count,
            vertex_rows,
            node_count,
            node_rows,
            row_width
        );

        Self {
            row_width,
            vertex_count,
            vertex_rows,
            node_count,
            node_rows,
            root: bvh.root(),
            positions,
            normals,
            colors,
            box_min,
            box_max,
            directions,
            children,
            objects,
            hit_miss,
        }
    }

    /// Offset of octant `octant`'s table inside `hit_miss`.
    pub fn rope_offset(&self, octant: Octant) -> usize {
        octant.index() * (self.row_width * self.node_rows) as usize
    }

    /// Raw bytes of every array, named, for texture-style upload.
    pub fn buffers(&self) -> Vec<(&'static str, &[u8])> {
        vec![
            ("positions", bytemuck::cast_slice(&self.positions)),
            ("normals", bytemuck::cast_slice(&self.normals)),
            ("colors", bytemuck::cast_slice(&self.colors)),
            ("box_min", bytemuck::cast_slice(&self.box_min)),
            ("box_max", bytemuck::cast_slice(&self.box_max)),
            ("directions", bytemuck::cast_slice(&self.directions)),
            ("children", bytemuck::cast_slice(&self.children)),
            ("objects", bytemuck::cast_slice(&self.objects)),
            ("hit_miss", bytemuck::cast_slice(&self.hit_miss)),
        ]
    }
}
