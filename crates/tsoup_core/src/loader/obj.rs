//! Wavefront OBJ loading through `tobj`.

use std::path::Path;

use tsoup_math::Vec3;

use super::{finish_loading, LoadError, LoadResult};
use crate::config::LoadOptions;
use crate::geometry::Vertex;
use crate::triangle_set::TriangleSet;

/// Load every model in an OBJ file into one triangle set.
///
/// Faces are triangulated. Vertices get a white color; models without
/// normals get area-weighted vertex normals from their faces.
pub fn load_obj<P: AsRef<Path>>(path: P, options: &LoadOptions) -> LoadResult<TriangleSet> {
    let (models, _materials) = tobj::load_obj(
        path.as_ref(),
        &tobj::LoadOptions {
            single_index: true,
            triangulate: true,
            ..Default::default()
        },
    )?;

    let mut triangles = TriangleSet::new();

    for model in &models {
        let mesh = &model.mesh;
        let positions: Vec<Vec3> = mesh
            .positions
            .chunks_exact(3)
            .map(|p| Vec3::from_slice(p) * options.geometry_scale)
            .collect();

        let indices = mesh
            .indices
            .iter()
            .map(|&i| check_index(i as usize, positions.len()))
            .collect::<LoadResult<Vec<usize>>>()?;

        let has_normals = mesh.normals.len() == mesh.positions.len();
        log::debug!(
            "OBJ model '{}': {} faces, normals: {}",
            model.name,
            indices.len() / 3,
            has_normals
        );

        let normals: Vec<Vec3> = if has_normals {
            mesh.normals
                .chunks_exact(3)
                .map(|n| Vec3::from_slice(n).normalize_or_zero())
                .collect()
        } else {
            area_weighted_normals(&positions, &indices)
        };

        for face in indices.chunks_exact(3) {
            let vertex = |i: usize| Vertex::new(positions[i], normals[i], Vec3::ONE);
            triangles.add(vertex(face[0]), vertex(face[1]), vertex(face[2]))?;
        }
    }

    finish_loading(triangles)
}

fn check_index(index: usize, vertex_count: usize) -> LoadResult<usize> {
    if index < vertex_count {
        Ok(index)
    } else {
        Err(LoadError::InvalidIndex {
            index,
            vertex_count,
        })
    }
}

/// Sum unnormalized face normals at each vertex, so larger faces weigh more.
fn area_weighted_normals(positions: &[Vec3], indices: &[usize]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];

    for face in indices.chunks_exact(3) {
        let (i0, i1, i2) = (face[0], face[1], face[2]);
        let face_normal = (positions[i1] - positions[i0]).cross(positions[i2] - positions[i0]);

        normals[i0] += face_normal;
        normals[i1] += face_normal;
        normals[i2] += face_normal;
    }

    for normal in &mut normals {
        *normal = normal.normalize_or_zero();
    }

    normals
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp(name: &str, content: &str) -> std::path::PathBuf {
        let path =
            std::env::temp_dir().join(format!("tsoup_{}_{}.obj", name, std::process::id()));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_quad_computes_normals() {
        let path = write_temp(
            "quad",
            "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n",
        );
        let set = load_obj(&path, &LoadOptions::default()).unwrap();
        std::fs::remove_file(&path).ok();

        // The quad is triangulated into two triangles sharing an edge.
        assert_eq!(set.len(), 2);
        assert_eq!(set.vertices().len(), 4);
        for vertex in set.vertices() {
            assert!((vertex.normal - Vec3::Z).length() < 1e-6);
            assert_eq!(vertex.color, Vec3::ONE);
        }
    }

    #[test]
    fn test_load_applies_scale() {
        let path = write_temp("scaled", "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n");
        let options = LoadOptions {
            geometry_scale: 3.0,
            ..Default::default()
        };
        let set = load_obj(&path, &options).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(set.get(0).positions[1], Vec3::new(3.0, 0.0, 0.0));
    }

    #[test]
    fn test_load_without_faces_is_no_geometry() {
        let path = write_temp("empty", "v 0 0 0\nv 1 0 0\n");
        let err = load_obj(&path, &LoadOptions::default()).unwrap_err();
        std::fs::remove_file(&path).ok();

        assert!(matches!(err, LoadError::NoGeometry));
    }

    #[test]
    fn test_area_weighting() {
        // A large face in the XY plane and a small one in the XZ plane share vertex 0.
        let positions = [
            Vec3::ZERO,
            Vec3::new(10.0, 0.0, 0.0),
            Vec3::new(0.0, 10.0, 0.0),
            Vec3::new(0.0, 0.0, -0.1),
            Vec3::new(0.1, 0.0, 0.0),
        ];
        let indices = [0, 1, 2, 0, 4, 3];
        let normals = area_weighted_normals(&positions, &indices);

        assert!(normals[0].z > 0.99);
        assert!((normals[3] - Vec3::Y).length() < 1e-5);
    }
}
