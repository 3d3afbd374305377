//! Procedural scene meshes.
//!
//! The town is built from boxes: a ground slab, houses, lamp posts under
//! each point light and a few trees whose canopies sway in the wind.

use glam::Vec3;
use wgpu::util::DeviceExt;

use crate::renderer::vertex::Vertex;
use crate::scene::lights::LAMP_POSITIONS;

#[derive(Debug, Default)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
    }

    pub fn add_quad(&mut self, vertices: [Vertex; 4]) {
        let start_index = self.vertices.len() as u32;

        self.vertices.extend_from_slice(&vertices);

        // Two counter-clockwise triangles
        self.indices.extend_from_slice(&[
            start_index,
            start_index + 1,
            start_index + 2,
            start_index,
            start_index + 2,
            start_index + 3,
        ]);
    }

    /// Axis-aligned box spanning `min..max`
    pub fn add_box(&mut self, min: Vec3, max: Vec3, color: [f32; 3], sway: f32) {
        let c = [
            Vec3::new(min.x, min.y, min.z),
            Vec3::new(max.x, min.y, min.z),
            Vec3::new(max.x, max.y, min.z),
            Vec3::new(min.x, max.y, min.z),
            Vec3::new(min.x, min.y, max.z),
            Vec3::new(max.x, min.y, max.z),
            Vec3::new(max.x, max.y, max.z),
            Vec3::new(min.x, max.y, max.z),
        ];
        // (corner indices, outward normal)
        let faces: [([usize; 4], Vec3); 6] = [
            ([4, 5, 6, 7], Vec3::Z),
            ([1, 0, 3, 2], Vec3::NEG_Z),
            ([5, 1, 2, 6], Vec3::X),
            ([0, 4, 7, 3], Vec3::NEG_X),
            ([7, 6, 2, 3], Vec3::Y),
            ([0, 1, 5, 4], Vec3::NEG_Y),
        ];

        for (corners, normal) in faces {
            let normal = normal.to_array();
            self.add_quad(corners.map(|i| {
                // Only the upper half of a swaying box moves
                let weight = if c[i].y > min.y { sway } else { 0.0 };
                Vertex::with_sway(c[i].to_array(), color, normal, weight)
            }));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }
}

/// Unit cube centred on the origin
pub fn cube(color: [f32; 3]) -> Mesh {
    let mut mesh = Mesh::new();
    mesh.add_box(Vec3::splat(-0.5), Vec3::splat(0.5), color, 0.0);
    mesh
}

/// Helicopter at unit scale, centred on its rotor mast
pub fn helicopter() -> Mesh {
    let mut mesh = Mesh::new();
    let body = [0.2, 0.25, 0.2];
    let dark = [0.1, 0.1, 0.1];
    mesh.add_box(Vec3::new(-0.5, -0.4, -0.35), Vec3::new(0.6, 0.3, 0.35), body, 0.0);
    mesh.add_box(Vec3::new(0.6, -0.1, -0.08), Vec3::new(2.0, 0.1, 0.08), body, 0.0);
    mesh.add_box(Vec3::new(1.9, 0.1, -0.04), Vec3::new(2.05, 0.5, 0.04), body, 0.0);
    mesh.add_box(Vec3::new(-0.05, 0.3, -0.05), Vec3::new(0.05, 0.45, 0.05), dark, 0.0);
    mesh.add_box(Vec3::new(-1.8, 0.45, -0.06), Vec3::new(1.8, 0.5, 0.06), dark, 0.0);
    mesh.add_box(Vec3::new(-0.06, 0.45, -1.8), Vec3::new(0.06, 0.5, 1.8), dark, 0.0);
    mesh.add_box(Vec3::new(-0.5, -0.6, -0.4), Vec3::new(0.5, -0.55, -0.3), dark, 0.0);
    mesh.add_box(Vec3::new(-0.5, -0.6, 0.3), Vec3::new(0.5, -0.55, 0.4), dark, 0.0);
    mesh
}

/// Ground, houses, lamp posts and trees
pub fn town() -> Mesh {
    let mut mesh = Mesh::new();

    mesh.add_box(
        Vec3::new(-300.0, -1.0, -300.0),
        Vec3::new(300.0, 0.0, 300.0),
        [0.35, 0.45, 0.3],
        0.0,
    );

    let houses: [(Vec3, Vec3, [f32; 3]); 6] = [
        (Vec3::new(-130.0, 0.0, -20.0), Vec3::new(18.0, 14.0, 16.0), [0.7, 0.6, 0.5]),
        (Vec3::new(-60.0, 0.0, 25.0), Vec3::new(14.0, 10.0, 14.0), [0.75, 0.7, 0.6]),
        (Vec3::new(-10.0, 0.0, -30.0), Vec3::new(20.0, 22.0, 12.0), [0.6, 0.6, 0.65]),
        (Vec3::new(40.0, 0.0, 20.0), Vec3::new(16.0, 12.0, 18.0), [0.65, 0.5, 0.45]),
        (Vec3::new(60.0, 0.0, -60.0), Vec3::new(24.0, 30.0, 20.0), [0.55, 0.55, 0.6]),
        (Vec3::new(110.0, 0.0, 10.0), Vec3::new(14.0, 9.0, 14.0), [0.8, 0.75, 0.65]),
    ];
    for (base, size, color) in houses {
        let min = base - Vec3::new(size.x, 0.0, size.z) * 0.5;
        mesh.add_box(min, min + size, color, 0.0);
    }

    for lamp in LAMP_POSITIONS {
        let post = Vec3::new(0.3, 0.0, 0.3);
        mesh.add_box(
            Vec3::new(lamp.x, 0.0, lamp.z) - post,
            Vec3::new(lamp.x, lamp.y - 0.5, lamp.z) + post,
            [0.15, 0.15, 0.15],
            0.0,
        );
        mesh.add_box(
            lamp - Vec3::splat(0.5),
            lamp + Vec3::splat(0.5),
            [1.0, 0.95, 0.8],
            0.0,
        );
    }

    let trees = [
        Vec3::new(-90.0, 0.0, -50.0),
        Vec3::new(-35.0, 0.0, 45.0),
        Vec3::new(20.0, 0.0, 50.0),
        Vec3::new(85.0, 0.0, 45.0),
        Vec3::new(140.0, 0.0, -30.0),
    ];
    for tree in trees {
        mesh.add_box(
            tree + Vec3::new(-0.6, 0.0, -0.6),
            tree + Vec3::new(0.6, 6.0, 0.6),
            [0.4, 0.28, 0.15],
            0.0,
        );
        mesh.add_box(
            tree + Vec3::new(-3.5, 6.0, -3.5),
            tree + Vec3::new(3.5, 14.0, 3.5),
            [0.2, 0.45, 0.2],
            1.0,
        );
    }

    mesh
}

/// Mesh uploaded to vertex and index buffers
pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

impl GpuMesh {
    pub fn upload(device: &wgpu::Device, label: &str, mesh: &Mesh) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Vertex Buffer", label)),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Index Buffer", label)),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        log::debug!(
            "[GpuMesh::upload] {}: {} vertices, {} indices",
            label,
            mesh.vertices.len(),
            mesh.indices.len()
        );

        Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.index_count(),
        }
    }

    pub fn draw<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>) {
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        render_pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_has_six_faces() {
        let mesh = cube([1.0; 3]);
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.index_count(), 36);
    }

    #[test]
    fn test_box_faces_wind_outwards() {
        let mesh = cube([1.0; 3]);
        for tri in mesh.indices.chunks(3) {
            let a = Vec3::from(mesh.vertices[tri[0] as usize].position);
            let b = Vec3::from(mesh.vertices[tri[1] as usize].position);
            let c = Vec3::from(mesh.vertices[tri[2] as usize].position);
            let normal = Vec3::from(mesh.vertices[tri[0] as usize].normal);
            assert!((b - a).cross(c - a).dot(normal) > 0.0);
        }
    }

    #[test]
    fn test_only_canopy_tops_sway() {
        let mut mesh = Mesh::new();
        mesh.add_box(Vec3::ZERO, Vec3::ONE, [1.0; 3], 1.0);
        for v in &mesh.vertices {
            let expected = if v.position[1] > 0.0 { 1.0 } else { 0.0 };
            assert_eq!(v.sway, expected);
        }
    }

    #[test]
    fn test_indices_stay_in_bounds() {
        for mesh in [town(), helicopter()] {
            let max = mesh.vertices.len() as u32;
            assert!(mesh.indices.iter().all(|&i| i < max));
        }
    }
}
