use bytemuck::{Pod, Zeroable};

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
    pub normal: [f32; 3],
    /// How strongly the wind displaces this vertex (0 = rigid)
    pub sway: f32,
}

impl Vertex {
    pub fn new(position: [f32; 3], color: [f32; 3], normal: [f32; 3]) -> Self {
        Self {
            position,
            color,
            normal,
            sway: 0.0,
        }
    }

    pub fn with_sway(position: [f32; 3], color: [f32; 3], normal: [f32; 3], sway: f32) -> Self {
        Self {
            position,
            color,
            normal,
            sway,
        }
    }

    const ATTRIBUTES: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
        2 => Float32x3,
        3 => Float32,
    ];

    /// Layout shared by the scene, shadow, light and skybox pipelines.
    ///
    /// Locations: 0 position, 1 colour, 2 normal, 3 sway. The scene and
    /// shadow shaders read `@location(3)` to bend vertices with the wind, so
    /// both passes have to agree on the displaced shape.
    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_matches_struct() {
        let layout = Vertex::desc();
        assert_eq!(layout.array_stride, 40);
        assert_eq!(layout.attributes.len(), 4);
        assert_eq!(layout.attributes[3].offset, 36);
        assert_eq!(layout.attributes[3].shader_location, 3);
        assert_eq!(layout.attributes[3].format, wgpu::VertexFormat::Float32);
    }
}
