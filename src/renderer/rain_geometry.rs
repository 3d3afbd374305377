//! Line geometry for the rain.
//!
//! Every drop becomes one line segment: the head at the drop position and
//! the tail a short distance above it. The points are rebuilt on the CPU
//! each frame into a reused vector and copied into a GPU buffer that was
//! sized once when the effect was switched on.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::error::{resource_error, ViewerResult};
use crate::weather::RainDrop;

/// One end of a rain line segment
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LinePoint {
    pub position: [f32; 3],
}

impl LinePoint {
    pub fn new(position: Vec3) -> Self {
        Self {
            position: position.to_array(),
        }
    }

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<LinePoint>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

/// Destination for staged line points
pub trait LineVertexSink {
    /// Number of points the sink can hold
    fn capacity_points(&self) -> usize;

    /// Overwrite the start of the sink with `points`
    fn write_points(&mut self, points: &[LinePoint]) -> ViewerResult<()>;
}

/// Plain in-memory sink, used when no GPU is involved
#[derive(Debug, Clone, Default)]
pub struct VecSink {
    capacity: usize,
    points: Vec<LinePoint>,
}

impl VecSink {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            points: Vec::with_capacity(capacity),
        }
    }

    pub fn points(&self) -> &[LinePoint] {
        &self.points
    }
}

impl LineVertexSink for VecSink {
    fn capacity_points(&self) -> usize {
        self.capacity
    }

    fn write_points(&mut self, points: &[LinePoint]) -> ViewerResult<()> {
        if points.len() > self.capacity {
            return Err(resource_error(
                "rain vertex buffer",
                format!("{} points exceed capacity {}", points.len(), self.capacity),
            ));
        }
        self.points.clear();
        self.points.extend_from_slice(points);
        Ok(())
    }
}

/// Builds head/tail points from drop state
#[derive(Debug, Clone)]
pub struct GeometryStager {
    segment: Vec3,
    points: Vec<LinePoint>,
}

impl GeometryStager {
    pub fn new(segment_length: f32, drop_capacity: usize) -> Self {
        Self {
            segment: Vec3::new(0.0, segment_length, 0.0),
            points: Vec::with_capacity(drop_capacity * 2),
        }
    }

    /// Rebuild the staged points: `2i` is the head of drop `i`, `2i + 1` its
    /// tail.
    pub fn stage(&mut self, drops: &[RainDrop]) -> &[LinePoint] {
        self.points.clear();
        self.points.extend(drops.iter().flat_map(|drop| {
            [
                LinePoint::new(drop.position),
                LinePoint::new(drop.position + self.segment),
            ]
        }));
        &self.points
    }

    pub fn staged(&self) -> &[LinePoint] {
        &self.points
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Copy the staged points into `sink`. Never grows the sink.
    pub fn upload(&self, sink: &mut dyn LineVertexSink) -> ViewerResult<()> {
        let capacity = sink.capacity_points();
        if self.points.len() > capacity {
            return Err(resource_error(
                "rain vertex buffer",
                format!(
                    "staged {} points but the buffer holds {}",
                    self.points.len(),
                    capacity
                ),
            ));
        }
        sink.write_points(&self.points)
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ViewerError;
    use crate::weather::DropPhase;

    fn drop_at(position: Vec3) -> RainDrop {
        RainDrop {
            position,
            velocity: Vec3::new(0.0, -100.0, 0.0),
            spawn_delay: 0.0,
            phase: DropPhase::Falling,
        }
    }

    #[test]
    fn test_stage_builds_head_and_tail() {
        let mut stager = GeometryStager::new(2.0, 2);
        let drops = [drop_at(Vec3::new(1.0, 5.0, 3.0)), drop_at(Vec3::ZERO)];
        let points = stager.stage(&drops);
        assert_eq!(points.len(), 4);
        assert_eq!(points[0].position, [1.0, 5.0, 3.0]);
        assert_eq!(points[1].position, [1.0, 7.0, 3.0]);
        assert_eq!(points[3].position, [0.0, 2.0, 0.0]);
    }

    #[test]
    fn test_stage_reuses_storage() {
        let mut stager = GeometryStager::new(2.0, 1);
        stager.stage(&[drop_at(Vec3::ZERO)]);
        stager.stage(&[drop_at(Vec3::ONE)]);
        assert_eq!(stager.point_count(), 2);
        assert_eq!(stager.staged()[0].position, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_upload_fills_sink() {
        let mut stager = GeometryStager::new(2.0, 1);
        stager.stage(&[drop_at(Vec3::ZERO)]);
        let mut sink = VecSink::with_capacity(2);
        stager.upload(&mut sink).unwrap();
        assert_eq!(sink.points().len(), 2);
    }

    #[test]
    fn test_upload_fails_fast_when_too_large() {
        let mut stager = GeometryStager::new(2.0, 2);
        stager.stage(&[drop_at(Vec3::ZERO), drop_at(Vec3::ONE)]);
        let mut sink = VecSink::with_capacity(3);
        let err = stager.upload(&mut sink).unwrap_err();
        assert!(matches!(err, ViewerError::Resource { .. }));
        assert!(sink.points().is_empty());
    }

    #[test]
    fn test_line_point_is_twelve_bytes() {
        assert_eq!(std::mem::size_of::<LinePoint>(), 12);
    }
}
