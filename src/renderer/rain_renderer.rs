use std::sync::Arc;

use crate::error::{resource_error, ViewerResult};
use crate::renderer::rain_geometry::{LinePoint, LineVertexSink};

/// Pre-sized GPU vertex buffer holding the rain line points.
///
/// Allocated once when rain is switched on; every frame overwrites its
/// start with the staged points through the queue.
pub struct RainBuffer {
    buffer: wgpu::Buffer,
    queue: Arc<wgpu::Queue>,
    capacity: usize,
}

impl RainBuffer {
    pub fn allocate(
        device: &wgpu::Device,
        queue: Arc<wgpu::Queue>,
        points: usize,
    ) -> ViewerResult<Self> {
        let size = (points * std::mem::size_of::<LinePoint>()) as wgpu::BufferAddress;
        if size == 0 {
            return Err(resource_error("rain vertex buffer", "zero-sized buffer requested"));
        }
        let max = device.limits().max_buffer_size;
        if size > max {
            return Err(resource_error(
                "rain vertex buffer",
                format!("{} bytes exceed the device limit of {}", size, max),
            ));
        }

        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Rain Vertex Buffer"),
            size,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(resource_error("rain vertex buffer", error));
        }

        log::info!(
            "[RainBuffer::allocate] {} points ({} KB)",
            points,
            size / 1024
        );
        Ok(Self {
            buffer,
            queue,
            capacity: points,
        })
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }
}

impl LineVertexSink for RainBuffer {
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
        if !points.is_empty() {
            self.queue
                .write_buffer(&self.buffer, 0, bytemuck::cast_slice(points));
        }
        Ok(())
    }
}
