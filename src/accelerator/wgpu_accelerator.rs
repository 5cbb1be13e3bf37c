//! wgpu-backed accelerator runtime.

use super::errors::{AcceleratorError, AcceleratorResult};
use super::{Accelerator, ResidentBuffer};
use log::{debug, warn};
use pollster::FutureExt;
use std::fmt;
use std::sync::Arc;
use std::sync::mpsc;

/// Copies between buffers must be multiples of this many bytes.
const COPY_ALIGNMENT: usize = wgpu::COPY_BUFFER_ALIGNMENT as usize;

fn padded_len(byte_len: usize) -> usize {
    byte_len.div_ceil(COPY_ALIGNMENT).max(1) * COPY_ALIGNMENT
}

#[derive(Clone)]
struct WgpuContext {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
}

/// Accelerator backed by the first adapter wgpu can find.
pub struct WgpuAccelerator {
    context: Option<WgpuContext>,
    adapter_name: String,
}

impl WgpuAccelerator {
    /// Probes for an adapter. A missing adapter leaves the accelerator usable
    /// as a capability query that reports no device present.
    pub fn new() -> Self {
        match Self::request_context().block_on() {
            Ok((context, adapter_name)) => {
                debug!("Using accelerator adapter '{}'", adapter_name);
                Self {
                    context: Some(context),
                    adapter_name,
                }
            }
            Err(e) => {
                warn!("{}", e);
                Self {
                    context: None,
                    adapter_name: String::new(),
                }
            }
        }
    }

    async fn request_context() -> AcceleratorResult<(WgpuContext, String)> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions::default())
            .await
            .ok_or_else(|| AcceleratorError::DeviceNotAvailable {
                message: "no adapter found".to_string(),
            })?;
        let adapter_name = adapter.get_info().name;
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor::default(), None)
            .await
            .map_err(|e| AcceleratorError::DeviceNotAvailable {
                message: e.to_string(),
            })?;

        Ok((
            WgpuContext {
                device: Arc::new(device),
                queue: Arc::new(queue),
            },
            adapter_name,
        ))
    }

    /// Name of the adapter in use, empty when none was found.
    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }
}

impl Default for WgpuAccelerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Accelerator for WgpuAccelerator {
    fn name(&self) -> &str {
        "wgpu"
    }

    fn compiled_in(&self) -> bool {
        true
    }

    fn device_present(&self) -> bool {
        self.context.is_some()
    }

    fn allocate(&self, byte_len: usize) -> AcceleratorResult<Box<dyn ResidentBuffer>> {
        let context = self
            .context
            .as_ref()
            .ok_or_else(|| AcceleratorError::DeviceNotAvailable {
                message: "no adapter found".to_string(),
            })?;

        // wgpu zero-initialises new buffers.
        let buffer = context.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Resident Tensor Buffer"),
            size: padded_len(byte_len) as u64,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Ok(Box::new(WgpuBuffer {
            context: context.clone(),
            buffer,
            byte_len,
        }))
    }
}

struct WgpuBuffer {
    context: WgpuContext,
    buffer: wgpu::Buffer,
    byte_len: usize,
}

impl fmt::Debug for WgpuBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WgpuBuffer")
            .field("byte_len", &self.byte_len)
            .field("padded_len", &self.buffer.size())
            .finish()
    }
}

impl ResidentBuffer for WgpuBuffer {
    fn byte_len(&self) -> usize {
        self.byte_len
    }

    fn read_back(&self) -> AcceleratorResult<Vec<u8>> {
        if self.byte_len == 0 {
            return Ok(Vec::new());
        }

        let device = &self.context.device;
        let size = self.buffer.size();
        let staging_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Staging Buffer"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
        encoder.copy_buffer_to_buffer(&self.buffer, 0, &staging_buffer, 0, size);
        self.context.queue.submit(Some(encoder.finish()));

        let slice = staging_buffer.slice(..);
        let (sender, receiver) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        device.poll(wgpu::Maintain::Wait);

        receiver
            .recv()
            .map_err(|e| AcceleratorError::ReadBackFailed {
                message: e.to_string(),
            })?
            .map_err(|e| AcceleratorError::ReadBackFailed {
                message: e.to_string(),
            })?;

        let data = slice.get_mapped_range();
        let bytes = data[..self.byte_len].to_vec();
        drop(data);
        staging_buffer.unmap();

        Ok(bytes)
    }

    fn write(&mut self, bytes: &[u8]) -> AcceleratorResult<()> {
        if bytes.len() != self.byte_len {
            return Err(AcceleratorError::BufferSizeMismatch {
                expected: self.byte_len,
                actual: bytes.len(),
            });
        }
        if bytes.is_empty() {
            return Ok(());
        }

        let mut padded = bytes.to_vec();
        padded.resize(padded_len(bytes.len()), 0);
        self.context.queue.write_buffer(&self.buffer, 0, &padded);
        self.context
            .queue
            .submit(std::iter::empty::<wgpu::CommandBuffer>());
        self.context.device.poll(wgpu::Maintain::Wait);
        Ok(())
    }
}
