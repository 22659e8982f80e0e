//! WGPU Device Context
//!
//! Thin bundle of the device/queue pair every resource-creating call needs.
//! Window/surface setup is a collaborator concern and lives outside this
//! crate; tests and headless users construct this from whatever adapter they
//! obtained.

/// The GPU device and its submission queue.
#[derive(Clone)]
pub struct WgpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl WgpuContext {
    #[must_use]
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self { device, queue }
    }
}
