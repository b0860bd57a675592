//! Error types for viewer startup and shader builds.
//!
//! [`ViewerError`] covers everything that stops the viewer before the first
//! frame. [`ShaderError`] describes why a program failed to build; it is
//! logged by [`ShaderProgram`](crate::ShaderProgram) and never escapes it.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal initialization failures. The binary exits with status 1 on any of these.
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("failed to create event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("failed to create GPU surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),

    #[error("failed to create GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("surface reports no supported formats")]
    NoSurfaceFormat,
}

/// Why a shader stage or program could not be built.
#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("failed to read {stage} shader {}: {source}", path.display())]
    Read {
        stage: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{stage} shader {} failed to compile\n{log}", path.display())]
    Compile {
        stage: &'static str,
        path: PathBuf,
        log: String,
    },

    #[error("shader program failed to link: {0}")]
    Link(String),

    #[error("GPU rejected shader program: {0}")]
    Device(String),
}
