//! Built-in post-processing backends
//!
//! - Local manipulation (masking, inpainting, zoom crop) on the CPU
//! - Remote generative editing (configuration only, inpainting not available yet)

pub mod local;
pub mod remote;

pub use self::local::{LocalManipulationConfig, LocalManipulationProcessor, LocalMethod, MAX_INPAINT_RADIUS};
pub use self::remote::{RemoteGenerativeConfig, RemoteGenerativeProcessor, RemoteMethod};
