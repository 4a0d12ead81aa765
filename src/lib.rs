//! Session controller for an embeddable 3D product showcase viewer.
//!
//! The crate owns the control flow around an external render engine:
//! construction, background and environment setup, model loading and
//! switching, the fixed orbit camera and its auto-rotate debounce, and the
//! command messages a host page can post. Rendering itself stays behind the
//! [`RenderEngine`] trait so the same session drives the browser viewer and
//! the headless engine used by the command line tool and the tests.

pub mod asset;
pub mod autorotate;
pub mod camera;
pub mod config;
pub mod engine;
pub mod error;
#[cfg(not(target_arch = "wasm32"))]
pub mod headless;
pub mod message;
pub mod registry;
pub mod session;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use asset::{AssetKind, ALLOWED_EXTENSIONS};
pub use autorotate::{AutoRotateDebounce, ResumeTicket, RotationState};
pub use config::{BackgroundMode, CameraConfig, ModelSource, ViewerConfig};
pub use engine::{CameraRig, EngineOptions, ModelHandle, Plugin, RenderEngine};
pub use error::ViewerError;
#[cfg(not(target_arch = "wasm32"))]
pub use headless::{EngineSnapshot, HeadlessEngine, RigSnapshot};
pub use message::HostCommand;
pub use registry::ModelRegistry;
pub use session::{LoadOutcome, SessionManager, SessionState};
