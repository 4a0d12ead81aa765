//! Interfaces to the external render engine and its orbit camera rig.
//!
//! The session never renders anything itself. Everything visual goes through
//! these traits so the same control flow drives the browser viewer and the
//! headless engine used by the CLI and the tests.

use std::fmt;

use anyhow::Result;
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::asset::ALLOWED_EXTENSIONS;

/// Engine plugins the viewer knows how to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Plugin {
    LoadingScreen,
    Picking,
    Progressive,
    BaseGround,
    CanvasSnapshot,
    GpuPathTracer,
    Tonemap,
}

impl Plugin {
    /// Plugin set every engine is constructed with.
    pub const DEFAULT_SET: [Plugin; 7] = [
        Plugin::LoadingScreen,
        Plugin::Picking,
        Plugin::Progressive,
        Plugin::BaseGround,
        Plugin::CanvasSnapshot,
        Plugin::GpuPathTracer,
        Plugin::Tonemap,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::LoadingScreen => "LoadingScreenPlugin",
            Self::Picking => "PickingPlugin",
            Self::Progressive => "ProgressivePlugin",
            Self::BaseGround => "BaseGroundPlugin",
            Self::CanvasSnapshot => "CanvasSnapshotPlugin",
            Self::GpuPathTracer => "ThreeGpuPathTracerPlugin",
            Self::Tonemap => "TonemapPlugin",
        }
    }
}

impl fmt::Display for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Options for dropping files onto the canvas.
///
/// Dropped files are added next to the session's model rather than replacing
/// it; the session alone disposes what it installed.
#[derive(Debug, Clone, PartialEq)]
pub struct DropzoneOptions {
    pub allowed_extensions: Vec<String>,
    pub dispose_scene_objects: bool,
    pub auto_set_environment: bool,
    pub auto_set_background: bool,
}

impl Default for DropzoneOptions {
    fn default() -> Self {
        Self {
            allowed_extensions: ALLOWED_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
            dispose_scene_objects: false,
            auto_set_environment: true,
            auto_set_background: false,
        }
    }
}

/// Construction options handed to the engine factory.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOptions {
    pub canvas_id: String,
    pub msaa: bool,
    pub debug: bool,
    pub plugins: Vec<Plugin>,
    pub dropzone: DropzoneOptions,
}

impl EngineOptions {
    pub fn for_canvas(canvas_id: impl Into<String>) -> Self {
        Self {
            canvas_id: canvas_id.into(),
            msaa: false,
            debug: false,
            plugins: Plugin::DEFAULT_SET.to_vec(),
            dropzone: DropzoneOptions::default(),
        }
    }
}

/// Options for a model load.
///
/// Engines must not clear other scene objects while loading. The session
/// disposes the model being replaced through its handle, which keeps a slow
/// stale load from wiping a newer model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    pub auto_center: bool,
    pub auto_scale: bool,
}

/// Options for installing an environment map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvironmentOptions {
    pub set_background: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ToneMappingMode {
    None,
    Linear,
    Reinhard,
    Cineon,
    AcesFilmic,
}

impl ToneMappingMode {
    /// Numeric constant understood by three.js based engines.
    pub fn code(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Linear => 1,
            Self::Reinhard => 2,
            Self::Cineon => 3,
            Self::AcesFilmic => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToneMapping {
    pub mode: ToneMappingMode,
    pub exposure: f32,
}

impl Default for ToneMapping {
    fn default() -> Self {
        Self {
            mode: ToneMappingMode::Linear,
            exposure: 1.0,
        }
    }
}

/// Drawing buffer dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderSize {
    pub width: u32,
    pub height: u32,
}

impl RenderSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// How the drawing buffer fits into the canvas element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    Contain,
    Cover,
    Fill,
    ScaleDown,
    None,
}

impl FitMode {
    pub fn as_css(self) -> &'static str {
        match self {
            Self::Contain => "contain",
            Self::Cover => "cover",
            Self::Fill => "fill",
            Self::ScaleDown => "scale-down",
            Self::None => "none",
        }
    }
}

/// Opaque handle to the scene objects produced by one model load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelHandle(u64);

impl ModelHandle {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Imperative configuration surface of the external viewer.
///
/// Methods take `&self`; implementations keep their own interior state so a
/// load can be in flight while another request configures the engine.
#[allow(async_fn_in_trait)]
pub trait RenderEngine {
    type Rig: CameraRig;

    fn set_plugin_enabled(&self, plugin: Plugin, enabled: bool) -> Result<()>;

    fn set_clear_color(&self, color: u32, alpha: f32) -> Result<()>;

    fn set_canvas_style(&self, property: &str, value: &str) -> Result<()>;

    fn set_container_style(&self, property: &str, value: &str) -> Result<()>;

    fn set_tone_mapping(&self, tone_mapping: &ToneMapping) -> Result<()>;

    fn set_render_size(&self, size: RenderSize, fit: FitMode, pixel_ratio: f32) -> Result<()>;

    async fn set_environment_map(&self, url: &str, options: EnvironmentOptions) -> Result<()>;

    /// Loads the asset at `url` and adds its scene objects.
    async fn load(&self, url: &str, options: LoadOptions) -> Result<ModelHandle>;

    /// Removes and frees the scene objects behind `handle`.
    fn dispose(&self, handle: ModelHandle);

    fn camera_rig(&self) -> &Self::Rig;
}

/// Orbit controls attached to the engine's main camera.
pub trait CameraRig {
    fn set_polar_angle_limits(&self, min: f32, max: f32) -> Result<()>;

    fn set_zoom_enabled(&self, enabled: bool) -> Result<()>;

    fn set_pan_enabled(&self, enabled: bool) -> Result<()>;

    fn set_auto_rotate(&self, enabled: bool) -> Result<()>;

    fn set_auto_rotate_speed(&self, speed: f32) -> Result<()>;

    fn set_position(&self, position: Vec3) -> Result<()>;

    fn set_target(&self, target: Vec3) -> Result<()>;

    /// Commits pending camera changes.
    fn update(&self) -> Result<()>;
}
