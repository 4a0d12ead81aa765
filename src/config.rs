use std::time::Duration;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::engine::{FitMode, Plugin, RenderSize, ToneMapping};
use crate::error::{Result, ViewerError};
use crate::registry::ModelRegistry;

const HEART_MODEL_URL: &str =
    "https://cdn.shopify.com/3d/models/6bce9a7ae62786dd/new_gold_heart_for_website.glb";
const STUDIO_HDR_URL: &str =
    "https://dl.polyhaven.org/file/ph-assets/HDRIs/hdr/1k/brown_photostudio_02_1k.hdr";
const MINIMAL_MODEL_URL: &str = "https://cdn.example.com/models/minimal_heart.glb";

/// How the canvas is cleared behind the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundMode {
    /// Zero alpha clear so the page shows through.
    Transparent,
    /// Solid white clear.
    Opaque,
}

impl BackgroundMode {
    /// Clear color and alpha applied to the renderer.
    pub fn clear_color(self) -> (u32, f32) {
        match self {
            Self::Transparent => (0x000000, 0.0),
            Self::Opaque => (0xffffff, 1.0),
        }
    }

    /// CSS background of the canvas element.
    pub fn css_background(self) -> &'static str {
        match self {
            Self::Transparent => "transparent",
            Self::Opaque => "#ffffff",
        }
    }
}

/// Model shown once the engine is ready.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum ModelSource {
    Registry { key: String },
    Url { url: String, label: String },
}

/// Fixed orbit camera parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: Vec3,
    pub target: Vec3,
    /// Polar angle the orbit is locked to, in degrees from the up axis.
    pub polar_angle_deg: f32,
    pub auto_rotate_speed: f32,
    pub resume_delay_ms: u64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Vec3::new(-0.1, 0.0, 1.2),
            target: Vec3::new(0.0, -1.2, 0.0),
            polar_angle_deg: 90.0,
            auto_rotate_speed: 1.5,
            resume_delay_ms: 1000,
        }
    }
}

impl CameraConfig {
    pub fn polar_angle(&self) -> f32 {
        self.polar_angle_deg.to_radians()
    }

    pub fn resume_delay(&self) -> Duration {
        Duration::from_millis(self.resume_delay_ms)
    }
}

/// Everything that distinguishes one viewer embedding from another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub canvas_id: String,
    pub background: BackgroundMode,
    pub environment_map: Option<String>,
    pub tone_mapping: ToneMapping,
    pub disabled_plugins: Vec<Plugin>,
    pub render_size: RenderSize,
    pub fit_mode: FitMode,
    pub pixel_ratio: f32,
    pub camera: CameraConfig,
    pub auto_center: bool,
    pub auto_scale: bool,
    pub initial_model: ModelSource,
    pub registry: ModelRegistry,
    /// Whether command messages from the host page are honoured.
    pub accept_host_messages: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self::transparent()
    }
}

impl ViewerConfig {
    /// Product page embed: transparent canvas over the page background.
    pub fn transparent() -> Self {
        Self {
            canvas_id: "webgi-canvas".to_string(),
            background: BackgroundMode::Transparent,
            environment_map: Some(STUDIO_HDR_URL.to_string()),
            tone_mapping: ToneMapping::default(),
            disabled_plugins: vec![Plugin::GpuPathTracer, Plugin::BaseGround],
            render_size: RenderSize::new(2000, 1000),
            fit_mode: FitMode::Contain,
            pixel_ratio: 1.0,
            camera: CameraConfig::default(),
            auto_center: true,
            auto_scale: true,
            initial_model: ModelSource::Url {
                url: HEART_MODEL_URL.to_string(),
                label: "heart".to_string(),
            },
            registry: ModelRegistry::new(),
            accept_host_messages: false,
        }
    }

    /// Standalone embed on a white canvas with a square frame.
    pub fn opaque() -> Self {
        Self {
            background: BackgroundMode::Opaque,
            render_size: RenderSize::new(1200, 1200),
            camera: CameraConfig {
                position: Vec3::new(0.0, 0.0, 1.5),
                target: Vec3::ZERO,
                ..CameraConfig::default()
            },
            ..Self::transparent()
        }
    }

    /// Configurator embed whose model can be swapped by the host page.
    pub fn switchable() -> Self {
        Self {
            initial_model: ModelSource::Registry {
                key: "loving".to_string(),
            },
            registry: ModelRegistry::new()
                .with_model("loving", HEART_MODEL_URL)
                .with_model("minimal", MINIMAL_MODEL_URL),
            accept_host_messages: true,
            ..Self::transparent()
        }
    }

    /// Looks up a preset by name.
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "transparent" => Some(Self::transparent()),
            "opaque" => Some(Self::opaque()),
            "switchable" => Some(Self::switchable()),
            _ => None,
        }
    }

    /// Parses and validates a JSON configuration. Missing fields take the
    /// values of the transparent preset.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if let ModelSource::Registry { key } = &self.initial_model {
            if !self.registry.contains(key) {
                return Err(ViewerError::InvalidConfig(format!(
                    "initial model '{key}' is not in the registry"
                )));
            }
        }
        if self.render_size.width == 0 || self.render_size.height == 0 {
            return Err(ViewerError::InvalidConfig(format!(
                "render size must be non-zero, got {}x{}",
                self.render_size.width, self.render_size.height
            )));
        }
        if self.pixel_ratio.is_nan() || self.pixel_ratio <= 0.0 {
            return Err(ViewerError::InvalidConfig(format!(
                "pixel ratio must be positive, got {}",
                self.pixel_ratio
            )));
        }
        if self.camera.resume_delay_ms == 0 {
            return Err(ViewerError::InvalidConfig(
                "auto-rotate resume delay must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolves the initial model to `(url, label)`.
    pub fn initial_model_url(&self) -> Option<(&str, &str)> {
        match &self.initial_model {
            ModelSource::Registry { key } => self.registry.get(key).map(|url| (url, key.as_str())),
            ModelSource::Url { url, label } => Some((url.as_str(), label.as_str())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid() {
        for name in ["transparent", "opaque", "switchable"] {
            let config = ViewerConfig::preset(name).unwrap();
            config.validate().unwrap();
        }
        assert!(ViewerConfig::preset("neon").is_none());
    }

    #[test]
    fn switchable_starts_from_registry() {
        let config = ViewerConfig::switchable();
        let (url, label) = config.initial_model_url().unwrap();
        assert_eq!(label, "loving");
        assert_eq!(url, HEART_MODEL_URL);
        assert!(config.accept_host_messages);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config = ViewerConfig::from_json(
            r#"{
                "background": "opaque",
                "camera": { "auto_rotate_speed": 3.0, "position": [0.0, 0.5, 2.0] },
                "initial_model": { "source": "url", "url": "model.glb", "label": "local" }
            }"#,
        )
        .unwrap();
        assert_eq!(config.background, BackgroundMode::Opaque);
        assert_eq!(config.camera.auto_rotate_speed, 3.0);
        assert_eq!(config.camera.position, Vec3::new(0.0, 0.5, 2.0));
        assert_eq!(config.camera.resume_delay_ms, 1000);
        assert_eq!(config.render_size, RenderSize::new(2000, 1000));
        assert_eq!(config.initial_model_url(), Some(("model.glb", "local")));
    }

    #[test]
    fn rejects_unknown_initial_key() {
        let err = ViewerConfig::from_json(
            r#"{ "initial_model": { "source": "registry", "key": "bold" } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ViewerError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_degenerate_render_settings() {
        let mut config = ViewerConfig::opaque();
        config.render_size = RenderSize::new(0, 100);
        assert!(config.validate().is_err());
        let mut config = ViewerConfig::opaque();
        config.pixel_ratio = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn polar_angle_is_horizontal_ring() {
        let camera = CameraConfig::default();
        assert!((camera.polar_angle() - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
        assert_eq!(camera.resume_delay(), Duration::from_millis(1000));
    }
}
