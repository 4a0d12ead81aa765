//! Engine implementation that performs no rendering.
//!
//! Records every configuration call and validates assets the way the browser
//! engine would reject them, so sessions can run from the command line and in
//! tests without a GPU or a network.

use std::collections::BTreeMap;
use std::fs;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{anyhow, bail, Context, Result};
use glam::Vec3;
use log::{debug, warn};
use parking_lot::RwLock;

use crate::asset::{parse_glb_header, validate_gltf_json, AssetKind, AssetLocation};
use crate::engine::{
    CameraRig, EngineOptions, EnvironmentOptions, FitMode, LoadOptions, ModelHandle, Plugin,
    RenderEngine, RenderSize, ToneMapping,
};

/// Model currently held in the headless scene.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedModel {
    pub handle: ModelHandle,
    pub url: String,
    pub kind: AssetKind,
    pub options: LoadOptions,
}

/// Everything the headless engine has been told so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineSnapshot {
    pub canvas_id: String,
    pub plugins: Vec<Plugin>,
    pub disabled_plugins: Vec<Plugin>,
    pub clear_color: Option<(u32, f32)>,
    pub canvas_style: BTreeMap<String, String>,
    pub container_style: BTreeMap<String, String>,
    pub tone_mapping: Option<ToneMapping>,
    pub render_size: Option<(RenderSize, FitMode, f32)>,
    pub environment_map: Option<String>,
    pub environment_as_background: bool,
    pub models: Vec<LoadedModel>,
    pub disposed: Vec<ModelHandle>,
}

#[derive(Debug)]
pub struct HeadlessEngine {
    state: RwLock<EngineSnapshot>,
    rig: HeadlessRig,
    next_handle: AtomicU64,
}

impl HeadlessEngine {
    /// Builds the engine. Fails like a browser engine would when there is no
    /// canvas to attach to.
    pub fn create(options: &EngineOptions) -> Result<Self> {
        if options.canvas_id.trim().is_empty() {
            bail!("canvas id must not be empty");
        }
        if options.plugins.is_empty() {
            bail!("engine requires at least one plugin");
        }
        debug!(
            "headless engine on '{}' with {} plugin(s)",
            options.canvas_id,
            options.plugins.len()
        );
        Ok(Self {
            state: RwLock::new(EngineSnapshot {
                canvas_id: options.canvas_id.clone(),
                plugins: options.plugins.clone(),
                ..EngineSnapshot::default()
            }),
            rig: HeadlessRig::default(),
            next_handle: AtomicU64::new(0),
        })
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        self.state.read().clone()
    }

    /// Handles of models still present in the scene.
    pub fn live_models(&self) -> Vec<ModelHandle> {
        self.state.read().models.iter().map(|model| model.handle).collect()
    }

    fn read_local(path: &str) -> Result<Vec<u8>> {
        fs::read(path).with_context(|| format!("unable to read {path}"))
    }
}

impl RenderEngine for HeadlessEngine {
    type Rig = HeadlessRig;

    fn set_plugin_enabled(&self, plugin: Plugin, enabled: bool) -> Result<()> {
        let mut state = self.state.write();
        if !state.plugins.contains(&plugin) {
            bail!("plugin {plugin} was not registered with the engine");
        }
        state.disabled_plugins.retain(|disabled| *disabled != plugin);
        if !enabled {
            state.disabled_plugins.push(plugin);
        }
        Ok(())
    }

    fn set_clear_color(&self, color: u32, alpha: f32) -> Result<()> {
        if !(0.0..=1.0).contains(&alpha) {
            bail!("clear alpha {alpha} is outside 0..=1");
        }
        self.state.write().clear_color = Some((color & 0xff_ffff, alpha));
        Ok(())
    }

    fn set_canvas_style(&self, property: &str, value: &str) -> Result<()> {
        self.state
            .write()
            .canvas_style
            .insert(property.to_string(), value.to_string());
        Ok(())
    }

    fn set_container_style(&self, property: &str, value: &str) -> Result<()> {
        self.state
            .write()
            .container_style
            .insert(property.to_string(), value.to_string());
        Ok(())
    }

    fn set_tone_mapping(&self, tone_mapping: &ToneMapping) -> Result<()> {
        let mut state = self.state.write();
        if !state.plugins.contains(&Plugin::Tonemap) {
            bail!("tone mapping requires {}", Plugin::Tonemap);
        }
        state.tone_mapping = Some(*tone_mapping);
        Ok(())
    }

    fn set_render_size(&self, size: RenderSize, fit: FitMode, pixel_ratio: f32) -> Result<()> {
        self.state.write().render_size = Some((size, fit, pixel_ratio));
        Ok(())
    }

    async fn set_environment_map(&self, url: &str, options: EnvironmentOptions) -> Result<()> {
        let kind =
            AssetKind::from_url(url).ok_or_else(|| anyhow!("unsupported asset type: {url}"))?;
        if !kind.is_environment() {
            bail!("{url} cannot be used as an environment map");
        }
        if let AssetLocation::Local(path) = AssetLocation::parse(url)? {
            fs::metadata(path).with_context(|| format!("environment map {path} not found"))?;
        }
        let mut state = self.state.write();
        state.environment_map = Some(url.to_string());
        state.environment_as_background = options.set_background;
        Ok(())
    }

    async fn load(&self, url: &str, options: LoadOptions) -> Result<ModelHandle> {
        let kind =
            AssetKind::from_url(url).ok_or_else(|| anyhow!("unsupported asset type: {url}"))?;
        if !kind.is_model() {
            bail!("{url} is not a model asset");
        }
        match AssetLocation::parse(url)? {
            AssetLocation::Remote(_) => debug!("accepting remote model {url} without fetching"),
            AssetLocation::Local(path) => {
                let data = Self::read_local(path)?;
                if kind == AssetKind::Glb {
                    parse_glb_header(&data).with_context(|| format!("{path} is not a GLB"))?;
                } else {
                    validate_gltf_json(&data).with_context(|| format!("{path} is not glTF"))?;
                }
            }
        }

        let handle = ModelHandle::new(self.next_handle.fetch_add(1, Ordering::Relaxed) + 1);
        self.state.write().models.push(LoadedModel {
            handle,
            url: url.to_string(),
            kind,
            options,
        });
        Ok(handle)
    }

    fn dispose(&self, handle: ModelHandle) {
        let mut state = self.state.write();
        let before = state.models.len();
        state.models.retain(|model| model.handle != handle);
        if state.models.len() == before {
            warn!("dispose requested for unknown model {handle}");
            return;
        }
        state.disposed.push(handle);
    }

    fn camera_rig(&self) -> &HeadlessRig {
        &self.rig
    }
}

/// Orbit control values applied to the headless camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigSnapshot {
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    pub zoom_enabled: bool,
    pub pan_enabled: bool,
    pub auto_rotate: bool,
    pub auto_rotate_speed: f32,
    pub position: Vec3,
    pub target: Vec3,
    pub updates: u32,
}

impl Default for RigSnapshot {
    fn default() -> Self {
        Self {
            min_polar_angle: 0.0,
            max_polar_angle: std::f32::consts::PI,
            zoom_enabled: true,
            pan_enabled: true,
            auto_rotate: false,
            auto_rotate_speed: 2.0,
            position: Vec3::new(0.0, 0.0, 5.0),
            target: Vec3::ZERO,
            updates: 0,
        }
    }
}

impl RigSnapshot {
    /// Distance between the camera and its orbit target.
    pub fn orbit_radius(&self) -> f32 {
        self.position.distance(self.target)
    }
}

#[derive(Debug, Default)]
pub struct HeadlessRig {
    state: RwLock<RigSnapshot>,
}

impl HeadlessRig {
    pub fn snapshot(&self) -> RigSnapshot {
        *self.state.read()
    }
}

impl CameraRig for HeadlessRig {
    fn set_polar_angle_limits(&self, min: f32, max: f32) -> Result<()> {
        if min > max {
            bail!("polar angle limits are inverted ({min} > {max})");
        }
        let mut state = self.state.write();
        state.min_polar_angle = min;
        state.max_polar_angle = max;
        Ok(())
    }

    fn set_zoom_enabled(&self, enabled: bool) -> Result<()> {
        self.state.write().zoom_enabled = enabled;
        Ok(())
    }

    fn set_pan_enabled(&self, enabled: bool) -> Result<()> {
        self.state.write().pan_enabled = enabled;
        Ok(())
    }

    fn set_auto_rotate(&self, enabled: bool) -> Result<()> {
        self.state.write().auto_rotate = enabled;
        Ok(())
    }

    fn set_auto_rotate_speed(&self, speed: f32) -> Result<()> {
        self.state.write().auto_rotate_speed = speed;
        Ok(())
    }

    fn set_position(&self, position: Vec3) -> Result<()> {
        self.state.write().position = position;
        Ok(())
    }

    fn set_target(&self, target: Vec3) -> Result<()> {
        self.state.write().target = target;
        Ok(())
    }

    fn update(&self) -> Result<()> {
        self.state.write().updates += 1;
        Ok(())
    }
}
