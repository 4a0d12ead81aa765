use anyhow::Result;

use crate::config::ViewerConfig;
use crate::engine::{CameraRig, RenderEngine};

/// CSS applied to the container and canvas so the canvas stays centered.
pub const CONTAINER_LAYOUT: [(&str, &str); 1] = [("position", "relative")];
pub const CANVAS_LAYOUT: [(&str, &str); 4] = [
    ("position", "absolute"),
    ("top", "50%"),
    ("left", "50%"),
    ("transform", "translate(-50%, -50%)"),
];

/// Applies the fixed camera and layout configuration.
///
/// Runs again after every model swap. `auto_rotate` carries the debounce
/// state so a re-run keeps a paused orbit paused.
pub fn apply_camera_setup<E: RenderEngine>(
    engine: &E,
    config: &ViewerConfig,
    auto_rotate: bool,
) -> Result<()> {
    let rig = engine.camera_rig();
    let polar = config.camera.polar_angle();
    rig.set_polar_angle_limits(polar, polar)?;
    rig.set_zoom_enabled(false)?;
    rig.set_pan_enabled(false)?;

    engine.set_render_size(config.render_size, config.fit_mode, config.pixel_ratio)?;
    for (property, value) in CONTAINER_LAYOUT {
        engine.set_container_style(property, value)?;
    }
    for (property, value) in CANVAS_LAYOUT {
        engine.set_canvas_style(property, value)?;
    }

    rig.set_auto_rotate(auto_rotate)?;
    rig.set_auto_rotate_speed(config.camera.auto_rotate_speed)?;

    rig.set_position(config.camera.position)?;
    rig.set_target(config.camera.target)?;
    rig.update()
}
