//! Bindings to the threepipe viewer and its orbit controls.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{anyhow, Result};
use glam::Vec3;
use js_sys::{Array, Function, Object, Promise, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{window, HtmlCanvasElement, HtmlElement};

use crate::engine::{
    CameraRig, EngineOptions, EnvironmentOptions, FitMode, LoadOptions, ModelHandle, Plugin,
    RenderEngine, RenderSize, ToneMapping,
};

#[wasm_bindgen(module = "threepipe")]
extern "C" {
    type ThreeViewer;

    #[wasm_bindgen(constructor, catch)]
    fn new(options: &Object) -> Result<ThreeViewer, JsValue>;

    #[wasm_bindgen(method, js_name = getPlugin)]
    fn get_plugin(this: &ThreeViewer, class: &JsValue) -> JsValue;

    #[wasm_bindgen(method, catch)]
    fn load(this: &ThreeViewer, url: &str, options: &Object) -> Result<Promise, JsValue>;

    #[wasm_bindgen(method, catch, js_name = setEnvironmentMap)]
    fn set_environment_map(
        this: &ThreeViewer,
        url: &str,
        options: &Object,
    ) -> Result<Promise, JsValue>;

    #[wasm_bindgen(method, catch, js_name = setRenderSize)]
    fn set_render_size(
        this: &ThreeViewer,
        size: &Object,
        mode: &str,
        pixel_ratio: f64,
    ) -> Result<(), JsValue>;

    #[wasm_bindgen(method, getter)]
    fn canvas(this: &ThreeViewer) -> HtmlCanvasElement;

    #[wasm_bindgen(method, getter)]
    fn container(this: &ThreeViewer) -> HtmlElement;

    #[wasm_bindgen(method, getter, js_name = renderManager)]
    fn render_manager(this: &ThreeViewer) -> JsValue;

    #[wasm_bindgen(method, getter)]
    fn scene(this: &ThreeViewer) -> JsValue;

    #[wasm_bindgen(js_name = LoadingScreenPlugin)]
    static LOADING_SCREEN_PLUGIN: JsValue;

    #[wasm_bindgen(js_name = PickingPlugin)]
    static PICKING_PLUGIN: JsValue;

    #[wasm_bindgen(js_name = ProgressivePlugin)]
    static PROGRESSIVE_PLUGIN: JsValue;

    #[wasm_bindgen(js_name = BaseGroundPlugin)]
    static BASE_GROUND_PLUGIN: JsValue;

    #[wasm_bindgen(js_name = CanvasSnapshotPlugin)]
    static CANVAS_SNAPSHOT_PLUGIN: JsValue;

    #[wasm_bindgen(js_name = TonemapPlugin)]
    static TONEMAP_PLUGIN: JsValue;
}

#[wasm_bindgen(module = "@threepipe/plugin-path-tracing")]
extern "C" {
    #[wasm_bindgen(js_name = ThreeGpuPathTracerPlugin)]
    static GPU_PATH_TRACER_PLUGIN: JsValue;
}

fn plugin_class(plugin: Plugin) -> JsValue {
    let class: &JsValue = match plugin {
        Plugin::LoadingScreen => &*LOADING_SCREEN_PLUGIN,
        Plugin::Picking => &*PICKING_PLUGIN,
        Plugin::Progressive => &*PROGRESSIVE_PLUGIN,
        Plugin::BaseGround => &*BASE_GROUND_PLUGIN,
        Plugin::CanvasSnapshot => &*CANVAS_SNAPSHOT_PLUGIN,
        Plugin::GpuPathTracer => &*GPU_PATH_TRACER_PLUGIN,
        Plugin::Tonemap => &*TONEMAP_PLUGIN,
    };
    class.clone()
}

pub(crate) fn js_err(err: JsValue) -> anyhow::Error {
    match err.as_string() {
        Some(message) => anyhow!(message),
        None => anyhow!("{err:?}"),
    }
}

fn get(target: &JsValue, key: &str) -> Result<JsValue> {
    Reflect::get(target, &JsValue::from_str(key)).map_err(js_err)
}

fn set(target: &JsValue, key: &str, value: impl Into<JsValue>) -> Result<()> {
    Reflect::set(target, &JsValue::from_str(key), &value.into())
        .map(|_| ())
        .map_err(js_err)
}

fn call(target: &JsValue, method: &str, args: &[JsValue]) -> Result<JsValue> {
    let function: Function = get(target, method)?
        .dyn_into()
        .map_err(|_| anyhow!("{method} is not a function"))?;
    let args: Array = args.iter().collect();
    function.apply(target, &args).map_err(js_err)
}

fn object(entries: &[(&str, JsValue)]) -> Result<Object> {
    let object = Object::new();
    for (key, value) in entries {
        set(&object, key, value.clone())?;
    }
    Ok(object)
}

/// threepipe `ThreeViewer` attached to a page canvas.
pub struct ThreepipeEngine {
    viewer: ThreeViewer,
    rig: ThreepipeRig,
    models: RefCell<HashMap<ModelHandle, JsValue>>,
    next_handle: AtomicU64,
}

impl ThreepipeEngine {
    pub fn create(options: &EngineOptions) -> Result<Self> {
        let document = window()
            .and_then(|win| win.document())
            .ok_or_else(|| anyhow!("document not available"))?;
        let canvas = document
            .get_element_by_id(&options.canvas_id)
            .ok_or_else(|| anyhow!("canvas '{}' not found", options.canvas_id))?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| anyhow!("element '{}' is not a canvas", options.canvas_id))?;

        let dropzone = &options.dropzone;
        let extensions: Array = dropzone
            .allowed_extensions
            .iter()
            .map(|ext| JsValue::from_str(ext))
            .collect();
        let add_options = object(&[
            ("disposeSceneObjects", dropzone.dispose_scene_objects.into()),
            ("autoSetEnvironment", dropzone.auto_set_environment.into()),
            ("autoSetBackground", dropzone.auto_set_background.into()),
        ])?;
        let plugins: Array = options.plugins.iter().map(|p| plugin_class(*p)).collect();
        let viewer_options = object(&[
            ("canvas", canvas.into()),
            ("msaa", options.msaa.into()),
            ("renderScale", JsValue::from_str("auto")),
            ("debug", options.debug.into()),
            (
                "dropzone",
                object(&[
                    ("allowedExtensions", extensions.into()),
                    ("addOptions", add_options.into()),
                ])?
                .into(),
            ),
            ("plugins", plugins.into()),
        ])?;

        let viewer = ThreeViewer::new(&viewer_options).map_err(js_err)?;
        let camera = get(&viewer.scene(), "mainCamera")?;
        let controls = get(&camera, "controls")?;
        if controls.is_undefined() || controls.is_null() {
            return Err(anyhow!("main camera has no orbit controls"));
        }
        Ok(Self {
            viewer,
            rig: ThreepipeRig { camera, controls },
            models: RefCell::new(HashMap::new()),
            next_handle: AtomicU64::new(0),
        })
    }

    fn plugin(&self, plugin: Plugin) -> Result<JsValue> {
        let instance = self.viewer.get_plugin(&plugin_class(plugin));
        if instance.is_undefined() || instance.is_null() {
            return Err(anyhow!("plugin {plugin} is not registered"));
        }
        Ok(instance)
    }
}

impl RenderEngine for ThreepipeEngine {
    type Rig = ThreepipeRig;

    fn set_plugin_enabled(&self, plugin: Plugin, enabled: bool) -> Result<()> {
        set(&self.plugin(plugin)?, "enabled", enabled)
    }

    fn set_clear_color(&self, color: u32, alpha: f32) -> Result<()> {
        let renderer = get(&self.viewer.render_manager(), "renderer")?;
        call(
            &renderer,
            "setClearColor",
            &[JsValue::from(color), JsValue::from(alpha)],
        )?;
        call(&renderer, "setClearAlpha", &[JsValue::from(alpha)])?;
        Ok(())
    }

    fn set_canvas_style(&self, property: &str, value: &str) -> Result<()> {
        self.viewer
            .canvas()
            .style()
            .set_property(property, value)
            .map_err(js_err)
    }

    fn set_container_style(&self, property: &str, value: &str) -> Result<()> {
        self.viewer
            .container()
            .style()
            .set_property(property, value)
            .map_err(js_err)
    }

    fn set_tone_mapping(&self, tone_mapping: &ToneMapping) -> Result<()> {
        let plugin = self.plugin(Plugin::Tonemap)?;
        set(&plugin, "toneMapping", tone_mapping.mode.code())?;
        set(&plugin, "exposure", tone_mapping.exposure)
    }

    fn set_render_size(&self, size: RenderSize, fit: FitMode, pixel_ratio: f32) -> Result<()> {
        let size = object(&[
            ("width", size.width.into()),
            ("height", size.height.into()),
        ])?;
        self.viewer
            .set_render_size(&size, fit.as_css(), f64::from(pixel_ratio))
            .map_err(js_err)
    }

    async fn set_environment_map(&self, url: &str, options: EnvironmentOptions) -> Result<()> {
        let options = object(&[("setBackground", options.set_background.into())])?;
        let promise = self
            .viewer
            .set_environment_map(url, &options)
            .map_err(js_err)?;
        JsFuture::from(promise).await.map_err(js_err)?;
        Ok(())
    }

    async fn load(&self, url: &str, options: LoadOptions) -> Result<ModelHandle> {
        let options = object(&[
            ("autoCenter", options.auto_center.into()),
            ("autoScale", options.auto_scale.into()),
            ("disposeSceneObjects", false.into()),
        ])?;
        let promise = self.viewer.load(url, &options).map_err(js_err)?;
        let root = JsFuture::from(promise).await.map_err(js_err)?;
        if root.is_undefined() || root.is_null() {
            return Err(anyhow!("{url} produced no scene objects"));
        }
        let handle = ModelHandle::new(self.next_handle.fetch_add(1, Ordering::Relaxed) + 1);
        self.models.borrow_mut().insert(handle, root);
        Ok(handle)
    }

    fn dispose(&self, handle: ModelHandle) {
        let Some(root) = self.models.borrow_mut().remove(&handle) else {
            log::warn!("dispose requested for unknown model {handle}");
            return;
        };
        if let Err(err) = call(&root, "dispose", &[JsValue::TRUE]) {
            log::warn!("failed to dispose model {handle}: {err}");
        }
    }

    fn camera_rig(&self) -> &ThreepipeRig {
        &self.rig
    }
}

/// Orbit controls of the viewer's main camera.
pub struct ThreepipeRig {
    camera: JsValue,
    controls: JsValue,
}

impl ThreepipeRig {
    /// Registers `callback` for the controls' `start` event, fired when the
    /// user begins orbiting.
    pub fn on_interaction_start(&self, callback: &Function) -> Result<()> {
        call(
            &self.controls,
            "addEventListener",
            &[JsValue::from_str("start"), callback.clone().into()],
        )?;
        Ok(())
    }

    pub fn remove_interaction_listener(&self, callback: &Function) -> Result<()> {
        call(
            &self.controls,
            "removeEventListener",
            &[JsValue::from_str("start"), callback.clone().into()],
        )?;
        Ok(())
    }

    fn set_vector(&self, target: &JsValue, value: Vec3) -> Result<()> {
        call(
            target,
            "set",
            &[value.x.into(), value.y.into(), value.z.into()],
        )?;
        Ok(())
    }
}

impl CameraRig for ThreepipeRig {
    fn set_polar_angle_limits(&self, min: f32, max: f32) -> Result<()> {
        set(&self.controls, "minPolarAngle", min)?;
        set(&self.controls, "maxPolarAngle", max)
    }

    fn set_zoom_enabled(&self, enabled: bool) -> Result<()> {
        set(&self.controls, "enableZoom", enabled)
    }

    fn set_pan_enabled(&self, enabled: bool) -> Result<()> {
        set(&self.controls, "enablePan", enabled)
    }

    fn set_auto_rotate(&self, enabled: bool) -> Result<()> {
        set(&self.controls, "autoRotate", enabled)
    }

    fn set_auto_rotate_speed(&self, speed: f32) -> Result<()> {
        set(&self.controls, "autoRotateSpeed", speed)
    }

    fn set_position(&self, position: Vec3) -> Result<()> {
        self.set_vector(&get(&self.camera, "position")?, position)
    }

    fn set_target(&self, target: Vec3) -> Result<()> {
        self.set_vector(&get(&self.controls, "target")?, target)
    }

    fn update(&self) -> Result<()> {
        call(&self.controls, "update", &[])?;
        Ok(())
    }
}
