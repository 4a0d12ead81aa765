//! Viewer session: owns the engine, the model registry and the current model.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use log::{debug, error, info, warn};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use crate::autorotate::{AutoRotateDebounce, ResumeTicket, RotationState};
use crate::camera::apply_camera_setup;
use crate::config::ViewerConfig;
use crate::engine::{
    CameraRig, EngineOptions, EnvironmentOptions, LoadOptions, ModelHandle, RenderEngine,
};
use crate::error::{Result, ViewerError};
use crate::message::HostCommand;

/// Snapshot of what the session is currently showing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Registry key or free-form label of the installed model.
    pub current_model: Option<String>,
    pub current_handle: Option<ModelHandle>,
}

/// Result of a load that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The model is now current.
    Installed { label: String, handle: ModelHandle },
    /// A request issued later was installed first; this result was disposed.
    Superseded { label: String },
}

#[derive(Debug)]
struct LoadRequest {
    id: u64,
    url: String,
    label: String,
}

#[derive(Debug, Default)]
struct Installed {
    state: SessionState,
    request: u64,
}

/// Drives one viewer embedding from construction to teardown.
///
/// Every method takes `&self`. Locks are released before any `.await`, so
/// a switch request may start while an earlier load is still in flight.
/// Requests are numbered when issued and a result is only installed if no
/// later-issued request has been installed already.
pub struct SessionManager<E: RenderEngine> {
    engine: E,
    config: ViewerConfig,
    installed: RwLock<Installed>,
    next_request: AtomicU64,
    debounce: Mutex<AutoRotateDebounce>,
}

impl<E: RenderEngine> SessionManager<E> {
    /// Builds the engine and brings the view up.
    ///
    /// Only a failure to construct the engine (or an invalid configuration)
    /// aborts. Environment map and initial model failures are logged and the
    /// session starts without them.
    pub async fn initialize<F>(config: ViewerConfig, construct: F) -> Result<Self>
    where
        F: FnOnce(&EngineOptions) -> anyhow::Result<E>,
    {
        config.validate()?;
        let options = EngineOptions::for_canvas(config.canvas_id.clone());
        let engine = construct(&options).map_err(|err| ViewerError::EngineInit(err.into()))?;
        info!(
            "Render engine ready on '{}' ({} plugins)",
            options.canvas_id,
            options.plugins.len()
        );

        let session = Self {
            debounce: Mutex::new(AutoRotateDebounce::new(config.camera.resume_delay())),
            engine,
            config,
            installed: RwLock::new(Installed::default()),
            next_request: AtomicU64::new(0),
        };

        session.configure_engine()?;
        session.install_environment().await;
        session
            .engine
            .set_tone_mapping(&session.config.tone_mapping)
            .map_err(ViewerError::engine)?;

        if let Some((url, label)) = session.config.initial_model_url() {
            let request = session.issue(url, label);
            // failures are already logged; the view starts empty
            let _ = session.run_load(request, false).await;
        }
        session.apply_camera()?;
        Ok(session)
    }

    fn configure_engine(&self) -> Result<()> {
        for plugin in &self.config.disabled_plugins {
            self.engine
                .set_plugin_enabled(*plugin, false)
                .map_err(ViewerError::engine)?;
            debug!("Disabled {plugin}");
        }
        let background = self.config.background;
        let (color, alpha) = background.clear_color();
        self.engine
            .set_clear_color(color, alpha)
            .map_err(ViewerError::engine)?;
        self.engine
            .set_canvas_style("background", background.css_background())
            .map_err(ViewerError::engine)?;
        Ok(())
    }

    async fn install_environment(&self) {
        let Some(url) = self.config.environment_map.as_deref() else {
            return;
        };
        let options = EnvironmentOptions {
            set_background: false,
        };
        match self.engine.set_environment_map(url, options).await {
            Ok(()) => info!("Environment map installed from {url}"),
            Err(err) => warn!("{}", ViewerError::asset_load(url, err)),
        }
    }

    fn apply_camera(&self) -> Result<()> {
        let rotating = self.debounce.lock().is_rotating();
        apply_camera_setup(&self.engine, &self.config, rotating).map_err(ViewerError::engine)
    }

    fn issue(&self, url: &str, label: &str) -> LoadRequest {
        LoadRequest {
            id: self.next_request.fetch_add(1, Ordering::AcqRel) + 1,
            url: url.to_string(),
            label: label.to_string(),
        }
    }

    fn resolve(&self, key: &str) -> Result<LoadRequest> {
        match self.config.registry.get(key) {
            Some(url) => Ok(self.issue(url, key)),
            None => {
                let err = ViewerError::UnknownModelKey(key.to_string());
                warn!("{err}");
                Err(err)
            }
        }
    }

    fn start_load(
        &self,
        request: Result<LoadRequest>,
    ) -> impl Future<Output = Result<LoadOutcome>> + '_ {
        async move { self.run_load(request?, true).await }
    }

    async fn run_load(&self, request: LoadRequest, reframe: bool) -> Result<LoadOutcome> {
        let options = LoadOptions {
            auto_center: self.config.auto_center,
            auto_scale: self.config.auto_scale,
        };
        info!("Loading '{}' from {}", request.label, request.url);
        let handle = match self.engine.load(&request.url, options).await {
            Ok(handle) => handle,
            Err(err) => {
                let err = ViewerError::asset_load(&request.url, err);
                error!("{err}");
                return Err(err);
            }
        };

        let previous = {
            let mut installed = self.installed.write();
            if request.id <= installed.request {
                None
            } else {
                installed.request = request.id;
                installed.state.current_model = Some(request.label.clone());
                Some(installed.state.current_handle.replace(handle))
            }
        };
        let Some(previous) = previous else {
            debug!(
                "Discarding '{}' ({handle}); a newer request was installed",
                request.label
            );
            self.engine.dispose(handle);
            return Ok(LoadOutcome::Superseded {
                label: request.label,
            });
        };
        if let Some(previous) = previous {
            self.engine.dispose(previous);
        }
        info!("Model '{}' is now current ({handle})", request.label);

        if reframe {
            self.apply_camera()?;
        }
        Ok(LoadOutcome::Installed {
            label: request.label,
            handle,
        })
    }

    /// Switches to the registry model stored under `key`.
    ///
    /// The request is issued when this is called, not when the future is
    /// first polled.
    pub fn switch_model(&self, key: &str) -> impl Future<Output = Result<LoadOutcome>> + '_ {
        self.start_load(self.resolve(key))
    }

    /// Loads `url` directly, recording `label` as the current model.
    pub fn load_model_from_url(
        &self,
        url: &str,
        label: &str,
    ) -> impl Future<Output = Result<LoadOutcome>> + '_ {
        self.start_load(Ok(self.issue(url, label)))
    }

    /// Dispatches a host command. Returns `Ok(None)` for commands that do not
    /// load anything.
    pub fn handle_host_command(
        &self,
        command: HostCommand,
    ) -> impl Future<Output = Result<Option<LoadOutcome>>> + '_ {
        let load = if !self.config.accept_host_messages {
            debug!("Host messages disabled; ignoring {}", command.kind());
            None
        } else {
            match command {
                HostCommand::ChangeModel { model_type } => {
                    Some(self.start_load(self.resolve(&model_type)))
                }
                HostCommand::LoadModel { model_url, style } => {
                    Some(self.start_load(Ok(self.issue(&model_url, &style))))
                }
                HostCommand::MaterialChange { material } => {
                    info!("Material change to '{material}' requested");
                    None
                }
            }
        };
        async move {
            match load {
                Some(load) => load.await.map(Some),
                None => Ok(None),
            }
        }
    }

    /// Parses and dispatches a raw host message. Unrecognized message types
    /// are ignored.
    pub fn handle_host_message(
        &self,
        message: &Value,
    ) -> impl Future<Output = Result<Option<LoadOutcome>>> + '_ {
        let dispatch = match HostCommand::from_value(message) {
            Ok(Some(command)) => Ok(Some(self.handle_host_command(command))),
            Ok(None) => {
                debug!("Ignoring unrecognized host message");
                Ok(None)
            }
            Err(err) => {
                warn!("{err}");
                Err(err)
            }
        };
        async move {
            match dispatch? {
                Some(dispatch) => dispatch.await,
                None => Ok(None),
            }
        }
    }

    /// Pauses auto-rotate for an orbit interaction at session time `now`.
    ///
    /// The returned ticket resumes rotation through
    /// [`resume_auto_rotate`](Self::resume_auto_rotate) unless another
    /// interaction arrives first.
    pub fn notify_interaction_start(&self, now: Duration) -> Result<ResumeTicket> {
        let ticket = self.debounce.lock().interaction_started(now);
        self.engine
            .camera_rig()
            .set_auto_rotate(false)
            .map_err(ViewerError::engine)?;
        Ok(ticket)
    }

    /// Fires an armed resume. Stale tickets are ignored.
    pub fn resume_auto_rotate(&self, ticket: ResumeTicket) -> Result<bool> {
        let resumed = self.debounce.lock().resume(ticket);
        if resumed {
            self.set_rotating()?;
        }
        Ok(resumed)
    }

    /// Resumes rotation if the pending resume is due at `now`.
    pub fn tick(&self, now: Duration) -> Result<bool> {
        let resumed = self.debounce.lock().poll(now);
        if resumed {
            self.set_rotating()?;
        }
        Ok(resumed)
    }

    fn set_rotating(&self) -> Result<()> {
        debug!("Resuming auto-rotate");
        self.engine
            .camera_rig()
            .set_auto_rotate(true)
            .map_err(ViewerError::engine)
    }

    pub fn rotation_state(&self) -> RotationState {
        self.debounce.lock().state()
    }

    pub fn pending_resumes(&self) -> usize {
        self.debounce.lock().pending_count()
    }

    pub fn state(&self) -> SessionState {
        self.installed.read().state.clone()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    /// Releases the current model and drops the pending resume.
    pub fn shutdown(&self) {
        self.debounce.lock().cancel();
        let handle = {
            let mut installed = self.installed.write();
            installed.state.current_model = None;
            installed.state.current_handle.take()
        };
        if let Some(handle) = handle {
            self.engine.dispose(handle);
        }
        info!("Viewer session shut down");
    }
}
