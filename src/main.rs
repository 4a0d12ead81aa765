#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    if let Err(err) = cli::run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use std::env;
    use std::fs;

    use anyhow::{anyhow, Context, Result};
    use pollster::block_on;
    use serde_json::Value;

    use showcase_viewer::{
        HeadlessEngine, LoadOutcome, RenderEngine, SessionManager, ViewerConfig,
    };

    pub fn run() -> Result<()> {
        let options = CliOptions::parse()?;
        let config = options.load_config()?;

        if options.print_config {
            println!("{}", config.to_json_pretty()?);
            return Ok(());
        }

        let session = block_on(SessionManager::initialize(config, HeadlessEngine::create))
            .context("failed to start viewer session")?;
        print_startup_summary(&session);

        if let Some(path) = &options.messages {
            let script =
                fs::read_to_string(path).with_context(|| format!("unable to read {path}"))?;
            replay_messages(&session, &script)?;
        }

        print_final_state(&session);
        session.shutdown();
        Ok(())
    }

    fn print_startup_summary(session: &SessionManager<HeadlessEngine>) {
        let config = session.config();
        let snapshot = session.engine().snapshot();
        println!(
            "Viewer initialized on '{}' ({:?} background)",
            snapshot.canvas_id, config.background
        );
        let disabled = snapshot
            .disabled_plugins
            .iter()
            .map(|plugin| plugin.name())
            .collect::<Vec<_>>()
            .join(", ");
        println!("Disabled plugins: {disabled}");
        if !config.registry.is_empty() {
            println!("Registry: {}", config.registry.keys().join(", "));
        }
        println!(
            "Environment map: {}",
            snapshot.environment_map.as_deref().unwrap_or("none")
        );
        let rig = session.engine().camera_rig().snapshot();
        let (pos, target) = (rig.position, rig.target);
        println!(
            "Camera: pos=({:.2}, {:.2}, {:.2}) target=({:.2}, {:.2}, {:.2}) {}",
            pos.x,
            pos.y,
            pos.z,
            target.x,
            target.y,
            target.z,
            format_args!(
                "radius={:.2} auto-rotate={}",
                rig.orbit_radius(),
                rig.auto_rotate
            )
        );
        print_current_model(session);
    }

    fn replay_messages(session: &SessionManager<HeadlessEngine>, script: &str) -> Result<()> {
        for (index, line) in script.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let message: Value = serde_json::from_str(line)
                .with_context(|| format!("line {} is not valid JSON", index + 1))?;
            let kind = message
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("untyped")
                .to_string();
            match block_on(session.handle_host_message(&message)) {
                Ok(Some(LoadOutcome::Installed { label, handle })) => {
                    println!("> {kind}: installed '{label}' ({handle})")
                }
                Ok(Some(LoadOutcome::Superseded { label })) => {
                    println!("> {kind}: '{label}' superseded")
                }
                Ok(None) => println!("> {kind}: no model change"),
                Err(err) => println!("> {kind}: failed: {err}"),
            }
        }
        Ok(())
    }

    fn print_current_model(session: &SessionManager<HeadlessEngine>) {
        let state = session.state();
        match (state.current_model, state.current_handle) {
            (Some(label), Some(handle)) => println!("Current model: {label} ({handle})"),
            _ => println!("Current model: none"),
        }
    }

    fn print_final_state(session: &SessionManager<HeadlessEngine>) {
        let snapshot = session.engine().snapshot();
        print_current_model(session);
        println!(
            "Scene holds {} model(s); {} disposed",
            snapshot.models.len(),
            snapshot.disposed.len()
        );
    }

    struct CliOptions {
        preset: Option<String>,
        config: Option<String>,
        messages: Option<String>,
        print_config: bool,
    }

    const USAGE: &str = concat!(
        "Usage: showcase-viewer [--preset <transparent|opaque|switchable> | --config <file.json>]",
        " [--messages <file.jsonl>] [--print-config]"
    );

    impl CliOptions {
        fn parse() -> Result<Self> {
            let mut options = Self {
                preset: None,
                config: None,
                messages: None,
                print_config: false,
            };
            let mut args = env::args().skip(1);
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--preset" => options.preset = Some(Self::value(&mut args, "--preset")?),
                    "--config" => options.config = Some(Self::value(&mut args, "--config")?),
                    "--messages" => options.messages = Some(Self::value(&mut args, "--messages")?),
                    "--print-config" => options.print_config = true,
                    other => return Err(anyhow!("Unknown argument: {other}. {USAGE}")),
                }
            }
            if options.preset.is_some() && options.config.is_some() {
                return Err(anyhow!("--preset and --config are mutually exclusive. {USAGE}"));
            }
            Ok(options)
        }

        fn value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
            args.next()
                .ok_or_else(|| anyhow!("{flag} expects a value. {USAGE}"))
        }

        fn load_config(&self) -> Result<ViewerConfig> {
            if let Some(path) = &self.config {
                let text =
                    fs::read_to_string(path).with_context(|| format!("unable to read {path}"))?;
                return ViewerConfig::from_json(&text)
                    .with_context(|| format!("invalid configuration in {path}"));
            }
            let name = self.preset.as_deref().unwrap_or("transparent");
            ViewerConfig::preset(name).ok_or_else(|| anyhow!("Unknown preset: {name}. {USAGE}"))
        }
    }
}
