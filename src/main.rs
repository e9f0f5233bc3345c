use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use hark::config::file::{ConfigFile, IntentFileConfig, WakeFileConfig, load_config_file};
use hark::voice::{FrameSource, Microphone, WavFrameReader, list_input_devices};
use hark::{Config, Inference, OrchestratorBuilder, VoiceManager};

/// hark - Wake phrase + intent voice commands
#[derive(Parser)]
#[command(name = "hark", version, about)]
struct Cli {
    /// Config file (default: <config dir>/hark/config.toml)
    #[arg(short, long, env = "HARK_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Print events as JSON lines
    #[arg(long, global = true)]
    json: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a WAV recording through the cascade
    File {
        /// Mono 16-bit WAV at the engine sample rate
        #[arg(short, long)]
        input: PathBuf,

        #[command(flatten)]
        engine: EngineArgs,
    },
    /// Listen on a microphone
    Mic {
        /// Input device name (default input when omitted)
        #[arg(short, long)]
        device: Option<String>,

        /// Stop after this many seconds (runs until interrupted when omitted)
        #[arg(long)]
        duration: Option<u64>,

        #[command(flatten)]
        engine: EngineArgs,
    },
    /// List audio input devices
    Devices,
    /// Initialize the engines and print their details
    Info {
        #[command(flatten)]
        engine: EngineArgs,
    },
}

/// Engine settings; each overrides the config file
#[derive(Args)]
struct EngineArgs {
    /// Engine access key
    #[arg(long, env = "HARK_ACCESS_KEY", hide_env_values = true)]
    access_key: Option<String>,

    /// Wake phrase model file
    #[arg(short, long)]
    keyword_path: Option<PathBuf>,

    /// Intent context file
    #[arg(long)]
    context_path: Option<PathBuf>,

    /// Wake engine parameter file
    #[arg(long)]
    wake_model_path: Option<PathBuf>,

    /// Wake engine shared library
    #[arg(long)]
    wake_library_path: Option<PathBuf>,

    /// Wake sensitivity in [0, 1]
    #[arg(long)]
    wake_sensitivity: Option<f32>,

    /// Intent engine parameter file
    #[arg(long)]
    intent_model_path: Option<PathBuf>,

    /// Intent engine shared library
    #[arg(long)]
    intent_library_path: Option<PathBuf>,

    /// Intent sensitivity in [0, 1]
    #[arg(long)]
    intent_sensitivity: Option<f32>,

    /// Trailing silence that ends a command, in seconds [0.5, 5]
    #[arg(long)]
    endpoint_duration_sec: Option<f32>,

    /// Wait for trailing silence before finalizing
    #[arg(long)]
    require_endpoint: Option<bool>,
}

impl EngineArgs {
    fn into_config_file(self) -> ConfigFile {
        ConfigFile {
            access_key: self.access_key,
            keyword_path: self.keyword_path,
            context_path: self.context_path,
            wake: WakeFileConfig {
                model_path: self.wake_model_path,
                library_path: self.wake_library_path,
                sensitivity: self.wake_sensitivity,
            },
            intent: IntentFileConfig {
                model_path: self.intent_model_path,
                library_path: self.intent_library_path,
                sensitivity: self.intent_sensitivity,
                endpoint_duration_sec: self.endpoint_duration_sec,
                require_endpoint: self.require_endpoint,
            },
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn,hark=info",
        1 => "info,hark=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let json = cli.json;
    let config_path = cli.config;

    match cli.command {
        Command::File { input, engine } => {
            let config = load_config(config_path.as_deref(), engine)?;
            cmd_file(config, &input, json)
        }
        Command::Mic {
            device,
            duration,
            engine,
        } => {
            let config = load_config(config_path.as_deref(), engine)?;
            cmd_mic(config, device.as_deref(), duration, json)
        }
        Command::Devices => cmd_devices(json),
        Command::Info { engine } => {
            let config = load_config(config_path.as_deref(), engine)?;
            cmd_info(config, json)
        }
    }
}

fn load_config(path: Option<&Path>, args: EngineArgs) -> anyhow::Result<Config> {
    let file = load_config_file(path)?;
    let config = file.merge(args.into_config_file()).into_config()?;
    tracing::debug!(?config, "loaded configuration");
    Ok(config)
}

#[cfg(feature = "native")]
fn engines(config: Config) -> anyhow::Result<OrchestratorBuilder> {
    use hark::Orchestrator;
    use hark::engine::native::{PorcupineFactory, RhinoFactory};

    Ok(Orchestrator::builder(config)
        .wake_engine(PorcupineFactory)
        .intent_engine(RhinoFactory))
}

#[cfg(not(feature = "native"))]
fn engines(config: Config) -> anyhow::Result<OrchestratorBuilder> {
    drop(config);
    anyhow::bail!("hark was built without engines; rebuild with `--features native`")
}

/// Attach callbacks that print events to stdout
fn with_printers(builder: OrchestratorBuilder, json: bool) -> OrchestratorBuilder {
    builder
        .on_wake(move || {
            if json {
                println!("{}", serde_json::json!({ "event": "wake" }));
            } else {
                println!("[wake word]");
            }
        })
        .on_inference(move |inference: Inference| {
            if json {
                println!(
                    "{}",
                    serde_json::json!({ "event": "inference", "inference": inference })
                );
            } else if inference.is_understood {
                println!("{inference}");
            } else {
                println!("didn't understand the command");
            }
        })
}

fn cmd_file(config: Config, input: &Path, json: bool) -> anyhow::Result<()> {
    let mut orchestrator = with_printers(engines(config)?, json).init()?;
    let info = orchestrator
        .info()
        .cloned()
        .context("orchestrator not initialized")?;

    let mut reader = WavFrameReader::open(input, info.sample_rate)?;
    let mut frame = vec![0i16; info.frame_length];
    let never = std::sync::atomic::AtomicBool::new(false);

    while reader.read_frame(&mut frame, &never)? {
        orchestrator.process(&frame)?;
    }

    #[allow(clippy::cast_precision_loss)]
    let seconds =
        (reader.frames_read() * info.frame_length as u64) as f64 / f64::from(info.sample_rate);
    tracing::info!(frames = reader.frames_read(), seconds, "finished input");

    orchestrator.delete()?;
    Ok(())
}

fn cmd_mic(
    config: Config,
    device: Option<&str>,
    duration: Option<u64>,
    json: bool,
) -> anyhow::Result<()> {
    let builder = with_printers(engines(config)?, json);
    let format = builder
        .audio_format()
        .context("no wake engine configured")?;

    let mut microphone = Microphone::open(device, format.sample_rate)?;
    microphone.start()?;

    let mut manager = VoiceManager::start(builder, microphone.source())?;
    if !json {
        println!("Listening... (Ctrl-C to quit)");
    }

    match duration {
        Some(secs) => {
            std::thread::sleep(Duration::from_secs(secs));
            manager.stop()?;
        }
        None => manager.wait()?,
    }

    microphone.stop();
    Ok(())
}

fn cmd_devices(json: bool) -> anyhow::Result<()> {
    let devices = list_input_devices()?;

    if json {
        let list: Vec<_> = devices
            .iter()
            .map(|d| serde_json::json!({ "name": d.name, "default": d.is_default }))
            .collect();
        println!("{}", serde_json::Value::Array(list));
        return Ok(());
    }

    if devices.is_empty() {
        println!("No input devices found");
    }
    for device in &devices {
        let marker = if device.is_default { " (default)" } else { "" };
        println!("{}{marker}", device.name);
    }
    Ok(())
}

fn cmd_info(config: Config, json: bool) -> anyhow::Result<()> {
    let mut orchestrator = with_printers(engines(config)?, json).init()?;
    let info = orchestrator
        .info()
        .cloned()
        .context("orchestrator not initialized")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("{orchestrator}");
        println!("version:      {}", info.version);
        println!("frame length: {} samples", info.frame_length);
        println!("sample rate:  {} Hz", info.sample_rate);
        println!("\n{}", info.context_info);
    }

    orchestrator.delete()?;
    Ok(())
}
