use anyhow::Context;
use clap::Parser;
use display_recorder::capture::{AudioConstraint, AudioSettings, PickerResponse, VirtualDisplayProvider};
use display_recorder::config::AppConfig;
use display_recorder::logging::init_logging;
use display_recorder::recorder::{SessionController, VirtualRecorderProvider};
use display_recorder::shell::{Intent, RecorderShell, HELP};
use display_recorder::utils::ErrorResponse;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Record a display from the console
#[derive(Parser, Debug)]
#[command(name = "display-recorder", version, about)]
struct Cli {
    /// JSON configuration file
    #[arg(long, env = "DISPLAY_RECORDER_CONFIG")]
    config: Option<PathBuf>,

    /// Capture audio alongside the display
    #[arg(long)]
    audio: bool,

    /// Requested audio sample rate (implies --audio)
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Interval between recorder chunks in milliseconds
    #[arg(long)]
    timeslice_ms: Option<u64>,

    /// Codec to select after capture starts
    #[arg(long)]
    codec: Option<String>,

    /// Directory downloads are written to
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Codecs the recorder reports as supported (comma separated)
    #[arg(long, value_delimiter = ',')]
    supported: Option<Vec<String>>,

    /// Make the display picker refuse the capture request
    #[arg(long)]
    deny_capture: bool,

    /// Tracing filter, e.g. display_recorder=trace
    #[arg(long)]
    log_filter: Option<String>,
}

impl Cli {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(rate) = self.sample_rate {
            config.capture.audio = AudioConstraint::Settings(AudioSettings { sample_rate: rate });
        } else if self.audio && !config.capture.audio.is_requested() {
            config.capture.audio = AudioConstraint::Enabled(true);
        }
        if let Some(timeslice_ms) = self.timeslice_ms {
            config.recording.timeslice_ms = timeslice_ms;
        }
        if let Some(codec) = &self.codec {
            config.recording.preferred_codec = Some(codec.clone());
        }
        if let Some(dir) = &self.output_dir {
            config.output.download_dir = dir.clone();
        }
        if let Some(filter) = &self.log_filter {
            config.log_filter = Some(filter.clone());
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;
    cli.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    init_logging(config.log_filter.as_deref());
    tracing::info!("Starting Display Recorder v{}", env!("CARGO_PKG_VERSION"));

    let picker = if cli.deny_capture {
        PickerResponse::Deny
    } else {
        PickerResponse::Grant
    };
    let recorders = match &cli.supported {
        Some(supported) => VirtualRecorderProvider::new(supported.iter().map(|s| s.trim().to_string())),
        None => VirtualRecorderProvider::default(),
    };
    tracing::debug!("Virtual recorder supports {:?}", recorders.supported());
    let controller = SessionController::new(
        Arc::new(VirtualDisplayProvider::new(picker)),
        Arc::new(recorders),
    )
    .with_timeslice(config.timeslice());

    let mut shell = RecorderShell::new(controller, config);
    println!("{}", HELP);
    println!("{}", shell.controls().render());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }

        let intent = match line.parse::<Intent>() {
            Ok(intent) => intent,
            Err(e) => {
                println!("{}", ErrorResponse::from(&e));
                continue;
            }
        };
        let quitting = intent == Intent::Quit;

        match shell.handle(intent).await {
            Ok(reply) => println!("{}", reply),
            Err(e) => {
                tracing::error!("{}", e);
                println!("{}", ErrorResponse::from(&e));
            }
        }

        if quitting {
            return Ok(());
        }
        println!("{}", shell.controls().render());
    }

    shell.shutdown();
    Ok(())
}
