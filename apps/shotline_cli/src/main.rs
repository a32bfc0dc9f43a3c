use anyhow::{bail, Context, Result};
use serde::Deserialize;
use shotline_core::config::EngineConfig;
use shotline_core::editor::Editor;
use shotline_core::project::TimelineDocument;
use shotline_core::types::{Conflict, Shot, ShotClip, TimeUs};
use shotline_playback::{PlaybackClock, PlaybackDriver};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const USAGE: &str = "\
usage:
  shotline check <document> [--shots <shots.json>] [--config <config.json>]
  shotline fix <document> [--out <path>] [--config <config.json>]
  shotline play <document> [--speed <x>] [--config <config.json>]";

/// Shot list exported by the story layer.
#[derive(Debug, Default, Deserialize)]
struct ShotList {
    #[serde(default)]
    shots: Vec<Shot>,
    #[serde(default)]
    clips: Vec<ShotClip>,
}

#[derive(Debug, PartialEq)]
struct Invocation {
    command: String,
    document: PathBuf,
    options: HashMap<String, String>,
}

impl Invocation {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut args = args.into_iter();
        let command = args.next().context("missing command")?;
        let document = args.next().map(PathBuf::from).context("missing document path")?;

        let mut options = HashMap::new();
        while let Some(flag) = args.next() {
            let Some(name) = flag.strip_prefix("--") else {
                bail!("unexpected argument: {flag}");
            };
            let value = args
                .next()
                .with_context(|| format!("--{name} needs a value"))?;
            options.insert(name.to_string(), value);
        }

        Ok(Self {
            command,
            document,
            options,
        })
    }

    fn option(&self, name: &str) -> Option<&str> {
        self.options.get(name).map(String::as_str)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let invocation = match Invocation::parse(std::env::args().skip(1)) {
        Ok(inv) => inv,
        Err(e) => {
            eprintln!("{e}\n{USAGE}");
            std::process::exit(2);
        }
    };

    let config = match invocation.option("config") {
        Some(path) => EngineConfig::load_from_file(path)
            .with_context(|| format!("failed to load config {path}"))?,
        None => EngineConfig::default(),
    };
    let mut editor = open_editor(&invocation.document, config)?;

    match invocation.command.as_str() {
        "check" => {
            if let Some(path) = invocation.option("shots") {
                let list = load_shot_list(Path::new(path))?;
                let seeded = editor.load_shots(&list.shots, &list.clips);
                tracing::info!(seeded, "Shot list applied");
            }
            print_conflicts(editor.conflicts());
        }
        "fix" => {
            let fixed = editor.fix_all_overlaps()?;
            let out = invocation
                .option("out")
                .map(PathBuf::from)
                .unwrap_or_else(|| invocation.document.clone());
            editor
                .to_document()
                .save_to_file(&out)
                .with_context(|| format!("failed to save {}", out.display()))?;
            println!("fixed {fixed} overlap(s)");
            print_conflicts(editor.conflicts());
        }
        "play" => {
            let speed = match invocation.option("speed") {
                Some(s) => s.parse::<f64>().with_context(|| format!("invalid speed: {s}"))?,
                None => 1.0,
            };
            play(&editor, speed)?;
        }
        other => {
            eprintln!("unknown command: {other}\n{USAGE}");
            std::process::exit(2);
        }
    }

    Ok(())
}

fn open_editor(path: &Path, config: EngineConfig) -> Result<Editor> {
    let document = TimelineDocument::load_from_file(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    Editor::from_document(config, document)
        .with_context(|| format!("invalid timeline in {}", path.display()))
}

fn load_shot_list(path: &Path) -> Result<ShotList> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("invalid shot list {}", path.display()))
}

fn print_conflicts(conflicts: &[Conflict]) {
    if conflicts.is_empty() {
        println!("no conflicts");
        return;
    }
    for conflict in conflicts {
        print!("[{:?}] {:?}: {}", conflict.severity, conflict.kind, conflict.message);
        if let Some(fix) = &conflict.suggested_fix {
            print!(" ({fix})");
        }
        println!();
    }
}

/// Run the clock to the end of the arrangement, printing the cursor once per
/// second of timeline time.
fn play(editor: &Editor, speed: f64) -> Result<()> {
    let total = editor.total_duration_us();
    let mut clock = PlaybackClock::new(&editor.config().playback, total);
    clock.set_speed(speed)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("failed to start runtime")?;
    let local = tokio::task::LocalSet::new();

    local.block_on(&runtime, async move {
        let mut driver = PlaybackDriver::new(clock);
        let mut last_second = -1;
        driver.play(move |cursor: TimeUs| {
            let second = cursor.0 / 1_000_000;
            if second != last_second {
                last_second = second;
                println!("{cursor}");
            }
        });
        let outcome = driver.finished().await;
        tracing::info!(?outcome, total = %total, "Playback ended");
    });
    Ok(())
}
