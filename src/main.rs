//! Reveal Gallery - CLI
//!
//! Seal media folders, check them, and walk a gallery from the terminal.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use secrecy::SecretString;
use tokio::io::{AsyncBufReadExt, BufReader};
use walkdir::WalkDir;

use reveal_gallery::crypto::{derive_key_blocking, seal_asset};
use reveal_gallery::gate::{hash_answer, normalize_answer};
use reveal_gallery::gesture::{GestureTracker, Swipe};
use reveal_gallery::playlist::{Playlist, PlaylistPlayer};
use reveal_gallery::presents::{CardHost, GiftShelf};
use reveal_gallery::source::{AssetSource, FsSource};
use reveal_gallery::{
    AssetIndex, CardConfig, DecryptionPipeline, GalleryState, GalleryView, NavOutcome,
    OpenRequest, SessionContext, SlideshowController, Slot,
};

#[derive(Parser)]
#[command(name = "reveal-gallery")]
#[command(version = reveal_gallery::VERSION)]
#[command(about = "Reveal Gallery - encrypted photo galleries behind a riddle")]
struct Cli {
    /// Card config (JSON); built-in defaults when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the answer hash for a riddle answer
    Hash {
        answer: String,
    },

    /// Seal every file of a folder and write its manifest
    Seal {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        #[arg(short, long)]
        passphrase: String,
    },

    /// Decrypt every asset of a gallery folder
    Verify {
        #[arg(short, long)]
        folder: String,

        #[arg(short, long)]
        passphrase: String,
    },

    /// Walk a gallery: n = next, p = previous, s X0 Y0 X1 Y1 = swipe, q = close
    Play {
        #[arg(short, long)]
        folder: String,

        #[arg(short, long)]
        passphrase: String,

        /// Fade from the first asset to the second on its own
        #[arg(long)]
        auto: bool,

        /// Decrypt everything before showing anything
        #[arg(long)]
        eager: bool,

        /// Wrap around at either end instead of stopping / closing
        #[arg(long)]
        wrap: bool,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => CardConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => CardConfig::default(),
    };

    match cli.command {
        Commands::Hash { answer } => {
            println!("{}", hash_answer(&normalize_answer(&answer)));
        }

        Commands::Seal {
            input,
            output,
            passphrase,
        } => seal_folder(&config, &input, &output, &passphrase).await?,

        Commands::Verify { folder, passphrase } => {
            let session = unlock(&config, &passphrase).await?;
            let pipeline = DecryptionPipeline::new(&session);
            let paths = pipeline
                .fetch_manifest(&config.index_path(&folder), &config.folder_path(&folder))
                .await?;

            let mut missing = 0;
            for path in &paths {
                match pipeline.decrypt_asset(path).await {
                    Ok(resource) => println!(
                        "ok       {} ({} bytes, {})",
                        path,
                        resource.len(),
                        resource
                            .format()
                            .map(|f| format!("{:?}", f))
                            .unwrap_or_else(|| "unknown format".into())
                    ),
                    Err(e) if e.is_per_asset() => {
                        missing += 1;
                        println!("missing  {} ({})", path, e);
                    }
                    Err(e) => return Err(e.into()),
                }
            }

            println!("{} of {} assets readable", paths.len() - missing, paths.len());
            if missing > 0 {
                bail!("{} assets unavailable in {}", missing, folder);
            }
        }

        Commands::Play {
            folder,
            passphrase,
            auto,
            eager,
            wrap,
        } => play(&config, &folder, &passphrase, auto, eager, wrap).await?,
    }

    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════
// SESSION
// ═══════════════════════════════════════════════════════════════════════════

fn open_source(config: &CardConfig) -> Result<Arc<dyn AssetSource>> {
    let root = config.media_root.as_str();
    if root.starts_with("http://") || root.starts_with("https://") {
        #[cfg(feature = "http")]
        {
            let source = reveal_gallery::source::HttpSource::new(root)?;
            return Ok(Arc::new(source));
        }
        #[cfg(not(feature = "http"))]
        bail!("built without the `http` feature; cannot read {}", root);
    }
    Ok(Arc::new(FsSource::new(Path::new(root))))
}

async fn unlock(config: &CardConfig, passphrase: &str) -> Result<SessionContext> {
    let mut gate = config.gate()?;
    let source = open_source(config)?;

    let unlocked = match SessionContext::unlock(&mut gate, passphrase, config, source).await {
        Ok(unlocked) => unlocked,
        Err(e) if e.is_session_fatal() => bail!("cannot derive the session key, re-enter the passphrase: {}", e),
        Err(e) => return Err(e.into()),
    };

    match unlocked {
        Some(session) => Ok(session),
        // one attempt per invocation, so the first hint applies
        None => match config.hints.first() {
            Some(hint) => bail!("wrong answer. {}", hint),
            None => bail!("wrong answer"),
        },
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// SEAL
// ═══════════════════════════════════════════════════════════════════════════

async fn seal_folder(config: &CardConfig, input: &Path, output: &Path, passphrase: &str) -> Result<()> {
    let answer = normalize_answer(passphrase);
    let key = derive_key_blocking(
        SecretString::new(answer.clone()),
        config.salt.as_bytes().to_vec(),
        config.kdf.clone(),
    )
    .await?;

    std::fs::create_dir_all(output).with_context(|| format!("creating {}", output.display()))?;

    let mut names = Vec::new();
    for entry in WalkDir::new(input)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(file_name) = entry.file_name().to_str() else {
            log::warn!("Skipping non UTF-8 file name {:?}", entry.file_name());
            continue;
        };

        let plaintext = zeroize::Zeroizing::new(std::fs::read(entry.path())?);
        let sealed = seal_asset(&key, config.cipher, &plaintext)?;
        let name = format!("{}.bin", file_name);
        std::fs::write(output.join(&name), sealed)?;
        log::info!("Sealed {} -> {}", entry.path().display(), name);
        names.push(name);
    }

    if names.is_empty() {
        bail!("nothing to seal in {}", input.display());
    }
    names.sort();

    // build() logs each collision; summarise for the trigger author
    let collisions = AssetIndex::build(&names).collisions().len();
    if collisions > 0 {
        log::warn!(
            "{} file names collide after normalization; triggers reach only the later entry",
            collisions
        );
    }

    let manifest = serde_json::to_string_pretty(&names)?;
    std::fs::write(output.join(&config.index_file), manifest)?;

    println!("Sealed {} files into {}", names.len(), output.display());
    println!("answer_hash: {}", hash_answer(&answer));
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════
// PLAY
// ═══════════════════════════════════════════════════════════════════════════

/// Prints what a real view would render
struct TerminalView;

fn describe(slot: &Slot) -> String {
    match slot {
        Slot::Resolved(resource) => format!(
            "{} ({} bytes{})",
            resource.path(),
            resource.len(),
            resource.format().map(|f| format!(", {:?}", f)).unwrap_or_default()
        ),
        Slot::Missing => "[image unavailable]".into(),
    }
}

impl GalleryView for TerminalView {
    fn show_gallery(&self) {
        println!("── gallery open ──");
    }

    fn hide_gallery(&self) {
        println!("── gallery closed ──");
    }

    fn set_controls_visible(&self, visible: bool) {
        if visible {
            println!("   [p] previous  [n] next  [s X0 Y0 X1 Y1] swipe  [q] close");
        }
    }

    fn show(&self, position: usize, slot: &Slot) {
        println!("#{} {}", position + 1, describe(slot));
    }

    fn begin_crossfade(&self, from: usize, to: usize, slot: &Slot, duration: Duration) {
        println!("#{} fading to #{} over {:?}: {}", from + 1, to + 1, duration, describe(slot));
    }

    fn finish_crossfade(&self, to: usize) {
        println!("#{} shown", to + 1);
    }

    fn abort_crossfade(&self, to: usize) {
        println!("#{} unavailable, staying put", to + 1);
    }

    fn clear(&self) {}
}

async fn play(
    config: &CardConfig,
    folder: &str,
    passphrase: &str,
    auto: bool,
    eager: bool,
    wrap: bool,
) -> Result<()> {
    let session = unlock(config, passphrase).await?;

    let playlist = match Playlist::load(session.source().as_ref(), &config.playlist).await {
        Ok(playlist) => playlist,
        Err(e) => {
            log::warn!("No playlist: {}", e);
            Playlist::default()
        }
    };
    let audio = Arc::new(PlaylistPlayer::new(playlist, config.playlist.base_path.clone()));
    let host = Arc::new(CardHost::new(GiftShelf::new(config.presents.clone())));

    let mut request = match host.request_open(folder) {
        Ok(request) => request,
        Err(reveal_gallery::GalleryError::UnknownPresent(_)) => OpenRequest::new(folder),
        Err(e) => return Err(e.into()),
    };
    request.auto_advance |= auto;
    request.wrap_around |= wrap;
    if eager {
        request = request.eager(true);
    }

    let controller = SlideshowController::new(&session, config, Arc::new(TerminalView), audio, host.clone());
    controller.open(request).await?;
    host.finish_opening(folder);

    let mut gestures = GestureTracker::new(config.timing.swipe_policy());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let outcome = match line.trim() {
            "n" => controller.next().await,
            "p" => controller.previous().await,
            swipe if swipe.starts_with("s ") => {
                let coords: Vec<f32> = swipe[2..]
                    .split_whitespace()
                    .filter_map(|v| v.parse().ok())
                    .collect();
                let &[x0, y0, x1, y1] = coords.as_slice() else {
                    println!("usage: s X0 Y0 X1 Y1");
                    continue;
                };
                gestures.begin(x0, y0);
                match gestures.end(x1, y1) {
                    Some(Swipe::Next) => controller.next().await,
                    Some(Swipe::Previous) => controller.previous().await,
                    None => NavOutcome::Ignored,
                }
            }
            "q" => {
                if controller.request_close() {
                    NavOutcome::Closed
                } else {
                    NavOutcome::Ignored
                }
            }
            other => {
                println!("unknown command {:?}", other);
                continue;
            }
        };

        if outcome == NavOutcome::Ignored {
            println!("(ignored)");
        }
        if controller.state() == GalleryState::Closed {
            break;
        }
    }

    controller.close();
    Ok(())
}
