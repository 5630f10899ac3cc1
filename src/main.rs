use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use auris::database::TrackStore;
use auris::{Config, Recognizer};

#[derive(Parser)]
#[command(name = "auris", version, about = "Identify music by acoustic fingerprint")]
struct Cli {
    /// Path to the fingerprint library.
    #[arg(long, global = true, default_value = "auris.sqlite")]
    db: PathBuf,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fingerprint an audio file and add it to the library.
    Enroll {
        file: PathBuf,
        /// Track title; defaults to the file name.
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        artist: Option<String>,
    },
    /// Match an audio file against the library.
    Identify { file: PathBuf },
    /// List the enrolled tracks.
    List,
    /// Show library statistics.
    Stats,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let store = TrackStore::open(&cli.db)
        .with_context(|| format!("opening fingerprint library {}", cli.db.display()))?;

    match cli.command {
        Command::Enroll {
            file,
            title,
            artist,
        } => {
            let mut recognizer = Recognizer::new(Config::default(), store)?;
            let track_id = recognizer.enroll_file(&file, title.as_deref(), artist.as_deref())?;
            let info = recognizer
                .track(track_id)?
                .context("enrolled track missing from catalogue")?;
            println!("enrolled #{track_id}: {}", info.name);
        }
        Command::Identify { file } => {
            let recognizer = Recognizer::new(Config::default(), store)?;
            let matches = recognizer.identify_file(&file)?;
            if matches.is_empty() {
                println!("no match");
                return Ok(());
            }
            for (rank, m) in matches.iter().enumerate() {
                let name = recognizer
                    .track(m.track_id)?
                    .map(|info| match info.artist {
                        Some(artist) => format!("{} — {}", info.name, artist),
                        None => info.name,
                    })
                    .unwrap_or_else(|| format!("track #{}", m.track_id));
                println!(
                    "{}. {} (score {:.2}, {} aligned hashes, offset {:+.1}s)",
                    rank + 1,
                    name,
                    m.score,
                    m.aligned_hits,
                    recognizer.offset_seconds(m.offset),
                );
            }
        }
        Command::List => {
            let tracks = store.list_tracks()?;
            if tracks.is_empty() {
                println!("library is empty");
            }
            for info in tracks {
                let duration = info
                    .duration_s
                    .map(|d| format!("{d:.1}s"))
                    .unwrap_or_else(|| "?".into());
                match info.artist {
                    Some(artist) => {
                        println!("#{} {} — {} ({duration})", info.track_id, info.name, artist)
                    }
                    None => println!("#{} {} ({duration})", info.track_id, info.name),
                }
            }
        }
        Command::Stats => {
            println!("tracks:   {}", store.track_count()?);
            println!("postings: {}", store.posting_count()?);
        }
    }

    Ok(())
}
