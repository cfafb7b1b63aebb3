//! Command-line entry point. `serve` runs the bridge over stdin/stdout as
//! newline-delimited JSON; the other subcommands are privileged local tools
//! for installing and checking translations.
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use scripture_bridge::config::{Config, DEFAULT_LOG_FILTER, LOG_ENV};
use scripture_bridge::bridge::serve_lines;
use scripture_bridge::db::install_translation;
use scripture_bridge::source::read_translation;
use scripture_bridge::{
    canon, DirectorySource, Gateway, ScriptureRequest, TranslationRegistry, TranslationStore,
};

#[derive(Debug, Parser)]
#[command(name = "scripture-bridge", version, about = "Scripture data access layer")]
struct Cli {
    /// Directory holding `<id>.sqlite` / `<id>.json` translations.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List available and loaded translations.
    List,
    /// Print a verse range, e.g. `get kjv John 3 16`.
    Get {
        translation: String,
        /// Book number or name.
        book: String,
        from_chapter: i64,
        from_verse: i64,
        to_chapter: Option<i64>,
        to_verse: Option<i64>,
    },
    /// Show per-book coverage of a translation.
    Inspect { translation: String },
    /// Validate a JSON verse list and install it as `<id>.sqlite`.
    Import { json: PathBuf, id: String },
    /// Answer JSON bridge requests from stdin, one per line.
    Serve,
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = Config::resolve(cli.data_dir)?;
    let source = DirectorySource::new(&config.data_dir);
    info!(data_dir = %config.data_dir.display(), "using translation directory");

    let registry = Arc::new(TranslationRegistry::new(source.clone()));
    let gateway = Gateway::new(Arc::clone(&registry));

    match cli.command {
        Command::List => list(&gateway),
        Command::Get {
            translation,
            book,
            from_chapter,
            from_verse,
            to_chapter,
            to_verse,
        } => {
            let request = ScriptureRequest {
                translation_id: translation,
                book: parse_book(&book)?,
                from_chapter,
                from_verse,
                to_chapter: to_chapter.unwrap_or(from_chapter),
                // A bare end chapter means "through the end of that chapter".
                to_verse: to_verse.unwrap_or(if to_chapter.is_some() {
                    i64::from(u16::MAX)
                } else {
                    from_verse
                }),
            };
            get(&gateway, &request)
        }
        Command::Inspect { translation } => inspect(&registry, &translation),
        Command::Import { json, id } => import(&source, &json, &id),
        Command::Serve => serve(&gateway),
    }
}

/// Logs go to stderr so `serve` keeps stdout for responses.
fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn parse_book(book: &str) -> Result<i64> {
    if let Ok(number) = book.parse::<i64>() {
        return Ok(number);
    }
    canon::find_book(book)
        .map(|info| i64::from(info.number.get()))
        .ok_or_else(|| anyhow!("unknown book '{book}'"))
}

fn list(gateway: &Gateway) -> Result<()> {
    let translations = gateway.list_translations();
    if translations.is_empty() {
        println!("No translations installed.");
    }
    for translation in translations {
        println!("{translation}");
    }
    Ok(())
}

fn get(gateway: &Gateway, request: &ScriptureRequest) -> Result<()> {
    let response = gateway.get_scripture(request)?;
    for verse in &response.verses {
        println!(
            "{} {}:{}  {}",
            response.book_name, verse.chapter, verse.verse, verse.text
        );
    }
    if response.verses.is_empty() {
        eprintln!("No verses found in that range.");
    } else if response.omitted > 0 || !response.missing_chapters.is_empty() {
        eprintln!(
            "note: {} verse(s) missing from this translation, chapters without text: {:?}",
            response.omitted, response.missing_chapters
        );
    }
    Ok(())
}

fn inspect(registry: &TranslationRegistry, id: &str) -> Result<()> {
    let store = registry.get(id)?;
    println!("{} - {} verses", store.info(), store.len());
    for book in canon::books() {
        let chapters = store.chapter_summaries(book.number);
        if chapters.is_empty() {
            continue;
        }
        let verses: usize = chapters.iter().map(|c| c.verses).sum();
        println!(
            "{:>3} {:<16} {:>3}/{:<3} chapters {:>6} verses",
            book.number.get(),
            book.name,
            chapters.len(),
            book.chapter_count,
            verses
        );
    }
    Ok(())
}

fn import(source: &DirectorySource, json: &Path, id: &str) -> Result<()> {
    let target = source.sqlite_path(id)?;
    let data = read_translation(id, json)
        .with_context(|| format!("failed to read {}", json.display()))?;
    let store = TranslationStore::build(data.info, data.records)?;
    let written = install_translation(&target, &store)?;
    println!("Imported {written} verses into {}", target.display());
    Ok(())
}

fn serve(gateway: &Gateway) -> Result<()> {
    serve_lines(gateway, io::stdin().lock(), io::stdout().lock())
}
