use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tally_core::TallyError;
use tally_ingest::{ALL_PARSERS, ParserId, assess, classify, extract_metadata, parse_rows, read_rows, repair_ocr_text};
use tally_pipeline::{DocumentKind, PdfTextExtractor, Pipeline, TextExtractor};
use tracing::debug;

mod config;
mod logging;
mod report;
mod state;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("TALLY_BUILD_SHA"), ")");

/// Exit status when a document was read fine but held no transactions.
const EXIT_NO_TRANSACTIONS: i32 = 2;

#[derive(Parser, Debug)]
#[command(name = "tally", version = VERSION, about = "Bank statement to transactions")]
struct Cli {
    /// Log at debug level (RUST_LOG still wins)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a statement (PDF, scanned PDF, image, or CSV export)
    Parse {
        file: PathBuf,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,

        /// Never fall back to OCR
        #[arg(long)]
        no_ocr: bool,

        /// Skip institution detection and use this parser
        #[arg(long, value_name = "KEY")]
        parser: Option<String>,
    },

    /// Show what the pipeline would decide about a document, without parsing it
    Inspect { file: PathBuf },

    /// Apply OCR text repair to a text file and print the result
    Repair { file: PathBuf },

    /// Manage ~/.tally/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write the default config if none exists
    Init,
    /// Print the effective config
    Show,
    /// Print the config file location
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config()?;
    let filter = if cli.verbose { "tally=debug" } else { cfg.log.filter.as_str() };
    logging::init_tracing(filter);

    match cli.command {
        Command::Parse {
            file,
            json,
            no_ocr,
            parser,
        } => {
            parse(&cfg, &file, json, no_ocr, parser.as_deref()).await?;
        }

        Command::Inspect { file } => {
            inspect(&cfg, &file)?;
        }

        Command::Repair { file } => {
            let text = fs::read_to_string(&file).with_context(|| format!("read {}", file.display()))?;
            print!("{}", repair_ocr_text(&text));
        }

        Command::Config { command } => match command {
            ConfigCommand::Init => {
                let p = config::config_path()?;
                if config::init_at(&p)? {
                    println!("Wrote {}", p.display());
                } else {
                    println!("Config already exists: {}", p.display());
                }
            }
            ConfigCommand::Show => {
                print!("{}", config::render(&cfg)?);
            }
            ConfigCommand::Path => {
                println!("{}", config::config_path()?.display());
            }
        },
    }

    Ok(())
}

fn parser_by_key(key: &str) -> Result<ParserId> {
    match ParserId::from_key(key) {
        Some(id) => Ok(id),
        None => {
            let keys: Vec<&str> = ALL_PARSERS.iter().map(|p| p.key()).collect();
            bail!("unknown parser {key:?} (expected one of: {})", keys.join(", "))
        }
    }
}

async fn parse(
    cfg: &config::Config,
    file: &Path,
    json: bool,
    no_ocr: bool,
    parser: Option<&str>,
) -> Result<()> {
    let forced = parser.map(parser_by_key).transpose()?;
    let bytes = fs::read(file).with_context(|| format!("read {}", file.display()))?;
    debug!(file = %file.display(), bytes = bytes.len(), ocr = cfg.ocr.enabled && !no_ocr, "parsing");

    let mut ocr = cfg.ocr.clone();
    if no_ocr {
        ocr.enabled = false;
    }
    let mut pipeline = Pipeline::from_settings(&ocr, cfg.parse);
    pipeline.config_mut().forced_parser = forced;

    let name = file.file_name().map(|n| n.to_string_lossy().into_owned());
    let outcome = pipeline.process(&bytes, name.as_deref()).await;
    pipeline.shutdown().await;

    match outcome {
        Ok(result) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print!("{}", report::render_table(&result));
            }
            Ok(())
        }
        Err(TallyError::NoTransactions { excerpt, used_ocr }) => {
            if json {
                let body = serde_json::json!({
                    "error": "no transactions found",
                    "usedOCR": used_ocr,
                    "excerpt": excerpt,
                });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                eprintln!("No transactions found in {} (used OCR: {used_ocr}).", file.display());
                if !excerpt.is_empty() {
                    eprintln!("\nText seen:\n{excerpt}");
                }
            }
            std::process::exit(EXIT_NO_TRANSACTIONS);
        }
        Err(e) => Err(e).with_context(|| format!("processing {}", file.display())),
    }
}

fn inspect(cfg: &config::Config, file: &Path) -> Result<()> {
    let bytes = fs::read(file).with_context(|| format!("read {}", file.display()))?;
    let name = file.file_name().map(|n| n.to_string_lossy().into_owned());
    let kind = DocumentKind::sniff(&bytes, name.as_deref())
        .with_context(|| format!("sniffing {}", file.display()))?;
    println!("File: {}", file.display());
    println!("Kind: {}", kind.as_str());

    match kind {
        DocumentKind::Pdf => {
            let extracted = PdfTextExtractor
                .extract(&bytes)
                .with_context(|| format!("extracting {}", file.display()))?;
            let verdict = assess(&extracted.text, extracted.page_count);
            println!("Pages: {}", extracted.page_count);
            println!(
                "Characters: {} (expected about {})",
                verdict.text_length, verdict.expected_length
            );
            println!("Alphanumeric ratio: {:.2}", verdict.alnum_ratio);
            match verdict.reason {
                Some(reason) => {
                    let ocr = if cfg.ocr.enabled { "enabled" } else { "disabled" };
                    println!("Scanned: yes ({reason:?}); OCR is {ocr}");
                }
                None => println!("Scanned: no"),
            }
            let parser = classify(&extracted.text);
            println!("Parser: {}", parser.key());
            print!("{}", report::render_metadata(&extract_metadata(&extracted.text, parser)));
        }
        DocumentKind::Csv => {
            let rows = read_rows(&bytes).with_context(|| format!("reading {}", file.display()))?;
            let parsed = parse_rows(&rows);
            println!("Rows: {}", rows.len());
            println!("Transactions: {}", parsed.len());
        }
        DocumentKind::Image => {
            let ocr = if cfg.ocr.enabled { "enabled" } else { "disabled" };
            println!("Images always go through OCR (OCR is {ocr})");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_keys_resolve() {
        assert_eq!(parser_by_key("HSBC").unwrap(), ParserId::Hsbc);
        let err = parser_by_key("monzo").unwrap_err();
        assert!(format!("{err}").contains("nationwide, santander, hsbc, barclays, generic"));
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["tally", "parse", "stmt.pdf", "--json", "--parser", "generic"]).unwrap();
        match cli.command {
            Command::Parse {
                file,
                json,
                no_ocr,
                parser,
            } => {
                assert_eq!(file, PathBuf::from("stmt.pdf"));
                assert!(json);
                assert!(!no_ocr);
                assert_eq!(parser.as_deref(), Some("generic"));
            }
            other => panic!("unexpected command {other:?}"),
        }

        let cli = Cli::try_parse_from(["tally", "-v", "config", "path"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::Config { command: ConfigCommand::Path }));
    }
}
