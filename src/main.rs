use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use docxmend::{
    Config, DocumentSession, DocxTextExtractor, ExtractionResult, FieldValues, FillRequest,
    GoalSelection, extract_sources,
};

#[derive(Parser, Debug)]
#[command(name = "docxmend", version, about = "Repair and fill tables in .docx planning documents")]
struct Cli {
    /// Configuration file to use instead of the default location
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log per-table decisions
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report table roles and defects without changing anything
    Analyze {
        input: PathBuf,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Repair borders, widths, spacing and alignment, merging split tables
    Fix {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long)]
        no_borders: bool,
        #[arg(long)]
        no_autofit: bool,
        #[arg(long)]
        no_spacing: bool,
        #[arg(long)]
        no_align: bool,
        #[arg(long)]
        no_merge: bool,
    },
    /// Fill labelled fields, skill results and the completion summary
    Fill {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// JSON object mapping labels to values
        #[arg(long, value_name = "JSON")]
        values: Option<PathBuf>,
        /// Extraction result JSON
        #[arg(long, value_name = "JSON")]
        results: Option<PathBuf>,
        /// Levels to write, e.g. 1,2
        #[arg(long, value_delimiter = ',')]
        levels: Vec<u8>,
    },
    /// Rebuild the goal-plan table from a goal selection
    Goals {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Goal selection as JSON or TOML
        #[arg(long)]
        selection: PathBuf,
        /// Repeat the long-term goal instead of deriving smaller targets
        #[arg(long)]
        no_smart_split: bool,
    },
    /// Print the text of source documents in input order
    Extract {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Write the default configuration
    Init,
    /// Print where the configuration is read from
    Path,
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config: {}", path.display())),
        None => Config::load().context("Failed to load config"),
    }
}

fn open(input: &Path, config: Config) -> Result<DocumentSession> {
    DocumentSession::open(input, config)
        .with_context(|| format!("Failed to open document: {}", input.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Analyze { input, json } => {
            let config = load_config(cli.config.as_deref())?;
            let report = open(&input, config)?.analyze();
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{report}");
            }
        }
        Command::Fix {
            input,
            output,
            no_borders,
            no_autofit,
            no_spacing,
            no_align,
            no_merge,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let mut session = open(&input, config)?;
            let mut report = session.analyze();
            for info in &mut report.tables {
                let options = &mut info.options;
                options.fix_borders &= !no_borders;
                options.autofit &= !no_autofit;
                options.fix_spacing &= !no_spacing;
                options.fix_align &= !no_align;
                options.merge_next &= !no_merge;
            }
            let summary = session.repair(&report.tables);
            session
                .save(&output)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!(
                "Repaired {} table(s), merged {}, normalized {} gap(s) -> {}",
                summary.tables_repaired,
                summary.merges,
                summary.gaps_normalized,
                output.display()
            );
            for warning in summary.warnings {
                eprintln!("warning: {warning}");
            }
        }
        Command::Fill {
            input,
            output,
            values,
            results,
            levels,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let values: FieldValues = match values {
                Some(path) => {
                    let content = std::fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    serde_json::from_str(&content)
                        .with_context(|| format!("Invalid field values in {}", path.display()))?
                }
                None => FieldValues::new(),
            };
            let results = results
                .map(|path| {
                    ExtractionResult::load(&path)
                        .with_context(|| format!("Invalid extraction result in {}", path.display()))
                })
                .transpose()?;

            let mut session = open(&input, config)?;
            let summary = session.fill(&FillRequest {
                values,
                results,
                levels,
            });
            session
                .save(&output)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!(
                "Filled {} label(s), {} result cell(s){} -> {}",
                summary.labels_filled.len(),
                summary.cells_written,
                if summary.summary_rebuilt { ", summary" } else { "" },
                output.display()
            );
        }
        Command::Goals {
            input,
            output,
            selection,
            no_smart_split,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let selection = GoalSelection::load(&selection).with_context(|| {
                format!("Failed to read goal selection: {}", selection.display())
            })?;
            let mut session = open(&input, config)?;
            let summary = session.synthesize(&selection, !no_smart_split)?;
            session
                .save(&output)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!(
                "Wrote {} goal(s) in {} domain(s) as {} row(s) -> {}",
                summary.goals,
                summary.domains,
                summary.rows,
                output.display()
            );
        }
        Command::Extract { files } => {
            let fragments = extract_sources(&DocxTextExtractor, &files, |percent| {
                eprintln!("[{percent:>3}%]");
            })
            .await?;
            for (path, fragment) in files.iter().zip(fragments) {
                println!("== {} ==\n{fragment}\n", path.display());
            }
        }
        Command::Config { action } => match action {
            ConfigAction::Init => match cli.config.as_deref() {
                Some(path) => {
                    Config::default().save_to(path)?;
                    println!("Wrote default configuration to {}", path.display());
                }
                None => {
                    let path = Config::get_config_path()
                        .context("No configuration directory on this system")?;
                    Config::init_default()?;
                    println!("Wrote default configuration to {}", path.display());
                }
            },
            ConfigAction::Path => match cli.config.clone().or_else(Config::get_config_path) {
                Some(path) => println!("{}", path.display()),
                None => println!("(no configuration directory)"),
            },
        },
    }

    Ok(())
}
