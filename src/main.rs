//! CLI entry point for phenomatch.
//!
//! Imports phenotype embeddings, builds one averaged vector per disease and
//! ranks diseases for a list of observed phenotype terms.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use phenomatch::display::{self, THEME};
use phenomatch::ingest::{import_embeddings, load_annotations, load_cache};
use phenomatch::io::{ExitCode, JsonResponse, OutputFormat, ResponseMeta};
use phenomatch::{
    DiseaseId, DistanceMetric, PhenomatchError, PhenomatchResult, Pipeline, QueryOutcome,
    QueryService, ReadOnlyStore, Settings, VectorDatabase,
};
use serde::Serialize;
use tracing::Level;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Phenotype-driven disease matching
#[derive(Parser)]
#[command(
    name = "phenomatch",
    version = env!("CARGO_PKG_VERSION"),
    about = "Rank diseases by similarity to observed phenotypes",
    long_about = "Average ontology embeddings of annotated phenotypes into one vector per disease, then rank diseases for a set of observed phenotype terms.",
    next_line_help = true,
    styles = clap_cargo_style(),
    after_help = "Quick Start:\n  $ phenomatch init\n  $ phenomatch import-embeddings hp_embeddings.jsonl\n  $ phenomatch ingest --annotations phenotype.hpoa\n  $ phenomatch query HP:0001250 HP:0001263 --limit 5"
)]
struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
enum Commands {
    /// Initialize project
    #[command(about = "Set up .phenomatch directory with default configuration")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show current configuration settings
    #[command(about = "Display active settings from .phenomatch/settings.toml")]
    Config,

    /// Import phenotype embeddings from a JSON-lines file
    #[command(
        name = "import-embeddings",
        after_help = "Each line: {\"id\": \"HP:0000118\", \"embedding\": [..], \"metadata\": {\"label\": \"..\"}}"
    )]
    ImportEmbeddings {
        /// JSON-lines file with one embedding per line
        file: PathBuf,

        /// Target collection (defaults to collections.embeddings)
        #[arg(long)]
        collection: Option<String>,

        /// Metric used if the collection is created (defaults to search.metric)
        #[arg(long)]
        metric: Option<DistanceMetric>,
    },

    /// Build one averaged vector per disease
    #[command(about = "Build disease vectors from annotations and phenotype embeddings")]
    Ingest {
        /// Tab-delimited annotation file (overrides annotations.* settings)
        #[arg(short, long)]
        annotations: Option<PathBuf>,
    },

    /// Rank diseases for observed phenotypes
    #[command(
        after_help = "Examples:\n  phenomatch query HP:0001250\n  phenomatch query HP:0001250 HP:0001263 --limit 5 --json"
    )]
    Query {
        /// Phenotype term ids, matched exactly
        #[arg(required = true, num_args = 1..)]
        phenotypes: Vec<String>,

        /// Number of diseases to return (defaults to search.top_k)
        #[arg(short = 'k', long)]
        limit: Option<usize>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show how each annotated phenotype relates to a disease vector
    Explain {
        /// Disease id, e.g. OMIM:619340
        disease: String,

        /// Tab-delimited annotation file (overrides annotations.* settings)
        #[arg(short, long)]
        annotations: Option<PathBuf>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// List collections in the vector database
    Collections {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

impl Commands {
    fn output_format(&self) -> OutputFormat {
        let json = match self {
            Commands::Query { json, .. }
            | Commands::Explain { json, .. }
            | Commands::Collections { json } => *json,
            _ => false,
        };
        OutputFormat::from_json_flag(json)
    }
}

#[derive(Serialize)]
struct RankingOutput<'a> {
    phenotypes: &'a [String],
    results: &'a [phenomatch::Neighbor],
}

fn main() {
    let cli = Cli::parse();

    if !matches!(cli.command, Commands::Init { .. }) {
        if let Err(warning) = Settings::check_init() {
            if cli.config.is_none() {
                eprintln!("{}", THEME.warning_with_icon(&warning));
                eprintln!("Using default configuration. Run 'phenomatch init' to create one.");
            }
        }
    }

    let settings = match &cli.config {
        Some(config_path) => Settings::load_from(config_path).unwrap_or_else(|e| {
            eprintln!(
                "Configuration error loading from {}: {e}",
                config_path.display()
            );
            std::process::exit(ExitCode::ConfigError.into());
        }),
        None => Settings::load().unwrap_or_else(|e| {
            eprintln!("Configuration error: {e}");
            Settings::default()
        }),
    };

    init_tracing(cli.verbose || settings.debug);

    let format = cli.command.output_format();
    let code = match run(&cli, &settings) {
        Ok(code) => code,
        Err(error) => report_error(&error, format),
    };
    std::process::exit(code.into());
}

fn init_tracing(debug: bool) {
    let level = if debug { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn report_error(error: &anyhow::Error, format: OutputFormat) -> ExitCode {
    let Some(error) = error.downcast_ref::<PhenomatchError>() else {
        eprintln!("{}", THEME.error_with_icon(&format!("{error:#}")));
        return ExitCode::GeneralError;
    };

    if format.is_json() {
        let response = JsonResponse::from_error(error).with_meta(ResponseMeta::now(None));
        if let Ok(json) = serde_json::to_string_pretty(&response) {
            println!("{json}");
        }
    } else {
        eprintln!("{}", THEME.error_with_icon(&error.to_string()));
        for suggestion in error.recovery_suggestions() {
            eprintln!("  {}", THEME.apply(&THEME.dim, format!("- {suggestion}")));
        }
    }
    ExitCode::from_error(error)
}

fn run(cli: &Cli, settings: &Settings) -> anyhow::Result<ExitCode> {
    match &cli.command {
        Commands::Init { force } => {
            let cwd = std::env::current_dir().context("Cannot determine current directory")?;
            let path = Settings::init_config_file(&cwd, *force)
                .map_err(|e| anyhow::anyhow!("{e}"))?;
            println!(
                "{}",
                THEME.success_with_icon(&format!("Created configuration at {}", path.display()))
            );
            println!("Edit this file to point at your annotation source.");
            Ok(ExitCode::Success)
        }
        Commands::Config => {
            let rendered =
                toml::to_string_pretty(settings).context("Failed to render configuration")?;
            println!("{}", THEME.apply(&THEME.header, "Active configuration"));
            println!("{rendered}");
            Ok(ExitCode::Success)
        }
        command => Ok(dispatch(command, settings)?),
    }
}

fn open_database(settings: &Settings) -> PhenomatchResult<VectorDatabase> {
    Ok(VectorDatabase::open(settings.resolved_db_path())?)
}

fn dispatch(command: &Commands, settings: &Settings) -> PhenomatchResult<ExitCode> {
    match command {
        Commands::ImportEmbeddings {
            file,
            collection,
            metric,
        } => {
            let name = collection
                .as_deref()
                .unwrap_or(&settings.collections.embeddings);
            let metric = metric.unwrap_or(settings.search.metric);

            let mut database = open_database(settings)?;
            let target = database.get_or_create_collection(name, metric)?;
            let stats = import_embeddings(file, target)?;
            database.persist(name)?;

            println!(
                "{}",
                THEME.success_with_icon(&format!(
                    "Imported {} embeddings into '{}' ({} lines skipped)",
                    stats.imported, name, stats.skipped
                ))
            );
            for (line, reason) in stats.errors.iter().take(5) {
                eprintln!("  line {line}: {reason}");
            }
            Ok(ExitCode::Success)
        }

        Commands::Ingest { annotations } => {
            let mut database = open_database(settings)?;
            let report = Pipeline::new(settings, &mut database).ingest(annotations.as_deref())?;

            println!("{}", display::create_ingest_table(&report));
            for failure in report.build.failures.iter().take(5) {
                eprintln!(
                    "{}",
                    THEME.warning_with_icon(&format!("{}: {}", failure.disease, failure.reason))
                );
            }
            if report.build.failed() > 5 {
                eprintln!("  ... and {} more failures", report.build.failed() - 5);
            }
            Ok(ExitCode::Success)
        }

        Commands::Query {
            phenotypes,
            limit,
            json,
        } => {
            let started = Instant::now();
            let k = limit.unwrap_or(settings.search.top_k);
            let k = NonZeroUsize::new(k).ok_or_else(|| PhenomatchError::Config {
                reason: "query limit must be greater than zero".to_string(),
            })?;

            let database = open_database(settings)?;
            let cache = load_cache(&database, settings)?;
            let diseases = database.get_collection(&settings.collections.disease_embeddings)?;
            let store = ReadOnlyStore::new(diseases);
            let outcome = QueryService::new(&cache, &store).query(phenotypes.as_slice(), k)?;

            let format = OutputFormat::from_json_flag(*json);
            match (&outcome, format) {
                (QueryOutcome::NoMatch, OutputFormat::Json) => {
                    print_json(&JsonResponse::no_match(phenotypes));
                }
                (QueryOutcome::NoMatch, OutputFormat::Text) => {
                    eprintln!(
                        "{}",
                        THEME.warning_with_icon(
                            "None of the given phenotypes has an embedding; no ranking produced"
                        )
                    );
                }
                (QueryOutcome::Ranked(results), OutputFormat::Json) => {
                    let elapsed = started.elapsed().as_millis() as u64;
                    print_json(
                        &JsonResponse::success(RankingOutput {
                            phenotypes,
                            results,
                        })
                        .with_meta(ResponseMeta::now(Some(elapsed))),
                    );
                }
                (QueryOutcome::Ranked(results), OutputFormat::Text) => {
                    if results.is_empty() {
                        println!(
                            "No diseases stored in '{}'",
                            settings.collections.disease_embeddings
                        );
                    } else {
                        println!("{}", display::create_ranking_table(results));
                    }
                }
            }
            Ok(ExitCode::from_outcome(&outcome))
        }

        Commands::Explain {
            disease,
            annotations,
            json,
        } => {
            let database = open_database(settings)?;
            let cache = load_cache(&database, settings)?;
            let index = load_annotations(&database, settings, annotations.as_deref())?;
            let diseases = database.get_collection(&settings.collections.disease_embeddings)?;
            let store = ReadOnlyStore::new(diseases);

            let rows = QueryService::new(&cache, &store)
                .explain(&DiseaseId::from(disease.as_str()), &index)?;
            if *json {
                print_json(&JsonResponse::success(&rows));
            } else {
                println!(
                    "{} {}",
                    THEME.apply(&THEME.header, "Disease"),
                    THEME.apply(&THEME.id, disease)
                );
                println!("{}", display::create_explain_table(&rows));
            }
            Ok(ExitCode::Success)
        }

        Commands::Collections { json } => {
            let database = open_database(settings)?;
            let descriptors = database.list_collections();
            if *json {
                print_json(&JsonResponse::success(&descriptors));
            } else if descriptors.is_empty() {
                println!(
                    "No collections in {}",
                    THEME.apply(&THEME.path, database.path().display())
                );
            } else {
                println!("{}", display::create_collections_table(&descriptors));
            }
            Ok(ExitCode::Success)
        }

        Commands::Init { .. } | Commands::Config => Ok(ExitCode::Success),
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Failed to serialize output: {e}"),
    }
}
