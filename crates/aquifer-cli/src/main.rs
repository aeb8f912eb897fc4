mod display;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use aquifer_ai::AssistConfig;
use aquifer_core::{Lexicon, StructuredQuery};
use aquifer_resolve::Resolver;
use aquifer_store::{AssessmentSource, DuckStore};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Answer questions about groundwater assessment data.
#[derive(Debug, Parser)]
#[command(name = "aquifer", version)]
struct Cli {
    /// DuckDB database holding `gw_assessment_core`.
    #[arg(long, env = "AQUIFER_DB", global = true)]
    db: Option<PathBuf>,

    /// JSON lexicon overriding the built-in keyword tables.
    #[arg(long, env = "AQUIFER_LEXICON", global = true)]
    lexicon: Option<PathBuf>,

    /// Base URL of an OpenAI-compatible completion API; unset disables assistance.
    #[arg(long, env = "AQUIFER_LLM_URL", global = true)]
    llm_url: Option<String>,

    #[arg(long, env = "AQUIFER_LLM_MODEL", global = true, default_value = "gpt-4o-mini")]
    llm_model: String,

    #[arg(long, env = "AQUIFER_LLM_API_KEY", global = true, hide_env_values = true)]
    llm_api_key: Option<String>,

    #[arg(long, env = "AQUIFER_LLM_TIMEOUT_SECS", global = true, default_value_t = 8)]
    llm_timeout_secs: u64,

    /// Print JSON instead of tables.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve a question into a structured query without running it.
    Parse { question: Vec<String> },
    /// Run a structured query given as JSON (`-` reads stdin).
    Query { json: String },
    /// Answer a question.
    Ask { question: Vec<String> },
    /// List known states and districts.
    Places {
        #[arg(long)]
        state: Option<String>,
    },
    /// Load the fact table from a Parquet file or hive-partitioned directory.
    Import { path: PathBuf },
    /// Report on the database.
    Status,
}

impl Cli {
    fn assist(&self) -> AssistConfig {
        AssistConfig {
            base_url: self.llm_url.clone(),
            model: self.llm_model.clone(),
            api_key: self.llm_api_key.clone(),
            timeout: Duration::from_secs(self.llm_timeout_secs),
        }
    }

    fn lexicon(&self) -> anyhow::Result<Lexicon> {
        match &self.lexicon {
            Some(path) => Lexicon::from_path(path)
                .with_context(|| format!("loading lexicon {}", path.display())),
            None => Ok(Lexicon::default()),
        }
    }

    fn db_path(&self) -> anyhow::Result<&Path> {
        match &self.db {
            Some(path) => Ok(path),
            None => bail!("no database given; pass --db or set AQUIFER_DB"),
        }
    }

    /// Open the database and refuse to continue without the fact table.
    fn open_ready(&self) -> anyhow::Result<DuckStore> {
        let path = self.db_path()?;
        let store = DuckStore::open_persistent(path)
            .with_context(|| format!("opening {}", path.display()))?;
        store
            .require_assessment_table()
            .context("database is not ready; run `aquifer import` first")?;
        Ok(store)
    }

    fn resolver(&self) -> anyhow::Result<Resolver<DuckStore>> {
        let store = self.open_ready()?;
        let assist = self.assist().build().context("configuring completion service")?;
        Ok(Resolver::new(store, &self.lexicon()?, assist)?)
    }
}

fn joined(words: &[String]) -> String {
    words.join(" ")
}

fn emit<T: Serialize>(json: bool, value: &T, human: impl FnOnce(&T) -> String) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print!("{}", human(value));
    }
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match &cli.command {
        Command::Parse { question } => {
            let parsed = cli.resolver()?.parse(&joined(question)).await?;
            emit(cli.json, &parsed, display::render_parsed)
        }
        Command::Query { json } => {
            let raw = if json == "-" {
                let mut buf = String::new();
                std::io::stdin().read_to_string(&mut buf)?;
                buf
            } else {
                json.clone()
            };
            let query: StructuredQuery =
                serde_json::from_str(&raw).context("parsing structured query")?;
            let answer = cli.resolver()?.query(query).await?;
            emit(cli.json, &answer, display::render_answer)
        }
        Command::Ask { question } => {
            let answer = cli.resolver()?.ask(&joined(question)).await?;
            emit(cli.json, &answer, display::render_answer)
        }
        Command::Places { state } => {
            let store = cli.open_ready()?;
            let mut places = store.known_places()?;
            if let Some(state) = state {
                places.retain(|p| p.state.eq_ignore_ascii_case(state.trim()));
            }
            emit(cli.json, &places, |p| display::render_places(p))
        }
        Command::Import { path } => {
            let db = cli.db_path()?;
            let store = DuckStore::open_persistent(db)
                .with_context(|| format!("opening {}", db.display()))?;
            let count = store
                .import_parquet(path)
                .with_context(|| format!("importing {}", path.display()))?;
            tracing::info!(count, db = %db.display(), "import complete");
            eprintln!("Imported {count} rows into {}", db.display());
            Ok(())
        }
        Command::Status => {
            let db = cli.db_path()?;
            let store = DuckStore::open_persistent(db)
                .with_context(|| format!("opening {}", db.display()))?;
            let status = status(&store);
            emit(cli.json, &status, display::render_status)
        }
    }
}

/// Snapshot of the database for `aquifer status`.
#[derive(Debug, Serialize)]
pub struct Status {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub problem: Option<String>,
    pub rows: usize,
    pub states: usize,
    pub districts: usize,
    pub latest_year: Option<i32>,
}

fn status(store: &DuckStore) -> Status {
    if let Err(e) = store.require_assessment_table() {
        return Status {
            ready: false,
            problem: Some(e.to_string()),
            rows: 0,
            states: 0,
            districts: 0,
            latest_year: None,
        };
    }
    let places = store.known_places().unwrap_or_default();
    let states: std::collections::BTreeSet<&str> =
        places.iter().map(|p| p.state.as_str()).collect();
    Status {
        ready: true,
        problem: None,
        rows: store.assessment_count().unwrap_or(0),
        states: states.len(),
        districts: places.len(),
        latest_year: store.latest_year(None, None).ok().flatten(),
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!("aquifer v{}", env!("CARGO_PKG_VERSION"));

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(run(cli))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aquifer_store::fixtures;

    #[test]
    fn parses_ask_with_globals() {
        let cli = Cli::try_parse_from([
            "aquifer",
            "--db",
            "/tmp/gw.duckdb",
            "ask",
            "list",
            "critical",
            "districts",
            "--json",
        ])
        .unwrap();
        assert!(cli.json);
        assert_eq!(cli.db.as_deref(), Some(Path::new("/tmp/gw.duckdb")));
        match cli.command {
            Command::Ask { question } => assert_eq!(joined(&question), "list critical districts"),
            other => panic!("unexpected command {other:?}"),
        }
    }

    fn cli_with_url(url: Option<&str>) -> Cli {
        let mut cli = Cli::try_parse_from(["aquifer", "--llm-timeout-secs", "3", "status"]).unwrap();
        cli.llm_url = url.map(str::to_string);
        cli
    }

    #[test]
    fn assist_disabled_without_url() {
        let assist = cli_with_url(None).assist();
        assert_eq!(assist.timeout, Duration::from_secs(3));
        assert!(!assist.build().unwrap().is_enabled());

        let blank = cli_with_url(Some("  ")).assist();
        assert!(!blank.build().unwrap().is_enabled());
    }

    #[test]
    fn assist_enabled_with_url() {
        let assist = cli_with_url(Some("http://127.0.0.1:11434/v1")).assist();
        assert_eq!(assist.base_url.as_deref(), Some("http://127.0.0.1:11434/v1"));
        assert!(assist.build().unwrap().is_enabled());
    }

    #[test]
    fn status_reports_missing_table() {
        let store = DuckStore::open().unwrap();
        let s = status(&store);
        assert!(!s.ready);
        assert!(s.problem.unwrap().contains("gw_assessment_core"));
    }

    #[test]
    fn status_of_seeded_store() {
        let store = fixtures::seeded_store().unwrap();
        let s = status(&store);
        assert!(s.ready);
        assert_eq!(s.rows, fixtures::records().len());
        assert_eq!(s.states, 5);
        assert_eq!(s.latest_year, Some(2023));
    }

    #[test]
    fn import_then_status_through_persistent_db() {
        let tmp = tempfile::TempDir::new().unwrap();
        let db = tmp.path().join("gw.duckdb");
        let store = DuckStore::open_persistent(&db).unwrap();
        fixtures::seed(&store).unwrap();
        drop(store);

        let cli = Cli::try_parse_from(["aquifer", "--db", db.to_str().unwrap(), "places"]).unwrap();
        let store = cli.open_ready().unwrap();
        assert!(store.known_places().unwrap().len() > 10);
    }
}
