use sql_assistant::catalog::SchemaCatalog;
use sql_assistant::config::{Config, DatabaseConfig};
use sql_assistant::db::executor::MySqlExecutor;
use sql_assistant::db::introspect::introspect_schema;
use sql_assistant::llm::LlmClient;
use sql_assistant::service::SqlService;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "sql-assistant")]
#[command(about = "Natural-language to SQL assistant over a MySQL database")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Introspect the database and write the catalog artifacts
    Introspect {
        /// Output file for the table -> description mapping
        #[arg(long, default_value = "db_schema.json")]
        schema_file: PathBuf,

        /// Output file for the concatenated description text
        #[arg(long, default_value = "db_description.txt")]
        description_file: PathBuf,
    },
    /// Answer a natural-language question with SQL and results
    Ask {
        /// The question in natural language
        question: String,

        /// Catalog mapping file produced by `introspect`
        #[arg(long, default_value = "db_schema.json")]
        schema_file: PathBuf,

        /// Catalog description file produced by `introspect`
        #[arg(long, default_value = "db_description.txt")]
        description_file: PathBuf,

        /// Introspect the live database instead of loading catalog files
        #[arg(long)]
        live_schema: bool,

        /// Skip the query-rewrite stage and use the raw question
        #[arg(long)]
        no_rewrite: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    match args.command {
        Commands::Introspect {
            schema_file,
            description_file,
        } => run_introspect(schema_file, description_file).await,
        Commands::Ask {
            question,
            schema_file,
            description_file,
            live_schema,
            no_rewrite,
        } => run_ask(question, schema_file, description_file, live_schema, no_rewrite).await,
    }
}

async fn run_introspect(schema_file: PathBuf, description_file: PathBuf) -> Result<()> {
    let database = DatabaseConfig::from_env();
    let schema = introspect_schema(&database.url(), &database.name).await?;
    let catalog = SchemaCatalog::from_schema(&schema);
    catalog.write_artifacts(&schema_file, &description_file)?;

    info!(
        tables = catalog.len(),
        "wrote {} and {}",
        schema_file.display(),
        description_file.display()
    );
    Ok(())
}

async fn run_ask(
    question: String,
    schema_file: PathBuf,
    description_file: PathBuf,
    live_schema: bool,
    no_rewrite: bool,
) -> Result<()> {
    let config = Config::from_env()?;

    let catalog = if live_schema {
        let schema = introspect_schema(&config.database.url(), &config.database.name).await?;
        SchemaCatalog::from_schema(&schema)
    } else {
        SchemaCatalog::load(&schema_file, &description_file)?
    };

    let llm = LlmClient::new(config.provider.clone());
    let runner = MySqlExecutor::new(config.database.url());
    let service = SqlService::new(catalog, llm, runner).with_rewrite(!no_rewrite);

    let outcome = service.handle(&question).await?;

    println!("SQL:\n{}\n", outcome.sql);
    println!("Relevant tables: {}\n", outcome.relevant_tables.join(", "));

    if outcome.rows.is_empty() {
        println!("(no rows)");
        return Ok(());
    }

    println!("{}", outcome.columns.join(" | "));
    for row in &outcome.rows {
        let cells: Vec<String> = outcome
            .columns
            .iter()
            .map(|col| render_cell(row.get(col)))
            .collect();
        println!("{}", cells.join(" | "));
    }
    println!("\n{} row(s)", outcome.rows.len());

    Ok(())
}

fn render_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "NULL".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
