use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pier_cli::commands::{self, run, schema, tables};
use pier_core::PierConfig;
use pier_data::Adapter;

#[derive(Parser)]
#[command(name = "pier", version, about = "Pier CLI: inspect and maintain Pier databases")]
struct Cli {
    /// Database file (defaults to pier.database.name from pier.yaml)
    #[arg(long, global = true)]
    database: Option<String>,
    /// Configuration profile
    #[arg(long, global = true, default_value = "dev")]
    profile: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List tables with their row counts
    Tables,
    /// Export or import the database structure
    Schema {
        #[command(subcommand)]
        action: SchemaAction,
    },
    /// Delete every row of the given tables
    Empty {
        #[arg(required = true)]
        tables: Vec<String>,
    },
    /// Drop the given tables
    Drop {
        #[arg(required = true)]
        tables: Vec<String>,
    },
    /// Run a SQL script inside one transaction
    Run {
        /// Script file; statements end with `;` at the end of a line
        script: PathBuf,
        /// Placeholder value, substituted for `{$name}` (e.g. --var tp=pp_)
        #[arg(long = "var", value_parser = run::parse_var)]
        vars: Vec<(String, String)>,
    },
}

#[derive(Subcommand)]
enum SchemaAction {
    /// Print every CREATE TABLE statement
    Export {
        /// Write to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Create the tables of another database
    Import {
        /// Source database file
        #[arg(long)]
        from: String,
        /// Drop every existing table first
        #[arg(long)]
        clear: bool,
    },
}

async fn execute(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = PierConfig::load(&cli.profile)?;
    let adapter = commands::connect(cli.database.as_deref(), &config).await?;

    let result = match cli.command {
        Commands::Tables => tables::run(&*adapter).await,
        Commands::Schema { action } => match action {
            SchemaAction::Export { out } => schema::export(&*adapter, out.as_deref()).await,
            SchemaAction::Import { from, clear } => {
                schema::import(&*adapter, &from, clear).await.map(|_| ())
            }
        },
        Commands::Empty { tables } => tables::empty(&*adapter, &tables).await,
        Commands::Drop { tables } => tables::drop(&*adapter, &tables).await,
        Commands::Run { script, vars } => run::run(&*adapter, &script, &vars).await.map(|_| ()),
    };

    adapter.disconnect().await?;
    result
}

fn main() {
    pier_core::try_init_tracing();
    let cli = Cli::parse();

    let result = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(Into::into)
        .and_then(|runtime| runtime.block_on(execute(cli)));

    if let Err(e) = result {
        eprintln!("{}", colored::Colorize::red(format!("Error: {e}").as_str()));
        std::process::exit(1);
    }
}
