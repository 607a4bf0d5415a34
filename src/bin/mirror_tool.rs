use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use rowmirror::sql::statement;
use rowmirror::{MapperConfig, Order, SqliteEngine, StorageEngine, Value, unflatten};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "mirror-tool")]
#[command(about = "Developer tooling for rowmirror databases")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the database files for an environment and account
    Locate {
        #[arg(long)]
        env: Option<String>,
        #[arg(long)]
        private_id: Option<String>,
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// List the tables of a database file
    Tables {
        #[arg(long)]
        db: PathBuf,
    },
    /// Print the rows of a table as nested JSON
    Dump {
        #[arg(long)]
        db: PathBuf,
        #[arg(long)]
        table: String,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        ascending: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Locate {
            env,
            private_id,
            dir,
        } => locate(env, private_id, dir),
        Command::Tables { db } => tables(&db),
        Command::Dump {
            db,
            table,
            limit,
            ascending,
        } => dump(&db, &table, limit, ascending),
    }
}

fn locate(env: Option<String>, private_id: Option<String>, dir: Option<PathBuf>) -> Result<()> {
    let mut config = MapperConfig::from_env().context("failed to read ROWMIRROR_* settings")?;
    if let Some(env) = env {
        config = config.environment(&env);
    }
    if let Some(private_id) = private_id {
        config = config.private_id(&private_id);
    }
    if let Some(dir) = dir {
        config = config.database_folder(dir);
    }
    config.validate()?;

    println!("public:  {}", config.database_path(true).display());
    println!("private: {}", config.database_path(false).display());
    Ok(())
}

fn open(db: &Path) -> Result<SqliteEngine> {
    if !db.exists() {
        return Err(anyhow!("database file not found: {}", db.display()));
    }
    SqliteEngine::open(db).with_context(|| format!("failed to open {}", db.display()))
}

fn tables(db: &Path) -> Result<()> {
    let engine = open(db)?;
    for table in engine.list_tables()? {
        println!("{}", table);
    }
    Ok(())
}

fn dump(db: &Path, table: &str, limit: Option<usize>, ascending: bool) -> Result<()> {
    let engine = open(db)?;
    if !engine.table_exists(table)? {
        return Err(anyhow!("no table named '{}' in {}", table, db.display()));
    }

    let order = if ascending {
        Order::Ascending
    } else {
        Order::Descending
    };
    let single = limit == Some(1);
    let stmt = statement::select(table, None, order, single);
    let rows = engine
        .query(&stmt.sql, &stmt.args, single)
        .with_context(|| format!("failed to read {}", table))?;

    let mut records = Vec::new();
    for row in rows.iter().take(limit.unwrap_or(usize::MAX)) {
        let nested = unflatten(row)?;
        records.push(Value::Map(nested).to_json());
    }
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}
