//! schemadelta CLI
//!
//! Compares live MySQL/MariaDB schemas and prints the DDL that turns one into
//! the other.

use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use regex::Regex;
use serde::Serialize;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use schemadelta::prelude::*;

/// Schema introspection and diffing for MySQL and MariaDB.
#[derive(Parser)]
#[command(name = "schemadelta")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Maximum number of concurrent queries per operation.
    #[arg(long, global = true, default_value_t = 10)]
    concurrency: usize,

    /// Per-query timeout in seconds.
    #[arg(long, global = true, default_value_t = 30)]
    query_timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the statements that turn one schema into another.
    Diff {
        /// Server holding the current schema.
        #[arg(long, env = "SCHEMADELTA_FROM_DSN")]
        from: String,

        /// Server holding the desired schema (defaults to --from).
        #[arg(long, env = "SCHEMADELTA_TO_DSN")]
        to: Option<String>,

        /// Current schema name.
        from_schema: String,

        /// Desired schema name (defaults to the current schema name).
        to_schema: Option<String>,

        #[command(flatten)]
        modifiers: ModifierArgs,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Sql)]
        format: OutputFormat,
    },

    /// Print each table's generated CREATE statement and whether it can be
    /// diffed.
    Show {
        /// Server to introspect.
        #[arg(long, env = "SCHEMADELTA_DSN")]
        dsn: String,

        /// Schema name.
        schema: String,
    },
}

#[derive(Args)]
struct ModifierArgs {
    /// Allow statements that may lose data (DROP TABLE, DROP COLUMN, ...).
    #[arg(long)]
    allow_unsafe: bool,

    /// LOCK clause for ALTER TABLE (e.g. NONE, SHARED).
    #[arg(long)]
    lock: Option<String>,

    /// ALGORITHM clause for ALTER TABLE (e.g. INPLACE, INSTANT).
    #[arg(long)]
    algorithm: Option<String>,

    /// AUTO_INCREMENT handling.
    #[arg(long, value_enum, default_value_t = AutoIncArg::Ignore)]
    next_auto_inc: AutoIncArg,

    /// Skip tables whose name matches this regular expression.
    #[arg(long)]
    ignore_table: Option<String>,

    /// Re-create indexes whose only difference is their order.
    #[arg(long)]
    strict_index_order: bool,

    /// Re-create foreign keys whose only difference is their name.
    #[arg(long)]
    strict_foreign_key_naming: bool,

    /// Partitioning handling.
    #[arg(long, value_enum, default_value_t = PartitioningArg::Permissive)]
    partitioning: PartitioningArg,

    /// Match table names case-insensitively regardless of the server setting.
    #[arg(long)]
    case_insensitive: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum AutoIncArg {
    Ignore,
    IfIncreased,
    IfAlready,
    Always,
}

impl From<AutoIncArg> for NextAutoIncMode {
    fn from(arg: AutoIncArg) -> Self {
        match arg {
            AutoIncArg::Ignore => Self::Ignore,
            AutoIncArg::IfIncreased => Self::IfIncreased,
            AutoIncArg::IfAlready => Self::IfAlready,
            AutoIncArg::Always => Self::Always,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum PartitioningArg {
    Permissive,
    Keep,
}

impl From<PartitioningArg> for PartitioningMode {
    fn from(arg: PartitioningArg) -> Self {
        match arg {
            PartitioningArg::Permissive => Self::Permissive,
            PartitioningArg::Keep => Self::Keep,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Sql,
    Json,
}

impl ModifierArgs {
    fn to_modifiers(&self, flavor: Flavor) -> anyhow::Result<StatementModifiers> {
        let mut mods = StatementModifiers::new(flavor)
            .allow_unsafe(self.allow_unsafe)
            .next_auto_inc(self.next_auto_inc.into())
            .strict_index_order(self.strict_index_order)
            .strict_foreign_key_naming(self.strict_foreign_key_naming)
            .partitioning(self.partitioning.into());
        if let Some(lock) = &self.lock {
            mods = mods.lock_clause(lock.to_ascii_uppercase());
        }
        if let Some(algorithm) = &self.algorithm {
            mods = mods.algorithm_clause(algorithm.to_ascii_uppercase());
        }
        if let Some(pattern) = &self.ignore_table {
            let re = Regex::new(pattern).with_context(|| format!("invalid --ignore-table {pattern:?}"))?;
            mods = mods.ignore_table(re);
        }
        Ok(mods)
    }
}

/// Machine-readable diff output.
#[derive(Serialize)]
struct DiffReport {
    flavor: String,
    from_schema: String,
    to_schema: String,
    schema_ddl: String,
    tables: Vec<TableReport>,
    unsupported: Vec<UnsupportedReport>,
    unchanged: Vec<String>,
}

#[derive(Serialize)]
struct TableReport {
    table: String,
    kind: &'static str,
    statements: Vec<String>,
    forbidden: Option<String>,
}

#[derive(Serialize)]
struct UnsupportedReport {
    table: String,
    reason: UnsupportedReason,
    message: String,
}

async fn load_optional(instance: &Instance, name: &str) -> anyhow::Result<Option<Schema>> {
    match instance.load_schema(name).await {
        Ok(schema) => Ok(Some(schema)),
        Err(InstanceError::UnknownSchema(_)) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn build_report(
    diff: &SchemaDiff<'_>,
    mods: &StatementModifiers,
    from_schema: &str,
    to_schema: &str,
) -> anyhow::Result<DiffReport> {
    let mut tables = Vec::new();
    for table_diff in &diff.table_diffs {
        let (statements, forbidden) = match table_diff.statements(mods) {
            Ok(statements) => (statements, None),
            Err(err @ DiffError::Forbidden { .. }) => (
                err.statement().map(str::to_string).into_iter().collect(),
                Some(err.to_string()),
            ),
            Err(err) => return Err(err.into()),
        };
        if statements.is_empty() {
            continue;
        }
        tables.push(TableReport {
            table: table_diff.table_name().to_string(),
            kind: table_diff.kind(),
            statements,
            forbidden,
        });
    }
    Ok(DiffReport {
        flavor: mods.flavor.to_string(),
        from_schema: from_schema.to_string(),
        to_schema: to_schema.to_string(),
        schema_ddl: diff.schema_ddl.clone(),
        tables,
        unsupported: diff
            .unsupported_tables
            .iter()
            .map(|u| UnsupportedReport {
                table: u.table.clone(),
                reason: u.reason,
                message: u.to_string(),
            })
            .collect(),
        unchanged: diff.same_tables.iter().map(|t| t.name.clone()).collect(),
    })
}

fn print_sql(report: &DiffReport) -> usize {
    let mut problems = 0;
    if !report.schema_ddl.is_empty() {
        println!("{};", report.schema_ddl);
    }
    for table in &report.tables {
        match &table.forbidden {
            None => {
                for statement in &table.statements {
                    println!("{statement};");
                }
            }
            Some(reason) => {
                warn!(table = %table.table, "{reason}");
                problems += 1;
                for statement in &table.statements {
                    for line in statement.lines() {
                        println!("-- {line}");
                    }
                }
            }
        }
    }
    for unsupported in &report.unsupported {
        warn!(table = %unsupported.table, "{}", unsupported.message);
        problems += 1;
    }
    problems
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let options = InstanceOptions::new()
        .concurrency(cli.concurrency)
        .query_timeout(Duration::from_secs(cli.query_timeout));

    match cli.command {
        Commands::Diff {
            from,
            to,
            from_schema,
            to_schema,
            modifiers,
            format,
        } => {
            let to_schema = to_schema.unwrap_or_else(|| from_schema.clone());
            let from_instance = Instance::connect(&from, options.clone()).await?;
            let to_instance = match &to {
                Some(dsn) if *dsn != from => Some(Instance::connect(dsn, options.clone()).await?),
                _ => None,
            };
            let target = to_instance.as_ref().unwrap_or(&from_instance);
            if target.flavor() != from_instance.flavor() {
                warn!(from = %from_instance.flavor(), to = %target.flavor(), "servers have different flavors");
            }

            let current = load_optional(&from_instance, &from_schema).await?;
            let desired = load_optional(target, &to_schema).await?;
            if current.is_none() && desired.is_none() {
                bail!("neither {from_schema} nor {to_schema} exists");
            }

            let matching = if modifiers.case_insensitive {
                TableNameMatching::CaseInsensitive
            } else {
                from_instance.name_matching()
            };
            let mods = modifiers.to_modifiers(from_instance.flavor())?;
            let diff = SchemaDiff::new(current.as_ref(), desired.as_ref(), matching);
            let report = build_report(&diff, &mods, &from_schema, &to_schema)?;

            from_instance.close_all().await;
            if let Some(instance) = &to_instance {
                instance.close_all().await;
            }

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
                OutputFormat::Sql => {
                    let problems = print_sql(&report);
                    if problems > 0 {
                        bail!("{problems} table(s) need attention");
                    }
                    if diff.is_empty() {
                        info!("schemas are identical");
                    }
                }
            }
        }

        Commands::Show { dsn, schema } => {
            let instance = Instance::connect(&dsn, options).await?;
            let snapshot = instance.load_schema(&schema).await?;
            for table in &snapshot.tables {
                if table.unsupported_ddl {
                    println!("-- {}: unsupported DDL, server output follows", table.name);
                    println!("{};\n", table.create_statement);
                } else {
                    println!("{};\n", table.generated_create_statement(instance.flavor()));
                }
            }
            for index in snapshot.tables.iter().flat_map(|t| {
                t.redundant_indexes()
                    .into_iter()
                    .map(move |i| (t.name.as_str(), i.name.as_str()))
            }) {
                info!(table = index.0, index = index.1, "redundant index");
            }
            instance.close_all().await;
        }
    }

    Ok(())
}
