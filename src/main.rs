use clap::{Parser, Subcommand};
use prettytable::{Cell, Row, Table};
use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;

use heapdb::buffer::TransactionId;
use heapdb::database::{Database, DatabaseError};
use heapdb::execution::{
    Aggregate, AggregateOp, CompareOp, ExecutionError, Filter, OpIterator, Predicate,
};
use heapdb::file::BUFFER_POOL_SIZE;
use heapdb::record::{DataType, NULL_NAME, RecordError, Schema};

#[derive(Debug, Error)]
enum CliError {
    #[error("{0}")]
    Database(#[from] DatabaseError),

    #[error("{0}")]
    Execution(#[from] ExecutionError),

    #[error("{0}")]
    Record(#[from] RecordError),

    #[error("{0}")]
    Usage(String),
}

type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "heapdb", version, about = "Query fixed-schema heap files")]
struct Cli {
    /// Directory holding heap files and catalog.json
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Pages kept in the buffer pool
    #[arg(long, default_value_t = BUFFER_POOL_SIZE)]
    pool_pages: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List tables and their schemas
    Tables,

    /// Encode a headerless CSV file as a new table
    Import {
        table: String,
        csv: PathBuf,
        /// Comma-separated `name:type` list, e.g. `id:int,name:text(20)`
        #[arg(long)]
        fields: String,
        #[arg(long, default_value_t = ',')]
        delimiter: char,
    },

    /// Print the records of a table
    Scan {
        table: String,
        #[arg(long)]
        alias: Option<String>,
        /// Keep records where FIELD OP VALUE holds; may be repeated
        #[arg(long = "filter", num_args = 3, value_names = ["FIELD", "OP", "VALUE"])]
        filters: Vec<String>,
    },

    /// Compute COUNT, SUM, MIN, MAX or AVG over a table
    Aggregate {
        table: String,
        /// One of count, sum, min, max, avg
        #[arg(long)]
        op: String,
        #[arg(long)]
        field: String,
        #[arg(long)]
        group_by: Option<String>,
        #[arg(long = "filter", num_args = 3, value_names = ["FIELD", "OP", "VALUE"])]
        filters: Vec<String>,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    let db = Database::open_with_capacity(&cli.data_dir, cli.pool_pages)?;

    match cli.command {
        Command::Tables => list_tables(&db),
        Command::Import {
            table,
            csv,
            fields,
            delimiter,
        } => {
            let schema = parse_fields(&fields)?;
            let delimiter = u8::try_from(delimiter)
                .map_err(|_| CliError::Usage(format!("Delimiter {:?} is not ASCII", delimiter)))?;
            db.import_csv(&table, &csv, schema, delimiter)?;
            println!("Imported {} into table {}", csv.display(), table);
            Ok(())
        }
        Command::Scan {
            table,
            alias,
            filters,
        } => {
            let (mut plan, _) = build_scan(&db, &table, alias.as_deref(), &filters)?;
            print_records(plan.as_mut())
        }
        Command::Aggregate {
            table,
            op,
            field,
            group_by,
            filters,
        } => {
            let (plan, alias) = build_scan(&db, &table, None, &filters)?;
            let agg_field = field_index(plan.schema(), &alias, &field)?;
            let group_field = group_by
                .map(|name| field_index(plan.schema(), &alias, &name))
                .transpose()?;
            let op = op.parse::<AggregateOp>()?;
            let mut aggregate = Aggregate::new(plan, agg_field, group_field, op)?;
            print_records(&mut aggregate)
        }
    }
}

fn list_tables(db: &Database) -> CliResult<()> {
    let catalog = db.catalog();
    let mut table = Table::new();
    table.set_titles(Row::new(vec![
        Cell::new("table"),
        Cell::new("id"),
        Cell::new("pages"),
        Cell::new("fields"),
    ]));

    for table_id in catalog.table_ids() {
        let name = catalog.table_name(table_id).map_err(DatabaseError::from)?;
        let file = catalog.file(table_id).map_err(DatabaseError::from)?;
        table.add_row(Row::new(vec![
            Cell::new(&name),
            Cell::new(&table_id.to_string()),
            Cell::new(&file.page_count().to_string()),
            Cell::new(&file.schema().to_string()),
        ]));
    }

    table.printstd();
    Ok(())
}

/// Parse `name:type,name:type,...`
fn parse_fields(list: &str) -> CliResult<Schema> {
    let mut types = Vec::new();
    let mut names = Vec::new();
    for field in list.split(',') {
        let (name, data_type) = field
            .split_once(':')
            .ok_or_else(|| CliError::Usage(format!("Expected name:type, got {:?}", field)))?;
        types.push(data_type.parse::<DataType>()?);
        names.push(Some(name.trim().to_string()));
    }
    Ok(Schema::new(types, names)?)
}

/// Resolve a field by its qualified name or by its bare name under `alias`
fn field_index(schema: &Schema, alias: &str, name: &str) -> CliResult<usize> {
    schema
        .index_of(name)
        .or_else(|_| schema.index_of(&format!("{}.{}", alias, name)))
        .map_err(CliError::from)
}

/// A scan of `table` wrapped in one filter per `FIELD OP VALUE` triple
fn build_scan(
    db: &Database,
    table: &str,
    alias: Option<&str>,
    filters: &[String],
) -> CliResult<(Box<dyn OpIterator>, String)> {
    let scan = db.seq_scan(TransactionId::new(), table, alias)?;
    let alias = scan.alias().to_string();
    let mut plan: Box<dyn OpIterator> = Box::new(scan);

    for triple in filters.chunks(3) {
        let [field, op, value] = triple else {
            return Err(CliError::Usage("--filter takes FIELD OP VALUE".to_string()));
        };
        let index = field_index(plan.schema(), &alias, field)?;
        let operand = plan.schema().type_at(index)?.parse_value(value)?;
        let predicate = Predicate::new(index, op.parse::<CompareOp>()?, operand)?;
        plan = Box::new(Filter::new(predicate, plan));
    }

    Ok((plan, alias))
}

fn print_records(plan: &mut dyn OpIterator) -> CliResult<()> {
    let schema = plan.schema();
    let titles = (0..schema.field_count())
        .map(|i| Cell::new(schema.name_at(i).ok().flatten().unwrap_or(NULL_NAME)))
        .collect();

    let mut table = Table::new();
    table.set_titles(Row::new(titles));

    plan.open()?;
    let mut count = 0;
    while plan.has_next()? {
        let record = plan.next()?;
        let cells = record
            .values()
            .iter()
            .map(|value| Cell::new(&value.to_string()))
            .collect();
        table.add_row(Row::new(cells));
        count += 1;
    }
    plan.close();

    table.printstd();
    println!("{} rows", count);
    Ok(())
}
