use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::json;

use vessel_log::data::loader::load_file;
use vessel_log::data::time_index::normalize_with;
use vessel_log::state::{parse_interval, Session};
use vessel_log::{
    ColumnSelection, DateInterval, IngestOptions, RegressionQuery, SeriesQuery, TableQuery,
};

/// Query a vessel datalogger export from the command line.
#[derive(Debug, Parser)]
#[command(name = "vessel-log", version, about)]
struct Cli {
    /// Datalogger export (.csv, .xls, .xlsx)
    file: PathBuf,

    /// JSON file with ingestion options
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Vessel banner, date span and available columns
    Info,
    /// Parameters vs time
    Series {
        #[command(flatten)]
        range: RangeArgs,
        /// Comma-separated column names
        #[arg(long, value_delimiter = ',', required = true)]
        columns: Vec<String>,
    },
    /// Least-squares fit of Y against X
    Regress {
        #[command(flatten)]
        range: RangeArgs,
        #[arg(short, long)]
        x: String,
        #[arg(short, long)]
        y: String,
    },
    /// Row report over a list or a contiguous range of columns
    Table {
        #[command(flatten)]
        range: RangeArgs,
        #[arg(long, value_delimiter = ',', conflicts_with_all = ["first", "last"])]
        columns: Vec<String>,
        #[arg(long, requires = "last")]
        first: Option<String>,
        #[arg(long, requires = "first")]
        last: Option<String>,
    },
}

#[derive(Debug, Args)]
struct RangeArgs {
    /// First day, YYYY-MM-DD (inclusive)
    #[arg(long)]
    from: Option<String>,
    /// Last day, YYYY-MM-DD (inclusive)
    #[arg(long)]
    to: Option<String>,
}

impl RangeArgs {
    fn interval(&self) -> Result<DateInterval> {
        Ok(parse_interval(self.from.as_deref(), self.to.as_deref())?)
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let options = match &cli.config {
        Some(path) => IngestOptions::from_json_file(path)?,
        None => IngestOptions::default(),
    };
    let raw = load_file(&cli.file, &options)?;
    let table = normalize_with(raw, &options)
        .with_context(|| format!("indexing {}", cli.file.display()))?;

    let mut session = Session::new(options);
    session.set_table(table);

    let output = match &cli.command {
        Command::Info => {
            let banner = session.banner(chrono::Local::now().naive_local())?;
            println!("{banner}");
            json!({
                "identity": session.identity()?,
                "date_span": session.date_span()?,
                "rows": session.table()?.len(),
                "columns": session.column_options()?,
            })
        }
        Command::Series { range, columns } => {
            let query = SeriesQuery::new(range.interval()?, columns.as_slice())?;
            serde_json::to_value(session.series(&query)?)?
        }
        Command::Regress { range, x, y } => {
            let query = RegressionQuery::new(range.interval()?, x.as_str(), y.as_str())?;
            let fit = session.regression(&query)?;
            json!({
                "x": x,
                "y": y,
                "slope": fit.slope,
                "intercept": fit.intercept,
                "r_squared": fit.r_squared,
                "trend_line": fit.trend_line(),
                "points": fit.points,
            })
        }
        Command::Table {
            range,
            columns,
            first,
            last,
        } => {
            let selection = match (first, last) {
                (Some(first), Some(last)) => ColumnSelection::range(first.as_str(), last.as_str()),
                _ if !columns.is_empty() => ColumnSelection::list(columns.as_slice()),
                _ => bail!("pass --columns or both --first and --last"),
            };
            let rows = session.report(&TableQuery::new(range.interval()?, selection))?;
            serde_json::to_value(rows.to_records())?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
