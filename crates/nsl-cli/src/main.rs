mod render;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use nsl_lib::download::{download_partition, Partition};
use nsl_lib::{
    ActionId, Dashboard, DashboardConfig, HttpStageClient, SelectedFile, StageId, Table,
};
use render::PngBackend;
use serde_json::{Map, Value};
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "nsl-dash",
    version,
    about = "Run NSL-KDD analysis stages against the remote service and render their results"
)]
struct Cli {
    /// TOML settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Service root, overrides config and NSL_DASH_BASE_URL
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// Paired scatter samples shown in charts and tables
    #[arg(long, global = true)]
    scatter_limit: Option<usize>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload an ARFF file to a single stage
    Run {
        stage: StageId,
        #[arg(long)]
        file: PathBuf,
        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,
        /// Write the stage's charts as PNG files into this directory
        #[arg(long)]
        charts_dir: Option<PathBuf>,
    },
    /// Run all six stages in order, stopping at the first failure
    RunAll {
        #[arg(long)]
        file: PathBuf,
        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,
        #[arg(long)]
        charts_dir: Option<PathBuf>,
    },
    /// Render the tables of a saved stage result (stdin when --input is omitted)
    Tables {
        stage: StageId,
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Fetch a partition written by the split stage
    Download {
        partition: Partition,
        /// Defaults to `<partition>.arff` in the current directory
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    match cli.command {
        Commands::Run {
            stage,
            file,
            format,
            charts_dir,
        } => cmd_run(
            &config,
            ActionId::Stage(stage),
            &file,
            format,
            charts_dir,
        )?,
        Commands::RunAll {
            file,
            format,
            charts_dir,
        } => cmd_run(&config, ActionId::RunAll, &file, format, charts_dir)?,
        Commands::Tables {
            stage,
            input,
            format,
        } => cmd_tables(&config, stage, input.as_deref(), format)?,
        Commands::Download { partition, out } => cmd_download(&config, partition, out)?,
    }
    Ok(())
}

fn resolve_config(cli: &Cli) -> Result<DashboardConfig> {
    let mut config = DashboardConfig::resolve(cli.config.as_deref())?;
    if let Some(url) = &cli.base_url {
        config.base_url = url.clone();
    }
    if let Some(limit) = cli.scatter_limit {
        config.scatter_limit = limit;
    }
    config.validate()?;
    Ok(config)
}

fn cmd_run(
    config: &DashboardConfig,
    action: ActionId,
    file: &Path,
    format: OutputFormat,
    charts_dir: Option<PathBuf>,
) -> Result<()> {
    if let Some(dir) = &charts_dir {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let client = HttpStageClient::new(&config.base_url);
    let mut dash = Dashboard::new(PngBackend::new(charts_dir), config.limits());
    dash.select_file(Some(SelectedFile::from_path(file)))?;

    let outcome = dash.run_blocking(&client, action);
    let completed = dash.session().store().completed();
    info!("{} of {} stage(s) stored", completed.len(), StageId::ORDER.len());

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Json => {
            let mut results = Map::new();
            for stage in &completed {
                if let Some(result) = dash.session().store().get(*stage) {
                    results.insert(stage.key().to_string(), result.clone());
                }
            }
            writeln!(out, "{}", serde_json::to_string_pretty(&Value::Object(results))?)?;
        }
        OutputFormat::Text | OutputFormat::Csv => {
            for stage in &completed {
                if let Some(tables) = dash.tables(*stage) {
                    write_tables(&mut out, &tables?, format)?;
                }
            }
        }
    }
    for path in dash.charts().backend().written() {
        eprintln!("chart written to {}", path.display());
    }

    outcome?;
    if let Some(message) = dash.session().errors().current() {
        return Err(anyhow!("{message}"));
    }
    Ok(())
}

fn cmd_tables(
    config: &DashboardConfig,
    stage: StageId,
    input: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let raw = match input {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?
        }
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let payload: Value = serde_json::from_str(&raw).context("stage result is not JSON")?;
    let tables = nsl_lib::transform::tables_for(stage, &payload, &config.limits())?;
    let stdout = io::stdout();
    write_tables(&mut stdout.lock(), &tables, format)
}

fn cmd_download(config: &DashboardConfig, partition: Partition, out: Option<PathBuf>) -> Result<()> {
    let path = out.unwrap_or_else(|| PathBuf::from(partition.file_name()));
    let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    let bytes = match download_partition(&config.base_url, partition, &mut writer) {
        Ok(bytes) => bytes,
        Err(err) => {
            drop(writer);
            let _ = fs::remove_file(&path);
            return Err(err.into());
        }
    };
    writer.flush()?;
    eprintln!("{} partition: {bytes} bytes written to {}", partition.label(), path.display());
    Ok(())
}

fn write_tables(out: &mut impl Write, tables: &[Table], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(tables)?)?,
        OutputFormat::Text => {
            for table in tables {
                write_text_table(out, table)?;
                writeln!(out)?;
            }
        }
        OutputFormat::Csv => {
            let mut writer = csv::WriterBuilder::new()
                .flexible(true)
                .from_writer(&mut *out);
            for table in tables {
                writer.write_record([table.title.as_str()])?;
                writer.write_record(&table.header)?;
                for row in &table.rows {
                    writer.write_record(row)?;
                }
            }
            writer.flush()?;
        }
    }
    Ok(())
}

fn write_text_table(out: &mut impl Write, table: &Table) -> Result<()> {
    let columns = table
        .rows
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(table.header.len()))
        .max()
        .unwrap_or(0);
    let mut widths = vec![0; columns];
    for row in std::iter::once(&table.header).chain(&table.rows) {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }
    writeln!(out, "{}", table.title)?;
    let line = |cells: &[String]| {
        cells
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{cell:<width$}", width = widths[i]))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };
    writeln!(out, "{}", line(&table.header))?;
    writeln!(out, "{}", "-".repeat(widths.iter().sum::<usize>() + 2 * columns.saturating_sub(1)))?;
    for row in &table.rows {
        writeln!(out, "{}", line(row))?;
    }
    Ok(())
}
