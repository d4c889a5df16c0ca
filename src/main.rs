use anyhow::{anyhow, Context, Result};
use askchart::chat;
use askchart::client::HttpBackend;
use askchart::session::ChatSession;
use askchart::settings::Settings;
use askchart::{build_chart, render_output, ChartConfig, ChartSpec, OutputFormat, RenderOptions, Table};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "askchart")]
#[command(about = "Ask questions about your data and chart the answers", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a chart config against a result table
    Render {
        /// Chart config JSON file (as sent by the backend in `chart_config`)
        #[arg(long)]
        config: PathBuf,
        /// Result rows: JSON array of objects (.json) or CSV. Reads CSV from stdin if omitted
        #[arg(long)]
        data: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = Format::VegaLite)]
        format: Format,
        #[arg(long, default_value_t = 800)]
        width: u32,
        #[arg(long, default_value_t = 600)]
        height: u32,
        /// Output file; stdout if omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Interactive chat: one question per stdin line, `/new` starts a new chat
    Chat {
        #[arg(long, default_value = "askchart.toml")]
        settings: PathBuf,
        #[arg(long)]
        customer: String,
        #[arg(long)]
        table: String,
        /// Directory charts are written to
        #[arg(long, default_value = ".")]
        chart_dir: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Format {
    Png,
    Svg,
    VegaLite,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Png => OutputFormat::Png,
            Format::Svg => OutputFormat::Svg,
            Format::VegaLite => OutputFormat::VegaLite,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("askchart=info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    match args.command {
        Command::Render {
            config,
            data,
            format,
            width,
            height,
            output,
        } => {
            let options = RenderOptions {
                width,
                height,
                format: format.into(),
            };
            run_render(&config, data.as_deref(), &options, output.as_deref())
        }
        Command::Chat {
            settings,
            customer,
            table,
            chart_dir,
        } => run_chat(&settings, &customer, &table, &chart_dir),
    }
}

fn run_render(
    config_path: &Path,
    data_path: Option<&Path>,
    options: &RenderOptions,
    output: Option<&Path>,
) -> Result<()> {
    let config_text = fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read chart config {}", config_path.display()))?;
    let config_json: serde_json::Value =
        serde_json::from_str(&config_text).context("Chart config is not valid JSON")?;
    let config = ChartConfig::from_json(&config_json)?;

    let table = match data_path {
        Some(path) => read_table(path)?,
        None => Table::from_csv_reader(io::stdin().lock()).context("Failed to read CSV from stdin")?,
    };

    let chart = build_chart(&table, &config)?;
    let bytes = render_output(&chart, options).context("Failed to render chart")?;

    match output {
        Some(path) => fs::write(path, &bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle.write_all(&bytes).context("Failed to write chart to stdout")?;
            handle.flush().context("Failed to flush stdout")?;
        }
    }
    Ok(())
}

fn read_table(path: &Path) -> Result<Table> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let value: serde_json::Value =
            serde_json::from_str(&text).context("Data file is not valid JSON")?;
        Ok(Table::from_json(&value)?)
    } else {
        let file = fs::File::open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        Table::from_csv_reader(file)
    }
}

fn run_chat(settings_path: &Path, customer: &str, table: &str, chart_dir: &Path) -> Result<()> {
    let settings = Settings::load(settings_path)?;
    let customer_id = settings
        .customers
        .lookup(customer, table)
        .ok_or_else(|| {
            anyhow!(
                "No customer id configured for ({}, {}); known customers: {:?}, tables: {:?}",
                customer,
                table,
                settings.customers.customers(),
                settings.customers.tables()
            )
        })?
        .to_string();
    let backend = HttpBackend::from_settings(&settings).context("Failed to build HTTP client")?;

    fs::create_dir_all(chart_dir)
        .with_context(|| format!("Failed to create {}", chart_dir.display()))?;

    let mut session = ChatSession::new();
    let mut chart_count = 0usize;
    let stdout = io::stdout();

    for line in io::stdin().lock().lines() {
        let question = line.context("Failed to read question from stdin")?;
        let question = question.trim();
        if question.is_empty() {
            continue;
        }
        if question == "/new" {
            session.new_chat();
            info!("started a new chat");
            continue;
        }

        let turn = chat::ask(
            &mut session,
            &backend,
            &customer_id,
            question,
            settings.fallback_chart.as_ref(),
        );

        let mut out = stdout.lock();
        writeln!(out, "{}", turn.answer)?;
        if let Some(table) = &turn.table {
            writeln!(out)?;
            table.write_csv(&mut out)?;
        }
        match turn.chart {
            Some(Ok(chart)) => {
                chart_count += 1;
                let path = chart_dir.join(format!(
                    "chart-{}.{}",
                    chart_count,
                    settings.render.format.extension()
                ));
                match write_chart(&chart, &settings.render, &path) {
                    Ok(()) => writeln!(out, "[chart written to {}]", path.display())?,
                    Err(e) => {
                        let reason = format!("{:#}", e);
                        warn!(error = %reason, "chart could not be rendered");
                        writeln!(out, "[chart unavailable: {}]", reason)?;
                    }
                }
            }
            Some(Err(e)) => writeln!(out, "[chart unavailable: {}]", e)?,
            None => {}
        }
        writeln!(out)?;
        out.flush()?;
    }

    Ok(())
}

fn write_chart(chart: &ChartSpec, options: &RenderOptions, path: &Path) -> Result<()> {
    let bytes = render_output(chart, options).context("Failed to render chart")?;
    fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
}
