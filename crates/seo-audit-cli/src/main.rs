mod config;

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::{Color, Colorize};
use seo_audit_core::export::{ExportKind, ExportOptions, Exporter};
use seo_audit_core::report::schema::{openai_json_schema, response_schema};
use seo_audit_core::{
    build_client, parse_report, render_report, render_view, Analyzer, AuditSession, OutputFormat,
    ReportView, Tier,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::config::{resolve_settings, FileConfig};

#[derive(Parser, Debug)]
#[command(
    name = "seo-audit",
    author,
    version,
    about = "Model-assisted SEO audit reports with PDF and CSV export"
)]
struct Cli {
    /// Settings file (TOML, YAML or JSON) with `llm` and `export` tables
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Audit a website and print the report
    Analyze {
        /// Website to audit, e.g. https://example.com
        url: String,
        #[arg(long, value_enum, default_value_t = FormatArg::Human)]
        format: FormatArg,
        /// Write the paginated PDF report
        #[arg(long)]
        pdf: bool,
        /// Write the CSV report
        #[arg(long)]
        csv: bool,
        /// Directory for exported files (default: config `export.out_dir` or `.`)
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,
    },
    /// Validate a saved model response and print it as a report
    Validate {
        file: PathBuf,
        #[arg(long, value_enum, default_value_t = FormatArg::Human)]
        format: FormatArg,
    },
    /// Print the response schema sent to the model
    Schema {
        #[arg(long, value_enum, default_value_t = Dialect::Gemini)]
        dialect: Dialect,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Human,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Human => OutputFormat::Human,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Dialect {
    Gemini,
    Openai,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let file_config = match &cli.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };

    match cli.command {
        Commands::Analyze {
            url,
            format,
            pdf,
            csv,
            out_dir,
        } => {
            let out_dir = out_dir
                .or_else(|| file_config.export.out_dir.clone())
                .unwrap_or_else(|| PathBuf::from("."));
            let mut kinds = Vec::new();
            if pdf {
                kinds.push(ExportKind::Pdf);
            }
            if csv {
                kinds.push(ExportKind::Csv);
            }
            analyze(&file_config, &url, format.into(), &kinds, &out_dir).await?
        }
        Commands::Validate { file, format } => validate(&file, format.into()).await?,
        Commands::Schema { dialect } => {
            let schema = match dialect {
                Dialect::Gemini => response_schema(),
                Dialect::Openai => openai_json_schema(),
            };
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
    }
    Ok(())
}

async fn analyze(
    file_config: &FileConfig,
    url: &str,
    format: OutputFormat,
    kinds: &[ExportKind],
    out_dir: &Path,
) -> Result<()> {
    let settings = resolve_settings(file_config)?;
    debug!(provider = %settings.provider, "resolved provider settings");
    let client = build_client(&settings)?;

    let mut options = ExportOptions::default();
    if let Some(base_name) = &file_config.export.base_name {
        options.base_name = base_name.clone();
    }
    let mut session = AuditSession::new(Analyzer::new(client), Exporter::new(options));

    if let Err(err) = session.submit(url).await {
        debug!(error = %err, "analysis error detail");
        return Err(anyhow!(err.user_message()));
    }
    let view = session
        .view()
        .context("analysis finished without a report")?;
    print_report(view, format)?;

    if kinds.is_empty() {
        return Ok(());
    }
    tokio::fs::create_dir_all(out_dir)
        .await
        .with_context(|| format!("failed to create {}", out_dir.display()))?;
    for kind in kinds {
        export_to(&mut session, *kind, out_dir).await?;
    }
    Ok(())
}

async fn export_to(session: &mut AuditSession, kind: ExportKind, out_dir: &Path) -> Result<()> {
    let job = session.begin_export(kind)?;
    let exporter = session.exporter().clone();
    let (job, outcome) = tokio::task::spawn_blocking(move || {
        let outcome = job.run(&exporter);
        (job, outcome)
    })
    .await
    .context("export task panicked")?;
    let artifact = match session.finish_export(job, outcome) {
        Ok(artifact) => artifact,
        Err(_) => {
            let alert = session.alert().unwrap_or("Export failed.").to_string();
            return Err(anyhow!(alert));
        }
    };

    let path = out_dir.join(&artifact.file_name);
    tokio::fs::write(&path, &artifact.bytes)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), bytes = artifact.bytes.len(), "export written");
    eprintln!("Saved {} ({})", path.display(), artifact.mime_type);
    Ok(())
}

async fn validate(file: &Path, format: OutputFormat) -> Result<()> {
    let raw = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let report = parse_report(&raw)
        .with_context(|| format!("{} does not match the report schema", file.display()))?;
    let view = render_view(&report)?;
    print_report(&view, format)
}

fn print_report(view: &ReportView, format: OutputFormat) -> Result<()> {
    let rendered = render_report(view, format)?;
    match format {
        OutputFormat::Json => print!("{rendered}"),
        OutputFormat::Human => print!("{}", paint(&rendered, view.badge.tier)),
    }
    Ok(())
}

/// Colour the grade headline by tier and factor lines by pass/fail.
fn paint(rendered: &str, tier: Tier) -> String {
    let mut out = String::with_capacity(rendered.len());
    for line in rendered.lines() {
        let painted = if line.starts_with("Overall Grade:") {
            line.color(tier_color(tier)).bold().to_string()
        } else if line.ends_with("[PASS]") {
            line.green().to_string()
        } else if line.ends_with("[FAIL]") {
            line.red().to_string()
        } else if line == "SEO Report Summary" {
            line.bold().to_string()
        } else {
            line.to_string()
        };
        out.push_str(&painted);
        out.push('\n');
    }
    out
}

fn tier_color(tier: Tier) -> Color {
    let hex = tier.hex().trim_start_matches('#');
    let channel = |range: std::ops::Range<usize>| {
        hex.get(range)
            .and_then(|digits| u8::from_str_radix(digits, 16).ok())
            .unwrap_or(0)
    };
    Color::TrueColor {
        r: channel(0..2),
        g: channel(2..4),
        b: channel(4..6),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,reqwest=warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}
