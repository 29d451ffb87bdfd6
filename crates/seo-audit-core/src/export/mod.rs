use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::render::ReportView;
use crate::report::SeoReportData;

pub mod document;
pub mod tabular;

pub use document::{paginate, PageTile, A4_HEIGHT_MM, A4_WIDTH_MM};
pub use tabular::{escape_field, flatten_factors, to_csv, FactorRow};

/// Default base name of every export artifact.
pub const DEFAULT_BASE_NAME: &str = "seo-report";

/// Which artifact to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportKind {
    Pdf,
    Csv,
}

impl ExportKind {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Csv => "csv",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Csv => "text/csv",
        }
    }
}

/// Downloadable export output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub kind: ExportKind,
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Failures while producing an artifact. None of them touch the report being exported.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no report is available to export")]
    NoReport,
    #[error("another export is already in progress")]
    Busy,
    #[error("failed to parse rendered report: {message}")]
    Svg { message: String },
    #[error("failed to allocate a {width}x{height} raster")]
    Raster { width: u32, height: u32 },
    #[error("failed to assemble PDF document")]
    Pdf(#[from] lopdf::Error),
    #[error("failed to write PDF document: {message}")]
    Write { message: String },
    #[error("failed to format export output")]
    Format(#[from] std::fmt::Error),
}

impl ExportError {
    /// Alert text shown for a failed export.
    pub fn alert(&self, kind: ExportKind) -> String {
        match self {
            Self::NoReport => "Run an analysis before exporting.".to_string(),
            Self::Busy => "An export is already running.".to_string(),
            _ => format!(
                "Sorry, there was an error exporting the {}.",
                kind.extension().to_ascii_uppercase()
            ),
        }
    }
}

/// Tunables for artifact production.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    pub base_name: String,
    /// Raster pixels per CSS pixel.
    pub raster_scale: f32,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            base_name: DEFAULT_BASE_NAME.to_string(),
            raster_scale: 2.0,
        }
    }
}

/// Produces artifacts from a report and its rendered view. Only ever reads its inputs.
#[derive(Debug, Clone, Default)]
pub struct Exporter {
    options: ExportOptions,
}

impl Exporter {
    pub fn new(options: ExportOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    pub fn file_name(&self, kind: ExportKind) -> String {
        format!("{}.{}", self.options.base_name, kind.extension())
    }

    #[instrument(skip_all, fields(kind = ?kind))]
    pub fn export(
        &self,
        kind: ExportKind,
        report: &SeoReportData,
        view: &ReportView,
    ) -> Result<ExportArtifact, ExportError> {
        let bytes = match kind {
            ExportKind::Pdf => document::render_pdf(view, self.options.raster_scale)?,
            ExportKind::Csv => to_csv(report)?.into_bytes(),
        };
        debug!(bytes = bytes.len(), "export artifact assembled");
        Ok(ExportArtifact {
            kind,
            file_name: self.file_name(kind),
            mime_type: kind.mime_type(),
            bytes,
        })
    }
}
