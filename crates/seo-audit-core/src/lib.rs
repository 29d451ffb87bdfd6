pub mod analysis;
pub mod export;
pub mod grade;
pub mod label;
pub mod llm;
pub mod radar;
pub mod render;
pub mod report;
pub mod session;

pub use analysis::{AnalysisError, AnalysisRequest, Analyzer, InputError, GENERIC_FAILURE_MESSAGE};
pub use export::{ExportArtifact, ExportError, ExportKind, ExportOptions, Exporter};
pub use grade::{grade, FactorStatus, Grade, GradeInfo, Tier, PASS_THRESHOLD};
pub use label::factor_label;
pub use llm::{build_client, AnalysisClient, LlmSettings, ProviderKind};
pub use radar::{category_averages, ChartEvent, ChartHost, RadarAxis, RadarChart, VisualError};
pub use render::{render_report, render_view, OutputFormat, ReportView};
pub use report::{
    parse_report, CategoryKind, Priority, Recommendation, SchemaViolation, SeoFactor,
    SeoReportData,
};
pub use session::AuditSession;
