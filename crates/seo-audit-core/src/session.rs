//! State of the report display: busy flags, the report on screen, its chart and the
//! export menu. Every transition happens on a user action or when an operation resolves.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use reqwest::Url;
use tracing::{debug, info, warn};

use crate::analysis::{validate_url, AnalysisError, Analyzer};
use crate::export::{ExportArtifact, ExportError, ExportKind, Exporter};
use crate::radar::{ChartHost, RadarChart};
use crate::render::{render_view, ReportView};
use crate::report::SeoReportData;

#[derive(Debug)]
struct Displayed {
    report: SeoReportData,
    view: ReportView,
}

/// Proof that an analysis was started; hand it back to [`AuditSession::complete_analysis`].
///
/// The session stays busy while the ticket lives. Dropping it without completing, for
/// example when the future driving the call is cancelled, releases the session.
#[derive(Debug)]
#[must_use]
pub struct AnalysisTicket {
    url: Url,
    busy: Arc<AtomicBool>,
}

impl AnalysisTicket {
    pub fn url(&self) -> &str {
        self.url.as_str()
    }
}

impl Drop for AnalysisTicket {
    fn drop(&mut self) {
        if self.busy.swap(false, Ordering::SeqCst) {
            debug!(url = self.url.as_str(), "analysis abandoned before completion");
        }
    }
}

/// An export that has been started. Running it only reads the snapshot it holds.
#[derive(Debug, Clone)]
#[must_use]
pub struct ExportJob {
    kind: ExportKind,
    report: SeoReportData,
    view: ReportView,
}

impl ExportJob {
    pub fn kind(&self) -> ExportKind {
        self.kind
    }

    pub fn run(&self, exporter: &Exporter) -> Result<ExportArtifact, ExportError> {
        exporter.export(self.kind, &self.report, &self.view)
    }
}

pub struct AuditSession {
    analyzer: Analyzer,
    exporter: Exporter,
    analysis_busy: Arc<AtomicBool>,
    export_busy: bool,
    export_menu_open: bool,
    displayed: Option<Displayed>,
    charts: ChartHost,
    error: Option<String>,
    alert: Option<String>,
}

impl AuditSession {
    pub fn new(analyzer: Analyzer, exporter: Exporter) -> Self {
        Self {
            analyzer,
            exporter,
            analysis_busy: Arc::new(AtomicBool::new(false)),
            export_busy: false,
            export_menu_open: false,
            displayed: None,
            charts: ChartHost::new(),
            error: None,
            alert: None,
        }
    }

    /// Run one analysis to completion and display its report.
    ///
    /// Dropping the returned future mid-call leaves no report displayed and the session
    /// ready for another submission.
    pub async fn submit(&mut self, url: &str) -> Result<&SeoReportData, AnalysisError> {
        let ticket = self.begin_analysis(url)?;
        let outcome = self.analyzer.analyze(ticket.url()).await;
        self.complete_analysis(ticket, outcome)
    }

    /// Mark an analysis as in flight. The previous report and its chart are dropped here.
    ///
    /// An invalid URL is reported without touching the displayed report or the busy flag.
    pub fn begin_analysis(&mut self, url: &str) -> Result<AnalysisTicket, AnalysisError> {
        if self.is_analyzing() {
            return Err(AnalysisError::Busy);
        }
        let url = match validate_url(url) {
            Ok(url) => url,
            Err(err) => {
                let err = AnalysisError::from(err);
                self.error = Some(err.user_message().to_string());
                return Err(err);
            }
        };
        self.analysis_busy.store(true, Ordering::SeqCst);
        self.error = None;
        self.alert = None;
        self.export_menu_open = false;
        self.displayed = None;
        self.charts.clear();
        Ok(AnalysisTicket {
            url,
            busy: Arc::clone(&self.analysis_busy),
        })
    }

    /// Resolve the in-flight analysis. The busy flag is cleared on every outcome.
    pub fn complete_analysis(
        &mut self,
        ticket: AnalysisTicket,
        outcome: Result<SeoReportData, AnalysisError>,
    ) -> Result<&SeoReportData, AnalysisError> {
        self.analysis_busy.store(false, Ordering::SeqCst);
        let displayed = outcome.and_then(|report| self.display(report));
        match displayed {
            Ok(displayed) => {
                info!(url = ticket.url(), "report displayed");
                Ok(&self.displayed.insert(displayed).report)
            }
            Err(err) => {
                warn!(url = ticket.url(), error = %err, "analysis failed");
                self.error = Some(err.user_message().to_string());
                Err(err)
            }
        }
    }

    fn display(&mut self, report: SeoReportData) -> Result<Displayed, AnalysisError> {
        let view = render_view(&report)?;
        self.charts.render(&report)?;
        Ok(Displayed { report, view })
    }

    /// Produce an artifact from the displayed report. Failures become an alert and
    /// leave the report as it was.
    pub fn export(&mut self, kind: ExportKind) -> Result<ExportArtifact, ExportError> {
        let job = self.begin_export(kind)?;
        let outcome = job.run(&self.exporter);
        self.finish_export(job, outcome)
    }

    pub fn begin_export(&mut self, kind: ExportKind) -> Result<ExportJob, ExportError> {
        if self.export_busy {
            return Err(ExportError::Busy);
        }
        let displayed = self.displayed.as_ref().ok_or(ExportError::NoReport)?;
        let job = ExportJob {
            kind,
            report: displayed.report.clone(),
            view: displayed.view.clone(),
        };
        self.export_busy = true;
        self.export_menu_open = false;
        self.alert = None;
        Ok(job)
    }

    pub fn finish_export(
        &mut self,
        job: ExportJob,
        outcome: Result<ExportArtifact, ExportError>,
    ) -> Result<ExportArtifact, ExportError> {
        self.export_busy = false;
        if let Err(err) = &outcome {
            warn!(kind = ?job.kind, error = %err, "export failed");
            self.alert = Some(err.alert(job.kind));
        }
        outcome
    }

    /// Open or close the export menu; it only opens while a report is displayed.
    pub fn toggle_export_menu(&mut self) -> bool {
        self.export_menu_open = !self.export_menu_open && self.displayed.is_some();
        self.export_menu_open
    }

    pub fn close_export_menu(&mut self) {
        self.export_menu_open = false;
    }

    pub fn is_analyzing(&self) -> bool {
        self.analysis_busy.load(Ordering::SeqCst)
    }

    pub fn is_exporting(&self) -> bool {
        self.export_busy
    }

    pub fn export_menu_open(&self) -> bool {
        self.export_menu_open
    }

    pub fn report(&self) -> Option<&SeoReportData> {
        self.displayed.as_ref().map(|d| &d.report)
    }

    pub fn view(&self) -> Option<&ReportView> {
        self.displayed.as_ref().map(|d| &d.view)
    }

    pub fn chart(&self) -> Option<&RadarChart> {
        self.charts.current()
    }

    pub fn charts(&self) -> &ChartHost {
        &self.charts
    }

    pub fn exporter(&self) -> &Exporter {
        &self.exporter
    }

    /// User-facing message of the last failed analysis.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// User-facing message of the last failed export.
    pub fn alert(&self) -> Option<&str> {
        self.alert.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tests::CannedClient;
    use crate::analysis::{AnalysisRequest, GENERIC_FAILURE_MESSAGE};
    use crate::export::ExportOptions;
    use crate::grade::Grade;
    use crate::llm::AnalysisClient;
    use crate::radar::ChartEvent;
    use crate::test_support::{EXAMPLE_REPORT, MISSING_ROBOTS_TXT};
    use std::time::Duration;

    fn session_with(body: &str) -> AuditSession {
        AuditSession::new(Analyzer::new(CannedClient::ok(body)), Exporter::default())
    }

    #[tokio::test]
    async fn successful_analysis_displays_badge_and_radar() {
        let mut session = session_with(EXAMPLE_REPORT);
        let report = session.submit("https://example.com").await.unwrap();
        assert_eq!(report.overall_score, 82);

        let view = session.view().unwrap();
        assert_eq!(view.badge.grade, Grade::A);
        assert_eq!(view.badge.score_label, "82/100");
        assert_eq!(session.chart().unwrap().axes().len(), 5);
        assert!(!session.is_analyzing());
        assert!(session.error().is_none());
    }

    #[tokio::test]
    async fn missing_key_shows_no_report_and_clears_busy() {
        let mut session = session_with(MISSING_ROBOTS_TXT);
        let err = session.submit("https://example.com").await.unwrap_err();
        assert!(matches!(err, AnalysisError::Schema(_)));
        assert!(session.report().is_none());
        assert!(session.chart().is_none());
        assert!(!session.is_analyzing());
        assert_eq!(session.error(), Some(GENERIC_FAILURE_MESSAGE));
    }

    #[tokio::test]
    async fn consecutive_analyses_dispose_chart_first() {
        let client = CannedClient::ok(EXAMPLE_REPORT);
        let mut session = AuditSession::new(Analyzer::new(client.clone()), Exporter::default());
        session.submit("https://example.com").await.unwrap();
        let first = session.chart().unwrap().id();
        session.submit("https://example.org").await.unwrap();
        let second = session.chart().unwrap().id();

        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
        assert_eq!(session.charts().live_charts(), 1);
        assert_eq!(
            session.charts().events(),
            vec![
                ChartEvent::Created(first),
                ChartEvent::Disposed(first),
                ChartEvent::Created(second),
            ]
        );
    }

    #[tokio::test]
    async fn empty_url_is_resolved_locally() {
        let client = CannedClient::ok(EXAMPLE_REPORT);
        let mut session = AuditSession::new(Analyzer::new(client.clone()), Exporter::default());
        session.submit("https://example.com").await.unwrap();

        let err = session.submit("").await.unwrap_err();
        assert!(matches!(err, AnalysisError::Input(_)));
        assert_eq!(session.error(), Some("Please enter a valid website URL."));
        assert!(session.report().is_some());
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn second_submission_while_busy_is_rejected() {
        let mut session = session_with(EXAMPLE_REPORT);
        let ticket = session.begin_analysis("https://example.com").unwrap();
        assert!(session.is_analyzing());
        assert!(matches!(
            session.begin_analysis("https://example.org"),
            Err(AnalysisError::Busy)
        ));

        let report = crate::test_support::sample_report();
        session.complete_analysis(ticket, Ok(report)).unwrap();
        assert!(!session.is_analyzing());
    }

    /// Never answers, like a provider that hangs without a configured timeout.
    struct HungClient;

    #[async_trait::async_trait]
    impl AnalysisClient for HungClient {
        async fn generate(&self, _request: &AnalysisRequest) -> anyhow::Result<String> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn cancelled_submission_releases_busy_flag() {
        let mut session =
            AuditSession::new(Analyzer::new(Arc::new(HungClient)), Exporter::default());
        let submit = session.submit("https://example.com");
        let outcome = tokio::time::timeout(Duration::from_millis(20), submit).await;
        assert!(outcome.is_err(), "hung call should time out");
        assert!(!session.is_analyzing());
        assert!(session.report().is_none());

        let ticket = session.begin_analysis("https://example.org").unwrap();
        assert!(session.is_analyzing());
        drop(ticket);
        assert!(!session.is_analyzing());
    }

    #[tokio::test]
    async fn abandoned_ticket_does_not_block_later_analyses() {
        let client = CannedClient::ok(EXAMPLE_REPORT);
        let mut session = AuditSession::new(Analyzer::new(client.clone()), Exporter::default());
        let ticket = session.begin_analysis("https://example.com").unwrap();
        drop(ticket);

        session.submit("https://example.org").await.unwrap();
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
        assert!(!session.is_analyzing());
        assert_eq!(session.charts().live_charts(), 1);
    }

    #[tokio::test]
    async fn csv_export_leaves_report_untouched() {
        let mut session = session_with(EXAMPLE_REPORT);
        session.submit("https://example.com").await.unwrap();
        assert!(session.toggle_export_menu());

        let before = session.report().cloned();
        let artifact = session.export(ExportKind::Csv).unwrap();
        assert_eq!(artifact.file_name, "seo-report.csv");
        assert!(!session.export_menu_open());
        assert!(!session.is_exporting());
        assert_eq!(session.report().cloned(), before);
    }

    #[tokio::test]
    async fn failed_export_raises_alert_and_keeps_report() {
        let exporter = Exporter::new(ExportOptions {
            raster_scale: 0.0,
            ..ExportOptions::default()
        });
        let mut session =
            AuditSession::new(Analyzer::new(CannedClient::ok(EXAMPLE_REPORT)), exporter);
        session.submit("https://example.com").await.unwrap();
        let before = session.report().cloned();

        let err = session.export(ExportKind::Pdf).unwrap_err();
        assert!(matches!(err, ExportError::Raster { .. }));
        assert_eq!(
            session.alert(),
            Some("Sorry, there was an error exporting the PDF.")
        );
        assert!(!session.is_exporting());
        assert_eq!(session.report().cloned(), before);
        assert!(session.chart().is_some());
    }

    #[tokio::test]
    async fn exports_are_mutually_exclusive() {
        let mut session = session_with(EXAMPLE_REPORT);
        assert!(matches!(
            session.export(ExportKind::Csv),
            Err(ExportError::NoReport)
        ));
        assert!(!session.toggle_export_menu());

        session.submit("https://example.com").await.unwrap();
        let job = session.begin_export(ExportKind::Csv).unwrap();
        assert!(matches!(
            session.begin_export(ExportKind::Pdf),
            Err(ExportError::Busy)
        ));
        let outcome = job.run(session.exporter());
        session.finish_export(job, outcome).unwrap();
        assert!(!session.is_exporting());
    }
}
