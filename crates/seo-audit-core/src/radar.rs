use std::f64::consts::PI;
use std::fmt::{self, Write};
use std::sync::{
    atomic::{AtomicU64, AtomicUsize, Ordering},
    Arc, Mutex, PoisonError,
};

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::report::{CategoryKind, SeoFactor, SeoReportData};

const RING_STEP: u32 = 25;
const FILL: &str = "rgba(56,189,248,0.2)";
const STROKE: &str = "rgba(14,165,233,1)";
const GRID: &str = "rgba(0,0,0,0.1)";

/// Raised when a category cannot be averaged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VisualError {
    #[error("category `{}` has no factors to average", .category.field_name())]
    EmptyGroup { category: CategoryKind },
    #[error("failed to draw radar chart")]
    Draw(#[from] fmt::Error),
}

/// One axis of the radar summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadarAxis {
    pub category: CategoryKind,
    pub label: &'static str,
    /// Unweighted mean of the category's factor scores, `0.0..=100.0`.
    pub average: f64,
}

/// Arithmetic mean of one group's scores. An empty group is an error, never a zero.
pub fn mean_score(
    category: CategoryKind,
    factors: &[(&'static str, &SeoFactor)],
) -> Result<f64, VisualError> {
    if factors.is_empty() {
        return Err(VisualError::EmptyGroup { category });
    }
    let total: u32 = factors.iter().map(|(_, factor)| u32::from(factor.score)).sum();
    Ok(f64::from(total) / factors.len() as f64)
}

/// Averages for all five axes, in display order.
pub fn category_averages(report: &SeoReportData) -> Result<Vec<RadarAxis>, VisualError> {
    report
        .categories()
        .into_iter()
        .map(|(category, factors)| {
            Ok(RadarAxis {
                category,
                label: category.axis_label(),
                average: mean_score(category, &factors)?,
            })
        })
        .collect()
}

struct Geometry {
    center: f64,
    radius: f64,
    count: usize,
}

impl Geometry {
    fn angle(&self, idx: usize) -> f64 {
        -PI / 2.0 + idx as f64 * 2.0 * PI / self.count.max(1) as f64
    }

    fn point(&self, idx: usize, value: f64) -> (f64, f64) {
        let theta = self.angle(idx);
        let r = self.radius * value.clamp(0.0, 100.0) / 100.0;
        (self.center + r * theta.cos(), self.center + r * theta.sin())
    }

    fn polygon(&self, values: impl Iterator<Item = f64>) -> String {
        values
            .enumerate()
            .map(|(idx, value)| {
                let (x, y) = self.point(idx, value);
                format!("{x:.2},{y:.2}")
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Render the axes as a standalone square SVG of `size` pixels.
pub fn radar_svg(axes: &[RadarAxis], size: f64) -> Result<String, fmt::Error> {
    let geometry = Geometry {
        center: size / 2.0,
        radius: size * 0.34,
        count: axes.len(),
    };
    let center = geometry.center;

    let mut svg = String::new();
    writeln!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{size:.0}\" height=\"{size:.0}\" viewBox=\"0 0 {size:.0} {size:.0}\">"
    )?;

    for step in (RING_STEP..=100).step_by(RING_STEP as usize) {
        let ring = geometry.polygon(axes.iter().map(|_| f64::from(step)));
        writeln!(
            svg,
            "  <polygon points=\"{ring}\" fill=\"none\" stroke=\"{GRID}\" stroke-width=\"1\"/>"
        )?;
    }

    for (idx, axis) in axes.iter().enumerate() {
        let (x, y) = geometry.point(idx, 100.0);
        writeln!(
            svg,
            "  <line x1=\"{center:.2}\" y1=\"{center:.2}\" x2=\"{x:.2}\" y2=\"{y:.2}\" stroke=\"{GRID}\" stroke-width=\"1\"/>"
        )?;
        let theta = geometry.angle(idx);
        let lx = center + (geometry.radius + 18.0) * theta.cos();
        let ly = center + (geometry.radius + 18.0) * theta.sin() + 5.0;
        let anchor = match theta.cos() {
            c if c > 0.2 => "start",
            c if c < -0.2 => "end",
            _ => "middle",
        };
        writeln!(
            svg,
            "  <text x=\"{lx:.2}\" y=\"{ly:.2}\" text-anchor=\"{anchor}\" font-family=\"sans-serif\" font-size=\"14\" fill=\"#334155\">{}</text>",
            axis.label
        )?;
    }

    let shape = geometry.polygon(axes.iter().map(|axis| axis.average));
    writeln!(
        svg,
        "  <polygon points=\"{shape}\" fill=\"{FILL}\" stroke=\"{STROKE}\" stroke-width=\"2\"/>"
    )?;
    for (idx, axis) in axes.iter().enumerate() {
        let (x, y) = geometry.point(idx, axis.average);
        writeln!(
            svg,
            "  <circle cx=\"{x:.2}\" cy=\"{y:.2}\" r=\"3\" fill=\"{STROKE}\" stroke=\"#ffffff\" stroke-width=\"1\"/>"
        )?;
    }
    svg.push_str("</svg>\n");
    Ok(svg)
}

/// Lifecycle events recorded by a [`ChartHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartEvent {
    Created(u64),
    Disposed(u64),
}

#[derive(Debug, Default)]
struct ChartLedger {
    next_id: AtomicU64,
    live: AtomicUsize,
    events: Mutex<Vec<ChartEvent>>,
}

impl ChartLedger {
    fn record(&self, event: ChartEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    fn acquire(&self) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.live.fetch_add(1, Ordering::SeqCst);
        self.record(ChartEvent::Created(id));
        id
    }

    fn release(&self, id: u64) {
        self.live.fetch_sub(1, Ordering::SeqCst);
        self.record(ChartEvent::Disposed(id));
    }
}

/// Radar visualisation resource. Releasing it (by drop) frees its slot in the owning host.
#[derive(Debug)]
pub struct RadarChart {
    id: u64,
    axes: Vec<RadarAxis>,
    svg: String,
    ledger: Arc<ChartLedger>,
}

impl RadarChart {
    pub const SIZE: f64 = 320.0;

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn axes(&self) -> &[RadarAxis] {
        &self.axes
    }

    pub fn svg(&self) -> &str {
        &self.svg
    }
}

impl Drop for RadarChart {
    fn drop(&mut self) {
        debug!(chart = self.id, "disposing radar chart");
        self.ledger.release(self.id);
    }
}

/// Owns the single radar chart of the report currently on display.
#[derive(Debug, Default)]
pub struct ChartHost {
    current: Option<RadarChart>,
    ledger: Arc<ChartLedger>,
}

impl ChartHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current chart with one built from `report`.
    ///
    /// The previous chart is released first, so it is gone even when the new build fails.
    pub fn render(&mut self, report: &SeoReportData) -> Result<&RadarChart, VisualError> {
        self.clear();
        let axes = category_averages(report)?;
        let svg = radar_svg(&axes, RadarChart::SIZE)?;
        let id = self.ledger.acquire();
        debug!(chart = id, "created radar chart");
        Ok(self.current.insert(RadarChart {
            id,
            axes,
            svg,
            ledger: Arc::clone(&self.ledger),
        }))
    }

    /// Release the current chart, if any.
    pub fn clear(&mut self) {
        self.current.take();
    }

    pub fn current(&self) -> Option<&RadarChart> {
        self.current.as_ref()
    }

    /// Charts created by this host that have not been released yet.
    pub fn live_charts(&self) -> usize {
        self.ledger.live.load(Ordering::SeqCst)
    }

    pub fn events(&self) -> Vec<ChartEvent> {
        self.ledger
            .events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
