use std::fmt::Write as _;

use camino::Utf8Path;
use serde::Serialize;

use crate::error::CrashError;
use crate::store::Store;

const PANEL_WIDTH: f64 = 480.0;
const PANEL_HEIGHT: f64 = 320.0;
const TITLE_HEIGHT: f64 = 40.0;
const MARGIN_LEFT: f64 = 60.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 30.0;
const MARGIN_BOTTOM: f64 = 50.0;
const Y_TICKS: usize = 5;

pub const PALETTE: [&str; 8] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelKind {
    Bar,
    Line,
    Scatter,
}

#[derive(Debug, Clone, Serialize)]
pub struct Series {
    pub name: String,
    pub points: Vec<(f64, f64)>,
}

impl Series {
    pub fn new(name: impl Into<String>, points: Vec<(f64, f64)>) -> Self {
        Self {
            name: name.into(),
            points,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Panel {
    pub title: String,
    pub kind: PanelKind,
    pub x_label: String,
    pub y_label: String,
    pub x_ticks: Vec<(f64, String)>,
    pub series: Vec<Series>,
}

impl Panel {
    pub fn new(title: impl Into<String>, kind: PanelKind) -> Self {
        Self {
            title: title.into(),
            kind,
            x_label: String::new(),
            y_label: String::new(),
            x_ticks: Vec::new(),
            series: Vec::new(),
        }
    }

    pub fn labels(mut self, x_label: impl Into<String>, y_label: impl Into<String>) -> Self {
        self.x_label = x_label.into();
        self.y_label = y_label.into();
        self
    }

    pub fn categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.x_ticks = categories
            .into_iter()
            .enumerate()
            .map(|(index, label)| (index as f64, label.into()))
            .collect();
        self
    }

    pub fn ticks(mut self, ticks: Vec<(f64, String)>) -> Self {
        self.x_ticks = ticks;
        self
    }

    pub fn series(mut self, series: Series) -> Self {
        self.series.push(series);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.series.iter().all(|series| series.points.is_empty())
    }

    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        let mut x_min = f64::INFINITY;
        let mut x_max = f64::NEG_INFINITY;
        let mut y_min = f64::INFINITY;
        let mut y_max = f64::NEG_INFINITY;
        for (x, y) in self.series.iter().flat_map(|series| series.points.iter()) {
            x_min = x_min.min(*x);
            x_max = x_max.max(*x);
            y_min = y_min.min(*y);
            y_max = y_max.max(*y);
        }
        for (x, _) in &self.x_ticks {
            x_min = x_min.min(*x);
            x_max = x_max.max(*x);
        }
        if self.kind != PanelKind::Scatter {
            y_min = y_min.min(0.0);
        }
        if !x_min.is_finite() || !x_max.is_finite() {
            (x_min, x_max) = (0.0, 1.0);
        }
        if !y_min.is_finite() || !y_max.is_finite() {
            (y_min, y_max) = (0.0, 1.0);
        }
        if self.kind == PanelKind::Bar {
            x_min -= 0.5;
            x_max += 0.5;
        }
        if x_max <= x_min {
            x_max = x_min + 1.0;
        }
        if y_max <= y_min {
            y_max = y_min + 1.0;
        }
        (x_min, x_max, y_min, y_max)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Figure {
    pub title: String,
    pub columns: usize,
    pub panels: Vec<Panel>,
}

impl Figure {
    pub fn new(title: impl Into<String>, columns: usize) -> Self {
        Self {
            title: title.into(),
            columns: columns.max(1),
            panels: Vec::new(),
        }
    }

    pub fn panel(mut self, panel: Panel) -> Self {
        self.panels.push(panel);
        self
    }

    pub fn rows(&self) -> usize {
        self.panels.len().div_ceil(self.columns).max(1)
    }

    pub fn to_svg(&self) -> String {
        let columns = self.columns.min(self.panels.len()).max(1);
        let width = PANEL_WIDTH * columns as f64;
        let height = TITLE_HEIGHT + PANEL_HEIGHT * self.rows() as f64;
        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}" font-family="sans-serif" font-size="11">"#
        );
        let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="26" text-anchor="middle" font-size="18">{}</text>"#,
            width / 2.0,
            escape(&self.title)
        );
        for (index, panel) in self.panels.iter().enumerate() {
            let left = PANEL_WIDTH * (index % self.columns) as f64;
            let top = TITLE_HEIGHT + PANEL_HEIGHT * (index / self.columns) as f64;
            render_panel(&mut svg, panel, left, top);
        }
        svg.push_str("</svg>\n");
        svg
    }

    pub fn save(&self, path: &Utf8Path) -> Result<(), CrashError> {
        let svg = self.to_svg();
        Store::write_atomic(path, |file| {
            std::io::Write::write_all(file, svg.as_bytes())
                .map_err(|err| CrashError::Figure(err.to_string()))
        })
    }
}

fn render_panel(svg: &mut String, panel: &Panel, left: f64, top: f64) {
    let plot_left = left + MARGIN_LEFT;
    let plot_top = top + MARGIN_TOP;
    let plot_width = PANEL_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_height = PANEL_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let (x_min, x_max, y_min, y_max) = panel.bounds();
    let sx = |x: f64| plot_left + (x - x_min) / (x_max - x_min) * plot_width;
    let sy = |y: f64| plot_top + plot_height - (y - y_min) / (y_max - y_min) * plot_height;

    let _ = writeln!(
        svg,
        r##"<rect x="{plot_left}" y="{plot_top}" width="{plot_width}" height="{plot_height}" fill="#f1f1f1"/>"##
    );
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="{}" text-anchor="middle" font-size="13">{}</text>"#,
        left + PANEL_WIDTH / 2.0,
        top + 18.0,
        escape(&panel.title)
    );

    for step in 0..=Y_TICKS {
        let value = y_min + (y_max - y_min) * step as f64 / Y_TICKS as f64;
        let y = sy(value);
        let _ = writeln!(
            svg,
            r#"<line x1="{plot_left}" y1="{y}" x2="{}" y2="{y}" stroke="white"/>"#,
            plot_left + plot_width
        );
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{}" text-anchor="end">{}</text>"#,
            plot_left - 4.0,
            y + 4.0,
            format_tick(value)
        );
    }
    for (x, label) in &panel.x_ticks {
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{}" text-anchor="middle">{}</text>"#,
            sx(*x),
            plot_top + plot_height + 14.0,
            escape(label)
        );
    }
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="{}" text-anchor="middle">{}</text>"#,
        plot_left + plot_width / 2.0,
        top + PANEL_HEIGHT - 12.0,
        escape(&panel.x_label)
    );
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="{}" text-anchor="middle" transform="rotate(-90 {} {})">{}</text>"#,
        left + 14.0,
        plot_top + plot_height / 2.0,
        left + 14.0,
        plot_top + plot_height / 2.0,
        escape(&panel.y_label)
    );

    let group_width = plot_width / (x_max - x_min);
    let series_count = panel.series.len().max(1) as f64;
    for (index, series) in panel.series.iter().enumerate() {
        let color = PALETTE[index % PALETTE.len()];
        match panel.kind {
            PanelKind::Bar => {
                let bar_width = group_width * 0.8 / series_count;
                for (x, y) in &series.points {
                    let bar_left = sx(*x) - group_width * 0.4 + bar_width * index as f64;
                    let (y0, y1) = (sy(0.0_f64.max(y_min)), sy(*y));
                    let _ = writeln!(
                        svg,
                        r#"<rect x="{bar_left}" y="{}" width="{bar_width}" height="{}" fill="{color}"/>"#,
                        y0.min(y1),
                        (y0 - y1).abs()
                    );
                }
            }
            PanelKind::Line => {
                let points = series
                    .points
                    .iter()
                    .map(|(x, y)| format!("{},{}", sx(*x), sy(*y)))
                    .collect::<Vec<_>>()
                    .join(" ");
                let _ = writeln!(
                    svg,
                    r#"<polyline points="{points}" fill="none" stroke="{color}" stroke-width="1.5"/>"#
                );
            }
            PanelKind::Scatter => {
                for (x, y) in &series.points {
                    let _ = writeln!(
                        svg,
                        r#"<circle cx="{}" cy="{}" r="1" fill="{color}"/>"#,
                        sx(*x),
                        sy(*y)
                    );
                }
            }
        }
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{}" fill="{color}">{}</text>"#,
            plot_left + 6.0,
            plot_top + 14.0 + 13.0 * index as f64,
            escape(&series.name)
        );
    }
}

fn format_tick(value: f64) -> String {
    if value.abs() >= 1000.0 || value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar_figure() -> Figure {
        Figure::new("Accidents <by> region", 2).panel(
            Panel::new("All", PanelKind::Bar)
                .labels("Region", "Accidents")
                .categories(["JHM", "VYS"])
                .series(Series::new("count", vec![(0.0, 10.0), (1.0, 4.0)])),
        )
    }

    #[test]
    fn bar_bounds_include_zero_and_padding() {
        let panel = &bar_figure().panels[0];
        assert_eq!(panel.bounds(), (-0.5, 1.5, 0.0, 10.0));
    }

    #[test]
    fn svg_escapes_text_and_draws_bars() {
        let svg = bar_figure().to_svg();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Accidents &lt;by&gt; region"));
        assert_eq!(svg.matches("<rect x=").count(), 3);
    }

    #[test]
    fn save_creates_parent_directories() {
        let temp = tempfile::tempdir().unwrap();
        let path = camino::Utf8PathBuf::from_path_buf(temp.path().join("a/b/fig.svg")).unwrap();
        bar_figure().save(&path).unwrap();
        assert!(path.as_std_path().exists());
    }
}
