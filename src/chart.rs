use std::fmt::Display;
use std::path::PathBuf;

use chrono::{DateTime, Duration};
use chrono_tz::Tz;
use plotters::prelude::*;
use tracing::{debug, warn};

use crate::dataset::Dataset;
use crate::error::EliaError;
use crate::pipeline::DayData;
use crate::table::{Row, Table};
use crate::window::DayWindow;

const TAB_BLUE: RGBColor = RGBColor(31, 119, 180);
const TAB_ORANGE: RGBColor = RGBColor(255, 127, 14);
const TAB_GREEN: RGBColor = RGBColor(44, 160, 44);
const TAB_RED: RGBColor = RGBColor(214, 39, 40);
const TAB_PURPLE: RGBColor = RGBColor(148, 103, 189);
const TAB_BROWN: RGBColor = RGBColor(140, 86, 75);
const TAB_PINK: RGBColor = RGBColor(227, 119, 194);
const TAB_GRAY: RGBColor = RGBColor(127, 127, 127);
const TAB_OLIVE: RGBColor = RGBColor(188, 189, 34);
const TAB_CYAN: RGBColor = RGBColor(23, 190, 207);

const PALETTE: [RGBColor; 10] = [
    TAB_BLUE, TAB_ORANGE, TAB_GREEN, TAB_RED, TAB_PURPLE, TAB_BROWN, TAB_PINK, TAB_GRAY,
    TAB_OLIVE, TAB_CYAN,
];

/// One column drawn as a step line.
#[derive(Debug, Clone, Copy)]
pub struct SeriesSpec {
    pub column: &'static str,
    pub label: &'static str,
    pub color: RGBColor,
    /// Draw the values below the axis, used for downward volumes.
    pub negate: bool,
}

impl SeriesSpec {
    const fn new(column: &'static str, label: &'static str, color: RGBColor) -> Self {
        Self {
            column,
            label,
            color,
            negate: false,
        }
    }

    const fn negated(column: &'static str, label: &'static str, color: RGBColor) -> Self {
        Self {
            column,
            label,
            color,
            negate: true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ChartSpec {
    pub slug: &'static str,
    pub title: &'static str,
    pub dataset: Dataset,
    pub y_label: &'static str,
    pub x_label: Option<&'static str>,
    pub series: &'static [SeriesSpec],
    /// When set, every series is split into one line per distinct value of
    /// these columns.
    pub group_by: &'static [&'static str],
}

pub const CHARTS: &[ChartSpec] = &[
    ChartSpec {
        slug: "imbalance-price",
        title: "Imbalance Price and Alpha",
        dataset: Dataset::ImbalancePrices,
        y_label: "Imbalance Price (€/MWh) / Alpha",
        x_label: None,
        series: &[
            SeriesSpec::new("imbalanceprice", "Imbalance Price", TAB_BLUE),
            SeriesSpec::new("alpha", "Alpha", TAB_GRAY),
        ],
        group_by: &[],
    },
    ChartSpec {
        slug: "system-imbalance",
        title: "System Imbalance",
        dataset: Dataset::ImbalancePrices,
        y_label: "System Imbalance",
        x_label: None,
        series: &[SeriesSpec::new("systemimbalance", "System Imbalance", TAB_ORANGE)],
        group_by: &[],
    },
    ChartSpec {
        slug: "igcc-afrr",
        title: "IGCC and aFRR Volumes",
        dataset: Dataset::ActivatedVolumes,
        y_label: "IGCC / aFRR (+/-)",
        x_label: None,
        series: &[
            SeriesSpec::new("igccvolumeup", "IGCC +", TAB_BLUE),
            SeriesSpec::negated("igccvolumedown", "IGCC -", TAB_ORANGE),
            SeriesSpec::new("afrrvolumeup", "aFRR +", TAB_GREEN),
            SeriesSpec::negated("afrrvolumedown", "aFRR -", TAB_RED),
        ],
        group_by: &[],
    },
    ChartSpec {
        slug: "mfrr-reserve-sharing",
        title: "mFRR and Reserve Sharing",
        dataset: Dataset::ActivatedVolumes,
        y_label: "mFRR / Reserve Sharing",
        x_label: None,
        series: &[
            SeriesSpec::new("mfrrsaup", "mFRR SA +", TAB_BLUE),
            SeriesSpec::negated("mfrrsadown", "mFRR SA -", TAB_ORANGE),
            SeriesSpec::new("mfrrdaup", "mFRR DA +", TAB_GREEN),
            SeriesSpec::negated("mfrrdadown", "mFRR DA -", TAB_RED),
            SeriesSpec::new("reserve_sharing_import", "Reserve +", TAB_PURPLE),
            SeriesSpec::negated("reserve_sharing_export", "Reserve -", TAB_BROWN),
        ],
        group_by: &[],
    },
    ChartSpec {
        slug: "available-afrr",
        title: "Available aFRR",
        dataset: Dataset::AvailableAfrr,
        y_label: "Available aFRR (MW)",
        x_label: Some("Hour of Day"),
        series: &[
            SeriesSpec::new("upwardavailableafrrvol", "Available aFRR up", TAB_GREEN),
            SeriesSpec::new("downwardavailableafrrvol", "Available aFRR down", TAB_RED),
        ],
        group_by: &[],
    },
    ChartSpec {
        slug: "cap-floor-price",
        title: "Cap and Floor Price",
        dataset: Dataset::CapFloorPrices,
        y_label: "Cap / Floor Price (€/MWh)",
        x_label: Some("Hour of Day"),
        series: &[
            SeriesSpec::new("cap", "Cap", TAB_BLUE),
            SeriesSpec::new("floorprice", "Floor Price", TAB_RED),
        ],
        group_by: &[],
    },
    ChartSpec {
        slug: "cross-border-capacity",
        title: "Cross-Border Capacity",
        dataset: Dataset::CrossBorderCapacity,
        y_label: "Available transfer capacity (MW)",
        x_label: Some("Hour of Day"),
        series: &[SeriesSpec::new(
            "availabletransfercapacityatlastclosedgate",
            "ATC",
            TAB_BLUE,
        )],
        group_by: &["country", "direction"],
    },
];

/// Points of one line, ready to be drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotSeries {
    pub label: String,
    pub color: RGBColor,
    pub points: Vec<(DateTime<Tz>, f64)>,
}

/// Builds the lines of `chart` from a sliced table.
pub fn chart_series(chart: &ChartSpec, table: &Table) -> Vec<PlotSeries> {
    if chart.group_by.is_empty() {
        return chart
            .series
            .iter()
            .map(|spec| PlotSeries {
                label: spec.label.to_owned(),
                color: spec.color,
                points: signed(table.series(spec.column), spec.negate),
            })
            .collect();
    }

    let mut groups: Vec<String> = Vec::new();
    for row in table.rows() {
        let key = group_key(chart.group_by, row);
        if !groups.contains(&key) {
            groups.push(key);
        }
    }

    let mut lines: Vec<PlotSeries> = Vec::new();
    for spec in chart.series {
        for group in &groups {
            let points = table
                .rows()
                .iter()
                .filter(|row| &group_key(chart.group_by, row) == group)
                .filter_map(|row| Some((row.datetime, row.number(spec.column)?)))
                .collect();
            lines.push(PlotSeries {
                label: format!("{} {}", spec.label, group),
                color: PALETTE[lines.len() % PALETTE.len()],
                points: signed(points, spec.negate),
            });
        }
    }
    lines
}

fn group_key(columns: &[&str], row: &Row) -> String {
    columns
        .iter()
        .map(|column| match row.fields.get(*column) {
            Some(serde_json::Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
            None => String::from("?"),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn signed(points: Vec<(DateTime<Tz>, f64)>, negate: bool) -> Vec<(DateTime<Tz>, f64)> {
    if negate {
        points.into_iter().map(|(at, value)| (at, -value)).collect()
    } else {
        points
    }
}

/// Turns samples into a staircase that holds each value until the next
/// sample.
pub fn step_points<X: Clone>(points: &[(X, f64)]) -> Vec<(X, f64)> {
    let mut steps = Vec::with_capacity(points.len() * 2);
    let mut held: Option<f64> = None;
    for (x, y) in points {
        if let Some(previous) = held {
            steps.push((x.clone(), previous));
        }
        steps.push((x.clone(), *y));
        held = Some(*y);
    }
    steps
}

#[derive(Debug, Clone)]
pub struct RenderedChart {
    pub slug: String,
    pub title: String,
    pub svg: String,
    pub path: Option<PathBuf>,
}

pub trait ChartRenderer {
    fn render(
        &mut self,
        chart: &ChartSpec,
        window: &DayWindow,
        table: &Table,
    ) -> Result<RenderedChart, EliaError>;
}

/// Draws charts into SVG documents and optionally stores them on disk.
#[derive(Debug, Clone)]
pub struct SvgRenderer {
    size: (u32, u32),
    output_dir: Option<PathBuf>,
}

impl Default for SvgRenderer {
    fn default() -> Self {
        Self {
            size: (1200, 400),
            output_dir: None,
        }
    }
}

impl SvgRenderer {
    pub fn new(size: (u32, u32)) -> Self {
        Self {
            size,
            output_dir: None,
        }
    }

    /// Also write each chart to `<dir>/<date>-<slug>.svg`.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    fn draw(
        &self,
        chart: &ChartSpec,
        window: &DayWindow,
        lines: &[PlotSeries],
    ) -> Result<String, EliaError> {
        let lower = window.lower();
        let hours_of = |at: &DateTime<Tz>| at.signed_duration_since(lower).num_seconds() as f64 / 3600.0;
        let span = window.duration().num_seconds() as f64 / 3600.0;

        let (min_y, max_y) = value_range(lines)
            .ok_or_else(|| EliaError::Render(format!("no plottable values for {}", chart.title)))?;

        let label_time = |hours: &f64| {
            (lower + Duration::seconds((hours * 3600.0).round() as i64))
                .format("%H:%M")
                .to_string()
        };

        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, self.size).into_drawing_area();
            root.fill(&WHITE).map_err(render_error)?;

            let mut plot = ChartBuilder::on(&root)
                .caption(chart.title, ("sans-serif", 22))
                .margin(10)
                .x_label_area_size(40)
                .y_label_area_size(70)
                .build_cartesian_2d(0f64..span, min_y..max_y)
                .map_err(render_error)?;

            let mut mesh = plot.configure_mesh();
            mesh.disable_x_mesh()
                .bold_line_style(BLACK.mix(0.15))
                .light_line_style(TRANSPARENT)
                .x_labels((span / 2.0).ceil() as usize + 1)
                .x_label_formatter(&label_time)
                .y_desc(chart.y_label);
            if let Some(x_label) = chart.x_label {
                mesh.x_desc(x_label);
            }
            mesh.draw().map_err(render_error)?;

            for line in lines.iter().filter(|line| !line.points.is_empty()) {
                let color = line.color;
                let points: Vec<(f64, f64)> = line
                    .points
                    .iter()
                    .map(|(at, value)| (hours_of(at), *value))
                    .collect();

                plot.draw_series(LineSeries::new(step_points(&points), color.stroke_width(2)))
                    .map_err(render_error)?
                    .label(line.label.as_str())
                    .legend(move |(x, y)| {
                        PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
                    });
            }

            plot.configure_series_labels()
                .position(SeriesLabelPosition::UpperLeft)
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()
                .map_err(render_error)?;

            root.present().map_err(render_error)?;
        }

        Ok(svg)
    }
}

impl ChartRenderer for SvgRenderer {
    fn render(
        &mut self,
        chart: &ChartSpec,
        window: &DayWindow,
        table: &Table,
    ) -> Result<RenderedChart, EliaError> {
        let lines = chart_series(chart, table);
        let svg = self.draw(chart, window, &lines)?;

        let path = match &self.output_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                let path = dir.join(format!("{}-{}.svg", window.date(), chart.slug));
                std::fs::write(&path, &svg)?;
                debug!(path = %path.display(), "chart written");
                Some(path)
            }
            None => None,
        };

        Ok(RenderedChart {
            slug: chart.slug.to_owned(),
            title: chart.title.to_owned(),
            svg,
            path,
        })
    }
}

fn value_range(lines: &[PlotSeries]) -> Option<(f64, f64)> {
    let mut values = lines
        .iter()
        .flat_map(|line| line.points.iter().map(|(_, value)| *value));
    let first = values.next()?;
    let (min_y, max_y) = values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));

    let padding = ((max_y - min_y) * 0.05).max(1.0);
    Some((min_y - padding, max_y + padding)).filter(|(lo, hi)| lo.is_finite() && hi.is_finite())
}

fn render_error(err: impl Display) -> EliaError {
    EliaError::Render(err.to_string())
}

/// Renders every chart whose dataset was prepared, collecting a warning for
/// each dataset or chart that could not be drawn.
pub fn render_day<R: ChartRenderer>(
    renderer: &mut R,
    day: &DayData,
) -> (Vec<RenderedChart>, Vec<String>) {
    let mut warnings: Vec<String> = day
        .failures()
        .map(|(dataset, err)| format!("{}: {}", dataset.title(), err))
        .collect();

    let mut rendered = Vec::new();
    for chart in CHARTS {
        let Some(table) = day.table(chart.dataset) else {
            continue;
        };
        match renderer.render(chart, &day.window, table) {
            Ok(output) => rendered.push(output),
            Err(err) => {
                warn!(chart = chart.slug, "{}", err);
                warnings.push(format!("{}: {}", chart.title, err));
            }
        }
    }

    (rendered, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::normalize;
    use crate::testing::{date, record};
    use chrono_tz::Europe::Brussels;
    use serde_json::json;

    fn chart(slug: &str) -> &'static ChartSpec {
        CHARTS.iter().find(|chart| chart.slug == slug).unwrap()
    }

    fn window() -> DayWindow {
        DayWindow::new(date(2024, 5, 22), Brussels).unwrap()
    }

    fn volumes_table() -> Table {
        let fields = |up: f64, down: f64| {
            vec![
                ("igccvolumeup", json!(up)),
                ("igccvolumedown", json!(down)),
                ("afrrvolumeup", json!(up)),
                ("afrrvolumedown", json!(down)),
            ]
        };
        normalize(
            "ods127",
            vec![
                record("2024-05-21T22:00:00+00:00", &fields(10.0, 5.0)),
                record("2024-05-21T22:15:00+00:00", &fields(12.0, 2.0)),
            ],
            &["datetime"],
            Brussels,
        )
        .unwrap()
    }

    #[test]
    fn test_charts_only_use_required_columns() {
        for chart in CHARTS {
            let required = chart.dataset.required_columns();
            for series in chart.series {
                assert!(required.contains(&series.column), "{}", series.column);
            }
            for column in chart.group_by {
                assert!(required.contains(column), "{column}");
            }
        }
    }

    #[test]
    fn test_down_volumes_are_negated() {
        let lines = chart_series(chart("igcc-afrr"), &volumes_table());

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1].label, "IGCC -");
        let values: Vec<f64> = lines[1].points.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![-5.0, -2.0]);
    }

    #[test]
    fn test_step_points_hold_previous_value() {
        let steps = step_points(&[(0.0, 1.0), (1.0, 3.0), (2.0, 2.0)]);

        assert_eq!(
            steps,
            vec![(0.0, 1.0), (1.0, 1.0), (1.0, 3.0), (2.0, 3.0), (2.0, 2.0)]
        );
        assert!(step_points::<f64>(&[]).is_empty());
    }

    #[test]
    fn test_cross_border_series_per_country_and_direction() {
        let row = |at: &str, country: &str, direction: &str, atc: f64| {
            record(
                at,
                &[
                    ("country", json!(country)),
                    ("direction", json!(direction)),
                    ("resolutioncode", json!("PT60M")),
                    ("availabletransfercapacityatlastclosedgate", json!(atc)),
                ],
            )
        };
        let table = normalize(
            "ods061",
            vec![
                row("2024-05-21T22:00:00Z", "FR", "Import", 1000.0),
                row("2024-05-21T22:00:00Z", "FR", "Export", 800.0),
                row("2024-05-21T22:00:00Z", "NL", "Import", 1200.0),
                row("2024-05-21T23:00:00Z", "FR", "Import", 900.0),
            ],
            Dataset::CrossBorderCapacity.required_columns(),
            Brussels,
        )
        .unwrap();

        let lines = chart_series(chart("cross-border-capacity"), &table);

        let labels: Vec<&str> = lines.iter().map(|line| line.label.as_str()).collect();
        assert_eq!(labels, vec!["ATC FR Import", "ATC FR Export", "ATC NL Import"]);
        assert_eq!(lines[0].points.len(), 2);
        assert_ne!(lines[0].color, lines[1].color);
    }

    #[test]
    fn test_svg_renderer_draws_title() {
        let mut renderer = SvgRenderer::default();

        let rendered = renderer
            .render(chart("igcc-afrr"), &window(), &volumes_table())
            .unwrap();

        assert!(rendered.svg.contains("<svg"));
        assert!(rendered.svg.contains("IGCC and aFRR Volumes"));
        assert!(rendered.path.is_none());
    }

    #[test]
    fn test_svg_renderer_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut renderer = SvgRenderer::new((800, 300)).with_output_dir(dir.path());

        let rendered = renderer
            .render(chart("igcc-afrr"), &window(), &volumes_table())
            .unwrap();

        let path = rendered.path.unwrap();
        assert_eq!(path, dir.path().join("2024-05-22-igcc-afrr.svg"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), rendered.svg);
    }

    #[test]
    fn test_render_day_skips_failed_datasets() {
        let day = DayData {
            window: window(),
            outcomes: vec![
                crate::pipeline::DatasetOutcome {
                    dataset: Dataset::ImbalancePrices,
                    dataset_id: "ods134".to_owned(),
                    result: Err(EliaError::MissingColumns {
                        dataset: "ods134".to_owned(),
                        columns: vec!["alpha".to_owned()],
                    }),
                },
                crate::pipeline::DatasetOutcome {
                    dataset: Dataset::ActivatedVolumes,
                    dataset_id: "ods127".to_owned(),
                    result: Ok(volumes_table()),
                },
            ],
        };

        let (rendered, warnings) = render_day(&mut SvgRenderer::default(), &day);

        // the mFRR chart has no mFRR columns in this table
        let slugs: Vec<&str> = rendered.iter().map(|chart| chart.slug.as_str()).collect();
        assert_eq!(slugs, vec!["igcc-afrr"]);
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].starts_with("Imbalance prices:"));
        assert!(warnings[1].starts_with("mFRR and Reserve Sharing:"));
    }

    #[test]
    fn test_empty_table_is_a_render_error() {
        let table = normalize(
            "ods166",
            vec![record("2024-05-22T10:00:00Z", &[("cap", json!(null)), ("floorprice", json!(null))])],
            Dataset::CapFloorPrices.required_columns(),
            Brussels,
        )
        .unwrap();

        let err = SvgRenderer::default()
            .render(chart("cap-floor-price"), &window(), &table)
            .unwrap_err();

        assert!(matches!(err, EliaError::Render(_)));
    }

    #[test]
    fn test_non_finite_values_do_not_reach_the_chart() {
        let cap_table = |cap: serde_json::Value, floor: serde_json::Value| {
            normalize(
                "ods166",
                vec![
                    record("2024-05-22T10:00:00Z", &[("cap", json!("inf")), ("floorprice", json!("NaN"))]),
                    record("2024-05-22T11:00:00Z", &[("cap", cap), ("floorprice", floor)]),
                ],
                Dataset::CapFloorPrices.required_columns(),
                Brussels,
            )
            .unwrap()
        };

        let table = cap_table(json!("5"), json!("-5"));
        let lines = chart_series(chart("cap-floor-price"), &table);
        assert!(lines.iter().all(|line| line.points.len() == 1));
        let rendered = SvgRenderer::default()
            .render(chart("cap-floor-price"), &window(), &table)
            .unwrap();
        assert!(rendered.svg.contains("Cap and Floor Price"));

        // finite on their own, but the padded range overflows
        let table = cap_table(json!(1.0e308), json!(-1.0e308));
        let err = SvgRenderer::default()
            .render(chart("cap-floor-price"), &window(), &table)
            .unwrap_err();
        assert!(matches!(err, EliaError::Render(_)));
    }
}
