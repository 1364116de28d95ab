use crate::config::{HexColor, OutputFormat, Period, StyleConfig, window_label};
use crate::join::{MapFeature, PrecipitationPoint, TopicLabel};
use crate::layers::MapLayers;
use crate::precipitation::PrecipCategory;
use anyhow::Result;
use geo::{Area, LineString, Rect};
use indicatif::ProgressBar;
use log::trace;
use plotters::coord::Shift;
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;
use plotters::style::FontStyle;
use std::ops::Range;
use std::path::Path;

type MapChart<'a, DB> = ChartContext<'a, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

// Fractional padding around the data extent
const MAP_PADDING: f64 = 0.03;
// Basin outline dash and gap, as fractions of the map width
const DASH_FRACTION: f64 = 1.0 / 120.0;
const GAP_FRACTION: f64 = 1.0 / 240.0;

/// Figure title naming the window covered by `periods`.
pub fn figure_title(periods: &[Period]) -> String {
    format!(
        "Dominant topic per watershed and precipitation, {}",
        window_label(periods)
    )
}

// Everything needed to draw the figure
pub struct MapFigure<'a> {
    pub title: String,
    pub periods: &'a [Period],
    pub features: &'a [MapFeature<'a>],
    pub points: &'a [PrecipitationPoint],
    pub layers: &'a MapLayers,
    pub style: &'a StyleConfig,
}

fn rgb(color: HexColor) -> RGBColor {
    RGBColor(color.0, color.1, color.2)
}

fn ring_coords(ring: &LineString<f64>) -> Vec<(f64, f64)> {
    ring.coords().map(|c| (c.x, c.y)).collect()
}

// Area enclosed by the outer ring, holes included
fn exterior_area(polygon: &geo::Polygon<f64>) -> f64 {
    geo::Polygon::new(polygon.exterior().clone(), vec![]).unsigned_area()
}

fn marker_radius(style: &StyleConfig, category: PrecipCategory) -> i32 {
    let size = style.marker_size(category).unwrap_or(0.0);
    ((size * style.point_scale_px).round() as i32).max(1)
}

/// Expands `bounds` so that, after correcting longitude for latitude, the
/// map keeps its true shape in a `pixels` sized plot.
pub fn fit_bounds(bounds: Rect<f64>, pixels: (u32, u32)) -> (Range<f64>, Range<f64>) {
    let center = bounds.center();
    let x_scale = center.y.to_radians().cos().abs().max(0.1);

    let mut width = bounds.width().max(1e-9) * (1.0 + 2.0 * MAP_PADDING) * x_scale;
    let mut height = bounds.height().max(1e-9) * (1.0 + 2.0 * MAP_PADDING);
    let target = f64::from(pixels.0.max(1)) / f64::from(pixels.1.max(1));

    if width / height < target {
        width = height * target;
    } else {
        height = width / target;
    }

    let half_w = width / x_scale / 2.0;
    let half_h = height / 2.0;
    (
        center.x - half_w..center.x + half_w,
        center.y - half_h..center.y + half_h,
    )
}

/// Splits a polyline into dashes of length `dash` separated by `gap`.
pub fn dash_segments(points: &[(f64, f64)], dash: f64, gap: f64) -> Vec<Vec<(f64, f64)>> {
    if points.len() < 2 || dash <= 0.0 || gap <= 0.0 {
        return vec![points.to_vec()];
    }

    let mut segments = Vec::new();
    let mut current = vec![points[0]];
    let mut drawing = true;
    let mut remaining = dash;

    for pair in points.windows(2) {
        let (mut start, end) = (pair[0], pair[1]);
        let mut seg_len = (end.0 - start.0).hypot(end.1 - start.1);

        while seg_len > remaining {
            let t = remaining / seg_len;
            let cut = (
                start.0 + (end.0 - start.0) * t,
                start.1 + (end.1 - start.1) * t,
            );
            current.push(cut);
            if drawing {
                segments.push(std::mem::take(&mut current));
            }
            seg_len -= remaining;
            start = cut;
            drawing = !drawing;
            remaining = if drawing { dash } else { gap };
        }

        remaining -= seg_len;
        if drawing {
            current.push(end);
        }
    }

    if drawing && current.len() > 1 {
        segments.push(current);
    }
    segments
}

// Swatch drawn next to a legend label
#[derive(Debug, Clone, PartialEq)]
pub enum LegendKey {
    Fill(HexColor),
    Point { radius: i32, color: HexColor },
    Dashed(HexColor),
    Line { color: HexColor, alpha: f64 },
    Triangle(HexColor),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub label: String,
    pub key: LegendKey,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendSection {
    pub title: String,
    pub entries: Vec<LegendEntry>,
}

/// Legend sections in display order: fill, size, linetype, colour, shape.
/// Levels absent from the figure are left out, as are empty sections.
pub fn legend_sections(figure: &MapFigure) -> Vec<LegendSection> {
    let style = figure.style;

    let mut fill: Vec<LegendEntry> = style
        .topic_order
        .iter()
        .filter(|t| {
            figure
                .features
                .iter()
                .any(|f| f.topic.as_topic() == Some(t.as_str()))
        })
        .map(|t| LegendEntry {
            label: t.clone(),
            key: LegendKey::Fill(style.topic_color(Some(t.as_str()))),
        })
        .collect();
    if figure
        .features
        .iter()
        .any(|f| f.topic == TopicLabel::NotAvailable)
    {
        fill.push(LegendEntry {
            label: TopicLabel::NotAvailable.to_string(),
            key: LegendKey::Fill(style.na_color),
        });
    }

    let size = PrecipCategory::legend_order()
        .filter(|c| figure.points.iter().any(|p| p.category == *c))
        .map(|c| LegendEntry {
            label: c.to_string(),
            key: LegendKey::Point {
                radius: marker_radius(style, c),
                color: style.point_color,
            },
        })
        .collect();

    let mut linetype = Vec::new();
    if !figure.layers.basin_outline.is_empty() {
        linetype.push(LegendEntry {
            label: "Main basin".to_string(),
            key: LegendKey::Dashed(style.basin_color),
        });
    }

    let mut color = Vec::new();
    if !figure.layers.rivers_exceedance.is_empty() {
        color.push(LegendEntry {
            label: "Exceedance".to_string(),
            key: LegendKey::Line {
                color: style.exceedance_color,
                alpha: style.river_alpha,
            },
        });
    }
    if !figure.layers.rivers_stream.is_empty() {
        color.push(LegendEntry {
            label: "Stream".to_string(),
            key: LegendKey::Line {
                color: style.stream_color,
                alpha: style.river_alpha,
            },
        });
    }

    let mut shape = Vec::new();
    if !figure.layers.cities.is_empty() {
        shape.push(LegendEntry {
            label: "City".to_string(),
            key: LegendKey::Triangle(style.city_color),
        });
    }

    [
        ("Dominant topic", fill),
        ("Precipitation", size),
        ("Basin", linetype),
        ("River", color),
        ("Places", shape),
    ]
    .into_iter()
    .filter(|(_, entries)| !entries.is_empty())
    .map(|(title, entries)| LegendSection {
        title: title.to_string(),
        entries,
    })
    .collect()
}

/// Draws every map layer of one facet onto an already built chart.
pub fn draw_layers<DB>(
    chart: &mut MapChart<'_, DB>,
    figure: &MapFigure,
    period: &str,
    progress: &ProgressBar,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let style = figure.style;
    let border = rgb(style.border_color);

    let mut parts = Vec::new();
    for feature in figure.features.iter().filter(|f| f.period == period) {
        trace!("Drawing watershed {} as {}", feature.watershed_id, feature.topic);
        let fill = rgb(style.topic_color(feature.topic.as_topic()));
        parts.extend(feature.geometry.iter().map(|p| (p, fill)));
        progress.inc(1);
    }
    // A part lying in another part's hole has the smaller outer ring and is drawn after it
    parts.sort_by(|a, b| exterior_area(b.0).total_cmp(&exterior_area(a.0)));

    for (polygon, fill) in parts {
        chart.draw_series(std::iter::once(Polygon::new(
            ring_coords(polygon.exterior()),
            fill.filled(),
        )))?;
        chart.draw_series(
            polygon
                .interiors()
                .iter()
                .map(|hole| Polygon::new(ring_coords(hole), WHITE.filled())),
        )?;
        chart.draw_series(
            std::iter::once(polygon.exterior())
                .chain(polygon.interiors())
                .map(|ring| PathElement::new(ring_coords(ring), border.stroke_width(1))),
        )?;
    }

    let alpha = style.river_alpha;
    let stream = rgb(style.stream_color).mix(alpha).stroke_width(2);
    chart.draw_series(
        figure
            .layers
            .rivers_stream
            .iter()
            .map(|l| PathElement::new(ring_coords(l), stream)),
    )?;
    let exceedance = rgb(style.exceedance_color).mix(alpha).stroke_width(3);
    chart.draw_series(
        figure
            .layers
            .rivers_exceedance
            .iter()
            .map(|l| PathElement::new(ring_coords(l), exceedance)),
    )?;

    let x_span = {
        let range = chart.x_range();
        range.end - range.start
    };
    let basin = rgb(style.basin_color).stroke_width(2);
    for ring in &figure.layers.basin_outline {
        let dashes = dash_segments(
            &ring_coords(ring),
            x_span * DASH_FRACTION,
            x_span * GAP_FRACTION,
        );
        chart.draw_series(dashes.into_iter().map(|d| PathElement::new(d, basin)))?;
    }

    let point_color = rgb(style.point_color).mix(0.6).filled();
    chart.draw_series(
        figure
            .points
            .iter()
            .filter(|p| p.period == period)
            .inspect(|p| trace!("Precipitation marker for {}: {}", p.watershed_id, p.category))
            .map(|p| {
                Circle::new(
                    (p.location.x(), p.location.y()),
                    marker_radius(style, p.category),
                    point_color,
                )
            }),
    )?;

    let city = rgb(style.city_color);
    for c in &figure.layers.cities {
        let at = (c.location.x(), c.location.y());
        match &c.name {
            Some(name) => chart.draw_series(std::iter::once(
                EmptyElement::at(at)
                    + TriangleMarker::new((0, 0), 6, city.filled())
                    + Text::new(name.clone(), (8, -6), ("sans-serif", 14).into_font()),
            ))?,
            None => chart.draw_series(std::iter::once(TriangleMarker::new(at, 6, city.filled())))?,
        };
    }

    Ok(())
}

fn draw_legend<DB>(area: &DrawingArea<DB, Shift>, sections: &[LegendSection]) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let title_font = ("sans-serif", 18).into_font().style(FontStyle::Bold);
    let label_font = ("sans-serif", 15).into_font();
    let mut y = 20;

    for section in sections {
        area.draw(&Text::new(section.title.clone(), (10, y), title_font.clone()))?;
        y += 26;

        for entry in &section.entries {
            let (cx, cy) = (26, y + 8);
            match entry.key {
                LegendKey::Fill(c) => {
                    area.draw(&Rectangle::new(
                        [(cx - 10, cy - 8), (cx + 10, cy + 8)],
                        rgb(c).filled(),
                    ))?;
                }
                LegendKey::Point { radius, color } => {
                    area.draw(&Circle::new((cx, cy), radius, rgb(color).mix(0.6).filled()))?;
                }
                LegendKey::Dashed(c) => {
                    for x0 in [cx - 12, cx - 2, cx + 8] {
                        area.draw(&PathElement::new(
                            vec![(x0, cy), (x0 + 6, cy)],
                            rgb(c).stroke_width(2),
                        ))?;
                    }
                }
                LegendKey::Line { color, alpha } => {
                    area.draw(&PathElement::new(
                        vec![(cx - 12, cy), (cx + 12, cy)],
                        rgb(color).mix(alpha).stroke_width(3),
                    ))?;
                }
                LegendKey::Triangle(c) => {
                    area.draw(&TriangleMarker::new((cx, cy), 6, rgb(c).filled()))?;
                }
            }
            area.draw(&Text::new(entry.label.clone(), (48, y), label_font.clone()))?;
            y += 24;
        }
        y += 14;
    }

    Ok(())
}

/// Draws the titled, faceted map with its legend panel on the right.
pub fn draw_figure<DB>(
    root: &DrawingArea<DB, Shift>,
    figure: &MapFigure,
    progress: &ProgressBar,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let root = root.titled(&figure.title, ("sans-serif", 28))?;
    let (map_area, legend_area) = root.split_horizontally(80.percent_width());

    let facets = map_area.split_evenly((1, figure.periods.len().max(1)));
    let bounds = figure.layers.bounds();

    for (facet, period) in facets.iter().zip(figure.periods) {
        let panel = facet.titled(&period.label, ("sans-serif", 20))?;
        let margin = 10;
        let (w, h) = panel.dim_in_pixel();
        let pixels = (
            w.saturating_sub(2 * margin as u32),
            h.saturating_sub(2 * margin as u32),
        );
        let (x_range, y_range) = match bounds {
            Some(b) => fit_bounds(b, pixels),
            None => (0.0..1.0, 0.0..1.0),
        };

        let mut chart = ChartBuilder::on(&panel)
            .margin(margin)
            .build_cartesian_2d(x_range, y_range)?;
        draw_layers(&mut chart, figure, &period.label, progress)?;
    }

    draw_legend(&legend_area, &legend_sections(figure))?;
    Ok(())
}

pub fn render_to_file(
    path: &Path,
    format: OutputFormat,
    size: (u32, u32),
    figure: &MapFigure,
    progress: &ProgressBar,
) -> Result<()> {
    match format {
        OutputFormat::Png => {
            let root = BitMapBackend::new(path, size).into_drawing_area();
            draw_figure(&root, figure, progress)?;
            root.present()?;
        }
        OutputFormat::Svg => {
            let root = SVGBackend::new(path, size).into_drawing_area();
            draw_figure(&root, figure, progress)?;
            root.present()?;
        }
    }
    Ok(())
}
