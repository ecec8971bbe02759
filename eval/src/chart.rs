use std::{
    fmt::{self, Write as _},
    io::Write,
};

use common::{error::AppError, metrics::AssessmentCategory};

use crate::report::ModelsPerCategory;

const CHART_TITLE: &str = "Models per Category";
const CHART_HEIGHT: u32 = 300;
const BAR_WIDTH: u32 = 60;
const BAR_GAP: u32 = 6;
const PADDING_TOP: u32 = 60;
const PADDING_BOTTOM: u32 = 40;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bar {
    pub label: String,
    pub value: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tick {
    pub value: u32,
    pub label: String,
}

#[derive(Debug, Clone)]
pub struct BarChart {
    pub title: String,
    pub bars: Vec<Bar>,
    pub y_ticks: Vec<Tick>,
    pub height: u32,
    pub width: u32,
    pub bar_width: u32,
    pub padding_top: u32,
    pub padding_bottom: u32,
}

impl BarChart {
    /// One bar per non-empty category; the Y axis spans the largest bucket.
    pub fn models_per_category(
        categories: &[&AssessmentCategory],
        models_per_category: &ModelsPerCategory,
    ) -> Self {
        let mut bars = Vec::with_capacity(categories.len());
        let mut max_count: u32 = 0;
        for category in categories {
            let count = models_per_category
                .get(category.id)
                .map_or(0, |models| u32::try_from(models.len()).unwrap_or(u32::MAX));
            max_count = max_count.max(count);
            if count == 0 {
                continue;
            }
            bars.push(Bar {
                label: category.id.to_string(),
                value: count,
            });
        }

        let y_ticks = (0..=max_count)
            .map(|value| Tick {
                value,
                label: value.to_string(),
            })
            .collect();
        let slots = u32::try_from(bars.len())
            .unwrap_or(u32::MAX)
            .saturating_add(2);

        Self {
            title: CHART_TITLE.to_string(),
            bars,
            y_ticks,
            height: CHART_HEIGHT,
            width: slots.saturating_mul(BAR_WIDTH),
            bar_width: BAR_WIDTH,
            padding_top: PADDING_TOP,
            padding_bottom: PADDING_BOTTOM,
        }
    }

    fn max_tick(&self) -> u32 {
        self.y_ticks.iter().map(|tick| tick.value).max().unwrap_or(0)
    }

    pub fn render_svg(&self) -> Result<String, fmt::Error> {
        let mut out = String::new();
        let width = f64::from(self.width);
        let height = f64::from(self.height);
        let bar_width = f64::from(self.bar_width);
        let plot_top = f64::from(self.padding_top);
        let plot_bottom = height - f64::from(self.padding_bottom);
        let plot_height = plot_bottom - plot_top;
        let left = bar_width;
        let right = width - bar_width;
        let max_tick = self.max_tick();
        let scale = if max_tick == 0 {
            0.0
        } else {
            plot_height / f64::from(max_tick)
        };

        writeln!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}" font-family="sans-serif">"#,
            self.width, self.height, self.width, self.height
        )?;
        writeln!(
            out,
            r##"<rect x="0" y="0" width="{}" height="{}" fill="#ffffff"/>"##,
            self.width, self.height
        )?;
        writeln!(
            out,
            r#"<text x="{}" y="{}" font-size="16" text-anchor="middle">{}</text>"#,
            width / 2.0,
            plot_top / 2.0,
            escape_svg(&self.title)
        )?;

        for tick in &self.y_ticks {
            let y = plot_bottom - f64::from(tick.value) * scale;
            writeln!(
                out,
                r##"<line x1="{left}" y1="{y}" x2="{right}" y2="{y}" stroke="#e5e5e5"/>"##
            )?;
            writeln!(
                out,
                r##"<text x="{}" y="{y}" font-size="10" text-anchor="end" dominant-baseline="middle" fill="#555555">{}</text>"##,
                left - 8.0,
                escape_svg(&tick.label)
            )?;
        }

        writeln!(
            out,
            r##"<line x1="{left}" y1="{plot_top}" x2="{left}" y2="{plot_bottom}" stroke="#333333"/>"##
        )?;
        writeln!(
            out,
            r##"<line x1="{left}" y1="{plot_bottom}" x2="{right}" y2="{plot_bottom}" stroke="#333333"/>"##
        )?;

        let gap = f64::from(BAR_GAP);
        let mut x = left;
        for bar in &self.bars {
            let bar_height = f64::from(bar.value) * scale;
            writeln!(
                out,
                r##"<rect x="{}" y="{}" width="{}" height="{bar_height}" fill="#4285f4"/>"##,
                x + gap,
                plot_bottom - bar_height,
                bar_width - 2.0 * gap
            )?;
            writeln!(
                out,
                r#"<text x="{}" y="{}" font-size="10" text-anchor="middle">{}</text>"#,
                x + bar_width / 2.0,
                plot_bottom + 16.0,
                escape_svg(&bar.label)
            )?;
            x += bar_width;
        }

        writeln!(out, "</svg>")?;
        Ok(out)
    }
}

/// Render the models-per-category bar chart as SVG into `writer`.
pub fn bar_chart_models_per_category_svg<W: Write>(
    writer: &mut W,
    categories: &[&AssessmentCategory],
    models_per_category: &ModelsPerCategory,
) -> Result<(), AppError> {
    let svg = BarChart::models_per_category(categories, models_per_category).render_svg()?;
    writer.write_all(svg.as_bytes())?;
    Ok(())
}

fn escape_svg(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
