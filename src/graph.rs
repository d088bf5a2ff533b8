use anyhow::{Context, Result};
use image::ImageEncoder;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::collections::HashMap;

use crate::chart::{ChartData, ChartSpec, CompositionData, DistributionData};
use crate::page::{Page, PageLayout};
use crate::time::Bucket;
use crate::RenderOptions;

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

/// category10, used for composition layers in legend order
const PALETTE: [RGBColor; 10] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(188, 189, 34),
    RGBColor(23, 190, 207),
    RGBColor(127, 127, 127),
];
const OTHERS_COLOR: RGBColor = RGBColor(199, 199, 199);
const BOX_COLOR: RGBColor = RGBColor(31, 119, 180);
const OUTLIER_COLOR: RGBColor = RGBColor(214, 39, 40);

/// Bitmap canvas holding one chart or one page of charts
pub struct Canvas {
    buffer: Vec<u8>,
    width: u32,
    height: u32,
}

impl Canvas {
    pub fn new(options: &RenderOptions) -> Result<Self> {
        if options.width == 0 || options.height == 0 {
            anyhow::bail!("Canvas size must be positive (got {}x{})", options.width, options.height);
        }

        let len = (options.width as usize)
            .checked_mul(options.height as usize)
            .and_then(|pixels| pixels.checked_mul(3))
            .ok_or_else(|| anyhow::anyhow!("Canvas size {}x{} is too large", options.width, options.height))?;

        Ok(Canvas {
            buffer: vec![0u8; len],
            width: options.width,
            height: options.height,
        })
    }

    /// Draw a single chart over the whole canvas
    pub fn draw_chart(&mut self, chart: &ChartSpec) -> Result<()> {
        let root = BitMapBackend::with_buffer(&mut self.buffer, (self.width, self.height))
            .into_drawing_area();
        root.fill(&WHITE).context("Failed to fill background")?;

        draw_chart_on(&root, chart)?;

        root.present().context("Failed to present drawing")?;
        Ok(())
    }

    /// Draw a page; grid pages split the canvas into equal cells
    pub fn draw_page(&mut self, page: &Page) -> Result<()> {
        let root = BitMapBackend::with_buffer(&mut self.buffer, (self.width, self.height))
            .into_drawing_area();
        root.fill(&WHITE).context("Failed to fill background")?;

        match page.layout {
            PageLayout::Single => {
                for placed in &page.charts {
                    draw_chart_on(&root, &placed.chart)?;
                }
            }
            PageLayout::Grid { rows, cols } => {
                let cells = root.split_evenly((rows, cols));
                for placed in &page.charts {
                    let area = cells
                        .get(placed.cell.area_index())
                        .ok_or_else(|| anyhow::anyhow!("Grid cell {:?} is outside the page", placed.cell))?;
                    draw_chart_on(area, &placed.chart)?;
                }
            }
        }

        root.present().context("Failed to present drawing")?;
        Ok(())
    }

    /// Finalize and encode the canvas as PNG
    pub fn render(self) -> Result<Vec<u8>> {
        let mut png_bytes = Vec::new();
        {
            let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
            encoder
                .write_image(
                    &self.buffer,
                    self.width,
                    self.height,
                    image::ColorType::Rgb8,
                )
                .context("Failed to encode PNG")?;
        }

        Ok(png_bytes)
    }
}

pub fn render_chart_png(chart: &ChartSpec, options: &RenderOptions) -> Result<Vec<u8>> {
    let mut canvas = Canvas::new(options)?;
    canvas.draw_chart(chart)?;
    canvas.render()
}

pub fn render_page_png(page: &Page, options: &RenderOptions) -> Result<Vec<u8>> {
    let mut canvas = Canvas::new(options)?;
    canvas.draw_page(page)?;
    canvas.render()
}

fn draw_chart_on(area: &Area<'_>, chart: &ChartSpec) -> Result<()> {
    match &chart.data {
        ChartData::Distribution(data) => draw_distribution(area, chart, data),
        ChartData::Composition(data) => draw_composition(area, chart, data),
    }
}

/// Label of the bucket slot containing `x` (slot i spans i..i+1)
fn slot_label(labels: &[String], x: f64) -> String {
    if x < 0.0 {
        return String::new();
    }
    labels.get(x.floor() as usize).cloned().unwrap_or_default()
}

fn draw_distribution(area: &Area<'_>, chart: &ChartSpec, data: &DistributionData) -> Result<()> {
    let labels = chart.bucket_labels();
    let n = labels.len().max(1);
    let (lo, hi) = data.display_range;

    let mut ctx = ChartBuilder::on(area)
        .margin(10)
        .caption(chart.title(), ("sans-serif", 18))
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0.0..n as f64, lo..hi)
        .context("Failed to build chart")?;

    ctx.configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&|x| slot_label(&labels, *x))
        .y_desc(chart.variable.as_str())
        .draw()
        .context("Failed to draw mesh")?;

    let box_half = 0.3;
    let cap_half = 0.12;

    for (idx, summary) in data.summaries.iter().enumerate() {
        let Some(stats) = &summary.stats else { continue };
        let x = idx as f64 + 0.5;
        let clamp = |y: f64| y.clamp(lo, hi);

        // Whiskers and caps
        let lines = vec![
            vec![(x, clamp(stats.lower_whisker)), (x, clamp(stats.q1))],
            vec![(x, clamp(stats.q3)), (x, clamp(stats.upper_whisker))],
            vec![(x - cap_half, clamp(stats.lower_whisker)), (x + cap_half, clamp(stats.lower_whisker))],
            vec![(x - cap_half, clamp(stats.upper_whisker)), (x + cap_half, clamp(stats.upper_whisker))],
        ];
        ctx.draw_series(lines.into_iter().map(|points| PathElement::new(points, BLACK.stroke_width(1))))
            .context("Failed to draw whiskers")?;

        ctx.draw_series(std::iter::once(Rectangle::new(
            [(x - box_half, clamp(stats.q3)), (x + box_half, clamp(stats.q1))],
            BOX_COLOR.mix(0.6).filled(),
        )))
        .context("Failed to draw box")?;

        ctx.draw_series(std::iter::once(PathElement::new(
            vec![(x - box_half, clamp(stats.median)), (x + box_half, clamp(stats.median))],
            WHITE.stroke_width(2),
        )))
        .context("Failed to draw median")?;

        // Outliers stay in the data; ones beyond the axis are pinned to its edge
        ctx.draw_series(
            stats
                .outliers
                .iter()
                .map(|&v| Circle::new((x, clamp(v)), 3, OUTLIER_COLOR.filled())),
        )
        .context("Failed to draw outliers")?;
    }

    Ok(())
}

/// Share (percent) of each category within each bucket
fn share_lookup(data: &CompositionData) -> HashMap<(Bucket, &str), f64> {
    data.shares
        .iter()
        .map(|row| ((row.bucket, row.category.as_str()), row.share))
        .collect()
}

fn draw_composition(area: &Area<'_>, chart: &ChartSpec, data: &CompositionData) -> Result<()> {
    let labels = chart.bucket_labels();
    let n = labels.len().max(1);

    let mut ctx = ChartBuilder::on(area)
        .margin(10)
        .caption(chart.title(), ("sans-serif", 18))
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0.0..n as f64, 0.0..100.0)
        .context("Failed to build chart")?;

    ctx.configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&|x| slot_label(&labels, *x))
        .y_desc("share (%)")
        .draw()
        .context("Failed to draw mesh")?;

    let share_of = share_lookup(data);
    let mut offsets = vec![0.0; chart.buckets.len()];

    for (cat_idx, category) in data.categories.iter().enumerate() {
        let color = if data.others.as_deref() == Some(category.as_str()) {
            OTHERS_COLOR
        } else {
            PALETTE[cat_idx % PALETTE.len()]
        };

        let mut bars = Vec::new();
        for (idx, bucket) in chart.buckets.iter().enumerate() {
            let share = share_of.get(&(*bucket, category.as_str())).copied().unwrap_or(0.0);
            if share > 0.0 {
                let x = idx as f64;
                bars.push(Rectangle::new(
                    [(x + 0.1, offsets[idx]), (x + 0.9, offsets[idx] + share)],
                    color.filled(),
                ));
                offsets[idx] += share;
            }
        }

        ctx.draw_series(bars)
            .context("Failed to draw composition layer")?
            .label(category.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    ctx.configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .context("Failed to draw legend")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_label() {
        let labels = vec!["2020".to_string(), "2021".to_string()];
        assert_eq!(slot_label(&labels, 0.0), "2020");
        assert_eq!(slot_label(&labels, 1.7), "2021");
        assert_eq!(slot_label(&labels, 2.0), "");
        assert_eq!(slot_label(&labels, -0.5), "");
    }

    #[test]
    fn test_share_lookup() {
        use crate::chart::ShareRow;
        let b1 = Bucket(chrono::NaiveDate::from_ymd_opt(2020, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap());
        let b2 = Bucket(chrono::NaiveDate::from_ymd_opt(2021, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap());
        let row = |bucket, category: &str, share| ShareRow {
            bucket,
            category: category.to_string(),
            count: 1,
            share,
        };
        let data = CompositionData {
            categories: vec!["a".to_string(), "b".to_string()],
            shares: vec![row(b1, "a", 25.0), row(b1, "b", 75.0), row(b2, "a", 100.0)],
            distinct: 2,
            others: None,
        };

        let lookup = share_lookup(&data);
        assert_eq!(lookup.len(), 3);
        assert_eq!(lookup.get(&(b1, "b")), Some(&75.0));
        assert_eq!(lookup.get(&(b2, "a")), Some(&100.0));
        assert_eq!(lookup.get(&(b2, "b")), None);
    }

    #[test]
    fn test_canvas_rejects_zero_size() {
        let options = RenderOptions { width: 0, height: 600 };
        assert!(Canvas::new(&options).is_err());
    }

    #[test]
    fn test_canvas_rejects_overflowing_size() {
        let options = RenderOptions { width: u32::MAX, height: u32::MAX };
        assert!(Canvas::new(&options).is_err());
    }

    #[test]
    fn test_empty_canvas_encodes_png() {
        let options = RenderOptions { width: 20, height: 10 };
        let png = Canvas::new(&options).unwrap().render().unwrap();
        assert_eq!(&png[0..8], &[137, 80, 78, 71, 13, 10, 26, 10]);
    }
}
