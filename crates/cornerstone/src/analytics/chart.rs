//! SVG line chart of a rollup.

use std::fmt;

use super::Bucket;

/// Most x-axis labels drawn before labels are thinned out.
const MAX_X_LABELS: usize = 8;

/// Series drawn, with their stroke colours.
const SERIES: [(&str, &str); 3] = [
    ("views", "#2563eb"),
    ("visitors", "#16a34a"),
    ("sessions", "#d97706"),
];

/// Chart dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartOptions {
    /// Total width.
    pub width: u32,
    /// Total height.
    pub height: u32,
    /// Space between the plot area and each edge.
    pub padding: u32,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 300,
            padding: 40,
        }
    }
}

impl ChartOptions {
    fn plot_width(&self) -> f64 {
        f64::from(self.width.saturating_sub(self.padding.saturating_mul(2)).max(1))
    }

    fn plot_height(&self) -> f64 {
        f64::from(self.height.saturating_sub(self.padding.saturating_mul(2)).max(1))
    }
}

fn series_value(bucket: &Bucket, series: &str) -> u64 {
    match series {
        "views" => bucket.views,
        "visitors" => bucket.visitors,
        _ => bucket.sessions,
    }
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// A rollup drawn as an SVG line chart.
///
/// All three series share a y-scale whose top is the largest value in any
/// series. A single bucket is drawn at the horizontal centre; an empty
/// rollup renders a "No data" placeholder.
#[derive(Debug, Clone, Copy)]
pub struct Chart<'a> {
    buckets: &'a [Bucket],
    options: ChartOptions,
}

impl<'a> Chart<'a> {
    /// Chart `buckets` at the given size.
    #[must_use]
    pub fn new(buckets: &'a [Bucket], options: &ChartOptions) -> Self {
        Self {
            buckets,
            options: *options,
        }
    }

    fn write_axes(&self, f: &mut fmt::Formatter<'_>, max: u64) -> fmt::Result {
        let padding = self.options.padding;
        let left = f64::from(padding);
        let bottom = left + self.options.plot_height();

        write!(
            f,
            r##"<line x1="{left}" y1="{bottom}" x2="{:.1}" y2="{bottom}" stroke="#9ca3af"/>"##,
            left + self.options.plot_width()
        )?;
        write!(
            f,
            r##"<line x1="{left}" y1="{padding}" x2="{left}" y2="{bottom}" stroke="#9ca3af"/>"##
        )?;
        write!(
            f,
            r##"<text x="{:.1}" y="{padding}" text-anchor="end" fill="#374151">{max}</text>"##,
            left - 4.0
        )?;
        write!(
            f,
            r##"<text x="{:.1}" y="{bottom}" text-anchor="end" fill="#374151">0</text>"##,
            left - 4.0
        )
    }

    #[allow(clippy::cast_precision_loss)]
    fn x_at(&self, i: usize) -> f64 {
        let left = f64::from(self.options.padding);
        let plot_w = self.options.plot_width();
        if self.buckets.len() == 1 {
            left + plot_w / 2.0
        } else {
            left + plot_w * i as f64 / (self.buckets.len() - 1) as f64
        }
    }
}

impl fmt::Display for Chart<'_> {
    #[allow(clippy::cast_precision_loss)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ChartOptions {
            width,
            height,
            padding,
        } = self.options;
        let buckets = self.buckets;

        write!(
            f,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}" role="img" font-family="sans-serif" font-size="11">"#
        )?;
        write!(f, r##"<rect width="{width}" height="{height}" fill="#ffffff"/>"##)?;

        if buckets.is_empty() {
            return write!(
                f,
                r##"<text x="{}" y="{}" text-anchor="middle" fill="#6b7280">No data</text></svg>"##,
                width / 2,
                height / 2
            );
        }

        let plot_h = self.options.plot_height();
        let left = f64::from(padding);
        let bottom = left + plot_h;

        let max = buckets
            .iter()
            .flat_map(|b| SERIES.iter().map(move |(name, _)| series_value(b, name)))
            .max()
            .unwrap_or(0)
            .max(1);
        let y_at = |value: u64| -> f64 { bottom - plot_h * value as f64 / max as f64 };

        self.write_axes(f, max)?;

        for (name, colour) in SERIES {
            let points: Vec<String> = buckets
                .iter()
                .enumerate()
                .map(|(i, b)| format!("{:.1},{:.1}", self.x_at(i), y_at(series_value(b, name))))
                .collect();
            write!(
                f,
                r#"<polyline class="series-{name}" fill="none" stroke="{colour}" stroke-width="2" points="{}"/>"#,
                points.join(" ")
            )?;
        }

        let step = buckets.len().div_ceil(MAX_X_LABELS).max(1);
        for (i, bucket) in buckets.iter().enumerate() {
            if i % step == 0 || i == buckets.len() - 1 {
                write!(
                    f,
                    r##"<text x="{:.1}" y="{:.1}" text-anchor="middle" fill="#374151">{}</text>"##,
                    self.x_at(i),
                    bottom + 16.0,
                    escape_xml(&bucket.label)
                )?;
            }
        }

        for (i, (name, colour)) in SERIES.iter().enumerate() {
            let x = left + 90.0 * i as f64;
            write!(
                f,
                r#"<text x="{x:.1}" y="{:.1}" fill="{colour}">{name}</text>"#,
                f64::from(padding) / 2.0
            )?;
        }

        f.write_str("</svg>")
    }
}

/// Render views, visitors and sessions as one polyline each.
#[must_use]
pub fn render_chart(buckets: &[Bucket], options: &ChartOptions) -> String {
    Chart::new(buckets, options).to_string()
}
