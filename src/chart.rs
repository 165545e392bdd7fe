use crate::config::ChartConfig;
use crate::error::{AppError, Result};
use crate::models::ForecastDay;
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder};
use plotters::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Upper bound on rendered x-axis labels
const MAX_LABELS: usize = 8;

/// Used when nothing filesystem-safe is left of the location name
const PLACEHOLDER_TOKEN: &str = "location";

/// Destination for rendered chart images.
///
/// Writing the same name twice replaces the earlier image.
pub trait ChartSink: Send + Sync {
    fn write(&self, name: &str, png: &[u8]) -> Result<()>;
}

/// Writes charts as files in one output directory, created on first use
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

impl ChartSink for DirectorySink {
    fn write(&self, name: &str, png: &[u8]) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(name);
        std::fs::write(&path, png)?;
        debug!("Wrote chart {} ({} bytes)", path.display(), png.len());
        Ok(())
    }
}

/// Keeps rendered charts in memory, keyed by name
#[derive(Debug, Default)]
pub struct MemorySink {
    charts: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.charts.lock().ok()?.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.charts.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ChartSink for MemorySink {
    fn write(&self, name: &str, png: &[u8]) -> Result<()> {
        let mut charts = self
            .charts
            .lock()
            .map_err(|_| AppError::Chart("chart store poisoned".to_string()))?;
        charts.insert(name.to_string(), png.to_vec());
        Ok(())
    }
}

/// Render settings fixed at startup and shared by every chart
#[derive(Debug, Clone, Copy)]
pub struct ChartStyle {
    pub width: u32,
    pub height: u32,
    pub line: RGBColor,
    pub background: RGBColor,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            width: 900,
            height: 400,
            line: RGBColor(220, 80, 40),
            background: WHITE,
        }
    }
}

impl From<&ChartConfig> for ChartStyle {
    fn from(config: &ChartConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            ..Self::default()
        }
    }
}

pub struct ChartGenerator {
    style: ChartStyle,
    sink: Arc<dyn ChartSink>,
}

impl ChartGenerator {
    pub fn new(style: ChartStyle, sink: Arc<dyn ChartSink>) -> Self {
        Self { style, sink }
    }

    /// Render the day's hourly temperatures and return the chart's file name.
    ///
    /// `Ok(None)` means there was nothing to draw. The name depends only on
    /// (location, date), so rendering the same day again replaces the image.
    pub fn render(&self, day: &ForecastDay, location: &str) -> Result<Option<String>> {
        let series = day.temperature_series();
        if series.is_empty() {
            debug!("No hourly temperatures for {}, skipping chart", day.date);
            return Ok(None);
        }

        let labels: Vec<&str> = series.iter().map(|(time, _)| time_of_day(time)).collect();
        let temps: Vec<f64> = series.iter().map(|(_, t)| *t).collect();

        let name = chart_file_name(location, &day.date);
        let caption = format!("{} - {}", location, day.date);
        let pixels = self.draw(&caption, &labels, &temps)?;
        let png = self.encode_png(&pixels)?;
        self.sink.write(&name, &png)?;

        Ok(Some(name))
    }

    /// Plot into an RGB buffer of `width * height * 3` bytes
    fn draw(&self, caption: &str, labels: &[&str], temps: &[f64]) -> Result<Vec<u8>> {
        let (width, height) = (self.style.width, self.style.height);
        let mut buffer = vec![0u8; width as usize * height as usize * 3];

        {
            let root =
                BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
            root.fill(&self.style.background).map_err(chart_err)?;

            let (min_temp, max_temp) = temps
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), t| {
                    (min.min(*t), max.max(*t))
                });
            let padding = if (max_temp - min_temp).abs() > 1e-6 {
                (max_temp - min_temp) * 0.1
            } else {
                1.0
            };

            let last = (temps.len() as i32 - 1).max(1);
            let step = label_step(labels.len());
            let formatter = |idx: &i32| axis_label(labels, step, *idx);

            let mut chart = ChartBuilder::on(&root)
                .caption(caption, ("sans-serif", 20))
                .margin(10)
                .x_label_area_size(35)
                .y_label_area_size(45)
                .build_cartesian_2d(0..last, (min_temp - padding)..(max_temp + padding))
                .map_err(chart_err)?;

            chart
                .configure_mesh()
                .x_labels(labels.len())
                .x_label_formatter(&formatter)
                .x_desc("Time")
                .y_desc("Temperature (°F)")
                .light_line_style(BLACK.mix(0.1))
                .draw()
                .map_err(chart_err)?;

            chart
                .draw_series(LineSeries::new(
                    temps.iter().enumerate().map(|(i, t)| (i as i32, *t)),
                    &self.style.line,
                ))
                .map_err(chart_err)?;

            root.present().map_err(chart_err)?;
        }

        Ok(buffer)
    }

    fn encode_png(&self, pixels: &[u8]) -> Result<Vec<u8>> {
        let mut png = Vec::new();
        PngEncoder::new(&mut png)
            .write_image(pixels, self.style.width, self.style.height, ColorType::Rgb8)
            .map_err(|e| AppError::Chart(format!("PNG encoding failed: {}", e)))?;
        Ok(png)
    }
}

fn chart_err<E: std::fmt::Display>(e: E) -> AppError {
    AppError::Chart(e.to_string())
}

/// `{location}_{date}.png`, both parts reduced to filesystem-safe tokens
pub fn chart_file_name(location: &str, date: &str) -> String {
    format!("{}_{}.png", sanitize(location), sanitize(date))
}

/// Keep ASCII letters, digits, `-` and `_`; whitespace becomes `_`
pub fn sanitize(raw: &str) -> String {
    let token: String = raw
        .trim()
        .chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() || c == '-' || c == '_' => Some(c),
            c if c.is_whitespace() => Some('_'),
            _ => None,
        })
        .collect();

    if token.is_empty() {
        PLACEHOLDER_TOKEN.to_string()
    } else {
        token
    }
}

/// `2024-03-09 14:00` -> `14:00`
pub fn time_of_day(timestamp: &str) -> &str {
    timestamp
        .split_once(' ')
        .map(|(_, time)| time)
        .unwrap_or(timestamp)
}

/// Show every Nth label so that at most about eight are drawn
pub fn label_step(len: usize) -> usize {
    (len / MAX_LABELS).max(1)
}

fn axis_label(labels: &[&str], step: usize, idx: i32) -> String {
    usize::try_from(idx)
        .ok()
        .filter(|i| i % step == 0)
        .and_then(|i| labels.get(i))
        .map(|label| label.to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HourlyReading;
    use serde_json::Map;

    fn day_with_hours(date: &str, hours: usize) -> ForecastDay {
        ForecastDay {
            date: date.to_string(),
            hour: Some(
                (0..hours)
                    .map(|h| HourlyReading {
                        time: format!("{} {:02}:00", date, h),
                        temp_f: Some(40.0 + h as f64),
                        extra: Map::new(),
                    })
                    .collect(),
            ),
            extra: Map::new(),
        }
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("Seattle"), "Seattle");
        assert_eq!(sanitize("New York"), "New_York");
        assert_eq!(sanitize("St. John's"), "St_Johns");
        assert_eq!(sanitize("../../etc/passwd"), "etcpasswd");
        assert_eq!(sanitize("São Paulo"), "So_Paulo");
        assert_eq!(sanitize("!!!"), "location");
        assert_eq!(sanitize(""), "location");
    }

    #[test]
    fn test_chart_file_name() {
        assert_eq!(chart_file_name("Seattle", "2024-03-09"), "Seattle_2024-03-09.png");
        assert_eq!(chart_file_name("", "2024-03-09"), "location_2024-03-09.png");
    }

    #[test]
    fn test_time_of_day() {
        assert_eq!(time_of_day("2024-03-09 14:00"), "14:00");
        assert_eq!(time_of_day("14:00"), "14:00");
    }

    #[test]
    fn test_label_step() {
        assert_eq!(label_step(0), 1);
        assert_eq!(label_step(5), 1);
        assert_eq!(label_step(8), 1);
        assert_eq!(label_step(16), 2);
        assert_eq!(label_step(24), 3);
    }

    #[test]
    fn test_axis_label_thins_out_hourly_series() {
        let labels: Vec<String> = (0..24).map(|h| format!("{:02}:00", h)).collect();
        let labels: Vec<&str> = labels.iter().map(String::as_str).collect();
        let step = label_step(labels.len());

        let shown: Vec<String> = (0..24)
            .map(|i| axis_label(&labels, step, i))
            .filter(|l| !l.is_empty())
            .collect();
        assert_eq!(shown.len(), 8);
        assert_eq!(shown[0], "00:00");
        assert_eq!(shown[1], "03:00");
        assert_eq!(axis_label(&labels, step, -1), "");
        assert_eq!(axis_label(&labels, step, 99), "");
    }

    #[test]
    fn test_no_hours_means_no_chart() {
        let sink = Arc::new(MemorySink::new());
        let generator = ChartGenerator::new(ChartStyle::default(), sink.clone());

        let mut day = day_with_hours("2024-03-09", 0);
        assert_eq!(generator.render(&day, "Seattle").unwrap(), None);

        day.hour = None;
        assert_eq!(generator.render(&day, "Seattle").unwrap(), None);

        day.hour = Some(vec![HourlyReading {
            time: "2024-03-09 00:00".to_string(),
            temp_f: None,
            extra: Map::new(),
        }]);
        assert_eq!(generator.render(&day, "Seattle").unwrap(), None);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_render_produces_png() {
        let sink = Arc::new(MemorySink::new());
        let generator = ChartGenerator::new(ChartStyle::default(), sink.clone());

        let name = generator
            .render(&day_with_hours("2024-03-09", 24), "Seattle")
            .unwrap();
        assert_eq!(name.as_deref(), Some("Seattle_2024-03-09.png"));

        let png = sink.get("Seattle_2024-03-09.png").unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_single_reading_and_flat_series_render() {
        let sink = Arc::new(MemorySink::new());
        let generator = ChartGenerator::new(ChartStyle::default(), sink.clone());

        let single = day_with_hours("2024-03-10", 1);
        assert!(generator.render(&single, "Seattle").unwrap().is_some());

        let mut flat = day_with_hours("2024-03-11", 4);
        for reading in flat.hour.iter_mut().flatten() {
            reading.temp_f = Some(50.0);
        }
        assert!(generator.render(&flat, "Seattle").unwrap().is_some());
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn test_caption_text_is_rasterized() {
        let style = ChartStyle::default();
        let generator = ChartGenerator::new(style, Arc::new(MemorySink::new()));
        let labels: Vec<String> = (0..24).map(|h| format!("{:02}:00", h)).collect();
        let labels: Vec<&str> = labels.iter().map(String::as_str).collect();
        let temps: Vec<f64> = (0..24).map(|h| 40.0 + h as f64).collect();

        let pixels = generator
            .draw("Seattle - 2024-03-09", &labels, &temps)
            .unwrap();
        assert_eq!(pixels.len(), (style.width * style.height * 3) as usize);

        // The top band holds only the caption, so anything not white there is text
        let row_bytes = style.width as usize * 3;
        let caption_band = &pixels[..row_bytes * 30];
        assert!(caption_band.chunks(3).any(|px| *px != [255, 255, 255]));
    }

    #[test]
    fn test_directory_sink_creates_dir_and_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(tmp.path().join("charts"));

        sink.write("a.png", b"first").unwrap();
        sink.write("a.png", b"second").unwrap();

        let written = std::fs::read(tmp.path().join("charts").join("a.png")).unwrap();
        assert_eq!(written, b"second");
    }
}
