use clap::Parser;
use pyrscan::io::save_image;
use pyrscan::score::tract::{TensorLayout, TractClassifier};
use pyrscan::{
    render_boxes, render_detections, BBox, BoxStyle, CandidateObserver, ChannelTransform,
    DetectConfig, DetectionReport, Detector, ImageView, LabelFont, LabelMap, Normalization,
    OverlapMetric, PyrScanError, TopOneScorer,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "pyrscan CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum OverlapMetricConfig {
    IntersectionOverCandidate,
    IntersectionOverUnion,
}

impl From<OverlapMetricConfig> for OverlapMetric {
    fn from(value: OverlapMetricConfig) -> Self {
        match value {
            OverlapMetricConfig::IntersectionOverCandidate => {
                OverlapMetric::IntersectionOverCandidate
            }
            OverlapMetricConfig::IntersectionOverUnion => OverlapMetric::IntersectionOverUnion,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum NormalizationConfig {
    Caffe,
    Torch,
    Tf,
    Unit,
    Custom {
        mean: [f32; 3],
        std: [f32; 3],
        scale: f32,
        swap_rb: bool,
    },
}

impl From<NormalizationConfig> for Normalization {
    fn from(value: NormalizationConfig) -> Self {
        match value {
            NormalizationConfig::Caffe => Normalization::Caffe,
            NormalizationConfig::Torch => Normalization::Torch,
            NormalizationConfig::Tf => Normalization::Tf,
            NormalizationConfig::Unit => Normalization::Unit,
            NormalizationConfig::Custom {
                mean,
                std,
                scale,
                swap_rb,
            } => Normalization::Custom(ChannelTransform {
                mean,
                std,
                scale,
                swap_rb,
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum LayoutConfig {
    Nchw,
    Nhwc,
}

impl From<LayoutConfig> for TensorLayout {
    fn from(value: LayoutConfig) -> Self {
        match value {
            LayoutConfig::Nchw => TensorLayout::Nchw,
            LayoutConfig::Nhwc => TensorLayout::Nhwc,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct DetectConfigJson {
    resize_width: Option<usize>,
    pyramid_scale: f64,
    window_step: usize,
    roi_size: [usize; 2],
    model_input_size: [usize; 2],
    min_confidence: f32,
    nms_overlap_threshold: f32,
    overlap_metric: OverlapMetricConfig,
    normalization: NormalizationConfig,
    show_debug_boxes: bool,
    parallel: bool,
}

impl Default for DetectConfigJson {
    fn default() -> Self {
        let cfg = DetectConfig::default();
        Self {
            resize_width: cfg.resize_width,
            pyramid_scale: cfg.pyramid_scale,
            window_step: cfg.window_step,
            roi_size: [cfg.roi_size.0, cfg.roi_size.1],
            model_input_size: [cfg.model_input_size.0, cfg.model_input_size.1],
            min_confidence: cfg.min_confidence,
            nms_overlap_threshold: cfg.nms_overlap_threshold,
            overlap_metric: OverlapMetricConfig::IntersectionOverCandidate,
            normalization: NormalizationConfig::Caffe,
            show_debug_boxes: cfg.show_debug_boxes,
            parallel: cfg.parallel,
        }
    }
}

impl From<DetectConfigJson> for DetectConfig {
    fn from(value: DetectConfigJson) -> Self {
        Self {
            resize_width: value.resize_width,
            pyramid_scale: value.pyramid_scale,
            window_step: value.window_step,
            roi_size: (value.roi_size[0], value.roi_size[1]),
            model_input_size: (value.model_input_size[0], value.model_input_size[1]),
            min_confidence: value.min_confidence,
            nms_overlap_threshold: value.nms_overlap_threshold,
            overlap_metric: value.overlap_metric.into(),
            normalization: value.normalization.into(),
            show_debug_boxes: value.show_debug_boxes,
            parallel: value.parallel,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ModelConfig {
    path: String,
    labels_path: String,
    #[serde(default = "default_layout")]
    layout: LayoutConfig,
    #[serde(default)]
    apply_softmax: bool,
}

fn default_layout() -> LayoutConfig {
    LayoutConfig::Nchw
}

#[derive(Debug, Deserialize)]
struct Config {
    image_path: String,
    model: ModelConfig,
    #[serde(default)]
    output_path: Option<String>,
    #[serde(default)]
    render_dir: Option<String>,
    #[serde(default)]
    debug_dir: Option<String>,
    #[serde(default)]
    font_path: Option<String>,
    #[serde(default = "default_label_height")]
    label_height: f32,
    #[serde(default)]
    detect: DetectConfigJson,
}

fn default_label_height() -> f32 {
    16.0
}

#[derive(Debug, Serialize)]
struct BoxRecord {
    start_x: usize,
    start_y: usize,
    end_x: usize,
    end_y: usize,
    confidence: f32,
}

#[derive(Debug, Serialize)]
struct LabelRecord {
    label: String,
    boxes_before_nms: usize,
    boxes: Vec<BoxRecord>,
}

#[derive(Debug, Serialize)]
struct Output {
    width: usize,
    height: usize,
    candidates: usize,
    labels: Vec<LabelRecord>,
}

impl From<&DetectionReport> for Output {
    fn from(report: &DetectionReport) -> Self {
        let labels = report
            .detections
            .iter()
            .map(|(label, boxes)| LabelRecord {
                label: label.to_string(),
                boxes_before_nms: report.groups.get(label).map_or(0, |g| g.len()),
                boxes: boxes
                    .iter()
                    .map(|b| BoxRecord {
                        start_x: b.bbox.start_x,
                        start_y: b.bbox.start_y,
                        end_x: b.bbox.end_x,
                        end_y: b.bbox.end_y,
                        confidence: b.confidence,
                    })
                    .collect(),
            })
            .collect();
        Self {
            width: report.image_width,
            height: report.image_height,
            candidates: report.candidates,
            labels,
        }
    }
}

/// Writes one overlay per candidate into a directory.
struct DebugWriter {
    dir: PathBuf,
    count: usize,
    error: Option<PyrScanError>,
}

impl CandidateObserver for DebugWriter {
    fn on_candidate(&mut self, base: ImageView<'_>, bbox: BBox, _window: ImageView<'_>) {
        if self.error.is_some() {
            return;
        }
        let path = self.dir.join(format!("candidate_{:05}.png", self.count));
        let written = render_boxes(base, [&bbox], BoxStyle::default())
            .and_then(|overlay| save_image(overlay.view(), &path));
        if let Err(err) = written {
            self.error = Some(err);
        }
        self.count += 1;
    }
}

fn file_stem(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn render_report(
    image: ImageView<'_>,
    report: &DetectionReport,
    dir: &Path,
    font: &LabelFont,
) -> Result<(), Box<dyn std::error::Error>> {
    fs::create_dir_all(dir)?;
    for (label, boxes) in report.detections.iter() {
        let stem = file_stem(label);
        if let Some(before) = report.groups.get(label) {
            let overlay =
                render_boxes(image, before.iter().map(|b| &b.bbox), BoxStyle::default())?;
            save_image(overlay.view(), dir.join(format!("{stem}_before_nms.png")))?;
        }
        let overlay = render_detections(image, label, boxes, BoxStyle::default(), font)?;
        save_image(overlay.view(), dir.join(format!("{stem}_after_nms.png")))?;
        tracing::info!(label, boxes = boxes.len(), "rendered detections");
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("pyrscan=info".parse()?))
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.image_path.is_empty() {
        return Err("image_path must be set in the config".into());
    }

    let detector = Detector::new(config.detect.into())?;
    let (input_width, input_height) = detector.config().model_input_size;
    let labels = LabelMap::from_lines(&fs::read_to_string(&config.model.labels_path)?);
    if labels.is_empty() {
        return Err("labels file contains no labels".into());
    }
    let classifier = TractClassifier::load(
        &config.model.path,
        input_width,
        input_height,
        config.model.layout.into(),
    )?;
    let mut scorer =
        TopOneScorer::new(classifier, labels).with_softmax(config.model.apply_softmax);

    let mut debug_writer = match &config.debug_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            Some(DebugWriter {
                dir: PathBuf::from(dir),
                count: 0,
                error: None,
            })
        }
        None => None,
    };
    let observer = debug_writer
        .as_mut()
        .map(|w| w as &mut dyn CandidateObserver);

    let (image, report) = detector.detect_path(&config.image_path, &mut scorer, observer)?;
    if let Some(writer) = debug_writer {
        if let Some(err) = writer.error {
            return Err(err.into());
        }
        tracing::info!(written = writer.count, "debug overlays written");
    }

    if let Some(dir) = &config.render_dir {
        let font = match &config.font_path {
            Some(path) => LabelFont::load(path, config.label_height)?,
            None => LabelFont::builtin(config.label_height)?,
        };
        render_report(image.view(), &report, Path::new(dir), &font)?;
    }

    let output = Output::from(&report);
    let json = serde_json::to_string_pretty(&output)?;
    match config.output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
