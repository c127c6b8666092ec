use anyhow::Context;
use clap::Parser;
use reflex::PipelineConfig;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use vision::{ArtifactLoader, DirSource, HttpSource, ModelLoader};

#[derive(Debug, Parser)]
#[command(author, version, about = "Drive a game from a camera feed")]
pub struct Cli {
    /// Base URL serving the model artifacts; takes precedence over --model-dir
    #[arg(long, env = "ARCADE_MODEL_URL")]
    pub model_url: Option<String>,

    /// Directory holding the model artifacts
    #[arg(long, env = "ARCADE_MODEL_DIR", default_value = "models")]
    pub model_dir: PathBuf,

    /// Glob of still images replayed as the webcam
    #[arg(long, env = "ARCADE_FRAMES", default_value = "frames/*.jpg")]
    pub frames: String,

    /// JSON file with pipeline settings; flags below override it
    #[arg(long, env = "ARCADE_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "ARCADE_EXPRESSION_INTERVAL_MS")]
    pub expression_interval_ms: Option<u64>,

    #[arg(long, env = "ARCADE_GESTURE_INTERVAL_MS")]
    pub gesture_interval_ms: Option<u64>,

    /// Anger score at which the game starts speeding up
    #[arg(long, env = "ARCADE_ANGER_THRESHOLD")]
    pub anger_threshold: Option<f32>,

    /// Gesture confidence needed to steer, clamped to 0.5..=0.95
    #[arg(long, env = "ARCADE_CONFIDENCE_THRESHOLD")]
    pub confidence_threshold: Option<f32>,

    /// Load the gesture models and arm the gesture loop
    #[arg(long, env = "ARCADE_GESTURES")]
    pub gestures: bool,

    /// Stop after this many seconds instead of waiting for Ctrl-C
    #[arg(long)]
    pub duration_secs: Option<u64>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, env = "ARCADE_LOG", default_value = "info")]
    pub log: String,
}

impl Cli {
    /// Settings from `--config` (or defaults) with any flags applied on top.
    pub fn pipeline_config(&self) -> anyhow::Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("parsing {}", path.display()))?
            }
            None => PipelineConfig::default(),
        };
        if let Some(ms) = self.expression_interval_ms {
            config.expression_interval_ms = ms;
        }
        if let Some(ms) = self.gesture_interval_ms {
            config.gesture_interval_ms = ms;
        }
        if let Some(t) = self.anger_threshold {
            config.anger_threshold = t;
        }
        if let Some(t) = self.confidence_threshold {
            config.confidence_threshold = t;
        }
        Ok(config)
    }

    pub fn model_loader(&self) -> Arc<dyn ModelLoader> {
        match &self.model_url {
            Some(url) => Arc::new(ArtifactLoader::new(HttpSource::new(url.clone()))),
            None => Arc::new(ArtifactLoader::new(DirSource::new(self.model_dir.clone()))),
        }
    }

    /// Where models come from, for the start-up log line.
    pub fn model_origin(&self) -> String {
        match &self.model_url {
            Some(url) => url.clone(),
            None => self.model_dir.display().to_string(),
        }
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration_secs.map(Duration::from_secs)
    }
}
