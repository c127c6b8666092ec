use reflex::{Pipeline, SignalBoard};
use sensor::FolderCamera;
use std::sync::Arc;
use tracing::{info, warn};
use vision::ModelCache;

use crate::Cli;

/// Wire the pipeline from the command line and run it until Ctrl-C or the
/// configured duration elapses.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.pipeline_config()?;
    let camera = Arc::new(FolderCamera::new(&cli.frames)?);
    if camera.is_empty() {
        warn!(pattern = %cli.frames, "no frames matched; the camera stays off");
    }
    let models = Arc::new(ModelCache::new(cli.model_loader()));
    let board = Arc::new(SignalBoard::new());
    info!(
        models = %cli.model_origin(),
        frames = camera.len(),
        "starting pipeline"
    );
    let pipeline = Pipeline::new(camera, models, board.clone(), config);
    let reporter = tokio::spawn(report(board.clone()));

    pipeline.preload().await;
    if let Err(e) = pipeline.set_expression_loop_active(true) {
        warn!("expression loop not started: {e}");
    }
    if cli.gestures {
        match pipeline.load_gesture_models().await {
            Ok(()) => {
                if let Err(e) = pipeline.set_gesture_loop_active(true) {
                    warn!("gesture loop not started: {e}");
                }
            }
            Err(e) => warn!("gesture models unavailable: {e}"),
        }
    }

    match cli.duration() {
        Some(d) => tokio::time::sleep(d).await,
        None => tokio::signal::ctrl_c().await?,
    }
    pipeline.shutdown().await;
    reporter.abort();

    let last = board.expression();
    info!(
        speed = last.speed_multiplier,
        anger = last.anger_score,
        "pipeline finished"
    );
    Ok(())
}

/// Log every value the loops publish.
async fn report(board: Arc<SignalBoard>) {
    let mut expression = board.subscribe_expression();
    let mut gesture = board.subscribe_gesture();
    loop {
        tokio::select! {
            changed = expression.changed() => {
                if changed.is_err() {
                    break;
                }
                let signal = *expression.borrow_and_update();
                info!(
                    anger = signal.anger_score,
                    speed = signal.speed_multiplier,
                    angry = signal.is_angry_detected,
                    "expression"
                );
            }
            changed = gesture.changed() => {
                if changed.is_err() {
                    break;
                }
                let prediction = *gesture.borrow_and_update();
                let direction = prediction
                    .label
                    .map_or("-", |d| d.as_str());
                info!(
                    direction,
                    confidence = prediction.confidence,
                    status = %board.status(),
                    "gesture"
                );
            }
        }
    }
}
