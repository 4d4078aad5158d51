use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use marionette::{AssetLoader, Avatar, AvatarConfig, Sequencer};

const FRAME: Duration = Duration::from_micros(16_667);

#[tokio::main]
async fn main() -> Result<(), marionette::AvatarError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AvatarConfig::load()?;
    let backend = AssetLoader::new(config.clone()).load().await;
    let avatar = Arc::new(Mutex::new(Avatar::new(backend, config.clone())));
    let sequencer = Sequencer::new(avatar.clone(), config);

    // A prompt on the command line starts autopilot immediately
    let prompt: Option<String> = {
        let args: Vec<String> = std::env::args().skip(1).collect();
        (!args.is_empty()).then(|| args.join(" "))
    };
    if prompt.is_some() {
        sequencer.start(prompt.clone()).await;
    } else {
        info!("no prompt given, idling (pass a prompt to start autopilot)");
    }

    match sequencer.director_info().await {
        Ok(info) => info!(provider = %info.provider, model = %info.model, "director backend"),
        Err(err) => warn!(error = %err, "config query failed"),
    }
    match sequencer.speech_client().voices().await {
        Ok(voices) => info!(count = voices.len(), "speech voices available"),
        Err(err) => warn!(error = %err, "voices query failed"),
    }

    // 60 fps frame loop. The rendered transforms live in the backend; a
    // renderer would read them after each update.
    let mut interval = tokio::time::interval(FRAME);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut last = Instant::now();
    loop {
        interval.tick().await;
        let dt = last.elapsed().as_secs_f32();
        last = Instant::now();
        {
            let mut avatar = avatar.lock().await;
            let now = avatar.now();
            avatar.update(now, dt);
        }
        if prompt.is_some() && !sequencer.is_running().await {
            info!(status = ?sequencer.status().await, "sequence finished, exiting");
            break;
        }
    }
    Ok(())
}
