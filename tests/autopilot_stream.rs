//! End-to-end autopilot test against a local HTTP server speaking the
//! newline-delimited JSON command protocol.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use marionette::{AutopilotStatus, Avatar, AvatarConfig, Sequencer};

fn spawn_server(ndjson: String, tts_works: bool) -> u16 {
    let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
    let port = server.server_addr().to_ip().unwrap().port();
    std::thread::spawn(move || {
        for request in server.incoming_requests() {
            let response = if request.url().starts_with("/tts") {
                if tts_works {
                    // 600 bytes at the default 48 kbit/s is a 0.1 s utterance
                    tiny_http::Response::from_data(vec![0u8; 600]).boxed()
                } else {
                    tiny_http::Response::from_string("unavailable")
                        .with_status_code(500)
                        .boxed()
                }
            } else {
                tiny_http::Response::from_string(ndjson.clone()).boxed()
            };
            let _ = request.respond(response);
        }
    });
    port
}

fn config_for(port: u16) -> AvatarConfig {
    let mut config = AvatarConfig::default();
    config.autopilot_url = format!("http://127.0.0.1:{port}/autopilot");
    config.tts_url = format!("http://127.0.0.1:{port}/tts");
    config.default_duration = 0.05;
    config
}

async fn wait_for(sequencer: &Sequencer, wanted: fn(&AutopilotStatus) -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let status = sequencer.status().await;
        if wanted(&status) {
            return;
        }
        assert!(
            Instant::now() < deadline,
            "timed out waiting, status {status:?}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn streamed_sequence_plays_to_completion() {
    let ndjson = concat!(
        r#"{"body":"sit","face":"happy","duration":0.05}"#, "\n",
        r#"{"missing":["backflip"]}"#, "\n",
        "this line is not json\n",
        r#"{"say":"hello there","duration":0.05}"#, "\n",
        r#"{"done":true}"#, "\n",
    );
    let port = spawn_server(ndjson.to_string(), true);

    let config = config_for(port);
    let avatar = Arc::new(Mutex::new(Avatar::primitive(config.clone())));
    let sequencer = Sequencer::new(avatar.clone(), config);

    sequencer.start(Some("do something".to_string())).await;
    wait_for(&sequencer, |s| *s == AutopilotStatus::Complete).await;

    assert!(!sequencer.is_running().await);
    assert_eq!(
        sequencer.missing_actions().await,
        vec!["backflip".to_string()]
    );
    // Completion returns the layers to neutral
    let a = avatar.lock().await;
    assert_eq!(a.layers.body, "idle");
    assert_eq!(a.layers.arms, "auto");
    assert_eq!(a.layers.face, "auto");
    assert_eq!(a.layers.full, None);
}

#[tokio::test(flavor = "multi_thread")]
async fn error_record_aborts_sequence() {
    let ndjson = concat!(
        r#"{"body":"sit","duration":0.05}"#, "\n",
        r#"{"error":"model overloaded"}"#, "\n",
    );
    let port = spawn_server(ndjson.to_string(), true);

    let config = config_for(port);
    let avatar = Arc::new(Mutex::new(Avatar::primitive(config.clone())));
    let sequencer = Sequencer::new(avatar, config);

    sequencer.start(None).await;
    wait_for(&sequencer, |s| matches!(s, AutopilotStatus::Failed(_))).await;
    assert!(!sequencer.is_running().await);
}

#[tokio::test(flavor = "multi_thread")]
async fn speech_failure_falls_back_to_nominal_duration() {
    let ndjson = concat!(
        r#"{"say":"hello","face":"talking","duration":0.05}"#, "\n",
        r#"{"done":true}"#, "\n",
    );
    let port = spawn_server(ndjson.to_string(), false);

    let config = config_for(port);
    let avatar = Arc::new(Mutex::new(Avatar::primitive(config.clone())));
    let sequencer = Sequencer::new(avatar, config);

    let started = Instant::now();
    sequencer.start(None).await;
    wait_for(&sequencer, |s| *s == AutopilotStatus::Complete).await;
    // Nominal 0.05 s timing, not a hang waiting on dead speech
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test(flavor = "multi_thread")]
async fn stop_cancels_and_resets() {
    // A long-duration command keeps the sequence busy until stop()
    let ndjson = concat!(
        r#"{"body":"step-front","duration":30.0}"#, "\n",
        r#"{"body":"sit","duration":30.0}"#, "\n",
    );
    let port = spawn_server(ndjson.to_string(), true);

    let config = config_for(port);
    let avatar = Arc::new(Mutex::new(Avatar::primitive(config.clone())));
    let sequencer = Sequencer::new(avatar.clone(), config);

    sequencer.start(None).await;
    wait_for(&sequencer, |s| matches!(s, AutopilotStatus::Playing(_))).await;
    {
        let a = avatar.lock().await;
        assert_eq!(a.layers.body, "step-front");
    }

    sequencer.stop().await;
    assert_eq!(sequencer.status().await, AutopilotStatus::Idle);
    let a = avatar.lock().await;
    assert_eq!(a.layers.body, "idle");
    // Default stop policy returns to the origin
    assert_eq!(a.spatial.position, glam::Vec2::ZERO);
}
