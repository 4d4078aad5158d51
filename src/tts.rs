//! Speech synthesis client.
//!
//! Speech is best-effort: any failure degrades to the command's nominal
//! duration instead of aborting the sequence, so a dead TTS server only
//! silences the avatar.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::AvatarConfig;
use crate::error::AvatarError;

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    voice: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    emotion: Option<&'a str>,
}

/// One synthesizer voice, as listed by the speech server.
#[derive(Debug, Clone, Deserialize)]
pub struct VoiceInfo {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub gender: String,
}

/// Synthesized speech for one command: the audio payload and its estimated
/// playback duration in seconds.
#[derive(Debug, Clone)]
pub struct Speech {
    pub audio: Vec<u8>,
    pub duration: f64,
}

#[derive(Debug, Clone)]
pub struct SpeechClient {
    client: reqwest::Client,
    url: String,
    voices_url: String,
    bitrate: u32,
}

impl SpeechClient {
    pub fn new(config: &AvatarConfig) -> Self {
        // /voices sits beside /tts on the speech server
        let base = config
            .tts_url
            .trim_end_matches('/')
            .rsplit_once('/')
            .map(|(base, _)| base.to_string())
            .unwrap_or_else(|| config.tts_url.clone());
        Self {
            client: reqwest::Client::new(),
            url: config.tts_url.clone(),
            voices_url: format!("{base}/voices"),
            bitrate: config.tts_bitrate.max(1),
        }
    }

    /// Synthesize `text`. Returns `None` on any failure so the caller falls
    /// back to nominal timing.
    pub async fn speak(
        &self,
        text: &str,
        voice: Option<&str>,
        emotion: Option<&str>,
    ) -> Option<Speech> {
        let req = SpeechRequest {
            text,
            voice,
            emotion,
        };
        let response = match self.client.post(&self.url).json(&req).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "speech request failed");
                return None;
            }
        };
        if !response.status().is_success() {
            warn!(status = %response.status(), "speech server rejected request");
            return None;
        }
        let audio = match response.bytes().await {
            Ok(b) => b.to_vec(),
            Err(e) => {
                warn!(error = %e, "speech body failed");
                return None;
            }
        };
        if audio.is_empty() {
            return None;
        }
        // No audio player in the core: estimate duration from payload size
        let duration = audio.len() as f64 * 8.0 / self.bitrate as f64;
        debug!(bytes = audio.len(), duration, "speech synthesized");
        Some(Speech { audio, duration })
    }

    /// Available voices, for UI listing. Best-effort.
    pub async fn voices(&self) -> Result<Vec<VoiceInfo>, AvatarError> {
        let response = self.client.get(&self.voices_url).send().await?;
        if !response.status().is_success() {
            return Err(AvatarError::Transport(format!(
                "voices query returned {}",
                response.status()
            )));
        }
        Ok(response.json().await?)
    }
}
