//! HTTP speech-to-text collaborator.

use async_trait::async_trait;
use base64::Engine;
use rehearse_core::capture::{AudioClip, Transcriber};
use rehearse_core::error::CaptureError;
use serde::{Deserialize, Serialize};

pub struct HttpTranscriber {
    http: reqwest::Client,
    base_url: String,
}

impl HttpTranscriber {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[derive(Serialize)]
struct TranscribeRequest {
    audio: String,
    sample_rate: u32,
    encoding: &'static str,
}

#[derive(Deserialize)]
struct TranscribeReply {
    text: String,
}

/// Encodes f32 samples as little-endian PCM16, base64-wrapped for JSON.
fn encode_pcm16(samples: &[f32]) -> String {
    let bytes: Vec<u8> = samples
        .iter()
        .flat_map(|&sample| {
            let v = (sample * 32768.0).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
            v.to_le_bytes()
        })
        .collect();
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(&self, clip: AudioClip) -> Result<String, CaptureError> {
        let request = TranscribeRequest {
            audio: encode_pcm16(&clip.samples),
            sample_rate: clip.sample_rate,
            encoding: "pcm16",
        };
        let resp = self
            .http
            .post(format!("{}/v1/transcribe", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| CaptureError::Transcription {
                message: e.to_string(),
            })?;
        if !resp.status().is_success() {
            return Err(CaptureError::Transcription {
                message: format!("transcription service returned {}", resp.status()),
            });
        }
        let reply: TranscribeReply =
            resp.json().await.map_err(|e| CaptureError::Transcription {
                message: e.to_string(),
            })?;
        Ok(reply.text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pcm16_encoding_is_little_endian_and_clamped() {
        let encoded = encode_pcm16(&[0.0, 1.0, -1.0]);
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .unwrap();
        let values: Vec<i16> = bytes
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]))
            .collect();
        assert_eq!(values[0], 0);
        assert_eq!(values[1], i16::MAX);
        assert_eq!(values[2], i16::MIN);
    }
}
