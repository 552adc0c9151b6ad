use crate::error::Result;
use crate::services::email::{Mailer, OutgoingEmail};
use crate::services::inference::{InferenceError, InferenceOutput, InferenceProvider};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Keeps every message instead of delivering it
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl RecordingMailer {
    pub fn last_to(&self, to: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|m| m.to == to)
            .map(|m| m.text_body.clone())
    }

    pub fn count_to(&self, to: &str) -> usize {
        self.sent.lock().unwrap().iter().filter(|m| m.to == to).count()
    }

    /// The 6-digit code in the latest message to `to`
    pub fn last_code_to(&self, to: &str) -> Option<String> {
        extract_code(&self.last_to(to)?)
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<()> {
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

pub fn extract_code(body: &str) -> Option<String> {
    body.split(|c: char| !c.is_ascii_digit())
        .find(|word| word.len() == 6)
        .map(str::to_string)
}

pub fn extract_reset_token(body: &str) -> Option<String> {
    let start = body.find("token=")? + "token=".len();
    Some(
        body[start..]
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect(),
    )
}

/// Minimal MP4: `ftyp` then `moov/mvhd` (version 0) with the given duration
pub fn tiny_mp4(timescale: u32, duration: u32) -> Vec<u8> {
    let mut mvhd_body = vec![0u8; 100];
    mvhd_body[12..16].copy_from_slice(&timescale.to_be_bytes());
    mvhd_body[16..20].copy_from_slice(&duration.to_be_bytes());

    let mut mvhd = ((8 + mvhd_body.len()) as u32).to_be_bytes().to_vec();
    mvhd.extend_from_slice(b"mvhd");
    mvhd.extend_from_slice(&mvhd_body);

    let mut moov = ((8 + mvhd.len()) as u32).to_be_bytes().to_vec();
    moov.extend_from_slice(b"moov");
    moov.extend_from_slice(&mvhd);

    let mut file = vec![0, 0, 0, 16];
    file.extend_from_slice(b"ftypisom");
    file.extend_from_slice(&[0, 0, 2, 0]);
    file.extend_from_slice(&moov);
    file
}

/// Provider that returns a fixed reply, optionally parking until released
pub struct StubProvider {
    reply: std::result::Result<InferenceOutput, InferenceError>,
    gate: Option<Arc<Notify>>,
}

impl StubProvider {
    pub fn video(bytes: Vec<u8>) -> Self {
        Self {
            reply: Ok(InferenceOutput {
                bytes: Bytes::from(bytes),
                content_type: Some("video/mp4".to_string()),
            }),
            gate: None,
        }
    }

    pub fn raw(bytes: Vec<u8>, content_type: &str) -> Self {
        Self {
            reply: Ok(InferenceOutput {
                bytes: Bytes::from(bytes),
                content_type: Some(content_type.to_string()),
            }),
            gate: None,
        }
    }

    pub fn failing(error: InferenceError) -> Self {
        Self {
            reply: Err(error),
            gate: None,
        }
    }

    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }
}

#[async_trait]
impl InferenceProvider for StubProvider {
    async fn text_to_video(
        &self,
        _prompt: &str,
    ) -> std::result::Result<InferenceOutput, InferenceError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.reply.clone()
    }
}
