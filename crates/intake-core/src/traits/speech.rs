//! Speech-to-text seam

use async_trait::async_trait;

use crate::error::Result;

/// Raw audio as received from a chat transport
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl AudioClip {
    pub fn ogg(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            mime_type: "audio/ogg".to_string(),
        }
    }
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Convert audio to text. An empty transcript is reported as
    /// [`IntakeError::EmptyTranscript`](crate::IntakeError::EmptyTranscript).
    async fn transcribe(&self, clip: &AudioClip) -> Result<String>;
}
