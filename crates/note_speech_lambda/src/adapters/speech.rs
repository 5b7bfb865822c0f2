use note_speech_core::contract::AudioFormat;

/// Parameters of one text-to-speech call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    pub text: String,
    pub output_format: AudioFormat,
    pub voice: String,
    pub engine: Option<String>,
}

pub trait SpeechSynthesizer {
    /// Returns the complete audio payload for `request`.
    fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>, String>;
}
