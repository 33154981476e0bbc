//! Opus driver: captures the `OpusHead`/`OpusTags` headers. No libopus
//! binding exists in this build's dependency stack, so `decode` runs the
//! same passthrough fallback as [`super::vorbis`].

use crate::error::Result;

use super::{silence_passthrough, AudioCodec, AudioFrame};

/// Opus streams are always decoded at 48 kHz regardless of the input
/// material's original rate (RFC 7845 section 5).
const OPUS_SAMPLE_RATE: u32 = 48_000;

#[derive(Default)]
pub struct OpusCodec {
    channels: u16,
    codec_private: Vec<u8>,
    samples_emitted: u64,
}

impl AudioCodec for OpusCodec {
    fn initialize(&mut self, codec_private: &[u8], _sample_rate: u32, channels: u16) -> Result<()> {
        self.channels = channels;
        self.codec_private = codec_private.to_vec();
        Ok(())
    }

    fn decode(&mut self, chunk: &[u8]) -> Result<Vec<AudioFrame>> {
        Ok(silence_passthrough(chunk, OPUS_SAMPLE_RATE, self.channels, &mut self.samples_emitted))
    }

    fn flush(&mut self) -> Result<Vec<AudioFrame>> {
        Ok(Vec::new())
    }

    fn reset(&mut self) {
        self.samples_emitted = 0;
    }

    fn name(&self) -> &'static str {
        "opus"
    }

    fn can_decode(&self, codec_name: &str) -> bool {
        codec_name == "opus"
    }
}
