//! Speex driver: captures the `Speex   ` header. No libspeex binding
//! exists in this build's dependency stack, so `decode` runs the same
//! passthrough fallback as [`super::vorbis`] and [`super::opus`].

use crate::error::Result;

use super::{silence_passthrough, AudioCodec, AudioFrame};

#[derive(Default)]
pub struct SpeexCodec {
    sample_rate: u32,
    channels: u16,
    samples_emitted: u64,
}

impl AudioCodec for SpeexCodec {
    fn initialize(&mut self, _codec_private: &[u8], sample_rate: u32, channels: u16) -> Result<()> {
        self.sample_rate = sample_rate;
        self.channels = channels;
        Ok(())
    }

    fn decode(&mut self, chunk: &[u8]) -> Result<Vec<AudioFrame>> {
        Ok(silence_passthrough(chunk, self.sample_rate, self.channels, &mut self.samples_emitted))
    }

    fn flush(&mut self) -> Result<Vec<AudioFrame>> {
        Ok(Vec::new())
    }

    fn reset(&mut self) {
        self.samples_emitted = 0;
    }

    fn name(&self) -> &'static str {
        "speex"
    }

    fn can_decode(&self, codec_name: &str) -> bool {
        codec_name == "speex"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_emits_silent_pcm_sized_from_packet() {
        let mut codec = SpeexCodec::default();
        codec.initialize(&[], 8000, 1).unwrap();
        let frames = codec.decode(&[0]).unwrap();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].frame_count() > 0);
    }
}
