//! Vorbis driver: captures the three Ogg setup packets. No libvorbis
//! binding exists in this build's dependency stack, so `decode` runs the
//! passthrough fallback (silent PCM shaped from the packet, see
//! [`super::silence_passthrough`]) rather than a real Vorbis decode.

use crate::error::Result;

use super::{silence_passthrough, AudioCodec, AudioFrame};

#[derive(Default)]
pub struct VorbisCodec {
    sample_rate: u32,
    channels: u16,
    codec_private: Vec<u8>,
    samples_emitted: u64,
}

impl AudioCodec for VorbisCodec {
    fn initialize(&mut self, codec_private: &[u8], sample_rate: u32, channels: u16) -> Result<()> {
        self.sample_rate = sample_rate;
        self.channels = channels;
        self.codec_private = codec_private.to_vec();
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
        "vorbis"
    }

    fn can_decode(&self, codec_name: &str) -> bool {
        codec_name == "vorbis"
    }
}
