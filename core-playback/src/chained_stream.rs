//! Virtual concatenation of several same-format tracks into one logical
//! [`Demuxer`], so a playlist of matching tracks can be fed to a single
//! `PlaybackPipeline` track without a gap between them.

use crate::demux::{Demuxer, MediaChunk, StreamInfo, Timestamp};
use crate::error::{PlaybackError, Result};

/// One already-opened sub-stream making up a link in the chain.
pub struct ChainLink {
    pub demuxer: Box<dyn Demuxer>,
    pub stream_id: u32,
}

/// Concatenates `links` in order, presenting them as a single stream
/// whose `StreamInfo` matches the first link's. Every link must share
/// the first link's sample rate and channel count — playback through a
/// format change mid-stream isn't something a PCM ring can represent.
pub struct ChainedStream {
    links: Vec<ChainLink>,
    current: usize,
    /// Sum of `duration_samples` for every link already fully consumed,
    /// so `position_ms`/`duration_ms` read as one continuous timeline.
    samples_before_current: u64,
    stream_info: StreamInfo,
}

impl ChainedStream {
    /// Validates that every link's active stream matches the first
    /// link's sample rate and channel count before accepting the chain.
    pub fn new(links: Vec<ChainLink>) -> Result<Self> {
        if links.is_empty() {
            return Err(PlaybackError::Format("chained stream requires at least one track".into()));
        }

        let first_info = stream_info_for(&links[0])?.clone();
        for (i, link) in links.iter().enumerate().skip(1) {
            let info = stream_info_for(link)?;
            if info.sample_rate != first_info.sample_rate || info.channels != first_info.channels {
                return Err(PlaybackError::Format(format!(
                    "chained stream link {i} ({} Hz, {} ch) does not match link 0 ({} Hz, {} ch)",
                    info.sample_rate, info.channels, first_info.sample_rate, first_info.channels
                )));
            }
        }

        Ok(Self {
            links,
            current: 0,
            samples_before_current: 0,
            stream_info: first_info,
        })
    }

    fn total_duration_samples(&self) -> Option<u64> {
        let mut total = 0u64;
        for link in &self.links {
            total += stream_info_for(link).ok()?.duration_samples?;
        }
        Some(total)
    }

    fn advance_to_next_link(&mut self) -> Result<()> {
        let consumed = stream_info_for(&self.links[self.current])?.duration_samples.unwrap_or(0);
        self.samples_before_current += consumed;
        self.current += 1;
        Ok(())
    }
}

fn stream_info_for(link: &ChainLink) -> Result<&StreamInfo> {
    link.demuxer
        .streams()
        .iter()
        .find(|s| s.stream_id == link.stream_id)
        .ok_or_else(|| PlaybackError::Format(format!("chain link has no stream with id {}", link.stream_id)))
}

impl Demuxer for ChainedStream {
    fn parse_container(&mut self) -> Result<()> {
        // Each link was already parsed by the factory before being
        // wrapped into a `ChainLink`; nothing further to do here.
        Ok(())
    }

    fn streams(&self) -> &[StreamInfo] {
        std::slice::from_ref(&self.stream_info)
    }

    fn read_chunk_any(&mut self) -> Result<Option<MediaChunk>> {
        let stream_id = self.stream_info.stream_id;
        self.read_chunk(stream_id)
    }

    fn read_chunk(&mut self, _stream_id: u32) -> Result<Option<MediaChunk>> {
        loop {
            if self.current >= self.links.len() {
                return Ok(None);
            }
            let link_stream_id = self.links[self.current].stream_id;
            let is_last_link = self.current + 1 == self.links.len();
            match self.links[self.current].demuxer.read_chunk(link_stream_id)? {
                Some(mut chunk) => {
                    chunk.stream_id = self.stream_info.stream_id;
                    if !is_last_link {
                        // Only the final link's own end-of-stream flag
                        // should end the chained stream.
                        chunk.end_of_stream = false;
                    }
                    return Ok(Some(chunk));
                }
                None => {
                    self.advance_to_next_link()?;
                    continue;
                }
            }
        }
    }

    /// Seeks within the chain by mapping `target_ms` to the containing
    /// link via each link's own duration, then delegating the seek.
    fn seek_to(&mut self, target_ms: u64) -> Result<()> {
        let mut elapsed_ms = 0u64;
        for (i, link) in self.links.iter().enumerate() {
            let info = stream_info_for(link)?;
            let link_duration_ms = info.duration_ms.unwrap_or(0);
            if target_ms < elapsed_ms + link_duration_ms || i + 1 == self.links.len() {
                let local_target_ms = target_ms.saturating_sub(elapsed_ms);
                self.links[i].demuxer.seek_to(local_target_ms)?;
                self.current = i;
                self.samples_before_current = self
                    .links
                    .iter()
                    .take(i)
                    .filter_map(|l| stream_info_for(l).ok().and_then(|s| s.duration_samples))
                    .sum();
                return Ok(());
            }
            elapsed_ms += link_duration_ms;
        }
        Err(PlaybackError::SeekOutOfBounds(std::time::Duration::from_millis(target_ms)))
    }

    fn duration_ms(&self) -> u64 {
        match self.total_duration_samples() {
            Some(samples) if self.stream_info.sample_rate > 0 => samples * 1000 / self.stream_info.sample_rate as u64,
            _ => 0,
        }
    }

    fn position_ms(&self) -> u64 {
        if self.current >= self.links.len() {
            return self.duration_ms();
        }
        let local_ms = self.links[self.current].demuxer.position_ms();
        let before_ms = if self.stream_info.sample_rate > 0 {
            self.samples_before_current * 1000 / self.stream_info.sample_rate as u64
        } else {
            0
        };
        before_ms + local_ms
    }

    fn is_eof(&self) -> bool {
        self.current >= self.links.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubDemuxer {
        streams: Vec<StreamInfo>,
        chunks: Vec<MediaChunk>,
        pos: usize,
    }

    impl Demuxer for StubDemuxer {
        fn parse_container(&mut self) -> Result<()> {
            Ok(())
        }
        fn streams(&self) -> &[StreamInfo] {
            &self.streams
        }
        fn read_chunk_any(&mut self) -> Result<Option<MediaChunk>> {
            self.read_chunk(0)
        }
        fn read_chunk(&mut self, _stream_id: u32) -> Result<Option<MediaChunk>> {
            if self.pos >= self.chunks.len() {
                return Ok(None);
            }
            let chunk = self.chunks[self.pos].clone();
            self.pos += 1;
            Ok(Some(chunk))
        }
        fn seek_to(&mut self, _target_ms: u64) -> Result<()> {
            self.pos = 0;
            Ok(())
        }
        fn duration_ms(&self) -> u64 {
            1000
        }
        fn position_ms(&self) -> u64 {
            0
        }
        fn is_eof(&self) -> bool {
            self.pos >= self.chunks.len()
        }
    }

    fn stub_stream_info(sample_rate: u32, channels: u16, duration_samples: u64) -> StreamInfo {
        StreamInfo {
            stream_id: 0,
            codec_name: "pcm".into(),
            container: "raw".into(),
            sample_rate,
            channels,
            bits_per_sample: 16,
            nominal_bitrate: None,
            duration_samples: Some(duration_samples),
            duration_ms: Some(duration_samples * 1000 / sample_rate as u64),
            codec_private: Vec::new(),
        }
    }

    fn stub_chunk(end_of_stream: bool) -> MediaChunk {
        MediaChunk { stream_id: 0, data: vec![0, 1, 2, 3], timestamp: Timestamp::Samples(0), end_of_stream }
    }

    #[test]
    fn rejects_mismatched_sample_rates() {
        let a = StubDemuxer { streams: vec![stub_stream_info(44_100, 2, 100)], chunks: vec![], pos: 0 };
        let b = StubDemuxer { streams: vec![stub_stream_info(48_000, 2, 100)], chunks: vec![], pos: 0 };
        let links = vec![ChainLink { demuxer: Box::new(a), stream_id: 0 }, ChainLink { demuxer: Box::new(b), stream_id: 0 }];
        assert!(ChainedStream::new(links).is_err());
    }

    #[test]
    fn reads_through_both_links_in_order() {
        let a = StubDemuxer {
            streams: vec![stub_stream_info(8_000, 1, 8)],
            chunks: vec![stub_chunk(false), stub_chunk(true)],
            pos: 0,
        };
        let b = StubDemuxer {
            streams: vec![stub_stream_info(8_000, 1, 8)],
            chunks: vec![stub_chunk(true)],
            pos: 0,
        };
        let mut chained = ChainedStream::new(vec![
            ChainLink { demuxer: Box::new(a), stream_id: 0 },
            ChainLink { demuxer: Box::new(b), stream_id: 0 },
        ])
        .unwrap();

        let c1 = chained.read_chunk_any().unwrap().unwrap();
        assert!(!c1.end_of_stream);
        let c2 = chained.read_chunk_any().unwrap().unwrap();
        // Link 0's own EOS flag is suppressed since it isn't the last link.
        assert!(!c2.end_of_stream);
        let c3 = chained.read_chunk_any().unwrap().unwrap();
        assert!(c3.end_of_stream);
        assert!(chained.read_chunk_any().unwrap().is_none());
        assert!(chained.is_eof());
    }

    #[test]
    fn aggregate_duration_sums_links() {
        let a = StubDemuxer { streams: vec![stub_stream_info(8_000, 1, 8_000)], chunks: vec![], pos: 0 };
        let b = StubDemuxer { streams: vec![stub_stream_info(8_000, 1, 16_000)], chunks: vec![], pos: 0 };
        let chained = ChainedStream::new(vec![
            ChainLink { demuxer: Box::new(a), stream_id: 0 },
            ChainLink { demuxer: Box::new(b), stream_id: 0 },
        ])
        .unwrap();
        assert_eq!(chained.duration_ms(), 3_000);
    }
}
