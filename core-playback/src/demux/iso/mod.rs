//! ISO base media file format (MP4) container: box walker, `moov`/`trak`
//! sample-table extraction, and fragmented (`moof`/`traf`) overlay.

pub mod fragment;
pub mod sample_table;

use crate::error::{PlaybackError, Result};
use crate::io::{IoSource, Whence};

use self::fragment::TrackFragment;
use self::sample_table::{Sample, SampleTable};

use super::{Demuxer, MediaChunk, StreamInfo, Timestamp};

/// Recursive box nesting is bounded to guard against a crafted file with
/// self-referential or absurdly deep container boxes.
const MAX_BOX_DEPTH: u32 = 64;

struct BoxHeader {
    box_type: [u8; 4],
    /// Offset of the box's payload (just past the header).
    payload_offset: u64,
    /// Offset just past the end of the whole box (header + payload).
    end_offset: u64,
}

fn read_box_header(io: &mut dyn IoSource) -> Result<Option<BoxHeader>> {
    let start = io.tell()?;
    let mut head = [0u8; 8];
    let n = io.read(&mut head)?;
    if n == 0 {
        return Ok(None);
    }
    if n < 8 {
        return Err(PlaybackError::Truncated("ISO box header".into()));
    }
    let mut size = u32::from_be_bytes(head[0..4].try_into().unwrap()) as u64;
    let box_type: [u8; 4] = head[4..8].try_into().unwrap();
    let mut payload_offset = start + 8;

    if size == 1 {
        let mut large = [0u8; 8];
        io.read_exact(&mut large)?;
        size = u64::from_be_bytes(large);
        payload_offset += 8;
    } else if size == 0 {
        // Box extends to end of file/stream.
        size = match io.size() {
            crate::io::SourceSize::Known(total) => total.saturating_sub(start),
            crate::io::SourceSize::Unknown => return Err(PlaybackError::Unsupported("box extends to unknown EOF".into())),
        };
    }

    if size < 8 {
        return Err(PlaybackError::Format("ISO box smaller than its own header".into()));
    }

    Ok(Some(BoxHeader {
        box_type,
        payload_offset,
        end_offset: start + size,
    }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FourCodec {
    Flac,
    Pcm,
    Unknown,
}

struct TrackInfo {
    track_id: u32,
    codec: FourCodec,
    sample_rate: u32,
    channels: u16,
    bits_per_sample: u16,
    codec_private: Vec<u8>,
    table: SampleTable,
    timescale: u32,
}

pub struct IsoDemuxer {
    io: Box<dyn IoSource>,
    streams: Vec<StreamInfo>,
    tracks: Vec<TrackInfo>,
    mdat_offset: u64,
    cursor: Vec<usize>, // per-track next-sample index, parallel to `tracks`
    eof: bool,
    fragments: Vec<TrackFragment>,
}

impl IsoDemuxer {
    pub fn new(io: Box<dyn IoSource>) -> Self {
        Self {
            io,
            streams: Vec::new(),
            tracks: Vec::new(),
            mdat_offset: 0,
            cursor: Vec::new(),
            eof: false,
            fragments: Vec::new(),
        }
    }

    fn walk_top_level(&mut self) -> Result<Vec<TrackInfo>> {
        let mut tracks = Vec::new();
        loop {
            let header = match read_box_header(self.io.as_mut())? {
                None => break,
                Some(h) => h,
            };
            match &header.box_type {
                b"moov" => {
                    tracks = self.parse_moov(header.payload_offset, header.end_offset, 1)?;
                }
                b"mdat" => {
                    if self.mdat_offset == 0 {
                        self.mdat_offset = header.payload_offset;
                    }
                }
                b"moof" => {
                    let frags = fragment::parse_moof(self.io.as_mut(), header.payload_offset, header.end_offset, 1)?;
                    self.fragments.extend(frags);
                }
                _ => {}
            }
            self.io.seek(header.end_offset as i64, Whence::Start)?;
        }
        Ok(tracks)
    }

    fn parse_moov(&mut self, start: u64, end: u64, depth: u32) -> Result<Vec<TrackInfo>> {
        if depth > MAX_BOX_DEPTH {
            return Err(PlaybackError::Format("ISO box nesting too deep".into()));
        }
        self.io.seek(start as i64, Whence::Start)?;
        let mut tracks = Vec::new();
        while self.io.tell()? < end {
            let header = match read_box_header(self.io.as_mut())? {
                None => break,
                Some(h) => h,
            };
            if &header.box_type == b"trak" {
                if let Some(track) = self.parse_trak(header.payload_offset, header.end_offset, depth + 1)? {
                    tracks.push(track);
                }
            }
            self.io.seek(header.end_offset as i64, Whence::Start)?;
        }
        Ok(tracks)
    }

    fn parse_trak(&mut self, start: u64, end: u64, depth: u32) -> Result<Option<TrackInfo>> {
        if depth > MAX_BOX_DEPTH {
            return Err(PlaybackError::Format("ISO box nesting too deep".into()));
        }
        self.io.seek(start as i64, Whence::Start)?;
        let mut track_id = 0u32;
        let mut timescale = 0u32;
        let mut codec = FourCodec::Unknown;
        let mut sample_rate = 0u32;
        let mut channels = 0u16;
        let mut bits_per_sample = 16u16;
        let mut codec_private = Vec::new();
        let mut table = SampleTable::default();

        while self.io.tell()? < end {
            let header = match read_box_header(self.io.as_mut())? {
                None => break,
                Some(h) => h,
            };
            match &header.box_type {
                b"tkhd" => {
                    let mut body = vec![0u8; (header.end_offset - header.payload_offset) as usize];
                    self.io.seek(header.payload_offset as i64, Whence::Start)?;
                    self.io.read_exact(&mut body)?;
                    let version = body.first().copied().unwrap_or(0);
                    let id_offset = if version == 1 { 20 } else { 12 };
                    if body.len() >= id_offset + 4 {
                        track_id = u32::from_be_bytes(body[id_offset..id_offset + 4].try_into().unwrap());
                    }
                }
                b"mdia" => {
                    self.parse_mdia(
                        header.payload_offset,
                        header.end_offset,
                        depth + 1,
                        &mut timescale,
                        &mut codec,
                        &mut sample_rate,
                        &mut channels,
                        &mut bits_per_sample,
                        &mut codec_private,
                        &mut table,
                    )?;
                }
                _ => {}
            }
            self.io.seek(header.end_offset as i64, Whence::Start)?;
        }

        if codec == FourCodec::Unknown {
            return Ok(None);
        }

        Ok(Some(TrackInfo {
            track_id,
            codec,
            sample_rate,
            channels,
            bits_per_sample,
            codec_private,
            table,
            timescale: timescale.max(1),
        }))
    }

    #[allow(clippy::too_many_arguments)]
    fn parse_mdia(
        &mut self,
        start: u64,
        end: u64,
        depth: u32,
        timescale: &mut u32,
        codec: &mut FourCodec,
        sample_rate: &mut u32,
        channels: &mut u16,
        bits_per_sample: &mut u16,
        codec_private: &mut Vec<u8>,
        table: &mut SampleTable,
    ) -> Result<()> {
        if depth > MAX_BOX_DEPTH {
            return Err(PlaybackError::Format("ISO box nesting too deep".into()));
        }
        self.io.seek(start as i64, Whence::Start)?;
        while self.io.tell()? < end {
            let header = match read_box_header(self.io.as_mut())? {
                None => break,
                Some(h) => h,
            };
            match &header.box_type {
                b"mdhd" => {
                    let mut body = vec![0u8; (header.end_offset - header.payload_offset) as usize];
                    self.io.seek(header.payload_offset as i64, Whence::Start)?;
                    self.io.read_exact(&mut body)?;
                    let version = body.first().copied().unwrap_or(0);
                    let ts_offset = if version == 1 { 20 } else { 12 };
                    if body.len() >= ts_offset + 4 {
                        *timescale = u32::from_be_bytes(body[ts_offset..ts_offset + 4].try_into().unwrap());
                    }
                }
                b"minf" => {
                    self.parse_minf(header.payload_offset, header.end_offset, depth + 1, codec, sample_rate, channels, bits_per_sample, codec_private, table)?;
                }
                _ => {}
            }
            self.io.seek(header.end_offset as i64, Whence::Start)?;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn parse_minf(
        &mut self,
        start: u64,
        end: u64,
        depth: u32,
        codec: &mut FourCodec,
        sample_rate: &mut u32,
        channels: &mut u16,
        bits_per_sample: &mut u16,
        codec_private: &mut Vec<u8>,
        table: &mut SampleTable,
    ) -> Result<()> {
        if depth > MAX_BOX_DEPTH {
            return Err(PlaybackError::Format("ISO box nesting too deep".into()));
        }
        self.io.seek(start as i64, Whence::Start)?;
        while self.io.tell()? < end {
            let header = match read_box_header(self.io.as_mut())? {
                None => break,
                Some(h) => h,
            };
            if &header.box_type == b"stbl" {
                self.parse_stbl(header.payload_offset, header.end_offset, depth + 1, codec, sample_rate, channels, bits_per_sample, codec_private, table)?;
            }
            self.io.seek(header.end_offset as i64, Whence::Start)?;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn parse_stbl(
        &mut self,
        start: u64,
        end: u64,
        depth: u32,
        codec: &mut FourCodec,
        sample_rate: &mut u32,
        channels: &mut u16,
        bits_per_sample: &mut u16,
        codec_private: &mut Vec<u8>,
        table: &mut SampleTable,
    ) -> Result<()> {
        if depth > MAX_BOX_DEPTH {
            return Err(PlaybackError::Format("ISO box nesting too deep".into()));
        }
        self.io.seek(start as i64, Whence::Start)?;
        while self.io.tell()? < end {
            let header = match read_box_header(self.io.as_mut())? {
                None => break,
                Some(h) => h,
            };
            let body_len = (header.end_offset - header.payload_offset) as usize;
            match &header.box_type {
                b"stsd" => {
                    let mut body = vec![0u8; body_len];
                    self.io.seek(header.payload_offset as i64, Whence::Start)?;
                    self.io.read_exact(&mut body)?;
                    self.parse_stsd(&body, codec, sample_rate, channels, bits_per_sample, codec_private);
                }
                b"stsz" => {
                    let mut body = vec![0u8; body_len];
                    self.io.seek(header.payload_offset as i64, Whence::Start)?;
                    self.io.read_exact(&mut body)?;
                    table.load_stsz(&body)?;
                }
                b"stsc" => {
                    let mut body = vec![0u8; body_len];
                    self.io.seek(header.payload_offset as i64, Whence::Start)?;
                    self.io.read_exact(&mut body)?;
                    table.load_stsc(&body)?;
                }
                b"stco" => {
                    let mut body = vec![0u8; body_len];
                    self.io.seek(header.payload_offset as i64, Whence::Start)?;
                    self.io.read_exact(&mut body)?;
                    table.load_stco(&body)?;
                }
                b"co64" => {
                    let mut body = vec![0u8; body_len];
                    self.io.seek(header.payload_offset as i64, Whence::Start)?;
                    self.io.read_exact(&mut body)?;
                    table.load_co64(&body)?;
                }
                b"stts" => {
                    let mut body = vec![0u8; body_len];
                    self.io.seek(header.payload_offset as i64, Whence::Start)?;
                    self.io.read_exact(&mut body)?;
                    table.load_stts(&body)?;
                }
                b"stss" => {
                    let mut body = vec![0u8; body_len];
                    self.io.seek(header.payload_offset as i64, Whence::Start)?;
                    self.io.read_exact(&mut body)?;
                    table.load_stss(&body)?;
                }
                _ => {}
            }
            self.io.seek(header.end_offset as i64, Whence::Start)?;
        }
        table.finish()?;
        Ok(())
    }

    fn parse_stsd(
        &mut self,
        body: &[u8],
        codec: &mut FourCodec,
        sample_rate: &mut u32,
        channels: &mut u16,
        bits_per_sample: &mut u16,
        codec_private: &mut Vec<u8>,
    ) {
        // version/flags(4) + entry_count(4) + first sample entry
        if body.len() < 8 {
            return;
        }
        let entry_start = 8;
        if body.len() < entry_start + 8 {
            return;
        }
        let fourcc: [u8; 4] = body[entry_start + 4..entry_start + 8].try_into().unwrap();
        *codec = match &fourcc {
            b"fLaC" => FourCodec::Flac,
            b"lpcm" | b"twos" | b"sowt" | b"in24" | b"in32" | b"fl32" | b"fl64" => FourCodec::Pcm,
            _ => FourCodec::Unknown,
        };
        // AudioSampleEntry layout: 6 reserved + data_reference_index(2) +
        // 8 reserved + channel_count(2) + sample_size(2) + 4 reserved +
        // sample_rate (16.16 fixed point, 4 bytes).
        let audio_entry_start = entry_start + 8;
        if body.len() >= audio_entry_start + 28 {
            let e = &body[audio_entry_start..];
            *channels = u16::from_be_bytes(e[8..10].try_into().unwrap());
            *bits_per_sample = u16::from_be_bytes(e[10..12].try_into().unwrap());
            let rate_fixed = u32::from_be_bytes(e[16..20].try_into().unwrap());
            *sample_rate = rate_fixed >> 16;

            // Any trailing boxes inside the sample entry (e.g. an `dfLa`
            // box carrying the FLAC STREAMINFO) are retained verbatim for
            // the codec to parse.
            if e.len() > 20 {
                codec_private.extend_from_slice(&e[20..]);
            }
        }
    }
}

impl Demuxer for IsoDemuxer {
    fn parse_container(&mut self) -> Result<()> {
        let start_pos = self.io.tell()?;
        let mut tracks = self.walk_top_level()?;
        if tracks.is_empty() {
            return Err(PlaybackError::Format("no audio track found".into()));
        }
        for fragment in self.fragments.drain(..) {
            if let Some(track) = tracks.iter_mut().find(|t| t.track_id == fragment.track_id) {
                track.table.append_samples(fragment.samples);
            }
        }
        self.cursor = vec![0; tracks.len()];

        for track in &tracks {
            let duration_samples = track.table.total_samples();
            let duration_ms = if track.timescale > 0 {
                Some(duration_samples.saturating_mul(1000) / track.timescale as u64)
            } else {
                None
            };
            self.streams.push(StreamInfo {
                stream_id: track.track_id,
                codec_name: match track.codec {
                    FourCodec::Flac => "flac".to_string(),
                    FourCodec::Pcm => "pcm".to_string(),
                    FourCodec::Unknown => "unknown".to_string(),
                },
                container: "iso-mp4".to_string(),
                sample_rate: track.sample_rate,
                channels: track.channels,
                bits_per_sample: track.bits_per_sample,
                nominal_bitrate: None,
                duration_samples: Some(duration_samples),
                duration_ms,
                codec_private: track.codec_private.clone(),
            });
        }
        self.tracks = tracks;
        self.io.seek(start_pos as i64, Whence::Start)?;
        Ok(())
    }

    fn streams(&self) -> &[StreamInfo] {
        &self.streams
    }

    fn read_chunk_any(&mut self) -> Result<Option<MediaChunk>> {
        for i in 0..self.tracks.len() {
            let track_id = self.tracks[i].track_id;
            if let Some(chunk) = self.read_chunk(track_id)? {
                return Ok(Some(chunk));
            }
        }
        self.eof = true;
        Ok(None)
    }

    fn read_chunk(&mut self, stream_id: u32) -> Result<Option<MediaChunk>> {
        let idx = match self.tracks.iter().position(|t| t.track_id == stream_id) {
            Some(i) => i,
            None => return Ok(None),
        };
        let cursor = self.cursor[idx];
        let sample: Option<Sample> = self.tracks[idx].table.sample_at(cursor);
        let sample = match sample {
            Some(s) => s,
            None => return Ok(None),
        };

        self.io.seek(sample.offset as i64, Whence::Start)?;
        let mut data = vec![0u8; sample.size as usize];
        self.io.read_exact(&mut data)?;

        self.cursor[idx] += 1;
        let is_last = self.cursor[idx] >= self.tracks[idx].table.total_sample_count();

        Ok(Some(MediaChunk {
            stream_id,
            data,
            timestamp: Timestamp::Samples(sample.decode_time),
            end_of_stream: is_last,
        }))
    }

    fn seek_to(&mut self, target_ms: u64) -> Result<()> {
        for (idx, track) in self.tracks.iter().enumerate() {
            let target_time = target_ms.saturating_mul(track.timescale as u64) / 1000;
            self.cursor[idx] = track.table.sample_index_for_time(target_time);
        }
        self.eof = false;
        Ok(())
    }

    fn duration_ms(&self) -> u64 {
        self.streams.iter().filter_map(|s| s.duration_ms).max().unwrap_or(0)
    }

    fn position_ms(&self) -> u64 {
        let Some(idx) = self.tracks.iter().position(|_| true) else { return 0 };
        let track = &self.tracks[idx];
        let cursor = self.cursor.get(idx).copied().unwrap_or(0);
        match track.table.sample_at(cursor.saturating_sub(1)) {
            Some(s) => s.decode_time.saturating_mul(1000) / track.timescale.max(1) as u64,
            None => 0,
        }
    }

    fn is_eof(&self) -> bool {
        self.eof
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::file::FileSource;

    fn boxed(box_type: &[u8; 4], body: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&((8 + body.len()) as u32).to_be_bytes());
        out.extend_from_slice(box_type);
        out.extend_from_slice(body);
        out
    }

    fn build_minimal_pcm_mp4(sample_rate: u32, channels: u16, bits: u16, samples: &[u8]) -> Vec<u8> {
        let ftyp = boxed(b"ftyp", b"isomisom\0\0\x02\0");

        let mut tkhd = vec![0u8; 4]; // version/flags
        tkhd.extend_from_slice(&0u32.to_be_bytes()); // ctime
        tkhd.extend_from_slice(&0u32.to_be_bytes()); // mtime
        tkhd.extend_from_slice(&1u32.to_be_bytes()); // track_id
        let tkhd_box = boxed(b"tkhd", &tkhd);

        let mut mdhd = vec![0u8; 4];
        mdhd.extend_from_slice(&0u32.to_be_bytes());
        mdhd.extend_from_slice(&0u32.to_be_bytes());
        mdhd.extend_from_slice(&sample_rate.to_be_bytes()); // timescale = sample_rate
        let mdhd_box = boxed(b"mdhd", &mdhd);

        let mut sample_entry = Vec::new();
        sample_entry.extend_from_slice(&[0u8; 6]); // reserved
        sample_entry.extend_from_slice(&1u16.to_be_bytes()); // data_reference_index
        sample_entry.extend_from_slice(&[0u8; 8]); // reserved
        sample_entry.extend_from_slice(&channels.to_be_bytes());
        sample_entry.extend_from_slice(&bits.to_be_bytes());
        sample_entry.extend_from_slice(&[0u8; 4]); // reserved
        sample_entry.extend_from_slice(&((sample_rate) << 16).to_be_bytes());

        let mut stsd_entry = Vec::new();
        stsd_entry.extend_from_slice(&((8 + sample_entry.len()) as u32).to_be_bytes());
        stsd_entry.extend_from_slice(b"lpcm");
        stsd_entry.extend_from_slice(&sample_entry);

        let mut stsd = Vec::new();
        stsd.extend_from_slice(&0u32.to_be_bytes()); // version/flags
        stsd.extend_from_slice(&1u32.to_be_bytes()); // entry_count
        stsd.extend_from_slice(&stsd_entry);
        let stsd_box = boxed(b"stsd", &stsd);

        let sample_count = 4u32;
        let sample_size = samples.len() as u32 / sample_count;
        let mut stsz = Vec::new();
        stsz.extend_from_slice(&0u32.to_be_bytes());
        stsz.extend_from_slice(&sample_size.to_be_bytes());
        stsz.extend_from_slice(&sample_count.to_be_bytes());
        let stsz_box = boxed(b"stsz", &stsz);

        let mut stsc = Vec::new();
        stsc.extend_from_slice(&0u32.to_be_bytes());
        stsc.extend_from_slice(&1u32.to_be_bytes());
        stsc.extend_from_slice(&1u32.to_be_bytes());
        stsc.extend_from_slice(&sample_count.to_be_bytes());
        stsc.extend_from_slice(&0u32.to_be_bytes());
        let stsc_box = boxed(b"stsc", &stsc);

        // mdat offset is patched in after assembling everything before it.
        let mut stco = Vec::new();
        stco.extend_from_slice(&0u32.to_be_bytes());
        stco.extend_from_slice(&1u32.to_be_bytes());
        stco.extend_from_slice(&0u32.to_be_bytes()); // placeholder, patched below
        let stco_box = boxed(b"stco", &stco);

        let mut stts = Vec::new();
        stts.extend_from_slice(&0u32.to_be_bytes());
        stts.extend_from_slice(&1u32.to_be_bytes());
        stts.extend_from_slice(&sample_count.to_be_bytes());
        stts.extend_from_slice(&(sample_size / (bits as u32 / 8).max(1) / channels.max(1) as u32).to_be_bytes());
        let stts_box = boxed(b"stts", &stts);

        let mut stbl_body = Vec::new();
        stbl_body.extend_from_slice(&stsd_box);
        stbl_body.extend_from_slice(&stts_box);
        stbl_body.extend_from_slice(&stsc_box);
        stbl_body.extend_from_slice(&stsz_box);
        stbl_body.extend_from_slice(&stco_box);
        let stbl_box = boxed(b"stbl", &stbl_body);

        let minf_box = boxed(b"minf", &stbl_box);
        let mut mdia_body = Vec::new();
        mdia_body.extend_from_slice(&mdhd_box);
        mdia_body.extend_from_slice(&minf_box);
        let mdia_box = boxed(b"mdia", &mdia_body);

        let mut trak_body = Vec::new();
        trak_body.extend_from_slice(&tkhd_box);
        trak_body.extend_from_slice(&mdia_box);
        let trak_box = boxed(b"trak", &trak_body);

        let moov_box = boxed(b"moov", &trak_box);

        let mut file = Vec::new();
        file.extend_from_slice(&ftyp);
        file.extend_from_slice(&moov_box);
        let mdat_offset = (file.len() + 8) as u32;
        file.extend_from_slice(&boxed(b"mdat", samples));

        // Patch the stco offset now that we know where mdat's payload starts.
        let stco_marker = b"stco";
        let pos = file.windows(4).position(|w| w == stco_marker).unwrap();
        let offset_field = pos + 4 + 4 + 4; // past fourcc + version/flags + entry_count
        file[offset_field..offset_field + 4].copy_from_slice(&mdat_offset.to_be_bytes());

        file
    }

    fn write_temp(data: &[u8], name: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(name);
        std::fs::write(&path, data).unwrap();
        path
    }

    #[test]
    fn parses_single_pcm_track() {
        let samples = vec![0u8; 4 * 4 * 2]; // 4 samples * 4 bytes/sample(stereo16) ... simplified
        let mp4 = build_minimal_pcm_mp4(8000, 2, 16, &samples);
        let path = write_temp(&mp4, "iso-test-1.mp4");
        let mut demux = IsoDemuxer::new(Box::new(FileSource::open(&path).unwrap()));
        demux.parse_container().unwrap();
        assert_eq!(demux.streams().len(), 1);
        assert_eq!(demux.streams()[0].sample_rate, 8000);
        assert_eq!(demux.streams()[0].channels, 2);
        assert_eq!(demux.streams()[0].codec_name, "pcm");
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn reads_samples_from_mdat() {
        let samples: Vec<u8> = (0..32u8).collect();
        let mp4 = build_minimal_pcm_mp4(8000, 2, 16, &samples);
        let path = write_temp(&mp4, "iso-test-2.mp4");
        let mut demux = IsoDemuxer::new(Box::new(FileSource::open(&path).unwrap()));
        demux.parse_container().unwrap();
        let chunk = demux.read_chunk_any().unwrap().unwrap();
        assert_eq!(chunk.data.len(), 8);
        std::fs::remove_file(path).ok();
    }

    /// A `moov` carrying only an `fLaC` sample entry (no `stsz`/`stsc`/`stco`)
    /// plus one `moof`/`traf`/`trun` fragment overlaying the actual samples,
    /// mirroring how a fragmented FLAC-in-MP4 file places all sample data
    /// after the initial track header.
    fn build_fragmented_flac_mp4(sample_rate: u32, channels: u16, frame1: &[u8], frame2: &[u8]) -> Vec<u8> {
        let ftyp = boxed(b"ftyp", b"isomiso2\0\0\x02\0");

        let mut tkhd = vec![0u8; 4];
        tkhd.extend_from_slice(&0u32.to_be_bytes());
        tkhd.extend_from_slice(&0u32.to_be_bytes());
        tkhd.extend_from_slice(&1u32.to_be_bytes()); // track_id
        let tkhd_box = boxed(b"tkhd", &tkhd);

        let mut mdhd = vec![0u8; 4];
        mdhd.extend_from_slice(&0u32.to_be_bytes());
        mdhd.extend_from_slice(&0u32.to_be_bytes());
        mdhd.extend_from_slice(&sample_rate.to_be_bytes()); // timescale = sample_rate
        let mdhd_box = boxed(b"mdhd", &mdhd);

        let mut sample_entry = Vec::new();
        sample_entry.extend_from_slice(&[0u8; 6]);
        sample_entry.extend_from_slice(&1u16.to_be_bytes());
        sample_entry.extend_from_slice(&[0u8; 8]);
        sample_entry.extend_from_slice(&channels.to_be_bytes());
        sample_entry.extend_from_slice(&16u16.to_be_bytes());
        sample_entry.extend_from_slice(&[0u8; 4]);
        sample_entry.extend_from_slice(&(sample_rate << 16).to_be_bytes());

        let mut stsd_entry = Vec::new();
        stsd_entry.extend_from_slice(&((8 + sample_entry.len()) as u32).to_be_bytes());
        stsd_entry.extend_from_slice(b"fLaC");
        stsd_entry.extend_from_slice(&sample_entry);

        let mut stsd = Vec::new();
        stsd.extend_from_slice(&0u32.to_be_bytes());
        stsd.extend_from_slice(&1u32.to_be_bytes());
        stsd.extend_from_slice(&stsd_entry);
        let stsd_box = boxed(b"stsd", &stsd);

        let stbl_box = boxed(b"stbl", &stsd_box);
        let minf_box = boxed(b"minf", &stbl_box);
        let mut mdia_body = Vec::new();
        mdia_body.extend_from_slice(&mdhd_box);
        mdia_body.extend_from_slice(&minf_box);
        let mdia_box = boxed(b"mdia", &mdia_body);

        let mut trak_body = Vec::new();
        trak_body.extend_from_slice(&tkhd_box);
        trak_body.extend_from_slice(&mdia_box);
        let trak_box = boxed(b"trak", &trak_body);

        let moov_box = boxed(b"moov", &trak_box);

        // tfhd carries no flags, so base_data_offset defaults to the moof's
        // own start per this demuxer's default-base-is-moof handling.
        let mut tfhd = Vec::new();
        tfhd.extend_from_slice(&0u32.to_be_bytes());
        tfhd.extend_from_slice(&1u32.to_be_bytes()); // track_id
        let tfhd_box = boxed(b"tfhd", &tfhd);

        let mut tfdt = Vec::new();
        tfdt.extend_from_slice(&0u32.to_be_bytes());
        tfdt.extend_from_slice(&0u32.to_be_bytes()); // base decode time
        let tfdt_box = boxed(b"tfdt", &tfdt);

        let mut trun = Vec::new();
        trun.extend_from_slice(&0x00_0301u32.to_be_bytes()); // data-offset + size + duration present
        trun.extend_from_slice(&2u32.to_be_bytes()); // sample_count
        trun.extend_from_slice(&0u32.to_be_bytes()); // data_offset, patched below
        trun.extend_from_slice(&4096u32.to_be_bytes()); // duration, sample 1
        trun.extend_from_slice(&(frame1.len() as u32).to_be_bytes());
        trun.extend_from_slice(&4096u32.to_be_bytes()); // duration, sample 2
        trun.extend_from_slice(&(frame2.len() as u32).to_be_bytes());
        let trun_box = boxed(b"trun", &trun);

        let mut traf_body = Vec::new();
        traf_body.extend_from_slice(&tfhd_box);
        traf_body.extend_from_slice(&tfdt_box);
        traf_body.extend_from_slice(&trun_box);
        let traf_box = boxed(b"traf", &traf_body);

        let mut moof_box = boxed(b"moof", &traf_box);

        // data_offset is relative to the moof box's own start; the mdat
        // payload begins right after this moof box plus mdat's own 8-byte
        // header.
        let data_offset_value = moof_box.len() as u32 + 8;
        let data_offset_field = 32 + tfhd_box.len() + tfdt_box.len();
        moof_box[data_offset_field..data_offset_field + 4].copy_from_slice(&data_offset_value.to_be_bytes());

        let mut mdat_payload = Vec::new();
        mdat_payload.extend_from_slice(frame1);
        mdat_payload.extend_from_slice(frame2);
        let mdat_box = boxed(b"mdat", &mdat_payload);

        let mut file = Vec::new();
        file.extend_from_slice(&ftyp);
        file.extend_from_slice(&moov_box);
        file.extend_from_slice(&moof_box);
        file.extend_from_slice(&mdat_box);
        file
    }

    #[test]
    fn fragmented_flac_track_reports_stream_info_and_yields_synced_frames() {
        let frame1 = [0xFFu8, 0xF8, 0x01, 0x02];
        let frame2 = [0xFFu8, 0xF9, 0x03, 0x04];
        let mp4 = build_fragmented_flac_mp4(192_000, 2, &frame1, &frame2);
        let path = write_temp(&mp4, "iso-test-fragmented-flac.mp4");
        let mut demux = IsoDemuxer::new(Box::new(FileSource::open(&path).unwrap()));
        demux.parse_container().unwrap();

        assert_eq!(demux.streams().len(), 1);
        assert_eq!(demux.streams()[0].codec_name, "flac");
        assert_eq!(demux.streams()[0].sample_rate, 192_000);
        assert_eq!(demux.streams()[0].channels, 2);

        let mut chunks = Vec::new();
        while let Some(chunk) = demux.read_chunk_any().unwrap() {
            chunks.push(chunk);
        }
        assert_eq!(chunks.len(), 2);
        for chunk in &chunks {
            assert!(!chunk.data.is_empty());
            assert_eq!(chunk.data[0], 0xFF);
            assert!(chunk.data[1] == 0xF8 || chunk.data[1] == 0xF9);
        }
        std::fs::remove_file(path).ok();
    }
}
