//! Ogg container demuxer (RFC 3533): page framing, logical-stream
//! multiplexing, granule-position accounting, bisection seek.

use std::collections::{HashMap, VecDeque};

use crate::crc::ogg_crc32;
use crate::io::{IoSource, Whence};

use super::{Demuxer, MediaChunk, StreamInfo, Timestamp};

const CAPTURE_PATTERN: [u8; 4] = *b"OggS";
const MAX_SEEK_ITERATIONS: u32 = 64;

#[derive(Debug, Clone)]
struct PageHeader {
    continued: bool,
    bos: bool,
    eos: bool,
    granule: i64,
    serial: u32,
    sequence: u32,
}

struct RawPage {
    header: PageHeader,
    /// Offset of the page's first byte (the capture pattern) in the source.
    offset: u64,
    /// Offset just past the end of this page.
    end_offset: u64,
    segment_table: Vec<u8>,
    payload: Vec<u8>,
}

/// Reads one Ogg page starting at the source's current position. Returns
/// `None` at a clean EOF (no bytes at all); a partial page is a format
/// error, not an EOF, since Ogg files never truncate mid-page by design.
fn read_page(io: &mut dyn IoSource) -> crate::error::Result<Option<RawPage>> {
    let offset = io.tell()?;
    let mut magic = [0u8; 4];
    let n = io.read(&mut magic)?;
    if n == 0 {
        return Ok(None);
    }
    if n < 4 {
        return Err(crate::error::PlaybackError::Truncated("Ogg page capture pattern".into()));
    }
    if magic != CAPTURE_PATTERN {
        return Err(crate::error::PlaybackError::Format("missing OggS capture pattern".into()));
    }

    let mut rest = [0u8; 23]; // version..page_segments inclusive, minus the 4-byte magic already read
    io.read_exact(&mut rest)?;
    let version = rest[0];
    if version != 0 {
        return Err(crate::error::PlaybackError::Unsupported(format!("Ogg version {version}")));
    }
    let header_type = rest[1];
    let granule = i64::from_le_bytes(rest[2..10].try_into().unwrap());
    let serial = u32::from_le_bytes(rest[10..14].try_into().unwrap());
    let sequence = u32::from_le_bytes(rest[14..18].try_into().unwrap());
    let stored_crc = u32::from_le_bytes(rest[18..22].try_into().unwrap());
    let page_segments = rest[22] as usize;

    let mut segment_table = vec![0u8; page_segments];
    io.read_exact(&mut segment_table)?;
    let payload_len: usize = segment_table.iter().map(|&b| b as usize).sum();
    let mut payload = vec![0u8; payload_len];
    io.read_exact(&mut payload)?;

    // Recompute CRC over the whole page with the CRC field zeroed.
    let mut crc_input = Vec::with_capacity(27 + segment_table.len() + payload.len());
    crc_input.extend_from_slice(&CAPTURE_PATTERN);
    crc_input.push(version);
    crc_input.push(header_type);
    crc_input.extend_from_slice(&granule.to_le_bytes());
    crc_input.extend_from_slice(&serial.to_le_bytes());
    crc_input.extend_from_slice(&sequence.to_le_bytes());
    crc_input.extend_from_slice(&[0, 0, 0, 0]);
    crc_input.push(page_segments as u8);
    crc_input.extend_from_slice(&segment_table);
    crc_input.extend_from_slice(&payload);
    let computed_crc = ogg_crc32(&crc_input);

    let end_offset = io.tell()?;

    if computed_crc != stored_crc {
        // Pages failing CRC are skipped with a logged error, not a fatal
        // abort of the whole parse
        tracing::debug!(target: "ogg::crc", stored = stored_crc, computed = computed_crc, "page CRC mismatch, skipping");
        return Ok(Some(RawPage {
            header: PageHeader {
                continued: false,
                bos: false,
                eos: false,
                granule: -1,
                serial,
                sequence,
            },
            offset,
            end_offset,
            segment_table: Vec::new(),
            payload: Vec::new(),
        }));
    }

    Ok(Some(RawPage {
        header: PageHeader {
            continued: header_type & 0x01 != 0,
            bos: header_type & 0x02 != 0,
            eos: header_type & 0x04 != 0,
            granule,
            serial,
            sequence,
        },
        offset,
        end_offset,
        segment_table,
        payload,
    }))
}

/// Splits a page's lacing-value segment table into complete packets, plus
/// an optional incomplete tail (the page ended on a full 255-byte segment,
/// meaning the last packet continues into the next page for this serial).
fn split_packets(segment_table: &[u8], payload: &[u8]) -> (Vec<Vec<u8>>, Option<Vec<u8>>) {
    let mut packets = Vec::new();
    let mut current = Vec::new();
    let mut pos = 0usize;
    let mut open = false;
    for &seg_len in segment_table {
        let seg = &payload[pos..pos + seg_len as usize];
        current.extend_from_slice(seg);
        pos += seg_len as usize;
        if seg_len < 255 {
            packets.push(std::mem::take(&mut current));
            open = false;
        } else {
            open = true;
        }
    }
    if open {
        (packets, Some(current))
    } else {
        (packets, None)
    }
}

/// Granule helpers treating granules as possibly-unknown (`-1`) with
/// overflow-safe arithmetic
pub fn grain_cmp(a: i64, b: i64) -> Option<std::cmp::Ordering> {
    if a < 0 || b < 0 {
        None
    } else {
        Some(a.cmp(&b))
    }
}

pub fn grain_diff(a: i64, b: i64) -> Option<i64> {
    if a < 0 || b < 0 {
        None
    } else {
        Some(a.saturating_sub(b))
    }
}

struct LogicalStream {
    serial: u32,
    codec_name: String,
    sample_rate: u32,
    channels: u16,
    bits_per_sample: u16,
    codec_private: Vec<u8>,
    headers_needed: usize,
    headers_seen: usize,
    pending: Vec<u8>,
    queue: VecDeque<(Vec<u8>, i64)>,
    last_granule: i64,
    saw_eos: bool,
}

fn detect_codec(first_packet: &[u8]) -> Option<(&'static str, usize)> {
    if first_packet.len() >= 7 && &first_packet[0..7] == b"\x01vorbis" {
        Some(("vorbis", 3))
    } else if first_packet.len() >= 8 && &first_packet[0..8] == b"OpusHead" {
        Some(("opus", 2))
    } else if first_packet.len() >= 5 && &first_packet[0..5] == b"\x7FFLAC" {
        Some(("flac", 2)) // signature packet + 1 metadata (STREAMINFO) packet
    } else if first_packet.len() >= 8 && &first_packet[0..8] == b"Speex   " {
        Some(("speex", 2))
    } else {
        None
    }
}

fn parse_rate_channels_from_header(codec: &str, packet: &[u8]) -> (u32, u16) {
    match codec {
        "vorbis" if packet.len() >= 16 => {
            let channels = packet[11];
            let rate = u32::from_le_bytes(packet[12..16].try_into().unwrap());
            (rate, channels as u16)
        }
        "opus" if packet.len() >= 11 => {
            let channels = packet[9];
            // Input sample rate is informational; Opus always decodes at
            // 48 kHz internally, which is what downstream code cares about.
            (48_000, channels as u16)
        }
        _ => (0, 0),
    }
}

pub struct OggDemuxer {
    io: Box<dyn IoSource>,
    streams: Vec<StreamInfo>,
    logical: HashMap<u32, LogicalStream>,
    primary_serial: Option<u32>,
    position_ms: u64,
    duration_ms: u64,
    eof: bool,
    data_start_offset: u64,
}

impl OggDemuxer {
    pub fn new(io: Box<dyn IoSource>) -> Self {
        Self {
            io,
            streams: Vec::new(),
            logical: HashMap::new(),
            primary_serial: None,
            position_ms: 0,
            duration_ms: 0,
            eof: false,
            data_start_offset: 0,
        }
    }

    fn granule_to_ms(&self, serial: u32, granule: i64) -> u64 {
        if granule < 0 {
            return 0;
        }
        let rate = self
            .logical
            .get(&serial)
            .map(|s| s.sample_rate)
            .unwrap_or(0)
            .max(1);
        (granule as u64).saturating_mul(1000) / rate as u64
    }

    fn ingest_page(&mut self, page: RawPage) {
        let (local_packets, tail) = split_packets(&page.segment_table, &page.payload);
        let entry = self.logical.entry(page.header.serial).or_insert_with(|| LogicalStream {
            serial: page.header.serial,
            codec_name: String::new(),
            sample_rate: 0,
            channels: 0,
            bits_per_sample: 16,
            codec_private: Vec::new(),
            headers_needed: usize::MAX,
            headers_seen: 0,
            pending: Vec::new(),
            queue: VecDeque::new(),
            last_granule: -1,
            saw_eos: false,
        });

        let mut packets = local_packets;
        if page.header.continued && !packets.is_empty() {
            let mut combined = std::mem::take(&mut entry.pending);
            combined.extend_from_slice(&packets[0]);
            packets[0] = combined;
        } else if page.header.continued && packets.is_empty() {
            if let Some(t) = &tail {
                entry.pending.extend_from_slice(t);
                // still incomplete; don't double count below
            }
        } else if !page.header.continued {
            // Previous pending (if any) was never completed before a fresh
            // start; drop it rather than silently prepend unrelated data.
            entry.pending.clear();
        }

        let n = packets.len();
        for (i, packet) in packets.into_iter().enumerate() {
            if entry.headers_needed == usize::MAX {
                if let Some((name, needed)) = detect_codec(&packet) {
                    entry.codec_name = name.to_string();
                    entry.headers_needed = needed;
                }
            }
            if entry.headers_seen < entry.headers_needed {
                let (rate, channels) = parse_rate_channels_from_header(&entry.codec_name, &packet);
                if rate != 0 {
                    entry.sample_rate = rate;
                    entry.channels = channels;
                }
                entry.codec_private.extend_from_slice(&(packet.len() as u32).to_le_bytes());
                entry.codec_private.extend_from_slice(&packet);
                entry.headers_seen += 1;
            } else {
                let granule = if i + 1 == n && tail.is_none() { page.header.granule } else { -1 };
                entry.queue.push_back((packet, granule));
            }
        }
        if let Some(t) = tail {
            if !page.header.continued || entry.pending.is_empty() {
                entry.pending = t;
            }
        }
        if page.header.granule >= 0 {
            entry.last_granule = page.header.granule;
        }
        if page.header.eos {
            entry.saw_eos = true;
        }
        if page.header.bos && self.primary_serial.is_none() && entry.headers_needed != usize::MAX {
            // First recognized audio BOS becomes primary by default.
        }
        let _ = page.offset;
        let _ = page.end_offset;
    }
}

impl Demuxer for OggDemuxer {
    fn parse_container(&mut self) -> crate::error::Result<()> {
        let start_pos = self.io.tell()?;

        // Header phase: read pages until every stream seen so far has
        // collected its required header packets and at least one BOS page
        // with no immediate successor BOS has been observed on this pass,
        // which in well-formed multiplexed files means "all logical
        // streams have declared themselves".
        loop {
            let before = self.io.tell()?;
            match read_page(self.io.as_mut())? {
                None => break,
                Some(page) => {
                    let is_bos = page.header.bos;
                    self.ingest_page(page);
                    if !is_bos {
                        self.data_start_offset = before;
                        break;
                    }
                }
            }
        }

        for (serial, stream) in &self.logical {
            if stream.sample_rate > 0 {
                self.streams.push(StreamInfo {
                    stream_id: *serial,
                    codec_name: stream.codec_name.clone(),
                    container: "ogg".to_string(),
                    sample_rate: stream.sample_rate,
                    channels: stream.channels,
                    bits_per_sample: stream.bits_per_sample,
                    nominal_bitrate: None,
                    duration_samples: None,
                    duration_ms: None,
                    codec_private: stream.codec_private.clone(),
                });
            }
        }
        self.streams.sort_by_key(|s| s.stream_id);
        self.primary_serial = self.streams.first().map(|s| s.stream_id);

        // Duration probe: scan backward from the end of the file for the
        // last page belonging to the primary serial with a known granule.
        if let Some(primary) = self.primary_serial {
            self.duration_ms = self.probe_duration(primary).unwrap_or(0);
        }

        self.io.seek(start_pos as i64, Whence::Start)?;
        Ok(())
    }

    fn streams(&self) -> &[StreamInfo] {
        &self.streams
    }

    fn read_chunk_any(&mut self) -> crate::error::Result<Option<MediaChunk>> {
        loop {
            for stream in self.logical.values_mut() {
                if let Some((data, granule)) = stream.queue.pop_front() {
                    let serial = stream.serial;
                    let timestamp = if granule >= 0 {
                        Timestamp::Samples(granule as u64)
                    } else {
                        Timestamp::Unknown
                    };
                    if granule >= 0 {
                        self.position_ms = self.granule_to_ms(serial, granule);
                    }
                    return Ok(Some(MediaChunk {
                        stream_id: serial,
                        data,
                        timestamp,
                        end_of_stream: false,
                    }));
                }
            }
            match read_page(self.io.as_mut())? {
                None => {
                    self.eof = true;
                    return Ok(None);
                }
                Some(page) => self.ingest_page(page),
            }
        }
    }

    fn read_chunk(&mut self, stream_id: u32) -> crate::error::Result<Option<MediaChunk>> {
        loop {
            if let Some(stream) = self.logical.get_mut(&stream_id) {
                if let Some((data, granule)) = stream.queue.pop_front() {
                    let timestamp = if granule >= 0 {
                        Timestamp::Samples(granule as u64)
                    } else {
                        Timestamp::Unknown
                    };
                    if granule >= 0 {
                        self.position_ms = self.granule_to_ms(stream_id, granule);
                    }
                    return Ok(Some(MediaChunk {
                        stream_id,
                        data,
                        timestamp,
                        end_of_stream: false,
                    }));
                }
                if stream.saw_eos {
                    self.eof = true;
                    return Ok(None);
                }
            }
            match read_page(self.io.as_mut())? {
                None => {
                    self.eof = true;
                    return Ok(None);
                }
                Some(page) => self.ingest_page(page),
            }
        }
    }

    fn seek_to(&mut self, target_ms: u64) -> crate::error::Result<()> {
        let primary = self
            .primary_serial
            .ok_or_else(|| crate::error::PlaybackError::SeekNotSupported)?;
        let rate = self.logical.get(&primary).map(|s| s.sample_rate).unwrap_or(0).max(1);
        let target_granule = (target_ms as i64 * rate as i64) / 1000;

        let size = self.io.size().as_u64().ok_or(crate::error::PlaybackError::SeekNotSupported)?;
        let mut low = self.data_start_offset;
        let mut high = size;
        let mut best_offset = self.data_start_offset;
        let mut iterations = 0;

        while low < high && iterations < MAX_SEEK_ITERATIONS {
            iterations += 1;
            let mid = low + (high - low) / 2;
            self.io.seek(mid as i64, Whence::Start)?;
            let granule = self.scan_forward_for_granule(primary)?;
            match granule {
                Some(g) if grain_cmp(g, target_granule) != Some(std::cmp::Ordering::Greater) => {
                    best_offset = mid;
                    low = mid + 1;
                }
                _ => {
                    if mid == high {
                        break;
                    }
                    high = mid;
                }
            }
        }

        self.io.seek(best_offset as i64, Whence::Start)?;
        for stream in self.logical.values_mut() {
            stream.queue.clear();
            stream.pending.clear();
        }
        self.eof = false;
        Ok(())
    }

    fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    fn position_ms(&self) -> u64 {
        self.position_ms
    }

    fn is_eof(&self) -> bool {
        self.eof
    }
}

impl OggDemuxer {
    /// Scans forward from the current position for the next page of
    /// `serial` and returns its granule, without mutating stream queues.
    fn scan_forward_for_granule(&mut self, serial: u32) -> crate::error::Result<Option<i64>> {
        for _ in 0..4096 {
            match read_page(self.io.as_mut())? {
                None => return Ok(None),
                Some(page) => {
                    if page.header.serial == serial && page.header.granule >= 0 {
                        return Ok(Some(page.header.granule));
                    }
                }
            }
        }
        Ok(None)
    }

    /// Scans the whole file for the last page of `serial` carrying a
    /// known granule, returning the equivalent millisecond duration.
    /// Always restores the I/O position afterward.
    fn probe_duration(&mut self, serial: u32) -> crate::error::Result<u64> {
        let start = self.io.tell()?;
        self.io.seek(self.data_start_offset as i64, Whence::Start)?;
        let mut last_granule: i64 = -1;
        let rate = self.logical.get(&serial).map(|s| s.sample_rate).unwrap_or(0).max(1);
        loop {
            match read_page(self.io.as_mut())? {
                None => break,
                Some(page) => {
                    if page.header.serial == serial && page.header.granule >= 0 {
                        last_granule = page.header.granule;
                    }
                }
            }
        }
        self.io.seek(start as i64, Whence::Start)?;
        if last_granule >= 0 {
            Ok((last_granule as u64).saturating_mul(1000) / rate as u64)
        } else {
            Ok(0)
        }
    }
}
