//! `stsz`/`stsc`/`stco`/`co64`/`stts`/`stss` sample table: maps a sample
//! index to its byte offset, size, and decode time.

use crate::error::{PlaybackError, Result};

#[derive(Debug, Clone, Copy)]
pub struct Sample {
    pub offset: u64,
    pub size: u32,
    pub decode_time: u64,
}

#[derive(Debug, Clone, Copy)]
struct ChunkRun {
    first_chunk: u32,
    samples_per_chunk: u32,
}

#[derive(Debug, Clone, Copy)]
struct TimeRun {
    sample_count: u32,
    sample_delta: u32,
}

#[derive(Default)]
pub struct SampleTable {
    sample_sizes: Vec<u32>,
    uniform_sample_size: u32,
    chunk_offsets: Vec<u64>,
    chunk_runs: Vec<ChunkRun>,
    time_runs: Vec<TimeRun>,
    sync_samples: Vec<u32>,
    samples: Vec<Sample>,
}

fn read_u32_be(data: &[u8], offset: usize) -> Result<u32> {
    let bytes: [u8; 4] = data
        .get(offset..offset + 4)
        .ok_or_else(|| PlaybackError::Truncated("sample table entry".into()))?
        .try_into()
        .unwrap();
    Ok(u32::from_be_bytes(bytes))
}

/// Validates that `count` entries of `entry_size` bytes each, starting at
/// `header_len`, could possibly fit in `body` before anything allocates a
/// `count`-sized `Vec` — a box's declared entry count is attacker-controlled
/// and must not be trusted into an allocation or an offset computation
/// before it's checked against the bytes actually available.
fn check_table_bounds(body_len: usize, header_len: usize, count: usize, entry_size: usize) -> Result<()> {
    let entries_len = count
        .checked_mul(entry_size)
        .ok_or_else(|| PlaybackError::Overflow(format!("sample table entry count {count} * size {entry_size}")))?;
    let total = header_len
        .checked_add(entries_len)
        .ok_or_else(|| PlaybackError::Overflow("sample table header + entries length".into()))?;
    if total > body_len {
        return Err(PlaybackError::Truncated("sample table entries".into()));
    }
    Ok(())
}

impl SampleTable {
    pub fn load_stsz(&mut self, body: &[u8]) -> Result<()> {
        // version/flags(4) + sample_size(4) + sample_count(4) [+ per-sample sizes]
        self.uniform_sample_size = read_u32_be(body, 4)?;
        let count = read_u32_be(body, 8)? as usize;
        if self.uniform_sample_size == 0 {
            check_table_bounds(body.len(), 12, count, 4)?;
            self.sample_sizes = (0..count)
                .map(|i| read_u32_be(body, 12 + i * 4))
                .collect::<Result<Vec<_>>>()?;
        }
        Ok(())
    }

    pub fn load_stsc(&mut self, body: &[u8]) -> Result<()> {
        let count = read_u32_be(body, 4)? as usize;
        check_table_bounds(body.len(), 8, count, 12)?;
        let mut runs = Vec::with_capacity(count);
        for i in 0..count {
            let base = 8 + i * 12;
            runs.push(ChunkRun {
                first_chunk: read_u32_be(body, base)?,
                samples_per_chunk: read_u32_be(body, base + 4)?,
            });
        }
        self.chunk_runs = runs;
        Ok(())
    }

    pub fn load_stco(&mut self, body: &[u8]) -> Result<()> {
        let count = read_u32_be(body, 4)? as usize;
        check_table_bounds(body.len(), 8, count, 4)?;
        let mut offsets = Vec::with_capacity(count);
        for i in 0..count {
            offsets.push(read_u32_be(body, 8 + i * 4)? as u64);
        }
        self.chunk_offsets = offsets;
        Ok(())
    }

    pub fn load_co64(&mut self, body: &[u8]) -> Result<()> {
        let count = read_u32_be(body, 4)? as usize;
        check_table_bounds(body.len(), 8, count, 8)?;
        let mut offsets = Vec::with_capacity(count);
        for i in 0..count {
            let base = 8 + i * 8;
            let bytes: [u8; 8] = body
                .get(base..base + 8)
                .ok_or_else(|| PlaybackError::Truncated("co64 entry".into()))?
                .try_into()
                .unwrap();
            offsets.push(u64::from_be_bytes(bytes));
        }
        self.chunk_offsets = offsets;
        Ok(())
    }

    pub fn load_stts(&mut self, body: &[u8]) -> Result<()> {
        let count = read_u32_be(body, 4)? as usize;
        check_table_bounds(body.len(), 8, count, 8)?;
        let mut runs = Vec::with_capacity(count);
        for i in 0..count {
            let base = 8 + i * 8;
            runs.push(TimeRun {
                sample_count: read_u32_be(body, base)?,
                sample_delta: read_u32_be(body, base + 4)?,
            });
        }
        self.time_runs = runs;
        Ok(())
    }

    pub fn load_stss(&mut self, body: &[u8]) -> Result<()> {
        let count = read_u32_be(body, 4)? as usize;
        check_table_bounds(body.len(), 8, count, 4)?;
        let mut entries = Vec::with_capacity(count);
        for i in 0..count {
            entries.push(read_u32_be(body, 8 + i * 4)?);
        }
        self.sync_samples = entries;
        Ok(())
    }

    /// Materializes `samples` from the raw box tables. Must run after all
    /// of `stsz`/`stsc`/`stco`/`stts` have been loaded for this track.
    pub fn finish(&mut self) -> Result<()> {
        let total_samples = if self.uniform_sample_size != 0 {
            self.time_runs.iter().map(|r| r.sample_count as u64).sum::<u64>() as usize
        } else {
            self.sample_sizes.len()
        };
        if total_samples == 0 || self.chunk_offsets.is_empty() || self.chunk_runs.is_empty() {
            return Ok(());
        }

        // Expand chunk_runs into a per-chunk samples-per-chunk lookup.
        let total_chunks = self.chunk_offsets.len() as u32;
        let mut samples_per_chunk_for = vec![0u32; total_chunks as usize + 1];
        for (i, run) in self.chunk_runs.iter().enumerate() {
            let end_chunk = self
                .chunk_runs
                .get(i + 1)
                .map(|r| r.first_chunk)
                .unwrap_or(total_chunks + 1);
            for chunk in run.first_chunk..end_chunk {
                if (chunk as usize) <= total_chunks as usize {
                    samples_per_chunk_for[chunk as usize - 1] = run.samples_per_chunk;
                }
            }
        }

        let mut samples = Vec::with_capacity(total_samples);
        let mut sample_index = 0usize;
        'chunks: for (chunk_idx, &chunk_offset) in self.chunk_offsets.iter().enumerate() {
            let per_chunk = samples_per_chunk_for[chunk_idx];
            let mut running_offset = chunk_offset;
            for _ in 0..per_chunk {
                if sample_index >= total_samples {
                    break 'chunks;
                }
                let size = if self.uniform_sample_size != 0 {
                    self.uniform_sample_size
                } else {
                    self.sample_sizes[sample_index]
                };
                samples.push(Sample {
                    offset: running_offset,
                    size,
                    decode_time: 0,
                });
                running_offset = running_offset
                    .checked_add(size as u64)
                    .ok_or_else(|| PlaybackError::Overflow("sample chunk offset".into()))?;
                sample_index += 1;
            }
        }

        // Overlay decode times from stts runs.
        let mut time = 0u64;
        let mut s = 0usize;
        for run in &self.time_runs {
            for _ in 0..run.sample_count {
                if s >= samples.len() {
                    break;
                }
                samples[s].decode_time = time;
                time += run.sample_delta as u64;
                s += 1;
            }
        }

        self.samples = samples;
        Ok(())
    }

    pub fn sample_at(&self, index: usize) -> Option<Sample> {
        self.samples.get(index).copied()
    }

    /// Appends samples contributed by a `moof`/`traf` fragment overlay
    /// after the `moov` sample table has already been finalized.
    pub fn append_samples(&mut self, samples: Vec<Sample>) {
        self.samples.extend(samples);
    }

    pub fn total_sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Total duration in `stts` time units (the track's timescale), used
    /// by the caller to compute a millisecond duration. Fragmented tracks
    /// carry no top-level `stts` covering fragment samples, so this also
    /// considers the last materialized sample's decode time.
    pub fn total_samples(&self) -> u64 {
        let from_stts = self
            .time_runs
            .iter()
            .map(|r| r.sample_count as u64 * r.sample_delta as u64)
            .sum();
        let from_samples = self.samples.last().map(|s| s.decode_time).unwrap_or(0);
        from_stts.max(from_samples)
    }

    pub fn sample_index_for_time(&self, target_time: u64) -> usize {
        match self.samples.binary_search_by_key(&target_time, |s| s.decode_time) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1).min(self.samples.len().saturating_sub(1)),
        }
    }
}
