//! HTTP-backed [`IoSource`].
//!
//! Built on [`bridge_traits::HttpClient`] rather than talking to `reqwest`
//! directly, so host platforms can swap in their own HTTP stack. On first
//! use a range GET determines whether the server honors
//! `Accept-Ranges: bytes`; if not, the whole resource is buffered once
//! (capped by `HttpSourceConfig::max_full_buffer_bytes`) and all reads are
//! served from memory.

use std::sync::Arc;

use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};

use super::{IoSource, SourceSize, Whence};
use crate::config::HttpSourceConfig;
use crate::error::{PlaybackError, Result};

enum Backing {
    /// Server supports range requests; `window` is the last fetched slice.
    Ranged {
        window_start: u64,
        window: Vec<u8>,
    },
    /// Server does not support ranges; the whole resource is in memory.
    FullBuffer(Vec<u8>),
}

pub struct HttpSource {
    client: Arc<dyn HttpClient>,
    url: String,
    config: HttpSourceConfig,
    pos: u64,
    size: SourceSize,
    backing: Option<Backing>,
    eof: bool,
    // Owns a dedicated runtime so `IoSource`'s synchronous contract can
    // drive the async `HttpClient` without requiring callers to be inside
    // a Tokio context themselves.
    runtime: tokio::runtime::Runtime,
}

impl HttpSource {
    pub fn open(client: Arc<dyn HttpClient>, url: impl Into<String>, config: HttpSourceConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| PlaybackError::SourceError(e.to_string()))?;
        let mut source = Self {
            client,
            url: url.into(),
            config,
            pos: 0,
            size: SourceSize::Unknown,
            backing: None,
            eof: false,
            runtime,
        };
        source.probe()?;
        Ok(source)
    }

    fn probe(&mut self) -> Result<()> {
        let probe_len = self.config.window_bytes.min(4096).max(1) as u64;
        let request = HttpRequest::new(HttpMethod::Get, self.url.clone())
            .header("Range", format!("bytes=0-{}", probe_len.saturating_sub(1)));
        let response = self
            .runtime
            .block_on(self.client.execute(request))
            .map_err(|e| PlaybackError::SourceError(e.to_string()))?;

        if response.status == 206 {
            // Server honored the range; learn total size from Content-Range.
            if let Some(range) = response.headers.get("Content-Range") {
                if let Some(total) = range.rsplit('/').next().and_then(|s| s.parse::<u64>().ok()) {
                    self.size = SourceSize::Known(total);
                }
            }
            self.backing = Some(Backing::Ranged {
                window_start: 0,
                window: response.body.to_vec(),
            });
            Ok(())
        } else if response.is_success() {
            // No range support: the 200 response is the whole resource (or
            // we asked for too little and got everything back regardless).
            if response.body.len() as u64 > self.config.max_full_buffer_bytes {
                return Err(PlaybackError::Unsupported(format!(
                    "server does not support range requests and resource exceeds {} bytes",
                    self.config.max_full_buffer_bytes
                )));
            }
            let full = if (response.body.len() as u64) < self.config.max_full_buffer_bytes {
                // We only received the probe-sized prefix above because we
                // sent a Range header the server happened to ignore for a
                // short body; re-fetch without the header to get the rest.
                let whole = self
                    .runtime
                    .block_on(self.client.execute(HttpRequest::new(HttpMethod::Get, self.url.clone())))
                    .map_err(|e| PlaybackError::SourceError(e.to_string()))?;
                if whole.body.len() as u64 > self.config.max_full_buffer_bytes {
                    return Err(PlaybackError::Unsupported(format!(
                        "resource exceeds {} byte full-buffer cap",
                        self.config.max_full_buffer_bytes
                    )));
                }
                whole.body.to_vec()
            } else {
                response.body.to_vec()
            };
            self.size = SourceSize::Known(full.len() as u64);
            self.backing = Some(Backing::FullBuffer(full));
            Ok(())
        } else {
            Err(PlaybackError::SourceError(format!(
                "unexpected status {} probing {}",
                response.status, self.url
            )))
        }
    }

    fn read_ranged(&mut self, window_start: u64, window: &mut Vec<u8>, buf: &mut [u8]) -> Result<usize> {
        let window_end = window_start + window.len() as u64;
        if self.pos < window_start || self.pos >= window_end {
            // Outside the window: replace it with a fresh range GET.
            let len = self.config.window_bytes as u64;
            let request = HttpRequest::new(HttpMethod::Get, self.url.clone()).header(
                "Range",
                format!("bytes={}-{}", self.pos, self.pos + len - 1),
            );
            // Unlike the initial probe, a failure here is the source going
            // away mid-stream rather than never having opened.
            let response = self
                .runtime
                .block_on(self.client.execute(request))
                .map_err(|e| PlaybackError::SourceUnavailable(e.to_string()))?;
            if response.body.is_empty() {
                self.eof = true;
                return Ok(0);
            }
            *window = response.body.to_vec();
            return self.read_ranged(self.pos, window, buf);
        }
        let offset = (self.pos - window_start) as usize;
        let available = &window[offset..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.pos += n as u64;
        if n == 0 {
            self.eof = true;
        }
        Ok(n)
    }
}

impl IoSource for HttpSource {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        match self.backing.take() {
            Some(Backing::Ranged {
                window_start,
                mut window,
            }) => {
                let n = self.read_ranged(window_start, &mut window, buf)?;
                self.backing = Some(Backing::Ranged {
                    window_start: self.pos - n as u64,
                    window,
                });
                Ok(n)
            }
            Some(Backing::FullBuffer(full)) => {
                let pos = self.pos as usize;
                let n = if pos >= full.len() {
                    0
                } else {
                    let avail = &full[pos..];
                    let n = avail.len().min(buf.len());
                    buf[..n].copy_from_slice(&avail[..n]);
                    n
                };
                self.pos += n as u64;
                if n == 0 {
                    self.eof = true;
                }
                self.backing = Some(Backing::FullBuffer(full));
                Ok(n)
            }
            None => Err(PlaybackError::Internal("HttpSource not probed".into())),
        }
    }

    fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64> {
        let base = match whence {
            Whence::Start => 0i64,
            Whence::Current => self.pos as i64,
            Whence::End => self.size.as_u64().ok_or_else(|| {
                PlaybackError::Unsupported("seek from end on a source of unknown size".into())
            })? as i64,
        };
        let new_pos = base + offset;
        if new_pos < 0 {
            return Err(PlaybackError::Format("seek before start of stream".into()));
        }
        self.pos = new_pos as u64;
        self.eof = false;
        Ok(self.pos)
    }

    fn tell(&mut self) -> Result<u64> {
        Ok(self.pos)
    }

    fn size(&self) -> SourceSize {
        self.size
    }

    fn eof(&self) -> bool {
        self.eof
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::http::RetryPolicy;
    use std::collections::HashMap;

    /// A server that ignores `Range` headers entirely and always answers
    /// `200` with the whole resource, the way a static file host with
    /// range support disabled behaves.
    struct RangeRefusingClient {
        body: Vec<u8>,
    }

    #[async_trait]
    impl HttpClient for RangeRefusingClient {
        async fn execute(&self, _request: HttpRequest) -> BridgeResult<bridge_traits::http::HttpResponse> {
            Ok(bridge_traits::http::HttpResponse {
                status: 200,
                headers: HashMap::new(),
                body: bytes::Bytes::copy_from_slice(&self.body),
            })
        }

        async fn execute_with_retry(
            &self,
            request: HttpRequest,
            _policy: RetryPolicy,
        ) -> BridgeResult<bridge_traits::http::HttpResponse> {
            self.execute(request).await
        }

        async fn download_stream(
            &self,
            _url: String,
        ) -> BridgeResult<Box<dyn core_async::io::AsyncRead + Send + Unpin>> {
            Err(BridgeError::NotAvailable("not needed by this mock".into()))
        }
    }

    #[test]
    fn range_refusal_falls_back_to_full_buffer_under_cap() {
        let resource = vec![0xABu8; 200 * 1024];
        let client: Arc<dyn HttpClient> = Arc::new(RangeRefusingClient { body: resource.clone() });
        let mut config = HttpSourceConfig::default();
        config.max_full_buffer_bytes = 32 * 1024 * 1024;

        let mut source = HttpSource::open(client, "http://example.invalid/track.flac", config).unwrap();
        assert_eq!(source.size(), SourceSize::Known(resource.len() as u64));

        let mut buf = vec![0u8; resource.len()];
        source.read_exact(&mut buf).unwrap();
        assert_eq!(buf, resource);
    }

    #[test]
    fn range_refusal_fails_unsupported_over_cap() {
        let resource = vec![0xCDu8; 200 * 1024];
        let client: Arc<dyn HttpClient> = Arc::new(RangeRefusingClient { body: resource });
        let mut config = HttpSourceConfig::default();
        config.max_full_buffer_bytes = 1024; // far below the resource size

        let err = HttpSource::open(client, "http://example.invalid/track.flac", config).unwrap_err();
        assert!(matches!(err, PlaybackError::Unsupported(_)));
    }
}
