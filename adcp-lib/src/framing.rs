//! Locating ensemble frames in a continuous byte stream.
//!
//! Both formats are scanned the same way: find the start marker (the 16-byte RTB
//! delimiter or the 2-byte PD0 marker), read just enough header to learn the frame
//! length, wait for the complete frame, then verify its checksum. Input may arrive in
//! chunks of any size; bytes that cannot yet be resolved are carried over to the next
//! call to [FrameScanner::feed].
use tracing::{debug, trace};

use crate::integrity::{ChecksumVerifier, Pd0Checksum, RtbChecksum};
use crate::prelude::*;

/// RTB frames begin with 16 bytes of `0x80`.
pub const RTB_DELIMITER: [u8; 16] = [0x80; 16];
/// RTB header length, delimiter included.
pub const RTB_HEADER_LEN: usize = 32;
/// Largest RTB payload accepted before a delimiter is considered false.
pub const RTB_MAX_PAYLOAD: usize = 1 << 20;

/// PD0 header id and data source id.
pub const PD0_MARKER: [u8; 2] = [0x7f, 0x7f];
/// PD0 header length, not counting the dataset offset table.
pub const PD0_HEADER_LEN: usize = 6;
/// How far past the current position a PD0 marker is searched for.
pub const DEFAULT_SEARCH_WINDOW: usize = 3000;

/// Wire format. Always declared by the caller, never detected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Format {
    Rtb,
    Pd0,
}

impl Format {
    #[must_use]
    pub fn marker(self) -> &'static [u8] {
        match self {
            Format::Rtb => &RTB_DELIMITER,
            Format::Pd0 => &PD0_MARKER,
        }
    }

    #[must_use]
    pub fn verifier(self) -> &'static dyn ChecksumVerifier {
        match self {
            Format::Rtb => &RtbChecksum,
            Format::Pd0 => &Pd0Checksum,
        }
    }

    /// Bytes needed before the frame length can be determined.
    #[must_use]
    pub fn header_len(self) -> usize {
        match self {
            Format::Rtb => RTB_HEADER_LEN,
            Format::Pd0 => PD0_HEADER_LEN,
        }
    }

    /// Total frame length, checksum included, declared by `header`.
    ///
    /// RTB headers carry the ensemble number and payload size each followed by its
    /// bitwise complement; both pairs must agree.
    ///
    /// # Errors
    /// [Error::InvalidHeader] if the header is short or cannot belong to a real frame.
    pub fn frame_len(self, header: &[u8]) -> Result<usize> {
        if header.len() < self.header_len() {
            return Err(Error::InvalidHeader(format!(
                "{} of {} header bytes",
                header.len(),
                self.header_len()
            )));
        }
        let word = |idx: usize| {
            u32::from_le_bytes([header[idx], header[idx + 1], header[idx + 2], header[idx + 3]])
        };
        match self {
            Format::Rtb => {
                let (ens_num, payload) = (word(16), word(24));
                if word(20) != !ens_num {
                    return Err(Error::InvalidHeader(format!(
                        "ensemble number {ens_num} does not match its complement"
                    )));
                }
                if word(28) != !payload {
                    return Err(Error::InvalidHeader(format!(
                        "payload size {payload} does not match its complement"
                    )));
                }
                let payload = payload as usize;
                if payload > RTB_MAX_PAYLOAD {
                    return Err(Error::InvalidHeader(format!(
                        "payload size {payload} exceeds {RTB_MAX_PAYLOAD}"
                    )));
                }
                Ok(RTB_HEADER_LEN + payload + RtbChecksum::LEN)
            }
            Format::Pd0 => {
                let nbytes = usize::from(u16::from_le_bytes([header[2], header[3]]));
                let ndatatypes = usize::from(header[5]);
                if nbytes < PD0_HEADER_LEN + 2 * ndatatypes {
                    return Err(Error::InvalidHeader(format!(
                        "{nbytes} bytes cannot hold {ndatatypes} dataset offsets"
                    )));
                }
                Ok(nbytes + 2)
            }
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Format::Rtb => write!(f, "RTB"),
            Format::Pd0 => write!(f, "PD0"),
        }
    }
}

/// A complete frame whose checksum has been verified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub format: Format,
    /// Stream offset of the first byte of the frame.
    pub offset: usize,
    /// Marker through checksum.
    pub data: Vec<u8>,
}

/// Incremental frame scanner.
///
/// ```
/// use adcp::framing::{Format, FrameScanner};
///
/// let mut scanner = FrameScanner::new(Format::Pd0);
/// let frames = scanner.feed(&[0x7f, 0x7f, 0x06]);
/// assert!(frames.is_empty(), "not enough bytes for a frame yet");
/// ```
pub struct FrameScanner {
    format: Format,
    search_window: usize,
    buf: Vec<u8>,
    // Stream offset of buf[0]
    position: usize,
    // Bytes of the current frame already searched for a following RTB delimiter
    searched: usize,
}

impl FrameScanner {
    #[must_use]
    pub fn new(format: Format) -> Self {
        Self {
            format,
            search_window: DEFAULT_SEARCH_WINDOW,
            buf: Vec::new(),
            position: 0,
            searched: 0,
        }
    }

    /// Set the PD0 marker lookahead. Has no effect for RTB.
    #[must_use]
    pub fn with_search_window(mut self, search_window: usize) -> Self {
        self.search_window = search_window.max(PD0_MARKER.len());
        self
    }

    #[must_use]
    pub fn format(&self) -> Format {
        self.format
    }

    /// Number of bytes currently held waiting for more input.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Add bytes and return every frame, or frame level error, they complete.
    ///
    /// Errors are [Error::ChecksumMismatch] for a frame that failed verification, after
    /// which scanning resumes just past the rejected marker, and [Error::MarkerNotFound]
    /// when a PD0 search window is exhausted. An RTB header that fails its complement
    /// check, or whose frame is cut short by the next delimiter, is reported as
    /// [Error::InvalidHeader].
    pub fn feed(&mut self, dat: &[u8]) -> Vec<Result<Frame>> {
        self.buf.extend_from_slice(dat);

        let mut zult = Vec::new();
        loop {
            match self.seek_marker() {
                Ok(true) => {}
                Ok(false) => break,
                Err(err) => {
                    zult.push(Err(err));
                    continue;
                }
            }

            if self.buf.len() < self.format.header_len() {
                break;
            }
            let frame_len = match self.format.frame_len(&self.buf) {
                Ok(frame_len) => frame_len,
                Err(err) => {
                    debug!(offset = self.position, "{err}; resyncing");
                    // a 2-byte PD0 marker turns up in data too often to report
                    if self.format == Format::Rtb {
                        zult.push(Err(err));
                    }
                    self.discard(1);
                    continue;
                }
            };
            if self.buf.len() < frame_len {
                let Some(next) = self.next_delimiter() else {
                    break;
                };
                let err = Error::InvalidHeader(format!(
                    "{frame_len} byte frame at {} cut short by a delimiter at {}",
                    self.position,
                    self.position + next
                ));
                debug!("{err}; resyncing");
                zult.push(Err(err));
                self.discard(next);
                continue;
            }

            match self.format.verifier().compute(&self.buf[..frame_len]) {
                Some(checksum) if checksum.is_valid() => {
                    trace!(offset = self.position, len = frame_len, "frame");
                    zult.push(Ok(Frame {
                        format: self.format,
                        offset: self.position,
                        data: self.buf[..frame_len].to_vec(),
                    }));
                    self.discard(frame_len);
                }
                Some(checksum) => {
                    debug!(
                        offset = self.position,
                        expected = checksum.expected,
                        actual = checksum.actual,
                        "checksum mismatch; resyncing"
                    );
                    zult.push(Err(Error::ChecksumMismatch {
                        expected: checksum.expected,
                        actual: checksum.actual,
                    }));
                    self.discard(1);
                }
                None => self.discard(1),
            }
        }
        zult
    }

    /// Signal end of input. Returns [Error::IncompleteFrame] if a frame had been started
    /// but not completed. Any buffered bytes are dropped.
    pub fn finish(&mut self) -> Option<Error> {
        let marker = self.format.marker();
        let started = self.buf.len() >= marker.len() && self.buf.starts_with(marker);
        let available = self.buf.len();
        let needed = self
            .format
            .frame_len(&self.buf)
            .unwrap_or_else(|_| self.format.header_len());
        self.discard(available);

        if started {
            Some(Error::IncompleteFrame { needed, available })
        } else {
            None
        }
    }

    /// Align the buffer so that it starts with a marker. Returns false if more input is
    /// required.
    fn seek_marker(&mut self) -> Result<bool> {
        let marker = self.format.marker();
        let searchable = match self.format {
            Format::Rtb => self.buf.len(),
            // A marker must start within the window
            Format::Pd0 => self.buf.len().min(self.search_window + marker.len() - 1),
        };

        if let Some(idx) = find(&self.buf[..searchable], marker) {
            if idx > 0 {
                debug!(offset = self.position, len = idx, "skipping bytes before marker");
                self.discard(idx);
            }
            return Ok(true);
        }

        match self.format {
            Format::Rtb => {
                // Keep enough of the tail to complete a delimiter split across inputs
                let keep = marker.len() - 1;
                self.discard(self.buf.len().saturating_sub(keep));
                Ok(false)
            }
            Format::Pd0 if searchable > self.search_window => {
                self.discard(self.search_window);
                Err(Error::MarkerNotFound {
                    searched: self.search_window,
                })
            }
            Format::Pd0 => Ok(false),
        }
    }

    /// Offset of an RTB delimiter after the one the buffer starts with, searching only
    /// bytes not already searched for this frame.
    fn next_delimiter(&mut self) -> Option<usize> {
        if self.format != Format::Rtb {
            return None;
        }
        let marker = self.format.marker();
        let start = self
            .searched
            .saturating_sub(marker.len() - 1)
            .max(marker.len());
        let found = self
            .buf
            .get(start..)
            .and_then(|tail| find(tail, marker))
            .map(|idx| idx + start);
        self.searched = self.buf.len();
        found
    }

    fn discard(&mut self, num: usize) {
        let num = num.min(self.buf.len());
        self.buf.drain(..num);
        self.position += num;
        self.searched = 0;
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
