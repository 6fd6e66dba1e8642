//! Decoding ensembles from byte streams.
use std::collections::VecDeque;
use std::io::{ErrorKind, Read};

use tracing::debug;
use typed_builder::TypedBuilder;

use crate::convert::convert_records;
use crate::ensemble::{Convention, DecodedEnsemble, Ensemble};
use crate::framing::{Format, FrameScanner, DEFAULT_SEARCH_WINDOW};
use crate::prelude::*;
use crate::registry::EnsembleDecoder;

/// Bytes requested from a reader per read.
pub const DEFAULT_READ_SIZE: usize = 4096;

/// What to do after a fatal error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FatalPolicy {
    /// Report the error and stop.
    Abort,
    /// Report the error and keep searching for the next frame.
    #[default]
    Resync,
}

/// Stream decoding options.
///
/// ```
/// use adcp::{Convention, DecoderConfig, FatalPolicy, Format};
///
/// let config = DecoderConfig::builder()
///     .format(Format::Pd0)
///     .policy(FatalPolicy::Abort)
///     .convention(Convention::Native)
///     .build();
/// assert_eq!(config.search_window, 3000);
/// assert!(!config.strict);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, TypedBuilder)]
pub struct DecoderConfig {
    pub format: Format,
    #[builder(default)]
    pub policy: FatalPolicy,
    /// Report a partial frame at the end of input as [Error::IncompleteFrame] rather
    /// than dropping it.
    #[builder(default)]
    pub strict: bool,
    /// With [Convention::Pd0Compatible], RTB ensembles are converted before they are
    /// returned. A record that cannot be converted is dropped and its error added to
    /// the ensemble's warnings. `Native` leaves every ensemble as decoded.
    #[builder(default)]
    pub convention: Convention,
    /// PD0 marker lookahead.
    #[builder(default = DEFAULT_SEARCH_WINDOW)]
    pub search_window: usize,
    #[builder(default = DEFAULT_READ_SIZE)]
    pub read_size: usize,
}

impl DecoderConfig {
    /// Defaults for `format`.
    #[must_use]
    pub fn new(format: Format) -> Self {
        Self::builder().format(format).build()
    }
}

/// Push based decoder; feed it bytes as they arrive.
pub struct StreamDecoder {
    config: DecoderConfig,
    scanner: FrameScanner,
    decoder: EnsembleDecoder,
    aborted: bool,
}

impl StreamDecoder {
    #[must_use]
    pub fn new(config: DecoderConfig) -> Self {
        Self {
            scanner: FrameScanner::new(config.format).with_search_window(config.search_window),
            decoder: EnsembleDecoder::new(config.format),
            config,
            aborted: false,
        }
    }

    #[must_use]
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Whether a fatal error has stopped decoding under [FatalPolicy::Abort].
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Add bytes and return every ensemble, or error, they complete.
    pub fn feed(&mut self, dat: &[u8]) -> Vec<Result<DecodedEnsemble>> {
        if self.aborted {
            return Vec::default();
        }
        let mut zult = Vec::new();
        for frame in self.scanner.feed(dat) {
            let item = frame.and_then(|frame| {
                let mut decoded = self.decoder.decode(&frame.data)?;
                decoded.offset = Some(frame.offset);
                if self.config.convention == Convention::Pd0Compatible
                    && decoded.ensemble.convention != Convention::Pd0Compatible
                {
                    let (converted, errors) =
                        convert_records(&decoded.ensemble, self.config.convention);
                    decoded.ensemble = converted;
                    decoded.warnings.extend(errors);
                }
                Ok(decoded)
            });
            if let Err(err) = &item {
                if err.is_fatal() && self.config.policy == FatalPolicy::Abort {
                    debug!("aborting on fatal error: {err}");
                    zult.push(item);
                    self.aborted = true;
                    break;
                }
            }
            zult.push(item);
        }
        zult
    }

    /// Signal end of input. A partial trailing frame is only reported in strict mode.
    pub fn finish(&mut self) -> Vec<Result<DecodedEnsemble>> {
        if self.aborted {
            return Vec::default();
        }
        match self.scanner.finish() {
            Some(err) if self.config.strict => vec![Err(err)],
            Some(err) => {
                debug!("dropping trailing partial frame: {err}");
                Vec::default()
            }
            None => Vec::default(),
        }
    }
}

/// Pull based decoder over a [Read].
///
/// ```no_run
/// use std::fs::File;
/// use adcp::{Decoder, DecoderConfig, Format};
///
/// let file = File::open("deployment.ens").unwrap();
/// for zult in Decoder::new(DecoderConfig::new(Format::Rtb)).decode(file) {
///     match zult {
///         Ok(decoded) => println!("{:?}", decoded.ensemble.cfg()),
///         Err(err) => eprintln!("{err}"),
///     }
/// }
/// ```
pub struct Decoder {
    config: DecoderConfig,
}

impl Decoder {
    #[must_use]
    pub fn new(config: DecoderConfig) -> Self {
        Self { config }
    }

    /// Lazily decode ensembles from `reader`. Ends at EOF, after a read error, or after
    /// the first fatal error under [FatalPolicy::Abort].
    pub fn decode<R: Read>(self, reader: R) -> DecodeIter<R> {
        DecodeIter {
            buf: vec![0u8; self.config.read_size.max(1)],
            stream: StreamDecoder::new(self.config),
            reader,
            pending: VecDeque::default(),
            done: false,
        }
    }
}

pub struct DecodeIter<R: Read> {
    reader: R,
    stream: StreamDecoder,
    buf: Vec<u8>,
    pending: VecDeque<Result<DecodedEnsemble>>,
    done: bool,
}

impl<R: Read> Iterator for DecodeIter<R> {
    type Item = Result<DecodedEnsemble>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.pending.pop_front() {
                return Some(item);
            }
            if self.done {
                return None;
            }
            match self.reader.read(&mut self.buf) {
                Ok(0) => {
                    self.pending.extend(self.stream.finish());
                    self.done = true;
                }
                Ok(num) => {
                    self.pending.extend(self.stream.feed(&self.buf[..num]));
                    self.done = self.stream.is_aborted();
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) => {
                    self.done = true;
                    return Some(Err(err.into()));
                }
            }
        }
    }
}

/// Decode `reader` with default options, yielding just the ensembles.
pub fn decode_stream<R: Read>(format: Format, reader: R) -> impl Iterator<Item = Result<Ensemble>> {
    Decoder::new(DecoderConfig::new(format))
        .decode(reader)
        .map(|zult| zult.map(|decoded| decoded.ensemble))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = DecoderConfig::new(Format::Rtb);
        assert_eq!(config.policy, FatalPolicy::Resync);
        assert_eq!(config.convention, Convention::Native);
        assert_eq!(config.read_size, DEFAULT_READ_SIZE);
    }

    #[test]
    fn test_abort_stops_after_marker_not_found() {
        let config = DecoderConfig::builder()
            .format(Format::Pd0)
            .policy(FatalPolicy::Abort)
            .search_window(16)
            .build();
        let mut stream = StreamDecoder::new(config);
        let zult = stream.feed(&[0u8; 64]);
        assert_eq!(zult.len(), 1);
        assert!(matches!(zult[0], Err(Error::MarkerNotFound { .. })));
        assert!(stream.is_aborted());
        assert!(stream.feed(&[0u8; 64]).is_empty());
        assert!(stream.finish().is_empty());
    }

    #[test]
    fn test_resync_keeps_reporting() {
        let config = DecoderConfig::builder()
            .format(Format::Pd0)
            .search_window(16)
            .build();
        let mut stream = StreamDecoder::new(config);
        let zult = stream.feed(&[0u8; 64]);
        assert!(zult.len() > 1, "{zult:?}");
        assert!(!stream.is_aborted());
    }

    #[test]
    fn test_partial_frame_only_reported_when_strict() {
        let partial = [0x7f, 0x7f, 0x20, 0x00, 0x00, 0x00];
        let mut lenient = StreamDecoder::new(DecoderConfig::new(Format::Pd0));
        assert!(lenient.feed(&partial).is_empty());
        assert!(lenient.finish().is_empty());

        let config = DecoderConfig::builder()
            .format(Format::Pd0)
            .strict(true)
            .build();
        let mut strict = StreamDecoder::new(config);
        assert!(strict.feed(&partial).is_empty());
        let zult = strict.finish();
        assert!(
            matches!(zult[..], [Err(Error::IncompleteFrame { needed: 34, available: 6 })]),
            "{zult:?}"
        );
    }

    #[test]
    fn test_empty_reader() {
        assert_eq!(decode_stream(Format::Rtb, std::io::empty()).count(), 0);
    }
}
