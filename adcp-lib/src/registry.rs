//! Dataset lookup and the two-pass ensemble decoder.
//!
//! Leader datasets (configuration records that establish bin, beam and ping counts)
//! are decoded before any measurement dataset, whatever order the frame lists them
//! in. Measurement decoders then see those counts through [Context].
use std::borrow::Cow;
use std::fmt::{self, Display};

use tracing::{debug, trace};

use crate::bytes::ByteCursor;
use crate::ensemble::{Coordinate, DecodedEnsemble, Ensemble, Record};
use crate::framing::Format;
use crate::prelude::*;
use crate::{pd0, rtb};

/// Dataset identifier as it appears on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum DatasetCode {
    /// RTB dataset name, e.g., `E000001`.
    Rtb(Cow<'static, str>),
    /// PD0 little-endian block id, e.g., `0x0080`.
    Pd0(u16),
}

impl Display for DatasetCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetCode::Rtb(name) => write!(f, "{name}"),
            DatasetCode::Pd0(id) => write!(f, "{id:#06x}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pass {
    /// Configuration datasets others depend on.
    Leader,
    Measurement,
}

/// Profile dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Shape {
    pub beams: usize,
    pub bins: usize,
}

/// Values from leader datasets that measurement datasets depend on.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Context {
    pub bins: Option<usize>,
    pub beams: Option<usize>,
    pub pings: Option<u32>,
    pub coordinate: Option<Coordinate>,
    pub vertical_cells: Option<usize>,
}

impl Context {
    /// Pick up whatever `record` establishes.
    pub fn absorb(&mut self, record: &Record) {
        match record {
            Record::EnsembleData(ens) => {
                self.bins = usize::try_from(ens.num_bins).ok();
                self.beams = usize::try_from(ens.num_beams).ok();
                self.pings = u32::try_from(ens.actual_ping_count).ok();
            }
            Record::FixedLeader(fl) => {
                self.bins = Some(usize::from(fl.num_cells));
                self.beams = Some(usize::from(fl.num_beams));
                self.pings = Some(u32::from(fl.pings_per_ensemble));
                self.coordinate = Some(fl.coordinate);
            }
            Record::VerticalBeamLeader(vb) => {
                self.vertical_cells = Some(usize::from(vb.num_cells));
            }
            _ => {}
        }
    }
}

/// Everything a dataset decoder gets to see.
pub struct DatasetInput<'a> {
    pub code: &'a DatasetCode,
    /// The dataset's bytes. RTB cursors start after the dataset header, PD0 cursors at
    /// the block id.
    pub cursor: ByteCursor<'a>,
    /// RTB profile dimensions from the dataset header.
    pub shape: Option<Shape>,
    /// RTB value type from the dataset header.
    pub value_type: Option<i32>,
    pub context: &'a Context,
}

impl DatasetInput<'_> {
    /// Dimensions from the dataset header, falling back to the leader's counts.
    ///
    /// # Errors
    /// [Error::MissingCrossDependency] if neither is available.
    pub fn shape(&self, needs: &'static str) -> Result<Shape> {
        if let Some(shape) = self.shape {
            return Ok(shape);
        }
        match (self.context.beams, self.context.bins) {
            (Some(beams), Some(bins)) => Ok(Shape { beams, bins }),
            _ => Err(self.missing(needs)),
        }
    }

    #[must_use]
    pub fn missing(&self, needs: &'static str) -> Error {
        Error::MissingCrossDependency {
            code: self.code.clone(),
            needs,
        }
    }

    #[must_use]
    pub fn invalid(&self, reason: impl Into<String>) -> Error {
        Error::InvalidDataset {
            code: self.code.clone(),
            reason: reason.into(),
        }
    }
}

pub type DecodeFn = fn(&DatasetInput) -> Result<Record>;

#[derive(Clone, Copy)]
pub enum Handling {
    Decode(DecodeFn),
    /// Recognized, but carries nothing decoded here.
    Skip,
}

pub struct DatasetEntry {
    pub code: DatasetCode,
    pub name: &'static str,
    pub pass: Pass,
    pub handling: Handling,
}

impl DatasetEntry {
    #[must_use]
    pub const fn new(code: DatasetCode, name: &'static str, pass: Pass, handling: Handling) -> Self {
        Self {
            code,
            name,
            pass,
            handling,
        }
    }
}

impl fmt::Debug for DatasetEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasetEntry")
            .field("code", &self.code)
            .field("name", &self.name)
            .field("pass", &self.pass)
            .finish_non_exhaustive()
    }
}

/// Maps dataset codes for one format to their decoders.
pub struct DatasetRegistry {
    entries: &'static [DatasetEntry],
}

impl DatasetRegistry {
    #[must_use]
    pub fn new(format: Format) -> Self {
        let entries = match format {
            Format::Rtb => rtb::DATASETS,
            Format::Pd0 => pd0::DATASETS,
        };
        Self { entries }
    }

    #[must_use]
    pub fn lookup(&self, code: &DatasetCode) -> Option<&'static DatasetEntry> {
        self.entries.iter().find(|e| &e.code == code)
    }

    pub fn entries(&self) -> impl Iterator<Item = &'static DatasetEntry> {
        self.entries.iter()
    }
}

/// Frame header common to both formats.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameHeader {
    pub format: Format,
    /// Ensemble number, when the frame header carries one.
    pub ensemble_number: Option<u32>,
    pub payload_size: usize,
    /// Dataset offsets into the payload, in frame order. Each is less than
    /// `payload_size`.
    pub offsets: Vec<usize>,
}

impl FrameHeader {
    #[must_use]
    pub fn dataset_count(&self) -> usize {
        self.offsets.len()
    }
}

/// A dataset found in a frame, ready for dispatch.
#[derive(Clone, Debug)]
pub struct Located<'a> {
    pub code: DatasetCode,
    /// Frame offset of the dataset.
    pub offset: usize,
    pub cursor: ByteCursor<'a>,
    pub shape: Option<Shape>,
    pub value_type: Option<i32>,
}

/// Decodes single, already framed, ensembles.
pub struct EnsembleDecoder {
    format: Format,
    registry: DatasetRegistry,
}

impl EnsembleDecoder {
    #[must_use]
    pub fn new(format: Format) -> Self {
        Self {
            format,
            registry: DatasetRegistry::new(format),
        }
    }

    #[must_use]
    pub fn format(&self) -> Format {
        self.format
    }

    /// Verify and decode one complete frame, marker through checksum.
    ///
    /// Problems confined to a single dataset do not fail the ensemble; the dataset is
    /// skipped and the problem returned in [DecodedEnsemble::warnings].
    ///
    /// # Errors
    /// [Error::ChecksumMismatch] if verification fails, [Error::IncompleteFrame] if
    /// `frame` is too short to carry a checksum, or any error reading the frame header.
    pub fn decode(&self, frame: &[u8]) -> Result<DecodedEnsemble> {
        let checksum =
            self.format
                .verifier()
                .compute(frame)
                .ok_or(Error::IncompleteFrame {
                    needed: self.format.header_len() + 4,
                    available: frame.len(),
                })?;
        if !checksum.is_valid() {
            return Err(Error::ChecksumMismatch {
                expected: checksum.expected,
                actual: checksum.actual,
            });
        }

        let (header, located, mut warnings) = match self.format {
            Format::Rtb => {
                let (header, located, err) = rtb::locate(frame)?;
                (header, located, err.into_iter().collect::<Vec<_>>())
            }
            Format::Pd0 => pd0::locate(frame)?,
        };
        trace!(
            ensemble = header.ensemble_number,
            datasets = header.dataset_count(),
            "decoding {} ensemble",
            self.format
        );

        let mut context = Context::default();
        let mut ensemble = Ensemble::new(self.format);
        for pass in [Pass::Leader, Pass::Measurement] {
            for loc in &located {
                let Some(entry) = self.registry.lookup(&loc.code) else {
                    if pass == Pass::Leader {
                        debug!(code = %loc.code, offset = loc.offset, "unknown dataset");
                        warnings.push(Error::UnknownDatasetCode {
                            code: loc.code.clone(),
                            offset: loc.offset,
                        });
                    }
                    continue;
                };
                if entry.pass != pass {
                    continue;
                }
                let Handling::Decode(decode) = entry.handling else {
                    trace!(code = %loc.code, "skipping {}", entry.name);
                    continue;
                };

                let input = DatasetInput {
                    code: &loc.code,
                    cursor: loc.cursor,
                    shape: loc.shape,
                    value_type: loc.value_type,
                    context: &context,
                };
                match decode(&input) {
                    Ok(record) => {
                        trace!(code = %loc.code, "decoded {}", entry.name);
                        if let Record::Nmea(nmea) = &record {
                            warnings.extend(nmea.errors());
                        }
                        context.absorb(&record);
                        ensemble.insert(record);
                    }
                    Err(err) => {
                        debug!(code = %loc.code, "skipping {}: {err}", entry.name);
                        warnings.push(err);
                    }
                }
            }
        }

        Ok(DecodedEnsemble {
            ensemble,
            offset: None,
            warnings,
        })
    }
}
