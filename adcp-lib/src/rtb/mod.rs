//! RTB ensembles.
//!
//! An RTB frame is a 32-byte header (delimiter, ensemble number, payload size and
//! their complements), a payload of self-describing datasets, and a 4-byte CRC. Each
//! dataset starts with six int32 words: value type, element count, element
//! multiplier, image, name length and an 8-byte name.
mod profile;
mod records;
mod tracking;

pub use profile::*;
pub use records::*;
pub use tracking::*;

use std::borrow::Cow;

use tracing::trace;

use crate::bytes::ByteCursor;
use crate::framing::RTB_HEADER_LEN;
use crate::integrity::RtbChecksum;
use crate::prelude::*;
use crate::registry::{DatasetCode, DatasetEntry, FrameHeader, Handling, Located, Pass, Shape};

/// Most datasets looked for in one ensemble.
pub const MAX_DATASETS: usize = 20;

/// Value type codes from the dataset header.
pub const TYPE_FLOAT: i32 = 10;
pub const TYPE_INT: i32 = 20;
pub const TYPE_BYTE: i32 = 50;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatasetHeader {
    pub value_type: i32,
    /// Element count, the bins of a profile.
    pub num_elements: usize,
    /// Element multiplier, the beams of a profile.
    pub element_multiplier: usize,
    pub image: i32,
    pub name_len: usize,
    pub name: String,
}

impl DatasetHeader {
    /// Header words before the name.
    const WORDS: usize = 5;

    /// Decode the dataset header at `offset`.
    ///
    /// # Errors
    /// [Error::OutOfBounds] if the header does not fit, [Error::InvalidDataset] for
    /// negative counts.
    pub fn decode(cur: &ByteCursor, offset: usize) -> Result<Self> {
        let words = cur.le_array::<i32>(offset, Self::WORDS)?;
        let name_len = usize::try_from(words[4]).ok();
        let name = cur.bytes(offset + Self::WORDS * 4, name_len.unwrap_or(0).min(8))?;
        let name = String::from_utf8_lossy(name)
            .trim_end_matches(['\0', ' '])
            .to_string();

        let invalid = |reason: &str| Error::InvalidDataset {
            code: DatasetCode::Rtb(Cow::Owned(name.clone())),
            reason: reason.to_string(),
        };
        let num_elements =
            usize::try_from(words[1]).map_err(|_| invalid("negative element count"))?;
        let element_multiplier =
            usize::try_from(words[2]).map_err(|_| invalid("negative element multiplier"))?;
        let name_len = name_len.ok_or_else(|| invalid("negative name length"))?;

        Ok(Self {
            value_type: words[0],
            num_elements,
            element_multiplier,
            image: words[3],
            name_len,
            name,
        })
    }

    /// Bytes per value: 1 for byte datasets, otherwise 4.
    #[must_use]
    pub fn value_width(&self) -> usize {
        if self.value_type == TYPE_BYTE {
            1
        } else {
            4
        }
    }

    /// Header length, i.e., offset of the first value relative to the dataset start.
    #[must_use]
    pub fn len(&self) -> usize {
        self.name_len + Self::WORDS * 4
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.num_elements == 0 || self.element_multiplier == 0
    }

    /// Whole dataset size, header included.
    #[must_use]
    pub fn size(&self) -> usize {
        self.num_elements
            .saturating_mul(self.element_multiplier)
            .saturating_mul(self.value_width())
            .saturating_add(self.len())
    }

    #[must_use]
    pub fn code(&self) -> DatasetCode {
        DatasetCode::Rtb(Cow::Owned(self.name.clone()))
    }
}

/// Walk the dataset table of a verified frame.
///
/// Returns the frame header, the located datasets and any problem that ended the
/// walk early. Datasets found before the problem are still returned.
pub(crate) fn locate(frame: &[u8]) -> Result<(FrameHeader, Vec<Located<'_>>, Option<Error>)> {
    let cur = ByteCursor::new(frame);
    let ensemble_number: u32 = cur.le(16)?;
    let payload_size = cur.le::<u32>(24)? as usize;
    let end = frame.len().saturating_sub(RtbChecksum::LEN);

    let mut header = FrameHeader {
        format: crate::framing::Format::Rtb,
        ensemble_number: Some(ensemble_number),
        payload_size,
        offsets: Vec::new(),
    };
    let mut located = Vec::new();
    let mut ptr = RTB_HEADER_LEN;

    for _ in 0..MAX_DATASETS {
        if ptr >= frame.len().saturating_sub(RtbChecksum::LEN + RTB_HEADER_LEN) {
            break;
        }
        let ds = match DatasetHeader::decode(&cur, ptr) {
            Ok(ds) => ds,
            Err(err) => return Ok((header, located, Some(err))),
        };
        let size = ds.size();
        if ptr + size > end {
            let err = Error::InvalidDataset {
                code: ds.code(),
                reason: format!("{size} byte dataset at {ptr} overruns payload"),
            };
            return Ok((header, located, Some(err)));
        }
        trace!(name = %ds.name, offset = ptr, size, "rtb dataset");

        header.offsets.push(ptr - RTB_HEADER_LEN);
        located.push(Located {
            code: ds.code(),
            offset: ptr,
            cursor: cur.sub(ptr + ds.len(), size - ds.len())?,
            shape: Some(Shape {
                beams: ds.element_multiplier,
                bins: ds.num_elements,
            }),
            value_type: Some(ds.value_type),
        });
        ptr += size;
    }

    Ok((header, located, None))
}

const fn tag(name: &'static str) -> DatasetCode {
    DatasetCode::Rtb(Cow::Borrowed(name))
}

/// Every RTB dataset tag this crate knows about.
#[rustfmt::skip]
pub static DATASETS: &[DatasetEntry] = &[
    DatasetEntry::new(tag("E000001"), "beam velocity", Pass::Measurement, Handling::Decode(decode_beam_velocity)),
    DatasetEntry::new(tag("E000002"), "instrument velocity", Pass::Measurement, Handling::Decode(decode_instrument_velocity)),
    DatasetEntry::new(tag("E000003"), "earth velocity", Pass::Measurement, Handling::Decode(decode_earth_velocity)),
    DatasetEntry::new(tag("E000004"), "amplitude", Pass::Measurement, Handling::Decode(decode_amplitude)),
    DatasetEntry::new(tag("E000005"), "correlation", Pass::Measurement, Handling::Decode(decode_correlation)),
    DatasetEntry::new(tag("E000006"), "good beam", Pass::Measurement, Handling::Decode(decode_good_beam)),
    DatasetEntry::new(tag("E000007"), "good earth", Pass::Measurement, Handling::Decode(decode_good_earth)),
    DatasetEntry::new(tag("E000008"), "ensemble data", Pass::Leader, Handling::Decode(decode_ensemble_data)),
    DatasetEntry::new(tag("E000009"), "ancillary", Pass::Leader, Handling::Decode(decode_ancillary)),
    DatasetEntry::new(tag("E000010"), "bottom track", Pass::Measurement, Handling::Decode(decode_bottom_track)),
    DatasetEntry::new(tag("E000011"), "nmea", Pass::Measurement, Handling::Decode(crate::nmea::decode_nmea)),
    DatasetEntry::new(tag("E000014"), "system setup", Pass::Leader, Handling::Decode(decode_system_setup)),
    DatasetEntry::new(tag("E000015"), "range tracking", Pass::Measurement, Handling::Decode(decode_range_tracking)),
    DatasetEntry::new(tag("E000016"), "gage height", Pass::Measurement, Handling::Decode(decode_gage_height)),
    DatasetEntry::new(tag("R000001"), "river bottom track", Pass::Measurement, Handling::Decode(decode_river_bottom_track)),
    DatasetEntry::new(tag("R000002"), "river timestamp", Pass::Measurement, Handling::Skip),
    DatasetEntry::new(tag("R000003"), "river moving boat", Pass::Measurement, Handling::Skip),
    DatasetEntry::new(tag("R000004"), "river station", Pass::Measurement, Handling::Skip),
    DatasetEntry::new(tag("R000005"), "river transect", Pass::Measurement, Handling::Skip),
    DatasetEntry::new(tag("R000006"), "river bottom track extension", Pass::Measurement, Handling::Skip),
];
