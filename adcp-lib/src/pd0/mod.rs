//! PD0 ensembles.
//!
//! A PD0 frame is a 6-byte header (`0x7f 0x7f`, byte count, spare, dataset count), a
//! table of u16 dataset offsets from the start of the frame, the datasets, and a
//! 2-byte sum. Each dataset begins with its u16 id.
mod leader;
mod records;

pub use leader::*;
pub use records::*;

use tracing::trace;

use crate::bytes::ByteCursor;
use crate::framing::{Format, PD0_HEADER_LEN};
use crate::integrity::Pd0Checksum;
use crate::prelude::*;
use crate::registry::{DatasetCode, DatasetEntry, FrameHeader, Handling, Located, Pass};

/// Profile beams; a fifth beam is reported in its own vertical beam datasets.
pub const MAX_PROFILE_BEAMS: usize = 4;

pub const FIXED_LEADER_ID: u16 = 0x0000;
pub const VARIABLE_LEADER_ID: u16 = 0x0080;
pub const VELOCITY_ID: u16 = 0x0100;
pub const CORRELATION_ID: u16 = 0x0200;
pub const INTENSITY_ID: u16 = 0x0300;
pub const PERCENT_GOOD_ID: u16 = 0x0400;
pub const BOTTOM_TRACK_ID: u16 = 0x0600;
pub const TRANSFORMATION_MATRIX_ID: u16 = 0x3200;
pub const VERTICAL_BEAM_LEADER_ID: u16 = 0x0f01;
pub const VERTICAL_VELOCITY_ID: u16 = 0x0a00;
pub const VERTICAL_CORRELATION_ID: u16 = 0x0b00;
pub const VERTICAL_AMPLITUDE_ID: u16 = 0x0c00;
pub const VERTICAL_PERCENT_GOOD_ID: u16 = 0x0d00;

/// Parse the header of a verified frame.
///
/// # Errors
/// [Error::OutOfBounds] if the offset table does not fit in the frame.
pub fn decode_header(frame: &[u8]) -> Result<FrameHeader> {
    let cur = ByteCursor::new(frame);
    let payload_size = usize::from(cur.le::<u16>(2)?);
    let count = usize::from(cur.le::<u8>(5)?);
    let offsets = cur
        .le_array::<u16>(PD0_HEADER_LEN, count)?
        .into_iter()
        .map(usize::from)
        .collect();
    Ok(FrameHeader {
        format: Format::Pd0,
        ensemble_number: None,
        payload_size,
        offsets,
    })
}

/// Locate each dataset of a verified frame.
///
/// A dataset extends to the next higher offset, or to the checksum for the last one.
/// Offsets pointing into the header or past the datasets are dropped from the header
/// and reported.
pub(crate) fn locate(frame: &[u8]) -> Result<(FrameHeader, Vec<Located<'_>>, Vec<Error>)> {
    let mut header = decode_header(frame)?;
    let cur = ByteCursor::new(frame);
    let table_end = PD0_HEADER_LEN + 2 * header.offsets.len();
    let end = frame.len().saturating_sub(Pd0Checksum::LEN);

    let mut warnings = Vec::new();
    header.offsets.retain(|&offset| {
        let ok = offset >= table_end && offset + 2 <= end && offset < header.payload_size;
        if !ok {
            warnings.push(Error::InvalidHeader(format!(
                "dataset offset {offset} outside {table_end}..{end}"
            )));
        }
        ok
    });

    let mut located = Vec::with_capacity(header.offsets.len());
    for &offset in &header.offsets {
        let stop = header
            .offsets
            .iter()
            .copied()
            .filter(|&o| o > offset)
            .min()
            .unwrap_or(end);
        let id: u16 = cur.le(offset)?;
        trace!(id, offset, len = stop - offset, "pd0 dataset");
        located.push(Located {
            code: DatasetCode::Pd0(id),
            offset,
            cursor: cur.sub(offset, stop - offset)?,
            shape: None,
            value_type: None,
        });
    }

    Ok((header, located, warnings))
}

const fn id(code: u16) -> DatasetCode {
    DatasetCode::Pd0(code)
}

/// Every PD0 dataset id this crate knows about.
#[rustfmt::skip]
pub static DATASETS: &[DatasetEntry] = &[
    DatasetEntry::new(id(FIXED_LEADER_ID), "fixed leader", Pass::Leader, Handling::Decode(decode_fixed_leader)),
    DatasetEntry::new(id(VARIABLE_LEADER_ID), "variable leader", Pass::Leader, Handling::Decode(decode_variable_leader)),
    DatasetEntry::new(id(VERTICAL_BEAM_LEADER_ID), "vertical beam leader", Pass::Leader, Handling::Decode(decode_vertical_beam_leader)),
    DatasetEntry::new(id(VELOCITY_ID), "velocity", Pass::Measurement, Handling::Decode(decode_velocity)),
    DatasetEntry::new(id(CORRELATION_ID), "correlation", Pass::Measurement, Handling::Decode(decode_correlation)),
    DatasetEntry::new(id(INTENSITY_ID), "echo intensity", Pass::Measurement, Handling::Decode(decode_intensity)),
    DatasetEntry::new(id(PERCENT_GOOD_ID), "percent good", Pass::Measurement, Handling::Decode(decode_percent_good)),
    DatasetEntry::new(id(BOTTOM_TRACK_ID), "bottom track", Pass::Measurement, Handling::Decode(decode_bottom_track)),
    DatasetEntry::new(id(TRANSFORMATION_MATRIX_ID), "transformation matrix", Pass::Measurement, Handling::Decode(decode_transformation_matrix)),
    DatasetEntry::new(id(VERTICAL_VELOCITY_ID), "vertical velocity", Pass::Measurement, Handling::Decode(decode_vertical_velocity)),
    DatasetEntry::new(id(VERTICAL_CORRELATION_ID), "vertical correlation", Pass::Measurement, Handling::Decode(decode_vertical_correlation)),
    DatasetEntry::new(id(VERTICAL_AMPLITUDE_ID), "vertical amplitude", Pass::Measurement, Handling::Decode(decode_vertical_amplitude)),
    DatasetEntry::new(id(VERTICAL_PERCENT_GOOD_ID), "vertical percent good", Pass::Measurement, Handling::Decode(decode_vertical_percent_good)),
    DatasetEntry::new(id(0x0500), "status", Pass::Measurement, Handling::Skip),
    DatasetEntry::new(id(0x0700), "undocumented 0x0700", Pass::Measurement, Handling::Skip),
    DatasetEntry::new(id(0x0800), "microcat", Pass::Measurement, Handling::Skip),
    DatasetEntry::new(id(0x7000), "v-series system configuration", Pass::Measurement, Handling::Skip),
    DatasetEntry::new(id(0x7001), "v-series ping setup", Pass::Measurement, Handling::Skip),
    DatasetEntry::new(id(0x7002), "v-series adc", Pass::Measurement, Handling::Skip),
    DatasetEntry::new(id(0x7003), "v-series features", Pass::Measurement, Handling::Skip),
    DatasetEntry::new(id(0x7004), "v-series event log", Pass::Measurement, Handling::Skip),
    DatasetEntry::new(id(0x000b), "wave parameters", Pass::Measurement, Handling::Skip),
    DatasetEntry::new(id(0x000c), "wave sea and swell", Pass::Measurement, Handling::Skip),
];
