//! Profiles, bottom track and the transformation matrix.
use ndarray::Array2;

use super::MAX_PROFILE_BEAMS;
use crate::ensemble::{
    Amplitude, Convention, Coordinate, Correlation, GoodPings, Matrix, Record, Velocity,
};
use crate::fields::{read_table, Field, Width};
use crate::prelude::*;
use crate::registry::{DatasetInput, Shape};

/// Bytes before the values of a profile, the dataset id.
const PROFILE_START: usize = 2;

fn profile_shape(input: &DatasetInput) -> Result<Shape> {
    let shape = input.shape("fixed leader")?;
    Ok(Shape {
        beams: shape.beams.min(MAX_PROFILE_BEAMS),
        bins: shape.bins,
    })
}

fn coordinate(input: &DatasetInput) -> Result<Coordinate> {
    input
        .context
        .coordinate
        .ok_or_else(|| input.missing("fixed leader"))
}

/// Values are cell-major on the wire.
fn read_cells(input: &DatasetInput, signed: bool) -> Result<Matrix> {
    let Shape { beams, bins } = profile_shape(input)?;
    let count = beams * bins;
    let values: Vec<f64> = if signed {
        input
            .cursor
            .le_array::<i16>(PROFILE_START, count)?
            .into_iter()
            .map(f64::from)
            .collect()
    } else {
        input
            .cursor
            .le_array::<u8>(PROFILE_START, count)?
            .into_iter()
            .map(f64::from)
            .collect()
    };
    let cells = Array2::from_shape_vec((bins, beams), values)
        .map_err(|err| input.invalid(err.to_string()))?;
    Ok(cells.reversed_axes().as_standard_layout().into_owned())
}

pub(crate) fn decode_velocity(input: &DatasetInput) -> Result<Record> {
    Ok(Velocity {
        coordinate: coordinate(input)?,
        convention: Convention::Pd0Compatible,
        values: read_cells(input, true)?,
    }
    .into())
}

pub(crate) fn decode_correlation(input: &DatasetInput) -> Result<Record> {
    Ok(Correlation {
        convention: Convention::Pd0Compatible,
        values: read_cells(input, false)?,
    }
    .into())
}

pub(crate) fn decode_intensity(input: &DatasetInput) -> Result<Record> {
    Ok(Amplitude {
        convention: Convention::Pd0Compatible,
        values: read_cells(input, false)?,
    }
    .into())
}

pub(crate) fn decode_percent_good(input: &DatasetInput) -> Result<Record> {
    Ok(GoodPings {
        coordinate: coordinate(input)?,
        convention: Convention::Pd0Compatible,
        values: read_cells(input, false)?,
    }
    .into())
}

/// 0x0600. Per-beam values are always reported for four beams.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Pd0BottomTrack {
    pub pings_per_ensemble: u16,
    pub delay_before_reacquire: u16,
    pub correlation_min: u8,
    pub amplitude_min: u8,
    pub percent_good_min: u8,
    pub mode: u8,
    /// mm/s.
    pub error_velocity_max: u16,
    /// cm, 24 bits.
    pub range: Vec<u32>,
    /// mm/s, in the fixed leader's coordinates.
    pub velocity: Vec<i16>,
    pub correlation: Vec<u8>,
    pub amplitude: Vec<u8>,
    pub percent_good: Vec<u8>,
    /// Reference layer minimum, near and far bounds, decimeters.
    pub reference_layer: (u16, u16, u16),
    pub reference_velocity: Vec<i16>,
    pub reference_correlation: Vec<u8>,
    pub reference_amplitude: Vec<u8>,
    pub reference_percent_good: Vec<u8>,
    /// Decimeters.
    pub max_depth: u16,
    pub rssi: Vec<u8>,
    pub gain: u8,
}

const BOTTOM_TRACK: [Field; 12] = [
    Field::new("pings_per_ensemble", 2, Width::U16),
    Field::new("delay_before_reacquire", 4, Width::U16),
    Field::new("correlation_min", 6, Width::U8),
    Field::new("amplitude_min", 7, Width::U8),
    Field::new("percent_good_min", 8, Width::U8),
    Field::new("mode", 9, Width::U8),
    Field::new("error_velocity_max", 10, Width::U16),
    Field::new("reference_layer_min", 44, Width::U16),
    Field::new("reference_layer_near", 46, Width::U16),
    Field::new("reference_layer_far", 48, Width::U16),
    Field::new("max_depth", 70, Width::U16),
    Field::new("gain", 76, Width::U8),
];

const BT_BEAMS: usize = 4;

pub(crate) fn decode_bottom_track(input: &DatasetInput) -> Result<Record> {
    let cur = &input.cursor;
    let [pings_per_ensemble, delay_before_reacquire, correlation_min, amplitude_min, percent_good_min, mode, error_velocity_max, ref_min, ref_near, ref_far, max_depth, gain] =
        read_table(cur, 0, &BOTTOM_TRACK)?;
    let bytes = |offset| cur.bytes(offset, BT_BEAMS).map(<[u8]>::to_vec);

    // Older firmware stops before the range MSBs.
    let range_msb = bytes(77).unwrap_or_else(|_| vec![0; BT_BEAMS]);
    let range = cur
        .le_array::<u16>(16, BT_BEAMS)?
        .into_iter()
        .zip(range_msb)
        .map(|(lsb, msb)| u32::from(lsb) + (u32::from(msb) << 16))
        .collect();

    Ok(Pd0BottomTrack {
        pings_per_ensemble: pings_per_ensemble as u16,
        delay_before_reacquire: delay_before_reacquire as u16,
        correlation_min: correlation_min as u8,
        amplitude_min: amplitude_min as u8,
        percent_good_min: percent_good_min as u8,
        mode: mode as u8,
        error_velocity_max: error_velocity_max as u16,
        range,
        velocity: cur.le_array(24, BT_BEAMS)?,
        correlation: bytes(32)?,
        amplitude: bytes(36)?,
        percent_good: bytes(40)?,
        reference_layer: (ref_min as u16, ref_near as u16, ref_far as u16),
        reference_velocity: cur.le_array(50, BT_BEAMS)?,
        reference_correlation: bytes(58)?,
        reference_amplitude: bytes(62)?,
        reference_percent_good: bytes(66)?,
        max_depth: max_depth as u16,
        rssi: bytes(72)?,
        gain: gain as u8,
    }
    .into())
}

/// 0x3200, instrument transformation matrix indexed `[axis, beam]`, scaled by 10000.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TransformationMatrix {
    pub values: Array2<i16>,
}

pub(crate) fn decode_transformation_matrix(input: &DatasetInput) -> Result<Record> {
    let values = input.cursor.le_array::<i16>(2, 16)?;
    let values =
        Array2::from_shape_vec((4, 4), values).map_err(|err| input.invalid(err.to_string()))?;
    Ok(TransformationMatrix { values }.into())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum VerticalProfileKind {
    /// mm/s, -32768 bad.
    Velocity,
    Correlation,
    Amplitude,
    PercentGood,
}

/// A vertical beam profile, one value per vertical cell.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct VerticalProfile {
    pub kind: VerticalProfileKind,
    pub values: Vec<f64>,
}

fn vertical(input: &DatasetInput, kind: VerticalProfileKind) -> Result<Record> {
    let cells = input
        .context
        .vertical_cells
        .ok_or_else(|| input.missing("vertical beam leader"))?;
    let values = match kind {
        VerticalProfileKind::Velocity => input
            .cursor
            .le_array::<i16>(PROFILE_START, cells)?
            .into_iter()
            .map(f64::from)
            .collect(),
        _ => input
            .cursor
            .le_array::<u8>(PROFILE_START, cells)?
            .into_iter()
            .map(f64::from)
            .collect(),
    };
    Ok(VerticalProfile { kind, values }.into())
}

pub(crate) fn decode_vertical_velocity(input: &DatasetInput) -> Result<Record> {
    vertical(input, VerticalProfileKind::Velocity)
}

pub(crate) fn decode_vertical_correlation(input: &DatasetInput) -> Result<Record> {
    vertical(input, VerticalProfileKind::Correlation)
}

pub(crate) fn decode_vertical_amplitude(input: &DatasetInput) -> Result<Record> {
    vertical(input, VerticalProfileKind::Amplitude)
}

pub(crate) fn decode_vertical_percent_good(input: &DatasetInput) -> Result<Record> {
    vertical(input, VerticalProfileKind::PercentGood)
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::bytes::ByteCursor;
    use crate::registry::{Context, DatasetCode};

    fn leader_context(beams: usize, bins: usize) -> Context {
        Context {
            bins: Some(bins),
            beams: Some(beams),
            pings: Some(1),
            coordinate: Some(Coordinate::Beam),
            vertical_cells: Some(3),
        }
    }

    fn decode(
        decoder: fn(&DatasetInput) -> Result<Record>,
        dat: &[u8],
        context: &Context,
    ) -> Result<Record> {
        let code = DatasetCode::Pd0(u16::from_le_bytes([dat[0], dat[1]]));
        decoder(&DatasetInput {
            code: &code,
            cursor: ByteCursor::new(dat),
            shape: None,
            value_type: None,
            context,
        })
    }

    #[test]
    fn test_velocity_is_cell_major() {
        let mut dat = vec![0x00, 0x01];
        // cell 0 beams 0..4, then cell 1
        for v in [1i16, 2, 3, 4, 10, 20, 30, -32768] {
            dat.extend_from_slice(&v.to_le_bytes());
        }
        let Record::Velocity(vel) = decode(decode_velocity, &dat, &leader_context(4, 2)).unwrap()
        else {
            panic!("expected velocity");
        };
        assert_eq!(vel.coordinate, Coordinate::Beam);
        assert_eq!(
            vel.values,
            array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0], [4.0, -32768.0]]
        );
        assert!(vel.is_bad(vel.values[[3, 1]]));
    }

    #[test]
    fn test_fifth_beam_is_not_profiled() {
        let mut dat = vec![0x00, 0x02];
        dat.extend(1u8..=8);
        let Record::Correlation(corr) =
            decode(decode_correlation, &dat, &leader_context(5, 2)).unwrap()
        else {
            panic!("expected correlation");
        };
        assert_eq!(corr.values.dim(), (4, 2));
        assert_eq!(corr.values.row(0).to_vec(), vec![1.0, 5.0]);
    }

    #[test]
    fn test_profile_without_fixed_leader() {
        let dat = [0x00, 0x03, 0, 0];
        let zult = decode(decode_intensity, &dat, &Context::default());
        assert!(
            matches!(zult, Err(Error::MissingCrossDependency { needs: "fixed leader", .. })),
            "{zult:?}"
        );
    }

    #[test]
    fn test_bottom_track_range() {
        let mut dat = vec![0u8; 81];
        dat[0..2].copy_from_slice(&0x0600u16.to_le_bytes());
        dat[2..4].copy_from_slice(&10u16.to_le_bytes());
        dat[16..18].copy_from_slice(&0x1234u16.to_le_bytes());
        dat[24..26].copy_from_slice(&(-250i16).to_le_bytes());
        dat[32] = 200;
        dat[77] = 2;
        let Record::Pd0BottomTrack(bt) =
            decode(decode_bottom_track, &dat, &Context::default()).unwrap()
        else {
            panic!("expected bottom track");
        };
        assert_eq!(bt.pings_per_ensemble, 10);
        assert_eq!(bt.range, vec![0x0002_1234, 0, 0, 0]);
        assert_eq!(bt.velocity[0], -250);
        assert_eq!(bt.correlation, vec![200, 0, 0, 0]);

        // without range MSBs
        let Record::Pd0BottomTrack(bt) =
            decode(decode_bottom_track, &dat[..77], &Context::default()).unwrap()
        else {
            panic!("expected bottom track");
        };
        assert_eq!(bt.range[0], 0x1234);
    }

    #[test]
    fn test_transformation_matrix() {
        let mut dat = vec![0x00, 0x32];
        for v in 0i16..16 {
            dat.extend_from_slice(&(v * 100).to_le_bytes());
        }
        let Record::TransformationMatrix(xform) =
            decode(decode_transformation_matrix, &dat, &Context::default()).unwrap()
        else {
            panic!("expected matrix");
        };
        assert_eq!(xform.values[[1, 2]], 600);
    }

    #[test]
    fn test_vertical_profiles() {
        let mut dat = vec![0x00, 0x0a];
        for v in [5i16, -5, -32768] {
            dat.extend_from_slice(&v.to_le_bytes());
        }
        let context = leader_context(4, 2);
        let Record::VerticalProfile(vel) = decode(decode_vertical_velocity, &dat, &context).unwrap()
        else {
            panic!("expected vertical profile");
        };
        assert_eq!(vel.kind, VerticalProfileKind::Velocity);
        assert_eq!(vel.values, vec![5.0, -5.0, -32768.0]);

        let zult = decode(decode_vertical_amplitude, &[0x00, 0x0c, 1, 2, 3], &Context::default());
        assert!(matches!(zult, Err(Error::MissingCrossDependency { .. })), "{zult:?}");
    }
}
