//! Bottom track, range tracking and river bottom track records.
//!
//! These datasets are flat float arrays whose per-beam sections are sized by a beam
//! count read from the payload itself.
use crate::ensemble::{Convention, Record};
use crate::fields::{read_table, table_len, Field};
use crate::prelude::*;
use crate::registry::DatasetInput;

/// Scalar words before the per-beam sections of a bottom track dataset.
const BT_SCALARS: usize = 14;
/// Per-beam sections in a bottom track dataset.
const BT_BEAM_GROUPS: usize = 15;

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PulseCoherent {
    pub snr: Vec<f64>,
    pub amplitude: Vec<f64>,
    pub velocity: Vec<f64>,
    pub noise: Vec<f64>,
    pub correlation: Vec<f64>,
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BottomTrackAdcp3 {
    pub hs1_temp: f64,
    pub hs2_temp: f64,
    pub rcv1_temp: f64,
    pub rcv2_temp: f64,
    pub vinf: f64,
    pub vg: f64,
    pub vt: f64,
    pub vtl: f64,
    pub d3v3: f64,
    pub sounder_range: f64,
    pub sounder_snr: f64,
    pub sounder_amp: f64,
}

// Offsets relative to the end of the per-beam sections
const BT_ADCP3: [Field; 12] = [
    Field::f32_word("hs1_temp", 1),
    Field::f32_word("hs2_temp", 2),
    Field::f32_word("rcv1_temp", 3),
    Field::f32_word("rcv2_temp", 4),
    Field::f32_word("vinf", 5),
    Field::f32_word("vg", 6),
    Field::f32_word("vt", 7),
    Field::f32_word("vtl", 8),
    Field::f32_word("d3v3", 9),
    Field::f32_word("sounder_range", 11),
    Field::f32_word("sounder_snr", 12),
    Field::f32_word("sounder_amp", 13),
];

/// E000010.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BottomTrack {
    pub convention: Convention,
    pub first_ping_time: f64,
    pub last_ping_time: f64,
    pub heading: f64,
    pub pitch: f64,
    pub roll: f64,
    pub water_temp: f64,
    pub system_temp: f64,
    pub salinity: f64,
    /// Pascals natively, decibars for PD0.
    pub pressure: f64,
    /// Meters natively, decimeters for PD0.
    pub transducer_depth: f64,
    pub speed_of_sound: f64,
    pub status: f64,
    pub num_beams: usize,
    pub actual_ping_count: f64,
    /// Meters natively, centimeters for PD0.
    pub range: Vec<f64>,
    pub snr: Vec<f64>,
    pub amplitude: Vec<f64>,
    pub correlation: Vec<f64>,
    pub beam_velocity: Vec<f64>,
    pub beam_good: Vec<f64>,
    pub instrument_velocity: Vec<f64>,
    pub instrument_good: Vec<f64>,
    pub earth_velocity: Vec<f64>,
    pub earth_good: Vec<f64>,
    pub pulse_coherent: PulseCoherent,
    pub adcp3: Option<BottomTrackAdcp3>,
}

const BOTTOM_TRACK: [Field; BT_SCALARS] = [
    Field::f32_word("first_ping_time", 0),
    Field::f32_word("last_ping_time", 1),
    Field::f32_word("heading", 2),
    Field::f32_word("pitch", 3),
    Field::f32_word("roll", 4),
    Field::f32_word("water_temp", 5),
    Field::f32_word("system_temp", 6),
    Field::f32_word("salinity", 7),
    Field::f32_word("pressure", 8),
    Field::f32_word("transducer_depth", 9),
    Field::f32_word("speed_of_sound", 10),
    Field::f32_word("status", 11),
    Field::f32_word("num_beams", 12),
    Field::f32_word("actual_ping_count", 13),
];

/// Read `groups` consecutive per-beam sections of `beams` floats starting at word
/// `first`.
fn beam_groups(
    input: &DatasetInput,
    first: usize,
    groups: usize,
    beams: usize,
) -> Result<Vec<Vec<f64>>> {
    (0..groups)
        .map(|g| {
            Ok(input
                .cursor
                .le_array::<f32>((first + g * beams) * 4, beams)?
                .into_iter()
                .map(f64::from)
                .collect())
        })
        .collect()
}

fn beam_count(input: &DatasetInput, raw: f64) -> Result<usize> {
    if !(0.0..=f64::from(u8::MAX)).contains(&raw) {
        return Err(input.invalid(format!("implausible beam count {raw}")));
    }
    Ok(raw as usize)
}

pub(crate) fn decode_bottom_track(input: &DatasetInput) -> Result<Record> {
    let [first_ping_time, last_ping_time, heading, pitch, roll, water_temp, system_temp, salinity, pressure, transducer_depth, speed_of_sound, status, num_beams, actual_ping_count] =
        read_table(&input.cursor, 0, &BOTTOM_TRACK)?;
    let num_beams = beam_count(input, num_beams)?;

    let groups = beam_groups(input, BT_SCALARS, BT_BEAM_GROUPS, num_beams)?;
    let Ok(
        [range, snr, amplitude, correlation, beam_velocity, beam_good, instrument_velocity, instrument_good, earth_velocity, earth_good, pc_snr, pc_amplitude, pc_velocity, pc_noise, pc_correlation],
    ) = <[Vec<f64>; BT_BEAM_GROUPS]>::try_from(groups)
    else {
        return Err(input.invalid("bottom track beam sections"));
    };

    let extension = BT_SCALARS + BT_BEAM_GROUPS * num_beams;
    let elements = input.shape.map_or(0, |s| s.bins);
    let fits = input.cursor.len() >= extension * 4 + table_len(&BT_ADCP3);
    let adcp3 = if elements > extension && fits {
        let [hs1_temp, hs2_temp, rcv1_temp, rcv2_temp, vinf, vg, vt, vtl, d3v3, sounder_range, sounder_snr, sounder_amp] =
            read_table(&input.cursor, extension * 4, &BT_ADCP3)?;
        Some(BottomTrackAdcp3 {
            hs1_temp,
            hs2_temp,
            rcv1_temp,
            rcv2_temp,
            vinf,
            vg,
            vt,
            vtl,
            d3v3,
            sounder_range,
            sounder_snr,
            sounder_amp,
        })
    } else {
        None
    };

    Ok(BottomTrack {
        convention: Convention::Native,
        first_ping_time,
        last_ping_time,
        heading,
        pitch,
        roll,
        water_temp,
        system_temp,
        salinity,
        pressure,
        transducer_depth,
        speed_of_sound,
        status,
        num_beams,
        actual_ping_count,
        range,
        snr,
        amplitude,
        correlation,
        beam_velocity,
        beam_good,
        instrument_velocity,
        instrument_good,
        earth_velocity,
        earth_good,
        pulse_coherent: PulseCoherent {
            snr: pc_snr,
            amplitude: pc_amplitude,
            velocity: pc_velocity,
            noise: pc_noise,
            correlation: pc_correlation,
        },
        adcp3,
    }
    .into())
}

/// E000015.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RangeTracking {
    pub num_beams: usize,
    pub snr: Vec<f64>,
    pub range: Vec<f64>,
    pub pings: Vec<f64>,
    pub amplitude: Vec<f64>,
    pub correlation: Vec<f64>,
    pub beam_velocity: Vec<f64>,
    pub instrument_velocity: Vec<f64>,
    pub earth_velocity: Vec<f64>,
}

pub(crate) fn decode_range_tracking(input: &DatasetInput) -> Result<Record> {
    let num_beams = beam_count(input, f64::from(input.cursor.le::<f32>(0)?))?;
    let groups = beam_groups(input, 1, 8, num_beams)?;
    let Ok([snr, range, pings, amplitude, correlation, beam_velocity, instrument_velocity, earth_velocity]) =
        <[Vec<f64>; 8]>::try_from(groups)
    else {
        return Err(input.invalid("range tracking beam sections"));
    };

    Ok(RangeTracking {
        num_beams,
        snr,
        range,
        pings,
        amplitude,
        correlation,
        beam_velocity,
        instrument_velocity,
        earth_velocity,
    }
    .into())
}

/// R000001, bottom track summary for each river subsystem. Each field holds one value
/// per subsystem.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RiverBottomTrack {
    pub num_subsystems: usize,
    pub ping_count: Vec<f64>,
    pub status: Vec<f64>,
    pub beams: Vec<f64>,
    pub nce: Vec<f64>,
    pub repeats_n: Vec<f64>,
    pub cpce: Vec<f64>,
    pub bb: Vec<f64>,
    pub ll: Vec<f64>,
    pub beam_mux: Vec<f64>,
    pub nb: Vec<f64>,
    pub ping_sec: Vec<f64>,
    pub heading: Vec<f64>,
    pub pitch: Vec<f64>,
    pub roll: Vec<f64>,
    pub water_temp: Vec<f64>,
    pub backplane_temp: Vec<f64>,
    pub salinity: Vec<f64>,
    pub pressure: Vec<f64>,
    pub depth: Vec<f64>,
    pub speed_of_sound: Vec<f64>,
    pub mx: Vec<f64>,
    pub my: Vec<f64>,
    pub mz: Vec<f64>,
    pub gp: Vec<f64>,
    pub gr: Vec<f64>,
    pub gz: Vec<f64>,
    pub samples_per_sec: Vec<f64>,
    pub system_freq_hz: Vec<f64>,
    pub bt_range: Vec<f64>,
    pub bt_snr: Vec<f64>,
    pub bt_amp: Vec<f64>,
    pub bt_noise_amp_bp: Vec<f64>,
    pub bt_noise_amp_fp: Vec<f64>,
    pub bt_corr: Vec<f64>,
    pub vel: Vec<f64>,
    pub beam_n: Vec<f64>,
}

const RIVER_BT_GROUPS: usize = 36;

pub(crate) fn decode_river_bottom_track(input: &DatasetInput) -> Result<Record> {
    let num_subsystems = beam_count(input, f64::from(input.cursor.le::<f32>(0)?))?;
    let groups = beam_groups(input, 1, RIVER_BT_GROUPS, num_subsystems)?;
    let Ok(
        [ping_count, status, beams, nce, repeats_n, cpce, bb, ll, beam_mux, nb, ping_sec, heading, pitch, roll, water_temp, backplane_temp, salinity, pressure, depth, speed_of_sound, mx, my, mz, gp, gr, gz, samples_per_sec, system_freq_hz, bt_range, bt_snr, bt_amp, bt_noise_amp_bp, bt_noise_amp_fp, bt_corr, vel, beam_n],
    ) = <[Vec<f64>; RIVER_BT_GROUPS]>::try_from(groups)
    else {
        return Err(input.invalid("river bottom track subsystem sections"));
    };

    Ok(RiverBottomTrack {
        num_subsystems,
        ping_count,
        status,
        beams,
        nce,
        repeats_n,
        cpce,
        bb,
        ll,
        beam_mux,
        nb,
        ping_sec,
        heading,
        pitch,
        roll,
        water_temp,
        backplane_temp,
        salinity,
        pressure,
        depth,
        speed_of_sound,
        mx,
        my,
        mz,
        gp,
        gr,
        gz,
        samples_per_sec,
        system_freq_hz,
        bt_range,
        bt_snr,
        bt_amp,
        bt_noise_amp_bp,
        bt_noise_amp_fp,
        bt_corr,
        vel,
        beam_n,
    }
    .into())
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use super::*;
    use crate::bytes::ByteCursor;
    use crate::registry::{Context, DatasetCode, Shape};

    fn input<'a>(
        code: &'a DatasetCode,
        dat: &'a [u8],
        elements: usize,
        context: &'a Context,
    ) -> DatasetInput<'a> {
        DatasetInput {
            code,
            cursor: ByteCursor::new(dat),
            shape: Some(Shape {
                beams: 1,
                bins: elements,
            }),
            value_type: Some(crate::rtb::TYPE_FLOAT),
            context,
        }
    }

    fn bottom_track_words(beams: usize, extra: usize) -> Vec<f32> {
        let mut words = vec![0f32; BT_SCALARS + BT_BEAM_GROUPS * beams + extra];
        words[4] = -120.0; // roll
        words[12] = beams as f32;
        words[13] = 10.0; // pings
        for g in 0..BT_BEAM_GROUPS {
            for b in 0..beams {
                words[BT_SCALARS + g * beams + b] = (g * 10 + b) as f32;
            }
        }
        words
    }

    #[test]
    fn test_bottom_track_sections() {
        let words = bottom_track_words(4, 0);
        let dat: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        let code = DatasetCode::Rtb(Cow::Borrowed("E000010"));
        let context = Context::default();
        let Record::BottomTrack(bt) =
            decode_bottom_track(&input(&code, &dat, words.len(), &context)).expect("should decode")
        else {
            panic!("expected bottom track");
        };
        assert_eq!(bt.num_beams, 4);
        assert_eq!(bt.roll, -120.0);
        assert_eq!(bt.range, vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(bt.beam_velocity, vec![40.0, 41.0, 42.0, 43.0]);
        assert_eq!(bt.earth_good, vec![90.0, 91.0, 92.0, 93.0]);
        assert_eq!(bt.pulse_coherent.correlation, vec![140.0, 141.0, 142.0, 143.0]);
        assert!(bt.adcp3.is_none());
    }

    #[test]
    fn test_bottom_track_adcp3_single_beam() {
        let mut words = bottom_track_words(1, 14);
        let ext = BT_SCALARS + BT_BEAM_GROUPS;
        words[ext + 1] = 21.5;
        words[ext + 13] = 7.0;
        let dat: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        let code = DatasetCode::Rtb(Cow::Borrowed("E000010"));
        let context = Context::default();
        let Record::BottomTrack(bt) =
            decode_bottom_track(&input(&code, &dat, words.len(), &context)).unwrap()
        else {
            panic!("expected bottom track");
        };
        let adcp3 = bt.adcp3.expect("extension present");
        assert_eq!(adcp3.hs1_temp, 21.5);
        assert_eq!(adcp3.sounder_amp, 7.0);
    }

    #[test]
    fn test_range_tracking_offsets() {
        let mut words = vec![2f32];
        words.extend((0..16u8).map(f32::from));
        let dat: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        let code = DatasetCode::Rtb(Cow::Borrowed("E000015"));
        let context = Context::default();
        let Record::RangeTracking(rt) =
            decode_range_tracking(&input(&code, &dat, words.len(), &context)).unwrap()
        else {
            panic!("expected range tracking");
        };
        assert_eq!(rt.num_beams, 2);
        assert_eq!(rt.snr, vec![0.0, 1.0]);
        assert_eq!(rt.range, vec![2.0, 3.0]);
        assert_eq!(rt.earth_velocity, vec![14.0, 15.0]);
    }

    #[test]
    fn test_river_bottom_track() {
        let mut words = vec![1f32];
        words.extend((0..36u8).map(f32::from));
        let dat: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        let code = DatasetCode::Rtb(Cow::Borrowed("R000001"));
        let context = Context::default();
        let Record::RiverBottomTrack(river) =
            decode_river_bottom_track(&input(&code, &dat, words.len(), &context)).unwrap()
        else {
            panic!("expected river bottom track");
        };
        assert_eq!(river.num_subsystems, 1);
        assert_eq!(river.ping_count, vec![0.0]);
        assert_eq!(river.system_freq_hz, vec![27.0]);
        assert_eq!(river.beam_n, vec![35.0]);
    }

    #[test]
    fn test_implausible_beam_count() {
        let dat: Vec<u8> = [-3f32].iter().flat_map(|w| w.to_le_bytes()).collect();
        let code = DatasetCode::Rtb(Cow::Borrowed("E000015"));
        let context = Context::default();
        let zult = decode_range_tracking(&input(&code, &dat, 1, &context));
        assert!(matches!(zult, Err(Error::InvalidDataset { .. })), "{zult:?}");
    }
}
