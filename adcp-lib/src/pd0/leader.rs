//! Fixed, variable and vertical beam leaders. Values are kept in their wire units.
use crate::ensemble::{Coordinate, Record};
use crate::fields::{read_table, Field, Width};
use crate::prelude::*;
use crate::registry::DatasetInput;

/// System frequencies in kHz, indexed by the low 3 bits of the configuration LSB.
const FREQUENCIES_KHZ: [u16; 6] = [75, 150, 300, 600, 1200, 2400];
/// Beam angles in degrees, indexed by the low 3 bits of the configuration MSB.
const BEAM_ANGLES: [u8; 8] = [15, 20, 30, 0, 0, 0, 0, 25];

/// Decoded system configuration word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SystemConfiguration {
    /// `None` for a frequency code outside the known set.
    pub frequency_khz: Option<u16>,
    pub convex: bool,
    pub sensor_config: u8,
    pub head_attached: bool,
    pub upward: bool,
    pub beam_angle: u8,
    /// 4 is a 4-beam janus, 5 and 15 are 5-beam janus configurations.
    pub beam_config: u8,
}

impl SystemConfiguration {
    #[must_use]
    pub fn from_bytes(lsb: u8, msb: u8) -> Self {
        Self {
            frequency_khz: FREQUENCIES_KHZ.get(usize::from(lsb & 0x07)).copied(),
            convex: lsb & 0x08 != 0,
            sensor_config: ((lsb >> 4) & 0x03) + 1,
            head_attached: lsb & 0x40 != 0,
            upward: lsb & 0x80 != 0,
            beam_angle: BEAM_ANGLES[usize::from(msb & 0x07)],
            beam_config: msb >> 4,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CoordinateTransform {
    pub coordinate: Coordinate,
    pub tilts_used: bool,
    pub three_beam_used: bool,
    pub bin_mapping_used: bool,
}

impl From<u8> for CoordinateTransform {
    fn from(val: u8) -> Self {
        let coordinate = match (val >> 3) & 0x03 {
            0 => Coordinate::Beam,
            1 => Coordinate::Instrument,
            2 => Coordinate::Ship,
            _ => Coordinate::Earth,
        };
        Self {
            coordinate,
            tilts_used: val & 0x04 != 0,
            three_beam_used: val & 0x02 != 0,
            bin_mapping_used: val & 0x01 != 0,
        }
    }
}

/// 0x0000.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FixedLeader {
    pub cpu_firmware_version: u8,
    pub cpu_firmware_revision: u8,
    pub system_config: SystemConfiguration,
    pub simulated: bool,
    pub lag_length: u8,
    pub num_beams: u8,
    pub num_cells: u8,
    pub pings_per_ensemble: u16,
    pub cell_length_cm: u16,
    pub blank_cm: u16,
    pub profiling_mode: u8,
    pub low_correlation_threshold: u8,
    pub code_repeats: u8,
    pub percent_good_min: u8,
    /// mm/s.
    pub error_velocity_max: u16,
    pub time_between_pings: (u8, u8, u8),
    pub coordinate: Coordinate,
    pub transform: CoordinateTransform,
    /// 0.01 degrees.
    pub heading_alignment: i16,
    /// 0.01 degrees.
    pub heading_bias: i16,
    pub sensor_source: u8,
    pub sensors_available: u8,
    pub bin1_distance_cm: u16,
    pub transmit_pulse_length_cm: u16,
    pub reference_layer: (u8, u8),
    pub false_target_threshold: u8,
    pub transmit_lag_distance_cm: u16,
    /// Lowercase hex; absent in leaders from older firmware.
    pub cpu_serial: Option<String>,
    pub system_bandwidth: Option<u16>,
    pub system_power: Option<u8>,
    pub base_frequency_index: Option<u8>,
}

const FIXED_LEADER: [Field; 28] = [
    Field::new("cpu_firmware_version", 2, Width::U8),
    Field::new("cpu_firmware_revision", 3, Width::U8),
    Field::new("system_config_lsb", 4, Width::U8),
    Field::new("system_config_msb", 5, Width::U8),
    Field::new("simulated", 6, Width::U8),
    Field::new("lag_length", 7, Width::U8),
    Field::new("num_beams", 8, Width::U8),
    Field::new("num_cells", 9, Width::U8),
    Field::new("pings_per_ensemble", 10, Width::U16),
    Field::new("cell_length_cm", 12, Width::U16),
    Field::new("blank_cm", 14, Width::U16),
    Field::new("profiling_mode", 16, Width::U8),
    Field::new("low_correlation_threshold", 17, Width::U8),
    Field::new("code_repeats", 18, Width::U8),
    Field::new("percent_good_min", 19, Width::U8),
    Field::new("error_velocity_max", 20, Width::U16),
    Field::new("tpp_minutes", 22, Width::U8),
    Field::new("tpp_seconds", 23, Width::U8),
    Field::new("tpp_hundredths", 24, Width::U8),
    Field::new("coordinate_transform", 25, Width::U8),
    Field::new("heading_alignment", 26, Width::I16),
    Field::new("heading_bias", 28, Width::I16),
    Field::new("sensor_source", 30, Width::U8),
    Field::new("sensors_available", 31, Width::U8),
    Field::new("bin1_distance_cm", 32, Width::U16),
    Field::new("transmit_pulse_length_cm", 34, Width::U16),
    Field::new("reference_layer_start", 36, Width::U8),
    Field::new("reference_layer_end", 37, Width::U8),
];

pub(crate) fn decode_fixed_leader(input: &DatasetInput) -> Result<Record> {
    let cur = &input.cursor;
    let [version, revision, lsb, msb, simulated, lag_length, num_beams, num_cells, pings_per_ensemble, cell_length_cm, blank_cm, profiling_mode, low_correlation_threshold, code_repeats, percent_good_min, error_velocity_max, tpp_minutes, tpp_seconds, tpp_hundredths, transform, heading_alignment, heading_bias, sensor_source, sensors_available, bin1_distance_cm, transmit_pulse_length_cm, ref_start, ref_end] =
        read_table(cur, 0, &FIXED_LEADER)?;
    let false_target_threshold: u8 = cur.le(38)?;
    let transmit_lag_distance_cm: u16 = cur.le(40)?;

    let cpu_serial = cur
        .bytes(42, 8)
        .ok()
        .map(|b| b.iter().map(|x| format!("{x:02x}")).collect::<String>());
    let transform = CoordinateTransform::from(transform as u8);

    Ok(FixedLeader {
        cpu_firmware_version: version as u8,
        cpu_firmware_revision: revision as u8,
        system_config: SystemConfiguration::from_bytes(lsb as u8, msb as u8),
        simulated: simulated != 0.0,
        lag_length: lag_length as u8,
        num_beams: num_beams as u8,
        num_cells: num_cells as u8,
        pings_per_ensemble: pings_per_ensemble as u16,
        cell_length_cm: cell_length_cm as u16,
        blank_cm: blank_cm as u16,
        profiling_mode: profiling_mode as u8,
        low_correlation_threshold: low_correlation_threshold as u8,
        code_repeats: code_repeats as u8,
        percent_good_min: percent_good_min as u8,
        error_velocity_max: error_velocity_max as u16,
        time_between_pings: (tpp_minutes as u8, tpp_seconds as u8, tpp_hundredths as u8),
        coordinate: transform.coordinate,
        transform,
        heading_alignment: heading_alignment as i16,
        heading_bias: heading_bias as i16,
        sensor_source: sensor_source as u8,
        sensors_available: sensors_available as u8,
        bin1_distance_cm: bin1_distance_cm as u16,
        transmit_pulse_length_cm: transmit_pulse_length_cm as u16,
        reference_layer: (ref_start as u8, ref_end as u8),
        false_target_threshold,
        transmit_lag_distance_cm,
        cpu_serial,
        system_bandwidth: cur.le(50).ok(),
        system_power: cur.le(52).ok(),
        base_frequency_index: cur.le(53).ok(),
    }
    .into())
}

/// Real time clock. The leader's clock has a two-digit year.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Rtc {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub hundredths: u8,
}

/// 0x0080.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct VariableLeader {
    pub ensemble_number: u32,
    pub rtc: Rtc,
    pub bit_result: u16,
    /// m/s.
    pub speed_of_sound: u16,
    /// Decimeters.
    pub transducer_depth: u16,
    /// 0.01 degrees.
    pub heading: u16,
    /// 0.01 degrees.
    pub pitch: i16,
    /// 0.01 degrees.
    pub roll: i16,
    /// ppt.
    pub salinity: u16,
    /// 0.01 C.
    pub temperature: i16,
    pub min_ping_time: (u8, u8, u8),
    pub heading_std_dev: u8,
    /// 0.1 degrees.
    pub pitch_std_dev: u8,
    /// 0.1 degrees.
    pub roll_std_dev: u8,
    pub adc: [u8; 8],
    pub error_status: u32,
    /// Decapascals.
    pub pressure: Option<u32>,
    pub pressure_variance: Option<u32>,
    /// Four digit year clock, absent in leaders from older firmware.
    pub y2k_rtc: Option<Rtc>,
}

const VARIABLE_LEADER: [Field; 24] = [
    Field::new("ensemble_number", 2, Width::U16),
    Field::new("year", 4, Width::U8),
    Field::new("month", 5, Width::U8),
    Field::new("day", 6, Width::U8),
    Field::new("hour", 7, Width::U8),
    Field::new("minute", 8, Width::U8),
    Field::new("second", 9, Width::U8),
    Field::new("hundredths", 10, Width::U8),
    Field::new("ensemble_msb", 11, Width::U8),
    Field::new("bit_result", 12, Width::U16),
    Field::new("speed_of_sound", 14, Width::U16),
    Field::new("transducer_depth", 16, Width::U16),
    Field::new("heading", 18, Width::U16),
    Field::new("pitch", 20, Width::I16),
    Field::new("roll", 22, Width::I16),
    Field::new("salinity", 24, Width::U16),
    Field::new("temperature", 26, Width::I16),
    Field::new("mpt_minutes", 28, Width::U8),
    Field::new("mpt_seconds", 29, Width::U8),
    Field::new("mpt_hundredths", 30, Width::U8),
    Field::new("heading_std_dev", 31, Width::U8),
    Field::new("pitch_std_dev", 32, Width::U8),
    Field::new("roll_std_dev", 33, Width::U8),
    Field::new("error_status", 42, Width::U32),
];

pub(crate) fn decode_variable_leader(input: &DatasetInput) -> Result<Record> {
    let cur = &input.cursor;
    let [ensemble_number, year, month, day, hour, minute, second, hundredths, ensemble_msb, bit_result, speed_of_sound, transducer_depth, heading, pitch, roll, salinity, temperature, mpt_minutes, mpt_seconds, mpt_hundredths, heading_std_dev, pitch_std_dev, roll_std_dev, error_status] =
        read_table(cur, 0, &VARIABLE_LEADER)?;
    let adc: [u8; 8] = cur
        .bytes(34, 8)?
        .try_into()
        .map_err(|_| input.invalid("adc channels"))?;

    let y2k_rtc = match cur.bytes(57, 8) {
        Ok(b) => Some(Rtc {
            year: u16::from(b[0]) * 100 + u16::from(b[1]),
            month: b[2],
            day: b[3],
            hour: b[4],
            minute: b[5],
            second: b[6],
            hundredths: b[7],
        }),
        Err(_) => None,
    };

    Ok(VariableLeader {
        ensemble_number: ensemble_number as u32 + ((ensemble_msb as u32) << 16),
        rtc: Rtc {
            year: year as u16,
            month: month as u8,
            day: day as u8,
            hour: hour as u8,
            minute: minute as u8,
            second: second as u8,
            hundredths: hundredths as u8,
        },
        bit_result: bit_result as u16,
        speed_of_sound: speed_of_sound as u16,
        transducer_depth: transducer_depth as u16,
        heading: heading as u16,
        pitch: pitch as i16,
        roll: roll as i16,
        salinity: salinity as u16,
        temperature: temperature as i16,
        min_ping_time: (mpt_minutes as u8, mpt_seconds as u8, mpt_hundredths as u8),
        heading_std_dev: heading_std_dev as u8,
        pitch_std_dev: pitch_std_dev as u8,
        roll_std_dev: roll_std_dev as u8,
        adc,
        error_status: error_status as u32,
        pressure: cur.le(48).ok(),
        pressure_variance: cur.le(52).ok(),
        y2k_rtc,
    }
    .into())
}

/// 0x0F01, leader for the fifth, vertical, beam.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct VerticalBeamLeader {
    pub num_cells: u16,
    pub pings: u16,
    pub cell_size_cm: u16,
    pub first_cell_range_cm: u16,
    /// 1 is low resolution, 2 is high resolution surface tracking.
    pub mode: u16,
    pub transmit_length_cm: u16,
    pub lag_length_cm: u16,
    pub code_elements: u16,
    pub ping_offset_time: Option<u16>,
}

const VERTICAL_BEAM_LEADER: [Field; 8] = [
    Field::new("num_cells", 2, Width::U16),
    Field::new("pings", 4, Width::U16),
    Field::new("cell_size_cm", 6, Width::U16),
    Field::new("first_cell_range_cm", 8, Width::U16),
    Field::new("mode", 10, Width::U16),
    Field::new("transmit_length_cm", 12, Width::U16),
    Field::new("lag_length_cm", 14, Width::U16),
    Field::new("code_elements", 16, Width::U16),
];

pub(crate) fn decode_vertical_beam_leader(input: &DatasetInput) -> Result<Record> {
    let [num_cells, pings, cell_size_cm, first_cell_range_cm, mode, transmit_length_cm, lag_length_cm, code_elements] =
        read_table(&input.cursor, 0, &VERTICAL_BEAM_LEADER)?.map(|v| v as u16);
    Ok(VerticalBeamLeader {
        num_cells,
        pings,
        cell_size_cm,
        first_cell_range_cm,
        mode,
        transmit_length_cm,
        lag_length_cm,
        code_elements,
        ping_offset_time: input.cursor.le(30).ok(),
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytes::ByteCursor;
    use crate::registry::{Context, DatasetCode};

    fn decode(decoder: fn(&DatasetInput) -> Result<Record>, id: u16, dat: &[u8]) -> Result<Record> {
        let code = DatasetCode::Pd0(id);
        let context = Context::default();
        decoder(&DatasetInput {
            code: &code,
            cursor: ByteCursor::new(dat),
            shape: None,
            value_type: None,
            context: &context,
        })
    }

    #[test]
    fn test_system_configuration() {
        // 300kHz, convex, sensor config 1, head attached, down; 20 degree 4-beam janus
        let cfg = SystemConfiguration::from_bytes(0b0100_1010, 0b0100_0001);
        assert_eq!(cfg.frequency_khz, Some(300));
        assert!(cfg.convex);
        assert_eq!(cfg.sensor_config, 1);
        assert!(cfg.head_attached);
        assert!(!cfg.upward);
        assert_eq!(cfg.beam_angle, 20);
        assert_eq!(cfg.beam_config, 4);

        let cfg = SystemConfiguration::from_bytes(0b1000_0111, 0b0000_0111);
        assert_eq!(cfg.frequency_khz, None);
        assert!(cfg.upward);
        assert_eq!(cfg.beam_angle, 25);
    }

    #[test]
    fn test_coordinate_transform() {
        let xform = CoordinateTransform::from(0b0001_1111);
        assert_eq!(xform.coordinate, Coordinate::Earth);
        assert!(xform.tilts_used && xform.three_beam_used && xform.bin_mapping_used);
        assert_eq!(CoordinateTransform::from(0b0000_1000).coordinate, Coordinate::Instrument);
        assert_eq!(CoordinateTransform::from(0b0001_0000).coordinate, Coordinate::Ship);
        assert_eq!(CoordinateTransform::from(0).coordinate, Coordinate::Beam);
    }

    #[test]
    fn test_fixed_leader() {
        let mut dat = vec![0u8; 59];
        dat[2] = 51;
        dat[3] = 17;
        dat[4] = 0b0100_1010;
        dat[5] = 0b0100_0001;
        dat[8] = 4;
        dat[9] = 30;
        dat[10..12].copy_from_slice(&45u16.to_le_bytes());
        dat[12..14].copy_from_slice(&200u16.to_le_bytes());
        dat[14..16].copy_from_slice(&176u16.to_le_bytes());
        dat[18] = 5;
        dat[25] = 0b0001_1111;
        dat[42..50].copy_from_slice(&[0xde, 0xad, 0xbe, 0xef, 0, 1, 2, 3]);

        let Record::FixedLeader(fl) = decode(decode_fixed_leader, 0, &dat).unwrap() else {
            panic!("expected fixed leader");
        };
        assert_eq!((fl.cpu_firmware_version, fl.cpu_firmware_revision), (51, 17));
        assert_eq!(fl.num_beams, 4);
        assert_eq!(fl.num_cells, 30);
        assert_eq!(fl.pings_per_ensemble, 45);
        assert_eq!(fl.cell_length_cm, 200);
        assert_eq!(fl.blank_cm, 176);
        assert_eq!(fl.code_repeats, 5);
        assert_eq!(fl.coordinate, Coordinate::Earth);
        assert_eq!(fl.cpu_serial.as_deref(), Some("deadbeef00010203"));
        assert_eq!(fl.system_bandwidth, Some(0));
    }

    #[test]
    fn test_short_fixed_leader_from_older_firmware() {
        let dat = vec![0u8; 42];
        let Record::FixedLeader(fl) = decode(decode_fixed_leader, 0, &dat).unwrap() else {
            panic!("expected fixed leader");
        };
        assert!(fl.cpu_serial.is_none());
        assert!(fl.base_frequency_index.is_none());

        let zult = decode(decode_fixed_leader, 0, &dat[..30]);
        assert!(matches!(zult, Err(Error::OutOfBounds { .. })), "{zult:?}");
    }

    #[test]
    fn test_variable_leader() {
        let mut dat = vec![0u8; 65];
        dat[0] = 0x80;
        dat[2..4].copy_from_slice(&0x0203u16.to_le_bytes());
        dat[4..11].copy_from_slice(&[24, 3, 15, 12, 30, 45, 50]);
        dat[11] = 1;
        dat[14..16].copy_from_slice(&1500u16.to_le_bytes());
        dat[22..24].copy_from_slice(&(-12000i16).to_le_bytes());
        dat[26..28].copy_from_slice(&(-150i16).to_le_bytes());
        dat[48..52].copy_from_slice(&123_456u32.to_le_bytes());
        dat[57..65].copy_from_slice(&[20, 24, 3, 15, 12, 30, 45, 50]);

        let Record::VariableLeader(vl) = decode(decode_variable_leader, 0x80, &dat).unwrap() else {
            panic!("expected variable leader");
        };
        assert_eq!(vl.ensemble_number, 0x0001_0203);
        assert_eq!(vl.rtc.year, 24);
        assert_eq!(vl.rtc.hundredths, 50);
        assert_eq!(vl.speed_of_sound, 1500);
        assert_eq!(vl.roll, -12000);
        assert_eq!(vl.temperature, -150);
        assert_eq!(vl.pressure, Some(123_456));
        assert_eq!(vl.y2k_rtc.map(|r| r.year), Some(2024));
    }

    #[test]
    fn test_vertical_beam_leader() {
        let mut dat = vec![0u8; 32];
        dat[0..2].copy_from_slice(&0x0f01u16.to_le_bytes());
        dat[2..4].copy_from_slice(&12u16.to_le_bytes());
        dat[30..32].copy_from_slice(&7u16.to_le_bytes());
        let Record::VerticalBeamLeader(vb) =
            decode(decode_vertical_beam_leader, 0x0f01, &dat).unwrap()
        else {
            panic!("expected vertical beam leader");
        };
        assert_eq!(vb.num_cells, 12);
        assert_eq!(vb.ping_offset_time, Some(7));
    }
}
