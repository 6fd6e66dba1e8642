//! Configuration and sensor records.
use crate::ensemble::{Convention, Record};
use crate::fields::{read_table, Field};
use crate::prelude::*;
use crate::registry::DatasetInput;

/// Ancillary element count above which the ADCP3 extension is present.
const ANCILLARY_ADCP3_ELEMENTS: usize = 19;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Firmware {
    pub major: u8,
    pub minor: u8,
    pub revision: u8,
}

impl std::fmt::Display for Firmware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.revision)
    }
}

/// E000008.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct EnsembleData {
    pub convention: Convention,
    pub ensemble_number: i32,
    pub num_bins: i32,
    pub num_beams: i32,
    pub desired_ping_count: i32,
    pub actual_ping_count: i32,
    pub status: i32,
    /// Four digit year natively, years since 2000 for PD0.
    pub year: i32,
    pub month: i32,
    pub day: i32,
    pub hour: i32,
    pub minute: i32,
    pub second: i32,
    pub hundredths: i32,
    pub serial_number: String,
    pub firmware: Firmware,
    /// Frequency and orientation identifier.
    pub subsystem_code: char,
    /// Distinguishes configurations of the same subsystem.
    pub subsystem_config: u8,
}

const ENSEMBLE_DATA: [Field; 13] = [
    Field::i32_word("ensemble_number", 0),
    Field::i32_word("num_bins", 1),
    Field::i32_word("num_beams", 2),
    Field::i32_word("desired_ping_count", 3),
    Field::i32_word("actual_ping_count", 4),
    Field::i32_word("status", 5),
    Field::i32_word("year", 6),
    Field::i32_word("month", 7),
    Field::i32_word("day", 8),
    Field::i32_word("hour", 9),
    Field::i32_word("minute", 10),
    Field::i32_word("second", 11),
    Field::i32_word("hundredths", 12),
];

pub(crate) fn decode_ensemble_data(input: &DatasetInput) -> Result<Record> {
    let cur = &input.cursor;
    let [ensemble_number, num_bins, num_beams, desired_ping_count, actual_ping_count, status, year, month, day, hour, minute, second, hundredths] =
        read_table(cur, 0, &ENSEMBLE_DATA)?.map(|v| v as i32);

    let serial_number = String::from_utf8_lossy(cur.bytes(13 * 4, 32)?)
        .trim_end_matches(['\0', ' '])
        .to_string();
    let firmware = cur.bytes(21 * 4, 4)?;
    let subsystem_config: u8 = cur.le(22 * 4 + 3)?;

    Ok(EnsembleData {
        convention: Convention::Native,
        ensemble_number,
        num_bins,
        num_beams,
        desired_ping_count,
        actual_ping_count,
        status,
        year,
        month,
        day,
        hour,
        minute,
        second,
        hundredths,
        serial_number,
        firmware: Firmware {
            revision: firmware[0],
            minor: firmware[1],
            major: firmware[2],
        },
        subsystem_code: char::from(firmware[3]),
        subsystem_config,
    }
    .into())
}

/// Extra values written by ADCP3 firmware.
///
/// Some of these share word offsets with the base record, and `vt`, `vtl` and
/// `d3v3` share offsets with the receiver temperatures and `vinf`/`vg`. Captured
/// ADCP3 frames are needed to confirm the layout.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AncillaryAdcp3 {
    pub current_system: f64,
    pub status_2: f64,
    pub burst_index: f64,
    pub hs1_temp: f64,
    pub hs2_temp: f64,
    pub rcv1_temp: f64,
    pub rcv2_temp: f64,
    pub vinf: f64,
    pub vg: f64,
    pub vt: f64,
    pub vtl: f64,
    pub d3v3: f64,
}

const ANCILLARY_ADCP3: [Field; 12] = [
    Field::f32_word("current_system", 0),
    Field::f32_word("status_2", 1),
    Field::f32_word("burst_index", 2),
    Field::f32_word("hs1_temp", 13),
    Field::f32_word("hs2_temp", 14),
    Field::f32_word("rcv1_temp", 15),
    Field::f32_word("rcv2_temp", 16),
    Field::f32_word("vinf", 17),
    Field::f32_word("vg", 18),
    Field::f32_word("vt", 16),
    Field::f32_word("vtl", 17),
    Field::f32_word("d3v3", 18),
];

/// E000009.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Ancillary {
    pub convention: Convention,
    /// Meters.
    pub blank: f64,
    /// Meters.
    pub bin_size: f64,
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
    pub magnetometer: [f64; 3],
    pub gravity: [f64; 3],
    pub adcp3: Option<AncillaryAdcp3>,
}

const ANCILLARY: [Field; 19] = [
    Field::f32_word("blank", 0),
    Field::f32_word("bin_size", 1),
    Field::f32_word("first_ping_time", 2),
    Field::f32_word("last_ping_time", 3),
    Field::f32_word("heading", 4),
    Field::f32_word("pitch", 5),
    Field::f32_word("roll", 6),
    Field::f32_word("water_temp", 7),
    Field::f32_word("system_temp", 8),
    Field::f32_word("salinity", 9),
    Field::f32_word("pressure", 10),
    Field::f32_word("transducer_depth", 11),
    Field::f32_word("speed_of_sound", 12),
    Field::f32_word("mag_x", 13),
    Field::f32_word("mag_y", 14),
    Field::f32_word("mag_z", 15),
    Field::f32_word("gravity_x", 16),
    Field::f32_word("gravity_y", 17),
    Field::f32_word("gravity_z", 18),
];

pub(crate) fn decode_ancillary(input: &DatasetInput) -> Result<Record> {
    let cur = &input.cursor;
    let [blank, bin_size, first_ping_time, last_ping_time, heading, pitch, roll, water_temp, system_temp, salinity, pressure, transducer_depth, speed_of_sound, mx, my, mz, gx, gy, gz] =
        read_table(cur, 0, &ANCILLARY)?;

    let elements = input.shape.map_or(0, |s| s.bins);
    let adcp3 = if elements > ANCILLARY_ADCP3_ELEMENTS {
        let [current_system, status_2, burst_index, hs1_temp, hs2_temp, rcv1_temp, rcv2_temp, vinf, vg, vt, vtl, d3v3] =
            read_table(cur, 0, &ANCILLARY_ADCP3)?;
        Some(AncillaryAdcp3 {
            current_system,
            status_2,
            burst_index,
            hs1_temp,
            hs2_temp,
            rcv1_temp,
            rcv2_temp,
            vinf,
            vg,
            vt,
            vtl,
            d3v3,
        })
    } else {
        None
    };

    Ok(Ancillary {
        convention: Convention::Native,
        blank,
        bin_size,
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
        magnetometer: [mx, my, mz],
        gravity: [gx, gy, gz],
        adcp3,
    }
    .into())
}

/// E000014.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SystemSetup {
    pub bt_samples_per_second: f64,
    pub bt_system_freq_hz: f64,
    pub bt_cpce: f64,
    pub bt_nce: f64,
    pub bt_repeat_n: f64,
    pub wp_samples_per_second: f64,
    pub wp_system_freq_hz: f64,
    pub wp_cpce: f64,
    pub wp_nce: f64,
    /// Code repeats, used for the correlation correction.
    pub wp_repeat_n: f64,
    pub wp_lag_samples: f64,
    /// Input voltage.
    pub voltage: f64,
    pub xmt_voltage: f64,
    pub bt_broadband: f64,
    pub bt_lag_length: f64,
    pub bt_narrowband: f64,
    pub bt_beam_mux: f64,
    pub wp_broadband: f64,
    pub wp_lag_length: f64,
    pub wp_transmit_bandwidth: f64,
    pub wp_receive_bandwidth: f64,
    pub transmit_boost_neg_volt: f64,
    pub wp_beam_mux: f64,
}

const SYSTEM_SETUP: [Field; 23] = [
    Field::f32_word("bt_samples_per_second", 0),
    Field::f32_word("bt_system_freq_hz", 1),
    Field::f32_word("bt_cpce", 2),
    Field::f32_word("bt_nce", 3),
    Field::f32_word("bt_repeat_n", 4),
    Field::f32_word("wp_samples_per_second", 5),
    Field::f32_word("wp_system_freq_hz", 6),
    Field::f32_word("wp_cpce", 7),
    Field::f32_word("wp_nce", 8),
    Field::f32_word("wp_repeat_n", 9),
    Field::f32_word("wp_lag_samples", 10),
    Field::f32_word("voltage", 11),
    Field::f32_word("xmt_voltage", 12),
    Field::f32_word("bt_broadband", 13),
    Field::f32_word("bt_lag_length", 14),
    Field::f32_word("bt_narrowband", 15),
    Field::f32_word("bt_beam_mux", 16),
    Field::f32_word("wp_broadband", 17),
    Field::f32_word("wp_lag_length", 18),
    Field::f32_word("wp_transmit_bandwidth", 19),
    Field::f32_word("wp_receive_bandwidth", 20),
    Field::f32_word("transmit_boost_neg_volt", 21),
    Field::f32_word("wp_beam_mux", 22),
];

pub(crate) fn decode_system_setup(input: &DatasetInput) -> Result<Record> {
    let [bt_samples_per_second, bt_system_freq_hz, bt_cpce, bt_nce, bt_repeat_n, wp_samples_per_second, wp_system_freq_hz, wp_cpce, wp_nce, wp_repeat_n, wp_lag_samples, voltage, xmt_voltage, bt_broadband, bt_lag_length, bt_narrowband, bt_beam_mux, wp_broadband, wp_lag_length, wp_transmit_bandwidth, wp_receive_bandwidth, transmit_boost_neg_volt, wp_beam_mux] =
        read_table(&input.cursor, 0, &SYSTEM_SETUP)?;

    Ok(SystemSetup {
        bt_samples_per_second,
        bt_system_freq_hz,
        bt_cpce,
        bt_nce,
        bt_repeat_n,
        wp_samples_per_second,
        wp_system_freq_hz,
        wp_cpce,
        wp_nce,
        wp_repeat_n,
        wp_lag_samples,
        voltage,
        xmt_voltage,
        bt_broadband,
        bt_lag_length,
        bt_narrowband,
        bt_beam_mux,
        wp_broadband,
        wp_lag_length,
        wp_transmit_bandwidth,
        wp_receive_bandwidth,
        transmit_boost_neg_volt,
        wp_beam_mux,
    }
    .into())
}

/// E000016, water level from a vertical beam gage.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct GageHeight {
    pub status: f64,
    pub avg_range: f64,
    pub sd: f64,
    pub avg_sn: f64,
    pub n: f64,
    pub salinity: f64,
    pub pressure: f64,
    pub depth: f64,
    pub water_temp: f64,
    pub backplane_temp: f64,
    pub speed_of_sound: f64,
    pub heading: f64,
    pub pitch: f64,
    pub roll: f64,
    pub avg_s: f64,
    pub avg_n1: f64,
    pub avg_n2: f64,
    pub gain_frac: f64,
    pub pings: f64,
    pub snr_thresh: f64,
    pub gain_thresh: f64,
    pub stat_thresh: f64,
    pub xmt_cycles: f64,
    pub depth_offset: f64,
}

const GAGE_HEIGHT: [Field; 24] = [
    Field::f32_word("status", 0),
    Field::f32_word("avg_range", 1),
    Field::f32_word("sd", 2),
    Field::f32_word("avg_sn", 3),
    Field::f32_word("n", 4),
    Field::f32_word("salinity", 5),
    Field::f32_word("pressure", 6),
    Field::f32_word("depth", 7),
    Field::f32_word("water_temp", 8),
    Field::f32_word("backplane_temp", 9),
    Field::f32_word("speed_of_sound", 10),
    Field::f32_word("heading", 11),
    Field::f32_word("pitch", 12),
    Field::f32_word("roll", 13),
    Field::f32_word("avg_s", 14),
    Field::f32_word("avg_n1", 15),
    Field::f32_word("avg_n2", 16),
    Field::f32_word("gain_frac", 17),
    Field::f32_word("pings", 18),
    Field::f32_word("snr_thresh", 19),
    Field::f32_word("gain_thresh", 20),
    Field::f32_word("stat_thresh", 21),
    Field::f32_word("xmt_cycles", 22),
    Field::f32_word("depth_offset", 23),
];

pub(crate) fn decode_gage_height(input: &DatasetInput) -> Result<Record> {
    let [status, avg_range, sd, avg_sn, n, salinity, pressure, depth, water_temp, backplane_temp, speed_of_sound, heading, pitch, roll, avg_s, avg_n1, avg_n2, gain_frac, pings, snr_thresh, gain_thresh, stat_thresh, xmt_cycles, depth_offset] =
        read_table(&input.cursor, 0, &GAGE_HEIGHT)?;

    Ok(GageHeight {
        status,
        avg_range,
        sd,
        avg_sn,
        n,
        salinity,
        pressure,
        depth,
        water_temp,
        backplane_temp,
        speed_of_sound,
        heading,
        pitch,
        roll,
        avg_s,
        avg_n1,
        avg_n2,
        gain_frac,
        pings,
        snr_thresh,
        gain_thresh,
        stat_thresh,
        xmt_cycles,
        depth_offset,
    }
    .into())
}
