//! Format independent summaries of an ensemble's configuration and sensors.
//!
//! Values keep the units of the ensemble's [Convention], with two exceptions: blank
//! and bin size are always meters, and PD0 attitude and temperature are always
//! degrees.
use crate::ensemble::{Convention, Ensemble};
use crate::rtb::EnsembleData;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Timestamp {
    /// Four digits, except years since 2000 for RTB data in PD0 convention and for a
    /// PD0 clock without a century.
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub hundredths: u8,
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second, self.hundredths
        )
    }
}

/// Bottom track settings carried alongside the configuration.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BottomTrackCfg {
    pub first_ping_time: f64,
    pub last_ping_time: f64,
    pub status: f64,
    pub num_beams: usize,
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Cfg {
    pub convention: Convention,
    pub ensemble_number: Option<u32>,
    pub num_bins: Option<usize>,
    pub num_beams: Option<usize>,
    pub desired_pings: Option<u32>,
    pub actual_pings: Option<u32>,
    pub serial_number: Option<String>,
    pub firmware: Option<String>,
    pub timestamp: Option<Timestamp>,
    /// Meters.
    pub blank: Option<f64>,
    /// Meters.
    pub bin_size: Option<f64>,
    pub salinity: Option<f64>,
    pub speed_of_sound: Option<f64>,
    pub frequency_khz: Option<f64>,
    pub bottom_track: Option<BottomTrackCfg>,
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Sensor {
    pub convention: Convention,
    pub heading: Option<f64>,
    pub pitch: Option<f64>,
    /// Folded into -90..=90 in PD0 convention.
    pub roll: Option<f64>,
    pub water_temp: Option<f64>,
    pub system_temp: Option<f64>,
    /// Pascals natively, decibars in PD0 convention.
    pub pressure: Option<f64>,
    /// Meters natively, decimeters in PD0 convention.
    pub transducer_depth: Option<f64>,
    pub voltage: Option<f64>,
    pub xmt_voltage: Option<f64>,
    pub magnetometer: Option<[f64; 3]>,
}

impl Ensemble {
    /// Configuration from ensemble data, ancillary, system setup and bottom track, or
    /// from the PD0 leaders. `None` if the ensemble has none of them.
    #[must_use]
    pub fn cfg(&self) -> Option<Cfg> {
        if self.ensemble_data.is_none()
            && self.ancillary.is_none()
            && self.system_setup.is_none()
            && self.bottom_track.is_none()
            && self.fixed_leader.is_none()
            && self.variable_leader.is_none()
        {
            return None;
        }
        let mut cfg = Cfg {
            convention: self.convention,
            ..Cfg::default()
        };

        if let Some(ens) = &self.ensemble_data {
            cfg.ensemble_number = u32::try_from(ens.ensemble_number).ok();
            cfg.num_bins = usize::try_from(ens.num_bins).ok();
            cfg.num_beams = usize::try_from(ens.num_beams).ok();
            cfg.desired_pings = u32::try_from(ens.desired_ping_count).ok();
            cfg.actual_pings = u32::try_from(ens.actual_ping_count).ok();
            cfg.serial_number = Some(ens.serial_number.clone());
            cfg.firmware = Some(ens.firmware.to_string());
            cfg.timestamp = rtb_timestamp(ens);
        }
        if let Some(anc) = &self.ancillary {
            cfg.blank = Some(anc.blank);
            cfg.bin_size = Some(anc.bin_size);
            cfg.salinity = Some(anc.salinity);
            cfg.speed_of_sound = Some(anc.speed_of_sound);
        }
        if let Some(setup) = &self.system_setup {
            cfg.frequency_khz = Some(setup.wp_system_freq_hz / 1000.0);
        }
        if let Some(bt) = &self.bottom_track {
            cfg.bottom_track = Some(BottomTrackCfg {
                first_ping_time: bt.first_ping_time,
                last_ping_time: bt.last_ping_time,
                status: bt.status,
                num_beams: bt.num_beams,
            });
        }

        if let Some(fl) = &self.fixed_leader {
            cfg.num_bins = Some(usize::from(fl.num_cells));
            cfg.num_beams = Some(usize::from(fl.num_beams));
            cfg.desired_pings = Some(u32::from(fl.pings_per_ensemble));
            cfg.firmware = Some(format!(
                "{}.{}",
                fl.cpu_firmware_version, fl.cpu_firmware_revision
            ));
            cfg.serial_number.clone_from(&fl.cpu_serial);
            cfg.blank = Some(f64::from(fl.blank_cm) / 100.0);
            cfg.bin_size = Some(f64::from(fl.cell_length_cm) / 100.0);
            cfg.frequency_khz = fl.system_config.frequency_khz.map(f64::from);
        }
        if let Some(vl) = &self.variable_leader {
            cfg.ensemble_number = Some(vl.ensemble_number);
            cfg.salinity = Some(f64::from(vl.salinity));
            cfg.speed_of_sound = Some(f64::from(vl.speed_of_sound));
            // firmware without the Y2K clock leaves its century zero
            let rtc = vl.y2k_rtc.filter(|rtc| rtc.year >= 100).unwrap_or(vl.rtc);
            cfg.timestamp = Some(Timestamp {
                year: i32::from(rtc.year),
                month: rtc.month,
                day: rtc.day,
                hour: rtc.hour,
                minute: rtc.minute,
                second: rtc.second,
                hundredths: rtc.hundredths,
            });
        }
        if let Some(bt) = &self.pd0_bottom_track {
            cfg.actual_pings.get_or_insert(u32::from(bt.pings_per_ensemble));
        }

        Some(cfg)
    }

    /// Attitude, temperature, pressure and power, from ancillary and system setup or
    /// the PD0 variable leader. `None` if the ensemble has none of them.
    #[must_use]
    pub fn sensor(&self) -> Option<Sensor> {
        if self.ancillary.is_none() && self.system_setup.is_none() && self.variable_leader.is_none()
        {
            return None;
        }
        let mut sensor = Sensor {
            convention: self.convention,
            ..Sensor::default()
        };

        if let Some(anc) = &self.ancillary {
            sensor.heading = Some(anc.heading);
            sensor.pitch = Some(anc.pitch);
            sensor.roll = Some(anc.roll);
            sensor.water_temp = Some(anc.water_temp);
            sensor.system_temp = Some(anc.system_temp);
            sensor.pressure = Some(anc.pressure);
            sensor.transducer_depth = Some(anc.transducer_depth);
            sensor.magnetometer = Some(anc.magnetometer);
        }
        if let Some(setup) = &self.system_setup {
            sensor.voltage = Some(setup.voltage);
            sensor.xmt_voltage = Some(setup.xmt_voltage);
        }
        if let Some(vl) = &self.variable_leader {
            sensor.heading = Some(f64::from(vl.heading) / 100.0);
            sensor.pitch = Some(f64::from(vl.pitch) / 100.0);
            sensor.roll = Some(f64::from(vl.roll) / 100.0);
            sensor.water_temp = Some(f64::from(vl.temperature) / 100.0);
            // decapascals to decibars
            sensor.pressure = vl.pressure.map(|p| f64::from(p) / 1000.0);
            sensor.transducer_depth = Some(f64::from(vl.transducer_depth));
        }

        Some(sensor)
    }
}

/// `None` if any field is out of range for a timestamp.
fn rtb_timestamp(ens: &EnsembleData) -> Option<Timestamp> {
    let field = |val: i32| u8::try_from(val).ok();
    Some(Timestamp {
        year: ens.year,
        month: field(ens.month)?,
        day: field(ens.day)?,
        hour: field(ens.hour)?,
        minute: field(ens.minute)?,
        second: field(ens.second)?,
        hundredths: field(ens.hundredths)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::Format;
    use crate::rtb::{Ancillary, EnsembleData, Firmware};

    fn ensemble_data() -> EnsembleData {
        EnsembleData {
            convention: Convention::Native,
            ensemble_number: 42,
            num_bins: 30,
            num_beams: 4,
            desired_ping_count: 10,
            actual_ping_count: 9,
            status: 0,
            year: 2024,
            month: 3,
            day: 15,
            hour: 12,
            minute: 30,
            second: 45,
            hundredths: 50,
            serial_number: "01300000000000000000000000000001".to_string(),
            firmware: Firmware {
                major: 0,
                minor: 2,
                revision: 118,
            },
            subsystem_code: '3',
            subsystem_config: 0,
        }
    }

    fn ancillary() -> Ancillary {
        Ancillary {
            convention: Convention::Native,
            blank: 0.5,
            bin_size: 1.0,
            first_ping_time: 0.0,
            last_ping_time: 1.0,
            heading: 270.0,
            pitch: 1.5,
            roll: 179.0,
            water_temp: 12.0,
            system_temp: 20.0,
            salinity: 35.0,
            pressure: 101_325.0,
            transducer_depth: 2.0,
            speed_of_sound: 1500.0,
            magnetometer: [0.0; 3],
            gravity: [0.0; 3],
            adcp3: None,
        }
    }

    #[test]
    fn test_out_of_range_time_has_no_timestamp() {
        let mut ens = Ensemble::new(Format::Rtb);
        ens.insert(EnsembleData {
            month: 300,
            ..ensemble_data()
        });
        let cfg = ens.cfg().expect("cfg");
        assert!(cfg.timestamp.is_none());
        assert_eq!(cfg.ensemble_number, Some(42));

        ens.insert(EnsembleData {
            second: -1,
            ..ensemble_data()
        });
        assert!(ens.cfg().expect("cfg").timestamp.is_none());
    }

    #[test]
    fn test_empty_ensemble_has_no_views() {
        let ens = Ensemble::new(Format::Rtb);
        assert!(ens.cfg().is_none());
        assert!(ens.sensor().is_none());
    }

    #[test]
    fn test_rtb_views() {
        let mut ens = Ensemble::new(Format::Rtb);
        ens.insert(ensemble_data());
        ens.insert(ancillary());

        let cfg = ens.cfg().expect("cfg");
        assert_eq!(cfg.ensemble_number, Some(42));
        assert_eq!(cfg.actual_pings, Some(9));
        assert_eq!(cfg.firmware.as_deref(), Some("0.2.118"));
        assert_eq!(cfg.blank, Some(0.5));
        let ts = cfg.timestamp.expect("timestamp");
        assert_eq!(ts.to_string(), "2024-03-15T12:30:45.50");

        let sensor = ens.sensor().expect("sensor");
        assert_eq!(sensor.roll, Some(179.0));
        assert_eq!(sensor.pressure, Some(101_325.0));
        assert!(sensor.voltage.is_none());
    }
}
