//! The decoded result for one frame.
use derive_more::From;
use ndarray::Array2;
use tracing::debug;

use crate::framing::Format;
use crate::nmea::Nmea;
use crate::pd0::{
    FixedLeader, Pd0BottomTrack, TransformationMatrix, VariableLeader, VerticalBeamLeader,
    VerticalProfile, VerticalProfileKind,
};
use crate::rtb::{
    Ancillary, BottomTrack, EnsembleData, GageHeight, RangeTracking, RiverBottomTrack, SystemSetup,
};

/// Profile values indexed `[beam, bin]`.
pub type Matrix = Array2<f64>;

/// RTB bad velocity; anything at or above it is bad.
pub const RTB_BAD_VELOCITY: f64 = 88.888;
/// PD0 bad velocity and bad range.
pub const PD0_BAD_VELOCITY: f64 = -32768.0;
/// Largest PD0 single-byte count.
pub const PD0_MAX_COUNT: f64 = 255.0;

/// Units and beam order of decoded values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Convention {
    /// RTB units: m/s, dB, correlation fraction, ping counts.
    #[default]
    Native,
    /// PD0 units and beam order: mm/s, counts, percent good.
    Pd0Compatible,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Coordinate {
    Beam,
    Instrument,
    Ship,
    Earth,
}

/// Whether `val` is a bad velocity for `convention`.
#[must_use]
pub fn is_bad_velocity(val: f64, convention: Convention) -> bool {
    match convention {
        Convention::Native => {
            val.is_nan()
                || val >= RTB_BAD_VELOCITY
                || (val - RTB_BAD_VELOCITY).abs() <= 1e-6 * RTB_BAD_VELOCITY
        }
        Convention::Pd0Compatible => val == PD0_BAD_VELOCITY,
    }
}

#[must_use]
pub fn bad_velocity(convention: Convention) -> f64 {
    match convention {
        Convention::Native => RTB_BAD_VELOCITY,
        Convention::Pd0Compatible => PD0_BAD_VELOCITY,
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Velocity {
    pub coordinate: Coordinate,
    pub convention: Convention,
    pub values: Matrix,
}

impl Velocity {
    #[must_use]
    pub fn beams(&self) -> usize {
        self.values.nrows()
    }

    #[must_use]
    pub fn bins(&self) -> usize {
        self.values.ncols()
    }

    #[must_use]
    pub fn bad_value(&self) -> f64 {
        bad_velocity(self.convention)
    }

    #[must_use]
    pub fn is_bad(&self, val: f64) -> bool {
        is_bad_velocity(val, self.convention)
    }
}

/// Echo amplitude; dB natively, counts for PD0.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Amplitude {
    pub convention: Convention,
    pub values: Matrix,
}

/// Correlation; a 0 to 1 fraction natively, 0 to 255 counts for PD0.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Correlation {
    pub convention: Convention,
    pub values: Matrix,
}

/// Good pings; counts natively, percent of pings for PD0.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct GoodPings {
    pub coordinate: Coordinate,
    pub convention: Convention,
    pub values: Matrix,
}

/// One decoded dataset.
#[derive(Clone, Debug, PartialEq, From)]
pub enum Record {
    Velocity(Velocity),
    Amplitude(Amplitude),
    Correlation(Correlation),
    GoodPings(GoodPings),
    EnsembleData(EnsembleData),
    Ancillary(Ancillary),
    SystemSetup(SystemSetup),
    BottomTrack(BottomTrack),
    RangeTracking(RangeTracking),
    Nmea(Nmea),
    GageHeight(GageHeight),
    RiverBottomTrack(RiverBottomTrack),
    FixedLeader(FixedLeader),
    VariableLeader(VariableLeader),
    Pd0BottomTrack(Pd0BottomTrack),
    TransformationMatrix(TransformationMatrix),
    VerticalBeamLeader(VerticalBeamLeader),
    VerticalProfile(VerticalProfile),
}

/// Every dataset decoded from one frame. Each slot is `None` unless the frame carried
/// that dataset and it decoded without error.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Ensemble {
    pub format: Format,
    pub convention: Convention,

    pub beam_velocity: Option<Velocity>,
    /// Instrument, or for PD0 ship, coordinates.
    pub instrument_velocity: Option<Velocity>,
    pub earth_velocity: Option<Velocity>,
    pub amplitude: Option<Amplitude>,
    pub correlation: Option<Correlation>,
    pub good_beam: Option<GoodPings>,
    pub good_earth: Option<GoodPings>,

    pub ensemble_data: Option<EnsembleData>,
    pub ancillary: Option<Ancillary>,
    pub system_setup: Option<SystemSetup>,
    pub bottom_track: Option<BottomTrack>,
    pub range_tracking: Option<RangeTracking>,
    pub nmea: Option<Nmea>,
    pub gage_height: Option<GageHeight>,
    pub river_bottom_track: Option<RiverBottomTrack>,

    pub fixed_leader: Option<FixedLeader>,
    pub variable_leader: Option<VariableLeader>,
    pub pd0_bottom_track: Option<Pd0BottomTrack>,
    pub transformation_matrix: Option<TransformationMatrix>,
    pub vertical_beam_leader: Option<VerticalBeamLeader>,
    pub vertical_velocity: Option<VerticalProfile>,
    pub vertical_correlation: Option<VerticalProfile>,
    pub vertical_amplitude: Option<VerticalProfile>,
    pub vertical_percent_good: Option<VerticalProfile>,
}

impl Ensemble {
    /// An ensemble with no datasets. PD0 data is always in PD0 convention.
    #[must_use]
    pub fn new(format: Format) -> Self {
        let convention = match format {
            Format::Rtb => Convention::Native,
            Format::Pd0 => Convention::Pd0Compatible,
        };
        Self {
            format,
            convention,
            beam_velocity: None,
            instrument_velocity: None,
            earth_velocity: None,
            amplitude: None,
            correlation: None,
            good_beam: None,
            good_earth: None,
            ensemble_data: None,
            ancillary: None,
            system_setup: None,
            bottom_track: None,
            range_tracking: None,
            nmea: None,
            gage_height: None,
            river_bottom_track: None,
            fixed_leader: None,
            variable_leader: None,
            pd0_bottom_track: None,
            transformation_matrix: None,
            vertical_beam_leader: None,
            vertical_velocity: None,
            vertical_correlation: None,
            vertical_amplitude: None,
            vertical_percent_good: None,
        }
    }

    /// Place a record in its slot. A later record of the same kind replaces an earlier one.
    pub fn insert(&mut self, record: impl Into<Record>) {
        fn put<T>(slot: &mut Option<T>, val: T, name: &str) {
            if slot.replace(val).is_some() {
                debug!("duplicate {name} dataset replaced");
            }
        }

        match record.into() {
            Record::Velocity(v) => match v.coordinate {
                Coordinate::Beam => put(&mut self.beam_velocity, v, "beam velocity"),
                Coordinate::Instrument | Coordinate::Ship => {
                    put(&mut self.instrument_velocity, v, "instrument velocity");
                }
                Coordinate::Earth => put(&mut self.earth_velocity, v, "earth velocity"),
            },
            Record::Amplitude(v) => put(&mut self.amplitude, v, "amplitude"),
            Record::Correlation(v) => put(&mut self.correlation, v, "correlation"),
            Record::GoodPings(v) => match v.coordinate {
                Coordinate::Earth => put(&mut self.good_earth, v, "good earth"),
                _ => put(&mut self.good_beam, v, "good beam"),
            },
            Record::EnsembleData(v) => put(&mut self.ensemble_data, v, "ensemble data"),
            Record::Ancillary(v) => put(&mut self.ancillary, v, "ancillary"),
            Record::SystemSetup(v) => put(&mut self.system_setup, v, "system setup"),
            Record::BottomTrack(v) => put(&mut self.bottom_track, v, "bottom track"),
            Record::RangeTracking(v) => put(&mut self.range_tracking, v, "range tracking"),
            Record::Nmea(v) => put(&mut self.nmea, v, "nmea"),
            Record::GageHeight(v) => put(&mut self.gage_height, v, "gage height"),
            Record::RiverBottomTrack(v) => {
                put(&mut self.river_bottom_track, v, "river bottom track");
            }
            Record::FixedLeader(v) => put(&mut self.fixed_leader, v, "fixed leader"),
            Record::VariableLeader(v) => put(&mut self.variable_leader, v, "variable leader"),
            Record::Pd0BottomTrack(v) => put(&mut self.pd0_bottom_track, v, "bottom track"),
            Record::TransformationMatrix(v) => {
                put(&mut self.transformation_matrix, v, "transformation matrix");
            }
            Record::VerticalBeamLeader(v) => {
                put(&mut self.vertical_beam_leader, v, "vertical beam leader");
            }
            Record::VerticalProfile(v) => match v.kind {
                VerticalProfileKind::Velocity => {
                    put(&mut self.vertical_velocity, v, "vertical velocity");
                }
                VerticalProfileKind::Correlation => {
                    put(&mut self.vertical_correlation, v, "vertical correlation");
                }
                VerticalProfileKind::Amplitude => {
                    put(&mut self.vertical_amplitude, v, "vertical amplitude");
                }
                VerticalProfileKind::PercentGood => {
                    put(&mut self.vertical_percent_good, v, "vertical percent good");
                }
            },
        }
    }

    /// Beam count of the water profile, from the first profile dataset present.
    #[must_use]
    pub fn num_beams(&self) -> Option<usize> {
        self.profile_shape().map(|(beams, _)| beams)
    }

    /// Bin count of the water profile, from the first profile dataset present.
    #[must_use]
    pub fn num_bins(&self) -> Option<usize> {
        self.profile_shape().map(|(_, bins)| bins)
    }

    fn profile_shape(&self) -> Option<(usize, usize)> {
        [
            self.beam_velocity.as_ref().map(|v| v.values.dim()),
            self.instrument_velocity.as_ref().map(|v| v.values.dim()),
            self.earth_velocity.as_ref().map(|v| v.values.dim()),
            self.amplitude.as_ref().map(|v| v.values.dim()),
            self.correlation.as_ref().map(|v| v.values.dim()),
            self.good_beam.as_ref().map(|v| v.values.dim()),
            self.good_earth.as_ref().map(|v| v.values.dim()),
        ]
        .into_iter()
        .flatten()
        .next()
    }
}

/// An ensemble plus the recoverable problems found while decoding it.
#[derive(Debug)]
pub struct DecodedEnsemble {
    pub ensemble: Ensemble,
    /// Frame offset of the ensemble in the stream, if it came from a stream.
    pub offset: Option<usize>,
    pub warnings: Vec<crate::Error>,
}
