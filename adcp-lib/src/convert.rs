//! Conversion between native RTB units and PD0 units and beam order.
//!
//! PD0 numbers beams differently than RTB, so beam-domain values are moved as well as
//! rescaled. With four beams, native beam 0 becomes PD0 beam 3, 1 becomes 2, 2 becomes
//! 0 and 3 becomes 1. Instrument-domain values swap the first two axes and negate the
//! third. Earth-domain values keep their order. Profiles with one to three beams are
//! never reordered.
use tracing::warn;

use crate::ensemble::{
    bad_velocity, is_bad_velocity, Amplitude, Convention, Coordinate, Correlation, Ensemble,
    GoodPings, Matrix, Velocity, PD0_BAD_VELOCITY, PD0_MAX_COUNT, RTB_BAD_VELOCITY,
};
use crate::prelude::*;
use crate::rtb::{Ancillary, BottomTrack, EnsembleData};

/// Native beam index to PD0 beam index.
const BEAM_TO_PD0: [usize; 4] = [3, 2, 0, 1];
/// Native instrument axis to PD0 axis.
const INSTRUMENT_TO_PD0: [usize; 4] = [1, 0, 2, 3];
/// Native instrument axis whose sign is inverted.
const NEGATED_INSTRUMENT_AXIS: usize = 2;

const PD0_MAX_VELOCITY: f64 = i16::MAX as f64;

/// How values of a record are reordered between conventions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Remap {
    Beam,
    Instrument,
    Identity,
}

impl Remap {
    #[must_use]
    pub fn for_coordinate(coordinate: Coordinate) -> Self {
        match coordinate {
            Coordinate::Beam => Remap::Beam,
            Coordinate::Instrument | Coordinate::Ship => Remap::Instrument,
            Coordinate::Earth => Remap::Identity,
        }
    }

    /// Source index and sign for output index `idx`, converting to `target`.
    ///
    /// Only four beam data is reordered.
    #[must_use]
    pub fn source(self, idx: usize, beams: usize, target: Convention) -> (usize, f64) {
        let table = match self {
            Remap::Beam if beams == 4 => BEAM_TO_PD0,
            Remap::Instrument if beams == 4 => INSTRUMENT_TO_PD0,
            _ => return (idx, 1.0),
        };
        let src = match target {
            Convention::Pd0Compatible => table.iter().position(|&t| t == idx).unwrap_or(idx),
            Convention::Native => table[idx],
        };
        let native_axis = match target {
            Convention::Pd0Compatible => src,
            Convention::Native => idx,
        };
        let sign = if self == Remap::Instrument && native_axis == NEGATED_INSTRUMENT_AXIS {
            -1.0
        } else {
            1.0
        };
        (src, sign)
    }
}

fn check_beams(beams: usize) -> Result<usize> {
    if (1..=4).contains(&beams) {
        Ok(beams)
    } else {
        Err(Error::InvalidBeamCount(beams))
    }
}

/// Reorder the beam rows of `values` and convert each cell with `f(value, sign)`.
fn remap_matrix(
    values: &Matrix,
    remap: Remap,
    target: Convention,
    f: impl Fn(f64, f64) -> f64,
) -> Result<Matrix> {
    let (beams, bins) = values.dim();
    check_beams(beams)?;
    Ok(Matrix::from_shape_fn((beams, bins), |(beam, bin)| {
        let (src, sign) = remap.source(beam, beams, target);
        f(values[[src, bin]], sign)
    }))
}

/// Per-beam variant of [remap_matrix] for bottom track arrays.
fn remap_beams(
    values: &[f64],
    remap: Remap,
    target: Convention,
    f: impl Fn(f64, f64) -> f64,
) -> Result<Vec<f64>> {
    let beams = values.len();
    if beams == 0 {
        return Ok(Vec::new());
    }
    check_beams(beams)?;
    Ok((0..beams)
        .map(|idx| {
            let (src, sign) = remap.source(idx, beams, target);
            f(values[src], sign)
        })
        .collect())
}

/// Velocity in m/s to mm/s, or back, with `scale` applied on top of the unit change.
fn velocity_cell(val: f64, sign: f64, scale: f64, target: Convention) -> f64 {
    match target {
        Convention::Pd0Compatible => {
            if is_bad_velocity(val, Convention::Native) {
                PD0_BAD_VELOCITY
            } else {
                (val * sign * scale * 1000.0)
                    .round()
                    .clamp(-PD0_MAX_VELOCITY, PD0_MAX_VELOCITY)
            }
        }
        Convention::Native => {
            if is_bad_velocity(val, Convention::Pd0Compatible) {
                RTB_BAD_VELOCITY
            } else {
                val * sign * scale / 1000.0
            }
        }
    }
}

/// Scale to a single byte PD0 count, or back.
fn count_cell(val: f64, factor: f64, target: Convention) -> f64 {
    match target {
        Convention::Pd0Compatible => (val * factor).round().clamp(0.0, PD0_MAX_COUNT),
        Convention::Native => val / factor,
    }
}

fn percent_cell(val: f64, pings: f64, target: Convention) -> f64 {
    match target {
        Convention::Pd0Compatible => (val * 100.0 / pings).round(),
        Convention::Native => val * pings / 100.0,
    }
}

fn round_if(val: f64, target: Convention) -> f64 {
    match target {
        Convention::Pd0Compatible => val.round(),
        Convention::Native => val,
    }
}

/// Fold roll into -90..=90 the way PD0 reports an upward facing instrument.
#[must_use]
pub fn fold_roll(roll: f64) -> f64 {
    if roll > 90.0 {
        -(180.0 - roll)
    } else if roll < -90.0 {
        180.0 + roll
    } else {
        roll
    }
}

/// Conversion settings taken from an ensemble's leader records.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UnitConverter {
    pub target: Convention,
    /// Pings per ensemble, for good ping percentages.
    pub pings: Option<f64>,
    /// Water profile code repeats, for correlation counts.
    pub repeats: Option<f64>,
}

impl UnitConverter {
    #[must_use]
    pub fn new(target: Convention) -> Self {
        Self {
            target,
            pings: None,
            repeats: None,
        }
    }

    #[must_use]
    pub fn for_ensemble(ens: &Ensemble, target: Convention) -> Self {
        let pings = ens
            .ensemble_data
            .as_ref()
            .map(|e| f64::from(e.actual_ping_count))
            .or_else(|| {
                ens.fixed_leader
                    .as_ref()
                    .map(|fl| f64::from(fl.pings_per_ensemble))
            });
        Self {
            target,
            pings,
            repeats: ens.system_setup.as_ref().map(|s| s.wp_repeat_n),
        }
    }

    /// Correlation fraction to count multiplier.
    fn correlation_factor(&self) -> f64 {
        match self.repeats {
            Some(n) => {
                let n = if n == 0.0 { 1.0 } else { n };
                let ratio = (n - 1.0) / n;
                let ratio = if ratio == 0.0 { 1.0 } else { ratio };
                128.0 / ratio
            }
            None => PD0_MAX_COUNT,
        }
    }

    /// # Errors
    /// [Error::InvalidBeamCount] for a profile with other than 1 to 4 beams.
    pub fn velocity(&self, vel: &Velocity) -> Result<Velocity> {
        let target = self.target;
        if vel.convention == target {
            return Ok(vel.clone());
        }
        let remap = Remap::for_coordinate(vel.coordinate);
        Ok(Velocity {
            coordinate: vel.coordinate,
            convention: target,
            values: remap_matrix(&vel.values, remap, target, |v, sign| {
                velocity_cell(v, sign, 1.0, target)
            })?,
        })
    }

    /// # Errors
    /// [Error::InvalidBeamCount] for a profile with other than 1 to 4 beams.
    pub fn amplitude(&self, amp: &Amplitude) -> Result<Amplitude> {
        let target = self.target;
        if amp.convention == target {
            return Ok(amp.clone());
        }
        Ok(Amplitude {
            convention: target,
            values: remap_matrix(&amp.values, Remap::Beam, target, |v, _| {
                count_cell(v, 2.0, target)
            })?,
        })
    }

    /// # Errors
    /// [Error::InvalidBeamCount] for a profile with other than 1 to 4 beams.
    pub fn correlation(&self, corr: &Correlation) -> Result<Correlation> {
        let target = self.target;
        if corr.convention == target {
            return Ok(corr.clone());
        }
        let factor = self.correlation_factor();
        Ok(Correlation {
            convention: target,
            values: remap_matrix(&corr.values, Remap::Beam, target, |v, _| {
                count_cell(v, factor, target)
            })?,
        })
    }

    /// `None` when the ping count is unknown.
    ///
    /// # Errors
    /// [Error::InvalidBeamCount] for a profile with other than 1 to 4 beams.
    pub fn good_pings(&self, good: &GoodPings) -> Result<Option<GoodPings>> {
        let target = self.target;
        if good.convention == target {
            return Ok(Some(good.clone()));
        }
        let Some(pings) = self.pings else {
            return Ok(None);
        };
        let pings = if pings == 0.0 { 1.0 } else { pings };
        // counts follow their axis but never change sign
        let remap = Remap::for_coordinate(good.coordinate);
        Ok(Some(GoodPings {
            coordinate: good.coordinate,
            convention: target,
            values: remap_matrix(&good.values, remap, target, |v, _sign| {
                percent_cell(v, pings, target)
            })?,
        }))
    }

    #[must_use]
    pub fn ensemble_data(&self, ens: &EnsembleData) -> EnsembleData {
        let target = self.target;
        if ens.convention == target {
            return ens.clone();
        }
        let year = match target {
            Convention::Pd0Compatible => ens.year - 2000,
            Convention::Native => ens.year + 2000,
        };
        EnsembleData {
            convention: target,
            year,
            ..ens.clone()
        }
    }

    /// Pressure, depth and roll scalars shared by ancillary and bottom track records.
    fn scalars(&self, pressure: f64, depth: f64, roll: f64) -> (f64, f64, f64) {
        match self.target {
            Convention::Pd0Compatible => (
                (pressure * 0.0001).round(),
                (depth * 10.0).round(),
                fold_roll(roll),
            ),
            // folded roll cannot be recovered
            Convention::Native => (pressure / 0.0001, depth / 10.0, roll),
        }
    }

    #[must_use]
    pub fn ancillary(&self, anc: &Ancillary) -> Ancillary {
        let target = self.target;
        if anc.convention == target {
            return anc.clone();
        }
        let (pressure, transducer_depth, roll) =
            self.scalars(anc.pressure, anc.transducer_depth, anc.roll);
        Ancillary {
            convention: target,
            pressure,
            transducer_depth,
            roll,
            salinity: round_if(anc.salinity, target),
            speed_of_sound: round_if(anc.speed_of_sound, target),
            ..anc.clone()
        }
    }

    /// # Errors
    /// [Error::InvalidBeamCount] for more than 4 beams.
    pub fn bottom_track(&self, bt: &BottomTrack) -> Result<BottomTrack> {
        let target = self.target;
        if bt.convention == target {
            return Ok(bt.clone());
        }
        let pings = if bt.actual_ping_count == 0.0 {
            1.0
        } else {
            bt.actual_ping_count
        };
        let (pressure, transducer_depth, roll) =
            self.scalars(bt.pressure, bt.transducer_depth, bt.roll);

        let range = |v: f64, _sign: f64| match target {
            Convention::Pd0Compatible if is_bad_velocity(v, Convention::Native) => {
                PD0_BAD_VELOCITY
            }
            Convention::Pd0Compatible => (v * 100.0).round(),
            Convention::Native if v == PD0_BAD_VELOCITY => bad_velocity(Convention::Native),
            Convention::Native => v / 100.0,
        };
        // bottom track velocities also flip direction
        let velocity = |v: f64, sign: f64| velocity_cell(v, sign, -1.0, target);
        let count = |factor: f64| move |v: f64, _sign: f64| count_cell(v, factor, target);
        let percent = |v: f64, _sign: f64| percent_cell(v, pings, target);

        Ok(BottomTrack {
            convention: target,
            pressure,
            transducer_depth,
            roll,
            salinity: round_if(bt.salinity, target),
            speed_of_sound: round_if(bt.speed_of_sound, target),
            range: remap_beams(&bt.range, Remap::Beam, target, range)?,
            snr: remap_beams(&bt.snr, Remap::Beam, target, count(2.0))?,
            amplitude: remap_beams(&bt.amplitude, Remap::Beam, target, count(2.0))?,
            correlation: remap_beams(&bt.correlation, Remap::Beam, target, count(PD0_MAX_COUNT))?,
            beam_velocity: remap_beams(&bt.beam_velocity, Remap::Beam, target, velocity)?,
            beam_good: remap_beams(&bt.beam_good, Remap::Beam, target, percent)?,
            instrument_velocity: remap_beams(
                &bt.instrument_velocity,
                Remap::Instrument,
                target,
                velocity,
            )?,
            instrument_good: remap_beams(&bt.instrument_good, Remap::Instrument, target, percent)?,
            earth_velocity: remap_beams(&bt.earth_velocity, Remap::Identity, target, velocity)?,
            earth_good: remap_beams(&bt.earth_good, Remap::Identity, target, percent)?,
            ..bt.clone()
        })
    }
}

/// Convert every convertible record of `ens` to `target`.
///
/// PD0 structural records (leaders, PD0 bottom track, vertical beam and transformation
/// matrix) are carried over unchanged. Good ping records are dropped when the ensemble
/// has no ping count.
///
/// # Errors
/// [Error::InvalidBeamCount] if a profile has other than 1 to 4 beams.
pub fn convert(ens: &Ensemble, target: Convention) -> Result<Ensemble> {
    let (converted, errors) = convert_records(ens, target);
    match errors.into_iter().next() {
        Some(err) => Err(err),
        None => Ok(converted),
    }
}

/// Like [convert], but a record that cannot be converted is left out of the result
/// and its error returned alongside instead of failing the whole ensemble.
#[must_use]
pub fn convert_records(ens: &Ensemble, target: Convention) -> (Ensemble, Vec<Error>) {
    if ens.convention == target {
        return (ens.clone(), Vec::new());
    }
    let conv = UnitConverter::for_ensemble(ens, target);
    let mut errors = Vec::new();

    let good = |good: &GoodPings, name: &str| -> Result<Option<GoodPings>> {
        let converted = conv.good_pings(good)?;
        if converted.is_none() {
            warn!("dropping {name}: ensemble has no ping count");
        }
        Ok(converted)
    };
    let velocity = |vel: &Option<Velocity>| vel.as_ref().map(|v| conv.velocity(v)).transpose();

    let converted = Ensemble {
        convention: target,
        beam_velocity: keep(velocity(&ens.beam_velocity), "beam velocity", &mut errors),
        instrument_velocity: keep(
            velocity(&ens.instrument_velocity),
            "instrument velocity",
            &mut errors,
        ),
        earth_velocity: keep(velocity(&ens.earth_velocity), "earth velocity", &mut errors),
        amplitude: keep(
            ens.amplitude.as_ref().map(|v| conv.amplitude(v)).transpose(),
            "amplitude",
            &mut errors,
        ),
        correlation: keep(
            ens.correlation.as_ref().map(|v| conv.correlation(v)).transpose(),
            "correlation",
            &mut errors,
        ),
        good_beam: keep(
            ens.good_beam.as_ref().map(|v| good(v, "good beam")).transpose().map(Option::flatten),
            "good beam",
            &mut errors,
        ),
        good_earth: keep(
            ens.good_earth.as_ref().map(|v| good(v, "good earth")).transpose().map(Option::flatten),
            "good earth",
            &mut errors,
        ),
        ensemble_data: ens.ensemble_data.as_ref().map(|v| conv.ensemble_data(v)),
        ancillary: ens.ancillary.as_ref().map(|v| conv.ancillary(v)),
        bottom_track: keep(
            ens.bottom_track.as_ref().map(|v| conv.bottom_track(v)).transpose(),
            "bottom track",
            &mut errors,
        ),
        ..ens.clone()
    };
    (converted, errors)
}

/// A converted record, or `None` with the error recorded.
fn keep<T>(zult: Result<Option<T>>, name: &str, errors: &mut Vec<Error>) -> Option<T> {
    match zult {
        Ok(converted) => converted,
        Err(err) => {
            warn!("dropping {name}: {err}");
            errors.push(err);
            None
        }
    }
}
