use ndarray::Array2;

use super::{TYPE_BYTE, TYPE_INT};
use crate::ensemble::{
    Amplitude, Convention, Coordinate, Correlation, GoodPings, Matrix, Record, Velocity,
};
use crate::prelude::*;
use crate::registry::DatasetInput;

/// Read a profile dataset into a `[beam, bin]` matrix. Values are beam-major on the
/// wire and the shape always comes from the dataset header.
pub(crate) fn read_matrix(input: &DatasetInput) -> Result<Matrix> {
    let shape = input.shape("dataset header")?;
    let count = shape.beams * shape.bins;
    let values: Vec<f64> = match input.value_type {
        Some(TYPE_INT) => input
            .cursor
            .le_array::<i32>(0, count)?
            .into_iter()
            .map(f64::from)
            .collect(),
        Some(TYPE_BYTE) => input
            .cursor
            .le_array::<u8>(0, count)?
            .into_iter()
            .map(f64::from)
            .collect(),
        _ => input
            .cursor
            .le_array::<f32>(0, count)?
            .into_iter()
            .map(f64::from)
            .collect(),
    };
    Array2::from_shape_vec((shape.beams, shape.bins), values)
        .map_err(|err| input.invalid(err.to_string()))
}

fn velocity(input: &DatasetInput, coordinate: Coordinate) -> Result<Record> {
    Ok(Velocity {
        coordinate,
        convention: Convention::Native,
        values: read_matrix(input)?,
    }
    .into())
}

pub(crate) fn decode_beam_velocity(input: &DatasetInput) -> Result<Record> {
    velocity(input, Coordinate::Beam)
}

pub(crate) fn decode_instrument_velocity(input: &DatasetInput) -> Result<Record> {
    velocity(input, Coordinate::Instrument)
}

pub(crate) fn decode_earth_velocity(input: &DatasetInput) -> Result<Record> {
    velocity(input, Coordinate::Earth)
}

pub(crate) fn decode_amplitude(input: &DatasetInput) -> Result<Record> {
    Ok(Amplitude {
        convention: Convention::Native,
        values: read_matrix(input)?,
    }
    .into())
}

pub(crate) fn decode_correlation(input: &DatasetInput) -> Result<Record> {
    Ok(Correlation {
        convention: Convention::Native,
        values: read_matrix(input)?,
    }
    .into())
}

fn good_pings(input: &DatasetInput, coordinate: Coordinate) -> Result<Record> {
    Ok(GoodPings {
        coordinate,
        convention: Convention::Native,
        values: read_matrix(input)?,
    }
    .into())
}

pub(crate) fn decode_good_beam(input: &DatasetInput) -> Result<Record> {
    good_pings(input, Coordinate::Beam)
}

pub(crate) fn decode_good_earth(input: &DatasetInput) -> Result<Record> {
    good_pings(input, Coordinate::Earth)
}
