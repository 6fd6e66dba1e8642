#![doc = include_str!("../README.md")]

mod error;

pub mod bytes;
pub mod convert;
pub mod ensemble;
pub mod fields;
pub mod framing;
pub mod integrity;
pub mod nmea;
pub mod pd0;
pub mod registry;
pub mod rtb;
pub mod stream;
pub mod views;

pub use convert::{convert, convert_records, UnitConverter};
pub use ensemble::{Convention, Coordinate, DecodedEnsemble, Ensemble, Record};
pub use error::{Error, Result};
pub use framing::{Format, Frame, FrameScanner};
pub use registry::EnsembleDecoder;
pub use stream::{decode_stream, Decoder, DecoderConfig, FatalPolicy, StreamDecoder};
pub use views::{Cfg, Sensor};

mod prelude {
    pub use crate::error::{Error, Result};
}
