//! NMEA 0183 sentences carried in RTB ensembles.
use crate::ensemble::Record;
use crate::prelude::*;
use crate::registry::DatasetInput;

/// A sentence as found in the dataset and whether its checksum passed.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct NmeaSentence {
    pub text: String,
    pub valid: bool,
}

/// Fix data from the last valid GGA sentence.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Gga {
    pub header: String,
    pub utc: Option<f64>,
    /// Decimal degrees, unsigned; see `latitude_ref`.
    pub latitude: Option<f64>,
    pub latitude_ref: String,
    /// Decimal degrees, unsigned; see `longitude_ref`.
    pub longitude: Option<f64>,
    pub longitude_ref: String,
    pub quality: Option<f64>,
    pub num_satellites: Option<f64>,
    pub hdop: Option<f64>,
    pub altitude: Option<f64>,
    pub altitude_unit: String,
    pub geoid: Option<f64>,
    pub geoid_unit: String,
    pub dgps_age: Option<f64>,
    pub reference_station: Option<f64>,
}

/// Course and speed over ground from the last valid VTG sentence.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Vtg {
    pub header: String,
    pub course_true: Option<f64>,
    pub true_indicator: String,
    pub course_magnetic: Option<f64>,
    pub magnetic_indicator: String,
    pub speed_knots: Option<f64>,
    pub knots_indicator: String,
    pub speed_kph: Option<f64>,
    pub kph_indicator: String,
    pub mode: String,
}

/// True heading from the last valid HDT sentence.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Hdt {
    pub header: String,
    pub heading: Option<f64>,
    pub true_indicator: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Nmea {
    /// Every sentence in the dataset, in order.
    pub sentences: Vec<NmeaSentence>,
    // Checksum-valid sentences by type
    pub gga: Vec<String>,
    pub gsa: Vec<String>,
    pub vtg: Vec<String>,
    pub dbt: Vec<String>,
    pub hdt: Vec<String>,
    pub position: Option<Gga>,
    pub course: Option<Vtg>,
    pub heading: Option<Hdt>,
    /// Descriptions of sentences that failed their checksum or could not be parsed.
    pub malformed: Vec<String>,
}

impl Nmea {
    /// Parse whitespace separated sentences.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut nmea = Nmea::default();

        for sentence in text.split_whitespace() {
            let valid = checksum_ok(sentence);
            nmea.sentences.push(NmeaSentence {
                text: sentence.to_string(),
                valid,
            });
            if !valid {
                nmea.malformed.push(format!("bad checksum: {sentence}"));
                continue;
            }

            let lower = sentence.to_ascii_lowercase();
            for (kind, group) in [
                ("gga", &mut nmea.gga),
                ("gsa", &mut nmea.gsa),
                ("vtg", &mut nmea.vtg),
                ("dbt", &mut nmea.dbt),
                ("hdt", &mut nmea.hdt),
            ] {
                if lower.contains(kind) {
                    group.push(sentence.to_string());
                }
            }
        }

        if let Some(last) = nmea.gga.last() {
            match parse_gga(last) {
                Some(gga) => nmea.position = Some(gga),
                None => nmea.malformed.push(format!("unparseable GGA: {last}")),
            }
        }
        if let Some(last) = nmea.vtg.last() {
            match parse_vtg(last) {
                Some(vtg) => nmea.course = Some(vtg),
                None => nmea.malformed.push(format!("unparseable VTG: {last}")),
            }
        }
        if let Some(last) = nmea.hdt.last() {
            match parse_hdt(last) {
                Some(hdt) => nmea.heading = Some(hdt),
                None => nmea.malformed.push(format!("unparseable HDT: {last}")),
            }
        }

        nmea
    }

    /// Number of sentences present.
    #[must_use]
    pub fn seen(&self) -> usize {
        self.sentences.len()
    }

    /// Number of sentences that passed their checksum.
    #[must_use]
    pub fn parsed(&self) -> usize {
        self.sentences.iter().filter(|s| s.valid).count()
    }

    /// One [Error::MalformedNmeaSentence] per malformed sentence.
    #[must_use]
    pub fn errors(&self) -> Vec<Error> {
        self.malformed
            .iter()
            .map(|m| Error::MalformedNmeaSentence(m.clone()))
            .collect()
    }
}

/// Check the trailing two hex digits against the XOR of the characters between `$`
/// and `*`.
#[must_use]
pub fn checksum_ok(sentence: &str) -> bool {
    let sentence = sentence.trim_end();
    let (Some(start), Some(star)) = (sentence.find('$'), sentence.find('*')) else {
        return false;
    };
    if star <= start || sentence.len() < 2 {
        return false;
    }
    let Some(expected) = sentence
        .get(sentence.len() - 2..)
        .and_then(|hex| u8::from_str_radix(hex, 16).ok())
    else {
        return false;
    };
    let actual = sentence[start + 1..star]
        .bytes()
        .filter(|b| *b != b'\r' && *b != b'\n')
        .fold(0u8, |acc, b| acc ^ b);
    actual == expected
}

/// Split into fields, with the `999.9` placeholder treated as empty.
fn fields(sentence: &str) -> Vec<&str> {
    sentence
        .split(',')
        .map(|f| if f == "999.9" { "" } else { f })
        .collect()
}

fn number(field: &str) -> Option<f64> {
    field.trim().parse().ok()
}

/// The part of the last field before the checksum.
fn before_star(field: &str) -> &str {
    field.split('*').next().unwrap_or(field)
}

fn parse_gga(sentence: &str) -> Option<Gga> {
    let f = fields(sentence);
    if f.len() < 15 {
        return None;
    }

    // ddmm.mmmm
    let latitude = match f[2] {
        "" => None,
        lat => Some(number(lat.get(..2)?)? + number(lat.get(2..)?)? / 60.0),
    };
    // dddmm.mmmm
    let longitude = number(f[4]).map(|lon| {
        let deg = (lon / 100.0).floor();
        deg + ((lon / 100.0) - deg) * 100.0 / 60.0
    });

    Some(Gga {
        header: f[0].to_string(),
        utc: number(f[1]),
        latitude,
        latitude_ref: f[3].to_string(),
        longitude,
        longitude_ref: f[5].to_string(),
        quality: number(f[6]),
        num_satellites: number(f[7]),
        hdop: number(f[8]),
        altitude: number(f[9]),
        altitude_unit: f[10].to_string(),
        geoid: number(f[11]),
        geoid_unit: f[12].to_string(),
        dgps_age: number(f[13]),
        reference_station: number(before_star(f[14])),
    })
}

fn parse_vtg(sentence: &str) -> Option<Vtg> {
    let f = fields(sentence);
    if f.len() < 10 {
        return None;
    }
    Some(Vtg {
        header: f[0].to_string(),
        course_true: number(f[1]),
        true_indicator: f[2].to_string(),
        course_magnetic: number(f[3]),
        magnetic_indicator: f[4].to_string(),
        speed_knots: number(f[5]),
        knots_indicator: f[6].to_string(),
        speed_kph: number(f[7]),
        kph_indicator: f[8].to_string(),
        mode: before_star(f[9]).to_string(),
    })
}

fn parse_hdt(sentence: &str) -> Option<Hdt> {
    let f = fields(sentence);
    if f.len() < 3 {
        return None;
    }
    Some(Hdt {
        header: f[0].to_string(),
        heading: number(f[1]),
        true_indicator: before_star(f[2]).to_string(),
    })
}

/// Decode the RTB NMEA dataset: raw text, one byte per element.
///
/// # Errors
/// [Error::OutOfBounds] if the dataset is shorter than its element count.
pub(crate) fn decode_nmea(input: &DatasetInput) -> Result<Record> {
    let len = input.shape.map_or(input.cursor.len(), |s| s.bins * s.beams);
    let raw = input.cursor.bytes(0, len)?;
    let text = String::from_utf8_lossy(raw);
    Ok(Nmea::parse(text.trim_end_matches('\0')).into())
}
