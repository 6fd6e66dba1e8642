use std::collections::BTreeMap;
use std::io::{stdout, Write};
use std::path::Path;

use adcp::{Decoder, DecoderConfig, Ensemble, Error};
use anyhow::{Context, Result};
use handlebars::handlebars_helper;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone)]
pub enum Format {
    Json,
    Text,
}

impl clap::ValueEnum for Format {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Json, Self::Text]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        match self {
            Self::Json => Some(clap::builder::PossibleValue::new("json")),
            Self::Text => Some(clap::builder::PossibleValue::new("text")),
        }
    }
}

#[derive(Default, Debug, Clone, Serialize)]
struct Summary {
    total_ensembles: usize,
    checksum_mismatches: usize,
    other_errors: usize,
    first_ensemble: Option<u32>,
    last_ensemble: Option<u32>,
    first_time: Option<String>,
    last_time: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct Info {
    filename: String,
    format: String,
    summary: Summary,
    /// Warning count by kind.
    warnings: BTreeMap<&'static str, usize>,
    /// Ensembles carrying each dataset kind.
    datasets: BTreeMap<String, usize>,
}

fn error_kind(err: &Error) -> &'static str {
    match err {
        Error::OutOfBounds { .. } => "out_of_bounds",
        Error::MarkerNotFound { .. } => "marker_not_found",
        Error::ChecksumMismatch { .. } => "checksum_mismatch",
        Error::IncompleteFrame { .. } => "incomplete_frame",
        Error::InvalidHeader(_) => "invalid_header",
        Error::UnknownDatasetCode { .. } => "unknown_dataset_code",
        Error::MissingCrossDependency { .. } => "missing_cross_dependency",
        Error::InvalidDataset { .. } => "invalid_dataset",
        Error::MalformedNmeaSentence(_) => "malformed_nmea_sentence",
        Error::InvalidBeamCount(_) => "invalid_beam_count",
        Error::Io(_) => "io",
        _ => "other",
    }
}

/// Names of the dataset slots populated in `ens`.
fn dataset_kinds(ens: &Ensemble) -> Result<Vec<String>> {
    let serde_json::Value::Object(map) =
        serde_json::to_value(ens).context("serializing ensemble")?
    else {
        return Ok(Vec::default());
    };
    Ok(map
        .into_iter()
        .filter(|(k, v)| !v.is_null() && k != "format" && k != "convention")
        .map(|(k, _)| k)
        .collect())
}

fn summarize(fpath: &Path, format: adcp::Format) -> Result<Info> {
    let reader = std::fs::File::open(fpath).context("opening input")?;

    let mut summary = Summary::default();
    let mut warnings: BTreeMap<&'static str, usize> = BTreeMap::default();
    let mut datasets: BTreeMap<String, usize> = BTreeMap::default();

    for zult in Decoder::new(DecoderConfig::new(format)).decode(reader) {
        let decoded = match zult {
            Ok(decoded) => decoded,
            Err(Error::ChecksumMismatch { .. }) => {
                summary.checksum_mismatches += 1;
                continue;
            }
            Err(err) => {
                debug!("{err}");
                summary.other_errors += 1;
                continue;
            }
        };
        summary.total_ensembles += 1;

        for warning in &decoded.warnings {
            *warnings.entry(error_kind(warning)).or_default() += 1;
        }
        for kind in dataset_kinds(&decoded.ensemble)? {
            *datasets.entry(kind).or_default() += 1;
        }

        let Some(cfg) = decoded.ensemble.cfg() else {
            continue;
        };
        if let Some(num) = cfg.ensemble_number {
            summary.first_ensemble.get_or_insert(num);
            summary.last_ensemble = Some(num);
        }
        if let Some(time) = cfg.timestamp {
            summary.first_time.get_or_insert_with(|| time.to_string());
            summary.last_time = Some(time.to_string());
        }
    }

    Ok(Info {
        filename: fpath.to_string_lossy().to_string(),
        format: format.to_string(),
        summary,
        warnings,
        datasets,
    })
}

pub fn info(fpath: &Path, format: adcp::Format, output: &Format) -> Result<()> {
    let info = summarize(fpath, format)?;

    match output {
        Format::Json => {
            serde_json::to_writer_pretty(stdout(), &info).context("serializing to json")
        }
        Format::Text => {
            let data = render_text(&info).context("serializing info")?;
            stdout()
                .write_all(str::as_bytes(&data))
                .context("writing to stdout")
        }
    }
}

fn text(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.to_owned(),
        serde_json::Value::Null => String::new(),
        _ => v.to_string(),
    }
}

fn render_text(info: &Info) -> Result<String> {
    handlebars_helper!(left_pad: |num: u64, v: Json| {
        let num = usize::try_from(num).unwrap_or_default();
        format!("{:>num$}", text(v))
    });
    handlebars_helper!(right_pad: |num: u64, v: Json| {
        let num = usize::try_from(num).unwrap_or_default();
        format!("{:<num$}", text(v))
    });
    let mut hb = handlebars::Handlebars::new();
    hb.register_helper("lpad", Box::new(left_pad));
    hb.register_helper("rpad", Box::new(right_pad));
    hb.register_escape_fn(handlebars::no_escape);
    hb.register_template_string("info", TEXT_TEMPLATE)
        .context("compiling template")?;

    hb.render("info", &info).context("rendering text")
}

const TEXT_TEMPLATE: &str = r"{{ filename }} ({{ format }})
===============================================================================================
Ensembles:  {{ summary.total_ensembles }}
First:      {{ summary.first_ensemble }} {{ summary.first_time }}
Last:       {{ summary.last_ensemble }} {{ summary.last_time }}
Checksum:   {{ summary.checksum_mismatches }} mismatches
Errors:     {{ summary.other_errors }}
-----------------------------------------------------------------------------------------------
Dataset                           Count
-----------------------------------------------------------------------------------------------
{{ #each datasets }}{{ rpad 32 @key }} {{ lpad 6 this }}
{{/each }}
-----------------------------------------------------------------------------------------------
Warning                           Count
-----------------------------------------------------------------------------------------------
{{ #each warnings }}{{ rpad 32 @key }} {{ lpad 6 this }}
{{/each }}
";
