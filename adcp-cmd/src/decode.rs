use std::io::{stdout, BufWriter, Write};
use std::path::Path;

use adcp::{Cfg, Decoder, DecoderConfig, Ensemble, Sensor};
use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Serialize)]
struct Document<'a> {
    offset: Option<usize>,
    warnings: Vec<String>,
    cfg: Option<Cfg>,
    sensor: Option<Sensor>,
    ensemble: &'a Ensemble,
}

pub fn decode(fpath: &Path, config: DecoderConfig) -> Result<()> {
    let reader = std::fs::File::open(fpath).context("opening input")?;
    let mut out = BufWriter::new(stdout().lock());

    let (mut count, mut errors) = (0usize, 0usize);
    for zult in Decoder::new(config).decode(reader) {
        let decoded = match zult {
            Ok(decoded) => decoded,
            Err(err) => {
                errors += 1;
                warn!("{err}");
                continue;
            }
        };
        let doc = Document {
            offset: decoded.offset,
            warnings: decoded.warnings.iter().map(ToString::to_string).collect(),
            cfg: decoded.ensemble.cfg(),
            sensor: decoded.ensemble.sensor(),
            ensemble: &decoded.ensemble,
        };
        serde_json::to_writer(&mut out, &doc).context("serializing ensemble")?;
        out.write_all(b"\n").context("writing to stdout")?;
        count += 1;
    }
    out.flush().context("writing to stdout")?;

    info!("decoded {count} ensembles with {errors} errors from {fpath:?}");
    Ok(())
}
