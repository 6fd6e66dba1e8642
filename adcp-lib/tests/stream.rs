mod common;

use std::fs::File;
use std::io::{Seek, SeekFrom, Write};

use adcp::{
    decode_stream, Convention, Decoder, DecoderConfig, Error, FatalPolicy, Format, StreamDecoder,
};
use ndarray::array;

use common::*;

fn rtb_ensemble(ens_num: u32) -> Vec<u8> {
    let num = ens_num as f32;
    rtb_frame(
        ens_num,
        &[
            rtb_floats("E000003", &[&[num], &[0.5], &[-0.25], &[0.0]]),
            rtb_ensemble_data(ens_num as i32, 1, 4, 10),
        ],
    )
}

fn deployment_file(frames: &[Vec<u8>]) -> File {
    let mut file = tempfile::tempfile().unwrap();
    for (idx, frame) in frames.iter().enumerate() {
        // noise between frames, some of it looking like the start of a delimiter
        file.write_all(&vec![0x80; idx]).unwrap();
        file.write_all(&[0x01, 0x02, 0x03]).unwrap();
        file.write_all(frame).unwrap();
    }
    file.seek(SeekFrom::Start(0)).unwrap();
    file
}

#[test]
fn test_decode_file_with_noise() {
    let frames: Vec<Vec<u8>> = (1..=5).map(rtb_ensemble).collect();
    let file = deployment_file(&frames);

    let config = DecoderConfig::builder()
        .format(Format::Rtb)
        .read_size(7)
        .build();
    let decoded: Vec<_> = Decoder::new(config)
        .decode(file)
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(decoded.len(), 5);
    let mut expected_offset = 0;
    for (idx, item) in decoded.iter().enumerate() {
        expected_offset += idx + 3;
        assert_eq!(item.offset, Some(expected_offset));
        expected_offset += frames[idx].len();

        let ens = item.ensemble.ensemble_data.as_ref().unwrap();
        assert_eq!(ens.ensemble_number, idx as i32 + 1);
        assert!(item.warnings.is_empty(), "{:?}", item.warnings);
    }
}

#[test]
fn test_decode_converts_to_pd0() {
    let file = deployment_file(&[rtb_ensemble(9)]);
    let config = DecoderConfig::builder()
        .format(Format::Rtb)
        .convention(Convention::Pd0Compatible)
        .build();

    let decoded: Vec<_> = Decoder::new(config).decode(file).collect();
    assert_eq!(decoded.len(), 1);
    let ens = &decoded[0].as_ref().unwrap().ensemble;
    assert_eq!(ens.convention, Convention::Pd0Compatible);
    let vel = ens.earth_velocity.as_ref().unwrap();
    // earth coordinates keep their order
    assert_eq!(vel.values, array![[9000.0], [500.0], [-250.0], [0.0]]);
    assert_eq!(ens.ensemble_data.as_ref().unwrap().year, 24);
}

#[test]
fn test_pd0_stream_stays_pd0_by_default() {
    let frame = pd0_frame(&[
        pd0_fixed_leader(4, 1, 10, 0b0000_0111),
        pd0_velocity(&[&[10, 20, 30, 40]]),
    ]);
    let zult: Vec<_> = decode_stream(Format::Pd0, &frame[..]).collect();
    assert_eq!(zult.len(), 1);
    let ens = zult[0].as_ref().unwrap();
    assert_eq!(ens.convention, Convention::Pd0Compatible);
    assert_eq!(
        ens.beam_velocity.as_ref().unwrap().values,
        array![[10.0], [20.0], [30.0], [40.0]]
    );
}

#[test]
fn test_corrupt_frame_is_skipped() {
    let mut corrupt = rtb_ensemble(2);
    let last = corrupt.len() - 10;
    corrupt[last] ^= 0xff;
    let mut dat = rtb_ensemble(1);
    dat.extend_from_slice(&corrupt);
    dat.extend_from_slice(&rtb_ensemble(3));

    let mut stream = StreamDecoder::new(DecoderConfig::new(Format::Rtb));
    let mut zult = Vec::new();
    for chunk in dat.chunks(100) {
        zult.extend(stream.feed(chunk));
    }
    zult.extend(stream.finish());

    let numbers: Vec<_> = zult
        .iter()
        .map(|z| match z {
            Ok(decoded) => Ok(decoded.ensemble.ensemble_data.as_ref().unwrap().ensemble_number),
            Err(Error::ChecksumMismatch { .. }) => Err("checksum"),
            Err(err) => panic!("unexpected error: {err}"),
        })
        .collect();
    assert_eq!(numbers, vec![Ok(1), Err("checksum"), Ok(3)]);
}

#[test]
fn test_truncated_stream() {
    let frame = rtb_ensemble(1);
    let truncated = &frame[..frame.len() - 5];

    let lenient = Decoder::new(DecoderConfig::new(Format::Rtb)).decode(truncated);
    assert_eq!(lenient.count(), 0);

    let config = DecoderConfig::builder()
        .format(Format::Rtb)
        .strict(true)
        .policy(FatalPolicy::Abort)
        .build();
    let zult: Vec<_> = Decoder::new(config).decode(truncated).collect();
    assert!(
        matches!(zult[..], [Err(Error::IncompleteFrame { .. })]),
        "{zult:?}"
    );
}

fn decode_chunked(dat: &[u8], chunk: usize) -> Vec<Result<u32, String>> {
    let mut stream = StreamDecoder::new(DecoderConfig::new(Format::Rtb));
    let mut zult = Vec::new();
    for chunk in dat.chunks(chunk) {
        zult.extend(stream.feed(chunk));
    }
    zult.extend(stream.finish());
    zult.into_iter()
        .map(|z| match z {
            Ok(decoded) => {
                Ok(decoded.ensemble.ensemble_data.as_ref().unwrap().ensemble_number as u32)
            }
            Err(Error::InvalidHeader(msg)) => Err(msg),
            Err(err) => panic!("unexpected error: {err}"),
        })
        .collect()
}

fn stream_with_bad_size(size: u32, complement: u32) -> Vec<u8> {
    let mut dat = rtb_ensemble(1);
    dat[24..28].copy_from_slice(&size.to_le_bytes());
    dat[28..32].copy_from_slice(&complement.to_le_bytes());
    for num in 2..=4 {
        dat.extend_from_slice(&rtb_ensemble(num));
    }
    dat
}

#[test]
fn test_size_without_matching_complement_is_rejected() {
    let original = rtb_ensemble(1);
    let complement = u32::from_le_bytes(original[28..32].try_into().unwrap());
    let dat = stream_with_bad_size(100_000, complement);

    for chunk in [1, 100, dat.len()] {
        let zult = decode_chunked(&dat, chunk);
        assert_eq!(zult.len(), 4, "{zult:?}");
        assert!(
            matches!(&zult[0], Err(msg) if msg.contains("complement")),
            "{zult:?}"
        );
        assert_eq!(zult[1..], [Ok(2), Ok(3), Ok(4)]);
    }
}

#[test]
fn test_oversized_frame_is_cut_at_next_delimiter() {
    // header is self consistent but claims more bytes than precede the next frame
    let dat = stream_with_bad_size(100_000, !100_000);

    for chunk in [1, 100, dat.len()] {
        let zult = decode_chunked(&dat, chunk);
        assert_eq!(zult.len(), 4, "{zult:?}");
        assert!(
            matches!(&zult[0], Err(msg) if msg.contains("cut short")),
            "{zult:?}"
        );
        assert_eq!(zult[1..], [Ok(2), Ok(3), Ok(4)]);
    }
}

#[test]
fn test_unconvertible_record_becomes_warning() {
    let frame = rtb_frame(
        7,
        &[
            rtb_ensemble_data(7, 1, 4, 10),
            rtb_floats("E000004", &[&[10.0], &[20.0], &[30.0], &[40.0], &[50.0]]),
            rtb_floats("E000003", &[&[1.0], &[0.5], &[-0.25], &[0.0]]),
        ],
    );
    let config = DecoderConfig::builder()
        .format(Format::Rtb)
        .convention(Convention::Pd0Compatible)
        .build();
    let mut stream = StreamDecoder::new(config);
    let mut zult = stream.feed(&frame);
    zult.extend(stream.finish());

    assert_eq!(zult.len(), 1, "{zult:?}");
    let decoded = zult[0].as_ref().unwrap();
    let ens = &decoded.ensemble;
    assert_eq!(ens.convention, Convention::Pd0Compatible);
    assert!(ens.amplitude.is_none());
    assert_eq!(
        ens.earth_velocity.as_ref().unwrap().values,
        array![[1000.0], [500.0], [-250.0], [0.0]]
    );
    assert!(
        matches!(decoded.warnings[..], [Error::InvalidBeamCount(5)]),
        "{:?}",
        decoded.warnings
    );
}
