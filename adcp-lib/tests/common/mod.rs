#![allow(dead_code)]
//! Builders for synthetic RTB and PD0 frames.
use adcp::integrity::rtb_crc;

pub const TYPE_FLOAT: i32 = 10;
pub const TYPE_INT: i32 = 20;
pub const TYPE_BYTE: i32 = 50;

/// An RTB dataset with a header describing `bins` x `beams` values of `value_type`.
pub fn rtb_dataset(value_type: i32, bins: i32, beams: i32, name: &str, values: &[u8]) -> Vec<u8> {
    let mut dat = Vec::new();
    for word in [value_type, bins, beams, 0, 8] {
        dat.extend_from_slice(&word.to_le_bytes());
    }
    let mut tag = [0u8; 8];
    tag[..name.len()].copy_from_slice(name.as_bytes());
    dat.extend_from_slice(&tag);
    dat.extend_from_slice(values);
    dat
}

/// A beam-major float profile.
pub fn rtb_floats(name: &str, rows: &[&[f32]]) -> Vec<u8> {
    let beams = rows.len() as i32;
    let bins = rows.first().map_or(0, |r| r.len()) as i32;
    let values: Vec<u8> = rows
        .iter()
        .flat_map(|r| r.iter())
        .flat_map(|v| v.to_le_bytes())
        .collect();
    rtb_dataset(TYPE_FLOAT, bins, beams, name, &values)
}

pub fn rtb_ensemble_data(ens_num: i32, bins: i32, beams: i32, pings: i32) -> Vec<u8> {
    let mut values = Vec::new();
    for word in [ens_num, bins, beams, pings, pings, 0, 2024, 3, 15, 12, 30, 45, 50] {
        values.extend_from_slice(&word.to_le_bytes());
    }
    let mut serial = [b'0'; 32];
    serial[31] = b'1';
    values.extend_from_slice(&serial);
    values.extend_from_slice(&[3, 2, 0, b'3']);
    values.extend_from_slice(&[0, 0, 0, 1]);
    rtb_dataset(TYPE_INT, 23, 1, "E000008", &values)
}

pub fn rtb_ancillary(roll: f32, pressure: f32) -> Vec<u8> {
    let mut words = [0f32; 19];
    words[0] = 0.5;
    words[1] = 1.0;
    words[4] = 270.0;
    words[6] = roll;
    words[9] = 35.0;
    words[10] = pressure;
    words[11] = 2.0;
    words[12] = 1500.0;
    let values: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
    rtb_dataset(TYPE_FLOAT, 19, 1, "E000009", &values)
}

/// A complete RTB frame around `datasets`.
pub fn rtb_frame(ens_num: u32, datasets: &[Vec<u8>]) -> Vec<u8> {
    let payload: Vec<u8> = datasets.concat();
    let size = payload.len() as u32;
    let mut frame = vec![0x80; 16];
    frame.extend_from_slice(&ens_num.to_le_bytes());
    frame.extend_from_slice(&(!ens_num).to_le_bytes());
    frame.extend_from_slice(&size.to_le_bytes());
    frame.extend_from_slice(&(!size).to_le_bytes());
    frame.extend_from_slice(&payload);
    frame.extend_from_slice(&u32::from(rtb_crc(&payload)).to_le_bytes());
    frame
}

/// Fixed leader for a 300kHz, 20 degree, 4-beam janus with `coord_transform` as the
/// coordinate transform byte.
pub fn pd0_fixed_leader(beams: u8, cells: u8, pings: u16, coord_transform: u8) -> Vec<u8> {
    let mut dat = vec![0u8; 59];
    dat[2] = 51;
    dat[3] = 17;
    dat[4] = 0b0100_1010;
    dat[5] = 0b0100_0001;
    dat[8] = beams;
    dat[9] = cells;
    dat[10..12].copy_from_slice(&pings.to_le_bytes());
    dat[12..14].copy_from_slice(&100u16.to_le_bytes());
    dat[14..16].copy_from_slice(&50u16.to_le_bytes());
    dat[18] = 1;
    dat[25] = coord_transform;
    dat
}

pub fn pd0_variable_leader(ens_num: u16) -> Vec<u8> {
    let mut dat = vec![0u8; 65];
    dat[0] = 0x80;
    dat[2..4].copy_from_slice(&ens_num.to_le_bytes());
    dat[4..11].copy_from_slice(&[24, 3, 15, 12, 30, 45, 50]);
    dat[14..16].copy_from_slice(&1500u16.to_le_bytes());
    dat[16..18].copy_from_slice(&25u16.to_le_bytes());
    dat[18..20].copy_from_slice(&27000u16.to_le_bytes());
    dat[22..24].copy_from_slice(&(-250i16).to_le_bytes());
    dat[24..26].copy_from_slice(&35u16.to_le_bytes());
    dat[26..28].copy_from_slice(&1250i16.to_le_bytes());
    dat[48..52].copy_from_slice(&10_000u32.to_le_bytes());
    dat[57..65].copy_from_slice(&[20, 24, 3, 15, 12, 30, 45, 50]);
    dat
}

/// Cell-major i16 velocities, `cells[cell][beam]`.
pub fn pd0_velocity(cells: &[&[i16]]) -> Vec<u8> {
    let mut dat = vec![0x00, 0x01];
    for v in cells.iter().flat_map(|c| c.iter()) {
        dat.extend_from_slice(&v.to_le_bytes());
    }
    dat
}

/// A complete PD0 frame with `datasets` laid out in order.
pub fn pd0_frame(datasets: &[Vec<u8>]) -> Vec<u8> {
    let table_end = 6 + 2 * datasets.len();
    let mut offsets = Vec::new();
    let mut offset = table_end;
    for ds in datasets {
        offsets.push(offset as u16);
        offset += ds.len();
    }
    pd0_frame_with_offsets(&offsets, &datasets.concat())
}

/// A PD0 frame whose offset table is given explicitly.
pub fn pd0_frame_with_offsets(offsets: &[u16], body: &[u8]) -> Vec<u8> {
    let nbytes = 6 + 2 * offsets.len() + body.len();
    let mut frame = vec![0x7f, 0x7f];
    frame.extend_from_slice(&(nbytes as u16).to_le_bytes());
    frame.push(0);
    frame.push(offsets.len() as u8);
    for o in offsets {
        frame.extend_from_slice(&o.to_le_bytes());
    }
    frame.extend_from_slice(body);
    let sum = frame
        .iter()
        .fold(0u16, |acc, &b| acc.wrapping_add(u16::from(b)));
    frame.extend_from_slice(&sum.to_le_bytes());
    frame
}
