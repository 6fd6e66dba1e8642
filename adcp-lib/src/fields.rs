//! Declarative fixed-layout field tables.
//!
//! A record with a fixed byte layout is described by a `const` table of [Field]s and
//! read in one call to [read_table]. The returned array is destructured into the
//! record's named fields, keeping byte offsets in one place per record.
use crate::bytes::ByteCursor;
use crate::prelude::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Width {
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
}

impl Width {
    #[must_use]
    pub const fn bytes(self) -> usize {
        match self {
            Width::U8 => 1,
            Width::I16 | Width::U16 => 2,
            Width::I32 | Width::U32 | Width::F32 => 4,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Field {
    pub name: &'static str,
    /// Byte offset from the start of the record.
    pub offset: usize,
    pub width: Width,
    /// Multiplier applied to the raw value.
    pub scale: f64,
}

impl Field {
    #[must_use]
    pub const fn new(name: &'static str, offset: usize, width: Width) -> Self {
        Self {
            name,
            offset,
            width,
            scale: 1.0,
        }
    }

    /// A little-endian f32 at word `index`; RTB records are arrays of 4-byte words.
    #[must_use]
    pub const fn f32_word(name: &'static str, index: usize) -> Self {
        Self::new(name, index * 4, Width::F32)
    }

    #[must_use]
    pub const fn i32_word(name: &'static str, index: usize) -> Self {
        Self::new(name, index * 4, Width::I32)
    }

    #[must_use]
    pub const fn scaled(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Read this field from a record starting at `base`.
    ///
    /// # Errors
    /// [Error::OutOfBounds] if the field is not within the cursor.
    pub fn read(&self, cur: &ByteCursor, base: usize) -> Result<f64> {
        let offset = base + self.offset;
        let raw = match self.width {
            Width::U8 => f64::from(cur.le::<u8>(offset)?),
            Width::I16 => f64::from(cur.le::<i16>(offset)?),
            Width::U16 => f64::from(cur.le::<u16>(offset)?),
            Width::I32 => f64::from(cur.le::<i32>(offset)?),
            Width::U32 => f64::from(cur.le::<u32>(offset)?),
            Width::F32 => f64::from(cur.le::<f32>(offset)?),
        };
        Ok(raw * self.scale)
    }
}

/// Read every field of `table` from the record at `base`.
///
/// # Errors
/// [Error::OutOfBounds] for the first field that does not fit.
pub fn read_table<const N: usize>(
    cur: &ByteCursor,
    base: usize,
    table: &[Field; N],
) -> Result<[f64; N]> {
    let mut out = [0f64; N];
    for (val, field) in out.iter_mut().zip(table) {
        *val = field.read(cur, base)?;
    }
    Ok(out)
}

/// Number of bytes a table spans, i.e., the end of its furthest field.
#[must_use]
pub fn table_len(table: &[Field]) -> usize {
    table
        .iter()
        .map(|f| f.offset + f.width.bytes())
        .max()
        .unwrap_or(0)
}
