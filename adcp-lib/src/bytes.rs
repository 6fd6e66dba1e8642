//! Bounds-checked primitive reads over a byte slice.
//!
//! [ByteCursor] holds no position of its own. Callers either read at an absolute
//! offset with [ByteCursor::get] or thread their own position through
//! [ByteCursor::read], which advances it by the width of the value read.
use crate::prelude::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

/// A fixed-width value that can be decoded from raw bytes.
pub trait Primitive: Copy {
    const WIDTH: usize;

    /// Decode from exactly [Self::WIDTH] bytes.
    fn from_slice(dat: &[u8], endian: Endian) -> Self;
}

macro_rules! primitive {
    ($($t:ty),*) => {
        $(
            impl Primitive for $t {
                const WIDTH: usize = std::mem::size_of::<$t>();

                fn from_slice(dat: &[u8], endian: Endian) -> Self {
                    let mut buf = [0u8; std::mem::size_of::<$t>()];
                    buf.copy_from_slice(dat);
                    match endian {
                        Endian::Little => <$t>::from_le_bytes(buf),
                        Endian::Big => <$t>::from_be_bytes(buf),
                    }
                }
            }
        )*
    };
}

primitive!(u8, i8, u16, i16, u32, i32, f32, f64);

#[derive(Clone, Copy, Debug)]
pub struct ByteCursor<'a> {
    dat: &'a [u8],
}

impl<'a> ByteCursor<'a> {
    #[must_use]
    pub const fn new(dat: &'a [u8]) -> Self {
        Self { dat }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.dat.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.dat.is_empty()
    }

    #[must_use]
    pub const fn as_slice(&self) -> &'a [u8] {
        self.dat
    }

    /// Return `len` bytes starting at `offset`.
    ///
    /// # Errors
    /// [Error::OutOfBounds] if the range is not entirely within the buffer.
    pub fn bytes(&self, offset: usize, len: usize) -> Result<&'a [u8]> {
        let end = offset.checked_add(len).ok_or(Error::OutOfBounds {
            offset,
            width: len,
            len: self.dat.len(),
        })?;
        self.dat.get(offset..end).ok_or(Error::OutOfBounds {
            offset,
            width: len,
            len: self.dat.len(),
        })
    }

    /// A cursor over `len` bytes starting at `offset`.
    ///
    /// # Errors
    /// [Error::OutOfBounds] if the range is not entirely within the buffer.
    pub fn sub(&self, offset: usize, len: usize) -> Result<ByteCursor<'a>> {
        Ok(ByteCursor::new(self.bytes(offset, len)?))
    }

    /// Read a value at an absolute offset.
    ///
    /// # Errors
    /// [Error::OutOfBounds] if the value extends past the end of the buffer.
    pub fn get<T: Primitive>(&self, offset: usize, endian: Endian) -> Result<T> {
        Ok(T::from_slice(self.bytes(offset, T::WIDTH)?, endian))
    }

    /// Little-endian [ByteCursor::get]; both wire formats are little-endian.
    ///
    /// # Errors
    /// [Error::OutOfBounds] if the value extends past the end of the buffer.
    pub fn le<T: Primitive>(&self, offset: usize) -> Result<T> {
        self.get(offset, Endian::Little)
    }

    /// Read a value at `pos` and advance `pos` past it. `pos` is left untouched on error.
    ///
    /// # Errors
    /// [Error::OutOfBounds] if the value extends past the end of the buffer.
    pub fn read<T: Primitive>(&self, pos: &mut usize, endian: Endian) -> Result<T> {
        let val = self.get(*pos, endian)?;
        *pos += T::WIDTH;
        Ok(val)
    }

    /// Read `count` consecutive little-endian values starting at `offset`.
    ///
    /// # Errors
    /// [Error::OutOfBounds] if any value extends past the end of the buffer.
    pub fn le_array<T: Primitive>(&self, offset: usize, count: usize) -> Result<Vec<T>> {
        let mut pos = offset;
        (0..count)
            .map(|_| self.read(&mut pos, Endian::Little))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_both_endians() {
        let dat = [0x01, 0x02, 0x03, 0x04];
        let cur = ByteCursor::new(&dat);

        assert_eq!(cur.get::<u16>(0, Endian::Little).unwrap(), 0x0201);
        assert_eq!(cur.get::<u16>(0, Endian::Big).unwrap(), 0x0102);
        assert_eq!(cur.get::<u32>(0, Endian::Little).unwrap(), 0x0403_0201);
        assert_eq!(cur.get::<i8>(3, Endian::Big).unwrap(), 4);
    }

    #[test]
    fn test_float() {
        let dat = 88.888_f32.to_le_bytes();
        let cur = ByteCursor::new(&dat);
        let val: f32 = cur.le(0).expect("float should decode");
        assert!((val - 88.888).abs() < f32::EPSILON);
    }

    #[test]
    fn test_read_advances_position() {
        let dat = [0xff, 0xff, 0x7f, 0x7f, 0x09];
        let cur = ByteCursor::new(&dat);
        let mut pos = 0;

        let a: i16 = cur.read(&mut pos, Endian::Little).unwrap();
        assert_eq!(a, -1);
        assert_eq!(pos, 2);
        let b: u16 = cur.read(&mut pos, Endian::Little).unwrap();
        assert_eq!(b, 0x7f7f);
        assert_eq!(pos, 4);

        let zult = cur.read::<u16>(&mut pos, Endian::Little);
        assert!(
            matches!(
                zult,
                Err(Error::OutOfBounds {
                    offset: 4,
                    width: 2,
                    len: 5
                })
            ),
            "got {zult:?}"
        );
        assert_eq!(pos, 4, "position must not move on failure");
    }

    #[test]
    fn test_out_of_bounds_does_not_overflow() {
        let dat = [0u8; 4];
        let cur = ByteCursor::new(&dat);
        assert!(cur.bytes(usize::MAX, 2).is_err());
        assert!(cur.get::<f64>(0, Endian::Little).is_err());
        assert!(cur.bytes(4, 0).is_ok());
    }

    #[test]
    fn test_sub_cursor_is_rebased() {
        let dat = [0, 1, 2, 3, 4, 5];
        let cur = ByteCursor::new(&dat).sub(2, 3).expect("sub range is valid");
        assert_eq!(cur.len(), 3);
        assert_eq!(cur.le::<u8>(0).unwrap(), 2);
        assert!(cur.le::<u8>(3).is_err());
    }

    #[test]
    fn test_le_array() {
        let dat = [1, 0, 2, 0, 3, 0];
        let cur = ByteCursor::new(&dat);
        assert_eq!(cur.le_array::<u16>(0, 3).unwrap(), vec![1, 2, 3]);
        assert!(cur.le_array::<u16>(2, 3).is_err());
    }
}
