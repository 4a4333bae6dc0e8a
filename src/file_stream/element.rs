//! Fixed-size element types accepted by the raw `read_raw`/`write_raw` calls.
//!
//! Elements are copied in native byte order, so a file written on one machine
//! is only readable on a machine with the same endianness. That matches the
//! binary model and corpus formats these streams carry.

use std::mem::size_of;

/// A plain numeric type that can be copied to and from raw bytes.
pub trait RawElement: Copy {
    /// Width in bytes
    const SIZE: usize;

    /// Write `self` into `out`, which is exactly `SIZE` bytes long
    fn store(self, out: &mut [u8]);

    /// Read a value from `bytes`, which is exactly `SIZE` bytes long
    fn load(bytes: &[u8]) -> Self;
}

macro_rules! impl_raw_element {
    ($($ty:ty),* $(,)?) => {
        $(
            impl RawElement for $ty {
                const SIZE: usize = size_of::<$ty>();

                fn store(self, out: &mut [u8]) {
                    out.copy_from_slice(&self.to_ne_bytes());
                }

                fn load(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    <$ty>::from_ne_bytes(raw)
                }
            }
        )*
    };
}

impl_raw_element!(u8, i8, u16, i16, u32, i32, u64, i64, u128, i128, usize, isize, f32, f64);

/// Byte length of `count` elements of `T`
pub fn byte_len<T: RawElement>(count: usize) -> usize {
    count * T::SIZE
}

pub(crate) fn encode<T: RawElement>(values: &[T]) -> Vec<u8> {
    let mut bytes = vec![0u8; byte_len::<T>(values.len())];
    for (value, chunk) in values.iter().zip(bytes.chunks_exact_mut(T::SIZE)) {
        value.store(chunk);
    }
    bytes
}

pub(crate) fn decode_into<T: RawElement>(bytes: &[u8], values: &mut [T]) {
    for (value, chunk) in values.iter_mut().zip(bytes.chunks_exact(T::SIZE)) {
        *value = T::load(chunk);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes() {
        assert_eq!(<u8 as RawElement>::SIZE, 1);
        assert_eq!(<f32 as RawElement>::SIZE, 4);
        assert_eq!(<u64 as RawElement>::SIZE, 8);
        assert_eq!(byte_len::<f32>(5), 20);
    }

    #[test]
    fn test_encode_matches_native_bytes() {
        let values = [1.5f32, -2.25];
        let bytes = encode(&values);
        let mut expected = Vec::new();
        expected.extend_from_slice(&1.5f32.to_ne_bytes());
        expected.extend_from_slice(&(-2.25f32).to_ne_bytes());
        assert_eq!(bytes, expected);

        let mut decoded = [0f32; 2];
        decode_into(&bytes, &mut decoded);
        assert_eq!(decoded, values);
    }

    #[test]
    fn test_zero_width_slices() {
        let empty: [u32; 0] = [];
        assert!(encode(&empty).is_empty());
    }
}
