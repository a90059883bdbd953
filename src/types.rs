//! Core data types for XRM/TXRM decoding

use crate::error::{Result, XrmError};
use ndarray::{Array2, Array3, Axis};
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pixel formats stored in `ImageInfo/DataType`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u32)]
pub enum PixelFormat {
    /// Unsigned 16-bit integer
    U16 = 5,
    /// 32-bit floating point
    F32 = 10,
}

impl PixelFormat {
    /// Resolve a stored data-type code
    pub fn from_code(code: u32) -> Result<Self> {
        match code {
            5 => Ok(PixelFormat::U16),
            10 => Ok(PixelFormat::F32),
            other => Err(XrmError::UnsupportedPixelFormat(other)),
        }
    }

    /// The code as stored in the container
    pub fn code(&self) -> u32 {
        *self as u32
    }

    /// Size in bytes of one pixel
    pub fn size_in_bytes(&self) -> usize {
        match self {
            PixelFormat::U16 => 2,
            PixelFormat::F32 => 4,
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Element types a page can be decoded into
pub trait Pixel: Copy + Zero + fmt::Debug + Send + Sync + 'static {
    /// Format this element type corresponds to
    const FORMAT: PixelFormat;

    /// Decode one little-endian element; `bytes` is exactly one element wide
    fn from_le_slice(bytes: &[u8]) -> Self;
}

impl Pixel for u16 {
    const FORMAT: PixelFormat = PixelFormat::U16;

    fn from_le_slice(bytes: &[u8]) -> Self {
        u16::from_le_bytes([bytes[0], bytes[1]])
    }
}

impl Pixel for f32 {
    const FORMAT: PixelFormat = PixelFormat::F32;

    fn from_le_slice(bytes: &[u8]) -> Self {
        f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }
}

/// Primitive element kinds of metadata streams
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    U32,
    F32,
    /// Fixed-width, NUL-padded byte string
    Bytes(usize),
}

impl FieldKind {
    pub fn size_in_bytes(&self) -> usize {
        match self {
            FieldKind::U32 | FieldKind::F32 => 4,
            FieldKind::Bytes(width) => *width,
        }
    }
}

/// Shape of a metadata stream: `count` elements of `kind`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub count: usize,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub fn u32() -> Self {
        Self {
            count: 1,
            kind: FieldKind::U32,
        }
    }

    pub fn f32() -> Self {
        Self {
            count: 1,
            kind: FieldKind::F32,
        }
    }

    pub fn f32_array(count: usize) -> Self {
        Self {
            count,
            kind: FieldKind::F32,
        }
    }

    pub fn bytes(width: usize) -> Self {
        Self {
            count: 1,
            kind: FieldKind::Bytes(width),
        }
    }

    /// Expected stream length in bytes
    pub fn byte_len(&self) -> usize {
        self.count * self.kind.size_in_bytes()
    }
}

/// Decoded contents of a metadata stream
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    U32(Vec<u32>),
    F32(Vec<f32>),
    Bytes(Vec<u8>),
}

impl FieldValue {
    /// First element of a `U32` field
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            FieldValue::U32(values) => values.first().copied(),
            _ => None,
        }
    }

    /// First element of an `F32` field
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            FieldValue::F32(values) => values.first().copied(),
            _ => None,
        }
    }

    pub fn into_f32_vec(self) -> Option<Vec<f32>> {
        match self {
            FieldValue::F32(values) => Some(values),
            _ => None,
        }
    }

    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            FieldValue::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }
}

/// A single decoded page, axes (row, column)
#[derive(Debug, Clone, PartialEq)]
pub enum Image {
    U16(Array2<u16>),
    F32(Array2<f32>),
}

impl Image {
    pub fn pixel_format(&self) -> PixelFormat {
        match self {
            Image::U16(_) => PixelFormat::U16,
            Image::F32(_) => PixelFormat::F32,
        }
    }

    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        match self {
            Image::U16(a) => a.dim(),
            Image::F32(a) => a.dim(),
        }
    }

    pub fn as_u16(&self) -> Option<&Array2<u16>> {
        match self {
            Image::U16(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<&Array2<f32>> {
        match self {
            Image::F32(a) => Some(a),
            _ => None,
        }
    }
}

/// A stack of decoded pages, axes (image, row, column)
#[derive(Debug, Clone, PartialEq)]
pub enum Volume {
    U16(Array3<u16>),
    F32(Array3<f32>),
}

impl Volume {
    pub fn pixel_format(&self) -> PixelFormat {
        match self {
            Volume::U16(_) => PixelFormat::U16,
            Volume::F32(_) => PixelFormat::F32,
        }
    }

    /// (images, rows, columns)
    pub fn shape(&self) -> [usize; 3] {
        let (n, h, w) = match self {
            Volume::U16(a) => a.dim(),
            Volume::F32(a) => a.dim(),
        };
        [n, h, w]
    }

    /// Number of images along the leading axis
    pub fn len(&self) -> usize {
        self.shape()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy out the image at `position` of the leading axis
    pub fn image(&self, position: usize) -> Option<Image> {
        if position >= self.len() {
            return None;
        }
        Some(match self {
            Volume::U16(a) => Image::U16(a.index_axis(Axis(0), position).to_owned()),
            Volume::F32(a) => Image::F32(a.index_axis(Axis(0), position).to_owned()),
        })
    }

    pub fn as_u16(&self) -> Option<&Array3<u16>> {
        match self {
            Volume::U16(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<&Array3<f32>> {
        match self {
            Volume::F32(a) => Some(a),
            _ => None,
        }
    }
}
