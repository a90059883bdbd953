//! Typed decoding of single metadata streams

use crate::error::{Result, XrmError};
use crate::io::Container;
use crate::types::{FieldKind, FieldSpec, FieldValue};
use crate::utils::trim_nul;
use tracing::debug;

/// Decode the stream at `path` according to `spec`
///
/// Returns `Ok(None)` when the stream does not exist. Values are always
/// little-endian.
pub fn read_field<C: Container + ?Sized>(
    container: &mut C,
    path: &str,
    spec: FieldSpec,
) -> Result<Option<FieldValue>> {
    if !container.exists(path) {
        debug!(path, "field absent");
        return Ok(None);
    }

    let data = container.read(path)?;
    let expected = spec.byte_len();
    if data.len() != expected {
        return Err(XrmError::MalformedRecord {
            path: path.to_string(),
            expected,
            actual: data.len(),
        });
    }
    debug!(path, count = spec.count, kind = ?spec.kind, "decoded field");

    let value = match spec.kind {
        FieldKind::U32 => FieldValue::U32(
            data.chunks_exact(4)
                .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect(),
        ),
        FieldKind::F32 => FieldValue::F32(
            data.chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect(),
        ),
        FieldKind::Bytes(_) => FieldValue::Bytes(data.to_vec()),
    };
    Ok(Some(value))
}

/// Read a scalar `u32`, or `None` if absent
pub fn read_u32<C: Container + ?Sized>(container: &mut C, path: &str) -> Result<Option<u32>> {
    Ok(read_field(container, path, FieldSpec::u32())?.and_then(|v| v.as_u32()))
}

/// Read a scalar `u32` that must be present
pub fn require_u32<C: Container + ?Sized>(container: &mut C, path: &str) -> Result<u32> {
    read_u32(container, path)?.ok_or_else(|| XrmError::MissingField(path.to_string()))
}

/// Read a scalar `f32`, or `None` if absent
pub fn read_f32<C: Container + ?Sized>(container: &mut C, path: &str) -> Result<Option<f32>> {
    Ok(read_field(container, path, FieldSpec::f32())?.and_then(|v| v.as_f32()))
}

/// Read `count` consecutive `f32` values, or `None` if absent
pub fn read_f32_array<C: Container + ?Sized>(
    container: &mut C,
    path: &str,
    count: usize,
) -> Result<Option<Vec<f32>>> {
    Ok(read_field(container, path, FieldSpec::f32_array(count))?.and_then(|v| v.into_f32_vec()))
}

/// Read a fixed-width string, cut at the first NUL byte
pub fn read_string<C: Container + ?Sized>(
    container: &mut C,
    path: &str,
    width: usize,
) -> Result<Option<String>> {
    Ok(read_field(container, path, FieldSpec::bytes(width))?
        .and_then(|v| v.into_bytes())
        .map(|bytes| trim_nul(&bytes)))
}
