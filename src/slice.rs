//! Slice normalization for windowed reads
//!
//! Bounds follow the usual array-slice rules: omitted bounds cover the whole
//! axis, negative bounds count from the end, and anything past either end is
//! clamped. Only positive steps are accepted since images are always read in
//! ascending order.

use crate::error::{Result, XrmError};
use std::ops::{Range, RangeFull};

/// Requested range along one axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AxisSlice {
    /// The whole axis
    #[default]
    Full,
    /// `0..stop`
    Stop(isize),
    /// `start..stop` every `step` elements
    Range {
        start: Option<isize>,
        stop: Option<isize>,
        step: Option<isize>,
    },
}

/// An axis range resolved against a concrete extent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedSlice {
    pub start: usize,
    pub stop: usize,
    pub step: usize,
}

impl NormalizedSlice {
    /// Number of selected elements
    pub fn len(&self) -> usize {
        if self.stop <= self.start {
            0
        } else {
            (self.stop - self.start).div_ceil(self.step)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Selected 0-based positions, ascending
    pub fn indices(&self) -> impl Iterator<Item = usize> {
        (self.start..self.stop).step_by(self.step)
    }
}

fn resolve_bound(bound: Option<isize>, default: usize, extent: usize) -> usize {
    match bound {
        None => default,
        Some(v) if v < 0 => extent.saturating_sub(v.unsigned_abs()),
        Some(v) => (v as usize).min(extent),
    }
}

impl AxisSlice {
    pub fn range(start: isize, stop: isize) -> Self {
        AxisSlice::Range {
            start: Some(start),
            stop: Some(stop),
            step: None,
        }
    }

    pub fn stepped(start: isize, stop: isize, step: isize) -> Self {
        AxisSlice::Range {
            start: Some(start),
            stop: Some(stop),
            step: Some(step),
        }
    }

    /// Resolve against an axis of length `extent`
    pub fn normalize(&self, extent: usize) -> Result<NormalizedSlice> {
        let (start, stop, step) = match *self {
            AxisSlice::Full => (None, None, None),
            AxisSlice::Stop(stop) => (None, Some(stop), None),
            AxisSlice::Range { start, stop, step } => (start, stop, step),
        };

        let step = step.unwrap_or(1);
        if step <= 0 {
            return Err(XrmError::InvalidSlice(format!(
                "Step must be positive, got {}",
                step
            )));
        }

        let start = resolve_bound(start, 0, extent);
        let stop = resolve_bound(stop, extent, extent).max(start);

        Ok(NormalizedSlice {
            start,
            stop,
            step: step as usize,
        })
    }
}

impl From<RangeFull> for AxisSlice {
    fn from(_: RangeFull) -> Self {
        AxisSlice::Full
    }
}

impl From<isize> for AxisSlice {
    fn from(stop: isize) -> Self {
        AxisSlice::Stop(stop)
    }
}

impl From<(isize, isize)> for AxisSlice {
    fn from((start, stop): (isize, isize)) -> Self {
        AxisSlice::range(start, stop)
    }
}

impl From<(isize, isize, isize)> for AxisSlice {
    fn from((start, stop, step): (isize, isize, isize)) -> Self {
        AxisSlice::stepped(start, stop, step)
    }
}

impl From<Range<usize>> for AxisSlice {
    fn from(range: Range<usize>) -> Self {
        AxisSlice::Range {
            start: Some(range.start.min(isize::MAX as usize) as isize),
            stop: Some(range.end.min(isize::MAX as usize) as isize),
            step: None,
        }
    }
}

/// Requested window over (image, row, column)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VolumeSlice {
    pub images: AxisSlice,
    pub rows: AxisSlice,
    pub columns: AxisSlice,
}

impl VolumeSlice {
    pub fn new(
        images: impl Into<AxisSlice>,
        rows: impl Into<AxisSlice>,
        columns: impl Into<AxisSlice>,
    ) -> Self {
        Self {
            images: images.into(),
            rows: rows.into(),
            columns: columns.into(),
        }
    }

    /// Every image, row and column
    pub fn all() -> Self {
        Self::default()
    }

    /// Select images only, keeping whole pages
    pub fn images(images: impl Into<AxisSlice>) -> Self {
        Self {
            images: images.into(),
            ..Self::default()
        }
    }

    /// Resolve all three axes against `dims` = (images, rows, columns)
    pub fn normalize(&self, dims: [usize; 3]) -> Result<[NormalizedSlice; 3]> {
        Ok([
            self.images.normalize(dims[0])?,
            self.rows.normalize(dims[1])?,
            self.columns.normalize(dims[2])?,
        ])
    }

    /// Shape a read of this window produces, without touching any data
    pub fn output_shape(&self, dims: [usize; 3]) -> Result<[usize; 3]> {
        let [images, rows, columns] = self.normalize(dims)?;
        Ok([images.len(), rows.len(), columns.len()])
    }
}
