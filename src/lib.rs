//! xradia - Xradia XRM/TXRM tomography reader
//!
//! A pure Rust reader for the compound-file containers written by Xradia/Zeiss
//! X-ray microscopes. Scan metadata is decoded into a typed record and image
//! volumes are assembled from the per-image pixel streams, reading only the
//! images a request covers.
//!
//! # Features
//!
//! - Typed metadata: image count, dimensions, angles (radians), stage
//!   positions, alignment shifts, exposure times, pixel size
//! - Windowed reads over (image, row, column) with array-slice semantics
//! - `u16` and `f32` pixel formats, decoded into `ndarray` arrays
//! - Optional reference (white field) image
//!
//! # Example
//!
//! ```rust,ignore
//! use xradia::{read_txrm, AxisSlice, VolumeSlice};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Images 10..20, top half of each page
//! let slice = VolumeSlice::new(AxisSlice::range(10, 20), AxisSlice::range(0, 512), ..);
//! let (volume, metadata) = read_txrm("scan.txrm", &slice)?;
//! println!("{:?} {:?}", volume.shape(), metadata.thetas);
//! # Ok(())
//! # }
//! ```

pub mod access;
pub mod error;
pub mod field;
pub mod io;
pub mod layout;
pub mod metadata;
pub mod slice;
pub mod types;
pub mod utils;

// Re-exports
pub use access::{
    read_txrm, read_txrm_async, read_xrm, read_xrm_async, read_xrm_stack, VolumeStats, XrmReader,
};
pub use error::{Result, XrmError};
pub use io::{CompoundFileContainer, Container, MemoryContainer};
pub use layout::{image_path, VolumeLayout, IMAGES_PER_PAGE};
pub use metadata::{read_metadata, MetadataOptions, XrmMetadata};
pub use slice::{AxisSlice, NormalizedSlice, VolumeSlice};
pub use types::{Image, Pixel, PixelFormat, Volume};

/// Version of the xradia crate
pub const XRADIA_VERSION: &str = env!("CARGO_PKG_VERSION");
