//! Scan metadata of an XRM/TXRM container

use crate::error::{Result, XrmError};
use crate::field::{read_f32, read_f32_array, read_string, read_u32, require_u32};
use crate::io::Container;
use crate::layout::{VolumeLayout, REFERENCE_IMAGE_PATH};
use crate::types::{Image, PixelFormat};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Stream paths of the known metadata fields
pub mod paths {
    pub const NUMBER_OF_IMAGES: &str = "ImageInfo/NoOfImages";
    pub const IMAGE_WIDTH: &str = "ImageInfo/ImageWidth";
    pub const IMAGE_HEIGHT: &str = "ImageInfo/ImageHeight";
    pub const DATA_TYPE: &str = "ImageInfo/DataType";
    pub const ANGLES: &str = "ImageInfo/Angles";
    pub const X_POSITION: &str = "ImageInfo/XPosition";
    pub const Y_POSITION: &str = "ImageInfo/YPosition";
    pub const EXPOSURE_TIMES: &str = "ImageInfo/ExpTimes";
    pub const PIXEL_SIZE: &str = "ImageInfo/PixelSize";
    pub const REFERENCE_FILE: &str = "ImageInfo/ReferenceFile";
    pub const FACILITY: &str = "SampleInfo/Facility";
    pub const X_SHIFTS: &str = "Alignment/X-Shifts";
    pub const Y_SHIFTS: &str = "Alignment/Y-Shifts";
    pub const REFERENCE_DATA_TYPE: &str = "ReferenceData/DataType";
}

const FACILITY_WIDTH: usize = 50;
const REFERENCE_FILE_WIDTH: usize = 260;

/// Options controlling which optional parts of the metadata are decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetadataOptions {
    /// Decode the reference (white field) image when present
    pub read_reference: bool,
}

impl MetadataOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether the reference image is decoded
    pub fn with_reference(mut self, read_reference: bool) -> Self {
        self.read_reference = read_reference;
        self
    }
}

impl Default for MetadataOptions {
    fn default() -> Self {
        Self {
            read_reference: true,
        }
    }
}

/// Complete metadata of one container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XrmMetadata {
    pub facility: Option<String>,
    pub reference_filename: Option<String>,

    pub image_width: usize,
    pub image_height: usize,
    pub number_of_images: usize,

    /// Pixel format of the image streams
    pub data_type: PixelFormat,

    /// Pixel format of the reference image, when one is stored
    pub reference_data_type: Option<PixelFormat>,

    pub pixel_size: Option<f32>,

    /// Projection angles in radians
    pub thetas: Option<Vec<f32>>,
    pub x_positions: Option<Vec<f32>>,
    pub y_positions: Option<Vec<f32>>,
    pub x_shifts: Option<Vec<f32>>,
    pub y_shifts: Option<Vec<f32>>,
    pub exposure_times: Option<Vec<f32>>,

    #[serde(skip)]
    pub reference_image: Option<Image>,
}

impl XrmMetadata {
    /// Shape and pixel format of the image volume
    pub fn layout(&self) -> Result<VolumeLayout> {
        VolumeLayout::new(
            self.number_of_images,
            self.image_height,
            self.image_width,
            self.data_type,
        )
    }

    /// Serialize to JSON; reference pixels are left out
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn require_extent<C: Container + ?Sized>(container: &mut C, path: &str) -> Result<usize> {
    let value = require_u32(container, path)? as usize;
    if value == 0 {
        return Err(XrmError::InvalidDimensions(format!("{} is zero", path)));
    }
    Ok(value)
}

/// Build the metadata record of `container`
///
/// `ImageInfo/NoOfImages` is read first; every per-image array is decoded
/// with that count. Nothing is written to the container.
pub fn read_metadata<C: Container + ?Sized>(
    container: &mut C,
    options: &MetadataOptions,
) -> Result<XrmMetadata> {
    let number_of_images = require_extent(container, paths::NUMBER_OF_IMAGES)?;
    let image_width = require_extent(container, paths::IMAGE_WIDTH)?;
    let image_height = require_extent(container, paths::IMAGE_HEIGHT)?;
    let data_type = PixelFormat::from_code(require_u32(container, paths::DATA_TYPE)?)?;
    debug!(
        number_of_images,
        image_width,
        image_height,
        %data_type,
        "read image info"
    );

    let thetas = read_f32_array(container, paths::ANGLES, number_of_images)?
        .map(|degrees| degrees.into_iter().map(f32::to_radians).collect());
    let x_positions = read_f32_array(container, paths::X_POSITION, number_of_images)?;
    let y_positions = read_f32_array(container, paths::Y_POSITION, number_of_images)?;
    let exposure_times = read_f32_array(container, paths::EXPOSURE_TIMES, number_of_images)?;
    let x_shifts = read_f32_array(container, paths::X_SHIFTS, number_of_images)?;
    let y_shifts = read_f32_array(container, paths::Y_SHIFTS, number_of_images)?;

    let pixel_size = read_f32(container, paths::PIXEL_SIZE)?;
    let facility = read_string(container, paths::FACILITY, FACILITY_WIDTH)?;
    let reference_filename = read_string(container, paths::REFERENCE_FILE, REFERENCE_FILE_WIDTH)?;

    let mut metadata = XrmMetadata {
        facility,
        reference_filename,
        image_width,
        image_height,
        number_of_images,
        data_type,
        reference_data_type: None,
        pixel_size,
        thetas,
        x_positions,
        y_positions,
        x_shifts,
        y_shifts,
        exposure_times,
        reference_image: None,
    };

    if container.exists(REFERENCE_IMAGE_PATH) {
        let reference_type = match read_u32(container, paths::REFERENCE_DATA_TYPE)? {
            Some(code) => PixelFormat::from_code(code)?,
            None => {
                warn!(
                    fallback = %data_type,
                    "reference image has no data type, using image data type"
                );
                data_type
            }
        };
        metadata.reference_data_type = Some(reference_type);

        if options.read_reference {
            let layout = VolumeLayout::new(1, image_height, image_width, reference_type)?;
            metadata.reference_image =
                Some(crate::access::decode_image(container, REFERENCE_IMAGE_PATH, &layout)?);
        }
    }

    Ok(metadata)
}
