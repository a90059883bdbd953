//! Image layout - how pages are addressed inside the container

use crate::error::{Result, XrmError};
use crate::types::PixelFormat;
use serde::{Deserialize, Serialize};

/// Number of images stored under one `ImageData<page>` storage
pub const IMAGES_PER_PAGE: usize = 100;

/// Stream holding the optional reference (white field) image
pub const REFERENCE_IMAGE_PATH: &str = "ReferenceData/Image";

/// Page number holding the 1-based image `index`
pub fn page_number(index: usize) -> Result<usize> {
    if index == 0 {
        return Err(XrmError::OutOfBounds(
            "Image indices start at 1".to_string(),
        ));
    }
    Ok(index.div_ceil(IMAGES_PER_PAGE))
}

/// Stream path of the 1-based image `index`
pub fn image_path(index: usize) -> Result<String> {
    let page = page_number(index)?;
    Ok(format!("ImageData{}/Image{}", page, index))
}

/// Logical shape of the image volume in a container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeLayout {
    pub number_of_images: usize,
    pub image_height: usize,
    pub image_width: usize,
    pub pixel_format: PixelFormat,
}

impl VolumeLayout {
    /// Create a layout
    ///
    /// Every extent must be positive and the whole volume must be
    /// addressable in bytes.
    pub fn new(
        number_of_images: usize,
        image_height: usize,
        image_width: usize,
        pixel_format: PixelFormat,
    ) -> Result<Self> {
        if number_of_images == 0 || image_height == 0 || image_width == 0 {
            return Err(XrmError::InvalidDimensions(format!(
                "Extents must be positive, got {} x {} x {}",
                number_of_images, image_height, image_width
            )));
        }

        let total = number_of_images
            .checked_mul(image_height)
            .and_then(|v| v.checked_mul(image_width))
            .and_then(|v| v.checked_mul(pixel_format.size_in_bytes()))
            .filter(|&v| v <= isize::MAX as usize);
        if total.is_none() {
            return Err(XrmError::InvalidDimensions(format!(
                "Volume of {} x {} x {} ({}) is too large",
                number_of_images, image_height, image_width, pixel_format
            )));
        }

        Ok(Self {
            number_of_images,
            image_height,
            image_width,
            pixel_format,
        })
    }

    /// (images, rows, columns)
    pub fn dims(&self) -> [usize; 3] {
        [self.number_of_images, self.image_height, self.image_width]
    }

    /// Number of pixels in one page
    pub fn pixels_per_image(&self) -> usize {
        self.image_height.saturating_mul(self.image_width)
    }

    /// Expected byte length of one image stream
    pub fn image_size_bytes(&self) -> usize {
        self.pixels_per_image()
            .saturating_mul(self.pixel_format.size_in_bytes())
    }

    /// Number of `ImageData<page>` storages in use
    pub fn page_count(&self) -> usize {
        self.number_of_images.div_ceil(IMAGES_PER_PAGE)
    }

    /// Calculate the total volume size in bytes
    pub fn total_size_bytes(&self) -> usize {
        self.number_of_images.saturating_mul(self.image_size_bytes())
    }

    /// Check if a 1-based image index exists
    pub fn contains_image(&self, index: usize) -> bool {
        (1..=self.number_of_images).contains(&index)
    }

    /// Get a summary string of the layout
    pub fn summary(&self) -> String {
        format!(
            "{} images of {} x {} ({}), {} pages, {:.2} MB",
            self.number_of_images,
            self.image_height,
            self.image_width,
            self.pixel_format,
            self.page_count(),
            self.total_size_bytes() as f64 / (1024.0 * 1024.0)
        )
    }
}
