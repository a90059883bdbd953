//! Volume access - main API for reading XRM/TXRM images

use crate::error::{Result, XrmError};
use crate::io::{CompoundFileContainer, Container};
use crate::layout::{image_path, VolumeLayout};
use crate::metadata::{read_metadata, MetadataOptions, XrmMetadata};
use crate::slice::{NormalizedSlice, VolumeSlice};
use crate::types::{Image, Pixel, PixelFormat, Volume};
use ndarray::{s, Array2, Array3, ArrayView2, Axis, ShapeBuilder};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Decode raw page bytes into a (height, width) array
///
/// Pages are stored column-major.
pub fn decode_page<T: Pixel>(data: &[u8], height: usize, width: usize) -> Result<Array2<T>> {
    let pixels: Vec<T> = data
        .chunks_exact(T::FORMAT.size_in_bytes())
        .map(T::from_le_slice)
        .collect();
    Array2::from_shape_vec((height, width).f(), pixels)
        .map_err(|e| XrmError::InvalidDimensions(e.to_string()))
}

fn read_page<T: Pixel, C: Container + ?Sized>(
    container: &mut C,
    path: &str,
    layout: &VolumeLayout,
) -> Result<Array2<T>> {
    let expected = layout.image_size_bytes();
    let actual = container.size(path)?;
    if actual != expected {
        return Err(XrmError::MalformedRecord {
            path: path.to_string(),
            expected,
            actual,
        });
    }
    let data = container.read(path)?;
    debug!(path, bytes = data.len(), "decoding image stream");
    decode_page(&data, layout.image_height, layout.image_width)
}

/// Decode the single page at `path` using the layout's pixel format
pub fn decode_image<C: Container + ?Sized>(
    container: &mut C,
    path: &str,
    layout: &VolumeLayout,
) -> Result<Image> {
    Ok(match layout.pixel_format {
        PixelFormat::U16 => Image::U16(read_page(container, path, layout)?),
        PixelFormat::F32 => Image::F32(read_page(container, path, layout)?),
    })
}

fn window<'a, T>(
    page: &'a Array2<T>,
    rows: &NormalizedSlice,
    columns: &NormalizedSlice,
) -> ArrayView2<'a, T> {
    page.slice(s![
        rows.start..rows.stop;rows.step,
        columns.start..columns.stop;columns.step
    ])
}

/// Stack windows of the pages at `positions`, fetching one page at a time
///
/// `fetch` may skip a position by returning `None`; `count` is the number of
/// pages it yields.
fn stack_pages<T, F>(
    positions: &[usize],
    count: usize,
    rows: &NormalizedSlice,
    columns: &NormalizedSlice,
    mut fetch: F,
) -> Result<Array3<T>>
where
    T: Pixel,
    F: FnMut(usize) -> Result<Option<Array2<T>>>,
{
    let mut out = Array3::<T>::zeros((count, rows.len(), columns.len()));
    let mut slot = 0;
    for &position in positions {
        if let Some(page) = fetch(position)? {
            if slot == count {
                return Err(XrmError::OutOfBounds(format!(
                    "More than {} pages fetched",
                    count
                )));
            }
            out.index_axis_mut(Axis(0), slot)
                .assign(&window(&page, rows, columns));
            slot += 1;
        }
    }
    Ok(out)
}

/// Reader over one open XRM/TXRM container
pub struct XrmReader<C> {
    container: C,
    metadata: XrmMetadata,
    layout: VolumeLayout,
}

impl XrmReader<CompoundFileContainer<File>> {
    /// Open an XRM/TXRM file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_options(path, MetadataOptions::default())
    }

    /// Open an XRM/TXRM file with explicit metadata options
    pub fn open_with_options(path: impl AsRef<Path>, options: MetadataOptions) -> Result<Self> {
        let path = path.as_ref();
        let reader = Self::with_options(CompoundFileContainer::open(path)?, options)?;
        info!(path = %path.display(), layout = %reader.layout.summary(), "opened container");
        Ok(reader)
    }
}

impl<C: Container> XrmReader<C> {
    /// Build a reader over an already open container
    pub fn from_container(container: C) -> Result<Self> {
        Self::with_options(container, MetadataOptions::default())
    }

    /// Build a reader with explicit metadata options
    pub fn with_options(mut container: C, options: MetadataOptions) -> Result<Self> {
        let metadata = read_metadata(&mut container, &options)?;
        let layout = metadata.layout()?;
        Ok(Self {
            container,
            metadata,
            layout,
        })
    }

    /// Get the container metadata
    pub fn metadata(&self) -> &XrmMetadata {
        &self.metadata
    }

    /// Consume the reader, releasing the container
    pub fn into_metadata(self) -> XrmMetadata {
        self.metadata
    }

    /// Get the volume layout
    pub fn layout(&self) -> &VolumeLayout {
        &self.layout
    }

    /// Reference (white field) image, if one was decoded
    pub fn reference(&self) -> Option<&Image> {
        self.metadata.reference_image.as_ref()
    }

    /// Consume the reader and return the container
    pub fn into_inner(self) -> C {
        self.container
    }

    /// Decode one full page by 1-based index
    pub fn read_image(&mut self, index: usize) -> Result<Image> {
        if !self.layout.contains_image(index) {
            return Err(XrmError::OutOfBounds(format!(
                "Image {} not in 1..={}",
                index, self.layout.number_of_images
            )));
        }
        let path = image_path(index)?;
        decode_image(&mut self.container, &path, &self.layout)
    }

    /// Read a window of the volume
    ///
    /// The image axis of `slice` selects 0-based positions; position `p` is
    /// stored as image `p + 1`. Images are decoded in ascending order.
    pub fn read_volume(&mut self, slice: &VolumeSlice) -> Result<Volume> {
        let [images, rows, columns] = slice.normalize(self.layout.dims())?;
        let volume = match self.layout.pixel_format {
            PixelFormat::U16 => Volume::U16(self.assemble(&images, &rows, &columns)?),
            PixelFormat::F32 => Volume::F32(self.assemble(&images, &rows, &columns)?),
        };
        info!(shape = ?volume.shape(), "assembled volume");
        Ok(volume)
    }

    fn assemble<T: Pixel>(
        &mut self,
        images: &NormalizedSlice,
        rows: &NormalizedSlice,
        columns: &NormalizedSlice,
    ) -> Result<Array3<T>> {
        let positions: Vec<usize> = images.indices().collect();
        let layout = self.layout;
        let container = &mut self.container;
        stack_pages(&positions, positions.len(), rows, columns, |position| {
            let path = image_path(position + 1)?;
            read_page(container, &path, &layout).map(Some)
        })
    }
}

/// Read a window of a TXRM file along with its metadata
pub fn read_txrm(path: impl AsRef<Path>, slice: &VolumeSlice) -> Result<(Volume, XrmMetadata)> {
    let mut reader = XrmReader::open(path)?;
    let volume = reader.read_volume(slice)?;
    Ok((volume, reader.into_metadata()))
}

/// Read a window of a single-image XRM file along with its metadata
pub fn read_xrm(path: impl AsRef<Path>, slice: &VolumeSlice) -> Result<(Volume, XrmMetadata)> {
    read_txrm(path, slice)
}

/// [`read_txrm`] on tokio's blocking pool
pub async fn read_txrm_async(
    path: impl Into<PathBuf>,
    slice: VolumeSlice,
) -> Result<(Volume, XrmMetadata)> {
    let path = path.into();
    tokio::task::spawn_blocking(move || read_txrm(&path, &slice)).await?
}

/// [`read_xrm`] on tokio's blocking pool
pub async fn read_xrm_async(
    path: impl Into<PathBuf>,
    slice: VolumeSlice,
) -> Result<(Volume, XrmMetadata)> {
    read_txrm_async(path, slice).await
}

fn first_of_each(
    records: &[XrmMetadata],
    field: impl Fn(&XrmMetadata) -> Option<&Vec<f32>>,
) -> Option<Vec<f32>> {
    records
        .iter()
        .map(|m| field(m).and_then(|values| values.first().copied()))
        .collect()
}

/// Read a series of single-image XRM files as one volume
///
/// The image axis of `slice` selects files; each file contributes its first
/// image. Per-image metadata is gathered from every file and is only present
/// when every file carries it. Every file is opened exactly once; only the
/// first one has its reference image decoded.
pub fn read_xrm_stack<P: AsRef<Path>>(
    paths: &[P],
    slice: &VolumeSlice,
) -> Result<(Volume, XrmMetadata)> {
    let first = paths
        .first()
        .ok_or_else(|| XrmError::InvalidDimensions("Empty XRM file list".to_string()))?;
    let first = XrmReader::open(first)?;
    let base_layout = first.layout;
    let dims = [paths.len(), base_layout.image_height, base_layout.image_width];
    let [images, rows, columns] = slice.normalize(dims)?;
    let selected: Vec<usize> = images.indices().collect();

    let mut first = Some(first);
    let mut records = Vec::with_capacity(paths.len());
    let volume = match base_layout.pixel_format {
        PixelFormat::U16 => Volume::U16(stack_files(
            paths,
            &mut first,
            &base_layout,
            &selected,
            &rows,
            &columns,
            &mut records,
        )?),
        PixelFormat::F32 => Volume::F32(stack_files(
            paths,
            &mut first,
            &base_layout,
            &selected,
            &rows,
            &columns,
            &mut records,
        )?),
    };

    let thetas = first_of_each(&records, |m| m.thetas.as_ref());
    let x_positions = first_of_each(&records, |m| m.x_positions.as_ref());
    let y_positions = first_of_each(&records, |m| m.y_positions.as_ref());
    let x_shifts = first_of_each(&records, |m| m.x_shifts.as_ref());
    let y_shifts = first_of_each(&records, |m| m.y_shifts.as_ref());
    let exposure_times = first_of_each(&records, |m| m.exposure_times.as_ref());
    let base = records
        .into_iter()
        .next()
        .ok_or_else(|| XrmError::InvalidDimensions("Empty XRM file list".to_string()))?;

    let metadata = XrmMetadata {
        number_of_images: paths.len(),
        thetas,
        x_positions,
        y_positions,
        x_shifts,
        y_shifts,
        exposure_times,
        ..base
    };
    info!(files = paths.len(), shape = ?volume.shape(), "assembled XRM stack");
    Ok((volume, metadata))
}

/// Visit every file in order, keeping its metadata and, for selected
/// positions, its first page
///
/// `first` is the already open reader for position 0.
fn stack_files<T: Pixel, P: AsRef<Path>>(
    paths: &[P],
    first: &mut Option<XrmReader<CompoundFileContainer<File>>>,
    base: &VolumeLayout,
    selected: &[usize],
    rows: &NormalizedSlice,
    columns: &NormalizedSlice,
    records: &mut Vec<XrmMetadata>,
) -> Result<Array3<T>> {
    let options = MetadataOptions::new().with_reference(false);
    let all: Vec<usize> = (0..paths.len()).collect();

    stack_pages(&all, selected.len(), rows, columns, |position| {
        let path = paths[position].as_ref();
        let opened = if position == 0 { first.take() } else { None };
        let mut reader = match opened {
            Some(reader) => reader,
            None => XrmReader::open_with_options(path, options)?,
        };
        let layout = reader.layout;
        if layout.image_height != base.image_height
            || layout.image_width != base.image_width
            || layout.pixel_format != base.pixel_format
        {
            return Err(XrmError::InvalidDimensions(format!(
                "{} is {} x {} ({}), expected {} x {} ({})",
                path.display(),
                layout.image_height,
                layout.image_width,
                layout.pixel_format,
                base.image_height,
                base.image_width,
                base.pixel_format
            )));
        }

        let page = if selected.binary_search(&position).is_ok() {
            Some(read_page(&mut reader.container, &image_path(1)?, &layout)?)
        } else {
            None
        };
        records.push(reader.into_metadata());
        Ok(page)
    })
}

/// Volume statistics
#[derive(Debug, Clone)]
pub struct VolumeStats {
    pub number_of_images: usize,
    pub total_pixels: usize,
    pub page_count: usize,
    pub uncompressed_size: usize,
    pub pixel_format: PixelFormat,
}

impl VolumeStats {
    pub fn summary(&self) -> String {
        format!(
            "{} images, {} pixels, {} pages, {} uncompressed ({})",
            self.number_of_images,
            self.total_pixels,
            self.page_count,
            crate::utils::format_bytes(self.uncompressed_size),
            self.pixel_format,
        )
    }
}

impl<C: Container> XrmReader<C> {
    /// Get statistics about the volume
    pub fn stats(&self) -> VolumeStats {
        VolumeStats {
            number_of_images: self.layout.number_of_images,
            total_pixels: self.layout.number_of_images * self.layout.pixels_per_image(),
            page_count: self.layout.page_count(),
            uncompressed_size: self.layout.total_size_bytes(),
            pixel_format: self.layout.pixel_format,
        }
    }
}
