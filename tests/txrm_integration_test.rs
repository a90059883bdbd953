//! Integration tests against compound files written to disk
//!
//! Each test builds a small XRM/TXRM container with `cfb`, laid out the way
//! Xradia software writes them, and reads it back through the public API.

use cfb::CompoundFile;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use xradia::{
    image_path, read_txrm, read_txrm_async, read_xrm, read_xrm_stack, AxisSlice, Image,
    PixelFormat, Volume, VolumeSlice, XrmError, XrmReader,
};

/// Contents of a synthetic container
#[derive(Clone)]
struct Scan {
    number_of_images: usize,
    height: usize,
    width: usize,
    data_type: u32,
    angles: Option<Vec<f32>>,
    shifts: bool,
    write_images: bool,
    reference: Option<u32>,
}

impl Scan {
    fn new(number_of_images: usize, height: usize, width: usize, data_type: u32) -> Self {
        Self {
            number_of_images,
            height,
            width,
            data_type,
            angles: None,
            shifts: true,
            write_images: true,
            reference: None,
        }
    }
}

/// Pixel value at (1-based image, row, column)
fn pixel(index: usize, row: usize, column: usize) -> u32 {
    ((index * 7919 + row * 131 + column) % 65_536) as u32
}

fn f32_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Encode one page column-major
fn page_bytes(scan: &Scan, data_type: u32, index: usize) -> Vec<u8> {
    let mut data = Vec::new();
    for column in 0..scan.width {
        for row in 0..scan.height {
            let value = pixel(index, row, column);
            if data_type == 10 {
                data.extend_from_slice(&(value as f32).to_le_bytes());
            } else {
                data.extend_from_slice(&(value as u16).to_le_bytes());
            }
        }
    }
    data
}

fn put(comp: &mut CompoundFile<File>, path: &str, data: &[u8]) {
    if let Some(parent) = Path::new(path).parent() {
        let storage = format!("/{}", parent.display());
        if !comp.exists(&storage) {
            comp.create_storage(&storage).expect("Failed to create storage");
        }
    }
    let mut stream = comp
        .create_stream(format!("/{}", path))
        .expect("Failed to create stream");
    stream.write_all(data).expect("Failed to write stream");
    stream.flush().expect("Failed to flush stream");
}

fn write_scan(dir: &TempDir, name: &str, scan: &Scan) -> PathBuf {
    let path = dir.path().join(name);
    let mut comp = cfb::create(&path).expect("Failed to create compound file");
    let n = scan.number_of_images;

    put(&mut comp, "ImageInfo/NoOfImages", &(n as u32).to_le_bytes());
    put(&mut comp, "ImageInfo/ImageWidth", &(scan.width as u32).to_le_bytes());
    put(&mut comp, "ImageInfo/ImageHeight", &(scan.height as u32).to_le_bytes());
    put(&mut comp, "ImageInfo/DataType", &scan.data_type.to_le_bytes());
    put(&mut comp, "ImageInfo/PixelSize", &0.65f32.to_le_bytes());

    let positions: Vec<f32> = (0..n).map(|i| i as f32 * 0.5).collect();
    put(&mut comp, "ImageInfo/XPosition", &f32_bytes(&positions));
    put(&mut comp, "ImageInfo/YPosition", &f32_bytes(&positions));
    if let Some(angles) = &scan.angles {
        put(&mut comp, "ImageInfo/Angles", &f32_bytes(angles));
    }
    if scan.shifts {
        let shifts: Vec<f32> = (0..n).map(|i| -(i as f32)).collect();
        put(&mut comp, "Alignment/X-Shifts", &f32_bytes(&shifts));
        put(&mut comp, "Alignment/Y-Shifts", &f32_bytes(&shifts));
    }

    let mut facility = b"Synthetic Beamline".to_vec();
    facility.resize(50, 0);
    put(&mut comp, "SampleInfo/Facility", &facility);

    if scan.write_images {
        for index in 1..=n {
            let path = image_path(index).expect("Invalid image index");
            put(&mut comp, &path, &page_bytes(scan, scan.data_type, index));
        }
    }

    if let Some(reference_type) = scan.reference {
        put(&mut comp, "ReferenceData/DataType", &reference_type.to_le_bytes());
        put(&mut comp, "ReferenceData/Image", &page_bytes(scan, reference_type, 0));
    }

    comp.flush().expect("Failed to flush compound file");
    path
}

fn expect_u16(image: &Image) -> &ndarray::Array2<u16> {
    image.as_u16().expect("Expected u16 image")
}

/// Images 2..4, rows 0..128, all columns of a 7 x 256 x 256 u16 scan
#[test]
fn test_windowed_read_matches_single_images() {
    let dir = TempDir::new().unwrap();
    let path = write_scan(&dir, "scan.txrm", &Scan::new(7, 256, 256, 5));

    let slice = VolumeSlice::new(AxisSlice::range(2, 4), AxisSlice::range(0, 128), ..);
    let (volume, metadata) = read_txrm(&path, &slice).expect("Failed to read TXRM");

    assert_eq!(volume.shape(), [2, 128, 256]);
    assert_eq!(volume.pixel_format(), PixelFormat::U16);
    assert_eq!(metadata.number_of_images, 7);

    let mut reader = XrmReader::open(&path).unwrap();
    let data = volume.as_u16().unwrap();
    for (slot, position) in [2usize, 3].iter().enumerate() {
        let image = reader.read_image(position + 1).unwrap();
        let expected = expect_u16(&image).slice(ndarray::s![0..128, ..]);
        assert_eq!(data.index_axis(ndarray::Axis(0), slot), expected);
    }
    assert_eq!(data[[0, 5, 9]], pixel(3, 5, 9) as u16);
    println!("✓ Windowed read matches individually decoded images");
}

/// Every image read alone equals the same position of the full volume,
/// across a page boundary
#[test]
fn test_single_image_equals_volume_position() {
    let dir = TempDir::new().unwrap();
    let path = write_scan(&dir, "paged.txrm", &Scan::new(103, 3, 4, 5));

    let mut reader = XrmReader::open(&path).unwrap();
    assert_eq!(reader.layout().page_count(), 2);
    let volume = reader.read_volume(&VolumeSlice::all()).unwrap();
    assert_eq!(volume.shape(), [103, 3, 4]);

    for index in 1..=103 {
        let single = reader.read_image(index).unwrap();
        assert_eq!(volume.image(index - 1), Some(single), "image {}", index);
    }
    assert_eq!(
        volume.as_u16().unwrap()[[101, 2, 3]],
        pixel(102, 2, 3) as u16
    );
}

/// Output shapes agree with the shape-only computation
#[test]
fn test_output_shape_matches_normalizer() {
    let dir = TempDir::new().unwrap();
    let path = write_scan(&dir, "shape.txrm", &Scan::new(9, 6, 5, 10));
    let mut reader = XrmReader::open(&path).unwrap();
    let dims = reader.layout().dims();

    let slices = [
        VolumeSlice::all(),
        VolumeSlice::images(AxisSlice::Stop(4)),
        VolumeSlice::images(AxisSlice::range(-3, -1)),
        VolumeSlice::images(AxisSlice::range(5, 5)),
        VolumeSlice::images(AxisSlice::range(50, 60)),
        VolumeSlice::new(AxisSlice::stepped(0, 9, 4), AxisSlice::range(-2, 99), AxisSlice::Stop(-1)),
        VolumeSlice::new(.., AxisSlice::range(4, 1), ..),
    ];

    for slice in &slices {
        let volume = reader.read_volume(slice).unwrap();
        assert_eq!(volume.shape(), slice.output_shape(dims).unwrap(), "{:?}", slice);
    }
}

/// Float volumes decode as f32
#[test]
fn test_float_volume() {
    let dir = TempDir::new().unwrap();
    let path = write_scan(&dir, "float.txrm", &Scan::new(3, 4, 2, 10));

    let (volume, metadata) = read_txrm(&path, &VolumeSlice::all()).unwrap();
    assert_eq!(metadata.data_type, PixelFormat::F32);
    let data = match &volume {
        Volume::F32(data) => data,
        other => panic!("Expected f32 volume, got {:?}", other.pixel_format()),
    };
    assert_eq!(data[[2, 3, 1]], pixel(3, 3, 1) as f32);
}

/// Angles are stored in degrees and reported in radians
#[test]
fn test_angles_in_radians() {
    let dir = TempDir::new().unwrap();
    let degrees: Vec<f32> = vec![-90.0, -45.0, 0.0, 30.0, 180.0];
    let mut scan = Scan::new(5, 2, 2, 5);
    scan.angles = Some(degrees.clone());
    let path = write_scan(&dir, "angles.txrm", &scan);

    let reader = XrmReader::open(&path).unwrap();
    let metadata = reader.metadata();
    let thetas = metadata.thetas.as_ref().expect("Angles should be present");
    assert_eq!(thetas.len(), metadata.number_of_images);
    for (rad, deg) in thetas.iter().zip(&degrees) {
        assert!((rad - deg * std::f32::consts::PI / 180.0).abs() < 1e-6);
    }
    for values in [&metadata.x_positions, &metadata.y_positions, &metadata.x_shifts] {
        assert_eq!(values.as_ref().unwrap().len(), 5);
    }
}

/// Missing alignment shifts leave every other field intact
#[test]
fn test_absent_shifts() {
    let dir = TempDir::new().unwrap();
    let mut scan = Scan::new(4, 3, 3, 5);
    scan.shifts = false;
    let path = write_scan(&dir, "noshift.txrm", &scan);

    let (volume, metadata) = read_txrm(&path, &VolumeSlice::all()).unwrap();
    assert!(metadata.x_shifts.is_none());
    assert!(metadata.y_shifts.is_none());
    assert_eq!(metadata.x_positions.as_ref().unwrap().len(), 4);
    assert_eq!(metadata.pixel_size, Some(0.65));
    assert_eq!(metadata.facility.as_deref(), Some("Synthetic Beamline"));
    assert!(metadata.thetas.is_none());
    assert_eq!(volume.shape(), [4, 3, 3]);
    assert_eq!(volume.as_u16().unwrap()[[3, 2, 1]], pixel(4, 2, 1) as u16);
}

/// Unknown data-type codes fail before any pixel stream is opened
#[test]
fn test_unsupported_pixel_format() {
    let dir = TempDir::new().unwrap();
    let mut scan = Scan::new(2, 2, 2, 3);
    scan.write_images = false;
    let path = write_scan(&dir, "bad.txrm", &scan);

    assert!(matches!(
        read_txrm(&path, &VolumeSlice::all()),
        Err(XrmError::UnsupportedPixelFormat(3))
    ));
}

/// Files that are not compound files are rejected up front
#[test]
fn test_not_a_container() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("garbage.txrm");
    std::fs::write(&path, vec![0x42u8; 4096]).unwrap();

    assert!(matches!(
        read_txrm(&path, &VolumeSlice::all()),
        Err(XrmError::NotAContainer(_))
    ));
}

/// Reference image decoded with its own data type
#[test]
fn test_reference_image() {
    let dir = TempDir::new().unwrap();
    let mut scan = Scan::new(2, 3, 4, 5);
    scan.reference = Some(10);
    let path = write_scan(&dir, "ref.txrm", &scan);

    let reader = XrmReader::open(&path).unwrap();
    assert_eq!(reader.metadata().reference_data_type, Some(PixelFormat::F32));
    let reference = reader.reference().expect("Reference should be decoded");
    assert_eq!(reference.shape(), (3, 4));
    assert_eq!(reference.as_f32().unwrap()[[2, 1]], pixel(0, 2, 1) as f32);
}

/// Single-image XRM files
#[test]
fn test_read_xrm() {
    let dir = TempDir::new().unwrap();
    let path = write_scan(&dir, "single.xrm", &Scan::new(1, 5, 6, 5));

    let (volume, metadata) = read_xrm(&path, &VolumeSlice::new(.., AxisSlice::Stop(2), ..)).unwrap();
    assert_eq!(metadata.number_of_images, 1);
    assert_eq!(volume.shape(), [1, 2, 6]);
    assert_eq!(volume.as_u16().unwrap()[[0, 1, 5]], pixel(1, 1, 5) as u16);
}

/// A series of XRM files read as one stack
#[test]
fn test_read_xrm_stack() {
    let dir = TempDir::new().unwrap();
    let paths: Vec<PathBuf> = (0..4)
        .map(|i| {
            let mut scan = Scan::new(1, 3, 3, 5);
            scan.angles = Some(vec![i as f32 * 10.0]);
            write_scan(&dir, &format!("proj_{:03}.xrm", i), &scan)
        })
        .collect();

    let slice = VolumeSlice::images(AxisSlice::stepped(1, 4, 2));
    let (volume, metadata) = read_xrm_stack(&paths, &slice).unwrap();

    assert_eq!(volume.shape(), [2, 3, 3]);
    assert_eq!(volume.shape(), slice.output_shape([4, 3, 3]).unwrap());
    assert_eq!(metadata.number_of_images, 4);
    let thetas = metadata.thetas.unwrap();
    assert_eq!(thetas.len(), 4);
    assert!((thetas[3] - 30f32.to_radians()).abs() < 1e-6);
    assert_eq!(metadata.x_shifts.unwrap(), vec![0.0; 4]);
}

/// The stack keeps the reference image of its first file
#[test]
fn test_read_xrm_stack_reference() {
    let dir = TempDir::new().unwrap();
    let paths: Vec<PathBuf> = (0..3)
        .map(|i| {
            let mut scan = Scan::new(1, 3, 4, 5);
            if i == 0 {
                scan.reference = Some(10);
            }
            write_scan(&dir, &format!("ref_{:03}.xrm", i), &scan)
        })
        .collect();

    let (volume, metadata) = read_xrm_stack(&paths, &VolumeSlice::all()).unwrap();
    assert_eq!(volume.shape(), [3, 3, 4]);
    assert_eq!(volume.as_u16().unwrap()[[2, 2, 3]], pixel(1, 2, 3) as u16);
    assert_eq!(metadata.reference_data_type, Some(PixelFormat::F32));
    let reference = metadata
        .reference_image
        .expect("Reference of the first file should be decoded");
    assert_eq!(reference.shape(), (3, 4));
    assert_eq!(reference.as_f32().unwrap()[[2, 1]], pixel(0, 2, 1) as f32);
}

/// Stacks refuse files of differing shape
#[test]
fn test_read_xrm_stack_mismatch() {
    let dir = TempDir::new().unwrap();
    let a = write_scan(&dir, "a.xrm", &Scan::new(1, 3, 3, 5));
    let b = write_scan(&dir, "b.xrm", &Scan::new(1, 4, 3, 5));

    assert!(matches!(
        read_xrm_stack(&[a, b], &VolumeSlice::all()),
        Err(XrmError::InvalidDimensions(_))
    ));
    let empty: [PathBuf; 0] = [];
    assert!(read_xrm_stack(&empty, &VolumeSlice::all()).is_err());
}

/// The async wrapper returns the same data as the blocking read
#[tokio::test]
async fn test_read_txrm_async() {
    let dir = TempDir::new().unwrap();
    let path = write_scan(&dir, "async.txrm", &Scan::new(3, 4, 4, 5));

    let slice = VolumeSlice::images(AxisSlice::range(1, 3));
    let (volume, metadata) = read_txrm_async(path.clone(), slice).await.unwrap();
    let (expected, _) = read_txrm(&path, &slice).unwrap();

    assert_eq!(metadata.number_of_images, 3);
    assert_eq!(volume, expected);
}
