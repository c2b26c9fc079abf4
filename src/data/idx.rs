//! Parsing for the IDX binary files used by MNIST and its derivatives.
//!
//! Image files (IDX3) carry a `0x00000803` magic, then big-endian u32 counts
//! for images, rows, and columns, then row-major uint8 pixels. Label files
//! (IDX1) carry a `0x00000801` magic and a big-endian u32 count, then one
//! uint8 class index per item.

use ndarray::Array1;

const IMAGE_MAGIC: u32 = 0x0000_0803;
const LABEL_MAGIC: u32 = 0x0000_0801;

const IMAGE_HEADER_LEN: usize = 16;
const LABEL_HEADER_LEN: usize = 8;

/// An in-memory dataset: one flattened, `[0, 1]`-normalized vector per image
/// and the matching class index per label.
#[derive(Debug)]
pub struct DigitSet {
    pub images: Vec<Array1<f64>>,
    pub labels: Vec<usize>,
}

impl DigitSet {
    /// Pairs parsed images with parsed labels, rejecting a count mismatch.
    pub fn from_parts(images: Vec<Array1<f64>>, labels: Vec<usize>) -> Result<DigitSet, String> {
        if images.len() != labels.len() {
            return Err(format!(
                "image and label files have misaligned sizes: {} images but {} labels.",
                images.len(),
                labels.len()
            ));
        }
        Ok(DigitSet { images, labels })
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

fn read_be_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// Parses an IDX3 image file into flattened vectors with each pixel divided
/// by 255.0.
pub fn parse_images(bytes: &[u8]) -> Result<Vec<Array1<f64>>, String> {
    if bytes.len() < IMAGE_HEADER_LEN {
        return Err(format!(
            "IDX image file too short: expected at least {} header bytes, got {}.",
            IMAGE_HEADER_LEN,
            bytes.len()
        ));
    }

    let magic = read_be_u32(bytes, 0);
    if magic != IMAGE_MAGIC {
        return Err(format!(
            "invalid image file magic number: expected {:#010x}, got {:#010x}.",
            IMAGE_MAGIC, magic
        ));
    }

    let n_images = read_be_u32(bytes, 4) as usize;
    let rows = read_be_u32(bytes, 8) as usize;
    let cols = read_be_u32(bytes, 12) as usize;

    if rows == 0 || cols == 0 {
        return Err(format!("invalid image dimensions: {}×{}.", rows, cols));
    }
    let n_pixels = rows
        .checked_mul(cols)
        .ok_or_else(|| format!("IDX image dimensions overflow: {}×{}.", rows, cols))?;
    let data_len = n_images
        .checked_mul(n_pixels)
        .ok_or_else(|| format!("IDX image payload overflows: {} images of {} pixels.", n_images, n_pixels))?;

    if bytes.len() < IMAGE_HEADER_LEN + data_len {
        return Err(format!(
            "IDX image file too short: header declares {} images of {}×{} pixels \
             but only {} data bytes follow the header.",
            n_images,
            rows,
            cols,
            bytes.len() - IMAGE_HEADER_LEN
        ));
    }

    let images = bytes[IMAGE_HEADER_LEN..IMAGE_HEADER_LEN + data_len]
        .chunks_exact(n_pixels)
        .map(|chunk| chunk.iter().map(|&px| px as f64 / 255.0).collect())
        .collect();

    Ok(images)
}

/// Parses an IDX1 label file into raw class indices.
pub fn parse_labels(bytes: &[u8]) -> Result<Vec<usize>, String> {
    if bytes.len() < LABEL_HEADER_LEN {
        return Err(format!(
            "IDX label file too short: expected at least {} header bytes, got {}.",
            LABEL_HEADER_LEN,
            bytes.len()
        ));
    }

    let magic = read_be_u32(bytes, 0);
    if magic != LABEL_MAGIC {
        return Err(format!(
            "invalid label file magic number: expected {:#010x}, got {:#010x}.",
            LABEL_MAGIC, magic
        ));
    }

    let n_labels = read_be_u32(bytes, 4) as usize;
    if bytes.len() < LABEL_HEADER_LEN + n_labels {
        return Err(format!(
            "IDX label file too short: header declares {} labels but only {} data \
             bytes follow the header.",
            n_labels,
            bytes.len() - LABEL_HEADER_LEN
        ));
    }

    let labels = bytes[LABEL_HEADER_LEN..LABEL_HEADER_LEN + n_labels]
        .iter()
        .map(|&label| label as usize)
        .collect();

    Ok(labels)
}

/// Reads and parses a matching image/label file pair from disk.
pub fn load_set(image_path: &str, label_path: &str) -> Result<DigitSet, String> {
    let image_bytes = std::fs::read(image_path)
        .map_err(|e| format!("cannot read image file '{}': {}", image_path, e))?;
    let label_bytes = std::fs::read(label_path)
        .map_err(|e| format!("cannot read label file '{}': {}", label_path, e))?;

    let images = parse_images(&image_bytes)?;
    let labels = parse_labels(&label_bytes)?;
    DigitSet::from_parts(images, labels)
}
