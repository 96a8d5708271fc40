//! Keypoint and binary-descriptor extraction for reference matching.
//!
//! Keypoints are FAST-9 corners ranked by corner score; each surviving
//! keypoint gets a 256-bit binary descriptor built from pairwise intensity
//! comparisons on a fixed sampling pattern (BRIEF-style). Descriptors are
//! compared with Hamming distance, so the same extractor must be used for
//! both the reference corpus and the query image.

use crate::config::ExtractorConfig;
use image::{GrayImage, RgbImage};
use imageproc::corners::{corners_fast9, Corner};
use imageproc::filter::gaussian_blur_f32;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Descriptor length in bytes (256 comparison bits)
pub const DESCRIPTOR_BYTES: usize = 32;

/// Half-width of the sampling patch around a keypoint
const PATCH_RADIUS: i32 = 15;

/// Keypoints closer than this to the image border are discarded
const BORDER_MARGIN: u32 = 16;

/// A 256-bit binary keypoint descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor(pub [u8; DESCRIPTOR_BYTES]);

impl Descriptor {
    /// Hamming distance to another descriptor
    pub fn hamming(&self, other: &Descriptor) -> u32 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum()
    }
}

/// Extracts binary descriptors from an RGB image
pub struct FeatureExtractor {
    config: ExtractorConfig,
    /// 256 fixed comparison pairs, each `[x1, y1, x2, y2]` relative to the keypoint
    pattern: Vec<[i32; 4]>,
}

impl FeatureExtractor {
    /// Create an extractor with the given settings
    pub fn new(config: ExtractorConfig) -> Self {
        Self {
            config,
            pattern: sampling_pattern(),
        }
    }

    /// Extract descriptors from an image.
    ///
    /// Returns an empty vector when the image has too little structure to
    /// produce any usable keypoints.
    pub fn extract(&self, image: &RgbImage) -> Vec<Descriptor> {
        let gray = image::imageops::grayscale(image);
        self.extract_gray(&gray)
    }

    /// Extract descriptors from an already-grayscale image
    pub fn extract_gray(&self, gray: &GrayImage) -> Vec<Descriptor> {
        let (width, height) = gray.dimensions();
        if width <= 2 * BORDER_MARGIN || height <= 2 * BORDER_MARGIN {
            return Vec::new();
        }

        // Smoothing before sampling makes the pairwise comparisons far less
        // sensitive to pixel noise.
        let smoothed = gaussian_blur_f32(gray, 2.0);

        let mut corners = corners_fast9(&smoothed, self.config.fast_threshold);
        corners.retain(|c| {
            c.x >= BORDER_MARGIN
                && c.y >= BORDER_MARGIN
                && c.x < width - BORDER_MARGIN
                && c.y < height - BORDER_MARGIN
        });
        corners.sort_by(|a, b| b.score.total_cmp(&a.score));
        corners.truncate(self.config.max_keypoints);

        let descriptors: Vec<Descriptor> = corners
            .iter()
            .map(|c| self.describe(&smoothed, c))
            .collect();

        debug!(
            keypoints = descriptors.len(),
            width, height, "Extracted descriptors"
        );

        descriptors
    }

    fn describe(&self, image: &GrayImage, corner: &Corner) -> Descriptor {
        let mut bytes = [0u8; DESCRIPTOR_BYTES];
        let cx = corner.x as i32;
        let cy = corner.y as i32;

        for (bit, pair) in self.pattern.iter().enumerate() {
            let a = image.get_pixel((cx + pair[0]) as u32, (cy + pair[1]) as u32).0[0];
            let b = image.get_pixel((cx + pair[2]) as u32, (cy + pair[3]) as u32).0[0];
            if a < b {
                bytes[bit / 8] |= 1 << (bit % 8);
            }
        }

        Descriptor(bytes)
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(ExtractorConfig::default())
    }
}

/// Fixed pseudo-random comparison pattern shared by all extractor instances.
///
/// Generated from a constant seed so reference descriptors computed in one
/// process remain comparable with query descriptors computed in another.
fn sampling_pattern() -> Vec<[i32; 4]> {
    let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
    let mut next_offset = || {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((state >> 33) % (2 * PATCH_RADIUS as u64 + 1)) as i32 - PATCH_RADIUS
    };

    (0..DESCRIPTOR_BYTES * 8)
        .map(|_| [next_offset(), next_offset(), next_offset(), next_offset()])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn checkerboard(width: u32, height: u32, cell: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            if ((x / cell) + (y / cell)) % 2 == 0 {
                Luma([235u8])
            } else {
                Luma([20u8])
            }
        })
    }

    #[test]
    fn test_hamming_distance() {
        let zero = Descriptor([0u8; DESCRIPTOR_BYTES]);
        let ones = Descriptor([0xFFu8; DESCRIPTOR_BYTES]);

        assert_eq!(zero.hamming(&zero), 0);
        assert_eq!(zero.hamming(&ones), 256);

        let mut one_bit = [0u8; DESCRIPTOR_BYTES];
        one_bit[7] = 0b0001_0000;
        assert_eq!(zero.hamming(&Descriptor(one_bit)), 1);
    }

    #[test]
    fn test_sampling_pattern_is_stable() {
        let a = sampling_pattern();
        let b = sampling_pattern();
        assert_eq!(a, b);
        assert_eq!(a.len(), 256);
        assert!(a
            .iter()
            .flatten()
            .all(|&o| o >= -PATCH_RADIUS && o <= PATCH_RADIUS));
    }

    #[test]
    fn test_extract_finds_corners_on_structured_image() {
        let gray = checkerboard(256, 256, 32);
        let extractor = FeatureExtractor::default();
        let descriptors = extractor.extract_gray(&gray);
        assert!(!descriptors.is_empty());
    }

    #[test]
    fn test_extract_flat_image_yields_nothing() {
        let gray = GrayImage::from_pixel(128, 128, Luma([128u8]));
        let extractor = FeatureExtractor::default();
        assert!(extractor.extract_gray(&gray).is_empty());
    }

    #[test]
    fn test_extract_tiny_image_yields_nothing() {
        let gray = checkerboard(24, 24, 4);
        let extractor = FeatureExtractor::default();
        assert!(extractor.extract_gray(&gray).is_empty());
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let gray = checkerboard(200, 160, 20);
        let extractor = FeatureExtractor::default();
        assert_eq!(extractor.extract_gray(&gray), extractor.extract_gray(&gray));
    }

    #[test]
    fn test_keypoint_cap_is_respected() {
        let gray = checkerboard(400, 400, 8);
        let config = ExtractorConfig {
            max_keypoints: 10,
            ..ExtractorConfig::default()
        };
        let extractor = FeatureExtractor::new(config);
        assert!(extractor.extract_gray(&gray).len() <= 10);
    }
}
