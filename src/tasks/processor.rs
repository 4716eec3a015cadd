use std::future::Future;

use crate::error::TaskError;
use crate::raster::RasterImage;

/// An opaque image transformation run off the UI thread.
///
/// Implementations receive a shared, immutable input and must return a new bitmap.
pub trait ImageProcessor: Send + Sync {
    fn name(&self) -> &'static str;

    fn process(&self, image: &RasterImage) -> Result<RasterImage, TaskError>;

    /// Rows per slice for processors that can work on whole rows independently.
    ///
    /// Where there is no worker thread, such processors run one slice at a time
    /// with the UI getting a turn in between. `None` means all at once.
    fn slice_rows(&self) -> Option<u32> {
        None
    }

    /// Transform whole rows of RGBA pixels in place. Only called when
    /// [`ImageProcessor::slice_rows`] returns a size.
    fn process_slice(&self, _pixels: &mut [u8]) -> Result<(), TaskError> {
        Err(TaskError::ProcessingFailed(format!(
            "{} cannot process slices",
            self.name()
        )))
    }
}

/// Run `processor` slice by slice, awaiting `pause()` between slices
#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
pub(crate) async fn process_in_slices<F, P>(
    processor: &dyn ImageProcessor,
    image: &RasterImage,
    mut pause: F,
) -> Result<RasterImage, TaskError>
where
    F: FnMut() -> P,
    P: Future<Output = ()>,
{
    let Some(rows) = processor.slice_rows().filter(|rows| *rows > 0) else {
        return processor.process(image);
    };
    if image.width() == 0 || image.height() == 0 {
        return processor.process(image);
    }
    let mut pixels = image.pixels().to_vec();
    let stride = image.width() as usize * 4 * rows as usize;
    for slice in pixels.chunks_mut(stride) {
        processor.process_slice(slice)?;
        pause().await;
    }
    RasterImage::from_rgba(image.width(), image.height(), pixels)
        .ok_or_else(|| TaskError::ProcessingFailed("pixel buffer size changed".to_owned()))
}

pub const DEFAULT_KEY_THRESHOLD: u8 = 240;

// Rows keyed between UI turns when sliced
const KEY_SLICE_ROWS: u32 = 64;

/// Makes near-white pixels transparent.
///
/// A stand-in for real segmentation: good enough for product shots on a white backdrop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NearWhiteKeyer {
    /// Pixels with every color channel strictly above this become transparent
    pub threshold: u8,
}

impl Default for NearWhiteKeyer {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_KEY_THRESHOLD,
        }
    }
}

impl NearWhiteKeyer {
    fn key(&self, pixels: &mut [u8]) -> usize {
        let mut keyed = 0;
        for px in pixels.chunks_exact_mut(4) {
            if px[..3].iter().all(|&c| c > self.threshold) {
                px[3] = 0;
                keyed += 1;
            }
        }
        keyed
    }
}

impl ImageProcessor for NearWhiteKeyer {
    fn name(&self) -> &'static str {
        "near-white keyer"
    }

    fn process(&self, image: &RasterImage) -> Result<RasterImage, TaskError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(TaskError::ProcessingFailed("image has no pixels".to_owned()));
        }
        let mut pixels = image.pixels().to_vec();
        let keyed = self.key(&mut pixels);
        log::debug!(
            "Keyed {keyed} of {} pixels at threshold {}",
            pixels.len() / 4,
            self.threshold
        );
        RasterImage::from_rgba(image.width(), image.height(), pixels)
            .ok_or_else(|| TaskError::ProcessingFailed("pixel buffer size changed".to_owned()))
    }

    fn slice_rows(&self) -> Option<u32> {
        Some(KEY_SLICE_ROWS)
    }

    fn process_slice(&self, pixels: &mut [u8]) -> Result<(), TaskError> {
        self.key(pixels);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::Color32;

    #[test]
    fn test_keys_out_white_only() {
        let pixels = [
            [255, 255, 255, 255],
            [240, 250, 245, 255],
            [239, 255, 255, 255],
            [10, 20, 30, 255],
        ]
        .concat();
        let image = RasterImage::from_rgba(2, 2, pixels).unwrap();
        let out = NearWhiteKeyer::default().process(&image).unwrap();
        assert_eq!(out.pixel(0, 0).map(|px| px[3]), Some(0));
        // One channel sits exactly on the threshold
        assert_eq!(out.pixel(1, 0).map(|px| px[3]), Some(255));
        assert_eq!(out.pixel(0, 1).map(|px| px[3]), Some(255));
        assert_eq!(out.pixel(1, 1), Some([10, 20, 30, 255]));
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let pixels = [[240, 240, 240, 255], [241, 241, 241, 255]].concat();
        let image = RasterImage::from_rgba(2, 1, pixels).unwrap();
        let out = NearWhiteKeyer::default().process(&image).unwrap();
        assert_eq!(out.pixel(0, 0), Some([240, 240, 240, 255]));
        assert_eq!(out.pixel(1, 0), Some([241, 241, 241, 0]));
    }

    #[test]
    fn test_empty_image_fails() {
        let empty = RasterImage::filled(0, 0, Color32::WHITE);
        assert!(matches!(
            NearWhiteKeyer::default().process(&empty),
            Err(TaskError::ProcessingFailed(_))
        ));
    }

    #[test]
    fn test_sliced_run_matches_whole_run() {
        let keyer = NearWhiteKeyer::default();
        let (width, height) = (3, KEY_SLICE_ROWS * 2 + 5);
        let pixels = (0..width * height)
            .flat_map(|i| if i % 3 == 0 { [250, 250, 250, 255] } else { [40, 90, 200, 255] })
            .collect();
        let image = RasterImage::from_rgba(width, height, pixels).unwrap();

        let mut pauses = 0;
        let sliced = futures::executor::block_on(process_in_slices(&keyer, &image, || {
            pauses += 1;
            async {}
        }))
        .unwrap();

        assert_eq!(pauses, 3);
        assert_eq!(sliced, keyer.process(&image).unwrap());
    }

    #[test]
    fn test_unsliced_processor_runs_whole() {
        struct Invert;
        impl ImageProcessor for Invert {
            fn name(&self) -> &'static str {
                "invert"
            }

            fn process(&self, image: &RasterImage) -> Result<RasterImage, TaskError> {
                let pixels = image.pixels().iter().map(|c| 255 - c).collect();
                RasterImage::from_rgba(image.width(), image.height(), pixels)
                    .ok_or_else(|| TaskError::ProcessingFailed("size".to_owned()))
            }
        }

        let image = RasterImage::filled(2, 2, Color32::BLACK);
        let mut pauses = 0;
        let out = futures::executor::block_on(process_in_slices(&Invert, &image, || {
            pauses += 1;
            async {}
        }))
        .unwrap();
        assert_eq!(pauses, 0);
        assert_eq!(out.pixel(0, 0), Some([255, 255, 255, 0]));
        assert!(Invert.process_slice(&mut [0; 4]).is_err());
    }
}
