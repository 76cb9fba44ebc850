use image::RgbImage;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::error::FrameSourceError;

/// One camera frame handed to the detector
#[derive(Debug, Clone)]
pub struct Frame {
    /// Position in the stream, starting at 0
    pub index: u64,
    pub image: RgbImage,
    pub captured_at: Instant,
}

impl Frame {
    pub fn new(index: u64, image: RgbImage) -> Self {
        Self {
            index,
            image,
            captured_at: Instant::now(),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Source of successive frames, owned by the sentinel worker.
///
/// `next_frame` may block on hardware. Implementations backed by a live
/// device must hand out the newest frame and discard anything captured while
/// the previous frame was being classified, so latency stays bounded.
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> Result<Frame, FrameSourceError>;

    /// Name for logging
    fn name(&self) -> &str {
        "frame-source"
    }
}

/// Opens a fresh frame source for each session.
///
/// The camera is acquired when monitoring starts and released when the
/// worker drops the source.
pub trait FrameSourceProvider: Send + Sync {
    fn open(&self) -> Result<Box<dyn FrameSource>, FrameSourceError>;
}

impl<F> FrameSourceProvider for F
where
    F: Fn() -> Result<Box<dyn FrameSource>, FrameSourceError> + Send + Sync,
{
    fn open(&self) -> Result<Box<dyn FrameSource>, FrameSourceError> {
        self()
    }
}

const SUPPORTED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Replays a directory of still images as if they came from a camera.
///
/// Files are read in name order and decoded on demand.
pub struct ImageSequenceSource {
    name: String,
    paths: Vec<PathBuf>,
    next_index: usize,
}

impl ImageSequenceSource {
    pub fn open(dir: &Path) -> Result<Self, FrameSourceError> {
        let entries = fs::read_dir(dir).map_err(|e| {
            FrameSourceError::CameraUnavailable(format!("{}: {}", dir.display(), e))
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_supported_image(path))
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(FrameSourceError::CameraUnavailable(format!(
                "no images found in {}",
                dir.display()
            )));
        }

        tracing::info!(
            "Image sequence opened: {} frames from {}",
            paths.len(),
            dir.display()
        );

        Ok(Self {
            name: dir.display().to_string(),
            paths,
            next_index: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FrameSource for ImageSequenceSource {
    fn next_frame(&mut self) -> Result<Frame, FrameSourceError> {
        let Some(path) = self.paths.get(self.next_index) else {
            return Err(FrameSourceError::EndOfStream);
        };
        let index = self.next_index as u64;
        self.next_index += 1;

        let image = image::open(path).map_err(|source| FrameSourceError::DecodeFailed {
            path: path.display().to_string(),
            source,
        })?;

        Ok(Frame::new(index, image.to_rgb8()))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn write_frames(dir: &Path, count: usize) {
        for i in 0..count {
            let img = RgbImage::from_pixel(8, 6, Rgb([i as u8 * 10, 0, 0]));
            img.save(dir.join(format!("frame_{:03}.png", i))).unwrap();
        }
    }

    #[test]
    fn test_frame_dimensions() {
        let frame = Frame::new(3, RgbImage::new(64, 48));
        assert_eq!(frame.index, 3);
        assert_eq!(frame.width(), 64);
        assert_eq!(frame.height(), 48);
    }

    #[test]
    fn test_image_sequence_in_order_then_end_of_stream() {
        let dir = tempfile::tempdir().unwrap();
        write_frames(dir.path(), 3);
        fs::write(dir.path().join("notes.txt"), "not an image").unwrap();

        let mut source = ImageSequenceSource::open(dir.path()).unwrap();
        assert_eq!(source.len(), 3);

        for expected in 0..3u64 {
            let frame = source.next_frame().unwrap();
            assert_eq!(frame.index, expected);
            assert_eq!(frame.image.get_pixel(0, 0)[0], expected as u8 * 10);
        }

        assert!(matches!(
            source.next_frame(),
            Err(FrameSourceError::EndOfStream)
        ));
    }

    #[test]
    fn test_missing_directory_is_camera_unavailable() {
        let result = ImageSequenceSource::open(Path::new("/nonexistent/zenfocus/frames"));
        assert!(matches!(
            result,
            Err(FrameSourceError::CameraUnavailable(_))
        ));
    }

    #[test]
    fn test_empty_directory_is_camera_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ImageSequenceSource::open(dir.path()),
            Err(FrameSourceError::CameraUnavailable(_))
        ));
    }

    #[test]
    fn test_corrupt_image_reports_decode_failure() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.png"), b"definitely not png").unwrap();

        let mut source = ImageSequenceSource::open(dir.path()).unwrap();
        assert!(matches!(
            source.next_frame(),
            Err(FrameSourceError::DecodeFailed { .. })
        ));
        assert!(matches!(
            source.next_frame(),
            Err(FrameSourceError::EndOfStream)
        ));
    }

    #[test]
    fn test_closure_provider() {
        let provider = || -> Result<Box<dyn FrameSource>, FrameSourceError> {
            Err(FrameSourceError::CameraUnavailable("unplugged".into()))
        };
        assert!(provider.open().is_err());
    }
}
