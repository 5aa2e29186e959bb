//! Still-frame snapshots: PNG encoding and download naming

use crate::errors::CameraError;
use crate::platform::FrameGrabber;
use crate::types::VideoFrame;
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// An encoded snapshot ready to be handed to the user
#[derive(Debug, Clone, serde::Serialize)]
pub struct Snapshot {
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    #[serde(skip)]
    pub png: Bytes,
}

impl Snapshot {
    /// Encode `frame` and name it after `taken_at`
    pub fn from_frame(frame: VideoFrame, taken_at: DateTime<Utc>) -> Result<Self, CameraError> {
        let (width, height) = (frame.width, frame.height);
        let png = encode_png(frame)?;
        Ok(Self {
            file_name: snapshot_file_name(taken_at),
            width,
            height,
            png,
        })
    }

    /// Run `grab` and encode its frame. Blocks on the camera.
    pub fn capture(grab: FrameGrabber, taken_at: DateTime<Utc>) -> Result<Self, CameraError> {
        let snapshot = Self::from_frame(grab()?, taken_at)?;
        log::info!(
            "Snapshot {} taken ({}x{})",
            snapshot.file_name,
            snapshot.width,
            snapshot.height
        );
        Ok(snapshot)
    }

    /// Write the PNG into `directory`, creating it if needed
    pub fn save_to_dir<P: AsRef<Path>>(&self, directory: P) -> Result<PathBuf, CameraError> {
        let directory = directory.as_ref();
        std::fs::create_dir_all(directory)?;
        let path = directory.join(&self.file_name);
        std::fs::write(&path, &self.png)?;
        log::info!("Snapshot saved to {:?} ({} bytes)", path, self.png.len());
        Ok(path)
    }
}

/// `snapshot-<ISO8601>.png` with ':' and '.' replaced so the name sorts and
/// stays valid on every filesystem.
pub fn snapshot_file_name(taken_at: DateTime<Utc>) -> String {
    let stamp = taken_at
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("snapshot-{}.png", stamp)
}

pub fn encode_png(frame: VideoFrame) -> Result<Bytes, CameraError> {
    let expected = frame.expected_len();
    if frame.width == 0 || frame.height == 0 || frame.data.len() != expected {
        return Err(CameraError::EncodingError(format!(
            "Frame buffer is {} bytes, expected {} for {}x{} RGB8",
            frame.data.len(),
            expected,
            frame.width,
            frame.height
        )));
    }

    let img = image::RgbImage::from_vec(frame.width, frame.height, frame.data).ok_or_else(|| {
        CameraError::EncodingError("Failed to create image from frame data".to_string())
    })?;

    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .map_err(|e| CameraError::EncodingError(format!("PNG encoding failed: {}", e)))?;

    Ok(Bytes::from(out.into_inner()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn test_file_name_is_filesystem_safe() {
        let taken_at = Utc
            .with_ymd_and_hms(2024, 1, 2, 3, 4, 5)
            .unwrap()
            .checked_add_signed(chrono::Duration::milliseconds(678))
            .unwrap();
        assert_eq!(
            snapshot_file_name(taken_at),
            "snapshot-2024-01-02T03-04-05-678Z.png"
        );
    }

    #[test]
    fn test_encode_png_writes_magic() {
        let frame = VideoFrame::new(4, 2, vec![128u8; 4 * 2 * 3]);
        let png = encode_png(frame).unwrap();
        assert_eq!(&png[..8], &PNG_MAGIC);
    }

    #[test]
    fn test_encode_rejects_short_buffer() {
        let frame = VideoFrame::new(4, 2, vec![0u8; 5]);
        assert!(matches!(encode_png(frame), Err(CameraError::EncodingError(_))));
    }

    #[test]
    fn test_save_to_dir() {
        let dir = tempfile::tempdir().unwrap();
        let frame = VideoFrame::new(2, 2, vec![10u8; 12]);
        let snapshot = Snapshot::from_frame(frame, Utc::now()).unwrap();
        let path = snapshot.save_to_dir(dir.path().join("shots")).unwrap();
        assert!(path.exists());
        assert_eq!(std::fs::read(&path).unwrap().len(), snapshot.png.len());
    }
}
