//! Synthetic camera used by tests and the headless demo
//!
//! Behaves like a browser-style capture facility: ideal constraints are
//! clamped to the device maximum, failures can be queued ahead of time, and
//! every stream handed out is tracked so tests can check that tracks were
//! really stopped.

use crate::errors::{AcquisitionError, CameraError};
use crate::platform::{FrameGrabber, MediaDevices, MediaStream, MetadataFuture};
use crate::types::{CaptureConstraints, TrackCapabilities, TrackSettings, VideoFrame};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Gradient test frame; the pattern shifts with `frame_number`
pub fn synthetic_video_frame(frame_number: u64, width: u32, height: u32) -> VideoFrame {
    let mut data = vec![0u8; (width * height * 3) as usize];

    let base = (frame_number % 256) as u8;
    for y in 0..height {
        for x in 0..width {
            let idx = ((y * width + x) * 3) as usize;
            data[idx] = base.wrapping_add((x % 256) as u8);
            data[idx + 1] = base.wrapping_add((y % 256) as u8);
            data[idx + 2] = base.wrapping_add(((x + y) % 256) as u8);
        }
    }

    VideoFrame::new(width, height, data)
}

/// Hardware profile of the synthetic camera
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticCamera {
    /// Resolution picked for unconstrained requests
    pub default_width: u32,
    pub default_height: u32,
    /// Reported capability range; `None` simulates a platform that cannot
    /// report capabilities
    pub capabilities: Option<TrackCapabilities>,
    pub frame_rate: Option<f64>,
}

impl Default for SyntheticCamera {
    /// A 1080p webcam that opens at 720p / 30 fps
    fn default() -> Self {
        Self {
            default_width: 1280,
            default_height: 720,
            capabilities: Some(TrackCapabilities {
                max_width: 1920,
                max_height: 1080,
            }),
            frame_rate: Some(30.0),
        }
    }
}

#[derive(Default)]
struct DeviceLog {
    requests: Vec<CaptureConstraints>,
    stream_flags: Vec<Arc<AtomicBool>>,
}

/// In-memory [`MediaDevices`] implementation
pub struct SyntheticMediaDevices {
    camera: SyntheticCamera,
    supported: bool,
    failures: Mutex<VecDeque<AcquisitionError>>,
    log: Mutex<DeviceLog>,
}

impl SyntheticMediaDevices {
    pub fn new(camera: SyntheticCamera) -> Self {
        Self {
            camera,
            supported: true,
            failures: Mutex::new(VecDeque::new()),
            log: Mutex::new(DeviceLog::default()),
        }
    }

    /// A platform with no capture facility at all
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::new(SyntheticCamera::default())
        }
    }

    /// Reject the next acquisition with `error`
    pub fn fail_next(&self, error: AcquisitionError) {
        self.failures
            .lock()
            .expect("lock poisoned")
            .push_back(error);
    }

    /// Constraints received so far, oldest first
    pub fn requests(&self) -> Vec<CaptureConstraints> {
        self.log.lock().expect("lock poisoned").requests.clone()
    }

    /// Number of streams handed out whose tracks are still running
    pub fn live_streams(&self) -> usize {
        self.log
            .lock()
            .expect("lock poisoned")
            .stream_flags
            .iter()
            .filter(|stopped| !stopped.load(Ordering::SeqCst))
            .count()
    }

    pub fn streams_opened(&self) -> usize {
        self.log.lock().expect("lock poisoned").stream_flags.len()
    }

    fn negotiate(&self, constraints: &CaptureConstraints) -> TrackSettings {
        let (width, height) = match *constraints {
            CaptureConstraints::Any => (self.camera.default_width, self.camera.default_height),
            CaptureConstraints::Ideal { width, height } => match self.camera.capabilities {
                Some(caps) => (width.min(caps.max_width), height.min(caps.max_height)),
                None => (width, height),
            },
        };
        TrackSettings {
            width,
            height,
            frame_rate: self.camera.frame_rate,
        }
    }

    fn acquire(&self, constraints: &CaptureConstraints) -> Result<SyntheticStream, AcquisitionError> {
        let mut log = self.log.lock().expect("lock poisoned");
        log.requests.push(*constraints);

        if let Some(error) = self.failures.lock().expect("lock poisoned").pop_front() {
            return Err(error);
        }

        let stopped = Arc::new(AtomicBool::new(false));
        log.stream_flags.push(stopped.clone());

        Ok(SyntheticStream {
            settings: self.negotiate(constraints),
            capabilities: self.camera.capabilities,
            stopped,
            frames: Arc::new(AtomicU64::new(0)),
        })
    }
}

impl Default for SyntheticMediaDevices {
    fn default() -> Self {
        Self::new(SyntheticCamera::default())
    }
}

impl MediaDevices for SyntheticMediaDevices {
    type Stream = SyntheticStream;

    fn is_supported(&self) -> bool {
        self.supported
    }

    fn get_user_media(
        &self,
        constraints: &CaptureConstraints,
    ) -> impl Future<Output = Result<SyntheticStream, AcquisitionError>> + Send {
        let result = self.acquire(constraints);
        async move {
            // One real suspension, like a permission prompt.
            tokio::task::yield_now().await;
            result
        }
    }
}

/// Stream handed out by [`SyntheticMediaDevices`]
pub struct SyntheticStream {
    settings: TrackSettings,
    capabilities: Option<TrackCapabilities>,
    stopped: Arc<AtomicBool>,
    frames: Arc<AtomicU64>,
}

impl SyntheticStream {
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl MediaStream for SyntheticStream {
    fn stop_tracks(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    fn capabilities(&self) -> Option<TrackCapabilities> {
        self.capabilities
    }

    fn settings(&self) -> TrackSettings {
        self.settings
    }

    fn metadata_ready(&self) -> MetadataFuture {
        Box::pin(async {
            tokio::task::yield_now().await;
        })
    }

    fn frame_grabber(&self) -> FrameGrabber {
        let stopped = self.stopped.clone();
        let frames = self.frames.clone();
        let TrackSettings { width, height, .. } = self.settings;
        Box::new(move || {
            if stopped.load(Ordering::SeqCst) {
                return Err(CameraError::CaptureError("Stream is stopped".to_string()));
            }
            let n = frames.fetch_add(1, Ordering::Relaxed);
            Ok(synthetic_video_frame(n, width, height))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_has_rgb_layout() {
        let frame = synthetic_video_frame(0, 8, 4);
        assert_eq!(frame.data.len(), frame.expected_len());
        assert_eq!(&frame.data[..3], &[0, 0, 0]);
    }

    #[tokio::test]
    async fn test_ideal_is_clamped_to_capabilities() {
        let devices = SyntheticMediaDevices::default();
        let stream = devices
            .get_user_media(&CaptureConstraints::Ideal {
                width: 3840,
                height: 2160,
            })
            .await
            .unwrap();
        assert_eq!((stream.settings().width, stream.settings().height), (1920, 1080));
    }

    #[tokio::test]
    async fn test_grabber_fails_after_stop() {
        let devices = SyntheticMediaDevices::default();
        let mut stream = devices.get_user_media(&CaptureConstraints::Any).await.unwrap();

        let frame = (stream.frame_grabber())().unwrap();
        assert_eq!((frame.width, frame.height), (1280, 720));

        let grab = stream.frame_grabber();
        stream.stop_tracks();
        assert!(matches!(grab(), Err(CameraError::CaptureError(_))));
    }

    #[tokio::test]
    async fn test_queued_failure_is_consumed_once() {
        let devices = SyntheticMediaDevices::default();
        devices.fail_next(AcquisitionError::permission_denied("Permission denied"));

        assert!(devices.get_user_media(&CaptureConstraints::Any).await.is_err());
        assert!(devices.get_user_media(&CaptureConstraints::Any).await.is_ok());
        assert_eq!(devices.requests().len(), 2);
        assert_eq!(devices.streams_opened(), 1);
    }
}
