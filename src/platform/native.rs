use super::{FrameGrabber, MediaDevices, MediaStream, MetadataFuture};
use crate::errors::{AcquisitionError, CameraError};
use crate::permissions::{check_permission, PermissionStatus};
use crate::types::{CaptureConstraints, TrackCapabilities, TrackSettings, VideoFrame};
use nokhwa::{
    pixel_format::RgbFormat,
    query,
    utils::{
        ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat,
        RequestedFormatType, Resolution,
    },
    CallbackCamera,
};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Frame rate asked for alongside an ideal resolution
const IDEAL_FRAME_RATE: u32 = 30;

/// Camera handle shared with blocking tasks
#[derive(Clone)]
struct SharedCamera(Arc<Mutex<CallbackCamera>>);

// CallbackCamera is only ever touched behind the mutex.
unsafe impl Send for SharedCamera {}
unsafe impl Sync for SharedCamera {}

impl SharedCamera {
    fn lock(&self) -> std::sync::LockResult<std::sync::MutexGuard<'_, CallbackCamera>> {
        self.0.lock()
    }
}

/// Camera access through nokhwa's native backends (V4L2, MSMF, AVFoundation)
#[derive(Debug, Clone)]
pub struct NativeMediaDevices {
    device_index: u32,
    /// One permit: held by a stream until its hardware stop has completed
    device_slot: Arc<Semaphore>,
}

impl NativeMediaDevices {
    pub fn new(device_index: u32) -> Self {
        Self {
            device_index,
            device_slot: Arc::new(Semaphore::new(1)),
        }
    }

    pub fn device_index(&self) -> u32 {
        self.device_index
    }
}

impl MediaDevices for NativeMediaDevices {
    type Stream = NativeStream;

    fn is_supported(&self) -> bool {
        if !cfg!(any(target_os = "windows", target_os = "macos", target_os = "linux")) {
            return false;
        }
        match query(ApiBackend::Auto) {
            Ok(devices) => {
                log::debug!("Native capture available, {} camera(s) found", devices.len());
                true
            }
            Err(e) => {
                log::warn!("Native capture backend unavailable: {}", e);
                false
            }
        }
    }

    fn get_user_media(
        &self,
        constraints: &CaptureConstraints,
    ) -> impl Future<Output = Result<NativeStream, AcquisitionError>> + Send {
        let device_index = self.device_index;
        let constraints = *constraints;
        let slot = self.device_slot.clone();
        async move {
            // A superseded stream may still be opening or stopping.
            let permit = slot.acquire_owned().await.map_err(|e| {
                AcquisitionError::named("AbortError", format!("Device slot closed: {}", e))
            })?;
            tokio::task::spawn_blocking(move || open_stream(device_index, constraints, permit))
                .await
                .map_err(|e| AcquisitionError::named("AbortError", format!("Task join error: {}", e)))?
        }
    }
}

fn open_stream(
    device_index: u32,
    constraints: CaptureConstraints,
    permit: OwnedSemaphorePermit,
) -> Result<NativeStream, AcquisitionError> {
    log::debug!(
        "Opening camera {} with constraints {}",
        device_index,
        serde_json::to_string(&constraints).unwrap_or_default()
    );

    let requested = match constraints {
        CaptureConstraints::Any => RequestedFormat::new::<RgbFormat>(RequestedFormatType::None),
        CaptureConstraints::Ideal { width, height } => {
            let ideal = CameraFormat::new(
                Resolution::new(width, height),
                FrameFormat::MJPEG,
                IDEAL_FRAME_RATE,
            );
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(ideal))
        }
    };

    let mut camera = CallbackCamera::new(CameraIndex::Index(device_index), requested, |_| {})
        .map_err(|e| classify_open_error(&e.to_string(), check_permission()))?;

    camera
        .open_stream()
        .map_err(|e| classify_open_error(&e.to_string(), check_permission()))?;

    let capabilities = query_capabilities(&mut camera);
    let settings = match camera.resolution() {
        Ok(resolution) => TrackSettings {
            width: resolution.width_x,
            height: resolution.height_y,
            frame_rate: camera.frame_rate().ok().map(f64::from),
        },
        Err(e) => {
            log::warn!("Camera did not report its resolution: {}", e);
            let (width, height) = match constraints {
                CaptureConstraints::Ideal { width, height } => (width, height),
                CaptureConstraints::Any => (0, 0),
            };
            TrackSettings {
                width,
                height,
                frame_rate: None,
            }
        }
    };

    log::info!(
        "Camera {} opened at {}x{}",
        device_index,
        settings.width,
        settings.height
    );

    Ok(NativeStream {
        camera: SharedCamera(Arc::new(Mutex::new(camera))),
        capabilities,
        settings,
        stopped: Arc::new(AtomicBool::new(false)),
        device_slot: Some(permit),
    })
}

/// Largest width and height over every resolution the device advertises
fn query_capabilities(camera: &mut CallbackCamera) -> Option<TrackCapabilities> {
    let fourccs = camera.compatible_fourcc().ok()?;
    let mut caps: Option<TrackCapabilities> = None;

    for fourcc in fourccs {
        let Ok(resolutions) = camera.compatible_list_by_resolution(fourcc) else {
            continue;
        };
        for resolution in resolutions.keys() {
            let current = caps.get_or_insert(TrackCapabilities {
                max_width: 0,
                max_height: 0,
            });
            current.max_width = current.max_width.max(resolution.width_x);
            current.max_height = current.max_height.max(resolution.height_y);
        }
    }

    caps.filter(|c| c.max_width > 0 && c.max_height > 0)
}

/// Map a backend open failure onto an acquisition category
pub fn classify_open_error(message: &str, permission: PermissionStatus) -> AcquisitionError {
    let lower = message.to_lowercase();

    if matches!(permission, PermissionStatus::Denied | PermissionStatus::Restricted)
        || lower.contains("permission")
        || lower.contains("denied")
        || lower.contains("not authorized")
    {
        AcquisitionError::permission_denied(message)
    } else if lower.contains("format") || lower.contains("resolution") {
        AcquisitionError::constraints_unsatisfiable(message)
    } else {
        AcquisitionError::device_unavailable(message)
    }
}

/// A live nokhwa stream
pub struct NativeStream {
    camera: SharedCamera,
    capabilities: Option<TrackCapabilities>,
    settings: TrackSettings,
    stopped: Arc<AtomicBool>,
    device_slot: Option<OwnedSemaphorePermit>,
}

impl MediaStream for NativeStream {
    fn stop_tracks(&mut self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }

        let camera = self.camera.clone();
        let permit = self.device_slot.take();
        let stop = move || {
            match camera.lock() {
                Ok(mut camera) => {
                    if let Err(e) = camera.stop_stream() {
                        log::warn!("Failed to stop camera stream: {}", e);
                    }
                }
                Err(_) => log::error!("Camera mutex poisoned while stopping stream"),
            }
            // The device is free for the next open only once it is stopped.
            drop(permit);
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(stop);
            }
            Err(_) => stop(),
        }
    }

    fn capabilities(&self) -> Option<TrackCapabilities> {
        self.capabilities
    }

    fn settings(&self) -> TrackSettings {
        self.settings
    }

    fn metadata_ready(&self) -> MetadataFuture {
        let camera = self.camera.clone();
        Box::pin(async move {
            // The first decoded frame means the negotiated format is live.
            let result = tokio::task::spawn_blocking(move || {
                let mut camera = camera
                    .lock()
                    .map_err(|_| "Camera mutex poisoned".to_string())?;
                camera.poll_frame().map(|_| ()).map_err(|e| e.to_string())
            })
            .await;

            match result {
                Ok(Ok(())) => log::debug!("First frame received"),
                Ok(Err(e)) => log::debug!("Metadata frame failed: {}", e),
                Err(e) => log::warn!("Metadata task failed: {}", e),
            }
        })
    }

    fn frame_grabber(&self) -> FrameGrabber {
        let camera = self.camera.clone();
        let stopped = self.stopped.clone();
        Box::new(move || grab_frame(&camera, &stopped))
    }
}

fn grab_frame(camera: &SharedCamera, stopped: &AtomicBool) -> Result<VideoFrame, CameraError> {
    if stopped.load(Ordering::SeqCst) {
        return Err(CameraError::CaptureError("Stream is stopped".to_string()));
    }

    let mut camera = camera
        .lock()
        .map_err(|_| CameraError::CaptureError("Failed to lock camera".to_string()))?;

    let buffer = camera
        .poll_frame()
        .map_err(|e| CameraError::CaptureError(format!("Failed to capture frame: {}", e)))?;

    let decoded = buffer
        .decode_image::<RgbFormat>()
        .map_err(|e| CameraError::CaptureError(format!("Failed to decode frame: {}", e)))?;

    let (width, height) = (decoded.width(), decoded.height());
    Ok(VideoFrame::new(width, height, decoded.into_raw()))
}

impl Drop for NativeStream {
    fn drop(&mut self) {
        self.stop_tracks();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AcquisitionErrorKind;
    use std::time::Duration;

    #[tokio::test]
    async fn test_open_waits_until_device_is_released() {
        let devices = NativeMediaDevices::new(0);
        let held = devices.device_slot.clone().acquire_owned().await.unwrap();

        let waiting = tokio::time::timeout(
            Duration::from_millis(50),
            devices.get_user_media(&CaptureConstraints::Any),
        )
        .await;
        assert!(waiting.is_err(), "open must wait while another stream holds the device");

        drop(held);
        assert_eq!(devices.device_slot.available_permits(), 1);
    }

    #[test]
    fn test_denied_permission_wins() {
        let err = classify_open_error("Could not open device", PermissionStatus::Denied);
        assert_eq!(err.kind, AcquisitionErrorKind::PermissionDenied);
        assert_eq!(err.name, "NotAllowedError");
    }

    #[test]
    fn test_format_failure_is_overconstrained() {
        let err = classify_open_error(
            "Could not set resolution: format not supported",
            PermissionStatus::Granted,
        );
        assert_eq!(err.kind, AcquisitionErrorKind::ConstraintsUnsatisfiable);
    }

    #[test]
    fn test_other_failures_mean_missing_device() {
        let err = classify_open_error("No such device (os error 19)", PermissionStatus::Granted);
        assert_eq!(err.kind, AcquisitionErrorKind::DeviceUnavailable);
        assert_eq!(err.message, "No such device (os error 19)");
    }
}
