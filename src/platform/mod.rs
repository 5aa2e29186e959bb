//! Platform capture facility
//!
//! The controller never talks to camera hardware directly. It asks a
//! [`MediaDevices`] implementation for a stream and drives the returned
//! [`MediaStream`] through its lifecycle.

pub mod native;

pub use native::{NativeMediaDevices, NativeStream};

use crate::errors::{AcquisitionError, CameraError};
use crate::types::{CaptureConstraints, SessionId, TrackCapabilities, TrackSettings, VideoFrame};
use std::future::Future;
use std::pin::Pin;

/// Future that resolves once a stream's first frame metadata is known
pub type MetadataFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Blocking grab of the current frame, detached from the stream so it can
/// run on a blocking thread
pub type FrameGrabber = Box<dyn FnOnce() -> Result<VideoFrame, CameraError> + Send + 'static>;

/// Source of camera streams.
pub trait MediaDevices: Send + Sync {
    type Stream: MediaStream + 'static;

    /// Whether the platform offers camera capture at all
    fn is_supported(&self) -> bool;

    /// Request a stream matching `constraints`. May suspend while the
    /// platform prompts for permission.
    fn get_user_media(
        &self,
        constraints: &CaptureConstraints,
    ) -> impl Future<Output = Result<Self::Stream, AcquisitionError>> + Send;
}

/// A granted camera stream with one video track.
pub trait MediaStream: Send {
    /// Halt every hardware track. Must be idempotent and must not block
    /// the calling thread on hardware.
    fn stop_tracks(&mut self);

    /// Capability range of the video track, if the platform reports one
    fn capabilities(&self) -> Option<TrackCapabilities>;

    fn settings(&self) -> TrackSettings;

    /// Resolves when the track's metadata (size, rate) is available
    fn metadata_ready(&self) -> MetadataFuture;

    /// Grabber for the current frame as RGB8 at the track's native size
    fn frame_grabber(&self) -> FrameGrabber;
}

/// Pending metadata notification for one session
pub struct MetadataWatch {
    session: SessionId,
    ready: MetadataFuture,
}

impl MetadataWatch {
    pub fn new(session: SessionId, ready: MetadataFuture) -> Self {
        Self { session, ready }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Wait for metadata, yielding the session it belongs to
    pub async fn wait(self) -> SessionId {
        self.ready.await;
        self.session
    }
}

impl std::fmt::Debug for MetadataWatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataWatch")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}
