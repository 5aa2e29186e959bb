//! Camera panel stream lifecycle
//!
//! [`StreamController`] owns the single capture session and the panel's
//! control state. Every user change funnels through
//! [`StreamController::handle_controls_change`]; asynchronous outcomes
//! (acquisition result, metadata ready) are applied only if they still
//! belong to the current session.
//!
//! ```text
//! Off --toggle on--> Requesting --granted--> Active --toggle off--> Off
//!                         \--rejected--> Off
//! ```

use crate::assert_invariant;
use crate::errors::{AcquisitionError, CameraError};
use crate::platform::{FrameGrabber, MediaDevices, MediaStream, MetadataWatch};
use crate::snapshot::Snapshot;
use crate::types::{
    resolution_options_for, standard_resolutions, CaptureConstraints, ControlState, PanelView,
    ResolutionOption, ResolutionSelection, SessionId, StatusMessage, StreamState,
    DEFAULT_SELECTION,
};
use chrono::{DateTime, Utc};

pub const STATUS_OFF: &str = "Camera is off.";
pub const STATUS_REQUESTING: &str = "Requesting camera access...";
pub const STATUS_UNSUPPORTED: &str = "Sorry, your system does not support camera access.";

const INV_SURFACE: &str = "Surface has a source iff a session is alive";
const INV_SELECTOR: &str = "Resolution selector is enabled iff the toggle is on";
const INV_STATE: &str = "Stream state is Active iff a session is alive";

/// Status line once the track's negotiated settings are known
pub fn active_status(width: u32, height: u32, frame_rate: Option<f64>) -> String {
    match frame_rate {
        Some(fps) => format!(
            "Camera feed active. Resolution: {}x{} @ {} fps",
            width, height, fps
        ),
        None => format!("Camera feed active. Resolution: {}x{}", width, height),
    }
}

/// Status line for a rejected acquisition
pub fn acquisition_error_status(error: &AcquisitionError) -> String {
    format!(
        "Error accessing webcam: {} - {}. The selected resolution might not be supported by your camera.",
        error.name, error.message
    )
}

/// The live binding between a capture device and the panel
pub struct StreamSession<S> {
    id: SessionId,
    stream: S,
    started_at: DateTime<Utc>,
}

impl<S> StreamSession<S> {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

/// Ticket for an in-flight acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquireRequest {
    generation: u64,
    constraints: CaptureConstraints,
}

impl AcquireRequest {
    pub fn constraints(&self) -> &CaptureConstraints {
        &self.constraints
    }
}

pub struct StreamController<S: MediaStream> {
    session: Option<StreamSession<S>>,
    controls: ControlState,
    status: StatusMessage,
    options: Vec<ResolutionOption>,
    options_from_track: bool,
    surface: Option<SessionId>,
    state: StreamState,
    generation: u64,
    unsupported: bool,
}

impl<S: MediaStream> Default for StreamController<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: MediaStream> StreamController<S> {
    pub fn new() -> Self {
        Self {
            session: None,
            controls: ControlState::default(),
            status: StatusMessage::info(STATUS_OFF),
            options: standard_resolutions(),
            options_from_track: false,
            surface: None,
            state: StreamState::Off,
            generation: 0,
            unsupported: false,
        }
    }

    /// Check the platform once and apply the initial control state.
    ///
    /// On a platform without camera capture every control is disabled for
    /// the rest of the controller's life.
    pub async fn initialize<D>(&mut self, devices: &D) -> Option<MetadataWatch>
    where
        D: MediaDevices<Stream = S>,
    {
        if let Err(e) = self.check_platform(devices) {
            log::error!("{}", e);
            return None;
        }
        self.handle_controls_change(devices).await
    }

    /// Disable the panel if `devices` cannot capture at all
    pub fn check_platform<D>(&mut self, devices: &D) -> Result<(), CameraError>
    where
        D: MediaDevices<Stream = S>,
    {
        if devices.is_supported() {
            return Ok(());
        }

        self.release_session();
        self.generation += 1;
        self.state = StreamState::Off;
        self.unsupported = true;
        self.controls.camera_on = false;
        self.controls.toggle_enabled = false;
        self.controls.resolution_select_enabled = false;
        self.controls.snapshot_enabled = false;
        self.status = StatusMessage::error(STATUS_UNSUPPORTED);
        self.check_invariants();
        Err(CameraError::UnsupportedPlatform(
            "camera capture is not available".to_string(),
        ))
    }

    pub fn is_supported(&self) -> bool {
        !self.unsupported
    }

    /// Record the toggle's new value. The stream itself follows on the next
    /// [`handle_controls_change`](Self::handle_controls_change).
    pub fn set_camera_enabled(&mut self, enabled: bool) -> Result<(), CameraError> {
        if self.unsupported {
            return Err(CameraError::UnsupportedPlatform(STATUS_UNSUPPORTED.to_string()));
        }
        self.controls.camera_on = enabled;
        self.controls.resolution_select_enabled = enabled;
        Ok(())
    }

    /// Record the selector's new value after validating it
    pub fn select_resolution(&mut self, value: &str) -> Result<(), CameraError> {
        if self.unsupported {
            return Err(CameraError::UnsupportedPlatform(STATUS_UNSUPPORTED.to_string()));
        }
        let selection: ResolutionSelection = value.parse()?;
        self.controls.selected_resolution = selection.to_string();
        Ok(())
    }

    /// React to the toggle or selector changing.
    ///
    /// Returns the metadata watch of a newly started session, which the
    /// caller resolves and feeds back through
    /// [`on_metadata_loaded`](Self::on_metadata_loaded).
    pub async fn handle_controls_change<D>(&mut self, devices: &D) -> Option<MetadataWatch>
    where
        D: MediaDevices<Stream = S>,
    {
        let request = self.apply_controls()?;
        let outcome = devices.get_user_media(request.constraints()).await;
        self.complete_acquisition(request, outcome)
    }

    /// Synchronous half of [`handle_controls_change`](Self::handle_controls_change).
    /// Returns the acquisition to perform when the toggle is on.
    pub fn apply_controls(&mut self) -> Option<AcquireRequest> {
        if self.unsupported {
            log::warn!("Ignoring control change: camera capture is unsupported");
            return None;
        }

        if self.controls.camera_on {
            self.controls.resolution_select_enabled = true;
            let constraints = self.current_constraints();
            Some(self.begin_acquisition(constraints))
        } else {
            self.controls.resolution_select_enabled = false;
            // Already off: keep a selection made ahead of turning the camera on.
            if self.state != StreamState::Off || self.session.is_some() {
                self.stop();
            }
            self.status = StatusMessage::info(STATUS_OFF);
            self.check_invariants();
            None
        }
    }

    /// Acquire a stream with `constraints`, replacing any current session
    pub async fn start<D>(
        &mut self,
        devices: &D,
        constraints: CaptureConstraints,
    ) -> Option<MetadataWatch>
    where
        D: MediaDevices<Stream = S>,
    {
        let request = self.begin_acquisition(constraints);
        let outcome = devices.get_user_media(request.constraints()).await;
        self.complete_acquisition(request, outcome)
    }

    /// Tear down the current session and enter Requesting
    pub fn begin_acquisition(&mut self, constraints: CaptureConstraints) -> AcquireRequest {
        self.release_session();
        self.generation += 1;
        self.state = StreamState::Requesting;
        self.controls.snapshot_enabled = false;
        self.status = StatusMessage::info(STATUS_REQUESTING);

        log::info!(
            "Requesting camera access with constraints {}",
            serde_json::to_string(&constraints).unwrap_or_default()
        );
        self.check_invariants();

        AcquireRequest {
            generation: self.generation,
            constraints,
        }
    }

    /// Apply the platform's answer to `request`.
    ///
    /// An answer for a request that was superseded (toggle off, or a newer
    /// start) leaves the panel untouched; a stream it carries is stopped.
    pub fn complete_acquisition(
        &mut self,
        request: AcquireRequest,
        outcome: Result<S, AcquisitionError>,
    ) -> Option<MetadataWatch> {
        if request.generation != self.generation {
            log::debug!(
                "Discarding stale acquisition result (generation {} != {})",
                request.generation,
                self.generation
            );
            if let Ok(mut stream) = outcome {
                stream.stop_tracks();
            }
            return None;
        }

        let watch = match outcome {
            Ok(stream) => Some(self.attach_session(stream)),
            Err(error) => {
                self.fail_acquisition(&error);
                None
            }
        };
        self.check_invariants();
        watch
    }

    fn attach_session(&mut self, stream: S) -> MetadataWatch {
        if !self.options_from_track {
            let caps = stream.capabilities();
            if caps.is_none() {
                log::info!("Track reports no capabilities, offering standard resolutions");
            }
            self.options = resolution_options_for(caps.as_ref());
            self.options_from_track = true;
        }

        let id = SessionId::new();
        let watch = MetadataWatch::new(id, stream.metadata_ready());
        self.session = Some(StreamSession {
            id,
            stream,
            started_at: Utc::now(),
        });
        self.surface = Some(id);
        self.state = StreamState::Active;
        self.controls.snapshot_enabled = true;

        log::info!("Camera session {} started", id);
        watch
    }

    fn fail_acquisition(&mut self, error: &AcquisitionError) {
        log::error!("Error accessing the webcam: {}", error);
        self.status = StatusMessage::error(acquisition_error_status(error));
        self.controls.camera_on = false;
        self.controls.resolution_select_enabled = false;
        self.controls.snapshot_enabled = false;
        self.state = StreamState::Off;
    }

    /// Update the status line once the session's metadata is known.
    /// No-op if `session` is no longer the live one.
    pub fn on_metadata_loaded(&mut self, session: SessionId) {
        let Some(current) = self.session.as_ref().filter(|s| s.id == session) else {
            log::debug!("Ignoring metadata for inactive session {}", session);
            return;
        };

        let settings = current.stream.settings();
        self.status = StatusMessage::info(active_status(
            settings.width,
            settings.height,
            settings.frame_rate,
        ));
        log::info!("{}", self.status.text);
    }

    /// Stop the session, clear the surface and reset the selector.
    /// Idempotent.
    pub fn stop(&mut self) {
        self.release_session();
        self.generation += 1;
        self.state = StreamState::Off;
        self.controls.selected_resolution = DEFAULT_SELECTION.to_string();
        self.controls.snapshot_enabled = false;
        self.check_invariants();
    }

    /// Detached grabber for the live session's current frame, `None` when
    /// the camera is off. Callers on an async executor run it on a blocking
    /// thread.
    pub fn snapshot_grabber(&self) -> Option<FrameGrabber> {
        match self.session.as_ref() {
            Some(session) => Some(session.stream.frame_grabber()),
            None => {
                log::warn!("Snapshot requested while the camera is off");
                None
            }
        }
    }

    /// Grab the current frame as a PNG snapshot on the calling thread.
    /// `Ok(None)` when no session is alive.
    pub fn take_snapshot(&self) -> Result<Option<Snapshot>, CameraError> {
        self.snapshot_grabber()
            .map(|grab| Snapshot::capture(grab, Utc::now()))
            .transpose()
    }

    pub fn view(&self) -> PanelView {
        PanelView {
            controls: self.controls.clone(),
            status: self.status.clone(),
            resolution_options: self.options.clone(),
            surface: self.surface,
            state: self.state,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn controls(&self) -> &ControlState {
        &self.controls
    }

    pub fn status(&self) -> &StatusMessage {
        &self.status
    }

    pub fn resolution_options(&self) -> &[ResolutionOption] {
        &self.options
    }

    pub fn session(&self) -> Option<&StreamSession<S>> {
        self.session.as_ref()
    }

    pub fn surface(&self) -> Option<SessionId> {
        self.surface
    }

    fn current_constraints(&self) -> CaptureConstraints {
        match self.controls.selected_resolution.parse::<ResolutionSelection>() {
            Ok(selection) => selection.constraints(),
            Err(e) => {
                log::warn!("{}, requesting unconstrained video", e);
                CaptureConstraints::Any
            }
        }
    }

    /// Stop every track and drop the handle, leaving the selector alone
    fn release_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.stream.stop_tracks();
            log::info!(
                "Camera session {} stopped after {}s",
                session.id,
                (Utc::now() - session.started_at).num_seconds()
            );
        }
        self.surface = None;
    }

    fn check_invariants(&self) {
        assert_invariant!(
            self.surface.is_some() == self.session.is_some(),
            INV_SURFACE,
            "StreamController"
        );
        assert_invariant!(
            self.controls.resolution_select_enabled == self.controls.camera_on,
            INV_SELECTOR,
            "StreamController"
        );
        assert_invariant!(
            (self.state == StreamState::Active) == self.session.is_some(),
            INV_STATE,
            "StreamController"
        );
    }
}
