use crate::commands::config::current_config;
use crate::controller::StreamController;
use crate::errors::CameraError;
use crate::platform::{MediaDevices, MediaStream, MetadataWatch, NativeMediaDevices};
use crate::snapshot::Snapshot;
use crate::types::PanelView;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use tauri::{command, AppHandle, Emitter, Runtime, State};
use tokio::sync::Mutex;

/// Event carrying the latest [`PanelView`] after every change
pub const PANEL_EVENT: &str = "camwidget://panel";

/// Destination for panel updates
pub trait PanelPublisher: Clone + Send + Sync + 'static {
    fn publish(&self, view: &PanelView);
}

impl<R: Runtime> PanelPublisher for AppHandle<R> {
    fn publish(&self, view: &PanelView) {
        if let Err(e) = self.emit(PANEL_EVENT, view) {
            log::warn!("Failed to publish panel view: {}", e);
        }
    }
}

/// Plugin-managed state of the camera panel
pub struct CameraPanelState<D: MediaDevices = NativeMediaDevices> {
    devices: D,
    controller: Arc<Mutex<StreamController<D::Stream>>>,
}

impl<D: MediaDevices> CameraPanelState<D> {
    pub fn new(devices: D, controller: StreamController<D::Stream>) -> Self {
        Self {
            devices,
            controller: Arc::new(Mutex::new(controller)),
        }
    }

    pub fn devices(&self) -> &D {
        &self.devices
    }

    pub async fn view(&self) -> PanelView {
        self.controller.lock().await.view()
    }

    pub async fn set_camera_enabled(&self, enabled: bool) -> Result<(), CameraError> {
        self.controller.lock().await.set_camera_enabled(enabled)
    }

    pub async fn select_resolution(&self, value: &str) -> Result<(), CameraError> {
        self.controller.lock().await.select_resolution(value)
    }
}

/// Result of a snapshot download
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SavedSnapshot {
    pub file_name: String,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub size_bytes: usize,
}

/// Current panel state for rendering
#[command]
pub async fn get_panel_view(state: State<'_, CameraPanelState>) -> Result<PanelView, String> {
    Ok(state.view().await)
}

/// Toggle switch changed
#[command]
pub async fn set_camera_enabled<R: Runtime>(
    app: AppHandle<R>,
    state: State<'_, CameraPanelState>,
    enabled: bool,
) -> Result<PanelView, String> {
    log::info!("Camera toggle set to {}", enabled);
    state
        .set_camera_enabled(enabled)
        .await
        .map_err(|e| e.to_string())?;
    Ok(run_controls_change(&app, state.inner()).await)
}

/// Resolution selector changed
#[command]
pub async fn select_resolution<R: Runtime>(
    app: AppHandle<R>,
    state: State<'_, CameraPanelState>,
    value: String,
) -> Result<PanelView, String> {
    log::info!("Resolution selector set to {}", value);
    state
        .select_resolution(&value)
        .await
        .map_err(|e| e.to_string())?;
    Ok(run_controls_change(&app, state.inner()).await)
}

/// Capture the current frame and write it to the snapshot directory.
/// Returns `None` when the camera is off.
#[command]
pub async fn take_snapshot(
    state: State<'_, CameraPanelState>,
) -> Result<Option<SavedSnapshot>, String> {
    let directory = PathBuf::from(current_config().snapshot.output_directory);
    save_snapshot(state.inner(), directory).await.map_err(|e| {
        log::error!("Failed to take snapshot: {}", e);
        e.to_string()
    })
}

/// Grab, encode and write a snapshot of the live session into `directory`.
/// The camera lock is released before any blocking work starts.
pub async fn save_snapshot<D: MediaDevices>(
    state: &CameraPanelState<D>,
    directory: PathBuf,
) -> Result<Option<SavedSnapshot>, CameraError> {
    let Some(grab) = state.controller.lock().await.snapshot_grabber() else {
        return Ok(None);
    };

    tokio::task::spawn_blocking(move || {
        let snapshot = Snapshot::capture(grab, Utc::now())?;
        let path = snapshot.save_to_dir(&directory)?;
        Ok::<_, CameraError>(Some(SavedSnapshot {
            size_bytes: snapshot.png.len(),
            file_name: snapshot.file_name,
            path,
            width: snapshot.width,
            height: snapshot.height,
        }))
    })
    .await
    .map_err(|e| CameraError::CaptureError(format!("Task join error: {}", e)))?
}

/// Apply the current controls, releasing the lock while the camera opens
pub async fn run_controls_change<D, P>(publisher: &P, state: &CameraPanelState<D>) -> PanelView
where
    D: MediaDevices,
    P: PanelPublisher,
{
    let request = state.controller.lock().await.apply_controls();

    if let Some(request) = request {
        publisher.publish(&state.view().await);

        let outcome = state.devices.get_user_media(request.constraints()).await;
        let watch = state
            .controller
            .lock()
            .await
            .complete_acquisition(request, outcome);
        if let Some(watch) = watch {
            spawn_metadata_watch(publisher.clone(), state.controller.clone(), watch);
        }
    }

    let view = state.view().await;
    publisher.publish(&view);
    view
}

fn spawn_metadata_watch<S, P>(
    publisher: P,
    controller: Arc<Mutex<StreamController<S>>>,
    watch: MetadataWatch,
) where
    S: MediaStream + 'static,
    P: PanelPublisher,
{
    tokio::spawn(async move {
        let session = watch.wait().await;
        let view = {
            let mut controller = controller.lock().await;
            controller.on_metadata_loaded(session);
            controller.view()
        };
        publisher.publish(&view);
    });
}
