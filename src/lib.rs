//! camwidget: camera preview panel and multiplier form for Tauri host consoles
//!
//! The camera panel shows a live webcam feed behind an on/off toggle, lets
//! the user pick a capture resolution, and downloads PNG snapshots. The
//! multiplier form multiplies two numbers. Both are exposed to the host
//! webview as plugin commands.
//!
//! # Usage
//! ```rust,ignore
//! fn main() {
//!     tauri::Builder::default()
//!         .plugin(camwidget::init())
//!         .run(tauri::generate_context!())
//!         .expect("error while running tauri application");
//! }
//! ```
//!
//! The plugin emits `camwidget://ready` once it is set up and
//! `camwidget://panel` with a fresh [`types::PanelView`] after every change.
pub mod commands;
pub mod config;
pub mod controller;
pub mod errors;
pub mod invariant_ppt;
pub mod multiplier;
pub mod permissions;
pub mod platform;
pub mod snapshot;
pub mod types;

// Synthetic capture facility for offline testing
pub mod testing;

pub use controller::StreamController;
pub use errors::{AcquisitionError, AcquisitionErrorKind, CameraError};
pub use platform::{MediaDevices, MediaStream, MetadataWatch, NativeMediaDevices};
pub use snapshot::Snapshot;
pub use types::{CaptureConstraints, ControlState, PanelView, ResolutionOption, StreamState};

use commands::camera::CameraPanelState;
use tauri::{
    plugin::{Builder, TauriPlugin},
    Emitter, Manager, Runtime,
};

/// Event signalling the host shell that the widgets are ready
pub const READY_EVENT: &str = "camwidget://ready";

/// Initialize the camwidget plugin with all commands
pub fn init<R: Runtime>() -> TauriPlugin<R> {
    Builder::new("camwidget")
        .invoke_handler(tauri::generate_handler![
            // Camera panel
            commands::camera::get_panel_view,
            commands::camera::set_camera_enabled,
            commands::camera::select_resolution,
            commands::camera::take_snapshot,
            commands::permissions::check_camera_permission,
            // Multiplier form
            commands::multiplier::calculate_product,
            // Configuration
            commands::config::get_config,
            commands::config::update_config,
            commands::config::reset_config,
        ])
        .setup(|app, _api| {
            let config = commands::config::current_config();
            let devices = NativeMediaDevices::new(config.stream.device_index);

            let mut controller = StreamController::new();
            let supported = controller.check_platform(&devices).is_ok();
            if supported {
                controller.set_camera_enabled(config.stream.start_enabled)?;
                controller.select_resolution(&config.stream.initial_resolution)?;
            } else {
                log::error!("Camera capture is not supported on this system");
            }
            app.manage(CameraPanelState::new(devices, controller));

            if supported {
                let app = app.clone();
                tauri::async_runtime::spawn(async move {
                    let state = app.state::<CameraPanelState>();
                    commands::camera::run_controls_change(&app, state.inner()).await;
                });
            }

            app.emit(READY_EVENT, get_info())?;
            log::info!("camwidget {} ready", VERSION);
            Ok(())
        })
        .build()
}

/// Initialize logging for the widgets
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "camwidget=info");
    }
    let _ = env_logger::try_init();
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
    }
}

/// Payload of the ready event
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}
