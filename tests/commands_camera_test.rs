//! Camera panel command layer against the synthetic capture facility
//!
//! Run with: cargo test --test commands_camera_test

#[cfg(test)]
mod commands_camera_tests {
    use camwidget::commands::camera::{
        run_controls_change, save_snapshot, CameraPanelState, PanelPublisher,
    };
    use camwidget::testing::SyntheticMediaDevices;
    use camwidget::types::{PanelView, StreamState};
    use camwidget::StreamController;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tempfile::tempdir;

    /// Collects every published view instead of emitting to a webview
    #[derive(Clone, Default)]
    struct RecordingPublisher {
        views: Arc<Mutex<Vec<PanelView>>>,
    }

    impl RecordingPublisher {
        fn views(&self) -> Vec<PanelView> {
            self.views.lock().unwrap().clone()
        }

        fn last_status(&self) -> Option<String> {
            self.views().last().map(|view| view.status.text.clone())
        }
    }

    impl PanelPublisher for RecordingPublisher {
        fn publish(&self, view: &PanelView) {
            self.views.lock().unwrap().push(view.clone());
        }
    }

    fn panel_state() -> CameraPanelState<SyntheticMediaDevices> {
        CameraPanelState::new(SyntheticMediaDevices::default(), StreamController::new())
    }

    /// Wait for the spawned metadata task to publish `status`
    async fn wait_for_status(publisher: &RecordingPublisher, status: &str) {
        for _ in 0..100 {
            if publisher.last_status().as_deref() == Some(status) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "status never became {:?}, last was {:?}",
            status,
            publisher.last_status()
        );
    }

    #[tokio::test]
    async fn test_toggle_on_publishes_requesting_then_active() {
        let state = panel_state();
        let publisher = RecordingPublisher::default();

        state.set_camera_enabled(true).await.unwrap();
        let view = run_controls_change(&publisher, &state).await;

        assert_eq!(view.state, StreamState::Active);
        assert!(view.surface.is_some());

        let views = publisher.views();
        assert_eq!(views[0].state, StreamState::Requesting);
        assert_eq!(views[0].status.text, "Requesting camera access...");

        wait_for_status(
            &publisher,
            "Camera feed active. Resolution: 1280x720 @ 30 fps",
        )
        .await;
        assert_eq!(
            state.view().await.status.text,
            "Camera feed active. Resolution: 1280x720 @ 30 fps"
        );
    }

    #[tokio::test]
    async fn test_overlapping_changes_leave_one_live_stream() {
        let state = panel_state();
        let publisher = RecordingPublisher::default();

        state.set_camera_enabled(true).await.unwrap();
        tokio::join!(
            run_controls_change(&publisher, &state),
            run_controls_change(&publisher, &state),
        );

        let devices = state.devices();
        assert_eq!(devices.streams_opened(), 2);
        assert_eq!(devices.live_streams(), 1);

        let view = state.view().await;
        assert_eq!(view.state, StreamState::Active);
        assert!(view.surface.is_some());
    }

    #[tokio::test]
    async fn test_toggle_off_during_acquisition_wins() {
        let state = panel_state();
        let publisher = RecordingPublisher::default();

        state.set_camera_enabled(true).await.unwrap();
        tokio::join!(run_controls_change(&publisher, &state), async {
            state.set_camera_enabled(false).await.unwrap();
            run_controls_change(&publisher, &state).await
        });

        let view = state.view().await;
        assert_eq!(view.state, StreamState::Off);
        assert!(view.surface.is_none());
        assert_eq!(view.status.text, "Camera is off.");
        assert_eq!(state.devices().live_streams(), 0);
    }

    #[tokio::test]
    async fn test_selection_while_off_reaches_next_acquisition() {
        let state = panel_state();
        let publisher = RecordingPublisher::default();

        state.select_resolution("1280x720").await.unwrap();
        let view = run_controls_change(&publisher, &state).await;
        assert_eq!(view.controls.selected_resolution, "1280x720");

        state.set_camera_enabled(true).await.unwrap();
        run_controls_change(&publisher, &state).await;

        let requests = state.devices().requests();
        assert_eq!(
            serde_json::to_string(&requests[0]).unwrap(),
            r#"{"video":{"width":{"ideal":1280},"height":{"ideal":720}}}"#
        );
    }

    #[tokio::test]
    async fn test_invalid_selection_is_rejected() {
        let state = panel_state();
        assert!(state.select_resolution("wide").await.is_err());
        assert_eq!(state.view().await.controls.selected_resolution, "default");
    }

    #[tokio::test]
    async fn test_save_snapshot_while_off() {
        let state = panel_state();
        let dir = tempdir().unwrap();

        let saved = save_snapshot(&state, dir.path().to_path_buf()).await.unwrap();
        assert!(saved.is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_save_snapshot_writes_png() {
        let state = panel_state();
        let publisher = RecordingPublisher::default();
        let dir = tempdir().unwrap();

        state.set_camera_enabled(true).await.unwrap();
        run_controls_change(&publisher, &state).await;

        let saved = save_snapshot(&state, dir.path().to_path_buf())
            .await
            .unwrap()
            .unwrap();
        assert_eq!((saved.width, saved.height), (1280, 720));
        assert!(saved.path.starts_with(dir.path()));
        assert_eq!(
            std::fs::metadata(&saved.path).unwrap().len() as usize,
            saved.size_bytes
        );
    }
}
