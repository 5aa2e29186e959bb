use anyhow::{anyhow, bail, Context};
use camwidget::config::WidgetConfig;
use camwidget::multiplier::calculate_product;
use camwidget::platform::{MediaDevices, NativeMediaDevices};
use camwidget::testing::SyntheticMediaDevices;
use camwidget::{Snapshot, StreamController};
use chrono::Utc;
use std::env;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct CameraArgs {
    resolution: String,
    out_dir: Option<PathBuf>,
    synthetic: bool,
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    camwidget::init_logging();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: camwidget-cli <snapshot|watch|multiply> [args]");
        std::process::exit(1);
    }

    match args[1].as_str() {
        "snapshot" => {
            let camera_args = parse_camera_args(&args[2..])?;
            if camera_args.synthetic {
                cmd_snapshot(&SyntheticMediaDevices::default(), camera_args).await
            } else {
                let config = WidgetConfig::load_or_default();
                cmd_snapshot(&NativeMediaDevices::new(config.stream.device_index), camera_args)
                    .await
            }
        }
        "watch" => {
            let camera_args = parse_camera_args(&args[2..])?;
            if camera_args.synthetic {
                cmd_watch(&SyntheticMediaDevices::default(), camera_args).await
            } else {
                let config = WidgetConfig::load_or_default();
                cmd_watch(&NativeMediaDevices::new(config.stream.device_index), camera_args).await
            }
        }
        "multiply" => cmd_multiply(&args),
        other => {
            eprintln!("Unknown command: {}", other);
            std::process::exit(1);
        }
    }
}

fn parse_camera_args(args: &[String]) -> anyhow::Result<CameraArgs> {
    let mut parsed = CameraArgs {
        resolution: "default".to_string(),
        out_dir: None,
        synthetic: false,
        json: false,
    };

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--resolution" => {
                i += 1;
                parsed.resolution = args
                    .get(i)
                    .ok_or_else(|| anyhow!("--resolution needs a value"))?
                    .clone();
            }
            "--out" => {
                i += 1;
                let dir = args.get(i).ok_or_else(|| anyhow!("--out needs a value"))?;
                parsed.out_dir = Some(PathBuf::from(dir));
            }
            "--synthetic" => parsed.synthetic = true,
            "--json" => parsed.json = true,
            other => bail!("Unknown option: {}", other),
        }
        i += 1;
    }

    Ok(parsed)
}

/// Turn the camera on with the requested resolution and wait for metadata
async fn open_panel<D: MediaDevices>(
    devices: &D,
    resolution: &str,
) -> anyhow::Result<StreamController<D::Stream>> {
    let mut controller = StreamController::new();
    controller.check_platform(devices)?;
    controller.set_camera_enabled(true)?;
    controller.select_resolution(resolution)?;

    match controller.handle_controls_change(devices).await {
        Some(watch) => {
            let session = watch.wait().await;
            controller.on_metadata_loaded(session);
            Ok(controller)
        }
        None => bail!("{}", controller.status().text),
    }
}

async fn cmd_snapshot<D: MediaDevices>(devices: &D, args: CameraArgs) -> anyhow::Result<()> {
    let mut controller = open_panel(devices, &args.resolution).await?;
    eprintln!("{}", controller.status().text);

    let grab = controller
        .snapshot_grabber()
        .ok_or_else(|| anyhow!("Camera stopped before the snapshot"))?;
    let snapshot = tokio::task::spawn_blocking(move || Snapshot::capture(grab, Utc::now())).await??;
    controller.stop();

    let out_dir = match args.out_dir {
        Some(dir) => dir,
        None => PathBuf::from(WidgetConfig::load_or_default().snapshot.output_directory),
    };
    let path = snapshot
        .save_to_dir(&out_dir)
        .with_context(|| format!("writing snapshot to {}", out_dir.display()))?;

    if args.json {
        println!("{}", serde_json::to_string(&snapshot)?);
    } else {
        println!("{} ({}x{})", path.display(), snapshot.width, snapshot.height);
    }
    Ok(())
}

async fn cmd_watch<D: MediaDevices>(devices: &D, args: CameraArgs) -> anyhow::Result<()> {
    let mut controller = open_panel(devices, &args.resolution).await?;

    if args.json {
        println!("{}", serde_json::to_string(&controller.view())?);
    } else {
        println!("{}", controller.status().text);
    }

    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();
    ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst))?;

    while running.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    controller.set_camera_enabled(false)?;
    controller.apply_controls();
    println!("{}", controller.status().text);
    Ok(())
}

fn cmd_multiply(args: &[String]) -> anyhow::Result<()> {
    if args.len() < 4 {
        eprintln!("Usage: camwidget-cli multiply <first> <second> [--json]");
        std::process::exit(1);
    }

    let result = calculate_product(&args[2], &args[3]);
    if args.contains(&"--json".to_string()) {
        println!("{}", serde_json::to_string(&result)?);
    } else {
        println!("{}", result.message);
    }
    Ok(())
}
