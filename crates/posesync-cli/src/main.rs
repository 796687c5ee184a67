use std::sync::Arc;

use posesync_cli::store::DirStorage;
use posesync_cli::Session;
use posesync_core::window::WindowView;
use posesync_engine::media::{Frame, MediaPoll, MediaSource};
use posesync_engine::pose::{EstimateOptions, Keypoint, PoseEstimator, PoseSink, SkeletonLine};
use posesync_engine::scheduler::TickFlow;
use posesync_engine::{TickContext, TrackingConfig, TrackingLoop, WindowSink};

const DEMO_SAMPLE_RATE_HZ: f64 = 50.0;
const DEMO_FRAMES: usize = 12;

fn main() {
    env_logger::init();

    let storage = match DirStorage::new("./posesync-projects") {
        Ok(storage) => storage,
        Err(err) => {
            eprintln!("Cannot create projects directory: {err}");
            std::process::exit(1);
        }
    };

    let mut session = Session::new(storage, DEMO_SAMPLE_RATE_HZ);

    println!("Booting posesync session demo...");

    let restored = session.load_video("demo.mp4", 1_000_000);
    println!(
        "Loaded media demo.mp4 (restored previous project: {restored})"
    );

    let csv = build_sample_csv();
    session
        .load_sensor_text("demo.csv", &csv)
        .expect("demo CSV is well-formed");
    let series_len = session.series().map(|s| s.len()).unwrap_or(0);
    println!("Parsed {series_len} sensor samples at {DEMO_SAMPLE_RATE_HZ} Hz");

    if let Some(series) = session.series() {
        let initial = posesync_core::window::full_view(
            series,
            posesync_core::window::DEFAULT_WINDOW_SECONDS,
        );
        println!(
            "Initial full view: [{:.2}s, {:.2}s]",
            initial.visible_start, initial.visible_end
        );
    }

    // Two-point alignment: the clap at 2.0s of video matches 0.5s of data.
    session.mark_video(2.0);
    session.mark_data(0.5);
    let offset = session.apply_sync().expect("both marks were set");
    println!("Applied sync offset: {offset:.3}s");

    session.add_annotation(2.0, "", "clap", "alignment event");
    println!("Annotations: {}", session.annotations().len());

    // Drive a short tracking run against simulated media.
    let mut tracker = TrackingLoop::new(TrackingConfig::default());
    tracker.start();

    let mut media = SimulatedMedia::new(DEMO_FRAMES);
    let mut estimator = SwayingPose::default();
    let mut pose_sink = PrintingPoseSink;
    let mut window_sink = PrintingWindowSink;

    loop {
        let mut ctx = TickContext {
            media: &mut media,
            estimator: &mut estimator,
            pose_sink: &mut pose_sink,
            window_sink: &mut window_sink,
            synchronizer: session.synchronizer(),
        };
        if tracker.tick(&mut ctx) == TickFlow::Stop {
            break;
        }
        if tracker.frame_index() as usize >= DEMO_FRAMES {
            tracker.stop();
        }
    }

    println!(
        "Demo complete — {} frames processed, {} inference calls.",
        tracker.frame_index(),
        estimator.calls
    );
}

fn build_sample_csv() -> String {
    let mut csv = String::from("accel_x,accel_y,accel_z,gyro_x,gyro_y,gyro_z\n");
    for i in 0..100 {
        let t = i as f64 / DEMO_SAMPLE_RATE_HZ;
        csv.push_str(&format!(
            "{:.4},{:.4},{:.4},{:.4},{:.4},{:.4}\n",
            (t * 3.0).sin() * 0.4,
            9.81 + (t * 3.0).cos() * 0.2,
            0.05,
            t.sin() * 0.1,
            0.0,
            0.0
        ));
    }
    csv
}

/// Simulated playback at 30 fps.
struct SimulatedMedia {
    frame: usize,
    total: usize,
    data: Arc<[u8]>,
}

impl SimulatedMedia {
    fn new(total: usize) -> Self {
        Self {
            frame: 0,
            total,
            data: Arc::from(vec![0u8; 64 * 64 * 4]),
        }
    }
}

impl MediaSource for SimulatedMedia {
    fn poll(&mut self) -> MediaPoll {
        if self.frame >= self.total {
            return MediaPoll::Pending;
        }
        let video_time = self.frame as f64 / 30.0;
        self.frame += 1;
        MediaPoll::Ready(Frame {
            video_time,
            width: 64,
            height: 64,
            data: self.data.clone(),
        })
    }
}

/// Canned estimator standing in for the external pose model.
#[derive(Default)]
struct SwayingPose {
    calls: u64,
}

impl PoseEstimator for SwayingPose {
    fn estimate(&mut self, frame: &Frame, _options: &EstimateOptions) -> Vec<Keypoint> {
        self.calls += 1;
        let sway = (frame.video_time * 2.0).sin() * 4.0;
        [
            ("nose", 32.0 + sway, 10.0),
            ("left_shoulder", 24.0 + sway, 20.0),
            ("right_shoulder", 40.0 + sway, 20.0),
            ("left_hip", 26.0 + sway, 38.0),
            ("right_hip", 38.0 + sway, 38.0),
        ]
        .iter()
        .map(|(name, x, y)| Keypoint {
            name: name.to_string(),
            x: *x,
            y: *y,
            score: 0.95,
        })
        .collect()
    }
}

struct PrintingPoseSink;

impl PoseSink for PrintingPoseSink {
    fn render(&mut self, keypoints: &[Keypoint], skeleton: &[SkeletonLine]) {
        println!(
            "  pose: {} keypoints, {} skeleton lines",
            keypoints.len(),
            skeleton.len()
        );
    }
}

struct PrintingWindowSink;

impl WindowSink for PrintingWindowSink {
    fn update(&mut self, view: WindowView) {
        println!(
            "  window: [{:.2}s, {:.2}s] marker {:.2}",
            view.visible_start, view.visible_end, view.marker_fraction
        );
    }
}
