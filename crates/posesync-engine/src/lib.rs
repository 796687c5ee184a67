pub mod clock;
pub mod media;
pub mod pose;
pub mod scheduler;

use std::time::Duration;

use log::{debug, info, warn};
use posesync_core::sync::StreamSynchronizer;
use posesync_core::window::{self, WindowView, DEFAULT_WINDOW_SECONDS};

use crate::clock::{Clock, SystemClock, Throttle};
use crate::media::{MediaPoll, MediaSource};
use crate::pose::{derive_skeleton, EstimateOptions, Keypoint, PoseEstimator, PoseSink};
use crate::scheduler::TickFlow;

/// Receives throttled windowed-view updates. External charting plumbing.
pub trait WindowSink {
    fn update(&mut self, view: WindowView);
}

/// Tuning knobs for the tracking loop, grouped into a configuration
/// structure.
#[derive(Debug, Clone)]
pub struct TrackingConfig {
    /// Inference runs once every this many ticks. 1 means every tick.
    pub skip_interval: u64,
    /// Minimum wall-clock gap between windowed-view updates.
    pub throttle_interval: Duration,
    /// Duration of the playback window handed to the view computer.
    pub window_seconds: f64,
    /// Mirror the frame before inference (front-facing capture).
    pub mirror: bool,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            skip_interval: 2,
            throttle_interval: Duration::from_millis(33),
            window_seconds: DEFAULT_WINDOW_SECONDS,
            mirror: false,
        }
    }
}

/// The collaborators one tick works against, borrowed for the duration of the
/// tick. All mutation stays confined to the single control flow driving the
/// loop.
pub struct TickContext<'a> {
    pub media: &'a mut dyn MediaSource,
    pub estimator: &'a mut dyn PoseEstimator,
    pub pose_sink: &'a mut dyn PoseSink,
    pub window_sink: &'a mut dyn WindowSink,
    pub synchronizer: &'a StreamSynchronizer,
}

/// Drives pose inference against video playback.
///
/// One instance runs at a time. Each scheduled tick polls the media source,
/// decides whether inference is due under the frame-skip policy, renders the
/// latest available result, and (throttled) recomputes the playback window.
/// Cancellation is checked only at the top of a tick, never mid-tick.
pub struct TrackingLoop<C: Clock = SystemClock> {
    config: TrackingConfig,
    clock: C,
    throttle: Throttle,
    running: bool,
    frame_index: u64,
    last_keypoints: Option<Vec<Keypoint>>,
}

impl TrackingLoop<SystemClock> {
    pub fn new(config: TrackingConfig) -> Self {
        Self::with_clock(config, SystemClock::default())
    }
}

impl<C: Clock> TrackingLoop<C> {
    pub fn with_clock(config: TrackingConfig, clock: C) -> Self {
        assert!(config.skip_interval > 0, "skip interval must be positive");
        let throttle = Throttle::new(config.throttle_interval);
        Self {
            config,
            clock,
            throttle,
            running: false,
            frame_index: 0,
            last_keypoints: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn last_keypoints(&self) -> Option<&[Keypoint]> {
        self.last_keypoints.as_deref()
    }

    /// Transitions to RUNNING. Starting while already running is a no-op.
    pub fn start(&mut self) -> bool {
        if self.running {
            debug!("Tracking loop already running; start ignored");
            return false;
        }
        info!(
            "Tracking started (skip interval {}, throttle {:?})",
            self.config.skip_interval, self.config.throttle_interval
        );
        self.running = true;
        true
    }

    /// Transitions to STOPPED. An in-flight inference from the final tick
    /// completes but its result is discarded: the next tick observes the stop
    /// before rendering or rescheduling.
    pub fn stop(&mut self) {
        if self.running {
            info!("Tracking stopped at frame {}", self.frame_index);
        }
        self.running = false;
    }

    /// Prepares for a different media source / estimator pairing. Only
    /// permitted while stopped; frame index, cached keypoints, and the
    /// throttle return to their initial values.
    pub fn reset_session(&mut self) -> bool {
        if self.running {
            warn!("Refusing session reset while tracking is running");
            return false;
        }
        self.frame_index = 0;
        self.last_keypoints = None;
        self.throttle.reset();
        true
    }

    /// Runs one scheduled tick. The returned flow tells the scheduler whether
    /// to reschedule.
    pub fn tick(&mut self, ctx: &mut TickContext<'_>) -> TickFlow {
        // Cancellation is only ever observed here, at the tick boundary.
        if !self.running {
            return TickFlow::Stop;
        }

        let frame = match ctx.media.poll() {
            // Insufficient buffered data: reschedule without side effects.
            MediaPoll::Pending => return TickFlow::Continue,
            MediaPoll::Ready(frame) => frame,
            MediaPoll::Failed(reason) => {
                warn!("Media source failed terminally: {reason}");
                self.running = false;
                return TickFlow::Stop;
            }
        };

        self.frame_index += 1;

        // Inference is due every skip_interval ticks, or immediately while no
        // result exists yet. Off-cadence ticks reuse the previous result
        // verbatim; stale-pose display is the accepted trade-off.
        let inference_due =
            self.last_keypoints.is_none() || self.frame_index % self.config.skip_interval == 0;
        if inference_due {
            let options = EstimateOptions {
                max_results: 1,
                mirror: self.config.mirror,
            };
            let keypoints = ctx.estimator.estimate(&frame, &options);
            debug!(
                "Frame {}: inference produced {} keypoints",
                self.frame_index,
                keypoints.len()
            );
            self.last_keypoints = Some(keypoints);
        }

        // Before the first completed inference there is nothing to draw.
        let Some(keypoints) = self.last_keypoints.as_ref() else {
            return TickFlow::Continue;
        };

        let skeleton = derive_skeleton(keypoints);
        ctx.pose_sink.render(keypoints, &skeleton);

        // Windowed-view refresh is throttled on wall clock, decoupled from
        // both the tick rate and the inference cadence.
        let now = self.clock.now();
        if self.throttle.should_fire(now) {
            let view = window::playback_view(
                frame.video_time,
                ctx.synchronizer.offset_seconds(),
                self.config.window_seconds,
            );
            ctx.window_sink.update(view);
        }

        TickFlow::Continue
    }
}

/// Feeds scrub/time updates to the windowed view while the tracking loop is
/// inactive, under the same throttle policy.
pub struct PassiveTimeListener<C: Clock = SystemClock> {
    clock: C,
    throttle: Throttle,
    window_seconds: f64,
}

impl PassiveTimeListener<SystemClock> {
    pub fn new(throttle_interval: Duration, window_seconds: f64) -> Self {
        Self::with_clock(throttle_interval, window_seconds, SystemClock::default())
    }
}

impl<C: Clock> PassiveTimeListener<C> {
    pub fn with_clock(throttle_interval: Duration, window_seconds: f64, clock: C) -> Self {
        Self {
            clock,
            throttle: Throttle::new(throttle_interval),
            window_seconds,
        }
    }

    pub fn on_time_update(
        &mut self,
        video_time: f64,
        synchronizer: &StreamSynchronizer,
        sink: &mut dyn WindowSink,
    ) {
        let now = self.clock.now();
        if !self.throttle.should_fire(now) {
            return;
        }
        let view = window::playback_view(
            video_time,
            synchronizer.offset_seconds(),
            self.window_seconds,
        );
        sink.update(view);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::Frame;
    use approx::assert_relative_eq;
    use std::cell::RefCell;
    use std::sync::Arc;

    struct MockClock {
        times: RefCell<Vec<Duration>>,
    }

    impl MockClock {
        fn new(times: Vec<Duration>) -> Self {
            Self {
                times: RefCell::new(times),
            }
        }
    }

    impl Clock for MockClock {
        fn now(&mut self) -> Duration {
            let mut times = self.times.borrow_mut();
            if times.len() == 1 {
                times[0]
            } else {
                times.remove(0)
            }
        }
    }

    /// Media source that yields a scripted sequence of polls, then pends.
    struct ScriptedMedia {
        polls: Vec<MediaPoll>,
    }

    impl ScriptedMedia {
        fn ready_frames(count: usize) -> Self {
            let polls = (0..count)
                .map(|i| MediaPoll::Ready(test_frame(i as f64 / 30.0)))
                .collect();
            Self { polls }
        }
    }

    impl MediaSource for ScriptedMedia {
        fn poll(&mut self) -> MediaPoll {
            if self.polls.is_empty() {
                MediaPoll::Pending
            } else {
                self.polls.remove(0)
            }
        }
    }

    fn test_frame(video_time: f64) -> Frame {
        Frame {
            video_time,
            width: 4,
            height: 4,
            data: Arc::from(vec![0u8; 16]),
        }
    }

    /// Estimator whose every invocation yields a distinct, recognizable
    /// result (the nose x-coordinate counts invocations).
    #[derive(Default)]
    struct CountingEstimator {
        calls: u64,
    }

    impl PoseEstimator for CountingEstimator {
        fn estimate(&mut self, _frame: &Frame, options: &EstimateOptions) -> Vec<Keypoint> {
            assert_eq!(options.max_results, 1);
            self.calls += 1;
            vec![Keypoint {
                name: "nose".to_string(),
                x: self.calls as f64,
                y: 0.0,
                score: 0.9,
            }]
        }
    }

    #[derive(Default)]
    struct RecordingPoseSink {
        rendered: Vec<Vec<Keypoint>>,
    }

    impl PoseSink for RecordingPoseSink {
        fn render(&mut self, keypoints: &[Keypoint], _skeleton: &[crate::pose::SkeletonLine]) {
            self.rendered.push(keypoints.to_vec());
        }
    }

    #[derive(Default)]
    struct RecordingWindowSink {
        views: Vec<WindowView>,
    }

    impl WindowSink for RecordingWindowSink {
        fn update(&mut self, view: WindowView) {
            self.views.push(view);
        }
    }

    fn run_ticks<C: Clock>(
        tracker: &mut TrackingLoop<C>,
        media: &mut ScriptedMedia,
        estimator: &mut CountingEstimator,
        pose_sink: &mut RecordingPoseSink,
        window_sink: &mut RecordingWindowSink,
        sync: &StreamSynchronizer,
        ticks: usize,
    ) -> Vec<TickFlow> {
        (0..ticks)
            .map(|_| {
                let mut ctx = TickContext {
                    media: &mut *media,
                    estimator: &mut *estimator,
                    pose_sink: &mut *pose_sink,
                    window_sink: &mut *window_sink,
                    synchronizer: sync,
                };
                tracker.tick(&mut ctx)
            })
            .collect()
    }

    fn quiet_clock() -> MockClock {
        // A clock that never advances keeps the throttle to a single fire.
        MockClock::new(vec![Duration::from_millis(0)])
    }

    #[test]
    fn start_is_idempotent_and_stop_halts() {
        let mut tracker = TrackingLoop::with_clock(TrackingConfig::default(), quiet_clock());
        assert!(tracker.start());
        assert!(!tracker.start());
        assert!(tracker.is_running());

        tracker.stop();
        assert!(!tracker.is_running());

        let mut media = ScriptedMedia::ready_frames(3);
        let mut estimator = CountingEstimator::default();
        let mut pose_sink = RecordingPoseSink::default();
        let mut window_sink = RecordingWindowSink::default();
        let sync = StreamSynchronizer::new();

        let flows = run_ticks(
            &mut tracker,
            &mut media,
            &mut estimator,
            &mut pose_sink,
            &mut window_sink,
            &sync,
            1,
        );
        assert_eq!(flows, vec![TickFlow::Stop]);
        assert_eq!(estimator.calls, 0);
    }

    #[test]
    fn frame_skip_runs_inference_on_even_ticks_plus_first() {
        let mut tracker = TrackingLoop::with_clock(TrackingConfig::default(), quiet_clock());
        tracker.start();

        let mut media = ScriptedMedia::ready_frames(6);
        let mut estimator = CountingEstimator::default();
        let mut pose_sink = RecordingPoseSink::default();
        let mut window_sink = RecordingWindowSink::default();
        let sync = StreamSynchronizer::new();

        run_ticks(
            &mut tracker,
            &mut media,
            &mut estimator,
            &mut pose_sink,
            &mut window_sink,
            &sync,
            6,
        );

        // Ticks 1 (no prior result), 2, 4, 6.
        assert_eq!(estimator.calls, 4);
        assert_eq!(tracker.frame_index(), 6);
    }

    #[test]
    fn off_cadence_ticks_render_the_stale_result() {
        let mut tracker = TrackingLoop::with_clock(TrackingConfig::default(), quiet_clock());
        tracker.start();

        let mut media = ScriptedMedia::ready_frames(3);
        let mut estimator = CountingEstimator::default();
        let mut pose_sink = RecordingPoseSink::default();
        let mut window_sink = RecordingWindowSink::default();
        let sync = StreamSynchronizer::new();

        run_ticks(
            &mut tracker,
            &mut media,
            &mut estimator,
            &mut pose_sink,
            &mut window_sink,
            &sync,
            3,
        );

        // Tick 3 is off-cadence: it redraws exactly what tick 2 computed.
        assert_eq!(pose_sink.rendered.len(), 3);
        assert_eq!(pose_sink.rendered[2], pose_sink.rendered[1]);
        assert_ne!(pose_sink.rendered[1], pose_sink.rendered[0]);
    }

    #[test]
    fn every_tick_inference_with_skip_interval_one() {
        let config = TrackingConfig {
            skip_interval: 1,
            ..TrackingConfig::default()
        };
        let mut tracker = TrackingLoop::with_clock(config, quiet_clock());
        tracker.start();

        let mut media = ScriptedMedia::ready_frames(4);
        let mut estimator = CountingEstimator::default();
        let mut pose_sink = RecordingPoseSink::default();
        let mut window_sink = RecordingWindowSink::default();
        let sync = StreamSynchronizer::new();

        run_ticks(
            &mut tracker,
            &mut media,
            &mut estimator,
            &mut pose_sink,
            &mut window_sink,
            &sync,
            4,
        );
        assert_eq!(estimator.calls, 4);
    }

    #[test]
    fn pending_media_ticks_have_no_side_effects() {
        let mut tracker = TrackingLoop::with_clock(TrackingConfig::default(), quiet_clock());
        tracker.start();

        let mut media = ScriptedMedia { polls: Vec::new() };
        let mut estimator = CountingEstimator::default();
        let mut pose_sink = RecordingPoseSink::default();
        let mut window_sink = RecordingWindowSink::default();
        let sync = StreamSynchronizer::new();

        let flows = run_ticks(
            &mut tracker,
            &mut media,
            &mut estimator,
            &mut pose_sink,
            &mut window_sink,
            &sync,
            5,
        );

        assert!(flows.iter().all(|f| *f == TickFlow::Continue));
        assert_eq!(tracker.frame_index(), 0);
        assert_eq!(estimator.calls, 0);
        assert!(pose_sink.rendered.is_empty());
        assert!(window_sink.views.is_empty());
    }

    #[test]
    fn media_failure_stops_the_loop() {
        let mut tracker = TrackingLoop::with_clock(TrackingConfig::default(), quiet_clock());
        tracker.start();

        let mut media = ScriptedMedia {
            polls: vec![MediaPoll::Failed("decoder died".to_string())],
        };
        let mut estimator = CountingEstimator::default();
        let mut pose_sink = RecordingPoseSink::default();
        let mut window_sink = RecordingWindowSink::default();
        let sync = StreamSynchronizer::new();

        let flows = run_ticks(
            &mut tracker,
            &mut media,
            &mut estimator,
            &mut pose_sink,
            &mut window_sink,
            &sync,
            1,
        );
        assert_eq!(flows, vec![TickFlow::Stop]);
        assert!(!tracker.is_running());
    }

    #[test]
    fn window_updates_honor_the_wall_clock_throttle() {
        // Tick wall-clock times: 0, 10, 20, 40 ms. Only 0 and 40 may fire.
        let clock = MockClock::new(vec![
            Duration::from_millis(0),
            Duration::from_millis(10),
            Duration::from_millis(20),
            Duration::from_millis(40),
        ]);
        let mut tracker = TrackingLoop::with_clock(TrackingConfig::default(), clock);
        tracker.start();

        let mut media = ScriptedMedia::ready_frames(4);
        let mut estimator = CountingEstimator::default();
        let mut pose_sink = RecordingPoseSink::default();
        let mut window_sink = RecordingWindowSink::default();
        let sync = StreamSynchronizer::new();

        run_ticks(
            &mut tracker,
            &mut media,
            &mut estimator,
            &mut pose_sink,
            &mut window_sink,
            &sync,
            4,
        );

        assert_eq!(window_sink.views.len(), 2);
        // The second accepted update is for the fourth frame's time.
        assert!((window_sink.views[1].visible_end - (3.0 / 30.0 + 2.5)).abs() < 1e-9);
    }

    #[test]
    fn window_updates_apply_the_sync_offset() {
        let mut tracker = TrackingLoop::with_clock(TrackingConfig::default(), quiet_clock());
        tracker.start();

        let mut sync = StreamSynchronizer::new();
        sync.mark_video(10.0);
        sync.mark_data(5.8);
        sync.apply().unwrap();

        let mut media = ScriptedMedia {
            polls: vec![MediaPoll::Ready(test_frame(10.0))],
        };
        let mut estimator = CountingEstimator::default();
        let mut pose_sink = RecordingPoseSink::default();
        let mut window_sink = RecordingWindowSink::default();

        run_ticks(
            &mut tracker,
            &mut media,
            &mut estimator,
            &mut pose_sink,
            &mut window_sink,
            &sync,
            1,
        );

        let view = window_sink.views[0];
        assert_relative_eq!(view.visible_start, 3.3);
        assert_relative_eq!(view.visible_end, 8.3);
        assert_relative_eq!(view.marker_fraction, 0.5);
    }

    #[test]
    fn session_reset_only_while_stopped() {
        let mut tracker = TrackingLoop::with_clock(TrackingConfig::default(), quiet_clock());
        tracker.start();

        let mut media = ScriptedMedia::ready_frames(2);
        let mut estimator = CountingEstimator::default();
        let mut pose_sink = RecordingPoseSink::default();
        let mut window_sink = RecordingWindowSink::default();
        let sync = StreamSynchronizer::new();

        run_ticks(
            &mut tracker,
            &mut media,
            &mut estimator,
            &mut pose_sink,
            &mut window_sink,
            &sync,
            2,
        );

        assert!(!tracker.reset_session());
        assert_eq!(tracker.frame_index(), 2);

        tracker.stop();
        assert!(tracker.reset_session());
        assert_eq!(tracker.frame_index(), 0);
        assert!(tracker.last_keypoints().is_none());
    }

    #[test]
    fn passive_listener_shares_the_throttle_policy() {
        let clock = MockClock::new(vec![
            Duration::from_millis(0),
            Duration::from_millis(10),
            Duration::from_millis(20),
            Duration::from_millis(40),
        ]);
        let mut listener =
            PassiveTimeListener::with_clock(Duration::from_millis(33), 5.0, clock);
        let sync = StreamSynchronizer::new();
        let mut sink = RecordingWindowSink::default();

        for time in [1.0, 1.1, 1.2, 1.3] {
            listener.on_time_update(time, &sync, &mut sink);
        }

        assert_eq!(sink.views.len(), 2);
        assert!((sink.views[1].visible_end - (1.3 + 2.5)).abs() < 1e-9);
    }
}
