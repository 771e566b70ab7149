//! The animation driver: one explicit context object per run.
//!
//! Single-threaded and frame-driven. An external scheduler calls
//! [`AnimationRun::frame`] once per tick with the elapsed animation time; all
//! pixel evaluation for that frame completes synchronously before the call
//! returns. Cancellation is cooperative: the token is checked at the top of
//! each frame, and an in-flight frame always completes.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::{
    core::{Canvas, PixelBuffer},
    error::WeftResult,
    rasterize::rasterize_state,
    registry::AnimationSpec,
    sim::SimState,
    stream::StateStream,
};

/// Cheap clonable cancellation flag shared with whoever needs to stop the
/// run.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// External presentation boundary: receives one finished buffer per frame.
pub trait FrameSink {
    fn frame(&mut self, buffer: &PixelBuffer) -> WeftResult<()>;
}

impl<F> FrameSink for F
where
    F: FnMut(&PixelBuffer) -> WeftResult<()>,
{
    fn frame(&mut self, buffer: &PixelBuffer) -> WeftResult<()> {
        self(buffer)
    }
}

/// One animation run: the spec, the live state stream, the reseed
/// generation, and the cancellation token. Restarting after a parameter
/// change means building a new run; streams are never rewound.
pub struct AnimationRun {
    spec: AnimationSpec,
    canvas: Canvas,
    stream: StateStream<SimState>,
    generation: u64,
    cancel: CancelToken,
    frames_rendered: u64,
}

impl AnimationRun {
    pub fn new(spec: AnimationSpec, canvas: Canvas) -> Self {
        let stream = StateStream::new((spec.init)(0), spec.step.clone());
        Self {
            spec,
            canvas,
            stream,
            generation: 0,
            cancel: CancelToken::new(),
            frames_rendered: 0,
        }
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn current_step(&self) -> u64 {
        self.stream.last_index()
    }

    /// Renders the frame at `elapsed_secs` of animation time.
    ///
    /// Returns `Ok(None)` once the run is cancelled. Any error cancels the
    /// run; a corrupted frame is never delivered.
    #[tracing::instrument(skip(self), fields(animation = %self.spec.name))]
    pub fn frame(&mut self, elapsed_secs: f64) -> WeftResult<Option<PixelBuffer>> {
        if self.cancel.is_cancelled() {
            return Ok(None);
        }

        let step = self.stream.drive(elapsed_secs, self.spec.step_duration);
        self.apply_reseed_policy(step);

        // Capture the state once; every pixel of this frame sees it
        // immutably.
        let state = self.stream.current();
        let buffer = rasterize_state(&self.spec.shader, state, self.canvas);
        self.frames_rendered += 1;
        Ok(Some(buffer))
    }

    /// Rebuilds the stream from a fresh initial state whenever the step
    /// counter crosses the policy modulus. Policy lives here, above the
    /// stream abstraction; the stream itself never reseeds.
    fn apply_reseed_policy(&mut self, step: u64) {
        let Some(policy) = self.spec.reseed else {
            return;
        };
        let generation = step / policy.every.max(1);
        if generation != self.generation {
            tracing::debug!(animation = %self.spec.name, generation, "reseeding stream");
            self.stream =
                StateStream::starting_at((self.spec.init)(generation), self.spec.step.clone(), step);
            self.generation = generation;
        }
    }

    /// Pushes `frames` frames into `sink` at `frame_interval` seconds apart.
    /// Stops early on cancellation; returns the number of frames delivered.
    pub fn play(
        &mut self,
        sink: &mut dyn FrameSink,
        frames: u64,
        frame_interval: f64,
    ) -> WeftResult<u64> {
        let mut delivered = 0;
        for i in 0..frames {
            let elapsed = i as f64 * frame_interval;
            match self.frame(elapsed) {
                Ok(Some(buffer)) => {
                    sink.frame(&buffer)?;
                    delivered += 1;
                }
                Ok(None) => break,
                Err(err) => {
                    self.cancel.cancel();
                    return Err(err);
                }
            }
        }
        Ok(delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Rgba8;
    use crate::registry::{AnimationSpec, ReseedPolicy};
    use std::sync::atomic::AtomicUsize;

    fn counter_spec(
        step_calls: Arc<AtomicUsize>,
        init_calls: Arc<AtomicUsize>,
        reseed: Option<ReseedPolicy>,
    ) -> AnimationSpec {
        AnimationSpec {
            name: "test".to_string(),
            step_duration: 5.0,
            init: Arc::new(move |_generation| {
                init_calls.fetch_add(1, Ordering::SeqCst);
                SimState::Grid(crate::sim::CellGrid::new(2, 2))
            }),
            step: Arc::new(move |state| {
                step_calls.fetch_add(1, Ordering::SeqCst);
                state.clone()
            }),
            shader: Arc::new(|_, _, _| Rgba8::opaque(1, 2, 3)),
            reseed,
        }
    }

    #[test]
    fn frames_share_a_step_until_cadence_crosses() {
        let steps = Arc::new(AtomicUsize::new(0));
        let inits = Arc::new(AtomicUsize::new(0));
        let mut run = AnimationRun::new(
            counter_spec(steps.clone(), inits.clone(), None),
            Canvas::new(2, 2).unwrap(),
        );
        for elapsed in [0.0, 1.0, 2.0, 3.0, 4.0] {
            run.frame(elapsed).unwrap().unwrap();
        }
        assert_eq!(steps.load(Ordering::SeqCst), 0);
        run.frame(5.0).unwrap().unwrap();
        assert_eq!(steps.load(Ordering::SeqCst), 1);
        assert_eq!(run.frames_rendered(), 6);
    }

    #[test]
    fn first_callback_with_nan_elapsed_renders_step_zero() {
        let steps = Arc::new(AtomicUsize::new(0));
        let inits = Arc::new(AtomicUsize::new(0));
        let mut run = AnimationRun::new(
            counter_spec(steps.clone(), inits, None),
            Canvas::new(2, 2).unwrap(),
        );
        let buffer = run.frame(f64::NAN).unwrap().unwrap();
        assert_eq!(buffer.bytes().len(), 16);
        assert_eq!(run.current_step(), 0);
        assert_eq!(steps.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn cancellation_stops_subsequent_frames() {
        let steps = Arc::new(AtomicUsize::new(0));
        let inits = Arc::new(AtomicUsize::new(0));
        let mut run = AnimationRun::new(
            counter_spec(steps, inits, None),
            Canvas::new(2, 2).unwrap(),
        );
        assert!(run.frame(0.0).unwrap().is_some());
        run.cancel_token().cancel();
        assert!(run.frame(1.0).unwrap().is_none());
    }

    #[test]
    fn reseed_policy_rebuilds_the_stream_once_per_generation() {
        let steps = Arc::new(AtomicUsize::new(0));
        let inits = Arc::new(AtomicUsize::new(0));
        let mut run = AnimationRun::new(
            counter_spec(steps, inits.clone(), Some(ReseedPolicy { every: 2 })),
            Canvas::new(2, 2).unwrap(),
        );
        // Construction seeds generation 0.
        assert_eq!(inits.load(Ordering::SeqCst), 1);
        run.frame(0.0).unwrap(); // step 0
        run.frame(5.0).unwrap(); // step 1
        assert_eq!(inits.load(Ordering::SeqCst), 1);
        run.frame(10.0).unwrap(); // step 2 crosses the modulus
        assert_eq!(inits.load(Ordering::SeqCst), 2);
        run.frame(11.0).unwrap(); // still step 2, no rebuild
        assert_eq!(inits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn play_delivers_frames_until_cancelled() {
        let steps = Arc::new(AtomicUsize::new(0));
        let inits = Arc::new(AtomicUsize::new(0));
        let mut run = AnimationRun::new(
            counter_spec(steps, inits, None),
            Canvas::new(2, 2).unwrap(),
        );
        let token = run.cancel_token();
        let mut seen = 0;
        let mut sink = |_buffer: &PixelBuffer| -> WeftResult<()> {
            seen += 1;
            if seen == 3 {
                token.cancel();
            }
            Ok(())
        };
        let delivered = run.play(&mut sink, 10, 1.0).unwrap();
        assert_eq!(delivered, 3);
    }
}
