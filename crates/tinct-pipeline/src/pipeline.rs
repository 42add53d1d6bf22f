//! The stage chain and its invalidation/recompute protocol.
//!
//! Data flows strictly forward: source -> stage 1 -> stage 2 -> ...,
//! each stage reading its predecessor's published raster and producing
//! its own. Control flows the other way: editing a stage invalidates it
//! and everything after it, synchronously, before any recompute runs.
//!
//! Recomputation is cooperative and single-threaded. [`update`]
//! (and [`append`], [`set_source`], [`set_param`]) only *enqueue* work;
//! the owner pumps the queue with [`step`] or [`run_to_idle`]. A stage's
//! successor is scheduled only after the stage itself has published, so
//! the cascade resolves front to back, one stage at a time, and every
//! recompute reads the freshest predecessor raster in existence at the
//! moment it runs.
//!
//! Tasks scheduled before a newer invalidation are superseded rather
//! than run: each invalidation bumps the stage's epoch, and a task whose
//! epoch no longer matches is dropped when it reaches the front of the
//! queue. A pending recompute therefore can never resurrect a stale
//! `Valid` state.
//!
//! [`update`]: Pipeline::update
//! [`append`]: Pipeline::append
//! [`set_source`]: Pipeline::set_source
//! [`set_param`]: Pipeline::set_param
//! [`step`]: Pipeline::step
//! [`run_to_idle`]: Pipeline::run_to_idle

use std::collections::VecDeque;

use crate::diagnostics::{ChainDiagnostics, Clock, StageRun, SystemClock};
use crate::filter::Filter;
use crate::noise::{BoxMullerNoise, NoiseSource};
use crate::raster::Raster;
use crate::stage::Stage;
use crate::types::PipelineError;

/// A recompute task waiting in the queue.
///
/// The epoch pins the invalidation the task was scheduled for; if the
/// stage is invalidated again before the task runs, the epochs diverge
/// and the task is dropped instead of publishing against stale state.
#[derive(Debug, Clone, Copy)]
struct RecomputeTask {
    stage: usize,
    epoch: u64,
}

/// An ordered chain of filter stages rooted at a source image.
#[derive(Debug)]
pub struct Pipeline {
    /// The chain. Index 0 is always the source stage.
    stages: Vec<Stage>,
    /// Pending recompute tasks, executed FIFO by [`step`](Self::step).
    queue: VecDeque<RecomputeTask>,
    /// Noise source consulted by grain filters.
    noise: Box<dyn NoiseSource>,
    /// Log of recomputes actually executed.
    diagnostics: ChainDiagnostics,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    /// An empty pipeline: a source stage with no image and no filters,
    /// using an entropy-seeded noise source for grain.
    #[must_use]
    pub fn new() -> Self {
        Self::with_noise(Box::new(BoxMullerNoise::from_entropy()))
    }

    /// An empty pipeline with an injected noise source.
    #[must_use]
    pub fn with_noise(noise: Box<dyn NoiseSource>) -> Self {
        Self {
            stages: vec![Stage::source()],
            queue: VecDeque::new(),
            noise,
            diagnostics: ChainDiagnostics::default(),
        }
    }

    /// Number of stages, including the source stage.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the chain holds no transform stages yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.len() == 1
    }

    /// The stage at `index`, if it exists.
    #[must_use]
    pub fn stage(&self, index: usize) -> Option<&Stage> {
        self.stages.get(index)
    }

    /// The filter of the stage at `index`; `None` for the source stage
    /// or an out-of-range index.
    #[must_use]
    pub fn filter(&self, index: usize) -> Option<&Filter> {
        self.stages.get(index).and_then(Stage::filter)
    }

    /// Mutable access to the filter of the stage at `index`.
    ///
    /// Editing a parameter through this does not recompute anything;
    /// call [`update`](Self::update) on the same index afterwards, or
    /// use [`set_param`](Self::set_param) which does both.
    pub fn filter_mut(&mut self, index: usize) -> Option<&mut Filter> {
        self.stages.get_mut(index).and_then(Stage::filter_mut)
    }

    /// Whether recompute tasks are waiting to be pumped.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Supply (or replace) the source image.
    ///
    /// The source stage publishes the raster immediately -- it is
    /// externally computed, so there is nothing to defer -- and the rest
    /// of the chain is invalidated and scheduled for recompute.
    pub fn set_source(&mut self, raster: Raster) {
        self.stages[0].publish(raster);
        if self.stages.len() > 1 {
            self.invalidate_from(1);
            self.schedule(1);
        }
    }

    /// Append a transform stage at the tail and schedule its recompute,
    /// so a newly appended stage computes against the current upstream
    /// state. Returns the new stage's index.
    pub fn append(&mut self, filter: Filter) -> usize {
        self.stages.push(Stage::transform(filter));
        let index = self.stages.len() - 1;
        self.invalidate_from(index);
        self.schedule(index);
        index
    }

    /// Mark stages `index..` stale, synchronously, without scheduling
    /// anything. Flag flips only.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::StageOutOfRange`] if `index` is past the
    /// tail.
    pub fn invalidate(&mut self, index: usize) -> Result<(), PipelineError> {
        self.check_index(index)?;
        self.invalidate_from(index);
        Ok(())
    }

    /// Invalidate stages `index..` and schedule recomputation starting
    /// at `index`. The cascade continues forward on its own as the
    /// queue is pumped.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::StageOutOfRange`] if `index` is past the
    /// tail.
    pub fn update(&mut self, index: usize) -> Result<(), PipelineError> {
        self.check_index(index)?;
        self.invalidate_from(index);
        self.schedule(index);
        Ok(())
    }

    /// Set one filter parameter and update the owning stage -- the
    /// whole edit protocol of a parameter control in one call.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::StageOutOfRange`] for an index past the
    /// tail, [`PipelineError::NotATransform`] when `index` addresses the
    /// source stage, and [`PipelineError::UnknownParameter`] for a name
    /// the filter does not expose.
    pub fn set_param(&mut self, index: usize, name: &str, value: f64) -> Result<(), PipelineError> {
        self.check_index(index)?;
        let filter = self
            .stages
            .get_mut(index)
            .and_then(Stage::filter_mut)
            .ok_or(PipelineError::NotATransform { index })?;
        filter.set_param(name, value)?;
        self.invalidate_from(index);
        self.schedule(index);
        Ok(())
    }

    /// The tail stage's raster, or `None` while the tail is invalid or
    /// has not produced output yet. Consumers must treat `None` as
    /// "nothing to show", not as an error.
    #[must_use]
    pub fn final_raster(&self) -> Option<&Raster> {
        let tail = self.stages.last()?;
        if tail.is_valid() { tail.output() } else { None }
    }

    /// Recompute log accumulated by [`step`](Self::step).
    #[must_use]
    pub const fn diagnostics(&self) -> &ChainDiagnostics {
        &self.diagnostics
    }

    /// Drain the recompute log.
    pub fn take_diagnostics(&mut self) -> Vec<StageRun> {
        self.diagnostics.take()
    }

    /// Run at most one pending task with the default clock.
    ///
    /// Returns `false` when the queue is empty. A dequeued task that
    /// turns out to be superseded or to have no valid upstream still
    /// counts as a step (it was scheduled work), but records nothing.
    pub fn step(&mut self) -> bool {
        self.step_with(&SystemClock)
    }

    /// Run at most one pending task, timing it with `clock`.
    pub fn step_with(&mut self, clock: &impl Clock) -> bool {
        let Some(task) = self.queue.pop_front() else {
            return false;
        };
        self.run_task(task, clock);
        true
    }

    /// Pump the queue until no tasks remain.
    pub fn run_to_idle(&mut self) {
        self.run_to_idle_with(&SystemClock);
    }

    /// Pump the queue until no tasks remain, timing with `clock`.
    pub fn run_to_idle_with(&mut self, clock: &impl Clock) {
        while self.step_with(clock) {}
    }

    fn check_index(&self, index: usize) -> Result<(), PipelineError> {
        if index < self.stages.len() {
            Ok(())
        } else {
            Err(PipelineError::StageOutOfRange {
                index,
                len: self.stages.len(),
            })
        }
    }

    /// Flag-flip stages `index..` stale. Private, infallible half of
    /// [`invalidate`](Self::invalidate).
    fn invalidate_from(&mut self, index: usize) {
        for stage in self.stages.iter_mut().skip(index) {
            stage.invalidate();
        }
    }

    /// Enqueue a recompute for `index` pinned to its current epoch.
    fn schedule(&mut self, index: usize) {
        let epoch = self.stages[index].epoch();
        self.queue.push_back(RecomputeTask {
            stage: index,
            epoch,
        });
    }

    /// Invalidate and schedule the successor of a stage that just
    /// published -- the forward leg of the cascade.
    fn schedule_successor(&mut self, index: usize) {
        let next = index + 1;
        if next < self.stages.len() {
            self.invalidate_from(next);
            self.schedule(next);
        }
    }

    fn run_task(&mut self, task: RecomputeTask, clock: &impl Clock) {
        let Some(stage) = self.stages.get(task.stage) else {
            return;
        };
        // Superseded by a newer invalidation: drop without running.
        if stage.epoch() != task.epoch {
            return;
        }

        // The source stage never computes; it republishes the image it
        // holds, or does nothing if none has been supplied yet.
        if stage.is_source() {
            if stage.output().is_some() {
                self.stages[task.stage].revalidate();
                self.schedule_successor(task.stage);
            }
            return;
        }

        // A transform needs a valid predecessor raster to read. Without
        // one this is a benign no-op: the chain has nothing to show yet,
        // and the predecessor's own recompute will reschedule us.
        let predecessor = &self.stages[task.stage - 1];
        if !predecessor.is_valid() {
            return;
        }
        let Some(input) = predecessor.output() else {
            return;
        };
        let Some(filter) = self.stages[task.stage].filter() else {
            return;
        };

        let start = clock.now();
        let noise = self.noise.as_mut();
        let output = input.map(|color| filter.apply(color, noise));
        let duration = clock.elapsed(&start);

        self.diagnostics.record(StageRun {
            stage: task.stage,
            filter: filter.label(),
            dimensions: output.dimensions(),
            pixel_count: output.dimensions().pixel_count(),
            duration,
        });

        self.stages[task.stage].publish(output);
        self.schedule_successor(task.stage);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::filter::FilterKind;
    use crate::noise::FixedNoise;
    use crate::stage::Validity;

    fn single_pixel(red: f64, green: f64, blue: f64) -> Raster {
        Raster::from_pixel(1, 1, Color::opaque(red, green, blue))
    }

    fn quiet_pipeline() -> Pipeline {
        Pipeline::with_noise(Box::new(FixedNoise(0.0)))
    }

    fn final_pixel(pipeline: &Pipeline) -> Color {
        pipeline.final_raster().unwrap().pixel(0, 0)
    }

    #[test]
    fn new_pipeline_has_only_the_source_stage() {
        let pipeline = Pipeline::new();
        assert_eq!(pipeline.len(), 1);
        assert!(pipeline.is_empty());
        assert!(pipeline.final_raster().is_none());
        assert!(!pipeline.has_pending());
    }

    #[test]
    fn appending_without_a_source_image_stays_invalid() {
        let mut pipeline = quiet_pipeline();
        let index = pipeline.append(Filter::Grayscale);
        pipeline.run_to_idle();
        assert_eq!(pipeline.stage(index).unwrap().validity(), Validity::Invalid);
        assert!(pipeline.final_raster().is_none());
    }

    #[test]
    fn source_image_alone_is_the_final_raster() {
        let mut pipeline = quiet_pipeline();
        pipeline.set_source(single_pixel(9.0, 9.0, 9.0));
        pipeline.run_to_idle();
        assert_eq!(final_pixel(&pipeline), Color::opaque(9.0, 9.0, 9.0));
    }

    #[test]
    fn grayscale_then_invert_worked_example() {
        let mut pipeline = quiet_pipeline();
        pipeline.set_source(single_pixel(200.0, 100.0, 50.0));

        pipeline.append(Filter::Grayscale);
        pipeline.run_to_idle();
        let gray = final_pixel(&pipeline);
        assert!((gray.red - 117.65).abs() < 1e-9);
        assert!((gray.green - 117.65).abs() < 1e-9);
        assert!((gray.blue - 117.65).abs() < 1e-9);

        pipeline.append(Filter::Invert);
        pipeline.run_to_idle();
        let inverted = final_pixel(&pipeline);
        assert!((inverted.red - 137.35).abs() < 1e-9);
        assert!((inverted.green - 137.35).abs() < 1e-9);
        assert!((inverted.blue - 137.35).abs() < 1e-9);
        assert!((inverted.alpha - 255.0).abs() < 1e-9);
    }

    #[test]
    fn appending_computes_against_the_current_upstream_state() {
        let mut pipeline = quiet_pipeline();
        pipeline.set_source(single_pixel(10.0, 10.0, 10.0));
        pipeline.append(Filter::Brightness { intensity: 20.0 });
        pipeline.run_to_idle();
        assert_eq!(final_pixel(&pipeline), Color::opaque(30.0, 30.0, 30.0));
    }

    #[test]
    fn update_invalidates_the_suffix_synchronously() {
        let mut pipeline = quiet_pipeline();
        pipeline.set_source(single_pixel(10.0, 10.0, 10.0));
        let first = pipeline.append(Filter::Brightness { intensity: 1.0 });
        let second = pipeline.append(Filter::Brightness { intensity: 2.0 });
        let third = pipeline.append(Filter::Brightness { intensity: 4.0 });
        pipeline.run_to_idle();

        // Edit the middle stage: before any recompute runs, the edited
        // stage and everything after it flash invalid while the prefix
        // stays valid.
        pipeline.set_param(second, "intensity", 3.0).unwrap();
        assert!(pipeline.stage(0).unwrap().is_valid());
        assert!(pipeline.stage(first).unwrap().is_valid());
        assert!(!pipeline.stage(second).unwrap().is_valid());
        assert!(!pipeline.stage(third).unwrap().is_valid());

        pipeline.run_to_idle();
        assert_eq!(final_pixel(&pipeline), Color::opaque(18.0, 18.0, 18.0));
    }

    #[test]
    fn cascade_resolves_front_to_back_one_stage_per_step() {
        let mut pipeline = quiet_pipeline();
        pipeline.set_source(single_pixel(0.0, 0.0, 0.0));
        let first = pipeline.append(Filter::Brightness { intensity: 1.0 });
        let second = pipeline.append(Filter::Brightness { intensity: 1.0 });
        pipeline.run_to_idle();

        pipeline.update(first).unwrap();
        assert!(!pipeline.stage(first).unwrap().is_valid());
        assert!(!pipeline.stage(second).unwrap().is_valid());

        // First step revalidates only the edited stage.
        assert!(pipeline.step());
        assert!(pipeline.stage(first).unwrap().is_valid());
        assert!(!pipeline.stage(second).unwrap().is_valid());

        // Second step carries the cascade to the tail.
        assert!(pipeline.step());
        assert!(pipeline.stage(second).unwrap().is_valid());
        assert!(!pipeline.step());
    }

    #[test]
    fn successor_reads_the_freshly_published_predecessor_raster() {
        let mut pipeline = quiet_pipeline();
        pipeline.set_source(single_pixel(100.0, 100.0, 100.0));
        let first = pipeline.append(Filter::Brightness { intensity: 10.0 });
        pipeline.append(Filter::Brightness { intensity: 5.0 });
        pipeline.run_to_idle();
        assert_eq!(final_pixel(&pipeline), Color::opaque(115.0, 115.0, 115.0));

        // After an upstream edit, the tail must see the *new* stage-1
        // output, never the raster it read last time.
        pipeline.set_param(first, "intensity", 20.0).unwrap();
        pipeline.run_to_idle();
        assert_eq!(final_pixel(&pipeline), Color::opaque(125.0, 125.0, 125.0));
    }

    #[test]
    fn pending_recompute_is_superseded_by_a_newer_edit() {
        let mut pipeline = quiet_pipeline();
        pipeline.set_source(single_pixel(100.0, 100.0, 100.0));
        let stage = pipeline.append(Filter::Brightness { intensity: 0.0 });
        pipeline.run_to_idle();
        pipeline.take_diagnostics();

        // Two edits land before the queue is pumped. The first edit's
        // task is stale by the time it reaches the front and must not
        // run; only the second edit's recompute executes.
        pipeline.set_param(stage, "intensity", 10.0).unwrap();
        pipeline.set_param(stage, "intensity", 30.0).unwrap();
        pipeline.run_to_idle();

        assert_eq!(final_pixel(&pipeline), Color::opaque(130.0, 130.0, 130.0));
        assert_eq!(pipeline.diagnostics().runs().len(), 1);
    }

    #[test]
    fn replacing_the_source_recomputes_the_whole_chain() {
        let mut pipeline = quiet_pipeline();
        pipeline.set_source(single_pixel(10.0, 10.0, 10.0));
        pipeline.append(Filter::Brightness { intensity: 5.0 });
        pipeline.run_to_idle();
        assert_eq!(final_pixel(&pipeline), Color::opaque(15.0, 15.0, 15.0));

        pipeline.set_source(single_pixel(40.0, 40.0, 40.0));
        assert!(pipeline.final_raster().is_none());
        pipeline.run_to_idle();
        assert_eq!(final_pixel(&pipeline), Color::opaque(45.0, 45.0, 45.0));
    }

    #[test]
    fn updating_the_source_republishes_and_cascades() {
        let mut pipeline = quiet_pipeline();
        pipeline.set_source(single_pixel(1.0, 2.0, 3.0));
        pipeline.append(Filter::Invert);
        pipeline.run_to_idle();
        pipeline.take_diagnostics();

        pipeline.update(0).unwrap();
        assert!(pipeline.final_raster().is_none());
        pipeline.run_to_idle();
        assert_eq!(final_pixel(&pipeline), Color::opaque(254.0, 253.0, 252.0));
        // Only the transform recomputed; the source republishes without
        // a run of its own.
        assert_eq!(pipeline.diagnostics().runs().len(), 1);
    }

    #[test]
    fn update_past_the_tail_errors() {
        let mut pipeline = quiet_pipeline();
        let err = pipeline.update(3).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::StageOutOfRange { index: 3, len: 1 },
        ));
    }

    #[test]
    fn set_param_on_the_source_stage_errors() {
        let mut pipeline = quiet_pipeline();
        let err = pipeline.set_param(0, "intensity", 1.0).unwrap_err();
        assert!(matches!(err, PipelineError::NotATransform { index: 0 }));
    }

    #[test]
    fn set_param_with_an_unknown_name_schedules_nothing() {
        let mut pipeline = quiet_pipeline();
        pipeline.set_source(single_pixel(1.0, 1.0, 1.0));
        let stage = pipeline.append(Filter::Grayscale);
        pipeline.run_to_idle();

        let err = pipeline.set_param(stage, "intensity", 1.0).unwrap_err();
        assert!(matches!(err, PipelineError::UnknownParameter { .. }));
        assert!(!pipeline.has_pending());
        assert!(pipeline.stage(stage).unwrap().is_valid());
    }

    #[test]
    fn filter_mut_edit_becomes_visible_after_update() {
        let mut pipeline = quiet_pipeline();
        pipeline.set_source(single_pixel(100.0, 100.0, 100.0));
        let stage = pipeline.append(Filter::Brightness { intensity: 0.0 });
        pipeline.run_to_idle();

        // Mutating the filter alone recomputes nothing.
        *pipeline.filter_mut(stage).unwrap() = Filter::Brightness { intensity: 50.0 };
        assert_eq!(final_pixel(&pipeline), Color::opaque(100.0, 100.0, 100.0));
        assert!(!pipeline.has_pending());

        pipeline.update(stage).unwrap();
        pipeline.run_to_idle();
        assert_eq!(final_pixel(&pipeline), Color::opaque(150.0, 150.0, 150.0));
    }

    #[test]
    fn grain_uses_the_injected_noise_source() {
        let mut pipeline = Pipeline::with_noise(Box::new(FixedNoise(1.0)));
        pipeline.set_source(single_pixel(100.0, 100.0, 100.0));
        pipeline.append(Filter::Grain { intensity: 0.05 });
        pipeline.run_to_idle();
        // modifier = 1.0 · 64 · 0.05 = 3.2 on every channel.
        let pixel = final_pixel(&pipeline);
        assert!((pixel.red - 103.2).abs() < 1e-9);
        assert!((pixel.green - 103.2).abs() < 1e-9);
        assert!((pixel.blue - 103.2).abs() < 1e-9);
    }

    #[test]
    fn alpha_survives_a_full_chain() {
        let mut pipeline = quiet_pipeline();
        pipeline.set_source(Raster::from_pixel(
            1,
            1,
            Color::new(200.0, 100.0, 50.0, 77.0),
        ));
        for kind in FilterKind::ALL {
            pipeline.append(Filter::new(kind));
        }
        pipeline.run_to_idle();
        assert!((final_pixel(&pipeline).alpha - 77.0).abs() < 1e-9);
    }

    #[test]
    fn diagnostics_record_one_run_per_recompute() {
        let mut pipeline = quiet_pipeline();
        pipeline.set_source(Raster::from_pixel(4, 2, Color::opaque(0.0, 0.0, 0.0)));
        pipeline.append(Filter::Grayscale);
        pipeline.append(Filter::Invert);
        pipeline.run_to_idle();

        let runs = pipeline.take_diagnostics();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].stage, 1);
        assert_eq!(runs[0].filter, "Grayscale");
        assert_eq!(runs[1].stage, 2);
        assert_eq!(runs[1].filter, "Invert");
        assert!(runs.iter().all(|run| run.pixel_count == 8));
    }
}
