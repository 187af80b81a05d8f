//! Clocked execution of the five-stage pipeline
//!
//! [`PipelineEngine::tick`] evaluates one clock cycle with register
//! semantics: every stage reads configuration, request flags and channel
//! state as they stood at the start of the cycle, and every write (the two
//! state commit points, clear forcing, request retirement and the
//! configuration bus) lands at the end of it. Nothing written on a cycle is
//! visible to any stage on that same cycle.
//!
//! There is no interlock between events of the same channel.
//! `last_output` is read at Cross-Sum and written at Writeback, so two events
//! for one channel admitted fewer than three cycles apart both integrate onto
//! the same committed output. Likewise a channel referencing another through
//! `add_channel` sees that channel's scaled delta one cycle after Cross-Sum
//! commits it.
//!
//! # RT Safety
//!
//! - No heap allocations in `tick`
//! - O(N) per cycle, only for clear forcing and the injection scan

use tracing::{debug, trace, warn};

use crate::engine::PipelineEngine;
use crate::stages::{
    BoundLatch, FetchLatch, ScaleLatch, Slot, SumLatch, bound_integrate, cross_sum, scale_delta,
};
use crate::stats::EngineStats;
use crate::types::{ConfigAddress, ConfigWrite, CycleInput, OutputEvent, Sample};

impl PipelineEngine {
    /// Advance the pipeline by one clock cycle.
    ///
    /// Returns the output port for this cycle; `valid` is false when the
    /// Writeback stage held no event or its event was flushed.
    ///
    /// # Example
    ///
    /// ```
    /// use openservo_output_filter::prelude::*;
    ///
    /// let mut engine = PipelineEngine::new(2)?;
    /// engine.write(ConfigWrite::new(ConfigAddress::Max, 1, 1_000));
    /// engine.write(ConfigWrite::new(ConfigAddress::Scale, 1, 3));
    ///
    /// let first = engine.tick(CycleInput::sample(Sample::new(1, 7)));
    /// assert!(!first.valid);
    ///
    /// let mut out = first;
    /// for _ in 1..PIPELINE_DEPTH {
    ///     out = engine.idle();
    /// }
    /// assert!(out.valid);
    /// assert_eq!((out.channel, out.output), (1, 21));
    /// # Ok::<(), FilterError>(())
    /// ```
    pub fn tick(&mut self, input: CycleInput) -> OutputEvent {
        let reset = input.reset;

        // Stage 1: Fetch
        let (mut next_fetched, serviced_inject) = self.fetch(input.sample);

        let requests = &self.requests;
        let flush = |channel: usize| reset || requests.is_clear(channel);
        let mut flushed = u64::from(next_fetched.flush_if(flush));

        // Stage 2: Scale
        let mut scale = self.fetched;
        flushed += u64::from(scale.flush_if(flush));
        let next_scaled = scale.map(|latch| {
            let add_value = usize::try_from(latch.add_channel)
                .ok()
                .filter(|&source| source < self.channels)
                .map_or(0, |source| self.state.last_scaled_delta(source));
            ScaleLatch {
                channel: latch.channel,
                scaled: scale_delta(latch.delta, latch.scale, latch.shift),
                add_value,
            }
        });

        // Stage 3: Cross-Sum
        let mut cross = self.scaled;
        flushed += u64::from(cross.flush_if(flush));
        let scaled_commit = cross.payload().map(|latch| (latch.channel, latch.scaled));
        let next_summed = cross.map(|latch| {
            let config = self.config.read(latch.channel).unwrap_or_default();
            SumLatch {
                channel: latch.channel,
                sum: cross_sum(latch.scaled, latch.add_value),
                last_output: self.state.last_output(latch.channel),
                min: config.min,
                max: config.max,
            }
        });

        // Stage 4: Bound-Integrate
        let mut integrate = self.summed;
        flushed += u64::from(integrate.flush_if(flush));
        let next_bounded = integrate.map(|latch| {
            let bounded = bound_integrate(latch.sum, latch.last_output, latch.min, latch.max);
            BoundLatch {
                channel: latch.channel,
                output: bounded.output,
                saturated: bounded.saturated,
                init: self.config.read(latch.channel).map_or(0, |c| c.init),
            }
        });

        // Stage 5: Inject & Writeback
        let mut writeback = self.bounded;
        flushed += u64::from(writeback.flush_if(flush));
        let is_injection = writeback.is_injection();
        let (emitted, saturated) = match writeback.payload() {
            Some(latch) => {
                let output = if is_injection { latch.init } else { latch.output };
                let event = OutputEvent {
                    channel: latch.channel,
                    output,
                    valid: true,
                };
                (event, latch.saturated && !is_injection)
            }
            None => (OutputEvent::invalid(), false),
        };

        self.commit(scaled_commit, emitted);
        self.retire_requests(serviced_inject, &input);

        self.fetched = next_fetched;
        self.scaled = next_scaled;
        self.summed = next_summed;
        self.bounded = next_bounded;
        self.cycle = self.cycle.saturating_add(1);

        self.stats.cycles = self.cycle;
        self.stats.events_flushed = self.stats.events_flushed.saturating_add(flushed);
        if flushed > 0 {
            debug!(cycle = self.cycle, flushed, reset, "in-flight events flushed");
        }
        if emitted.valid {
            EngineStats::bump(&mut self.stats.events_emitted);
            if saturated {
                EngineStats::bump(&mut self.stats.saturations);
            }
            trace!(
                cycle = self.cycle,
                channel = emitted.channel,
                output = emitted.output,
                injection = is_injection,
                "output emitted"
            );
        }

        emitted
    }

    /// Fetch stage admission: a sample if present, otherwise the
    /// lowest-indexed pending injection.
    fn fetch(&mut self, sample: Option<Sample>) -> (Slot<FetchLatch>, Option<usize>) {
        if let Some(sample) = sample {
            let Some(config) = self.config.read(sample.channel) else {
                EngineStats::bump(&mut self.stats.samples_rejected);
                warn!(
                    channel = sample.channel,
                    channels = self.channels,
                    "sample for unknown channel rejected"
                );
                return (Slot::Empty, None);
            };
            EngineStats::bump(&mut self.stats.samples_admitted);
            let latch = FetchLatch {
                channel: sample.channel,
                delta: sample.delta,
                scale: config.scale,
                shift: config.shift,
                add_channel: config.add_channel,
            };
            return (Slot::Sample(latch), None);
        }

        let Some(channel) = self.requests.lowest_pending_inject() else {
            return (Slot::Empty, None);
        };
        let config = self.config.read(channel).unwrap_or_default();
        EngineStats::bump(&mut self.stats.injections_admitted);
        let latch = FetchLatch {
            channel,
            delta: 0,
            scale: config.scale,
            shift: config.shift,
            add_channel: config.add_channel,
        };
        (Slot::Injection(latch), Some(channel))
    }

    /// End-of-cycle state commits: Cross-Sum and Writeback, then the clear
    /// forcing of every channel whose pulse is visible.
    fn commit(&mut self, scaled: Option<(usize, i64)>, emitted: OutputEvent) {
        if let Some((channel, value)) = scaled {
            self.state.commit_scaled_delta(channel, value);
        }
        if emitted.valid {
            self.state.commit_output(emitted.channel, emitted.output);
        }

        if !self.requests.any_clear() {
            return;
        }
        for channel in self.requests.active_clears() {
            let init = self.config.read(channel).map_or(0, |c| c.init);
            self.state.commit_scaled_delta(channel, 0);
            self.state.commit_output(channel, init);
        }
    }

    /// Retire this cycle's requests, then apply reset or the presented write.
    fn retire_requests(&mut self, serviced_inject: Option<usize>, input: &CycleInput) {
        self.requests.retire_cycle(serviced_inject);

        if let Some(write) = input.write {
            EngineStats::bump(&mut self.stats.config_writes);
            self.apply_write(write, input.reset);
        }

        if input.reset {
            EngineStats::bump(&mut self.stats.resets);
            self.requests.assert_reset();
            debug!(cycle = self.cycle, "synchronous reset asserted");
        }
    }

    fn apply_write(&mut self, write: ConfigWrite, reset: bool) {
        match write.address {
            ConfigAddress::ClearRequest if reset => {}
            ConfigAddress::InjectRequest if reset => {}
            ConfigAddress::ClearRequest => {
                if write.value != 0 {
                    self.requests.request_clear(write.channel);
                }
            }
            ConfigAddress::InjectRequest => {
                if write.value != 0 {
                    self.requests.request_inject(write.channel);
                } else {
                    self.requests.cancel_inject(write.channel);
                }
            }
            address => self.config.write(write.channel, address, write.value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PIPELINE_DEPTH;
    use crate::error::Result;

    fn engine_with_bounds(channels: usize, min: i64, max: i64) -> Result<PipelineEngine> {
        let mut engine = PipelineEngine::new(channels)?;
        for channel in 0..channels {
            engine.write(ConfigWrite::new(ConfigAddress::Min, channel, min));
            engine.write(ConfigWrite::new(ConfigAddress::Max, channel, max));
            engine.write(ConfigWrite::new(ConfigAddress::Scale, channel, 1));
        }
        Ok(engine)
    }

    #[test]
    fn test_latency_is_pipeline_depth() -> Result<()> {
        let mut engine = engine_with_bounds(1, -1000, 1000)?;
        let mut outputs = vec![engine.push_sample(0, 9)];
        for _ in 1..PIPELINE_DEPTH {
            outputs.push(engine.idle());
        }

        let valid: Vec<usize> = outputs
            .iter()
            .enumerate()
            .filter_map(|(i, out)| out.valid.then_some(i))
            .collect();
        assert_eq!(valid, vec![PIPELINE_DEPTH - 1]);
        assert_eq!(outputs.last().map(|o| o.output), Some(9));
        Ok(())
    }

    #[test]
    fn test_one_event_per_cycle_in_order() -> Result<()> {
        let mut engine = engine_with_bounds(4, -1000, 1000)?;
        for channel in 0..4 {
            engine.push_sample(channel, 1);
        }
        let emitted = engine.drain();
        let channels: Vec<usize> = emitted.iter().map(|e| e.channel).collect();
        assert_eq!(channels, vec![0, 1, 2, 3]);
        Ok(())
    }

    #[test]
    fn test_sample_preempts_injection() -> Result<()> {
        let mut engine = engine_with_bounds(2, -1000, 1000)?;
        engine.write(ConfigWrite::inject(1));
        engine.push_sample(0, 4);
        assert_eq!(engine.pending_injections(), vec![1]);

        let emitted = engine.drain();
        assert_eq!(emitted.len(), 2);
        assert_eq!(emitted.first().map(|e| e.channel), Some(0));
        assert_eq!(emitted.get(1).map(|e| e.channel), Some(1));
        Ok(())
    }

    #[test]
    fn test_injection_emits_init() -> Result<()> {
        let mut engine = engine_with_bounds(1, -1000, 1000)?;
        engine.write(ConfigWrite::new(ConfigAddress::Init, 0, 250));
        engine.push_sample(0, 5);
        engine.drain();
        assert_eq!(engine.channel_state(0).map(|s| s.last_output), Some(5));

        engine.write(ConfigWrite::inject(0));
        let emitted = engine.drain();
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted.first().map(|e| e.output), Some(250));
        assert_eq!(engine.channel_state(0).map(|s| s.last_output), Some(250));
        assert_eq!(engine.stats().injections_admitted, 1);
        Ok(())
    }

    #[test]
    fn test_injection_commits_zero_scaled_delta() -> Result<()> {
        let mut engine = engine_with_bounds(1, -1000, 1000)?;
        engine.push_sample(0, 6);
        engine.drain();
        assert_eq!(engine.channel_state(0).map(|s| s.last_scaled_delta), Some(6));

        engine.write(ConfigWrite::inject(0));
        engine.drain();
        assert_eq!(engine.channel_state(0).map(|s| s.last_scaled_delta), Some(0));
        Ok(())
    }

    #[test]
    fn test_cancel_inject_write() -> Result<()> {
        let mut engine = engine_with_bounds(2, -1000, 1000)?;
        engine.tick(CycleInput {
            sample: Some(Sample::new(0, 1)),
            write: Some(ConfigWrite::inject(1)),
            reset: false,
        });
        assert_eq!(engine.pending_injections(), vec![1]);
        engine.tick(CycleInput {
            sample: Some(Sample::new(0, 1)),
            write: Some(ConfigWrite::cancel_inject(1)),
            reset: false,
        });
        assert!(engine.pending_injections().is_empty());

        let emitted = engine.drain();
        assert!(emitted.iter().all(|e| e.channel == 0));
        Ok(())
    }

    #[test]
    fn test_clear_flushes_every_stage_of_its_channel() -> Result<()> {
        let mut engine = engine_with_bounds(2, -1000, 1000)?;
        engine.push_sample(0, 1);
        engine.push_sample(1, 1);
        engine.push_sample(0, 1);
        engine.tick(CycleInput {
            sample: Some(Sample::new(0, 1)),
            write: Some(ConfigWrite::clear(0)),
            reset: false,
        });

        let emitted = engine.drain();
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted.first().map(|e| e.channel), Some(1));
        assert_eq!(engine.stats().events_flushed, 3);
        assert_eq!(engine.channel_state(0), Some(Default::default()));
        Ok(())
    }

    #[test]
    fn test_clear_pulse_lasts_one_cycle() -> Result<()> {
        let mut engine = engine_with_bounds(1, -1000, 1000)?;
        engine.write(ConfigWrite::clear(0));
        assert!(engine.requests().is_clear(0));
        engine.push_sample(0, 3);
        assert!(!engine.requests().is_clear(0));
        assert_eq!(engine.occupancy(), 0);

        engine.push_sample(0, 3);
        let emitted = engine.drain();
        assert_eq!(emitted.len(), 1);
        Ok(())
    }

    #[test]
    fn test_write_wins_over_self_clear() -> Result<()> {
        let mut engine = engine_with_bounds(1, -1000, 1000)?;
        engine.write(ConfigWrite::clear(0));
        engine.write(ConfigWrite::clear(0));
        assert!(engine.requests().is_clear(0));
        Ok(())
    }

    #[test]
    fn test_reset_flushes_and_reinitializes() -> Result<()> {
        let mut engine = engine_with_bounds(2, -1000, 1000)?;
        engine.write(ConfigWrite::new(ConfigAddress::Init, 1, -7));
        engine.push_sample(0, 11);
        engine.push_sample(1, 12);
        engine.drain();

        engine.push_sample(0, 1);
        engine.write(ConfigWrite::inject(1));
        let out = engine.reset();
        assert!(!out.valid);
        assert!(engine.pending_injections().is_empty());
        assert_eq!(engine.occupancy(), 0);

        let emitted = engine.drain();
        assert!(emitted.is_empty());
        assert_eq!(engine.channel_state(0).map(|s| s.last_output), Some(0));
        assert_eq!(engine.channel_state(1).map(|s| s.last_output), Some(-7));
        assert_eq!(engine.channel_state(1).map(|s| s.last_scaled_delta), Some(0));
        assert_eq!(engine.stats().resets, 1);
        Ok(())
    }

    #[test]
    fn test_config_write_still_lands_during_reset() -> Result<()> {
        let mut engine = PipelineEngine::new(1)?;
        engine.tick(CycleInput {
            sample: None,
            write: Some(ConfigWrite::new(ConfigAddress::Init, 0, 9)),
            reset: true,
        });
        engine.drain();
        assert_eq!(engine.channel_state(0).map(|s| s.last_output), Some(9));
        Ok(())
    }

    #[test]
    fn test_unknown_channel_sample_is_rejected() -> Result<()> {
        let mut engine = PipelineEngine::new(2)?;
        engine.push_sample(5, 1);
        assert_eq!(engine.occupancy(), 0);
        assert_eq!(engine.stats().samples_rejected, 1);
        assert!(engine.drain().is_empty());
        Ok(())
    }

    #[test]
    fn test_saturation_counter() -> Result<()> {
        let mut engine = engine_with_bounds(1, -10, 10)?;
        engine.push_sample(0, 50);
        engine.drain();
        assert_eq!(engine.stats().saturations, 1);
        assert_eq!(engine.stats().events_emitted, 1);
        Ok(())
    }
}
