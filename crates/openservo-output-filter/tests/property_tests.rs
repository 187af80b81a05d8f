//! Property-Based Tests for the output filter
//!
//! Random configurations and sample streams are checked against a plain
//! reference model of the datapath, including the stale reads that happen
//! when events for one channel are admitted close together.

use openservo_output_filter::prelude::*;

fn must<T, E: std::fmt::Debug>(r: Result<T, E>) -> T {
    match r {
        Ok(v) => v,
        Err(e) => panic!("must() failed: {:?}", e),
    }
}

fn clamp_model(uncapped: i128, min: i32, max: i32) -> i32 {
    if uncapped < i128::from(min) {
        min
    } else if uncapped > i128::from(max) {
        max
    } else {
        must(i32::try_from(uncapped))
    }
}

fn scaled_model(delta: i32, scale: i32, shift: u8) -> i64 {
    (i64::from(delta) * i64::from(scale)) >> shift.min(63)
}

fn configured(channels: usize, scale: i32, shift: u8, min: i32, max: i32) -> PipelineEngine {
    let mut engine = must(PipelineEngine::new(channels));
    let profile = FilterProfile {
        channels: (0..channels)
            .map(|channel| ChannelProfile {
                channel,
                scale: Some(scale),
                shift: Some(shift),
                min: Some(min),
                max: Some(max),
                ..ChannelProfile::default()
            })
            .collect(),
    };
    must(engine.apply_profile(&profile));
    engine
}

#[cfg(test)]
mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    fn bounds() -> impl Strategy<Value = (i32, i32)> {
        (-10_000i32..10_000, 0i32..20_000).prop_map(|(min, span)| (min, min.saturating_add(span)))
    }

    proptest! {
        #[test]
        fn isolated_samples_match_recurrence(
            scale in -1_000i32..1_000,
            shift in 0u8..8,
            (min, max) in bounds(),
            deltas in prop::collection::vec(-5_000i32..5_000, 1..20),
        ) {
            let mut engine = configured(1, scale, shift, min, max);
            let mut expected = 0i32;
            for delta in deltas {
                let uncapped = i128::from(expected) + i128::from(scaled_model(delta, scale, shift));
                expected = clamp_model(uncapped, min, max);

                engine.push_sample(0, delta);
                let emitted = engine.drain();
                prop_assert_eq!(emitted.len(), 1);
                prop_assert_eq!(emitted.first().map(|e| e.output), Some(expected));
            }
        }

        #[test]
        fn output_stays_within_bounds(
            scale in any::<i32>(),
            shift in any::<u8>(),
            (min, max) in bounds(),
            deltas in prop::collection::vec(any::<i32>(), 1..40),
        ) {
            let mut engine = configured(2, scale, shift, min, max);
            let mut emitted = Vec::new();
            for (i, delta) in deltas.iter().enumerate() {
                if let Some(event) = engine.push_sample(i % 2, *delta).into_valid() {
                    emitted.push(event);
                }
            }
            emitted.extend(engine.drain());

            prop_assert_eq!(emitted.len(), deltas.len());
            for event in emitted {
                prop_assert!(event.output >= min && event.output <= max);
            }
        }

        #[test]
        fn retirement_order_matches_admission(
            channels in prop::collection::vec(0usize..8, 1..64),
        ) {
            let mut engine = configured(8, 1, 0, -1_000_000, 1_000_000);
            let mut emitted = Vec::new();
            for &channel in &channels {
                if let Some(event) = engine.push_sample(channel, 1).into_valid() {
                    emitted.push(event);
                }
            }
            emitted.extend(engine.drain());

            let retired: Vec<usize> = emitted.iter().map(|e| e.channel).collect();
            prop_assert_eq!(retired, channels);
        }

        #[test]
        fn back_to_back_streams_read_committed_output(
            stream in prop::collection::vec((0usize..3, -100i32..100), 1..48),
        ) {
            let mut engine = configured(3, 1, 0, -1_000, 1_000);
            let mut emitted = Vec::new();
            for &(channel, delta) in &stream {
                if let Some(event) = engine.push_sample(channel, delta).into_valid() {
                    emitted.push(event);
                }
            }
            emitted.extend(engine.drain());

            // Event i reads last_output at Cross-Sum on cycle i + 2; an earlier
            // event j has committed by then only if j + 4 < i + 2.
            let mut expected: Vec<i32> = Vec::with_capacity(stream.len());
            for (i, &(channel, delta)) in stream.iter().enumerate() {
                let prev = stream
                    .iter()
                    .zip(expected.iter())
                    .enumerate()
                    .take(i.saturating_sub(2))
                    .filter(|(_, ((c, _), _))| *c == channel)
                    .last()
                    .map_or(0, |(_, (_, &out))| out);
                expected.push(clamp_model(i128::from(prev) + i128::from(delta), -1_000, 1_000));
            }

            let outputs: Vec<i32> = emitted.iter().map(|e| e.output).collect();
            prop_assert_eq!(outputs, expected);
        }

        #[test]
        fn clear_always_restores_init(
            init in -500i32..500,
            deltas in prop::collection::vec(-1_000i32..1_000, 0..16),
        ) {
            let mut engine = configured(1, 3, 1, -2_000, 2_000);
            engine.write(ConfigWrite::new(ConfigAddress::Init, 0, i64::from(init)));
            for delta in deltas {
                engine.push_sample(0, delta);
            }
            engine.write(ConfigWrite::clear(0));
            engine.drain();

            prop_assert_eq!(
                engine.channel_state(0),
                Some(ChannelState { last_scaled_delta: 0, last_output: init })
            );
        }

        #[test]
        fn unknown_addresses_rejected(raw in 8u8..=u8::MAX) {
            prop_assert_eq!(
                ConfigWrite::from_raw(raw, 0, 0).err(),
                Some(FilterError::UnknownAddress(raw))
            );
        }
    }
}
