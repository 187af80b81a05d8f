//! Stage arithmetic and inter-stage latches
//!
//! Each pipeline stage hands the next one a [`Slot`]: either empty, or a live
//! sample/injection carrying exactly the fields later stages need. The
//! arithmetic of the Scale, Cross-Sum and Bound-Integrate stages lives here
//! as pure functions so it can be tested without clocking an engine.
//!
//! # Widths
//!
//! | Value | Type | Why it cannot overflow |
//! |-------|------|------------------------|
//! | `delta * scale` | `i64` | product of two `i32` |
//! | `scaled + add` | `i128` | sum of two `i64` |
//! | `sum + last_output` | `i128` | `i128` sum of an `i65` and an `i32` |

/// Pipeline slot: empty, or a live event tagged with its origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Slot<T> {
    /// No event (bubble or flushed)
    #[default]
    Empty,
    /// External sample
    Sample(T),
    /// Engine-synthesized injection
    Injection(T),
}

impl<T> Slot<T> {
    /// Payload of a live slot.
    #[inline]
    pub fn payload(&self) -> Option<&T> {
        match self {
            Slot::Empty => None,
            Slot::Sample(payload) | Slot::Injection(payload) => Some(payload),
        }
    }

    /// Whether the slot holds a live event.
    #[inline]
    pub fn is_live(&self) -> bool {
        !matches!(self, Slot::Empty)
    }

    /// Whether the slot holds an injection.
    #[inline]
    pub fn is_injection(&self) -> bool {
        matches!(self, Slot::Injection(_))
    }

    /// Advance the slot through a stage, keeping its tag.
    #[inline]
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Slot<U> {
        match self {
            Slot::Empty => Slot::Empty,
            Slot::Sample(payload) => Slot::Sample(f(payload)),
            Slot::Injection(payload) => Slot::Injection(f(payload)),
        }
    }
}

impl<T: Latch> Slot<T> {
    /// Channel of the live event, if any.
    #[inline]
    pub fn channel(&self) -> Option<usize> {
        self.payload().map(Latch::channel)
    }

    /// Drop the event if `flush` holds for its channel.
    ///
    /// Returns `true` when a live event was dropped.
    #[inline]
    pub fn flush_if(&mut self, flush: impl FnOnce(usize) -> bool) -> bool {
        match self.channel() {
            Some(channel) if flush(channel) => {
                *self = Slot::Empty;
                true
            }
            _ => false,
        }
    }
}

/// Anything carried between stages names its channel.
pub trait Latch: Copy {
    /// Channel of the event.
    fn channel(&self) -> usize;
}

/// Fetch → Scale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchLatch {
    /// Channel
    pub channel: usize,
    /// Incoming delta (zero for injections)
    pub delta: i32,
    /// Multiplier
    pub scale: i32,
    /// Right shift
    pub shift: u8,
    /// Raw cross-channel reference
    pub add_channel: u32,
}

/// Scale → Cross-Sum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleLatch {
    /// Channel
    pub channel: usize,
    /// Scaled delta
    pub scaled: i64,
    /// Referenced channel's committed scaled delta, or zero
    pub add_value: i64,
}

/// Cross-Sum → Bound-Integrate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SumLatch {
    /// Channel
    pub channel: usize,
    /// Scaled delta plus cross-channel contribution
    pub sum: i128,
    /// Committed output read at Cross-Sum
    pub last_output: i32,
    /// Lower bound
    pub min: i32,
    /// Upper bound
    pub max: i32,
}

/// Bound-Integrate → Writeback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundLatch {
    /// Channel
    pub channel: usize,
    /// Clamped output
    pub output: i32,
    /// Whether the clamp engaged
    pub saturated: bool,
    /// Injection value
    pub init: i32,
}

impl Latch for FetchLatch {
    fn channel(&self) -> usize {
        self.channel
    }
}

impl Latch for ScaleLatch {
    fn channel(&self) -> usize {
        self.channel
    }
}

impl Latch for SumLatch {
    fn channel(&self) -> usize {
        self.channel
    }
}

impl Latch for BoundLatch {
    fn channel(&self) -> usize {
        self.channel
    }
}

/// Multiply then arithmetic right shift.
///
/// The shift is sign preserving, so negative products round toward negative
/// infinity. Shifts of 63 or more leave only the sign fill.
///
/// # Example
///
/// ```
/// use openservo_output_filter::stages::scale_delta;
///
/// assert_eq!(scale_delta(5, 2, 0), 10);
/// assert_eq!(scale_delta(-3, 1, 1), -2);
/// assert_eq!(scale_delta(-1, 1, 200), -1);
/// ```
#[inline]
pub fn scale_delta(delta: i32, scale: i32, shift: u8) -> i64 {
    let product = i64::from(delta) * i64::from(scale);
    product >> u32::from(shift).min(63)
}

/// Add the cross-channel contribution one bit wider than either operand.
#[inline]
pub fn cross_sum(scaled: i64, add_value: i64) -> i128 {
    i128::from(scaled) + i128::from(add_value)
}

/// Result of the Bound-Integrate stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounded {
    /// Clamped output
    pub output: i32,
    /// Whether the clamp engaged
    pub saturated: bool,
}

/// Integrate onto the previous output and clamp.
///
/// The lower bound is checked first, so inverted bounds (`min > max`) yield
/// `min` for anything below `min` and `max` for everything else.
///
/// # Example
///
/// ```
/// use openservo_output_filter::stages::bound_integrate;
///
/// let bounded = bound_integrate(500, 0, -100, 100);
/// assert_eq!(bounded.output, 100);
/// assert!(bounded.saturated);
/// ```
#[inline]
pub fn bound_integrate(sum: i128, last_output: i32, min: i32, max: i32) -> Bounded {
    let uncapped = sum + i128::from(last_output);

    if uncapped < i128::from(min) {
        Bounded {
            output: min,
            saturated: true,
        }
    } else if uncapped > i128::from(max) {
        Bounded {
            output: max,
            saturated: true,
        }
    } else {
        Bounded {
            output: truncate_output(uncapped),
            saturated: false,
        }
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "only reached for values already within [min, max]"
)]
#[inline]
fn truncate_output(value: i128) -> i32 {
    value as i32
}
