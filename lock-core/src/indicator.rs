//! Indicator light model.
//!
//! The lock drives three channels (red, green, blue); yellow is produced by
//! lighting green and blue together. Every visual state resolves to one
//! [`LedFrame`] that drivers apply in a single step, so combined colours never
//! depend on the order of individual channel writes.

use core::{fmt, ops::Add, time::Duration};

/// Output level of every indicator channel.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LedFrame {
    pub red: bool,
    pub green: bool,
    pub blue: bool,
}

impl LedFrame {
    pub const OFF: LedFrame = LedFrame::new(false, false, false);
    pub const RED: LedFrame = LedFrame::new(true, false, false);
    pub const GREEN: LedFrame = LedFrame::new(false, true, false);
    pub const BLUE: LedFrame = LedFrame::new(false, false, true);
    pub const YELLOW: LedFrame = LedFrame::new(false, true, true);

    #[must_use]
    pub const fn new(red: bool, green: bool, blue: bool) -> Self {
        Self { red, green, blue }
    }

    /// Channel-wise union of two frames.
    #[must_use]
    pub const fn with(self, other: LedFrame) -> Self {
        Self {
            red: self.red || other.red,
            green: self.green || other.green,
            blue: self.blue || other.blue,
        }
    }
}

impl fmt::Display for LedFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = |lit: bool, label: char| if lit { label } else { '.' };
        write!(
            f,
            "{}{}{}",
            mark(self.red, 'R'),
            mark(self.green, 'G'),
            mark(self.blue, 'B')
        )
    }
}

/// Visual states requested by the lock state machine.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Indicator {
    Red,
    Blue,
    Green,
    Yellow,
    /// Unlocked idle background: green and yellow requested together.
    GreenYellow,
    Off,
    /// Wrong code: yellow flashes while red stays lit.
    YellowStrobeWithRed,
    /// Entry timeout: yellow flashes on a dark background.
    YellowStrobeNoRed,
}

impl Indicator {
    /// Frame shown for steady states, or the first phase of a strobe.
    #[must_use]
    pub const fn frame(self) -> LedFrame {
        match self {
            Indicator::Red => LedFrame::RED,
            Indicator::Blue => LedFrame::BLUE,
            Indicator::Green => LedFrame::GREEN,
            Indicator::Yellow => LedFrame::YELLOW,
            Indicator::GreenYellow => LedFrame::GREEN.with(LedFrame::YELLOW),
            Indicator::Off => LedFrame::OFF,
            Indicator::YellowStrobeWithRed => StrobeKind::WithRed.on_frame(),
            Indicator::YellowStrobeNoRed => StrobeKind::NoRed.on_frame(),
        }
    }
}

/// Strobe animations played as blocking feedback.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StrobeKind {
    WithRed,
    NoRed,
}

impl StrobeKind {
    #[must_use]
    pub const fn on_frame(self) -> LedFrame {
        match self {
            StrobeKind::WithRed => LedFrame::RED.with(LedFrame::YELLOW),
            StrobeKind::NoRed => LedFrame::YELLOW,
        }
    }

    #[must_use]
    pub const fn off_frame(self) -> LedFrame {
        match self {
            StrobeKind::WithRed => LedFrame::RED,
            StrobeKind::NoRed => LedFrame::OFF,
        }
    }

    #[must_use]
    pub const fn indicator(self) -> Indicator {
        match self {
            StrobeKind::WithRed => Indicator::YellowStrobeWithRed,
            StrobeKind::NoRed => Indicator::YellowStrobeNoRed,
        }
    }
}

/// Timed on/off animation for a [`StrobeKind`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StrobePattern {
    pub kind: StrobeKind,
    pub phase: Duration,
    pub repetitions: u8,
}

impl StrobePattern {
    #[must_use]
    pub const fn new(kind: StrobeKind, phase: Duration, repetitions: u8) -> Self {
        Self {
            kind,
            phase,
            repetitions,
        }
    }

    /// Frame to show at `now` for an animation started at `started_at`, or
    /// `None` once every on/off phase has elapsed.
    #[must_use]
    pub fn frame_at<I>(&self, started_at: I, now: I) -> Option<LedFrame>
    where
        I: Copy + Ord + Add<Duration, Output = I>,
    {
        let phases = u32::from(self.repetitions) * 2;
        (1..=phases)
            .find(|&index| now < started_at + self.phase * index)
            .map(|index| {
                if index % 2 == 1 {
                    self.kind.on_frame()
                } else {
                    self.kind.off_frame()
                }
            })
    }
}

/// Abstraction over the physical indicator outputs.
pub trait IndicatorDriver {
    /// Drives every channel to the levels in `frame`.
    fn show(&mut self, frame: LedFrame);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_STROBE_PHASE, DEFAULT_STROBE_REPETITIONS};

    #[test]
    fn yellow_is_green_plus_blue() {
        assert_eq!(Indicator::Yellow.frame(), LedFrame::new(false, true, true));
        assert_eq!(Indicator::GreenYellow.frame(), LedFrame::YELLOW);
    }

    fn standard(kind: StrobeKind) -> StrobePattern {
        StrobePattern::new(kind, DEFAULT_STROBE_PHASE, DEFAULT_STROBE_REPETITIONS)
    }

    fn at(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn strobe_alternates_and_keeps_red_lit() {
        let pattern = standard(StrobeKind::WithRed);
        let start = at(1_000);

        let on = pattern.frame_at(start, start).expect("strobe running");
        assert!(on.red && on.green && on.blue);
        assert_eq!(pattern.frame_at(start, at(1_300)), Some(LedFrame::RED));
        assert_eq!(pattern.frame_at(start, at(3_399)), Some(LedFrame::RED));
        assert_eq!(pattern.frame_at(start, at(3_400)), None);
    }

    #[test]
    fn timeout_strobe_goes_dark_between_flashes() {
        let pattern = standard(StrobeKind::NoRed);
        let start = Duration::ZERO;

        assert_eq!(pattern.frame_at(start, at(150)), Some(LedFrame::YELLOW));
        assert_eq!(pattern.frame_at(start, at(450)), Some(LedFrame::OFF));
        assert_eq!(pattern.frame_at(start, at(600)), Some(LedFrame::YELLOW));
        assert_eq!(pattern.frame_at(start, at(2_399)), Some(LedFrame::OFF));
    }

    #[test]
    fn short_pattern_walks_every_phase_then_ends() {
        let pattern = StrobePattern::new(StrobeKind::NoRed, at(10), 2);
        let start = at(100);

        assert_eq!(pattern.frame_at(start, at(100)), Some(LedFrame::YELLOW));
        assert_eq!(pattern.frame_at(start, at(110)), Some(LedFrame::OFF));
        assert_eq!(pattern.frame_at(start, at(125)), Some(LedFrame::YELLOW));
        assert_eq!(pattern.frame_at(start, at(139)), Some(LedFrame::OFF));
        assert_eq!(pattern.frame_at(start, at(140)), None);
    }

    #[test]
    fn zero_repetitions_finish_immediately() {
        let pattern = StrobePattern::new(StrobeKind::WithRed, at(300), 0);
        assert_eq!(pattern.frame_at(at(0), at(0)), None);
    }
}
