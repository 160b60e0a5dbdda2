//! Cooperative one-shot timer behind the status LED.
//!
//! Handlers arm it with a blink pattern and, optionally, an action to run
//! once the pattern has played out (a restart after saving params, the
//! switch to a freshly staged firmware image). The main loop drives it with
//! [`StatusTimer::tick`]; nothing here sleeps or spawns.

/// LED blink pattern: `cycles` repetitions of `on_ms` lit then `off_ms` dark.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlinkPattern {
    on_ms: u32,
    off_ms: u32,
    cycles: u32,
}

impl BlinkPattern {
    /// Grace period before a reboot: one slow blink.
    pub const REBOOT: Self = Self::new(500, 500, 1);

    /// Grace period after a firmware upload.
    pub const UPGRADE: Self = Self::new(200, 200, 5);

    /// Long flashes, relay switched on.
    pub const POWER_ON: Self = Self::new(200, 20, 5);

    /// Short flashes, relay switched off.
    pub const POWER_OFF: Self = Self::new(20, 200, 5);

    /// Create a pattern.
    pub const fn new(on_ms: u32, off_ms: u32, cycles: u32) -> Self {
        Self {
            on_ms,
            off_ms,
            cycles,
        }
    }

    /// Length of one on/off cycle.
    #[inline]
    pub const fn period_ms(&self) -> u32 {
        self.on_ms + self.off_ms
    }

    /// Time from arming until the pattern ends.
    ///
    /// ```
    /// use psu_webadmin::domain::BlinkPattern;
    ///
    /// assert_eq!(BlinkPattern::UPGRADE.duration_ms(), 2000);
    /// ```
    #[inline]
    pub const fn duration_ms(&self) -> u32 {
        self.period_ms().saturating_mul(self.cycles)
    }

    fn led_at(&self, elapsed_ms: u32) -> bool {
        match self.period_ms() {
            0 => false,
            period => elapsed_ms % period < self.on_ms,
        }
    }
}

/// Work to run once a pattern finishes.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredAction {
    /// Restart the chip.
    Restart,
    /// Flag the staged image complete and reboot into it.
    ActivateUpgrade,
}

/// Result of one [`StatusTimer::tick`].
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Nothing armed.
    Idle,
    /// Pattern playing; drive the LED to `led`.
    Blink {
        /// Whether the LED should be lit.
        led: bool,
    },
    /// Pattern finished. The LED should go dark and the action, if any, run.
    Done(Option<DeferredAction>),
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    pattern: BlinkPattern,
    action: Option<DeferredAction>,
    armed_at_ms: u32,
}

/// Single-slot status timer.
#[derive(Debug, Default)]
pub struct StatusTimer {
    pending: Option<Pending>,
}

impl StatusTimer {
    /// Create an idle timer.
    pub const fn new() -> Self {
        Self { pending: None }
    }

    /// Start `pattern` at `now_ms`, replacing whatever was pending.
    pub fn arm(&mut self, pattern: BlinkPattern, action: Option<DeferredAction>, now_ms: u32) {
        if let Some(old) = self.pending.as_ref().and_then(|p| p.action) {
            debug!("Status timer re-armed, dropping {}", action_name(old));
        }
        self.pending = Some(Pending {
            pattern,
            action,
            armed_at_ms: now_ms,
        });
    }

    /// Whether a pattern is playing.
    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    /// Action waiting for the current pattern to finish.
    pub fn pending_action(&self) -> Option<DeferredAction> {
        self.pending.and_then(|p| p.action)
    }

    /// Advance to `now_ms`.
    pub fn tick(&mut self, now_ms: u32) -> Tick {
        let Some(pending) = self.pending else {
            return Tick::Idle;
        };

        let elapsed = now_ms.wrapping_sub(pending.armed_at_ms);
        if elapsed >= pending.pattern.duration_ms() {
            self.pending = None;
            return Tick::Done(pending.action);
        }

        Tick::Blink {
            led: pending.pattern.led_at(elapsed),
        }
    }
}

fn action_name(action: DeferredAction) -> &'static str {
    match action {
        DeferredAction::Restart => "restart",
        DeferredAction::ActivateUpgrade => "upgrade activation",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle() {
        let mut timer = StatusTimer::new();
        assert_eq!(timer.tick(1_000), Tick::Idle);
    }

    #[test]
    fn test_blink_phases() {
        let mut timer = StatusTimer::new();
        timer.arm(BlinkPattern::new(200, 20, 5), None, 1_000);

        assert_eq!(timer.tick(1_000), Tick::Blink { led: true });
        assert_eq!(timer.tick(1_199), Tick::Blink { led: true });
        assert_eq!(timer.tick(1_205), Tick::Blink { led: false });
        assert_eq!(timer.tick(1_220), Tick::Blink { led: true });
        assert_eq!(timer.tick(2_100), Tick::Done(None));
        assert!(!timer.is_armed());
    }

    #[test]
    fn test_action_fires_once_after_duration() {
        let mut timer = StatusTimer::new();
        timer.arm(BlinkPattern::UPGRADE, Some(DeferredAction::ActivateUpgrade), 0);

        assert!(matches!(timer.tick(1_999), Tick::Blink { .. }));
        assert_eq!(
            timer.tick(2_000),
            Tick::Done(Some(DeferredAction::ActivateUpgrade))
        );
        assert_eq!(timer.tick(2_001), Tick::Idle);
    }

    #[test]
    fn test_rearm_replaces_pending() {
        let mut timer = StatusTimer::new();
        timer.arm(BlinkPattern::REBOOT, Some(DeferredAction::Restart), 0);
        timer.arm(BlinkPattern::POWER_ON, None, 100);

        assert_eq!(timer.pending_action(), None);
        assert_eq!(timer.tick(5_000), Tick::Done(None));
    }

    #[test]
    fn test_clock_wrap() {
        let mut timer = StatusTimer::new();
        timer.arm(BlinkPattern::REBOOT, Some(DeferredAction::Restart), u32::MAX - 100);

        assert!(matches!(timer.tick(200), Tick::Blink { .. }));
        assert_eq!(timer.tick(900), Tick::Done(Some(DeferredAction::Restart)));
    }
}
