//! One-second countdown used to expire a test session.
//!
//! The countdown does not read any clock. Whoever owns it calls [`Countdown::tick`]
//! once per elapsed second, which keeps time advancement deterministic in tests.

/// Result of feeding one second to a [`Countdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The countdown is stopped; nothing changed.
    Idle,
    /// One second elapsed and time remains.
    Running { remaining_secs: u32 },
    /// This tick reached zero. The countdown stops itself.
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    limit_secs: u32,
    remaining_secs: u32,
    running: bool,
}

impl Countdown {
    /// A stopped countdown holding the full `limit_secs`.
    #[must_use]
    pub fn new(limit_secs: u32) -> Self {
        Self {
            limit_secs,
            remaining_secs: limit_secs,
            running: false,
        }
    }

    #[must_use]
    pub fn limit_secs(&self) -> u32 {
        self.limit_secs
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    #[must_use]
    pub fn elapsed_secs(&self) -> u32 {
        self.limit_secs.saturating_sub(self.remaining_secs)
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.remaining_secs == 0
    }

    /// Start or resume. An expired countdown stays stopped.
    pub fn start(&mut self) {
        self.running = !self.is_expired();
    }

    /// Stop without losing the remaining time. Safe to call repeatedly.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Stop and refill to the full limit.
    pub fn restart(&mut self) {
        self.running = false;
        self.remaining_secs = self.limit_secs;
    }

    pub fn tick(&mut self) -> Tick {
        if !self.running {
            return Tick::Idle;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.running = false;
            Tick::Expired
        } else {
            Tick::Running {
                remaining_secs: self.remaining_secs,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_only_while_running() {
        let mut countdown = Countdown::new(10);
        assert_eq!(countdown.tick(), Tick::Idle);
        assert_eq!(countdown.remaining_secs(), 10);

        countdown.start();
        assert_eq!(countdown.tick(), Tick::Running { remaining_secs: 9 });

        countdown.stop();
        countdown.stop();
        assert_eq!(countdown.tick(), Tick::Idle);
        assert_eq!(countdown.remaining_secs(), 9);
    }

    #[test]
    fn k_ticks_subtract_k_with_floor_zero() {
        for k in [0_u32, 1, 5, 10, 25] {
            let mut countdown = Countdown::new(10);
            countdown.start();
            for _ in 0..k {
                let _ = countdown.tick();
            }
            assert_eq!(countdown.remaining_secs(), 10_u32.saturating_sub(k), "k={k}");
        }
    }

    #[test]
    fn expiry_stops_and_refuses_restart_until_refilled() {
        let mut countdown = Countdown::new(2);
        countdown.start();
        assert_eq!(countdown.tick(), Tick::Running { remaining_secs: 1 });
        assert_eq!(countdown.tick(), Tick::Expired);
        assert!(!countdown.is_running());
        assert_eq!(countdown.elapsed_secs(), 2);

        countdown.start();
        assert!(!countdown.is_running());

        countdown.restart();
        assert_eq!(countdown.remaining_secs(), 2);
        assert!(!countdown.is_running());
    }
}
