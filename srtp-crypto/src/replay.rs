//! Sliding replay window (RFC 3711 §3.3.2).

/// Number of packet indices the window remembers behind the highest one
pub const WINDOW_SIZE: u64 = 64;

/// Outcome of a replay check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayCheck {
    /// Index not seen before and inside or ahead of the window
    Fresh,
    /// Index already accepted
    Duplicate,
    /// Index behind the window
    TooOld,
}

/// Bitmap of recently accepted packet indices
#[derive(Debug, Clone, Default)]
pub struct ReplayWindow {
    highest: Option<u64>,
    /// Bit `n` set means `highest - n` was accepted
    mask: u64,
}

impl ReplayWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest index accepted so far
    pub fn highest(&self) -> Option<u64> {
        self.highest
    }

    /// Check an index without recording it
    pub fn check(&self, index: u64) -> ReplayCheck {
        let Some(highest) = self.highest else {
            return ReplayCheck::Fresh;
        };
        if index > highest {
            return ReplayCheck::Fresh;
        }

        let delta = highest - index;
        if delta >= WINDOW_SIZE {
            ReplayCheck::TooOld
        } else if self.mask & (1 << delta) != 0 {
            ReplayCheck::Duplicate
        } else {
            ReplayCheck::Fresh
        }
    }

    /// Record an index; call only after the packet authenticated
    pub fn accept(&mut self, index: u64) {
        match self.highest {
            None => {
                self.highest = Some(index);
                self.mask = 1;
            }
            Some(highest) if index > highest => {
                let shift = index - highest;
                self.mask = if shift >= WINDOW_SIZE {
                    0
                } else {
                    self.mask << shift
                };
                self.mask |= 1;
                self.highest = Some(index);
            }
            Some(highest) => {
                let delta = highest - index;
                if delta < WINDOW_SIZE {
                    self.mask |= 1 << delta;
                }
            }
        }
    }
}
