//! Transmit burst state machine

use brf_sync::MetaFlags;

/// Whether a transmit burst is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BurstState {
    #[default]
    Idle,
    InBurst,
}

/// Driver directives for one transmit call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurstPlan {
    pub flags: MetaFlags,
    /// Tick to put in the transfer metadata
    pub timestamp: u64,
    /// The burst starts "now" and the running tick counter must be
    /// reseeded from the hardware clock
    pub seed_from_hardware: bool,
}

/// Burst bookkeeping for one transmit stream.
#[derive(Debug, Default)]
pub struct TxBurst {
    state: BurstState,
}

impl TxBurst {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> BurstState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == BurstState::InBurst
    }

    /// Directives for a transmit at `time` (in ticks, if the caller gave one).
    pub fn plan(&self, time: Option<u64>, end_burst: bool) -> BurstPlan {
        let mut plan = match (self.state, time) {
            (BurstState::InBurst, Some(ticks)) => BurstPlan {
                flags: MetaFlags::TX_UPDATE_TIMESTAMP,
                timestamp: ticks,
                seed_from_hardware: false,
            },
            (BurstState::InBurst, None) => BurstPlan {
                flags: MetaFlags::empty(),
                timestamp: 0,
                seed_from_hardware: false,
            },
            (BurstState::Idle, Some(ticks)) => BurstPlan {
                flags: MetaFlags::TX_BURST_START,
                timestamp: ticks,
                seed_from_hardware: false,
            },
            (BurstState::Idle, None) => BurstPlan {
                flags: MetaFlags::TX_BURST_START | MetaFlags::TX_NOW,
                timestamp: 0,
                seed_from_hardware: true,
            },
        };
        if end_burst {
            plan.flags.insert(MetaFlags::TX_BURST_END);
        }
        plan
    }

    /// Record a successful transmit.
    pub fn on_sent(&mut self, end_burst: bool) {
        self.state = if end_burst {
            BurstState::Idle
        } else {
            BurstState::InBurst
        };
    }

    pub fn force_idle(&mut self) {
        self.state = BurstState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_without_time_starts_now() {
        let burst = TxBurst::new();
        let plan = burst.plan(None, false);
        assert_eq!(plan.flags, MetaFlags::TX_BURST_START | MetaFlags::TX_NOW);
        assert!(plan.seed_from_hardware);
    }

    #[test]
    fn test_idle_with_time_starts_at_time() {
        let burst = TxBurst::new();
        let plan = burst.plan(Some(5000), true);
        assert_eq!(
            plan.flags,
            MetaFlags::TX_BURST_START | MetaFlags::TX_BURST_END
        );
        assert_eq!(plan.timestamp, 5000);
        assert!(!plan.seed_from_hardware);
    }

    #[test]
    fn test_in_burst_updates_timestamp() {
        let mut burst = TxBurst::new();
        burst.on_sent(false);
        assert!(burst.is_open());

        let plan = burst.plan(Some(9000), false);
        assert_eq!(plan.flags, MetaFlags::TX_UPDATE_TIMESTAMP);
        assert_eq!(plan.timestamp, 9000);

        let plan = burst.plan(None, true);
        assert_eq!(plan.flags, MetaFlags::TX_BURST_END);
    }

    #[test]
    fn test_transitions() {
        let mut burst = TxBurst::new();
        burst.on_sent(false);
        assert_eq!(burst.state(), BurstState::InBurst);
        burst.on_sent(true);
        assert_eq!(burst.state(), BurstState::Idle);
        burst.on_sent(false);
        burst.force_idle();
        assert!(!burst.is_open());
    }
}
