//! Snapshot, command and state types exchanged with the control tick.

/// Feed and flywheel parameters. All-zero by default, which leaves every
/// flywheel preset at 0 rad/s and the feed step at 0 rad: nothing moves until
/// a real configuration has been published.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Config {
    /// Trigger advance per feed cycle (rad).
    pub push_angle: f64,
    /// Magazine gate position when open (rad).
    pub magazine_q_des: f64,
    pub qd_10: f64,
    pub qd_15: f64,
    pub qd_16: f64,
    pub qd_18: f64,
    pub qd_30: f64,
}

impl Config {
    /// Flywheel speed preset (rad/s) for a muzzle speed level.
    #[inline]
    pub fn qd_for(&self, speed: MuzzleSpeed) -> f64 {
        match speed {
            MuzzleSpeed::Speed10 => self.qd_10,
            MuzzleSpeed::Speed15 => self.qd_15,
            MuzzleSpeed::Speed16 => self.qd_16,
            MuzzleSpeed::Speed18 => self.qd_18,
            MuzzleSpeed::Speed30 => self.qd_30,
        }
    }
}

/// Jam detection and recovery parameters. All-zero by default, which
/// disables detection.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct BlockConfig {
    /// Trigger effort magnitude at or above which a stall is suspected.
    pub block_effort: f64,
    /// Seconds a stall must persist to count as a jam; also the longest
    /// reverse drive during recovery.
    pub block_duration: f64,
    /// Reverse drive speed during recovery (rad/s).
    pub block_speed: f64,
    /// Backoff distance (rad).
    pub anti_block_angle: f64,
    /// Backoff tolerance (rad).
    pub anti_block_error: f64,
}

/// Selectable muzzle speed levels.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MuzzleSpeed {
    #[default]
    Speed10,
    Speed15,
    Speed16,
    Speed18,
    Speed30,
}

impl MuzzleSpeed {
    pub const ALL: [MuzzleSpeed; 5] = [
        MuzzleSpeed::Speed10,
        MuzzleSpeed::Speed15,
        MuzzleSpeed::Speed16,
        MuzzleSpeed::Speed18,
        MuzzleSpeed::Speed30,
    ];

    /// Exact-match lookup; any level other than 10, 15, 16, 18 or 30 is
    /// `None` (no snapping to the nearest preset).
    pub const fn from_level(level: u8) -> Option<Self> {
        match level {
            10 => Some(MuzzleSpeed::Speed10),
            15 => Some(MuzzleSpeed::Speed15),
            16 => Some(MuzzleSpeed::Speed16),
            18 => Some(MuzzleSpeed::Speed18),
            30 => Some(MuzzleSpeed::Speed30),
            _ => None,
        }
    }

    pub const fn level(self) -> u8 {
        match self {
            MuzzleSpeed::Speed10 => 10,
            MuzzleSpeed::Speed15 => 15,
            MuzzleSpeed::Speed16 => 16,
            MuzzleSpeed::Speed18 => 18,
            MuzzleSpeed::Speed30 => 30,
        }
    }
}

/// Latest operator request. Only the most recent value matters.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ShootCommand {
    pub fire_enable: bool,
    pub speed: MuzzleSpeed,
    /// Feed rate (Hz); 0 never feeds.
    pub rate_hz: f64,
    pub magazine_open: bool,
    /// Request STOP from any state.
    pub stop: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    #[default]
    Passive,
    Ready,
    Push,
    Stop,
    Block,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MagazineState {
    #[default]
    Passive,
    Open,
    Close,
}

/// A state change taken during one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: State,
    pub to: State,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(10, Some(MuzzleSpeed::Speed10))]
    #[case(15, Some(MuzzleSpeed::Speed15))]
    #[case(16, Some(MuzzleSpeed::Speed16))]
    #[case(18, Some(MuzzleSpeed::Speed18))]
    #[case(30, Some(MuzzleSpeed::Speed30))]
    #[case(0, None)]
    #[case(9, None)]
    #[case(17, None)]
    #[case(31, None)]
    #[case(255, None)]
    fn level_mapping_is_exact(#[case] level: u8, #[case] expected: Option<MuzzleSpeed>) {
        assert_eq!(MuzzleSpeed::from_level(level), expected);
    }

    #[test]
    fn level_roundtrips_for_every_preset() {
        for s in MuzzleSpeed::ALL {
            assert_eq!(MuzzleSpeed::from_level(s.level()), Some(s));
        }
    }

    #[test]
    fn preset_lookup_selects_matching_field() {
        let cfg = Config {
            qd_10: 1.0,
            qd_15: 2.0,
            qd_16: 3.0,
            qd_18: 4.0,
            qd_30: 5.0,
            ..Config::default()
        };
        let got: Vec<f64> = MuzzleSpeed::ALL.iter().map(|s| cfg.qd_for(*s)).collect();
        assert_eq!(got, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn defaults_are_zero_and_idle() {
        let cfg = Config::default();
        for s in MuzzleSpeed::ALL {
            assert_eq!(cfg.qd_for(s), 0.0);
        }
        assert_eq!(cfg.push_angle, 0.0);
        assert_eq!(BlockConfig::default().block_effort, 0.0);
        let cmd = ShootCommand::default();
        assert!(!cmd.fire_enable && !cmd.stop && !cmd.magazine_open);
        assert_eq!(State::default(), State::Passive);
        assert_eq!(MagazineState::default(), MagazineState::Passive);
    }
}
