use crate::backend::VideoElement;

/// What the gate observed on its last evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Observation {
    playing: bool,
    /// `None` while detection is not live.
    presence: Option<bool>,
}

impl Observation {
    fn playing_and_absent(&self) -> bool {
        self.playing && self.presence == Some(false)
    }
}

/// Pauses the lesson video when the learner disappears while it plays.
///
/// One-directional: the gate only ever pauses, and only on entry into
/// (playing, absent). Resuming is left to the learner.
#[derive(Debug, Default)]
pub struct PlaybackGate {
    last: Option<Observation>,
    pauses_issued: u64,
}

impl PlaybackGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate the rule. Returns `true` when a pause command should be issued.
    pub fn observe(&mut self, presence: Option<bool>, playing: bool) -> bool {
        let current = Observation { playing, presence };
        let entering = current.playing_and_absent() && self.last != Some(current);
        self.last = Some(current);
        if entering {
            self.pauses_issued += 1;
        }
        entering
    }

    /// Evaluate the rule and pause `video` if it fires.
    pub fn apply(
        &mut self,
        presence: Option<bool>,
        playing: bool,
        video: &mut dyn VideoElement,
    ) -> bool {
        let pause = self.observe(presence, playing);
        if pause {
            tracing::info!("Learner not detected, pausing lesson video");
            video.pause();
        }
        pause
    }

    pub fn pauses_issued(&self) -> u64 {
        self.pauses_issued
    }
}
