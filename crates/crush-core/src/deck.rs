use serde::{Deserialize, Serialize};

use crate::gesture::{Displacement, InteractionType, classify};
use crate::model::{InteractionRecord, Profile};

/// When a resolved swipe moves the cursor forward.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdvancePolicy {
    /// Advance whether or not the backend acknowledged the interaction.
    #[default]
    Always,
    /// Advance only after the backend acknowledged; a failed submission
    /// leaves the same profile on top.
    OnAck,
}

impl AdvancePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            AdvancePolicy::Always => "always",
            AdvancePolicy::OnAck => "on-ack",
        }
    }
}

/// Result of releasing a drag on the top card.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Release {
    /// Below every threshold; the card springs back to the origin.
    Reset,
    /// The top profile received an interaction that must now be submitted
    /// and then settled.
    Resolved(InteractionRecord),
    /// A previous resolution has not been settled yet; the gesture is dropped.
    Pending,
    /// No profile left to act on.
    Exhausted,
}

/// A fetched profile sequence with a forward-only cursor.
///
/// The deck resolves at most one gesture per profile: once a release
/// resolves, further releases report [`Release::Pending`] until
/// [`SwipeDeck::settle`] is called.
#[derive(Clone, Debug, Default)]
pub struct SwipeDeck {
    profiles: Vec<Profile>,
    cursor: usize,
    position: Displacement,
    pending: Option<InteractionRecord>,
}

impl SwipeDeck {
    pub fn new(profiles: Vec<Profile>) -> Self {
        Self {
            profiles,
            ..Default::default()
        }
    }

    /// Install a freshly fetched sequence and rewind to the first profile.
    pub fn replace(&mut self, profiles: Vec<Profile>) {
        self.profiles = profiles;
        self.cursor = 0;
        self.position = Displacement::ORIGIN;
        self.pending = None;
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.profiles.len().saturating_sub(self.cursor)
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.profiles.len()
    }

    pub fn current(&self) -> Option<&Profile> {
        self.profiles.get(self.cursor)
    }

    pub fn position(&self) -> Displacement {
        self.position
    }

    pub fn pending(&self) -> Option<&InteractionRecord> {
        self.pending.as_ref()
    }

    /// Track the card while the finger is down. Ignored while a resolution
    /// is in flight.
    pub fn drag(&mut self, d: Displacement) {
        if self.pending.is_none() && !self.is_exhausted() {
            self.position = d;
        }
    }

    pub fn release(&mut self, d: Displacement) -> Release {
        if self.pending.is_some() {
            return Release::Pending;
        }
        let Some(profile) = self.current() else {
            self.position = Displacement::ORIGIN;
            return Release::Exhausted;
        };

        match classify(d) {
            Some(kind) => {
                let record = InteractionRecord::new(profile.id.clone(), kind);
                self.position = d;
                self.pending = Some(record.clone());
                Release::Resolved(record)
            }
            None => {
                self.position = Displacement::ORIGIN;
                Release::Reset
            }
        }
    }

    /// Button equivalent of a fling in the matching direction.
    pub fn press(&mut self, kind: InteractionType) -> Release {
        self.release(Displacement::for_button(kind))
    }

    /// Finish the pending resolution. Returns whether the cursor moved.
    pub fn settle(&mut self, acknowledged: bool, policy: AdvancePolicy) -> bool {
        if self.pending.take().is_none() {
            return false;
        }
        self.position = Displacement::ORIGIN;

        let advance = match policy {
            AdvancePolicy::Always => true,
            AdvancePolicy::OnAck => acknowledged,
        };
        if advance {
            self.cursor += 1;
        }
        advance
    }
}
