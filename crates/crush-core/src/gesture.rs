use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{FLING_DISTANCE, SWIPE_THRESHOLD};

/// A user's categorical response to a shown profile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionType {
    /// Right swipe (friendship).
    Like,
    /// Up swipe (romance).
    Love,
    /// Left swipe.
    Pass,
}

impl InteractionType {
    pub const ALL: [InteractionType; 3] = [Self::Like, Self::Love, Self::Pass];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Love => "love",
            Self::Pass => "pass",
        }
    }
}

impl fmt::Display for InteractionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InteractionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "like" => Ok(Self::Like),
            "love" => Ok(Self::Love),
            "pass" => Ok(Self::Pass),
            other => Err(format!("unknown interaction type: {other}")),
        }
    }
}

/// 2D drag offset of a card from its resting position, in points.
/// Screen coordinates: positive `dy` points down, so an upward drag is negative.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Displacement {
    pub dx: f64,
    pub dy: f64,
}

impl Displacement {
    pub const ORIGIN: Displacement = Displacement { dx: 0.0, dy: 0.0 };

    pub fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }

    /// The displacement a button press stands in for.
    pub fn for_button(kind: InteractionType) -> Self {
        match kind {
            InteractionType::Like => Self::new(FLING_DISTANCE, 0.0),
            InteractionType::Pass => Self::new(-FLING_DISTANCE, 0.0),
            InteractionType::Love => Self::new(0.0, -FLING_DISTANCE),
        }
    }

    pub fn is_origin(self) -> bool {
        self == Self::ORIGIN
    }
}

/// Map a released drag to an interaction. First match wins:
/// right beats left beats up. `None` means the card springs back.
pub fn classify(d: Displacement) -> Option<InteractionType> {
    if d.dx > SWIPE_THRESHOLD {
        Some(InteractionType::Like)
    } else if d.dx < -SWIPE_THRESHOLD {
        Some(InteractionType::Pass)
    } else if d.dy < -SWIPE_THRESHOLD {
        Some(InteractionType::Love)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_thresholds_are_strict() {
        assert_eq!(classify(Displacement::new(120.0, 0.0)), None);
        assert_eq!(classify(Displacement::new(-120.0, 0.0)), None);
        assert_eq!(classify(Displacement::new(0.0, -120.0)), None);
        assert_eq!(
            classify(Displacement::new(120.5, 0.0)),
            Some(InteractionType::Like)
        );
    }

    #[test]
    fn test_horizontal_wins_over_vertical() {
        assert_eq!(
            classify(Displacement::new(150.0, -300.0)),
            Some(InteractionType::Like)
        );
        assert_eq!(
            classify(Displacement::new(-150.0, -300.0)),
            Some(InteractionType::Pass)
        );
    }

    #[test]
    fn test_downward_drag_is_ignored() {
        assert_eq!(classify(Displacement::new(0.0, 400.0)), None);
    }

    #[test]
    fn test_buttons_classify_to_themselves() {
        for kind in InteractionType::ALL {
            assert_eq!(classify(Displacement::for_button(kind)), Some(kind));
        }
    }

    #[test]
    fn test_interaction_type_wire_format() {
        let json = serde_json::to_string(&InteractionType::Love).unwrap();
        assert_eq!(json, "\"love\"");
        assert_eq!("PASS".parse::<InteractionType>(), Ok(InteractionType::Pass));
        assert!("super".parse::<InteractionType>().is_err());
    }

    proptest! {
        #[test]
        fn prop_right_is_like(dx in 120.001f64..10_000.0, dy in -10_000.0f64..10_000.0) {
            prop_assert_eq!(classify(Displacement::new(dx, dy)), Some(InteractionType::Like));
        }

        #[test]
        fn prop_left_is_pass(dx in -10_000.0f64..-120.001, dy in -10_000.0f64..10_000.0) {
            prop_assert_eq!(classify(Displacement::new(dx, dy)), Some(InteractionType::Pass));
        }

        #[test]
        fn prop_up_is_love(dx in -120.0f64..=120.0, dy in -10_000.0f64..-120.001) {
            prop_assert_eq!(classify(Displacement::new(dx, dy)), Some(InteractionType::Love));
        }

        #[test]
        fn prop_inside_box_is_none(dx in -120.0f64..=120.0, dy in -120.0f64..10_000.0) {
            prop_assert_eq!(classify(Displacement::new(dx, dy)), None);
        }
    }
}
