//! Immutable timed markings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::net::{Net, PlaceId};

/// Token count, dwell age and consumption count of one place.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlaceState {
    pub tokens: u32,
    pub age: f64,
    pub visit_count: u32,
}

impl PlaceState {
    pub fn with_tokens(tokens: u32) -> Self {
        Self {
            tokens,
            ..Self::default()
        }
    }
}

/// A marking over every place of a net.
///
/// Values are never changed in place by the semantics; firing and time
/// passage return new markings. Equality compares tokens, age and visit
/// count of every place.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimeMarking {
    places: BTreeMap<PlaceId, PlaceState>,
}

/// Place states a marking must agree with; places not listed are ignored.
pub type PartialMarking = BTreeMap<PlaceId, PlaceState>;

impl TimeMarking {
    /// All places of `net` empty, ages and visit counts zero.
    pub fn empty(net: &Net) -> Self {
        Self {
            places: net
                .places()
                .map(|place| (place.id, PlaceState::default()))
                .collect(),
        }
    }

    /// Empty marking with the given token counts.
    pub fn with_tokens(net: &Net, tokens: &[(PlaceId, u32)]) -> Self {
        let mut marking = Self::empty(net);
        for (place, count) in tokens {
            marking.state_mut(*place).tokens = *count;
        }
        marking
    }

    pub fn state(&self, place: PlaceId) -> PlaceState {
        self.places.get(&place).copied().unwrap_or_default()
    }

    pub fn tokens(&self, place: PlaceId) -> u32 {
        self.state(place).tokens
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlaceId, &PlaceState)> {
        self.places.iter().map(|(id, state)| (*id, state))
    }

    /// Places holding at least one token.
    pub fn marked_places(&self) -> impl Iterator<Item = PlaceId> {
        self.places
            .iter()
            .filter(|(_, state)| state.tokens > 0)
            .map(|(id, _)| *id)
    }

    /// True if both markings hold the same tokens, ignoring age and visits.
    pub fn same_tokens(&self, other: &TimeMarking) -> bool {
        self.places
            .keys()
            .chain(other.places.keys())
            .all(|id| self.tokens(*id) == other.tokens(*id))
    }

    /// True if every place listed in `partial` has exactly the given state.
    pub fn matches(&self, partial: &PartialMarking) -> bool {
        partial
            .iter()
            .all(|(place, expected)| self.state(*place) == *expected)
    }

    pub(crate) fn state_mut(&mut self, place: PlaceId) -> &mut PlaceState {
        self.places.entry(place).or_default()
    }
}
