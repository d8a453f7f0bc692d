//! Locations people can occupy.

use crate::ids::{PersonId, PlaceId};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaceType {
    Home,
    Supply,
    Workplace,
    School,
    HardwareStore,
    Morgue,
    Travel,
}

/// Lightweight handle to a place owned by a community.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlaceRef {
    pub id: PlaceId,
    pub kind: PlaceType,
}

impl fmt::Display for PlaceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self.kind, self.id)
    }
}

/// A location and the people currently present in it.
///
/// Places do not own people; the roster only indexes who is there.
#[derive(Debug, Clone)]
pub struct Place {
    id: PlaceId,
    kind: PlaceType,
    occupants: Vec<PersonId>,
}

impl Place {
    pub fn new(kind: PlaceType) -> Self {
        Self {
            id: PlaceId::next(),
            kind,
            occupants: Vec::new(),
        }
    }

    pub fn id(&self) -> PlaceId {
        self.id
    }

    pub fn kind(&self) -> PlaceType {
        self.kind
    }

    pub fn place_ref(&self) -> PlaceRef {
        PlaceRef {
            id: self.id,
            kind: self.kind,
        }
    }

    pub fn occupants(&self) -> &[PersonId] {
        &self.occupants
    }

    pub fn person_count(&self) -> usize {
        self.occupants.len()
    }

    pub fn contains(&self, person: PersonId) -> bool {
        self.occupants.contains(&person)
    }

    pub(crate) fn add_person(&mut self, person: PersonId) {
        self.occupants.push(person);
    }

    /// Remove `person` from the roster, returning whether they were present.
    pub(crate) fn remove_person(&mut self, person: PersonId) -> bool {
        match self.occupants.iter().position(|&p| p == person) {
            Some(idx) => {
                self.occupants.swap_remove(idx);
                true
            }
            None => false,
        }
    }
}
