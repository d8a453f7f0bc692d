//! Community-wide containment measures and quarantine handling.

use crate::community::Community;
use crate::error::SimResult;
use crate::ids::PersonId;
use crate::place::{PlaceRef, PlaceType};
use serde::{Deserialize, Serialize};

/// Share of jobs that cannot be done from home.
pub const JOBS_NO_WORK_FROM_HOME: f64 = 0.5;

/// Share of jobs still attended during a lockdown, those needed to keep people supplied.
pub const JOBS_MANDATORY_TO_SUPPLY: f64 = 0.1;

/// A single toggleable measure, as named in scenario files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    Shops,
    WorkFromHome,
    Lockdown,
    MaskMandate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiseaseContainment {
    shops_open: bool,
    mass_working_from_home: bool,
    lockdown: bool,
    mask_mandate: bool,
}

impl Default for DiseaseContainment {
    fn default() -> Self {
        Self {
            shops_open: true,
            mass_working_from_home: false,
            lockdown: false,
            mask_mandate: false,
        }
    }
}

impl DiseaseContainment {
    pub fn toggle_shops(&mut self) {
        self.shops_open = !self.shops_open;
    }

    pub fn toggle_working_from_home(&mut self) {
        self.mass_working_from_home = !self.mass_working_from_home;
    }

    pub fn toggle_lockdown(&mut self) {
        self.lockdown = !self.lockdown;
    }

    pub fn toggle_mask_mandate(&mut self) {
        self.mask_mandate = !self.mask_mandate;
    }

    pub fn toggle(&mut self, measure: Measure) {
        match measure {
            Measure::Shops => self.toggle_shops(),
            Measure::WorkFromHome => self.toggle_working_from_home(),
            Measure::Lockdown => self.toggle_lockdown(),
            Measure::MaskMandate => self.toggle_mask_mandate(),
        }
    }

    pub fn shops_are_open(&self) -> bool {
        self.shops_open
    }

    pub fn working_from_home(&self) -> bool {
        self.mass_working_from_home
    }

    pub fn is_lockdown(&self) -> bool {
        self.lockdown
    }

    pub fn is_mask_mandate(&self) -> bool {
        self.mask_mandate
    }

    pub fn schools_open(&self) -> bool {
        !self.lockdown
    }

    /// Probability that a worker has to show up at the workplace on a given day.
    pub fn work_attendance_probability(&self) -> f64 {
        if self.lockdown {
            JOBS_MANDATORY_TO_SUPPLY
        } else if self.mass_working_from_home {
            JOBS_NO_WORK_FROM_HOME
        } else {
            1.0
        }
    }
}

/// Put a person under quarantine and send them home right away.
pub fn quarantine(community: &Community, id: PersonId) -> SimResult<PlaceRef> {
    let home = community.relocate(
        id,
        PlaceType::Home,
        |person, _| Ok(person.home()),
        |person| person.set_quarantined(true),
    )?;
    log::debug!("{id} quarantined at {home}");
    Ok(home)
}

/// Lift the quarantine of a person whose infection has cleared.
///
/// Returns whether the quarantine was lifted.
pub fn release_when_recovered(community: &Community, id: PersonId) -> SimResult<bool> {
    community.with_person_mut(id, |person| {
        if person.is_quarantined() && person.infection().has_recovered() {
            person.set_quarantined(false);
            true
        } else {
            false
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggles_flip_flags() {
        let mut measures = DiseaseContainment::default();
        assert!(measures.shops_are_open());
        measures.toggle(Measure::Shops);
        measures.toggle(Measure::MaskMandate);
        assert!(!measures.shops_are_open());
        assert!(measures.is_mask_mandate());
        measures.toggle(Measure::MaskMandate);
        assert!(!measures.is_mask_mandate());
    }

    #[test]
    fn lockdown_outranks_work_from_home() {
        let mut measures = DiseaseContainment::default();
        assert_eq!(measures.work_attendance_probability(), 1.0);
        measures.toggle_working_from_home();
        assert_eq!(measures.work_attendance_probability(), JOBS_NO_WORK_FROM_HOME);
        measures.toggle_lockdown();
        assert_eq!(measures.work_attendance_probability(), JOBS_MANDATORY_TO_SUPPLY);
        assert!(!measures.schools_open());
    }
}
