//! Simulated people.

use crate::containment::DiseaseContainment;
use crate::disease::{AgeGroup, Disease};
use crate::error::{SimError, SimResult};
use crate::ids::PersonId;
use crate::infection::{DayOutcome, Infection};
use crate::place::PlaceRef;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    Male,
    Female,
}

/// Scheduling policy of one person.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PersonBehavior {
    /// Days between grocery runs.
    pub food_buy_interval: u32,
    /// Days between hardware store visits.
    pub hardware_buy_interval: u32,
    /// Probability of going shopping in a shop hour once an interval has elapsed.
    pub buy_compliance: f64,
    /// Caution during contacts, from 0 (careless) to 1 (careful).
    pub acceptance_factor: f64,
}

impl PersonBehavior {
    pub fn new(
        food_buy_interval: u32,
        hardware_buy_interval: u32,
        buy_compliance: f64,
        acceptance_factor: f64,
    ) -> SimResult<Self> {
        for (days, what) in [
            (food_buy_interval, "food buy interval"),
            (hardware_buy_interval, "hardware buy interval"),
        ] {
            if days == 0 {
                return Err(SimError::InvalidArgument(format!(
                    "{what} must be at least one day"
                )));
            }
        }
        for (val, what) in [
            (buy_compliance, "buy compliance"),
            (acceptance_factor, "acceptance factor"),
        ] {
            if !(0.0..=1.0).contains(&val) {
                return Err(SimError::InvalidArgument(format!(
                    "{what} must be in [0, 1], but is {val}"
                )));
            }
        }
        Ok(Self {
            food_buy_interval,
            hardware_buy_interval,
            buy_compliance,
            acceptance_factor,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Person {
    id: PersonId,
    age_group: AgeGroup,
    sex: Sex,
    infection: Infection,
    behavior: PersonBehavior,

    home: PlaceRef,
    whereabouts: PlaceRef,
    workplace: Option<PlaceRef>,
    school: Option<PlaceRef>,

    quarantined: bool,
    alive: bool,

    last_food_buy: Option<u32>,
    last_hardware_buy: Option<u32>,
    attends_work_today: bool,
}

impl PartialEq for Person {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Person {
    /// Create a healthy person who starts out at home.
    pub fn new(age_group: AgeGroup, sex: Sex, behavior: PersonBehavior, home: PlaceRef) -> Self {
        Self {
            id: PersonId::next(),
            age_group,
            sex,
            infection: Infection::new(),
            behavior,
            home,
            whereabouts: home,
            workplace: None,
            school: None,
            quarantined: false,
            alive: true,
            last_food_buy: None,
            last_hardware_buy: None,
            attends_work_today: true,
        }
    }

    pub fn id(&self) -> PersonId {
        self.id
    }

    pub fn age_group(&self) -> AgeGroup {
        self.age_group
    }

    pub fn sex(&self) -> Sex {
        self.sex
    }

    pub fn infection(&self) -> &Infection {
        &self.infection
    }

    pub(crate) fn infection_mut(&mut self) -> &mut Infection {
        &mut self.infection
    }

    pub fn behavior(&self) -> &PersonBehavior {
        &self.behavior
    }

    pub fn home(&self) -> PlaceRef {
        self.home
    }

    pub fn whereabouts(&self) -> PlaceRef {
        self.whereabouts
    }

    pub fn workplace(&self) -> Option<PlaceRef> {
        self.workplace
    }

    pub fn school(&self) -> Option<PlaceRef> {
        self.school
    }

    pub fn set_workplace(&mut self, workplace: PlaceRef) {
        self.workplace = Some(workplace);
    }

    pub fn set_school(&mut self, school: PlaceRef) {
        self.school = Some(school);
    }

    pub fn is_quarantined(&self) -> bool {
        self.quarantined
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn attends_work_today(&self) -> bool {
        self.attends_work_today
    }

    pub fn contaminate<R: Rng>(&mut self, disease: Arc<Disease>, rng: &mut R) -> SimResult<()> {
        self.infection.contaminate(disease, self.age_group, rng)
    }

    /// Daily bookkeeping: advance the infection and decide whether to go to work today.
    pub fn start_day<R: Rng>(&mut self, measures: &DiseaseContainment, rng: &mut R) -> DayOutcome {
        if !self.alive {
            return DayOutcome::Survived;
        }
        let outcome = self.infection.update(true, rng);
        if outcome == DayOutcome::Died {
            self.kill();
            return outcome;
        }
        self.attends_work_today = rng.random_bool(measures.work_attendance_probability());
        outcome
    }

    pub fn food_buy_due(&self, day: u32) -> bool {
        interval_elapsed(self.last_food_buy, self.behavior.food_buy_interval, day)
    }

    pub fn hardware_buy_due(&self, day: u32) -> bool {
        interval_elapsed(self.last_hardware_buy, self.behavior.hardware_buy_interval, day)
    }

    pub(crate) fn record_food_buy(&mut self, day: u32) {
        self.last_food_buy = Some(day);
    }

    pub(crate) fn record_hardware_buy(&mut self, day: u32) {
        self.last_hardware_buy = Some(day);
    }

    pub(crate) fn set_whereabouts(&mut self, place: PlaceRef) {
        self.whereabouts = place;
    }

    pub(crate) fn set_quarantined(&mut self, quarantined: bool) {
        self.quarantined = quarantined;
    }

    pub(crate) fn kill(&mut self) {
        self.alive = false;
    }
}

fn interval_elapsed(last: Option<u32>, interval: u32, day: u32) -> bool {
    last.is_none_or(|last| day.saturating_sub(last) >= interval)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disease::tests::deadly_disease;
    use crate::place::{Place, PlaceType};
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;

    fn person(behavior: PersonBehavior) -> Person {
        let home = Place::new(PlaceType::Home).place_ref();
        Person::new(AgeGroup::UnderThirty, Sex::Female, behavior, home)
    }

    #[test]
    fn behavior_rejects_bad_values() {
        assert!(PersonBehavior::new(1, 2, 1.0, 0.0).is_ok());
        assert!(PersonBehavior::new(0, 2, 1.0, 0.0).is_err());
        assert!(PersonBehavior::new(1, 0, 1.0, 0.0).is_err());
        assert!(PersonBehavior::new(1, 2, 1.1, 0.0).is_err());
        assert!(PersonBehavior::new(1, 2, 0.5, -0.1).is_err());
    }

    #[test]
    fn buy_intervals_elapse() {
        let mut person = person(PersonBehavior::new(3, 7, 1.0, 0.0).unwrap());
        assert!(person.food_buy_due(0));
        person.record_food_buy(2);
        assert!(!person.food_buy_due(4));
        assert!(person.food_buy_due(5));
        person.record_hardware_buy(0);
        assert!(!person.hardware_buy_due(6));
        assert!(person.hardware_buy_due(7));
    }

    #[test]
    fn dead_people_stop_updating() {
        let mut rng = ChaCha12Rng::seed_from_u64(1);
        let measures = DiseaseContainment::default();
        let mut person = person(PersonBehavior::new(1, 1, 1.0, 0.0).unwrap());
        person
            .contaminate(Arc::new(deadly_disease()), &mut rng)
            .unwrap();
        assert_eq!(person.start_day(&measures, &mut rng), DayOutcome::Survived);
        assert_eq!(person.start_day(&measures, &mut rng), DayOutcome::Died);
        assert!(!person.is_alive());
        let state = person.infection().seir_state();
        for _ in 0..10 {
            assert_eq!(person.start_day(&measures, &mut rng), DayOutcome::Survived);
            assert_eq!(person.infection().seir_state(), state);
        }
    }

    #[test]
    fn attendance_follows_containment() {
        let mut rng = ChaCha12Rng::seed_from_u64(2);
        let mut measures = DiseaseContainment::default();
        measures.toggle_lockdown();
        let mut person = person(PersonBehavior::new(1, 1, 1.0, 0.0).unwrap());
        let n_days = 10_000;
        let n_attended = (0..n_days)
            .filter(|_| {
                person.start_day(&measures, &mut rng);
                person.attends_work_today()
            })
            .count();
        let rate = n_attended as f64 / n_days as f64;
        assert!((rate - 0.1).abs() < 0.02, "rate {rate}");
    }
}
