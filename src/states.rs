//! Hourly schedule of a person as a state machine over place categories.
//!
//! The current state is never stored: it is read off the type of the place a person occupies.
//! [`PersonState::handle_state_change`] decides where to go next and [`PersonState::enter`]
//! performs the move through the community.

use crate::community::Community;
use crate::containment::DiseaseContainment;
use crate::error::SimResult;
use crate::ids::PersonId;
use crate::person::Person;
use crate::place::{PlaceRef, PlaceType};
use crate::time::SimTime;
use rand::Rng;
use std::ops::Range;

pub const SHOP_HOURS: Range<u32> = 7..20;
pub const WORK_HOURS: Range<u32> = 8..17;
pub const SCHOOL_HOURS: Range<u32> = 8..15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PersonState {
    Home,
    Work,
    School,
    FoodBuy,
    HardwareBuy,
    Morgue,
}

impl PersonState {
    /// State of someone present at a place of type `kind`.
    ///
    /// Travelers have no state and are left alone until they are sent back.
    pub fn from_place(kind: PlaceType) -> Option<Self> {
        match kind {
            PlaceType::Home => Some(Self::Home),
            PlaceType::Workplace => Some(Self::Work),
            PlaceType::School => Some(Self::School),
            PlaceType::Supply => Some(Self::FoodBuy),
            PlaceType::HardwareStore => Some(Self::HardwareBuy),
            PlaceType::Morgue => Some(Self::Morgue),
            PlaceType::Travel => None,
        }
    }

    pub fn place_type(self) -> PlaceType {
        match self {
            Self::Home => PlaceType::Home,
            Self::Work => PlaceType::Workplace,
            Self::School => PlaceType::School,
            Self::FoodBuy => PlaceType::Supply,
            Self::HardwareBuy => PlaceType::HardwareStore,
            Self::Morgue => PlaceType::Morgue,
        }
    }

    /// Decide the state `person` moves into at `time`, or `None` to stay.
    pub fn handle_state_change<R: Rng>(
        self,
        person: &Person,
        time: SimTime,
        measures: &DiseaseContainment,
        rng: &mut R,
    ) -> Option<Self> {
        if !person.is_alive() {
            return (self != Self::Morgue).then_some(Self::Morgue);
        }
        if person.is_quarantined() {
            return (self != Self::Home).then_some(Self::Home);
        }

        let next = match self {
            Self::Home => from_home(person, time, measures, rng),
            Self::Work => {
                let stays = during(WORK_HOURS, time)
                    && time.weekday.is_workday()
                    && person.attends_work_today();
                (!stays).then(|| errand(person, time, measures, rng).unwrap_or(Self::Home))
            }
            Self::School => {
                let stays =
                    during(SCHOOL_HOURS, time) && time.weekday.is_workday() && measures.schools_open();
                (!stays).then(|| errand(person, time, measures, rng).unwrap_or(Self::Home))
            }
            // Shopping is a one-shot visit.
            Self::FoodBuy | Self::HardwareBuy => Some(Self::Home),
            Self::Morgue => None,
        };
        next.filter(|&next| next != self)
    }

    /// Move `id` into the place this state stands for.
    pub fn enter<R: Rng>(
        self,
        community: &Community,
        id: PersonId,
        time: SimTime,
        rng: &mut R,
    ) -> SimResult<PlaceRef> {
        match self {
            Self::Home => community.transfer_to_home(id),
            Self::Work => community.transfer_to_work(id),
            Self::School => community.transfer_to_school(id),
            Self::FoodBuy => community.relocate(
                id,
                PlaceType::Supply,
                |_, places| places.pick(PlaceType::Supply, rng),
                |person| person.record_food_buy(time.day),
            ),
            Self::HardwareBuy => community.relocate(
                id,
                PlaceType::HardwareStore,
                |_, places| places.pick(PlaceType::HardwareStore, rng),
                |person| person.record_hardware_buy(time.day),
            ),
            Self::Morgue => community.transfer_to_morgue(id, rng),
        }
    }
}

fn during(window: Range<u32>, time: SimTime) -> bool {
    window.contains(&time.hour)
}

fn from_home<R: Rng>(
    person: &Person,
    time: SimTime,
    measures: &DiseaseContainment,
    rng: &mut R,
) -> Option<PersonState> {
    if time.weekday.is_workday() {
        if during(WORK_HOURS, time) && person.workplace().is_some() && person.attends_work_today()
        {
            return Some(PersonState::Work);
        }
        if during(SCHOOL_HOURS, time) && person.school().is_some() && measures.schools_open() {
            return Some(PersonState::School);
        }
    }
    errand(person, time, measures, rng)
}

fn errand<R: Rng>(
    person: &Person,
    time: SimTime,
    measures: &DiseaseContainment,
    rng: &mut R,
) -> Option<PersonState> {
    food_errand(person, time, rng).or_else(|| hardware_errand(person, time, measures, rng))
}

fn shop_hours(time: SimTime) -> bool {
    time.weekday.is_shopping_day() && during(SHOP_HOURS, time)
}

// Supply stores count as essential and stay open when shops close.
fn food_errand<R: Rng>(person: &Person, time: SimTime, rng: &mut R) -> Option<PersonState> {
    let goes = shop_hours(time)
        && person.food_buy_due(time.day)
        && rng.random_bool(person.behavior().buy_compliance);
    goes.then_some(PersonState::FoodBuy)
}

fn hardware_errand<R: Rng>(
    person: &Person,
    time: SimTime,
    measures: &DiseaseContainment,
    rng: &mut R,
) -> Option<PersonState> {
    let goes = shop_hours(time)
        && measures.shops_are_open()
        && person.hardware_buy_due(time.day)
        && rng.random_bool(person.behavior().buy_compliance);
    goes.then_some(PersonState::HardwareBuy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disease::AgeGroup;
    use crate::person::{PersonBehavior, Sex};
    use crate::place::Place;
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;

    fn rng() -> ChaCha12Rng {
        ChaCha12Rng::seed_from_u64(7)
    }

    fn person(food: u32, hardware: u32, compliance: f64) -> Person {
        let behavior = PersonBehavior::new(food, hardware, compliance, 0.0).unwrap();
        let home = Place::new(PlaceType::Home).place_ref();
        Person::new(AgeGroup::UnderTwenty, Sex::Male, behavior, home)
    }

    fn monday(hour: u32) -> SimTime {
        SimTime::new(0, hour).unwrap()
    }

    #[test]
    fn due_food_buy_leaves_home_then_returns() {
        let mut rng = rng();
        let measures = DiseaseContainment::default();
        let shopper = person(1, 5, 1.0);
        let next = PersonState::Home.handle_state_change(&shopper, monday(8), &measures, &mut rng);
        assert_eq!(next, Some(PersonState::FoodBuy));
        let back = PersonState::FoodBuy.handle_state_change(&shopper, monday(9), &measures, &mut rng);
        assert_eq!(back, Some(PersonState::Home));
    }

    #[test]
    fn store_visits_are_one_shot() {
        let mut rng = rng();
        let measures = DiseaseContainment::default();
        let shopper = person(1, 1, 1.0);
        for state in [PersonState::FoodBuy, PersonState::HardwareBuy] {
            for hour in SHOP_HOURS {
                let next = state.handle_state_change(&shopper, monday(hour), &measures, &mut rng);
                assert_eq!(next, Some(PersonState::Home), "{state:?} at hour {hour}");
            }
        }
    }

    #[test]
    fn eager_shopper_gets_home_within_two_hours() {
        let mut rng = rng();
        let measures = DiseaseContainment::default();
        let mut shopper = person(1, 1, 1.0);
        let mut state = PersonState::Home;
        let mut hours_away = 0;
        for hour in SHOP_HOURS {
            let next = state.handle_state_change(&shopper, monday(hour), &measures, &mut rng);
            if let Some(next) = next {
                match next {
                    PersonState::FoodBuy => shopper.record_food_buy(0),
                    PersonState::HardwareBuy => shopper.record_hardware_buy(0),
                    _ => {}
                }
                state = next;
            }
            if state == PersonState::Home {
                hours_away = 0;
            } else {
                hours_away += 1;
                assert!(hours_away < 2, "{state:?} at hour {hour}");
            }
        }
        assert_eq!(state, PersonState::Home);
        assert!(!shopper.food_buy_due(0));
        assert!(!shopper.hardware_buy_due(0));
    }

    #[test]
    fn no_shopping_outside_opening_hours() {
        let mut rng = rng();
        let measures = DiseaseContainment::default();
        let shopper = person(1, 1, 1.0);
        for hour in (0..SHOP_HOURS.start).chain(SHOP_HOURS.end..24) {
            let next =
                PersonState::Home.handle_state_change(&shopper, monday(hour), &measures, &mut rng);
            assert_eq!(next, None, "hour {hour}");
        }
        let sunday = SimTime::new(6, 10).unwrap();
        assert_eq!(
            PersonState::Home.handle_state_change(&shopper, sunday, &measures, &mut rng),
            None
        );
    }

    #[test]
    fn work_persists_until_window_ends() {
        let mut rng = rng();
        let measures = DiseaseContainment::default();
        let mut worker = person(1, 1, 0.0);
        worker.set_workplace(Place::new(PlaceType::Workplace).place_ref());

        assert_eq!(
            PersonState::Home.handle_state_change(&worker, monday(8), &measures, &mut rng),
            Some(PersonState::Work)
        );
        for hour in WORK_HOURS {
            let next =
                PersonState::Work.handle_state_change(&worker, monday(hour), &measures, &mut rng);
            assert_eq!(next, None, "hour {hour}");
        }
        assert_eq!(
            PersonState::Work.handle_state_change(&worker, monday(17), &measures, &mut rng),
            Some(PersonState::Home)
        );
        let saturday = SimTime::new(5, 9).unwrap();
        assert_eq!(
            PersonState::Home.handle_state_change(&worker, saturday, &measures, &mut rng),
            None
        );
    }

    #[test]
    fn school_closes_in_lockdown() {
        let mut rng = rng();
        let mut measures = DiseaseContainment::default();
        let mut pupil = person(1, 1, 0.0);
        pupil.set_school(Place::new(PlaceType::School).place_ref());

        assert_eq!(
            PersonState::Home.handle_state_change(&pupil, monday(8), &measures, &mut rng),
            Some(PersonState::School)
        );
        assert_eq!(
            PersonState::School.handle_state_change(&pupil, monday(15), &measures, &mut rng),
            Some(PersonState::Home)
        );
        measures.toggle_lockdown();
        assert_eq!(
            PersonState::Home.handle_state_change(&pupil, monday(9), &measures, &mut rng),
            None
        );
        assert_eq!(
            PersonState::School.handle_state_change(&pupil, monday(9), &measures, &mut rng),
            Some(PersonState::Home)
        );
    }

    #[test]
    fn quarantine_and_death_override_schedule() {
        let mut rng = rng();
        let measures = DiseaseContainment::default();
        let mut agent = person(1, 1, 1.0);
        agent.set_quarantined(true);
        for state in [PersonState::Work, PersonState::FoodBuy, PersonState::School] {
            let next = state.handle_state_change(&agent, monday(10), &measures, &mut rng);
            assert_eq!(next, Some(PersonState::Home));
        }
        assert_eq!(
            PersonState::Home.handle_state_change(&agent, monday(10), &measures, &mut rng),
            None
        );

        agent.kill();
        assert_eq!(
            PersonState::Home.handle_state_change(&agent, monday(10), &measures, &mut rng),
            Some(PersonState::Morgue)
        );
        for hour in [0, 12, 23] {
            let next =
                PersonState::Morgue.handle_state_change(&agent, monday(hour), &measures, &mut rng);
            assert_eq!(next, None);
        }
    }

    #[test]
    fn place_types_round_trip() {
        for state in [
            PersonState::Home,
            PersonState::Work,
            PersonState::School,
            PersonState::FoodBuy,
            PersonState::HardwareBuy,
            PersonState::Morgue,
        ] {
            assert_eq!(PersonState::from_place(state.place_type()), Some(state));
        }
        assert_eq!(PersonState::from_place(PlaceType::Travel), None);
    }
}
