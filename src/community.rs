//! The shared registry of people and places.
//!
//! A [`Community`] owns every [`Person`] and every [`Place`]; everything else refers to them by
//! [`PersonId`] and [`PlaceRef`]. Locks are always taken in the order population, places,
//! containment.

use crate::containment::{self, DiseaseContainment};
use crate::disease::Disease;
use crate::error::{SimError, SimResult};
use crate::ids::{PersonId, PlaceId};
use crate::infection::{DayOutcome, SeirState};
use crate::person::Person;
use crate::place::{Place, PlaceRef, PlaceType};
use crate::report::Snapshot;
use crate::states::PersonState;
use crate::time::SimTime;
use rand::Rng;
use rand::seq::IndexedRandom;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

type Population = BTreeMap<PersonId, Person>;

/// Place collections of a community, one per place type.
#[derive(Debug, Default)]
pub struct Places {
    homes: Vec<Place>,
    supply_stores: Vec<Place>,
    workplaces: Vec<Place>,
    schools: Vec<Place>,
    hardware_stores: Vec<Place>,
    morgues: Vec<Place>,
    travel: Option<Place>,

    index: HashMap<PlaceId, usize>,
}

impl Places {
    pub fn of_type(&self, kind: PlaceType) -> &[Place] {
        match kind {
            PlaceType::Home => &self.homes,
            PlaceType::Supply => &self.supply_stores,
            PlaceType::Workplace => &self.workplaces,
            PlaceType::School => &self.schools,
            PlaceType::HardwareStore => &self.hardware_stores,
            PlaceType::Morgue => &self.morgues,
            PlaceType::Travel => self.travel.as_slice(),
        }
    }

    fn of_type_mut(&mut self, kind: PlaceType) -> &mut [Place] {
        match kind {
            PlaceType::Home => &mut self.homes,
            PlaceType::Supply => &mut self.supply_stores,
            PlaceType::Workplace => &mut self.workplaces,
            PlaceType::School => &mut self.schools,
            PlaceType::HardwareStore => &mut self.hardware_stores,
            PlaceType::Morgue => &mut self.morgues,
            PlaceType::Travel => self.travel.as_mut_slice(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Place> {
        self.homes
            .iter()
            .chain(&self.supply_stores)
            .chain(&self.workplaces)
            .chain(&self.schools)
            .chain(&self.hardware_stores)
            .chain(&self.morgues)
            .chain(&self.travel)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn get(&self, place: PlaceRef) -> Option<&Place> {
        let &idx = self.index.get(&place.id)?;
        self.of_type(place.kind).get(idx)
    }

    fn get_mut(&mut self, place: PlaceRef) -> Option<&mut Place> {
        let &idx = self.index.get(&place.id)?;
        self.of_type_mut(place.kind).get_mut(idx)
    }

    /// A uniformly random place of type `kind`.
    pub fn pick<R: Rng>(&self, kind: PlaceType, rng: &mut R) -> SimResult<PlaceRef> {
        self.of_type(kind)
            .choose(rng)
            .map(Place::place_ref)
            .ok_or_else(|| SimError::NotFound(format!("no place of type {kind:?}")))
    }

    fn insert(&mut self, place: Place) -> SimResult<PlaceRef> {
        let place_ref = place.place_ref();
        if self.index.contains_key(&place_ref.id) {
            return Err(SimError::InvalidState(format!("{place_ref} added twice")));
        }
        let idx = match place_ref.kind {
            PlaceType::Travel => {
                if let Some(travel) = &self.travel {
                    return Err(SimError::InvalidState(format!(
                        "travel location already set to {}",
                        travel.place_ref()
                    )));
                }
                self.travel = Some(place);
                0
            }
            PlaceType::Home => push(&mut self.homes, place),
            PlaceType::Supply => push(&mut self.supply_stores, place),
            PlaceType::Workplace => push(&mut self.workplaces, place),
            PlaceType::School => push(&mut self.schools, place),
            PlaceType::HardwareStore => push(&mut self.hardware_stores, place),
            PlaceType::Morgue => push(&mut self.morgues, place),
        };
        self.index.insert(place_ref.id, idx);
        Ok(place_ref)
    }

    fn enroll(&mut self, id: PersonId, place: PlaceRef) -> SimResult<()> {
        let place = self
            .get_mut(place)
            .ok_or_else(|| SimError::NotFound(format!("{place} is not part of the community")))?;
        place.add_person(id);
        Ok(())
    }

    fn withdraw(&mut self, id: PersonId, place: PlaceRef) -> SimResult<()> {
        let removed = self
            .get_mut(place)
            .is_some_and(|place| place.remove_person(id));
        if !removed {
            return Err(SimError::NotFound(format!("{id} is not at {place}")));
        }
        Ok(())
    }
}

/// A population, its places and the containment policy in force.
#[derive(Debug, Default)]
pub struct Community {
    population: RwLock<Population>,
    places: RwLock<Places>,
    containment: RwLock<DiseaseContainment>,
}

impl Community {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_population(&self) -> SimResult<RwLockReadGuard<'_, Population>> {
        self.population
            .read()
            .map_err(|_| SimError::LockPoisoned("population"))
    }

    fn write_population(&self) -> SimResult<RwLockWriteGuard<'_, Population>> {
        self.population
            .write()
            .map_err(|_| SimError::LockPoisoned("population"))
    }

    fn read_places(&self) -> SimResult<RwLockReadGuard<'_, Places>> {
        self.places
            .read()
            .map_err(|_| SimError::LockPoisoned("places"))
    }

    fn write_places(&self) -> SimResult<RwLockWriteGuard<'_, Places>> {
        self.places
            .write()
            .map_err(|_| SimError::LockPoisoned("places"))
    }

    pub fn add_place(&self, place: Place) -> SimResult<PlaceRef> {
        self.write_places()?.insert(place)
    }

    /// Register `person` and enroll them at their current whereabouts.
    pub fn add_person(&self, person: Person) -> SimResult<()> {
        let mut population = self.write_population()?;
        let mut places = self.write_places()?;
        insert_person(&mut population, &mut places, person)
    }

    pub fn add_population(&self, people: impl IntoIterator<Item = Person>) -> SimResult<()> {
        let mut population = self.write_population()?;
        let mut places = self.write_places()?;
        for person in people {
            insert_person(&mut population, &mut places, person)?;
        }
        Ok(())
    }

    /// Remove a person, if present, together with their roster entry.
    pub fn remove_person(&self, id: PersonId) -> SimResult<Option<Person>> {
        match self.transfer_person(id) {
            Ok(person) => Ok(Some(person)),
            Err(SimError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Hand a person over to another community.
    ///
    /// Lookup and removal happen under one exclusive section.
    pub fn transfer_person(&self, id: PersonId) -> SimResult<Person> {
        let mut population = self.write_population()?;
        let mut places = self.write_places()?;
        let person = population
            .get(&id)
            .ok_or_else(|| SimError::NotFound(format!("{id} is not part of the community")))?;
        places.withdraw(id, person.whereabouts())?;
        population
            .remove(&id)
            .ok_or_else(|| SimError::NotFound(format!("{id} vanished during transfer")))
    }

    /// Register a person arriving from another community at the travel location.
    pub fn receive_traveler(&self, mut person: Person) -> SimResult<PlaceRef> {
        let mut population = self.write_population()?;
        let mut places = self.write_places()?;
        let travel = places
            .travel
            .as_ref()
            .map(Place::place_ref)
            .ok_or_else(|| SimError::NotFound("no travel location".to_string()))?;
        person.set_whereabouts(travel);
        insert_person(&mut population, &mut places, person)?;
        Ok(travel)
    }

    /// Move `id` to the place chosen by `pick`, then apply `mutate` to them.
    ///
    /// Everything runs under the population and places write locks, so no reader ever sees
    /// the person in zero or two rosters. Nothing changes on failure.
    pub(crate) fn relocate<P, F>(
        &self,
        id: PersonId,
        destination: PlaceType,
        pick: P,
        mutate: F,
    ) -> SimResult<PlaceRef>
    where
        P: FnOnce(&Person, &Places) -> SimResult<PlaceRef>,
        F: FnOnce(&mut Person),
    {
        let mut population = self.write_population()?;
        let mut places = self.write_places()?;
        let person = population
            .get_mut(&id)
            .ok_or_else(|| SimError::NotFound(format!("{id} is not part of the community")))?;

        if !person.is_alive() && destination != PlaceType::Morgue {
            return Err(SimError::InvalidState(format!(
                "{id} is dead and can only go to a morgue"
            )));
        }
        if person.is_quarantined() && !matches!(destination, PlaceType::Home | PlaceType::Morgue)
        {
            return Err(SimError::InvalidState(format!(
                "{id} is quarantined and must stay home"
            )));
        }

        let target = pick(&*person, &*places)?;
        if target.kind != destination || places.get(target).is_none() {
            return Err(SimError::NotFound(format!(
                "{target} is not a {destination:?} of the community"
            )));
        }

        let source = person.whereabouts();
        places.withdraw(id, source)?;
        places.enroll(id, target)?;
        person.set_whereabouts(target);
        mutate(person);
        Ok(target)
    }

    fn transfer_to_assigned(
        &self,
        id: PersonId,
        destination: PlaceType,
        assigned: fn(&Person) -> Option<PlaceRef>,
    ) -> SimResult<PlaceRef> {
        self.relocate(
            id,
            destination,
            |person, _| {
                assigned(person).ok_or_else(|| {
                    SimError::NotFound(format!("{id} has no assigned {destination:?}"))
                })
            },
            |_| {},
        )
    }

    pub fn transfer_to_home(&self, id: PersonId) -> SimResult<PlaceRef> {
        self.transfer_to_assigned(id, PlaceType::Home, |person| Some(person.home()))
    }

    pub fn transfer_to_work(&self, id: PersonId) -> SimResult<PlaceRef> {
        self.transfer_to_assigned(id, PlaceType::Workplace, Person::workplace)
    }

    pub fn transfer_to_school(&self, id: PersonId) -> SimResult<PlaceRef> {
        self.transfer_to_assigned(id, PlaceType::School, Person::school)
    }

    pub fn transfer_to_supply_store<R: Rng>(&self, id: PersonId, rng: &mut R) -> SimResult<PlaceRef> {
        self.transfer_to_random(id, PlaceType::Supply, rng)
    }

    pub fn transfer_to_hardware_store<R: Rng>(
        &self,
        id: PersonId,
        rng: &mut R,
    ) -> SimResult<PlaceRef> {
        self.transfer_to_random(id, PlaceType::HardwareStore, rng)
    }

    pub fn transfer_to_morgue<R: Rng>(&self, id: PersonId, rng: &mut R) -> SimResult<PlaceRef> {
        self.transfer_to_random(id, PlaceType::Morgue, rng)
    }

    pub fn transfer_to_travel_location(&self, id: PersonId) -> SimResult<PlaceRef> {
        self.relocate(
            id,
            PlaceType::Travel,
            |_, places| {
                places
                    .travel
                    .as_ref()
                    .map(Place::place_ref)
                    .ok_or_else(|| SimError::NotFound("no travel location".to_string()))
            },
            |_| {},
        )
    }

    fn transfer_to_random<R: Rng>(
        &self,
        id: PersonId,
        destination: PlaceType,
        rng: &mut R,
    ) -> SimResult<PlaceRef> {
        self.relocate(
            id,
            destination,
            |_, places| places.pick(destination, rng),
            |_| {},
        )
    }

    fn random_place<R: Rng>(&self, kind: PlaceType, rng: &mut R) -> SimResult<Option<PlaceRef>> {
        let places = self.read_places()?;
        Ok(places.of_type(kind).choose(rng).map(Place::place_ref))
    }

    pub fn get_supply_store<R: Rng>(&self, rng: &mut R) -> SimResult<Option<PlaceRef>> {
        self.random_place(PlaceType::Supply, rng)
    }

    pub fn get_hardware_store<R: Rng>(&self, rng: &mut R) -> SimResult<Option<PlaceRef>> {
        self.random_place(PlaceType::HardwareStore, rng)
    }

    pub fn get_morgue<R: Rng>(&self, rng: &mut R) -> SimResult<Option<PlaceRef>> {
        self.random_place(PlaceType::Morgue, rng)
    }

    pub fn travel_location(&self) -> SimResult<Option<PlaceRef>> {
        Ok(self.read_places()?.travel.as_ref().map(Place::place_ref))
    }

    pub fn place_count(&self, kind: PlaceType) -> SimResult<usize> {
        Ok(self.read_places()?.of_type(kind).len())
    }

    /// Read access to one place.
    pub fn with_place<T>(&self, place: PlaceRef, f: impl FnOnce(&Place) -> T) -> SimResult<T> {
        let places = self.read_places()?;
        let place = places
            .get(place)
            .ok_or_else(|| SimError::NotFound(format!("{place} is not part of the community")))?;
        Ok(f(place))
    }

    /// Read access to one person.
    pub fn with_person<T>(&self, id: PersonId, f: impl FnOnce(&Person) -> T) -> SimResult<T> {
        let population = self.read_population()?;
        let person = population
            .get(&id)
            .ok_or_else(|| SimError::NotFound(format!("{id} is not part of the community")))?;
        Ok(f(person))
    }

    /// Mutate one person in place. Never use this to change whereabouts.
    pub(crate) fn with_person_mut<T>(
        &self,
        id: PersonId,
        f: impl FnOnce(&mut Person) -> T,
    ) -> SimResult<T> {
        let mut population = self.write_population()?;
        let person = population
            .get_mut(&id)
            .ok_or_else(|| SimError::NotFound(format!("{id} is not part of the community")))?;
        Ok(f(person))
    }

    pub fn population_size(&self) -> SimResult<usize> {
        Ok(self.read_population()?.len())
    }

    pub fn person_ids(&self) -> SimResult<Vec<PersonId>> {
        Ok(self.read_population()?.keys().copied().collect())
    }

    /// Ids of everyone matching `filter`, in id order.
    pub fn person_ids_where(&self, filter: impl Fn(&Person) -> bool) -> SimResult<Vec<PersonId>> {
        Ok(self
            .read_population()?
            .values()
            .filter(|person| filter(person))
            .map(Person::id)
            .collect())
    }

    /// Test a person for their disease and quarantine them on a positive result.
    ///
    /// People without a disease always test negative.
    pub fn test_station<R: Rng>(&self, id: PersonId, rng: &mut R) -> SimResult<bool> {
        let accuracy = self.with_person(id, |person| {
            person
                .infection()
                .disease()
                .map(|disease| disease.test_accuracy())
        })?;
        let Some(accuracy) = accuracy else {
            return Ok(false);
        };
        if !rng.random_bool(accuracy) {
            return Ok(false);
        }
        log::debug!("{id} tested positive");
        containment::quarantine(self, id)?;
        Ok(true)
    }

    pub fn containment_measures(&self) -> SimResult<DiseaseContainment> {
        self.containment
            .read()
            .map(|measures| *measures)
            .map_err(|_| SimError::LockPoisoned("containment"))
    }

    pub fn update_containment<T>(&self, f: impl FnOnce(&mut DiseaseContainment) -> T) -> SimResult<T> {
        let mut measures = self
            .containment
            .write()
            .map_err(|_| SimError::LockPoisoned("containment"))?;
        Ok(f(&mut measures))
    }

    /// Run one hour of a person's life.
    ///
    /// On a new day the infection advances first under the population write lock. The next
    /// state is decided under the read lock and entered afterwards. The dead are sent to a
    /// morgue from wherever they are. Returns the state entered, if any.
    pub fn update_person<R: Rng>(
        &self,
        id: PersonId,
        time: SimTime,
        rng: &mut R,
    ) -> SimResult<Option<PersonState>> {
        let measures = self.containment_measures()?;
        if time.is_new_day() {
            let mut population = self.write_population()?;
            let person = population
                .get_mut(&id)
                .ok_or_else(|| SimError::NotFound(format!("{id} is not part of the community")))?;
            if person.is_alive() && person.start_day(&measures, rng) == DayOutcome::Died {
                log::debug!("{id} died of {}", person.infection().disease_name());
            }
        }

        let next = {
            let population = self.read_population()?;
            let person = population
                .get(&id)
                .ok_or_else(|| SimError::NotFound(format!("{id} is not part of the community")))?;
            let kind = person.whereabouts().kind;
            if !person.is_alive() {
                (kind != PlaceType::Morgue).then_some(PersonState::Morgue)
            } else {
                let Some(current) = PersonState::from_place(kind) else {
                    return Ok(None);
                };
                current.handle_state_change(person, time, &measures, rng)
            }
        };
        match next {
            Some(state) => {
                state.enter(self, id, time, rng)?;
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    /// Infect up to `count` random susceptible living people.
    ///
    /// Returns how many were infected.
    pub fn seed_infection<R: Rng>(
        &self,
        disease: &Arc<Disease>,
        count: usize,
        rng: &mut R,
    ) -> SimResult<usize> {
        let mut population = self.write_population()?;
        let candidates: Vec<PersonId> = population
            .values()
            .filter(|person| person.is_alive() && person.infection().is_susceptible())
            .map(Person::id)
            .collect();
        let chosen: Vec<PersonId> = candidates.choose_multiple(rng, count).copied().collect();
        for id in &chosen {
            if let Some(person) = population.get_mut(id) {
                person.contaminate(disease.clone(), rng)?;
            }
        }
        Ok(chosen.len())
    }

    /// Let infectious people meet co-located susceptible people.
    ///
    /// Each infectious person meets up to `max_contacts` random susceptible people at their
    /// place. A cap of at least the place's size pairs every infectious person with every
    /// susceptible one. Morgues and the dead take no part. Returns the number of new infections.
    pub fn resolve_contacts<R: Rng>(&self, max_contacts: usize, rng: &mut R) -> SimResult<usize> {
        let mut population = self.write_population()?;
        let places = self.read_places()?;
        let measures = self.containment_measures()?;

        let mut n_infections = 0;
        for place in places.iter() {
            if place.kind() == PlaceType::Morgue || place.person_count() < 2 {
                continue;
            }
            let mut sources = Vec::new();
            let mut targets = Vec::new();
            for &id in place.occupants() {
                let Some(person) = population.get(&id) else {
                    continue;
                };
                if !person.is_alive() {
                    continue;
                }
                if person.infection().is_infectious() {
                    sources.push(id);
                } else if person.infection().is_susceptible() {
                    targets.push(id);
                }
            }
            // Roster order depends on thread interleaving; id order does not.
            sources.sort_unstable();
            targets.sort_unstable();

            for source_id in sources {
                if targets.is_empty() {
                    break;
                }
                let Some(source) = population.get(&source_id) else {
                    continue;
                };
                let Some(disease) = source.infection().disease().cloned() else {
                    continue;
                };
                let contacts: Vec<PersonId> =
                    targets.choose_multiple(rng, max_contacts).copied().collect();

                let mut infected = Vec::new();
                for target_id in contacts {
                    let Some(target) = population.get(&target_id) else {
                        continue;
                    };
                    let acceptance = target.behavior().acceptance_factor;
                    let Some(source) = population.get(&source_id) else {
                        continue;
                    };
                    if source.infection().will_infect(acceptance, &measures, rng) {
                        infected.push(target_id);
                    }
                }

                for target_id in &infected {
                    if let Some(target) = population.get_mut(target_id) {
                        target.contaminate(disease.clone(), rng)?;
                        log::trace!("{source_id} infected {target_id} at {}", place.place_ref());
                    }
                }
                if let Some(source) = population.get_mut(&source_id) {
                    for _ in 0..infected.len() {
                        source.infection_mut().increase_spread_count();
                    }
                }
                n_infections += infected.len();
                targets.retain(|id| !infected.contains(id));
            }
        }
        Ok(n_infections)
    }

    /// Counts of the population by health and quarantine status.
    pub fn snapshot(&self, day: u32) -> SimResult<Snapshot> {
        let population = self.read_population()?;
        let mut snapshot = Snapshot {
            day,
            ..Snapshot::default()
        };
        for person in population.values() {
            let infection = person.infection();
            if infection.has_disease() || infection.has_recovered() || !person.is_alive() {
                snapshot.total_infections += 1;
            }
            if !person.is_alive() {
                snapshot.dead += 1;
                continue;
            }
            match infection.seir_state() {
                SeirState::Susceptible => snapshot.susceptible += 1,
                SeirState::Exposed => snapshot.exposed += 1,
                SeirState::Infectious => snapshot.infectious += 1,
                SeirState::Recovered => snapshot.recovered += 1,
            }
            if person.is_quarantined() {
                snapshot.quarantined += 1;
            }
            if infection.has_symptoms() {
                snapshot.symptomatic += 1;
            }
        }
        Ok(snapshot)
    }

    /// Check that every person is listed exactly once, at their recorded whereabouts.
    pub fn verify_rosters(&self) -> SimResult<()> {
        let population = self.read_population()?;
        let places = self.read_places()?;

        let mut n_listed = 0;
        for place in places.iter() {
            for id in place.occupants() {
                n_listed += 1;
                let person = population.get(id).ok_or_else(|| {
                    SimError::InvalidState(format!("{} lists unknown {id}", place.place_ref()))
                })?;
                if person.whereabouts() != place.place_ref() {
                    return Err(SimError::InvalidState(format!(
                        "{id} is listed at {} but recorded at {}",
                        place.place_ref(),
                        person.whereabouts()
                    )));
                }
            }
        }
        if n_listed != population.len() {
            return Err(SimError::InvalidState(format!(
                "{n_listed} roster entries for {} people",
                population.len()
            )));
        }
        Ok(())
    }
}

fn push(places: &mut Vec<Place>, place: Place) -> usize {
    places.push(place);
    places.len() - 1
}

fn insert_person(population: &mut Population, places: &mut Places, person: Person) -> SimResult<()> {
    let id = person.id();
    if population.contains_key(&id) {
        return Err(SimError::InvalidState(format!("{id} added twice")));
    }
    places.enroll(id, person.whereabouts())?;
    population.insert(id, person);
    Ok(())
}
