use crate::community::Community;
use crate::config::PopulationConfig;
use crate::disease::AgeGroup;
use crate::person::{Person, PersonBehavior, Sex};
use crate::place::{Place, PlaceRef, PlaceType};
use anyhow::{Context, Result};
use rand::prelude::*;
use rand_distr::{Bernoulli, Uniform, weighted::WeightedIndex};

/// Inhabitants served by one supply store.
pub const PEOPLE_PER_SUPPLY_STORE: usize = 500;

/// Inhabitants served by one hardware store.
pub const PEOPLE_PER_HARDWARE_STORE: usize = 2000;

/// Generates a community from population parameters.
pub struct CommunityBuilder<'a> {
    cfg: &'a PopulationConfig,
}

impl<'a> CommunityBuilder<'a> {
    pub fn new(cfg: &'a PopulationConfig) -> Self {
        Self { cfg }
    }

    /// Create the places, then the people living among them.
    pub fn build<R: Rng>(&self, rng: &mut R) -> Result<Community> {
        let cfg = self.cfg;

        let age_dist = WeightedIndex::new(&cfg.age_distribution)?;
        let ages: Vec<AgeGroup> = (0..cfg.size)
            .map(|_| AgeGroup::try_from(age_dist.sample(rng)))
            .collect::<Result<_, _>>()
            .context("failed to sample age groups")?;

        let employed_dist = Bernoulli::new(cfg.employment_rate)?;
        let employed: Vec<bool> = ages
            .iter()
            .map(|age| age.is_working_age() && employed_dist.sample(rng))
            .collect();
        let n_workers = employed.iter().filter(|&&employed| employed).count();
        let n_pupils = ages.iter().filter(|age| age.is_school_age()).count();

        let n_homes = (cfg.size as f64 / cfg.household_size).ceil().max(1.0) as usize;
        let n_workplaces = n_workers.div_ceil(cfg.employees_per_workplace);
        let n_schools = n_pupils.div_ceil(cfg.pupils_per_school);

        let community = Community::new();
        let add_places = |kind: PlaceType, count: usize| -> Result<Vec<PlaceRef>> {
            (0..count)
                .map(|_| community.add_place(Place::new(kind)))
                .collect::<Result<_, _>>()
                .with_context(|| format!("failed to add {kind:?} places"))
        };
        let homes = add_places(PlaceType::Home, n_homes)?;
        let workplaces = add_places(PlaceType::Workplace, n_workplaces)?;
        let schools = add_places(PlaceType::School, n_schools)?;
        add_places(
            PlaceType::Supply,
            cfg.size / PEOPLE_PER_SUPPLY_STORE + 1,
        )?;
        add_places(
            PlaceType::HardwareStore,
            cfg.size / PEOPLE_PER_HARDWARE_STORE + 1,
        )?;
        add_places(PlaceType::Morgue, 1)?;
        add_places(PlaceType::Travel, 1)?;

        let food_dist = Uniform::new_inclusive(cfg.food_buy_interval.0, cfg.food_buy_interval.1)?;
        let hardware_dist =
            Uniform::new_inclusive(cfg.hardware_buy_interval.0, cfg.hardware_buy_interval.1)?;
        let compliance_dist = Uniform::new_inclusive(cfg.buy_compliance.0, cfg.buy_compliance.1)?;
        let acceptance_dist =
            Uniform::new_inclusive(cfg.acceptance_factor.0, cfg.acceptance_factor.1)?;

        let mut people = Vec::with_capacity(cfg.size);
        for (age, employed) in ages.into_iter().zip(employed) {
            let behavior = PersonBehavior::new(
                food_dist.sample(rng),
                hardware_dist.sample(rng),
                compliance_dist.sample(rng),
                acceptance_dist.sample(rng),
            )?;
            let sex = if rng.random_bool(0.5) {
                Sex::Female
            } else {
                Sex::Male
            };
            let &home = homes.choose(rng).context("no homes")?;

            let mut person = Person::new(age, sex, behavior, home);
            if employed {
                let &workplace = workplaces.choose(rng).context("no workplaces")?;
                person.set_workplace(workplace);
            }
            if age.is_school_age() {
                let &school = schools.choose(rng).context("no schools")?;
                person.set_school(school);
            }
            people.push(person);
        }

        community
            .add_population(people)
            .context("failed to add population")?;
        log::info!(
            "generated {} people, {n_homes} homes, {n_workplaces} workplaces, {n_schools} schools",
            cfg.size
        );

        Ok(community)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::config::tests::SMALL_TOWN;
    use rand_chacha::ChaCha12Rng;

    #[test]
    fn places_scale_with_population() {
        let cfg = Config::from_toml(SMALL_TOWN).unwrap();
        let mut rng = ChaCha12Rng::seed_from_u64(21);
        let community = CommunityBuilder::new(&cfg.population).build(&mut rng).unwrap();

        assert_eq!(community.population_size().unwrap(), 300);
        assert_eq!(community.place_count(PlaceType::Home).unwrap(), 120);
        assert_eq!(community.place_count(PlaceType::Supply).unwrap(), 1);
        assert_eq!(community.place_count(PlaceType::HardwareStore).unwrap(), 1);
        assert_eq!(community.place_count(PlaceType::Morgue).unwrap(), 1);
        assert!(community.travel_location().unwrap().is_some());
        community.verify_rosters().unwrap();
    }

    #[test]
    fn assignments_follow_age() {
        let cfg = Config::from_toml(SMALL_TOWN).unwrap();
        let mut rng = ChaCha12Rng::seed_from_u64(22);
        let community = CommunityBuilder::new(&cfg.population).build(&mut rng).unwrap();

        for id in community.person_ids().unwrap() {
            community
                .with_person(id, |person| {
                    assert_eq!(person.whereabouts(), person.home());
                    assert_eq!(person.school().is_some(), person.age_group().is_school_age());
                    if person.workplace().is_some() {
                        assert!(person.age_group().is_working_age());
                    }
                    let behavior = person.behavior();
                    assert!((2..=5).contains(&behavior.food_buy_interval));
                    assert!((0.1..=0.4).contains(&behavior.buy_compliance));
                })
                .unwrap();
        }
        let n_employed = community
            .person_ids_where(|person| person.workplace().is_some())
            .unwrap()
            .len();
        assert!(n_employed > 0);
    }
}
