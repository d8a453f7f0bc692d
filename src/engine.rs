use crate::builder::CommunityBuilder;
use crate::community::Community;
use crate::config::Config;
use crate::containment;
use crate::error::SimError;
use crate::ids::PersonId;
use crate::report::Snapshot;
use crate::time::{HOURS_PER_DAY, SimTime};
use anyhow::{Context, Result, anyhow};
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use rmp_serde::encode;
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
    sync::Arc,
    thread,
};

/// Simulation engine.
///
/// Holds the configuration, the community, the clock and the random number generator,
/// and provides methods to initialize and run simulations.
pub struct Engine {
    cfg: Config,
    community: Community,
    time: SimTime,
    rng: ChaCha12Rng,
}

impl Engine {
    /// Create a new `Engine` with a generated community and the seeded infections.
    pub fn generate_initial_condition(cfg: Config) -> Result<Self> {
        let mut rng = match cfg.simulation.seed {
            Some(seed) => ChaCha12Rng::seed_from_u64(seed),
            None => ChaCha12Rng::try_from_os_rng()?,
        };

        let community = CommunityBuilder::new(&cfg.population)
            .build(&mut rng)
            .context("failed to build community")?;

        let disease = Arc::new(cfg.seed_disease()?);
        let n_seeded = community
            .seed_infection(&disease, cfg.seeding.n_infected, &mut rng)
            .context("failed to seed infection")?;
        log::info!("seeded {n_seeded} infections of {}", disease.name());

        let time = SimTime::new(0, 0)?;

        Ok(Self {
            cfg,
            community,
            time,
            rng,
        })
    }

    pub fn community(&self) -> &Community {
        &self.community
    }

    pub fn time(&self) -> SimTime {
        self.time
    }

    /// Perform the simulation and save one snapshot per day to a binary file.
    pub fn perform_simulation<P: AsRef<Path>>(&mut self, file: P) -> Result<Vec<Snapshot>> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);

        let n_days = self.cfg.simulation.days;
        let mut trajectory = Vec::with_capacity(n_days as usize);
        for _ in 0..n_days {
            let snapshot = self.perform_day().context("failed to perform day")?;
            encode::write(&mut writer, &snapshot).context("failed to serialize snapshot")?;

            let day = snapshot.day + 1;
            if day % self.cfg.output.days_per_report == 0 || day == n_days {
                let progress = 100.0 * day as f64 / n_days as f64;
                log::info!(
                    "completed {progress:06.2}% (infectious: {}, dead: {})",
                    snapshot.infectious,
                    snapshot.dead
                );
            }
            trajectory.push(snapshot);
        }

        writer.flush().context("failed to flush writer stream")?;

        Ok(trajectory)
    }

    /// Simulate one whole day and return its closing snapshot.
    pub fn perform_day(&mut self) -> Result<Snapshot> {
        let day = self.time.day;
        for _ in 0..HOURS_PER_DAY {
            self.perform_hour()
                .with_context(|| format!("failed to perform hour {}", self.time.hour))?;
        }

        self.community
            .verify_rosters()
            .context("inconsistent rosters")?;
        let snapshot = self.community.snapshot(day)?;
        Ok(snapshot)
    }

    fn perform_hour(&mut self) -> Result<()> {
        let is_new_day = self.time.is_new_day();

        if is_new_day {
            self.apply_containment_events()
                .context("failed to apply containment events")?;
        }

        // Advance every person's schedule, and their infection on a new day.
        self.update_population()
            .context("failed to update population")?;

        if is_new_day {
            self.run_test_station().context("failed to run test station")?;
            self.release_recovered()
                .context("failed to release recovered people")?;
        }

        let n_infections = self
            .community
            .resolve_contacts(self.cfg.simulation.max_contacts_per_hour, &mut self.rng)
            .context("failed to resolve contacts")?;
        if n_infections > 0 {
            log::debug!("{n_infections} new infections at {:?}", self.time);
        }

        self.time = self.time.next_hour();
        Ok(())
    }

    fn apply_containment_events(&mut self) -> Result<()> {
        let day = self.time.day;
        for event in self.cfg.containment.events.iter().filter(|ev| ev.day == day) {
            self.community
                .update_containment(|measures| measures.toggle(event.measure))?;
            log::info!("day {day}: toggled {:?}", event.measure);
        }
        Ok(())
    }

    fn update_population(&mut self) -> Result<()> {
        let ids = self.community.person_ids()?;
        if ids.is_empty() {
            return Ok(());
        }

        let n_workers = self.cfg.simulation.workers;
        let chunk_size = ids.len().div_ceil(n_workers);
        let seeds: Vec<u64> = (0..n_workers).map(|_| self.rng.random()).collect();

        let community = &self.community;
        let time = self.time;
        thread::scope(|s| -> Result<()> {
            let handles: Vec<_> = ids
                .chunks(chunk_size)
                .zip(seeds)
                .map(|(chunk, seed)| s.spawn(move || update_chunk(community, chunk, time, seed)))
                .collect();
            for handle in handles {
                handle
                    .join()
                    .map_err(|_| anyhow!("worker thread panicked"))??;
            }
            Ok(())
        })
    }

    fn run_test_station(&mut self) -> Result<()> {
        let prob = self.cfg.testing.daily_test_prob;
        if prob == 0.0 {
            return Ok(());
        }
        let candidates = self.community.person_ids_where(|person| {
            person.is_alive() && !person.is_quarantined() && person.infection().has_symptoms()
        })?;
        for id in candidates {
            if !self.rng.random_bool(prob) {
                continue;
            }
            match self.community.test_station(id, &mut self.rng) {
                Ok(_) => {}
                Err(err @ SimError::InvalidState(_)) => log::warn!("failed to test {id}: {err}"),
                Err(err) => return Err(err).with_context(|| format!("failed to test {id}")),
            }
        }
        Ok(())
    }

    fn release_recovered(&self) -> Result<()> {
        let quarantined = self
            .community
            .person_ids_where(|person| person.is_quarantined())?;
        for id in quarantined {
            if containment::release_when_recovered(&self.community, id)? {
                log::debug!("{id} released from quarantine");
            }
        }
        Ok(())
    }
}

fn update_chunk(community: &Community, ids: &[PersonId], time: SimTime, seed: u64) -> Result<()> {
    let mut rng = ChaCha12Rng::seed_from_u64(seed);
    for &id in ids {
        match community.update_person(id, time, &mut rng) {
            Ok(_) => {}
            // Missing stores or refused moves leave the person where they are.
            Err(err @ (SimError::NotFound(_) | SimError::InvalidState(_))) => {
                log::debug!("{id} stays put: {err}")
            }
            Err(err) => return Err(err).with_context(|| format!("failed to update {id}")),
        }
    }
    Ok(())
}
