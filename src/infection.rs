//! Per-person disease progress.

use crate::containment::DiseaseContainment;
use crate::disease::{AgeGroup, Disease};
use crate::error::{SimError, SimResult};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Share of transmissions a mask mandate prevents, the median over common mask types.
pub const MASK_EFFECTIVENESS: f64 = 0.68333;

/// The low end of the transmission interval, as a fraction of the spread factor.
const MIN_SPREAD_FRACTION: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SeirState {
    Susceptible,
    Exposed,
    Infectious,
    Recovered,
}

/// Result of advancing an infection by one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayOutcome {
    Survived,
    Died,
}

#[derive(Debug, Clone)]
pub struct Infection {
    disease: Option<Arc<Disease>>,
    seir_state: SeirState,

    latent_period: u32,
    days_infectious: u32,
    days_till_cured: u32,
    days_to_live: u32,
    spread_factor: f64,

    is_fatal: bool,
    has_recovered: bool,
    has_symptoms: bool,

    spread_count: u32,
}

impl Default for Infection {
    fn default() -> Self {
        Self::new()
    }
}

impl Infection {
    pub fn new() -> Self {
        Self {
            disease: None,
            seir_state: SeirState::Susceptible,
            latent_period: 0,
            days_infectious: 0,
            days_till_cured: 0,
            days_to_live: 0,
            spread_factor: 0.0,
            is_fatal: false,
            has_recovered: false,
            has_symptoms: false,
            spread_count: 0,
        }
    }

    /// Expose a susceptible person to `disease`.
    ///
    /// Samples the disease timings and decides once, here, whether this episode is fatal.
    pub fn contaminate<R: Rng>(
        &mut self,
        disease: Arc<Disease>,
        age: AgeGroup,
        rng: &mut R,
    ) -> SimResult<()> {
        if let Some(current) = &self.disease {
            return Err(SimError::InvalidState(format!(
                "already infected with {}",
                current.name()
            )));
        }
        if self.seir_state != SeirState::Susceptible {
            return Err(SimError::InvalidState(format!(
                "cannot contaminate an infection in state {:?}",
                self.seir_state
            )));
        }

        self.seir_state = SeirState::Exposed;
        self.latent_period = disease.incubation_period(rng);
        self.days_infectious = disease.days_infectious();
        self.days_till_cured = disease.disease_duration(rng);
        self.spread_factor = disease.spread_factor(rng);

        if disease.is_fatal(age, rng) {
            self.is_fatal = true;
            self.days_to_live = disease.days_till_death(rng);
        }

        self.disease = Some(disease);
        Ok(())
    }

    /// Advance the infection if a new day has begun and a disease is active.
    pub fn update<R: Rng>(&mut self, is_new_day: bool, rng: &mut R) -> DayOutcome {
        if !self.has_disease() || !is_new_day {
            return DayOutcome::Survived;
        }
        let outcome = self.advance_day();
        self.disease_check(rng);
        outcome
    }

    pub fn advance_day(&mut self) -> DayOutcome {
        self.days_till_cured = self.days_till_cured.saturating_sub(1);

        match self.seir_state {
            SeirState::Susceptible => return DayOutcome::Survived,
            SeirState::Exposed | SeirState::Infectious => {
                self.latent_period = self.latent_period.saturating_sub(1);
                self.days_infectious = self.days_infectious.saturating_sub(1);
            }
            SeirState::Recovered => {}
        }

        if self.is_fatal && self.days_to_live > 0 {
            self.days_to_live -= 1;
            if self.days_to_live == 0 {
                return DayOutcome::Died;
            }
        }
        DayOutcome::Survived
    }

    fn disease_check<R: Rng>(&mut self, rng: &mut R) {
        match self.seir_state {
            SeirState::Susceptible => {}
            SeirState::Exposed => {
                if self.latent_period == 0 {
                    self.has_symptoms = self
                        .disease
                        .as_ref()
                        .is_some_and(|disease| disease.will_develop_symptoms(rng));
                    self.seir_state = SeirState::Infectious;
                }
            }
            SeirState::Infectious => {
                // No longer a source, but not flagged recovered until cured.
                if self.days_infectious == 0 {
                    self.seir_state = SeirState::Recovered;
                }
            }
            SeirState::Recovered => {
                if self.days_till_cured == 0 && !self.is_fatal {
                    self.has_recovered = true;
                    self.has_symptoms = false;
                    self.disease = None;
                }
            }
        }
    }

    /// Decide whether this infection is passed on during one contact.
    ///
    /// `acceptance_factor` is the receiving person's caution in [0, 1]; higher values move the
    /// probability from the spread factor towards a tenth of it.
    pub fn will_infect<R: Rng>(
        &self,
        acceptance_factor: f64,
        measures: &DiseaseContainment,
        rng: &mut R,
    ) -> bool {
        let mut prob = transmission_probability(self.spread_factor, acceptance_factor);
        if measures.is_mask_mandate() {
            prob *= 1.0 - MASK_EFFECTIVENESS;
        }
        rng.random_bool(prob.clamp(0.0, 1.0))
    }

    pub fn increase_spread_count(&mut self) {
        self.spread_count += 1;
    }

    pub fn disease(&self) -> Option<&Arc<Disease>> {
        self.disease.as_ref()
    }

    pub fn disease_name(&self) -> &str {
        self.disease.as_deref().map_or("", Disease::name)
    }

    pub fn seir_state(&self) -> SeirState {
        self.seir_state
    }

    pub fn has_disease(&self) -> bool {
        self.disease.is_some()
    }

    pub fn is_susceptible(&self) -> bool {
        self.seir_state == SeirState::Susceptible
    }

    pub fn is_infectious(&self) -> bool {
        self.seir_state == SeirState::Infectious
    }

    pub fn is_fatal(&self) -> bool {
        self.is_fatal
    }

    pub fn has_recovered(&self) -> bool {
        self.has_recovered
    }

    pub fn has_symptoms(&self) -> bool {
        self.has_symptoms
    }

    pub fn spread_count(&self) -> u32 {
        self.spread_count
    }
}

/// Map `acceptance_factor` from [0, 1] onto [spread_factor, spread_factor / 10].
fn transmission_probability(spread_factor: f64, acceptance_factor: f64) -> f64 {
    let acceptance = acceptance_factor.clamp(0.0, 1.0);
    let low = spread_factor * MIN_SPREAD_FRACTION;
    spread_factor + acceptance * (low - spread_factor)
}
