//! Epidemiological description of an illness.

use crate::error::{SimError, SimResult};
use crate::ids::DiseaseId;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Age bracket of a person, in decades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AgeGroup {
    UnderTen,
    UnderTwenty,
    UnderThirty,
    UnderForty,
    UnderFifty,
    UnderSixty,
    UnderSeventy,
    UnderEighty,
    AboveEighty,
}

impl AgeGroup {
    pub const COUNT: usize = 9;

    pub const ALL: [AgeGroup; Self::COUNT] = [
        AgeGroup::UnderTen,
        AgeGroup::UnderTwenty,
        AgeGroup::UnderThirty,
        AgeGroup::UnderForty,
        AgeGroup::UnderFifty,
        AgeGroup::UnderSixty,
        AgeGroup::UnderSeventy,
        AgeGroup::UnderEighty,
        AgeGroup::AboveEighty,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_years(years: u32) -> Self {
        let idx = (years / 10) as usize;
        Self::ALL[idx.min(Self::COUNT - 1)]
    }

    /// Whether agents of this group hold a job.
    pub fn is_working_age(self) -> bool {
        (AgeGroup::UnderThirty..=AgeGroup::UnderSeventy).contains(&self)
    }

    pub fn is_school_age(self) -> bool {
        self <= AgeGroup::UnderTwenty
    }
}

impl TryFrom<usize> for AgeGroup {
    type Error = SimError;

    fn try_from(idx: usize) -> SimResult<Self> {
        Self::ALL.get(idx).copied().ok_or_else(|| {
            SimError::InvalidArgument(format!(
                "age group index must be below {}, but is {idx}",
                Self::COUNT
            ))
        })
    }
}

/// Immutable disease parameters.
///
/// Construct through [`DiseaseBuilder`], which validates every invariant. The randomized
/// accessors draw a fresh value from their range on each call.
#[derive(Debug, Clone, Serialize)]
pub struct Disease {
    id: DiseaseId,
    name: String,
    incubation_period: (u32, u32),
    days_infectious: u32,
    duration_range: (u32, u32),
    mortality_by_age: Vec<f64>,
    days_till_death_range: (u32, u32),
    spread_factor: (f64, f64),
    test_accuracy: f64,
    symptoms_development: (f64, f64),
}

impl Disease {
    pub fn id(&self) -> DiseaseId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn incubation_period<R: Rng>(&self, rng: &mut R) -> u32 {
        sample_days(self.incubation_period, rng)
    }

    /// Days a patient stays contagious.
    pub fn days_infectious(&self) -> u32 {
        self.days_infectious
    }

    pub fn disease_duration<R: Rng>(&self, rng: &mut R) -> u32 {
        sample_days(self.duration_range, rng)
    }

    pub fn days_till_death<R: Rng>(&self, rng: &mut R) -> u32 {
        sample_days(self.days_till_death_range, rng)
    }

    pub fn spread_factor<R: Rng>(&self, rng: &mut R) -> f64 {
        let (min, max) = self.spread_factor;
        rng.random_range(min..=max)
    }

    pub fn test_accuracy(&self) -> f64 {
        self.test_accuracy
    }

    pub fn mortality_by_age_group(&self, age: AgeGroup) -> f64 {
        self.mortality_by_age[age.index()]
    }

    /// Mortality of the age bucket with ordinal `idx`.
    pub fn mortality_by_age_index(&self, idx: usize) -> SimResult<f64> {
        let age = AgeGroup::try_from(idx)?;
        Ok(self.mortality_by_age_group(age))
    }

    pub fn mortality_by_age(&self, years: u32) -> f64 {
        self.mortality_by_age_group(AgeGroup::from_years(years))
    }

    /// Decide whether one exposure of a person in `age` ends in death.
    pub fn is_fatal<R: Rng>(&self, age: AgeGroup, rng: &mut R) -> bool {
        rng.random_bool(self.mortality_by_age_group(age))
    }

    pub fn will_develop_symptoms<R: Rng>(&self, rng: &mut R) -> bool {
        let (min, max) = self.symptoms_development;
        let prob = rng.random_range(min..=max);
        rng.random_bool(prob)
    }

    /// Structural equality, ignoring the id.
    pub fn is_same(&self, other: &Disease) -> bool {
        self.name == other.name
            && self.incubation_period == other.incubation_period
            && self.days_infectious == other.days_infectious
            && self.duration_range == other.duration_range
            && self.mortality_by_age == other.mortality_by_age
            && self.days_till_death_range == other.days_till_death_range
            && self.spread_factor == other.spread_factor
            && self.test_accuracy == other.test_accuracy
            && self.symptoms_development == other.symptoms_development
    }

    pub fn has_same_id(&self, other: &Disease) -> bool {
        self.id == other.id
    }
}

fn sample_days<R: Rng>((min, max): (u32, u32), rng: &mut R) -> u32 {
    rng.random_range(min..=max)
}

/// Step-by-step construction of a [`Disease`].
///
/// Every parameter must be set before [`DiseaseBuilder::build`] succeeds.
#[derive(Debug, Clone, Default)]
pub struct DiseaseBuilder {
    name: Option<String>,
    incubation_period: Option<(u32, u32)>,
    days_infectious: Option<u32>,
    duration_range: Option<(u32, u32)>,
    mortality_by_age: Option<Vec<f64>>,
    days_till_death_range: Option<(u32, u32)>,
    spread_factor: Option<(f64, f64)>,
    test_accuracy: Option<f64>,
    symptoms_development: Option<(f64, f64)>,
}

impl DiseaseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn incubation_period(mut self, min_days: u32, max_days: u32) -> Self {
        self.incubation_period = Some((min_days, max_days));
        self
    }

    pub fn days_infectious(mut self, days: u32) -> Self {
        self.days_infectious = Some(days);
        self
    }

    pub fn disease_duration(mut self, min_days: u32, max_days: u32) -> Self {
        self.duration_range = Some((min_days, max_days));
        self
    }

    pub fn mortality_by_age(mut self, mortality: Vec<f64>) -> Self {
        self.mortality_by_age = Some(mortality);
        self
    }

    pub fn days_till_death(mut self, min_days: u32, max_days: u32) -> Self {
        self.days_till_death_range = Some((min_days, max_days));
        self
    }

    pub fn spread_factor(mut self, min: f64, max: f64) -> Self {
        self.spread_factor = Some((min, max));
        self
    }

    pub fn test_accuracy(mut self, accuracy: f64) -> Self {
        self.test_accuracy = Some(accuracy);
        self
    }

    pub fn symptoms_development(mut self, min: f64, max: f64) -> Self {
        self.symptoms_development = Some((min, max));
        self
    }

    pub fn build(self) -> SimResult<Disease> {
        let name = required(self.name, "name")?;
        if name.is_empty() {
            return Err(SimError::InvalidArgument("disease name is empty".into()));
        }
        let incubation_period = required(self.incubation_period, "incubation period")?;
        let days_infectious = required(self.days_infectious, "days infectious")?;
        let duration_range = required(self.duration_range, "disease duration")?;
        let mortality_by_age = required(self.mortality_by_age, "mortality by age")?;
        let days_till_death_range = required(self.days_till_death_range, "days till death")?;
        let spread_factor = required(self.spread_factor, "spread factor")?;
        let test_accuracy = required(self.test_accuracy, "test accuracy")?;
        let symptoms_development = required(self.symptoms_development, "symptoms development")?;

        check_range(incubation_period, "incubation period")?;
        check_range(duration_range, "disease duration")?;
        check_range(days_till_death_range, "days till death")?;
        if days_till_death_range.0 == 0 {
            return Err(SimError::InvalidArgument(
                "days till death must be at least 1".into(),
            ));
        }

        if mortality_by_age.len() != AgeGroup::COUNT {
            return Err(SimError::InvalidArgument(format!(
                "mortality by age must have {} entries, but has {}",
                AgeGroup::COUNT,
                mortality_by_age.len()
            )));
        }
        for &prob in &mortality_by_age {
            check_prob(prob, "mortality")?;
        }

        check_range(spread_factor, "spread factor")?;
        check_prob(spread_factor.0, "spread factor")?;
        check_prob(spread_factor.1, "spread factor")?;
        check_prob(test_accuracy, "test accuracy")?;
        check_range(symptoms_development, "symptoms development")?;
        check_prob(symptoms_development.0, "symptoms development")?;
        check_prob(symptoms_development.1, "symptoms development")?;

        Ok(Disease {
            id: DiseaseId::next(),
            name,
            incubation_period,
            days_infectious,
            duration_range,
            mortality_by_age,
            days_till_death_range,
            spread_factor,
            test_accuracy,
            symptoms_development,
        })
    }

    /// COVID-19 as characterised in early surveillance reports.
    pub fn covid19() -> SimResult<Disease> {
        let (incubation_min, incubation_max) = (1, 14);
        let (duration_min, duration_max) = (14, 56);
        Self::new()
            .name("COVID-19")
            .incubation_period(incubation_min, incubation_max)
            .days_infectious(10)
            .disease_duration(incubation_min + duration_min, incubation_max + duration_max)
            .mortality_by_age(vec![
                0.0, 0.0014, 0.0012, 0.002, 0.0038, 0.0098, 0.0298, 0.0794, 0.1734,
            ])
            .days_till_death(duration_min, duration_max)
            .spread_factor(0.0, 0.5)
            .test_accuracy(0.981)
            .symptoms_development(0.55, 0.85)
            .build()
    }

    /// Kills every infected person, for tests and demonstrations.
    pub fn deadly_test_disease() -> SimResult<Disease> {
        Self::new()
            .name("DeadlyTestDisease")
            .incubation_period(1, 1)
            .days_infectious(10)
            .disease_duration(10, 10)
            .mortality_by_age(vec![1.0; AgeGroup::COUNT])
            .days_till_death(10, 10)
            .spread_factor(1.0, 1.0)
            .test_accuracy(1.0)
            .symptoms_development(1.0, 1.0)
            .build()
    }
}

fn required<T>(val: Option<T>, what: &str) -> SimResult<T> {
    val.ok_or_else(|| SimError::InvalidArgument(format!("{what} was not set")))
}

fn check_range<T: PartialOrd + Debug>((min, max): (T, T), what: &str) -> SimResult<()> {
    if min > max {
        return Err(SimError::InvalidArgument(format!(
            "{what} range must satisfy min <= max, but is ({min:?}, {max:?})"
        )));
    }
    Ok(())
}

fn check_prob(prob: f64, what: &str) -> SimResult<()> {
    if !(0.0..=1.0).contains(&prob) {
        return Err(SimError::InvalidArgument(format!(
            "{what} must be a probability in [0, 1], but is {prob}"
        )));
    }
    Ok(())
}
