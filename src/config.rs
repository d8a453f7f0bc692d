use crate::containment::Measure;
use crate::disease::{AgeGroup, Disease, DiseaseBuilder};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Simulation configuration parameters.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub simulation: SimulationConfig,
    pub population: PopulationConfig,
    pub diseases: Vec<DiseaseConfig>,
    pub seeding: SeedingConfig,
    #[serde(default)]
    pub containment: ContainmentConfig,
    #[serde(default)]
    pub testing: TestingConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    /// Number of simulated days.
    pub days: u32,
    /// Seed of the engine's generator; drawn from the OS when absent.
    pub seed: Option<u64>,
    /// Number of worker threads updating people each hour.
    pub workers: usize,
    /// Most susceptible people one infectious person meets per hour.
    pub max_contacts_per_hour: usize,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PopulationConfig {
    pub size: usize,
    /// Average number of people per home.
    pub household_size: f64,
    pub employees_per_workplace: usize,
    pub pupils_per_school: usize,
    /// Share of working-age people with a workplace.
    pub employment_rate: f64,
    /// Weights of the nine age groups, youngest first.
    pub age_distribution: Vec<f64>,
    /// Inclusive range of days between grocery runs.
    pub food_buy_interval: (u32, u32),
    /// Inclusive range of days between hardware store visits.
    pub hardware_buy_interval: (u32, u32),
    /// Range of the hourly probability of going shopping once a purchase is due.
    pub buy_compliance: (f64, f64),
    /// Range of caution during contacts.
    pub acceptance_factor: (f64, f64),
}

/// Parameters of one disease, converted through [`DiseaseBuilder`].
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiseaseConfig {
    pub name: String,
    pub incubation_period: (u32, u32),
    pub days_infectious: u32,
    pub disease_duration: (u32, u32),
    pub mortality_by_age: Vec<f64>,
    pub days_till_death: (u32, u32),
    pub spread_factor: (f64, f64),
    pub test_accuracy: f64,
    pub symptoms_development: (f64, f64),
}

impl DiseaseConfig {
    pub fn to_disease(&self) -> Result<Disease> {
        let disease = DiseaseBuilder::new()
            .name(self.name.clone())
            .incubation_period(self.incubation_period.0, self.incubation_period.1)
            .days_infectious(self.days_infectious)
            .disease_duration(self.disease_duration.0, self.disease_duration.1)
            .mortality_by_age(self.mortality_by_age.clone())
            .days_till_death(self.days_till_death.0, self.days_till_death.1)
            .spread_factor(self.spread_factor.0, self.spread_factor.1)
            .test_accuracy(self.test_accuracy)
            .symptoms_development(self.symptoms_development.0, self.symptoms_development.1)
            .build()?;
        Ok(disease)
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedingConfig {
    /// Name of the disease to seed, one of `diseases`.
    pub disease: String,
    pub n_infected: usize,
}

#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContainmentConfig {
    #[serde(default)]
    pub events: Vec<ContainmentEvent>,
}

/// Toggle `measure` at the start of `day`.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContainmentEvent {
    pub day: u32,
    pub measure: Measure,
}

#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestingConfig {
    /// Daily probability that a symptomatic person gets tested.
    pub daily_test_prob: f64,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Number of days between progress reports.
    pub days_per_report: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { days_per_report: 1 }
    }
}

impl Config {
    /// Load a [`Config`] from a file.
    ///
    /// The file must be TOML-encoded and contain a serialized [`Config`].
    /// Performs validation on all parameters before returning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    /// The seeded disease, built from its configuration.
    pub fn seed_disease(&self) -> Result<Disease> {
        let disease_cfg = self
            .diseases
            .iter()
            .find(|disease| disease.name == self.seeding.disease)
            .with_context(|| format!("unknown disease {:?}", self.seeding.disease))?;
        disease_cfg.to_disease()
    }

    fn validate(&self) -> Result<()> {
        let sim = &self.simulation;
        check_num(sim.days, 1..=10_000).context("invalid number of days")?;
        check_num(sim.workers, 1..=256).context("invalid number of workers")?;
        check_num(sim.max_contacts_per_hour, 0..=1_000)
            .context("invalid number of contacts per hour")?;

        let pop = &self.population;
        check_num(pop.size, 1..=10_000_000).context("invalid population size")?;
        check_num(pop.household_size, 1.0..=20.0).context("invalid household size")?;
        check_num(pop.employees_per_workplace, 1..=100_000)
            .context("invalid number of employees per workplace")?;
        check_num(pop.pupils_per_school, 1..=100_000)
            .context("invalid number of pupils per school")?;
        check_num(pop.employment_rate, 0.0..=1.0).context("invalid employment rate")?;
        check_vec(&pop.age_distribution, AgeGroup::COUNT, true)
            .context("invalid age distribution")?;
        check_range(pop.food_buy_interval, 1..=365).context("invalid food buy interval")?;
        check_range(pop.hardware_buy_interval, 1..=365)
            .context("invalid hardware buy interval")?;
        check_range(pop.buy_compliance, 0.0..=1.0).context("invalid buy compliance")?;
        check_range(pop.acceptance_factor, 0.0..=1.0).context("invalid acceptance factor")?;

        if self.diseases.is_empty() {
            bail!("at least one disease must be configured");
        }
        for disease in &self.diseases {
            disease
                .to_disease()
                .with_context(|| format!("invalid disease {:?}", disease.name))?;
        }
        self.seed_disease().context("invalid seeding disease")?;
        check_num(self.seeding.n_infected, 0..=pop.size)
            .context("invalid number of initially infected")?;

        for event in &self.containment.events {
            check_num(event.day, 0..sim.days)
                .with_context(|| format!("invalid day of {:?}", event.measure))?;
        }

        check_num(self.testing.daily_test_prob, 0.0..=1.0)
            .context("invalid daily test probability")?;
        check_num(self.output.days_per_report, 1..=sim.days)
            .context("invalid number of days per report")?;

        Ok(())
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}

fn check_range<T, R>(range: (T, T), bounds: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug + Clone,
{
    let (min, max) = range;
    if min > max {
        bail!("range minimum {min:?} exceeds maximum {max:?}");
    }
    check_num(min, bounds.clone())?;
    check_num(max, bounds)?;
    Ok(())
}

fn check_vec(vec: &[f64], exp_len: usize, prob_vec: bool) -> Result<()> {
    // Ensure vector has expected length.
    let len = vec.len();
    if len != exp_len {
        bail!("vector length must be {exp_len}, but is {len}");
    }
    if !prob_vec {
        return Ok(());
    }
    // For probability vectors: non-negative elements and sums to ~1.0.
    if vec.iter().any(|&ele| ele < 0.0) {
        bail!("vector must have only non-negative elements");
    }
    let sum: f64 = vec.iter().sum();
    let tol = 1e-6;
    if (sum - 1.0).abs() > tol {
        bail!("vector must sum to 1.0 (tolerance: {tol}), but sums to {sum}");
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SMALL_TOWN: &str = r#"
[simulation]
days = 14
seed = 1234
workers = 2
max_contacts_per_hour = 3

[population]
size = 300
household_size = 2.5
employees_per_workplace = 20
pupils_per_school = 100
employment_rate = 0.8
age_distribution = [0.1, 0.1, 0.15, 0.15, 0.15, 0.15, 0.1, 0.05, 0.05]
food_buy_interval = [2, 5]
hardware_buy_interval = [7, 21]
buy_compliance = [0.1, 0.4]
acceptance_factor = [0.0, 1.0]

[[diseases]]
name = "flu"
incubation_period = [1, 3]
days_infectious = 4
disease_duration = [5, 8]
mortality_by_age = [0.0, 0.0, 0.0, 0.0, 0.01, 0.02, 0.05, 0.1, 0.2]
days_till_death = [3, 6]
spread_factor = [0.05, 0.2]
test_accuracy = 0.95
symptoms_development = [0.5, 0.8]

[seeding]
disease = "flu"
n_infected = 5

[[containment.events]]
day = 3
measure = "mask_mandate"

[[containment.events]]
day = 5
measure = "lockdown"

[testing]
daily_test_prob = 0.5

[output]
days_per_report = 7
"#;

    #[test]
    fn parses_and_validates() {
        let cfg = Config::from_toml(SMALL_TOWN).unwrap();
        assert_eq!(cfg.simulation.seed, Some(1234));
        assert_eq!(cfg.population.food_buy_interval, (2, 5));
        assert_eq!(cfg.containment.events.len(), 2);
        assert_eq!(cfg.containment.events[1].measure, Measure::Lockdown);
        assert_eq!(cfg.seed_disease().unwrap().name(), "flu");
    }

    #[test]
    fn optional_sections_default() {
        let trimmed = SMALL_TOWN
            .split("[[containment.events]]")
            .next()
            .unwrap()
            .to_string();
        let cfg = Config::from_toml(&trimmed).unwrap();
        assert!(cfg.containment.events.is_empty());
        assert_eq!(cfg.testing.daily_test_prob, 0.0);
        assert_eq!(cfg.output.days_per_report, 1);
    }

    #[test]
    fn rejects_invalid_values() {
        for (from, to) in [
            ("days = 14", "days = 0"),
            ("household_size = 2.5", "household_size = 0.5"),
            ("[0.1, 0.1, 0.15,", "[0.5, 0.1, 0.15,"),
            ("food_buy_interval = [2, 5]", "food_buy_interval = [5, 2]"),
            ("hardware_buy_interval = [7, 21]", "hardware_buy_interval = [0, 21]"),
            ("disease = \"flu\"", "disease = \"plague\""),
            ("days_infectious = 4", "days_infectious = 4\nextra = 1"),
            ("day = 5", "day = 14"),
            ("test_accuracy = 0.95", "test_accuracy = 1.5"),
        ] {
            let contents = SMALL_TOWN.replacen(from, to, 1);
            assert_ne!(contents, SMALL_TOWN, "pattern {from:?} not found");
            assert!(Config::from_toml(&contents).is_err(), "accepted {to:?}");
        }
    }

    #[test]
    fn check_num_reports_range() {
        let err = check_num(5, 0..3).unwrap_err();
        assert!(err.to_string().contains("0..3"));
        assert!(check_range((0.2, 0.1), 0.0..=1.0).is_err());
        assert!(check_vec(&[0.5, 0.5], 3, false).is_err());
    }
}
