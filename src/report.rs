use anyhow::{Context, Result};
use rmp_serde::decode;
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::BufReader,
    path::Path,
};

/// Population counts at the end of one simulated day.
///
/// The SEIR counts cover living people only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub day: u32,
    pub susceptible: usize,
    pub exposed: usize,
    pub infectious: usize,
    pub recovered: usize,
    pub dead: usize,
    pub quarantined: usize,
    pub symptomatic: usize,
    /// People ever infected, the dead included.
    pub total_infections: usize,
}

impl Snapshot {
    pub fn population(&self) -> usize {
        self.susceptible + self.exposed + self.infectious + self.recovered + self.dead
    }
}

/// Running mean and standard deviation (Welford).
#[derive(Debug, Default)]
pub struct Accumulator {
    n_vals: usize,
    mean: f64,
    diff_2_sum: f64,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct AccumulatorReport {
    pub mean: f64,
    pub std_dev: f64,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, val: f64) {
        self.n_vals += 1;

        let diff_a = val - self.mean;
        self.mean += diff_a / self.n_vals as f64;

        let diff_b = val - self.mean;
        self.diff_2_sum += diff_a * diff_b;
    }

    pub fn report(&self) -> AccumulatorReport {
        AccumulatorReport {
            mean: self.mean,
            // Zero rather than NaN, which TOML cannot hold.
            std_dev: if self.n_vals > 1 {
                (self.diff_2_sum / (self.n_vals as f64 - 1.0)).sqrt()
            } else {
                0.0
            },
        }
    }
}

/// Outcome of one run.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub final_day: u32,
    pub population: usize,
    pub peak_infectious: usize,
    pub peak_day: u32,
    pub total_dead: usize,
    /// Share of the population ever infected.
    pub attack_rate: f64,
    pub new_infections: AccumulatorReport,
    pub quarantined: AccumulatorReport,
}

/// Folds the daily snapshots of a run into a [`Summary`].
#[derive(Default)]
pub struct Analyzer {
    last: Option<Snapshot>,
    peak: Option<(usize, u32)>,
    new_infections: Accumulator,
    quarantined: Accumulator,
}

impl Analyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, snapshot: Snapshot) {
        let prev_infections = self.last.as_ref().map_or(0, |last| last.total_infections);
        self.new_infections
            .add(snapshot.total_infections.saturating_sub(prev_infections) as f64);
        self.quarantined.add(snapshot.quarantined as f64);

        if self
            .peak
            .is_none_or(|(peak, _)| snapshot.infectious > peak)
        {
            self.peak = Some((snapshot.infectious, snapshot.day));
        }
        self.last = Some(snapshot);
    }

    /// Read `n_snapshots` snapshots from a trajectory file.
    pub fn add_file<P: AsRef<Path>>(&mut self, file: P, n_snapshots: usize) -> Result<()> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);

        for _ in 0..n_snapshots {
            let snapshot = decode::from_read(&mut reader).context("failed to read snapshot")?;
            self.add(snapshot);
        }
        Ok(())
    }

    pub fn summary(&self) -> Option<Summary> {
        let last = self.last.as_ref()?;
        let (peak_infectious, peak_day) = self.peak?;
        let population = last.population();
        let attack_rate = if population == 0 {
            0.0
        } else {
            last.total_infections as f64 / population as f64
        };
        Some(Summary {
            final_day: last.day,
            population,
            peak_infectious,
            peak_day,
            total_dead: last.dead,
            attack_rate,
            new_infections: self.new_infections.report(),
            quarantined: self.quarantined.report(),
        })
    }

    pub fn save_results<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let summary = self.summary().context("no snapshots to summarize")?;
        let contents = toml::to_string_pretty(&summary).context("failed to serialize summary")?;
        fs::write(file, contents).with_context(|| format!("failed to write {file:?}"))?;
        Ok(())
    }
}
