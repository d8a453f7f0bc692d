//! Simulated time as supplied by the driver.

use crate::error::{SimError, SimResult};
use serde::{Deserialize, Serialize};

pub const HOURS_PER_DAY: u32 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    /// Weekday of simulated day `day`, with day 0 falling on a Monday.
    pub fn from_day(day: u32) -> Self {
        Self::ALL[(day % 7) as usize]
    }

    pub fn is_workday(self) -> bool {
        !matches!(self, Weekday::Saturday | Weekday::Sunday)
    }

    pub fn is_shopping_day(self) -> bool {
        self != Weekday::Sunday
    }
}

/// A point on the simulation clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimTime {
    pub day: u32,
    pub hour: u32,
    pub weekday: Weekday,
}

impl SimTime {
    pub fn new(day: u32, hour: u32) -> SimResult<Self> {
        if hour >= HOURS_PER_DAY {
            return Err(SimError::InvalidArgument(format!(
                "hour must be below {HOURS_PER_DAY}, but is {hour}"
            )));
        }
        Ok(Self {
            day,
            hour,
            weekday: Weekday::from_day(day),
        })
    }

    /// The next hour, rolling over into the next day.
    pub fn next_hour(self) -> Self {
        let (day, hour) = if self.hour + 1 == HOURS_PER_DAY {
            (self.day + 1, 0)
        } else {
            (self.day, self.hour + 1)
        };
        Self {
            day,
            hour,
            weekday: Weekday::from_day(day),
        }
    }

    pub fn is_new_day(&self) -> bool {
        self.hour == 0
    }
}
