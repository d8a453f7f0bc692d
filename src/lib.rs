//! Agent-based simulation of an epidemic spreading through a community.
//!
//! People follow an hourly schedule between homes, workplaces, schools and shops, catch
//! diseases from co-located infectious people and move through the SEIR stages. Containment
//! measures such as lockdowns, mask mandates and quarantine change how they move and meet.

pub mod builder;
pub mod community;
pub mod config;
pub mod containment;
pub mod disease;
pub mod engine;
pub mod error;
pub mod ids;
pub mod infection;
pub mod manager;
pub mod person;
pub mod place;
pub mod report;
pub mod states;
pub mod time;
