//! Aggregation, ranking and comparison over dashboard records.
//!
//! Everything here is a pure function of the records it is given.

pub mod aggregator;
pub mod comparison;
pub mod ranking;

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::models::{Month, Record};

    /// Build a record; a retention of 0 means "not reported".
    pub fn record(
        executive: &str,
        team: &str,
        clinic: &str,
        nap: f64,
        retention: f64,
        deals: f64,
        month: Option<Month>,
    ) -> Record {
        Record {
            clinic: clinic.to_string(),
            executive: executive.to_string(),
            coordinator: None,
            team: team.to_string(),
            retention: Record::retention_from_raw(retention),
            nap,
            deals,
            month,
            year: 2025,
        }
    }

    /// A(100, 80), A(200, 0), B(50, 60), all in team T1.
    pub fn scenario_records() -> Vec<Record> {
        vec![
            record("A", "T1", "Norte", 100.0, 80.0, 1.0, Some(Month::June)),
            record("A", "T1", "Norte", 200.0, 0.0, 2.0, Some(Month::July)),
            record("B", "T1", "Norte", 50.0, 60.0, 1.0, Some(Month::June)),
        ]
    }
}
