pub mod cozy;
pub mod san;
