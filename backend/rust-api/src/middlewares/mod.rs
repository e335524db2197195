pub mod metrics;
pub mod passcode;
pub mod trace;
