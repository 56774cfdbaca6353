pub mod config;
pub mod output;
pub mod engine_types;
pub mod sieve;
pub mod sieve_math;
pub mod count_engine;
pub mod memory;

pub use count_engine::{count_primes_in_interval, count_segment, CountSummary, PrimeCounter};
pub use engine_types::{CountError, CountResult};
pub use sieve::Sieve;
