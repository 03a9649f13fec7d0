//! Core module for detecting splicing-associated variants across a cohort
//!
//! This module contains the main function for scoring mutation-splicing
//! associations and the machinery behind it: cohort assembly, network
//! construction, the Gamma-Poisson scoring model, the permutation null
//! and the empirical FDR estimate.
//!
//! In short, every known mutation in the cohort is tested against every
//! anomalous splicing event that survives the support filter. A
//! closed-form Bayes factor compares splicing activity in carriers
//! against the rest of the cohort, carrier-label permutations calibrate
//! how often such scores arise by chance, and each reported association
//! gets an empirical q-value. The process is heavily parallelized to
//! offer fast performance on large cohorts.

pub mod cli;
pub mod core;
pub mod utils;
