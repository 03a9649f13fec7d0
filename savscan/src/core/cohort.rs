//! Cohort model built from the tab-delimited sample manifest
//!
//! One row per sample: sample name, mutation call ("None" for wild type),
//! provenance of the per-sample junction file, and the normalization
//! weight derived upstream from the intron-retention background. Columns
//! are resolved through the header, so their order is free.

use hashbrown::{HashMap, HashSet};
use log::warn;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use config::{SavError, MANIFEST_COLUMNS, MUTATION_INFO, NO_MUTATION, SAMPLE_NAME, WEIGHT};

use crate::utils::resolve_header;

/// One mutation key and the sample indices carrying it
#[derive(Debug, Clone, PartialEq)]
pub struct MutationGroup {
    pub key: String,
    pub carriers: Vec<usize>,
}

/// Immutable per-cohort state shared by every analysis pass
///
/// `samples` and `weights` are aligned by index. `mutations` holds one
/// group per distinct mutation key in first-appearance order; groups are
/// disjoint because the manifest assigns at most one call per sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Cohort {
    pub samples: Vec<String>,
    pub weights: Vec<f64>,
    pub mutations: Vec<MutationGroup>,
}

impl Cohort {
    /// Reads the sample manifest into a cohort
    ///
    /// Manifest problems are configuration errors and abort the run:
    /// a missing required column, a short row, or a weight that is not
    /// a positive finite number. A duplicated sample name keeps the
    /// first occurrence and skips the rest with a warning.
    ///
    /// # Arguments
    ///
    /// * `path` - path to the tab-delimited manifest
    ///
    /// # Returns
    ///
    /// * `Result<Cohort, SavError>` - the cohort, or the first fatal error
    pub fn from_manifest(path: &Path) -> Result<Self, SavError> {
        let reader = BufReader::new(File::open(path)?);
        let mut lines = reader.lines();

        let header_line = lines.next().transpose()?.ok_or_else(|| {
            SavError::Configuration(format!("manifest {:?} has no header line", path))
        })?;
        let header = resolve_header(&header_line, &MANIFEST_COLUMNS)?;

        let mut samples = Vec::new();
        let mut weights = Vec::new();
        let mut mutations: Vec<MutationGroup> = Vec::new();
        let mut group_index: HashMap<String, usize> = HashMap::new();
        let mut seen: HashSet<String> = HashSet::new();

        for (offset, line) in lines.enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let row = offset + 2; // header is line 1
            let fields: Vec<&str> = line.split('\t').collect();

            let sample = field_at(&fields, header[SAMPLE_NAME], SAMPLE_NAME, row)?;
            let mutation = field_at(&fields, header[MUTATION_INFO], MUTATION_INFO, row)?;
            let weight_field = field_at(&fields, header[WEIGHT], WEIGHT, row)?;

            if !seen.insert(sample.to_owned()) {
                warn!(
                    "Duplicate sample {} at manifest line {}; keeping the first occurrence",
                    sample, row
                );
                continue;
            }

            let weight = weight_field.parse::<f64>().map_err(|_| {
                SavError::Configuration(format!(
                    "weight for sample {} is not numeric: {}",
                    sample, weight_field
                ))
            })?;
            if !weight.is_finite() || weight <= 0.0 {
                return Err(SavError::Configuration(format!(
                    "weight for sample {} must be a positive finite number, got {}",
                    sample, weight
                )));
            }

            let idx = samples.len();
            samples.push(sample.to_owned());
            weights.push(weight);

            if mutation != NO_MUTATION {
                match group_index.get(mutation) {
                    Some(&group) => mutations[group].carriers.push(idx),
                    None => {
                        group_index.insert(mutation.to_owned(), mutations.len());
                        mutations.push(MutationGroup {
                            key: mutation.to_owned(),
                            carriers: vec![idx],
                        });
                    }
                }
            }
        }

        Ok(Cohort {
            samples,
            weights,
            mutations,
        })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// true at every sample index carried by some mutation group
    pub fn mutated_mask(&self) -> Vec<bool> {
        let mut mask = vec![false; self.samples.len()];
        for group in &self.mutations {
            for &idx in &group.carriers {
                mask[idx] = true;
            }
        }

        mask
    }
}

fn field_at<'a>(
    fields: &[&'a str],
    idx: usize,
    name: &str,
    row: usize,
) -> Result<&'a str, SavError> {
    fields.get(idx).copied().ok_or_else(|| {
        SavError::Configuration(format!("manifest line {} has no {} field", row, name))
    })
}
