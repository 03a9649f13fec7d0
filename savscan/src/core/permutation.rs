//! Permutation null for the association scan
//!
//! Each replicate draws a single shuffle of the sample indices and
//! rewrites every mutation group's carrier set through it, so group
//! sizes and carrier co-occurrence survive while the pairing between
//! carriers and splicing counts is broken. Replicates run in parallel
//! and fan their networks out in parallel as well; a failed replicate
//! is logged and dropped rather than aborting the scan.

use dashmap::DashMap;
use log::warn;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;

use hashbrown::HashMap;

use config::{get_progress_bar, SavError};

use crate::core::cohort::Cohort;
use crate::core::model::{ModelParams, ReportGates};
use crate::core::network::Network;
use crate::core::score_network;
use crate::utils::Sav;

/// Gate passers per replicate, with the number of replicates that ran clean
#[derive(Debug, Default)]
pub struct PermutationSummary {
    pub replicate_savs: Vec<(usize, Vec<Sav>)>,
    pub successful: usize,
}

/// Draws one carrier-label shuffle for the whole cohort
///
/// # Arguments
///
/// * `cohort` - cohort whose mutation groups get relabelled
/// * `rng` - replicate-local random stream
///
/// # Returns
///
/// * `HashMap<String, Vec<usize>>` - permuted, sorted carriers per mutation key
pub fn permuted_carrier_table(
    cohort: &Cohort,
    rng: &mut Xoshiro256PlusPlus,
) -> HashMap<String, Vec<usize>> {
    let mut shuffled: Vec<usize> = (0..cohort.len()).collect();
    shuffled.shuffle(rng);

    cohort
        .mutations
        .iter()
        .map(|group| {
            let mut carriers: Vec<usize> =
                group.carriers.iter().map(|&idx| shuffled[idx]).collect();
            carriers.sort_unstable();

            (group.key.clone(), carriers)
        })
        .collect()
}

/// Scores every network under permuted carrier labels
///
/// A fixed seed makes the whole null reproducible: replicate r derives
/// its stream from `seed + r`, so results do not depend on how rayon
/// schedules the replicates.
///
/// # Arguments
///
/// * `cohort` - cohort providing samples and mutation groups
/// * `networks` - assembled networks to rescore
/// * `params` - Gamma-Poisson hyperparameters
/// * `gates` - reporting thresholds applied exactly as in the real pass
/// * `replicates` - number of label shuffles to draw
/// * `seed` - base seed, or None for an entropy-seeded run
///
/// # Returns
///
/// * `PermutationSummary` - gate passers per surviving replicate
///
/// # Example
///
/// ```rust, no_run
/// use std::path::Path;
///
/// use savscan::core::cohort::Cohort;
/// use savscan::core::model::{ModelParams, ReportGates};
/// use savscan::core::network::read_networks;
/// use savscan::core::permutation::run_permutations;
///
/// let cohort = Cohort::from_manifest(Path::new("cohort.tsv")).unwrap();
/// let networks = read_networks(Path::new("junctions.tsv"), &cohort, 5, None).unwrap();
///
/// let params = ModelParams { alpha0: 1.0, beta0: 1.0, alpha1: 1.0, beta1: 0.01 };
/// let gates = ReportGates { log_bf: 3.0, effect_size: 3.0 };
///
/// let summary = run_permutations(&cohort, &networks, &params, &gates, 10, Some(7));
/// println!("{} replicates pooled", summary.successful);
/// ```
pub fn run_permutations(
    cohort: &Cohort,
    networks: &[Network],
    params: &ModelParams,
    gates: &ReportGates,
    replicates: usize,
    seed: Option<u64>,
) -> PermutationSummary {
    let accumulator: DashMap<usize, Vec<Sav>> = DashMap::new();
    let pb = get_progress_bar(replicates as u64, "Permuting carrier labels");

    (0..replicates).into_par_iter().for_each(|replicate| {
        // WARN: seed per replicate, not per worker -> results stay schedule-independent
        let mut rng = match seed {
            Some(base) => Xoshiro256PlusPlus::seed_from_u64(base.wrapping_add(replicate as u64)),
            None => Xoshiro256PlusPlus::from_entropy(),
        };
        let table = permuted_carrier_table(cohort, &mut rng);

        match scan_replicate(networks, &table, params, gates) {
            Ok(savs) => {
                accumulator.insert(replicate, savs);
            }
            Err(e) => warn!("Permutation replicate {} failed: {}", replicate, e),
        }

        pb.inc(1);
    });

    pb.finish_and_clear();

    let mut replicate_savs: Vec<(usize, Vec<Sav>)> = accumulator.into_iter().collect();
    replicate_savs.sort_unstable_by_key(|(replicate, _)| *replicate);
    let successful = replicate_savs.len();

    PermutationSummary {
        replicate_savs,
        successful,
    }
}

fn scan_replicate(
    networks: &[Network],
    table: &HashMap<String, Vec<usize>>,
    params: &ModelParams,
    gates: &ReportGates,
) -> Result<Vec<Sav>, SavError> {
    let savs = networks
        .par_iter()
        .map(|network| score_network(network, Some(table), params, gates))
        .collect::<Result<Vec<Vec<Sav>>, SavError>>()?
        .into_iter()
        .flatten()
        .collect();

    Ok(savs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cohort::MutationGroup;
    use crate::core::fdr::add_q_values;
    use crate::core::model::score_link;
    use crate::core::network::{Link, SplicingEvent};
    use config::SplicingClass;

    fn default_params() -> ModelParams {
        ModelParams {
            alpha0: 1.0,
            beta0: 1.0,
            alpha1: 1.0,
            beta1: 0.01,
        }
    }

    fn default_gates() -> ReportGates {
        ReportGates {
            log_bf: 3.0,
            effect_size: 3.0,
        }
    }

    fn cohort(n: usize, groups: Vec<MutationGroup>) -> Cohort {
        Cohort {
            samples: (0..n).map(|i| format!("S{}", i)).collect(),
            weights: vec![1.0; n],
            mutations: groups,
        }
    }

    fn network_for(cohort: &Cohort, counts: Vec<f64>) -> Network {
        Network {
            gene: "GENE7".into(),
            samples: cohort.samples.clone(),
            weights: cohort.weights.clone(),
            event: SplicingEvent {
                splicing_key: "chr1:100-200".into(),
                splicing_class: SplicingClass::ExonSkipping,
                is_inframe: "in-frame".into(),
                counts,
            },
            links: cohort
                .mutations
                .iter()
                .map(|group| Link {
                    mutation_key: group.key.clone(),
                    carriers: group.carriers.clone(),
                    motif_pos: None,
                    mutation_type: None,
                    is_canonical: None,
                })
                .collect(),
        }
    }

    #[test]
    fn test_shuffle_preserves_group_structure() {
        let cohort = cohort(
            6,
            vec![
                MutationGroup {
                    key: "A".into(),
                    carriers: vec![0, 5],
                },
                MutationGroup {
                    key: "B".into(),
                    carriers: vec![2],
                },
            ],
        );

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(11);
        for _ in 0..20 {
            let table = permuted_carrier_table(&cohort, &mut rng);

            let a = &table["A"];
            let b = &table["B"];
            assert_eq!(a.len(), 2);
            assert_eq!(b.len(), 1);
            assert!(a.windows(2).all(|w| w[0] < w[1]));
            assert!(a.iter().chain(b.iter()).all(|&idx| idx < 6));
        }
    }

    #[test]
    fn test_shuffle_preserves_carrier_overlap() {
        // groups sharing a sample must share exactly one relabelled index too
        let cohort = cohort(
            8,
            vec![
                MutationGroup {
                    key: "A".into(),
                    carriers: vec![0, 1],
                },
                MutationGroup {
                    key: "B".into(),
                    carriers: vec![1],
                },
            ],
        );

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(5);
        for _ in 0..20 {
            let table = permuted_carrier_table(&cohort, &mut rng);
            let shared = table["A"]
                .iter()
                .filter(|idx| table["B"].contains(idx))
                .count();

            assert_eq!(shared, 1);
        }
    }

    #[test]
    fn test_shuffle_moves_labels() {
        let cohort = cohort(
            10,
            vec![MutationGroup {
                key: "A".into(),
                carriers: vec![0, 1],
            }],
        );

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(17);
        let moved = (0..20)
            .map(|_| permuted_carrier_table(&cohort, &mut rng))
            .filter(|table| table["A"] != vec![0, 1])
            .count();

        assert!(moved > 0);
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let cohort = cohort(
            4,
            vec![MutationGroup {
                key: "SF3B1:R625H".into(),
                carriers: vec![0, 1],
            }],
        );
        let networks = vec![network_for(&cohort, vec![10.0, 12.0, 0.0, 1.0])];

        let first = run_permutations(
            &cohort,
            &networks,
            &default_params(),
            &default_gates(),
            8,
            Some(99),
        );
        let second = run_permutations(
            &cohort,
            &networks,
            &default_params(),
            &default_gates(),
            8,
            Some(99),
        );

        assert_eq!(first.successful, 8);
        assert_eq!(first.replicate_savs, second.replicate_savs);
    }

    #[test]
    fn test_failed_replicates_are_excluded_from_the_pool() {
        let cohort = cohort(
            4,
            vec![MutationGroup {
                key: "SF3B1:R625H".into(),
                carriers: vec![0, 1],
            }],
        );

        // a link keyed to a mutation the cohort does not know fails the
        // carrier lookup in every replicate
        let mut network = network_for(&cohort, vec![10.0, 12.0, 0.0, 1.0]);
        network.links[0].mutation_key = "GHOST:G12D".into();

        let summary = run_permutations(
            &cohort,
            &[network],
            &default_params(),
            &default_gates(),
            5,
            Some(3),
        );

        assert_eq!(summary.successful, 0);
        assert!(summary.replicate_savs.is_empty());

        // an empty pool leaves the q-value stage with nothing to estimate from
        assert!(matches!(
            add_q_values(&mut Vec::new(), &[], summary.successful),
            Err(SavError::InsufficientPermutations)
        ));
    }

    #[test]
    fn test_replicate_savs_follow_network_order() {
        let cohort = cohort(
            4,
            vec![MutationGroup {
                key: "SF3B1:R625H".into(),
                carriers: vec![0, 1],
            }],
        );
        let mut second = network_for(&cohort, vec![10.0, 12.0, 0.0, 1.0]);
        second.gene = "GENE8".into();
        let networks = vec![network_for(&cohort, vec![10.0, 12.0, 0.0, 1.0]), second];

        // open gates make every link a passer under any relabelling
        let gates = ReportGates {
            log_bf: f64::NEG_INFINITY,
            effect_size: 0.0,
        };
        let summary = run_permutations(&cohort, &networks, &default_params(), &gates, 6, Some(41));

        assert_eq!(summary.successful, 6);
        for (_, savs) in &summary.replicate_savs {
            assert_eq!(savs.len(), 2);
            assert_eq!(savs[0].gene, "GENE7");
            assert_eq!(savs[1].gene, "GENE8");
        }
    }

    #[test]
    fn test_flat_counts_never_pass_under_any_relabelling() {
        // every carrier pair on near-flat data scores under both gates
        let counts = [4.0, 6.0, 5.0, 5.0, 6.0, 4.0, 5.0, 5.0];
        let weights = [1.0; 8];
        let params = default_params();

        for i in 0..8 {
            for j in (i + 1)..8 {
                let score = score_link(&counts, &weights, &[i, j], &params);

                assert!(score.log_bf < 0.0);
                assert!(score.effect_size < 2.0);
            }
        }
    }

    #[test]
    fn test_null_scan_reports_nothing_on_flat_data() {
        let cohort = cohort(
            8,
            vec![MutationGroup {
                key: "SRSF2:P95H".into(),
                carriers: vec![3, 6],
            }],
        );
        let networks = vec![network_for(
            &cohort,
            vec![4.0, 6.0, 5.0, 5.0, 6.0, 4.0, 5.0, 5.0],
        )];

        let summary = run_permutations(
            &cohort,
            &networks,
            &default_params(),
            &default_gates(),
            50,
            Some(1234),
        );

        assert_eq!(summary.successful, 50);
        let pooled: usize = summary.replicate_savs.iter().map(|(_, savs)| savs.len()).sum();
        assert_eq!(pooled, 0);
    }
}
