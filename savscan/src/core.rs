//! Core module of savscan
//!
//! Drives the full scan: cohort assembly from the manifest, network
//! construction from the junction table, the real scoring pass, the
//! permutation null, q-value estimation and the final reports.

use anyhow::Result;
use log::{info, warn};
use rayon::prelude::*;

use hashbrown::HashMap;
use std::fs;

use config::{get_progress_bar, SavError, NETWORK_SUFFIX, PERM_SUFFIX, RESULT_SUFFIX};

use crate::cli::Args;
use crate::utils::{prefixed_path, write_permutation_rows, write_results, Sav};

pub mod cohort;
pub mod fdr;
pub mod model;
pub mod network;
pub mod permutation;

use cohort::Cohort;
use fdr::add_q_values;
use model::{ModelParams, ReportGates};
use network::{read_networks, Network, NetworkStore};
use permutation::run_permutations;

/// Scores every link of one network, keeping gate passers
///
/// The real pass scores each link on its observed carriers; permutation
/// passes supply a relabelled carrier table instead, looked up by
/// mutation key. A key absent from the table marks the replicate as
/// corrupt.
///
/// # Arguments
///
/// * `network` - the network whose links get scored
/// * `table` - relabelled carriers per mutation key, or None for the real pass
/// * `params` - Gamma-Poisson hyperparameters
/// * `gates` - reporting thresholds
///
/// # Returns
///
/// * `Result<Vec<Sav>, SavError>` - associations passing both gates
pub fn score_network(
    network: &Network,
    table: Option<&HashMap<String, Vec<usize>>>,
    params: &ModelParams,
    gates: &ReportGates,
) -> Result<Vec<Sav>, SavError> {
    let mut savs = Vec::new();

    for link in &network.links {
        let carriers = match table {
            Some(lookup) => lookup.get(&link.mutation_key).ok_or_else(|| {
                SavError::DataIntegrity(format!(
                    "mutation {} is missing from the carrier table",
                    link.mutation_key
                ))
            })?,
            None => &link.carriers,
        };

        let score = model::score_link(&network.event.counts, &network.weights, carriers, params);
        if !gates.pass(&score) {
            continue;
        }

        savs.push(Sav::from_link(network, link, &score));
    }

    Ok(savs)
}

/// Runs the whole splicing-associated variant scan
///
/// # Arguments
///
/// * `args` - validated command-line arguments
///
/// # Returns
///
/// * `Result<()>` - Err on configuration or IO failures
///
/// # Example
///
/// ```rust, no_run
/// use clap::Parser;
/// use savscan::cli::Args;
/// use savscan::core::detect_savs;
///
/// let args = Args::parse();
/// detect_savs(args).unwrap();
/// ```
pub fn detect_savs(args: Args) -> Result<()> {
    info!("Using genome assembly: {}", args.genome_id);

    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    info!("Organizing mutation data...");
    let cohort = Cohort::from_manifest(&args.manifest)?;
    info!(
        "Cohort of {} samples with {} distinct mutations",
        cohort.len(),
        cohort.mutations.len()
    );

    let params = ModelParams {
        alpha0: args.alpha0,
        beta0: args.beta0,
        alpha1: args.alpha1,
        beta1: args.beta1,
    };
    let gates = ReportGates {
        log_bf: args.log_bf_thres,
        effect_size: args.effect_size_thres,
    };

    info!("Extracting splicing associated variants...");
    let networks = read_networks(
        &args.junctions,
        &cohort,
        args.sj_num_thres,
        args.zero_filter_prob,
    )?;
    info!("Assembled {} networks", networks.len());

    // INFO: mirror the networks to the store before any scoring pass
    let store_path = prefixed_path(&args.output, NETWORK_SUFFIX);
    let mut store = NetworkStore::create(&store_path)?;
    for network in &networks {
        store.append(network)?;
    }
    store.finish()?;

    let pb = get_progress_bar(networks.len() as u64, "Scoring networks");
    let mut savs: Vec<Sav> = networks
        .par_iter()
        .map(|network| {
            let scored = score_network(network, None, &params, &gates);
            pb.inc(1);
            scored
        })
        .collect::<Result<Vec<Vec<Sav>>, SavError>>()?
        .into_iter()
        .flatten()
        .collect();
    pb.finish_and_clear();
    info!("{} associations pass the reporting gates", savs.len());

    let summary = run_permutations(
        &cohort,
        &networks,
        &params,
        &gates,
        args.permutation_num,
        args.seed,
    );
    let pooled: Vec<f64> = summary
        .replicate_savs
        .iter()
        .flat_map(|(_, savs)| savs.iter().map(|sav| sav.log_bf))
        .collect();

    info!("Adding Q-values to splicing associated variants...");
    match add_q_values(&mut savs, &pooled, summary.successful) {
        Ok(()) => {}
        Err(SavError::InsufficientPermutations) => {
            warn!("No permutation replicates available; reporting without Q-values")
        }
        Err(e) => return Err(e.into()),
    }

    info!("Generating final outputs...");
    write_results(&savs, &prefixed_path(&args.output, RESULT_SUFFIX))?;
    write_permutation_rows(
        &summary.replicate_savs,
        &prefixed_path(&args.output, PERM_SUFFIX),
    )?;

    if args.debug {
        info!("Keeping network store: {:?}", store_path);
    } else {
        fs::remove_file(&store_path)?;
    }

    Ok(())
}
