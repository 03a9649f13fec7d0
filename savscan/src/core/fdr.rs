//! Empirical false discovery rate from the pooled permutation null
//!
//! Real associations are ranked by Bayes factor and each rank is
//! compared against every permuted score at once: the expected number
//! of null hits at least as strong, averaged over replicates, divided
//! by the number of real hits at that rank. A final step-up pass keeps
//! the estimates monotone so a weaker hit never reports a smaller q
//! than a stronger one.

use config::SavError;

use crate::utils::Sav;

/// Attaches an empirical q-value to every reported association
///
/// Permuted scores are pooled across replicates; a permuted score at
/// least as large as the real one counts against it, ties included.
/// Estimates are clipped to [0, 1] before the step-up pass.
///
/// # Arguments
///
/// * `savs` - gate passers from the real scan, any order
/// * `permuted_log_bfs` - pooled Bayes factors of every permutation hit
/// * `replicates` - number of replicates the pool was drawn from
///
/// # Returns
///
/// * `Result<(), SavError>` - `InsufficientPermutations` when no
///   replicate survived to estimate from
pub fn add_q_values(
    savs: &mut [Sav],
    permuted_log_bfs: &[f64],
    replicates: usize,
) -> Result<(), SavError> {
    if replicates == 0 {
        return Err(SavError::InsufficientPermutations);
    }
    if savs.is_empty() {
        return Ok(());
    }

    let mut order: Vec<usize> = (0..savs.len()).collect();
    order.sort_unstable_by(|&a, &b| savs[b].log_bf.total_cmp(&savs[a].log_bf));

    let mut permuted: Vec<f64> = permuted_log_bfs.to_vec();
    permuted.sort_unstable_by(|a, b| b.total_cmp(a));

    let replicate_count = replicates as f64;
    let mut exceeded = 0usize;
    let mut q_raw = vec![0.0_f64; savs.len()];

    for (rank, &idx) in order.iter().enumerate() {
        while exceeded < permuted.len() && permuted[exceeded] >= savs[idx].log_bf {
            exceeded += 1;
        }

        let false_hits = exceeded as f64 / replicate_count;
        q_raw[rank] = (false_hits / (rank + 1) as f64).clamp(0.0, 1.0);
    }

    // step-up pass from the weakest rank upward
    let mut running = f64::INFINITY;
    for rank in (0..order.len()).rev() {
        running = running.min(q_raw[rank]);
        savs[order[rank]].q_value = Some(running);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::SplicingClass;

    fn sav_with(log_bf: f64) -> Sav {
        Sav {
            gene: "GENE7".into(),
            mutation_key: "SF3B1:R625H".into(),
            motif_pos: None,
            mutation_type: None,
            is_canonical: None,
            splicing_key: "chr1:100-200".into(),
            splicing_class: SplicingClass::ExonSkipping,
            is_inframe: "in-frame".into(),
            effect_size: 10.0,
            log_bf,
            q_value: None,
        }
    }

    #[test]
    fn test_zero_replicates_is_an_error_even_without_hits() {
        let mut none: Vec<Sav> = vec![];
        assert!(matches!(
            add_q_values(&mut none, &[], 0),
            Err(SavError::InsufficientPermutations)
        ));

        let mut some = vec![sav_with(5.0)];
        assert!(matches!(
            add_q_values(&mut some, &[1.0], 0),
            Err(SavError::InsufficientPermutations)
        ));
    }

    #[test]
    fn test_no_hits_is_fine_with_replicates() {
        let mut savs: Vec<Sav> = vec![];
        assert!(add_q_values(&mut savs, &[4.0, 5.0], 2).is_ok());
    }

    #[test]
    fn test_hand_worked_ranking() {
        // real [10, 8, 8, 5, 2] against pooled [9, 7, 7, 6, 3, 1] over 2 replicates
        let mut savs: Vec<Sav> = [10.0, 8.0, 8.0, 5.0, 2.0]
            .iter()
            .map(|&log_bf| sav_with(log_bf))
            .collect();

        add_q_values(&mut savs, &[9.0, 7.0, 7.0, 6.0, 3.0, 1.0], 2).unwrap();

        let qs: Vec<f64> = savs.iter().map(|sav| sav.q_value.unwrap()).collect();
        assert!((qs[0] - 0.0).abs() < 1e-12);
        assert!((qs[1] - 1.0 / 6.0).abs() < 1e-12);
        assert!((qs[2] - 1.0 / 6.0).abs() < 1e-12);
        assert!((qs[3] - 0.5).abs() < 1e-12);
        assert!((qs[4] - 0.5).abs() < 1e-12);

        // equal scores share a q after the step-up pass
        assert_eq!(savs[1].q_value, savs[2].q_value);
    }

    #[test]
    fn test_estimates_are_clipped_to_one() {
        let mut savs = vec![sav_with(1.0)];

        add_q_values(&mut savs, &[2.0; 10], 2).unwrap();

        assert_eq!(savs[0].q_value, Some(1.0));
    }

    #[test]
    fn test_tied_permuted_scores_count_as_exceedances() {
        let mut savs = vec![sav_with(5.0)];

        add_q_values(&mut savs, &[5.0, 5.0], 1).unwrap();

        assert_eq!(savs[0].q_value, Some(1.0));
    }

    #[test]
    fn test_q_is_monotone_in_rank() {
        let mut savs: Vec<Sav> = [9.0, 7.0, 4.0, 3.5, 3.2]
            .iter()
            .map(|&log_bf| sav_with(log_bf))
            .collect();

        add_q_values(&mut savs, &[8.0, 6.0, 5.0, 3.8, 3.3, 3.1], 3).unwrap();

        let qs: Vec<f64> = savs.iter().map(|sav| sav.q_value.unwrap()).collect();
        assert!(qs.windows(2).all(|w| w[0] <= w[1]));
    }
}
