//! Bayesian scoring of mutation and splicing-event links
//!
//! Per-sample junction read counts are modelled as Poisson draws whose
//! rates are scaled by the sample normalization weight and shared within
//! a rate regime. Integrating a Gamma prior over the shared rate gives a
//! closed-form marginal likelihood, so comparing the carrier-specific
//! regime against a single pooled regime reduces to a handful of
//! log-gamma evaluations per link.

use statrs::function::gamma::ln_gamma;

use config::ZERO_RATE_PSEUDO_COUNT;

/// Gamma hyperparameters of the inactive and active rate regimes
///
/// # Fields
///
/// * `alpha0`, `beta0` - shape and rate of the inactive (background) regime
/// * `alpha1`, `beta1` - shape and rate of the active (carrier) regime
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelParams {
    pub alpha0: f64,
    pub beta0: f64,
    pub alpha1: f64,
    pub beta1: f64,
}

/// Effect size and log Bayes Factor of a single link
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkScore {
    pub effect_size: f64,
    pub log_bf: f64,
}

/// Report gates applied to every scored link, real or permuted
///
/// The effect-size and log-BF thresholds are conjunctive.
#[derive(Debug, Clone, Copy)]
pub struct ReportGates {
    pub log_bf: f64,
    pub effect_size: f64,
}

impl ReportGates {
    #[inline(always)]
    pub fn pass(&self, score: &LinkScore) -> bool {
        score.effect_size >= self.effect_size && score.log_bf >= self.log_bf
    }
}

/// log marginal likelihood of a count aggregate under one Gamma-Poisson regime
///
/// Per-sample terms that do not depend on the carrier partition cancel
/// when two partitions of the same samples are compared, so only the
/// aggregate count and weight sums enter.
#[inline(always)]
fn log_marginal(count_sum: f64, weight_sum: f64, alpha: f64, beta: f64) -> f64 {
    ln_gamma(alpha + count_sum) - ln_gamma(alpha) + alpha * beta.ln()
        - (alpha + count_sum) * (beta + weight_sum).ln()
}

/// Scores one link: weight-normalized effect size plus log Bayes Factor
///
/// The null keeps every sample in the inactive regime; the alternative
/// moves the carriers into the active regime while non-carriers stay
/// inactive. Degenerate partitions are defined results, never errors:
/// an empty carrier set, an empty non-carrier set, or zero observed
/// reads across the cohort all score exactly zero.
///
/// # Arguments
///
/// * `counts` - per-sample junction read counts for the event
/// * `weights` - per-sample normalization weights, aligned with `counts`
/// * `carriers` - sorted sample indices carrying the mutation
/// * `params` - Gamma hyperparameters of the two regimes
///
/// # Returns
///
/// * `LinkScore` - effect size and log Bayes Factor
///
/// # Example
///
/// ```rust, no_run
/// use savscan::core::model::{score_link, ModelParams};
///
/// let params = ModelParams { alpha0: 1.0, beta0: 1.0, alpha1: 1.0, beta1: 0.01 };
/// let score = score_link(&[10.0, 12.0, 0.0, 1.0], &[1.0; 4], &[0, 1], &params);
///
/// assert!(score.log_bf > 3.0);
/// ```
#[inline(always)]
pub fn score_link(
    counts: &[f64],
    weights: &[f64],
    carriers: &[usize],
    params: &ModelParams,
) -> LinkScore {
    debug_assert_eq!(counts.len(), weights.len());

    let total_counts: f64 = counts.iter().sum();
    let total_weights: f64 = weights.iter().sum();

    // INFO: nothing can be claimed without carriers, without background, or without reads
    if carriers.is_empty() || carriers.len() == counts.len() || total_counts == 0.0 {
        return LinkScore {
            effect_size: 0.0,
            log_bf: 0.0,
        };
    }

    let mut carrier_counts = 0.0;
    let mut carrier_weights = 0.0;
    for &idx in carriers {
        carrier_counts += counts[idx];
        carrier_weights += weights[idx];
    }

    let background_counts = (total_counts - carrier_counts).max(0.0);
    let background_weights = (total_weights - carrier_weights).max(0.0);

    let effect_size = if carrier_counts == 0.0 {
        0.0
    } else {
        let carrier_rate = carrier_counts / carrier_weights;
        let background_rate =
            background_counts.max(ZERO_RATE_PSEUDO_COUNT) / background_weights;
        carrier_rate / background_rate
    };

    let active = log_marginal(
        background_counts,
        background_weights,
        params.alpha0,
        params.beta0,
    ) + log_marginal(carrier_counts, carrier_weights, params.alpha1, params.beta1);
    let inactive = log_marginal(total_counts, total_weights, params.alpha0, params.beta0);

    LinkScore {
        effect_size,
        log_bf: active - inactive,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_params() -> ModelParams {
        ModelParams {
            alpha0: 1.0,
            beta0: 1.0,
            alpha1: 1.0,
            beta1: 0.01,
        }
    }

    #[test]
    fn test_no_carriers_scores_zero() {
        let score = score_link(&[10.0, 12.0, 0.0, 1.0], &[1.0; 4], &[], &default_params());

        assert_eq!(score.log_bf, 0.0);
        assert_eq!(score.effect_size, 0.0);
    }

    #[test]
    fn test_all_carriers_scores_zero() {
        let score = score_link(
            &[10.0, 12.0, 0.0, 1.0],
            &[1.0; 4],
            &[0, 1, 2, 3],
            &default_params(),
        );

        assert_eq!(score.log_bf, 0.0);
        assert_eq!(score.effect_size, 0.0);
    }

    #[test]
    fn test_no_reads_scores_zero() {
        let score = score_link(&[0.0; 4], &[1.0; 4], &[0, 1], &default_params());

        assert_eq!(score.log_bf, 0.0);
        assert_eq!(score.effect_size, 0.0);
    }

    #[test]
    fn test_carrier_enriched_counts_score_high() {
        let score = score_link(&[10.0, 12.0, 0.0, 1.0], &[1.0; 4], &[0, 1], &default_params());

        // carriers run at 11 reads per unit weight against a pseudo-counted
        // background of 0.5 reads over weight 2
        assert_eq!(score.effect_size, 22.0);
        assert!(score.log_bf > 3.0);
        assert!((score.log_bf - 12.6315).abs() < 1e-3);
    }

    #[test]
    fn test_flat_counts_carry_no_evidence() {
        let score = score_link(&[5.0; 4], &[1.0; 4], &[0, 1], &default_params());

        assert_eq!(score.effect_size, 1.0);
        assert!(score.log_bf.abs() < 3.0);
        assert!((score.log_bf + 2.6980).abs() < 1e-3);
    }

    #[test]
    fn test_quiet_carriers_are_gated_by_effect_size() {
        let score = score_link(&[0.0, 0.0, 8.0, 9.0], &[1.0; 4], &[0, 1], &default_params());

        // carving silent carriers out of an active background shifts the
        // marginal likelihood toward the split, so the evidence is
        // two-sided and only the effect gate excludes this link
        assert_eq!(score.effect_size, 0.0);
        assert!((score.log_bf - 3.8916).abs() < 1e-3);

        let gates = ReportGates {
            log_bf: 3.0,
            effect_size: 3.0,
        };
        assert!(!gates.pass(&score));
    }

    #[test]
    fn test_weights_rescale_the_effect() {
        // carriers observed at twice the sequencing depth of the background
        let score = score_link(
            &[20.0, 24.0, 5.0, 6.0],
            &[2.0, 2.0, 1.0, 1.0],
            &[0, 1],
            &default_params(),
        );

        assert_eq!(score.effect_size, 2.0);
    }

    #[test]
    fn test_gates_are_conjunctive() {
        let gates = ReportGates {
            log_bf: 3.0,
            effect_size: 3.0,
        };

        let both = LinkScore {
            effect_size: 5.0,
            log_bf: 5.0,
        };
        let effect_only = LinkScore {
            effect_size: 5.0,
            log_bf: 2.0,
        };
        let bf_only = LinkScore {
            effect_size: 2.0,
            log_bf: 5.0,
        };
        let neither = LinkScore {
            effect_size: 2.0,
            log_bf: 2.0,
        };

        assert!(gates.pass(&both));
        assert!(!gates.pass(&effect_only));
        assert!(!gates.pass(&bf_only));
        assert!(!gates.pass(&neither));
    }
}
