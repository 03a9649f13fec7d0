use clap::Parser;
use config::{
    ArgCheck, DEFAULT_ALPHA0, DEFAULT_ALPHA1, DEFAULT_BETA0, DEFAULT_BETA1,
    DEFAULT_EFFECT_SIZE_THRESHOLD, DEFAULT_LOG_BF_THRESHOLD, DEFAULT_PERMUTATION_NUM,
    DEFAULT_SJ_NUM_THRESHOLD, GENOMES, VERSION,
};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version = VERSION)]
pub struct Args {
    #[arg(
        short = 'm',
        long = "manifest",
        required = true,
        value_name = "PATH",
        help = "Path to the cohort manifest (sample, mutations, junction file, weight)"
    )]
    pub manifest: PathBuf,

    #[arg(
        short = 'j',
        long = "junctions",
        required = true,
        value_name = "PATH",
        help = "Path to the merged annotated splicing junction table"
    )]
    pub junctions: PathBuf,

    #[arg(
        short = 'o',
        long = "output",
        required = true,
        value_name = "PREFIX",
        help = "Prefix for the output report files"
    )]
    pub output: PathBuf,

    #[arg(
        long = "genome-id",
        value_name = "GENOME",
        default_value = "hg19",
        value_parser = GENOMES,
        help = "Genome assembly the junction coordinates refer to"
    )]
    pub genome_id: String,

    #[arg(
        long = "sj-num-thres",
        value_name = "COUNT",
        default_value_t = DEFAULT_SJ_NUM_THRESHOLD,
        help = "Keep a junction only if some sample reaches this read count"
    )]
    pub sj_num_thres: usize,

    #[arg(
        long = "permutation-num",
        value_name = "NUM",
        default_value_t = DEFAULT_PERMUTATION_NUM,
        help = "Number of carrier-label permutations for the null"
    )]
    pub permutation_num: usize,

    #[arg(
        long = "alpha0",
        value_name = "FLOAT",
        default_value_t = DEFAULT_ALPHA0,
        help = "Gamma shape prior of the inactive state"
    )]
    pub alpha0: f64,

    #[arg(
        long = "beta0",
        value_name = "FLOAT",
        default_value_t = DEFAULT_BETA0,
        help = "Gamma rate prior of the inactive state"
    )]
    pub beta0: f64,

    #[arg(
        long = "alpha1",
        value_name = "FLOAT",
        default_value_t = DEFAULT_ALPHA1,
        help = "Gamma shape prior of the active state"
    )]
    pub alpha1: f64,

    #[arg(
        long = "beta1",
        value_name = "FLOAT",
        default_value_t = DEFAULT_BETA1,
        help = "Gamma rate prior of the active state"
    )]
    pub beta1: f64,

    #[arg(
        long = "log-bf-thres",
        value_name = "FLOAT",
        default_value_t = DEFAULT_LOG_BF_THRESHOLD,
        help = "Minimum log Bayes factor to report an association"
    )]
    pub log_bf_thres: f64,

    #[arg(
        long = "effect-size-thres",
        value_name = "FLOAT",
        default_value_t = DEFAULT_EFFECT_SIZE_THRESHOLD,
        help = "Minimum carrier over non-carrier rate ratio to report"
    )]
    pub effect_size_thres: f64,

    #[arg(
        long = "zero-filter-prob",
        required = false,
        value_name = "PROB",
        help = "Drop junctions supported by more than this fraction of mutation-free samples"
    )]
    pub zero_filter_prob: Option<f64>,

    #[arg(
        long = "seed",
        required = false,
        value_name = "SEED",
        help = "Base seed for reproducible permutations"
    )]
    pub seed: Option<u64>,

    #[arg(
        short = 't',
        long = "threads",
        help = "Number of threads",
        value_name = "THREADS",
        default_value_t = num_cpus::get()
    )]
    pub threads: usize,

    #[arg(
        short = 'd',
        long = "debug",
        help = "Flag to keep the intermediate network store",
        value_name = "FLAG",
        default_value = "false"
    )]
    pub debug: bool,
}

impl ArgCheck for Args {
    fn get_manifest(&self) -> &PathBuf {
        &self.manifest
    }

    fn get_junctions(&self) -> &PathBuf {
        &self.junctions
    }

    fn get_hyperparameters(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("alpha0", self.alpha0),
            ("beta0", self.beta0),
            ("alpha1", self.alpha1),
            ("beta1", self.beta1),
        ]
    }

    fn get_probabilities(&self) -> Vec<(&'static str, Option<f64>)> {
        vec![("zero-filter-prob", self.zero_filter_prob)]
    }

    fn get_threads(&self) -> usize {
        self.threads
    }
}
