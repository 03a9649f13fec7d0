use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// numeric values
pub const MIN_THREADS: usize = 1;
pub const DEFAULT_ALPHA0: f64 = 1.0;
pub const DEFAULT_BETA0: f64 = 1.0;
pub const DEFAULT_ALPHA1: f64 = 1.0;
pub const DEFAULT_BETA1: f64 = 0.01;
pub const DEFAULT_LOG_BF_THRESHOLD: f64 = 3.0;
pub const DEFAULT_EFFECT_SIZE_THRESHOLD: f64 = 3.0;
pub const DEFAULT_SJ_NUM_THRESHOLD: usize = 5;
pub const DEFAULT_PERMUTATION_NUM: usize = 10;
pub const ZERO_RATE_PSEUDO_COUNT: f64 = 0.5;

// manifest columns
pub const SAMPLE_NAME: &str = "Sample_Name";
pub const MUTATION_INFO: &str = "Mutation_Info";
pub const SJ_FILE: &str = "SJ_File";
pub const WEIGHT: &str = "Weight";
pub const MANIFEST_COLUMNS: [&str; 4] = [SAMPLE_NAME, MUTATION_INFO, SJ_FILE, WEIGHT];

// junction table columns
pub const SPLICING_CLASS: &str = "Splicing_Class";
pub const GENE_1: &str = "Gene_1";
pub const GENE_2: &str = "Gene_2";
pub const SJ_CHROM: &str = "SJ_1";
pub const SJ_START: &str = "SJ_2";
pub const SJ_END: &str = "SJ_3";
pub const SJ_COUNTS: &str = "SJ_4";
pub const IS_INFRAME: &str = "Is_Inframe";
pub const JUNCTION_COLUMNS: [&str; 8] = [
    SPLICING_CLASS,
    GENE_1,
    GENE_2,
    SJ_CHROM,
    SJ_START,
    SJ_END,
    SJ_COUNTS,
    IS_INFRAME,
];

// field sentinels
pub const NO_MUTATION: &str = "None";
pub const MISSING_FIELD: &str = "---";

// supported assemblies; coordinates are passed through, the id is recorded for provenance
pub const GENOMES: [&str; 3] = ["hg19", "hg38", "mm10"];

// output file suffixes
pub const RESULT_SUFFIX: &str = ".savscan.result.txt";
pub const PERM_SUFFIX: &str = ".savscan.perm_all.txt";
pub const NETWORK_SUFFIX: &str = ".savscan.network.jsonl";

// result columns
pub const RESULT_HEADER: [&str; 11] = [
    "Gene_Symbol",
    "Mutation_Key",
    "Motif_Pos",
    "Mutation_Type",
    "Is_Canonical",
    "Splicing_Key",
    "Splicing_Class",
    "Is_Inframe",
    "Effect_Size",
    "Log_BF",
    "Q_Value",
];
pub const PERM_HEADER: [&str; 11] = [
    "Permutation_Num",
    "Gene_Symbol",
    "Mutation_Key",
    "Motif_Pos",
    "Mutation_Type",
    "Is_Canonical",
    "Splicing_Key",
    "Splicing_Class",
    "Is_Inframe",
    "Effect_Size",
    "Log_BF",
];

// os
#[cfg(not(windows))]
const TICK_SETTINGS: (&str, u64) = ("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ", 80);
#[cfg(windows)]
const TICK_SETTINGS: (&str, u64) = (r"+-x| ", 200);

/// return a pre-configured progress bar
pub fn get_progress_bar(length: u64, msg: &str) -> ProgressBar {
    let progressbar_style = ProgressStyle::default_spinner()
        .tick_chars(TICK_SETTINGS.0)
        .template(" {spinner} {msg:<30} {wide_bar} ETA {eta_precise} ")
        .expect("no template error");

    let progress_bar = ProgressBar::new(length);

    progress_bar.set_style(progressbar_style);
    progress_bar.enable_steady_tick(Duration::from_millis(TICK_SETTINGS.1));
    progress_bar.set_message(msg.to_owned());

    progress_bar
}

/// closed set of anomalous splicing outcomes a junction row may describe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SplicingClass {
    #[serde(rename = "Exon skipping")]
    ExonSkipping,
    #[serde(rename = "Alternative 3'SS")]
    AlternativeThreePrime,
    #[serde(rename = "Alternative 5'SS")]
    AlternativeFivePrime,
    #[serde(rename = "Intronic alternative 3'SS")]
    IntronicAlternativeThreePrime,
    #[serde(rename = "Intronic alternative 5'SS")]
    IntronicAlternativeFivePrime,
}

impl std::fmt::Display for SplicingClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SplicingClass::ExonSkipping => write!(f, "Exon skipping"),
            SplicingClass::AlternativeThreePrime => write!(f, "Alternative 3'SS"),
            SplicingClass::AlternativeFivePrime => write!(f, "Alternative 5'SS"),
            SplicingClass::IntronicAlternativeThreePrime => {
                write!(f, "Intronic alternative 3'SS")
            }
            SplicingClass::IntronicAlternativeFivePrime => {
                write!(f, "Intronic alternative 5'SS")
            }
        }
    }
}

impl std::str::FromStr for SplicingClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Exon skipping" => Ok(SplicingClass::ExonSkipping),
            "Alternative 3'SS" => Ok(SplicingClass::AlternativeThreePrime),
            "Alternative 5'SS" => Ok(SplicingClass::AlternativeFivePrime),
            "Intronic alternative 3'SS" => Ok(SplicingClass::IntronicAlternativeThreePrime),
            "Intronic alternative 5'SS" => Ok(SplicingClass::IntronicAlternativeFivePrime),
            _ => Err(format!("unknown splicing class: {}", s)),
        }
    }
}

/// argument checker for the scan
pub trait ArgCheck {
    fn check(&self) -> Result<(), SavError> {
        self.validate_args()
    }

    fn validate_args(&self) -> Result<(), SavError> {
        self.check_inputs()?;
        self.check_model()?;
        self.check_probabilities()?;
        self.check_compute()?;

        Ok(())
    }

    fn check_inputs(&self) -> Result<(), SavError> {
        validate(self.get_manifest())?;
        validate(self.get_junctions())?;

        Ok(())
    }

    fn check_model(&self) -> Result<(), SavError> {
        for (name, value) in self.get_hyperparameters() {
            if !value.is_finite() || value <= 0.0 {
                return Err(SavError::Configuration(format!(
                    "{} must be a positive finite number, got {}",
                    name, value
                )));
            }
        }

        Ok(())
    }

    fn check_probabilities(&self) -> Result<(), SavError> {
        for (name, value) in self.get_probabilities() {
            if let Some(prob) = value {
                if !prob.is_finite() || !(0.0..=1.0).contains(&prob) {
                    return Err(SavError::Configuration(format!(
                        "{} must lie in [0, 1], got {}",
                        name, prob
                    )));
                }
            }
        }

        Ok(())
    }

    fn check_compute(&self) -> Result<(), SavError> {
        if self.get_threads() < MIN_THREADS {
            return Err(SavError::Configuration(format!(
                "thread count must be at least {}, got {}",
                MIN_THREADS,
                self.get_threads()
            )));
        }

        Ok(())
    }

    fn get_manifest(&self) -> &PathBuf;
    fn get_junctions(&self) -> &PathBuf;
    fn get_hyperparameters(&self) -> Vec<(&'static str, f64)>;

    fn get_probabilities(&self) -> Vec<(&'static str, Option<f64>)> {
        vec![]
    }

    fn get_threads(&self) -> usize {
        MIN_THREADS
    }
}

/// error handling for the scan
#[derive(Debug, Error)]
pub enum SavError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),
    #[error("Malformed record: {0}")]
    DataIntegrity(String),
    #[error("No successful permutation replicates to estimate Q-values from")]
    InsufficientPermutations,
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// argument validation
pub fn validate(arg: &PathBuf) -> Result<(), SavError> {
    if !arg.exists() {
        return Err(SavError::Configuration(format!(
            "{:?} does not exist",
            arg
        )));
    }

    if !arg.is_file() {
        return Err(SavError::Configuration(format!("{:?} is not a file", arg)));
    }

    match std::fs::metadata(arg) {
        Ok(metadata) if metadata.len() == 0 => {
            Err(SavError::Configuration(format!("file {:?} is empty", arg)))
        }
        Ok(_) => Ok(()),
        Err(e) => Err(SavError::IoError(e)),
    }
}
