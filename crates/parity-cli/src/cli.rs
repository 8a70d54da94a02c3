//! Command-line arguments and their validation

use clap::{Parser, ValueEnum};
use parity_harness::{HarnessConfig, LookupKind, ReleaseKey};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Parser, Debug)]
#[command(name = "parity")]
#[command(about = "Compare lookup responses of a baseline and a candidate server")]
#[command(version)]
pub struct Cli {
    /// Lookup to test
    #[arg(value_enum)]
    pub mode: Mode,

    /// OS family served by both servers
    #[arg(value_enum)]
    pub ostype: OsType,

    /// Release versions to compare
    #[arg(required = true)]
    pub releases: Vec<String>,

    /// Architecture segment added after the release
    #[arg(long)]
    pub arch: Option<String>,

    /// SUSE distribution (required when ostype is suse)
    #[arg(long, value_enum)]
    pub suse_type: Option<SuseType>,

    /// Fraction of each catalog to test, in (0, 1]
    #[arg(long, default_value_t = parity_harness::config::DEFAULT_SAMPLE_RATE)]
    pub sample_rate: f64,

    /// Fixed seed for reproducible sampling
    #[arg(long)]
    pub seed: Option<u64>,

    /// Test cases processed in parallel (default: available parallelism)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Baseline server URL (overrides PARITY_BASELINE_URL)
    #[arg(long)]
    pub baseline_url: Option<String>,

    /// Candidate server URL (overrides PARITY_CANDIDATE_URL)
    #[arg(long)]
    pub candidate_url: Option<String>,

    /// Root of the identifier lists (overrides PARITY_CATALOG_DIR)
    #[arg(long)]
    pub catalog_dir: Option<PathBuf>,

    /// Root of the mismatch dumps (overrides PARITY_ARTIFACT_DIR)
    #[arg(long)]
    pub artifact_dir: Option<PathBuf>,

    /// Write the run summary as JSON
    #[arg(long)]
    pub summary: Option<PathBuf>,

    /// Print debug messages
    #[arg(long)]
    pub debug: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    #[value(name = "cveid")]
    Cveid,
    #[value(name = "package")]
    Package,
}

impl From<Mode> for LookupKind {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Cveid => LookupKind::Cve,
            Mode::Package => LookupKind::Package,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OsType {
    Alpine,
    Amazon,
    Debian,
    Oracle,
    Redhat,
    Suse,
    Ubuntu,
}

impl OsType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OsType::Alpine => "alpine",
            OsType::Amazon => "amazon",
            OsType::Debian => "debian",
            OsType::Oracle => "oracle",
            OsType::Redhat => "redhat",
            OsType::Suse => "suse",
            OsType::Ubuntu => "ubuntu",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SuseType {
    #[value(name = "opensuse")]
    OpenSuse,
    #[value(name = "opensuse.leap")]
    OpenSuseLeap,
    #[value(name = "suse.linux.enterprise.server")]
    EnterpriseServer,
    #[value(name = "suse.linux.enterprise.desktop")]
    EnterpriseDesktop,
}

impl SuseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuseType::OpenSuse => "opensuse",
            SuseType::OpenSuseLeap => "opensuse.leap",
            SuseType::EnterpriseServer => "suse.linux.enterprise.server",
            SuseType::EnterpriseDesktop => "suse.linux.enterprise.desktop",
        }
    }
}

/// Argument combinations clap cannot reject on its own
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CliError {
    #[error("release(s) {releases:?} not supported for {family} (supported: {supported:?})")]
    UnsupportedRelease {
        family: String,
        releases: Vec<String>,
        supported: Vec<&'static str>,
    },

    #[error("--suse-type is required when ostype is suse")]
    MissingSuseType,

    #[error("--suse-type only applies when ostype is suse")]
    UnexpectedSuseType,

    #[error("invalid architecture '{0}': must be a single path segment")]
    InvalidArch(String),
}

fn is_plain_segment(value: &str) -> bool {
    !matches!(value, "" | "." | "..") && !value.contains(['/', '\\'])
}

/// Releases each family can be compared on
pub fn supported_releases(ostype: OsType, suse_type: Option<SuseType>) -> &'static [&'static str] {
    match (ostype, suse_type) {
        (OsType::Debian, _) => &["7", "8", "9", "10", "11", "12"],
        (OsType::Ubuntu, _) => &["14", "16", "18", "19", "20", "21", "22"],
        (OsType::Redhat, _) | (OsType::Oracle, _) => &["5", "6", "7", "8", "9"],
        (OsType::Amazon, _) => &["1", "2", "2022"],
        (OsType::Alpine, _) => &[
            "3.3", "3.4", "3.5", "3.6", "3.7", "3.8", "3.9", "3.10", "3.11", "3.12", "3.13",
            "3.14", "3.15", "3.16", "3.17",
        ],
        (OsType::Suse, Some(SuseType::OpenSuse)) => &[
            "10.2",
            "10.3",
            "11.0",
            "11.1",
            "11.2",
            "11.3",
            "11.4",
            "12.1",
            "12.2",
            "12.3",
            "13.1",
            "13.2",
            "tumbleweed",
        ],
        (OsType::Suse, Some(SuseType::OpenSuseLeap)) => {
            &["42.1", "42.2", "42.3", "15.0", "15.1", "15.2", "15.3", "15.4"]
        }
        (OsType::Suse, Some(SuseType::EnterpriseServer))
        | (OsType::Suse, Some(SuseType::EnterpriseDesktop)) => &["9", "10", "11", "12", "15"],
        (OsType::Suse, None) => &[],
    }
}

impl Cli {
    /// Reject unsupported combinations before any network activity
    pub fn validate(&self) -> Result<(), CliError> {
        match (self.ostype, self.suse_type) {
            (OsType::Suse, None) => return Err(CliError::MissingSuseType),
            (OsType::Suse, Some(_)) | (_, None) => {}
            (_, Some(_)) => return Err(CliError::UnexpectedSuseType),
        }

        if let Some(arch) = &self.arch {
            if !is_plain_segment(arch) {
                return Err(CliError::InvalidArch(arch.clone()));
            }
        }

        let supported = supported_releases(self.ostype, self.suse_type);
        let unsupported: Vec<String> = self
            .releases
            .iter()
            .filter(|release| !supported.contains(&release.as_str()))
            .cloned()
            .collect();

        if !unsupported.is_empty() {
            return Err(CliError::UnsupportedRelease {
                family: self.family().to_string(),
                releases: unsupported,
                supported: supported.to_vec(),
            });
        }
        Ok(())
    }

    /// Family sent to the servers; the SUSE variant for suse
    pub fn family(&self) -> &'static str {
        match self.suse_type {
            Some(suse_type) if self.ostype == OsType::Suse => suse_type.as_str(),
            _ => self.ostype.as_str(),
        }
    }

    /// One release key per requested release, duplicates dropped
    pub fn release_keys(&self) -> Vec<ReleaseKey> {
        let mut keys: Vec<ReleaseKey> = Vec::new();
        for release in &self.releases {
            let key = ReleaseKey::new(
                self.mode.into(),
                self.family(),
                release.as_str(),
                self.arch.as_deref(),
            );
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }

    /// Apply command-line overrides to a base configuration
    pub fn apply(&self, mut config: HarnessConfig) -> HarnessConfig {
        config.sample_rate = self.sample_rate;
        config.seed = self.seed;
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(url) = &self.baseline_url {
            config.targets.baseline = url.clone();
        }
        if let Some(url) = &self.candidate_url {
            config.targets.candidate = url.clone();
        }
        if let Some(dir) = &self.catalog_dir {
            config.catalog_dir = dir.clone();
        }
        if let Some(dir) = &self.artifact_dir {
            config.artifact_dir = dir.clone();
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_cli(args: Vec<&'static str>) -> Result<Cli, clap::error::Error> {
        Cli::try_parse_from(args)
    }

    #[test]
    fn test_parse_minimal() {
        let cli = parse_cli(vec!["parity", "cveid", "debian", "10", "11"]).unwrap();
        assert_eq!(cli.mode, Mode::Cveid);
        assert_eq!(cli.ostype, OsType::Debian);
        assert_eq!(cli.releases, vec!["10", "11"]);
        assert_eq!(cli.sample_rate, 0.01);
        assert!(!cli.debug);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_parse_requires_release() {
        assert!(parse_cli(vec!["parity", "package", "debian"]).is_err());
    }

    #[test]
    fn test_parse_rejects_unknown_mode_and_family() {
        assert!(parse_cli(vec!["parity", "oval", "debian", "11"]).is_err());
        assert!(parse_cli(vec!["parity", "cveid", "gentoo", "1"]).is_err());
    }

    #[test]
    fn test_unsupported_release_fails_fast() {
        let cli = parse_cli(vec!["parity", "cveid", "ubuntu", "20", "17"]).unwrap();
        match cli.validate() {
            Err(CliError::UnsupportedRelease {
                family, releases, ..
            }) => {
                assert_eq!(family, "ubuntu");
                assert_eq!(releases, vec!["17".to_string()]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_suse_type_rules() {
        let cli = parse_cli(vec!["parity", "cveid", "suse", "15.3"]).unwrap();
        assert_eq!(cli.validate(), Err(CliError::MissingSuseType));

        let cli = parse_cli(vec![
            "parity",
            "cveid",
            "debian",
            "11",
            "--suse-type",
            "opensuse",
        ])
        .unwrap();
        assert_eq!(cli.validate(), Err(CliError::UnexpectedSuseType));

        let cli = parse_cli(vec![
            "parity",
            "package",
            "suse",
            "15.3",
            "--suse-type",
            "opensuse.leap",
        ])
        .unwrap();
        assert!(cli.validate().is_ok());
        assert_eq!(cli.family(), "opensuse.leap");
    }

    #[test]
    fn test_arch_must_be_plain_segment() {
        for arch in ["../../..", "..", ".", "", "x86/64", "a\\b"] {
            let cli = parse_cli(vec!["parity", "package", "debian", "11", "--arch", arch]).unwrap();
            assert_eq!(
                cli.validate(),
                Err(CliError::InvalidArch(arch.to_string())),
                "arch {:?} accepted",
                arch
            );
        }

        let cli = parse_cli(vec!["parity", "package", "debian", "11", "--arch", "x86_64"]).unwrap();
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_release_keys() {
        let cli = parse_cli(vec![
            "parity", "package", "debian", "11", "12", "11", "--arch", "amd64",
        ])
        .unwrap();

        let keys = cli.release_keys();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].kind, LookupKind::Package);
        assert_eq!(keys[0].family, "debian");
        assert_eq!(keys[0].release, "11");
        assert_eq!(keys[0].arch.as_deref(), Some("amd64"));
        assert_eq!(keys[1].release, "12");
    }

    #[test]
    fn test_apply_overrides() {
        let cli = parse_cli(vec![
            "parity",
            "cveid",
            "redhat",
            "8",
            "--sample-rate",
            "0.5",
            "--seed",
            "7",
            "--workers",
            "16",
            "--candidate-url",
            "http://10.0.0.2:1326",
            "--artifact-dir",
            "/tmp/parity",
        ])
        .unwrap();

        let config = cli.apply(HarnessConfig::default());
        assert_eq!(config.sample_rate, 0.5);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.workers, 16);
        assert_eq!(config.targets.baseline, "http://127.0.0.1:1325");
        assert_eq!(config.targets.candidate, "http://10.0.0.2:1326");
        assert_eq!(config.artifact_dir, PathBuf::from("/tmp/parity"));
    }
}
