//! Test cases and request paths

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which lookup endpoint a test case exercises
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LookupKind {
    /// `GET /cves/{family}/{release}[/{arch}]/{id}`
    #[serde(rename = "cveid")]
    Cve,
    /// `GET /packs/{family}/{release}[/{arch}]/{pack}`
    #[serde(rename = "package")]
    Package,
}

impl LookupKind {
    /// Mode name, also used for catalog and artifact directories
    pub fn as_str(&self) -> &'static str {
        match self {
            LookupKind::Cve => "cveid",
            LookupKind::Package => "package",
        }
    }

    /// First segment of the request path
    pub fn endpoint(&self) -> &'static str {
        match self {
            LookupKind::Cve => "cves",
            LookupKind::Package => "packs",
        }
    }
}

impl fmt::Display for LookupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LookupKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cveid" => Ok(LookupKind::Cve),
            "package" => Ok(LookupKind::Package),
            other => Err(format!("unknown lookup kind '{}'", other)),
        }
    }
}

/// The (kind, family, release, arch) tuple a catalog belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ReleaseKey {
    pub kind: LookupKind,
    pub family: String,
    pub release: String,
    pub arch: Option<String>,
}

impl ReleaseKey {
    pub fn new(
        kind: LookupKind,
        family: impl Into<String>,
        release: impl Into<String>,
        arch: Option<&str>,
    ) -> Self {
        Self {
            kind,
            family: family.into(),
            release: release.into(),
            arch: normalize_arch(arch),
        }
    }

    /// Build the test case for one identifier of this release
    pub fn case(&self, identifier: impl Into<String>) -> TestCase {
        TestCase {
            kind: self.kind,
            family: self.family.clone(),
            release: self.release.clone(),
            arch: self.arch.clone(),
            identifier: identifier.into(),
        }
    }
}

impl fmt::Display for ReleaseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.kind, self.family, self.release)?;
        if let Some(arch) = &self.arch {
            write!(f, " {}", arch)?;
        }
        Ok(())
    }
}

/// One lookup sent to both targets
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TestCase {
    pub kind: LookupKind,
    /// OS family, e.g. `debian`
    pub family: String,
    pub release: String,
    pub arch: Option<String>,
    /// CVE ID or package name
    pub identifier: String,
}

impl TestCase {
    /// Create a test case; an empty architecture means none
    pub fn new(
        kind: LookupKind,
        family: impl Into<String>,
        release: impl Into<String>,
        arch: Option<&str>,
        identifier: impl Into<String>,
    ) -> Self {
        ReleaseKey::new(kind, family, release, arch).case(identifier)
    }

    /// Request path relative to a target's base URL
    ///
    /// Every segment is percent-encoded; the architecture, when present,
    /// follows the release.
    pub fn request_path(&self) -> String {
        let mut segments = vec![
            self.kind.endpoint().to_string(),
            path_segment(&self.family),
            path_segment(&self.release),
        ];
        if let Some(arch) = &self.arch {
            segments.push(path_segment(arch));
        }
        segments.push(path_segment(&self.identifier));
        segments.join("/")
    }

    /// File-system safe, collision-free directory name for this identifier
    pub fn artifact_name(&self) -> String {
        path_segment(&self.identifier)
    }
}

impl fmt::Display for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.kind, self.family, self.release)?;
        if let Some(arch) = &self.arch {
            write!(f, " {}", arch)?;
        }
        write!(f, " {}", self.identifier)
    }
}

/// Percent-encode a value so it stays one path component
///
/// `.` and `..` are encoded too and the empty string becomes `%`, so the
/// result never names the current or parent directory.
pub fn path_segment(raw: &str) -> String {
    let encoded = urlencoding::encode(raw).into_owned();
    match encoded.as_str() {
        "" => "%".to_string(),
        "." | ".." => encoded.replace('.', "%2E"),
        _ => encoded,
    }
}

fn normalize_arch(arch: Option<&str>) -> Option<String> {
    arch.map(str::trim)
        .filter(|a| !a.is_empty())
        .map(String::from)
}
