//! Domain models shared by the catalog, compiler and pipeline

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::Error;

/// Network equipment vendor
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Vendor {
    Huawei,
    Nokia,
}

impl Vendor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Vendor::Huawei => "Huawei",
            Vendor::Nokia => "Nokia",
        }
    }

    /// Lowercase form used in directory names
    pub fn dir_name(&self) -> &'static str {
        match self {
            Vendor::Huawei => "huawei",
            Vendor::Nokia => "nokia",
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Vendor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "huawei" => Ok(Vendor::Huawei),
            "nokia" => Ok(Vendor::Nokia),
            other => Err(Error::InvalidInput(format!("Unknown vendor: {}", other))),
        }
    }
}

/// Radio access technology
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Technology {
    #[serde(rename = "2G")]
    TwoG,
    #[serde(rename = "4G")]
    FourG,
}

impl Technology {
    pub fn as_str(&self) -> &'static str {
        match self {
            Technology::TwoG => "2G",
            Technology::FourG => "4G",
        }
    }

    pub fn dir_name(&self) -> &'static str {
        match self {
            Technology::TwoG => "2g",
            Technology::FourG => "4g",
        }
    }
}

impl fmt::Display for Technology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Technology {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "2G" => Ok(Technology::TwoG),
            "4G" => Ok(Technology::FourG),
            other => Err(Error::InvalidInput(format!("Unknown technology: {}", other))),
        }
    }
}

/// One vendor x technology processing partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Group {
    pub vendor: Vendor,
    pub technology: Technology,
}

impl Group {
    pub const fn new(vendor: Vendor, technology: Technology) -> Self {
        Self { vendor, technology }
    }

    /// The four groups processed by a default run
    pub fn all() -> [Group; 4] {
        [
            Group::new(Vendor::Huawei, Technology::TwoG),
            Group::new(Vendor::Huawei, Technology::FourG),
            Group::new(Vendor::Nokia, Technology::TwoG),
            Group::new(Vendor::Nokia, Technology::FourG),
        ]
    }

    /// Name of the rule-store table holding this group's rules, e.g. `Huawei_2G`
    pub fn catalog_table(&self) -> String {
        format!("{}_{}", self.vendor, self.technology)
    }

    /// Default dump directory relative to the root folder
    pub fn default_dump_dir(&self) -> PathBuf {
        Path::new("dumpfiles")
            .join(self.vendor.dir_name())
            .join(self.technology.dir_name())
    }

    /// Default output directory relative to the root folder
    pub fn default_output_dir(&self) -> PathBuf {
        Path::new("output")
            .join(self.vendor.dir_name())
            .join(self.technology.dir_name())
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.vendor, self.technology)
    }
}

/// Accepts `Huawei-2G`, `huawei_2g` or `Huawei 2G`
impl FromStr for Group {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().splitn(2, |c: char| c == '-' || c == '_' || c == ' ');
        let vendor = parts.next().unwrap_or_default();
        let technology = parts
            .next()
            .ok_or_else(|| Error::InvalidInput(format!("Invalid group '{}', expected e.g. Huawei-2G", s)))?;
        Ok(Group::new(vendor.parse()?, technology.parse()?))
    }
}

/// A configuration dump discovered on disk. Read-only source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpFile {
    pub path: PathBuf,
    pub group: Group,
}

impl DumpFile {
    pub fn new(path: impl Into<PathBuf>, group: Group) -> Self {
        Self {
            path: path.into(),
            group,
        }
    }

    /// File name including its extension
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Output artifact name: `<file name>_result.<ext>`
    pub fn result_file_name(&self, extension: &str) -> String {
        format!("{}_result.{}", self.file_name(), extension)
    }
}

/// Per-row validation verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Flag {
    Match,
    NotMatched,
}

impl Flag {
    pub const COLUMN: &'static str = "Flag";

    pub fn as_str(&self) -> &'static str {
        match self {
            Flag::Match => "Match",
            Flag::NotMatched => "NotMatched",
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Flag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Match" => Ok(Flag::Match),
            "NotMatched" => Ok(Flag::NotMatched),
            other => Err(Error::InvalidInput(format!("Unknown flag: {}", other))),
        }
    }
}

/// One decoded result row.
///
/// Columns keep the order of the result set so that destination tables are
/// created with a deterministic column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct ResultRow {
    cells: Vec<(String, String)>,
}

impl ResultRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cells: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.cells.push((column.into(), value.into()));
    }

    /// Value of the first column with this name
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(_, value)| value.as_str())
    }

    pub fn cells(&self) -> &[(String, String)] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Parsed `Flag` column, if present and well-formed
    pub fn flag(&self) -> Option<Flag> {
        self.get(Flag::COLUMN).and_then(|v| v.parse().ok())
    }
}

impl FromIterator<(String, String)> for ResultRow {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().collect(),
        }
    }
}
