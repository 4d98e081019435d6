//! Core types for mediafade

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

/// Unique identifier for a component instance, used in log fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceId(pub Uuid);

impl InstanceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a piece of media, as passed to the element's `src`
///
/// Two sources are the same media exactly when their strings are equal; this
/// is the identity used to reject stale probe results.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaSource(String);

impl MediaSource {
    pub fn new(source: impl Into<String>) -> Self {
        Self(source.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve where the media lives
    ///
    /// Absolute `http`/`https` URLs are remote, `file` URLs and relative
    /// strings are local paths. Any other scheme is rejected.
    pub fn location(&self) -> Result<SourceLocation> {
        match Url::parse(&self.0) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(SourceLocation::Remote(url)),
            Ok(url) if url.scheme() == "file" => url
                .to_file_path()
                .map(SourceLocation::Local)
                .map_err(|_| Error::InvalidSource(format!("not a local path: {}", self.0))),
            Ok(url) => Err(Error::InvalidSource(format!(
                "unsupported scheme '{}' in {}",
                url.scheme(),
                self.0
            ))),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Ok(SourceLocation::Local(PathBuf::from(&self.0)))
            }
            Err(e) => Err(Error::InvalidSource(format!("{}: {}", self.0, e))),
        }
    }
}

impl std::fmt::Display for MediaSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MediaSource {
    fn from(source: &str) -> Self {
        Self::new(source)
    }
}

impl From<String> for MediaSource {
    fn from(source: String) -> Self {
        Self(source)
    }
}

/// Where a [`MediaSource`] can be fetched from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    Remote(Url),
    Local(PathBuf),
}

/// Passthrough display attributes, forwarded to the rendered element untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<String, String>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// CSS transition timing function applied to the fade
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TimingFunction {
    Ease,
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
    StepStart,
    StepEnd,
    /// `cubic-bezier(...)` or `steps(...)`, kept verbatim
    Custom(String),
}

impl Default for TimingFunction {
    fn default() -> Self {
        TimingFunction::EaseOut
    }
}

impl std::fmt::Display for TimingFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimingFunction::Ease => write!(f, "ease"),
            TimingFunction::Linear => write!(f, "linear"),
            TimingFunction::EaseIn => write!(f, "ease-in"),
            TimingFunction::EaseOut => write!(f, "ease-out"),
            TimingFunction::EaseInOut => write!(f, "ease-in-out"),
            TimingFunction::StepStart => write!(f, "step-start"),
            TimingFunction::StepEnd => write!(f, "step-end"),
            TimingFunction::Custom(value) => f.write_str(value),
        }
    }
}

impl FromStr for TimingFunction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        match trimmed {
            "ease" => Ok(TimingFunction::Ease),
            "linear" => Ok(TimingFunction::Linear),
            "ease-in" => Ok(TimingFunction::EaseIn),
            "ease-out" => Ok(TimingFunction::EaseOut),
            "ease-in-out" => Ok(TimingFunction::EaseInOut),
            "step-start" => Ok(TimingFunction::StepStart),
            "step-end" => Ok(TimingFunction::StepEnd),
            _ if (trimmed.starts_with("cubic-bezier(") || trimmed.starts_with("steps("))
                && trimmed.ends_with(')') =>
            {
                Ok(TimingFunction::Custom(trimmed.to_string()))
            }
            _ => Err(Error::InvalidConfig(format!("unknown timing function '{}'", s))),
        }
    }
}

impl TryFrom<String> for TimingFunction {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TimingFunction> for String {
    fn from(value: TimingFunction) -> Self {
        value.to_string()
    }
}

/// Convert a configured number of seconds into a [`Duration`]
pub(crate) fn seconds(name: &str, secs: f64) -> Result<Duration> {
    if !secs.is_finite() || secs < 0.0 {
        return Err(Error::InvalidConfig(format!(
            "{} must be a non-negative number of seconds, got {}",
            name, secs
        )));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|e| Error::InvalidConfig(format!("{}: {}", name, e)))
}
