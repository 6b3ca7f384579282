//! Affix declarations: the prefix, suffix, directory and mode of a generated path.

use crate::Error;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Caller-supplied configuration for a generated temporary path.
///
/// A bare string converts into an affix declaration that only sets the prefix.
/// Every field that is left unset falls back to the default of the resource kind.
///
/// ## Example
///
/// ```
/// # use tracked_temp::Affixes;
/// let affixes = Affixes::from("report-").suffix(".csv").mode(0o640);
/// assert_eq!(affixes.prefix_or("f-"), "report-");
/// assert_eq!(affixes.suffix_or_empty(), ".csv");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Affixes {
    #[serde(default)]
    prefix: Option<String>,
    #[serde(default)]
    suffix: Option<String>,
    #[serde(default, alias = "directory")]
    dir: Option<PathBuf>,
    #[serde(default, deserialize_with = "deserialize_mode")]
    mode: Option<Mode>,
}

/// Requested permission bits of a created resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Raw permission bits, e.g. `0o755`.
    Bits(u32),
    /// An octal string, e.g. `"0711"`.
    Text(String),
}

impl Affixes {
    /// Sets the file name prefix.
    pub fn prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Sets the file name suffix.
    pub fn suffix<S: Into<String>>(mut self, suffix: S) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    /// Sets the directory to create the resource in.
    pub fn dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Sets the permission bits of the created resource.
    pub fn mode(mut self, bits: u32) -> Self {
        self.mode = Some(Mode::Bits(bits));
        self
    }

    /// Sets the permission bits from an octal string such as `"0755"`.
    /// Strings that are not valid octal fall back to the default mode.
    pub fn mode_str<S: Into<String>>(mut self, mode: S) -> Self {
        self.mode = Some(Mode::Text(mode.into()));
        self
    }

    /// Parses a dynamic affix declaration.
    ///
    /// A string is used as the prefix, an object may carry `prefix`, `suffix`,
    /// `dir` (or `directory`) and `mode`, and `null` selects all defaults.
    /// Any other value is rejected with [`Error::InvalidAffixSpec`].
    ///
    /// ## Example
    ///
    /// ```
    /// # use tracked_temp::{Affixes, Error};
    /// let affixes = Affixes::from_value(&serde_json::json!({"prefix": "job-", "mode": "0750"}))?;
    /// assert_eq!(affixes.prefix_or("d-"), "job-");
    /// assert_eq!(affixes.resolve_mode(0o700), 0o750);
    ///
    /// assert!(Affixes::from_value(&serde_json::json!(42)).is_err());
    /// # Ok::<(), Error>(())
    /// ```
    pub fn from_value(value: &Value) -> Result<Self, Error> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::String(prefix) => Ok(Self::from(prefix.as_str())),
            Value::Object(_) => {
                Self::deserialize(value).map_err(|e| Error::InvalidAffixSpec(e.to_string()))
            }
            other => Err(Error::InvalidAffixSpec(other.to_string())),
        }
    }

    /// Parses a dynamic affix declaration from JSON text. See [`Affixes::from_value`].
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| Error::InvalidAffixSpec(e.to_string()))?;
        Self::from_value(&value)
    }

    /// Returns the prefix, or `default` if none (or an empty one) was given.
    pub fn prefix_or<'a>(&'a self, default: &'a str) -> &'a str {
        match self.prefix.as_deref() {
            Some(prefix) if !prefix.is_empty() => prefix,
            _ => default,
        }
    }

    /// Returns the suffix, or the empty string.
    pub fn suffix_or_empty(&self) -> &str {
        self.suffix.as_deref().unwrap_or("")
    }

    /// Returns the directory override, if any.
    pub fn dir_override(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Resolves the requested mode, falling back to `default` when none was
    /// given or the value cannot be used as permission bits.
    pub fn resolve_mode(&self, default: u32) -> u32 {
        self.mode
            .as_ref()
            .and_then(Mode::bits)
            .unwrap_or(default)
    }
}

impl Mode {
    /// Returns the permission bits, or `None` if the value is not usable.
    pub fn bits(&self) -> Option<u32> {
        let bits = match self {
            Self::Bits(bits) => Some(*bits),
            Self::Text(text) => {
                let text = text.trim();
                let text = text.strip_prefix("0o").unwrap_or(text);
                u32::from_str_radix(text, 8).ok()
            }
        };
        bits.filter(|bits| *bits <= 0o7777)
    }
}

impl From<&str> for Affixes {
    fn from(prefix: &str) -> Self {
        Self::default().prefix(prefix)
    }
}

impl From<String> for Affixes {
    fn from(prefix: String) -> Self {
        Self::default().prefix(prefix)
    }
}

impl From<&String> for Affixes {
    fn from(prefix: &String) -> Self {
        Self::from(prefix.as_str())
    }
}

impl From<()> for Affixes {
    fn from(_: ()) -> Self {
        Self::default()
    }
}

impl From<Option<&str>> for Affixes {
    fn from(prefix: Option<&str>) -> Self {
        prefix.map(Self::from).unwrap_or_default()
    }
}

/// Accepts numbers and strings; any other value is kept as unparsable text.
fn deserialize_mode<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Mode>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bits(u64),
        Text(String),
        Other(Value),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Bits(bits) => Mode::Bits(u32::try_from(bits).unwrap_or(u32::MAX)),
        Raw::Text(text) => Mode::Text(text),
        Raw::Other(value) => Mode::Text(value.to_string()),
    }))
}
