use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::error::{Error, Result};

static NUMBER_WITH_UNIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([+-]?(?:\d+\.?\d*|\.\d+))([A-Za-zµμ]*)$").expect("number pattern compiles")
});

/// A reported statistic. wrk prints `-nan` / `inf` when it had nothing to
/// measure, and those markers are carried through instead of becoming numbers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Metric {
    Value(f64),
    Undefined,
    Infinite,
}

impl Metric {
    pub fn value(&self) -> Option<f64> {
        match self {
            Metric::Value(v) => Some(*v),
            Metric::Undefined | Metric::Infinite => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Metric::Value(_))
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Value(v) => write!(f, "{}", v),
            Metric::Undefined => write!(f, "nan"),
            Metric::Infinite => write!(f, "inf"),
        }
    }
}

impl Serialize for Metric {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Metric::Value(v) => serializer.serialize_f64(*v),
            Metric::Undefined => serializer.serialize_str("nan"),
            Metric::Infinite => serializer.serialize_str("inf"),
        }
    }
}

impl<'de> Deserialize<'de> for Metric {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(f64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(v) => Ok(Metric::Value(v)),
            Repr::Text(s) => sentinel(&s).ok_or_else(|| {
                de::Error::custom(format!("expected a number, 'nan' or 'inf', got '{}'", s))
            }),
        }
    }
}

/// What a token measures, which decides the units it may carry and the
/// canonical unit it is normalized to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    /// Normalized to milliseconds.
    Time,
    /// Normalized to bytes, 1024-based as wrk prints them.
    Size,
    /// Unscaled, except for the `k`/`M`/`G` suffixes of the Req/Sec line.
    Scalar,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Time => write!(f, "time"),
            Dimension::Size => write!(f, "size"),
            Dimension::Scalar => write!(f, "scalar"),
        }
    }
}

fn sentinel(token: &str) -> Option<Metric> {
    match token.to_ascii_lowercase().as_str() {
        "nan" | "+nan" | "-nan" => Some(Metric::Undefined),
        "inf" | "+inf" => Some(Metric::Infinite),
        _ => None,
    }
}

fn unit_scale(unit: &str, dimension: Dimension) -> Option<f64> {
    const KIB: f64 = 1024.0;
    match dimension {
        Dimension::Time => match unit {
            "us" | "µs" | "μs" => Some(0.001),
            "ms" => Some(1.0),
            "s" => Some(1_000.0),
            "m" => Some(60_000.0),
            "h" => Some(3_600_000.0),
            _ => None,
        },
        Dimension::Size => match unit {
            "" | "B" => Some(1.0),
            "KB" => Some(KIB),
            "MB" => Some(KIB * KIB),
            "GB" => Some(KIB * KIB * KIB),
            "TB" => Some(KIB * KIB * KIB * KIB),
            _ => None,
        },
        Dimension::Scalar => match unit {
            "" => Some(1.0),
            "k" => Some(1_000.0),
            "M" => Some(1_000_000.0),
            "G" => Some(1_000_000_000.0),
            _ => None,
        },
    }
}

pub fn normalize(token: &str, dimension: Dimension) -> Result<Metric> {
    let token = token.trim();
    if let Some(metric) = sentinel(token) {
        return Ok(metric);
    }
    let cap = NUMBER_WITH_UNIT
        .captures(token)
        .ok_or_else(|| Error::malformed(token, "not a number"))?;
    let value: f64 = cap[1]
        .parse()
        .map_err(|_| Error::malformed(token, "not a number"))?;
    let unit = &cap[2];
    let scale = unit_scale(unit, dimension).ok_or_else(|| {
        if unit.is_empty() {
            Error::malformed(token, format!("missing {} unit", dimension))
        } else {
            Error::malformed(token, format!("unknown {} unit '{}'", dimension, unit))
        }
    })?;
    Ok(Metric::Value(value * scale))
}

pub fn parse_time_ms(token: &str) -> Result<Metric> {
    normalize(token, Dimension::Time)
}

pub fn parse_scalar(token: &str) -> Result<Metric> {
    normalize(token, Dimension::Scalar)
}

/// Like [`normalize`] but for places where wrk always prints a real number.
pub fn parse_defined(token: &str, dimension: Dimension) -> Result<f64> {
    match normalize(token, dimension)? {
        Metric::Value(v) => Ok(v),
        other => Err(Error::malformed(
            token,
            format!("expected a measured {}, got {}", dimension, other),
        )),
    }
}

pub fn parse_size_bytes(token: &str) -> Result<f64> {
    parse_defined(token, Dimension::Size)
}

pub fn parse_percent(token: &str) -> Result<Metric> {
    let token = token.trim();
    parse_scalar(token.strip_suffix('%').unwrap_or(token))
}

pub fn parse_count(token: &str) -> Result<u64> {
    let token = token.trim();
    token
        .parse::<u64>()
        .map_err(|_| Error::malformed(token, "not a non-negative integer"))
}
