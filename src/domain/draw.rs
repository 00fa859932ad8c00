//! Draw records and their derived classes.
//!
//! A draw is one resolved WinGo round: an increasing period identifier
//! and a single-digit outcome. Size and color are always derived from
//! the outcome value, never stored independently of it.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation failures when building draws from feed or disk data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DrawError {
    #[error("period must be a non-empty digit string, got `{0}`")]
    InvalidPeriod(String),

    #[error("outcome value must be in 0..=9, got {0}")]
    OutcomeOutOfRange(i64),
}

// ────────────────────────────────────────────
// Period
// ────────────────────────────────────────────

/// Round identifier as issued by the draw provider (e.g. `20240101100010123`).
///
/// Kept as the original digit string so leading zeros and width survive
/// a round trip. Ordering is numeric.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Period(String);

impl Period {
    /// Parse a period, rejecting anything that is not all ASCII digits.
    pub fn parse(raw: &str) -> Result<Self, DrawError> {
        let raw = raw.trim();
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DrawError::InvalidPeriod(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last `n` digits, used for short labels in channel posts.
    pub fn tail(&self, n: usize) -> &str {
        &self.0[self.0.len().saturating_sub(n)..]
    }

    /// The period that follows this one (numeric value + 1).
    ///
    /// Decimal increment on the digit string: width is preserved unless
    /// the carry runs off the front (`999` -> `1000`).
    pub fn next(&self) -> Period {
        let mut digits: Vec<u8> = self.0.bytes().collect();
        let mut i = digits.len();
        loop {
            if i == 0 {
                digits.insert(0, b'1');
                break;
            }
            i -= 1;
            if digits[i] == b'9' {
                digits[i] = b'0';
            } else {
                digits[i] += 1;
                break;
            }
        }
        Period(digits.into_iter().map(char::from).collect())
    }

    fn significant(&self) -> &str {
        self.0.trim_start_matches('0')
    }
}

impl Ord for Period {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b) = (self.significant(), other.significant());
        a.len()
            .cmp(&b.len())
            .then_with(|| a.cmp(b))
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for Period {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl TryFrom<String> for Period {
    type Error = DrawError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Period::parse(&value)
    }
}

impl From<Period> for String {
    fn from(value: Period) -> Self {
        value.0
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ────────────────────────────────────────────
// Derived classes
// ────────────────────────────────────────────

/// Big/Small split of the outcome value at 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SizeClass {
    Big,
    Small,
}

impl SizeClass {
    pub fn from_value(value: u8) -> Self {
        if value >= 5 { Self::Big } else { Self::Small }
    }

    /// Binary encoding used by the classifier (Big = 1).
    pub fn as_bit(self) -> u8 {
        match self {
            Self::Big => 1,
            Self::Small => 0,
        }
    }
}

impl fmt::Display for SizeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Big => write!(f, "Big"),
            Self::Small => write!(f, "Small"),
        }
    }
}

/// Color of the outcome value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorClass {
    Violet,
    Green,
    Red,
}

impl ColorClass {
    pub fn from_value(value: u8) -> Self {
        match value {
            0 | 5 => Self::Violet,
            1 | 3 | 7 | 9 => Self::Green,
            _ => Self::Red,
        }
    }
}

impl fmt::Display for ColorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Violet => write!(f, "Violet"),
            Self::Green => write!(f, "Green"),
            Self::Red => write!(f, "Red"),
        }
    }
}

// ────────────────────────────────────────────
// DrawRecord
// ────────────────────────────────────────────

/// One resolved round as kept in the outcome store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredDraw", into = "StoredDraw")]
pub struct DrawRecord {
    pub period: Period,
    pub value: u8,
    pub size: SizeClass,
    pub color: ColorClass,
    pub observed_at: DateTime<Utc>,
}

impl DrawRecord {
    /// Build a record, deriving size and color from the value.
    pub fn new(
        period: Period,
        value: i64,
        observed_at: DateTime<Utc>,
    ) -> Result<Self, DrawError> {
        let value = u8::try_from(value)
            .ok()
            .filter(|v| *v <= 9)
            .ok_or(DrawError::OutcomeOutOfRange(value))?;

        Ok(Self {
            period,
            value,
            size: SizeClass::from_value(value),
            color: ColorClass::from_value(value),
            observed_at,
        })
    }

    /// Same round, same value. `observed_at` is bookkeeping only.
    pub fn same_outcome(&self, other: &DrawRecord) -> bool {
        self.period == other.period && self.value == other.value
    }
}

/// On-disk shape. Size and color are written for readability and
/// recomputed on load, so a hand-edited file can never disagree.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredDraw {
    period: String,
    number: i64,
    #[serde(default, skip_deserializing)]
    size: Option<SizeClass>,
    #[serde(default, skip_deserializing)]
    color: Option<ColorClass>,
    time: DateTime<Utc>,
}

impl TryFrom<StoredDraw> for DrawRecord {
    type Error = DrawError;

    fn try_from(row: StoredDraw) -> Result<Self, Self::Error> {
        DrawRecord::new(Period::parse(&row.period)?, row.number, row.time)
    }
}

impl From<DrawRecord> for StoredDraw {
    fn from(record: DrawRecord) -> Self {
        Self {
            period: record.period.0,
            number: i64::from(record.value),
            size: Some(record.size),
            color: Some(record.color),
            time: record.observed_at,
        }
    }
}
