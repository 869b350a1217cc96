use std::fmt;
use std::str::FromStr;

/// Width of a history bucket, in seconds.
///
/// Parsed from either bare seconds (`"900"`) or a duration token such as
/// `"5m"`, `"1h"`, `"1d"` or `"1w"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval(i64);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntervalError {
    #[error("interval is empty")]
    Empty,

    #[error("invalid interval '{0}': expected seconds or <n>s|m|h|d|w")]
    Malformed(String),

    #[error("interval must be positive, got '{0}'")]
    NonPositive(String),

    #[error("interval '{0}' exceeds the maximum of {max} seconds", max = Interval::MAX.0)]
    TooLarge(String),
}

impl Interval {
    pub const ONE_HOUR: Interval = Interval(3_600);

    /// 365 days.
    pub const MAX: Interval = Interval(31_536_000);

    pub fn from_seconds(seconds: i64) -> Result<Self, IntervalError> {
        if seconds <= 0 {
            return Err(IntervalError::NonPositive(seconds.to_string()));
        }
        if seconds > Self::MAX.0 {
            return Err(IntervalError::TooLarge(seconds.to_string()));
        }
        Ok(Interval(seconds))
    }

    pub fn seconds(&self) -> i64 {
        self.0
    }

    /// Aligned start of the bucket containing `time`. Floors toward negative
    /// infinity so pre-epoch timestamps still land in the right bucket.
    /// Saturates at `i64::MIN` when the aligned start is not representable.
    pub fn bucket_start(&self, time: i64) -> i64 {
        time.saturating_sub(time.rem_euclid(self.0))
    }
}

impl Default for Interval {
    fn default() -> Self {
        Interval::ONE_HOUR
    }
}

impl FromStr for Interval {
    type Err = IntervalError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let token = raw.trim();
        if token.is_empty() {
            return Err(IntervalError::Empty);
        }

        let (digits, multiplier) = match token.char_indices().last() {
            Some((idx, unit)) if unit.is_ascii_alphabetic() => {
                let multiplier = match unit.to_ascii_lowercase() {
                    's' => 1,
                    'm' => 60,
                    'h' => 3_600,
                    'd' => 86_400,
                    'w' => 604_800,
                    _ => return Err(IntervalError::Malformed(raw.to_string())),
                };
                (&token[..idx], multiplier)
            }
            _ => (token, 1),
        };

        let count: i64 = digits
            .parse()
            .map_err(|_| IntervalError::Malformed(raw.to_string()))?;

        if count <= 0 {
            return Err(IntervalError::NonPositive(raw.to_string()));
        }

        match count.checked_mul(multiplier) {
            Some(seconds) if seconds <= Self::MAX.0 => Ok(Interval(seconds)),
            _ => Err(IntervalError::TooLarge(raw.to_string())),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}
