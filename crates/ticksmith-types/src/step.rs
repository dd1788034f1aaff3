//! Calendar step definitions.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::StepParseError;

/// Unit of a calendar step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepUnit {
    /// Minutes, written `t` (`1t`, `5t`).
    Minute,
    /// Hours, written `h`.
    Hour,
    /// Calendar days, written `d`.
    Day,
}

impl StepUnit {
    /// Returns the number of minutes in one unit.
    #[must_use]
    pub const fn minutes(&self) -> i64 {
        match self {
            Self::Minute => 1,
            Self::Hour => 60,
            Self::Day => 1440,
        }
    }

    /// Returns the suffix used in step strings.
    #[must_use]
    pub const fn suffix(&self) -> &'static str {
        match self {
            Self::Minute => "t",
            Self::Hour => "h",
            Self::Day => "d",
        }
    }
}

/// A calendar-aligned step such as `1d`, `1h`, `1t` or `5t`.
///
/// Minute and hour steps must evenly divide a day so that boundaries line up
/// with midnight UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Step {
    count: u32,
    unit: StepUnit,
}

impl Step {
    /// One minute.
    pub const MINUTE: Self = Self {
        count: 1,
        unit: StepUnit::Minute,
    };

    /// One hour.
    pub const HOUR: Self = Self {
        count: 1,
        unit: StepUnit::Hour,
    };

    /// One calendar day.
    pub const DAY: Self = Self {
        count: 1,
        unit: StepUnit::Day,
    };

    /// Creates a step, validating that it tiles a day.
    ///
    /// # Errors
    ///
    /// Returns an error if `count` is zero or a minute/hour step does not
    /// evenly divide a day.
    pub fn new(count: u32, unit: StepUnit) -> Result<Self, StepParseError> {
        let label = format!("{count}{}", unit.suffix());
        if count == 0 {
            return Err(StepParseError::ZeroCount(label));
        }
        let minutes = i64::from(count) * unit.minutes();
        if unit != StepUnit::Day && 1440 % minutes != 0 {
            return Err(StepParseError::Misaligned(label));
        }
        Ok(Self { count, unit })
    }

    /// Returns the step count.
    #[must_use]
    pub const fn count(&self) -> u32 {
        self.count
    }

    /// Returns the step unit.
    #[must_use]
    pub const fn unit(&self) -> StepUnit {
        self.unit
    }

    /// Returns the step length in minutes.
    #[must_use]
    pub const fn minutes(&self) -> i64 {
        self.count as i64 * self.unit.minutes()
    }

    /// Returns the step length as a duration.
    #[must_use]
    pub fn duration(&self) -> TimeDelta {
        TimeDelta::minutes(self.minutes())
    }
}

impl Default for Step {
    fn default() -> Self {
        Self::DAY
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.count, self.unit.suffix())
    }
}

impl FromStr for Step {
    type Err = StepParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();

        // Legacy timeframe spellings.
        let normalized = match lower.as_str() {
            "minute" => "1t".to_string(),
            "hour" => "1h".to_string(),
            "day" | "daily" => "1d".to_string(),
            other => match other.split_at_checked(1) {
                Some(("m", n)) if is_digits(n) => format!("{n}t"),
                Some(("h", n)) if is_digits(n) => format!("{n}h"),
                Some(("d", n)) if is_digits(n) => format!("{n}d"),
                _ => other.to_string(),
            },
        };

        let digits_end = normalized
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| StepParseError::Invalid(s.to_string()))?;
        let (count, suffix) = normalized.split_at(digits_end);
        let count: u32 = count
            .parse()
            .map_err(|_| StepParseError::Invalid(s.to_string()))?;

        let unit = match suffix {
            "t" | "m" | "min" | "minute" | "minutes" => StepUnit::Minute,
            "h" | "hour" | "hours" => StepUnit::Hour,
            "d" | "day" | "days" => StepUnit::Day,
            _ => return Err(StepParseError::Invalid(s.to_string())),
        };

        Self::new(count, unit)
    }
}

impl TryFrom<String> for Step {
    type Error = StepParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Step> for String {
    fn from(step: Step) -> Self {
        step.to_string()
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_minutes() {
        assert_eq!(Step::MINUTE.minutes(), 1);
        assert_eq!(Step::HOUR.minutes(), 60);
        assert_eq!(Step::DAY.minutes(), 1440);
        assert_eq!("5t".parse::<Step>().unwrap().minutes(), 5);
        assert_eq!("4h".parse::<Step>().unwrap().minutes(), 240);
    }

    #[test]
    fn test_step_parse() {
        assert_eq!("1t".parse::<Step>().unwrap(), Step::MINUTE);
        assert_eq!("1min".parse::<Step>().unwrap(), Step::MINUTE);
        assert_eq!("1h".parse::<Step>().unwrap(), Step::HOUR);
        assert_eq!("1D".parse::<Step>().unwrap(), Step::DAY);
        assert_eq!("m15".parse::<Step>().unwrap().to_string(), "15t");
        assert_eq!("h4".parse::<Step>().unwrap().to_string(), "4h");
        assert_eq!("daily".parse::<Step>().unwrap(), Step::DAY);
        assert!("invalid".parse::<Step>().is_err());
        assert!("t".parse::<Step>().is_err());
    }

    #[test]
    fn test_step_rejects_zero_and_misaligned() {
        assert!(matches!(
            "0t".parse::<Step>(),
            Err(StepParseError::ZeroCount(_))
        ));
        assert!(matches!(
            "7t".parse::<Step>(),
            Err(StepParseError::Misaligned(_))
        ));
        assert!(matches!(
            "5h".parse::<Step>(),
            Err(StepParseError::Misaligned(_))
        ));
        assert!("2d".parse::<Step>().is_ok());
    }

    #[test]
    fn test_step_serde_as_string() {
        let json = serde_json::to_string(&Step::HOUR).unwrap();
        assert_eq!(json, "\"1h\"");
        let step: Step = serde_json::from_str("\"15t\"").unwrap();
        assert_eq!(step.minutes(), 15);
    }
}
