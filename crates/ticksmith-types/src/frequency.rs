//! Catalog frequency codes.

use serde::{Deserialize, Serialize};

use crate::{InvalidFrequency, Step};

/// Granularity of a catalog entry, also used as a refinement level.
///
/// Serialized as the number of minutes an entry covers: `1`, `60` or `1440`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Frequency {
    /// One minute.
    Minute,
    /// One hour.
    Hour,
    /// One calendar day.
    Day,
}

impl Frequency {
    /// Returns the frequency code.
    #[must_use]
    pub const fn code(&self) -> u32 {
        match self {
            Self::Minute => 1,
            Self::Hour => 60,
            Self::Day => 1440,
        }
    }

    /// Returns the number of minutes covered by one entry.
    #[must_use]
    pub const fn minutes(&self) -> i64 {
        self.code() as i64
    }

    /// Looks up a frequency by code.
    #[must_use]
    pub const fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(Self::Minute),
            60 => Some(Self::Hour),
            1440 => Some(Self::Day),
            _ => None,
        }
    }

    /// Returns the next finer level, or `None` at minute granularity.
    #[must_use]
    pub const fn finer(&self) -> Option<Self> {
        match self {
            Self::Day => Some(Self::Hour),
            Self::Hour => Some(Self::Minute),
            Self::Minute => None,
        }
    }

    /// Returns the calendar step of one entry.
    #[must_use]
    pub const fn step(&self) -> Step {
        match self {
            Self::Minute => Step::MINUTE,
            Self::Hour => Step::HOUR,
            Self::Day => Step::DAY,
        }
    }

    /// Returns the coarsest frequency whose entries a step of this size can hold.
    #[must_use]
    pub const fn for_step(step: Step) -> Self {
        let minutes = step.minutes();
        if minutes >= 1440 {
            Self::Day
        } else if minutes >= 60 {
            Self::Hour
        } else {
            Self::Minute
        }
    }

    /// Returns all frequencies, coarsest first.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Day, Self::Hour, Self::Minute]
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
        };
        write!(f, "{name}")
    }
}

impl From<Frequency> for u32 {
    fn from(frequency: Frequency) -> Self {
        frequency.code()
    }
}

impl TryFrom<u32> for Frequency {
    type Error = InvalidFrequency;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or(InvalidFrequency(code))
    }
}
