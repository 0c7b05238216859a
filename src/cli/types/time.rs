//! Time-related types for league seasons and Royale quarters.

use crate::cli::types::ids::LeagueId;
use crate::error::{FantasyCriticError, Result};
use chrono::{Datelike, NaiveDate};
use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, Value, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Type-safe wrapper for league years
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Year(pub u16);

impl Year {
    /// Latest year accepted from user input.
    pub const MAX: Year = Year(9999);

    pub fn new(year: u16) -> Self {
        Self(year)
    }

    pub fn as_u16(&self) -> u16 {
        self.0
    }

    pub fn as_i32(&self) -> i32 {
        i32::from(self.0)
    }

    /// Diminishing scoring, counter-pick penalties and trades arrived in 2022.
    pub fn supports_2022_features(&self) -> bool {
        self.0 >= 2022
    }

    pub fn first_date(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.as_i32(), 1, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn last_date(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.as_i32(), 12, 31).unwrap_or(NaiveDate::MAX)
    }
}

impl Default for Year {
    fn default() -> Self {
        Self(2026)
    }
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ToSql for Year {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Owned(Value::Integer(i64::from(self.0))))
    }
}

impl FromSql for Year {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        u16::column_result(value).map(Year)
    }
}

impl FromStr for Year {
    type Err = FantasyCriticError;

    fn from_str(s: &str) -> Result<Self> {
        let year = Self(s.trim().parse()?);
        if year > Self::MAX {
            return Err(FantasyCriticError::validation(format!(
                "Year must be at most {}, got {}",
                Self::MAX,
                year
            )));
        }
        Ok(year)
    }
}

/// A calendar quarter, the season unit of Royale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct YearQuarter {
    pub year: Year,
    pub quarter: u8,
}

impl YearQuarter {
    pub fn new(year: Year, quarter: u8) -> Result<Self> {
        if !(1..=4).contains(&quarter) {
            return Err(FantasyCriticError::validation(format!(
                "Quarter must be between 1 and 4, got {}",
                quarter
            )));
        }
        Ok(Self { year, quarter })
    }

    pub fn for_date(date: NaiveDate) -> Self {
        Self {
            year: Year::new(date.year() as u16),
            quarter: ((date.month0() / 3) + 1) as u8,
        }
    }

    pub fn first_date(&self) -> NaiveDate {
        let month = u32::from(self.quarter - 1) * 3 + 1;
        NaiveDate::from_ymd_opt(self.year.as_i32(), month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn last_date(&self) -> NaiveDate {
        self.next()
            .first_date()
            .pred_opt()
            .unwrap_or(NaiveDate::MAX)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.first_date() && date <= self.last_date()
    }

    pub fn next(&self) -> Self {
        if self.quarter == 4 {
            Self {
                year: Year::new(self.year.as_u16().saturating_add(1)),
                quarter: 1,
            }
        } else {
            Self {
                year: self.year,
                quarter: self.quarter + 1,
            }
        }
    }
}

impl fmt::Display for YearQuarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-Q{}", self.year, self.quarter)
    }
}

impl FromStr for YearQuarter {
    type Err = FantasyCriticError;

    /// Parses `2026-Q1` (the `Q` is optional).
    fn from_str(s: &str) -> Result<Self> {
        let (year, quarter) = s.trim().split_once('-').ok_or_else(|| {
            FantasyCriticError::validation(format!("Invalid year quarter: {}", s))
        })?;
        let quarter = quarter.trim_start_matches(['Q', 'q']);
        Self::new(year.parse()?, quarter.parse()?)
    }
}

/// Key of one league's season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LeagueYearKey {
    pub league_id: LeagueId,
    pub year: Year,
}

impl LeagueYearKey {
    pub fn new(league_id: LeagueId, year: Year) -> Self {
        Self { league_id, year }
    }
}

impl fmt::Display for LeagueYearKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.league_id, self.year)
    }
}
