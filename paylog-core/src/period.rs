use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pay-period tag for entries that belong to a payroll cycle.
///
/// Range checks happen at entry validation; this type only carries the pair.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct PayPeriod {
    pub month: u32,
    pub year: i32,
}

impl PayPeriod {
    pub fn new(month: u32, year: i32) -> Self {
        Self { month, year }
    }
}

impl fmt::Display for PayPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for PayPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| format!("invalid pay period (expected YYYY-MM): {s}"))?;
        let year = year
            .parse()
            .map_err(|_| format!("invalid pay period year: {s}"))?;
        let month = month
            .parse()
            .map_err(|_| format!("invalid pay period month: {s}"))?;
        Ok(Self { month, year })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_and_parses_year_month() {
        let period = PayPeriod::new(7, 2024);
        assert_eq!(period.to_string(), "2024-07");
        assert_eq!("2024-07".parse::<PayPeriod>().unwrap(), period);
    }

    #[test]
    fn rejects_malformed_text() {
        assert!("2024".parse::<PayPeriod>().is_err());
        assert!("2024-xx".parse::<PayPeriod>().is_err());
    }
}
