use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Trading environment. Live and paper trading use distinct hosts,
/// transaction IDs and call budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Live,
    Paper,
}

impl Environment {
    pub const ALL: [Self; 2] = [Self::Live, Self::Paper];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Paper => "paper",
        }
    }

    /// REST base URL for this environment.
    pub const fn base_url(self) -> &'static str {
        match self {
            Self::Live => "https://openapi.koreainvestment.com:9443",
            Self::Paper => "https://openapivts.koreainvestment.com:29443",
        }
    }

    /// Upstream call budget for this environment.
    pub const fn rate_budget(self) -> RateBudget {
        match self {
            Self::Live => RateBudget {
                capacity: 20,
                window: Duration::from_secs(1),
            },
            Self::Paper => RateBudget {
                capacity: 2,
                window: Duration::from_secs(1),
            },
        }
    }

    pub const fn is_paper(self) -> bool {
        matches!(self, Self::Paper)
    }
}

impl Display for Environment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "live" | "prod" | "production" => Ok(Self::Live),
            "paper" | "vts" => Ok(Self::Paper),
            other => Err(format!("invalid environment '{other}'")),
        }
    }
}

/// Call allowance over a rolling window.
///
/// The limiter derives a continuous refill rate from this, so the minimum
/// interval between consecutive calls in a sustained burst is
/// `window / capacity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateBudget {
    pub capacity: u32,
    pub window: Duration,
}

impl RateBudget {
    /// Refill interval for one budget cell.
    pub fn cell_period(self) -> Duration {
        let capacity = self.capacity.max(1);
        Duration::from_secs_f64(self.window.as_secs_f64() / f64::from(capacity))
    }
}

/// Immutable application identity for one credential pair.
#[derive(Debug, Clone)]
pub struct Credential {
    pub app_key: String,
    pub app_secret: String,
    pub environment: Environment,
}

impl Credential {
    pub fn new(
        app_key: impl Into<String>,
        app_secret: impl Into<String>,
        environment: Environment,
    ) -> Self {
        Self {
            app_key: app_key.into(),
            app_secret: app_secret.into(),
            environment,
        }
    }
}

/// Brokerage account number, written `CANO-PRDT` (e.g. `12345678-01`).
///
/// The upstream splits it into the eight-digit account (`CANO`) and the
/// two-digit product code (`ACNT_PRDT_CD`), which every trading call carries
/// as separate fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountNumber {
    cano: String,
    product_code: String,
}

impl AccountNumber {
    pub fn cano(&self) -> &str {
        &self.cano
    }

    pub fn product_code(&self) -> &str {
        &self.product_code
    }
}

impl Display for AccountNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.cano, self.product_code)
    }
}

impl FromStr for AccountNumber {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidAccountNumber {
            value: value.to_owned(),
        };

        let trimmed = value.trim();
        let (cano, product_code) = match trimmed.split_once('-') {
            Some(parts) => parts,
            // Bare ten-digit form without the dash is accepted too. The
            // boundary check keeps multi-byte input from panicking the split.
            None if trimmed.len() == 10 && trimmed.is_char_boundary(8) => trimmed.split_at(8),
            None => return Err(invalid()),
        };

        let digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
        if cano.len() != 8 || product_code.len() != 2 || !digits(cano) || !digits(product_code) {
            return Err(invalid());
        }

        Ok(Self {
            cano: cano.to_owned(),
            product_code: product_code.to_owned(),
        })
    }
}
