use std::fmt;
use std::ops::{Add, Neg, Sub};

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Amount in minor currency units (cents for `usd`).
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct Cents(pub i64);

impl Cents {
    pub const ZERO: Cents = Cents(0);

    pub fn new(value: i64) -> Self {
        Cents(value)
    }

    pub fn get(self) -> i64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, other: Cents) -> Result<Cents> {
        self.0
            .checked_add(other.0)
            .map(Cents)
            .ok_or(ModelError::AmountOverflow)
    }

    pub fn checked_sub(self, other: Cents) -> Result<Cents> {
        self.0
            .checked_sub(other.0)
            .map(Cents)
            .ok_or(ModelError::AmountOverflow)
    }

    /// Share of this amount expressed in basis points, rounded half up.
    pub fn basis_points(self, bps: u32) -> Result<Cents> {
        let scaled = i128::from(self.0) * i128::from(bps);
        let rounded = (scaled + 5_000).div_euclid(10_000);
        i64::try_from(rounded)
            .map(Cents)
            .map_err(|_| ModelError::AmountOverflow)
    }
}

impl Add for Cents {
    type Output = Cents;

    fn add(self, rhs: Cents) -> Cents {
        Cents(self.0 + rhs.0)
    }
}

impl Sub for Cents {
    type Output = Cents;

    fn sub(self, rhs: Cents) -> Cents {
        Cents(self.0 - rhs.0)
    }
}

impl Neg for Cents {
    type Output = Cents;

    fn neg(self) -> Cents {
        Cents(-self.0)
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}
