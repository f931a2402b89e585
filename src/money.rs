// Exact monetary values as numerator/denominator pairs.
// Ledger amounts are never converted to floating point.

use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Neg, Sub};

/// Denominator used when the ledger gives us nothing to observe.
pub const DEFAULT_DENOM: i64 = 100;

/// A signed rational amount as stored in `splits.value_num / value_denom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Money {
    pub num: i64,
    pub denom: i64,
}

impl Money {
    pub fn new(num: i64, denom: i64) -> Self {
        Money { num, denom }
    }

    /// Zero over the default denominator.
    pub fn zero() -> Self {
        Money {
            num: 0,
            denom: DEFAULT_DENOM,
        }
    }

    pub fn is_negative(&self) -> bool {
        (self.num < 0) != (self.denom < 0) && self.num != 0
    }

    /// Add `other` into a running total, carrying the denominator observed
    /// from the data. One account (or one aggregation group) uses a single
    /// unit scale, so no cross-denominator reconciliation happens here.
    pub fn accumulate(&mut self, other: Money) {
        self.num = self.num.saturating_add(other.num);
        self.denom = other.denom;
    }

    /// Compares the rational values exactly (cross-multiplied in 128-bit).
    /// A zero denominator orders as zero. Equality here is by value, so
    /// 3000/1 and 300000/100 compare `Equal` while `==` stays structural.
    pub fn cmp_value(&self, other: &Money) -> Ordering {
        let (a_num, a_den) = normalized(self.num, self.denom);
        let (b_num, b_den) = normalized(other.num, other.denom);
        (a_num * b_den).cmp(&(b_num * a_den))
    }

    /// Two-decimal rendering, see [`format_decimal`].
    pub fn format(&self) -> String {
        format_decimal(self.num, self.denom)
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money {
            num: self.num.saturating_neg(),
            denom: self.denom,
        }
    }
}

impl Sub for Money {
    type Output = Money;

    /// Subtraction within one denominator; the left-hand scale is kept.
    fn sub(self, rhs: Money) -> Money {
        Money {
            num: self.num.saturating_sub(rhs.num),
            denom: self.denom,
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

fn normalized(num: i64, denom: i64) -> (i128, i128) {
    match denom.cmp(&0) {
        Ordering::Equal => (0, 1),
        Ordering::Less => (-(num as i128), -(denom as i128)),
        Ordering::Greater => (num as i128, denom as i128),
    }
}

/// Render `num / denom` as `[-]W.FF`.
///
/// `W` is the truncated quotient of `|num|` by `denom` and `FF` the
/// remainder scaled to hundredths with integer division (rounds toward
/// zero). A zero denominator renders `"0.00"`.
pub fn format_decimal(num: i64, denom: i64) -> String {
    if denom == 0 {
        return "0.00".to_string();
    }
    let (num, denom) = normalized(num, denom);
    let negative = num < 0;
    let abs = num.abs();
    let whole = abs / denom;
    let frac = (abs % denom) * 100 / denom;
    let sign = if negative { "-" } else { "" };
    format!("{}{}.{:02}", sign, whole, frac)
}
