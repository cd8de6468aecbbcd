//! Exact rational arithmetic over arbitrary-precision numerator/denominator
//! (4.C), matching the input language's compile-time numeric evaluation.
//!
//! No example in this core's source pack already reaches for `num-bigint`;
//! it is added here because the spec's own invariant — "arbitrary-precision
//! numerator/denominator" — cannot be satisfied by a machine integer, and
//! `num-bigint`/`num-integer`/`num-traits` are the standard, actively
//! maintained crates for this in the Rust ecosystem.

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{ToPrimitive, Zero};

use crate::error::CoreError;

/// An exact rational value `numerator / denominator`, always stored with
/// `denominator > 0` (3, "Rational literal").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RationalLiteral {
    numerator: BigInt,
    denominator: BigInt,
}

impl RationalLiteral {
    /// Construct `numerator / denominator`. Fails with `DivisionByZero`
    /// when `denominator == 0`; negates both components when
    /// `denominator < 0` so the stored denominator is always positive.
    pub fn new(numerator: impl Into<BigInt>, denominator: impl Into<BigInt>) -> Result<Self, CoreError> {
        let numerator = numerator.into();
        let denominator = denominator.into();
        if denominator.is_zero() {
            return Err(CoreError::division_by_zero());
        }
        if denominator < BigInt::zero() {
            Ok(RationalLiteral {
                numerator: -numerator,
                denominator: -denominator,
            })
        } else {
            Ok(RationalLiteral {
                numerator,
                denominator,
            })
        }
    }

    pub fn integer(value: impl Into<BigInt>) -> Self {
        RationalLiteral {
            numerator: value.into(),
            denominator: BigInt::from(1),
        }
    }

    pub fn zero() -> Self {
        RationalLiteral::integer(0)
    }

    pub fn numerator(&self) -> &BigInt {
        &self.numerator
    }

    pub fn denominator(&self) -> &BigInt {
        &self.denominator
    }

    fn negate(&self) -> Self {
        RationalLiteral {
            numerator: -self.numerator.clone(),
            denominator: self.denominator.clone(),
        }
    }

    /// `a + b`. Avoids a full cross-multiplication when the denominators
    /// already agree, or when one is a multiple of the other — the "lazy
    /// common-denominator optimisation" of 4.C.
    pub fn add(&self, other: &Self) -> Result<Self, CoreError> {
        if self.denominator == other.denominator {
            return RationalLiteral::new(
                self.numerator.clone() + other.numerator.clone(),
                self.denominator.clone(),
            );
        }

        if (other.denominator.clone() % self.denominator.clone()).is_zero() {
            let scale = other.denominator.clone() / self.denominator.clone();
            return RationalLiteral::new(
                self.numerator.clone() * scale + other.numerator.clone(),
                other.denominator.clone(),
            );
        }

        if (self.denominator.clone() % other.denominator.clone()).is_zero() {
            let scale = self.denominator.clone() / other.denominator.clone();
            return RationalLiteral::new(
                self.numerator.clone() + other.numerator.clone() * scale,
                self.denominator.clone(),
            );
        }

        RationalLiteral::new(
            self.numerator.clone() * other.denominator.clone()
                + other.numerator.clone() * self.denominator.clone(),
            self.denominator.clone() * other.denominator.clone(),
        )
    }

    /// `a - b`, implemented as `a + (-b)` (4.C).
    pub fn subtract(&self, other: &Self) -> Result<Self, CoreError> {
        self.add(&other.negate())
    }

    /// `a * b`, component-wise (4.C).
    pub fn multiply(&self, other: &Self) -> Result<Self, CoreError> {
        RationalLiteral::new(
            self.numerator.clone() * other.numerator.clone(),
            self.denominator.clone() * other.denominator.clone(),
        )
    }

    /// `a / b`. Dividing by a rational whose numerator is zero propagates
    /// `DivisionByZero` via the reciprocal's constructor (4.C).
    pub fn divide(&self, other: &Self) -> Result<Self, CoreError> {
        let reciprocal = RationalLiteral::new(other.denominator.clone(), other.numerator.clone())?;
        self.multiply(&reciprocal)
    }

    /// `(n1*d2 mod n2*d1, d1*d2)` (4.C). Sign follows the dividend, the
    /// same convention `num-bigint`'s `%` and the input language's
    /// constant folder both use for integers (decision recorded in
    /// DESIGN.md — this resolves the open TODO the distilled spec leaves
    /// on `mod` sign semantics).
    pub fn modulo(&self, other: &Self) -> Result<Self, CoreError> {
        let lhs = self.numerator.clone() * other.denominator.clone();
        let rhs = other.numerator.clone() * self.denominator.clone();
        if rhs.is_zero() {
            return Err(CoreError::division_by_zero());
        }
        RationalLiteral::new(lhs % rhs, self.denominator.clone() * other.denominator.clone())
    }

    /// `self ^ exponent`, where `exponent` must be an exact integer (4.C).
    pub fn exp(&self, exponent: &Self) -> Result<Self, CoreError> {
        let k = exponent.to_integer().ok_or_else(|| {
            CoreError::transpile_failed(None, "exponent of ** must be an exact integer")
        })?;

        if k.is_zero() {
            return Ok(RationalLiteral::integer(1));
        }

        if self.numerator.is_zero() {
            // k != 0 here (handled above); a zero base raised to a
            // negative power is undefined.
            return if k > BigInt::zero() {
                Ok(RationalLiteral::zero())
            } else {
                Err(CoreError::division_by_zero())
            };
        }

        let k_abs = k.clone().abs();
        let exp_u32 = k_abs
            .to_u32()
            .ok_or_else(|| CoreError::transpile_failed(None, "exponent magnitude too large"))?;

        if k > BigInt::zero() {
            return RationalLiteral::new(
                pow_bigint(&self.numerator, exp_u32),
                pow_bigint(&self.denominator, exp_u32),
            );
        }

        // k < 0: reciprocate, then raise. The constructor renormalises a
        // negative denominator (flipping both signs), so this already keeps
        // the sign of an odd power of a negative base correct without a
        // separate negated-numerator branch.
        RationalLiteral::new(
            pow_bigint(&self.denominator, exp_u32),
            pow_bigint(&self.numerator, exp_u32),
        )
    }

    /// `a == b` as values (not as representations): cross-multiply, which
    /// is sound because both denominators are positive (4.C).
    pub fn equal_value_of(&self, other: &Self) -> bool {
        self.numerator.clone() * other.denominator.clone()
            == other.numerator.clone() * self.denominator.clone()
    }

    /// `a > b` as values, via the same cross-multiplication as
    /// `equal_value_of` (4.C).
    pub fn greater_than(&self, other: &Self) -> bool {
        self.numerator.clone() * other.denominator.clone()
            > other.numerator.clone() * self.denominator.clone()
    }

    /// The quotient, iff division is exact; `None` otherwise (4.C).
    pub fn to_integer(&self) -> Option<BigInt> {
        if self.numerator.is_multiple_of(&self.denominator) {
            Some(self.numerator.clone() / self.denominator.clone())
        } else {
            None
        }
    }

    /// Parse a literal in the input language's compile-time numeric
    /// syntax (4.C): hex, scientific notation, decimal fraction, or plain
    /// decimal integer, after stripping `_` digit separators.
    pub fn parse(source: &str) -> Result<Self, CoreError> {
        let cleaned: String = source.chars().filter(|c| *c != '_').collect();

        if let Some(hex) = cleaned.strip_prefix("0x").or_else(|| cleaned.strip_prefix("0X")) {
            let value = BigInt::parse_bytes(hex.as_bytes(), 16)
                .ok_or_else(|| CoreError::transpile_failed(None, "invalid hex literal"))?;
            return Ok(RationalLiteral::integer(value));
        }

        if let Some(e_pos) = cleaned.find(['e', 'E']) {
            let (coefficient, rest) = cleaned.split_at(e_pos);
            let exponent_str = &rest[1..];
            let coefficient = Self::parse_decimal_fraction(coefficient)?;
            let exponent: i64 = exponent_str
                .parse()
                .map_err(|_| CoreError::transpile_failed(None, "invalid exponent"))?;
            let factor = if exponent >= 0 {
                RationalLiteral::integer(pow_bigint(&BigInt::from(10), exponent as u32))
            } else {
                RationalLiteral::new(1, pow_bigint(&BigInt::from(10), (-exponent) as u32))?
            };
            return coefficient.multiply(&factor);
        }

        Self::parse_decimal_fraction(&cleaned)
    }

    fn parse_decimal_fraction(source: &str) -> Result<Self, CoreError> {
        if let Some(dot) = source.find('.') {
            let (int_part, rest) = source.split_at(dot);
            let decimal_part = &rest[1..];
            let int_part = int_part.trim_start_matches('0');
            let decimal_part = decimal_part.trim_end_matches('0');

            if int_part.is_empty() && decimal_part.is_empty() {
                return Ok(RationalLiteral::zero());
            }

            let combined = format!("{int_part}{decimal_part}");
            let numerator = if combined.is_empty() {
                BigInt::zero()
            } else {
                combined
                    .parse::<BigInt>()
                    .map_err(|_| CoreError::transpile_failed(None, "invalid decimal literal"))?
            };
            let denominator = pow_bigint(&BigInt::from(10), decimal_part.len() as u32);
            return RationalLiteral::new(numerator, denominator);
        }

        if source.is_empty() {
            return Ok(RationalLiteral::zero());
        }

        let value = source
            .parse::<BigInt>()
            .map_err(|_| CoreError::transpile_failed(None, "invalid integer literal"))?;
        Ok(RationalLiteral::integer(value))
    }
}

impl std::fmt::Display for RationalLiteral {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.denominator == BigInt::from(1) {
            write!(f, "{}", self.numerator)
        } else {
            write!(f, "{}/{}", self.numerator, self.denominator)
        }
    }
}

fn pow_bigint(base: &BigInt, exponent: u32) -> BigInt {
    num_traits::pow(base.clone(), exponent as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(n: i64, d: i64) -> RationalLiteral {
        RationalLiteral::new(n, d).unwrap()
    }

    #[test]
    fn constructor_rejects_zero_denominator() {
        assert!(matches!(
            RationalLiteral::new(1, 0),
            Err(CoreError::DivisionByZero(_))
        ));
    }

    #[test]
    fn constructor_normalises_negative_denominator() {
        let value = r(1, -2);
        assert_eq!(value.numerator(), &BigInt::from(-1));
        assert_eq!(value.denominator(), &BigInt::from(2));
    }

    #[test]
    fn multiply_then_divide_round_trips() {
        let a = r(3, 4);
        let b = r(5, 7);
        let round_tripped = a.multiply(&b).unwrap().divide(&b).unwrap();
        assert!(round_tripped.equal_value_of(&a));
    }

    #[test]
    fn add_with_negation_is_zero() {
        let a = r(7, 3);
        let zero = a.add(&a.negate()).unwrap();
        assert!(zero.equal_value_of(&RationalLiteral::zero()));
    }

    #[test]
    fn add_scales_when_one_denominator_divides_the_other() {
        let a = r(1, 2);
        let b = r(1, 4);
        let sum = a.add(&b).unwrap();
        assert!(sum.equal_value_of(&r(3, 4)));
    }

    #[test]
    fn exp_of_zero_is_one_for_every_base() {
        for base in [r(0, 1), r(5, 1), r(-3, 7)] {
            let result = base.exp(&RationalLiteral::zero()).unwrap();
            assert!(result.equal_value_of(&RationalLiteral::integer(1)));
        }
    }

    #[test]
    fn exp_with_negative_exponent_and_positive_numerator_reciprocates() {
        let base = r(2, 1);
        let result = base.exp(&RationalLiteral::integer(-2)).unwrap();
        assert!(result.equal_value_of(&r(1, 4)));
    }

    #[test]
    fn exp_with_negative_exponent_and_negative_numerator_preserves_sign() {
        let base = r(-2, 1);
        let result = base.exp(&RationalLiteral::integer(-3)).unwrap();
        assert!(result.equal_value_of(&r(-1, 8)));
    }

    #[test]
    fn exp_zero_base_negative_exponent_divides_by_zero() {
        let base = RationalLiteral::zero();
        let result = base.exp(&RationalLiteral::integer(-1));
        assert!(matches!(result, Err(CoreError::DivisionByZero(_))));
    }

    #[test]
    fn divide_by_zero_numerator_fails() {
        let a = r(1, 1);
        let b = RationalLiteral::zero();
        assert!(matches!(a.divide(&b), Err(CoreError::DivisionByZero(_))));
    }

    #[test]
    fn to_integer_is_some_only_when_exact() {
        assert_eq!(r(4, 2).to_integer(), Some(BigInt::from(2)));
        assert_eq!(r(3, 2).to_integer(), None);
    }

    #[test]
    fn parse_scientific_notation() {
        let value = RationalLiteral::parse("1.5e2").unwrap();
        assert_eq!(value.to_integer(), Some(BigInt::from(150)));
    }

    #[test]
    fn parse_hex_and_underscored_decimal() {
        assert!(RationalLiteral::parse("0x2a")
            .unwrap()
            .equal_value_of(&RationalLiteral::integer(42)));
        assert!(RationalLiteral::parse("1_000")
            .unwrap()
            .equal_value_of(&RationalLiteral::integer(1000)));
    }

    #[test]
    fn parse_round_trips_through_display() {
        for literal in ["1.5e2", "0x2a", "1_000", "0.125", "7"] {
            let parsed = RationalLiteral::parse(literal).unwrap();
            let rendered = parsed.to_string();
            let reparsed = RationalLiteral::parse(&rendered).unwrap();
            assert!(parsed.equal_value_of(&reparsed));
        }
    }

    #[test]
    fn normalisation_denominator_always_positive() {
        for (n, d) in [(1, 2), (-1, 2), (1, -2), (-1, -2)] {
            let value = RationalLiteral::new(n, d).unwrap();
            assert!(value.denominator() > &BigInt::zero());
        }
    }
}
