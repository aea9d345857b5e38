//! SI prefixes and engineering notation
//!
//! Multimeter readings arrive as plain decimal numbers of base units (volts, ohms, farads...). To display them
//! the way the meter does, a value is split into a coefficient and a power of ten that is a multiple of three so
//! the power can be written as an SI prefix, e.g. `0.0123 V` becomes `12.3 mV`.

use std::{
    cmp::Ordering,
    fmt,
};
use rust_decimal::{ Decimal, prelude::ToPrimitive };
use crate::error::Error;

/// Smallest exponent engineering notation will ever pick
pub const MIN_EXPONENT: i32 = -9;
/// Largest exponent engineering notation will ever pick
pub const MAX_EXPONENT: i32 = 9;

macro_rules! si_prefixes
{
    { $($name:ident: $magnitude:literal, $notation:literal;)+ } => {
        /// Defines a scalar prefix for displaying units without changing the underlying value e.g. "giga-" or
        /// "micro-"
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum SiPrefix
        {
            $($name,)+
        }

        impl SiPrefix
        {
            /// Every prefix from smallest to largest
            pub const ALL: &'static [SiPrefix] = &[$(SiPrefix::$name,)+];

            /// Return the power of 10 of this prefix
            ///
            /// For example, a prefix of "milli-" returns -3.
            pub fn magnitude(self) -> i32
            {
                match self {
                    $(Self::$name => $magnitude,)+
                }
            }

            /// Return this prefix's written shorthand notation
            ///
            /// For example, a prefix of "giga-" returns "G"
            pub fn notation(self) -> &'static str
            {
                match self {
                    $(Self::$name => $notation,)+
                }
            }

            /// Looks up the prefix for a power of ten. Only multiples of 3 in `[-24, 24]` have one.
            pub fn from_magnitude(magnitude: i32) -> Option<Self>
            {
                match magnitude {
                    $($magnitude => Some(Self::$name),)+
                    _ => None,
                }
            }
        }
    }
}

si_prefixes!{
    Yocto: -24, "y";
    Zepto: -21, "z";
    Atto: -18, "a";
    Femto: -15, "f";
    Pico: -12, "p";
    Nano: -9, "n";
    Micro: -6, "µ";
    Milli: -3, "m";
    Base: 0, "";
    Kilo: 3, "k";
    Mega: 6, "M";
    Giga: 9, "G";
    Tera: 12, "T";
    Peta: 15, "P";
    Exa: 18, "E";
    Zetta: 21, "Z";
    Yotta: 24, "Y";
}

impl fmt::Display for SiPrefix
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(self.notation())
    }
}

/// Returns the SI prefix letter(s) for an engineering exponent
///
/// # Panics
/// When the exponent has no prefix. Engineering notation never produces such an exponent so reaching this is a
/// bug in the caller.
pub fn si_prefix(exponent: i32) -> &'static str
{
    match SiPrefix::from_magnitude(exponent) {
        Some(prefix) => prefix.notation(),
        None => panic!("Cannot determine SI prefix for exponent {}", exponent),
    }
}

/// Largest multiple of 3 not above `exponent`
pub(crate) fn floor_to_engineering(exponent: i32) -> i32
{
    exponent.div_euclid(3) * 3
}

/// Smallest multiple of 3 not below `exponent`
pub(crate) fn ceil_to_engineering(exponent: i32) -> i32
{
    -floor_to_engineering(-exponent)
}

/// Normalizes an exponent window: bounds are rounded outward to multiples of 3 and then clamped to
/// [`MIN_EXPONENT`, `MAX_EXPONENT`]
pub(crate) fn exponent_window(min: i32, max: i32) -> Result<(i32, i32), Error>
{
    let min = floor_to_engineering(min).max(MIN_EXPONENT);
    let max = ceil_to_engineering(max).min(MAX_EXPONENT);

    if max < min {
        Err(Error::InvalidExponentWindow { min: min, max: max })
    }
    else {
        Ok((min, max))
    }
}

/// Power of ten of the leading digit of a nonzero value, searching no further than the given window
fn magnitude(value: Decimal, min: i32, max: i32) -> i32
{
    let mut scaled = value.abs();
    let mut magnitude = 0;

    if scaled >= Decimal::ONE {
        while scaled >= Decimal::TEN && magnitude < max {
            scaled /= Decimal::TEN;
            magnitude += 1;
        }
    }
    else {
        while scaled < Decimal::ONE && magnitude > min {
            scaled *= Decimal::TEN;
            magnitude -= 1;
        }
    }

    magnitude
}

/// Engineering exponent of a value with the exponent clamped into the (already normalized) window
pub(crate) fn engineering_exponent(value: Decimal, min: i32, max: i32) -> i32
{
    if value == Decimal::MIN {
        min
    }
    else if value == Decimal::MAX {
        max
    }
    else if value.is_zero() {
        min
    }
    else {
        floor_to_engineering(magnitude(value, min, max)).clamp(min, max)
    }
}

/// Divides a value by `10^exponent`, saturating instead of overflowing
///
/// A saturated result is `Decimal::MAX` or `Decimal::MIN`, meaning the value cannot be represented at that exponent.
fn scale_down(value: Decimal, exponent: i32) -> Decimal
{
    let mut scaled = value;

    match exponent.cmp(&0) {
        Ordering::Greater => for _ in 0..exponent {
            scaled /= Decimal::TEN;
        },
        Ordering::Less => for _ in exponent..0 {
            scaled = match scaled.checked_mul(Decimal::TEN) {
                Some(next) => next,
                None => return if value.is_sign_negative() { Decimal::MIN } else { Decimal::MAX },
            };
        },
        Ordering::Equal => {}
    }

    scaled
}

/// A decimal value split into a coefficient and an exponent which is a multiple of 3
///
/// The exponent is the largest multiple of 3 not exceeding the value's own magnitude, clamped into the exponent
/// window the notation was created with. `Decimal::MAX` and `Decimal::MIN` stand for "over range" and are never
/// scaled; they pin the exponent to the top or bottom of the window.
#[derive(Debug, Clone, Copy)]
pub struct EngineeringNotation
{
    value: Decimal,
    exponent: i32,
}

impl EngineeringNotation
{
    /// Engineering notation over the full [`MIN_EXPONENT`, `MAX_EXPONENT`] window
    pub fn new(value: Decimal) -> Self
    {
        Self::within(value, MIN_EXPONENT, MAX_EXPONENT)
    }

    /// Engineering notation restricted to a window of exponents
    ///
    /// The window bounds are rounded outward to multiples of 3 and clamped to the global bounds. An inverted
    /// window is an error.
    pub fn with_window(value: Decimal, min_exponent: i32, max_exponent: i32) -> Result<Self, Error>
    {
        let (min, max) = exponent_window(min_exponent, max_exponent)?;
        Ok(Self::within(value, min, max))
    }

    /// Window must already be normalized
    pub(crate) fn within(value: Decimal, min: i32, max: i32) -> Self
    {
        Self {
            value: value,
            exponent: engineering_exponent(value, min, max),
        }
    }

    /// The unscaled value
    pub fn value(&self) -> Decimal
    {
        self.value
    }

    pub fn exponent(&self) -> i32
    {
        self.exponent
    }

    /// Returns the value divided by `10^exponent`
    ///
    /// The overflow sentinels and zero are returned unchanged.
    pub fn coefficient(&self) -> Decimal
    {
        if self.value == Decimal::MIN || self.value == Decimal::MAX || self.value.is_zero() {
            self.value
        }
        else {
            scale_down(self.value, self.exponent)
        }
    }

    pub fn si_prefix(&self) -> &'static str
    {
        si_prefix(self.exponent)
    }

    /// The value truncated to an integer, if it fits
    pub fn to_int(&self) -> Option<i64>
    {
        self.value.trunc().to_i64()
    }

    pub fn to_decimal(&self) -> Decimal
    {
        self.value
    }

    /// The value as a float. This can lose precision.
    pub fn to_f64(&self) -> f64
    {
        self.value.to_f64().unwrap_or(f64::NAN)
    }
}

impl PartialEq for EngineeringNotation
{
    fn eq(&self, rhs: &Self) -> bool
    {
        self.value == rhs.value
    }
}

impl PartialEq<Decimal> for EngineeringNotation
{
    fn eq(&self, rhs: &Decimal) -> bool
    {
        self.value == *rhs
    }
}

impl Eq for EngineeringNotation {}

impl fmt::Display for EngineeringNotation
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.value)
    }
}

#[cfg(test)]
mod tests
{
    use super::{ EngineeringNotation, SiPrefix, si_prefix, exponent_window, MIN_EXPONENT, MAX_EXPONENT };
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    #[test]
    fn base()
    {
        let x = EngineeringNotation::new(dec!(10));
        assert_eq!(x.value(), dec!(10));
        assert_eq!(x.coefficient(), dec!(10));
        assert_eq!(x.exponent(), 0);
        assert!(x == dec!(10));
        assert_eq!(x.to_int(), Some(10));
        assert_eq!(x.to_f64(), 10.0);
    }

    #[test]
    fn milli()
    {
        let x = EngineeringNotation::new(dec!(0.1));
        assert_eq!(x.coefficient(), dec!(100));
        assert_eq!(x.exponent(), -3);
    }

    #[test]
    fn micro()
    {
        let x = EngineeringNotation::new(dec!(0.000314));
        assert_eq!(x.coefficient(), dec!(314));
        assert_eq!(x.exponent(), -6);
    }

    #[test]
    fn nano()
    {
        let x = EngineeringNotation::new(dec!(0.0000000314));
        assert_eq!(x.coefficient(), dec!(31.4));
        assert_eq!(x.exponent(), -9);
    }

    #[test]
    fn below_nano_stays_nano()
    {
        let x = EngineeringNotation::new(dec!(0.000000000314));
        assert_eq!(x.coefficient(), dec!(0.314));
        assert_eq!(x.exponent(), -9);
    }

    #[test]
    fn kilo()
    {
        let x = EngineeringNotation::new(dec!(4242));
        assert_eq!(x.coefficient(), dec!(4.242));
        assert_eq!(x.exponent(), 3);
    }

    #[test]
    fn mega()
    {
        let x = EngineeringNotation::new(dec!(3141592.65358979323846264));
        assert_eq!(x.coefficient(), dec!(3.14159265358979323846264));
        assert_eq!(x.exponent(), 6);
    }

    #[test]
    fn giga()
    {
        let x = EngineeringNotation::new(dec!(31415926535.8979323846264));
        assert_eq!(x.coefficient(), dec!(31.4159265358979323846264));
        assert_eq!(x.exponent(), 9);
    }

    #[test]
    fn above_giga_stays_giga()
    {
        let x = EngineeringNotation::new(dec!(31415926535897.9323846264));
        assert_eq!(x.coefficient(), dec!(31415.9265358979323846264));
        assert_eq!(x.exponent(), 9);
    }

    #[test]
    fn negative_values_scale_by_magnitude()
    {
        let x = EngineeringNotation::new(dec!(-0.0425));
        assert_eq!(x.coefficient(), dec!(-42.5));
        assert_eq!(x.exponent(), -3);
    }

    #[test]
    fn zero_takes_window_minimum()
    {
        let x = EngineeringNotation::with_window(Decimal::ZERO, -6, 3).unwrap();
        assert_eq!(x.coefficient(), Decimal::ZERO);
        assert_eq!(x.exponent(), -6);
    }

    #[test]
    fn sentinels_pin_to_window_edges()
    {
        let max = EngineeringNotation::with_window(Decimal::MAX, -3, 3).unwrap();
        assert_eq!(max.coefficient(), Decimal::MAX);
        assert_eq!(max.exponent(), 3);

        let min = EngineeringNotation::with_window(Decimal::MIN, -3, 3).unwrap();
        assert_eq!(min.coefficient(), Decimal::MIN);
        assert_eq!(min.exponent(), -3);
    }

    #[test]
    fn window_clamps_from_both_sides()
    {
        let x = EngineeringNotation::with_window(dec!(12345.6), 3, 3).unwrap();
        assert_eq!(x.coefficient(), dec!(12.3456));
        assert_eq!(x.exponent(), 3);

        let x = EngineeringNotation::with_window(dec!(0.5), 3, 3).unwrap();
        assert_eq!(x.coefficient(), dec!(0.0005));
        assert_eq!(x.exponent(), 3);

        let x = EngineeringNotation::with_window(dec!(1000), -3, 0).unwrap();
        assert_eq!(x.coefficient(), dec!(1000));
        assert_eq!(x.exponent(), 0);
    }

    #[test]
    fn window_is_rounded_outward_and_clamped()
    {
        assert_eq!(exponent_window(-4, 1).unwrap(), (-6, 3));
        assert_eq!(exponent_window(-20, 20).unwrap(), (MIN_EXPONENT, MAX_EXPONENT));
        assert!(exponent_window(3, 0).is_err());
    }

    #[test]
    fn coefficient_times_power_restores_value()
    {
        let mantissas = [dec!(1), dec!(1.5), dec!(-2.25), dec!(9.999), dec!(123.456), dec!(-999.9)];

        for lo in (MIN_EXPONENT..=MAX_EXPONENT).step_by(3) {
            for hi in (lo..=MAX_EXPONENT).step_by(3) {
                for power in -12..=12 {
                    for mantissa in mantissas.iter() {
                        let value = if power >= 0 {
                            *mantissa * Decimal::from_i128_with_scale(10i128.pow(power as u32), 0)
                        }
                        else {
                            *mantissa / Decimal::from_i128_with_scale(10i128.pow((-power) as u32), 0)
                        };

                        let x = EngineeringNotation::with_window(value, lo, hi).unwrap();
                        assert_eq!(x.exponent() % 3, 0);
                        assert!(x.exponent() >= lo && x.exponent() <= hi);

                        let restored = if x.exponent() >= 0 {
                            x.coefficient() * Decimal::from_i128_with_scale(10i128.pow(x.exponent() as u32), 0)
                        }
                        else {
                            x.coefficient() / Decimal::from_i128_with_scale(10i128.pow((-x.exponent()) as u32), 0)
                        };
                        assert_eq!(restored, value, "value {} in [{}, {}]", value, lo, hi);
                    }
                }
            }
        }
    }

    #[test]
    fn prefix_table()
    {
        assert_eq!(si_prefix(0), "");
        assert_eq!(si_prefix(-3), "m");
        assert_eq!(si_prefix(3), "k");
        assert_eq!(si_prefix(-6), "µ");
        assert_eq!(si_prefix(6), "M");
        assert_eq!(si_prefix(-9), "n");
        assert_eq!(si_prefix(9), "G");
        assert_eq!(si_prefix(-24), "y");
        assert_eq!(si_prefix(24), "Y");
    }

    #[test]
    fn prefix_table_is_total_over_multiples_of_three()
    {
        assert_eq!(SiPrefix::ALL.len(), 17);

        for exponent in (-24..=24).step_by(3) {
            let prefix = SiPrefix::from_magnitude(exponent).unwrap();
            assert_eq!(prefix.magnitude(), exponent);
        }

        assert_eq!(SiPrefix::from_magnitude(1), None);
        assert_eq!(SiPrefix::from_magnitude(27), None);
    }

    #[test]
    #[should_panic]
    fn prefix_outside_table_panics()
    {
        si_prefix(-2);
    }
}
