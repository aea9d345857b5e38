//! Measurement data and reply parsing

use std::{
    borrow::Cow,
    fmt,
    time::Duration,
};
use chrono::{ DateTime, Utc };
use rust_decimal::Decimal;
use crate::{
    error::Error,
    units::{ self, EngineeringNotation, MIN_EXPONENT, MAX_EXPONENT },
};

pub mod scpi;

/// The physical quantity a meter is measuring
///
/// The catalogue is fixed. Two types are equal when their keys are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeasurementType
{
    Unknown,
    VoltageDC,
    VoltageAC,
    Resistance,
    Diode,
    Capacitance,
    CurrentDC,
    CurrentAC,
    Frequency,
    Temperature,
}

impl MeasurementType
{
    /// Every type, `Unknown` first
    pub const ALL: &'static [MeasurementType] = &[
        Self::Unknown,
        Self::VoltageDC,
        Self::VoltageAC,
        Self::Resistance,
        Self::Diode,
        Self::Capacitance,
        Self::CurrentDC,
        Self::CurrentAC,
        Self::Frequency,
        Self::Temperature,
    ];

    /// Stable identifier. Empty for `Unknown`.
    pub fn key(self) -> &'static str
    {
        match self {
            Self::Unknown => "",
            Self::VoltageDC => "VoltageDC",
            Self::VoltageAC => "VoltageAC",
            Self::Resistance => "Resistance",
            Self::Diode => "Diode",
            Self::Capacitance => "Capacitance",
            Self::CurrentDC => "CurrentDC",
            Self::CurrentAC => "CurrentAC",
            Self::Frequency => "Frequency",
            Self::Temperature => "Temperature",
        }
    }

    /// User friendly name
    pub fn title(self) -> &'static str
    {
        match self {
            Self::Unknown => "Unknown",
            Self::VoltageDC => "Voltage (DC)",
            Self::VoltageAC => "Voltage (AC)",
            Self::Resistance => "Resistance",
            Self::Diode => "Diode",
            Self::Capacitance => "Capacitance",
            Self::CurrentDC => "Current (DC)",
            Self::CurrentAC => "Current (AC)",
            Self::Frequency => "Frequency",
            Self::Temperature => "Temperature",
        }
    }

    /// Unit symbol without any prefix
    pub fn unit(self) -> &'static str
    {
        match self {
            Self::Unknown => "",
            Self::VoltageDC | Self::VoltageAC | Self::Diode => "V",
            Self::Resistance => "Ω",
            Self::Capacitance => "F",
            Self::CurrentDC | Self::CurrentAC => "A",
            Self::Frequency => "Hz",
            Self::Temperature => "°C",
        }
    }

    /// Marking shown after the unit when nothing more specific is known about the range
    pub fn extra(self) -> Option<&'static str>
    {
        match self {
            Self::VoltageAC | Self::CurrentAC => Some("~"),
            _ => None,
        }
    }

    pub fn from_key(key: &str) -> Option<Self>
    {
        Self::ALL.iter().copied().find(|kind| kind.key() == key)
    }
}

impl Default for MeasurementType
{
    fn default() -> Self
    {
        Self::Unknown
    }
}

impl fmt::Display for MeasurementType
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(self.title())
    }
}

/// A named sub-scale of a measurement type such as "600 mV"
///
/// The exponent bounds limit which SI prefixes a reading on this range may be displayed with. Both are multiples
/// of 3 within [`MIN_EXPONENT`, `MAX_EXPONENT`] and the minimum never exceeds the maximum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasurementRange
{
    title: Cow<'static, str>,
    min_exponent: i32,
    max_exponent: i32,
    measurement_type: MeasurementType,
    extra: Option<Cow<'static, str>>,
}

impl MeasurementRange
{
    /// A range allowing every exponent
    pub fn new<S>(title: S, measurement_type: MeasurementType) -> Self
        where S: Into<Cow<'static, str>>
    {
        Self {
            title: title.into(),
            min_exponent: MIN_EXPONENT,
            max_exponent: MAX_EXPONENT,
            measurement_type: measurement_type,
            extra: None,
        }
    }

    /// A range bounded by exponents
    ///
    /// Bounds that are not multiples of 3 are rounded outward and everything is clamped to the global exponent
    /// limits. Fails if the maximum ends up below the minimum.
    pub fn with_exponents<S>(
        title: S,
        min_exponent: i32,
        max_exponent: i32,
        measurement_type: MeasurementType,
    )
        -> Result<Self, Error>

        where S: Into<Cow<'static, str>>
    {
        let (min, max) = units::exponent_window(min_exponent, max_exponent)?;

        Ok(Self {
            title: title.into(),
            min_exponent: min,
            max_exponent: max,
            measurement_type: measurement_type,
            extra: None,
        })
    }

    /// A range bounded by the smallest and largest values it displays
    ///
    /// Each bound contributes the engineering exponent of its own magnitude, e.g. `0.001` gives -3 and `999`
    /// gives 0.
    pub fn with_values<S>(
        title: S,
        min_value: Decimal,
        max_value: Decimal,
        measurement_type: MeasurementType,
    )
        -> Result<Self, Error>

        where S: Into<Cow<'static, str>>
    {
        let min = units::engineering_exponent(min_value, MIN_EXPONENT, MAX_EXPONENT);
        let max = units::engineering_exponent(max_value, MIN_EXPONENT, MAX_EXPONENT);
        Self::with_exponents(title, min, max, measurement_type)
    }

    /// Table entries whose bounds are already normalized
    pub(crate) const fn preset(
        title: &'static str,
        min_exponent: i32,
        max_exponent: i32,
        measurement_type: MeasurementType,
        extra: Option<&'static str>,
    )
        -> Self
    {
        Self {
            title: Cow::Borrowed(title),
            min_exponent: min_exponent,
            max_exponent: max_exponent,
            measurement_type: measurement_type,
            extra: match extra {
                Some(extra) => Some(Cow::Borrowed(extra)),
                None => None,
            },
        }
    }

    /// The range used when the meter's configuration cannot be determined
    pub fn unknown() -> Self
    {
        Self::default_for(MeasurementType::Unknown)
    }

    /// The range implied by a bare measurement type
    pub fn default_for(measurement_type: MeasurementType) -> Self
    {
        let range = Self::new(measurement_type.title(), measurement_type);

        match measurement_type.extra() {
            Some(extra) => range.with_extra(extra),
            None => range,
        }
    }

    /// Attach a marking shown after the unit, e.g. "~" for AC
    pub fn with_extra<S>(mut self, extra: S) -> Self
        where S: Into<Cow<'static, str>>
    {
        self.extra = Some(extra.into());
        self
    }

    pub fn title(&self) -> &str
    {
        &self.title
    }

    pub fn min_exponent(&self) -> i32
    {
        self.min_exponent
    }

    pub fn max_exponent(&self) -> i32
    {
        self.max_exponent
    }

    pub fn measurement_type(&self) -> MeasurementType
    {
        self.measurement_type
    }

    pub fn extra(&self) -> Option<&str>
    {
        self.extra.as_deref()
    }
}

impl fmt::Display for MeasurementRange
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(&self.title)?;

        if let Some(extra) = &self.extra {
            f.write_str(extra)?;
        }

        Ok(())
    }
}

/// A single reading taken from a meter
///
/// The value is always in base SI units. Measurements are never modified after they are created.
#[derive(Debug, Clone)]
pub struct Measurement
{
    time: DateTime<Utc>,
    value: Decimal,
    range: MeasurementRange,
    resolution: Option<Decimal>,
}

impl Measurement
{
    /// A reading of unknown type
    pub fn new(value: Decimal) -> Self
    {
        Self::with_type(value, MeasurementType::Unknown)
    }

    pub fn with_type(value: Decimal, measurement_type: MeasurementType) -> Self
    {
        Self::with_range(value, MeasurementRange::default_for(measurement_type))
    }

    pub fn with_range(value: Decimal, range: MeasurementRange) -> Self
    {
        Self {
            time: Utc::now(),
            value: value,
            range: range,
            resolution: None,
        }
    }

    /// Declares the smallest step the meter can resolve on this reading
    pub fn with_resolution(mut self, resolution: Decimal) -> Result<Self, Error>
    {
        if resolution.is_sign_negative() && !resolution.is_zero() {
            return Err(Error::NegativeResolution(resolution));
        }

        self.resolution = Some(resolution);
        Ok(self)
    }

    /// When the reading was taken
    pub fn time(&self) -> DateTime<Utc>
    {
        self.time
    }

    /// Value in base SI units
    pub fn value(&self) -> Decimal
    {
        self.value
    }

    pub fn range(&self) -> &MeasurementRange
    {
        &self.range
    }

    pub fn measurement_type(&self) -> MeasurementType
    {
        self.range.measurement_type()
    }

    pub fn resolution(&self) -> Option<Decimal>
    {
        self.resolution
    }

    /// Whether the meter reported the input as over range
    pub fn is_overflow(&self) -> bool
    {
        self.value == Decimal::MAX || self.value == Decimal::MIN
    }

    /// Engineering notation of the value within the range's exponent window
    pub fn engineering(&self) -> EngineeringNotation
    {
        EngineeringNotation::within(self.value, self.range.min_exponent(), self.range.max_exponent())
    }

    pub fn engineering_exponent(&self) -> i32
    {
        self.engineering().exponent()
    }

    pub fn engineering_coefficient(&self) -> Decimal
    {
        self.engineering().coefficient()
    }

    pub fn si_prefix(&self) -> &'static str
    {
        self.engineering().si_prefix()
    }

    /// Prefixed unit, e.g. "kΩ" or "mV~"
    pub fn si_unit(&self) -> String
    {
        format!(
            "{}{}{}",
            self.si_prefix(),
            self.measurement_type().unit(),
            self.range.extra().unwrap_or("")
        )
    }

    /// Whether this reading may still be shown
    ///
    /// A reading older than one and a half polling intervals is treated as absent so a meter that went away
    /// blanks instead of freezing on its last value.
    pub fn is_fresh(&self, now: DateTime<Utc>, update_interval: Duration) -> bool
    {
        let elapsed_ms = (now - self.time).num_milliseconds() as i128;
        elapsed_ms * 2 <= update_interval.as_millis() as i128 * 3
    }
}

impl fmt::Display for Measurement
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        // a coefficient too large for its range saturates to the same sentinels
        let coefficient = self.engineering_coefficient();

        if coefficient == Decimal::MAX {
            write!(f, "+OL {}", self.si_unit())
        }
        else if coefficient == Decimal::MIN {
            write!(f, "-OL {}", self.si_unit())
        }
        else {
            write!(f, "{} {}", coefficient.round_dp(6).normalize(), self.si_unit())
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::{ Measurement, MeasurementRange, MeasurementType };
    use std::time::Duration;
    use chrono::TimeDelta;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    #[test]
    fn type_keys()
    {
        assert_eq!(MeasurementType::Unknown.key(), "");
        assert_eq!(MeasurementType::VoltageDC.key(), "VoltageDC");
        assert_eq!(MeasurementType::VoltageAC.key(), "VoltageAC");
        assert_eq!(MeasurementType::Resistance.key(), "Resistance");
        assert_eq!(MeasurementType::Diode.key(), "Diode");
        assert_eq!(MeasurementType::Capacitance.key(), "Capacitance");
        assert_eq!(MeasurementType::CurrentDC.key(), "CurrentDC");
        assert_eq!(MeasurementType::CurrentAC.key(), "CurrentAC");
        assert_eq!(MeasurementType::Frequency.key(), "Frequency");
        assert_eq!(MeasurementType::Temperature.key(), "Temperature");
    }

    #[test]
    fn type_units()
    {
        assert_eq!(MeasurementType::Unknown.unit(), "");
        assert_eq!(MeasurementType::VoltageDC.unit(), "V");
        assert_eq!(MeasurementType::VoltageAC.unit(), "V");
        assert_eq!(MeasurementType::Resistance.unit(), "Ω");
        assert_eq!(MeasurementType::Diode.unit(), "V");
        assert_eq!(MeasurementType::Capacitance.unit(), "F");
        assert_eq!(MeasurementType::CurrentDC.unit(), "A");
        assert_eq!(MeasurementType::CurrentAC.unit(), "A");
        assert_eq!(MeasurementType::Frequency.unit(), "Hz");
        assert_eq!(MeasurementType::Temperature.unit(), "°C");
    }

    #[test]
    fn type_keys_round_trip()
    {
        for kind in MeasurementType::ALL {
            assert_eq!(MeasurementType::from_key(kind.key()), Some(*kind));
        }
        assert_eq!(MeasurementType::from_key("Voltage"), None);
    }

    #[test]
    fn range_from_values_milli_to_kilo()
    {
        let r = MeasurementRange::with_values("Test", dec!(0.001), dec!(1000), MeasurementType::VoltageDC).unwrap();
        assert_eq!(r.title(), "Test");
        assert_eq!(r.min_exponent(), -3);
        assert_eq!(r.max_exponent(), 3);
        assert_eq!(r.measurement_type(), MeasurementType::VoltageDC);
    }

    #[test]
    fn range_from_values_rounds_to_own_magnitude()
    {
        let cases = [
            (dec!(0.001), dec!(999), -3, 0),
            (dec!(0.00001), dec!(6000000), -6, 6),
            (dec!(0.00001), dec!(60000000), -6, 6),
            (dec!(0.00001), dec!(600000000), -6, 6),
            (dec!(0.0000001), dec!(6000000000), -9, 9),
            (dec!(0.000000000001), dec!(6000000000000), -9, 9),
        ];

        for (min, max, min_exponent, max_exponent) in cases.iter() {
            let r = MeasurementRange::with_values("Test", *min, *max, MeasurementType::Unknown).unwrap();
            assert_eq!(r.min_exponent(), *min_exponent, "min of [{}, {}]", min, max);
            assert_eq!(r.max_exponent(), *max_exponent, "max of [{}, {}]", min, max);
        }
    }

    #[test]
    fn range_without_bounds_spans_everything()
    {
        let r = MeasurementRange::new("Test", MeasurementType::VoltageDC);
        assert_eq!(r.min_exponent(), -9);
        assert_eq!(r.max_exponent(), 9);
    }

    #[test]
    fn range_rejects_inverted_window()
    {
        assert!(MeasurementRange::with_exponents("Test", 3, -3, MeasurementType::Unknown).is_err());
        assert!(MeasurementRange::with_values("Test", dec!(1000), dec!(1), MeasurementType::Unknown).is_err());
    }

    #[test]
    fn unknown_value_has_no_unit()
    {
        let m = Measurement::new(dec!(3.14159));
        assert_eq!(m.engineering_coefficient(), dec!(3.14159));
        assert_eq!(m.engineering_exponent(), 0);
        assert_eq!(m.si_prefix(), "");
        assert_eq!(m.si_unit(), "");
    }

    #[test]
    fn measurement_units_follow_exponent()
    {
        let cases = [
            (dec!(0.314159), MeasurementType::VoltageDC, dec!(314.159), -3, "mV"),
            (dec!(3141.59), MeasurementType::VoltageAC, dec!(3.14159), 3, "kV~"),
            (dec!(0.0000314159), MeasurementType::Resistance, dec!(31.4159), -6, "µΩ"),
            (dec!(3141592), MeasurementType::Frequency, dec!(3.141592), 6, "MHz"),
            (dec!(0.000000314159), MeasurementType::CurrentDC, dec!(314.159), -9, "nA"),
            (dec!(314159265358), MeasurementType::CurrentAC, dec!(314.159265358), 9, "GA~"),
            (dec!(0.000000000314159), MeasurementType::Capacitance, dec!(0.314159), -9, "nF"),
            (dec!(314159265358979), MeasurementType::Diode, dec!(314159.265358979), 9, "GV"),
        ];

        for (value, kind, coefficient, exponent, unit) in cases.iter() {
            let m = Measurement::with_type(*value, *kind);
            assert_eq!(m.engineering_coefficient(), *coefficient);
            assert_eq!(m.engineering_exponent(), *exponent);
            assert_eq!(&m.si_unit(), unit);
        }
    }

    #[test]
    fn range_limits_exponent()
    {
        let r = MeasurementRange::with_values("Current", dec!(0.001), dec!(20), MeasurementType::CurrentDC).unwrap();

        let above = Measurement::with_range(dec!(1000), r.clone());
        assert_eq!(above.engineering_coefficient(), dec!(1000));
        assert_eq!(above.engineering_exponent(), 0);
        assert_eq!(above.si_unit(), "A");

        let below = Measurement::with_range(dec!(0.0001), r);
        assert_eq!(below.engineering_coefficient(), dec!(0.1));
        assert_eq!(below.engineering_exponent(), -3);
        assert_eq!(below.si_unit(), "mA");
    }

    #[test]
    fn negative_resolution_is_rejected()
    {
        assert!(Measurement::new(dec!(1)).with_resolution(dec!(-0.001)).is_err());

        let m = Measurement::new(dec!(1)).with_resolution(dec!(0.001)).unwrap();
        assert_eq!(m.resolution(), Some(dec!(0.001)));
    }

    #[test]
    fn display_trims_coefficient()
    {
        let m = Measurement::with_type(dec!(0.0123), MeasurementType::VoltageDC);
        assert_eq!(m.to_string(), "12.3 mV");

        let m = Measurement::with_type(dec!(1.23456789), MeasurementType::VoltageDC);
        assert_eq!(m.to_string(), "1.234568 V");
    }

    #[test]
    fn overflow_displays_as_ol()
    {
        let r = MeasurementRange::with_exponents("60 kΩ", 3, 3, MeasurementType::Resistance).unwrap();
        let m = Measurement::with_range(Decimal::MAX, r);
        assert!(m.is_overflow());
        assert_eq!(m.to_string(), "+OL kΩ");
    }

    #[test]
    fn unrepresentable_coefficient_displays_as_ol()
    {
        let r = MeasurementRange::with_exponents("1 nF", -9, -9, MeasurementType::Capacitance).unwrap();
        let big = Decimal::from_i128_with_scale(10i128.pow(20), 0);

        let m = Measurement::with_range(big, r.clone());
        assert!(!m.is_overflow());
        assert_eq!(m.engineering_coefficient(), Decimal::MAX);
        assert_eq!(m.to_string(), "+OL nF");

        let m = Measurement::with_range(-big, r);
        assert_eq!(m.to_string(), "-OL nF");
    }

    #[test]
    fn stale_after_one_and_a_half_intervals()
    {
        let m = Measurement::new(dec!(1));
        let interval = Duration::from_millis(1000);

        assert!(m.is_fresh(m.time(), interval));
        assert!(m.is_fresh(m.time() + TimeDelta::milliseconds(1500), interval));
        assert!(!m.is_fresh(m.time() + TimeDelta::milliseconds(1501), interval));
    }
}
