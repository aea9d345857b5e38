//! Parsing of SCPI multimeter replies
//!
//! Nothing in here fails. A reply that does not look like anything known becomes the most conservative value
//! available: the unknown range, or no reading at all.

use std::str::FromStr;
use rust_decimal::Decimal;
use super::{ MeasurementRange, MeasurementType };

use MeasurementType::{ VoltageDC, VoltageAC, Resistance, Capacitance, CurrentDC, CurrentAC, Frequency, Diode, Temperature };

/// Reply to `READ?` when the input is above the selected range
const OVERFLOW_POSITIVE: &str = "+9.90000000E+37";
/// Reply to `READ?` when the input is below the selected range
const OVERFLOW_NEGATIVE: &str = "-9.90000000E+37";

/// Every configuration token the meters report in reply to `CONF?` and the range it selects
///
/// Some windows span two exponents on purpose, e.g. "6 kΩ" shows readings below one kiloohm in ohms.
static CONF_RANGES: &[(&str, MeasurementRange)] = &[
    ("V,0,DC", MeasurementRange::preset("600 mV", -3, -3, VoltageDC, None)),
    ("V,1,DC", MeasurementRange::preset("6 V", 0, 0, VoltageDC, None)),
    ("V,2,DC", MeasurementRange::preset("60 V", 0, 0, VoltageDC, None)),
    ("V,3,DC", MeasurementRange::preset("600 V", 0, 0, VoltageDC, None)),
    ("V,0,AC", MeasurementRange::preset("600 mV", -3, -3, VoltageAC, Some("~"))),
    ("V,1,AC", MeasurementRange::preset("6 V", 0, 0, VoltageAC, Some("~"))),
    ("V,2,AC", MeasurementRange::preset("60 V", 0, 0, VoltageAC, Some("~"))),
    ("V,3,AC", MeasurementRange::preset("600 V", 0, 0, VoltageAC, Some("~"))),
    ("RES,0", MeasurementRange::preset("600 Ω", 0, 0, Resistance, None)),
    ("RES,1", MeasurementRange::preset("6 kΩ", 0, 3, Resistance, None)),
    ("RES,2", MeasurementRange::preset("60 kΩ", 3, 3, Resistance, None)),
    ("RES,3", MeasurementRange::preset("600 kΩ", 3, 3, Resistance, None)),
    ("RES,4", MeasurementRange::preset("6 MΩ", 3, 6, Resistance, None)),
    ("RES,5", MeasurementRange::preset("60 MΩ", 6, 6, Resistance, None)),
    ("CAP,0", MeasurementRange::preset("1 nF", -9, -9, Capacitance, None)),
    ("CAP,1", MeasurementRange::preset("10 nF", -9, -9, Capacitance, None)),
    ("CAP,2", MeasurementRange::preset("100 nF", -9, -9, Capacitance, None)),
    ("CAP,3", MeasurementRange::preset("1 µF", -9, -6, Capacitance, None)),
    ("CAP,4", MeasurementRange::preset("10 µF", -6, -6, Capacitance, None)),
    ("CAP,5", MeasurementRange::preset("100 µF", -6, -6, Capacitance, None)),
    ("CAP,6", MeasurementRange::preset("1000 µF", -6, -3, Capacitance, None)),
    ("CAP,7", MeasurementRange::preset("10 mF", -3, -3, Capacitance, None)),
    ("UA,0,DC", MeasurementRange::preset("60 µA", -6, -6, CurrentDC, None)),
    ("UA,1,DC", MeasurementRange::preset("600 µA", -6, -6, CurrentDC, None)),
    ("UA,0,AC", MeasurementRange::preset("60 µA", -6, -6, CurrentAC, Some("~"))),
    ("UA,1,AC", MeasurementRange::preset("600 µA", -6, -6, CurrentAC, Some("~"))),
    ("MA,0,DC", MeasurementRange::preset("60 mA", -3, -3, CurrentDC, None)),
    ("MA,1,DC", MeasurementRange::preset("600 mA", -3, -3, CurrentDC, None)),
    ("MA,0,AC", MeasurementRange::preset("60 mA", -3, -3, CurrentAC, Some("~"))),
    ("MA,1,AC", MeasurementRange::preset("600 mA", -3, -3, CurrentAC, Some("~"))),
    ("A,0,DC", MeasurementRange::preset("6 A", -3, 0, CurrentDC, None)),
    ("A,1,DC", MeasurementRange::preset("10 A", 0, 0, CurrentDC, None)),
    ("A,0,AC", MeasurementRange::preset("6 A", -3, 0, CurrentAC, Some("~"))),
    ("A,1,AC", MeasurementRange::preset("10 A", 0, 0, CurrentAC, Some("~"))),
    ("FREQ,0,AC", MeasurementRange::preset("99.99 Hz", 0, 0, Frequency, None)),
    ("FREQ,1,AC", MeasurementRange::preset("999.9 Hz", 0, 0, Frequency, None)),
    ("FREQ,2,AC", MeasurementRange::preset("9.999 kHz", 0, 3, Frequency, None)),
    ("FREQ,3,AC", MeasurementRange::preset("99.99 kHz", 3, 3, Frequency, None)),
    ("DIOD", MeasurementRange::preset("Diode", 0, 0, Diode, None)),
    ("TEMP", MeasurementRange::preset("Temperature", 0, 0, Temperature, None)),
];

/// Looks up the range selected by a configuration token, e.g. `RES,2`. Case-insensitive.
pub fn range_for_token(token: &str) -> Option<&'static MeasurementRange>
{
    let token = token.to_ascii_uppercase();

    CONF_RANGES
        .iter()
        .find(|(key, _)| *key == token)
        .map(|(_, range)| range)
}

/// Interprets a `CONF?` reply such as `"RES,2"` (quotes included)
///
/// A reply that is missing, unquoted, or names an unknown configuration yields the unknown range.
pub fn parse_configuration(response: Option<&str>) -> MeasurementRange
{
    let inner = response
        .map(str::trim)
        .and_then(|reply| reply.strip_prefix('"'))
        .and_then(|reply| reply.strip_suffix('"'));

    match inner.and_then(range_for_token) {
        Some(range) => range.clone(),
        None => MeasurementRange::unknown(),
    }
}

/// Reading carried by a `READ?` reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reading
{
    Value(Decimal),
    /// Input above the selected range
    OverflowPositive,
    /// Input below the selected range
    OverflowNegative,
}

impl Reading
{
    /// The value a measurement should carry. Overflow becomes the largest or smallest representable decimal.
    pub fn value(self) -> Decimal
    {
        match self {
            Self::Value(value) => value,
            Self::OverflowPositive => Decimal::MAX,
            Self::OverflowNegative => Decimal::MIN,
        }
    }
}

/// Interprets a `READ?` reply such as `+1.234560E+04`
///
/// Returns `None` when there is no reply or it is not a number.
pub fn parse_reading(response: Option<&str>) -> Option<Reading>
{
    let reply = response?.trim();

    if reply.eq_ignore_ascii_case(OVERFLOW_POSITIVE) {
        Some(Reading::OverflowPositive)
    }
    else if reply.eq_ignore_ascii_case(OVERFLOW_NEGATIVE) {
        Some(Reading::OverflowNegative)
    }
    else {
        parse_decimal(reply).map(Reading::Value)
    }
}

/// Culture-invariant decimal parsing with optional exponent
fn parse_decimal(text: &str) -> Option<Decimal>
{
    if text.contains(['e', 'E']) {
        Decimal::from_scientific(text).ok()
    }
    else {
        Decimal::from_str(text.strip_prefix('+').unwrap_or(text)).ok()
    }
}
