use std::fmt;

/// Signed amount represented as **integer milliunits** (1.000 = 1000), the
/// unit the YNAB API speaks.
///
/// Receipt figures arrive as floating point numbers; convert them once with
/// [`Milliunits::from_amount`] and do every sum on integers afterwards. The
/// figures come from a model, so arithmetic is checked and never wraps.
///
/// The value is signed:
/// - positive = inflow
/// - negative = outflow
///
/// # Examples
///
/// ```rust
/// use ynab::Milliunits;
///
/// let amount = Milliunits::from_amount(42.5).unwrap();
/// assert_eq!(amount.milliunits(), 42_500);
/// assert_eq!(amount.checked_neg().unwrap().to_string(), "-42.500");
/// assert_eq!(Milliunits::from_amount(f64::NAN), None);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Milliunits(i64);

impl Milliunits {
    pub const ZERO: Milliunits = Milliunits(0);

    /// Creates a new amount from integer milliunits.
    #[must_use]
    pub const fn new(milliunits: i64) -> Self {
        Self(milliunits)
    }

    /// Converts a decimal amount, rounding half away from zero.
    ///
    /// Returns `None` for non-finite amounts and amounts that do not fit in
    /// `i64` milliunits.
    #[must_use]
    pub fn from_amount(amount: f64) -> Option<Self> {
        let scaled = (amount * 1000.0).round();
        if !scaled.is_finite() || scaled.abs() >= i64::MAX as f64 {
            return None;
        }
        Some(Self(scaled as i64))
    }

    /// Returns the raw value in milliunits.
    #[must_use]
    pub const fn milliunits(self) -> i64 {
        self.0
    }

    /// Returns `true` if the amount is 0.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub fn checked_add(self, rhs: Milliunits) -> Option<Milliunits> {
        self.0.checked_add(rhs.0).map(Milliunits)
    }

    #[must_use]
    pub fn checked_sub(self, rhs: Milliunits) -> Option<Milliunits> {
        self.0.checked_sub(rhs.0).map(Milliunits)
    }

    #[must_use]
    pub fn checked_neg(self) -> Option<Milliunits> {
        self.0.checked_neg().map(Milliunits)
    }

    #[must_use]
    pub fn checked_abs(self) -> Option<Milliunits> {
        self.0.checked_abs().map(Milliunits)
    }

    /// `self * numerator / denominator`, truncated toward zero.
    ///
    /// Returns zero when `denominator` is zero, `None` when the result does
    /// not fit.
    #[must_use]
    pub fn share(self, numerator: Milliunits, denominator: Milliunits) -> Option<Milliunits> {
        if denominator.is_zero() {
            return Some(Milliunits::ZERO);
        }
        let value = i128::from(self.0) * i128::from(numerator.0) / i128::from(denominator.0);
        i64::try_from(value).ok().map(Milliunits)
    }
}

impl fmt::Display for Milliunits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:03}", abs / 1000, abs % 1000)
    }
}

impl From<i64> for Milliunits {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Milliunits> for i64 {
    fn from(value: Milliunits) -> Self {
        value.0
    }
}
