//! Coercion of loosely typed caller input into numbers.
//!
//! Setters such as [`Sim928::write_volt`](crate::Sim928::write_volt) accept
//! numbers or text. Input that isn't a number makes the setter do nothing.

/// A value which may be interpreted as a number.
pub trait NumericInput {
    /// The value as a float, `None` when it is not a number.
    fn as_float(&self) -> Option<f64>;

    /// The value as an integer, `None` when it is not a whole number
    /// representation. Floats are truncated towards zero.
    fn as_integer(&self) -> Option<i64>;
}

impl NumericInput for f64 {
    fn as_float(&self) -> Option<f64> {
        (!self.is_nan()).then_some(*self)
    }

    fn as_integer(&self) -> Option<i64> {
        // `as` saturates, which would map huge values onto valid ones.
        (self.is_finite() && self.abs() < i64::MAX as f64).then(|| self.trunc() as i64)
    }
}

impl NumericInput for f32 {
    fn as_float(&self) -> Option<f64> {
        f64::from(*self).as_float()
    }

    fn as_integer(&self) -> Option<i64> {
        f64::from(*self).as_integer()
    }
}

macro_rules! impl_numeric_input_int {
    ($($t:ty),*) => {
        $(
            impl NumericInput for $t {
                fn as_float(&self) -> Option<f64> {
                    Some(*self as f64)
                }

                fn as_integer(&self) -> Option<i64> {
                    i64::try_from(*self).ok()
                }
            }
        )*
    };
}

impl_numeric_input_int!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize);

impl NumericInput for str {
    fn as_float(&self) -> Option<f64> {
        self.trim().parse::<f64>().ok()?.as_float()
    }

    fn as_integer(&self) -> Option<i64> {
        self.trim().parse::<i64>().ok()
    }
}

impl NumericInput for String {
    fn as_float(&self) -> Option<f64> {
        self.as_str().as_float()
    }

    fn as_integer(&self) -> Option<i64> {
        self.as_str().as_integer()
    }
}

impl<T: NumericInput + ?Sized> NumericInput for &T {
    fn as_float(&self) -> Option<f64> {
        (**self).as_float()
    }

    fn as_integer(&self) -> Option<i64> {
        (**self).as_integer()
    }
}
