//! Complex numbers and Python-style float formatting

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

impl Complex {
    pub fn new(re: f64, im: f64) -> Self {
        Complex { re, im }
    }

    pub fn add(self, other: Complex) -> Complex {
        Complex::new(self.re + other.re, self.im + other.im)
    }

    pub fn sub(self, other: Complex) -> Complex {
        Complex::new(self.re - other.re, self.im - other.im)
    }

    pub fn mul(self, other: Complex) -> Complex {
        Complex::new(
            self.re * other.re - self.im * other.im,
            self.re * other.im + self.im * other.re,
        )
    }

    /// `None` when dividing by zero.
    pub fn div(self, other: Complex) -> Option<Complex> {
        let denom = other.re * other.re + other.im * other.im;
        if denom == 0.0 {
            return None;
        }
        Some(Complex::new(
            (self.re * other.re + self.im * other.im) / denom,
            (self.im * other.re - self.re * other.im) / denom,
        ))
    }

    pub fn abs(self) -> f64 {
        self.re.hypot(self.im)
    }

    /// `self ** exp`; `None` for zero raised to a negative or complex power.
    ///
    /// Small integral exponents multiply out so `(1+1j) ** 2` is exactly `2j`.
    pub fn pow(self, exp: Complex) -> Option<Complex> {
        if exp.re == 0.0 && exp.im == 0.0 {
            return Some(Complex::new(1.0, 0.0));
        }
        if self.re == 0.0 && self.im == 0.0 {
            if exp.im != 0.0 || exp.re < 0.0 {
                return None;
            }
            return Some(Complex::new(0.0, 0.0));
        }
        if exp.im == 0.0 && exp.re.fract() == 0.0 && exp.re.abs() <= 100.0 {
            let n = exp.re as i32;
            let power = self.powu(n.unsigned_abs());
            return if n < 0 {
                Complex::new(1.0, 0.0).div(power)
            } else {
                Some(power)
            };
        }
        let modulus = self.abs();
        let arg = self.im.atan2(self.re);
        let mut len = modulus.powf(exp.re);
        let mut phase = arg * exp.re;
        if exp.im != 0.0 {
            len /= (arg * exp.im).exp();
            phase += exp.im * modulus.ln();
        }
        Some(Complex::new(len * phase.cos(), len * phase.sin()))
    }

    fn powu(self, mut n: u32) -> Complex {
        let mut result = Complex::new(1.0, 0.0);
        let mut base = self;
        while n > 0 {
            if n & 1 == 1 {
                result = result.mul(base);
            }
            base = base.mul(base);
            n >>= 1;
        }
        result
    }
}

/// Matches Python's `repr(complex)`: `1j`, `(1+2j)`, `(1.5-0.5j)`.
impl fmt::Display for Complex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.re == 0.0 && self.re.is_sign_positive() {
            return write!(f, "{}j", component(self.im));
        }
        let sign = if self.im.is_sign_negative() { '-' } else { '+' };
        write!(
            f,
            "({}{}{}j)",
            component(self.re),
            sign,
            component(self.im.abs())
        )
    }
}

/// Complex components drop the `.0` that float repr would add.
fn component(value: f64) -> String {
    let text = format_float(value);
    match text.strip_suffix(".0") {
        Some(integral) => integral.to_string(),
        None => text,
    }
}

/// Python `repr(float)`: shortest round-trip digits, exponent form outside
/// `1e-4 <= |x| < 1e16`.
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }

    let sci = format!("{value:e}");
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if (-4..16).contains(&exponent) {
        let plain = format!("{value}");
        if plain.contains('.') {
            plain
        } else {
            format!("{plain}.0")
        }
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exponent.abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floats_match_python_repr() {
        assert_eq!(format_float(1.0), "1.0");
        assert_eq!(format_float(0.1), "0.1");
        assert_eq!(format_float(-2.5), "-2.5");
        assert_eq!(format_float(1e16), "1e+16");
        assert_eq!(format_float(1.5e-5), "1.5e-05");
        assert_eq!(format_float(0.0001), "0.0001");
        assert_eq!(format_float(123456789.0), "123456789.0");
    }

    #[test]
    fn complex_repr() {
        assert_eq!(Complex::new(0.0, 1.0).to_string(), "1j");
        assert_eq!(Complex::new(0.0, 1.5).to_string(), "1.5j");
        assert_eq!(Complex::new(1.0, 2.0).to_string(), "(1+2j)");
        assert_eq!(Complex::new(1.0, -2.0).to_string(), "(1-2j)");
    }

    #[test]
    fn complex_arithmetic() {
        let a = Complex::new(1.0, 2.0);
        let b = Complex::new(3.0, -1.0);
        assert_eq!(a.mul(b), Complex::new(5.0, 5.0));
        assert_eq!(a.add(b), Complex::new(4.0, 1.0));
        assert!(a.div(Complex::new(0.0, 0.0)).is_none());
    }

    #[test]
    fn integral_powers_are_exact() {
        let z = Complex::new(1.0, 1.0);
        assert_eq!(z.pow(Complex::new(2.0, 0.0)), Some(Complex::new(0.0, 2.0)));
        assert_eq!(z.pow(Complex::new(0.0, 0.0)), Some(Complex::new(1.0, 0.0)));
        assert_eq!(Complex::new(0.0, 0.0).pow(Complex::new(-1.0, 0.0)), None);
    }
}
