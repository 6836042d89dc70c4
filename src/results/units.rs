//! Unit strings such as `"USD/(MW*h)"`: parsing and dimensional conversion.
//!
//! A unit is a scale factor against the base units (USD, kg, W, h) plus an
//! exponent per base dimension. Two units convert into each other only when
//! their exponents match.

use std::fmt;
use std::str::FromStr;

/// Exponents of the base dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dimension {
    pub currency: i8,
    pub mass: i8,
    pub power: i8,
    pub time: i8,
}

impl Dimension {
    const NONE: Dimension = Dimension {
        currency: 0,
        mass: 0,
        power: 0,
        time: 0,
    };

    fn combine(self, other: Dimension, sign: i8) -> Result<Dimension, String> {
        let add = |a: i8, b: i8| {
            b.checked_mul(sign)
                .and_then(|b| a.checked_add(b))
                .ok_or_else(|| "unit exponent overflow".to_string())
        };
        Ok(Dimension {
            currency: add(self.currency, other.currency)?,
            mass: add(self.mass, other.mass)?,
            power: add(self.power, other.power)?,
            time: add(self.time, other.time)?,
        })
    }

    fn pow(self, n: i8) -> Result<Dimension, String> {
        let mul = |a: i8| a.checked_mul(n).ok_or_else(|| "unit exponent overflow".to_string());
        Ok(Dimension {
            currency: mul(self.currency)?,
            mass: mul(self.mass)?,
            power: mul(self.power)?,
            time: mul(self.time)?,
        })
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = [
            ("currency", self.currency),
            ("mass", self.mass),
            ("power", self.power),
            ("time", self.time),
        ]
        .iter()
        .filter(|(_, e)| *e != 0)
        .map(|(name, e)| {
            if *e == 1 {
                (*name).to_string()
            } else {
                format!("{name}^{e}")
            }
        })
        .collect();
        if parts.is_empty() {
            f.write_str("dimensionless")
        } else {
            f.write_str(&parts.join("*"))
        }
    }
}

/// A parsed unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Unit {
    /// Multiplier into base units.
    pub scale: f64,
    pub dimension: Dimension,
}

impl Unit {
    const ONE: Unit = Unit {
        scale: 1.0,
        dimension: Dimension::NONE,
    };

    const fn atom(scale: f64, currency: i8, mass: i8, power: i8, time: i8) -> Unit {
        Unit {
            scale,
            dimension: Dimension {
                currency,
                mass,
                power,
                time,
            },
        }
    }

    fn mul(self, other: Unit) -> Result<Unit, String> {
        Ok(Unit {
            scale: self.scale * other.scale,
            dimension: self.dimension.combine(other.dimension, 1)?,
        })
    }

    fn div(self, other: Unit) -> Result<Unit, String> {
        Ok(Unit {
            scale: self.scale / other.scale,
            dimension: self.dimension.combine(other.dimension, -1)?,
        })
    }

    fn powi(self, n: i8) -> Result<Unit, String> {
        Ok(Unit {
            scale: self.scale.powi(i32::from(n)),
            dimension: self.dimension.pow(n)?,
        })
    }

    /// Factor that turns a value in `self` into a value in `target`.
    ///
    /// # Errors
    ///
    /// A description of the mismatch when the dimensions differ.
    pub fn factor_to(&self, target: &Unit) -> Result<f64, String> {
        if self.dimension != target.dimension {
            return Err(format!(
                "dimension {} is incompatible with {}",
                self.dimension, target.dimension
            ));
        }
        Ok(self.scale / target.scale)
    }
}

impl FromStr for Unit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens = tokenize(s)?;
        if tokens.is_empty() {
            return Ok(Unit::ONE);
        }
        let mut parser = Parser { tokens, pos: 0 };
        let unit = parser.expr()?;
        if parser.pos != parser.tokens.len() {
            return Err(format!(
                "unexpected {} in \"{s}\"",
                parser.tokens[parser.pos]
            ));
        }
        Ok(unit)
    }
}

/// Converts `value` from one unit string to another.
///
/// # Errors
///
/// A description of the problem when either string does not parse or the
/// dimensions differ.
pub fn convert(value: f64, from: &str, to: &str) -> Result<f64, String> {
    let from_unit: Unit = from.parse()?;
    let to_unit: Unit = to.parse()?;
    Ok(value * from_unit.factor_to(&to_unit)?)
}

fn lookup_atom(name: &str) -> Option<Unit> {
    const HOURS_PER_YEAR: f64 = 8760.0;
    let unit = match name {
        "USD" | "usd" | "$" => Unit::atom(1.0, 1, 0, 0, 0),
        "g" => Unit::atom(1e-3, 0, 1, 0, 0),
        "kg" => Unit::atom(1.0, 0, 1, 0, 0),
        "t" | "tonne" => Unit::atom(1e3, 0, 1, 0, 0),
        "W" => Unit::atom(1.0, 0, 0, 1, 0),
        "kW" => Unit::atom(1e3, 0, 0, 1, 0),
        "MW" => Unit::atom(1e6, 0, 0, 1, 0),
        "GW" => Unit::atom(1e9, 0, 0, 1, 0),
        "Wh" => Unit::atom(1.0, 0, 0, 1, 1),
        "kWh" => Unit::atom(1e3, 0, 0, 1, 1),
        "MWh" => Unit::atom(1e6, 0, 0, 1, 1),
        "GWh" => Unit::atom(1e9, 0, 0, 1, 1),
        "s" => Unit::atom(1.0 / 3600.0, 0, 0, 0, 1),
        "min" => Unit::atom(1.0 / 60.0, 0, 0, 0, 1),
        "h" | "hr" => Unit::atom(1.0, 0, 0, 0, 1),
        "d" | "day" => Unit::atom(24.0, 0, 0, 0, 1),
        "yr" | "year" => Unit::atom(HOURS_PER_YEAR, 0, 0, 0, 1),
        "percent" | "%" => Unit::atom(0.01, 0, 0, 0, 0),
        _ => return None,
    };
    Some(unit)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Atom(String),
    Int(i8),
    Mul,
    Div,
    Pow,
    Open,
    Close,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Atom(a) => write!(f, "\"{a}\""),
            Token::Int(n) => write!(f, "{n}"),
            Token::Mul => f.write_str("'*'"),
            Token::Div => f.write_str("'/'"),
            Token::Pow => f.write_str("'^'"),
            Token::Open => f.write_str("'('"),
            Token::Close => f.write_str("')'"),
        }
    }
}

fn tokenize(s: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = s.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' => {
                chars.next();
            }
            '*' => {
                chars.next();
                if chars.peek() == Some(&'*') {
                    chars.next();
                    tokens.push(Token::Pow);
                } else {
                    tokens.push(Token::Mul);
                }
            }
            '^' => {
                chars.next();
                tokens.push(Token::Pow);
            }
            '/' => {
                chars.next();
                tokens.push(Token::Div);
            }
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            '-' | '0'..='9' => {
                let mut digits = String::new();
                digits.push(c);
                chars.next();
                while let Some(&d) = chars.peek().filter(|d| d.is_ascii_digit()) {
                    digits.push(d);
                    chars.next();
                }
                let n = digits
                    .parse::<i8>()
                    .map_err(|_| format!("invalid integer \"{digits}\""))?;
                tokens.push(Token::Int(n));
            }
            c if c.is_alphabetic() || c == '$' || c == '%' => {
                let mut name = String::new();
                while let Some(&d) = chars
                    .peek()
                    .filter(|d| d.is_alphanumeric() || **d == '$' || **d == '%' || **d == '_')
                {
                    name.push(d);
                    chars.next();
                }
                tokens.push(Token::Atom(name));
            }
            other => return Err(format!("unexpected character '{other}'")),
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    // expr := power (('*' | '/') power)*
    fn expr(&mut self) -> Result<Unit, String> {
        let mut unit = self.power()?;
        loop {
            match self.peek() {
                Some(Token::Mul) => {
                    self.pos += 1;
                    unit = unit.mul(self.power()?)?;
                }
                Some(Token::Div) => {
                    self.pos += 1;
                    unit = unit.div(self.power()?)?;
                }
                _ => return Ok(unit),
            }
        }
    }

    // power := factor ('^' int)?
    fn power(&mut self) -> Result<Unit, String> {
        let base = self.factor()?;
        if self.peek() == Some(&Token::Pow) {
            self.pos += 1;
            return match self.advance() {
                Some(Token::Int(n)) => base.powi(n),
                Some(other) => Err(format!("expected integer exponent, found {other}")),
                None => Err("expected integer exponent".to_string()),
            };
        }
        Ok(base)
    }

    // factor := atom | '1' | '(' expr ')'
    fn factor(&mut self) -> Result<Unit, String> {
        match self.advance() {
            Some(Token::Atom(name)) => {
                lookup_atom(&name).ok_or_else(|| format!("unknown unit \"{name}\""))
            }
            Some(Token::Int(1)) => Ok(Unit::ONE),
            Some(Token::Open) => {
                let inner = self.expr()?;
                match self.advance() {
                    Some(Token::Close) => Ok(inner),
                    _ => Err("unbalanced parenthesis".to_string()),
                }
            }
            Some(other) => Err(format!("unexpected {other}")),
            None => Err("unexpected end of unit".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
    }

    #[test]
    fn usd_per_mwh_to_usd_per_kwh() {
        let v = convert(70.7, "USD/(MW*h)", "USD/kWh").expect("compatible");
        assert!(close(v, 0.0707), "{v}");
    }

    #[test]
    fn energy_spellings_agree() {
        let a: Unit = "MWh".parse().expect("parse");
        let b: Unit = "MW*h".parse().expect("parse");
        assert_eq!(a, b);
        assert!("kW*h*1000".parse::<Unit>().is_err(), "only 1 is a bare number unit");
    }

    #[test]
    fn exponent_syntaxes() {
        let caret: Unit = "kg/h^2".parse().expect("parse");
        let stars: Unit = "kg/h**2".parse().expect("parse");
        assert_eq!(caret, stars);
        assert_eq!(caret.dimension.time, -2);
    }

    #[test]
    fn incompatible_dimensions_fail() {
        let err = convert(1.0, "USD/kg", "USD/(MW*h)").unwrap_err();
        assert!(err.contains("incompatible"), "{err}");
    }

    #[test]
    fn unknown_atoms_fail() {
        assert!("USD/furlong".parse::<Unit>().is_err());
        assert!("USD/(MW*h".parse::<Unit>().is_err());
        assert!("USD//kg".parse::<Unit>().is_err());
    }

    #[test]
    fn exponent_overflow_is_an_error() {
        let err = "(USD^16)^16".parse::<Unit>().unwrap_err();
        assert!(err.contains("overflow"), "{err}");
        let err = "USD^100*USD^100".parse::<Unit>().unwrap_err();
        assert!(err.contains("overflow"), "{err}");
        assert!("kg/h^-128/h".parse::<Unit>().is_err());
        assert!("USD^1000".parse::<Unit>().is_err(), "exponent literal out of range");
    }

    #[test]
    fn tonnes_per_year_to_kg_per_day() {
        let v = convert(365.0, "t/yr", "kg/d").expect("compatible");
        assert!(close(v, 1000.0), "{v}");
    }

    #[test]
    fn dimensionless_forms() {
        let v = convert(0.45, "1", "percent").expect("compatible");
        assert!(close(v, 45.0), "{v}");
        assert!(close(convert(2.0, "", "1").expect("compatible"), 2.0));
    }
}
