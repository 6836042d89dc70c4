//! Capital annualization used by the screening engine.

/// Capital recovery factor: the constant annual payment per unit of capital
/// over `years` at `rate`. Falls back to straight-line when `rate` is zero.
pub fn capital_recovery_factor(rate: f64, years: u32) -> f64 {
    if years == 0 {
        return 0.0;
    }
    let n = f64::from(years);
    if rate.abs() < 1e-12 {
        return 1.0 / n;
    }
    let growth = (1.0 + rate).powf(n);
    rate * growth / (growth - 1.0)
}

/// Annual charge per unit of capital for the selected method.
pub fn annualization_factor(use_financial_engine: bool, rate: f64, years: u32) -> f64 {
    if use_financial_engine {
        capital_recovery_factor(rate, years)
    } else if years == 0 {
        0.0
    } else {
        1.0 / f64::from(years)
    }
}
