//! Indicator kernel (C3). Pure functions, no I/O, no external TA crate —
//! the composite score pins exact formulas and edge-case behavior (seed
//! handling, clamped discount rates, terminal-value growth) that an opaque
//! crate can't guarantee across versions. See DESIGN.md for the `ta` crate
//! drop rationale.

/// Exponential moving average over a full price series for the given span.
/// Seeds with the simple average of the first `span` observations (Wilder
/// convention), then applies `alpha = 2 / (span + 1)` to the remainder.
/// Returns `None` if there are fewer than `span` observations.
pub fn ema(prices: &[f64], span: u32) -> Option<f64> {
    let span = span as usize;
    if prices.len() < span || span == 0 {
        return None;
    }
    let alpha = 2.0 / (span as f64 + 1.0);
    let seed: f64 = prices[..span].iter().sum::<f64>() / span as f64;
    let mut value = seed;
    for &p in &prices[span..] {
        value = p * alpha + value * (1.0 - alpha);
    }
    Some(value)
}

/// EMA series aligned to `prices`, one value per span that has enough
/// history. Used when the caller needs the full warm-up trajectory rather
/// than just the latest value.
pub fn ema_series(prices: &[f64], span: u32) -> Vec<f64> {
    let span = span as usize;
    if prices.len() < span || span == 0 {
        return Vec::new();
    }
    let alpha = 2.0 / (span as f64 + 1.0);
    let seed: f64 = prices[..span].iter().sum::<f64>() / span as f64;
    let mut out = Vec::with_capacity(prices.len() - span + 1);
    out.push(seed);
    let mut value = seed;
    for &p in &prices[span..] {
        value = p * alpha + value * (1.0 - alpha);
        out.push(value);
    }
    out
}

/// Wilder's RSI(14) (or any period). Requires `period + 1` prices. The
/// first `period` gains/losses seed the average via a simple mean, then
/// Wilder smoothing (`avg_new = (avg_prev*(period-1) + sample) / period`)
/// carries the rest, matching the classic RSI definition.
pub fn rsi(prices: &[f64], period: u32) -> Option<f64> {
    let period = period as usize;
    if prices.len() < period + 1 || period == 0 {
        return None;
    }

    let deltas: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();
    let (seed_gains, seed_losses) = deltas[..period].iter().fold((0.0, 0.0), |(g, l), &d| {
        if d > 0.0 {
            (g + d, l)
        } else {
            (g, l - d)
        }
    });
    let mut avg_gain = seed_gains / period as f64;
    let mut avg_loss = seed_losses / period as f64;

    for &d in &deltas[period..] {
        let gain = d.max(0.0);
        let loss = (-d).max(0.0);
        avg_gain = (avg_gain * (period as f64 - 1.0) + gain) / period as f64;
        avg_loss = (avg_loss * (period as f64 - 1.0) + loss) / period as f64;
    }

    if avg_loss == 0.0 {
        return Some(100.0);
    }
    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Bollinger bands over `period` (default 20) with `num_std` standard
/// deviations (default 2), using the population standard deviation of the
/// trailing window.
pub fn bollinger(prices: &[f64], period: u32, num_std: f64) -> Option<BollingerBands> {
    let period = period as usize;
    if prices.len() < period || period == 0 {
        return None;
    }
    let window = &prices[prices.len() - period..];
    let mean = window.iter().sum::<f64>() / period as f64;
    let variance = window.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / period as f64;
    let std_dev = variance.sqrt();
    Some(BollingerBands {
        upper: mean + num_std * std_dev,
        middle: mean,
        lower: mean - num_std * std_dev,
    })
}

/// Two-stage discounted cash flow inputs, already normalized to per-share
/// terms (free cash flow per share).
#[derive(Debug, Clone, Copy)]
pub struct DcfInputs {
    pub fcf_per_share: f64,
    /// Near-term growth rate (stage 1, year 1), decaying linearly to the
    /// terminal growth rate over the projection horizon.
    pub initial_growth_rate: f64,
    /// Long-run terminal growth rate (stage 2, Gordon growth).
    pub terminal_growth_rate: f64,
    pub risk_free_rate: f64,
    pub beta: f64,
    pub projection_years: u32,
    /// User-supplied discount rate that bypasses CAPM entirely when set.
    pub manual_discount: Option<f64>,
}

/// Equity risk premium used by the CAPM discount rate. Fixed, not a
/// per-call input: the spec pins it rather than leaving it to the
/// caller.
const EQUITY_RISK_PREMIUM: f64 = 0.055;

/// Discount rate for the DCF: `manual_discount` when the caller supplied
/// one, otherwise CAPM cost of equity `rf + β·ERP`, clamped to
/// `[0.06, 0.15]`.
pub fn capm_discount_rate(inputs: &DcfInputs) -> f64 {
    if let Some(manual) = inputs.manual_discount {
        return manual;
    }
    let raw = inputs.risk_free_rate + inputs.beta * EQUITY_RISK_PREMIUM;
    raw.clamp(0.06, 0.15)
}

/// Two-stage DCF fair value per share: `projection_years` of explicit FCF
/// projected with a growth rate linearly decaying from
/// `initial_growth_rate` to `terminal_growth_rate`, discounted at the CAPM
/// rate, plus a Gordon-growth terminal value on the final year's FCF,
/// also discounted back to present.
pub fn dcf_fair_value(inputs: &DcfInputs) -> Option<f64> {
    if inputs.projection_years == 0 || inputs.fcf_per_share <= 0.0 {
        return None;
    }
    let discount_rate = capm_discount_rate(inputs);
    let years = inputs.projection_years as f64;

    let mut fcf = inputs.fcf_per_share;
    let mut pv_sum = 0.0;
    for year in 1..=inputs.projection_years {
        let t = year as f64;
        let growth = inputs.initial_growth_rate
            + (inputs.terminal_growth_rate - inputs.initial_growth_rate) * (t - 1.0) / years.max(1.0);
        fcf *= 1.0 + growth;
        pv_sum += fcf / (1.0 + discount_rate).powi(year as i32);
    }

    let terminal_value = fcf * (1.0 + inputs.terminal_growth_rate) / (discount_rate - inputs.terminal_growth_rate);
    let pv_terminal = terminal_value / (1.0 + discount_rate).powi(inputs.projection_years as i32);

    Some(pv_sum + pv_terminal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ema_needs_at_least_span_observations() {
        assert_eq!(ema(&[1.0, 2.0], 5), None);
        assert!(ema(&[1.0, 2.0, 3.0, 4.0, 5.0], 5).is_some());
    }

    #[test]
    fn rsi_is_100_when_no_losses() {
        let prices = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0, 13.0, 14.0, 15.0];
        assert_eq!(rsi(&prices, 14), Some(100.0));
    }

    #[test]
    fn rsi_bounded_between_0_and_100() {
        let prices = vec![10.0, 9.0, 11.0, 8.0, 12.0, 7.0, 13.0, 6.0, 14.0, 5.0, 15.0, 4.0, 16.0, 3.0, 17.0];
        let value = rsi(&prices, 14).unwrap();
        assert!((0.0..=100.0).contains(&value));
    }

    #[test]
    fn bollinger_middle_band_is_mean() {
        let prices = vec![10.0; 20];
        let bands = bollinger(&prices, 20, 2.0).unwrap();
        assert_eq!(bands.middle, 10.0);
        assert_eq!(bands.upper, 10.0);
        assert_eq!(bands.lower, 10.0);
    }

    #[test]
    fn capm_rate_is_clamped_to_0_06_0_15() {
        let high_beta = DcfInputs {
            fcf_per_share: 5.0,
            initial_growth_rate: 0.10,
            terminal_growth_rate: 0.03,
            risk_free_rate: 0.04,
            beta: 5.0,
            projection_years: 10,
            manual_discount: None,
        };
        assert_eq!(capm_discount_rate(&high_beta), 0.15);

        let low_beta = DcfInputs { beta: -1.0, ..high_beta };
        assert_eq!(capm_discount_rate(&low_beta), 0.06);
    }

    #[test]
    fn manual_discount_bypasses_capm() {
        let inputs = DcfInputs {
            fcf_per_share: 5.0,
            initial_growth_rate: 0.10,
            terminal_growth_rate: 0.03,
            risk_free_rate: 0.04,
            beta: 1.0,
            projection_years: 10,
            manual_discount: Some(0.09),
        };
        assert_eq!(capm_discount_rate(&inputs), 0.09);
    }

    #[test]
    fn dcf_fair_value_positive_for_growing_cash_flows() {
        let inputs = DcfInputs {
            fcf_per_share: 5.0,
            initial_growth_rate: 0.12,
            terminal_growth_rate: 0.03,
            risk_free_rate: 0.04,
            beta: 1.1,
            projection_years: 10,
            manual_discount: None,
        };
        let value = dcf_fair_value(&inputs).unwrap();
        assert!(value > 0.0);
    }

    #[test]
    fn dcf_fair_value_none_for_non_positive_fcf() {
        let inputs = DcfInputs {
            fcf_per_share: -1.0,
            initial_growth_rate: 0.1,
            terminal_growth_rate: 0.03,
            risk_free_rate: 0.04,
            beta: 1.0,
            projection_years: 10,
            manual_discount: None,
        };
        assert_eq!(dcf_fair_value(&inputs), None);
    }

    #[test]
    fn increasing_manual_discount_never_increases_fair_value() {
        let base = DcfInputs {
            fcf_per_share: 5.0,
            initial_growth_rate: 0.12,
            terminal_growth_rate: 0.03,
            risk_free_rate: 0.04,
            beta: 1.0,
            projection_years: 10,
            manual_discount: Some(0.08),
        };
        let higher_rate = DcfInputs { manual_discount: Some(0.12), ..base };
        let low = dcf_fair_value(&base).unwrap();
        let high = dcf_fair_value(&higher_rate).unwrap();
        assert!(high <= low);
    }
}
