use num::Float;

/// log(sum(exp(x))) computed around the maximum, so large negative
/// log-posteriors neither underflow nor overflow.
///
/// Returns negative infinity for an empty slice.
pub fn log_sum_exp<F: Float>(values: &[F]) -> F {
    let max = values.iter().copied().fold(F::neg_infinity(), F::max);
    if !max.is_finite() {
        return max;
    }
    let sum = values.iter().fold(F::zero(), |acc, &v| acc + (v - max).exp());
    max + sum.ln()
}

/// Turn unnormalized log values into a probability distribution.
/// Subtracts the max before exponentiating.
pub fn softmax_from_log<F: Float>(values: &[F]) -> Vec<F> {
    let lse = log_sum_exp(values);
    values.iter().map(|&v| (v - lse).exp()).collect()
}

/// Index of the largest value, first one wins on exact ties.
pub fn argmax<F: Float>(values: &[F]) -> Option<usize> {
    let mut best: Option<(usize, F)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn softmax_sums_to_one_for_extreme_logs() {
        let logs = [-10_000.0f64, -10_001.0, -10_050.0];
        let p = softmax_from_log(&logs);
        let sum: f64 = p.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert!(p[0] > p[1] && p[1] > p[2]);
    }

    #[test]
    fn log_sum_exp_matches_naive_on_small_values() {
        let v = [0.1f64, 0.2, 0.3];
        let naive = v.iter().map(|x| x.exp()).sum::<f64>().ln();
        assert!((log_sum_exp(&v) - naive).abs() < 1e-12);
        assert_eq!(log_sum_exp::<f64>(&[]), f64::NEG_INFINITY);
    }

    #[test]
    fn argmax_prefers_first_on_tie() {
        assert_eq!(argmax(&[0.5f64, 0.5, 0.1]), Some(0));
        assert_eq!(argmax(&[0.1f32, 0.7, 0.7]), Some(1));
        assert_eq!(argmax::<f64>(&[]), None);
    }
}
