/// `beta_i = (i-1)/(n-1)` for `i in 1..=n`: chain 1 at the reference,
/// chain `n` at the target.
pub fn equally_spaced_schedule(n_chains: u32) -> Vec<f64> {
    assert!(n_chains >= 2, "a schedule needs at least two chains");
    let n = n_chains as f64;
    (0..n_chains).map(|i| i as f64 / (n - 1.0)).collect()
}

/// Redistributes `schedule` so each adjacent pair's local communication
/// barrier contribution is equalized: a reject-rate-proportional local
/// barrier is accumulated into a cumulative curve, and the new schedule is
/// read off that curve at `schedule.len()` equally spaced barrier levels.
/// The classical "equal local barrier" PT schedule-optimization rule.
pub fn adapt_schedule(schedule: &[f64], acceptance_rates: &[f64]) -> Vec<f64> {
    let n = schedule.len();
    assert_eq!(acceptance_rates.len(), n - 1, "one acceptance rate per adjacent pair");

    let local_barrier = |a: f64| (1.0 - a).clamp(1e-9, 1.0);
    let mut cumulative = vec![0.0; n];
    for i in 1..n {
        cumulative[i] = cumulative[i - 1] + local_barrier(acceptance_rates[i - 1]);
    }
    let total = cumulative[n - 1];
    if total <= 0.0 {
        return schedule.to_vec();
    }

    let mut new_schedule: Vec<f64> = (0..n)
        .map(|k| {
            let target_barrier = total * (k as f64) / ((n - 1) as f64);
            invert_cumulative(schedule, &cumulative, target_barrier)
        })
        .collect();
    new_schedule[0] = schedule[0];
    new_schedule[n - 1] = schedule[n - 1];
    new_schedule
}

fn invert_cumulative(schedule: &[f64], cumulative: &[f64], target: f64) -> f64 {
    let n = schedule.len();
    let idx = cumulative.partition_point(|&c| c < target).min(n - 1);
    if idx == 0 {
        return schedule[0];
    }
    let (c0, c1) = (cumulative[idx - 1], cumulative[idx]);
    let (b0, b1) = (schedule[idx - 1], schedule[idx]);
    if (c1 - c0).abs() < 1e-12 {
        return b1;
    }
    let frac = (target - c0) / (c1 - c0);
    b0 + frac * (b1 - b0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_equally_spaced_schedule_spans_zero_to_one() {
        let schedule = equally_spaced_schedule(5);
        assert_eq!(schedule, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn test_adapt_schedule_keeps_endpoints_fixed() {
        let schedule = equally_spaced_schedule(5);
        let acceptance_rates = vec![0.9, 0.1, 0.5, 0.8];
        let adapted = adapt_schedule(&schedule, &acceptance_rates);
        assert_eq!(adapted.len(), 5);
        assert_eq!(adapted[0], 0.0);
        assert_eq!(adapted[4], 1.0);
        for pair in adapted.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
    }

    #[test]
    fn test_adapt_schedule_is_identity_when_uniformly_accepted() {
        let schedule = equally_spaced_schedule(4);
        let acceptance_rates = vec![1.0, 1.0, 1.0];
        let adapted = adapt_schedule(&schedule, &acceptance_rates);
        for (a, b) in adapted.iter().zip(schedule.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }
}
