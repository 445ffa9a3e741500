use std::sync::Arc;

/// Target-domain sample. Concretized to a flat vector for the built-in
/// demo targets (`pt-driver`'s `RandomWalkExplorer` and `pt-admin`'s
/// demo scenarios); nothing in this crate depends on its shape beyond
/// being passed by reference to a `LogPotential`.
pub type State = Vec<f64>;

/// An unnormalized log-density evaluated at a state. Wrapped in `Arc` so
/// a tempering's `log_potentials` vector can be built once and shared
/// across replicas and threads without recomputation.
pub type LogPotential = Arc<dyn Fn(&State) -> f64 + Send + Sync>;

/// An interpolating family between a reference and a target log-density,
/// indexed by `beta in [0, 1]` (`0` = reference, `1` = target).
pub trait Path: Send + Sync {
    fn interpolate(&self, beta: f64) -> LogPotential;
}

/// `log_potentials[i](x) = (1-beta)*log_reference(x) + beta*log_target(x)`,
/// the default interpolation family.
pub struct LinearPath {
    log_reference: LogPotential,
    log_target: LogPotential,
}

impl LinearPath {
    pub fn new(log_reference: LogPotential, log_target: LogPotential) -> Self {
        LinearPath {
            log_reference,
            log_target,
        }
    }
}

impl Path for LinearPath {
    fn interpolate(&self, beta: f64) -> LogPotential {
        let log_reference = self.log_reference.clone();
        let log_target = self.log_target.clone();
        Arc::new(move |x: &State| (1.0 - beta) * log_reference(x) + beta * log_target(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_linear_path_endpoints_recover_reference_and_target() {
        let reference: LogPotential = Arc::new(|x: &State| -x[0] * x[0]);
        let target: LogPotential = Arc::new(|x: &State| -(x[0] - 3.0) * (x[0] - 3.0));
        let path = LinearPath::new(reference.clone(), target.clone());
        let x = vec![1.5];
        assert_eq!(path.interpolate(0.0)(&x), reference(&x));
        assert_eq!(path.interpolate(1.0)(&x), target(&x));
    }
}
