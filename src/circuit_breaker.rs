use failsafe::{backoff, failure_policy, Config, StateMachine};
use std::time::Duration;

/// Circuit breaker guarding calls to the gated content API.
pub type UpstreamBreaker =
    StateMachine<failure_policy::ConsecutiveFailures<backoff::Exponential>, ()>;

/// Creates the circuit breaker for upstream calls.
///
/// # Configuration
///
/// - **Failure threshold**: 5 consecutive outage-class failures trigger OPEN.
/// - **Backoff**: Exponential from 10s to 60s before a trial call is let through.
///
/// # States
///
/// - **CLOSED**: Requests pass through.
/// - **OPEN**: Requests fail fast with `UpstreamUnavailable`.
/// - **HALF_OPEN**: One trial request decides whether to close again.
pub fn create_upstream_circuit_breaker() -> UpstreamBreaker {
    let backoff_strategy = backoff::exponential(
        Duration::from_secs(10), // Initial delay
        Duration::from_secs(60), // Maximum delay
    );

    let failure_policy = failure_policy::consecutive_failures(5, backoff_strategy);

    Config::new().failure_policy(failure_policy).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use failsafe::{CircuitBreaker, Error};

    #[test]
    fn test_circuit_opens_after_five_failures() {
        let cb = create_upstream_circuit_breaker();

        for _ in 0..5 {
            let result: Result<(), Error<&str>> = cb.call(|| Err::<(), &str>("edge function 503"));
            assert!(result.is_err());
        }

        let result: Result<(), Error<&str>> = cb.call(|| Ok::<(), &str>(()));
        assert!(matches!(result, Err(Error::Rejected)));
    }

    #[test]
    fn test_success_passes_through() {
        let cb = create_upstream_circuit_breaker();
        let result: Result<u64, Error<&str>> = cb.call(|| Ok::<u64, &str>(42));
        assert_eq!(result.unwrap(), 42);
    }
}
