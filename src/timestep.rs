//! Time-step correspondence: the integer ratio of the forcing step `T` to
//! the routing sub-step `dt`.

use crate::error::RouteError;

/// Computes `S = T / dt`, the number of Muskingum routing sub-steps per
/// forcing interval.
///
/// Fails with [`RouteError::ConfigError`] if `T` or `dt` is non-positive,
/// or if `dt` does not evenly divide `T`.
pub fn sub_steps_per_interval(forcing_step_seconds: i64, routing_step_seconds: i32) -> Result<u32, RouteError> {
    if routing_step_seconds <= 0 {
        return Err(RouteError::ConfigError {
            message: format!("IS_dtR must be a positive number of seconds, got {}", routing_step_seconds),
        });
    }
    if forcing_step_seconds <= 0 {
        return Err(RouteError::ConfigError {
            message: format!("forcing time step must be positive, got {}", forcing_step_seconds),
        });
    }

    let dt = i64::from(routing_step_seconds);
    if forcing_step_seconds % dt != 0 {
        return Err(RouteError::ConfigError {
            message: format!(
                "routing sub-step ({} s) does not evenly divide the forcing step ({} s)",
                dt, forcing_step_seconds
            ),
        });
    }

    Ok((forcing_step_seconds / dt) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_s1_twelve_sub_steps() {
        assert_eq!(sub_steps_per_interval(10800, 900).unwrap(), 12);
    }

    #[test]
    fn scenario_s4_non_divisible_is_config_error() {
        let err = sub_steps_per_interval(10800, 800).unwrap_err();
        assert!(matches!(err, RouteError::ConfigError { .. }));
    }

    #[test]
    fn dt_equal_to_forcing_step_gives_s_one() {
        assert_eq!(sub_steps_per_interval(3600, 3600).unwrap(), 1);
    }

    #[test]
    fn dt_greater_than_forcing_step_is_config_error() {
        let err = sub_steps_per_interval(900, 1800).unwrap_err();
        assert!(matches!(err, RouteError::ConfigError { .. }));
    }

    #[test]
    fn non_positive_dt_is_config_error() {
        assert!(sub_steps_per_interval(3600, 0).is_err());
        assert!(sub_steps_per_interval(3600, -1).is_err());
    }
}
