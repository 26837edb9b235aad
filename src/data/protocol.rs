use serde::Serialize;

use crate::error::{ensure_positive, PkError};

// -0.0 and 0.0 must match the same dose time
#[inline(always)]
fn normalize_zero(t: f64) -> f64 {
    if t == 0.0 {
        0.0
    } else {
        t
    }
}

/// A half-open time window `[start, end)` of continuous drug input
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ContinuousWindow {
    start: f64,
    end: f64,
}

impl ContinuousWindow {
    /// Get the time at which the continuous input starts
    pub fn start(&self) -> f64 {
        self.start
    }
    /// Get the time at which the continuous input stops
    ///
    /// The window is half-open: the input is no longer active at `end`.
    pub fn end(&self) -> f64 {
        self.end
    }
    /// Whether `t` lies within `[start, end)`
    pub fn contains(&self, t: f64) -> bool {
        self.start <= t && t < self.end
    }
}

/// Exogenous drug input as a function of time
///
/// A protocol delivers a dose of size `X` at each of its instantaneous dose times, and
/// optionally a continuous input of `X` per unit time over a [ContinuousWindow]. Both
/// contributions are summed by [DosingProtocol::dose_at].
///
/// # Example
///
/// ```
/// use pkmodel::prelude::*;
///
/// let mut protocol = DosingProtocol::new(2.0)?;
/// protocol.add_instantaneous(0.0)?;
/// protocol.enable_continuous(0.0, 0.5)?;
/// assert_eq!(protocol.dose_at(0.0), 4.0);
/// assert_eq!(protocol.dose_at(0.25), 2.0);
/// assert_eq!(protocol.dose_at(0.5), 0.0);
/// # Ok::<(), PkError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DosingProtocol {
    dose_amount: f64,
    instantaneous_times: Vec<f64>,
    continuous_window: Option<ContinuousWindow>,
}

impl Default for DosingProtocol {
    fn default() -> Self {
        DosingProtocol {
            dose_amount: 1.0,
            instantaneous_times: Vec::new(),
            continuous_window: None,
        }
    }
}

impl DosingProtocol {
    /// Create a protocol without any dosing events
    pub fn new(dose_amount: f64) -> Result<Self, PkError> {
        Ok(DosingProtocol {
            dose_amount: ensure_positive("dose_amount", dose_amount)?,
            ..Default::default()
        })
    }

    /// Add an instantaneous dose at time `t`
    ///
    /// The dose times are kept sorted, and adding a time that is already present has no effect.
    pub fn add_instantaneous(&mut self, t: f64) -> Result<&mut Self, PkError> {
        if t.is_nan() {
            return Err(PkError::invalid("instantaneous_time", t));
        }
        let t = normalize_zero(t);
        match self
            .instantaneous_times
            .binary_search_by(|probe| probe.total_cmp(&t))
        {
            Ok(_) => tracing::debug!("Instantaneous dose at t = {} already present", t),
            Err(pos) => {
                tracing::debug!("Adding instantaneous dose at t = {}", t);
                self.instantaneous_times.insert(pos, t);
            }
        }
        Ok(self)
    }

    /// Enable continuous dosing over `[start, end)`, replacing any previous window
    pub fn enable_continuous(&mut self, start: f64, end: f64) -> Result<&mut Self, PkError> {
        if !start.is_finite() {
            return Err(PkError::invalid("continuous_start", start));
        }
        if end.is_nan() || end < start {
            return Err(PkError::invalid("continuous_end", end));
        }
        tracing::debug!("Enabling continuous dosing over [{}, {})", start, end);
        self.continuous_window = Some(ContinuousWindow { start, end });
        Ok(self)
    }

    /// Remove the continuous dosing window, if any
    pub fn disable_continuous(&mut self) -> &mut Self {
        self.continuous_window = None;
        self
    }

    /// Change the dose amount `X`
    pub fn set_dose_amount(&mut self, dose_amount: f64) -> Result<&mut Self, PkError> {
        self.dose_amount = ensure_positive("dose_amount", dose_amount)?;
        Ok(self)
    }

    /// Get the dose amount `X`
    pub fn dose_amount(&self) -> f64 {
        self.dose_amount
    }

    /// Get the sorted instantaneous dose times
    pub fn instantaneous_times(&self) -> &[f64] {
        &self.instantaneous_times
    }

    pub fn continuous_window(&self) -> Option<ContinuousWindow> {
        self.continuous_window
    }

    /// Whether an instantaneous dose is scheduled at exactly `t`
    pub fn is_instantaneous_at(&self, t: f64) -> bool {
        let t = normalize_zero(t);
        self.instantaneous_times
            .binary_search_by(|probe| probe.total_cmp(&t))
            .is_ok()
    }

    /// The continuous input rate at time `t`
    pub fn continuous_rate_at(&self, t: f64) -> f64 {
        match self.continuous_window {
            Some(window) if window.contains(t) => self.dose_amount,
            _ => 0.0,
        }
    }

    /// Total drug input at time `t`
    ///
    /// This is `X` if `t` equals one of the instantaneous dose times, plus `X` if `t` lies
    /// within the continuous window. Instantaneous times are matched by exact equality.
    pub fn dose_at(&self, t: f64) -> f64 {
        let instantaneous = if self.is_instantaneous_at(t) {
            self.dose_amount
        } else {
            0.0
        };
        instantaneous + self.continuous_rate_at(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_protocol() {
        let protocol = DosingProtocol::default();
        assert_eq!(protocol.dose_amount(), 1.0);
        assert!(protocol.instantaneous_times().is_empty());
        assert!(protocol.continuous_window().is_none());
        assert_eq!(protocol.dose_at(0.0), 0.0);
    }

    #[test]
    fn test_instantaneous_times_are_sorted_and_unique() {
        let mut protocol = DosingProtocol::default();
        protocol
            .add_instantaneous(3.0)
            .unwrap()
            .add_instantaneous(1.0)
            .unwrap()
            .add_instantaneous(2.0)
            .unwrap()
            .add_instantaneous(1.0)
            .unwrap();
        assert_eq!(protocol.instantaneous_times(), &[1.0, 2.0, 3.0]);
        assert_eq!(protocol.dose_at(1.0), 1.0);
        assert_eq!(protocol.dose_at(1.5), 0.0);
        assert!(protocol.add_instantaneous(f64::NAN).is_err());
        assert!(!protocol.is_instantaneous_at(f64::NAN));

        protocol.add_instantaneous(-0.0).unwrap();
        assert_eq!(protocol.dose_at(0.0), 1.0);
    }

    #[test]
    fn test_continuous_window_is_half_open() {
        let mut protocol = DosingProtocol::new(3.0).unwrap();
        protocol.enable_continuous(1.0, 2.0).unwrap();
        assert_eq!(protocol.dose_at(0.999), 0.0);
        assert_eq!(protocol.dose_at(1.0), 3.0);
        assert_eq!(protocol.dose_at(1.999), 3.0);
        assert_eq!(protocol.dose_at(2.0), 0.0);
    }

    #[test]
    fn test_enable_continuous_replaces_window() {
        let mut protocol = DosingProtocol::default();
        protocol.enable_continuous(0.0, 1.0).unwrap();
        protocol.enable_continuous(5.0, 6.0).unwrap();
        assert_eq!(protocol.dose_at(0.5), 0.0);
        assert_eq!(protocol.dose_at(5.5), 1.0);
        protocol.disable_continuous();
        assert_eq!(protocol.dose_at(5.5), 0.0);
    }

    #[test]
    fn test_enable_continuous_rejects_reversed_window() {
        let mut protocol = DosingProtocol::default();
        assert!(matches!(
            protocol.enable_continuous(2.0, 1.0),
            Err(PkError::InvalidParameter { .. })
        ));
        assert!(protocol.continuous_window().is_none());
        // An empty window is allowed, and never active
        protocol.enable_continuous(1.0, 1.0).unwrap();
        assert_eq!(protocol.dose_at(1.0), 0.0);
    }

    #[test]
    fn test_doses_are_additive() {
        let mut protocol = DosingProtocol::new(1.5).unwrap();
        protocol.add_instantaneous(0.5).unwrap();
        protocol.enable_continuous(0.0, 1.0).unwrap();
        assert_eq!(protocol.dose_at(0.5), 3.0);
        assert_eq!(protocol.dose_at(0.25), 1.5);
    }

    #[test]
    fn test_set_dose_amount() {
        let mut protocol = DosingProtocol::default();
        protocol.set_dose_amount(4.0).unwrap();
        assert_eq!(protocol.dose_amount(), 4.0);
        assert!(protocol.set_dose_amount(0.0).is_err());
        assert!(protocol.set_dose_amount(-2.0).is_err());
        assert_eq!(protocol.dose_amount(), 4.0);
        assert!(DosingProtocol::new(-1.0).is_err());
    }
}
