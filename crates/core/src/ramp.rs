//! Linear ramps for runtime parameters
//!
//! A ramp turns "go from `start` to `end` over `duration`" into a list of
//! samples, each with an offset from now. The first sample sits at offset
//! zero and the last one at exactly `duration`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Three-component vector used for positions and orientations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    /// X component
    pub x: f64,
    /// Y component
    pub y: f64,
    /// Z component
    pub z: f64,
}

impl Vec3 {
    /// Build a vector.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Default listener-facing orientation.
    pub const FRONT: Vec3 = Vec3::new(0.0, 1.0, 0.0);
    /// Default up orientation.
    pub const TOP: Vec3 = Vec3::new(0.0, 0.0, 1.0);

    fn dot(self, other: Vec3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    fn scale(self, k: f64) -> Vec3 {
        Vec3::new(self.x * k, self.y * k, self.z * k)
    }

    fn sub(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    fn normalized(self) -> Vec3 {
        let n = self.dot(self).sqrt();
        if n == 0.0 {
            self
        } else {
            self.scale(1.0 / n)
        }
    }

    /// Linear interpolation between `self` and `other`.
    pub fn lerp(self, other: Vec3, t: f64) -> Vec3 {
        Vec3::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
            self.z + (other.z - self.z) * t,
        )
    }

    /// Wire form expected by the sound engine.
    pub fn to_json(self) -> serde_json::Value {
        serde_json::json!({"x": self.x, "y": self.y, "z": self.z})
    }
}

/// Make `top` orthogonal to `front` (Gram-Schmidt) and normalize both.
///
/// Falls back to +Y for `top` when the two inputs are parallel.
pub fn orthonormalize(front: Vec3, top: Vec3) -> (Vec3, Vec3) {
    let f = front.normalized();
    let t = top.sub(f.scale(top.dot(f)));
    let t = if t.dot(t) < 1e-12 {
        Vec3::new(0.0, 1.0, 0.0)
    } else {
        t.normalized()
    };
    (f, t)
}

/// One sample of a ramp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample<T> {
    /// Offset from the moment the ramp is issued
    pub due_in: Duration,
    /// Value at that offset
    pub value: T,
}

/// Offsets and interpolation factors for a ramp of `duration` sampled every
/// `step`. A zero duration yields a single sample at offset zero with factor 1.
pub fn schedule(duration: Duration, step: Duration) -> Vec<(Duration, f64)> {
    if duration.is_zero() {
        return vec![(Duration::ZERO, 1.0)];
    }
    let step = step.max(Duration::from_millis(1));
    let steps = (duration.as_secs_f64() / step.as_secs_f64()).ceil().max(1.0) as u32;
    (0..=steps)
        .map(|i| {
            let t = f64::from(i) / f64::from(steps);
            (duration.mul_f64(t), t)
        })
        .collect()
}

/// Samples of a scalar ramp.
pub fn scalar_ramp(start: f64, end: f64, duration: Duration, step: Duration) -> Vec<Sample<f64>> {
    schedule(duration, step)
        .into_iter()
        .map(|(due_in, t)| Sample {
            due_in,
            value: start + (end - start) * t,
        })
        .collect()
}

/// Samples of a position ramp.
///
/// A zero duration yields the start and the end position, both due now.
pub fn position_ramp(start: Vec3, end: Vec3, duration: Duration, step: Duration) -> Vec<Sample<Vec3>> {
    if duration.is_zero() {
        return vec![
            Sample { due_in: Duration::ZERO, value: start },
            Sample { due_in: Duration::ZERO, value: end },
        ];
    }
    schedule(duration, step)
        .into_iter()
        .map(|(due_in, t)| Sample {
            due_in,
            value: start.lerp(end, t),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_zero_duration_scalar() {
        let samples = scalar_ramp(0.0, 10.0, Duration::ZERO, Duration::from_millis(50));
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].value, 10.0);
        assert_eq!(samples[0].due_in, Duration::ZERO);
    }

    #[test]
    fn test_scalar_ramp_endpoints() {
        let samples = scalar_ramp(0.0, 100.0, Duration::from_millis(200), Duration::from_millis(50));
        assert_eq!(samples.len(), 5);
        assert_eq!(samples.first().unwrap().value, 0.0);
        assert_eq!(samples.last().unwrap().value, 100.0);
        assert_eq!(samples.last().unwrap().due_in, Duration::from_millis(200));
    }

    #[test]
    fn test_uneven_step_rounds_up() {
        let samples = scalar_ramp(0.0, 1.0, Duration::from_millis(120), Duration::from_millis(50));
        // ceil(120 / 50) = 3 intervals, 4 samples
        assert_eq!(samples.len(), 4);
    }

    #[test]
    fn test_zero_duration_position() {
        let samples = position_ramp(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 2.0, 3.0),
            Duration::ZERO,
            Duration::from_millis(100),
        );
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1].value, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_orthonormalize() {
        let (f, t) = orthonormalize(Vec3::new(0.0, 2.0, 0.0), Vec3::new(0.0, 1.0, 1.0));
        assert!((f.dot(f) - 1.0).abs() < 1e-9);
        assert!((t.dot(t) - 1.0).abs() < 1e-9);
        assert!(f.dot(t).abs() < 1e-9);
    }

    #[test]
    fn test_orthonormalize_parallel_fallback() {
        let (_, t) = orthonormalize(Vec3::new(0.0, 0.0, 1.0), Vec3::new(0.0, 0.0, 3.0));
        assert_eq!(t, Vec3::new(0.0, 1.0, 0.0));
    }

    proptest! {
        #[test]
        fn prop_ramp_is_monotonic(start in -100.0f64..100.0, end in -100.0f64..100.0, ms in 1u64..2000, step in 1u64..200) {
            let samples = scalar_ramp(start, end, Duration::from_millis(ms), Duration::from_millis(step));
            prop_assert!(samples.len() >= 2);
            prop_assert!((samples.last().unwrap().value - end).abs() < 1e-9);
            for pair in samples.windows(2) {
                prop_assert!(pair[0].due_in <= pair[1].due_in);
            }
        }
    }
}
