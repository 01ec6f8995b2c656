//! Temporal interpolation of frames.

use crate::types::{Frame, Sample};

/// Strategy turning a frame into the value handed to readers.
///
/// Arguments are the frame, the current clock time, the sampler's update
/// interval (both in milliseconds) and the default used for absent sides.
pub type EaseFn<V> = fn(&Frame<V>, u64, u64, &V) -> V;

/// Fraction of the update interval elapsed since `timestamp_ms`, clamped to `[0, 1]`.
///
/// A zero interval counts as already elapsed.
pub fn progress(timestamp_ms: u64, now_ms: u64, interval_ms: u64) -> f64 {
    if interval_ms == 0 {
        return 1.0;
    }
    let elapsed = now_ms.saturating_sub(timestamp_ms);
    (elapsed as f64 / interval_ms as f64).clamp(0.0, 1.0)
}

/// Linear easing from `previous` to `current` over one update interval.
///
/// Absent sides are replaced by `default`. At `t == 0` the result is
/// `previous` and from `t == 1` onwards it is `current`, both exactly.
pub fn ease<V: Sample>(frame: &Frame<V>, now_ms: u64, interval_ms: u64, default: &V) -> V {
    let previous = frame.previous.as_ref().unwrap_or(default);
    let current = frame.current.as_ref().unwrap_or(default);

    let t = progress(frame.timestamp_ms, now_ms, interval_ms);
    if t >= 1.0 {
        current.clone()
    } else if t <= 0.0 {
        previous.clone()
    } else {
        V::lerp(previous, current, t)
    }
}

/// No interpolation: the freshest raw sample, or `default` before the first one.
pub fn latest<V: Sample>(frame: &Frame<V>, _now_ms: u64, _interval_ms: u64, default: &V) -> V {
    frame.current.clone().unwrap_or_else(|| default.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const T: u64 = 1_000_000;

    #[test]
    fn midpoint_and_clamp() {
        let frame = Frame::new(Some(10.0), 50.0, T);
        assert_eq!(ease(&frame, T + 500, 1000, &0.0), 30.0);
        assert_eq!(ease(&frame, T + 1200, 1000, &0.0), 50.0);
    }

    #[test]
    fn before_timestamp_is_previous() {
        // Readers racing a publish may compute `now` just before the timestamp.
        let frame = Frame::new(Some(10.0), 50.0, T);
        assert_eq!(ease(&frame, T - 5, 1000, &0.0), 10.0);
    }

    #[test]
    fn empty_frame_yields_default() {
        let frame: Frame<f64> = Frame::empty();
        assert_eq!(ease(&frame, T, 1000, &7.0), 7.0);

        let frame: Frame<Vec<f64>> = Frame::empty();
        assert_eq!(ease(&frame, T, 1000, &vec![0.0; 4]), vec![0.0; 4]);
    }

    #[test]
    fn missing_previous_eases_from_default() {
        let frame = Frame::new(None, vec![40.0, 80.0], T);
        let eased = ease(&frame, T + 250, 1000, &vec![0.0, 0.0]);
        assert_eq!(eased, vec![10.0, 20.0]);
    }

    #[test]
    fn latest_ignores_time() {
        let frame = Frame::new(Some(10.0), 50.0, T);
        assert_eq!(latest(&frame, T, 1000, &0.0), 50.0);
        assert_eq!(latest(&Frame::<f64>::empty(), T, 1000, &3.0), 3.0);
    }

    #[test]
    fn zero_interval_is_fully_elapsed() {
        assert_eq!(progress(T, T, 0), 1.0);
    }

    proptest! {
        #[test]
        fn clamps_to_current_after_interval(
            prev in -1e6f64..1e6,
            cur in -1e6f64..1e6,
            interval in 1u64..10_000,
            extra in 0u64..100_000,
        ) {
            let frame = Frame::new(Some(prev), cur, T);
            prop_assert_eq!(ease(&frame, T + interval + extra, interval, &0.0), cur);
        }

        #[test]
        fn starts_at_previous(
            prev in -1e6f64..1e6,
            cur in -1e6f64..1e6,
            interval in 1u64..10_000,
        ) {
            let frame = Frame::new(Some(prev), cur, T);
            prop_assert_eq!(ease(&frame, T, interval, &0.0), prev);
        }

        #[test]
        fn non_decreasing_when_rising(
            a in -1e6f64..1e6,
            b in -1e6f64..1e6,
            interval in 1u64..5_000,
        ) {
            let (prev, cur) = if a <= b { (a, b) } else { (b, a) };
            let frame = Frame::new(Some(prev), cur, T);
            let mut last = f64::NEG_INFINITY;
            for dt in 0..=interval {
                let v = ease(&frame, T + dt, interval, &0.0);
                prop_assert!(v >= last, "eased value dropped at dt={}: {} < {}", dt, v, last);
                last = v;
            }
        }
    }
}
