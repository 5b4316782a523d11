use probe_core::{SampleBuffer, adaptive_threshold, baseline, is_triggered};
use proptest::prelude::*;

fn naive_mean(xs: &[u16]) -> f32 {
    let sum: u64 = xs.iter().map(|&x| u64::from(x)).sum();
    sum as f32 / xs.len() as f32
}

proptest! {
    #[test]
    fn buffer_never_exceeds_capacity_and_keeps_newest(
        xs in prop::collection::vec(any::<u16>(), 0..64),
    ) {
        let mut buf: SampleBuffer<16> = SampleBuffer::new(3);
        for &x in &xs {
            buf.push(x);
            prop_assert!(buf.len() <= 16);
        }
        let kept: Vec<u16> = buf.iter().collect();
        let start = xs.len().saturating_sub(16);
        prop_assert_eq!(kept, xs[start..].to_vec());
    }

    #[test]
    fn average_matches_naive_mean_of_tail(
        xs in prop::collection::vec(any::<u16>(), 0..300),
        window in 1u32..=200,
    ) {
        let mut buf: SampleBuffer = SampleBuffer::new(window);
        for &x in &xs {
            buf.push(x);
        }
        let w = window as usize;
        if xs.len() < w {
            prop_assert_eq!(buf.current(), None);
        } else {
            prop_assert_eq!(buf.current(), Some(naive_mean(&xs[xs.len() - w..])));
        }
    }

    #[test]
    fn reset_hides_every_earlier_reading(
        before in prop::collection::vec(any::<u16>(), 1..50),
        after in prop::collection::vec(any::<u16>(), 0..4),
    ) {
        let mut buf: SampleBuffer<32> = SampleBuffer::new(4);
        for &x in &before {
            buf.push(x);
        }
        buf.reset();
        for &x in &after {
            buf.push(x);
        }
        prop_assert_eq!(buf.len(), after.len());
        prop_assert_eq!(buf.current(), None);
        prop_assert!(baseline(&buf, after.len() + 1).is_none());
    }

    #[test]
    fn deviation_past_a_triggering_one_also_triggers(
        tare in 1.0f32..60_000.0,
        threshold in 0.0f32..0.5,
        d1 in 0.0f32..1.0,
        extra in 0.0f32..1.0,
    ) {
        let d2 = d1 + extra;
        let up1 = tare * (1.0 + d1);
        let up2 = tare * (1.0 + d2);
        if is_triggered(up1, tare, threshold, true, false) {
            prop_assert!(is_triggered(up2, tare, threshold, true, false));
        }
        let down1 = tare * (1.0 - d1.min(1.0));
        let down2 = tare * (1.0 - d2.min(1.0));
        if is_triggered(down1, tare, threshold, false, true) {
            prop_assert!(is_triggered(down2, tare, threshold, false, true));
        }
    }

    #[test]
    fn disabled_directions_never_trigger(
        current in any::<f32>(),
        tare in any::<f32>(),
        threshold in any::<f32>(),
    ) {
        prop_assert!(!is_triggered(current, tare, threshold, false, false));
    }

    #[test]
    fn adaptive_threshold_is_finite_for_nonzero_tare(
        xs in prop::collection::vec(1u16..=u16::MAX, 1..200),
        mult in 0.0f32..20.0,
    ) {
        let mut buf: SampleBuffer = SampleBuffer::new(1);
        for &x in &xs {
            buf.push(x);
        }
        let b = baseline(&buf, xs.len()).expect("full window");
        let t = adaptive_threshold(&b, mult).expect("non-zero tare");
        prop_assert!(t.is_finite() && t >= 0.0);
    }
}
