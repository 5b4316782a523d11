/// Trigger predicate over the trailing average.
///
/// - below: `current < (1 - threshold) * tare`, only when `trigger_below`
/// - above: `current > (1 + threshold) * tare`, only when `trigger_above`
///
/// With both directions enabled the probe watches a two-sided band. Pure; safe
/// to call from queries as well as the sampling path.
#[inline]
pub fn is_triggered(
    current: f32,
    tare: f32,
    threshold: f32,
    trigger_above: bool,
    trigger_below: bool,
) -> bool {
    let below = trigger_below && current < (1.0 - threshold) * tare;
    let above = trigger_above && current > (1.0 + threshold) * tare;
    below || above
}
