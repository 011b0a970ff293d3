//! Reward window math for autopay feeds.
//!
//! Every feed pays out at most once per interval: the first report that lands
//! inside the `window` seconds following the interval's start claims it.

use autopay_types::{AutopayError, AutopayResult, FeedDetails};

/// Start of the interval containing `timestamp`, anchored at `start_time`.
///
/// Floor division is used so timestamps before `start_time` map to earlier
/// (possibly negative) interval starts instead of wrapping.
pub fn window_start(timestamp: u64, start_time: u64, interval: u64) -> AutopayResult<i128> {
    if interval == 0 {
        return Err(AutopayError::invalid_parameter("interval", "0", "greater than 0"));
    }

    let interval = i128::from(interval);
    let elapsed = i128::from(timestamp) - i128::from(start_time);
    let num_intervals = elapsed.div_euclid(interval);

    Ok(i128::from(start_time) + interval * num_intervals)
}

/// Whether a report at `candidate` would be the first inside its reward window.
///
/// `previous` is the report immediately before the candidate; `None` means
/// there was no earlier report at all.
pub fn is_first_in_window(
    previous: Option<u64>,
    candidate: u64,
    start_time: u64,
    window: u64,
    interval: u64,
) -> AutopayResult<bool> {
    let current_window_start = window_start(candidate, start_time, interval)?;

    let inside_window = i128::from(candidate) - current_window_start < i128::from(window);
    let first_in_window = previous.map_or(true, |prev| i128::from(prev) < current_window_start);

    Ok(inside_window && first_in_window)
}

/// [`is_first_in_window`] against a feed's schedule
pub fn is_first_in_feed_window(
    previous: Option<u64>,
    candidate: u64,
    details: &FeedDetails,
) -> AutopayResult<bool> {
    is_first_in_window(
        previous,
        candidate,
        details.start_time,
        details.window,
        details.interval,
    )
}
