mod common;

use common::MockClock;
use mqtt_rpc::time::{TimeBase, TimeDiff, elapsed_us};

#[test]
fn elapsed_across_wrap() {
    assert_eq!(elapsed_us(u32::MAX - 99, 50, u32::MAX), 150);
    assert_eq!(elapsed_us(990, 5, 999), 15);
    assert_eq!(elapsed_us(7, 7, 999), 0);
}

#[test]
fn mark_on_wrapping_clock() {
    let clock = MockClock::with_max(999_999);
    clock.set_us(999_500);
    let mut mark = TimeDiff::new(&clock);

    clock.advance_us(499);
    assert_eq!(clock.now_us(), 999_999);
    assert!(!mark.is_elapsed_ms(&clock, 1));

    clock.advance_us(1);
    assert_eq!(clock.now_us(), 0);
    assert_eq!(mark.elapsed_us(&clock), 500);

    clock.advance_us(500);
    assert!(mark.is_elapsed_ms(&clock, 1));
    assert_eq!(mark.elapsed_ms(&clock), 1);
}

#[test]
fn recurring_mark_restarts() {
    let clock = MockClock::new();
    let mut mark = TimeDiff::new(&clock);

    clock.advance_ms(99);
    assert!(!mark.is_elapsed_recurring_ms(&clock, 100));

    clock.advance_ms(1);
    assert!(mark.is_elapsed_recurring_ms(&clock, 100));
    assert_eq!(mark.start_us(), 100_000);
    assert!(!mark.is_elapsed_recurring_ms(&clock, 100));

    clock.advance_ms(150);
    assert!(mark.is_elapsed_recurring_ms(&clock, 100));
    assert_eq!(mark.start_us(), 250_000);
}

#[test]
fn zero_interval_is_always_elapsed() {
    let clock = MockClock::new();
    let mut mark = TimeDiff::new(&clock);
    assert!(mark.is_elapsed_ms(&clock, 0));
}

#[test]
fn interval_longer_than_counter_period() {
    // The counter wraps every second.
    let clock = MockClock::with_max(999_999);
    let mut mark = TimeDiff::new(&clock);

    for _ in 0..19 {
        clock.advance_ms(500);
        assert!(!mark.is_elapsed_ms(&clock, 10_000));
    }
    clock.advance_ms(500);
    assert!(mark.is_elapsed_ms(&clock, 10_000));
    assert_eq!(mark.elapsed_ms(&clock), 10_000);
}

#[test]
fn hours_on_a_full_width_counter() {
    let clock = MockClock::new();
    let mut mark = TimeDiff::new(&clock);

    // Two hours in one-minute polls crosses the 32-bit microsecond wrap.
    for _ in 0..119 {
        clock.advance_ms(60_000);
        assert!(!mark.is_elapsed_ms(&clock, 7_200_000));
    }
    clock.advance_ms(60_000);
    assert!(mark.is_elapsed_ms(&clock, 7_200_000));
    assert_eq!(mark.elapsed_us(&clock), 7_200_000_000);
}
