use super::*;
use std::time::Duration;

#[test]
fn fake_clock_advances_deterministically() {
    let clock = FakeClock::new();
    let start = clock.epoch_ms();
    clock.advance(Duration::from_secs(30));
    assert_eq!(clock.epoch_ms(), start + 30_000);
}

#[test]
fn epoch_secs_derives_from_epoch_ms() {
    let clock = FakeClock::new();
    clock.set_epoch_ms(5_000);
    assert_eq!(clock.epoch_secs(), 5);
}

#[test]
fn system_clock_is_monotonically_nondecreasing() {
    let clock = SystemClock;
    let a = clock.epoch_ms();
    let b = clock.epoch_ms();
    assert!(b >= a);
}
