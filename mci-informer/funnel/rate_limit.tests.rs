use rstest::rstest;

use super::*;

#[rstest]
#[case(0, 5)]
#[case(1, 10)]
#[case(2, 20)]
#[case(10, 5_120)]
#[case(20, 60_000)]
#[case(64, 60_000)]
fn exponential_delay_test(#[case] retries: u32, #[case] expected_ms: u64) {
    let limit = RateLimit::Exponential {
        base: Duration::from_millis(5),
        max: Duration::from_secs(60),
    };

    assert_eq!(Duration::from_millis(expected_ms), limit.delay(retries));
}

#[test]
fn fixed_and_none_delay_test() {
    assert_eq!(Duration::ZERO, RateLimit::None.delay(7));
    assert_eq!(
        Duration::from_millis(30),
        RateLimit::Fixed(Duration::from_millis(30)).delay(0)
    );
    assert_eq!(
        Duration::from_millis(30),
        RateLimit::Fixed(Duration::from_millis(30)).delay(9)
    );
}

#[test]
fn from_config_test() {
    assert_eq!(RateLimit::default(), RateLimit::from(&RateLimitConfig::default()));
    assert_eq!(
        RateLimit::Fixed(Duration::from_millis(3)),
        RateLimit::from(&RateLimitConfig::Fixed { delay_ms: 3 })
    );
    assert_eq!(RateLimit::None, RateLimit::from(&RateLimitConfig::None));
}
