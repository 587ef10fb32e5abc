//! Sub-score step functions.
//!
//! Each maps one raw metric onto a fixed set of discrete values. Buckets are
//! checked best-first, so NaN and out-of-domain inputs fall through to the
//! lowest bucket.

/// Search position (1 = top). Positions below 1 are not valid ranks and
/// score as the lowest bucket.
pub fn rank_score(position: f64) -> u8 {
    if position.is_nan() || position < 1.0 {
        return 10;
    }
    if position <= 3.0 {
        100
    } else if position <= 5.0 {
        90
    } else if position <= 10.0 {
        70
    } else if position <= 20.0 {
        50
    } else if position <= 30.0 {
        30
    } else {
        10
    }
}

/// Click-through rate in percent (industry average is around 3%).
pub fn ctr_score(ctr: f64) -> u8 {
    if ctr >= 8.0 {
        100
    } else if ctr >= 5.0 {
        90
    } else if ctr >= 3.0 {
        70
    } else if ctr >= 2.0 {
        50
    } else if ctr >= 1.0 {
        30
    } else {
        10
    }
}

/// Share of sessions that moved on to a service page, in percent.
pub fn transition_score(transition_rate: f64) -> u8 {
    if transition_rate >= 5.0 {
        100
    } else if transition_rate >= 3.0 {
        85
    } else if transition_rate >= 2.0 {
        70
    } else if transition_rate >= 1.0 {
        50
    } else {
        30
    }
}

/// Engaged-session rate in percent.
pub fn engagement_score(engagement_rate: f64) -> u8 {
    if engagement_rate >= 70.0 {
        100
    } else if engagement_rate >= 60.0 {
        85
    } else if engagement_rate >= 50.0 {
        70
    } else if engagement_rate >= 40.0 {
        50
    } else {
        30
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_buckets() {
        for p in [1.0, 2.0, 3.0] {
            assert_eq!(rank_score(p), 100);
        }
        assert_eq!(rank_score(3.2), 90);
        assert_eq!(rank_score(5.0), 90);
        assert_eq!(rank_score(6.0), 70);
        assert_eq!(rank_score(10.0), 70);
        assert_eq!(rank_score(11.0), 50);
        assert_eq!(rank_score(20.0), 50);
        assert_eq!(rank_score(21.0), 30);
        assert_eq!(rank_score(30.0), 30);
        assert_eq!(rank_score(31.0), 10);
        assert_eq!(rank_score(100.0), 10);
    }

    #[test]
    fn rank_degenerate_positions_score_lowest() {
        assert_eq!(rank_score(0.0), 10);
        assert_eq!(rank_score(-4.0), 10);
        assert_eq!(rank_score(f64::NAN), 10);
        assert_eq!(rank_score(f64::INFINITY), 10);
    }

    #[test]
    fn ctr_buckets() {
        assert_eq!(ctr_score(10.0), 100);
        assert_eq!(ctr_score(8.0), 100);
        assert_eq!(ctr_score(7.9), 90);
        assert_eq!(ctr_score(5.0), 90);
        assert_eq!(ctr_score(4.9), 70);
        assert_eq!(ctr_score(3.0), 70);
        assert_eq!(ctr_score(2.9), 50);
        assert_eq!(ctr_score(2.0), 50);
        assert_eq!(ctr_score(1.9), 30);
        assert_eq!(ctr_score(1.0), 30);
        assert_eq!(ctr_score(0.5), 10);
        assert_eq!(ctr_score(0.0), 10);
    }

    #[test]
    fn transition_buckets() {
        assert_eq!(transition_score(6.0), 100);
        assert_eq!(transition_score(5.0), 100);
        assert_eq!(transition_score(4.2), 85);
        assert_eq!(transition_score(3.0), 85);
        assert_eq!(transition_score(2.5), 70);
        assert_eq!(transition_score(1.5), 50);
        assert_eq!(transition_score(0.8), 30);
        assert_eq!(transition_score(0.0), 30);
    }

    #[test]
    fn engagement_buckets() {
        assert_eq!(engagement_score(80.0), 100);
        assert_eq!(engagement_score(70.0), 100);
        assert_eq!(engagement_score(65.0), 85);
        assert_eq!(engagement_score(58.0), 70);
        assert_eq!(engagement_score(45.0), 50);
        assert_eq!(engagement_score(30.0), 30);
    }

    #[test]
    fn out_of_range_percentages_do_not_panic() {
        assert_eq!(ctr_score(250.0), 100);
        assert_eq!(transition_score(f64::INFINITY), 100);
        assert_eq!(engagement_score(-10.0), 30);
        assert_eq!(ctr_score(f64::NAN), 10);
        assert_eq!(engagement_score(f64::NAN), 30);
    }
}
