mod integration {
    mod stream {
        extern crate quanta;
        extern crate summary_quantiles;

        use self::quanta::{Clock, Mock};
        use self::summary_quantiles::invariant::Invariant;
        use self::summary_quantiles::stream::QuantileStream;
        use std::sync::Arc;
        use std::time::Duration;

        fn manual(
            max_age: Duration,
            age_buckets: u32,
            invariant: Invariant,
        ) -> (Arc<Mock>, QuantileStream) {
            let (clock, mock) = Clock::mock();
            let stream = QuantileStream::with_clock(500, max_age, age_buckets, invariant, clock)
                .expect("valid stream");
            (mock, stream)
        }

        #[test]
        fn median_of_a_thousand() {
            let (_, stream) = manual(Duration::from_secs(600), 5, Invariant::LowBiased(0.01));
            for i in 0..1000 {
                stream.append(i as f64);
            }
            stream.flush();

            let median = stream.query(0.5);
            assert!(
                (median - 500.0).abs() <= 5.0,
                "median {} is not within 1% of 500",
                median
            );
        }

        #[test]
        fn sliding_window() {
            let invariant = Invariant::targeted(&[(0.1, 0.001)]).unwrap();
            let (clock, stream) = manual(Duration::from_secs(100), 10, invariant);

            for i in 0..1000 {
                if i > 0 {
                    clock.increment(Duration::from_secs(1));
                }
                stream.append(i as f64);
                if i % 10 == 0 {
                    stream.flush();
                    let got = stream.query(0.1);
                    let want = (i as f64 / 10.0).max(i as f64 - 90.0);
                    assert!(
                        (got - want).abs() <= 1.0,
                        "{}s: got {} want {}",
                        i,
                        got,
                        want
                    );
                }
            }

            // Wait out max_age without observations.
            stream.flush();
            clock.increment(Duration::from_secs(100));
            stream.flush();
            assert!(stream.query(0.1).is_nan());
        }

        #[test]
        fn recent_history_survives_one_rotation() {
            let (clock, stream) = manual(Duration::from_secs(100), 10, Invariant::LowBiased(0.01));
            for i in 0..100 {
                stream.append(i as f64);
                clock.increment(Duration::from_secs(1));
            }
            stream.flush();
            clock.increment(Duration::from_secs(5));
            stream.flush();
            assert!(!stream.query(0.5).is_nan());
            assert_eq!(99.0, stream.query(1.0));
        }

        #[test]
        fn reset_forgets() {
            let (_, stream) = manual(Duration::from_secs(60), 3, Invariant::HighBiased(0.01));
            for i in 0..2000 {
                stream.append(i as f64);
            }
            stream.reset();
            for q in &[0.0, 0.5, 0.99, 1.0] {
                assert!(stream.query(*q).is_nan());
            }
            stream.flush();
            for q in &[0.0, 0.5, 0.99, 1.0] {
                assert!(stream.query(*q).is_nan());
            }
        }
    }
}
