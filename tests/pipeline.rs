//! End-to-end checks of the normalization and statistics pipeline through
//! the public API.

use rbpmaps::{
    prelude::*,
    test_utilities::{density_test_case_01, labels, random_event_matrix, temp_matrix_file},
};

fn assert_close(a: f64, b: f64) {
    assert!((a - b).abs() < 1e-12, "{} != {}", a, b);
}

#[test]
fn test_worked_example_pdf() {
    let pdf = calculate_pdf(&density_test_case_01(), 0.0).unwrap();
    // pseudocount 2: [2, 4, 4] / 10 and [6, 2, 6] / 14
    let expected = [[0.2, 0.4, 0.4], [6.0 / 14.0, 2.0 / 14.0, 6.0 / 14.0]];
    for (i, event) in ["event0", "event1"].iter().enumerate() {
        for (j, value) in expected[i].iter().enumerate() {
            assert_close(pdf.get(event, j).unwrap(), *value);
        }
    }
}

#[test]
fn test_pdf_rows_sum_to_one_through_file() {
    let density = random_event_matrix(50, 20, 0.1);
    let file = temp_matrix_file(&density);
    let density = read_event_matrix(file.path()).unwrap();

    let pdf = normalize(&density, 0.0).unwrap();
    assert_eq!(pdf.nevents(), 50);
    for sum in pdf.row_sums() {
        assert_close(sum, 1.0);
    }
    for value in pdf.values().iter().flatten() {
        assert!(*value > 0.0);
    }
}

#[test]
fn test_subtract_self_is_zero() {
    let density = random_event_matrix(10, 8, 0.0);
    let profile = normalize_and_subtract(&density, &density, 0.0).unwrap();
    assert_eq!(profile.len(), 8);
    for value in profile.values().iter() {
        assert_close(value.unwrap(), 0.0);
    }

    let per_event = normalize_and_per_region_subtract(&density, &density, 0.0).unwrap();
    assert!(per_event.values().iter().flatten().all(|x| *x == 0.0));
}

#[test]
fn test_kl_of_disjoint_events_uses_uniform_fill() {
    let signal = EventMatrix::from_raw_rows(
        vec!["a".to_string()],
        labels("pos", 4),
        vec![vec![1.0, 1.0, 1.0, 1.0]],
    )
    .unwrap();
    let control = EventMatrix::from_raw_rows(
        vec!["b".to_string()],
        labels("pos", 4),
        vec![vec![3.0, 1.0, 2.0, 5.0]],
    )
    .unwrap();

    let kl = kl_divergence(&signal, &control, 0.0).unwrap();
    let events: Vec<&str> = kl.events().collect();
    assert_eq!(events, vec!["a", "b"]);
    // "a" normalizes to the uniform distribution, and its control is filled
    // with the uniform distribution
    for j in 0..4 {
        assert_close(kl.get("a", j).unwrap(), 0.0);
    }
}

#[test]
fn test_mismatched_positions_are_rejected() {
    let signal = random_event_matrix(3, 4, 0.0);
    let control = random_event_matrix(3, 5, 0.0);
    assert!(matches!(
        kl_divergence(&signal, &control, 0.0),
        Err(RbpMapsError::PositionMismatch { .. })
    ));
    assert!(matches!(
        entropy_of_reads(&signal, &control, 0.0),
        Err(RbpMapsError::PositionMismatch { .. })
    ));
}

#[test]
fn test_statistics_and_significance() {
    // a line whose events are all well above the background at every position
    let npositions = 6;
    let high = EventMatrix::from_raw_rows(
        labels("event", 5),
        labels("pos", npositions),
        (0..5)
            .map(|i| vec![100.0 + i as f64; npositions])
            .collect(),
    )
    .unwrap();
    let background = EventMatrix::from_raw_rows(
        labels("bg", 10),
        labels("pos", npositions),
        (0..10).map(|i| vec![i as f64; npositions]).collect(),
    )
    .unwrap();

    let mut statistics = EventStatistics::new(high, 1.0).unwrap();
    for mean in statistics.means() {
        assert_close(mean.unwrap(), 102.0);
    }

    statistics
        .calculate_and_set_significance(&background, SignificanceTest::KolmogorovSmirnov)
        .unwrap();
    statistics
        .calculate_and_set_significance(&background, SignificanceTest::MannWhitneyU)
        .unwrap();
    assert_eq!(statistics.ks_pvalues().len(), npositions);
    assert_eq!(statistics.mannwhitneyu_pvalues().len(), npositions);
    for (ks, mwu) in statistics
        .ks_pvalues()
        .iter()
        .zip(statistics.mannwhitneyu_pvalues())
    {
        // -log10(p) is large, and the one-sided p-value small
        assert!(ks.unwrap() > 2.0);
        assert!(mwu.unwrap() < 0.01);
    }

    let background = EventStatistics::new(background, 1.0).unwrap();
    let undefined = statistics.calculate_zscore(&background).unwrap();
    assert!(undefined.is_empty());
    assert!(statistics.try_z_scores().unwrap().iter().all(|z| *z > 0.0));
}

#[test]
fn test_zscore_with_flat_background() {
    let events = random_event_matrix(5, 3, 0.0);
    let flat = EventMatrix::from_raw_rows(
        labels("bg", 4),
        labels("pos", 3),
        vec![vec![1.0, 2.0, 3.0]; 4],
    )
    .unwrap();
    let mut statistics = EventStatistics::new(events, 0.95).unwrap();
    let background = EventStatistics::new(flat, 0.95).unwrap();

    let undefined = statistics.calculate_zscore(&background).unwrap();
    assert_eq!(undefined.len(), 3);
    assert!(statistics.z_scores().iter().all(|z| z.is_err()));
    assert!(matches!(
        statistics.try_z_scores(),
        Err(RbpMapsError::UndefinedStatistic(_))
    ));
}
