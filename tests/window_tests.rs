use beagle_engine::genetic_map::GeneticMap;
use beagle_engine::marker::Marker;
use beagle_engine::records::{MarkerRecord, RefGt, VecGtRecIterator};
use beagle_engine::window::WindowIter;

fn rec(chrom: usize, base_pos: i64) -> MarkerRecord {
    MarkerRecord {
        marker: Marker::new(chrom, base_pos, vec!["0".into(), "1".into()]),
        reference: RefGt::AlleleCoded {
            n_haps: 2,
            minor_carriers: vec![vec![]],
        },
        target: None,
    }
}

/// 1 cM per Mb (the untabulated-chromosome fallback), so base positions in
/// whole megabases map directly to cM for readable test fixtures.
fn records(positions_mb: &[i64]) -> Vec<MarkerRecord> {
    positions_mb.iter().map(|&mb| rec(0, mb * 1_000_000)).collect()
}

#[test]
fn single_window_covers_everything_when_shorter_than_window_cm() {
    let recs = records(&[0, 1, 2, 3]);
    let mut iter = WindowIter::new(VecGtRecIterator::new(recs), GeneticMap::new(), 40.0, 4.0).unwrap();
    let w = iter.next_window().unwrap().unwrap();
    assert_eq!(w.len(), 4);
    assert!(w.last_window);
    assert!(w.last_window_on_chrom);
    assert!(iter.next_window().unwrap().is_none());
}

#[test]
fn splits_into_overlapping_windows_when_longer_than_window_cm() {
    // 0..50 Mb at 1 Mb spacing = 0..50 cM, window 20 cM / overlap 2 cM.
    let positions: Vec<i64> = (0..=50).collect();
    let recs = records(&positions);
    let mut iter = WindowIter::new(VecGtRecIterator::new(recs), GeneticMap::new(), 20.0, 2.0).unwrap();

    let mut windows = Vec::new();
    while let Some(w) = iter.next_window().unwrap() {
        windows.push(w);
    }
    assert!(windows.len() >= 2);

    // Every non-final window's last record falls within [window_cm, window_cm] of its start.
    for w in &windows[..windows.len() - 1] {
        let cm_span = w.rec_list.last().unwrap().marker.base_pos - w.rec_list[0].marker.base_pos;
        assert!(cm_span as f64 / 1_000_000.0 <= 20.0 + 1e-9);
    }

    // Consecutive windows overlap: the previous window's overlap-start
    // record reappears as the next window's first `overlap_end` records.
    for pair in windows.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        let prev_tail = &prev.rec_list[prev.overlap_start..];
        let next_head = &next.rec_list[..next.overlap_end];
        assert_eq!(prev_tail.len(), next_head.len());
        for (a, b) in prev_tail.iter().zip(next_head.iter()) {
            assert_eq!(a.marker.base_pos, b.marker.base_pos);
        }
    }

    assert!(windows.last().unwrap().last_window);
}

#[test]
fn rejects_overlap_too_close_to_window_size() {
    let recs = records(&[0, 1, 2]);
    let result = WindowIter::new(VecGtRecIterator::new(recs), GeneticMap::new(), 10.0, 9.5);
    assert!(result.is_err());
}

#[test]
fn handles_multiple_chromosomes() {
    let mut recs = records(&[0, 1, 2]);
    recs.extend(vec![rec(1, 0), rec(1, 1_000_000)]);
    let mut iter = WindowIter::new(VecGtRecIterator::new(recs), GeneticMap::new(), 40.0, 4.0).unwrap();

    let w0 = iter.next_window().unwrap().unwrap();
    assert_eq!(w0.len(), 3);
    assert!(w0.last_window_on_chrom);
    assert!(!w0.last_window);

    let w1 = iter.next_window().unwrap().unwrap();
    assert_eq!(w1.len(), 2);
    assert!(w1.last_window_on_chrom);
    assert!(w1.last_window);

    assert!(iter.next_window().unwrap().is_none());
}
