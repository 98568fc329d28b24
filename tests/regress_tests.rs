use std::sync::Arc;
use std::thread;

use beagle_engine::regress::Regress;

#[test]
fn recovers_a_known_slope() {
    let regress = Regress::new();
    // y = 2x exactly.
    for x in [1.0, 2.0, 3.0, 4.0, 5.0] {
        regress.add(x, 2.0 * x);
    }
    let slope = regress.slope().expect("enough observations");
    assert!((slope - 2.0).abs() < 1e-9, "slope = {slope}");
}

#[test]
fn too_few_observations_returns_none() {
    let regress = Regress::new();
    assert!(regress.slope().is_none());
    regress.add(1.0, 1.0);
    assert!(regress.slope().is_none());
}

#[test]
fn concurrent_adds_are_not_lost() {
    let regress = Arc::new(Regress::new());
    let mut handles = Vec::new();
    for t in 0..8 {
        let regress = Arc::clone(&regress);
        handles.push(thread::spawn(move || {
            for i in 0..100 {
                let x = (t * 100 + i) as f64;
                regress.add(x, 3.0 * x + 1.0);
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(regress.count(), 800);
    let slope = regress.slope().unwrap();
    assert!((slope - 3.0).abs() < 1e-6, "slope = {slope}");
}
