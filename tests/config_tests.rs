use beagle_engine::Params;

#[test]
fn default_params_validate() {
    let params = Params::default();
    assert!(params.validate().is_ok());
}

#[test]
fn rejects_overlap_too_close_to_window() {
    let mut params = Params::default();
    params.window_cm = 10.0;
    params.overlap_cm = 9.2; // 1.1 * 9.2 > 10.0
    assert!(params.validate().is_err());
}

#[test]
fn rejects_negative_error_rate() {
    let mut params = Params::default();
    params.err = -0.01;
    assert!(params.validate().is_err());
}

#[test]
fn derive_seed_is_deterministic() {
    let params = Params::default();
    let a = params.derive_seed(&[1, 2, 3]);
    let b = params.derive_seed(&[1, 2, 3]);
    assert_eq!(a, b);
}

#[test]
fn derive_seed_depends_on_salt() {
    let params = Params::default();
    let a = params.derive_seed(&[1, 2, 3]);
    let b = params.derive_seed(&[1, 2, 4]);
    assert_ne!(a, b);
}

#[test]
fn derive_seed_stable_across_param_clones() {
    let params = Params::default();
    let cloned = params.clone();
    assert_eq!(params.derive_seed(&[42]), cloned.derive_seed(&[42]));
}
