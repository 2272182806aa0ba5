use decinet_core::engine::algebra::{
    normalize_for, policy, product, rearrange, restrict, scale, sum, sum_out,
};
use decinet_core::{invert, marginal, normalize, InferenceError, NodeKind, Registry};
use decinet_tests::assert_close_vec;

#[test]
fn restrictions_partition_the_mass() {
    let mut reg = Registry::new();
    let a = reg.add_variable(NodeKind::Chance, 2).unwrap();
    let b = reg.add_variable(NodeKind::Chance, 3).unwrap();
    let f = reg
        .create_factor(&[a, b], Some(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]))
        .unwrap();

    let summed = sum_out(&mut reg, &f, &b).unwrap();
    assert_eq!(summed.variables(), &[a]);
    assert_close_vec(summed.data(), &[6.0, 15.0]);

    let slices: Vec<f64> = (0..b.arity())
        .map(|k| restrict(&mut reg, &f, &b, k).unwrap().total())
        .collect();
    assert_close_vec(&slices, &[5.0, 7.0, 9.0]);
    assert!((slices.iter().sum::<f64>() - f.total()).abs() < 1e-12);
}

#[test]
fn product_aligns_shared_axes() {
    let mut reg = Registry::new();
    let a = reg.add_variable(NodeKind::Chance, 2).unwrap();
    let b = reg.add_variable(NodeKind::Chance, 2).unwrap();
    let c = reg.add_variable(NodeKind::Chance, 2).unwrap();
    let ab = reg
        .create_factor(&[a, b], Some(vec![1.0, 2.0, 3.0, 4.0]))
        .unwrap();
    let bc = reg
        .create_factor(&[b, c], Some(vec![10.0, 20.0, 30.0, 40.0]))
        .unwrap();
    let joint = product(&mut reg, &[&ab, &bc]).unwrap();
    assert_eq!(joint.variables(), &[a, b, c]);
    assert_close_vec(
        joint.data(),
        &[10.0, 20.0, 60.0, 80.0, 30.0, 60.0, 120.0, 160.0],
    );
}

#[test]
fn product_with_scalar_scales_every_cell() {
    let mut reg = Registry::new();
    let a = reg.add_variable(NodeKind::Chance, 3).unwrap();
    let f = reg.create_factor(&[a], Some(vec![0.5, 1.5, 2.0])).unwrap();
    let two = reg.scalar(2.0);
    let doubled = product(&mut reg, &[&f, &two]).unwrap();
    assert_eq!(doubled.variables(), &[a]);
    assert_close_vec(doubled.data(), &[1.0, 3.0, 4.0]);

    let scaled = scale(&mut reg, &f, 2.0).unwrap();
    assert_eq!(scaled.data(), doubled.data());
}

#[test]
fn single_factor_product_is_a_copy_with_a_new_id() {
    let mut reg = Registry::new();
    let a = reg.add_variable(NodeKind::Chance, 2).unwrap();
    let f = reg.create_factor(&[a], Some(vec![0.25, 0.75])).unwrap();
    let copy = product(&mut reg, &[&f]).unwrap();
    assert_eq!(copy.data(), f.data());
    assert_ne!(copy.id(), f.id());
}

#[test]
fn sum_broadcasts_over_the_union() {
    let mut reg = Registry::new();
    let a = reg.add_variable(NodeKind::Chance, 2).unwrap();
    let b = reg.add_variable(NodeKind::Chance, 2).unwrap();
    let fa = reg.create_factor(&[a], Some(vec![1.0, 2.0])).unwrap();
    let fb = reg.create_factor(&[b], Some(vec![10.0, 20.0])).unwrap();
    let total = sum(&mut reg, &[&fa, &fb]).unwrap();
    assert_eq!(total.variables(), &[a, b]);
    assert_close_vec(total.data(), &[11.0, 21.0, 12.0, 22.0]);
}

#[test]
fn marginal_and_normalize_give_a_distribution() {
    let mut reg = Registry::new();
    let a = reg.add_variable(NodeKind::Chance, 2).unwrap();
    let b = reg.add_variable(NodeKind::Chance, 2).unwrap();
    let f = reg
        .create_factor(&[a, b], Some(vec![1.0, 3.0, 2.0, 2.0]))
        .unwrap();
    let m = marginal(&mut reg, &f, &b).unwrap();
    assert_close_vec(m.data(), &[3.0, 5.0]);
    let p = normalize(&mut reg, &m).unwrap();
    assert_close_vec(p.data(), &[0.375, 0.625]);
}

#[test]
fn normalize_for_conditions_on_the_other_axes() {
    let mut reg = Registry::new();
    let a = reg.add_variable(NodeKind::Chance, 2).unwrap();
    let b = reg.add_variable(NodeKind::Chance, 2).unwrap();
    let f = reg
        .create_factor(&[b, a], Some(vec![1.0, 0.0, 3.0, 0.0]))
        .unwrap();
    // b moves last; a = 0 block is [1, 3], a = 1 block is all zero
    let cond = normalize_for(&mut reg, &f, &b).unwrap();
    assert_eq!(cond.variables(), &[a, b]);
    assert_close_vec(cond.data(), &[0.25, 0.75, 0.0, 0.0]);
}

#[test]
fn invert_maps_zero_to_zero() {
    let mut reg = Registry::new();
    let a = reg.add_variable(NodeKind::Chance, 3).unwrap();
    let f = reg.create_factor(&[a], Some(vec![4.0, 0.0, 0.5])).unwrap();
    let inv = invert(&mut reg, &f).unwrap();
    assert_close_vec(inv.data(), &[0.25, 0.0, 2.0]);
}

#[test]
fn rearrange_transposes() {
    let mut reg = Registry::new();
    let a = reg.add_variable(NodeKind::Chance, 2).unwrap();
    let b = reg.add_variable(NodeKind::Chance, 3).unwrap();
    let f = reg
        .create_factor(&[a, b], Some(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]))
        .unwrap();
    let t = rearrange(&mut reg, &f, &[b, a]).unwrap();
    assert_eq!(t.variables(), &[b, a]);
    assert_close_vec(t.data(), &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    assert_eq!(t.value_at(&[2, 1]).unwrap(), f.value_at(&[1, 2]).unwrap());

    assert!(matches!(
        rearrange(&mut reg, &f, &[a]),
        Err(InferenceError::Internal(_))
    ));
}

#[test]
fn policy_splits_ties_evenly() {
    let mut reg = Registry::new();
    let s = reg.add_variable(NodeKind::Chance, 2).unwrap();
    let d = reg.add_variable(NodeKind::Decision, 3).unwrap();
    let f = reg
        .create_factor(&[d, s], Some(vec![5.0, 1.0, 5.0, 2.0, 1.0, 2.0]))
        .unwrap();
    let rule = policy(&mut reg, &f, &d).unwrap();
    assert_eq!(rule.variables(), &[s, d]);
    // s = 0: d0 and d1 tie at 5; s = 1: d1 and d2 tie at 2
    assert_close_vec(rule.data(), &[0.5, 0.5, 0.0, 0.0, 0.5, 0.5]);
}

#[test]
fn missing_axis_is_an_invariant_violation() {
    let mut reg = Registry::new();
    let a = reg.add_variable(NodeKind::Chance, 2).unwrap();
    let b = reg.add_variable(NodeKind::Chance, 2).unwrap();
    let f = reg.create_factor(&[a], Some(vec![0.5, 0.5])).unwrap();
    for result in [
        sum_out(&mut reg, &f, &b),
        restrict(&mut reg, &f, &b, 0),
        marginal(&mut reg, &f, &b),
    ] {
        let err = result.unwrap_err();
        assert!(matches!(err, InferenceError::Internal(_)));
        assert!(!err.is_definition_error());
    }
    assert!(matches!(
        restrict(&mut reg, &f, &a, 2),
        Err(InferenceError::Internal(_))
    ));
}
