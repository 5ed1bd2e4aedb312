use ndarray::{arr2, s, Array2, Array3, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::tempdir;

use crate::activations::Activation;
use crate::config::{AgentConfig, OptimizerConfig};
use crate::error::C51Error;
use crate::network::{CategoricalNetwork, DistributionalModel};
use crate::optimizer::{Adam, OptimizerWrapper, SGD};

fn small_network(seed: u64) -> CategoricalNetwork {
    let mut rng = StdRng::seed_from_u64(seed);
    CategoricalNetwork::new(3, &[8], 2, 5, OptimizerWrapper::SGD(SGD::new()), 0.1, &mut rng).unwrap()
}

fn states() -> Array2<f32> {
    arr2(&[[0.1, -0.3, 0.5], [1.0, 0.0, -1.0], [0.0, 0.2, 0.2], [-0.7, 0.4, 0.9]])
}

#[test]
fn test_network_layout() {
    let network = small_network(1);
    assert_eq!(network.layers().len(), 2);
    assert_eq!(network.layers()[0].weights.shape(), [3, 8]);
    assert_eq!(network.layers()[1].weights.shape(), [8, 10]);
    assert_eq!(network.input_size(), 3);
    assert_eq!(network.num_actions(), 2);
    assert_eq!(network.n_atoms(), 5);
}

#[test]
fn test_predict_returns_distributions() {
    let network = small_network(2);
    let dists = network.predict(states().view()).unwrap();
    assert_eq!(dists.dim(), (4, 2, 5));
    for lane in dists.lanes(Axis(2)) {
        assert!((lane.sum() - 1.0).abs() < 1e-5);
        assert!(lane.iter().all(|&p| p >= 0.0));
    }
}

#[test]
fn test_predict_rejects_wrong_input_width() {
    let network = small_network(3);
    let wide = Array2::<f32>::zeros((2, 4));
    assert!(matches!(network.predict(wide.view()), Err(C51Error::ShapeMismatch { .. })));
}

#[test]
fn test_fit_reduces_cross_entropy() {
    let mut rng = StdRng::seed_from_u64(4);
    let mut network = CategoricalNetwork::new(
        3,
        &[16],
        2,
        5,
        OptimizerWrapper::Adam(Adam::default()),
        0.01,
        &mut rng,
    )
    .unwrap();

    let inputs = states();
    let mut targets = Array3::<f32>::zeros((4, 2, 5));
    for b in 0..4 {
        targets[[b, b % 2, b + 1]] = 1.0;
    }

    let first = network.fit(inputs.view(), targets.view(), None).unwrap();
    let mut last = first.clone();
    for _ in 0..200 {
        last = network.fit(inputs.view(), targets.view(), None).unwrap();
    }

    assert_eq!(first.sample_losses.len(), 4);
    assert!(last.loss < first.loss * 0.5, "loss went from {} to {}", first.loss, last.loss);
}

#[test]
fn test_fit_ignores_zero_target_rows() {
    let mut network = small_network(5);
    let inputs = states();
    let targets = Array3::<f32>::zeros((4, 2, 5));
    let before = network.get_weights();

    let output = network.fit(inputs.view(), targets.view(), None).unwrap();

    assert_eq!(output.loss, 0.0);
    assert_eq!(network.get_weights(), before);
}

#[test]
fn test_fit_checks_shapes() {
    let mut network = small_network(6);
    let inputs = states();
    let wrong_atoms = Array3::<f32>::zeros((4, 2, 6));
    assert!(matches!(
        network.fit(inputs.view(), wrong_atoms.view(), None),
        Err(C51Error::ShapeMismatch { .. })
    ));

    let targets = Array3::<f32>::zeros((4, 2, 5));
    let short_weights = ndarray::Array1::<f32>::ones(3);
    assert!(matches!(
        network.fit(inputs.view(), targets.view(), Some(short_weights.view())),
        Err(C51Error::ShapeMismatch { .. })
    ));
}

#[test]
fn test_sample_weights_scale_loss() {
    let mut a = small_network(7);
    let mut b = a.clone();
    let inputs = states();
    let mut targets = Array3::<f32>::zeros((4, 2, 5));
    targets.slice_mut(s![.., 0, 2]).fill(1.0);

    let unweighted = a.fit(inputs.view(), targets.view(), None).unwrap();
    let halves = ndarray::Array1::from_elem(4, 0.5);
    let weighted = b.fit(inputs.view(), targets.view(), Some(halves.view())).unwrap();

    assert!((weighted.loss - 0.5 * unweighted.loss).abs() < 1e-5);
    assert_eq!(weighted.sample_losses, unweighted.sample_losses);
}

#[test]
fn test_weight_transfer() {
    let source = small_network(8);
    let mut copy = small_network(9);
    let inputs = states();
    assert_ne!(source.predict(inputs.view()).unwrap(), copy.predict(inputs.view()).unwrap());

    copy.set_weights(&source.get_weights()).unwrap();
    assert_eq!(source.predict(inputs.view()).unwrap(), copy.predict(inputs.view()).unwrap());

    let mut rng = StdRng::seed_from_u64(10);
    let mut other =
        CategoricalNetwork::new(3, &[4], 2, 5, OptimizerWrapper::SGD(SGD::new()), 0.1, &mut rng).unwrap();
    assert!(matches!(
        other.set_weights(&source.get_weights()),
        Err(C51Error::ShapeMismatch { .. })
    ));
}

#[test]
fn test_checkpoint_roundtrip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("actor.bin");
    let network = small_network(11);

    network.save_checkpoint(&path).unwrap();
    let restored = CategoricalNetwork::load(&path).unwrap();

    let inputs = states();
    assert_eq!(network.predict(inputs.view()).unwrap(), restored.predict(inputs.view()).unwrap());
}

#[test]
fn test_from_config() {
    let config = AgentConfig {
        input_dim: vec![2, 3],
        action_dim: 3,
        n_atoms: 11,
        hidden_layers: vec![12, 6],
        hidden_activation: Activation::Tanh,
        optimizer: OptimizerConfig::Sgd,
        max_grad_norm: Some(1.0),
        ..AgentConfig::default()
    };
    let mut rng = StdRng::seed_from_u64(12);
    let network = CategoricalNetwork::from_config(&config, &mut rng).unwrap();

    assert_eq!(network.input_size(), 6);
    assert_eq!(network.layers().len(), 3);
    assert_eq!(network.layers()[2].output_size(), 33);
    assert_eq!(network.layers()[0].activation, Activation::Tanh);
    assert_eq!(network.layers()[2].activation, Activation::Linear);
}
