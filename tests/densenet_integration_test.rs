//! End-to-end tests of the DenseNet classifier on the CPU backend.

use burn::backend::{Autodiff, NdArray};
use burn::tensor::{Distribution, Tensor, activation::softmax, backend::Backend};
use densenet::prelude::*;

type TrainingBackend = Autodiff<NdArray>;

fn device() -> <TrainingBackend as Backend>::Device {
    Default::default()
}

fn random_images(batch: usize) -> Tensor<TrainingBackend, 4> {
    Tensor::random([batch, 28, 28, 1], Distribution::Uniform(0.0, 1.0), &device())
}

fn one_hot(classes: &[usize]) -> Tensor<TrainingBackend, 2> {
    let mut data = vec![0.0f32; classes.len() * 10];
    for (row, class) in classes.iter().enumerate() {
        data[row * 10 + class] = 1.0;
    }
    Tensor::<TrainingBackend, 1>::from_floats(data.as_slice(), &device()).reshape([classes.len(), 10])
}

#[test]
fn test_default_network_logits_shape() {
    let model = DenseNetModel::<TrainingBackend>::new(DenseNetConfig::default(), &device())
        .expect("Model build should succeed");

    let logits = model.logits(random_images(4)).unwrap();
    assert_eq!(logits.dims(), [4, 10]);
}

#[test]
fn test_default_network_structure() {
    let config = DenseNetConfig::default();
    let network: DenseNetwork<TrainingBackend> = config.build_network(&device()).unwrap();

    let depths: Vec<Option<usize>> = network
        .stages()
        .iter()
        .map(|stage| stage.transition().map(|t| t.output_depth()))
        .collect();
    assert_eq!(depths, vec![Some(144), Some(192), None]);
    assert_eq!(network.final_norm().num_features(), 432);
    assert_eq!(network.classifier().input_size(), 432);
    assert_eq!(network.classifier().output_size(), 10);
}

#[test]
fn test_fetches_are_in_range() {
    let model = DenseNetModel::<TrainingBackend>::new(DenseNetConfig::small(), &device()).unwrap();

    let fetches = model
        .evaluate(random_images(4), one_hot(&[0, 3, 7, 9]))
        .unwrap();

    assert_eq!(fetches.predictions.len(), 4);
    assert!(fetches.predictions.iter().all(|&class| class <= 9));
    assert!((0.0..=1.0).contains(&fetches.accuracy));
    assert!(fetches.loss >= 0.0);
    assert!(fetches.loss.is_finite());

    let predictions = model.predictions(random_images(4)).unwrap();
    assert_eq!(predictions.dims(), [4]);
}

#[test]
fn test_train_step_updates_weights_and_statistics() {
    let mut model =
        DenseNetModel::<TrainingBackend>::new(DenseNetConfig::small(), &device()).unwrap();

    let weights_before = model.network().classifier().weights_to_vec();
    let mean_before = model.network().final_norm().running_mean();

    model
        .train_step(random_images(4), one_hot(&[1, 2, 3, 4]))
        .unwrap();

    let weights_after = model.network().classifier().weights_to_vec();
    let mean_after = model.network().final_norm().running_mean();

    assert_eq!(model.global_step(), 1);
    assert_ne!(weights_before, weights_after);
    assert_ne!(mean_before, mean_after);
}

#[test]
fn test_statistics_move_without_gradient() {
    let config = DenseNetConfig::small().dropout(0.0);
    let mut model = DenseNetModel::<TrainingBackend>::new(config, &device()).unwrap();
    let images = random_images(4);

    // Labels equal to the model's own softmax give a zero cross-entropy
    // gradient with respect to the logits.
    let logits = model.logits(images.clone()).unwrap();
    let labels = softmax(logits, 1).detach();
    let mean_before = model.network().final_norm().running_mean();

    let fetches = model.train_step(images, labels).unwrap();

    assert!(fetches.loss.is_finite());
    assert_eq!(model.global_step(), 1);
    assert_ne!(model.network().final_norm().running_mean(), mean_before);
}

#[test]
fn test_evaluate_does_not_move_statistics() {
    let model = DenseNetModel::<TrainingBackend>::new(DenseNetConfig::small(), &device()).unwrap();
    let mean_before = model.network().final_norm().running_mean();

    for _ in 0..3 {
        model
            .evaluate(random_images(4), one_hot(&[0, 1, 2, 3]))
            .unwrap();
    }

    assert_eq!(model.network().final_norm().running_mean(), mean_before);
    assert_eq!(model.global_step(), 0);
}

#[test]
fn test_global_step_counts_updates() {
    let mut model =
        DenseNetModel::<TrainingBackend>::new(DenseNetConfig::small(), &device()).unwrap();
    let labels = one_hot(&[0, 1]);

    for step in 1..=10u64 {
        let fetches = model.train_step(random_images(2), labels.clone()).unwrap();
        assert!(fetches.loss.is_finite());
        assert_eq!(model.global_step(), step);
    }
}

#[test]
fn test_inference_mode_is_deterministic() {
    let config = DenseNetConfig::small().trainable(false);
    let model = DenseNetModel::<TrainingBackend>::new(config, &device()).unwrap();
    let images = random_images(3);

    let first: Vec<f32> = model.logits(images.clone()).unwrap().to_data().to_vec().unwrap();
    let second: Vec<f32> = model.logits(images).unwrap().to_data().to_vec().unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_rejected_batch_leaves_model_unchanged() {
    let mut model =
        DenseNetModel::<TrainingBackend>::new(DenseNetConfig::small(), &device()).unwrap();
    let mean_before = model.network().final_norm().running_mean();
    let weights_before = model.network().classifier().weights_to_vec();

    let result = model.train_step(random_images(4), one_hot(&[1, 2]));

    assert!(matches!(
        result,
        Err(ModelError::ShapeMismatch { what: "labels", .. })
    ));
    assert_eq!(model.global_step(), 0);
    assert_eq!(model.network().final_norm().running_mean(), mean_before);
    assert_eq!(model.network().classifier().weights_to_vec(), weights_before);

    let empty = Tensor::<TrainingBackend, 4>::zeros([0, 28, 28, 1], &device());
    let labels = Tensor::<TrainingBackend, 2>::zeros([0, 10], &device());
    assert!(matches!(
        model.train_step(empty, labels),
        Err(ModelError::EmptyBatch)
    ));
    assert_eq!(model.global_step(), 0);
}

#[test]
fn test_config_file_roundtrip_builds_same_topology() {
    let path = std::env::temp_dir().join(format!("densenet_it_{}.json", std::process::id()));
    let config = DenseNetConfig::small().num_classes(5);
    config.save(&path).unwrap();

    let loaded = DenseNetConfig::load(&path).unwrap();
    let _ = std::fs::remove_file(&path);

    let network: DenseNetwork<TrainingBackend> = loaded.build_network(&device()).unwrap();
    assert_eq!(network.num_classes(), 5);
}
