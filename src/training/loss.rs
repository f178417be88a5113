//! Classification loss and metrics over raw logits.

use burn::tensor::{Int, Tensor, activation::log_softmax, backend::Backend};

/// Mean softmax cross-entropy between logits and (one-hot or soft) labels.
///
/// Computed as `-sum(labels * log_softmax(logits))` per example, averaged
/// over the batch. Returns a single-element tensor.
pub fn softmax_cross_entropy<B: Backend>(
    logits: Tensor<B, 2>,
    labels: Tensor<B, 2>,
) -> Tensor<B, 1> {
    let log_probs = log_softmax(logits, 1);
    (labels * log_probs).sum_dim(1).neg().mean()
}

/// Fraction of examples whose arg-max logit matches the arg-max label.
pub fn accuracy<B: Backend>(logits: Tensor<B, 2>, labels: Tensor<B, 2>) -> Tensor<B, 1> {
    logits
        .argmax(1)
        .equal(labels.argmax(1))
        .float()
        .mean()
}

/// Arg-max class index per example, shape `[batch]`.
pub fn predictions<B: Backend>(logits: Tensor<B, 2>) -> Tensor<B, 1, Int> {
    let [batch, _] = logits.dims();
    logits.argmax(1).reshape([batch])
}
