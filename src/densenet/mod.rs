//! DenseNet topology: configuration, dense blocks, transitions and the
//! assembled network.

pub mod block;
pub mod config;
pub mod network;
pub mod transition;

pub use block::{DenseBlock, DenseBlockConfig};
pub use config::{ChannelPlan, DenseNetConfig, StagePlan};
pub use network::{DenseNetwork, DenseStage};
pub use transition::{Transition, TransitionConfig};
