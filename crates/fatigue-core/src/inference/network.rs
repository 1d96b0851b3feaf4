//! Convolutional fatigue classifier.
//!
//! Three conv/pool/dropout stages followed by two dense layers, producing a
//! single logit per image. The sigmoid of that logit is the probability of
//! fatigue.

use anyhow::{ensure, Result};
use candle_core::{Module, Tensor};
use candle_nn::{conv2d, linear, Conv2d, Conv2dConfig, Dropout, Linear, VarBuilder};

use crate::preprocess::INPUT_CHANNELS;

/// Names of the weight groups stored in a model artifact.
pub const PARAMETER_GROUPS: [&str; 5] = ["conv1", "conv2", "conv3", "fc1", "fc2"];

const CONV_CHANNELS: [usize; 3] = [32, 64, 128];
const KERNEL: usize = 3;
const HIDDEN: usize = 512;
const CONV_DROPOUT: f32 = 0.25;
const DENSE_DROPOUT: f32 = 0.5;

/// Smallest input edge that survives three valid conv + pool stages.
pub const MIN_INPUT_SIZE: u32 = 22;

/// Fatigue CNN.
///
/// Input: `(N, 3, S, S)` in `[0, 1]`. Output: `(N, 1)` logits.
pub struct FatigueCnn {
    conv1: Conv2d,
    conv2: Conv2d,
    conv3: Conv2d,
    fc1: Linear,
    fc2: Linear,
    conv_dropout: Dropout,
    dense_dropout: Dropout,
    input_size: u32,
}

impl FatigueCnn {
    /// Builds the network from a `VarBuilder`.
    ///
    /// With a `VarMap`-backed builder this initializes fresh weights; with
    /// a tensor-backed builder it validates and binds stored weights.
    #[allow(clippy::needless_pass_by_value)]
    pub fn new(vb: VarBuilder, input_size: u32) -> Result<Self> {
        ensure!(
            input_size >= MIN_INPUT_SIZE,
            "input size {input_size} is below the minimum of {MIN_INPUT_SIZE}"
        );

        let cfg = Conv2dConfig::default();
        let conv1 = conv2d(INPUT_CHANNELS, CONV_CHANNELS[0], KERNEL, cfg, vb.pp("conv1"))?;
        let conv2 = conv2d(CONV_CHANNELS[0], CONV_CHANNELS[1], KERNEL, cfg, vb.pp("conv2"))?;
        let conv3 = conv2d(CONV_CHANNELS[1], CONV_CHANNELS[2], KERNEL, cfg, vb.pp("conv3"))?;

        // 256 -> 254 -> 127 -> 125 -> 62 -> 60 -> 30
        let side = feature_side(input_size as usize);
        let fc1 = linear(CONV_CHANNELS[2] * side * side, HIDDEN, vb.pp("fc1"))?;
        let fc2 = linear(HIDDEN, 1, vb.pp("fc2"))?;

        Ok(Self {
            conv1,
            conv2,
            conv3,
            fc1,
            fc2,
            conv_dropout: Dropout::new(CONV_DROPOUT),
            dense_dropout: Dropout::new(DENSE_DROPOUT),
            input_size,
        })
    }

    /// Edge length of the square input this network was built for.
    #[must_use]
    pub const fn input_size(&self) -> u32 {
        self.input_size
    }

    /// Forward pass returning logits; dropout is active when `train` is set.
    pub fn forward_t(&self, xs: &Tensor, train: bool) -> candle_core::Result<Tensor> {
        let xs = self.stage(&self.conv1, xs, train)?;
        let xs = self.stage(&self.conv2, &xs, train)?;
        let xs = self.stage(&self.conv3, &xs, train)?;

        let xs = xs.flatten_from(1)?;
        let xs = self.fc1.forward(&xs)?.relu()?;
        let xs = self.dense_dropout.forward(&xs, train)?;
        self.fc2.forward(&xs)
    }

    /// Fatigue probabilities of shape `(N, 1)`.
    pub fn probabilities(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        candle_nn::ops::sigmoid(&self.forward_t(xs, false)?)
    }

    fn stage(&self, conv: &Conv2d, xs: &Tensor, train: bool) -> candle_core::Result<Tensor> {
        let xs = conv.forward(xs)?.relu()?.max_pool2d(2)?;
        self.conv_dropout.forward(&xs, train)
    }
}

impl Module for FatigueCnn {
    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        self.forward_t(xs, false)
    }
}

/// Spatial edge after three `conv(3x3, valid) -> maxpool(2)` stages.
const fn feature_side(mut side: usize) -> usize {
    let mut stage = 0;
    while stage < 3 {
        side = (side - (KERNEL - 1)) / 2;
        stage += 1;
    }
    side
}
