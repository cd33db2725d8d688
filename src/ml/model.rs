// ============================================================
// Layer 5 — FCN8s Network
// ============================================================
// VGG16 backbone with its classifier turned into convolutions
// (fc6 7x7, fc7 1x1), plus the three-stream FCN8s decoder:
//
//   pool5 → fc6 → fc7 → score_fr ─► upscore2 (x2)
//                                      + crop(score_pool4(pool4), 5)
//                                   ─► upscore_pool4 (x2)
//                                      + crop(score_pool3(pool3), 9)
//                                   ─► upscore8 (x8) → crop(31) → [N, C, H, W]
//
// conv1_1 pads by 100 and pooling rounds up, so any input size
// survives the 32x downsampling and the final crop lands back
// on exactly H x W.
//
// Input is NHWC (the preprocessor's layout); it is permuted to
// NCHW on entry.
//
// Reference: Long, Shelhamer & Darrell (2015) FCN
//            Burn Book §3 (Building Blocks)

use burn::{
    module::Param,
    nn::{
        conv::{Conv2d, Conv2dConfig, ConvTranspose2d, ConvTranspose2dConfig},
        loss::CrossEntropyLossConfig,
        pool::{MaxPool2d, MaxPool2dConfig},
        Dropout, DropoutConfig, PaddingConfig2d,
    },
    prelude::*,
    tensor::activation::relu,
};

/// Every parameterised layer, in forward order.
pub const LAYER_NAMES: [&str; 21] = [
    "conv1_1", "conv1_2",
    "conv2_1", "conv2_2",
    "conv3_1", "conv3_2", "conv3_3",
    "conv4_1", "conv4_2", "conv4_3",
    "conv5_1", "conv5_2", "conv5_3",
    "fc6", "fc7", "score_fr",
    "upscore2", "score_pool4",
    "upscore_pool4", "score_pool3",
    "upscore8",
];

#[derive(Config, Debug)]
pub struct Fcn8sConfig {
    pub num_classes: usize,
    /// Channels of the first VGG block; later blocks use 2x, 4x, 8x, 8x
    #[config(default = 64)]
    pub base_width: usize,
    /// Channels of fc6 and fc7
    #[config(default = 4096)]
    pub fc_width: usize,
    /// Dropout after fc6 and fc7 while training
    #[config(default = 0.5)]
    pub dropout: f64,
}

impl Fcn8sConfig {
    pub fn widths(&self) -> [usize; 5] {
        let b = self.base_width;
        [b, 2 * b, 4 * b, 8 * b, 8 * b]
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Fcn8s<B> {
        let [w1, w2, w3, w4, w5] = self.widths();
        let (fc, classes) = (self.fc_width, self.num_classes);

        let conv3 = |c_in: usize, c_out: usize| -> Conv2d<B> {
            Conv2dConfig::new([c_in, c_out], [3, 3])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .init(device)
        };
        let conv1x1 = |c_in: usize, c_out: usize| -> Conv2d<B> {
            Conv2dConfig::new([c_in, c_out], [1, 1]).init(device)
        };
        let upsample = |kernel: usize, stride: usize| -> ConvTranspose2d<B> {
            ConvTranspose2dConfig::new([classes, classes], [kernel, kernel])
                .with_stride([stride, stride])
                .with_bias(false)
                .init(device)
        };

        Fcn8s {
            conv1_1: Conv2dConfig::new([3, w1], [3, 3])
                .with_padding(PaddingConfig2d::Explicit(100, 100))
                .init(device),
            conv1_2: conv3(w1, w1),

            conv2_1: conv3(w1, w2),
            conv2_2: conv3(w2, w2),

            conv3_1: conv3(w2, w3),
            conv3_2: conv3(w3, w3),
            conv3_3: conv3(w3, w3),

            conv4_1: conv3(w3, w4),
            conv4_2: conv3(w4, w4),
            conv4_3: conv3(w4, w4),

            conv5_1: conv3(w4, w5),
            conv5_2: conv3(w5, w5),
            conv5_3: conv3(w5, w5),

            fc6:      Conv2dConfig::new([w5, fc], [7, 7]).init(device),
            fc7:      conv1x1(fc, fc),
            score_fr: conv1x1(fc, classes),

            upscore2:      upsample(4, 2),
            score_pool4:   conv1x1(w4, classes),
            upscore_pool4: upsample(4, 2),
            score_pool3:   conv1x1(w3, classes),
            upscore8:      upsample(16, 8),

            pool:    MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            dropout: DropoutConfig::new(self.dropout).init(),
            num_classes: classes,
        }
    }
}

#[derive(Module, Debug)]
pub struct Fcn8s<B: Backend> {
    pub conv1_1: Conv2d<B>,
    pub conv1_2: Conv2d<B>,
    pub conv2_1: Conv2d<B>,
    pub conv2_2: Conv2d<B>,
    pub conv3_1: Conv2d<B>,
    pub conv3_2: Conv2d<B>,
    pub conv3_3: Conv2d<B>,
    pub conv4_1: Conv2d<B>,
    pub conv4_2: Conv2d<B>,
    pub conv4_3: Conv2d<B>,
    pub conv5_1: Conv2d<B>,
    pub conv5_2: Conv2d<B>,
    pub conv5_3: Conv2d<B>,
    pub fc6:      Conv2d<B>,
    pub fc7:      Conv2d<B>,
    pub score_fr: Conv2d<B>,
    pub upscore2:      ConvTranspose2d<B>,
    pub score_pool4:   Conv2d<B>,
    pub upscore_pool4: ConvTranspose2d<B>,
    pub score_pool3:   Conv2d<B>,
    pub upscore8:      ConvTranspose2d<B>,
    pub pool:        MaxPool2d,
    pub dropout:     Dropout,
    pub num_classes: usize,
}

/// A mutable handle on one named layer's parameters.
pub enum LayerMut<'a, B: Backend> {
    Conv(&'a mut Conv2d<B>),
    Deconv(&'a mut ConvTranspose2d<B>),
}

impl<B: Backend> LayerMut<'_, B> {
    pub fn weight_dims(&self) -> [usize; 4] {
        match self {
            LayerMut::Conv(c)   => c.weight.val().dims(),
            LayerMut::Deconv(d) => d.weight.val().dims(),
        }
    }

    pub fn bias_dims(&self) -> Option<[usize; 1]> {
        match self {
            LayerMut::Conv(c)   => c.bias.as_ref().map(|b| b.val().dims()),
            LayerMut::Deconv(d) => d.bias.as_ref().map(|b| b.val().dims()),
        }
    }

    pub fn set_weight(&mut self, weight: Tensor<B, 4>) {
        match self {
            LayerMut::Conv(c)   => c.weight = Param::from_tensor(weight),
            LayerMut::Deconv(d) => d.weight = Param::from_tensor(weight),
        }
    }

    /// Only layers built with a bias accept one.
    pub fn set_bias(&mut self, bias: Tensor<B, 1>) -> bool {
        let slot = match self {
            LayerMut::Conv(c)   => &mut c.bias,
            LayerMut::Deconv(d) => &mut d.bias,
        };
        match slot {
            Some(existing) => {
                *existing = Param::from_tensor(bias);
                true
            }
            None => false,
        }
    }
}

/// Snapshot of one layer's current parameter values.
pub struct LayerParams<B: Backend> {
    pub weight: Tensor<B, 4>,
    pub bias:   Option<Tensor<B, 1>>,
}

impl<B: Backend> LayerParams<B> {
    fn conv(c: &Conv2d<B>) -> Self {
        Self { weight: c.weight.val(), bias: c.bias.as_ref().map(|b| b.val()) }
    }

    fn deconv(d: &ConvTranspose2d<B>) -> Self {
        Self { weight: d.weight.val(), bias: d.bias.as_ref().map(|b| b.val()) }
    }
}

impl<B: Backend> Fcn8s<B> {
    /// images: [N, H, W, 3] → scores: [N, num_classes, H, W]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 4> {
        let [_, height, width, _] = images.dims();
        let x = images.permute([0, 3, 1, 2]);

        // ── VGG16 backbone ────────────────────────────────────────────────────
        let x     = self.conv_relu(&self.conv1_1, x);
        let x     = self.conv_relu(&self.conv1_2, x);
        let pool1 = self.pool_ceil(x);

        let x     = self.conv_relu(&self.conv2_1, pool1);
        let x     = self.conv_relu(&self.conv2_2, x);
        let pool2 = self.pool_ceil(x);

        let x     = self.conv_relu(&self.conv3_1, pool2);
        let x     = self.conv_relu(&self.conv3_2, x);
        let x     = self.conv_relu(&self.conv3_3, x);
        let pool3 = self.pool_ceil(x);

        let x     = self.conv_relu(&self.conv4_1, pool3.clone());
        let x     = self.conv_relu(&self.conv4_2, x);
        let x     = self.conv_relu(&self.conv4_3, x);
        let pool4 = self.pool_ceil(x);

        let x     = self.conv_relu(&self.conv5_1, pool4.clone());
        let x     = self.conv_relu(&self.conv5_2, x);
        let x     = self.conv_relu(&self.conv5_3, x);
        let pool5 = self.pool_ceil(x);

        // ── Convolutionalised classifier ──────────────────────────────────────
        let x        = self.dropout.forward(self.conv_relu(&self.fc6, pool5));
        let x        = self.dropout.forward(self.conv_relu(&self.fc7, x));
        let score_fr = self.score_fr.forward(x);

        // ── Skip fusion and upsampling ────────────────────────────────────────
        let upscore2   = self.upscore2.forward(score_fr);
        let [_, _, h, w] = upscore2.dims();
        let fuse_pool4 = upscore2 + crop(self.score_pool4.forward(pool4), 5, h, w);

        let upscore_pool4 = self.upscore_pool4.forward(fuse_pool4);
        let [_, _, h, w]  = upscore_pool4.dims();
        let fuse_pool3    = upscore_pool4 + crop(self.score_pool3.forward(pool3), 9, h, w);

        crop(self.upscore8.forward(fuse_pool3), 31, height, width)
    }

    /// Mean softmax cross-entropy over every pixel of the batch.
    /// masks: [N, H, W] class indices.
    pub fn forward_loss(
        &self,
        images: Tensor<B, 4>,
        masks:  Tensor<B, 3, Int>,
    ) -> (Tensor<B, 1>, Tensor<B, 4>) {
        let scores       = self.forward(images);
        let [n, c, h, w] = scores.dims();

        let logits  = scores.clone().permute([0, 2, 3, 1]).reshape([n * h * w, c]);
        let targets = masks.reshape([n * h * w]);

        let ce   = CrossEntropyLossConfig::new().init(&logits.device());
        let loss = ce.forward(logits, targets);
        (loss, scores)
    }

    /// Per-pixel argmax: [N, H, W, 3] → [N, H, W]
    pub fn predict(&self, images: Tensor<B, 4>) -> Tensor<B, 3, Int> {
        let scores       = self.forward(images);
        let [n, _, h, w] = scores.dims();
        scores.argmax(1).reshape([n, h, w])
    }

    pub fn layer_mut(&mut self, name: &str) -> Option<LayerMut<'_, B>> {
        use LayerMut::{Conv, Deconv};
        Some(match name {
            "conv1_1"       => Conv(&mut self.conv1_1),
            "conv1_2"       => Conv(&mut self.conv1_2),
            "conv2_1"       => Conv(&mut self.conv2_1),
            "conv2_2"       => Conv(&mut self.conv2_2),
            "conv3_1"       => Conv(&mut self.conv3_1),
            "conv3_2"       => Conv(&mut self.conv3_2),
            "conv3_3"       => Conv(&mut self.conv3_3),
            "conv4_1"       => Conv(&mut self.conv4_1),
            "conv4_2"       => Conv(&mut self.conv4_2),
            "conv4_3"       => Conv(&mut self.conv4_3),
            "conv5_1"       => Conv(&mut self.conv5_1),
            "conv5_2"       => Conv(&mut self.conv5_2),
            "conv5_3"       => Conv(&mut self.conv5_3),
            "fc6"           => Conv(&mut self.fc6),
            "fc7"           => Conv(&mut self.fc7),
            "score_fr"      => Conv(&mut self.score_fr),
            "upscore2"      => Deconv(&mut self.upscore2),
            "score_pool4"   => Conv(&mut self.score_pool4),
            "upscore_pool4" => Deconv(&mut self.upscore_pool4),
            "score_pool3"   => Conv(&mut self.score_pool3),
            "upscore8"      => Deconv(&mut self.upscore8),
            _ => return None,
        })
    }

    /// Shape of every parameter, keyed `<layer>.weight` / `<layer>.bias`.
    pub fn param_shapes(&self) -> Vec<(String, Vec<usize>)> {
        let mut shapes = Vec::new();
        for name in LAYER_NAMES {
            let Some(p) = self.layer_params(name) else { continue };
            shapes.push((format!("{name}.weight"), p.weight.dims().to_vec()));
            if let Some(bias) = p.bias {
                shapes.push((format!("{name}.bias"), bias.dims().to_vec()));
            }
        }
        shapes
    }

    pub fn layer_params(&self, name: &str) -> Option<LayerParams<B>> {
        Some(match name {
            "conv1_1"       => LayerParams::conv(&self.conv1_1),
            "conv1_2"       => LayerParams::conv(&self.conv1_2),
            "conv2_1"       => LayerParams::conv(&self.conv2_1),
            "conv2_2"       => LayerParams::conv(&self.conv2_2),
            "conv3_1"       => LayerParams::conv(&self.conv3_1),
            "conv3_2"       => LayerParams::conv(&self.conv3_2),
            "conv3_3"       => LayerParams::conv(&self.conv3_3),
            "conv4_1"       => LayerParams::conv(&self.conv4_1),
            "conv4_2"       => LayerParams::conv(&self.conv4_2),
            "conv4_3"       => LayerParams::conv(&self.conv4_3),
            "conv5_1"       => LayerParams::conv(&self.conv5_1),
            "conv5_2"       => LayerParams::conv(&self.conv5_2),
            "conv5_3"       => LayerParams::conv(&self.conv5_3),
            "fc6"           => LayerParams::conv(&self.fc6),
            "fc7"           => LayerParams::conv(&self.fc7),
            "score_fr"      => LayerParams::conv(&self.score_fr),
            "upscore2"      => LayerParams::deconv(&self.upscore2),
            "score_pool4"   => LayerParams::conv(&self.score_pool4),
            "upscore_pool4" => LayerParams::deconv(&self.upscore_pool4),
            "score_pool3"   => LayerParams::conv(&self.score_pool3),
            "upscore8"      => LayerParams::deconv(&self.upscore8),
            _ => return None,
        })
    }

    fn conv_relu(&self, conv: &Conv2d<B>, x: Tensor<B, 4>) -> Tensor<B, 4> {
        relu(conv.forward(x))
    }

    /// 2x2/2 max pooling that rounds odd sizes up.
    /// Inputs are post-ReLU (>= 0), so a zero row/column never wins a window.
    fn pool_ceil(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let [n, c, h, w] = x.dims();
        let device = x.device();

        let x = if h % 2 == 1 {
            Tensor::cat(vec![x, Tensor::zeros([n, c, 1, w], &device)], 2)
        } else {
            x
        };
        let h = h + h % 2;
        let x = if w % 2 == 1 {
            Tensor::cat(vec![x, Tensor::zeros([n, c, h, 1], &device)], 3)
        } else {
            x
        };
        self.pool.forward(x)
    }
}

/// Spatial crop of an NCHW tensor starting at (offset, offset).
fn crop<B: Backend>(x: Tensor<B, 4>, offset: usize, height: usize, width: usize) -> Tensor<B, 4> {
    let [n, c, _, _] = x.dims();
    x.slice([0..n, 0..c, offset..offset + height, offset..offset + width])
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn tiny_config() -> Fcn8sConfig {
        Fcn8sConfig::new(2).with_base_width(2).with_fc_width(4)
    }

    #[test]
    fn test_scores_keep_input_size() {
        let device = Default::default();
        let model  = tiny_config().init::<TestBackend>(&device);

        for (h, w) in [(2, 2), (5, 3), (33, 40)] {
            let images = Tensor::<TestBackend, 4>::zeros([1, h, w, 3], &device);
            assert_eq!(model.forward(images).dims(), [1, 2, h, w]);
        }
    }

    #[test]
    fn test_predict_shape_and_range() {
        let device = Default::default();
        let model  = tiny_config().init::<TestBackend>(&device);
        let images = Tensor::<TestBackend, 4>::ones([2, 3, 4, 3], &device);

        let labels = model.predict(images);
        assert_eq!(labels.dims(), [2, 3, 4]);
        let values = labels.into_data().convert::<i64>().to_vec::<i64>().unwrap();
        assert!(values.iter().all(|&v| v == 0 || v == 1));
    }

    #[test]
    fn test_every_layer_name_resolves() {
        let device    = Default::default();
        let mut model = tiny_config().init::<TestBackend>(&device);
        for name in LAYER_NAMES {
            assert!(model.layer_params(name).is_some(), "{name}");
            assert!(model.layer_mut(name).is_some(), "{name}");
        }
        assert!(model.layer_mut("conv6_1").is_none());
    }

    #[test]
    fn test_upsampling_layers_have_no_bias() {
        let device    = Default::default();
        let mut model = tiny_config().init::<TestBackend>(&device);
        for name in ["upscore2", "upscore_pool4", "upscore8"] {
            let mut layer = model.layer_mut(name).unwrap();
            assert!(layer.bias_dims().is_none());
            assert!(!layer.set_bias(Tensor::zeros([2], &device)));
        }
        assert_eq!(model.layer_mut("fc6").unwrap().weight_dims(), [4, 16, 7, 7]);
        assert_eq!(model.layer_mut("upscore8").unwrap().weight_dims(), [2, 2, 16, 16]);
    }

    #[test]
    fn test_pool_rounds_up() {
        let device = Default::default();
        let model  = tiny_config().init::<TestBackend>(&device);
        let x      = Tensor::<TestBackend, 4>::ones([1, 1, 5, 3], &device);
        assert_eq!(model.pool_ceil(x).dims(), [1, 1, 3, 2]);
    }
}
