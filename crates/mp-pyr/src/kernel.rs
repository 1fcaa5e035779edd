use std::sync::Arc;

/// Symmetric, normalized 1D blur kernel.
///
/// Conventions:
/// - `weights.len() == 2 * radius + 1`, centered on `weights[radius]`.
/// - `sum(weights) ~= 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianKernel1D {
    pub sigma: f32,
    pub radius: usize,
    pub weights: Vec<f32>,
}

impl GaussianKernel1D {
    /// Sampled Gaussian with `radius = ceil(3*sigma)`, minimum 1.
    pub fn new(sigma: f32) -> Self {
        assert!(
            sigma.is_finite() && sigma > 0.0,
            "sigma must be > 0 and finite"
        );

        let radius = ((3.0 * sigma).ceil() as usize).max(1);
        let sigma2 = sigma * sigma;
        let weights = (0..2 * radius + 1)
            .map(|i| {
                let x = i as f32 - radius as f32;
                (-(x * x) / (2.0 * sigma2)).exp()
            })
            .collect();

        Self::normalized(sigma, radius, weights)
    }

    /// Binomial approximation of a Gaussian; `taps = 5` gives `[1 4 6 4 1] / 16`.
    pub fn binomial(taps: usize) -> Self {
        assert!(
            taps >= 3 && taps % 2 == 1,
            "binomial tap count must be odd and >= 3"
        );

        let n = taps - 1;
        let mut row = vec![1.0f32; taps];
        for k in 1..n {
            row[k] = row[k - 1] * (n - k + 1) as f32 / k as f32;
        }

        Self::normalized((n as f32).sqrt() * 0.5, n / 2, row)
    }

    fn normalized(sigma: f32, radius: usize, mut weights: Vec<f32>) -> Self {
        let sum: f32 = weights.iter().sum();
        for w in &mut weights {
            *w /= sum;
        }
        Self {
            sigma,
            radius,
            weights,
        }
    }

    pub fn taps(&self) -> usize {
        self.weights.len()
    }

    /// Folds adjacent weight pairs into single bilinear fetches.
    ///
    /// A fetch at fractional offset `o` between texels `k` and `k + 1`
    /// returns `(w_k * p_k + w_k1 * p_k1) / (w_k + w_k1)`, so the pair costs one
    /// sample instead of two. An unpaired outermost weight stays at its
    /// integer offset.
    pub fn linear_taps(&self) -> Vec<LinearTap> {
        let r = self.radius;
        let w = &self.weights;
        let mut taps = vec![LinearTap {
            offset: 0.0,
            weight: w[r],
        }];

        let mut k = 1;
        while k <= r {
            let tap = if k < r {
                let (wa, wb) = (w[r + k], w[r + k + 1]);
                let weight = wa + wb;
                LinearTap {
                    offset: (k as f32 * wa + (k + 1) as f32 * wb) / weight,
                    weight,
                }
            } else {
                LinearTap {
                    offset: k as f32,
                    weight: w[r + k],
                }
            };
            taps.push(tap);
            taps.push(LinearTap {
                offset: -tap.offset,
                weight: tap.weight,
            });
            k += 2;
        }

        taps
    }
}

/// One bilinear fetch of a folded blur kernel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearTap {
    pub offset: f32,
    pub weight: f32,
}

/// Kernel data prepared once for both pyramid paths.
#[derive(Debug, Clone)]
pub struct BlurTaps {
    pub radius: usize,
    pub weights: Arc<[f32]>,
    pub linear: Arc<[LinearTap]>,
}

impl From<&GaussianKernel1D> for BlurTaps {
    fn from(kernel: &GaussianKernel1D) -> Self {
        Self {
            radius: kernel.radius,
            weights: kernel.weights.clone().into(),
            linear: kernel.linear_taps().into(),
        }
    }
}
