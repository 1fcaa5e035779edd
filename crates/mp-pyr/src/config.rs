use mp_core::Error;
use serde::{Deserialize, Serialize};

use crate::kernel::GaussianKernel1D;
use crate::path::PathKind;

/// Largest binomial kernel accepted from configuration.
pub const MAX_BINOMIAL_TAPS: usize = 31;

/// Blur applied after each color downsample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlurKernel {
    /// Pascal-row weights; `taps = 5` is `[1 4 6 4 1] / 16`.
    Binomial { taps: usize },
    /// Sampled Gaussian with radius `ceil(3 * sigma)`.
    Gaussian { sigma: f32 },
}

impl Default for BlurKernel {
    fn default() -> Self {
        Self::Binomial { taps: 5 }
    }
}

impl BlurKernel {
    pub fn validate(&self) -> Result<(), Error> {
        match *self {
            Self::Binomial { taps } => {
                if !(3..=MAX_BINOMIAL_TAPS).contains(&taps) || taps % 2 == 0 {
                    return Err(Error::InvalidConfig(format!(
                        "binomial taps must be odd and within 3..={MAX_BINOMIAL_TAPS}, got {taps}"
                    )));
                }
            }
            Self::Gaussian { sigma } => {
                if !(sigma.is_finite() && sigma > 0.0) {
                    return Err(Error::InvalidConfig(format!(
                        "gaussian sigma must be finite and > 0, got {sigma}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Validates and builds the kernel weights.
    pub fn build(&self) -> Result<GaussianKernel1D, Error> {
        self.validate()?;
        Ok(match *self {
            Self::Binomial { taps } => GaussianKernel1D::binomial(taps),
            Self::Gaussian { sigma } => GaussianKernel1D::new(sigma),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MipGeneratorConfig {
    /// Record full-screen draws instead of compute dispatches.
    pub prefer_fragment_path: bool,
    /// One command covers all array slices; otherwise one command per slice.
    pub use_texture_array: bool,
    pub blur: BlurKernel,
}

impl Default for MipGeneratorConfig {
    fn default() -> Self {
        Self {
            prefer_fragment_path: true,
            use_texture_array: true,
            blur: BlurKernel::default(),
        }
    }
}

impl MipGeneratorConfig {
    pub fn from_json_str(json: &str) -> Result<Self, Error> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(self).map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), Error> {
        self.blur.validate()
    }

    pub fn path_kind(&self) -> PathKind {
        if self.prefer_fragment_path {
            PathKind::Fragment
        } else {
            PathKind::Compute
        }
    }
}

#[cfg(test)]
mod tests {
    use mp_core::Error;

    use crate::config::{BlurKernel, MipGeneratorConfig};
    use crate::path::PathKind;

    #[test]
    fn defaults_prefer_fragment_and_texture_arrays() {
        let config = MipGeneratorConfig::default();
        assert!(config.prefer_fragment_path);
        assert!(config.use_texture_array);
        assert_eq!(config.blur, BlurKernel::Binomial { taps: 5 });
        assert_eq!(config.path_kind(), PathKind::Fragment);
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config = MipGeneratorConfig::from_json_str(
            r#"{ "prefer_fragment_path": false, "blur": { "kind": "gaussian", "sigma": 1.5 } }"#,
        )
        .expect("valid config");
        assert_eq!(config.path_kind(), PathKind::Compute);
        assert!(config.use_texture_array);
        assert_eq!(config.blur, BlurKernel::Gaussian { sigma: 1.5 });

        let empty = MipGeneratorConfig::from_json_str("{}").expect("valid config");
        assert_eq!(empty, MipGeneratorConfig::default());
    }

    #[test]
    fn json_round_trips_through_to_json_string() {
        let config = MipGeneratorConfig {
            prefer_fragment_path: false,
            use_texture_array: false,
            blur: BlurKernel::Binomial { taps: 9 },
        };
        let json = config.to_json_string().expect("serialize");
        assert!(json.contains(r#""kind": "binomial""#));
        assert_eq!(MipGeneratorConfig::from_json_str(&json).expect("parse"), config);
    }

    #[test]
    fn bad_kernels_are_rejected() {
        for json in [
            r#"{ "blur": { "kind": "binomial", "taps": 4 } }"#,
            r#"{ "blur": { "kind": "binomial", "taps": 1 } }"#,
            r#"{ "blur": { "kind": "binomial", "taps": 33 } }"#,
            r#"{ "blur": { "kind": "gaussian", "sigma": 0.0 } }"#,
            r#"{ "blur": { "kind": "gaussian", "sigma": -2.0 } }"#,
            r#"{ "blur": { "kind": "box" } }"#,
            "not json",
        ] {
            assert!(
                matches!(MipGeneratorConfig::from_json_str(json), Err(Error::InvalidConfig(_))),
                "accepted {json}"
            );
        }
    }

    #[test]
    fn build_produces_the_configured_kernel() {
        let kernel = BlurKernel::Binomial { taps: 7 }.build().expect("kernel");
        assert_eq!(kernel.taps(), 7);
        let kernel = BlurKernel::Gaussian { sigma: 0.5 }.build().expect("kernel");
        assert_eq!(kernel.radius, 2);
        assert!(BlurKernel::Binomial { taps: 2 }.build().is_err());
    }
}
