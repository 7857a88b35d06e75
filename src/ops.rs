// src/ops.rs
//
// Enhancement operations.
// These are cheap to create and store - the expensive work happens in the pipeline.

use crate::error::{LunarzError, Result};
use bitflags::bitflags;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Exclusive lower bound of the gamma domain `(0.1, 5.0]`.
pub const GAMMA_MIN_EXCLUSIVE: f32 = 0.1;
pub const GAMMA_MAX: f32 = 5.0;

/// Exclusive lower bound of the linear-adjustment factor domain `(0.1, 2.0]`.
pub const FACTOR_MIN_EXCLUSIVE: f32 = 0.1;
pub const FACTOR_MAX: f32 = 2.0;

pub const DENOISE_MAX_STRENGTH: f32 = 100.0;
pub const UNSHARP_MAX_RADIUS: f32 = 50.0;
pub const UNSHARP_MAX_AMOUNT: f32 = 10.0;

/// Largest derivative kernel for Sobel/Laplacian.
pub const MAX_DERIVATIVE_KERNEL: u32 = 31;
/// Largest smoothing window for blur/median/pre-blur.
pub const MAX_SMOOTHING_KERNEL: u32 = 99;

/// Image operations understood by the pipeline.
///
/// Closed set: adding an operator means adding a variant plus its
/// contract, never a new string branch.
#[derive(Clone, Debug, PartialEq)]
pub enum Operation {
    /// Edge-preserving noise removal, strength in [0, 100]
    Denoise { strength: f32 },

    /// Equalize the luma histogram. Always produces a grayscale buffer.
    EqualizeHistogram,

    /// `255 * (v / 255) ^ gamma`, gamma in (0.1, 5.0]
    Gamma { gamma: f32 },

    /// `v + amount * (v - blur(v))`, skipped where the difference is below `threshold`
    UnsharpMask {
        radius: f32,
        amount: f32,
        threshold: u8,
    },

    /// Edge magnitude map. Always produces a grayscale buffer.
    EdgeDetect {
        method: EdgeMethod,
        /// Gaussian pre-blur kernel size (odd), applied before gradients
        pre_blur: Option<u32>,
    },

    /// Brightness/contrast/sharpness/saturation, factor in (0.1, 2.0]
    Adjust { kind: Adjustment, factor: f32 },

    /// Gaussian blur with an odd kernel size
    GaussianBlur { kernel_size: u32 },

    /// Median filter with an odd square window
    MedianFilter { kernel_size: u32 },
}

/// Edge detection methods.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EdgeMethod {
    /// Hysteresis thresholds: non-negative, `low < high`
    Canny { low: f32, high: f32 },
    /// Gradient magnitude, odd kernel size >= 3
    Sobel { kernel_size: u32 },
    /// Second-derivative magnitude, odd kernel size >= 1
    Laplacian { kernel_size: u32 },
}

/// Name-only view of [`EdgeMethod`], for parsing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EdgeMethodKind {
    Canny,
    Sobel,
    Laplacian,
}

impl FromStr for EdgeMethodKind {
    type Err = LunarzError;

    fn from_str(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "canny" => Ok(Self::Canny),
            "sobel" => Ok(Self::Sobel),
            "laplacian" => Ok(Self::Laplacian),
            _ => Err(LunarzError::unknown_edge_method(name.to_string())),
        }
    }
}

/// Parameters shared by every edge method; each method reads what it needs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeOptions {
    pub low_threshold: f32,
    pub high_threshold: f32,
    /// Derivative kernel for Sobel/Laplacian, and pre-blur kernel when enabled
    pub kernel_size: u32,
    pub pre_blur: bool,
}

impl Default for EdgeOptions {
    fn default() -> Self {
        Self {
            low_threshold: 100.0,
            high_threshold: 200.0,
            kernel_size: 3,
            pre_blur: false,
        }
    }
}

impl EdgeMethod {
    pub fn from_kind(kind: EdgeMethodKind, options: &EdgeOptions) -> Self {
        match kind {
            EdgeMethodKind::Canny => EdgeMethod::Canny {
                low: options.low_threshold,
                high: options.high_threshold,
            },
            EdgeMethodKind::Sobel => EdgeMethod::Sobel {
                kernel_size: options.kernel_size,
            },
            EdgeMethodKind::Laplacian => EdgeMethod::Laplacian {
                kernel_size: options.kernel_size,
            },
        }
    }

    pub fn kind(&self) -> EdgeMethodKind {
        match self {
            EdgeMethod::Canny { .. } => EdgeMethodKind::Canny,
            EdgeMethod::Sobel { .. } => EdgeMethodKind::Sobel,
            EdgeMethod::Laplacian { .. } => EdgeMethodKind::Laplacian,
        }
    }
}

/// Linear adjustments, each a blend between the image and a degenerate version of it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Adjustment {
    Brightness,
    Contrast,
    Sharpness,
    Saturation,
}

impl Adjustment {
    pub fn name(&self) -> &'static str {
        match self {
            Adjustment::Brightness => "brightness",
            Adjustment::Contrast => "contrast",
            Adjustment::Sharpness => "sharpness",
            Adjustment::Saturation => "saturation",
        }
    }
}

bitflags! {
    /// Side effects an operation has on the buffer shape.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct OperationEffect: u8 {
        /// Output is always single-channel
        const TO_GRAY = 0b0000_0001;
        /// Reads a neighbourhood around each pixel
        const SPATIAL = 0b0000_0010;
        /// Identity for some parameter values
        const HAS_IDENTITY = 0b0000_0100;
    }
}

/// Declared contract of an operation, checked by the pipeline after it runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OperationContract {
    pub name: &'static str,
    pub effects: OperationEffect,
}

impl Operation {
    /// Convenience builder matching the hosting layer's edge-detection call.
    pub fn edge_detection(method: &str, options: EdgeOptions) -> Result<Self> {
        let kind: EdgeMethodKind = method.parse()?;
        let op = Operation::EdgeDetect {
            method: EdgeMethod::from_kind(kind, &options),
            pre_blur: options.pre_blur.then_some(options.kernel_size),
        };
        op.validate()?;
        Ok(op)
    }

    pub fn name(&self) -> &'static str {
        self.contract().name
    }

    pub fn contract(&self) -> OperationContract {
        let (name, effects) = match self {
            Operation::Denoise { .. } => (
                "denoise",
                OperationEffect::SPATIAL | OperationEffect::HAS_IDENTITY,
            ),
            Operation::EqualizeHistogram => ("equalize_histogram", OperationEffect::TO_GRAY),
            Operation::Gamma { .. } => ("gamma", OperationEffect::HAS_IDENTITY),
            Operation::UnsharpMask { .. } => (
                "unsharp_mask",
                OperationEffect::SPATIAL | OperationEffect::HAS_IDENTITY,
            ),
            Operation::EdgeDetect { .. } => (
                "edge_detection",
                OperationEffect::TO_GRAY | OperationEffect::SPATIAL,
            ),
            Operation::Adjust { kind, .. } => {
                let effects = match kind {
                    Adjustment::Sharpness => {
                        OperationEffect::SPATIAL | OperationEffect::HAS_IDENTITY
                    }
                    _ => OperationEffect::HAS_IDENTITY,
                };
                (kind.name(), effects)
            }
            Operation::GaussianBlur { .. } => (
                "gaussian_blur",
                OperationEffect::SPATIAL | OperationEffect::HAS_IDENTITY,
            ),
            Operation::MedianFilter { .. } => (
                "median_filter",
                OperationEffect::SPATIAL | OperationEffect::HAS_IDENTITY,
            ),
        };
        OperationContract { name, effects }
    }

    /// Check every parameter against its declared domain.
    ///
    /// Out-of-domain values are caller errors; nothing is clamped here.
    pub fn validate(&self) -> Result<()> {
        let op = self.name();
        match self {
            Operation::Denoise { strength } => {
                DENOISE_DOMAIN.check(op, "strength", *strength)
            }
            Operation::EqualizeHistogram => Ok(()),
            Operation::Gamma { gamma } => {
                GAMMA_DOMAIN.check(op, "gamma", *gamma)
            }
            Operation::UnsharpMask {
                radius,
                amount,
                threshold: _,
            } => {
                RADIUS_DOMAIN.check(op, "radius", *radius)?;
                AMOUNT_DOMAIN.check(op, "amount", *amount)
            }
            Operation::EdgeDetect { method, pre_blur } => {
                match method {
                    EdgeMethod::Canny { low, high } => {
                        Domain::Finite.check(op, "low_threshold", *low)?;
                        Domain::Finite.check(op, "high_threshold", *high)?;
                        if *low < 0.0 {
                            return Err(LunarzError::invalid_parameter(
                                op,
                                "low_threshold",
                                low.to_string(),
                                "must be non-negative",
                            ));
                        }
                        if *low >= *high {
                            return Err(LunarzError::invalid_parameter(
                                op,
                                "high_threshold",
                                high.to_string(),
                                format!("must be greater than low_threshold ({low})"),
                            ));
                        }
                    }
                    EdgeMethod::Sobel { kernel_size } => {
                        require_odd_kernel(op, "kernel_size", *kernel_size, 3, MAX_DERIVATIVE_KERNEL)?
                    }
                    EdgeMethod::Laplacian { kernel_size } => {
                        require_odd_kernel(op, "kernel_size", *kernel_size, 1, MAX_DERIVATIVE_KERNEL)?
                    }
                }
                if let Some(size) = pre_blur {
                    require_odd_kernel(op, "pre_blur", *size, 1, MAX_SMOOTHING_KERNEL)?;
                }
                Ok(())
            }
            Operation::Adjust { factor, .. } => {
                FACTOR_DOMAIN.check(op, "factor", *factor)
            }
            Operation::GaussianBlur { kernel_size } | Operation::MedianFilter { kernel_size } => {
                require_odd_kernel(op, "kernel_size", *kernel_size, 1, MAX_SMOOTHING_KERNEL)
            }
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Denoise { strength } => write!(f, "denoise(strength={strength})"),
            Operation::EqualizeHistogram => write!(f, "equalize_histogram"),
            Operation::Gamma { gamma } => write!(f, "gamma({gamma})"),
            Operation::UnsharpMask {
                radius,
                amount,
                threshold,
            } => write!(
                f,
                "unsharp_mask(radius={radius}, amount={amount}, threshold={threshold})"
            ),
            Operation::EdgeDetect { method, pre_blur } => {
                match method {
                    EdgeMethod::Canny { low, high } => write!(f, "edge_detection(canny {low}..{high}")?,
                    EdgeMethod::Sobel { kernel_size } => {
                        write!(f, "edge_detection(sobel k={kernel_size}")?
                    }
                    EdgeMethod::Laplacian { kernel_size } => {
                        write!(f, "edge_detection(laplacian k={kernel_size}")?
                    }
                }
                match pre_blur {
                    Some(k) => write!(f, ", blur={k})"),
                    None => write!(f, ")"),
                }
            }
            Operation::Adjust { kind, factor } => write!(f, "{}({factor})", kind.name()),
            Operation::GaussianBlur { kernel_size } => write!(f, "gaussian_blur(k={kernel_size})"),
            Operation::MedianFilter { kernel_size } => write!(f, "median_filter(k={kernel_size})"),
        }
    }
}

/// Accepted range of a float parameter.
///
/// Checked against the caller's value before any narrowing, so an f64 from
/// a request cannot round into range on its way to f32.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Domain {
    Finite,
    /// `min < value <= max`
    HalfOpen(f32, f32),
    /// `min <= value <= max`
    Closed(f32, f32),
}

pub(crate) const DENOISE_DOMAIN: Domain = Domain::Closed(0.0, DENOISE_MAX_STRENGTH);
pub(crate) const GAMMA_DOMAIN: Domain = Domain::HalfOpen(GAMMA_MIN_EXCLUSIVE, GAMMA_MAX);
pub(crate) const RADIUS_DOMAIN: Domain = Domain::HalfOpen(0.0, UNSHARP_MAX_RADIUS);
pub(crate) const AMOUNT_DOMAIN: Domain = Domain::Closed(0.0, UNSHARP_MAX_AMOUNT);
pub(crate) const FACTOR_DOMAIN: Domain = Domain::HalfOpen(FACTOR_MIN_EXCLUSIVE, FACTOR_MAX);

impl Domain {
    pub(crate) fn check<V>(self, op: &'static str, name: &'static str, value: V) -> Result<()>
    where
        V: Into<f64> + fmt::Display + Copy,
    {
        let v: f64 = value.into();
        let (ok, reason) = match self {
            _ if !v.is_finite() => (false, "must be finite".to_string()),
            Domain::Finite => (true, String::new()),
            Domain::HalfOpen(min, max) => (
                v > f64::from(min) && v <= f64::from(max),
                format!("must be in ({min}, {max}]"),
            ),
            Domain::Closed(min, max) => (
                v >= f64::from(min) && v <= f64::from(max),
                format!("must be in [{min}, {max}]"),
            ),
        };
        if ok {
            Ok(())
        } else {
            Err(LunarzError::invalid_parameter(op, name, value.to_string(), reason))
        }
    }
}

fn require_odd_kernel(op: &'static str, name: &'static str, size: u32, min: u32, max: u32) -> Result<()> {
    if size % 2 == 1 && (min..=max).contains(&size) {
        Ok(())
    } else {
        Err(LunarzError::invalid_parameter(
            op,
            name,
            size.to_string(),
            format!("must be odd and in [{min}, {max}]"),
        ))
    }
}

/// Output format for encoding
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Jpeg { quality: u8 },
    Bmp,
}

pub const DEFAULT_JPEG_QUALITY: u8 = 90;

impl OutputFormat {
    pub fn from_name(format: &str, quality: Option<u8>) -> Result<Self> {
        let q = quality.unwrap_or(DEFAULT_JPEG_QUALITY).clamp(1, 100);
        match format.to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpeg" | "jpg" => Ok(Self::Jpeg { quality: q }),
            "bmp" => Ok(Self::Bmp),
            other => Err(LunarzError::unsupported_output_format(other.to_string())),
        }
    }

    /// Format implied by a path's extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| LunarzError::unsupported_output_format(path.display().to_string()))?;
        Self::from_name(ext, None)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg { .. } => "jpg",
            OutputFormat::Bmp => "bmp",
        }
    }
}
