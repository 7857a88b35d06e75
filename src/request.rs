// src/request.rs
//
// OperatorRequest: the (name, parameters) form a hosting surface sends,
// resolved into a validated Operation.

use crate::error::{LunarzError, Result};
use crate::ops::{
    Adjustment, Domain, EdgeMethod, EdgeMethodKind, Operation, AMOUNT_DOMAIN, DENOISE_DOMAIN,
    FACTOR_DOMAIN, GAMMA_DOMAIN, RADIUS_DOMAIN,
};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Every operator name `resolve` understands.
pub const OPERATOR_NAMES: [&str; 11] = [
    "denoise",
    "equalize_histogram",
    "gamma",
    "unsharp_mask",
    "edge_detection",
    "brightness",
    "contrast",
    "sharpness",
    "saturation",
    "gaussian_blur",
    "median_filter",
];

#[derive(Clone, Debug, PartialEq)]
pub enum ParamValue {
    Number(f64),
    Flag(bool),
    Text(String),
}

impl ParamValue {
    fn type_name(&self) -> &'static str {
        match self {
            ParamValue::Number(_) => "number",
            ParamValue::Flag(_) => "flag",
            ParamValue::Text(_) => "text",
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Number(n) => write!(f, "{n}"),
            ParamValue::Flag(b) => write!(f, "{b}"),
            ParamValue::Text(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Number(v)
    }
}

impl From<f32> for ParamValue {
    fn from(v: f32) -> Self {
        ParamValue::Number(v as f64)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Number(v as f64)
    }
}

impl From<u32> for ParamValue {
    fn from(v: u32) -> Self {
        ParamValue::Number(v as f64)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Flag(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Text(v)
    }
}

/// A named operator plus loosely typed parameters.
///
/// Missing parameters take the operator's defaults. Names match
/// case-insensitively and `-` is treated as `_`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OperatorRequest {
    pub name: String,
    pub params: BTreeMap<String, ParamValue>,
}

impl OperatorRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Turn the request into a validated Operation.
    pub fn resolve(&self) -> Result<Operation> {
        let name = self.name.trim().to_ascii_lowercase().replace('-', "_");
        let Some(op_name) = OPERATOR_NAMES.iter().copied().find(|n| *n == name) else {
            return Err(LunarzError::unknown_operator(self.name.clone()));
        };
        let mut p = Params::new(op_name, &self.params);

        let op = match op_name {
            "denoise" => Operation::Denoise {
                strength: p.float("strength", 10.0, DENOISE_DOMAIN)?,
            },
            "equalize_histogram" => Operation::EqualizeHistogram,
            "gamma" => Operation::Gamma {
                gamma: p.float("gamma", 1.0, GAMMA_DOMAIN)?,
            },
            "unsharp_mask" => Operation::UnsharpMask {
                radius: p.float("radius", 2.0, RADIUS_DOMAIN)?,
                amount: p.float("amount", 1.5, AMOUNT_DOMAIN)?,
                threshold: p.integer("threshold", 3, u8::MAX as u32)? as u8,
            },
            "edge_detection" => {
                let kind: EdgeMethodKind = p.text("method", "canny")?.parse()?;
                let low = p.float("low_threshold", 100.0, Domain::Finite)?;
                let high = p.float("high_threshold", 200.0, Domain::Finite)?;
                let kernel_size = p.integer("kernel_size", 3, u32::MAX)?;
                let pre_blur = p.flag("pre_blur", false)?;
                let method = match kind {
                    EdgeMethodKind::Canny => EdgeMethod::Canny { low, high },
                    EdgeMethodKind::Sobel => EdgeMethod::Sobel { kernel_size },
                    EdgeMethodKind::Laplacian => EdgeMethod::Laplacian { kernel_size },
                };
                Operation::EdgeDetect {
                    method,
                    pre_blur: pre_blur.then_some(kernel_size),
                }
            }
            "brightness" | "contrast" | "sharpness" | "saturation" => {
                let kind = match op_name {
                    "brightness" => Adjustment::Brightness,
                    "contrast" => Adjustment::Contrast,
                    "sharpness" => Adjustment::Sharpness,
                    _ => Adjustment::Saturation,
                };
                Operation::Adjust {
                    kind,
                    factor: p.float("factor", 1.0, FACTOR_DOMAIN)?,
                }
            }
            "gaussian_blur" => Operation::GaussianBlur {
                kernel_size: p.integer("kernel_size", 15, u32::MAX)?,
            },
            "median_filter" => Operation::MedianFilter {
                kernel_size: p.integer("kernel_size", 15, u32::MAX)?,
            },
            _ => return Err(LunarzError::unknown_operator(self.name.clone())),
        };
        p.finish()?;
        op.validate()?;
        Ok(op)
    }
}

/// Typed reads over the raw parameter map, remembering which keys were used.
struct Params<'a> {
    op: &'static str,
    map: &'a BTreeMap<String, ParamValue>,
    used: BTreeSet<&'a str>,
}

impl<'a> Params<'a> {
    fn new(op: &'static str, map: &'a BTreeMap<String, ParamValue>) -> Self {
        Self {
            op,
            map,
            used: BTreeSet::new(),
        }
    }

    fn get(&mut self, key: &'static str) -> Option<&'a ParamValue> {
        let (k, v) = self.map.get_key_value(key)?;
        self.used.insert(k.as_str());
        Some(v)
    }

    fn wrong_type(&self, key: &'static str, value: &ParamValue, expected: &str) -> LunarzError {
        LunarzError::invalid_parameter(
            self.op,
            key,
            value.to_string(),
            format!("expected {expected}, got {}", value.type_name()),
        )
    }

    /// Read a float, checking `domain` on the f64 before narrowing.
    fn float(&mut self, key: &'static str, default: f32, domain: Domain) -> Result<f32> {
        match self.get(key) {
            None => Ok(default),
            Some(ParamValue::Number(n)) => {
                domain.check(self.op, key, *n)?;
                Ok(*n as f32)
            }
            Some(other) => Err(self.wrong_type(key, other, "number")),
        }
    }

    fn integer(&mut self, key: &'static str, default: u32, max: u32) -> Result<u32> {
        match self.get(key) {
            None => Ok(default),
            Some(ParamValue::Number(n)) => {
                if n.fract() != 0.0 || *n < 0.0 || *n > max as f64 {
                    Err(LunarzError::invalid_parameter(
                        self.op,
                        key,
                        n.to_string(),
                        format!("must be a whole number in [0, {max}]"),
                    ))
                } else {
                    Ok(*n as u32)
                }
            }
            Some(other) => Err(self.wrong_type(key, other, "whole number")),
        }
    }

    fn flag(&mut self, key: &'static str, default: bool) -> Result<bool> {
        match self.get(key) {
            None => Ok(default),
            Some(ParamValue::Flag(b)) => Ok(*b),
            Some(other) => Err(self.wrong_type(key, other, "flag")),
        }
    }

    fn text(&mut self, key: &'static str, default: &'static str) -> Result<&'a str> {
        match self.get(key) {
            None => Ok(default),
            Some(ParamValue::Text(s)) => Ok(s.as_str()),
            Some(other) => Err(self.wrong_type(key, other, "text")),
        }
    }

    /// Fail on any key the operator didn't read.
    fn finish(self) -> Result<()> {
        match self.map.iter().find(|(k, _)| !self.used.contains(k.as_str())) {
            Some((key, value)) => Err(LunarzError::invalid_parameter(
                self.op,
                key.clone(),
                value.to_string(),
                "unknown parameter",
            )),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn defaults_fill_missing_params() {
        assert_eq!(
            OperatorRequest::new("denoise").resolve().unwrap(),
            Operation::Denoise { strength: 10.0 }
        );
        assert_eq!(
            OperatorRequest::new("unsharp_mask").resolve().unwrap(),
            Operation::UnsharpMask {
                radius: 2.0,
                amount: 1.5,
                threshold: 3
            }
        );
        assert_eq!(
            OperatorRequest::new("Median-Filter").resolve().unwrap(),
            Operation::MedianFilter { kernel_size: 15 }
        );
    }

    #[test]
    fn edge_detection_request() {
        let op = OperatorRequest::new("edge_detection")
            .with("method", "Laplacian")
            .with("kernel_size", 5)
            .with("pre_blur", true)
            .resolve()
            .unwrap();
        assert_eq!(
            op,
            Operation::EdgeDetect {
                method: EdgeMethod::Laplacian { kernel_size: 5 },
                pre_blur: Some(5),
            }
        );
        let canny = OperatorRequest::new("edge_detection").resolve().unwrap();
        assert_eq!(
            canny,
            Operation::EdgeDetect {
                method: EdgeMethod::Canny {
                    low: 100.0,
                    high: 200.0
                },
                pre_blur: None,
            }
        );
    }

    #[test]
    fn unknown_operator_and_method_are_unsupported_input() {
        let err = OperatorRequest::new("sepia").resolve().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedInput);
        let err = OperatorRequest::new("edge_detection")
            .with("method", "Bogus")
            .resolve()
            .unwrap_err();
        assert!(matches!(err, LunarzError::UnknownEdgeMethod { .. }));
    }

    #[test]
    fn unknown_key_and_wrong_type_are_invalid_parameter() {
        let err = OperatorRequest::new("gamma")
            .with("gama", 2.0)
            .resolve()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        let err = OperatorRequest::new("gamma")
            .with("gamma", "high")
            .resolve()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        let err = OperatorRequest::new("median_filter")
            .with("kernel_size", 3.5)
            .resolve()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn out_of_domain_values_are_rejected() {
        let err = OperatorRequest::new("contrast")
            .with("factor", 2.5)
            .resolve()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        let err = OperatorRequest::new("unsharp_mask")
            .with("threshold", 300)
            .resolve()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn values_just_past_a_bound_are_not_rounded_into_range() {
        // 5.00000001 narrows to exactly 5.0f32
        for (name, key, value) in [
            ("gamma", "gamma", 5.000_000_01),
            ("gamma", "gamma", 0.100_000_001),
            ("brightness", "factor", 2.000_000_01),
            ("denoise", "strength", 100.000_000_1),
        ] {
            let err = OperatorRequest::new(name)
                .with(key, value)
                .resolve()
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidParameter, "{name} {key}={value}");
        }
        assert_eq!(
            OperatorRequest::new("gamma").with("gamma", 5.0).resolve().unwrap(),
            Operation::Gamma { gamma: 5.0 }
        );
    }
}
