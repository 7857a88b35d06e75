// src/engine/pipeline.rs
//
// Pipeline operations: apply_op, apply_ops, contract checks

use crate::buffer::{ChannelLayout, ImageBuffer};
use crate::engine::{adjust, denoise, edges, sharpen, tone};
use crate::error::LunarzError;
use crate::ops::{Operation, OperationContract, OperationEffect};
use std::time::Instant;
use tracing::debug;

// Always use LunarzError so operator failures keep their kind
// (InvalidParameter, UnsupportedInput) instead of collapsing to Internal.
type PipelineResult<T> = std::result::Result<T, LunarzError>;

/// Validate every operation before any pixels are touched.
pub fn validate_ops(ops: &[Operation]) -> PipelineResult<()> {
    ops.iter().try_for_each(Operation::validate)
}

/// Apply one operation to `input`, returning a new buffer.
///
/// The input is never modified. Parameters are validated first; an
/// out-of-domain value is an `InvalidParameter` error and no work is done.
pub fn apply_op(input: &ImageBuffer, op: &Operation) -> PipelineResult<ImageBuffer> {
    op.validate()?;
    let started = Instant::now();
    let output = dispatch(input, op)?;
    check_contract(input, &output, &op.contract())?;
    debug!(
        target: "lunarz::pipeline",
        operation = op.name(),
        width = output.width(),
        height = output.height(),
        channels = output.channels(),
        elapsed_us = started.elapsed().as_micros() as u64,
        "applied operation"
    );
    Ok(output)
}

/// Apply an ordered list of operations. All are validated up front, so a
/// bad parameter late in the list fails before the first one runs.
pub fn apply_ops(input: &ImageBuffer, ops: &[Operation]) -> PipelineResult<ImageBuffer> {
    validate_ops(ops)?;
    let mut current = input.clone();
    for op in ops {
        current = apply_op(&current, op)?;
    }
    Ok(current)
}

fn dispatch(input: &ImageBuffer, op: &Operation) -> PipelineResult<ImageBuffer> {
    match op {
        Operation::Denoise { strength } => denoise::denoise(input, *strength),
        Operation::EqualizeHistogram => tone::equalize_histogram(input),
        Operation::Gamma { gamma } => tone::gamma(input, *gamma),
        Operation::UnsharpMask {
            radius,
            amount,
            threshold,
        } => sharpen::unsharp_mask(input, *radius, *amount, *threshold),
        Operation::EdgeDetect { method, pre_blur } => edges::detect_edges(input, *method, *pre_blur),
        Operation::Adjust { kind, factor } => adjust::adjust(input, *kind, *factor),
        Operation::GaussianBlur { kernel_size } => denoise::gaussian_blur(input, *kernel_size),
        Operation::MedianFilter { kernel_size } => denoise::median_filter(input, *kernel_size),
    }
}

/// Dimensions never change; layout changes only for operations that
/// declare `TO_GRAY`.
fn check_contract(
    input: &ImageBuffer,
    output: &ImageBuffer,
    contract: &OperationContract,
) -> PipelineResult<()> {
    if input.dimensions() != output.dimensions() {
        return Err(LunarzError::internal_panic(format!(
            "{} changed dimensions {:?} -> {:?}",
            contract.name,
            input.dimensions(),
            output.dimensions()
        )));
    }
    let expected = if contract.effects.contains(OperationEffect::TO_GRAY) {
        ChannelLayout::Gray
    } else {
        input.layout()
    };
    if output.layout() != expected {
        return Err(LunarzError::internal_panic(format!(
            "{} produced {:?}, contract requires {:?}",
            contract.name,
            output.layout(),
            expected
        )));
    }
    Ok(())
}
