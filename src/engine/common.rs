// src/engine/common.rs
//
// Common utilities shared across engine modules.
// Provides the engine Result alias and the codec panic policy.

use crate::error::LunarzError;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Engine-wide Result type. Always carries LunarzError so the error
/// taxonomy survives every layer.
pub type EngineResult<T> = std::result::Result<T, LunarzError>;

/// Run a codec call, converting a panic inside it into an `Internal` error.
///
/// Third-party decoders occasionally panic on hostile input. A panic in one
/// batch file must not take down the whole batch.
pub fn run_with_panic_policy<T, F>(stage: &'static str, f: F) -> EngineResult<T>
where
    F: FnOnce() -> EngineResult<T>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let detail = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic payload".to_string());
            tracing::error!(target: "lunarz::codec", %stage, %detail, "panic caught at codec boundary");
            Err(LunarzError::internal_panic(format!("{stage}: {detail}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn passes_through_ok_and_err() {
        assert_eq!(run_with_panic_policy("t", || Ok(7)).unwrap(), 7);
        let err = run_with_panic_policy::<(), _>("t", || Err(LunarzError::decode_failed("x")))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[test]
    fn panic_becomes_internal_error() {
        let err = run_with_panic_policy::<(), _>("decode:test", || panic!("boom")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(err.to_string().contains("decode:test"));
        assert!(err.to_string().contains("boom"));
    }
}
