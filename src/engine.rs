// src/engine.rs
//
// The core of lunarz: operators, the pipeline that runs them, the edit
// session that records their history, and the batch runner that drives
// them over many files.
//
// This file is a facade over the modules in engine/.

// =============================================================================
// SECURITY LIMITS
// =============================================================================

/// Maximum allowed image dimension (width or height).
/// Images larger than 32768x32768 are rejected to prevent decompression bombs.
pub const MAX_DIMENSION: u32 = 32768;

/// Maximum allowed total pixels (width * height).
/// 100 megapixels = 300MB of RGB samples before any float working planes.
pub const MAX_PIXELS: u64 = 100_000_000;

// =============================================================================
// MODULE DECOMPOSITION
// =============================================================================

mod adjust;
mod batch;
mod common;
mod decoder;
mod denoise;
mod edges;
mod encoder;
mod kernel;
mod pipeline;
mod pool;
mod scan;
mod session;
mod sharpen;
mod tone;

pub use batch::{BatchOutput, BatchReport, BatchResult, BatchRunner};
pub use common::{run_with_panic_policy, EngineResult};
pub use decoder::{check_dimensions, decode_file, decode_image, detect_format, ensure_dimensions_safe};
pub use encoder::{encode, encode_bmp, encode_jpeg, encode_png, save, save_as, write_atomic};
pub use pipeline::{apply_op, apply_ops, validate_ops};
pub use pool::{build_pool, get_pool, MAX_CONCURRENCY, THREADS_ENV};
pub use scan::scan_directory;
pub use session::{EditSession, SessionState};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{ChannelLayout, ImageBuffer};
    use crate::error::ErrorKind;
    use crate::ops::{EdgeMethod, EdgeOptions, Operation};
    use crate::request::OperatorRequest;
    use image::RgbImage;

    // Helper function to create test images
    fn create_test_image(width: u32, height: u32) -> ImageBuffer {
        ImageBuffer::from_rgb(RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        }))
        .unwrap()
    }

    mod security_tests {
        use super::*;

        #[test]
        fn test_check_dimensions_valid() {
            assert!(check_dimensions(1920, 1080).is_ok());
            // Passes the per-side limit but not the pixel limit
            let result = check_dimensions(32768, 32768);
            assert!(matches!(
                result,
                Err(crate::error::LunarzError::PixelCountExceedsLimit { .. })
            ));
        }

        #[test]
        fn test_check_dimensions_exceeds_max_dimension() {
            let result = check_dimensions(32769, 1);
            assert!(result.unwrap_err().to_string().contains("exceeds maximum"));
            let result = check_dimensions(1, 32769);
            assert!(result.unwrap_err().to_string().contains("exceeds maximum"));
        }

        #[test]
        fn test_check_dimensions_at_pixel_boundary() {
            assert!(check_dimensions(10000, 10000).is_ok());
            assert!(check_dimensions(10001, 10000).is_err());
        }
    }

    mod session_tests {
        use super::*;

        fn gamma(g: f32) -> Operation {
            Operation::Gamma { gamma: g }
        }

        #[test]
        fn undo_redo_walks_linear_history() {
            let a = create_test_image(16, 16);
            let mut session = EditSession::new();
            session.load(a.clone());
            let b = session.apply(gamma(2.0)).unwrap().clone();
            let c = session.apply(gamma(0.5)).unwrap().clone();

            assert!(session.undo());
            assert_eq!(session.current().unwrap(), &b);
            assert!(session.undo());
            assert_eq!(session.current().unwrap(), &a);
            assert!(!session.undo());
            assert_eq!(session.current().unwrap(), &a);
            assert!(session.redo());
            assert_eq!(session.current().unwrap(), &b);
            assert!(session.redo());
            assert_eq!(session.current().unwrap(), &c);
            assert!(!session.redo());
        }

        #[test]
        fn apply_after_undo_discards_branch() {
            let a = create_test_image(8, 8);
            let mut session = EditSession::new();
            session.load(a.clone());
            session.apply(gamma(2.0)).unwrap();
            assert!(session.undo());
            let d = session.apply(gamma(3.0)).unwrap().clone();
            assert!(!session.redo());
            assert_eq!(session.current().unwrap(), &d);
            assert_eq!(session.history_names(), vec!["gamma"]);
        }

        #[test]
        fn bogus_edge_method_leaves_session_unchanged() {
            let a = create_test_image(8, 8);
            let mut session = EditSession::new();
            session.load(a.clone());
            let request = OperatorRequest::new("edge_detection").with("method", "Bogus");
            let err = session.apply_request(&request).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::UnsupportedInput);
            assert_eq!(session.current().unwrap(), &a);
            assert_eq!(session.undo_depth(), 0);

            let err = Operation::edge_detection("Bogus", EdgeOptions::default()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::UnsupportedInput);
        }

        #[test]
        fn apply_request_on_empty_session() {
            let mut session = EditSession::new();
            let err = session
                .apply_request(&OperatorRequest::new("gamma"))
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::NoImageLoaded);
        }

        #[test]
        fn export_round_trips_through_png() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("result.png");
            let mut session = EditSession::new();
            session.load(create_test_image(6, 5));
            session
                .apply(Operation::EdgeDetect {
                    method: EdgeMethod::Sobel { kernel_size: 3 },
                    pre_blur: None,
                })
                .unwrap();
            session.export(&path).unwrap();

            let mut reloaded = EditSession::new();
            reloaded.load_file(&path).unwrap();
            assert_eq!(reloaded.current().unwrap(), session.current().unwrap());
            assert_eq!(reloaded.current().unwrap().layout(), ChannelLayout::Gray);
        }
    }
}
