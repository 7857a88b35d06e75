use image::RgbImage;
use lunarz::engine::{apply_op, EditSession};
use lunarz::{Adjustment, ChannelLayout, EdgeMethod, ImageBuffer, Operation};
use proptest::prelude::*;

fn create_test_image(width: u32, height: u32) -> ImageBuffer {
    ImageBuffer::from_rgb(RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    }))
    .unwrap()
}

fn noisy_image(width: u32, height: u32, seed: u8) -> ImageBuffer {
    ImageBuffer::from_rgb(RgbImage::from_fn(width, height, |x, y| {
        let v = (x.wrapping_mul(31) ^ y.wrapping_mul(17)) as u8;
        image::Rgb([v.wrapping_add(seed), v.wrapping_mul(3), seed ^ v])
    }))
    .unwrap()
}

fn adjustment_strategy() -> impl Strategy<Value = Adjustment> {
    prop_oneof![
        Just(Adjustment::Brightness),
        Just(Adjustment::Contrast),
        Just(Adjustment::Sharpness),
        Just(Adjustment::Saturation),
    ]
}

fn odd_kernel(max: u32) -> impl Strategy<Value = u32> {
    (0..=max / 2).prop_map(|k| 2 * k + 1)
}

/// Valid operations with small neighbourhoods so cases stay fast.
fn operation_strategy() -> impl Strategy<Value = Operation> {
    prop_oneof![
        (0.0f32..=100.0).prop_map(|strength| Operation::Denoise { strength }),
        Just(Operation::EqualizeHistogram),
        (0.11f32..=5.0).prop_map(|gamma| Operation::Gamma { gamma }),
        (0.5f32..=3.0, 0.0f32..=10.0, any::<u8>()).prop_map(|(radius, amount, threshold)| {
            Operation::UnsharpMask {
                radius,
                amount,
                threshold,
            }
        }),
        (0.0f32..=200.0, 1.0f32..=200.0).prop_map(|(low, delta)| Operation::EdgeDetect {
            method: EdgeMethod::Canny {
                low,
                high: low + delta,
            },
            pre_blur: None,
        }),
        (1u32..=3, prop::option::of(odd_kernel(7))).prop_map(|(k, pre_blur)| Operation::EdgeDetect {
            method: EdgeMethod::Sobel { kernel_size: 2 * k + 1 },
            pre_blur,
        }),
        odd_kernel(7).prop_map(|k| Operation::EdgeDetect {
            method: EdgeMethod::Laplacian { kernel_size: k },
            pre_blur: None,
        }),
        (adjustment_strategy(), 0.11f32..=2.0).prop_map(|(kind, factor)| Operation::Adjust { kind, factor }),
        odd_kernel(9).prop_map(|kernel_size| Operation::GaussianBlur { kernel_size }),
        odd_kernel(5).prop_map(|kernel_size| Operation::MedianFilter { kernel_size }),
    ]
}

/// Reference model of the history: a plain list plus a cursor.
#[derive(Clone, Debug)]
enum Step {
    Apply(f32),
    Undo,
    Redo,
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        (0.2f32..=4.0).prop_map(Step::Apply),
        Just(Step::Undo),
        Just(Step::Redo),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_operations_preserve_dimensions(
        w in 1u32..=24,
        h in 1u32..=24,
        op in operation_strategy(),
    ) {
        let img = noisy_image(w, h, 7);
        let out = apply_op(&img, &op).unwrap();
        prop_assert_eq!(out.dimensions(), (w, h));
        let to_gray = matches!(op, Operation::EqualizeHistogram | Operation::EdgeDetect { .. });
        let expected = if to_gray { ChannelLayout::Gray } else { ChannelLayout::Rgb };
        prop_assert_eq!(out.layout(), expected);
    }

    #[test]
    fn prop_operations_are_deterministic(op in operation_strategy(), seed in any::<u8>()) {
        let img = noisy_image(13, 11, seed);
        prop_assert_eq!(apply_op(&img, &op).unwrap(), apply_op(&img, &op).unwrap());
    }

    #[test]
    fn prop_identity_parameters(
        w in 1u32..=32,
        h in 1u32..=32,
        kind in adjustment_strategy(),
    ) {
        let img = create_test_image(w, h);
        prop_assert_eq!(&apply_op(&img, &Operation::Gamma { gamma: 1.0 }).unwrap(), &img);
        prop_assert_eq!(&apply_op(&img, &Operation::Adjust { kind, factor: 1.0 }).unwrap(), &img);
        prop_assert_eq!(&apply_op(&img, &Operation::Denoise { strength: 0.0 }).unwrap(), &img);
        prop_assert_eq!(&apply_op(&img, &Operation::MedianFilter { kernel_size: 1 }).unwrap(), &img);
        prop_assert_eq!(&apply_op(&img, &Operation::GaussianBlur { kernel_size: 1 }).unwrap(), &img);
    }

    #[test]
    fn prop_gamma_outside_domain_is_rejected(gamma in prop_oneof![-10.0f32..=0.1, 5.0001f32..=100.0]) {
        let img = create_test_image(2, 2);
        let err = apply_op(&img, &Operation::Gamma { gamma }).unwrap_err();
        prop_assert_eq!(err.kind(), lunarz::ErrorKind::InvalidParameter);
    }

    #[test]
    fn prop_history_matches_reference_model(steps in prop::collection::vec(step_strategy(), 0..24)) {
        let original = create_test_image(6, 6);
        let mut session = EditSession::new();
        session.load(original.clone());

        // states[..=cursor] is the undo stack; states[cursor + 1..] is the redo stack.
        let mut states = vec![original];
        let mut cursor = 0usize;

        for step in steps {
            match step {
                Step::Apply(gamma) => {
                    let op = Operation::Gamma { gamma };
                    let next = apply_op(&states[cursor], &op).unwrap();
                    session.apply(op).unwrap();
                    states.truncate(cursor + 1);
                    states.push(next);
                    cursor += 1;
                }
                Step::Undo => {
                    let changed = session.undo();
                    prop_assert_eq!(changed, cursor > 0);
                    cursor = cursor.saturating_sub(1);
                }
                Step::Redo => {
                    let changed = session.redo();
                    prop_assert_eq!(changed, cursor + 1 < states.len());
                    if changed {
                        cursor += 1;
                    }
                }
            }
            prop_assert_eq!(session.current().unwrap(), &states[cursor]);
            prop_assert_eq!(session.undo_depth(), cursor);
            prop_assert_eq!(session.redo_depth(), states.len() - cursor - 1);
            prop_assert_eq!(session.original().unwrap(), &states[0]);
        }
    }
}
