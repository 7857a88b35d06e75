// src/engine/batch.rs
//
// BatchRunner: apply the same operations to many files.
//
// Per-file failures are captured in that file's BatchResult and never stop
// the batch. Only structural problems (bad parameters, an output directory
// that can't be created, a bad concurrency value) fail the whole call.

use crate::buffer::ImageBuffer;
use crate::config::{BatchConfig, ScanConfig};
use crate::engine::{decoder, encoder, pipeline, pool, scan};
use crate::error::{LunarzError, Result};
use crate::ops::{Operation, OutputFormat};
use rayon::prelude::*;
use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// What a successful file produced.
#[derive(Clone, Debug)]
pub struct BatchOutput {
    pub output_path: PathBuf,
    /// Present when `BatchConfig::keep_images` is set
    pub image: Option<ImageBuffer>,
}

#[derive(Clone, Debug)]
pub struct BatchResult {
    pub source: PathBuf,
    pub outcome: Result<BatchOutput>,
}

impl BatchResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn error(&self) -> Option<&LunarzError> {
        self.outcome.as_ref().err()
    }

    pub fn output_path(&self) -> Option<&Path> {
        self.outcome.as_ref().ok().map(|o| o.output_path.as_path())
    }

    pub fn image(&self) -> Option<&ImageBuffer> {
        self.outcome.as_ref().ok().and_then(|o| o.image.as_ref())
    }
}

/// Results for every input, in input order.
#[derive(Clone, Debug, Default)]
pub struct BatchReport {
    pub results: Vec<BatchResult>,
}

impl BatchReport {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.len() - self.succeeded()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BatchResult> {
        self.results.iter()
    }
}

impl<'a> IntoIterator for &'a BatchReport {
    type Item = &'a BatchResult;
    type IntoIter = std::slice::Iter<'a, BatchResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

#[derive(Clone, Debug)]
pub struct BatchRunner {
    ops: Vec<Operation>,
    output_dir: PathBuf,
    config: BatchConfig,
}

/// Where one input will be written, decided before any work starts.
#[derive(Clone, Debug)]
struct PlannedOutput {
    path: PathBuf,
    format: OutputFormat,
}

impl BatchRunner {
    pub fn new(ops: Vec<Operation>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            ops,
            output_dir: output_dir.into(),
            config: BatchConfig::default(),
        }
    }

    /// Batch of a single operation.
    pub fn single(op: Operation, output_dir: impl Into<PathBuf>) -> Self {
        Self::new(vec![op], output_dir)
    }

    pub fn with_config(mut self, config: BatchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn ops(&self) -> &[Operation] {
        &self.ops
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Process every input. Results come back in input order whatever the
    /// concurrency.
    pub fn run<P: AsRef<Path> + Sync>(&self, inputs: &[P]) -> Result<BatchReport> {
        self.config.validate()?;
        pipeline::validate_ops(&self.ops)?;

        if !self.output_dir.is_dir() {
            std::fs::create_dir_all(&self.output_dir).map_err(|e| {
                LunarzError::output_dir_unavailable(self.output_dir.display().to_string(), e)
            })?;
        }

        let started = Instant::now();
        info!(
            target: "lunarz::batch",
            inputs = inputs.len(),
            ops = self.ops.len(),
            concurrency = self.config.concurrency,
            output_dir = %self.output_dir.display(),
            "batch started"
        );

        let plans = self.plan_outputs(inputs);
        let work: Vec<(&Path, &Result<PlannedOutput>)> =
            inputs.iter().map(|p| p.as_ref()).zip(plans.iter()).collect();
        let process = |(source, plan): &(&Path, &Result<PlannedOutput>)| -> BatchResult {
            self.process_one(source, plan)
        };

        let results: Vec<BatchResult> = match self.config.concurrency {
            1 => work.iter().map(process).collect(),
            0 => match pool::get_pool() {
                Some(pool) => pool.install(|| work.par_iter().map(process).collect()),
                None => work.iter().map(process).collect(),
            },
            n => pool::build_pool(n)?.install(|| work.par_iter().map(process).collect()),
        };

        let report = BatchReport { results };
        info!(
            target: "lunarz::batch",
            succeeded = report.succeeded(),
            failed = report.failed(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch finished"
        );
        Ok(report)
    }

    /// Scan `root` and process what it finds.
    pub fn run_directory(&self, root: &Path, scan_config: &ScanConfig) -> Result<BatchReport> {
        let inputs = scan::scan_directory(root, scan_config)?;
        self.run(&inputs)
    }

    fn process_one(&self, source: &Path, plan: &Result<PlannedOutput>) -> BatchResult {
        let outcome = plan.clone().and_then(|plan| {
            let (image, _) = decoder::decode_file(source)?;
            let processed = pipeline::apply_ops(&image, &self.ops)?;
            encoder::save_as(&processed, &plan.path, plan.format)?;
            Ok(BatchOutput {
                output_path: plan.path,
                image: self.config.keep_images.then_some(processed),
            })
        });
        if let Err(err) = &outcome {
            warn!(
                target: "lunarz::batch",
                source = %source.display(),
                code = err.kind().code(),
                error = %err,
                "file failed"
            );
        }
        BatchResult {
            source: source.to_path_buf(),
            outcome,
        }
    }

    /// Output path and format for each input, with name collisions
    /// resolved in input order by `_1`, `_2`, ... suffixes.
    fn plan_outputs<P: AsRef<Path>>(&self, inputs: &[P]) -> Vec<Result<PlannedOutput>> {
        let mut taken: HashSet<PathBuf> = HashSet::with_capacity(inputs.len());
        inputs
            .iter()
            .map(|input| {
                let input = input.as_ref();
                let stem = input.file_stem().and_then(OsStr::to_str).ok_or_else(|| {
                    LunarzError::file_read_failed(
                        input.display().to_string(),
                        std::io::Error::new(std::io::ErrorKind::InvalidInput, "no usable file name"),
                    )
                })?;
                let format = self.output_format_for(input);
                let ext = format.extension();

                let mut path = self.output_dir.join(format!("{stem}.{ext}"));
                let mut n = 1;
                while taken.contains(&path) {
                    path = self.output_dir.join(format!("{stem}_{n}.{ext}"));
                    n += 1;
                }
                taken.insert(path.clone());
                Ok(PlannedOutput { path, format })
            })
            .collect()
    }

    fn output_format_for(&self, input: &Path) -> OutputFormat {
        self.config
            .output_format
            .or_else(|| OutputFormat::from_path(input).ok())
            .unwrap_or(OutputFormat::Png)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::DEFAULT_JPEG_QUALITY;

    fn runner(config: BatchConfig) -> BatchRunner {
        BatchRunner::single(Operation::Gamma { gamma: 2.0 }, "/tmp/out").with_config(config)
    }

    #[test]
    fn output_names_keep_stem_and_format() {
        let r = runner(BatchConfig::default());
        let plans = r.plan_outputs(&["in/a.png", "in/b.JPG", "in/c.tif", "in/d.bmp"]);
        let names: Vec<_> = plans
            .iter()
            .map(|p| p.as_ref().unwrap().path.file_name().unwrap().to_owned())
            .collect();
        assert_eq!(names, vec!["a.png", "b.jpg", "c.png", "d.bmp"]);
        assert_eq!(
            plans[1].as_ref().unwrap().format,
            OutputFormat::Jpeg {
                quality: DEFAULT_JPEG_QUALITY
            }
        );
    }

    #[test]
    fn configured_format_wins() {
        let r = runner(BatchConfig::default().with_output_format(OutputFormat::Bmp));
        let plans = r.plan_outputs(&["x.png"]);
        assert_eq!(plans[0].as_ref().unwrap().path, Path::new("/tmp/out/x.bmp"));
    }

    #[test]
    fn collisions_get_suffixes_in_input_order() {
        let r = runner(BatchConfig::default().with_output_format(OutputFormat::Png));
        let plans = r.plan_outputs(&["one/a.png", "two/a.jpg", "three/a.png", "a_1.png"]);
        let names: Vec<_> = plans
            .iter()
            .map(|p| p.as_ref().unwrap().path.file_name().unwrap().to_owned())
            .collect();
        assert_eq!(names, vec!["a.png", "a_1.png", "a_2.png", "a_1_1.png"]);
    }

    #[test]
    fn report_counts() {
        let report = BatchReport {
            results: vec![
                BatchResult {
                    source: "a".into(),
                    outcome: Ok(BatchOutput {
                        output_path: "o/a.png".into(),
                        image: None,
                    }),
                },
                BatchResult {
                    source: "b".into(),
                    outcome: Err(LunarzError::file_not_found("b")),
                },
            ],
        };
        assert_eq!(report.len(), 2);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);
        assert!(report.results[1].error().is_some());
        assert_eq!(report.results[0].output_path(), Some(Path::new("o/a.png")));
    }
}
