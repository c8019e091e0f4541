//! Multi-image orchestration around the cutline stage.
//!
//! Per input, in order: optional histogram equalization against the first
//! input, cutline, cutline mask, feathering. Every stage output is cached at a
//! path derived from the input, so an interrupted run resumes where it
//! stopped. Cancellation is polled between stages only.

use std::fs;
use std::path::{Path, PathBuf};

use om_color::ColorSpace;
use om_core::{Feedback, StageCache};
use om_resample::Resampler;
use om_seam::run_cutline_stage;

use crate::MosaicConfig;

pub type CollaboratorError = Box<dyn std::error::Error + Send + Sync>;

/// Matches the histogram of `source` to `reference` in `space`.
pub trait HistogramMatcher {
    fn match_histograms(
        &self,
        source: &Path,
        reference: &Path,
        output: &Path,
        space: ColorSpace,
        bands: &[usize],
    ) -> Result<(), CollaboratorError>;
}

/// Raster masking, feathering and merging.
pub trait Compositor {
    /// Writes `raster` masked by the cutline. With `only_max_coords_feature`
    /// only the cutline feature with the largest extent is used.
    fn compute_mask(
        &self,
        raster: &Path,
        cutline: &Path,
        output: &Path,
        blend_distance: u32,
        only_max_coords_feature: bool,
    ) -> Result<(), CollaboratorError>;

    fn feather(
        &self,
        raster: &Path,
        output: &Path,
        blend_distance: u32,
    ) -> Result<(), CollaboratorError>;

    fn merge(
        &self,
        inputs: &[MergeInput],
        output: &Path,
        feedback: &dyn Feedback,
    ) -> Result<PathBuf, CollaboratorError>;
}

/// One feathered raster and its cutline mask, ready to merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeInput {
    pub feathered: PathBuf,
    pub mask: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum MosaicError {
    #[error("at least two raster layers are required, got {0}")]
    NotEnoughInputs(usize),
    #[error("processing cancelled by user")]
    Cancelled,
    #[error("cannot compute cutline for {}, cannot proceed with merging", .input.display())]
    CutlineMissing { input: PathBuf },
    #[error("{stage} failed for {}: {source}", .input.display())]
    Stage {
        stage: &'static str,
        input: PathBuf,
        #[source]
        source: CollaboratorError,
    },
    #[error("cannot create output directory {}: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

const EQUALIZE_BANDS: [usize; 3] = [1, 2, 3];

pub struct MosaicPipeline<'a> {
    config: &'a MosaicConfig,
    resampler: &'a dyn Resampler,
    matcher: &'a dyn HistogramMatcher,
    compositor: &'a dyn Compositor,
    feedback: &'a dyn Feedback,
}

impl<'a> MosaicPipeline<'a> {
    pub fn new(
        config: &'a MosaicConfig,
        resampler: &'a dyn Resampler,
        matcher: &'a dyn HistogramMatcher,
        compositor: &'a dyn Compositor,
        feedback: &'a dyn Feedback,
    ) -> Self {
        Self {
            config,
            resampler,
            matcher,
            compositor,
            feedback,
        }
    }

    /// Merges `inputs` into `output` and returns the path the compositor
    /// reports.
    pub fn run(&self, inputs: &[PathBuf], output: &Path) -> Result<PathBuf, MosaicError> {
        if inputs.len() < 2 {
            self.feedback.error("You need at least two raster layers");
            return Err(MosaicError::NotEnoughInputs(inputs.len()));
        }

        let cache = StageCache::new(self.config.temp_dir.clone());
        if let Some(dir) = cache.temp_dir() {
            self.feedback
                .info(&format!("Using temporary directory: {}", dir.display()));
        }

        let sources = self.equalize(&cache, inputs);
        let mut merge_inputs = Vec::with_capacity(sources.len());
        for source in &sources {
            merge_inputs.push(self.process_image(&cache, source)?);
        }

        if let Some(dir) = output.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir).map_err(|source| MosaicError::OutputDir {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        self.compositor
            .merge(&merge_inputs, output, self.feedback)
            .map_err(|source| MosaicError::Stage {
                stage: "merge",
                input: output.to_path_buf(),
                source,
            })
    }

    /// Rasters to cut: the reference first, then each remaining input
    /// equalized against it. Inputs that fail to equalize are used as-is.
    fn equalize(&self, cache: &StageCache, inputs: &[PathBuf]) -> Vec<PathBuf> {
        let Some(space) = self.config.equalize.color_space() else {
            self.feedback.info("No histogram equalization");
            return inputs.to_vec();
        };

        self.feedback.info("Equalizing histograms");
        let reference = &inputs[0];
        let mut sources = vec![reference.clone()];
        for input in &inputs[1..] {
            let equalized = cache.path_for(input, ".eq", None);
            self.feedback
                .info(&format!("Equalizing {}", input.display()));
            let result = self.matcher.match_histograms(
                input,
                reference,
                &equalized,
                space,
                &EQUALIZE_BANDS,
            );
            match result {
                Ok(()) if equalized.is_file() => sources.push(equalized),
                outcome => {
                    if let Err(e) = outcome {
                        log::debug!("histogram matching failed: {e}");
                    }
                    self.feedback.warning(&format!(
                        "Cannot equalize {}, skipping...",
                        input.display()
                    ));
                    sources.push(input.clone());
                }
            }
        }
        sources
    }

    fn process_image(
        &self,
        cache: &StageCache,
        source: &Path,
    ) -> Result<MergeInput, MosaicError> {
        let blend = self.config.blend_distance;
        self.check_cancelled()?;

        let cutline = cache.path_for(source, ".cutline", Some(".geojson"));
        self.feedback
            .info(&format!("Computing cutline: {}", source.display()));
        let cutline_cfg = self.config.cutline_config();
        cache.run_or_reuse(&cutline, "cutline", self.feedback, |out| {
            run_cutline_stage(
                source,
                out,
                &cutline_cfg,
                None,
                self.resampler,
                self.feedback,
            );
            Ok::<(), MosaicError>(())
        })?;

        self.check_cancelled()?;
        if !cutline.is_file() {
            self.feedback
                .error("Cannot compute cutline. Cannot proceed with merging");
            return Err(MosaicError::CutlineMissing {
                input: source.to_path_buf(),
            });
        }

        let mask = cache.path_for(source, ".cut", None);
        cache.run_or_reuse(&mask, "raster cut", self.feedback, |out| {
            self.compositor
                .compute_mask(source, &cutline, out, blend, true)
                .map_err(|e| stage_error("mask", source, e))
        })?;

        self.check_cancelled()?;

        let feathered = cache.path_for(source, ".feathered", None);
        cache.run_or_reuse(&feathered, "feathered raster", self.feedback, |out| {
            self.compositor
                .feather(source, out, blend)
                .map_err(|e| stage_error("feather", source, e))
        })?;

        Ok(MergeInput { feathered, mask })
    }

    fn check_cancelled(&self) -> Result<(), MosaicError> {
        if self.feedback.is_cancelled() {
            self.feedback.info("Processing cancelled by user.");
            return Err(MosaicError::Cancelled);
        }
        Ok(())
    }
}

fn stage_error(stage: &'static str, input: &Path, source: CollaboratorError) -> MosaicError {
    MosaicError::Stage {
        stage,
        input: input.to_path_buf(),
        source,
    }
}
