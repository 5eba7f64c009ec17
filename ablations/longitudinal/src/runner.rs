//! 程序运行函数.

use crate::profile::StageTimer;
use crate::result::{PipelineError, PipelineResult};
use log::{info, warn};
use mr_berry::prelude::*;
use utils::loader;

/// 对齐报告文件名.
const REPORT: &str = "alignment_report.txt";

/// 实际运行.
pub fn run() -> Result<PipelineResult, PipelineError> {
    let dir = loader::data_dir_from_env_or_home().ok_or(PipelineError::NoDataDir)?;
    info!(
        "Loading volume pair from {} ({} core(s))",
        dir.display(),
        utils::cpus()
    );

    let mut timer = StageTimer::new();
    let (first, second) = timer.time("load", || loader::load_pair(&dir))?;
    let stats = timer.time("statistics", || compute_stats(&first, Some(&second)));
    let report = timer.time("alignment", || analyze_alignment(&first, &second));
    report.save_report(dir.join(REPORT))?;

    let second = if report.needs_registration() {
        let out = timer.time("registration", || {
            register_with(&first, &second, &RegistrationConfig::default())
        })?;
        info!("Registered with offset {:?} mm", out.transform.offset);
        out.registered
    } else {
        second
    };

    let (first, second) = timer.time("preprocessing", || {
        Ok::<_, VolumeError>((preprocess(&first, true, true)?, preprocess(&second, true, true)?))
    })?;

    let seed = utils::seed_from_env()
        .map_err(PipelineError::InvalidSeed)?
        .unwrap_or_else(|| first.center_index());
    let grow = RegionGrowConfig::default();
    let (m1, m2) = timer.time("region growing", || {
        Ok::<_, VolumeError>((
            grow_region_with(&first, seed, &grow)?,
            grow_region_with(&second, seed, &grow)?,
        ))
    })?;
    if m1.is_background() || m2.is_background() {
        warn!("Empty segmentation from seed {seed:?}");
    }

    let post = PostprocessConfig::default();
    let (m1, m2) = timer.time("post-processing", || {
        Ok::<_, VolumeError>((postprocess_with(&m1, &post)?, postprocess_with(&m2, &post)?))
    })?;
    let masks = timer.time("mask comparison", || compare_masks(&m1, &m2))?;

    Ok(PipelineResult {
        stats,
        report,
        masks,
        timer,
    })
}
