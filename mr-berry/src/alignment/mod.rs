//! 空间对齐分析.
//!
//! 对两个体数据依次进行: 维度检查 -> 质心比较 -> 三个方向的逐切片相关性 ->
//! 整数体素平移估计 -> 对齐判定与建议. 维度不一致时立即返回,
//! 不计算任何后续度量.

use log::{debug, info, warn};

use crate::stats::{center_of_mass, distance};
use crate::{Volume, VolumeGeometry};

mod config;
mod correlation;
mod probe;
mod report;
mod shift;

pub use config::{AlignmentConfig, ShiftSearch};
pub use correlation::{slice_correlations, OrientationCorrelation, SliceCorrelations};
pub use probe::{probe_position, probe_position_with, ProbeRating, SliceProbe};
pub use report::{recommend, AlignmentMetrics, AlignmentReport, Recommendation};
pub use shift::{central_roi, detect_shift, search_shift};

/// 以默认参数分析两个体数据的空间对齐程度.
#[inline]
pub fn analyze_alignment(a: &Volume, b: &Volume) -> AlignmentReport {
    analyze_alignment_with(a, b, &AlignmentConfig::default())
}

/// 以给定参数分析两个体数据的空间对齐程度.
///
/// 该函数不会失败: 形状不一致时返回 `dimensions_match == false` 的报告,
/// 退化切片与退化 ROI 会被吸收进度量本身. 参数不合法时记录警告并改用默认参数.
pub fn analyze_alignment_with(a: &Volume, b: &Volume, config: &AlignmentConfig) -> AlignmentReport {
    let fallback;
    let config = match config.validate() {
        Ok(()) => config,
        Err(e) => {
            warn!("{e}, falling back to default alignment parameters");
            fallback = AlignmentConfig::default();
            &fallback
        }
    };
    let shapes = (a.shape(), b.shape());
    if !a.same_shape(b) {
        info!("dimension mismatch {:?} vs {:?}, registration needed", shapes.0, shapes.1);
        return AlignmentReport {
            shapes,
            dimensions_match: false,
            metrics: None,
            is_well_aligned: false,
            recommendations: recommend(None, config),
        };
    }

    let com_first = center_of_mass(a);
    let com_second = center_of_mass(b);
    let com_distance = distance(com_first, com_second);
    debug!("center of mass distance: {com_distance:.3}");

    let correlations = slice_correlations(a, b);
    for (o, c) in correlations.iter() {
        debug!("{o} correlation mean {:.3}, min {:.3}", c.mean, c.min);
    }

    let shift = detect_shift(a, b, &config.shift_search);
    debug!("estimated shift {shift:?}");

    let metrics = AlignmentMetrics {
        com_first,
        com_second,
        com_distance,
        correlations,
        shift,
    };
    let is_well_aligned = metrics.is_well_aligned(config);
    info!("alignment verdict: well aligned = {is_well_aligned}");
    AlignmentReport {
        shapes,
        dimensions_match: true,
        metrics: Some(metrics),
        is_well_aligned,
        recommendations: recommend(Some(&metrics), config),
    }
}
