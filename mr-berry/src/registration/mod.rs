//! 多分辨率刚性 (平移) 配准.
//!
//! 以互信息为度量、规则步长梯度上升为优化器, 在由粗到细的图像金字塔上
//! 依次估计平移量, 每层以上一层的最佳结果为起点. 最终以三线性插值将运动图像
//! 重采样到固定图像的网格上.
//!
//! 数值失败 (无重叠、非有限值) 以 [`RegistrationError`](crate::RegistrationError)
//! 返回, 不会自动重试, 也不会退回恒等变换.

use log::{debug, info};

use crate::{Volume, VolumeResult};

mod config;
mod metric;
mod optimizer;
mod pyramid;
mod resample;
mod transform;

pub use config::RegistrationConfig;
pub use metric::{mutual_information, JointHistogram};
pub use optimizer::StopReason;
pub use resample::{resample, sample_linear};
pub use transform::{PhysicalPoint, Translation};

use metric::LevelMetric;
use pyramid::Level;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 单层金字塔上的优化摘要.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LevelSummary {
    /// 下采样倍数.
    pub shrink: usize,

    /// 平滑 sigma (毫米).
    pub sigma: f64,

    /// 迭代次数.
    pub iterations: usize,

    /// 该层最佳互信息.
    pub metric: f64,

    /// 停止原因.
    pub stop: StopReason,

    /// 该层结束时的平移量.
    pub transform: Translation,
}

/// 配准结果.
#[derive(Clone, Debug)]
pub struct RegistrationOutcome {
    /// 重采样到固定图像网格上的运动图像.
    pub registered: Volume,

    /// 最终平移变换.
    pub transform: Translation,

    /// 每层的优化摘要, 由粗到细.
    pub levels: Vec<LevelSummary>,
}

/// 以默认参数将 `moving` 配准到 `fixed`, 返回与 `fixed` 同形状、同间距的体数据.
#[inline]
pub fn register(fixed: &Volume, moving: &Volume) -> VolumeResult<Volume> {
    register_with(fixed, moving, &RegistrationConfig::default()).map(|o| o.registered)
}

/// 以给定参数将 `moving` 配准到 `fixed`.
pub fn register_with(
    fixed: &Volume,
    moving: &Volume,
    config: &RegistrationConfig,
) -> VolumeResult<RegistrationOutcome> {
    let (transform, levels) = estimate(fixed, moving, config)?;
    let registered = resample(fixed, moving, &transform);
    Ok(RegistrationOutcome {
        registered,
        transform,
        levels,
    })
}

/// 仅估计平移变换, 不做重采样.
#[inline]
pub fn register_translation(
    fixed: &Volume,
    moving: &Volume,
    config: &RegistrationConfig,
) -> VolumeResult<Translation> {
    estimate(fixed, moving, config).map(|(t, _)| t)
}

fn estimate(
    fixed: &Volume,
    moving: &Volume,
    config: &RegistrationConfig,
) -> VolumeResult<(Translation, Vec<LevelSummary>)> {
    config.validate()?;

    let mut t = Translation::identity();
    let mut levels = Vec::with_capacity(config.levels());
    for (level, (&shrink, &sigma)) in config
        .shrink_factors
        .iter()
        .zip(config.smoothing_sigmas.iter())
        .enumerate()
    {
        let f = Level::build(fixed, shrink, sigma);
        let m = Level::build(moving, shrink, sigma);
        debug!(
            "level {level}: shrink {shrink}, sigma {sigma}, fixed {:?}, moving {:?}",
            f.data.dim(),
            m.data.dim()
        );
        let metric = LevelMetric::new(&f, &m, config.histogram_bins);
        let h = 0.5 * f.min_spacing();
        let out = optimizer::maximize(|p| metric.value(p), t, h, config, level)?;
        t = out.best;
        levels.push(LevelSummary {
            shrink,
            sigma,
            iterations: out.iterations,
            metric: out.value,
            stop: out.stop,
            transform: t,
        });
    }
    info!("registration finished with offset {:?} mm", t.offset);
    Ok((t, levels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RegistrationError, VolumeError, VolumeGeometry};
    use ndarray::Array3;

    fn blob(n: usize, c: [f64; 3]) -> Volume {
        Volume::new(Array3::from_shape_fn((n, n, n), |(z, y, x)| {
            let d2 = (z as f64 - c[0]).powi(2)
                + (y as f64 - c[1]).powi(2)
                + (x as f64 - c[2]).powi(2);
            (100.0 * (-d2 / 32.0).exp()) as f32
        }))
        .unwrap()
    }

    #[test]
    fn test_register_identity() {
        let v = blob(16, [8.0, 8.0, 8.0]);
        let cfg = RegistrationConfig::default().with_pyramid(vec![2, 1], vec![1.0, 0.0]);
        let out = register_with(&v, &v, &cfg).unwrap();
        assert!(out.transform.offset.iter().all(|o| o.abs() < 0.5));
        assert_eq!(out.registered.shape(), v.shape());
        assert_eq!(out.levels.len(), 2);
        assert_eq!(out.levels[1].transform, out.transform);
    }

    #[test]
    fn test_register_invalid_config() {
        let v = blob(8, [4.0, 4.0, 4.0]);
        let cfg = RegistrationConfig::default().with_max_iterations(0);
        assert!(matches!(
            register_with(&v, &v, &cfg),
            Err(VolumeError::Registration(RegistrationError::InvalidConfig(_)))
        ));
    }
}
