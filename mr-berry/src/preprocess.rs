//! 体数据预处理: 分位数截断 -> 归一化 -> 高斯平滑. 顺序固定.

use log::{debug, warn};
use ndarray::ArrayD;

use crate::filter::gaussian_blur_isotropic;
use crate::stats::{percentile_of_sorted, sorted_f64};
use crate::{validate_volume_shape, Spacing, Volume, VolumeError, VolumeGeometry, VolumeResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 预处理参数.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PreprocessConfig {
    /// 是否线性归一化到 `[0, 1]`.
    pub normalize: bool,

    /// 是否做高斯平滑.
    pub smooth: bool,

    /// 高斯平滑 sigma (体素), 三个方向相同.
    pub sigma: f64,

    /// 截断下限分位数 (百分数).
    pub lower_percentile: f64,

    /// 截断上限分位数 (百分数).
    pub upper_percentile: f64,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            normalize: true,
            smooth: true,
            sigma: 1.0,
            lower_percentile: 1.0,
            upper_percentile: 99.0,
        }
    }
}

impl PreprocessConfig {
    /// 设置是否归一化.
    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    /// 设置是否平滑及平滑 sigma.
    pub fn with_smoothing(mut self, smooth: bool, sigma: f64) -> Self {
        self.smooth = smooth;
        self.sigma = sigma;
        self
    }

    /// 设置截断分位数.
    pub fn with_percentiles(mut self, lower: f64, upper: f64) -> Self {
        self.lower_percentile = lower;
        self.upper_percentile = upper;
        self
    }

    /// 校验参数.
    pub fn validate(&self) -> VolumeResult<()> {
        let (lo, hi) = (self.lower_percentile, self.upper_percentile);
        if !(0.0 <= lo && lo <= hi && hi <= 100.0) {
            return Err(VolumeError::InvalidConfig(
                "percentiles must satisfy 0 <= lower <= upper <= 100",
            ));
        }
        if !self.sigma.is_finite() || self.sigma < 0.0 {
            return Err(VolumeError::InvalidConfig(
                "smoothing sigma must be finite and non-negative",
            ));
        }
        Ok(())
    }
}

/// 以默认截断分位数 (1, 99) 与默认 sigma (1) 预处理体数据.
#[inline]
pub fn preprocess(volume: &Volume, normalize: bool, smooth: bool) -> VolumeResult<Volume> {
    preprocess_with(
        volume,
        &PreprocessConfig {
            normalize,
            smooth,
            ..Default::default()
        },
    )
}

/// 以给定参数预处理体数据. 输入不会被修改.
pub fn preprocess_with(volume: &Volume, config: &PreprocessConfig) -> VolumeResult<Volume> {
    config.validate()?;
    let data = volume.data();
    validate_volume_shape(data.shape())?;

    let sorted = sorted_f64(data.iter().copied());
    let (lo, hi) = match (
        percentile_of_sorted(&sorted, config.lower_percentile),
        percentile_of_sorted(&sorted, config.upper_percentile),
    ) {
        (Some(lo), Some(hi)) => (lo, hi),
        _ => return Err(crate::ShapeError::Empty.into()),
    };
    debug!("clipping intensities to [{lo:.4}, {hi:.4}]");

    let (lo32, hi32) = (lo as f32, hi as f32);
    let mut out = data.mapv(|v| v.clamp(lo32, hi32));

    if config.normalize {
        // 以截断后的 f32 边界归一化, 保证结果落在 [0, 1] 内.
        let (lo, hi) = (f64::from(lo32), f64::from(hi32));
        let range = hi - lo;
        if range > 0.0 {
            out.mapv_inplace(|v| ((f64::from(v) - lo) / range).clamp(0.0, 1.0) as f32);
        } else {
            warn!("constant volume after clipping, normalized to zeros");
            out.fill(0.0);
        }
    }

    if config.smooth && config.sigma > 0.0 {
        out = gaussian_blur_isotropic(out.view(), config.sigma);
    }
    Ok(Volume::from_parts(out, volume.spacing()))
}

/// 同 [`preprocess_with`], 但输入为任意维度的数组. 非三维数组返回形状错误.
pub fn preprocess_dyn(
    data: ArrayD<f32>,
    spacing: Spacing,
    config: &PreprocessConfig,
) -> VolumeResult<Volume> {
    preprocess_with(&Volume::from_dyn(data, spacing)?, config)
}
