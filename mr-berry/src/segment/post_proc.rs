//! 分割掩码后处理.

use log::debug;
use ndarray::Zip;

use crate::consts::label::{MASK_BACKGROUND, MASK_FOREGROUND};
use crate::filter::{
    close, fill_holes, gaussian_blur_isotropic, open, remove_small_components, Connectivity,
};
use crate::{SegmentationMask, VolumeError, VolumeResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 平滑后重新二值化的门限.
const SMOOTH_THRESHOLD: f32 = 0.5;

/// 后处理参数.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PostprocessConfig {
    /// 连通域最小体素个数, 更小的连通域会被移除.
    pub min_size: usize,

    /// 是否做平滑.
    pub smooth: bool,

    /// 平滑 sigma (体素).
    pub sigma: f64,

    /// 连通域标记使用的邻接规则.
    pub connectivity: Connectivity,
}

impl Default for PostprocessConfig {
    fn default() -> Self {
        Self {
            min_size: 100,
            smooth: true,
            sigma: 1.0,
            connectivity: Connectivity::Face6,
        }
    }
}

impl PostprocessConfig {
    /// 设置最小连通域.
    pub fn with_min_size(mut self, min_size: usize) -> Self {
        self.min_size = min_size;
        self
    }

    /// 设置是否平滑及平滑 sigma.
    pub fn with_smoothing(mut self, smooth: bool, sigma: f64) -> Self {
        self.smooth = smooth;
        self.sigma = sigma;
        self
    }

    /// 设置连通域的邻接规则.
    pub fn with_connectivity(mut self, connectivity: Connectivity) -> Self {
        self.connectivity = connectivity;
        self
    }

    /// 校验参数.
    pub fn validate(&self) -> VolumeResult<()> {
        if !self.sigma.is_finite() || self.sigma < 0.0 {
            return Err(VolumeError::InvalidConfig(
                "smoothing sigma must be finite and non-negative",
            ));
        }
        Ok(())
    }
}

/// 以默认参数后处理掩码, 返回新的掩码.
#[inline]
pub fn postprocess(mask: &SegmentationMask) -> VolumeResult<SegmentationMask> {
    postprocess_with(mask, &PostprocessConfig::default())
}

/// 以给定参数后处理掩码, 返回新的掩码.
pub fn postprocess_with(
    mask: &SegmentationMask,
    config: &PostprocessConfig,
) -> VolumeResult<SegmentationMask> {
    let mut out = mask.clone();
    postprocess_in_place(&mut out, config)?;
    Ok(out)
}

/// 就地后处理掩码, 返回被移除的小连通域个数.
///
/// 流程依次为:
///
/// 1. 二值化, 任何非零值变为前景;
/// 2. 填充完全封闭的内部空洞;
/// 3. 以 3×3×3 全 1 结构元先开运算、再闭运算;
/// 4. 按 `connectivity` 标记连通域, 移除体素个数严格小于 `min_size` 的连通域;
/// 5. 若 `smooth`, 转为浮点做高斯平滑, 再以 0.5 为门限重新二值化.
///
/// 顺序固定, 结果仍为二值掩码.
pub fn postprocess_in_place(
    mask: &mut SegmentationMask,
    config: &PostprocessConfig,
) -> VolumeResult<usize> {
    config.validate()?;

    mask.binarize();
    let filled = fill_holes(mask.data());
    let opened = open(filled.view(), Connectivity::Vertex26);
    let mut cleaned = close(opened.view(), Connectivity::Vertex26);
    let removed = remove_small_components(cleaned.view_mut(), config.min_size, config.connectivity);

    mask.data_mut().assign(&cleaned);

    if config.smooth && config.sigma > 0.0 {
        let soft = gaussian_blur_isotropic(mask.to_volume().data(), config.sigma);
        Zip::from(mask.data_mut()).and(&soft).for_each(|p, v| {
            *p = if *v > SMOOTH_THRESHOLD {
                MASK_FOREGROUND
            } else {
                MASK_BACKGROUND
            };
        });
    }

    debug!(
        "post-processing removed {removed} component(s), {} voxel(s) left",
        mask.count()
    );
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Spacing;
    use ndarray::{s, Array3};

    fn mask_of(a: Array3<u8>) -> SegmentationMask {
        SegmentationMask::new(a, Spacing::default()).unwrap()
    }

    #[test]
    fn test_small_block_removed() {
        let mut a = Array3::zeros((5, 5, 5));
        a.slice_mut(s![1..4, 1..4, 1..4]).fill(1);
        let out = postprocess(&mask_of(a)).unwrap();
        assert!(out.is_background());
    }

    #[test]
    fn test_hole_filled_and_speck_removed() {
        let mut a = Array3::zeros((16, 16, 16));
        a.slice_mut(s![2..10, 2..10, 2..10]).fill(7);
        a[(5, 5, 5)] = 0;
        a[(13, 13, 13)] = 1;
        let cfg = PostprocessConfig::default().with_smoothing(false, 1.0);
        let mut m = mask_of(a);
        let removed = postprocess_in_place(&mut m, &cfg).unwrap();
        assert_eq!(removed, 0);
        assert_eq!(m.count(), 512);
        assert_eq!(m[(5, 5, 5)], 1);
        assert_eq!(m[(2, 2, 2)], 1);
        assert_eq!(m[(13, 13, 13)], 0);
    }

    #[test]
    fn test_size_filter() {
        let mut a = Array3::zeros((20, 20, 20));
        a.slice_mut(s![1..6, 1..6, 1..6]).fill(1);
        a.slice_mut(s![10..18, 10..18, 10..18]).fill(1);
        let cfg = PostprocessConfig::default()
            .with_smoothing(false, 0.0)
            .with_min_size(200);
        let mut m = mask_of(a);
        assert_eq!(postprocess_in_place(&mut m, &cfg).unwrap(), 1);
        assert_eq!(m.count(), 512);
        assert_eq!(m[(3, 3, 3)], 0);
    }

    #[test]
    fn test_idempotent_without_smoothing() {
        let mut a = Array3::zeros((20, 20, 20));
        a.slice_mut(s![3..15, 4..16, 2..12]).fill(1);
        let cfg = PostprocessConfig::default().with_smoothing(false, 1.0);
        let once = postprocess_with(&mask_of(a), &cfg).unwrap();
        let twice = postprocess_with(&once, &cfg).unwrap();
        assert_eq!(once, twice);
        assert_eq!(once.count(), 12 * 12 * 10);
    }

    #[test]
    fn test_smoothing_keeps_large_block() {
        let mut a = Array3::zeros((20, 20, 20));
        a.slice_mut(s![4..16, 4..16, 4..16]).fill(1);
        let out = postprocess(&mask_of(a)).unwrap();
        assert!(out.data().iter().all(|p| *p <= 1));
        assert_eq!(out[(10, 10, 10)], 1);
        assert_eq!(out[(0, 0, 0)], 0);
    }
}
