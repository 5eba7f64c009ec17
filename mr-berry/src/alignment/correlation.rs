use log::warn;

use crate::stats::pearson;
use crate::{Orientation, Volume};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelIterator, ParallelIterator};
    }
}

/// 单个方向上逐切片相关系数的汇总.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OrientationCorrelation {
    /// 有效切片相关系数的均值. 没有有效切片时为 0.
    pub mean: f64,

    /// 有效切片相关系数的最小值. 没有有效切片时为 0.
    pub min: f64,

    /// 有效切片对的个数.
    pub valid: usize,

    /// 切片对总数.
    pub total: usize,
}

impl OrientationCorrelation {
    /// 汇总按切片顺序排列的相关系数. `None` 表示退化切片, 不计入统计.
    pub fn from_slices<I: IntoIterator<Item = Option<f64>>>(it: I) -> Self {
        let mut ans = Self::default();
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        for r in it {
            ans.total += 1;
            if let Some(r) = r {
                ans.valid += 1;
                sum += r;
                min = min.min(r);
            }
        }
        if ans.valid > 0 {
            ans.mean = sum / ans.valid as f64;
            ans.min = min;
        }
        ans
    }
}

/// 三个方向的逐切片相关性.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SliceCorrelations {
    /// 横断面.
    pub axial: OrientationCorrelation,

    /// 冠状面.
    pub coronal: OrientationCorrelation,

    /// 矢状面.
    pub sagittal: OrientationCorrelation,
}

impl SliceCorrelations {
    /// 获取 `orientation` 方向的汇总.
    #[inline]
    pub fn get(&self, orientation: Orientation) -> &OrientationCorrelation {
        match orientation {
            Orientation::Axial => &self.axial,
            Orientation::Coronal => &self.coronal,
            Orientation::Sagittal => &self.sagittal,
        }
    }

    /// 按横断面、冠状面、矢状面顺序迭代.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (Orientation, &OrientationCorrelation)> {
        Orientation::ALL.into_iter().map(|o| (o, self.get(o)))
    }
}

#[cfg(not(feature = "rayon"))]
fn per_slice(a: &Volume, b: &Volume, orientation: Orientation) -> Vec<Option<f64>> {
    a.slice_iter(orientation)
        .zip(b.slice_iter(orientation))
        .map(|(sa, sb)| pearson(&sa, &sb))
        .collect()
}

#[cfg(feature = "rayon")]
fn per_slice(a: &Volume, b: &Volume, orientation: Orientation) -> Vec<Option<f64>> {
    let n = a.slice_iter(orientation).len();
    (0..n)
        .into_par_iter()
        .map(|i| pearson(&a.slice_at(orientation, i), &b.slice_at(orientation, i)))
        .collect()
}

/// 计算两个体数据在横断面、冠状面、矢状面三个方向上的逐切片 Pearson 相关系数.
///
/// 任一切片标准差为 0 的切片对被跳过. 两个体数据形状不一致时,
/// 不计算任何切片, 三个方向均为 0.
pub fn slice_correlations(a: &Volume, b: &Volume) -> SliceCorrelations {
    if !a.same_shape(b) {
        warn!("slice correlations requested for volumes of different shapes");
        return SliceCorrelations::default();
    }
    let of = |o| OrientationCorrelation::from_slices(per_slice(a, b, o));
    SliceCorrelations {
        axial: of(Orientation::Axial),
        coronal: of(Orientation::Coronal),
        sagittal: of(Orientation::Sagittal),
    }
}
