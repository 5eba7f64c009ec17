//! 强度统计: 单体数据统计量、分位数、质心、Pearson 相关系数,
//! 以及两个体数据共用的显示窗口.

use itertools::{Itertools, MinMaxResult};
use ndarray::{ArrayBase, Data, Dimension};
use ordered_float::OrderedFloat;

use crate::{DisplayWindow, Point3d, Volume, VolumeGeometry};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

mod compare;

pub use compare::{absolute_difference, compare_volumes, VolumeComparison};

/// 单个体数据的强度统计量. 标准差为总体标准差.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VolumeSummary {
    /// 最小值.
    pub min: f64,

    /// 最大值.
    pub max: f64,

    /// 均值.
    pub mean: f64,

    /// 总体标准差.
    pub std: f64,

    /// 第 1 百分位数.
    pub p1: f64,

    /// 第 99 百分位数.
    pub p99: f64,

    /// 非零体素个数.
    pub nonzero: usize,

    /// 体素总数.
    pub total: usize,
}

/// [`compute_stats`] 的结果.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IntensityStatistics {
    /// 第一个体数据的统计量.
    pub first: VolumeSummary,

    /// 第二个体数据的统计量 (若提供).
    pub second: Option<VolumeSummary>,

    /// 两个体数据共用的显示窗口 (仅当提供了第二个体数据时存在).
    pub window: Option<DisplayWindow>,
}

/// 计算一个或两个体数据的强度统计量.
///
/// 提供 `second` 时, 额外计算共用显示窗口: 将两个体数据中严格为正的体素汇总,
/// 取其第 1 与第 99 百分位数作为窗下限与窗上限. 若不存在正值体素,
/// 则退化为汇总数据的最小值与最大值.
pub fn compute_stats(first: &Volume, second: Option<&Volume>) -> IntensityStatistics {
    let window = second.and_then(|s| combined_window(first, s));
    IntensityStatistics {
        first: summarize(first),
        second: second.map(summarize),
        window,
    }
}

/// 计算单个体数据的强度统计量.
pub fn summarize(volume: &Volume) -> VolumeSummary {
    let data = volume.data();
    let (min, max) = match data.iter().copied().map(OrderedFloat).minmax() {
        MinMaxResult::NoElements => (0.0, 0.0),
        MinMaxResult::OneElement(v) => (f64::from(v.0), f64::from(v.0)),
        MinMaxResult::MinMax(lo, hi) => (f64::from(lo.0), f64::from(hi.0)),
    };
    let (mean, std) = mean_std(data.iter().copied());
    let sorted = sorted_f64(data.iter().copied());
    VolumeSummary {
        min,
        max,
        mean,
        std,
        p1: percentile_of_sorted(&sorted, 1.0).unwrap_or(min),
        p99: percentile_of_sorted(&sorted, 99.0).unwrap_or(max),
        nonzero: data.iter().filter(|v| **v != 0.0).count(),
        total: volume.size(),
    }
}

fn combined_window(a: &Volume, b: &Volume) -> Option<DisplayWindow> {
    let pooled = || a.data().into_iter().chain(b.data()).copied();
    let positive = sorted_f64(pooled().filter(|v| *v > 0.0));
    let (lo, hi) = if positive.is_empty() {
        let sorted = sorted_f64(pooled());
        (*sorted.first()?, *sorted.last()?)
    } else {
        (
            percentile_of_sorted(&positive, 1.0)?,
            percentile_of_sorted(&positive, 99.0)?,
        )
    };
    DisplayWindow::from_range(lo, hi)
}

/// 线性插值分位数, 与 `numpy.percentile` 的默认行为一致.
///
/// `q` 以百分数给出 (`0 <= q <= 100`). 数据为空或 `q` 越界时返回 `None`.
pub fn percentile<I: IntoIterator<Item = f32>>(data: I, q: f64) -> Option<f64> {
    percentile_of_sorted(&sorted_f64(data), q)
}

/// 同 [`percentile`], 但 `sorted` 必须已经升序排列.
pub fn percentile_of_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=100.0).contains(&q) {
        return None;
    }
    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// 转换为 `f64` 并升序排列.
pub(crate) fn sorted_f64<I: IntoIterator<Item = f32>>(data: I) -> Vec<f64> {
    let mut v: Vec<f64> = data.into_iter().map(f64::from).collect();
    v.sort_unstable_by_key(|x| OrderedFloat(*x));
    v
}

/// 均值与总体标准差. 数据为空时返回 `(0, 0)`.
pub(crate) fn mean_std<I>(data: I) -> (f64, f64)
where
    I: IntoIterator<Item = f32>,
    I::IntoIter: Clone,
{
    let it = data.into_iter();
    let (n, sum) = it
        .clone()
        .fold((0usize, 0.0f64), |(n, s), v| (n + 1, s + f64::from(v)));
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean = sum / n as f64;
    let var = it.map(|v| (f64::from(v) - mean).powi(2)).sum::<f64>() / n as f64;
    (mean, var.sqrt())
}

/// 两个同形数组的 Pearson 相关系数.
///
/// 形状不同、数组为空、任一方差为 0 或结果非有限时返回 `None`.
/// 结果被截断至 `[-1, 1]`.
pub fn pearson<S1, S2, D>(a: &ArrayBase<S1, D>, b: &ArrayBase<S2, D>) -> Option<f64>
where
    S1: Data<Elem = f32>,
    S2: Data<Elem = f32>,
    D: Dimension,
{
    if a.shape() != b.shape() || a.is_empty() {
        return None;
    }
    let n = a.len() as f64;
    let ma = a.iter().map(|v| f64::from(*v)).sum::<f64>() / n;
    let mb = b.iter().map(|v| f64::from(*v)).sum::<f64>() / n;
    let (mut cov, mut va, mut vb) = (0.0, 0.0, 0.0);
    for (x, y) in a.iter().zip(b.iter()) {
        let dx = f64::from(*x) - ma;
        let dy = f64::from(*y) - mb;
        cov += dx * dy;
        va += dx * dx;
        vb += dy * dy;
    }
    if va <= 0.0 || vb <= 0.0 {
        return None;
    }
    let r = cov / (va * vb).sqrt();
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

/// 以强度为权重计算质心. 仅统计强度严格大于 0 的体素.
///
/// 返回值按 `(x, y, z)` 顺序给出, 与体数据的 `(z, y, x)` 索引顺序相反,
/// 单位为体素. 若不存在正值体素, 返回几何中心 `(shape[2]/2, shape[1]/2, shape[0]/2)`.
pub fn center_of_mass(volume: &Volume) -> Point3d {
    let (mut w, mut sz, mut sy, mut sx) = (0.0f64, 0.0f64, 0.0f64, 0.0f64);
    for ((z, y, x), v) in volume.data().indexed_iter() {
        if *v > 0.0 {
            let v = f64::from(*v);
            w += v;
            sz += v * z as f64;
            sy += v * y as f64;
            sx += v * x as f64;
        }
    }
    if w > 0.0 {
        (sx / w, sy / w, sz / w)
    } else {
        let (z, y, x) = volume.shape();
        (x as f64 / 2.0, y as f64 / 2.0, z as f64 / 2.0)
    }
}

/// 两点欧氏距离.
#[inline]
pub fn distance(a: Point3d, b: Point3d) -> f64 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2) + (a.2 - b.2).powi(2)).sqrt()
}
