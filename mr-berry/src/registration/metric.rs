//! 基于联合直方图的互信息度量.
//!
//! 两个强度都按各自的取值范围线性映射到 `[0, bins - 1]`, 并以部分体积
//! (双线性) 权重分摊到相邻的两个 bin 上, 使度量对平移量连续.

use itertools::{Itertools, MinMaxResult};
use ndarray::{ArrayView3, Zip};

use super::pyramid::Level;
use super::resample::sample_linear;
use super::transform::Translation;

/// 强度到连续 bin 坐标的线性映射.
#[derive(Copy, Clone, Debug)]
struct Binning {
    min: f64,
    scale: f64,
}

impl Binning {
    fn new(data: ArrayView3<f32>, bins: usize) -> Self {
        let (min, max) = match data.iter().copied().minmax_by(f32::total_cmp) {
            MinMaxResult::NoElements => (0.0, 0.0),
            MinMaxResult::OneElement(v) => (v, v),
            MinMaxResult::MinMax(lo, hi) => (lo, hi),
        };
        let (min, max) = (f64::from(min), f64::from(max));
        let scale = if max > min {
            (bins - 1) as f64 / (max - min)
        } else {
            0.0
        };
        Self { min, scale }
    }

    #[inline]
    fn eval(&self, v: f64, bins: usize) -> f64 {
        ((v - self.min) * self.scale).clamp(0.0, (bins - 1) as f64)
    }
}

/// 联合直方图.
#[derive(Clone, Debug)]
pub struct JointHistogram {
    bins: usize,
    counts: Vec<f64>,
    total: f64,
}

impl JointHistogram {
    /// 新建空直方图.
    pub fn new(bins: usize) -> Self {
        Self {
            bins,
            counts: vec![0.0; bins * bins],
            total: 0.0,
        }
    }

    /// 以部分体积权重加入一个样本. `a`, `b` 为 `[0, bins - 1]` 内的连续 bin 坐标.
    pub fn add(&mut self, a: f64, b: f64) {
        let last = self.bins - 1;
        let (a0, b0) = ((a.floor() as usize).min(last), (b.floor() as usize).min(last));
        let (a1, b1) = ((a0 + 1).min(last), (b0 + 1).min(last));
        let (fa, fb) = (a - a0 as f64, b - b0 as f64);
        let n = self.bins;
        self.counts[a0 * n + b0] += (1.0 - fa) * (1.0 - fb);
        self.counts[a0 * n + b1] += (1.0 - fa) * fb;
        self.counts[a1 * n + b0] += fa * (1.0 - fb);
        self.counts[a1 * n + b1] += fa * fb;
        self.total += 1.0;
    }

    /// 样本个数.
    #[inline]
    pub fn total(&self) -> f64 {
        self.total
    }

    /// 互信息 (以 e 为底). 直方图为空时返回 `None`.
    pub fn mutual_information(&self) -> Option<f64> {
        if self.total <= 0.0 {
            return None;
        }
        let n = self.bins;
        let mut pa = vec![0.0; n];
        let mut pb = vec![0.0; n];
        for (i, j) in (0..n).cartesian_product(0..n) {
            let p = self.counts[i * n + j] / self.total;
            pa[i] += p;
            pb[j] += p;
        }
        let mut mi = 0.0;
        for (i, j) in (0..n).cartesian_product(0..n) {
            let p = self.counts[i * n + j] / self.total;
            if p > 0.0 {
                mi += p * (p / (pa[i] * pb[j])).ln();
            }
        }
        Some(mi)
    }
}

/// 两个同形数组之间的互信息. 形状不同或数组为空时返回 `None`.
pub fn mutual_information(a: ArrayView3<f32>, b: ArrayView3<f32>, bins: usize) -> Option<f64> {
    if a.dim() != b.dim() || a.is_empty() || bins < 2 {
        return None;
    }
    let (ba, bb) = (Binning::new(a, bins), Binning::new(b, bins));
    let mut h = JointHistogram::new(bins);
    Zip::from(&a).and(&b).for_each(|x, y| {
        h.add(
            ba.eval(f64::from(*x), bins),
            bb.eval(f64::from(*y), bins),
        )
    });
    h.mutual_information()
}

/// 固定图像与运动图像在同一金字塔层上的互信息度量.
pub(crate) struct LevelMetric<'a> {
    fixed: &'a Level,
    moving: &'a Level,
    bins: usize,
    fixed_binning: Binning,
    moving_binning: Binning,
}

impl<'a> LevelMetric<'a> {
    pub fn new(fixed: &'a Level, moving: &'a Level, bins: usize) -> Self {
        Self {
            fixed,
            moving,
            bins,
            fixed_binning: Binning::new(fixed.data.view(), bins),
            moving_binning: Binning::new(moving.data.view(), bins),
        }
    }

    /// 在平移 `t` 下的互信息. 没有任何固定图像采样点映射到运动图像内部时返回 `None`.
    pub fn value(&self, t: &Translation) -> Option<f64> {
        let fs = self.fixed.spacing;
        let ms = self.moving.spacing;
        let src = self.moving.data.view();
        let mut h = JointHistogram::new(self.bins);
        for ((z, y, x), v) in self.fixed.data.indexed_iter() {
            let p = t.apply([z as f64 * fs[0], y as f64 * fs[1], x as f64 * fs[2]]);
            let idx = [p[0] / ms[0], p[1] / ms[1], p[2] / ms[2]];
            if let Some(m) = sample_linear(&src, idx) {
                h.add(
                    self.fixed_binning.eval(f64::from(*v), self.bins),
                    self.moving_binning.eval(m, self.bins),
                );
            }
        }
        h.mutual_information()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_histogram_weights() {
        let mut h = JointHistogram::new(3);
        h.add(0.5, 2.0);
        assert_eq!(h.total(), 1.0);
        let s: f64 = h.counts.iter().sum();
        assert!((s - 1.0).abs() < 1e-12);
        assert_eq!(h.counts[2], 0.5);
        assert_eq!(h.counts[5], 0.5);
        assert!(JointHistogram::new(3).mutual_information().is_none());
    }

    #[test]
    fn test_mutual_information() {
        let a = Array3::from_shape_fn((4, 4, 4), |(z, y, x)| ((z + y + x) % 2) as f32);
        let flat = Array3::<f32>::zeros((4, 4, 4));
        // 两类等概率: 自身互信息为 ln 2.
        let mi = mutual_information(a.view(), a.view(), 2).unwrap();
        assert!((mi - std::f64::consts::LN_2).abs() < 1e-12);
        // 与常量无关.
        assert!(mutual_information(a.view(), flat.view(), 2).unwrap().abs() < 1e-12);
        assert!(mutual_information(a.view(), flat.view(), 1).is_none());
    }
}
