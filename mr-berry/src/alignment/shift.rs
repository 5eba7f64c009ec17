//! 整数体素平移的暴力搜索.

use std::ops::Range;

use itertools::iproduct;
use log::{debug, warn};
use ndarray::{s, Array3, ArrayView3};

use super::config::ShiftSearch;
use crate::{Idx3d, Shift3d, Volume, VolumeGeometry};

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
    }
}

/// 以体数据中心为中心的立方体 ROI 在每个轴上的下标范围.
///
/// 边长为 `min(roi_max, min(shape) / 2)`, 在每个轴上取 `[c - half, c + half)`,
/// 其中 `c = dim / 2`, `half = 边长 / 2`.
pub fn central_roi(shape: Idx3d, roi_max: usize) -> [Range<usize>; 3] {
    let (d, h, w) = shape;
    let roi_size = roi_max.min(d.min(h).min(w) / 2);
    let half = roi_size / 2;
    [d, h, w].map(|n| {
        let c = n / 2;
        (c - half)..(c + half)
    })
}

/// 估计 `b` 相对于 `a` 的整数体素位移, 分量顺序与 `(z, y, x)` 一致.
///
/// 取两者中心 ROI, 对每个候选位移 `d` 将 `b` 的 ROI 循环平移 `-d`
/// 并与 `a` 的 ROI 计算 Pearson 相关系数, 取相关系数最大的候选.
/// 形状不一致时返回 `(0, 0, 0)`.
pub fn detect_shift(a: &Volume, b: &Volume, search: &ShiftSearch) -> Shift3d {
    if !a.same_shape(b) {
        warn!("shift detection requested for volumes of different shapes");
        return (0, 0, 0);
    }
    let [rz, ry, rx] = central_roi(a.shape(), search.roi_max);
    let roi_a = a.data().slice_move(s![rz.clone(), ry.clone(), rx.clone()]);
    let roi_b = b.data().slice_move(s![rz, ry, rx]);
    search_shift(roi_a, roi_b, search)
}

/// 去均值后的 ROI 及其平方和.
struct Centered {
    data: Array3<f64>,
    sq_sum: f64,
}

impl Centered {
    fn new(roi: ArrayView3<f32>) -> Self {
        let n = roi.len() as f64;
        let mean = roi.iter().map(|v| f64::from(*v)).sum::<f64>() / n;
        let data = roi.mapv(|v| f64::from(v) - mean);
        let sq_sum = data.iter().map(|v| v * v).sum();
        Self { data, sq_sum }
    }
}

/// `a` 与 `b` 循环平移 `-d` 之后的相关系数.
///
/// 循环平移只重排元素, 不改变均值与方差, 因此只需重新计算互相关项.
fn rolled_correlation(a: &Centered, b: &Centered, (dz, dy, dx): Shift3d) -> Option<f64> {
    let (ez, ey, ex) = a.data.dim();
    let wrap = |i: usize, d: i32, e: usize| (i as i64 + i64::from(d)).rem_euclid(e as i64) as usize;
    let mut cross = 0.0;
    for z in 0..ez {
        let bz = wrap(z, dz, ez);
        for y in 0..ey {
            let by = wrap(y, dy, ey);
            let ra = a.data.slice(s![z, y, ..]);
            let rb = b.data.slice(s![bz, by, ..]);
            for (x, va) in ra.iter().enumerate() {
                cross += va * rb[wrap(x, dx, ex)];
            }
        }
    }
    let r = cross / (a.sq_sum * b.sq_sum).sqrt();
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

/// 全部候选位移, 顺序为 z 轴最外层, x 轴最内层, 各自升序.
///
/// 在某轴上绝对值达到 ROI 边长的位移会与另一候选混叠, 不参与搜索.
fn candidates(search: &ShiftSearch, extent: Idx3d) -> Vec<Shift3d> {
    let c = search.candidates();
    let fits = |d: i32, e: usize| (d.unsigned_abs() as usize) < e;
    iproduct!(c.iter().copied(), c.iter().copied(), c.iter().copied())
        .filter(|(dz, dy, dx)| fits(*dz, extent.0) && fits(*dy, extent.1) && fits(*dx, extent.2))
        .collect()
}

/// 在两个已经提取好的同形 ROI 上搜索最佳循环位移.
///
/// 若 `roi_b == roll(roi_a, d)`, 则返回 `d`. 相关系数并列时保留迭代顺序中最先出现的候选.
/// ROI 为空、形状不一致或任一 ROI 方差为 0 时返回 `(0, 0, 0)`.
pub fn search_shift(roi_a: ArrayView3<f32>, roi_b: ArrayView3<f32>, search: &ShiftSearch) -> Shift3d {
    if roi_a.is_empty() || roi_a.dim() != roi_b.dim() {
        return (0, 0, 0);
    }
    let a = Centered::new(roi_a);
    let b = Centered::new(roi_b);
    if a.sq_sum <= 0.0 || b.sq_sum <= 0.0 {
        debug!("zero-variance ROI in shift search");
        return (0, 0, 0);
    }
    let cands = candidates(search, roi_a.dim());

    cfg_if::cfg_if! {
        if #[cfg(feature = "rayon")] {
            let scores: Vec<Option<f64>> =
                cands.par_iter().map(|d| rolled_correlation(&a, &b, *d)).collect();
        } else {
            let scores: Vec<Option<f64>> =
                cands.iter().map(|d| rolled_correlation(&a, &b, *d)).collect();
        }
    }

    let mut best = -1.0;
    let mut best_shift = (0, 0, 0);
    for (d, r) in cands.into_iter().zip(scores) {
        if let Some(r) = r {
            if r > best {
                best = r;
                best_shift = d;
            }
        }
    }
    debug!("best shift {best_shift:?} with correlation {best:.4}");
    best_shift
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// 循环平移, 与 `numpy.roll` 一致.
    fn roll(a: &Array3<f32>, (dz, dy, dx): Shift3d) -> Array3<f32> {
        let (ez, ey, ex) = a.dim();
        Array3::from_shape_fn(a.dim(), |(z, y, x)| {
            let w = |i: usize, d: i32, e: usize| (i as i64 - d as i64).rem_euclid(e as i64) as usize;
            a[(w(z, dz, ez), w(y, dy, ey), w(x, dx, ex))]
        })
    }

    fn pattern(n: usize) -> Array3<f32> {
        let mut rng = StdRng::seed_from_u64(n as u64);
        Array3::from_shape_simple_fn((n, n, n), || rng.gen::<f32>())
    }

    #[test]
    fn test_central_roi() {
        let r = central_roi((10, 20, 30), 64);
        assert_eq!(r, [3..7, 8..12, 13..17]);
        let r = central_roi((200, 200, 200), 64);
        assert_eq!(r[0], 68..132);
        let r = central_roi((1, 20, 30), 64);
        assert!(r.iter().all(|r| r.is_empty()));
    }

    #[test]
    fn test_search_recovers_roll() {
        let a = pattern(24);
        let s = ShiftSearch::default();
        for d in [(4, 0, 0), (-6, 2, 10), (0, -8, -2)] {
            let b = roll(&a, d);
            assert_eq!(search_shift(a.view(), b.view(), &s), d);
        }
        assert_eq!(search_shift(a.view(), a.view(), &s), (0, 0, 0));
    }

    #[test]
    fn test_search_degenerate() {
        let a = pattern(8);
        let k = Array3::from_elem((8, 8, 8), 3.0f32);
        let s = ShiftSearch::default();
        assert_eq!(search_shift(a.view(), k.view(), &s), (0, 0, 0));
        assert_eq!(
            search_shift(a.view(), Array3::<f32>::zeros((0, 8, 8)).view(), &s),
            (0, 0, 0)
        );
    }

    #[test]
    fn test_candidates_skip_aliasing() {
        let s = ShiftSearch::default();
        assert_eq!(candidates(&s, (64, 64, 64)).len(), 1331);
        // 边长 4: 仅 -2, 0, 2 可用.
        assert_eq!(candidates(&s, (4, 4, 4)).len(), 27);
        assert_eq!(candidates(&s, (4, 4, 4))[0], (-2, -2, -2));
    }
}
