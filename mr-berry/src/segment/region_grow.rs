//! 置信连通区域生长.

use std::collections::VecDeque;

use log::{debug, warn};
use ndarray::Array3;

use crate::consts::label::MASK_FOREGROUND;
use crate::filter::{shift_in_bounds, Connectivity};
use crate::stats::mean_std;
use crate::{Idx3d, SegmentationMask, Volume, VolumeError, VolumeGeometry, VolumeResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 区域生长参数.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RegionGrowConfig {
    /// 接受区间的半宽, 以区域标准差的倍数计.
    pub multiplier: f64,

    /// 生长轮数.
    pub iterations: usize,

    /// 种子点周围初始立方邻域的半径 (体素).
    pub initial_radius: usize,

    /// 生长时使用的邻接规则.
    pub connectivity: Connectivity,
}

impl Default for RegionGrowConfig {
    fn default() -> Self {
        Self {
            multiplier: 2.5,
            iterations: 5,
            initial_radius: 1,
            connectivity: Connectivity::Face6,
        }
    }
}

impl RegionGrowConfig {
    /// 设置标准差倍数.
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// 设置生长轮数.
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// 设置初始邻域半径.
    pub fn with_initial_radius(mut self, radius: usize) -> Self {
        self.initial_radius = radius;
        self
    }

    /// 设置邻接规则.
    pub fn with_connectivity(mut self, connectivity: Connectivity) -> Self {
        self.connectivity = connectivity;
        self
    }

    /// 校验参数.
    pub fn validate(&self) -> VolumeResult<()> {
        if !self.multiplier.is_finite() || self.multiplier < 0.0 {
            return Err(VolumeError::InvalidConfig(
                "region growing multiplier must be finite and non-negative",
            ));
        }
        Ok(())
    }
}

/// 闭区间 `[lower, upper]` 形式的强度接受区间.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AcceptanceInterval {
    /// 下界.
    pub lower: f64,

    /// 上界.
    pub upper: f64,
}

impl AcceptanceInterval {
    /// `[mean - multiplier * std, mean + multiplier * std]`.
    #[inline]
    pub fn from_stats(mean: f64, std: f64, multiplier: f64) -> Self {
        let half = multiplier * std;
        Self {
            lower: mean - half,
            upper: mean + half,
        }
    }

    /// 强度值是否落在区间内?
    #[inline]
    pub fn contains(&self, v: f32) -> bool {
        let v = f64::from(v);
        self.lower <= v && v <= self.upper
    }
}

/// 以默认参数从 `seed` 出发做区域生长.
#[inline]
pub fn grow_region(volume: &Volume, seed: Idx3d) -> VolumeResult<SegmentationMask> {
    grow_region_with(volume, seed, &RegionGrowConfig::default())
}

/// 从 `seed` 出发做置信连通区域生长, 返回与 `volume` 同形状、同间距的二值掩码.
///
/// 初始区域为种子点周围半径 `initial_radius` 的立方邻域 (截断到体数据内部).
/// 第 `r` 轮 (从 1 开始):
///
/// 1. 统计当前区域强度的均值与总体标准差, 得到接受区间;
/// 2. 以当前区域为起点按 `connectivity` 做洪泛填充, 仅接纳强度落在区间内、
///   且位于种子点周围半径 `initial_radius + r` 立方邻域内的体素.
///
/// 区域只增不减. `iterations == 0` 时结果恰好是初始邻域.
///
/// # 注意
///
/// 种子点越界时返回 [`VolumeError::SeedOutOfBounds`]. 区域强度方差为零时
/// 接受区间退化为一个点, 只记录一条警告, 不视为错误.
pub fn grow_region_with(
    volume: &Volume,
    seed: Idx3d,
    config: &RegionGrowConfig,
) -> VolumeResult<SegmentationMask> {
    config.validate()?;
    if !volume.check(&seed) {
        return Err(VolumeError::SeedOutOfBounds {
            seed,
            shape: volume.shape(),
        });
    }

    let mut imp = GrowImp::new(volume, seed, config);
    for round in 1..=config.iterations {
        let added = imp.grow(round);
        debug!("region growing round {round}: +{added}, {} voxel(s)", imp.region.len());
    }

    let mut mask = SegmentationMask::zeros_like(volume);
    for pos in imp.region {
        mask[pos] = MASK_FOREGROUND;
    }
    Ok(mask)
}

/// `grow_region_with` 的实现细节.
struct GrowImp<'a> {
    volume: &'a Volume,
    seed: Idx3d,
    config: &'a RegionGrowConfig,
    accepted: Array3<bool>,
    region: Vec<Idx3d>,
}

impl<'a> GrowImp<'a> {
    fn new(volume: &'a Volume, seed: Idx3d, config: &'a RegionGrowConfig) -> Self {
        let mut imp = Self {
            volume,
            seed,
            config,
            accepted: Array3::from_elem(volume.shape(), false),
            region: Vec::new(),
        };
        let r = config.initial_radius;
        let shape = volume.shape();
        let axis = |c: usize, n: usize| c.saturating_sub(r)..=(c + r).min(n - 1);
        for z in axis(seed.0, shape.0) {
            for y in axis(seed.1, shape.1) {
                for x in axis(seed.2, shape.2) {
                    imp.accept((z, y, x));
                }
            }
        }
        imp
    }

    #[inline]
    fn accept(&mut self, pos: Idx3d) {
        self.accepted[pos] = true;
        self.region.push(pos);
    }

    /// 是否位于种子点周围半径 `radius` 的立方邻域内?
    #[inline]
    fn in_cube(&self, (z, y, x): Idx3d, radius: usize) -> bool {
        let (sz, sy, sx) = self.seed;
        z.abs_diff(sz) <= radius && y.abs_diff(sy) <= radius && x.abs_diff(sx) <= radius
    }

    /// 运行第 `round` 轮生长, 返回新增体素个数.
    fn grow(&mut self, round: usize) -> usize {
        let (mean, std) = mean_std(self.region.iter().map(|p| self.volume[*p]));
        if std == 0.0 {
            warn!(
                "zero intensity variance around seed {:?} in round {round}",
                self.seed
            );
        }
        let interval = AcceptanceInterval::from_stats(mean, std, self.config.multiplier);
        let radius = self.config.initial_radius + round;
        let shape = self.volume.shape();
        let offsets = self.config.connectivity.offsets();

        let before = self.region.len();
        let mut q: VecDeque<Idx3d> = self.region.iter().copied().collect();
        while let Some(cur) = q.pop_front() {
            for n in offsets.iter().filter_map(|d| shift_in_bounds(cur, *d, shape)) {
                if self.accepted[n] || !self.in_cube(n, radius) {
                    continue;
                }
                if interval.contains(self.volume[n]) {
                    self.accept(n);
                    q.push_back(n);
                }
            }
        }
        self.region.len() - before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::s;

    fn bright_cube() -> Volume {
        // 20^3 背景 (10), 中间 8^3 亮块 (100), 亮块内有微小起伏.
        let mut a = Array3::from_elem((20, 20, 20), 10.0f32);
        a.slice_mut(s![6..14, 6..14, 6..14]).fill(100.0);
        for ((z, y, x), v) in a.indexed_iter_mut() {
            *v += ((z + 2 * y + 3 * x) % 3) as f32;
        }
        Volume::new(a).unwrap()
    }

    #[test]
    fn test_initial_neighbourhood_only() {
        let v = Volume::new(Array3::from_elem((7, 7, 7), 5.0)).unwrap();
        let cfg = RegionGrowConfig::default().with_iterations(0);
        let m = grow_region_with(&v, (3, 3, 3), &cfg).unwrap();
        assert_eq!(m.count(), 27);
        assert_eq!(m[(2, 2, 2)], 1);
        assert_eq!(m[(1, 3, 3)], 0);

        // 角落处初始邻域被截断.
        let m = grow_region_with(&v, (0, 0, 0), &cfg).unwrap();
        assert_eq!(m.count(), 8);
    }

    #[test]
    fn test_grow_bright_cube() {
        let v = bright_cube();
        let cfg = RegionGrowConfig::default().with_iterations(4);
        let m = grow_region_with(&v, (10, 10, 10), &cfg).unwrap();
        // 半径 1 + 4 = 5 的立方体 (5..=15) 与亮块 (6..14) 的交集.
        assert_eq!(m.count(), 8 * 8 * 8);
        assert_eq!(m[(6, 6, 6)], 1);
        assert_eq!(m[(5, 10, 10)], 0);
        assert_eq!(m.spacing(), v.spacing());
    }

    #[test]
    fn test_growth_is_bounded_per_round() {
        let v = Volume::new(Array3::from_elem((15, 15, 15), 1.0)).unwrap();
        let cfg = RegionGrowConfig::default().with_iterations(2);
        let m = grow_region_with(&v, (7, 7, 7), &cfg).unwrap();
        assert_eq!(m.count(), 7 * 7 * 7);
    }

    #[test]
    fn test_seed_out_of_bounds() {
        let v = bright_cube();
        assert_eq!(
            grow_region(&v, (0, 20, 0)),
            Err(VolumeError::SeedOutOfBounds {
                seed: (0, 20, 0),
                shape: (20, 20, 20)
            })
        );
    }
}
