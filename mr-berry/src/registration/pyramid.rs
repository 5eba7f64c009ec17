use ndarray::{s, Array3};

use crate::filter::gaussian_blur;
use crate::{Volume, VolumeGeometry};

/// 图像金字塔中的一层.
#[derive(Clone, Debug)]
pub(crate) struct Level {
    /// 平滑并下采样之后的数据.
    pub data: Array3<f32>,

    /// 该层体素间距 `[z, y, x]`.
    pub spacing: [f64; 3],
}

impl Level {
    /// 先以物理单位 `sigma` 做高斯平滑, 再每隔 `shrink` 个体素取样.
    ///
    /// 取样保留下标 `0, shrink, 2 * shrink, ...`, 因此该层下标 `i`
    /// 的物理坐标仍为 `i * spacing`.
    pub fn build(volume: &Volume, shrink: usize, sigma: f64) -> Self {
        let spacing = volume.spacing();
        let base = spacing.zyx();
        let smoothed = if sigma > 0.0 {
            gaussian_blur(
                volume.data(),
                [sigma / base[0], sigma / base[1], sigma / base[2]],
            )
        } else {
            volume.data().to_owned()
        };
        let step = shrink.max(1) as isize;
        let data = smoothed.slice(s![..;step, ..;step, ..;step]).to_owned();
        Self {
            data,
            spacing: spacing.scaled(step as f64).zyx(),
        }
    }

    /// 该层的最小体素间距.
    #[inline]
    pub fn min_spacing(&self) -> f64 {
        self.spacing.iter().copied().fold(f64::INFINITY, f64::min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Spacing;

    #[test]
    fn test_level_shape_and_spacing() {
        let v = Volume::with_spacing(
            Array3::from_shape_fn((9, 8, 5), |(z, y, x)| (z + y + x) as f32),
            Spacing::new(0.5, 1.0, 2.0).unwrap(),
        )
        .unwrap();
        let l = Level::build(&v, 4, 0.0);
        assert_eq!(l.data.dim(), (3, 2, 2));
        assert_eq!(l.spacing, [8.0, 4.0, 2.0]);
        assert_eq!(l.data[(2, 1, 1)], (8 + 4 + 4) as f32);
        assert_eq!(l.min_spacing(), 2.0);

        let l = Level::build(&v, 1, 1.0);
        assert_eq!(l.data.dim(), (9, 8, 5));
        assert_eq!(l.spacing, [2.0, 1.0, 0.5]);
    }
}
