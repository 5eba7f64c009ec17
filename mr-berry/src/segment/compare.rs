use std::fmt;

use ndarray::Zip;

use crate::consts::label::is_foreground;
use crate::{SegmentationMask, VolumeGeometry, VolumeResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 两个时间点分割掩码的体积对比. 变化量均按 `second - first` 计算.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MaskComparison {
    /// 第一个掩码的前景体素个数.
    pub voxels_first: usize,

    /// 第二个掩码的前景体素个数.
    pub voxels_second: usize,

    /// 第一个掩码的前景体积 (立方毫米).
    pub volume_first: f64,

    /// 第二个掩码的前景体积 (立方毫米).
    pub volume_second: f64,

    /// 两者都是前景的体素个数.
    pub overlap: usize,

    /// 仅在第二个掩码中为前景的体素个数.
    pub gained: usize,

    /// 仅在第一个掩码中为前景的体素个数.
    pub lost: usize,
}

impl MaskComparison {
    /// 体积变化 (立方毫米).
    #[inline]
    pub fn volume_change(&self) -> f64 {
        self.volume_second - self.volume_first
    }

    /// 相对体积变化. 第一个掩码为空时返回 `None`.
    #[inline]
    pub fn relative_change(&self) -> Option<f64> {
        (self.volume_first > 0.0).then(|| self.volume_change() / self.volume_first)
    }

    /// Dice 系数 `2|A∩B| / (|A| + |B|)`. 两个掩码均为空时返回 `None`.
    #[inline]
    pub fn dice(&self) -> Option<f64> {
        let total = self.voxels_first + self.voxels_second;
        (total > 0).then(|| 2.0 * self.overlap as f64 / total as f64)
    }
}

impl fmt::Display for MaskComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Volume 1: {} voxels, {:.2} mm3",
            self.voxels_first, self.volume_first
        )?;
        writeln!(
            f,
            "Volume 2: {} voxels, {:.2} mm3",
            self.voxels_second, self.volume_second
        )?;
        match self.relative_change() {
            Some(r) => writeln!(
                f,
                "Change: {:+.2} mm3 ({:+.1}%)",
                self.volume_change(),
                r * 100.0
            )?,
            None => writeln!(f, "Change: {:+.2} mm3", self.volume_change())?,
        }
        if let Some(d) = self.dice() {
            writeln!(f, "Dice: {d:.4}")?;
        }
        write!(f, "Gained: {} voxels, lost: {} voxels", self.gained, self.lost)
    }
}

/// 比较两个同形掩码. 体积按各自的体素间距计算. 形状不一致时返回 `Err`.
pub fn compare_masks(
    first: &SegmentationMask,
    second: &SegmentationMask,
) -> VolumeResult<MaskComparison> {
    first.ensure_same_shape(second)?;

    let (mut a, mut b, mut overlap) = (0usize, 0usize, 0usize);
    Zip::from(&first.data())
        .and(&second.data())
        .for_each(|p, q| match (is_foreground(*p), is_foreground(*q)) {
            (true, true) => {
                a += 1;
                b += 1;
                overlap += 1;
            }
            (true, false) => a += 1,
            (false, true) => b += 1,
            (false, false) => {}
        });

    Ok(MaskComparison {
        voxels_first: a,
        voxels_second: b,
        volume_first: a as f64 * first.voxel(),
        volume_second: b as f64 * second.voxel(),
        overlap,
        gained: b - overlap,
        lost: a - overlap,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Spacing, VolumeError};
    use ndarray::{s, Array3};

    #[test]
    fn test_compare_masks() {
        let sp = Spacing::new(1.0, 1.0, 2.0).unwrap();
        let mut a = Array3::zeros((10, 10, 10));
        a.slice_mut(s![0..4, 0..5, 0..5]).fill(1);
        let mut b = Array3::zeros((10, 10, 10));
        b.slice_mut(s![2..6, 0..5, 0..5]).fill(1);

        let c = compare_masks(
            &SegmentationMask::new(a, sp).unwrap(),
            &SegmentationMask::new(b, sp).unwrap(),
        )
        .unwrap();
        assert_eq!((c.voxels_first, c.voxels_second), (100, 100));
        assert_eq!(c.volume_first, 200.0);
        assert_eq!((c.overlap, c.gained, c.lost), (50, 50, 50));
        assert_eq!(c.volume_change(), 0.0);
        assert_eq!(c.relative_change(), Some(0.0));
        assert_eq!(c.dice(), Some(0.5));
        assert!(c.to_string().contains("Dice: 0.5000"));
    }

    #[test]
    fn test_compare_empty_and_mismatch() {
        let e = SegmentationMask::new(Array3::zeros((3, 3, 3)), Spacing::default()).unwrap();
        let c = compare_masks(&e, &e).unwrap();
        assert_eq!(c.dice(), None);
        assert_eq!(c.relative_change(), None);

        let f = SegmentationMask::new(Array3::zeros((3, 3, 4)), Spacing::default()).unwrap();
        assert_eq!(
            compare_masks(&e, &f),
            Err(VolumeError::ShapeMismatch {
                expected: (3, 3, 3),
                actual: (3, 3, 4)
            })
        );
    }
}
