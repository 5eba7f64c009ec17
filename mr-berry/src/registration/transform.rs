use crate::Spacing;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 物理坐标 `[z, y, x]`, 以毫米为单位. 体素下标 `i` 对应物理坐标 `i * spacing`.
pub type PhysicalPoint = [f64; 3];

/// 三维平移变换.
///
/// 将固定图像中的物理点 `p` 映射到运动图像中的物理点 `p + offset`.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Translation {
    /// 平移量 `[z, y, x]`, 以毫米为单位.
    pub offset: [f64; 3],
}

impl Translation {
    /// 恒等变换.
    #[inline]
    pub const fn identity() -> Self {
        Self { offset: [0.0; 3] }
    }

    /// 由 `[z, y, x]` 平移量构建.
    #[inline]
    pub const fn new(offset: [f64; 3]) -> Self {
        Self { offset }
    }

    /// 变换物理点.
    #[inline]
    pub fn apply(&self, p: PhysicalPoint) -> PhysicalPoint {
        [
            p[0] + self.offset[0],
            p[1] + self.offset[1],
            p[2] + self.offset[2],
        ]
    }

    /// 以体素为单位的平移量 `[z, y, x]`.
    #[inline]
    pub fn in_voxels(&self, spacing: Spacing) -> [f64; 3] {
        let s = spacing.zyx();
        [
            self.offset[0] / s[0],
            self.offset[1] / s[1],
            self.offset[2] / s[2],
        ]
    }

    /// 沿平移方向移动 `step`.
    #[inline]
    pub(crate) fn moved(&self, direction: [f64; 3], step: f64) -> Self {
        Self::new([
            self.offset[0] + direction[0] * step,
            self.offset[1] + direction[1] * step,
            self.offset[2] + direction[2] * step,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translation() {
        let t = Translation::new([2.0, -1.0, 0.5]);
        assert_eq!(t.apply([1.0, 1.0, 1.0]), [3.0, 0.0, 1.5]);
        let s = Spacing::new(0.5, 1.0, 2.0).unwrap();
        assert_eq!(t.in_voxels(s), [1.0, -1.0, 1.0]);
        assert_eq!(Translation::identity(), Translation::default());
        assert_eq!(t.moved([1.0, 0.0, 0.0], 2.0).offset, [4.0, -1.0, 0.5]);
    }
}
