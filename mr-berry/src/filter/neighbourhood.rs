use itertools::iproduct;

use crate::Idx3d;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 三维体素偏移量 `(dz, dy, dx)`.
pub type Offset3d = (isize, isize, isize);

/// 三维体素邻接规则.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Connectivity {
    /// 6-邻接, 共面.
    #[default]
    Face6,

    /// 18-邻接, 共面或共棱.
    Edge18,

    /// 26-邻接, 共面、共棱或共顶点.
    /// 加上中心体素即为 3×3×3 全 1 结构元.
    Vertex26,
}

impl Connectivity {
    /// 邻居个数.
    #[inline]
    pub const fn len(&self) -> usize {
        match self {
            Self::Face6 => 6,
            Self::Edge18 => 18,
            Self::Vertex26 => 26,
        }
    }

    /// 邻居的最大曼哈顿距离.
    #[inline]
    const fn max_manhattan(&self) -> isize {
        match self {
            Self::Face6 => 1,
            Self::Edge18 => 2,
            Self::Vertex26 => 3,
        }
    }

    /// 全部邻居偏移量 (不含中心), 按 `(dz, dy, dx)` 字典序升序.
    pub fn offsets(&self) -> Vec<Offset3d> {
        let max = self.max_manhattan();
        iproduct!(-1isize..=1, -1isize..=1, -1isize..=1)
            .filter(|(z, y, x)| {
                let m = z.abs() + y.abs() + x.abs();
                0 < m && m <= max
            })
            .collect()
    }
}

/// 计算 `pos + d`. 结果越界时返回 `None`.
#[inline]
pub fn shift_in_bounds((z, y, x): Idx3d, (dz, dy, dx): Offset3d, shape: Idx3d) -> Option<Idx3d> {
    let z = z.checked_add_signed(dz)?;
    let y = y.checked_add_signed(dy)?;
    let x = x.checked_add_signed(dx)?;
    (z < shape.0 && y < shape.1 && x < shape.2).then_some((z, y, x))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_len() {
        for c in [
            Connectivity::Face6,
            Connectivity::Edge18,
            Connectivity::Vertex26,
        ] {
            assert_eq!(c.offsets().len(), c.len());
        }
        assert_eq!(Connectivity::default(), Connectivity::Face6);
    }

    #[test]
    fn test_neighbours_bounds() {
        let count = |c: Connectivity, pos| {
            c.offsets()
                .iter()
                .filter_map(|d| shift_in_bounds(pos, *d, (3, 3, 3)))
                .count()
        };
        assert_eq!(count(Connectivity::Face6, (0, 0, 0)), 3);
        assert_eq!(count(Connectivity::Face6, (1, 1, 1)), 6);
        assert_eq!(count(Connectivity::Vertex26, (0, 0, 0)), 7);
        assert_eq!(count(Connectivity::Edge18, (1, 1, 1)), 18);
        assert_eq!(
            shift_in_bounds((2, 2, 2), (0, 0, 1), (3, 3, 3)),
            None
        );
    }
}
