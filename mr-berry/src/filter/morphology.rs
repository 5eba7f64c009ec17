//! 三维二值形态学. 输入中任何非零值都被视为前景, 输出仅包含
//! [`MASK_BACKGROUND`] 与 [`MASK_FOREGROUND`].
//!
//! 腐蚀时阵列之外的体素视为背景, 因此紧贴边界的前景体素总会被腐蚀掉.

use std::collections::VecDeque;

use ndarray::{Array3, ArrayView3, Zip};

use super::neighbourhood::{shift_in_bounds, Connectivity};
use crate::consts::label::*;
use crate::Idx3d;

#[inline]
const fn to_label(b: bool) -> u8 {
    if b {
        MASK_FOREGROUND
    } else {
        MASK_BACKGROUND
    }
}

fn apply<F>(src: ArrayView3<u8>, op: F) -> Array3<u8>
where
    F: Fn(Idx3d, u8) -> u8 + Sync + Send,
{
    cfg_if::cfg_if! {
        if #[cfg(feature = "rayon")] {
            Zip::indexed(src).par_map_collect(|pos, p| op(pos, *p))
        } else {
            Zip::indexed(src).map_collect(|pos, p| op(pos, *p))
        }
    }
}

/// 二值腐蚀. 结构元为中心体素加上 `se` 的全部邻居.
pub fn erode(src: ArrayView3<u8>, se: Connectivity) -> Array3<u8> {
    let shape = src.dim();
    let offsets = se.offsets();
    apply(src, |pos, p| {
        to_label(
            is_foreground(p)
                && offsets.iter().all(|d| {
                    shift_in_bounds(pos, *d, shape).is_some_and(|q| is_foreground(src[q]))
                }),
        )
    })
}

/// 二值膨胀. 结构元为中心体素加上 `se` 的全部邻居.
pub fn dilate(src: ArrayView3<u8>, se: Connectivity) -> Array3<u8> {
    let shape = src.dim();
    let offsets = se.offsets();
    apply(src, |pos, p| {
        to_label(
            is_foreground(p)
                || offsets.iter().any(|d| {
                    shift_in_bounds(pos, *d, shape).is_some_and(|q| is_foreground(src[q]))
                }),
        )
    })
}

/// 开运算: 先腐蚀后膨胀. 去除小于结构元的噪点.
#[inline]
pub fn open(src: ArrayView3<u8>, se: Connectivity) -> Array3<u8> {
    dilate(erode(src, se).view(), se)
}

/// 闭运算: 先膨胀后腐蚀. 弥合小于结构元的缝隙.
#[inline]
pub fn close(src: ArrayView3<u8>, se: Connectivity) -> Array3<u8> {
    erode(dilate(src, se).view(), se)
}

/// 填充完全被前景包围的空洞.
///
/// 从阵列表面的全部背景体素出发, 按 6-邻接遍历背景;
/// 遍历不到的背景体素即为空洞, 被置为前景.
pub fn fill_holes(src: ArrayView3<u8>) -> Array3<u8> {
    let shape = src.dim();
    let (d, h, w) = shape;
    let mut outside = Array3::from_elem(shape, false);
    let mut bfs_q = VecDeque::with_capacity(d * h + h * w + d * w);

    for (pos, p) in src.indexed_iter() {
        let (z, y, x) = pos;
        let on_border = z == 0 || y == 0 || x == 0 || z + 1 == d || y + 1 == h || x + 1 == w;
        if on_border && is_background(*p) {
            outside[pos] = true;
            bfs_q.push_back(pos);
        }
    }
    let offsets = Connectivity::Face6.offsets();
    while let Some(cur) = bfs_q.pop_front() {
        for next in offsets.iter().filter_map(|d| shift_in_bounds(cur, *d, shape)) {
            if !outside[next] && is_background(src[next]) {
                outside[next] = true;
                bfs_q.push_back(next);
            }
        }
    }
    Zip::from(&src)
        .and(&outside)
        .map_collect(|p, o| to_label(is_foreground(*p) || !*o))
}
