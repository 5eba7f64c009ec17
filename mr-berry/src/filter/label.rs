//! 三维连通域标记.

use std::collections::VecDeque;

use ndarray::{Array3, ArrayView3, ArrayViewMut3, Zip};

use super::neighbourhood::{shift_in_bounds, Connectivity};
use crate::consts::label::*;

/// 连通域标记结果.
#[derive(Clone, Debug)]
pub struct Components {
    labels: Array3<u32>,
    sizes: Vec<usize>,
}

impl Components {
    /// 连通域个数 (不含背景).
    #[inline]
    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    /// 是否不存在任何前景连通域?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    /// 标记阵列. 背景为 0, 连通域标号从 1 开始, 按光栅扫描顺序首次出现的先后分配.
    #[inline]
    pub fn labels(&self) -> ArrayView3<'_, u32> {
        self.labels.view()
    }

    /// 标号为 `label` 的连通域体素个数. `label` 为 0 或越界时返回 `None`.
    #[inline]
    pub fn size_of(&self, label: u32) -> Option<usize> {
        (label as usize)
            .checked_sub(1)
            .and_then(|i| self.sizes.get(i))
            .copied()
    }

    /// 所有连通域的体素个数, 下标 `i` 对应标号 `i + 1`.
    #[inline]
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }
}

/// 按 `connectivity` 标记 `mask` 的前景连通域.
pub fn label_components(mask: ArrayView3<u8>, connectivity: Connectivity) -> Components {
    let shape = mask.dim();
    let mut labels = Array3::<u32>::zeros(shape);
    let mut sizes = Vec::with_capacity(4);
    let mut bfs_q = VecDeque::with_capacity(16);
    let offsets = connectivity.offsets();

    for (pos, p) in mask.indexed_iter() {
        if is_background(*p) || labels[pos] != 0 {
            continue;
        }
        let cur_label = sizes.len() as u32 + 1;
        let mut this_size = 0usize;
        labels[pos] = cur_label;
        bfs_q.push_back(pos);
        while let Some(cur) = bfs_q.pop_front() {
            this_size += 1;
            for next in offsets.iter().filter_map(|d| shift_in_bounds(cur, *d, shape)) {
                if labels[next] == 0 && is_foreground(mask[next]) {
                    labels[next] = cur_label;
                    bfs_q.push_back(next);
                }
            }
        }
        sizes.push(this_size);
    }
    Components { labels, sizes }
}

/// 就地移除体素个数严格小于 `min_size` 的前景连通域, 返回被移除的连通域个数.
pub fn remove_small_components(
    mut mask: ArrayViewMut3<u8>,
    min_size: usize,
    connectivity: Connectivity,
) -> usize {
    let comp = label_components(mask.view(), connectivity);
    let keep: Vec<bool> = comp.sizes().iter().map(|s| *s >= min_size).collect();
    Zip::from(&mut mask).and(&comp.labels).for_each(|p, l| {
        if *l != 0 && !keep[*l as usize - 1] {
            *p = MASK_BACKGROUND;
        }
    });
    keep.iter().filter(|k| !**k).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::s;

    fn two_blobs() -> Array3<u8> {
        let mut a = Array3::zeros((6, 6, 6));
        a.slice_mut(s![0..3, 0..3, 0..3]).fill(1);
        a[(4, 4, 4)] = 1;
        a[(5, 5, 5)] = 1;
        a
    }

    #[test]
    fn test_label_connectivity() {
        let a = two_blobs();
        let c6 = label_components(a.view(), Connectivity::Face6);
        assert_eq!(c6.sizes(), &[27, 1, 1]);
        assert_eq!(c6.labels()[(0, 0, 0)], 1);
        assert_eq!(c6.labels()[(5, 5, 5)], 3);
        assert_eq!(c6.size_of(0), None);
        assert_eq!(c6.size_of(2), Some(1));

        let c26 = label_components(a.view(), Connectivity::Vertex26);
        assert_eq!(c26.sizes(), &[27, 2]);
    }

    #[test]
    fn test_label_edge_connectivity() {
        let mut a = Array3::<u8>::zeros((4, 4, 4));
        a[(0, 0, 0)] = 1;
        a[(0, 1, 1)] = 1;
        a[(1, 2, 2)] = 1;
        assert_eq!(label_components(a.view(), Connectivity::Face6).sizes(), &[1, 1, 1]);
        assert_eq!(label_components(a.view(), Connectivity::Edge18).sizes(), &[2, 1]);
        assert_eq!(label_components(a.view(), Connectivity::Vertex26).sizes(), &[3]);
    }

    #[test]
    fn test_remove_small() {
        let mut a = two_blobs();
        let removed = remove_small_components(a.view_mut(), 2, Connectivity::Face6);
        assert_eq!(removed, 2);
        assert_eq!(a.iter().filter(|p| **p != 0).count(), 27);

        let mut a = two_blobs();
        assert_eq!(remove_small_components(a.view_mut(), 28, Connectivity::Vertex26), 2);
        assert!(a.iter().all(|p| *p == 0));
    }
}
