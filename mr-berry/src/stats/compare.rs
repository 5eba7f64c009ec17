use ndarray::Zip;

use super::pearson;
use crate::{Volume, VolumeError, VolumeGeometry, VolumeResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 两个同形体数据的逐体素差异汇总. 差值均按 `second - first` 计算.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VolumeComparison {
    /// 平均差值.
    pub mean_difference: f64,

    /// 平均绝对差值.
    pub mean_abs_difference: f64,

    /// 最大绝对差值.
    pub max_abs_difference: f64,

    /// 全局 Pearson 相关系数. 任一体数据方差为 0 时为 `None`.
    pub correlation: Option<f64>,
}

fn ensure_same_shape(first: &Volume, second: &Volume) -> VolumeResult<()> {
    if first.same_shape(second) {
        Ok(())
    } else {
        Err(VolumeError::ShapeMismatch {
            expected: first.shape(),
            actual: second.shape(),
        })
    }
}

/// 比较两个体数据. 形状不一致时返回 `Err`.
pub fn compare_volumes(first: &Volume, second: &Volume) -> VolumeResult<VolumeComparison> {
    ensure_same_shape(first, second)?;
    let n = first.size() as f64;
    let (mut sum, mut abs_sum, mut abs_max) = (0.0f64, 0.0f64, 0.0f64);
    Zip::from(&first.data())
        .and(&second.data())
        .for_each(|a, b| {
            let d = f64::from(*b) - f64::from(*a);
            sum += d;
            abs_sum += d.abs();
            abs_max = abs_max.max(d.abs());
        });
    Ok(VolumeComparison {
        mean_difference: sum / n,
        mean_abs_difference: abs_sum / n,
        max_abs_difference: abs_max,
        correlation: pearson(&first.data(), &second.data()),
    })
}

/// 逐体素绝对差 `|second - first|`, 保留 `first` 的间距.
/// 这是差异模式渲染的输入. 形状不一致时返回 `Err`.
pub fn absolute_difference(first: &Volume, second: &Volume) -> VolumeResult<Volume> {
    ensure_same_shape(first, second)?;
    let data = Zip::from(&first.data())
        .and(&second.data())
        .map_collect(|a, b| (b - a).abs());
    Ok(Volume::from_parts(data, first.spacing()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_compare_volumes() {
        let a = Volume::new(Array3::from_shape_fn((2, 2, 2), |(z, y, x)| {
            (z * 4 + y * 2 + x) as f32
        }))
        .unwrap();
        let b = a.map(|v| v + 2.0);
        let c = compare_volumes(&a, &b).unwrap();
        assert_eq!(c.mean_difference, 2.0);
        assert_eq!(c.mean_abs_difference, 2.0);
        assert_eq!(c.max_abs_difference, 2.0);
        assert!((c.correlation.unwrap() - 1.0).abs() < 1e-9);

        let d = absolute_difference(&b, &a).unwrap();
        assert!(d.data().iter().all(|v| *v == 2.0));
    }

    #[test]
    fn test_compare_shape_mismatch() {
        let a = Volume::new(Array3::zeros((2, 2, 2))).unwrap();
        let b = Volume::new(Array3::zeros((2, 2, 3))).unwrap();
        assert_eq!(
            compare_volumes(&a, &b),
            Err(VolumeError::ShapeMismatch {
                expected: (2, 2, 2),
                actual: (2, 2, 3)
            })
        );
        assert!(absolute_difference(&a, &b).is_err());
        // 常量体数据无相关系数.
        assert!(compare_volumes(&a, &a).unwrap().correlation.is_none());
    }
}
