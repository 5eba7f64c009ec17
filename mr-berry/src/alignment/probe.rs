use crate::consts::PROBE_WARNING_THRESHOLD;
use crate::stats::{mean_std, pearson};
use crate::{Idx3d, Orientation, Volume, VolumeError, VolumeGeometry, VolumeResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 单个切片对的相关性评级.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ProbeRating {
    /// 相关系数大于良好门限.
    Good,

    /// 相关系数介于警告门限与良好门限之间 (含两端).
    Warning,

    /// 相关系数小于警告门限.
    Poor,
}

impl ProbeRating {
    /// 按良好门限 `good` 与警告门限 `warning` 评级.
    pub fn rate(correlation: f64, good: f64, warning: f64) -> Self {
        if correlation > good {
            Self::Good
        } else if correlation < warning {
            Self::Poor
        } else {
            Self::Warning
        }
    }
}

/// 经过探针位置的某一方向切片对.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SliceProbe {
    /// 切片方向.
    pub orientation: Orientation,

    /// 切片下标.
    pub index: usize,

    /// 切片对的 Pearson 相关系数. 退化时为 0.
    pub correlation: f64,

    /// 第一个体数据切片的平均强度.
    pub mean_first: f64,

    /// 第二个体数据切片的平均强度.
    pub mean_second: f64,

    /// 评级.
    pub rating: ProbeRating,
}

/// 分析经过 `position` 的横断面、冠状面、矢状面三个切片对.
///
/// `good` 为良好门限 (通常与对齐判定的相关系数门限相同). 形状不一致或
/// `position` 越界时返回 `Err`.
pub fn probe_position_with(
    a: &Volume,
    b: &Volume,
    position: Idx3d,
    good: f64,
) -> VolumeResult<[SliceProbe; 3]> {
    if !a.same_shape(b) {
        return Err(VolumeError::ShapeMismatch {
            expected: a.shape(),
            actual: b.shape(),
        });
    }
    if !a.check(&position) {
        return Err(VolumeError::PositionOutOfBounds {
            position,
            shape: a.shape(),
        });
    }
    let (z, y, x) = position;
    Ok([(Orientation::Axial, z), (Orientation::Coronal, y), (Orientation::Sagittal, x)].map(
        |(orientation, index)| {
            let sa = a.slice_at(orientation, index);
            let sb = b.slice_at(orientation, index);
            let correlation = pearson(&sa, &sb).unwrap_or(0.0);
            SliceProbe {
                orientation,
                index,
                correlation,
                mean_first: mean_std(sa.iter().copied()).0,
                mean_second: mean_std(sb.iter().copied()).0,
                rating: ProbeRating::rate(correlation, good, PROBE_WARNING_THRESHOLD),
            }
        },
    ))
}

/// 同 [`probe_position_with`], 良好门限取默认值 0.7.
#[inline]
pub fn probe_position(a: &Volume, b: &Volume, position: Idx3d) -> VolumeResult<[SliceProbe; 3]> {
    probe_position_with(a, b, position, crate::consts::CORRELATION_THRESHOLD)
}
