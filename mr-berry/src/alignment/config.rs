use crate::consts::*;
use crate::{VolumeError, VolumeResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 整数体素平移的暴力搜索参数.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ShiftSearch {
    /// 每个轴上的最大位移 (体素). 候选位移为 `-max_shift..=max_shift`.
    pub max_shift: i32,

    /// 候选位移的步长.
    pub step: i32,

    /// ROI 的最大边长.
    pub roi_max: usize,
}

impl Default for ShiftSearch {
    fn default() -> Self {
        Self {
            max_shift: SHIFT_SEARCH_MAX,
            step: SHIFT_SEARCH_STEP,
            roi_max: SHIFT_SEARCH_ROI_MAX,
        }
    }
}

impl ShiftSearch {
    /// 单轴上的全部候选位移, 升序.
    pub fn candidates(&self) -> Vec<i32> {
        if self.step <= 0 || self.max_shift < 0 {
            return vec![0];
        }
        (-self.max_shift..=self.max_shift)
            .step_by(self.step as usize)
            .collect()
    }

    /// 校验参数.
    pub fn validate(&self) -> VolumeResult<()> {
        if self.max_shift < 0 {
            return Err(VolumeError::InvalidConfig("max_shift must be non-negative"));
        }
        if self.step <= 0 {
            return Err(VolumeError::InvalidConfig("shift step must be positive"));
        }
        if self.roi_max == 0 {
            return Err(VolumeError::InvalidConfig("ROI size must be positive"));
        }
        Ok(())
    }
}

/// 对齐分析参数. 默认值即对齐判定的标准门限.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AlignmentConfig {
    /// 每个方向的平均切片相关系数都必须严格大于该值.
    pub correlation_threshold: f64,

    /// 估计平移的最大分量绝对值必须严格小于该值.
    pub shift_threshold: f64,

    /// 质心距离必须严格小于该值.
    pub com_threshold: f64,

    /// 平移搜索参数.
    pub shift_search: ShiftSearch,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            correlation_threshold: CORRELATION_THRESHOLD,
            shift_threshold: SHIFT_THRESHOLD,
            com_threshold: COM_THRESHOLD,
            shift_search: ShiftSearch::default(),
        }
    }
}

impl AlignmentConfig {
    /// 设置相关系数门限.
    pub fn with_correlation_threshold(mut self, threshold: f64) -> Self {
        self.correlation_threshold = threshold;
        self
    }

    /// 设置平移门限.
    pub fn with_shift_threshold(mut self, threshold: f64) -> Self {
        self.shift_threshold = threshold;
        self
    }

    /// 设置质心距离门限.
    pub fn with_com_threshold(mut self, threshold: f64) -> Self {
        self.com_threshold = threshold;
        self
    }

    /// 设置平移搜索参数.
    pub fn with_shift_search(mut self, search: ShiftSearch) -> Self {
        self.shift_search = search;
        self
    }

    /// 校验参数.
    pub fn validate(&self) -> VolumeResult<()> {
        if !(-1.0..=1.0).contains(&self.correlation_threshold) {
            return Err(VolumeError::InvalidConfig(
                "correlation threshold must lie in [-1, 1]",
            ));
        }
        if !(self.shift_threshold >= 0.0) || !(self.com_threshold >= 0.0) {
            return Err(VolumeError::InvalidConfig(
                "distance thresholds must be non-negative",
            ));
        }
        self.shift_search.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_candidates() {
        let c = ShiftSearch::default().candidates();
        assert_eq!(c, vec![-10, -8, -6, -4, -2, 0, 2, 4, 6, 8, 10]);
        assert!(AlignmentConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid() {
        let bad = ShiftSearch {
            step: 0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
        assert_eq!(bad.candidates(), vec![0]);
        assert!(AlignmentConfig::default()
            .with_correlation_threshold(2.0)
            .validate()
            .is_err());
    }
}
