use crate::{RegistrationError, VolumeResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 平移配准参数.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RegistrationConfig {
    /// 互信息联合直方图每个维度的 bin 数.
    pub histogram_bins: usize,

    /// 每层优化开始时的步长 (毫米).
    pub learning_rate: f64,

    /// 步长小于该值时停止.
    pub min_step_length: f64,

    /// 每层的最大迭代次数.
    pub max_iterations: usize,

    /// 梯度方向反转时步长乘以该系数.
    pub relaxation_factor: f64,

    /// 梯度模长小于该值时停止.
    pub gradient_tolerance: f64,

    /// 每层的下采样倍数, 由粗到细.
    pub shrink_factors: Vec<usize>,

    /// 每层的高斯平滑 sigma (毫米), 与 `shrink_factors` 一一对应.
    pub smoothing_sigmas: Vec<f64>,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            histogram_bins: 50,
            learning_rate: 4.0,
            min_step_length: 0.001,
            max_iterations: 100,
            relaxation_factor: 0.5,
            gradient_tolerance: 1e-4,
            shrink_factors: vec![4, 2, 1],
            smoothing_sigmas: vec![2.0, 1.0, 0.0],
        }
    }
}

impl RegistrationConfig {
    /// 设置直方图 bin 数.
    pub fn with_histogram_bins(mut self, bins: usize) -> Self {
        self.histogram_bins = bins;
        self
    }

    /// 设置初始步长.
    pub fn with_learning_rate(mut self, rate: f64) -> Self {
        self.learning_rate = rate;
        self
    }

    /// 设置最小步长.
    pub fn with_min_step_length(mut self, step: f64) -> Self {
        self.min_step_length = step;
        self
    }

    /// 设置每层最大迭代次数.
    pub fn with_max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations;
        self
    }

    /// 设置金字塔. `shrink_factors` 与 `smoothing_sigmas` 必须等长.
    pub fn with_pyramid(mut self, shrink_factors: Vec<usize>, smoothing_sigmas: Vec<f64>) -> Self {
        self.shrink_factors = shrink_factors;
        self.smoothing_sigmas = smoothing_sigmas;
        self
    }

    /// 金字塔层数.
    #[inline]
    pub fn levels(&self) -> usize {
        self.shrink_factors.len()
    }

    /// 校验参数.
    pub fn validate(&self) -> VolumeResult<()> {
        let fail = |msg: &'static str| -> VolumeResult<()> {
            Err(RegistrationError::InvalidConfig(msg).into())
        };

        if self.histogram_bins < 2 {
            return fail("at least 2 histogram bins are required");
        }
        if !(self.learning_rate > 0.0) || !(self.min_step_length > 0.0) {
            return fail("step lengths must be positive");
        }
        if !(self.relaxation_factor > 0.0 && self.relaxation_factor < 1.0) {
            return fail("relaxation factor must lie in (0, 1)");
        }
        if !(self.gradient_tolerance >= 0.0) {
            return fail("gradient tolerance must be non-negative");
        }
        if self.max_iterations == 0 {
            return fail("at least 1 iteration per level is required");
        }
        if self.shrink_factors.is_empty() {
            return fail("at least 1 pyramid level is required");
        }
        if self.shrink_factors.len() != self.smoothing_sigmas.len() {
            return fail("shrink factors and smoothing sigmas differ in length");
        }
        if self.shrink_factors.contains(&0) {
            return fail("shrink factors must be positive");
        }
        if self
            .smoothing_sigmas
            .iter()
            .any(|s| !s.is_finite() || *s < 0.0)
        {
            return fail("smoothing sigmas must be finite and non-negative");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VolumeError;

    #[test]
    fn test_validate() {
        let c = RegistrationConfig::default();
        assert!(c.validate().is_ok());
        assert_eq!(c.levels(), 3);

        let bad = c.clone().with_pyramid(vec![2, 1], vec![1.0]);
        assert!(matches!(
            bad.validate(),
            Err(VolumeError::Registration(RegistrationError::InvalidConfig(_)))
        ));
        assert!(c.clone().with_histogram_bins(1).validate().is_err());
        assert!(c.with_learning_rate(0.0).validate().is_err());
    }
}
