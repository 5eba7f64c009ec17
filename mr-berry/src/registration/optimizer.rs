//! 规则步长梯度上升.
//!
//! 步长初始为学习率; 相邻两次梯度方向夹角超过 90 度时, 步长乘以松弛系数.
//! 每次沿归一化梯度方向前进一个步长. 优化过程中记录度量最大的变换,
//! 无论以何种方式停止, 都返回该变换.

use std::fmt;

use log::debug;

use super::config::RegistrationConfig;
use super::transform::Translation;
use crate::RegistrationError;

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelIterator, ParallelIterator};
    }
}

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 单层优化的停止原因.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StopReason {
    /// 步长小于最小步长.
    StepTooSmall,

    /// 梯度模长小于门限.
    GradientTooSmall,

    /// 达到最大迭代次数.
    MaxIterations,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::StepTooSmall => "step too small",
            Self::GradientTooSmall => "gradient too small",
            Self::MaxIterations => "maximum iterations reached",
        })
    }
}

/// 单层优化结果.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct LevelOutcome {
    pub best: Translation,
    pub value: f64,
    pub iterations: usize,
    pub stop: StopReason,
}

/// 在 `t` 处的度量值及中心差分梯度. 某一侧探测点没有重叠时退化为单侧差分.
fn value_and_gradient<F>(
    f: &F,
    t: &Translation,
    h: f64,
) -> (Option<f64>, [f64; 3])
where
    F: Fn(&Translation) -> Option<f64> + Sync,
{
    let mut probes = Vec::with_capacity(7);
    probes.push(*t);
    for a in 0..3 {
        let mut e = [0.0; 3];
        e[a] = 1.0;
        probes.push(t.moved(e, h));
        probes.push(t.moved(e, -h));
    }

    cfg_if::cfg_if! {
        if #[cfg(feature = "rayon")] {
            let values: Vec<Option<f64>> = probes.into_par_iter().map(|p| f(&p)).collect();
        } else {
            let values: Vec<Option<f64>> = probes.iter().map(f).collect();
        }
    }

    let center = values[0];
    let mut g = [0.0; 3];
    for (a, g) in g.iter_mut().enumerate() {
        let (plus, minus) = (values[1 + 2 * a], values[2 + 2 * a]);
        *g = match (plus, minus, center) {
            (Some(p), Some(m), _) => (p - m) / (2.0 * h),
            (Some(p), None, Some(c)) => (p - c) / h,
            (None, Some(m), Some(c)) => (c - m) / h,
            _ => 0.0,
        };
    }
    (center, g)
}

/// 从 `start` 出发, 在单层上最大化 `f`.
///
/// `h` 为差分步长. `level` 仅用于错误信息.
pub(crate) fn maximize<F>(
    f: F,
    start: Translation,
    h: f64,
    config: &RegistrationConfig,
    level: usize,
) -> Result<LevelOutcome, RegistrationError>
where
    F: Fn(&Translation) -> Option<f64> + Sync,
{
    let non_finite = |iteration| RegistrationError::NonFinite { level, iteration };

    let mut t = start;
    let mut step = config.learning_rate;
    let mut prev_g: Option<[f64; 3]> = None;
    let mut best: Option<(Translation, f64)> = None;
    let mut stop = StopReason::MaxIterations;
    let mut iterations = 0;

    for it in 0..config.max_iterations {
        iterations = it + 1;
        let (value, g) = value_and_gradient(&f, &t, h);
        let Some(value) = value else {
            if best.is_none() {
                return Err(RegistrationError::NoOverlap { level });
            }
            // 移出重叠区域, 退回最佳位置并缩短步长.
            t = best.map_or(t, |(b, _)| b);
            step *= config.relaxation_factor;
            prev_g = None;
            if step < config.min_step_length {
                stop = StopReason::StepTooSmall;
                break;
            }
            continue;
        };
        if !value.is_finite() {
            return Err(non_finite(it));
        }
        if best.map_or(true, |(_, b)| value > b) {
            best = Some((t, value));
        }

        let norm = g.iter().map(|v| v * v).sum::<f64>().sqrt();
        if !norm.is_finite() {
            return Err(non_finite(it));
        }
        if norm < config.gradient_tolerance {
            stop = StopReason::GradientTooSmall;
            break;
        }
        if let Some(p) = prev_g {
            if p.iter().zip(g.iter()).map(|(a, b)| a * b).sum::<f64>() < 0.0 {
                step *= config.relaxation_factor;
            }
        }
        if step < config.min_step_length {
            stop = StopReason::StepTooSmall;
            break;
        }
        t = t.moved([g[0] / norm, g[1] / norm, g[2] / norm], step);
        prev_g = Some(g);
    }

    if stop == StopReason::MaxIterations {
        // 最后一步之后的位置尚未评估.
        if let Some(v) = f(&t).filter(|v| v.is_finite()) {
            if best.map_or(true, |(_, b)| v > b) {
                best = Some((t, v));
            }
        }
    }

    let (best, value) = best.ok_or(RegistrationError::NoOverlap { level })?;
    debug!(
        "level {level}: {iterations} iteration(s), stopped by {stop}, metric {value:.5}, offset {:?}",
        best.offset
    );
    Ok(LevelOutcome {
        best,
        value,
        iterations,
        stop,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quadratic(target: [f64; 3]) -> impl Fn(&Translation) -> Option<f64> + Sync {
        move |t: &Translation| {
            Some(
                -t.offset
                    .iter()
                    .zip(target.iter())
                    .map(|(a, b)| (a - b).powi(2))
                    .sum::<f64>(),
            )
        }
    }

    #[test]
    fn test_maximize_quadratic() {
        let cfg = RegistrationConfig::default();
        let out = maximize(quadratic([3.0, -5.0, 1.5]), Translation::identity(), 0.5, &cfg, 0)
            .unwrap();
        for (a, b) in out.best.offset.iter().zip([3.0, -5.0, 1.5]) {
            assert!((a - b).abs() < 0.01, "{a} vs {b}");
        }
        assert_ne!(out.stop, StopReason::MaxIterations);
    }

    #[test]
    fn test_maximize_at_optimum() {
        let cfg = RegistrationConfig::default();
        let out = maximize(quadratic([0.0; 3]), Translation::identity(), 0.5, &cfg, 0).unwrap();
        assert_eq!(out.best, Translation::identity());
        assert_eq!(out.stop, StopReason::GradientTooSmall);
    }

    #[test]
    fn test_maximize_errors() {
        let cfg = RegistrationConfig::default();
        let none = |_: &Translation| None;
        assert_eq!(
            maximize(none, Translation::identity(), 0.5, &cfg, 2),
            Err(RegistrationError::NoOverlap { level: 2 })
        );
        let nan = |_: &Translation| Some(f64::NAN);
        assert_eq!(
            maximize(nan, Translation::identity(), 0.5, &cfg, 1),
            Err(RegistrationError::NonFinite {
                level: 1,
                iteration: 0
            })
        );
    }
}
