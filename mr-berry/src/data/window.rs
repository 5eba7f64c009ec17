#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 显示窗口, 包含窗位 (window level) 和窗宽 (window width).
///
/// 仅用于可视化对比度映射, 不参与任何分割决策.
/// 该窗口是只读的. 若要修改窗口参数, 你应该创建新的实例.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DisplayWindow {
    level: f64,
    width: f64,
}

impl DisplayWindow {
    /// 构建显示窗口.
    ///
    /// `level` 必须有限, `width` 必须有限且非负, 否则返回 `None`.
    /// 允许窗宽为 0 (例如常量体数据), 此时映射退化为阶跃函数.
    pub fn new(level: f64, width: f64) -> Option<DisplayWindow> {
        if level.is_finite() && width.is_finite() && width >= 0.0 {
            Some(Self { level, width })
        } else {
            None
        }
    }

    /// 由窗下限和窗上限构建显示窗口. 窗位取二者中点.
    ///
    /// `lower > upper` 或任一值非有限时返回 `None`.
    pub fn from_range(lower: f64, upper: f64) -> Option<DisplayWindow> {
        if lower > upper {
            return None;
        }
        Self::new((lower + upper) / 2.0, upper - lower)
    }

    /// 窗下限.
    #[inline]
    pub fn lower_bound(&self) -> f64 {
        self.level - self.width / 2.0
    }

    /// 窗上限.
    #[inline]
    pub fn upper_bound(&self) -> f64 {
        self.level + self.width / 2.0
    }

    /// 窗位.
    #[inline]
    pub fn level(&self) -> f64 {
        self.level
    }

    /// 窗宽.
    #[inline]
    pub fn width(&self) -> f64 {
        self.width
    }

    /// 求在当前窗口设置下, 强度 `v` 对应的灰度图像素整数值 (0 <= value <= 255)
    ///
    /// 如果 `v` 无意义 (如 inf, NaN), 则返回 `None`.
    pub fn eval(&self, v: f32) -> Option<u8> {
        self.eval_f32(v).map(|g| g as u8)
    }

    /// 求在当前窗口设置下, 强度 `v` 对应的灰度图像素分布点 (0.0 <= value <= 255.0).
    ///
    /// 如果 `v` 无意义 (如 inf, NaN), 则返回 `None`.
    pub fn eval_f32(&self, v: f32) -> Option<f32> {
        if !v.is_finite() {
            return None;
        }
        let v = f64::from(v);
        let lb = self.lower_bound();
        if v <= lb {
            Some(0.0)
        } else if v >= self.upper_bound() {
            Some(255.0)
        } else {
            // 255, not 256.
            Some(((v - lb) / self.width * 255.0) as f32)
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::DisplayWindow;

    #[test]
    fn test_window_invalid_input() {
        assert!(DisplayWindow::new(0.0, -1.0).is_none());
        assert!(DisplayWindow::new(f64::NAN, 1.0).is_none());
        assert!(DisplayWindow::from_range(2.0, 1.0).is_none());
        assert!(DisplayWindow::new(0.0, 0.0).is_some());
    }

    fn float_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_window_generic() {
        // [60, 100]
        let w = DisplayWindow::from_range(60.0, 100.0).unwrap();
        assert_eq!(w.level(), 80.0);
        assert_eq!(w.width(), 40.0);

        assert_eq!(w.eval(f32::NAN), None);
        assert_eq!(w.eval(f32::MIN), Some(0));
        assert_eq!(w.eval(f32::MAX), Some(255));

        assert_eq!(w.eval(60.0), Some(0));
        assert!(w.eval_f32(60.1).unwrap() > 0.0);
        assert!(w.eval_f32(60.1).unwrap() < 1.0);

        assert_eq!(w.eval(70.0).unwrap(), (255.0 * 0.25) as u8);
        assert!(float_eq(w.eval_f32(80.0).unwrap(), 255.0 * 0.5));

        assert_eq!(w.eval(99.999), Some(254));
        assert_eq!(w.eval(100.0), Some(u8::MAX));
    }

    #[test]
    fn test_window_zero_width() {
        let w = DisplayWindow::new(5.0, 0.0).unwrap();
        assert_eq!(w.eval(4.9), Some(0));
        assert_eq!(w.eval(5.0), Some(0));
        assert_eq!(w.eval(5.1), Some(255));
    }
}
