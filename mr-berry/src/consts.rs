//! 通用常量.

/// 分割掩码取值.
pub mod label {
    /// 掩码背景值.
    pub const MASK_BACKGROUND: u8 = 0;

    /// 掩码前景值 (区域生长中的 `replaceValue`).
    pub const MASK_FOREGROUND: u8 = 1;

    /// 像素是否是前景? 任何非零值都被视为前景.
    #[inline]
    pub const fn is_foreground(p: u8) -> bool {
        p != MASK_BACKGROUND
    }

    /// 像素是否是背景?
    #[inline]
    pub const fn is_background(p: u8) -> bool {
        p == MASK_BACKGROUND
    }
}

/// 对齐判定的相关系数门限.
pub const CORRELATION_THRESHOLD: f64 = 0.7;

/// 对齐判定的平移门限 (单位: 体素).
pub const SHIFT_THRESHOLD: f64 = 2.0;

/// 对齐判定的质心距离门限 (单位: 体素).
pub const COM_THRESHOLD: f64 = 5.0;

/// 位置探针中 "警告" 等级的相关系数下限.
pub const PROBE_WARNING_THRESHOLD: f64 = 0.5;

/// 平移搜索时每个轴的最大位移.
pub const SHIFT_SEARCH_MAX: i32 = 10;

/// 平移搜索的步长.
pub const SHIFT_SEARCH_STEP: i32 = 2;

/// 平移搜索 ROI 的最大边长.
pub const SHIFT_SEARCH_ROI_MAX: usize = 64;

/// 高斯核截断位置 (以 sigma 为单位).
pub const GAUSSIAN_TRUNCATE: f64 = 4.0;
