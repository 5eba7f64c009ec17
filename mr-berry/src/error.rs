//! 运行时错误.

use crate::Idx3d;
use thiserror::Error;

/// 体数据形状不合法.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    /// 不是三维数组. 参数为实际维数.
    #[error("volume must be 3-dimensional, got {0} dimension(s)")]
    NotThreeDimensional(usize),

    /// 存在长度为 0 的维度. 参数为实际形状.
    #[error("every dimension must be positive, got shape {0:?}")]
    ZeroDimension(Vec<usize>),

    /// 没有任何体素.
    #[error("volume must not be empty")]
    Empty,
}

/// 配准失败. 核心库不会自动重试, 也不会退回到任何默认变换.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistrationError {
    /// 在给定金字塔层级上, 所有固定图像采样点都落在了运动图像之外.
    #[error("no fixed sample maps inside the moving volume at pyramid level {level}")]
    NoOverlap {
        /// 金字塔层级, 0 为最粗.
        level: usize,
    },

    /// 度量或优化器出现非有限值 (NaN / inf).
    #[error("metric diverged at pyramid level {level}, iteration {iteration}")]
    NonFinite {
        /// 金字塔层级, 0 为最粗.
        level: usize,

        /// 出错时的迭代次数.
        iteration: usize,
    },

    /// 配准参数不合法.
    #[error("invalid registration configuration: {0}")]
    InvalidConfig(&'static str),
}

/// 核心库的错误类型.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VolumeError {
    /// 输入形状不合法.
    #[error("shape validation failed: {0}")]
    ShapeValidation(#[from] ShapeError),

    /// 两个参与运算的体数据 / 掩码形状不一致.
    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// 期望的形状 (第一个操作数).
        expected: Idx3d,

        /// 实际的形状 (第二个操作数).
        actual: Idx3d,
    },

    /// 种子点越界.
    #[error("seed {seed:?} lies outside volume of shape {shape:?}")]
    SeedOutOfBounds {
        /// 种子点.
        seed: Idx3d,

        /// 体数据形状.
        shape: Idx3d,
    },

    /// 探针位置越界.
    #[error("position {position:?} lies outside volume of shape {shape:?}")]
    PositionOutOfBounds {
        /// 探针位置.
        position: Idx3d,

        /// 体数据形状.
        shape: Idx3d,
    },

    /// 配准失败.
    #[error("registration failed: {0}")]
    Registration(#[from] RegistrationError),

    /// 参数不合法.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

/// 核心库运行时结果.
pub type VolumeResult<T> = Result<T, VolumeError>;
