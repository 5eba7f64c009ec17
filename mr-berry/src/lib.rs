#![warn(missing_docs)] // <= 合适时移除它.

//! 核心库. 对同一解剖部位、不同时间点采集的两个 3D MR 扫描进行对齐分析、
//! 刚性配准、区域分割及分割结果的后处理, 以便对病灶 (如肿瘤) 进行体积对比.
//!
//! 该 crate 目前仅提供 `safe` 接口. 所有核心操作都是对内存中数组的纯计算,
//! 不涉及文件格式解析, 也不涉及交互式渲染.
//!
//! # 注意
//!
//! 1. 体数据一律按 `(z, y, x)`, 即 (切片, 行, 列) 顺序索引.
//!   体素间距 [`Spacing`] 则按 `(x, y, z)` 顺序给出, 与常见的医学文件头一致.
//! 2. 硬错误 (形状不合法、种子点越界、配准数值失败) 通过 [`VolumeError`] 返回;
//!   软性情况 (形状不一致、退化切片、零方差种子) 会被吸收进正常的输出结构.
//!
//! # 开发计划
//!
//! ### 强度统计与显示窗口 ✅
//!
//! 单体数据统计量、线性插值分位数、质心, 以及两个体数据共同的窗宽窗位.
//!
//! 实现位于 `mr-berry/src/stats`.
//!
//! ### 空间对齐分析 ✅
//!
//! 三个方向的逐切片相关性、整数体素平移的暴力搜索、对齐结论与建议.
//!
//! 实现位于 `mr-berry/src/alignment`.
//!
//! ### 多分辨率刚性 (平移) 配准 ✅
//!
//! 互信息度量 + 规则步长梯度上升, 三层金字塔 (缩放 4, 2, 1; 平滑 2, 1, 0).
//!
//! 实现位于 `mr-berry/src/registration`.
//!
//! ### 预处理 ✅
//!
//! 分位数截断 -> 归一化 -> 高斯平滑.
//!
//! 实现位于 `mr-berry/src/preprocess.rs`.
//!
//! ### 置信连通区域生长与后处理 ✅
//!
//! 实现位于 `mr-berry/src/segment`. 三维形态学与连通域标记的底层实现位于
//! `mr-berry/src/filter`.
//!
//! ### 连通性约定
//!
//! 区域生长和连通域标记默认均使用 6-邻接 (面相邻), 空洞填充使用 6-邻接背景.
//! 可通过 [`Connectivity`] 修改前两者.

/// 三维索引 `(z, y, x)`, 同时也可一定程度上用作非负整数向量.
pub type Idx3d = (usize, usize, usize);

/// 三维整数体素位移, 分量顺序与 [`Idx3d`] 一致.
pub type Shift3d = (i32, i32, i32);

/// 三维实数坐标.
pub type Point3d = (f64, f64, f64);

/// 3D 体数据基础数据结构.
mod data;

pub use data::{
    validate_volume_shape, DisplayWindow, Orientation, SegmentationMask, Spacing, Volume,
    VolumeGeometry,
};

pub mod alignment;
pub mod consts;
mod error;
pub mod filter;
pub mod prelude;
pub mod preprocess;
pub mod registration;
pub mod segment;
pub mod stats;

pub use error::{RegistrationError, ShapeError, VolumeError, VolumeResult};
pub use filter::Connectivity;
