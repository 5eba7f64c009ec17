use std::fmt;
use std::ops::{Index, IndexMut};

use ndarray::{Array3, ArrayD, ArrayView2, ArrayView3, ArrayViewMut3, Axis, Ix3};

use crate::consts::label::*;
use crate::{Idx3d, ShapeError, VolumeError, VolumeResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod window;

pub use window::DisplayWindow;

/// 校验形状: 必须是三维的, 每个维度都大于 0, 且体素总数大于 0.
///
/// 成功时返回 `(z, y, x)` 形式的形状.
pub fn validate_volume_shape(shape: &[usize]) -> VolumeResult<Idx3d> {
    let &[z, y, x] = shape else {
        return Err(ShapeError::NotThreeDimensional(shape.len()).into());
    };
    if z == 0 || y == 0 || x == 0 {
        return Err(ShapeError::ZeroDimension(shape.to_vec()).into());
    }
    // 三个维度都非零时乘积溢出才可能为 0.
    if z.checked_mul(y).and_then(|v| v.checked_mul(x)).is_none() {
        return Err(ShapeError::Empty.into());
    }
    Ok((z, y, x))
}

/// 物理体素间距, 以毫米为单位, 按 `(x, y, z)` 给出. 默认为 `(1, 1, 1)`.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Spacing {
    /// 列方向 (x) 间距.
    pub x: f64,

    /// 行方向 (y) 间距.
    pub y: f64,

    /// 切片方向 (z) 间距.
    pub z: f64,
}

impl Default for Spacing {
    #[inline]
    fn default() -> Self {
        Self::isotropic(1.0)
    }
}

impl Spacing {
    /// 构建间距. 任一分量非有限或不为正时返回 `None`.
    pub fn new(x: f64, y: f64, z: f64) -> Option<Self> {
        let ok = |v: f64| v.is_finite() && v > 0.0;
        (ok(x) && ok(y) && ok(z)).then_some(Self { x, y, z })
    }

    /// 各向同性间距.
    #[inline]
    pub const fn isotropic(v: f64) -> Self {
        Self { x: v, y: v, z: v }
    }

    /// 按数组轴顺序 `[z, y, x]` 返回间距.
    #[inline]
    pub fn zyx(&self) -> [f64; 3] {
        [self.z, self.y, self.x]
    }

    /// 三个方向同时放大 `factor` 倍.
    #[inline]
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
            z: self.z * factor,
        }
    }
}

/// 三个正交切片方向.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Orientation {
    /// 横断面, 固定 z.
    Axial,

    /// 冠状面, 固定 y.
    Coronal,

    /// 矢状面, 固定 x.
    Sagittal,
}

impl Orientation {
    /// 全部三个方向, 依次为横断面、冠状面、矢状面.
    pub const ALL: [Orientation; 3] = [Self::Axial, Self::Coronal, Self::Sagittal];

    /// 该方向切片所固定的数组轴.
    #[inline]
    pub const fn axis(&self) -> Axis {
        match self {
            Self::Axial => Axis(0),
            Self::Coronal => Axis(1),
            Self::Sagittal => Axis(2),
        }
    }

    /// 小写英文名.
    #[inline]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Axial => "axial",
            Self::Coronal => "coronal",
            Self::Sagittal => "sagittal",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// 3D 体数据 (扫描或掩码) 的共用几何属性和部分通用操作.
pub trait VolumeGeometry {
    /// 获取数据形状大小 `(z, y, x)`.
    fn shape(&self) -> Idx3d;

    /// 获取体素间距.
    fn spacing(&self) -> Spacing;

    /// 获取数据体素个数.
    #[inline]
    fn size(&self) -> usize {
        let (z, y, x) = self.shape();
        z * y * x
    }

    /// 检查索引是否合法.
    #[inline]
    fn check(&self, (z0, y0, x0): &Idx3d) -> bool {
        let (z, y, x) = self.shape();
        *z0 < z && *y0 < y && *x0 < x
    }

    /// 几何中心索引 (每个轴取 `dim / 2`).
    #[inline]
    fn center_index(&self) -> Idx3d {
        let (z, y, x) = self.shape();
        (z / 2, y / 2, x / 2)
    }

    /// 获取单个体素的实际体积值, 以立方毫米为单位.
    #[inline]
    fn voxel(&self) -> f64 {
        self.spacing().zyx().iter().product()
    }
}

#[inline]
fn shape_of<T>(data: &Array3<T>) -> Idx3d {
    data.dim()
}

/// 3D 标量体数据, 以 `f32` 保存强度值.
///
/// 加载后即不可变. 所有处理步骤都返回新分配的 `Volume`.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    data: Array3<f32>,
    spacing: Spacing,
}

impl VolumeGeometry for Volume {
    #[inline]
    fn shape(&self) -> Idx3d {
        shape_of(&self.data)
    }

    #[inline]
    fn spacing(&self) -> Spacing {
        self.spacing
    }
}

impl Index<Idx3d> for Volume {
    type Output = f32;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl Volume {
    /// 以默认间距 `(1, 1, 1)` 构建体数据. 形状不合法时返回 `Err`.
    #[inline]
    pub fn new(data: Array3<f32>) -> VolumeResult<Self> {
        Self::with_spacing(data, Spacing::default())
    }

    /// 以给定间距构建体数据. 形状不合法时返回 `Err`.
    pub fn with_spacing(data: Array3<f32>, spacing: Spacing) -> VolumeResult<Self> {
        validate_volume_shape(data.shape())?;
        Ok(Self { data, spacing })
    }

    /// 从任意维度的数组构建体数据. 这是加载器的边界入口:
    /// 非三维数组在此处被拒绝.
    pub fn from_dyn(data: ArrayD<f32>, spacing: Spacing) -> VolumeResult<Self> {
        validate_volume_shape(data.shape())?;
        let ndim = data.ndim();
        let data = data
            .into_dimensionality::<Ix3>()
            .map_err(|_| ShapeError::NotThreeDimensional(ndim))?;
        Ok(Self { data, spacing })
    }

    /// 内部方法. 调用方保证 `data` 的形状合法 (一般来自已校验过的输入).
    #[inline]
    pub(crate) fn from_parts(data: Array3<f32>, spacing: Spacing) -> Self {
        debug_assert!(validate_volume_shape(data.shape()).is_ok());
        Self { data, spacing }
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView3<'_, f32> {
        self.data.view()
    }

    /// 直接获得底层数据.
    #[inline]
    pub fn into_raw(self) -> Array3<f32> {
        self.data
    }

    /// 获取给定位置的强度值. 越界时返回 `None`.
    #[inline]
    pub fn get(&self, pos: Idx3d) -> Option<f32> {
        self.data.get(pos).copied()
    }

    /// 获取 `orientation` 方向的第 `index` 层切片视图.
    ///
    /// 当 `index` 越界时 panic.
    #[inline]
    pub fn slice_at(&self, orientation: Orientation, index: usize) -> ArrayView2<'_, f32> {
        self.data.index_axis(orientation.axis(), index)
    }

    /// 获取能按升序迭代 `orientation` 方向切片的迭代器.
    #[inline]
    pub fn slice_iter(
        &self,
        orientation: Orientation,
    ) -> impl ExactSizeIterator<Item = ArrayView2<'_, f32>> {
        self.data.axis_iter(orientation.axis())
    }

    /// 逐体素映射, 保持形状与间距.
    #[inline]
    pub fn map<F: FnMut(f32) -> f32>(&self, mut f: F) -> Volume {
        Self::from_parts(self.data.mapv(|v| f(v)), self.spacing)
    }

    /// 两个体数据形状是否一致.
    #[inline]
    pub fn same_shape(&self, other: &Volume) -> bool {
        self.shape() == other.shape()
    }
}

/// 二值分割掩码, 以 `u8` 保存, 取值为 [`MASK_BACKGROUND`] 或 [`MASK_FOREGROUND`].
///
/// 与源体数据形状一致. 后处理流程会就地修改它.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentationMask {
    data: Array3<u8>,
    spacing: Spacing,
}

impl VolumeGeometry for SegmentationMask {
    #[inline]
    fn shape(&self) -> Idx3d {
        shape_of(&self.data)
    }

    #[inline]
    fn spacing(&self) -> Spacing {
        self.spacing
    }
}

impl Index<Idx3d> for SegmentationMask {
    type Output = u8;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl IndexMut<Idx3d> for SegmentationMask {
    #[inline]
    fn index_mut(&mut self, index: Idx3d) -> &mut Self::Output {
        &mut self.data[index]
    }
}

impl SegmentationMask {
    /// 由裸数据构建掩码. 形状不合法时返回 `Err`. 数据不会被二值化,
    /// 如有需要请调用 [`Self::binarize`].
    pub fn new(data: Array3<u8>, spacing: Spacing) -> VolumeResult<Self> {
        validate_volume_shape(data.shape())?;
        Ok(Self { data, spacing })
    }

    /// 构建与 `volume` 同形状、同间距的全背景掩码.
    pub fn zeros_like(volume: &impl VolumeGeometry) -> Self {
        Self {
            data: Array3::from_elem(volume.shape(), MASK_BACKGROUND),
            spacing: volume.spacing(),
        }
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView3<'_, u8> {
        self.data.view()
    }

    /// 获得数据的一份可变 shallow copy.
    #[inline]
    pub fn data_mut(&mut self) -> ArrayViewMut3<'_, u8> {
        self.data.view_mut()
    }

    /// 直接获得底层数据.
    #[inline]
    pub fn into_raw(self) -> Array3<u8> {
        self.data
    }

    /// 就地二值化: 任何非零值变为 [`MASK_FOREGROUND`].
    pub fn binarize(&mut self) {
        self.data.mapv_inplace(|p| {
            if is_foreground(p) {
                MASK_FOREGROUND
            } else {
                MASK_BACKGROUND
            }
        });
    }

    /// 前景体素个数.
    #[inline]
    pub fn count(&self) -> usize {
        self.data.iter().filter(|p| is_foreground(**p)).count()
    }

    /// 掩码是否为全背景?
    #[inline]
    pub fn is_background(&self) -> bool {
        self.data.iter().copied().all(is_background)
    }

    /// 前景的物理体积, 以立方毫米为单位.
    #[inline]
    pub fn volume_mm3(&self) -> f64 {
        self.count() as f64 * self.voxel()
    }

    /// 收集所有前景体素对应的下标, 结果按行优先存储.
    pub fn foreground_pos(&self) -> Vec<Idx3d> {
        self.data
            .indexed_iter()
            .filter_map(|(pos, p)| is_foreground(*p).then_some(pos))
            .collect()
    }

    /// 转换为 `0.0 / 1.0` 浮点体数据, 供平滑或渲染使用.
    pub fn to_volume(&self) -> Volume {
        Volume::from_parts(
            self.data
                .mapv(|p| if is_foreground(p) { 1.0 } else { 0.0 }),
            self.spacing,
        )
    }

    /// 两个掩码形状是否一致. 不一致时返回 `Err`.
    pub(crate) fn ensure_same_shape(&self, other: &SegmentationMask) -> VolumeResult<()> {
        if self.shape() == other.shape() {
            Ok(())
        } else {
            Err(VolumeError::ShapeMismatch {
                expected: self.shape(),
                actual: other.shape(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;

    #[test]
    fn test_validate_shape() {
        assert_eq!(validate_volume_shape(&[2, 3, 4]), Ok((2, 3, 4)));
        assert_eq!(
            validate_volume_shape(&[2, 3]),
            Err(ShapeError::NotThreeDimensional(2).into())
        );
        assert_eq!(
            validate_volume_shape(&[2, 0, 4]),
            Err(ShapeError::ZeroDimension(vec![2, 0, 4]).into())
        );
    }

    #[test]
    fn test_volume_from_dyn() {
        let d = ArrayD::<f32>::zeros(IxDyn(&[2, 2]));
        assert!(Volume::from_dyn(d, Spacing::default()).is_err());

        let d = ArrayD::<f32>::zeros(IxDyn(&[2, 3, 4]));
        let v = Volume::from_dyn(d, Spacing::default()).unwrap();
        assert_eq!(v.shape(), (2, 3, 4));
        assert_eq!(v.size(), 24);
    }

    #[test]
    fn test_orientation_slices() {
        let v = Volume::new(Array3::from_shape_fn((2, 3, 4), |(z, y, x)| {
            (z * 100 + y * 10 + x) as f32
        }))
        .unwrap();
        assert_eq!(v.slice_iter(Orientation::Axial).len(), 2);
        assert_eq!(v.slice_iter(Orientation::Coronal).len(), 3);
        assert_eq!(v.slice_iter(Orientation::Sagittal).len(), 4);
        assert_eq!(v.slice_at(Orientation::Sagittal, 3)[(1, 2)], 123.0);
    }

    #[test]
    fn test_spacing() {
        assert!(Spacing::new(1.0, 0.0, 1.0).is_none());
        assert!(Spacing::new(1.0, f64::NAN, 1.0).is_none());
        let s = Spacing::new(0.5, 0.5, 2.0).unwrap();
        assert_eq!(s.zyx(), [2.0, 0.5, 0.5]);
        assert_eq!(s.scaled(4.0), Spacing::new(2.0, 2.0, 8.0).unwrap());
        let m = SegmentationMask::new(Array3::from_elem((2, 2, 2), 3), s).unwrap();
        assert!((m.voxel() - 0.5).abs() < 1e-12);
        assert!((m.volume_mm3() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_mask_binarize() {
        let mut data = Array3::<u8>::zeros((2, 2, 2));
        data[(0, 0, 0)] = 7;
        data[(1, 1, 1)] = 1;
        let mut m = SegmentationMask::new(data, Spacing::default()).unwrap();
        m.binarize();
        assert_eq!(m[(0, 0, 0)], MASK_FOREGROUND);
        assert_eq!(m.count(), 2);
        assert_eq!(m.foreground_pos(), vec![(0, 0, 0), (1, 1, 1)]);

        let v = m.to_volume();
        assert_eq!(v.spacing(), m.spacing());
        assert_eq!(v[(0, 0, 0)], 1.0);
        assert_eq!(v[(0, 1, 0)], 0.0);
        assert_eq!(v.data().sum(), 2.0);
    }
}
