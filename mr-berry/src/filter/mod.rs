//! 三维数值滤波底层实现: 高斯模糊、二值形态学、空洞填充和连通域标记.
//!
//! 本模块只操作裸 `ndarray` 数组, 不关心体素间距.

mod gaussian;
mod label;
mod morphology;
mod neighbourhood;

pub use gaussian::{gaussian_blur, gaussian_blur_isotropic, gaussian_kernel};
pub use label::{label_components, remove_small_components, Components};
pub use morphology::{close, dilate, erode, fill_holes, open};
pub use neighbourhood::{shift_in_bounds, Connectivity, Offset3d};
