//! 区域分割、掩码后处理与掩码对比.

mod compare;
mod post_proc;
mod region_grow;

pub use compare::{compare_masks, MaskComparison};
pub use post_proc::{postprocess, postprocess_in_place, postprocess_with, PostprocessConfig};
pub use region_grow::{grow_region, grow_region_with, AcceptanceInterval, RegionGrowConfig};
