//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx3d, Point3d, Shift3d};

pub use crate::{
    DisplayWindow, Orientation, SegmentationMask, Spacing, Volume, VolumeGeometry,
};
pub use crate::{RegistrationError, ShapeError, VolumeError, VolumeResult};

pub use crate::consts::label::{MASK_BACKGROUND, MASK_FOREGROUND};
pub use crate::filter::Connectivity;

pub use crate::stats::{compute_stats, IntensityStatistics, VolumeSummary};

pub use crate::alignment::{
    analyze_alignment, analyze_alignment_with, AlignmentConfig, AlignmentReport, Recommendation,
};
pub use crate::registration::{register, register_with, RegistrationConfig, Translation};

pub use crate::preprocess::{preprocess, preprocess_with, PreprocessConfig};
pub use crate::segment::{
    compare_masks, grow_region, grow_region_with, postprocess, postprocess_with,
    PostprocessConfig, RegionGrowConfig,
};
