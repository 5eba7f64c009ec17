//! 从 `.npy` 文件加载纵向 MR 扫描对.
//!
//! 数据目录下需包含 `volume1.npy` 与 `volume2.npy` 两个 `f32` 三维数组
//! (`(z, y, x)` 顺序). 可选的 `spacing.npy` 为长度为 3 的 `f64` 数组,
//! 按 `(x, y, z)` 给出体素间距, 缺省时视为 1 毫米各向同性.

use mr_berry::{Spacing, Volume, VolumeError};
use ndarray::{Array1, ArrayD};
use ndarray_npy::{read_npy, ReadNpyError};
use std::env;
use std::path::{Path, PathBuf};

/// 第一个时间点的扫描文件名.
pub const FIRST_VOLUME: &str = "volume1.npy";

/// 第二个时间点的扫描文件名.
pub const SECOND_VOLUME: &str = "volume2.npy";

/// 体素间距文件名.
pub const SPACING: &str = "spacing.npy";

/// 加载错误.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// 读取 `.npy` 文件错误.
    #[error("cannot read {}: {source}", .path.display())]
    Npy {
        /// 文件路径.
        path: PathBuf,

        /// 底层错误.
        source: ReadNpyError,
    },

    /// 间距文件内容不合法.
    #[error("invalid spacing in {}", .0.display())]
    InvalidSpacing(PathBuf),

    /// 数组不是合法的三维体数据.
    #[error(transparent)]
    Volume(#[from] VolumeError),
}

/// 获取数据基本路径.
///
/// 1. 若环境变量 `$MR_BERRY_DATA_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/mr`. 无法确定家目录时返回 `None`.
pub fn data_dir_from_env_or_home() -> Option<PathBuf> {
    match env::var("MR_BERRY_DATA_DIR") {
        Ok(d) if !d.is_empty() => Some(PathBuf::from(d)),
        _ => {
            let mut ans = dirs::home_dir()?;
            ans.extend(["dataset", "mr"]);
            Some(ans)
        }
    }
}

fn read<P: AsRef<Path>, T: ndarray_npy::ReadableElement>(
    path: P,
) -> Result<ArrayD<T>, LoadError> {
    read_npy(path.as_ref()).map_err(|source| LoadError::Npy {
        path: path.as_ref().to_path_buf(),
        source,
    })
}

/// 读取 `dir` 下的体素间距. 文件不存在时返回默认间距.
pub fn load_spacing<P: AsRef<Path>>(dir: P) -> Result<Spacing, LoadError> {
    let path = dir.as_ref().join(SPACING);
    if !path.is_file() {
        return Ok(Spacing::default());
    }
    let s: Array1<f64> = read_npy(&path).map_err(|source| LoadError::Npy {
        path: path.clone(),
        source,
    })?;
    match s.as_slice() {
        Some(&[x, y, z]) => Spacing::new(x, y, z).ok_or(LoadError::InvalidSpacing(path)),
        _ => Err(LoadError::InvalidSpacing(path)),
    }
}

/// 以给定间距读取单个体数据.
pub fn load_volume<P: AsRef<Path>>(path: P, spacing: Spacing) -> Result<Volume, LoadError> {
    Ok(Volume::from_dyn(read::<_, f32>(path)?, spacing)?)
}

/// 读取 `dir` 下的扫描对, 两者共用同一间距.
pub fn load_pair<P: AsRef<Path>>(dir: P) -> Result<(Volume, Volume), LoadError> {
    let dir = dir.as_ref();
    let spacing = load_spacing(dir)?;
    Ok((
        load_volume(dir.join(FIRST_VOLUME), spacing)?,
        load_volume(dir.join(SECOND_VOLUME), spacing)?,
    ))
}
