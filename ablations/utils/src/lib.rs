//! 纵向实验共用组件: 扫描对加载与运行环境解析.

use mr_berry::Idx3d;
use std::env;

pub mod loader;

/// 区域生长种子点的环境变量名, 取值格式为 `z,y,x`.
pub const SEED_VAR: &str = "MR_BERRY_SEED";

/// 解析 `z,y,x` 形式的种子点, 各分量两侧允许空白. 格式错误时返回 `None`.
pub fn parse_seed(s: &str) -> Option<Idx3d> {
    let v: Vec<usize> = s
        .split(',')
        .map(|t| t.trim().parse().ok())
        .collect::<Option<_>>()?;
    match v.as_slice() {
        &[z, y, x] => Some((z, y, x)),
        _ => None,
    }
}

/// 读取 `$MR_BERRY_SEED`. 未设置时返回 `Ok(None)`, 格式错误时返回原始取值.
pub fn seed_from_env() -> Result<Option<Idx3d>, String> {
    match env::var(SEED_VAR) {
        Ok(s) => parse_seed(&s).map(Some).ok_or(s),
        Err(_) => Ok(None),
    }
}

/// 可用于体数据计算的核心数.
pub fn cpus() -> usize {
    std::thread::available_parallelism().map_or_else(|_| num_cpus::get(), usize::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seed() {
        assert_eq!(parse_seed("16,16,16"), Some((16, 16, 16)));
        assert_eq!(parse_seed(" 3 , 4,5 "), Some((3, 4, 5)));
        assert_eq!(parse_seed("1,2"), None);
        assert_eq!(parse_seed("1,2,3,4"), None);
        assert_eq!(parse_seed("1,-2,3"), None);
        assert_eq!(parse_seed(""), None);
    }
}
