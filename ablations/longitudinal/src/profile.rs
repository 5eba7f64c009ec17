//! 流程运行统计.

use std::time::{Duration, Instant};

/// 逐阶段计时器.
#[derive(Clone, Debug, Default)]
pub struct StageTimer {
    stages: Vec<(&'static str, Duration)>,
}

impl StageTimer {
    /// 初始化空计时器.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 运行 `f` 并以 `name` 记录其耗时.
    pub fn time<T, F: FnOnce() -> T>(&mut self, name: &'static str, f: F) -> T {
        let since = Instant::now();
        let ans = f();
        let d = since.elapsed();
        log::info!("{name}: {} ms", d.as_millis());
        self.stages.push((name, d));
        ans
    }

    /// 全部阶段及其耗时, 按运行顺序.
    #[inline]
    pub fn stages(&self) -> &[(&'static str, Duration)] {
        &self.stages
    }

    /// 总耗时.
    #[inline]
    pub fn total(&self) -> Duration {
        self.stages.iter().map(|(_, d)| *d).sum()
    }
}
