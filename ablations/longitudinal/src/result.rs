//! 流程结果.

use crate::profile::StageTimer;
use mr_berry::alignment::AlignmentReport;
use mr_berry::segment::MaskComparison;
use mr_berry::stats::{IntensityStatistics, VolumeSummary};
use mr_berry::VolumeError;
use std::io::{self, Write};
use utils::loader::LoadError;

/// 报告各部分之间的分隔线.
const RULE: &str = "========================================================";

/// 流程运行错误.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 无法确定数据目录.
    #[error("cannot determine data directory, set $MR_BERRY_DATA_DIR")]
    NoDataDir,

    /// `$MR_BERRY_SEED` 格式错误.
    #[error("invalid seed `{0}`, expected `z,y,x`")]
    InvalidSeed(String),

    /// 数据加载错误.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// 核心计算错误.
    #[error(transparent)]
    Volume(#[from] VolumeError),

    /// 报告写入错误.
    #[error("cannot write report: {0}")]
    Io(#[from] io::Error),
}

/// 将单个体数据的统计量写进 `w` 中.
fn describe_into<W: Write>(name: &str, s: &VolumeSummary, w: &mut W) -> io::Result<()> {
    const S4: &str = "    ";

    writeln!(w, "Statistics `{name}`:")?;
    writeln!(w, "{S4}Range: [{:.4}, {:.4}]", s.min, s.max)?;
    writeln!(w, "{S4}Mean: {:.4}, std: {:.4}", s.mean, s.std)?;
    writeln!(w, "{S4}Percentiles 1/99: {:.4} / {:.4}", s.p1, s.p99)?;
    write!(w, "{S4}Nonzero voxels: {} of {}", s.nonzero, s.total)?;
    Ok(())
}

/// 流程最终结果.
pub struct PipelineResult {
    pub stats: IntensityStatistics,
    pub report: AlignmentReport,
    pub masks: MaskComparison,
    pub timer: StageTimer,
}

impl PipelineResult {
    fn write_into<W: Write>(&self, w: &mut W) -> io::Result<()> {
        describe_into("volume 1", &self.stats.first, w)?;
        writeln!(w)?;
        if let Some(s) = self.stats.second.as_ref() {
            describe_into("volume 2", s, w)?;
            writeln!(w)?;
        }
        if let Some(win) = self.stats.window {
            writeln!(
                w,
                "Display window: level {:.4}, width {:.4}",
                win.level(),
                win.width()
            )?;
        }
        writeln!(w, "{RULE}")?;
        writeln!(w, "{}", self.report)?;
        writeln!(w, "{RULE}")?;
        writeln!(w, "{}", self.masks)?;
        writeln!(w, "{RULE}")?;
        for (name, d) in self.timer.stages() {
            writeln!(w, "{name:<16} {} ms", d.as_millis())?;
        }
        write!(w, "{:<16} {} ms", "total", self.timer.total().as_millis())
    }

    /// 分析运行结果.
    pub fn analyze(&self) {
        let mut buf = Vec::with_capacity(2048);
        match self.write_into(&mut buf) {
            Ok(()) => println!("{}", String::from_utf8_lossy(&buf)),
            Err(e) => log::error!("{e}"),
        }
        println!("{RULE}");
    }
}
