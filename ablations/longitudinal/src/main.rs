//! 纵向扫描对的完整流程: 统计 -> 对齐分析 -> (必要时) 配准 -> 预处理 ->
//! 区域生长 -> 后处理 -> 掩码对比. 逐阶段计时, 并将对齐报告写入数据目录.

mod profile;
mod result;
mod runner;

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = simple_logger::init_with_level(log::Level::Info) {
        eprintln!("Cannot initialize logger: {e}");
    }
    match runner::run() {
        Ok(r) => {
            r.analyze();
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
