//! 对齐结论、建议与纯文本报告.

use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use itertools::Itertools;

use super::config::AlignmentConfig;
use super::correlation::SliceCorrelations;
use crate::{Idx3d, Orientation, Point3d, Shift3d};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 对齐建议. 通过 `Display` 得到人类可读的文本.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Recommendation {
    /// 维度不一致, 需要重采样到相同网格.
    HarmonizeDimensions,

    /// 维度不一致, 需要核对采集参数.
    CheckAcquisitionParameters,

    /// 质心距离过大.
    CenterOfMassTranslation,

    /// 这些方向的平均切片相关系数过低.
    LowCorrelation(Vec<Orientation>),

    /// 相关性过低, 需要刚性或非刚性配准.
    RigidOrDeformableRegistration,

    /// 估计平移过大, 携带估计的 `(z, y, x)` 位移.
    SignificantShift(Shift3d),

    /// 估计平移过大, 需要平移校正.
    TranslationCorrection,

    /// 未发现任何问题.
    WellAligned,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HarmonizeDimensions => {
                f.write_str("Perform spatial registration to harmonize the dimensions")
            }
            Self::CheckAcquisitionParameters => {
                f.write_str("Check the acquisition parameters (resolution, field of view)")
            }
            Self::CenterOfMassTranslation => {
                f.write_str("Consider a translation registration based on the centers of mass")
            }
            Self::LowCorrelation(os) => {
                write!(f, "Low correlation detected in planes: {}", os.iter().join(", "))
            }
            Self::RigidOrDeformableRegistration => {
                f.write_str("Consider a rigid or non-rigid registration")
            }
            Self::SignificantShift((z, y, x)) => {
                write!(f, "Significant shift detected: ({z}, {y}, {x})")
            }
            Self::TranslationCorrection => f.write_str("Apply a translation correction"),
            Self::WellAligned => f.write_str("The volumes appear to be correctly aligned"),
        }
    }
}

/// 两个同形体数据的对齐度量.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AlignmentMetrics {
    /// 第一个体数据的质心, `(x, y, z)` 顺序.
    pub com_first: Point3d,

    /// 第二个体数据的质心, `(x, y, z)` 顺序.
    pub com_second: Point3d,

    /// 质心欧氏距离 (体素).
    pub com_distance: f64,

    /// 三个方向的逐切片相关性.
    pub correlations: SliceCorrelations,

    /// 估计的 `(z, y, x)` 整数体素位移.
    pub shift: Shift3d,
}

impl AlignmentMetrics {
    /// 位移分量绝对值的最大值.
    #[inline]
    pub fn max_abs_shift(&self) -> i32 {
        let (z, y, x) = self.shift;
        z.abs().max(y.abs()).max(x.abs())
    }

    /// 平均相关系数低于 `threshold` 的方向.
    pub fn low_correlation(&self, threshold: f64) -> Vec<Orientation> {
        self.correlations
            .iter()
            .filter(|(_, c)| c.mean < threshold)
            .map(|(o, _)| o)
            .collect()
    }

    /// 对齐判定: 三个方向的平均相关系数都严格大于门限,
    /// 且位移与质心距离都严格小于各自的门限.
    pub fn is_well_aligned(&self, config: &AlignmentConfig) -> bool {
        self.correlations
            .iter()
            .all(|(_, c)| c.mean > config.correlation_threshold)
            && f64::from(self.max_abs_shift()) < config.shift_threshold
            && self.com_distance < config.com_threshold
    }
}

/// 按固定顺序生成建议. `metrics` 为 `None` 表示维度不一致.
pub fn recommend(metrics: Option<&AlignmentMetrics>, config: &AlignmentConfig) -> Vec<Recommendation> {
    use Recommendation::*;

    let Some(m) = metrics else {
        return vec![HarmonizeDimensions, CheckAcquisitionParameters];
    };
    let mut ans = Vec::with_capacity(4);
    if m.com_distance > config.com_threshold {
        ans.push(CenterOfMassTranslation);
    }
    let low = m.low_correlation(config.correlation_threshold);
    if !low.is_empty() {
        ans.push(LowCorrelation(low));
        ans.push(RigidOrDeformableRegistration);
    }
    if f64::from(m.max_abs_shift()) > config.shift_threshold {
        ans.push(SignificantShift(m.shift));
        ans.push(TranslationCorrection);
    }
    if ans.is_empty() {
        ans.push(WellAligned);
    }
    ans
}

/// 对齐分析结果. 每次比较时新建, 之后只读.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AlignmentReport {
    /// 两个体数据的形状.
    pub shapes: (Idx3d, Idx3d),

    /// 形状是否一致.
    pub dimensions_match: bool,

    /// 对齐度量. 形状不一致时为 `None`.
    pub metrics: Option<AlignmentMetrics>,

    /// 对齐判定.
    pub is_well_aligned: bool,

    /// 按固定顺序排列的建议.
    pub recommendations: Vec<Recommendation>,
}

impl AlignmentReport {
    /// 是否需要配准.
    #[inline]
    pub fn needs_registration(&self) -> bool {
        !self.is_well_aligned
    }

    /// 将纯文本报告写入 `path`. 文件已存在时覆盖.
    pub fn save_report<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let mut w = BufWriter::new(File::create(path)?);
        writeln!(w, "{self}")?;
        w.flush()
    }
}

impl fmt::Display for AlignmentReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const S4: &str = "    ";
        const SEP: &str = "==================================================";

        #[inline]
        fn point(p: &Point3d) -> String {
            format!("({:.2}, {:.2}, {:.2})", p.0, p.1, p.2)
        }

        let ((z0, y0, x0), (z1, y1, x1)) = self.shapes;
        writeln!(f, "SPATIAL ALIGNMENT REPORT")?;
        writeln!(f, "{SEP}")?;
        writeln!(f, "Dimensions: ({z0}, {y0}, {x0}) vs ({z1}, {y1}, {x1})")?;
        writeln!(
            f,
            "Well aligned: {}",
            if self.is_well_aligned { "YES" } else { "NO" }
        )?;

        if let Some(m) = &self.metrics {
            writeln!(f)?;
            writeln!(f, "METRICS:")?;
            writeln!(f, "{S4}Center of mass (first): {}", point(&m.com_first))?;
            writeln!(f, "{S4}Center of mass (second): {}", point(&m.com_second))?;
            writeln!(f, "{S4}Center distance: {:.2} voxels", m.com_distance)?;
            for (o, c) in m.correlations.iter() {
                writeln!(
                    f,
                    "{S4}Correlation {o:<8} - mean: {:.3}, min: {:.3} ({}/{} slices)",
                    c.mean, c.min, c.valid, c.total
                )?;
            }
            let (z, y, x) = m.shift;
            writeln!(f, "{S4}Estimated shift (z, y, x): ({z}, {y}, {x}) voxels")?;
        }

        writeln!(f)?;
        write!(f, "RECOMMENDATIONS:")?;
        for (i, r) in self.recommendations.iter().enumerate() {
            write!(f, "\n{}. {r}", i + 1)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::OrientationCorrelation;

    fn metrics(mean: f64, shift: Shift3d, com_distance: f64) -> AlignmentMetrics {
        let c = OrientationCorrelation {
            mean,
            min: mean,
            valid: 1,
            total: 1,
        };
        AlignmentMetrics {
            com_first: (0.0, 0.0, 0.0),
            com_second: (com_distance, 0.0, 0.0),
            com_distance,
            correlations: SliceCorrelations {
                axial: c,
                coronal: c,
                sagittal: c,
            },
            shift,
        }
    }

    #[test]
    fn test_recommend_order() {
        let cfg = AlignmentConfig::default();
        assert_eq!(
            recommend(None, &cfg),
            vec![
                Recommendation::HarmonizeDimensions,
                Recommendation::CheckAcquisitionParameters
            ]
        );

        let m = metrics(0.5, (4, 0, 0), 6.0);
        let r = recommend(Some(&m), &cfg);
        assert_eq!(r.len(), 5);
        assert_eq!(r[0], Recommendation::CenterOfMassTranslation);
        assert_eq!(r[1], Recommendation::LowCorrelation(Orientation::ALL.to_vec()));
        assert_eq!(r[3], Recommendation::SignificantShift((4, 0, 0)));
        assert!(!m.is_well_aligned(&cfg));

        let m = metrics(0.9, (0, 0, 0), 0.0);
        assert_eq!(recommend(Some(&m), &cfg), vec![Recommendation::WellAligned]);
        assert!(m.is_well_aligned(&cfg));
    }

    #[test]
    fn test_thresholds_strict() {
        let cfg = AlignmentConfig::default();
        // 相关系数恰为 0.7: 判定失败, 但不触发低相关建议.
        let m = metrics(0.7, (0, 0, 0), 0.0);
        assert!(!m.is_well_aligned(&cfg));
        assert!(m.low_correlation(cfg.correlation_threshold).is_empty());

        // 位移恰为 2: 判定失败, 但不触发平移建议.
        let m = metrics(0.9, (0, -2, 0), 0.0);
        assert!(!m.is_well_aligned(&cfg));
        assert_eq!(recommend(Some(&m), &cfg), vec![Recommendation::WellAligned]);
    }

    #[test]
    fn test_report_text() {
        let cfg = AlignmentConfig::default();
        let m = metrics(0.5, (0, 0, 0), 0.0);
        let report = AlignmentReport {
            shapes: ((2, 3, 4), (2, 3, 4)),
            dimensions_match: true,
            metrics: Some(m),
            is_well_aligned: m.is_well_aligned(&cfg),
            recommendations: recommend(Some(&m), &cfg),
        };
        let text = report.to_string();
        assert!(text.contains("Well aligned: NO"));
        assert!(text.contains("1. Low correlation detected in planes: axial, coronal, sagittal"));
        assert!(text.contains("2. Consider a rigid or non-rigid registration"));
    }
}
