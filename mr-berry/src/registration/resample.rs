use ndarray::{Array3, ArrayView3, Zip};

use super::transform::Translation;
use crate::{Volume, VolumeGeometry};

/// 连续下标允许的越界容差.
const INSIDE_EPS: f64 = 1e-6;

/// 三线性插值. `idx` 为 `[z, y, x]` 连续下标.
///
/// 任一轴的下标落在 `[0, n - 1]` 之外时返回 `None`.
pub fn sample_linear(data: &ArrayView3<f32>, idx: [f64; 3]) -> Option<f64> {
    let dim = data.dim();
    let dims = [dim.0, dim.1, dim.2];
    let mut lo = [0usize; 3];
    let mut hi = [0usize; 3];
    let mut frac = [0.0f64; 3];
    for a in 0..3 {
        let n = dims[a];
        let c = idx[a];
        if !(c >= -INSIDE_EPS && c <= (n - 1) as f64 + INSIDE_EPS) {
            return None;
        }
        let c = c.clamp(0.0, (n - 1) as f64);
        let i0 = (c.floor() as usize).min(n.saturating_sub(2));
        lo[a] = i0;
        hi[a] = (i0 + 1).min(n - 1);
        frac[a] = c - i0 as f64;
    }
    let mut acc = 0.0;
    for corner in 0..8u8 {
        let mut w = 1.0;
        let mut pos = [0usize; 3];
        for a in 0..3 {
            if corner >> a & 1 == 1 {
                w *= frac[a];
                pos[a] = hi[a];
            } else {
                w *= 1.0 - frac[a];
                pos[a] = lo[a];
            }
        }
        if w != 0.0 {
            acc += w * f64::from(data[(pos[0], pos[1], pos[2])]);
        }
    }
    Some(acc)
}

/// 按 `transform` 将 `moving` 重采样到 `fixed` 的网格上, 使用三线性插值.
///
/// 输出的形状与间距都与 `fixed` 一致. 映射到 `moving` 之外的体素取 0.
pub fn resample(fixed: &Volume, moving: &Volume, transform: &Translation) -> Volume {
    let fs = fixed.spacing().zyx();
    let ms = moving.spacing().zyx();
    let src = moving.data();
    let mut out = Array3::<f32>::zeros(fixed.shape());

    let op = |(z, y, x): (usize, usize, usize), v: &mut f32| {
        let p = transform.apply([z as f64 * fs[0], y as f64 * fs[1], x as f64 * fs[2]]);
        let idx = [p[0] / ms[0], p[1] / ms[1], p[2] / ms[2]];
        *v = sample_linear(&src, idx).unwrap_or(0.0) as f32;
    };
    cfg_if::cfg_if! {
        if #[cfg(feature = "rayon")] {
            Zip::indexed(&mut out).par_for_each(op);
        } else {
            Zip::indexed(&mut out).for_each(op);
        }
    }
    Volume::from_parts(out, fixed.spacing())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Spacing;

    fn ramp() -> Volume {
        Volume::new(Array3::from_shape_fn((4, 5, 6), |(z, y, x)| {
            (z * 100 + y * 10 + x) as f32
        }))
        .unwrap()
    }

    #[test]
    fn test_sample_linear() {
        let v = ramp();
        let d = v.data();
        assert_eq!(sample_linear(&d, [1.0, 2.0, 3.0]), Some(123.0));
        assert!((sample_linear(&d, [1.5, 2.5, 3.5]).unwrap() - 178.5).abs() < 1e-9);
        assert_eq!(sample_linear(&d, [3.0, 4.0, 5.0]), Some(345.0));
        assert_eq!(sample_linear(&d, [3.1, 0.0, 0.0]), None);
        assert_eq!(sample_linear(&d, [-0.1, 0.0, 0.0]), None);
    }

    #[test]
    fn test_resample_identity_and_shift() {
        let v = ramp();
        assert_eq!(resample(&v, &v, &Translation::identity()), v);

        let r = resample(&v, &v, &Translation::new([0.0, 0.0, 1.0]));
        assert_eq!(r[(1, 2, 3)], 124.0);
        assert_eq!(r[(1, 2, 5)], 0.0);
    }

    #[test]
    fn test_resample_spacing() {
        let v = ramp();
        let fixed = Volume::with_spacing(
            Array3::zeros((2, 3, 3)),
            Spacing::new(2.0, 2.0, 2.0).unwrap(),
        )
        .unwrap();
        let r = resample(&fixed, &v, &Translation::identity());
        assert_eq!(r.shape(), (2, 3, 3));
        assert_eq!(r.spacing(), fixed.spacing());
        assert_eq!(r[(1, 2, 2)], 244.0);
    }
}
