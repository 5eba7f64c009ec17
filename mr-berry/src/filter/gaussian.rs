use ndarray::{Array3, ArrayView1, ArrayView3, ArrayViewMut1, Axis, Zip};

use crate::consts::GAUSSIAN_TRUNCATE;

/// 一维归一化高斯核, 半径为 `int(truncate * sigma + 0.5)`.
///
/// `sigma` 不为正时返回 `[1.0]`.
pub fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    if !(sigma > 0.0) {
        return vec![1.0];
    }
    let radius = (GAUSSIAN_TRUNCATE * sigma + 0.5) as isize;
    let denom = 2.0 * sigma * sigma;
    let mut w: Vec<f64> = (-radius..=radius)
        .map(|i| (-((i * i) as f64) / denom).exp())
        .collect();
    let sum: f64 = w.iter().sum();
    w.iter_mut().for_each(|v| *v /= sum);
    w
}

/// 半样本对称 (`d c b a | a b c d | d c b a`) 边界延拓下的索引.
#[inline]
fn reflect(i: isize, n: usize) -> usize {
    let n = n as isize;
    let period = 2 * n;
    let i = i.rem_euclid(period);
    (if i >= n { period - 1 - i } else { i }) as usize
}

fn convolve_lane(src: ArrayView1<f32>, mut dst: ArrayViewMut1<f32>, kernel: &[f64]) {
    let n = src.len();
    let radius = (kernel.len() / 2) as isize;
    let buf: Vec<f64> = src.iter().map(|v| f64::from(*v)).collect();
    for (i, out) in dst.iter_mut().enumerate() {
        let c = i as isize - radius;
        *out = kernel
            .iter()
            .enumerate()
            .map(|(k, w)| w * buf[reflect(c + k as isize, n)])
            .sum::<f64>() as f32;
    }
}

#[cfg(not(feature = "rayon"))]
fn blur_axis(src: ArrayView3<f32>, axis: Axis, kernel: &[f64]) -> Array3<f32> {
    let mut dst = Array3::zeros(src.raw_dim());
    Zip::from(dst.lanes_mut(axis))
        .and(src.lanes(axis))
        .for_each(|d, s| convolve_lane(s, d, kernel));
    dst
}

#[cfg(feature = "rayon")]
fn blur_axis(src: ArrayView3<f32>, axis: Axis, kernel: &[f64]) -> Array3<f32> {
    let mut dst = Array3::zeros(src.raw_dim());
    Zip::from(dst.lanes_mut(axis))
        .and(src.lanes(axis))
        .par_for_each(|d, s| convolve_lane(s, d, kernel));
    dst
}

/// 可分离三维高斯模糊. `sigma` 按数组轴顺序 `[z, y, x]` 给出, 以体素为单位.
///
/// 核在 4 sigma 处截断, 边界按半样本对称延拓. 某轴 `sigma` 不为正时跳过该轴.
pub fn gaussian_blur(data: ArrayView3<f32>, sigma: [f64; 3]) -> Array3<f32> {
    let mut out = data.to_owned();
    for (ax, s) in sigma.into_iter().enumerate() {
        if s > 0.0 {
            out = blur_axis(out.view(), Axis(ax), &gaussian_kernel(s));
        }
    }
    out
}

/// 各向同性三维高斯模糊.
#[inline]
pub fn gaussian_blur_isotropic(data: ArrayView3<f32>, sigma: f64) -> Array3<f32> {
    gaussian_blur(data, [sigma; 3])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel() {
        let k = gaussian_kernel(1.0);
        assert_eq!(k.len(), 9);
        assert!((k.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(k[4] > k[3] && (k[3] - k[5]).abs() < 1e-15);
        assert_eq!(gaussian_kernel(0.0), vec![1.0]);
        assert_eq!(gaussian_kernel(2.0).len(), 17);
    }

    #[test]
    fn test_reflect() {
        let n = 4;
        let got: Vec<usize> = (-5..9).map(|i| reflect(i, n)).collect();
        assert_eq!(got, vec![3, 3, 2, 1, 0, 0, 1, 2, 3, 3, 2, 1, 0, 0]);
    }

    #[test]
    fn test_blur_preserves_constant_and_mass() {
        let c = Array3::from_elem((3, 4, 5), 7.0f32);
        let b = gaussian_blur_isotropic(c.view(), 1.0);
        assert!(b.iter().all(|v| (v - 7.0).abs() < 1e-4));

        let mut impulse = Array3::<f32>::zeros((15, 15, 15));
        impulse[(7, 7, 7)] = 1.0;
        let b = gaussian_blur_isotropic(impulse.view(), 1.0);
        assert!((b.sum() - 1.0).abs() < 1e-4);
        assert!(b[(7, 7, 7)] > b[(7, 7, 8)]);
        assert!((b[(7, 7, 8)] - b[(7, 8, 7)]).abs() < 1e-7);
    }
}
