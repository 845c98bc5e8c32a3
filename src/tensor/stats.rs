/*
 * @Author       : 老董
 * @Date         : 2026-02-10
 * @Description  : 张量的统计量：均值、标准差（无偏）、最小值、最大值
 *                 空张量的统计量均为NaN；只含1个元素时标准差也为NaN（与PyTorch一致）
 */

use super::Tensor;

impl Tensor {
    pub fn mean(&self) -> f32 {
        if self.size() == 0 {
            return f32::NAN;
        }
        let sum: f64 = self.data.iter().map(|&x| x as f64).sum();
        (sum / self.size() as f64) as f32
    }

    /// 无偏标准差（除以n-1），对应`torch.Tensor.std()`
    pub fn std(&self) -> f32 {
        let n = self.size();
        if n < 2 {
            return f32::NAN;
        }
        let mean = self.mean() as f64;
        let sq_sum: f64 = self
            .data
            .iter()
            .map(|&x| {
                let d = x as f64 - mean;
                d * d
            })
            .sum();
        (sq_sum / (n - 1) as f64).sqrt() as f32
    }

    pub fn min(&self) -> f32 {
        self.data
            .iter()
            .copied()
            .reduce(f32::min)
            .unwrap_or(f32::NAN)
    }

    pub fn max(&self) -> f32 {
        self.data
            .iter()
            .copied()
            .reduce(f32::max)
            .unwrap_or(f32::NAN)
    }
}
