/*
 * @Author       : 老董
 * @Date         : 2023-08-30 19:16:48
 * @LastEditors  : 老董
 * @LastEditTime : 2026-02-12
 * @Description  : 本模块提供视觉相关的功能：
 *                 1. 把本地图像加载为模型输入张量；
 *                 2. 把激活值张量渲染为热力图（见`heatmap`）。
 *                 不严谨地说，这里所谓的image/图像是指RGB格式的图像。
 */

mod colormap;
pub mod heatmap;

pub use colormap::viridis;
pub use heatmap::activation_to_image;

use crate::tensor::Tensor;
use image::imageops::FilterType;
use std::path::Path;
use thiserror::Error;

#[cfg(test)]
mod tests;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("热力图编码失败: {0}")]
    Encode(#[from] image::ImageError),
}

pub struct Vision;

impl Vision {
    /// 加载本地图像作为模型输入：转RGB → 双线性缩放到`height`×`width` → 缩放到[-1, 1]，
    /// 排布为[1, 3, height, width]
    pub fn load_image_for_inference(
        path: &Path,
        height: usize,
        width: usize,
    ) -> Result<Tensor, image::ImageError> {
        let rgb = image::open(path)?.to_rgb8();
        let resized =
            image::imageops::resize(&rgb, width as u32, height as u32, FilterType::Triangle);

        let plane = height * width;
        let mut data = vec![0f32; 3 * plane];
        for (x, y, pixel) in resized.enumerate_pixels() {
            let offset = y as usize * width + x as usize;
            for c in 0..3 {
                data[c * plane + offset] = (pixel[c] as f32 / 255. - 0.5) / 0.5;
            }
        }
        Ok(Tensor::new(&data, &[1, 3, height, width]))
    }
}
