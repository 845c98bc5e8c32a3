/*
 * @Author       : 老董
 * @Date         : 2026-02-12
 * @Description  : 激活值热力图
 *
 * 流程：张量 → 二维网格 → 按自身最值归一化到[0, 255] → viridis 着色
 *      → 最近邻放大到 size×size → PNG → base64（标准字母表，带填充）
 */

use super::{RenderError, viridis};
use crate::tensor::Tensor;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, RgbImage};
use ndarray::{Array2, Axis, Ix2, Ix3, Ix4};
use std::io::Cursor;

/// 按秩把张量化为二维网格：
/// - 4D [B, C, H, W]：取第一个样本，对通道求均值 → H×W
/// - 3D [B, S, D]：取第一个样本 → S×D
/// - 2D [B, D]：取第一个样本的向量，补零到完全平方数后排成方阵
/// - 1D：同上
/// - 其他秩或空张量：`None`
pub fn reduce_to_grid(tensor: &Tensor) -> Option<Array2<f32>> {
    if tensor.size() == 0 {
        return None;
    }
    let view = tensor.view();
    match tensor.dimension() {
        4 => {
            let first = view.into_dimensionality::<Ix4>().ok()?;
            first.index_axis(Axis(0), 0).mean_axis(Axis(0))
        }
        3 => {
            let first = view.into_dimensionality::<Ix3>().ok()?;
            Some(first.index_axis(Axis(0), 0).to_owned())
        }
        2 => {
            let rows = view.into_dimensionality::<Ix2>().ok()?;
            Some(square_grid(&rows.row(0).to_vec()))
        }
        1 => Some(square_grid(&tensor.to_vec())),
        _ => None,
    }
}

/// 补零到边长为⌈√n⌉的方阵
pub fn square_grid(values: &[f32]) -> Array2<f32> {
    let mut side = (values.len() as f64).sqrt().ceil() as usize;
    // 浮点开方在大数上可能偏小
    while side * side < values.len() {
        side += 1;
    }
    let mut padded = vec![0f32; side * side];
    padded[..values.len()].copy_from_slice(values);
    Array2::from_shape_vec((side, side), padded).unwrap_or_else(|_| Array2::zeros((side, side)))
}

/// 按网格自身的最值线性映射到[0, 255]（截断取整）；最值相等时全为 0
pub fn normalize(grid: &Array2<f32>) -> Array2<u8> {
    let min = grid.iter().copied().fold(f32::INFINITY, f32::min);
    let max = grid.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if !(max > min) {
        return Array2::zeros(grid.raw_dim());
    }
    let range = max - min;
    grid.mapv(|v| ((v - min) / range * 255.) as u8)
}

/// 逐像素着色，网格的行对应图像的 y
pub fn colorize(grid: &Array2<u8>) -> RgbImage {
    let (rows, cols) = grid.dim();
    RgbImage::from_fn(cols as u32, rows as u32, |x, y| {
        image::Rgb(viridis(grid[[y as usize, x as usize]] as f32 / 255.))
    })
}

/// 把激活值渲染为 base64 编码的 PNG；无法渲染的秩返回空字符串
pub fn activation_to_image(tensor: &Tensor, size: u32) -> Result<String, RenderError> {
    let Some(grid) = reduce_to_grid(tensor) else {
        return Ok(String::new());
    };
    if grid.is_empty() {
        return Ok(String::new());
    }
    let colored = colorize(&normalize(&grid));
    let upscaled = image::imageops::resize(&colored, size, size, FilterType::Nearest);

    let mut buffer = Vec::new();
    DynamicImage::ImageRgb8(upscaled).write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)?;
    Ok(STANDARD.encode(buffer))
}
