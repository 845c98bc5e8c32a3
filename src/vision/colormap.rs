//! viridis 调色板（matplotlib 的 256 色查找表，由 colorous 提供）

/// 把[0, 1]内的标量映射为 viridis 颜色，超出范围的输入会被截断
pub fn viridis(t: f32) -> [u8; 3] {
    let t = if t.is_nan() { 0. } else { t.clamp(0., 1.) as f64 };
    let color = colorous::VIRIDIS.eval_continuous(t);
    [color.r, color.g, color.b]
}
