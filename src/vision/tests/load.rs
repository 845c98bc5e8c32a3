use crate::vision::Vision;
use approx::assert_abs_diff_eq;

#[test]
fn test_load_image_for_inference() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("solid.png");
    // 纯色图像：缩放不改变像素值
    image::RgbImage::from_pixel(40, 20, image::Rgb([255, 0, 51]))
        .save(&path)
        .unwrap();

    let t = Vision::load_image_for_inference(&path, 32, 32).unwrap();
    assert_eq!(t.shape(), &[1, 3, 32, 32]);
    let data = t.to_vec();
    let plane = 32 * 32;
    assert_abs_diff_eq!(data[0], 1., epsilon = 1e-6);
    assert_abs_diff_eq!(data[plane], -1., epsilon = 1e-6);
    assert_abs_diff_eq!(data[2 * plane + 5], -0.6, epsilon = 1e-6);
    assert!(data.iter().all(|v| (-1.0f32..=1.0).contains(v)));
}

#[test]
fn test_load_image_for_inference_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    assert!(Vision::load_image_for_inference(&dir.path().join("nope.png"), 32, 32).is_err());
}
