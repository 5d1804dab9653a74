use std::io::Cursor;

use super::*;

#[test]
fn decode_png_keeps_straight_alpha() {
    let img = image::RgbaImage::from_raw(1, 1, vec![100u8, 50, 200, 128]).unwrap();

    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();

    let decoded = decode_rgba(&buf).unwrap();
    assert_eq!(decoded.dimensions(), (1, 1));
    assert_eq!(decoded.as_raw().as_slice(), &[100u8, 50, 200, 128]);
}

#[test]
fn premultiply_then_unpremultiply_is_close() {
    let mut px = vec![100u8, 50, 200, 128];
    premultiply_rgba8_in_place(&mut px);
    assert_eq!(
        px,
        vec![
            ((100u16 * 128 + 127) / 255) as u8,
            ((50u16 * 128 + 127) / 255) as u8,
            ((200u16 * 128 + 127) / 255) as u8,
            128u8
        ]
    );
    unpremultiply_rgba8_in_place(&mut px);
    assert!((i32::from(px[0]) - 100).abs() <= 1);
    assert!((i32::from(px[2]) - 200).abs() <= 1);
}

#[test]
fn cover_fit_fills_canvas_from_landscape() {
    let img = image::RgbaImage::from_pixel(400, 100, image::Rgba([9, 9, 9, 255]));
    let canvas = Canvas::new(72, 128).unwrap();
    let out = cover_fit(&img, canvas).unwrap();
    assert_eq!(out.dimensions(), (72, 128));
    assert_eq!(out.get_pixel(0, 0).0[3], 255);
}

#[test]
fn load_reports_missing_file() {
    let err = load_rgba(Path::new("/definitely/not/here.png")).unwrap_err();
    assert!(err.to_string().contains("here.png"));
}
