use super::*;
use crate::hwtype::HwType;
use crate::tag::{Mac, TagRecord};
use crate::template::TextElement;
use crate::vars::VariableStore;
use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

fn params(width: u16, height: u16, bpp: u8) -> ImageParams {
    let tag = TagRecord::new(Mac([1, 0, 0, 0, 0, 0, 0, 0]), 0);
    ImageParams::new(&HwType::raster(width, height, bpp), &tag)
}

fn png(img: &RgbImage) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

#[test]
fn test_resolve_font() {
    assert_eq!(resolve_font(""), FontRef::Default);
    assert_eq!(
        resolve_font("7x14_tf"),
        FontRef::Builtin("7x14_tf".to_string())
    );
    assert_eq!(
        resolve_font("bahnschrift30"),
        FontRef::Bitmap("/fonts/bahnschrift30".to_string())
    );
    assert_eq!(
        resolve_font("fonts/calibrib30.vlw"),
        FontRef::Bitmap("/fonts/calibrib30".to_string())
    );
    assert_eq!(
        resolve_font("/fonts/Roboto.ttf"),
        FontRef::TrueType("/fonts/Roboto.ttf".to_string())
    );
}

#[test]
fn test_image_params_from_hardware() {
    let mut tag = TagRecord::new(Mac([1, 0, 0, 0, 0, 0, 0, 0]), 1);
    tag.rotate = 2;
    tag.has_custom_lut = true;
    tag.lut = 0;

    let p = ImageParams::new(&HwType::raster(296, 128, 2), &tag);
    assert_eq!((p.width, p.height, p.bpp), (296, 128, 2));
    assert_eq!(p.rotate, 2);
    assert!(p.gray_lut);
    assert!(!p.has_red);
    assert_eq!(p.data_type, crate::transport::data_type::IMG_RAW_1BPP);

    tag.lut = 1;
    assert!(!ImageParams::new(&HwType::raster(296, 128, 2), &tag).gray_lut);
}

#[test]
fn test_set_segments_truncates() {
    let mut p = params(0, 0, 1);
    p.set_segments("123456789012", 0x02);
    assert_eq!(p.segments, "1234567890");
    assert_eq!(p.symbols, 0x02);
}

#[test]
fn test_init_surface_full_depth() {
    let rasterizer = DisplayListRasterizer::new();
    let mut p = params(152, 152, 2);

    let surface = init_surface(&rasterizer, &mut p).unwrap();
    assert_eq!(surface.bpp(), 8);
    assert_eq!(p.buffer_bpp, 8);
    assert_eq!(
        DisplayListRasterizer::decode(&surface.to_buffer(&p)).unwrap(),
        vec![DrawOp::Fill {
            color: color::WHITE
        }]
    );
}

#[test]
fn test_init_surface_falls_back_to_1bpp() {
    let rasterizer = DisplayListRasterizer::with_max_bpp(1);
    let mut p = params(152, 152, 2);

    let surface = init_surface(&rasterizer, &mut p).unwrap();
    assert_eq!(surface.bpp(), 1);
    assert_eq!(p.buffer_bpp, 1);
}

#[test]
fn test_init_surface_gives_up() {
    let rasterizer = DisplayListRasterizer::with_max_bpp(0);
    let mut p = params(152, 152, 2);

    assert!(init_surface(&rasterizer, &mut p).is_none());
    assert_eq!(rasterizer.surfaces_created(), 0);
}

#[test]
fn test_draw_text_expands_variables() {
    let vars = VariableStore::new();
    vars.set("ap_ip", "10.0.0.2");
    let rasterizer = DisplayListRasterizer::new();
    let mut p = params(296, 128, 2);
    let mut surface = init_surface(&rasterizer, &mut p).unwrap();

    let text = TextElement::new(5, 10, "ip {ap_ip} {nope}", "7x14_tf").align(Align::Right);
    draw_text(surface.as_mut(), &vars, &text);

    let ops = DisplayListRasterizer::decode(&surface.to_buffer(&p)).unwrap();
    assert_eq!(
        ops[1],
        DrawOp::Text {
            x: 5,
            y: 10,
            text: "ip 10.0.0.2 {nope}".to_string(),
            font: FontRef::Builtin("7x14_tf".to_string()),
            align: Align::Right,
            color: color::BLACK,
            size: 0,
            bg: color::WHITE,
        }
    );
}

#[test]
fn test_dither_codec_threshold() {
    // Left half black, right half white
    let img = RgbImage::from_fn(8, 2, |x, _| {
        if x < 4 {
            Rgb([0, 0, 0])
        } else {
            Rgb([255, 255, 255])
        }
    });
    let mut p = params(8, 2, 1);

    let buffer = DitherCodec.decode_and_dither(&png(&img), &mut p).unwrap();
    assert_eq!(buffer, vec![0xF0, 0xF0]);

    p.invert = true;
    let buffer = DitherCodec.decode_and_dither(&png(&img), &mut p).unwrap();
    assert_eq!(buffer, vec![0x0F, 0x0F]);
}

#[test]
fn test_dither_codec_red_plane() {
    let img = RgbImage::from_fn(8, 1, |x, _| {
        if x == 0 {
            Rgb([250, 10, 10])
        } else {
            Rgb([255, 255, 255])
        }
    });

    let mut p = params(8, 1, 2);
    let buffer = DitherCodec.decode_and_dither(&png(&img), &mut p).unwrap();
    assert_eq!(buffer, vec![0x00, 0x80]);
    assert!(p.has_red);

    // Without a red ink the pixel falls to the nearest of black and white
    let mut p = params(8, 1, 1);
    let buffer = DitherCodec.decode_and_dither(&png(&img), &mut p).unwrap();
    assert_eq!(buffer.len(), 1);
    assert!(!p.has_red);
}

#[test]
fn test_dither_codec_resizes_to_panel() {
    let img = RgbImage::from_pixel(32, 32, Rgb([0, 0, 0]));
    let mut p = params(16, 4, 1);
    p.dither = true;

    let buffer = DitherCodec.decode_and_dither(&png(&img), &mut p).unwrap();
    assert_eq!(buffer, vec![0xFF; 2 * 4]);
}

#[test]
fn test_dither_codec_rejects_garbage() {
    let mut p = params(8, 8, 1);
    assert!(DitherCodec.decode_and_dither(b"not an image", &mut p).is_err());

    let mut segment = params(0, 0, 1);
    assert!(DitherCodec.decode_and_dither(&[], &mut segment).is_err());
}
