#![cfg(feature = "tiff")]

use std::io::Cursor;

use tiff::encoder::{TiffEncoder, colortype};
use zenpicha::{
    Catalog, DecodeOptions, EncodeOptions, ErrorKind, PixelBuffer, PixelLayout, TiffCompression,
};

const SIDE: u32 = 160;

fn rgba_tiff() -> Vec<u8> {
    let mut pixels = Vec::with_capacity((SIDE * SIDE * 4) as usize);
    for y in 0..SIDE {
        for x in 0..SIDE {
            pixels.extend_from_slice(&[x as u8, y as u8, (x + y) as u8, 200]);
        }
    }
    let mut out = Cursor::new(Vec::new());
    TiffEncoder::new(&mut out)
        .unwrap()
        .write_image::<colortype::RGBA8>(SIDE, SIDE, &pixels)
        .unwrap();
    out.into_inner()
}

fn rgb_tiff() -> Vec<u8> {
    let mut pixels = Vec::with_capacity((SIDE * SIDE * 3) as usize);
    for y in 0..SIDE {
        for x in 0..SIDE {
            pixels.extend_from_slice(&[x as u8, y as u8, 7]);
        }
    }
    let mut out = Cursor::new(Vec::new());
    TiffEncoder::new(&mut out)
        .unwrap()
        .write_image::<colortype::RGB8>(SIDE, SIDE, &pixels)
        .unwrap();
    out.into_inner()
}

fn gray_tiff() -> Vec<u8> {
    let pixels: Vec<u8> = (0..64u8).collect();
    let mut out = Cursor::new(Vec::new());
    TiffEncoder::new(&mut out)
        .unwrap()
        .write_image::<colortype::Gray8>(8, 8, &pixels)
        .unwrap();
    out.into_inner()
}

fn available() -> bool {
    Catalog::global().has("image/tiff")
}

fn decoded() -> PixelBuffer {
    zenpicha::decode(&rgba_tiff(), &DecodeOptions::new()).unwrap()
}

#[test]
fn stat_reports_rgba() {
    if !available() {
        return;
    }
    let stat = zenpicha::stat(&rgba_tiff()).unwrap();
    assert_eq!((stat.width, stat.height), (SIDE, SIDE));
    assert_eq!(stat.pixel, PixelLayout::Rgba);
    assert_eq!(stat.mimetype, "image/tiff");
}

#[test]
fn rgb_tiff_reads_as_rgba() {
    if !available() {
        return;
    }
    let stat = zenpicha::stat(&rgb_tiff()).unwrap();
    assert_eq!((stat.width, stat.height), (SIDE, SIDE));
    assert_eq!(stat.pixel.as_str(), "rgba");

    let image = zenpicha::decode(&rgb_tiff(), &DecodeOptions::new()).unwrap();
    assert_eq!(image.layout(), PixelLayout::Rgba);
    assert_eq!(&image.row(5)[4..8], &[1, 5, 7, 255]);
}

#[test]
fn gray_tiff_reads_as_rgba() {
    if !available() {
        return;
    }
    let stat = zenpicha::stat(&gray_tiff()).unwrap();
    assert_eq!(stat.pixel.as_str(), "rgba");

    let image = zenpicha::decode(&gray_tiff(), &DecodeOptions::new()).unwrap();
    assert_eq!(&image.row(1)[..4], &[8, 8, 8, 255]);
}

fn ifd_offset(data: &[u8]) -> usize {
    // TiffEncoder writes little-endian files
    u32::from_le_bytes([data[4], data[5], data[6], data[7]]) as usize
}

#[tokio::test]
async fn broken_headers_are_classified() {
    if !available() {
        return;
    }
    let valid = rgb_tiff();
    let ifd = ifd_offset(&valid);

    let mut no_width = valid.clone();
    let count = usize::from(u16::from_le_bytes([valid[ifd], valid[ifd + 1]]));
    let entry = (0..count)
        .map(|i| ifd + 2 + i * 12)
        .find(|&at| u16::from_le_bytes([valid[at], valid[at + 1]]) == 256)
        .unwrap();
    no_width[entry..entry + 2].copy_from_slice(&65000u16.to_le_bytes());

    let cases = [
        (no_width, ErrorKind::Corrupt),
        (valid[..ifd + 14].to_vec(), ErrorKind::Truncated),
        (valid[..6].to_vec(), ErrorKind::Truncated),
    ];
    for (data, kind) in cases {
        assert_eq!(zenpicha::stat(&data).unwrap_err().kind(), kind);
        let err = zenpicha::decode(&data, &DecodeOptions::new()).unwrap_err();
        assert_eq!(err.kind(), kind);
        let err = zenpicha::stat_async(data.clone()).await.unwrap_err();
        assert_eq!(err.kind(), kind);
        let err = zenpicha::decode_async(data, DecodeOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), kind);
    }
}

#[tokio::test]
async fn async_decode_matches_sync() {
    if !available() {
        return;
    }
    let sync = decoded();
    let asynchronous = zenpicha::decode_async(rgba_tiff(), DecodeOptions::new())
        .await
        .unwrap();
    assert!(sync.equal_pixels(&asynchronous));
    assert_eq!(&sync.row(3)[..4], &[0, 3, 3, 200]);
}

#[test]
fn every_compression_round_trips() {
    if !available() {
        return;
    }
    let image = decoded();
    for compression in TiffCompression::ALL {
        let options = EncodeOptions::new().with_compression(compression.as_str());
        let encoded = zenpicha::encode(&image, "image/tiff", &options).unwrap();
        let back = zenpicha::decode(&encoded, &DecodeOptions::new()).unwrap();
        assert!(back.equal_pixels(&image), "{compression:?}");
    }
}

#[tokio::test]
async fn async_encode_round_trips() {
    if !available() {
        return;
    }
    let image = std::sync::Arc::new(decoded());
    for compression in ["none", "deflate"] {
        let options = EncodeOptions::new().with_compression(compression);
        let encoded = zenpicha::encode_async(image.clone(), "image/tiff", options)
            .await
            .unwrap();
        let back = zenpicha::decode_async(encoded, DecodeOptions::new())
            .await
            .unwrap();
        assert!(back.equal_pixels(&image));
    }
}

#[test]
fn unknown_compression_is_invalid_option() {
    if !available() {
        return;
    }
    let options = EncodeOptions::new().with_compression("zstd");
    let err = zenpicha::encode(&decoded(), "image/tiff", &options).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidOption);

    let options = EncodeOptions::new().with_quality(80);
    let err = zenpicha::encode(&decoded(), "image/tiff", &options).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidOption);
}

#[test]
fn gray_alpha_is_not_encodable() {
    if !available() {
        return;
    }
    let image = PixelBuffer::new(4, 4, PixelLayout::GrayAlpha).unwrap();
    let err = zenpicha::encode(&image, "image/tiff", &EncodeOptions::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedPixelLayout);
}
