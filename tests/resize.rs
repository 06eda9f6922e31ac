use std::sync::mpsc;

use zenpicha::{Dispatcher, ErrorKind, PixelBuffer, PixelLayout, ResizeFilter, ResizeOptions};

fn gradient(width: u32, height: u32, layout: PixelLayout) -> PixelBuffer {
    let mut image = PixelBuffer::new(width, height, layout).unwrap();
    for y in 0..height {
        for (i, byte) in image.row_mut(y).iter_mut().enumerate() {
            *byte = (i as u32 * 3 + y * 7) as u8;
        }
    }
    image
}

#[test]
fn layouts_survive_resizing() {
    let dispatcher = Dispatcher::global();
    for layout in PixelLayout::ALL {
        let image = gradient(37, 23, layout);
        let resized = dispatcher
            .resize(&image, &ResizeOptions::new(12, 40))
            .unwrap();
        assert_eq!((resized.width(), resized.height()), (12, 40));
        assert_eq!(resized.layout(), layout);
    }
}

#[tokio::test]
async fn async_resize_matches_sync() {
    let dispatcher = Dispatcher::global();
    let image = gradient(64, 48, PixelLayout::Rgba);
    for filter in ResizeFilter::ALL {
        let options = ResizeOptions::new(20, 15).with_filter(filter);
        let sync = dispatcher.resize(&image, &options).unwrap();
        let asynchronous = dispatcher
            .resize_async(image.clone(), options)
            .await
            .unwrap();
        assert!(sync.equal_pixels(&asynchronous), "{filter}");
    }
}

#[test]
fn callback_receives_error() {
    let (tx, rx) = mpsc::channel();
    Dispatcher::global().resize_with(
        gradient(4, 4, PixelLayout::Gray),
        ResizeOptions::new(0, 4),
        move |result| tx.send(result.map(|_| ())).unwrap(),
    );
    let err = rx.recv().unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidResize);
}

#[test]
fn filter_names_parse() {
    for filter in ResizeFilter::ALL {
        assert_eq!(filter.to_string().parse::<ResizeFilter>().unwrap(), filter);
    }
    assert!("nearest".parse::<ResizeFilter>().is_err());
}

#[cfg(feature = "png")]
#[test]
fn resized_image_encodes() {
    use zenpicha::{DecodeOptions, EncodeOptions};

    let dispatcher = Dispatcher::global();
    let thumb = dispatcher
        .resize(
            &gradient(300, 200, PixelLayout::Rgb),
            &ResizeOptions::new(75, 50).with_filter_scale(1.0),
        )
        .unwrap();
    let png = dispatcher
        .encode(&thumb, "image/png", &EncodeOptions::new())
        .unwrap();
    let back = dispatcher.decode(&png, &DecodeOptions::new()).unwrap();
    assert!(back.equal_pixels(&thumb));
}
