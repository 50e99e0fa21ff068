#![no_main]
use libfuzzer_sys::fuzz_target;

use qoi_codec::{decode, encode, encode_max_len, Channels, ColorSpace, Header};

fuzz_target!(|input: (bool, u8, &[u8])| {
    let (is_4, w_frac, data) = input;
    let channels = if is_4 { Channels::Rgba } else { Channels::Rgb };
    let n_channels = usize::from(channels.as_u8());
    let n_pixels = data.len() / n_channels;
    let (w, h) = if n_pixels == 0 {
        (0, 0)
    } else {
        let w = ((n_pixels * (1 + w_frac as usize)) / 256).max(1);
        (w, n_pixels / w)
    };
    let header = Header { width: w as u32, height: h as u32, channels, colorspace: ColorSpace::Srgb };
    let pixels = &data[..(w * h * n_channels)];
    let out = encode(pixels, &header);
    if w * h != 0 {
        let out = out.unwrap();
        assert!(out.len() <= encode_max_len(w as u32, h as u32, channels));
        assert_eq!(decode(&out, 0).unwrap().1, pixels);
    } else {
        assert!(out.is_err());
    }
});
