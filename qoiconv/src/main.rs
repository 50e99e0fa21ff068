use std::fs::{self, File};
use std::hint::black_box;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{bail, ensure, Context, Result};
use bytemuck::cast_slice;
use qoi_codec::{decode, encode, read_file, Channels, ColorSpace, Encoder, Header};
use structopt::StructOpt;
use walkdir::{DirEntry, WalkDir};

fn timeit<T>(func: impl Fn() -> T) -> (T, Duration) {
    let t0 = Instant::now();
    let out = func();
    let t1 = Instant::now();
    (black_box(out), t1 - t0)
}

fn median(mut v: Vec<f64>) -> f64 {
    v.sort_by(f64::total_cmp);
    v[v.len() / 2]
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().unwrap_or_default().to_string_lossy().eq_ignore_ascii_case(ext)
}

fn find_pngs(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let is_png_file = |path: &PathBuf| path.is_file() && has_extension(path, "png");

    let mut out = vec![];
    for path in paths {
        if is_png_file(path) {
            out.push(path.clone());
        } else if path.is_dir() {
            out.extend(
                WalkDir::new(path)
                    .follow_links(true)
                    .into_iter()
                    .filter_map(Result::ok)
                    .map(DirEntry::into_path)
                    .filter(is_png_file),
            );
        } else {
            bail!("path doesn't exist: {}", path.to_string_lossy());
        }
    }
    out.sort_unstable();
    Ok(out)
}

fn grayscale_to_rgb(buf: &[u8]) -> Vec<u8> {
    buf.iter().flat_map(|&px| [px; 3]).collect()
}

fn grayscale_alpha_to_rgba(buf: &[u8]) -> Vec<u8> {
    cast_slice::<_, [u8; 2]>(buf).iter().flat_map(|&[v, a]| [v, v, v, a]).collect()
}

struct Image {
    header: Header,
    data: Vec<u8>,
}

impl Image {
    fn read_png(filename: &Path) -> Result<Self> {
        let mut decoder = png::Decoder::new(File::open(filename)?);
        decoder.set_transformations(png::Transformations::normalize_to_color8());
        let mut reader = decoder.read_info()?;
        let mut whole_buf = vec![0; reader.output_buffer_size()];
        let info = reader.next_frame(&mut whole_buf)?;
        let buf = &whole_buf[..info.buffer_size()];
        ensure!(info.bit_depth == png::BitDepth::Eight, "invalid bit depth: {:?}", info.bit_depth);
        let (channels, data) = match info.color_type {
            // png crate doesn't expand grayscale to rgb
            png::ColorType::Grayscale => (Channels::Rgb, grayscale_to_rgb(buf)),
            png::ColorType::GrayscaleAlpha => (Channels::Rgba, grayscale_alpha_to_rgba(buf)),
            png::ColorType::Rgb => (Channels::Rgb, buf.to_vec()),
            png::ColorType::Rgba => (Channels::Rgba, buf.to_vec()),
            color_type => bail!("unsupported color type: {color_type:?}"),
        };
        let header = Header::try_new(info.width, info.height, channels, ColorSpace::Srgb)?;
        Ok(Self { header, data })
    }

    fn write_png(&self, filename: &Path) -> Result<()> {
        let writer = BufWriter::new(File::create(filename)?);
        let mut encoder = png::Encoder::new(writer, self.header.width, self.header.height);
        encoder.set_color(match self.header.channels {
            Channels::Rgb => png::ColorType::Rgb,
            Channels::Rgba => png::ColorType::Rgba,
        });
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&self.data)?;
        writer.finish()?;
        Ok(())
    }

    const fn n_pixels(&self) -> usize {
        self.header.n_pixels()
    }

    const fn n_bytes(&self) -> usize {
        self.header.n_bytes()
    }
}

fn output_path(input: &Path, output: Option<PathBuf>, ext: &str) -> PathBuf {
    output.unwrap_or_else(|| input.with_extension(ext))
}

fn cmd_encode(input: &Path, output: Option<PathBuf>, linear: bool) -> Result<()> {
    let img = Image::read_png(input)
        .with_context(|| format!("error reading PNG file: {}", input.display()))?;
    let mut encoder = Encoder::new(&img.data, img.header)?;
    if linear {
        encoder = encoder.with_colorspace(ColorSpace::Linear);
    }
    let encoded = encoder.encode_to_vec()?;
    let output = output_path(input, output, "qoi");
    fs::write(&output, &encoded)?;
    let header = encoder.header();
    println!(
        "{} -> {} ({}x{}:{}, colorspace={}, {} -> {} bytes)",
        input.display(),
        output.display(),
        header.width,
        header.height,
        header.channels,
        header.colorspace,
        img.n_bytes(),
        encoded.len()
    );
    Ok(())
}

fn cmd_decode(input: &Path, output: Option<PathBuf>, channels: u8) -> Result<()> {
    let (header, data) = read_file(input, channels)
        .with_context(|| format!("error reading QOI file: {}", input.display()))?;
    let n_channels = match channels {
        0 => header.channels,
        channels => Channels::try_from(channels)?,
    };
    let img = Image { header: header.with_channels(n_channels), data };
    let output = output_path(input, output, "png");
    img.write_png(&output)?;
    println!(
        "{} -> {} ({}x{}:{}, colorspace={})",
        input.display(),
        output.display(),
        header.width,
        header.height,
        n_channels,
        header.colorspace
    );
    Ok(())
}

struct Stats {
    n_pixels: usize,
    n_raw: usize,
    n_png: u64,
    n_qoi: usize,
    decode_sec: f64,
    encode_sec: f64,
}

impl Stats {
    fn report(&self, name: &str) {
        let mpixels = self.n_pixels as f64 / 1e6;
        println!(
            "{:<40}{:>10.2}{:>10.2}{:>10.1}{:>10.1}{:>9.1}%{:>9.1}%",
            name,
            self.decode_sec * 1e3,
            self.encode_sec * 1e3,
            mpixels / self.decode_sec,
            mpixels / self.encode_sec,
            100. * self.n_png as f64 / self.n_raw as f64,
            100. * self.n_qoi as f64 / self.n_raw as f64,
        );
    }
}

fn stats_png(filename: &Path, runs: usize) -> Result<Stats> {
    let img = Image::read_png(filename)
        .with_context(|| format!("error reading PNG file: {}", filename.display()))?;
    let encoded = encode(&img.data, &img.header)?;
    let (header, decoded) = decode(&encoded, 0)?;
    ensure!(header == img.header, "{}: header doesn't roundtrip", filename.display());
    ensure!(decoded == img.data, "{}: decoded data doesn't roundtrip", filename.display());

    let runs = runs.max(1);
    let encode_sec = (0..runs)
        .map(|_| timeit(|| encode(&img.data, &img.header)).1.as_secs_f64())
        .collect();
    let decode_sec = (0..runs).map(|_| timeit(|| decode(&encoded, 0)).1.as_secs_f64()).collect();

    Ok(Stats {
        n_pixels: img.n_pixels(),
        n_raw: img.n_bytes(),
        n_png: fs::metadata(filename)?.len(),
        n_qoi: encoded.len(),
        decode_sec: median(decode_sec),
        encode_sec: median(encode_sec),
    })
}

fn cmd_stats(paths: &[PathBuf], runs: usize) -> Result<()> {
    let files = find_pngs(paths)?;
    ensure!(!files.is_empty(), "no PNG files found in given paths");
    println!(
        "{:<40}{:>10}{:>10}{:>10}{:>10}{:>10}{:>10}",
        "", "dec:ms", "enc:ms", "dec:Mp/s", "enc:Mp/s", "png", "qoi"
    );
    let mut total =
        Stats { n_pixels: 0, n_raw: 0, n_png: 0, n_qoi: 0, decode_sec: 0., encode_sec: 0. };
    let mut n_ok = 0;
    for file in &files {
        match stats_png(file, runs) {
            Ok(stats) => {
                stats.report(&file.to_string_lossy());
                // sum of medians is not the median of sums, good enough for totals
                total.n_pixels += stats.n_pixels;
                total.n_raw += stats.n_raw;
                total.n_png += stats.n_png;
                total.n_qoi += stats.n_qoi;
                total.decode_sec += stats.decode_sec;
                total.encode_sec += stats.encode_sec;
                n_ok += 1;
            }
            Err(err) => eprintln!("{err:?}"),
        }
    }
    if n_ok > 1 {
        println!("---");
        total.report(&format!("total ({n_ok} images)"));
    }
    Ok(())
}

#[derive(Debug, StructOpt)]
#[structopt(about = "Convert between PNG and QOI images")]
enum Args {
    /// Encode a PNG image into QOI.
    Encode {
        #[structopt(parse(from_os_str))]
        input: PathBuf,
        /// Output file (defaults to the input path with a .qoi extension).
        #[structopt(short, long, parse(from_os_str))]
        output: Option<PathBuf>,
        /// Mark all channels as linear in the QOI header.
        #[structopt(long)]
        linear: bool,
    },
    /// Decode a QOI image into PNG.
    Decode {
        #[structopt(parse(from_os_str))]
        input: PathBuf,
        /// Output file (defaults to the input path with a .png extension).
        #[structopt(short, long, parse(from_os_str))]
        output: Option<PathBuf>,
        /// Number of channels in the output: 3, 4, or 0 to keep the stored layout.
        #[structopt(short, long, default_value = "0")]
        channels: u8,
    },
    /// Compression ratio and timings for PNG images (files or directories).
    Stats {
        #[structopt(parse(from_os_str))]
        paths: Vec<PathBuf>,
        /// Number of timed runs per image.
        #[structopt(short, long, default_value = "5")]
        runs: usize,
    },
}

fn main() -> Result<()> {
    match <Args as StructOpt>::from_args() {
        Args::Encode { input, output, linear } => {
            ensure!(has_extension(&input, "png"), "expected a PNG file: {}", input.display());
            cmd_encode(&input, output, linear)
        }
        Args::Decode { input, output, channels } => cmd_decode(&input, output, channels),
        Args::Stats { paths, runs } => {
            ensure!(!paths.is_empty(), "no input paths given");
            cmd_stats(&paths, runs)
        }
    }
}
