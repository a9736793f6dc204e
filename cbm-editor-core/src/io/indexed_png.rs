//! Palette images as indexed PNG. Colors live in `PLTE`, alpha in `tRNS`.

use super::{ImageCodec, IoError};
use crate::{
    color::PaletteEntry,
    state::{Image, Palette},
};
use std::{
    io::{Read, Write},
    path::Path,
};

/// Imports and exports images as indexed PNG files.
#[derive(Copy, Clone, Default, Debug)]
pub struct PngCodec;

impl ImageCodec for PngCodec {
    fn load(&self, path: &Path) -> Result<Image, IoError> {
        let file = std::io::BufReader::new(std::fs::File::open(path)?);
        decode(file)
    }
    fn save(&self, image: &Image, path: &Path) -> Result<(), IoError> {
        let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
        encode(image, &mut file)?;
        file.flush()?;
        Ok(())
    }
    fn check(&self, image: &Image) -> Result<(), IoError> {
        encodable_palette(image).map(|_| ())
    }
}

fn encodable_palette(image: &Image) -> Result<&Palette, IoError> {
    let Some(palette) = image.palette().filter(|palette| !palette.is_empty()) else {
        return Err(IoError::Unsupported(
            "cannot encode an image without palette".into(),
        ));
    };
    if image.is_empty() {
        return Err(IoError::Unsupported("cannot encode an empty image".into()));
    }
    Ok(palette)
}

/// Decode an indexed PNG of any bit depth. Non-indexed color types are rejected - the editor
/// has no quantizer.
/// # Errors
/// Forwarded from the reader, or if the stream is not an indexed PNG.
pub fn decode<R: Read>(r: R) -> Result<Image, IoError> {
    let mut decoder = png::Decoder::new(r);
    decoder.set_transformations(png::Transformations::IDENTITY);
    let mut reader = decoder.read_info()?;

    let (color_type, bit_depth) = {
        let info = reader.info();
        (info.color_type, info.bit_depth)
    };
    if color_type != png::ColorType::Indexed {
        return Err(IoError::Unsupported(format!(
            "{color_type:?} PNG, only indexed color is supported"
        )));
    }

    let mut buffer = vec![0; reader.output_buffer_size()];
    let frame = reader.next_frame(&mut buffer)?;
    let info = reader.info();

    let rgb = info
        .palette
        .as_deref()
        .ok_or_else(|| IoError::Invalid("indexed PNG without PLTE".into()))?;
    let alpha = info.trns.as_deref().unwrap_or(&[]);
    let entries = rgb
        .chunks_exact(3)
        .enumerate()
        .map(|(index, rgb)| {
            let a = alpha.get(index).copied().unwrap_or(PaletteEntry::OPAQUE);
            PaletteEntry::from_rgba(rgb[0], rgb[1], rgb[2], a)
        })
        .collect();
    let palette = Palette::new(entries)?;

    let pixels = unpack_indices(
        &buffer[..frame.buffer_size()],
        frame.line_size,
        frame.width as usize,
        bit_depth as u8,
    )?;

    Ok(Image::new(frame.width, frame.height, Some(palette), pixels)?)
}

/// Expand sub-byte index rows (MSB first) into one byte per pixel.
fn unpack_indices(
    data: &[u8],
    line_size: usize,
    width: usize,
    bits: u8,
) -> Result<Vec<u8>, IoError> {
    if line_size == 0 {
        return Ok(Vec::new());
    }
    if bits == 8 {
        return Ok(data
            .chunks_exact(line_size)
            .flat_map(|line| &line[..width])
            .copied()
            .collect());
    }
    if !matches!(bits, 1 | 2 | 4) {
        return Err(IoError::Invalid(format!("{bits}-bit indexed PNG")));
    }
    let per_byte = usize::from(8 / bits);
    let mask = (1u8 << bits) - 1;
    let mut pixels = Vec::with_capacity(width * (data.len() / line_size));
    for line in data.chunks_exact(line_size) {
        pixels.extend((0..width).map(|x| {
            let byte = line[x / per_byte];
            // Leftmost pixel in the highest bits.
            #[allow(clippy::cast_possible_truncation)]
            let shift = 8 - bits * (1 + (x % per_byte) as u8);
            (byte >> shift) & mask
        }));
    }
    Ok(pixels)
}

/// Encode as an 8-bit indexed PNG. `tRNS` is written only when some entry is not opaque.
/// # Errors
/// If the image has no pixels or no palette, or forwarded from the writer.
pub fn encode<W: Write>(image: &Image, w: W) -> Result<(), IoError> {
    let palette = encodable_palette(image)?;

    let rgb: Vec<u8> = palette
        .iter()
        .flat_map(|entry| {
            let [r, g, b, _] = entry.to_rgba();
            [r, g, b]
        })
        .collect();
    let mut alpha: Vec<u8> = palette.iter().map(PaletteEntry::alpha).collect();
    // Missing trailing entries of tRNS are implicitly opaque.
    while alpha.last() == Some(&PaletteEntry::OPAQUE) {
        alpha.pop();
    }

    let mut encoder = png::Encoder::new(w, image.width(), image.height());
    encoder.set_color(png::ColorType::Indexed);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_palette(rgb);
    if !alpha.is_empty() {
        encoder.set_trns(alpha);
    }
    let mut writer = encoder.write_header()?;
    writer.write_image_data(image.pixels())?;
    writer.finish()?;
    Ok(())
}
