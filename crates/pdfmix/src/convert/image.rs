//! Raster images to PDF, without any external engine.
//!
//! Every frame of an image becomes one page. Multi-frame GIFs and
//! multi-page TIFFs keep their frame order, with the first frame as page
//! one. Frames are flattened to 8-bit RGB and embedded losslessly as
//! Flate-compressed image XObjects, one image point per pixel.

use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, DynamicImage, ImageFormat, ImageReader, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::Path;
use tiff::ColorType;
use tiff::decoder::{Decoder as TiffDecoder, DecodingResult};
use tiff::tags::Tag;
use tracing::{debug, warn};

use crate::error::{PdfMixError, Result};
use crate::formats::FormatRegistry;
use crate::io::PdfWriter;
use crate::model::{ConversionResult, FileRef, FormatCategory};
use crate::progress::{ProgressEvent, ProgressSink};

const PHOTOMETRIC_WHITE_IS_ZERO: u16 = 0;
const PHOTOMETRIC_BLACK_IS_ZERO: u16 = 1;
const PHOTOMETRIC_PALETTE: u16 = 3;
const COMPRESSION_NONE: u16 = 1;
const COMPRESSION_PACKBITS: u16 = 32773;

/// Stage label of image conversion progress events.
pub const IMAGE_STAGE: &str = "Converting images";

/// Converts image files into PDF bytes.
#[derive(Debug, Clone, Default)]
pub struct ImageCodec {
    writer: PdfWriter,
}

impl ImageCodec {
    /// Create a codec.
    pub fn new() -> Self {
        Self::default()
    }

    /// Formats this codec accepts.
    pub fn registry() -> FormatRegistry {
        FormatRegistry::image_only()
    }

    /// Whether `path` looks like an image this codec can handle.
    pub fn accepts(path: &Path) -> bool {
        Self::registry().category_of(path) == Some(FormatCategory::Image)
    }

    /// Convert each file independently.
    ///
    /// A file that cannot be opened or decoded is recorded as failed and
    /// the rest of the batch carries on.
    pub fn convert(&self, files: &[FileRef], sink: &dyn ProgressSink) -> ConversionResult {
        let mut result = ConversionResult::new();
        let total = files.len();

        for (index, file) in files.iter().enumerate() {
            match self.convert_file(file.path()) {
                Ok(bytes) => result.push_success(file.id(), bytes),
                Err(e) => {
                    warn!(id = file.id(), file = %file.file_name(), error = %e, "image conversion failed");
                    result.push_failure(file);
                }
            }
            sink.emit(
                ProgressEvent::determinate(IMAGE_STAGE, index + 1, total)
                    .with_filename(file.file_name()),
            );
        }

        result
    }

    /// Convert one image file into a PDF with one page per frame.
    pub fn convert_file(&self, path: &Path) -> Result<Vec<u8>> {
        let frames = load_frames(path)?;
        debug!(file = %path.display(), frames = frames.len(), "decoded image");
        let mut doc = frames_to_document(&frames)?;
        self.writer.to_bytes(&mut doc)
    }
}

/// Decode every frame of the image at `path` as RGB.
pub fn load_frames(path: &Path) -> Result<Vec<RgbImage>> {
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    let frames = match reader.format() {
        Some(ImageFormat::Gif) => gif_frames(path)?,
        Some(ImageFormat::Tiff) => tiff_frames(path)?,
        _ => vec![reader.decode()?.to_rgb8()],
    };

    if frames.is_empty() {
        return Err(PdfMixError::conversion(path, "image has no frames"));
    }
    Ok(frames)
}

fn gif_frames(path: &Path) -> Result<Vec<RgbImage>> {
    let decoder = GifDecoder::new(BufReader::new(File::open(path)?))?;
    let frames = decoder.into_frames().collect_frames()?;
    Ok(frames
        .into_iter()
        .map(|frame| DynamicImage::ImageRgba8(frame.into_buffer()).to_rgb8())
        .collect())
}

/// Decode every page of a TIFF.
///
/// A page that cannot be decoded fails the whole file, except for a
/// single-page file, which gets a second chance through `image`.
fn tiff_frames(path: &Path) -> Result<Vec<RgbImage>> {
    let data = std::fs::read(path)?;
    let mut decoder = TiffDecoder::new(Cursor::new(data.as_slice()))?;
    let mut frames = Vec::new();

    loop {
        let frame = match tiff_page(path, &mut decoder, &data) {
            Ok(frame) => frame,
            Err(e) if frames.is_empty() && !decoder.more_images() => {
                debug!(file = %path.display(), error = %e, "retrying single-page TIFF with image");
                let image = image::load_from_memory_with_format(&data, ImageFormat::Tiff)?;
                return Ok(vec![image.to_rgb8()]);
            }
            Err(e) => return Err(e),
        };
        frames.push(frame);

        if !decoder.more_images() {
            break;
        }
        decoder.next_image()?;
    }

    Ok(frames)
}

/// Decode the decoder's current page.
fn tiff_page(
    path: &Path,
    decoder: &mut TiffDecoder<Cursor<&[u8]>>,
    data: &[u8],
) -> Result<RgbImage> {
    let photometric = decoder
        .find_tag_unsigned::<u16>(Tag::PhotometricInterpretation)?
        .unwrap_or(PHOTOMETRIC_BLACK_IS_ZERO);
    let samples = decoder
        .find_tag_unsigned::<u16>(Tag::SamplesPerPixel)?
        .unwrap_or(1);
    let bits = decoder
        .find_tag_unsigned_vec::<u8>(Tag::BitsPerSample)?
        .and_then(|bits| bits.first().copied())
        .unwrap_or(1);

    let packed = samples == 1
        && match photometric {
            PHOTOMETRIC_WHITE_IS_ZERO | PHOTOMETRIC_BLACK_IS_ZERO => bits < 8,
            PHOTOMETRIC_PALETTE => true,
            _ => false,
        };
    if packed {
        return packed_page(path, decoder, data, photometric, bits);
    }

    let (width, height) = decoder.dimensions()?;
    let color = decoder.colortype()?;
    let pixels = decoder.read_image()?;
    tiff_page_to_rgb(path, width, height, color, pixels)
}

/// Decode a bilevel, low-depth gray or palette page from its strips.
///
/// Only uncompressed and PackBits strips are read here; samples are
/// packed most significant bit first, and every row starts on a byte.
fn packed_page(
    path: &Path,
    decoder: &mut TiffDecoder<Cursor<&[u8]>>,
    data: &[u8],
    photometric: u16,
    bits: u8,
) -> Result<RgbImage> {
    if !matches!(bits, 1 | 2 | 4 | 8) {
        return Err(PdfMixError::conversion(
            path,
            format!("unsupported {bits}-bit TIFF page"),
        ));
    }
    if decoder.find_tag(Tag::TileWidth)?.is_some() {
        return Err(PdfMixError::conversion(
            path,
            "tiled low-depth TIFF pages are not supported",
        ));
    }

    let (width, height) = decoder.dimensions()?;
    let compression = decoder.find_tag_unsigned::<u16>(Tag::Compression)?.unwrap_or(1);
    let reversed = decoder.find_tag_unsigned::<u16>(Tag::FillOrder)? == Some(2);
    let offsets = decoder.get_tag_u64_vec(Tag::StripOffsets)?;
    let counts = decoder.get_tag_u64_vec(Tag::StripByteCounts)?;
    let rows_per_strip = decoder
        .find_tag_unsigned::<u32>(Tag::RowsPerStrip)?
        .unwrap_or(height)
        .clamp(1, height);

    let width = width as usize;
    let height = height as usize;
    let row_bytes = (width * usize::from(bits)).div_ceil(8);

    let mut packed = Vec::with_capacity(row_bytes * height);
    for (strip, (&offset, &count)) in offsets.iter().zip(&counts).enumerate() {
        let first_row = (strip * rows_per_strip as usize).min(height);
        let rows = (height - first_row).min(rows_per_strip as usize);
        if rows == 0 {
            break;
        }
        let raw = usize::try_from(offset)
            .ok()
            .zip(usize::try_from(count).ok())
            .and_then(|(start, len)| data.get(start..start.checked_add(len)?))
            .ok_or_else(|| PdfMixError::conversion(path, "TIFF strip lies outside the file"))?;
        let strip_bytes = match compression {
            COMPRESSION_NONE => raw.to_vec(),
            COMPRESSION_PACKBITS => unpack_bits(raw),
            other => {
                return Err(PdfMixError::conversion(
                    path,
                    format!("unsupported compression {other} for a {bits}-bit TIFF page"),
                ));
            }
        };
        let needed = rows * row_bytes;
        let strip_rows = strip_bytes
            .get(..needed)
            .ok_or_else(|| PdfMixError::conversion(path, "TIFF strip is truncated"))?;
        packed.extend_from_slice(strip_rows);
    }
    if packed.len() < row_bytes * height {
        return Err(PdfMixError::conversion(path, "TIFF page is missing strips"));
    }
    if reversed {
        packed.iter_mut().for_each(|byte| *byte = byte.reverse_bits());
    }

    let max = (1u16 << bits) - 1;
    let palette = if photometric == PHOTOMETRIC_PALETTE {
        let map = decoder.get_tag_u16_vec(Tag::ColorMap)?;
        if map.len() != 3 * (usize::from(max) + 1) {
            return Err(PdfMixError::conversion(path, "TIFF color map has the wrong size"));
        }
        Some(map)
    } else {
        None
    };

    let mut rgb = Vec::with_capacity(width * height * 3);
    for row in packed.chunks_exact(row_bytes).take(height) {
        for x in 0..width {
            let value = sample_at(row, x, bits);
            let pixel = match &palette {
                Some(map) => {
                    let entries = map.len() / 3;
                    let index = usize::from(value);
                    [map[index], map[entries + index], map[2 * entries + index]]
                        .map(|channel| (channel >> 8) as u8)
                }
                None => {
                    let level = (u16::from(value) * 255 / max) as u8;
                    let level = if photometric == PHOTOMETRIC_WHITE_IS_ZERO {
                        255 - level
                    } else {
                        level
                    };
                    [level; 3]
                }
            };
            rgb.extend_from_slice(&pixel);
        }
    }

    RgbImage::from_raw(width as u32, height as u32, rgb)
        .ok_or_else(|| PdfMixError::conversion(path, "TIFF page has the wrong number of samples"))
}

/// Sample `x` of a row packed `bits` to a sample, high bits first.
fn sample_at(row: &[u8], x: usize, bits: u8) -> u8 {
    let bits = usize::from(bits);
    let offset = x * bits;
    let byte = row[offset / 8];
    let shift = 8 - bits - offset % 8;
    let mask = ((1u16 << bits) - 1) as u8;
    (byte >> shift) & mask
}

/// Expand PackBits run-length data.
fn unpack_bits(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len() * 2);
    let mut i = 0;
    while i < input.len() {
        let header = input[i] as i8;
        i += 1;
        match header {
            0..=127 => {
                let end = (i + header as usize + 1).min(input.len());
                out.extend_from_slice(&input[i..end]);
                i = end;
            }
            -128 => {}
            _ => {
                if let Some(&byte) = input.get(i) {
                    out.extend(std::iter::repeat_n(byte, (1 - isize::from(header)) as usize));
                    i += 1;
                }
            }
        }
    }
    out
}

fn tiff_page_to_rgb(
    path: &Path,
    width: u32,
    height: u32,
    color: ColorType,
    pixels: DecodingResult,
) -> Result<RgbImage> {
    let samples: Vec<u8> = match pixels {
        DecodingResult::U8(data) => data,
        DecodingResult::U16(data) => data.into_iter().map(|v| (v >> 8) as u8).collect(),
        _ => {
            return Err(PdfMixError::conversion(
                path,
                "unsupported TIFF sample format",
            ));
        }
    };

    let rgb: Vec<u8> = match color {
        ColorType::RGB(8 | 16) => samples,
        ColorType::RGBA(8 | 16) => samples
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect(),
        ColorType::Gray(8 | 16) => samples.iter().flat_map(|&v| [v, v, v]).collect(),
        ColorType::GrayA(8 | 16) => samples
            .chunks_exact(2)
            .flat_map(|px| [px[0], px[0], px[0]])
            .collect(),
        ColorType::CMYK(8 | 16) => samples
            .chunks_exact(4)
            .flat_map(|px| {
                let k = 255 - u16::from(px[3]);
                let channel = |c: u8| ((255 - u16::from(c)) * k / 255) as u8;
                [channel(px[0]), channel(px[1]), channel(px[2])]
            })
            .collect(),
        other => {
            return Err(PdfMixError::conversion(
                path,
                format!("unsupported TIFF color type {other:?}"),
            ));
        }
    };

    RgbImage::from_raw(width, height, rgb)
        .ok_or_else(|| PdfMixError::conversion(path, "TIFF page has the wrong number of samples"))
}

/// Build a PDF document with one full-page image per frame.
pub fn frames_to_document(frames: &[RgbImage]) -> Result<Document> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::with_capacity(frames.len());

    for frame in frames {
        let (width, height) = frame.dimensions();
        let image = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(width),
                "Height" => i64::from(height),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            frame.as_raw().clone(),
        );
        let image_id = doc.add_object(image);

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        i64::from(width).into(),
                        0.into(),
                        0.into(),
                        i64::from(height).into(),
                        0.into(),
                        0.into(),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), i64::from(width).into(), i64::from(height).into()],
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => image_id },
            },
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{NoProgress, ProgressLog};
    use image::codecs::gif::GifEncoder;
    use image::{Frame, Rgb, Rgba, RgbaImage};
    use tempfile::TempDir;

    fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> std::path::PathBuf {
        let path = dir.join(name);
        RgbImage::from_pixel(width, height, Rgb([200, 30, 30]))
            .save(&path)
            .unwrap();
        path
    }

    fn write_gif(dir: &Path, name: &str, frames: usize) -> std::path::PathBuf {
        let path = dir.join(name);
        let file = File::create(&path).unwrap();
        let mut encoder = GifEncoder::new(file);
        let frames = (0..frames).map(|i| {
            let shade = (i * 60) as u8;
            Frame::new(RgbaImage::from_pixel(8, 6, Rgba([shade, 0, 255 - shade, 255])))
        });
        encoder.encode_frames(frames).unwrap();
        path
    }

    fn write_multipage_tiff(dir: &Path, name: &str, pages: usize) -> std::path::PathBuf {
        use tiff::encoder::{TiffEncoder, colortype};

        let path = dir.join(name);
        let file = File::create(&path).unwrap();
        let mut encoder = TiffEncoder::new(file).unwrap();
        for page in 0..pages {
            let data = vec![(page * 40) as u8; 4 * 3 * 3];
            encoder
                .write_image::<colortype::RGB8>(4, 3, &data)
                .unwrap();
        }
        path
    }

    fn page_count(bytes: &[u8]) -> usize {
        Document::load_mem(bytes).unwrap().get_pages().len()
    }

    #[test]
    fn test_png_becomes_single_page() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_png(temp_dir.path(), "red.png", 20, 10);

        let bytes = ImageCodec::new().convert_file(&path).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);

        let page_id = *doc.get_pages().values().next().unwrap();
        let media_box = doc
            .get_dictionary(page_id)
            .unwrap()
            .get(b"MediaBox")
            .unwrap()
            .as_array()
            .unwrap()
            .clone();
        assert_eq!(media_box[2], Object::Integer(20));
        assert_eq!(media_box[3], Object::Integer(10));
    }

    #[test]
    fn test_gif_frames_become_pages_deterministically() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_gif(temp_dir.path(), "anim.gif", 3);
        let codec = ImageCodec::new();

        let first = codec.convert_file(&path).unwrap();
        let second = codec.convert_file(&path).unwrap();
        assert_eq!(page_count(&first), 3);
        assert_eq!(page_count(&second), 3);
    }

    #[test]
    fn test_multipage_tiff() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_multipage_tiff(temp_dir.path(), "scan.tiff", 2);

        let frames = load_frames(&path).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].get_pixel(0, 0), &Rgb([40, 40, 40]));
    }

    /// One page of a hand-assembled little-endian TIFF.
    struct RawPage {
        width: u16,
        height: u16,
        bits: u16,
        photometric: u16,
        compression: u16,
        strip: Vec<u8>,
        color_map: Vec<u16>,
    }

    impl RawPage {
        fn bilevel(rows: &[u8]) -> Self {
            Self {
                width: 8,
                height: rows.len() as u16,
                bits: 1,
                photometric: PHOTOMETRIC_BLACK_IS_ZERO,
                compression: COMPRESSION_NONE,
                strip: rows.to_vec(),
                color_map: Vec::new(),
            }
        }
    }

    /// Lay pages out as strip, color map, then directory, page by page.
    fn write_raw_tiff(dir: &Path, name: &str, pages: &[RawPage]) -> std::path::PathBuf {
        fn entry(out: &mut Vec<u8>, tag: u16, kind: u16, count: u32, value: u32) {
            out.extend_from_slice(&tag.to_le_bytes());
            out.extend_from_slice(&kind.to_le_bytes());
            out.extend_from_slice(&count.to_le_bytes());
            out.extend_from_slice(&value.to_le_bytes());
        }
        const SHORT: u16 = 3;
        const LONG: u16 = 4;

        let mut out = b"II".to_vec();
        out.extend_from_slice(&42u16.to_le_bytes());
        let mut next_pointer = out.len();
        out.extend_from_slice(&0u32.to_le_bytes());

        for page in pages {
            let strip_offset = out.len() as u32;
            out.extend_from_slice(&page.strip);
            if out.len() % 2 == 1 {
                out.push(0);
            }
            let map_offset = out.len() as u32;
            for value in &page.color_map {
                out.extend_from_slice(&value.to_le_bytes());
            }

            let ifd_offset = out.len() as u32;
            out[next_pointer..next_pointer + 4].copy_from_slice(&ifd_offset.to_le_bytes());

            let mut entries = Vec::new();
            entry(&mut entries, 256, SHORT, 1, u32::from(page.width));
            entry(&mut entries, 257, SHORT, 1, u32::from(page.height));
            entry(&mut entries, 258, SHORT, 1, u32::from(page.bits));
            entry(&mut entries, 259, SHORT, 1, u32::from(page.compression));
            entry(&mut entries, 262, SHORT, 1, u32::from(page.photometric));
            entry(&mut entries, 273, LONG, 1, strip_offset);
            entry(&mut entries, 277, SHORT, 1, 1);
            entry(&mut entries, 278, SHORT, 1, u32::from(page.height));
            entry(&mut entries, 279, LONG, 1, page.strip.len() as u32);
            if !page.color_map.is_empty() {
                entry(&mut entries, 320, SHORT, page.color_map.len() as u32, map_offset);
            }

            out.extend_from_slice(&((entries.len() / 12) as u16).to_le_bytes());
            out.extend_from_slice(&entries);
            next_pointer = out.len();
            out.extend_from_slice(&0u32.to_le_bytes());
        }

        let path = dir.join(name);
        std::fs::write(&path, out).unwrap();
        path
    }

    #[test]
    fn test_multipage_bilevel_tiff_keeps_every_page() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_raw_tiff(
            temp_dir.path(),
            "fax.tif",
            &[
                RawPage::bilevel(&[0b1010_0000, 0xFF]),
                RawPage::bilevel(&[0x00, 0x0F]),
                RawPage {
                    photometric: PHOTOMETRIC_WHITE_IS_ZERO,
                    ..RawPage::bilevel(&[0b1000_0000, 0x00])
                },
            ],
        );

        let frames = load_frames(&path).unwrap();
        assert_eq!(frames.len(), 3);
        assert!(frames.iter().all(|frame| frame.dimensions() == (8, 2)));

        assert_eq!(frames[0].get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(frames[0].get_pixel(1, 0), &Rgb([0, 0, 0]));
        assert_eq!(frames[0].get_pixel(7, 1), &Rgb([255, 255, 255]));
        assert_eq!(frames[1].get_pixel(3, 1), &Rgb([0, 0, 0]));
        assert_eq!(frames[1].get_pixel(4, 1), &Rgb([255, 255, 255]));
        // White-is-zero: a set bit is black.
        assert_eq!(frames[2].get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(frames[2].get_pixel(1, 0), &Rgb([255, 255, 255]));

        let bytes = ImageCodec::new().convert_file(&path).unwrap();
        assert_eq!(page_count(&bytes), 3);
    }

    #[test]
    fn test_odd_width_rows_are_byte_aligned() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_raw_tiff(
            temp_dir.path(),
            "narrow.tif",
            &[RawPage {
                width: 3,
                ..RawPage::bilevel(&[0b0100_0000, 0b1010_0000])
            }],
        );

        let frames = load_frames(&path).unwrap();
        assert_eq!(frames[0].dimensions(), (3, 2));
        let row = |y| (0..3).map(|x| frames[0].get_pixel(x, y)[0]).collect::<Vec<_>>();
        assert_eq!(row(0), vec![0, 255, 0]);
        assert_eq!(row(1), vec![255, 0, 255]);
    }

    #[test]
    fn test_palette_and_packbits_pages() {
        let temp_dir = TempDir::new().unwrap();
        // Four 2-bit entries: black, red, green, blue.
        let color_map = vec![
            0, 0xFFFF, 0, 0, // red
            0, 0, 0xFFFF, 0, // green
            0, 0, 0, 0xFFFF, // blue
        ];
        let path = write_raw_tiff(
            temp_dir.path(),
            "palette.tif",
            &[
                RawPage {
                    width: 4,
                    height: 1,
                    bits: 2,
                    photometric: PHOTOMETRIC_PALETTE,
                    compression: COMPRESSION_NONE,
                    strip: vec![0b00_01_10_11],
                    color_map,
                },
                RawPage {
                    height: 3,
                    compression: COMPRESSION_PACKBITS,
                    // Two repeats of 0xF0, then one literal 0x0F.
                    strip: vec![0xFF, 0xF0, 0x00, 0x0F],
                    ..RawPage::bilevel(&[])
                },
            ],
        );

        let frames = load_frames(&path).unwrap();
        assert_eq!(frames.len(), 2);
        let colors: Vec<_> = (0..4).map(|x| *frames[0].get_pixel(x, 0)).collect();
        assert_eq!(
            colors,
            vec![Rgb([0, 0, 0]), Rgb([255, 0, 0]), Rgb([0, 255, 0]), Rgb([0, 0, 255])]
        );
        assert_eq!(frames[1].dimensions(), (8, 3));
        assert_eq!(frames[1].get_pixel(0, 1), &Rgb([255, 255, 255]));
        assert_eq!(frames[1].get_pixel(0, 2), &Rgb([0, 0, 0]));
        assert_eq!(frames[1].get_pixel(7, 2), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_undecodable_page_fails_the_whole_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_raw_tiff(
            temp_dir.path(),
            "g4.tif",
            &[
                RawPage::bilevel(&[0xFF, 0x00]),
                RawPage {
                    compression: 4,
                    ..RawPage::bilevel(&[0x12, 0x34])
                },
            ],
        );

        assert!(load_frames(&path).is_err());
        let files = vec![FileRef::new(1, &path)];
        let result = ImageCodec::new().convert(&files, &NoProgress);
        assert!(result.successful.is_empty());
        assert_eq!(result.failed.len(), 1);
    }

    #[test]
    fn test_unpack_bits() {
        assert_eq!(
            unpack_bits(&[0xFE, 0xAA, 0x02, 1, 2, 3, 0x80]),
            vec![0xAA, 0xAA, 0xAA, 1, 2, 3]
        );
    }

    #[test]
    fn test_uppercase_extension_is_accepted() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_png(temp_dir.path(), "PHOTO.PNG", 4, 4);
        assert!(ImageCodec::accepts(&path));
        assert!(ImageCodec::new().convert_file(&path).is_ok());
    }

    #[test]
    fn test_batch_records_failures_and_continues() {
        let temp_dir = TempDir::new().unwrap();
        let good = write_png(temp_dir.path(), "good.png", 4, 4);
        let bad = temp_dir.path().join("bad.png");
        std::fs::write(&bad, b"not an image").unwrap();

        let files = vec![
            FileRef::new(1, &bad),
            FileRef::new(2, &good),
            FileRef::new(3, temp_dir.path().join("missing.jpg")),
        ];
        let log = ProgressLog::new();
        let result = ImageCodec::new().convert(&files, &log);

        assert_eq!(result.successful.len(), 1);
        assert_eq!(result.successful[0].0, 2);
        let failed: Vec<u64> = result.failed.iter().map(|(id, _)| *id).collect();
        assert_eq!(failed, vec![1, 3]);
        assert_eq!(log.stage(IMAGE_STAGE).len(), 3);
    }

    #[test]
    fn test_cmyk_conversion() {
        let rgb = tiff_page_to_rgb(
            Path::new("x.tif"),
            1,
            1,
            ColorType::CMYK(8),
            DecodingResult::U8(vec![0, 255, 255, 0]),
        )
        .unwrap();
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([255, 0, 0]));
    }

    #[test]
    fn test_empty_frame_list_yields_empty_document() {
        let doc = frames_to_document(&[]).unwrap();
        assert!(doc.get_pages().is_empty());
        let result = ImageCodec::new().convert(&[], &NoProgress);
        assert!(result.is_empty());
    }
}
