use std::collections::HashMap;
use std::io::Cursor;

use image::ImageDecoder;
use image::codecs::jpeg::JpegDecoder;
use pdf_writer::{Filter, Pdf, Ref};

#[derive(Debug, thiserror::Error)]
pub(crate) enum ImageError {
    #[error("no image data")]
    Empty,
    #[error("unsupported image format {0:?}")]
    Unsupported(image::ImageFormat),
    #[error(transparent)]
    Decode(#[from] image::ImageError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum JpegColor {
    Gray,
    Rgb,
    /// Adobe-written CMYK stores inverted samples.
    Cmyk { inverted: bool },
}

enum Encoding {
    /// DCT data passed through unchanged.
    Jpeg { data: Vec<u8>, color: JpegColor },
    /// zlib-compressed RGB samples with an optional zlib-compressed alpha mask.
    Flate { rgb: Vec<u8>, alpha: Option<Vec<u8>> },
}

struct PreparedImage {
    name: String,
    pixel_width: u32,
    pixel_height: u32,
    encoding: Encoding,
}

/// A registered image as the layout pass sees it.
#[derive(Clone, Debug)]
pub(crate) struct ImageInfo {
    pub(crate) name: String,
    pub(crate) pixel_width: u32,
    pub(crate) pixel_height: u32,
}

impl ImageInfo {
    /// Height / width, or `None` when the intrinsic size is unknown.
    pub(crate) fn aspect_ratio(&self) -> Option<f32> {
        (self.pixel_width > 0 && self.pixel_height > 0)
            .then(|| self.pixel_height as f32 / self.pixel_width as f32)
    }
}

/// Images decoded during layout and written once at assembly time.
#[derive(Default)]
pub(crate) struct ImageStore {
    images: Vec<PreparedImage>,
    by_key: HashMap<String, Option<usize>>,
}

impl ImageStore {
    /// Decode `data` once per `key`. Failures are logged and remembered, so a bad
    /// image costs one warning no matter how often it is drawn.
    pub(crate) fn get_or_prepare(&mut self, key: &str, data: &[u8]) -> Option<ImageInfo> {
        let slot = match self.by_key.get(key) {
            Some(slot) => *slot,
            None => {
                let name = format!("Im{}", self.images.len() + 1);
                let slot = match prepare(name, data) {
                    Ok(img) => {
                        self.images.push(img);
                        Some(self.images.len() - 1)
                    }
                    Err(e) => {
                        log::warn!("Cannot embed image {key}: {e}");
                        None
                    }
                };
                self.by_key.insert(key.to_string(), slot);
                slot
            }
        };
        slot.map(|i| {
            let img = &self.images[i];
            ImageInfo {
                name: img.name.clone(),
                pixel_width: img.pixel_width,
                pixel_height: img.pixel_height,
            }
        })
    }

    /// Write every image XObject and return (resource name, ref) pairs.
    pub(crate) fn write(&self, pdf: &mut Pdf, alloc: &mut impl FnMut() -> Ref) -> Vec<(String, Ref)> {
        let mut pairs = Vec::with_capacity(self.images.len());
        for img in &self.images {
            let xobj_ref = alloc();
            let (w, h) = (img.pixel_width as i32, img.pixel_height as i32);
            match &img.encoding {
                Encoding::Jpeg { data, color } => {
                    let mut xobj = pdf.image_xobject(xobj_ref, data);
                    xobj.filter(Filter::DctDecode);
                    xobj.width(w);
                    xobj.height(h);
                    match color {
                        JpegColor::Gray => {
                            xobj.color_space().device_gray();
                        }
                        JpegColor::Rgb => {
                            xobj.color_space().device_rgb();
                        }
                        JpegColor::Cmyk { inverted } => {
                            xobj.color_space().device_cmyk();
                            if *inverted {
                                xobj.decode([1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0]);
                            }
                        }
                    }
                    xobj.bits_per_component(8);
                }
                Encoding::Flate { rgb, alpha } => {
                    let smask_ref = alpha.as_ref().map(|alpha| {
                        let mask_ref = alloc();
                        let mut mask = pdf.image_xobject(mask_ref, alpha);
                        mask.filter(Filter::FlateDecode);
                        mask.width(w);
                        mask.height(h);
                        mask.color_space().device_gray();
                        mask.bits_per_component(8);
                        mask_ref
                    });

                    let mut xobj = pdf.image_xobject(xobj_ref, rgb);
                    xobj.filter(Filter::FlateDecode);
                    xobj.width(w);
                    xobj.height(h);
                    xobj.color_space().device_rgb();
                    xobj.bits_per_component(8);
                    if let Some(mask_ref) = smask_ref {
                        xobj.s_mask(mask_ref);
                    }
                }
            }
            pairs.push((img.name.clone(), xobj_ref));
        }
        pairs
    }
}

fn prepare(name: String, data: &[u8]) -> Result<PreparedImage, ImageError> {
    if data.is_empty() {
        return Err(ImageError::Empty);
    }
    match image::guess_format(data)? {
        image::ImageFormat::Jpeg => {
            let decoder = JpegDecoder::new(Cursor::new(data))?;
            let (pixel_width, pixel_height) = decoder.dimensions();
            let color = jpeg_color(data).unwrap_or_else(|| {
                if matches!(decoder.color_type(), image::ColorType::L8 | image::ColorType::L16) {
                    JpegColor::Gray
                } else {
                    JpegColor::Rgb
                }
            });
            Ok(PreparedImage {
                name,
                pixel_width,
                pixel_height,
                encoding: Encoding::Jpeg {
                    data: data.to_vec(),
                    color,
                },
            })
        }
        image::ImageFormat::Png => {
            let reader = image::ImageReader::with_format(Cursor::new(data), image::ImageFormat::Png);
            let rgba: image::RgbaImage = reader.decode()?.to_rgba8();
            let (w, h) = (rgba.width(), rgba.height());
            let has_alpha = rgba.pixels().any(|p| p.0[3] < 255);

            let rgb_data: Vec<u8> = rgba
                .pixels()
                .flat_map(|p| [p.0[0], p.0[1], p.0[2]])
                .collect();
            let rgb = miniz_oxide::deflate::compress_to_vec_zlib(&rgb_data, 6);
            let alpha = has_alpha.then(|| {
                let alpha_data: Vec<u8> = rgba.pixels().map(|p| p.0[3]).collect();
                miniz_oxide::deflate::compress_to_vec_zlib(&alpha_data, 6)
            });

            Ok(PreparedImage {
                name,
                pixel_width: w,
                pixel_height: h,
                encoding: Encoding::Flate { rgb, alpha },
            })
        }
        other => Err(ImageError::Unsupported(other)),
    }
}

/// Colour space from the JPEG frame header. Decoders report CMYK files as RGB
/// after converting them, so the markers are read directly.
fn jpeg_color(data: &[u8]) -> Option<JpegColor> {
    if data.get(..2) != Some(&[0xFF, 0xD8][..]) {
        return None;
    }
    let mut adobe = false;
    let mut i = 2;
    while i + 4 <= data.len() {
        if data[i] != 0xFF {
            return None;
        }
        let marker = data[i + 1];
        match marker {
            0xFF => {
                i += 1;
                continue;
            }
            0x01 | 0xD0..=0xD8 => {
                i += 2;
                continue;
            }
            _ => {}
        }
        let len = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
        let body = data.get(i + 4..i + 2 + len)?;
        match marker {
            0xEE if body.starts_with(b"Adobe") => adobe = true,
            0xC4 | 0xC8 | 0xCC => {}
            0xC0..=0xCF => {
                return match body.get(5)? {
                    1 => Some(JpegColor::Gray),
                    3 => Some(JpegColor::Rgb),
                    4 => Some(JpegColor::Cmyk { inverted: adobe }),
                    _ => None,
                };
            }
            0xDA => return None,
            _ => {}
        }
        i += 2 + len;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    use image::codecs::jpeg::JpegEncoder;
    use image::{ExtendedColorType, ImageEncoder};

    /// Markers only: SOI, optional Adobe APP14, SOF0, EOI.
    fn jpeg_header(components: u8, adobe: bool) -> Vec<u8> {
        let mut data = vec![0xFF, 0xD8];
        if adobe {
            data.extend([0xFF, 0xEE, 0x00, 0x0E]);
            data.extend(b"Adobe");
            data.extend([0, 100, 0, 0, 0, 0, 2]);
        }
        data.extend([0xFF, 0xC0]);
        data.extend((8 + 3 * components as u16).to_be_bytes());
        data.extend([8, 0, 16, 0, 32, components]);
        for c in 0..components {
            data.extend([c + 1, 0x11, 0]);
        }
        data.extend([0xFF, 0xD9]);
        data
    }

    fn encode_jpeg(pixels: &[u8], color: ExtendedColorType) -> Vec<u8> {
        let mut out = Vec::new();
        JpegEncoder::new(&mut out)
            .write_image(pixels, 4, 4, color)
            .expect("encode jpeg");
        out
    }

    #[test]
    fn frame_header_component_counts() {
        assert_eq!(jpeg_color(&jpeg_header(1, false)), Some(JpegColor::Gray));
        assert_eq!(jpeg_color(&jpeg_header(3, false)), Some(JpegColor::Rgb));
        assert_eq!(
            jpeg_color(&jpeg_header(4, false)),
            Some(JpegColor::Cmyk { inverted: false })
        );
        assert_eq!(
            jpeg_color(&jpeg_header(4, true)),
            Some(JpegColor::Cmyk { inverted: true })
        );
        assert_eq!(jpeg_color(b"not a jpeg"), None);
        assert_eq!(jpeg_color(&[0xFF, 0xD8, 0xFF, 0xC0, 0x00]), None);
    }

    #[test]
    fn encoded_jpegs_keep_their_colour_space() {
        let rgb = encode_jpeg(&[200; 4 * 4 * 3], ExtendedColorType::Rgb8);
        assert_eq!(jpeg_color(&rgb), Some(JpegColor::Rgb));
        let gray = encode_jpeg(&[90; 4 * 4], ExtendedColorType::L8);
        assert_eq!(jpeg_color(&gray), Some(JpegColor::Gray));

        let mut store = ImageStore::default();
        let info = store.get_or_prepare("logo", &gray).expect("gray jpeg");
        assert_eq!((info.pixel_width, info.pixel_height), (4, 4));
    }
}
