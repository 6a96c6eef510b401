use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use memmap2::Mmap;
use pdf_writer::{Name, Pdf, Rect, Ref};
use subsetter::GlyphRemapper;
use ttf_parser::Face;

use crate::error::Error;
use crate::model::FontFiles;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FontStyle {
    Regular,
    Bold,
    Italic,
}

impl FontStyle {
    fn index(self) -> usize {
        match self {
            FontStyle::Regular => 0,
            FontStyle::Bold => 1,
            FontStyle::Italic => 2,
        }
    }
}

/// The three faces a document uses, either the standard Helvetica family or
/// user-supplied TrueType files.
pub(crate) struct FontSet {
    entries: [FontEntry; 3],
}

pub(crate) struct FontEntry {
    pub(crate) pdf_name: String,
    kind: FontKind,
}

enum FontKind {
    Builtin {
        base_font: &'static str,
        widths_1000: Vec<f32>,
    },
    TrueType(TrueTypeFont),
}

struct TrueTypeFont {
    family: String,
    data: Mmap,
    units_per_em: f32,
    remapper: GlyphRemapper,
    /// char -> glyph id inside the subset
    used: BTreeMap<char, u16>,
}

impl FontSet {
    pub(crate) fn load(files: Option<&FontFiles>) -> Result<Self, Error> {
        let Some(files) = files else {
            return Ok(Self::helvetica());
        };
        let t0 = std::time::Instant::now();
        let regular = TrueTypeFont::open(&files.regular)?;
        let bold = TrueTypeFont::open(files.bold.as_deref().unwrap_or(&files.regular))?;
        let italic = TrueTypeFont::open(files.italic.as_deref().unwrap_or(&files.regular))?;
        log::debug!(
            "Loaded TrueType faces {} / {} / {} in {:.1}ms",
            regular.family,
            bold.family,
            italic.family,
            t0.elapsed().as_secs_f64() * 1000.0,
        );
        Ok(Self {
            entries: [
                FontEntry::truetype("F1", regular),
                FontEntry::truetype("F2", bold),
                FontEntry::truetype("F3", italic),
            ],
        })
    }

    fn helvetica() -> Self {
        Self {
            entries: [
                FontEntry::builtin("F1", "Helvetica", helvetica_widths()),
                FontEntry::builtin("F2", "Helvetica-Bold", helvetica_bold_widths()),
                FontEntry::builtin("F3", "Helvetica-Oblique", helvetica_widths()),
            ],
        }
    }

    pub(crate) fn entry(&self, style: FontStyle) -> &FontEntry {
        &self.entries[style.index()]
    }

    /// Advance width of `text` in points.
    pub(crate) fn text_width(&self, style: FontStyle, font_size: f32, text: &str) -> f32 {
        self.entry(style).width_1000(text) * font_size / 1000.0
    }

    /// Bytes for a `Tj` operand in the face's encoding.
    pub(crate) fn encode(&mut self, style: FontStyle, text: &str) -> Vec<u8> {
        match &mut self.entries[style.index()].kind {
            FontKind::Builtin { .. } => to_winansi_bytes(text),
            FontKind::TrueType(tt) => tt.encode(text),
        }
    }

    /// Write all font dictionaries and return (resource name, font ref) pairs.
    pub(crate) fn write(
        &self,
        pdf: &mut Pdf,
        alloc: &mut impl FnMut() -> Ref,
    ) -> Result<Vec<(String, Ref)>, Error> {
        let mut pairs = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let font_ref = alloc();
            match &entry.kind {
                FontKind::Builtin { base_font, .. } => {
                    pdf.type1_font(font_ref)
                        .base_font(Name(base_font.as_bytes()))
                        .encoding_predefined(Name(b"WinAnsiEncoding"));
                }
                FontKind::TrueType(tt) => embed_truetype(pdf, font_ref, tt, alloc)?,
            }
            pairs.push((entry.pdf_name.clone(), font_ref));
        }
        Ok(pairs)
    }
}

impl FontEntry {
    fn builtin(pdf_name: &str, base_font: &'static str, widths_1000: Vec<f32>) -> Self {
        Self {
            pdf_name: pdf_name.to_string(),
            kind: FontKind::Builtin {
                base_font,
                widths_1000,
            },
        }
    }

    fn truetype(pdf_name: &str, font: TrueTypeFont) -> Self {
        Self {
            pdf_name: pdf_name.to_string(),
            kind: FontKind::TrueType(font),
        }
    }

    fn width_1000(&self, text: &str) -> f32 {
        match &self.kind {
            FontKind::Builtin { widths_1000, .. } => to_winansi_bytes(text)
                .iter()
                .filter(|&&b| b >= 32)
                .map(|&b| widths_1000[(b - 32) as usize])
                .sum(),
            FontKind::TrueType(tt) => tt.width_1000(text),
        }
    }
}

impl TrueTypeFont {
    fn open(path: &Path) -> Result<Self, Error> {
        let file = File::open(path).map_err(|e| {
            Error::Io(std::io::Error::new(e.kind(), format!("{}: {}", e, path.display())))
        })?;
        // SAFETY: the mapping is read-only and lives as long as the render call.
        let data = unsafe { Mmap::map(&file) }?;
        let face = Face::parse(&data, 0)
            .map_err(|e| Error::Font(format!("{}: {e}", path.display())))?;
        let family = font_family_name(&face).unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "Embedded".to_string())
        });
        let units_per_em = face.units_per_em() as f32;
        Ok(Self {
            family,
            data,
            units_per_em,
            remapper: GlyphRemapper::new(),
            used: BTreeMap::new(),
        })
    }

    fn width_1000(&self, text: &str) -> f32 {
        let Ok(face) = Face::parse(&self.data, 0) else {
            return 0.0;
        };
        text.chars()
            .map(|ch| {
                let gid = face.glyph_index(ch).unwrap_or(ttf_parser::GlyphId(0));
                face.glyph_hor_advance(gid)
                    .map(|adv| adv as f32 / self.units_per_em * 1000.0)
                    .unwrap_or(0.0)
            })
            .sum()
    }

    fn encode(&mut self, text: &str) -> Vec<u8> {
        let Ok(face) = Face::parse(&self.data, 0) else {
            return Vec::new();
        };
        let mut out = Vec::with_capacity(text.len() * 2);
        for ch in text.chars() {
            let gid = match self.used.get(&ch) {
                Some(&gid) => gid,
                None => {
                    let original = face.glyph_index(ch).map(|g| g.0).unwrap_or(0);
                    let gid = self.remapper.remap(original);
                    self.used.insert(ch, gid);
                    gid
                }
            };
            out.push((gid >> 8) as u8);
            out.push((gid & 0xFF) as u8);
        }
        out
    }
}

fn font_family_name(face: &Face) -> Option<String> {
    face.names()
        .into_iter()
        .filter(|name| name.name_id == ttf_parser::name_id::FAMILY && name.is_unicode())
        .find_map(|name| name.to_string())
}

/// Convert a UTF-8 string to WinAnsi (Windows-1252) bytes for PDF Str encoding.
/// Characters outside the code page are dropped.
pub(crate) fn to_winansi_bytes(s: &str) -> Vec<u8> {
    s.chars()
        .filter_map(|c| match c as u32 {
            0x0000..=0x007F => Some(c as u8),
            0x00A0..=0x00FF => Some(c as u8), // Latin-1 supplement maps directly
            0x20AC => Some(0x80),
            0x201A => Some(0x82),
            0x0192 => Some(0x83),
            0x201E => Some(0x84),
            0x2026 => Some(0x85),
            0x2020 => Some(0x86),
            0x2021 => Some(0x87),
            0x02C6 => Some(0x88),
            0x2030 => Some(0x89),
            0x0160 => Some(0x8A),
            0x2039 => Some(0x8B),
            0x0152 => Some(0x8C),
            0x017D => Some(0x8E),
            0x2018 => Some(0x91),
            0x2019 => Some(0x92),
            0x201C => Some(0x93),
            0x201D => Some(0x94),
            0x2022 => Some(0x95), // bullet
            0x2013 => Some(0x96),
            0x2014 => Some(0x97),
            0x02DC => Some(0x98),
            0x2122 => Some(0x99),
            0x0161 => Some(0x9A),
            0x203A => Some(0x9B),
            0x0153 => Some(0x9C),
            0x017E => Some(0x9E),
            0x0178 => Some(0x9F),
            _ => None,
        })
        .collect()
}

// Helvetica AFM advance widths for ASCII 32..=126.
const HELVETICA_ASCII: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0-9
    278, 278, 584, 584, 584, 556, 1015, // :..@
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, 667, 778, 722,
    667, 611, 722, 667, 944, 667, 667, 611, // A-Z
    278, 278, 278, 469, 556, 333, // [..`
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, 556, 556, 333,
    500, 278, 556, 500, 722, 500, 500, 500, // a-z
    334, 260, 334, 584, // {..~
];

const HELVETICA_BOLD_ASCII: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0-9
    333, 333, 584, 584, 584, 611, 975, // :..@
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, 667, 778, 722,
    667, 611, 722, 667, 944, 667, 667, 611, // A-Z
    333, 278, 333, 584, 556, 333, // [..`
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, 611, 611, 389,
    556, 333, 611, 556, 778, 556, 556, 500, // a-z
    389, 280, 389, 584, // {..~
];

/// Widths at 1000 units/em for WinAnsi bytes 32..=255. Exact for ASCII,
/// approximated above it.
fn winansi_widths(ascii: &[u16; 95]) -> Vec<f32> {
    (32u8..=255u8)
        .map(|b| match b {
            32..=126 => ascii[(b - 32) as usize] as f32,
            0x95 => 350.0,        // bullet
            0x96 => 556.0,        // en dash
            0x97 => 1000.0,       // em dash
            0x85 => 1000.0,       // ellipsis
            0x91..=0x94 => 333.0, // curly quotes
            0xC0..=0xDE => 722.0, // accented uppercase
            _ => 556.0,
        })
        .collect()
}

fn helvetica_widths() -> Vec<f32> {
    winansi_widths(&HELVETICA_ASCII)
}

fn helvetica_bold_widths() -> Vec<f32> {
    winansi_widths(&HELVETICA_BOLD_ASCII)
}

/// Embed a TrueType/OpenType font as a CIDFont (Type0 composite) with Identity-H encoding.
/// The font data is subsetted to the glyphs the document actually showed.
fn embed_truetype(
    pdf: &mut Pdf,
    font_ref: Ref,
    tt: &TrueTypeFont,
    alloc: &mut impl FnMut() -> Ref,
) -> Result<(), Error> {
    let face = Face::parse(&tt.data, 0).map_err(|e| Error::Font(format!("{}: {e}", tt.family)))?;

    let units = tt.units_per_em;
    let ascent = face.ascender() as f32 / units * 1000.0;
    let descent = face.descender() as f32 / units * 1000.0;
    let cap_height = face
        .capital_height()
        .map(|h| h as f32 / units * 1000.0)
        .unwrap_or(700.0);

    let bb = face.global_bounding_box();
    let bbox = Rect::new(
        bb.x_min as f32 / units * 1000.0,
        bb.y_min as f32 / units * 1000.0,
        bb.x_max as f32 / units * 1000.0,
        bb.y_max as f32 / units * 1000.0,
    );

    let subset_data = subsetter::subset(&tt.data, 0, &tt.remapper).unwrap_or_else(|e| {
        log::warn!("Font subsetting failed for {}: {e}; embedding full font", tt.family);
        tt.data.to_vec()
    });

    let data_len = i32::try_from(subset_data.len())
        .map_err(|_| Error::Pdf(format!("font program for {} is too large", tt.family)))?;
    let descriptor_ref = alloc();
    let data_ref = alloc();
    pdf.stream(data_ref, &subset_data)
        .pair(Name(b"Length1"), data_len);

    let ps_name = tt.family.replace(' ', "");

    pdf.font_descriptor(descriptor_ref)
        .name(Name(ps_name.as_bytes()))
        .flags(pdf_writer::types::FontFlags::NON_SYMBOLIC)
        .bbox(bbox)
        .italic_angle(0.0)
        .ascent(ascent)
        .descent(descent)
        .cap_height(cap_height)
        .stem_v(80.0)
        .font_file2(data_ref);

    let cid_font_ref = alloc();
    let system_info = pdf_writer::types::SystemInfo {
        registry: pdf_writer::Str(b"Adobe"),
        ordering: pdf_writer::Str(b"Identity"),
        supplement: 0,
    };
    {
        let mut cid = pdf.cid_font(cid_font_ref);
        cid.subtype(pdf_writer::types::CidFontType::Type2);
        cid.base_font(Name(ps_name.as_bytes()));
        cid.system_info(system_info);
        cid.font_descriptor(descriptor_ref);
        cid.default_width(0.0);
        cid.cid_to_gid_map_predefined(Name(b"Identity"));
        let mut gid_widths: Vec<(u16, f32)> = tt
            .used
            .iter()
            .map(|(&ch, &new_gid)| {
                let adv = face
                    .glyph_index(ch)
                    .and_then(|gid| face.glyph_hor_advance(gid))
                    .unwrap_or(0);
                (new_gid, adv as f32 / units * 1000.0)
            })
            .collect();
        gid_widths.sort_by_key(|&(gid, _)| gid);
        gid_widths.dedup_by_key(|&mut (gid, _)| gid);
        if !gid_widths.is_empty() {
            let mut w = cid.widths();
            for &(gid, width) in &gid_widths {
                w.consecutive(gid, [width]);
            }
        }
    }

    let tounicode_ref = alloc();
    let cmap_name = format!("{}-UTF16", ps_name);
    let mut cmap = pdf_writer::types::UnicodeCmap::new(
        Name(cmap_name.as_bytes()),
        pdf_writer::types::SystemInfo {
            registry: pdf_writer::Str(b"Adobe"),
            ordering: pdf_writer::Str(b"Identity"),
            supplement: 0,
        },
    );
    for (&ch, &new_gid) in &tt.used {
        cmap.pair(new_gid, ch);
    }
    let cmap_data = cmap.finish();
    pdf.stream(tounicode_ref, cmap_data.as_slice());

    pdf.type0_font(font_ref)
        .base_font(Name(ps_name.as_bytes()))
        .encoding_predefined(Name(b"Identity-H"))
        .descendant_font(cid_font_ref)
        .to_unicode(tounicode_ref);

    Ok(())
}
