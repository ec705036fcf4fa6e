use std::path::{Path, PathBuf};

use memmap2::Mmap;
use ttf_parser::Face;

use crate::error::Error;

/// Horizontal advances and vertical ratios for one font face, extracted once
/// at load time so measurement never re-parses the face.
pub struct FontMetrics {
    /// Advances at 1000 units/em for codepoints 0x20..=0xFF.
    widths_1000: Vec<f32>,
    /// Advance used for codepoints outside the table.
    fallback_width_1000: f32,
    /// Natural line height as a multiple of font size.
    line_h_ratio: f32,
}

impl FontMetrics {
    pub fn from_data(data: &[u8], face_index: u32) -> Result<Self, Error> {
        let face = Face::parse(data, face_index)?;
        let units = face.units_per_em() as f32;

        let widths_1000: Vec<f32> = (0x20u32..=0xFF)
            .map(|cp| {
                char::from_u32(cp)
                    .and_then(|ch| face.glyph_index(ch))
                    .and_then(|gid| face.glyph_hor_advance(gid))
                    .map(|adv| adv as f32 / units * 1000.0)
                    .unwrap_or(0.0)
            })
            .collect();

        let covered: Vec<f32> = widths_1000.iter().copied().filter(|&w| w > 0.0).collect();
        let fallback_width_1000 = if covered.is_empty() {
            500.0
        } else {
            covered.iter().sum::<f32>() / covered.len() as f32
        };

        let line_gap = face.line_gap() as f32;
        let line_h_ratio =
            (face.ascender() as f32 - face.descender() as f32 + line_gap) / units;

        Ok(FontMetrics {
            widths_1000,
            fallback_width_1000,
            line_h_ratio,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, Error> {
        Self::from_file_indexed(path, 0)
    }

    pub fn from_file_indexed(path: &Path, face_index: u32) -> Result<Self, Error> {
        let t0 = std::time::Instant::now();
        let file = std::fs::File::open(path)?;
        let data = unsafe { Mmap::map(&file) }?;
        let metrics = Self::from_data(&data, face_index)?;
        log::debug!(
            "loaded font metrics from {} (face {face_index}) in {:.1}ms",
            path.display(),
            t0.elapsed().as_secs_f64() * 1000.0,
        );
        Ok(metrics)
    }

    /// Resolve a family name against the system font directories.
    pub fn load_family(family: &str) -> Result<Self, Error> {
        let (path, face_index) = find_font_file(family)
            .ok_or_else(|| Error::FontNotFound(family.to_string()))?;
        Self::from_file_indexed(&path, face_index)
    }

    pub fn char_width_1000(&self, ch: char) -> f32 {
        let cp = ch as u32;
        if (0x20..=0xFF).contains(&cp) {
            self.widths_1000[(cp - 0x20) as usize]
        } else {
            self.fallback_width_1000
        }
    }

    pub fn word_width(&self, word: &str, font_size: f32) -> f32 {
        word.chars()
            .map(|ch| self.char_width_1000(ch) * font_size / 1000.0)
            .sum()
    }

    pub fn space_width(&self, font_size: f32) -> f32 {
        self.char_width_1000(' ') * font_size / 1000.0
    }

    pub fn line_height(&self, font_size: f32) -> f32 {
        font_size * self.line_h_ratio
    }

    /// Greedy word-wrap: the line count `text` occupies in a column of
    /// `max_width` pixels. Blank lines keep their own line box.
    pub fn wrap_line_count(&self, text: &str, font_size: f32, max_width: f32) -> usize {
        let space_w = self.space_width(font_size);
        let mut lines = 0usize;

        for paragraph in text.split('\n') {
            if paragraph.trim().is_empty() {
                lines += 1;
                continue;
            }
            let mut current_w = 0.0f32;
            let mut line_open = false;
            for word in paragraph.split_whitespace() {
                let ww = self.word_width(word, font_size);
                if line_open && current_w + space_w + ww > max_width {
                    lines += 1;
                    current_w = ww;
                } else if line_open {
                    current_w += space_w + ww;
                } else {
                    current_w = ww;
                    line_open = true;
                }
            }
            if line_open {
                lines += 1;
            }
        }
        lines
    }
}

fn font_directories() -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = Vec::new();

    // User-configured directories take precedence.
    if let Ok(val) = std::env::var("ARTICLE_FLOW_FONTS") {
        let sep = if cfg!(windows) { ';' } else { ':' };
        for part in val.split(sep) {
            let trimmed = part.trim();
            if !trimmed.is_empty() {
                dirs.push(PathBuf::from(trimmed));
            }
        }
    }

    #[cfg(target_os = "macos")]
    {
        dirs.extend([
            "/Library/Fonts".into(),
            "/System/Library/Fonts".into(),
            "/System/Library/Fonts/Supplemental".into(),
        ]);
        if let Ok(home) = std::env::var("HOME") {
            dirs.push(PathBuf::from(home).join("Library/Fonts"));
        }
    }

    #[cfg(target_os = "linux")]
    {
        dirs.extend(["/usr/share/fonts".into(), "/usr/local/share/fonts".into()]);
        if let Ok(home) = std::env::var("HOME") {
            dirs.push(PathBuf::from(home).join(".local/share/fonts"));
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Ok(windir) = std::env::var("WINDIR") {
            dirs.push(PathBuf::from(windir).join("Fonts"));
        } else {
            dirs.push("C:\\Windows\\Fonts".into());
        }
    }

    dirs
}

fn is_font_file(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref(),
        Some("ttf" | "otf" | "ttc")
    )
}

fn is_font_collection(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("ttc"))
}

fn family_name(face: &Face) -> Option<String> {
    // ID 1 (Family) matches what style authors reference.
    for name in face.names() {
        if name.name_id == ttf_parser::name_id::FAMILY
            && name.is_unicode()
            && let Some(s) = name.to_string()
        {
            return Some(s);
        }
    }
    None
}

/// Scan the font directories for the first face whose family name matches
/// (case-insensitive). Returns the file path and face index within it.
pub fn find_font_file(family: &str) -> Option<(PathBuf, u32)> {
    let t0 = std::time::Instant::now();
    let wanted = family.to_lowercase();
    let mut files_scanned = 0u32;

    let mut stack = font_directories();
    while let Some(dir) = stack.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
                continue;
            }
            if !is_font_file(&path) {
                continue;
            }
            files_scanned += 1;
            let Ok(file) = std::fs::File::open(&path) else {
                continue;
            };
            let Ok(data) = (unsafe { Mmap::map(&file) }) else {
                continue;
            };
            let face_count = if is_font_collection(&path) {
                ttf_parser::fonts_in_collection(&data).unwrap_or(1)
            } else {
                1
            };
            for face_index in 0..face_count {
                let Ok(face) = Face::parse(&data, face_index) else {
                    continue;
                };
                if family_name(&face).is_some_and(|f| f.to_lowercase() == wanted) {
                    log::debug!(
                        "font scan: matched {family:?} at {} after {} files ({:.1}ms)",
                        path.display(),
                        files_scanned,
                        t0.elapsed().as_secs_f64() * 1000.0,
                    );
                    return Some((path, face_index));
                }
            }
        }
    }

    log::warn!(
        "font scan: no match for {family:?} in {} files ({:.1}ms)",
        files_scanned,
        t0.elapsed().as_secs_f64() * 1000.0,
    );
    None
}
