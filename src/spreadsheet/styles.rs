//! Cell formats and fill colors from `xl/styles.xml` and the workbook theme.
use crate::error::ReportError;
use crate::error::ResultOptionChain;
use crate::helpers::reader::WorkbookReader;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::builtin_decimal_places;
use crate::spreadsheet::cell::parse_decimal_places;
use crate::spreadsheet::cell::CellType;
use quick_xml::events::BytesStart;
use quick_xml::events::Event;
use std::collections::HashMap;
use zip::ZipArchive;

const TAG_CUSTOM_FORMAT: &[u8] = b"numFmt";
const TAG_FILLS: &[u8] = b"fills";
const TAG_FILL: &[u8] = b"fill";
const TAG_PATTERN_FILL: &[u8] = b"patternFill";
const TAG_FOREGROUND_COLOR: &[u8] = b"fgColor";
const TAG_FORMAT_INDEXES: &[u8] = b"cellXfs";
const TAG_FORMAT_INDEX: &[u8] = b"xf";
const TAG_COLOR_SCHEME: &[u8] = b"clrScheme";
const TAG_SRGB_COLOR: &[u8] = b"srgbClr";
const TAG_SYSTEM_COLOR: &[u8] = b"sysClr";

/// Legacy 64-color palette addressed by `indexed` colors.
const INDEXED_COLORS: [u32; 64] = [
    0x000000, 0xFFFFFF, 0xFF0000, 0x00FF00, 0x0000FF, 0xFFFF00, 0xFF00FF, 0x00FFFF,
    0x000000, 0xFFFFFF, 0xFF0000, 0x00FF00, 0x0000FF, 0xFFFF00, 0xFF00FF, 0x00FFFF,
    0x800000, 0x008000, 0x000080, 0x808000, 0x800080, 0x008080, 0xC0C0C0, 0x808080,
    0x9999FF, 0x993366, 0xFFFFCC, 0xCCFFFF, 0x660066, 0xFF8080, 0x0066CC, 0xCCCCFF,
    0x000080, 0xFF00FF, 0xFFFF00, 0x00FFFF, 0x800080, 0x800000, 0x008080, 0x0000FF,
    0x00CCFF, 0xCCFFFF, 0xCCFFCC, 0xFFFF99, 0x99CCFF, 0xFF99CC, 0xCC99FF, 0xFFCC99,
    0x3366FF, 0x33CCCC, 0x99CC00, 0xFFCC00, 0xFF9900, 0xFF6600, 0x666699, 0x969696,
    0x003366, 0x339966, 0x003300, 0x333300, 0x993300, 0x993366, 0x333399, 0x333333,
];

/// An opaque RGB color.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Rgb {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Rgb {
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Rgb { red, green, blue }
    }

    const fn from_u32(value: u32) -> Self {
        Rgb::new((value >> 16) as u8, (value >> 8) as u8, value as u8)
    }

    /// Parses `RRGGBB` or `AARRGGBB` hex; the alpha channel is ignored.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        if !hex.bytes().all(|byte| byte.is_ascii_hexdigit()) {
            return None;
        }
        let hex = match hex.len() {
            8 => &hex[2..],
            6 => hex,
            _ => return None,
        };
        u32::from_str_radix(hex, 16).ok().map(Self::from_u32)
    }

    fn from_indexed(index: usize) -> Option<Self> {
        match index {
            64 => Some(Rgb::new(0, 0, 0)),
            65 => Some(Rgb::new(0xFF, 0xFF, 0xFF)),
            _ => INDEXED_COLORS.get(index).map(|value| Self::from_u32(*value)),
        }
    }

    /// Lightens (positive) or darkens (negative) the color in HLS space.
    fn with_tint(self, tint: f64) -> Self {
        if tint == 0.0 {
            return self;
        }
        let (hue, lightness, saturation) = self.to_hls();
        let lightness = if tint < 0.0 {
            lightness * (1.0 + tint)
        } else {
            lightness * (1.0 - tint) + tint
        };
        Self::from_hls(hue, lightness.clamp(0.0, 1.0), saturation)
    }

    fn to_hls(self) -> (f64, f64, f64) {
        let red = self.red as f64 / 255.0;
        let green = self.green as f64 / 255.0;
        let blue = self.blue as f64 / 255.0;
        let max = red.max(green).max(blue);
        let min = red.min(green).min(blue);
        let lightness = (max + min) / 2.0;
        if max == min {
            return (0.0, lightness, 0.0);
        }
        let delta = max - min;
        let saturation = if lightness > 0.5 { delta / (2.0 - max - min) } else { delta / (max + min) };
        let hue = if max == red {
            (green - blue) / delta + if green < blue { 6.0 } else { 0.0 }
        } else if max == green {
            (blue - red) / delta + 2.0
        } else {
            (red - green) / delta + 4.0
        };
        (hue / 6.0, lightness, saturation)
    }

    fn from_hls(hue: f64, lightness: f64, saturation: f64) -> Self {
        let channel = |value: f64| (value * 255.0).round().clamp(0.0, 255.0) as u8;
        if saturation == 0.0 {
            let grey = channel(lightness);
            return Rgb::new(grey, grey, grey);
        }
        let q = if lightness < 0.5 {
            lightness * (1.0 + saturation)
        } else {
            lightness + saturation - lightness * saturation
        };
        let p = 2.0 * lightness - q;
        let component = |mut t: f64| {
            if t < 0.0 { t += 1.0; }
            if t > 1.0 { t -= 1.0; }
            if t < 1.0 / 6.0 {
                p + (q - p) * 6.0 * t
            } else if t < 0.5 {
                q
            } else if t < 2.0 / 3.0 {
                p + (q - p) * (2.0 / 3.0 - t) * 6.0
            } else {
                p
            }
        };
        Rgb::new(
            channel(component(hue + 1.0 / 3.0)),
            channel(component(hue)),
            channel(component(hue - 1.0 / 3.0)),
        )
    }
}

/// A color reference as written in the styles part, before theme resolution.
#[derive(Copy, Clone, Debug, PartialEq)]
enum ColorSpec {
    Rgb(Rgb),
    Indexed(usize),
    Theme { index: usize, tint: f64 },
}

impl ColorSpec {
    fn resolve(self, theme: &[Rgb]) -> Option<Rgb> {
        match self {
            ColorSpec::Rgb(rgb) => Some(rgb),
            ColorSpec::Indexed(index) => Rgb::from_indexed(index),
            ColorSpec::Theme { index, tint } => {
                // the first four scheme slots are stored dk1, lt1, dk2, lt2 but addressed lt1, dk1, lt2, dk2
                let slot = match index {
                    0 => 1,
                    1 => 0,
                    2 => 3,
                    3 => 2,
                    other => other,
                };
                theme.get(slot).map(|rgb| rgb.with_tint(tint))
            }
        }
    }
}

/// Number format and fill of one `cellXfs` entry.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CellFormat {
    pub kind: CellType,
    pub decimals: Option<usize>,
    pub fill: Option<Rgb>,
}

impl Default for CellFormat {
    /// General number format without fill.
    fn default() -> Self {
        CellFormat {
            kind: CellType::Number,
            decimals: None,
            fill: None,
        }
    }
}

/// Resolved cell formats of a workbook, indexed by the cell `s` attribute.
#[derive(Clone, Debug, Default)]
pub struct Styles {
    formats: Vec<CellFormat>,
}

impl Styles {
    pub(crate) fn from_formats(formats: Vec<CellFormat>) -> Self {
        Styles { formats }
    }

    /// Format of a style index; unknown indexes behave as General without fill.
    pub fn format(&self, style: usize) -> CellFormat {
        self.formats.get(style).copied().unwrap_or_default()
    }

    /// Fill color of a style index, `None` when unfilled.
    pub fn fill(&self, style: usize) -> Option<Rgb> {
        self.format(style).fill
    }
}

/// Loads the workbook theme color scheme in document order (dk1, lt1, dk2, lt2, accents, links).
pub(crate) fn load_theme(zip: &mut ZipArchive<WorkbookReader>) -> Result<Vec<Rgb>, ReportError> {
    let mut reader = match zip.xml_reader("xl/theme/theme1.xml")? {
        Some(reader) => reader,
        None => return Ok(Vec::new()),
    };
    let mut colors = Vec::<Rgb>::new();
    let mut scheme_context = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_COLOR_SCHEME => scheme_context = true,
        Event::End(event) if event.local_name().as_ref() == TAG_COLOR_SCHEME => break,
        Event::Start(event) if scheme_context && event.local_name().as_ref() == TAG_SRGB_COLOR => {
            if let Some(rgb) = event.get_attribute_value("val")?.and_then(|value| Rgb::from_hex(&value)) {
                colors.push(rgb);
            }
        }
        Event::Start(event) if scheme_context && event.local_name().as_ref() == TAG_SYSTEM_COLOR => {
            if let Some(rgb) = event.get_attribute_value("lastClr")?.and_then(|value| Rgb::from_hex(&value)) {
                colors.push(rgb);
            }
        }
    });
    Ok(colors)
}

/// Loads number formats and fills from `xl/styles.xml` and joins them per `cellXfs` entry.
pub(crate) fn load_styles(
    zip: &mut ZipArchive<WorkbookReader>,
    theme: &[Rgb],
    is_1904: bool,
) -> Result<Styles, ReportError> {
    let mut reader = match zip.xml_reader("xl/styles.xml")? {
        Some(reader) => reader,
        None => return Ok(Styles::default()),
    };

    let mut custom_formats = HashMap::<usize, (CellType, Option<usize>)>::new();
    let mut fills = Vec::<Option<Rgb>>::new();
    let mut format_indexes = Vec::<(usize, usize)>::new();
    let mut fills_context = false;
    let mut format_indexes_context = false;
    let mut solid_pattern = false;

    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_CUSTOM_FORMAT => {
            let id = event.parse_attribute_value::<usize>("numFmtId")?;
            let code = event.get_attribute_value("formatCode")?;
            if let Some((id, code)) = id.zip(code) {
                let kind = CellType::parse_custom_number_format(&code, is_1904);
                custom_formats.insert(id, (kind, parse_decimal_places(&code)));
            }
        }

        Event::Start(event) if event.local_name().as_ref() == TAG_FILLS => fills_context = true,
        Event::End(event) if event.local_name().as_ref() == TAG_FILLS => fills_context = false,
        Event::Start(event) if fills_context && event.local_name().as_ref() == TAG_FILL => {
            fills.push(None);
            solid_pattern = false;
        }
        Event::Start(event) if fills_context && event.local_name().as_ref() == TAG_PATTERN_FILL => {
            solid_pattern = event.get_attribute_value("patternType")?
                .map(|pattern| pattern != "none")
                .unwrap_or(false);
        }
        Event::Start(event) if fills_context && solid_pattern && event.local_name().as_ref() == TAG_FOREGROUND_COLOR => {
            if let Some(last) = fills.last_mut() {
                *last = read_color(&event)?.and_then(|color| color.resolve(theme));
            }
        }

        Event::Start(event) if event.local_name().as_ref() == TAG_FORMAT_INDEXES => format_indexes_context = true,
        Event::End(event) if event.local_name().as_ref() == TAG_FORMAT_INDEXES => format_indexes_context = false,
        Event::Start(event) if format_indexes_context && event.local_name().as_ref() == TAG_FORMAT_INDEX => {
            let format_id = event.parse_attribute_value::<usize>("numFmtId")?.unwrap_or(0);
            let fill_id = event.parse_attribute_value::<usize>("fillId")?.unwrap_or(0);
            format_indexes.push((format_id, fill_id));
        }
    });

    let formats = format_indexes
        .into_iter()
        .map(|(format_id, fill_id)| {
            let (kind, decimals) = custom_formats
                .get(&format_id)
                .copied()
                .or_else(|| CellType::parse_builtin_number_format_id(format_id, is_1904).map(|kind| (kind, None)))
                .unwrap_or((CellType::Number, builtin_decimal_places(format_id)));
            CellFormat {
                kind,
                decimals,
                fill: fills.get(fill_id).copied().flatten(),
            }
        })
        .collect();
    Ok(Styles::from_formats(formats))
}

/// Reads the color of a `fgColor` element: explicit RGB first, then theme, then indexed.
fn read_color(event: &BytesStart) -> Result<Option<ColorSpec>, ReportError> {
    event.get_attribute_value("rgb")
        .map(|value| value.and_then(|value| Rgb::from_hex(&value)).map(ColorSpec::Rgb))
        .ok_none_else(|| {
            let tint = event.parse_attribute_value::<f64>("tint")?.unwrap_or(0.0);
            Ok(event.parse_attribute_value::<usize>("theme")?.map(|index| ColorSpec::Theme { index, tint }))
        })
        .ok_none_else(|| Ok(event.parse_attribute_value::<usize>("indexed")?.map(ColorSpec::Indexed)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::testing::WorkbookBuilder;

    #[test]
    fn test_rgb_from_hex() {
        assert_eq!(Rgb::from_hex("FFC6EFCE"), Some(Rgb::new(0xC6, 0xEF, 0xCE)));
        assert_eq!(Rgb::from_hex("00FF00"), Some(Rgb::new(0, 0xFF, 0)));
        assert_eq!(Rgb::from_hex("#00FF00"), Some(Rgb::new(0, 0xFF, 0)));
        assert_eq!(Rgb::from_hex("nope"), None);
        assert_eq!(Rgb::from_hex("aé12345"), None);
        assert_eq!(Rgb::from_hex("FFGG0000"), None);
    }

    #[test]
    fn test_theme_color_resolution() {
        let theme = vec![
            Rgb::new(0, 0, 0),
            Rgb::new(0xFF, 0xFF, 0xFF),
            Rgb::new(0x44, 0x54, 0x6A),
            Rgb::new(0xE7, 0xE6, 0xE6),
            Rgb::new(0x44, 0x72, 0xC4),
            Rgb::new(0xED, 0x7D, 0x31),
            Rgb::new(0xA5, 0xA5, 0xA5),
            Rgb::new(0xFF, 0xC0, 0x00),
            Rgb::new(0x5B, 0x9B, 0xD5),
            Rgb::new(0x70, 0xAD, 0x47),
        ];
        assert_eq!(ColorSpec::Theme { index: 0, tint: 0.0 }.resolve(&theme), Some(Rgb::new(0xFF, 0xFF, 0xFF)));
        assert_eq!(ColorSpec::Theme { index: 9, tint: 0.0 }.resolve(&theme), Some(Rgb::new(0x70, 0xAD, 0x47)));
        let lighter = ColorSpec::Theme { index: 9, tint: 0.6 }.resolve(&theme).unwrap();
        assert!(lighter.green > 0xAD && lighter.red > 0x70);
        assert_eq!(ColorSpec::Theme { index: 20, tint: 0.0 }.resolve(&theme), None);
        assert_eq!(ColorSpec::Indexed(42).resolve(&theme), Some(Rgb::new(0xCC, 0xFF, 0xCC)));
    }

    #[test]
    fn test_tint_extremes() {
        let green = Rgb::new(0x70, 0xAD, 0x47);
        assert_eq!(green.with_tint(1.0), Rgb::new(0xFF, 0xFF, 0xFF));
        assert_eq!(green.with_tint(-1.0), Rgb::new(0, 0, 0));
        assert_eq!(green.with_tint(0.0), green);
    }

    #[test]
    fn test_load_styles_joins_formats_and_fills() -> Result<(), ReportError> {
        let mut zip = WorkbookBuilder::new()
            .fill("FF00FF00")
            .number_format("0.000")
            .sheet("DMT", &[])
            .archive();
        let styles = load_styles(&mut zip, &[], false)?;
        // style 0 is the default, then one entry per registered fill and format
        assert_eq!(styles.fill(0), None);
        assert_eq!(styles.fill(1), Some(Rgb::new(0, 0xFF, 0)));
        assert_eq!(styles.format(2).decimals, Some(3));
        assert_eq!(styles.format(99), CellFormat::default());
        Ok(())
    }

    #[test]
    fn test_malformed_fill_color_is_ignored() -> Result<(), ReportError> {
        let mut zip = WorkbookBuilder::new()
            .fill("aé12345")
            .fill("FF00FF00")
            .sheet("DMT", &[])
            .archive();
        let styles = load_styles(&mut zip, &[], false)?;
        assert_eq!(styles.fill(1), None);
        assert_eq!(styles.fill(2), Some(Rgb::new(0, 0xFF, 0)));
        Ok(())
    }
}
