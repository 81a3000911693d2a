//! # Marker Generation
//!
//! Renders the printable QR markers the rover follows. Markers use the highest error correction
//! level so that they still decode when partly obscured or seen at an angle, and may carry a text
//! label below the code so a printed sheet can be identified by eye.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{GrayImage, Luma};
use log::debug;
use qrcode::{types::QrError, Color, EcLevel, QrCode, Version};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Default payload of a generated marker.
pub const DEFAULT_PAYLOAD: &str = "ROBOT_TARGET";

/// Height of the label band below the code.
///
/// Units: pixels
pub const LABEL_HEIGHT_PX: u32 = 30;

/// Label glyphs are 8x8 bitmaps drawn at this scale.
const LABEL_GLYPH_SCALE: u32 = 2;

const DARK: Luma<u8> = Luma([0]);
const LIGHT: Luma<u8> = Luma([255]);

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Description of a marker to render.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    /// Text encoded in the marker
    pub data: String,

    /// Smallest QR version (1-40) to use. Larger versions are used if the data does not fit.
    pub min_version: i16,

    /// Width of the light border around the code
    ///
    /// Units: modules
    pub border_modules: u32,

    /// Units: pixels
    pub module_px: u32,

    /// Draw the data as text below the code
    pub label: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum MarkerGenError {
    #[error("QR version must be between 1 and 40, found {0}")]
    InvalidVersion(i16),

    #[error("Module size must be at least one pixel")]
    ZeroModuleSize,

    #[error("Could not encode the marker data: {0:?}")]
    EncodeError(QrError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for MarkerSpec {
    fn default() -> Self {
        Self {
            data: String::from(DEFAULT_PAYLOAD),
            min_version: 5,
            border_modules: 4,
            module_px: 10,
            label: true,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Render a marker as a black on white image.
pub fn render_marker(spec: &MarkerSpec) -> Result<GrayImage, MarkerGenError> {
    if !(1..=40).contains(&spec.min_version) {
        return Err(MarkerGenError::InvalidVersion(spec.min_version));
    }
    if spec.module_px == 0 {
        return Err(MarkerGenError::ZeroModuleSize);
    }

    let code = encode(spec.data.as_bytes(), spec.min_version)?;
    debug!("Encoded {:?} as a {:?} code", spec.data, code.version());

    let num_modules = code.width() as u32;
    let code_px = (num_modules + 2 * spec.border_modules) * spec.module_px;
    let label_px = if spec.label { LABEL_HEIGHT_PX } else { 0 };

    let mut img = GrayImage::from_pixel(code_px, code_px + label_px, LIGHT);

    let border_px = spec.border_modules * spec.module_px;
    for (i, color) in code.to_colors().into_iter().enumerate() {
        if color != Color::Dark {
            continue;
        }

        let mx = i as u32 % num_modules;
        let my = i as u32 / num_modules;
        for dy in 0..spec.module_px {
            for dx in 0..spec.module_px {
                img.put_pixel(
                    border_px + mx * spec.module_px + dx,
                    border_px + my * spec.module_px + dy,
                    DARK,
                );
            }
        }
    }

    if spec.label {
        draw_label(&mut img, &spec.data, code_px);
    }

    Ok(img)
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Encode at `min_version`, growing the version if the data doesn't fit.
fn encode(data: &[u8], min_version: i16) -> Result<QrCode, MarkerGenError> {
    match QrCode::with_version(data, Version::Normal(min_version), EcLevel::H) {
        Ok(code) => Ok(code),
        Err(QrError::DataTooLong) => QrCode::with_error_correction_level(data, EcLevel::H)
            .map_err(MarkerGenError::EncodeError),
        Err(e) => Err(MarkerGenError::EncodeError(e)),
    }
}

/// Draw `text` centred in the label band starting at row `top`. Text wider than the image is
/// clipped, characters with no glyph are left blank.
fn draw_label(img: &mut GrayImage, text: &str, top: u32) {
    let glyph_px = 8 * LABEL_GLYPH_SCALE;
    let text_px = text.chars().count() as i64 * glyph_px as i64;
    let left = (img.width() as i64 - text_px) / 2;
    let top = top + (LABEL_HEIGHT_PX - glyph_px) / 2;

    for (n, c) in text.chars().enumerate() {
        let glyph = match BASIC_FONTS.get(c) {
            Some(g) => g,
            None => continue,
        };
        let glyph_left = left + n as i64 * glyph_px as i64;

        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..8u32 {
                if bits & (1 << col) == 0 {
                    continue;
                }

                for sy in 0..LABEL_GLYPH_SCALE {
                    for sx in 0..LABEL_GLYPH_SCALE {
                        let x = glyph_left + (col * LABEL_GLYPH_SCALE + sx) as i64;
                        let y = top + row as u32 * LABEL_GLYPH_SCALE + sy;
                        if x >= 0 && (x as u32) < img.width() && y < img.height() {
                            img.put_pixel(x as u32, y, DARK);
                        }
                    }
                }
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_render_size() {
        // Version 5 is 37 modules wide
        let img = render_marker(&MarkerSpec::default()).unwrap();
        assert_eq!(img.dimensions(), (450, 450 + LABEL_HEIGHT_PX));

        let img = render_marker(&MarkerSpec {
            border_modules: 2,
            module_px: 3,
            label: false,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(img.dimensions(), (123, 123));

        // Border is light, the finder pattern corner just inside it is dark
        assert_eq!(*img.get_pixel(5, 5), LIGHT);
        assert_eq!(*img.get_pixel(6, 6), DARK);
    }

    #[test]
    fn test_version_grows_to_fit() {
        // 12 bytes don't fit in a version 1 code at level H
        let img = render_marker(&MarkerSpec {
            min_version: 1,
            border_modules: 0,
            module_px: 1,
            label: false,
            ..Default::default()
        })
        .unwrap();

        assert!(img.width() > 21);
    }

    #[test]
    fn test_label_drawn_below_code() {
        let spec = MarkerSpec {
            label: true,
            ..Default::default()
        };
        let img = render_marker(&spec).unwrap();

        let band_has_ink = (450..img.height())
            .any(|y| (0..img.width()).any(|x| *img.get_pixel(x, y) == DARK));
        assert!(band_has_ink);

        let unlabelled = render_marker(&MarkerSpec {
            label: false,
            ..spec
        })
        .unwrap();
        assert_eq!(unlabelled.height(), 450);
    }

    #[test]
    fn test_invalid_spec() {
        assert!(matches!(
            render_marker(&MarkerSpec {
                min_version: 41,
                ..Default::default()
            }),
            Err(MarkerGenError::InvalidVersion(41))
        ));
        assert!(matches!(
            render_marker(&MarkerSpec {
                module_px: 0,
                ..Default::default()
            }),
            Err(MarkerGenError::ZeroModuleSize)
        ));
    }
}
