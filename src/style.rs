use std::fmt;

/// RGBA color with 8-bit components
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Color {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
    pub(crate) a: u8,
}

/// A color attribute that could not be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidColor {
    pub value: String,
    pub reason: String,
}

impl fmt::Display for InvalidColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid hex color '{}': {}", self.value, self.reason)
    }
}

impl std::error::Error for InvalidColor {}

fn parse_hex_component(hex: &str, original: &str) -> Result<u8, InvalidColor> {
    u8::from_str_radix(hex, 16).map_err(|_| InvalidColor {
        value: original.to_string(),
        reason: format!("invalid hex component '{}'", hex),
    })
}

impl Color {
    pub const WHITE: Color = Color {
        r: 255,
        g: 255,
        b: 255,
        a: 255,
    };
    pub const BLACK: Color = Color {
        r: 0,
        g: 0,
        b: 0,
        a: 255,
    };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Outputs the hex value for that colour.
    #[inline]
    pub fn as_hex(&self) -> String {
        if self.a < 255 {
            format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
        } else {
            format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        }
    }

    /// Writes the truecolor SGR parameters for this color, `38;2;r;g;b` or `48;2;r;g;b`.
    pub fn write_ansi(&self, background: bool, out: &mut String) {
        let lead = if background { 48 } else { 38 };
        out.push_str(&format!("{lead};2;{};{};{}", self.r, self.g, self.b));
    }

    /// Creates a Color from a string (in theory a hex but it can also be black/white).
    ///
    /// Errors if the string is not a valid hex colour.
    pub fn from_hex(hex: &str) -> Result<Self, InvalidColor> {
        let original = hex;
        let hex = hex.trim_start_matches('#');

        if hex.eq_ignore_ascii_case("white") {
            return Ok(Color::WHITE);
        } else if hex.eq_ignore_ascii_case("black") {
            return Ok(Color::BLACK);
        }
        // all branches below slice by byte, non-ascii would panic on a char boundary
        if !hex.is_ascii() {
            return Err(InvalidColor {
                value: original.to_string(),
                reason: "non-ascii characters".to_string(),
            });
        }
        match hex.len() {
            // #RGB
            3 => {
                let r = parse_hex_component(&hex[0..1], original)?;
                let g = parse_hex_component(&hex[1..2], original)?;
                let b = parse_hex_component(&hex[2..3], original)?;
                Ok(Color {
                    r: r * 17,
                    g: g * 17,
                    b: b * 17,
                    a: 255,
                })
            }
            // #RGBA
            4 => {
                let r = parse_hex_component(&hex[0..1], original)?;
                let g = parse_hex_component(&hex[1..2], original)?;
                let b = parse_hex_component(&hex[2..3], original)?;
                let a = parse_hex_component(&hex[3..4], original)?;
                Ok(Color {
                    r: r * 17,
                    g: g * 17,
                    b: b * 17,
                    a: a * 17,
                })
            }
            // #RRGGBB
            6 => {
                let r = parse_hex_component(&hex[0..2], original)?;
                let g = parse_hex_component(&hex[2..4], original)?;
                let b = parse_hex_component(&hex[4..6], original)?;
                Ok(Color { r, g, b, a: 255 })
            }
            // #RRGGBBAA
            8 => {
                let r = parse_hex_component(&hex[0..2], original)?;
                let g = parse_hex_component(&hex[2..4], original)?;
                let b = parse_hex_component(&hex[4..6], original)?;
                let a = parse_hex_component(&hex[6..8], original)?;
                Ok(Color { r, g, b, a })
            }
            _ => Err(InvalidColor {
                value: original.to_string(),
                reason: format!("invalid length {}", hex.len()),
            }),
        }
    }
}

#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct FontStyle {
    bits: u8,
}

impl FontStyle {
    /// Bold font style
    pub const BOLD: Self = Self { bits: 1 };
    /// Underline font style
    pub const UNDERLINE: Self = Self { bits: 2 };
    /// Italic font style
    pub const ITALIC: Self = Self { bits: 4 };

    /// Returns an empty set of flags
    pub const fn empty() -> Self {
        Self { bits: 0 }
    }

    /// Returns `true` if no flags are currently stored
    pub const fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Returns `true` if all of the flags in `other` are contained within `self`
    pub const fn contains(&self, other: Self) -> bool {
        (self.bits & other.bits) == other.bits
    }

    /// Inserts the specified flags in-place
    pub fn insert(&mut self, other: Self) {
        self.bits |= other.bits;
    }

    /// Inserts `other` if `enabled` is set, builder style
    pub fn with(mut self, other: Self, enabled: bool) -> Self {
        if enabled {
            self.insert(other);
        }
        self
    }

    /// SGR parameters for the flags that are set: `1` bold, `3` italic, `4` underline
    pub fn ansi_codes(&self) -> impl Iterator<Item = &'static str> {
        [(Self::BOLD, "1"), (Self::ITALIC, "3"), (Self::UNDERLINE, "4")]
            .into_iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, code)| code)
    }
}

/// How a group is rendered. Colors are optional: a group that sets neither
/// leaves the host's default colors alone.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct Style {
    pub foreground: Option<Color>,
    pub background: Option<Color>,
    pub font_style: FontStyle,
}

impl Style {
    /// Opening ANSI escape for this style, empty if the style sets nothing.
    pub fn ansi_prefix(&self) -> String {
        let mut params: Vec<String> = self.font_style.ansi_codes().map(String::from).collect();
        for (color, background) in [(self.foreground, false), (self.background, true)] {
            if let Some(color) = color {
                let mut s = String::new();
                color.write_ansi(background, &mut s);
                params.push(s);
            }
        }
        if params.is_empty() {
            String::new()
        } else {
            format!("\x1b[{}m", params.join(";"))
        }
    }
}
