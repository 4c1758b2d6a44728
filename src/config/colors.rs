//! Color configuration for the TUI.

use ratatui::style::Color;
use serde::{de, Deserialize, Deserializer};

const ORANGE: Color = Color::Rgb(0xFF, 0x66, 0x00);
const DIM_TEXT: Color = Color::Rgb(0x88, 0x88, 0x88);

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    /// Header background, scores and comment authors.
    #[serde(deserialize_with = "deserialize_color")]
    pub accent: Color,
    #[serde(deserialize_with = "deserialize_color")]
    pub header_fg: Color,
    #[serde(deserialize_with = "deserialize_color")]
    pub tab_active: Color,
    #[serde(deserialize_with = "deserialize_color")]
    pub tab_inactive: Color,
    #[serde(deserialize_with = "deserialize_color")]
    pub title: Color,
    #[serde(deserialize_with = "deserialize_color")]
    pub selected_title: Color,
    #[serde(deserialize_with = "deserialize_color")]
    pub domain: Color,
    #[serde(deserialize_with = "deserialize_color")]
    pub meta: Color,
    #[serde(deserialize_with = "deserialize_color")]
    pub comment_text: Color,
    #[serde(deserialize_with = "deserialize_color")]
    pub status_fg: Color,
    #[serde(deserialize_with = "deserialize_color")]
    pub status_bg: Color,
    #[serde(deserialize_with = "deserialize_color")]
    pub error: Color,
    #[serde(deserialize_with = "deserialize_palette")]
    pub depth_palette: Vec<Color>,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            accent: ORANGE,
            header_fg: Color::Black,
            tab_active: Color::White,
            tab_inactive: DIM_TEXT,
            title: Color::White,
            selected_title: ORANGE,
            domain: Color::Rgb(0x66, 0x66, 0x66),
            meta: DIM_TEXT,
            comment_text: Color::Rgb(0xCC, 0xCC, 0xCC),
            status_fg: DIM_TEXT,
            status_bg: Color::Rgb(0x33, 0x33, 0x33),
            error: Color::Rgb(0xFF, 0x00, 0x00),
            depth_palette: vec![
                ORANGE,
                Color::Rgb(0x4A, 0x9E, 0xFF),
                Color::Rgb(0x50, 0xC8, 0x78),
                Color::Rgb(0xFF, 0xD7, 0x00),
                Color::Rgb(0xFF, 0x69, 0xB4),
                Color::Rgb(0x93, 0x70, 0xDB),
            ],
        }
    }
}

impl ColorConfig {
    /// Rail color for a comment at `depth`, cycling through the palette.
    pub fn depth_color(&self, depth: usize) -> Color {
        if self.depth_palette.is_empty() {
            return self.accent;
        }
        self.depth_palette[depth % self.depth_palette.len()]
    }
}

fn deserialize_color<'de, D>(deserializer: D) -> Result<Color, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_color_string(&s).map_err(de::Error::custom)
}

fn deserialize_palette<'de, D>(deserializer: D) -> Result<Vec<Color>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<String>::deserialize(deserializer)?
        .iter()
        .map(|s| parse_color_string(s).map_err(de::Error::custom))
        .collect()
}

/// Parse a named color ("DarkGray", case-insensitive) or a "#RRGGBB" /
/// "#RGB" hex code.
pub fn parse_color_string(s: &str) -> Result<Color, String> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix('#') {
        return parse_hex_color(hex).ok_or_else(|| format!("Invalid hex color: {}", s));
    }

    let color = match s.to_lowercase().as_str() {
        "black" => Color::Black,
        "red" => Color::Red,
        "green" => Color::Green,
        "yellow" => Color::Yellow,
        "blue" => Color::Blue,
        "magenta" => Color::Magenta,
        "cyan" => Color::Cyan,
        "gray" | "grey" => Color::Gray,
        "darkgray" | "darkgrey" => Color::DarkGray,
        "lightred" => Color::LightRed,
        "lightgreen" => Color::LightGreen,
        "lightyellow" => Color::LightYellow,
        "lightblue" => Color::LightBlue,
        "lightmagenta" => Color::LightMagenta,
        "lightcyan" => Color::LightCyan,
        "white" => Color::White,
        "reset" => Color::Reset,
        _ => return Err(format!("Unknown color: {}", s)),
    };
    Ok(color)
}

fn parse_hex_color(hex: &str) -> Option<Color> {
    if !hex.is_ascii() {
        return None;
    }
    let channel = |digits: &str| u8::from_str_radix(digits, 16).ok();
    match hex.len() {
        6 => Some(Color::Rgb(
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
        )),
        // #RGB expands each digit, so F becomes FF
        3 => Some(Color::Rgb(
            channel(&hex[0..1])? * 17,
            channel(&hex[1..2])? * 17,
            channel(&hex[2..3])? * 17,
        )),
        _ => None,
    }
}
