/// Plot colors and egui visuals for the viewer.
///
/// Light is the default; Dark swaps to a low-glare palette for the same roles.

use egui::Color32;

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum AppTheme {
    Light,
    Dark,
}

impl AppTheme {
    pub fn label(&self) -> &'static str {
        match self {
            AppTheme::Light => "☀ Light",
            AppTheme::Dark => "☾ Dark",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            AppTheme::Light => AppTheme::Dark,
            AppTheme::Dark => AppTheme::Light,
        }
    }
}

/// Colors for every role the plots draw
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotColors {
    pub plot_bg: Color32,
    pub frame: Color32,
    pub grid: Color32,
    pub tick_text: Color32,

    pub spectrum_line: Color32,
    pub reconstruction: Color32,
    pub baseline: Color32,
    pub simulated: Color32,
    pub peak_marker: Color32,
    pub peak_label: Color32,
    pub phase_anchor: Color32,

    pub contour_positive: Color32,
    pub contour_negative: Color32,
    pub inset_frame: Color32,

    pub is_dark: bool,
}

impl PlotColors {
    pub fn from_theme(theme: AppTheme) -> Self {
        match theme {
            AppTheme::Light => Self {
                plot_bg: Color32::WHITE,
                frame: Color32::from_rgb(0x64, 0x64, 0x6E),
                grid: Color32::from_rgb(0xE6, 0xE6, 0xEB),
                tick_text: Color32::from_rgb(0x3C, 0x3C, 0x46),
                spectrum_line: Color32::from_rgb(0x1A, 0x47, 0x80),
                reconstruction: Color32::from_rgb(0x27, 0x8B, 0x4A),
                baseline: Color32::from_rgb(0xB8, 0x3A, 0x3A),
                simulated: Color32::from_rgb(0xCC, 0x66, 0x00),
                peak_marker: Color32::from_rgb(0xD0, 0x30, 0x30),
                peak_label: Color32::from_rgb(0xA0, 0x20, 0x20),
                phase_anchor: Color32::from_rgb(0x00, 0xCC, 0x66),
                contour_positive: Color32::from_rgb(0x1A, 0x47, 0x80),
                contour_negative: Color32::from_rgb(0xB8, 0x3A, 0x3A),
                inset_frame: Color32::from_rgb(0x44, 0x48, 0x52),
                is_dark: false,
            },
            AppTheme::Dark => Self {
                plot_bg: Color32::from_rgb(0x12, 0x10, 0x22),
                frame: Color32::from_rgb(0x6A, 0x68, 0x80),
                grid: Color32::from_rgb(0x22, 0x20, 0x38),
                tick_text: Color32::from_rgb(0xA0, 0x9E, 0xB8),
                spectrum_line: Color32::from_rgb(0x00, 0xE5, 0xFF),
                reconstruction: Color32::from_rgb(0x00, 0xFF, 0x88),
                baseline: Color32::from_rgb(0x8B, 0x5C, 0xF6),
                simulated: Color32::from_rgb(0xFF, 0x8C, 0x00),
                peak_marker: Color32::from_rgb(0xFF, 0xD6, 0x00),
                peak_label: Color32::from_rgb(0xFF, 0xC0, 0x00),
                phase_anchor: Color32::from_rgb(0x00, 0xFF, 0x88),
                contour_positive: Color32::from_rgb(0x00, 0xE5, 0xFF),
                contour_negative: Color32::from_rgb(0xFF, 0x00, 0x8C),
                inset_frame: Color32::from_rgb(0xE0, 0xE0, 0xF0),
                is_dark: true,
            },
        }
    }
}

/// Color32 → normalized RGBA for shader uniforms
pub fn to_rgba(c: Color32) -> [f32; 4] {
    let [r, g, b, a] = c.to_srgba_unmultiplied();
    [r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, a as f32 / 255.0]
}

/// One color per contour level, fading the lowest levels towards white
pub fn level_colors(base: Color32, levels: usize) -> Vec<[f32; 4]> {
    let [r, g, b, a] = to_rgba(base);
    (0..levels)
        .map(|l| {
            let t = if levels <= 1 {
                1.0
            } else {
                0.4 + 0.6 * l as f32 / (levels - 1) as f32
            };
            [1.0 - t * (1.0 - r), 1.0 - t * (1.0 - g), 1.0 - t * (1.0 - b), a]
        })
        .collect()
}

pub fn apply_theme(ctx: &egui::Context, theme: AppTheme) {
    let c = PlotColors::from_theme(theme);
    let mut visuals = if c.is_dark {
        egui::Visuals::dark()
    } else {
        egui::Visuals::light()
    };
    visuals.extreme_bg_color = c.plot_bg;
    visuals.widgets.noninteractive.corner_radius = egui::CornerRadius::same(3);
    visuals.widgets.inactive.corner_radius = egui::CornerRadius::same(4);
    ctx.set_visuals(visuals);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_colors_fade_up_to_base() {
        let colors = level_colors(Color32::from_rgb(0, 0, 255), 3);
        assert_eq!(colors.len(), 3);
        assert!(colors[2][0].abs() < 1e-6 && (colors[2][2] - 1.0).abs() < 1e-6);
        assert!(colors[0][0] > colors[1][0]);
    }

    #[test]
    fn test_theme_cycle() {
        assert_eq!(AppTheme::Light.next().next(), AppTheme::Light);
        assert!(PlotColors::from_theme(AppTheme::Dark).is_dark);
    }
}
