use std::collections::HashMap;

use once_cell::sync::Lazy;

/// A fixed style preset. The catalog is defined at build time and never
/// user-editable; `prompt` is the text instruction handed to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadshotStyle {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub prompt: &'static str,
    pub swatch: &'static str,
}

pub static HEADSHOT_STYLES: [HeadshotStyle; 4] = [
    HeadshotStyle {
        id: "corporate-grey",
        name: "Corporate Grey",
        description: "Professional studio look with a neutral grey backdrop.",
        prompt: "professional corporate headshot, neutral grey studio background, high-end business attire, soft studio lighting, sharp focus, high resolution",
        swatch: "#94a3b8",
    },
    HeadshotStyle {
        id: "modern-tech",
        name: "Modern Tech Office",
        description: "Clean, bright office environment with soft bokeh.",
        prompt: "professional tech professional headshot, modern bright office background with soft bokeh, smart casual attire, natural window lighting, clean aesthetic, high resolution",
        swatch: "#dbeafe",
    },
    HeadshotStyle {
        id: "outdoor-natural",
        name: "Outdoor Natural",
        description: "Warm, natural light with a blurred greenery background.",
        prompt: "professional outdoor headshot, blurred park greenery background, warm natural sunlight, approachable smile, casual professional attire, high resolution",
        swatch: "#d1fae5",
    },
    HeadshotStyle {
        id: "executive-dark",
        name: "Executive Dark",
        description: "Sophisticated dark wood or library setting.",
        prompt: "executive professional headshot, dark wood library background, dramatic professional lighting, formal business attire, authoritative yet approachable, high resolution",
        swatch: "#292524",
    },
];

static STYLES_BY_ID: Lazy<HashMap<&'static str, &'static HeadshotStyle>> = Lazy::new(|| {
    HEADSHOT_STYLES
        .iter()
        .map(|style| (style.id, style))
        .collect()
});

pub fn find_style(id: &str) -> Option<&'static HeadshotStyle> {
    STYLES_BY_ID.get(id.trim()).copied()
}

/// Filename used when the final image is saved locally.
pub fn download_filename(style: &HeadshotStyle) -> String {
    format!("headshot-{}.png", style.id)
}
