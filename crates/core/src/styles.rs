//! Style catalog and prompt templating
//!
//! Each named style wraps the user prompt in a template and replaces the
//! negative prompt with a fixed one. The `"None"` style passes both through.

use crate::error::{Error, Result};

/// Name of the pass-through style.
pub const NO_STYLE: &str = "None";

/// Placeholder substituted with the user prompt.
const PLACEHOLDER: &str = "{prompt}";

/// A named prompt template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleEntry {
    pub name: &'static str,
    pub prompt_template: &'static str,
    pub negative_prompt: &'static str,
}

impl StyleEntry {
    /// Render the template around `prompt`
    pub fn render(&self, prompt: &str) -> String {
        self.prompt_template.replacen(PLACEHOLDER, prompt, 1)
    }
}

pub static STYLES: [StyleEntry; 10] = [
    StyleEntry {
        name: NO_STYLE,
        prompt_template: "{prompt}",
        negative_prompt: "",
    },
    StyleEntry {
        name: "Cinematic",
        prompt_template: "cinematic still {prompt} . emotional, harmonious, vignette, highly detailed, high budget, bokeh, cinemascope, moody, epic, gorgeous, film grain, grainy",
        negative_prompt: "anime, cartoon, graphic, text, painting, crayon, graphite, abstract, glitch, deformed, mutated, ugly, disfigured",
    },
    StyleEntry {
        name: "Photographic",
        prompt_template: "cinematic photo {prompt} . 35mm photograph, film, bokeh, professional, 4k, highly detailed",
        negative_prompt: "drawing, painting, crayon, sketch, graphite, impressionist, noisy, blurry, soft, deformed, ugly",
    },
    StyleEntry {
        name: "Anime",
        prompt_template: "anime artwork {prompt} . anime style, key visual, vibrant, studio anime,  highly detailed",
        negative_prompt: "photo, deformed, black and white, realism, disfigured, low contrast",
    },
    StyleEntry {
        name: "Manga",
        prompt_template: "manga style {prompt} . vibrant, high-energy, detailed, iconic, Japanese comic style",
        negative_prompt: "ugly, deformed, noisy, blurry, low contrast, realism, photorealistic, Western comic style",
    },
    StyleEntry {
        name: "Digital Art",
        prompt_template: "concept art {prompt} . digital artwork, illustrative, painterly, matte painting, highly detailed",
        negative_prompt: "photo, photorealistic, realism, ugly",
    },
    StyleEntry {
        name: "Pixel Art",
        prompt_template: "pixel-art {prompt} . low-res, blocky, pixel art style, 8-bit graphics",
        negative_prompt: "sloppy, messy, blurry, noisy, highly detailed, ultra textured, photo, realistic",
    },
    StyleEntry {
        name: "Fantasy Art",
        prompt_template: "ethereal fantasy concept art of  {prompt} . magnificent, celestial, ethereal, painterly, epic, majestic, magical, fantasy art, cover art, dreamy",
        negative_prompt: "photographic, realistic, realism, 35mm film, dslr, cropped, frame, text, deformed, glitch, noise, noisy, off-center, deformed, cross-eyed, closed eyes, bad anatomy, ugly, disfigured, sloppy, duplicate, mutated, black and white",
    },
    StyleEntry {
        name: "Neonpunk",
        prompt_template: "neonpunk style {prompt} . cyberpunk, vaporwave, neon, vibes, vibrant, stunningly beautiful, crisp, detailed, sleek, ultramodern, magenta highlights, dark purple shadows, high contrast, cinematic, ultra detailed, intricate, professional",
        negative_prompt: "painting, drawing, illustration, glitch, deformed, mutated, cross-eyed, ugly, disfigured",
    },
    StyleEntry {
        name: "3D Model",
        prompt_template: "professional 3d model {prompt} . octane render, highly detailed, volumetric, dramatic lighting",
        negative_prompt: "ugly, deformed, noisy, low poly, blurry, painting",
    },
];

/// Prompt pair after styling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledPrompt {
    pub prompt: String,
    pub negative_prompt: Option<String>,
}

/// Look up a style by exact name
pub fn find_style(name: &str) -> Option<&'static StyleEntry> {
    STYLES.iter().find(|style| style.name == name)
}

/// Names of every catalog entry, in catalog order
pub fn style_names() -> impl Iterator<Item = &'static str> {
    STYLES.iter().map(|style| style.name)
}

/// Apply a named style to a prompt pair.
///
/// A named style always replaces the caller's negative prompt with its own.
pub fn apply_style(
    style_name: &str,
    prompt: &str,
    negative_prompt: Option<&str>,
) -> Result<StyledPrompt> {
    if style_name == NO_STYLE {
        return Ok(StyledPrompt {
            prompt: prompt.to_string(),
            negative_prompt: negative_prompt.map(str::to_string),
        });
    }

    let style =
        find_style(style_name).ok_or_else(|| Error::UnknownStyle(style_name.to_string()))?;

    Ok(StyledPrompt {
        prompt: style.render(prompt),
        negative_prompt: Some(style.negative_prompt.to_string()),
    })
}
