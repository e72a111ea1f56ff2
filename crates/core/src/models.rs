//! PixArt checkpoint presets

pub const PIXART_XL_1024: &str = "PixArt-alpha/PixArt-XL-2-1024-MS";
pub const PIXART_LCM_XL_1024: &str = "PixArt-alpha/PixArt-LCM-XL-2-1024-MS";
pub const PIXART_XL_512: &str = "PixArt-alpha/PixArt-XL-2-512x512";

/// Checkpoints selectable without the custom-model flag. The same list is
/// offered for text encoders.
pub static PRESET_MODELS: [&str; 3] = [PIXART_XL_1024, PIXART_LCM_XL_1024, PIXART_XL_512];

pub const DEFAULT_MODEL: &str = PIXART_XL_1024;

pub fn is_preset(model_id: &str) -> bool {
    PRESET_MODELS.contains(&model_id)
}

/// Pick the effective identifier: the custom one when the flag is set,
/// otherwise the preset choice.
pub fn resolve_model_id<'a>(preset: &'a str, use_custom: bool, custom: &'a str) -> &'a str {
    if use_custom {
        custom
    } else {
        preset
    }
}
