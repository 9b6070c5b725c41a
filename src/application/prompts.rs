//! 提示词模板与用户可见文案

use crate::domain::comic::Character;

pub const MSG_CHARACTER_REQUIRED: &str = "Please create a character for this project first.";
pub const MSG_LOAD_FAILED: &str = "Could not load saved projects.";
pub const MSG_SAVE_FAILED: &str = "There was an issue saving your work.";

/// 角色参考图提示词
pub fn character_sheet_prompt(prompt: &str, style: &str) -> String {
    format!(
        "{prompt}, in the style of {style}. Character sheet, full body view, multiple angles, neutral background."
    )
}

/// 分镜提示词（与参考图一起发送）
pub fn panel_prompt(character: &Character, scene: &str) -> String {
    format!(
        "Scene: {scene}. Draw the character described as \"{}\" in a \"{}\" style, maintaining their appearance from the provided reference image.",
        character.prompt(),
        character.style()
    )
}

pub fn character_failure(reason: &str) -> String {
    format!("Failed to generate character sheet. Details: {reason}")
}

pub fn panel_failure(reason: &str) -> String {
    format!("Failed to generate panel image. Details: {reason}")
}
