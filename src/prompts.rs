pub const EDIT: &str = include_str!("../data/prompts/edit.txt");
pub const EDIT_RETRY: &str = include_str!("../data/prompts/edit_retry.txt");
pub const COMBINE_CREATIVE: &str = include_str!("../data/prompts/combine_creative.txt");
pub const COMBINE_EDIT: &str = include_str!("../data/prompts/combine_edit.txt");
pub const COMBINE_TEXT_ONLY: &str = include_str!("../data/prompts/combine_text_only.txt");

pub const EDIT_ADVISORY: &str = "The image edit could not be completed with the current request. \
     Try rewording the edit instructions.";
pub const COMBINE_ADVISORY: &str = "The current model can analyze images but does not reliably \
     generate a true composition of multiple images. A dedicated image-generation backend \
     (for example Stable Diffusion or DALL-E) is required for reliable results.";

/// Replace `{{key}}` placeholders in a template string.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{{{}}}}}", key), value);
    }
    result
}
