//! Source templates and placeholder substitution

use crate::error::{Result, SigbindError};

pub const MOD_ROOT: &str = include_str!("templates/mod_root.rs.tpl");
pub const FFI: &str = include_str!("templates/ffi.rs.tpl");
pub const BASE: &str = include_str!("templates/base.rs.tpl");
pub const FACTORY: &str = include_str!("templates/factory.rs.tpl");
pub const TYPES_MOD: &str = include_str!("templates/types_mod.rs.tpl");
pub const AUDIO_VECTOR: &str = include_str!("templates/audio_vector.rs.tpl");
pub const EXCEPTIONS: &str = include_str!("templates/exceptions.rs.tpl");
pub const UTILS_MOD: &str = include_str!("templates/utils_mod.rs.tpl");
pub const AUDIO_UTILS: &str = include_str!("templates/audio_utils.rs.tpl");
pub const ALGORITHMS_MOD: &str = include_str!("templates/algorithms_mod.rs.tpl");
pub const CATEGORY_MOD: &str = include_str!("templates/category_mod.rs.tpl");
pub const ALGORITHM: &str = include_str!("templates/algorithm.rs.tpl");

/// Replace every `{{KEY}}` in `template`
///
/// Fails if a placeholder is left over, so a missing value never reaches
/// the output.
pub fn render(template: &str, values: &[(&str, &str)]) -> Result<String> {
    let mut out = template.to_string();
    for (key, value) in values {
        out = out.replace(&format!("{{{{{}}}}}", key), value);
    }

    if let Some(start) = out.find("{{") {
        let rest = &out[start..];
        let placeholder = rest.find("}}").map_or(rest, |end| &rest[..end + 2]);
        return Err(SigbindError::InvalidTemplateInput {
            reason: format!("unresolved placeholder {}", placeholder),
        });
    }
    Ok(out)
}

/// Prefix each line of `text` for use inside a `//!` doc block
pub fn doc_lines(text: &str) -> String {
    text.lines()
        .map(|line| {
            let line = line.trim_end();
            if line.is_empty() {
                "//!".to_string()
            } else {
                format!("//! {}", line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
