use crate::material::MaterialKind;

use super::{super::GltfParser, GltfPlugin, KHR_MATERIALS_UNLIT};

/// Selects the unlit model for materials carrying the extension.
pub struct UnlitPlugin {
    /// Set from `AssetLoadParams::disable_unlit`. The extension is still
    /// recognized, but such materials keep the standard model.
    pub disabled: bool,
}

impl GltfPlugin for UnlitPlugin {
    fn name(&self) -> &str {
        KHR_MATERIALS_UNLIT
    }

    fn material_kind(&self, parser: &GltfParser, index: usize) -> Option<MaterialKind> {
        if self.disabled {
            return None;
        }
        let material = parser.document().material(index).ok()?;
        material
            .extensions
            .contains_key(KHR_MATERIALS_UNLIT)
            .then_some(MaterialKind::Unlit)
    }
}
