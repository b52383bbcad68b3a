//! Representations and their per-type configuration.
//!
//! A repr is a named way of drawing an rprim (`hull`, `refined`, `wire`...).
//! Each rprim type keeps a [`ReprDescConfig`] mapping repr names to a style
//! descriptor; the first time an rprim is synced with a given repr it builds a
//! [`Repr`] holding one [`DrawItem`] per valid descriptor.

use hydrant_core::Token;

use crate::draw_item::DrawItem;

/// An ordered list of draw items.
#[derive(Debug, Default)]
pub struct Repr {
    draw_items: Vec<DrawItem>,
}

impl Repr {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a draw item and return its index.
    pub fn add_draw_item(&mut self, item: DrawItem) -> usize {
        self.draw_items.push(item);
        self.draw_items.len() - 1
    }

    pub fn draw_items(&self) -> &[DrawItem] {
        &self.draw_items
    }

    pub fn draw_items_mut(&mut self) -> &mut [DrawItem] {
        &mut self.draw_items
    }

    pub fn draw_item(&self, index: usize) -> Option<&DrawItem> {
        self.draw_items.get(index)
    }

    pub fn draw_item_mut(&mut self, index: usize) -> Option<&mut DrawItem> {
        self.draw_items.get_mut(index)
    }
}

/// Ordered `(name, repr)` pairs of one rprim.
pub type ReprList = Vec<(Token, Repr)>;

/// Find the repr named `name`.
pub fn find_repr<'a>(reprs: &'a ReprList, name: &Token) -> Option<&'a Repr> {
    reprs.iter().find(|(n, _)| n == name).map(|(_, r)| r)
}

// ============================================================================
// Descriptors
// ============================================================================

/// Drawing style of a basis curves repr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BasisCurvesGeomStyle {
    /// No draw item.
    #[default]
    Invalid,
    /// Polyline through the control points, drawn from the hull indices.
    Line,
    /// Evaluated curves, drawn from the refined indices.
    Refined,
}

/// Style descriptor of a basis curves repr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BasisCurvesReprDesc {
    pub geom_style: BasisCurvesGeomStyle,
}

impl BasisCurvesReprDesc {
    pub const fn new(geom_style: BasisCurvesGeomStyle) -> Self {
        Self { geom_style }
    }

    pub fn is_valid(&self) -> bool {
        self.geom_style != BasisCurvesGeomStyle::Invalid
    }
}

/// Drawing style of an image plane repr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImagePlaneGeomStyle {
    #[default]
    Invalid,
    /// Textured quad.
    Surface,
}

/// Style descriptor of an image plane repr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ImagePlaneReprDesc {
    pub geom_style: ImagePlaneGeomStyle,
}

impl ImagePlaneReprDesc {
    pub const fn new(geom_style: ImagePlaneGeomStyle) -> Self {
        Self { geom_style }
    }

    pub fn is_valid(&self) -> bool {
        self.geom_style != ImagePlaneGeomStyle::Invalid
    }
}

/// Repr name to descriptor list, in configuration order.
#[derive(Debug, Clone)]
pub struct ReprDescConfig<D> {
    entries: Vec<(Token, Vec<D>)>,
}

impl<D> Default for ReprDescConfig<D> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<D: Clone> ReprDescConfig<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure `name`. Reconfiguring a name replaces its descriptors.
    pub fn append(&mut self, name: Token, descs: Vec<D>) {
        if let Some((_, existing)) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            log::debug!("reconfiguring repr {name}");
            *existing = descs;
        } else {
            self.entries.push((name, descs));
        }
    }

    /// Descriptors of `name`; empty when the repr is not configured.
    pub fn find(&self, name: &Token) -> &[D] {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, descs)| descs.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains(&self, name: &Token) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &Token> {
        self.entries.iter().map(|(n, _)| n)
    }
}

/// Repr configuration of every rprim type in one render index.
#[derive(Debug, Clone, Default)]
pub struct ReprConfigs {
    pub basis_curves: ReprDescConfig<BasisCurvesReprDesc>,
    pub image_plane: ReprDescConfig<ImagePlaneReprDesc>,
}

impl ReprConfigs {
    /// The stock repr set: `hull` and `wire` draw hulls, `refined` and
    /// `smoothHull` draw evaluated curves; image planes draw a surface for each.
    pub fn with_defaults(force_refined_curves: bool) -> Self {
        use hydrant_core::tokens;

        let mut configs = Self::default();
        for (name, style) in [
            (tokens::HULL, BasisCurvesGeomStyle::Line),
            (tokens::WIRE, BasisCurvesGeomStyle::Line),
            (tokens::SMOOTH_HULL, BasisCurvesGeomStyle::Refined),
            (tokens::REFINED, BasisCurvesGeomStyle::Refined),
        ] {
            configs.configure_basis_curves(
                name.clone(),
                BasisCurvesReprDesc::new(style),
                force_refined_curves,
            );
            configs
                .image_plane
                .append(name, vec![ImagePlaneReprDesc::new(ImagePlaneGeomStyle::Surface)]);
        }
        configs
    }

    /// Configure a basis curves repr. Forced refinement turns every valid
    /// style into [`BasisCurvesGeomStyle::Refined`].
    pub fn configure_basis_curves(
        &mut self,
        name: Token,
        mut desc: BasisCurvesReprDesc,
        force_refined_curves: bool,
    ) {
        if force_refined_curves && desc.is_valid() {
            desc.geom_style = BasisCurvesGeomStyle::Refined;
        }
        self.basis_curves.append(name, vec![desc]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hydrant_core::tokens;

    #[test]
    fn find_missing_repr_is_empty() {
        let config = ReprDescConfig::<BasisCurvesReprDesc>::new();
        assert!(config.find(&tokens::HULL).is_empty());
        assert!(!config.contains(&tokens::HULL));
    }

    #[test]
    fn append_replaces() {
        let mut config = ReprDescConfig::new();
        config.append(tokens::HULL, vec![BasisCurvesReprDesc::new(BasisCurvesGeomStyle::Line)]);
        config.append(tokens::HULL, vec![BasisCurvesReprDesc::new(BasisCurvesGeomStyle::Refined)]);
        assert_eq!(config.find(&tokens::HULL).len(), 1);
        assert_eq!(config.find(&tokens::HULL)[0].geom_style, BasisCurvesGeomStyle::Refined);
        assert_eq!(config.names().count(), 1);
    }

    #[test]
    fn forced_refinement_rewrites_styles() {
        let configs = ReprConfigs::with_defaults(true);
        for name in [tokens::HULL, tokens::WIRE, tokens::REFINED] {
            assert_eq!(
                configs.basis_curves.find(&name)[0].geom_style,
                BasisCurvesGeomStyle::Refined
            );
        }

        let mut configs = ReprConfigs::default();
        configs.configure_basis_curves(
            Token::new("off"),
            BasisCurvesReprDesc::new(BasisCurvesGeomStyle::Invalid),
            true,
        );
        assert!(!configs.basis_curves.find(&Token::new("off"))[0].is_valid());
    }

    #[test]
    fn default_styles() {
        let configs = ReprConfigs::with_defaults(false);
        assert_eq!(
            configs.basis_curves.find(&tokens::HULL)[0].geom_style,
            BasisCurvesGeomStyle::Line
        );
        assert!(configs.image_plane.find(&tokens::REFINED)[0].is_valid());
    }
}
