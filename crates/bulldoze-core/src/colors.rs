//! Demolish-OK highlight colors per tool mode.
//!
//! Colors come from two exemplars the host's resource manager can load:
//!
//! - the model highlight exemplar, whose demolish-OK property overrides the
//!   game's built-in green;
//! - the bulldoze tuning exemplar, with one property per tool mode.
//!
//! Every property must be a float32 array of exactly four items (RGBA).

use strum::Display;
use tracing::{debug, error};

use crate::error::Error;

/// RGBA color with the layout of the host's `S3DColorFloat`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    /// The game's built-in demolish-OK green (RGBA 0, 179, 51, 77)
    pub const DEFAULT_DEMOLISH_OK: Color = Color::new(0.0, 0.7, 0.2, 0.3);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Parse a 4 item float array; any other length is rejected.
    pub fn from_rgba_slice(values: &[f32]) -> Option<Self> {
        match *values {
            [r, g, b, a] => Some(Self::new(r, g, b, a)),
            _ => None,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::new(1.0, 1.0, 1.0, 1.0)
    }
}

/// Type, group and instance id of a host resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    pub type_id: u32,
    pub group: u32,
    pub instance: u32,
}

impl ResourceKey {
    pub const fn new(type_id: u32, group: u32, instance: u32) -> Self {
        Self {
            type_id,
            group,
            instance,
        }
    }
}

/// "Model highlight properties" exemplar
pub const MODEL_HIGHLIGHT_EXEMPLAR: ResourceKey =
    ResourceKey::new(0x6534_284A, 0x690F_693F, 0x4A63_9EF2);

/// Bulldoze extensions tuning exemplar
pub const TUNING_EXEMPLAR: ResourceKey = ResourceKey::new(0x6534_284A, 0xF527_AC8F, 0x89EB_3FF3);

/// Property ids read by [`HighlightColors::init`]
pub mod properties {
    /// Undocumented demolish-OK color of the model highlight exemplar
    pub const GAME_DEMOLISH_OK: u32 = 0xEA63_9FBA;

    pub const NORMAL_HIGHLIGHT: u32 = 0x8FD9_4ED0;
    pub const FLORA_HIGHLIGHT: u32 = 0x8FD9_4ED1;
    pub const NETWORK_HIGHLIGHT: u32 = 0x8FD9_4ED2;
}

/// Value of an exemplar property, as far as this crate cares
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Float32Array(Vec<f32>),
    /// Any other variant type, identified by the host's type code
    Other(u16),
}

/// Read access to the properties of a loaded exemplar.
pub trait PropertyHolder {
    /// `None` when the property is absent or has no value
    fn property(&self, id: u32) -> Option<PropertyValue>;
}

/// Host resource manager seam.
pub trait ResourceManager {
    fn exemplar(&self, key: &ResourceKey) -> Option<Box<dyn PropertyHolder + '_>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum HighlightColorKind {
    Normal,
    Flora,
    Network,
}

/// Resolved demolish-OK colors, loaded once per city session.
#[derive(Debug, Clone)]
pub struct HighlightColors {
    normal: Color,
    flora: Color,
    network: Color,
    game_default: Color,
    initialized: bool,
}

impl Default for HighlightColors {
    fn default() -> Self {
        Self::new()
    }
}

impl HighlightColors {
    /// Colors before [`init`](Self::init) runs: everything at the built-in default
    pub fn new() -> Self {
        Self {
            normal: Color::DEFAULT_DEMOLISH_OK,
            flora: Color::DEFAULT_DEMOLISH_OK,
            network: Color::DEFAULT_DEMOLISH_OK,
            game_default: Color::DEFAULT_DEMOLISH_OK,
            initialized: false,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Resolve all colors. Does nothing when already initialized.
    ///
    /// Returns the malformed tuning properties; each one is also logged and
    /// leaves its color at the game default.
    pub fn init(&mut self, resources: Option<&dyn ResourceManager>) -> Vec<Error> {
        if self.initialized {
            return Vec::new();
        }
        self.initialized = true;

        let mut errors = Vec::new();

        self.game_default = Color::DEFAULT_DEMOLISH_OK;
        if let Some(exemplar) = resources.and_then(|rm| rm.exemplar(&MODEL_HIGHLIGHT_EXEMPLAR)) {
            // Malformed values here are ignored without logging
            let _ = read_color(
                exemplar.as_ref(),
                properties::GAME_DEMOLISH_OK,
                &mut self.game_default,
            );
        }

        self.normal = self.game_default;
        self.flora = self.game_default;
        self.network = self.game_default;

        if let Some(exemplar) = resources.and_then(|rm| rm.exemplar(&TUNING_EXEMPLAR)) {
            let targets = [
                (properties::NORMAL_HIGHLIGHT, &mut self.normal),
                (properties::FLORA_HIGHLIGHT, &mut self.flora),
                (properties::NETWORK_HIGHLIGHT, &mut self.network),
            ];
            for (id, color) in targets {
                if let Err(e) = read_color(exemplar.as_ref(), id, color) {
                    error!("{}", e);
                    errors.push(e);
                }
            }
        } else {
            debug!("Tuning exemplar not found, using the game's demolish color");
        }

        errors
    }

    pub fn shutdown(&mut self) {
        self.initialized = false;
    }

    pub fn demolish_ok_color(&self, kind: HighlightColorKind) -> Color {
        match kind {
            HighlightColorKind::Normal => self.normal,
            HighlightColorKind::Flora => self.flora,
            HighlightColorKind::Network => self.network,
        }
    }

    pub fn game_default(&self) -> Color {
        self.game_default
    }
}

/// Overwrite `color` from property `id`. An absent property is not an error.
fn read_color(holder: &dyn PropertyHolder, id: u32, color: &mut Color) -> Result<(), Error> {
    let Some(value) = holder.property(id) else {
        return Ok(());
    };

    let parsed = match &value {
        PropertyValue::Float32Array(values) => Color::from_rgba_slice(values),
        PropertyValue::Other(_) => None,
    };

    match parsed {
        Some(parsed) => {
            *color = parsed;
            Ok(())
        }
        None => Err(Error::TuningPropertyFormat { property_id: id }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[derive(Default)]
    struct FakeExemplar(HashMap<u32, PropertyValue>);

    impl PropertyHolder for FakeExemplar {
        fn property(&self, id: u32) -> Option<PropertyValue> {
            self.0.get(&id).cloned()
        }
    }

    #[derive(Default)]
    struct FakeResources {
        model_highlight: Option<HashMap<u32, PropertyValue>>,
        tuning: Option<HashMap<u32, PropertyValue>>,
    }

    impl ResourceManager for FakeResources {
        fn exemplar(&self, key: &ResourceKey) -> Option<Box<dyn PropertyHolder + '_>> {
            let props = if *key == MODEL_HIGHLIGHT_EXEMPLAR {
                self.model_highlight.as_ref()
            } else if *key == TUNING_EXEMPLAR {
                self.tuning.as_ref()
            } else {
                None
            }?;
            Some(Box::new(FakeExemplar(props.clone())))
        }
    }

    fn floats(values: &[f32]) -> PropertyValue {
        PropertyValue::Float32Array(values.to_vec())
    }

    #[test]
    fn test_without_resources_uses_builtin_default() {
        let mut colors = HighlightColors::new();
        let errors = colors.init(None);

        assert!(errors.is_empty());
        assert!(colors.is_initialized());
        for kind in [
            HighlightColorKind::Normal,
            HighlightColorKind::Flora,
            HighlightColorKind::Network,
        ] {
            assert_eq!(colors.demolish_ok_color(kind), Color::DEFAULT_DEMOLISH_OK);
        }
    }

    #[test]
    fn test_one_valid_and_one_malformed_property() {
        let resources = FakeResources {
            model_highlight: None,
            tuning: Some(HashMap::from([
                (properties::FLORA_HIGHLIGHT, floats(&[0.1, 0.2, 0.3, 0.4])),
                (properties::NETWORK_HIGHLIGHT, floats(&[0.5, 0.5, 0.5])),
            ])),
        };

        let mut colors = HighlightColors::new();
        let errors = colors.init(Some(&resources));

        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0],
            Error::TuningPropertyFormat {
                property_id: properties::NETWORK_HIGHLIGHT
            }
        ));
        assert_eq!(
            colors.demolish_ok_color(HighlightColorKind::Flora),
            Color::new(0.1, 0.2, 0.3, 0.4)
        );
        assert_eq!(
            colors.demolish_ok_color(HighlightColorKind::Network),
            Color::DEFAULT_DEMOLISH_OK
        );
        assert_eq!(
            colors.demolish_ok_color(HighlightColorKind::Normal),
            Color::DEFAULT_DEMOLISH_OK
        );
    }

    #[test]
    fn test_game_default_comes_from_model_highlight_exemplar() {
        let game_green = Color::new(0.0, 0.5, 0.0, 0.5);
        let resources = FakeResources {
            model_highlight: Some(HashMap::from([(
                properties::GAME_DEMOLISH_OK,
                floats(&[0.0, 0.5, 0.0, 0.5]),
            )])),
            tuning: Some(HashMap::from([(
                properties::NORMAL_HIGHLIGHT,
                floats(&[1.0, 0.0, 0.0, 0.3]),
            )])),
        };

        let mut colors = HighlightColors::new();
        assert!(colors.init(Some(&resources)).is_empty());

        assert_eq!(colors.game_default(), game_green);
        assert_eq!(
            colors.demolish_ok_color(HighlightColorKind::Normal),
            Color::new(1.0, 0.0, 0.0, 0.3)
        );
        assert_eq!(colors.demolish_ok_color(HighlightColorKind::Flora), game_green);
    }

    #[test]
    fn test_malformed_game_default_is_silent() {
        let resources = FakeResources {
            model_highlight: Some(HashMap::from([(
                properties::GAME_DEMOLISH_OK,
                PropertyValue::Other(0x0003),
            )])),
            tuning: None,
        };

        let mut colors = HighlightColors::new();
        assert!(colors.init(Some(&resources)).is_empty());
        assert_eq!(colors.game_default(), Color::DEFAULT_DEMOLISH_OK);
    }

    #[test]
    fn test_init_runs_once_until_shutdown() {
        let resources = FakeResources {
            model_highlight: None,
            tuning: Some(HashMap::from([(
                properties::NORMAL_HIGHLIGHT,
                PropertyValue::Other(0x0009),
            )])),
        };

        let mut colors = HighlightColors::new();
        assert_eq!(colors.init(Some(&resources)).len(), 1);
        assert!(colors.init(Some(&resources)).is_empty());

        colors.shutdown();
        assert!(!colors.is_initialized());
        assert_eq!(colors.init(Some(&resources)).len(), 1);
    }

    #[test]
    fn test_from_rgba_slice_requires_four_items() {
        assert_eq!(Color::from_rgba_slice(&[0.1, 0.2, 0.3]), None);
        assert_eq!(Color::from_rgba_slice(&[0.1, 0.2, 0.3, 0.4, 0.5]), None);
        assert_eq!(
            Color::from_rgba_slice(&[0.1, 0.2, 0.3, 0.4]),
            Some(Color::new(0.1, 0.2, 0.3, 0.4))
        );
    }
}
