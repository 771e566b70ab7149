//! Name→factory lookup across four disjoint generator categories.
//!
//! Factories return fully applied, tagged evaluators. Category membership is
//! recorded here at registration time and is never re-derived from the name.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::{
    core::{Canvas, PixelBuffer, Rgba8},
    error::{WeftError, WeftResult},
    sim::SimState,
    vocab::{self, AutomatonRule},
};

/// Samples one color per integer coordinate pair.
pub type TextureEval = Arc<dyn Fn(u32, u32) -> Rgba8>;

/// One image in, one image out.
pub type FilterEval = Box<dyn Fn(&PixelBuffer) -> WeftResult<PixelBuffer>>;

/// Two images in, one image out.
pub type DoubleFilterEval = Box<dyn Fn(&PixelBuffer, &PixelBuffer) -> WeftResult<PixelBuffer>>;

/// Pure successor function over simulation state.
pub type StepFn = Arc<dyn Fn(&SimState) -> SimState>;

/// Colors one pixel from the captured simulation state.
pub type ShaderFn = Arc<dyn Fn(&SimState, u32, u32) -> Rgba8>;

/// Builds a fresh initial state; the argument is the reseed generation
/// (0 on animation start).
pub type InitFn = Arc<dyn Fn(u64) -> SimState>;

/// Rebuild-the-stream-from-scratch policy for long-running automata that
/// would otherwise settle into a visually static state. Applied by the
/// animation driver, above the state stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ReseedPolicy {
    /// Reseed once per this many simulation steps.
    pub every: u64,
}

/// Everything the animation driver needs: initial state, pure step fn, the
/// seconds-per-step cadence, and a per-pixel shader over the captured state.
pub struct AnimationSpec {
    pub name: String,
    pub step_duration: f64,
    pub init: InitFn,
    pub step: StepFn,
    pub shader: ShaderFn,
    pub reseed: Option<ReseedPolicy>,
}

impl fmt::Debug for AnimationSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimationSpec")
            .field("name", &self.name)
            .field("step_duration", &self.step_duration)
            .field("reseed", &self.reseed)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Category {
    Texture,
    Filter,
    DoubleFilter,
    Animation,
}

/// One resolved generator parameter. Built by the resolver, consumed by
/// factories; never shared across resolve calls.
#[derive(Clone)]
pub enum ParamValue {
    Json(serde_json::Value),
    Color(Rgba8),
    /// A nested texture/filter call bound as a dynamic color source.
    ColorSource(TextureEval),
    Rule(AutomatonRule),
}

impl fmt::Debug for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(v) => f.debug_tuple("Json").field(v).finish(),
            Self::Color(c) => f.debug_tuple("Color").field(c).finish(),
            Self::ColorSource(_) => f.write_str("ColorSource(..)"),
            Self::Rule(r) => f.debug_tuple("Rule").field(r).finish(),
        }
    }
}

/// A color argument as a factory sees it: either a constant or a sampled
/// sub-texture.
#[derive(Clone)]
pub enum ColorParam {
    Const(Rgba8),
    Source(TextureEval),
}

impl ColorParam {
    pub fn at(&self, x: u32, y: u32) -> Rgba8 {
        match self {
            Self::Const(c) => *c,
            Self::Source(eval) => eval(x, y),
        }
    }
}

/// Flat name→value map of a generator's constructor arguments. Transient:
/// built per resolve call and dropped once the factory has run.
#[derive(Debug, Default)]
pub struct ResolvedParams {
    map: BTreeMap<String, ParamValue>,
}

impl ResolvedParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ParamValue) {
        self.map.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.map.get(name)
    }

    pub fn f64(&self, name: &str, default: f64) -> f64 {
        match self.map.get(name) {
            Some(ParamValue::Json(v)) => v.as_f64().unwrap_or(default),
            _ => default,
        }
    }

    pub fn u32(&self, name: &str, default: u32) -> u32 {
        match self.map.get(name) {
            Some(ParamValue::Json(v)) => v
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(default),
            _ => default,
        }
    }

    pub fn u64(&self, name: &str, default: u64) -> u64 {
        match self.map.get(name) {
            Some(ParamValue::Json(v)) => v.as_u64().unwrap_or(default),
            _ => default,
        }
    }

    pub fn color(&self, name: &str, default: Rgba8) -> ColorParam {
        match self.map.get(name) {
            Some(ParamValue::Color(c)) => ColorParam::Const(*c),
            Some(ParamValue::ColorSource(eval)) => ColorParam::Source(eval.clone()),
            Some(ParamValue::Json(v)) => {
                ColorParam::Const(color_from_json(v).unwrap_or(default))
            }
            _ => ColorParam::Const(default),
        }
    }

    pub fn rule(&self, name: &str, default: AutomatonRule) -> AutomatonRule {
        match self.map.get(name) {
            Some(ParamValue::Rule(r)) => *r,
            Some(ParamValue::Json(serde_json::Value::String(s))) => vocab::rule_by_name(s),
            _ => default,
        }
    }
}

/// Decodes a `[r, g, b, a]` byte array. `None` for non-array values, wrong
/// arity, or out-of-range channels; callers decide whether that is an error.
pub fn color_from_json(value: &serde_json::Value) -> Option<Rgba8> {
    let arr = value.as_array()?;
    let mut channels = [0u8; 4];
    if arr.len() != 4 {
        return None;
    }
    for (slot, v) in channels.iter_mut().zip(arr) {
        *slot = v.as_u64().and_then(|n| u8::try_from(n).ok())?;
    }
    Some(Rgba8::from(channels))
}

pub type TextureFactory = Box<dyn Fn(&ResolvedParams, Canvas) -> WeftResult<TextureEval>>;
pub type FilterFactory = Box<dyn Fn(&ResolvedParams) -> WeftResult<FilterEval>>;
pub type DoubleFilterFactory = Box<dyn Fn(&ResolvedParams) -> WeftResult<DoubleFilterEval>>;
pub type AnimationFactory = Box<dyn Fn(&ResolvedParams, Canvas) -> WeftResult<AnimationSpec>>;

/// Four disjoint name→factory maps. Populated externally (or via
/// [`Registry::with_builtins`]); factories must be pure.
#[derive(Default)]
pub struct Registry {
    textures: BTreeMap<String, TextureFactory>,
    filters: BTreeMap<String, FilterFactory>,
    double_filters: BTreeMap<String, DoubleFilterFactory>,
    animations: BTreeMap<String, AnimationFactory>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with the built-in generator set.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::builtin::install(&mut registry);
        registry
    }

    pub fn register_texture(&mut self, name: impl Into<String>, factory: TextureFactory) {
        self.textures.insert(name.into(), factory);
    }

    pub fn register_filter(&mut self, name: impl Into<String>, factory: FilterFactory) {
        self.filters.insert(name.into(), factory);
    }

    pub fn register_double_filter(
        &mut self,
        name: impl Into<String>,
        factory: DoubleFilterFactory,
    ) {
        self.double_filters.insert(name.into(), factory);
    }

    pub fn register_animation(&mut self, name: impl Into<String>, factory: AnimationFactory) {
        self.animations.insert(name.into(), factory);
    }

    /// Category of `name`, checked in the fixed precedence
    /// Texture > Filter > DoubleFilter > Animation. The maps are disjoint by
    /// construction, so precedence only matters for a misbuilt registry.
    pub fn classify(&self, name: &str) -> Option<Category> {
        if self.textures.contains_key(name) {
            Some(Category::Texture)
        } else if self.filters.contains_key(name) {
            Some(Category::Filter)
        } else if self.double_filters.contains_key(name) {
            Some(Category::DoubleFilter)
        } else if self.animations.contains_key(name) {
            Some(Category::Animation)
        } else {
            None
        }
    }

    /// True for names the resolver treats as image-producing structural keys.
    pub fn is_structural(&self, name: &str) -> bool {
        matches!(
            self.classify(name),
            Some(Category::Texture | Category::Filter | Category::DoubleFilter)
        )
    }

    pub fn texture(
        &self,
        name: &str,
        params: &ResolvedParams,
        canvas: Canvas,
    ) -> WeftResult<TextureEval> {
        let factory = self
            .textures
            .get(name)
            .ok_or_else(|| WeftError::unknown_operator(name))?;
        factory(params, canvas)
    }

    pub fn filter(&self, name: &str, params: &ResolvedParams) -> WeftResult<FilterEval> {
        let factory = self
            .filters
            .get(name)
            .ok_or_else(|| WeftError::unknown_operator(name))?;
        factory(params)
    }

    pub fn double_filter(
        &self,
        name: &str,
        params: &ResolvedParams,
    ) -> WeftResult<DoubleFilterEval> {
        let factory = self
            .double_filters
            .get(name)
            .ok_or_else(|| WeftError::unknown_operator(name))?;
        factory(params)
    }

    pub fn animation(
        &self,
        name: &str,
        params: &ResolvedParams,
        canvas: Canvas,
    ) -> WeftResult<AnimationSpec> {
        let factory = self
            .animations
            .get(name)
            .ok_or_else(|| WeftError::unknown_operator(name))?;
        factory(params, canvas)
    }

    /// Canonical list of every registered name with its category.
    pub fn known_names(&self) -> Vec<(&str, Category)> {
        let mut names: Vec<(&str, Category)> = Vec::new();
        names.extend(self.textures.keys().map(|n| (n.as_str(), Category::Texture)));
        names.extend(self.filters.keys().map(|n| (n.as_str(), Category::Filter)));
        names.extend(
            self.double_filters
                .keys()
                .map(|n| (n.as_str(), Category::DoubleFilter)),
        );
        names.extend(
            self.animations
                .keys()
                .map(|n| (n.as_str(), Category::Animation)),
        );
        names
    }
}
