//! The expression resolver: walks one declarative config node and turns it
//! into a concrete image or an animation spec.
//!
//! A node is a JSON-shaped dictionary with no fixed schema; what a key means
//! is decided by registry lookup. The walker runs in one of three modes:
//!
//! - **full**: resolve the first structural key into an image (or animation);
//! - **params-only**: structural interpretation suppressed, every key is
//!   gathered as a constructor argument ([`Resolver::params_only`]);
//! - **search**: report structural key names without resolving them, used by
//!   the double-filter binding protocol ([`Resolver::structural_candidates`]).

use std::sync::Arc;

use serde_json::Value;

use crate::{
    core::{Canvas, PixelBuffer},
    error::{WeftError, WeftResult},
    rasterize::rasterize,
    registry::{self, AnimationSpec, Category, ParamValue, Registry, ResolvedParams, TextureEval},
    vocab,
};

/// One dictionary-shaped node of the declarative input tree.
pub type ConfigNode = serde_json::Map<String, Value>;

/// Outcome of a full-mode resolve.
#[derive(Debug)]
pub enum Resolved {
    Image(PixelBuffer),
    Animation(AnimationSpec),
}

impl Resolved {
    fn into_image(self, context: &str) -> WeftResult<PixelBuffer> {
        match self {
            Self::Image(img) => Ok(img),
            Self::Animation(spec) => Err(WeftError::validation(format!(
                "animation '{}' cannot be used as {context}",
                spec.name
            ))),
        }
    }
}

pub struct Resolver<'r> {
    registry: &'r Registry,
    canvas: Canvas,
}

impl<'r> Resolver<'r> {
    pub fn new(registry: &'r Registry, canvas: Canvas) -> Self {
        Self { registry, canvas }
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Resolves a whole tree. Errors abort the walk; no partial images.
    #[tracing::instrument(skip(self, node))]
    pub fn resolve(&self, node: &ConfigNode) -> WeftResult<Resolved> {
        self.resolve_node(node, None)
    }

    /// Convenience for static trees; rejects animation roots.
    pub fn resolve_image(&self, node: &ConfigNode) -> WeftResult<PixelBuffer> {
        self.resolve(node)?.into_image("a static image")
    }

    /// Full-mode walk: first structural key wins, in iteration order.
    /// `exclude` skips one key by its literal name (double-filter protocol).
    fn resolve_node(&self, node: &ConfigNode, exclude: Option<&str>) -> WeftResult<Resolved> {
        for (key, value) in node {
            if exclude == Some(key.as_str()) {
                continue;
            }
            if let Some(result) = self.resolve_key(key, value) {
                return result;
            }
        }
        Err(WeftError::missing_operand(
            "node contains no structural key",
        ))
    }

    /// Interprets one key. `None` means the key is a parameter, not a
    /// structural invocation.
    fn resolve_key(&self, key: &str, value: &Value) -> Option<WeftResult<Resolved>> {
        // `dup_<name>` behaves as a texture key on `<name>`, letting the same
        // generator appear under several distinct keys in one node.
        if let Some(name) = key.strip_prefix("dup_") {
            return Some(match self.registry.classify(name) {
                Some(Category::Texture) => self.invoke_texture(name, value),
                _ => Err(WeftError::unknown_operator(name)),
            });
        }
        match self.registry.classify(key)? {
            Category::Texture => Some(self.invoke_texture(key, value)),
            Category::Filter => Some(self.invoke_filter(key, value)),
            Category::DoubleFilter => Some(self.invoke_double_filter(key, value)),
            Category::Animation => Some(self.invoke_animation(key, value)),
        }
    }

    fn invoke_texture(&self, name: &str, value: &Value) -> WeftResult<Resolved> {
        tracing::debug!(name, "texture");
        let params = self.params_of(value)?;
        let eval = self.registry.texture(name, &params, self.canvas)?;
        Ok(Resolved::Image(rasterize(&eval, self.canvas)))
    }

    /// The value is resolved twice: params-only for the filter's own
    /// arguments, then full mode for the single input image.
    fn invoke_filter(&self, name: &str, value: &Value) -> WeftResult<Resolved> {
        tracing::debug!(name, "filter");
        let body = value
            .as_object()
            .ok_or_else(|| WeftError::missing_operand(format!("filter '{name}' has no body")))?;
        let params = self.params_only(body)?;
        let input = self
            .resolve_node(body, None)
            .map_err(|e| contextualize(e, name))?
            .into_image("a filter input")?;
        let filter = self.registry.filter(name, &params)?;
        let output = filter(&input)?;
        self.check_dims(output)
    }

    /// Search-then-exclude binding: probe for structural keys, bind operand A
    /// to the canonical first candidate K1 and operand B to the walk that
    /// excludes K1. Binding is by key identity, not source position, so
    /// swapping the two keys in the tree does not swap the operands.
    fn invoke_double_filter(&self, name: &str, value: &Value) -> WeftResult<Resolved> {
        tracing::debug!(name, "double filter");
        let body = value.as_object().ok_or_else(|| {
            WeftError::missing_operand(format!("double filter '{name}' has no body"))
        })?;

        let candidates = self.structural_candidates(body);
        let k1 = candidates
            .iter()
            .min()
            .cloned()
            .ok_or_else(|| {
                WeftError::missing_operand(format!(
                    "double filter '{name}' search found no structural key"
                ))
            })?;
        if candidates.len() > 2 {
            // Likely a config mistake; extras are silently ignored otherwise.
            tracing::warn!(
                name,
                candidates = candidates.len(),
                "double filter body has more than two structural keys, extras ignored"
            );
        }

        let a = self
            .resolve_structural(&k1, &body[k1.as_str()])?
            .into_image("a double filter operand")?;
        let b = self
            .resolve_node(body, Some(&k1))
            .map_err(|e| contextualize(e, name))?
            .into_image("a double filter operand")?;
        let params = self.params_only(body)?;
        let filter = self.registry.double_filter(name, &params)?;
        let output = filter(&a, &b)?;
        self.check_dims(output)
    }

    fn invoke_animation(&self, name: &str, value: &Value) -> WeftResult<Resolved> {
        tracing::debug!(name, "animation");
        let params = self.params_of(value)?;
        let spec = self.registry.animation(name, &params, self.canvas)?;
        Ok(Resolved::Animation(spec))
    }

    /// Search mode: structural key names in iteration order, nothing
    /// resolved. Animation keys are not image-producing and do not count,
    /// and a `dup_` key only counts when its stripped name is a texture,
    /// mirroring what [`Resolver::resolve_key`] accepts.
    fn structural_candidates(&self, node: &ConfigNode) -> Vec<String> {
        node.keys()
            .filter(|key| match key.strip_prefix("dup_") {
                Some(name) => matches!(self.registry.classify(name), Some(Category::Texture)),
                None => self.registry.is_structural(key.as_str()),
            })
            .cloned()
            .collect()
    }

    /// Resolves exactly one known-structural key.
    fn resolve_structural(&self, key: &str, value: &Value) -> WeftResult<Resolved> {
        self.resolve_key(key, value)
            .unwrap_or_else(|| Err(WeftError::unknown_operator(key)))
    }

    /// Params-only mode over a value that should be a dictionary; scalars and
    /// missing bodies read as an empty parameter set.
    fn params_of(&self, value: &Value) -> WeftResult<ResolvedParams> {
        match value.as_object() {
            Some(body) => self.params_only(body),
            None => Ok(ResolvedParams::new()),
        }
    }

    /// Params-only mode: structural interpretation suppressed, every key
    /// becomes a constructor argument.
    pub fn params_only(&self, node: &ConfigNode) -> WeftResult<ResolvedParams> {
        let mut params = ResolvedParams::new();
        for (key, value) in node {
            params.insert(key.clone(), self.param_value(key, value)?);
        }
        Ok(params)
    }

    /// Parameter classification: `color*` keys pull from the color
    /// vocabulary or bind a nested call as a dynamic color source, `rule*`
    /// keys pull from the rule vocabulary, everything else passes through
    /// unchanged.
    fn param_value(&self, key: &str, value: &Value) -> WeftResult<ParamValue> {
        if key.starts_with("color") {
            return match value {
                Value::String(name) => Ok(ParamValue::Color(vocab::color_by_name(name))),
                Value::Array(_) => registry::color_from_json(value)
                    .map(ParamValue::Color)
                    .ok_or_else(|| {
                        WeftError::terminal(format!(
                            "color parameter '{key}' is not a 4-channel byte array"
                        ))
                    }),
                Value::Object(body) => self.color_source(key, body),
                _ => Ok(ParamValue::Json(value.clone())),
            };
        }
        if key.starts_with("rule")
            && let Value::String(name) = value
        {
            return Ok(ParamValue::Rule(vocab::rule_by_name(name)));
        }
        Ok(ParamValue::Json(value.clone()))
    }

    /// A nested dictionary under a `color*` key names a texture or filter
    /// whose evaluator becomes the color source. Textures bind their
    /// evaluator directly; a filter has no per-coordinate form, so its
    /// subtree is resolved once and the result sampled clamp-to-edge.
    fn color_source(&self, key: &str, body: &ConfigNode) -> WeftResult<ParamValue> {
        for (inner_key, inner_value) in body {
            let name = inner_key.strip_prefix("dup_").unwrap_or(inner_key);
            match self.registry.classify(name) {
                Some(Category::Texture) => {
                    let params = self.params_of(inner_value)?;
                    let eval = self.registry.texture(name, &params, self.canvas)?;
                    return Ok(ParamValue::ColorSource(eval));
                }
                Some(Category::Filter) => {
                    let image = self
                        .invoke_filter(name, inner_value)?
                        .into_image("a color source")?;
                    let image = Arc::new(image);
                    let eval: TextureEval =
                        Arc::new(move |x, y| image.pixel_clamped(x, y));
                    return Ok(ParamValue::ColorSource(eval));
                }
                _ => continue,
            }
        }
        Err(WeftError::terminal(format!(
            "color parameter '{key}' names no texture or filter"
        )))
    }

    /// Buffers crossing the filter boundary are re-validated against the
    /// canvas before continuing the walk.
    fn check_dims(&self, buf: PixelBuffer) -> WeftResult<Resolved> {
        if buf.canvas() != self.canvas {
            return Err(WeftError::MalformedDimensions {
                width: self.canvas.width,
                height: self.canvas.height,
                expected: self.canvas.byte_len(),
                actual: buf.bytes().len(),
            });
        }
        Ok(Resolved::Image(buf))
    }
}

fn contextualize(err: WeftError, filter: &str) -> WeftError {
    match err {
        WeftError::MissingOperand(msg) => {
            WeftError::missing_operand(format!("{filter}: {msg}"))
        }
        other => other,
    }
}
