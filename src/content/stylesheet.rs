//! Stylesheet: typography, colour tokens and named style rules.
//!
//! Rules are resolved to inline declarations at composition time, so both
//! engines see the same values. Colour values go through tokens; a rule that
//! names an undeclared token fails validation.

use std::collections::BTreeMap;

use crate::error::ContentError;

/// Document-wide type settings, applied to every page container.
#[derive(Debug, Clone, PartialEq)]
pub struct Typography {
    /// CSS font-family list.
    pub family: String,
    pub base_size_px: f32,
    /// Unitless line-height factor.
    pub line_height: f32,
    /// Colour token for body text.
    pub ink: String,
}

impl Default for Typography {
    fn default() -> Self {
        Self {
            family: "Helvetica, Arial, sans-serif".to_string(),
            base_size_px: 16.0,
            line_height: 1.4,
            ink: "ink".to_string(),
        }
    }
}

/// A declaration value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Literal(String),
    /// A colour token, optionally embedded in a template such as
    /// `1px solid {}`.
    Token { name: String, template: String },
}

/// An ordered list of declarations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleRule {
    decls: Vec<(&'static str, Value)>,
}

impl StyleRule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a literal declaration.
    pub fn set(mut self, prop: &'static str, value: impl Into<String>) -> Self {
        self.decls.push((prop, Value::Literal(value.into())));
        self
    }

    /// Add a declaration whose value is a colour token.
    pub fn color(self, prop: &'static str, token: &str) -> Self {
        self.color_in(prop, "{}", token)
    }

    /// Add a declaration whose value embeds a colour token at `{}`.
    pub fn color_in(mut self, prop: &'static str, template: &str, token: &str) -> Self {
        self.decls.push((
            prop,
            Value::Token {
                name: token.to_string(),
                template: template.to_string(),
            },
        ));
        self
    }

    /// Names of all colour tokens this rule references.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.decls.iter().filter_map(|(_, v)| match v {
            Value::Token { name, .. } => Some(name.as_str()),
            Value::Literal(_) => None,
        })
    }

    fn resolve(&self, rule: &str, tokens: &BTreeMap<String, String>) -> Result<String, ContentError> {
        let mut out = Vec::with_capacity(self.decls.len());
        for (prop, value) in &self.decls {
            let value = match value {
                Value::Literal(v) => v.clone(),
                Value::Token { name, template } => {
                    let hex = tokens.get(name).ok_or_else(|| ContentError::UnknownColorToken {
                        rule: rule.to_string(),
                        token: name.clone(),
                    })?;
                    template.replace("{}", hex)
                }
            };
            out.push(format!("{prop}: {value}"));
        }
        Ok(out.join("; "))
    }
}

/// Typography, colour tokens and rules keyed by name.
#[derive(Debug, Clone, Default)]
pub struct Stylesheet {
    pub typography: Typography,
    tokens: BTreeMap<String, String>,
    rules: BTreeMap<&'static str, StyleRule>,
}

impl Stylesheet {
    pub fn new(typography: Typography) -> Self {
        Self {
            typography,
            ..Self::default()
        }
    }

    /// Declare a colour token as a `#rrggbb` value.
    pub fn token(mut self, name: &str, hex: &str) -> Self {
        self.tokens.insert(name.to_string(), hex.to_string());
        self
    }

    pub fn rule(mut self, name: &'static str, rule: StyleRule) -> Self {
        self.rules.insert(name, rule);
        self
    }

    pub fn has_rule(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    pub fn color(&self, token: &str) -> Option<&str> {
        self.tokens.get(token).map(String::as_str)
    }

    /// Check that every token referenced by a rule or by the typography is
    /// declared.
    pub fn validate(&self) -> Result<(), ContentError> {
        if !self.tokens.contains_key(&self.typography.ink) {
            return Err(ContentError::UnknownColorToken {
                rule: "typography".to_string(),
                token: self.typography.ink.clone(),
            });
        }
        for (name, rule) in &self.rules {
            if let Some(token) = rule.tokens().find(|t| !self.tokens.contains_key(*t)) {
                return Err(ContentError::UnknownColorToken {
                    rule: name.to_string(),
                    token: token.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Inline declarations for rule `name`, or `None` if no such rule exists.
    pub fn declarations(&self, name: &str) -> Option<Result<String, ContentError>> {
        self.rules.get(name).map(|rule| rule.resolve(name, &self.tokens))
    }

    /// Declarations shared by every page container.
    pub fn base_declarations(&self) -> Result<String, ContentError> {
        let t = &self.typography;
        StyleRule::new()
            .set("font-family", t.family.clone())
            .set("font-size", format!("{}px", t.base_size_px))
            .set("line-height", t.line_height.to_string())
            .color("color", &t.ink)
            .resolve("typography", &self.tokens)
    }
}
