//! Shader management.
//!
//! Override programs are specialised from one WGSL template. Variants are
//! selected with `#ifdef NAME` / `#ifndef NAME` / `#else` / `#endif` lines,
//! resolved here before the source reaches wgpu.

use std::collections::HashSet;

use crate::error::{RenderError, RenderResult};

/// Builder for override shader sources.
pub struct ShaderBuilder {
    vertex_source: Option<String>,
    fragment_source: Option<String>,
    defines: HashSet<String>,
}

impl ShaderBuilder {
    /// Creates a new shader builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            vertex_source: None,
            fragment_source: None,
            defines: HashSet::new(),
        }
    }

    /// Sets the vertex shader source (WGSL).
    #[must_use]
    pub fn with_vertex(mut self, source: impl Into<String>) -> Self {
        self.vertex_source = Some(source.into());
        self
    }

    /// Sets the fragment shader source (WGSL).
    #[must_use]
    pub fn with_fragment(mut self, source: impl Into<String>) -> Self {
        self.fragment_source = Some(source.into());
        self
    }

    /// Uses one source for both stages.
    #[must_use]
    pub fn with_source(self, source: impl Into<String>) -> Self {
        let source = source.into();
        self.with_vertex(source.clone()).with_fragment(source)
    }

    /// Enables an `#ifdef` block.
    #[must_use]
    pub fn with_define(mut self, name: impl Into<String>) -> Self {
        self.defines.insert(name.into());
        self
    }

    /// Enables several `#ifdef` blocks.
    #[must_use]
    pub fn with_defines<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.defines.extend(names.into_iter().map(Into::into));
        self
    }

    /// The final WGSL source, with defines resolved.
    pub fn source(&self) -> RenderResult<String> {
        let combined = self.combined_source()?;
        preprocess(&combined, &self.defines)
    }

    fn combined_source(&self) -> RenderResult<String> {
        let vertex = self
            .vertex_source
            .as_ref()
            .ok_or_else(|| RenderError::ShaderCompilationFailed("missing vertex shader".into()))?;

        let fragment = self.fragment_source.as_ref().ok_or_else(|| {
            RenderError::ShaderCompilationFailed("missing fragment shader".into())
        })?;

        // If sources are the same file, just return one
        if vertex == fragment {
            return Ok(vertex.clone());
        }

        // Otherwise combine them
        Ok(format!("{vertex}\n\n{fragment}"))
    }
}

impl Default for ShaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves conditional blocks against `defines`.
///
/// Directive lines are dropped from the output. Blocks nest.
pub fn preprocess(source: &str, defines: &HashSet<String>) -> RenderResult<String> {
    // One entry per open block: (this branch active, any enclosing block inactive).
    let mut stack: Vec<(bool, bool)> = Vec::new();
    let mut out = String::with_capacity(source.len());

    for (line_no, line) in source.lines().enumerate() {
        let trimmed = line.trim_start();
        let parent_active = stack.last().is_none_or(|&(active, _)| active);

        if let Some(name) = trimmed.strip_prefix("#ifdef") {
            let active = parent_active && defines.contains(name.trim());
            stack.push((active, !parent_active));
        } else if let Some(name) = trimmed.strip_prefix("#ifndef") {
            let active = parent_active && !defines.contains(name.trim());
            stack.push((active, !parent_active));
        } else if trimmed.starts_with("#else") {
            let Some(top) = stack.last_mut() else {
                return Err(RenderError::ShaderCompilationFailed(format!(
                    "line {}: #else without #ifdef",
                    line_no + 1
                )));
            };
            let (active, outer_inactive) = *top;
            *top = (!active && !outer_inactive, outer_inactive);
        } else if trimmed.starts_with("#endif") {
            if stack.pop().is_none() {
                return Err(RenderError::ShaderCompilationFailed(format!(
                    "line {}: #endif without #ifdef",
                    line_no + 1
                )));
            }
        } else if parent_active {
            out.push_str(line);
            out.push('\n');
        }
    }

    if !stack.is_empty() {
        return Err(RenderError::ShaderCompilationFailed(
            "unterminated #ifdef block".into(),
        ));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defines(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_ifdef_selects_branch() {
        let src = "a\n#ifdef FOO\nfoo\n#else\nnot_foo\n#endif\nb\n";
        assert_eq!(preprocess(src, &defines(&["FOO"])).unwrap(), "a\nfoo\nb\n");
        assert_eq!(preprocess(src, &defines(&[])).unwrap(), "a\nnot_foo\nb\n");
    }

    #[test]
    fn test_nested_blocks() {
        let src = "#ifdef A\n#ifdef B\nab\n#else\na\n#endif\n#else\n#ifndef B\nnone\n#endif\n#endif\n";
        assert_eq!(preprocess(src, &defines(&["A", "B"])).unwrap(), "ab\n");
        assert_eq!(preprocess(src, &defines(&["A"])).unwrap(), "a\n");
        assert_eq!(preprocess(src, &defines(&[])).unwrap(), "none\n");
        assert_eq!(preprocess(src, &defines(&["B"])).unwrap(), "");
    }

    #[test]
    fn test_unbalanced_directives_fail() {
        assert!(preprocess("#ifdef A\nx\n", &defines(&[])).is_err());
        assert!(preprocess("#endif\n", &defines(&[])).is_err());
        assert!(preprocess("#else\n", &defines(&[])).is_err());
    }

    #[test]
    fn test_builder_requires_sources() {
        assert!(ShaderBuilder::new().with_vertex("x").source().is_err());
        let source = ShaderBuilder::new()
            .with_source("#ifdef X\nx\n#endif\ny")
            .with_define("X")
            .source()
            .unwrap();
        assert_eq!(source, "x\ny\n");
    }
}
