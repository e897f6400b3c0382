//! HTML page rendering.

use handlebars::Handlebars;
use serde::Serialize;

use textlens_common::{Error, Result};

use crate::curate::CuratedView;

const INDEX_TEMPLATE: &str = "index";
const INDEX_SOURCE: &str = include_str!("../templates/index.hbs");

/// Data for the single-page UI.
#[derive(Debug, Clone, Serialize)]
pub struct IndexPage {
    /// Submitted text echoed back into the form
    pub text: String,
    pub limit: usize,
    pub error: Option<String>,
    pub result: Option<CuratedView>,
}

impl IndexPage {
    pub fn empty(limit: usize) -> Self {
        Self {
            text: String::new(),
            limit,
            error: None,
            result: None,
        }
    }

    pub fn with_error(text: impl Into<String>, limit: usize, error: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            limit,
            error: Some(error.into()),
            result: None,
        }
    }

    pub fn with_result(text: impl Into<String>, limit: usize, result: CuratedView) -> Self {
        Self {
            text: text.into(),
            limit,
            error: None,
            result: Some(result),
        }
    }
}

/// Compiled page templates. HTML-escapes every interpolated value.
pub struct PageRenderer {
    registry: Handlebars<'static>,
}

impl PageRenderer {
    pub fn new() -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(false);
        registry
            .register_template_string(INDEX_TEMPLATE, INDEX_SOURCE)
            .map_err(|e| Error::Render(format!("invalid index template: {}", e)))?;
        Ok(Self { registry })
    }

    pub fn render_index(&self, page: &IndexPage) -> Result<String> {
        self.registry
            .render(INDEX_TEMPLATE, page)
            .map_err(|e| Error::Render(e.to_string()))
    }
}
