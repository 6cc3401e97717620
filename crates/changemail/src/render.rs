//! Render change summaries into mail bodies.

use crate::error::{Error, Result};
use crate::summary::ChangeSummary;
use handlebars::Handlebars;
use std::fs;
use std::path::{Path, PathBuf};

/// Plain-text template file name.
pub const TEXT_TEMPLATE: &str = "email_template_text.hbs";
/// HTML template file name.
pub const HTML_TEMPLATE: &str = "email_template_html.hbs";
/// Output file for the plain-text body.
pub const TEXT_BODY_FILE: &str = "text_body";
/// Output file for the HTML body.
pub const HTML_BODY_FILE: &str = "html_body";

const TEXT: &str = "text";
const HTML: &str = "html";

const BUILTIN_TEXT: &str = include_str!("../templates/email_template_text.hbs");
const BUILTIN_HTML: &str = include_str!("../templates/email_template_html.hbs");

/// Compiled text and HTML templates.
pub struct Templates {
    handlebars: Handlebars<'static>,
}

/// Rendered mail bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMail {
    pub text: String,
    pub html: String,
}

impl Templates {
    /// Templates shipped with the binary.
    pub fn builtin() -> Result<Self> {
        Self::from_sources(BUILTIN_TEXT, BUILTIN_HTML)
    }

    /// Load both templates from `dir`.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let text = read_template(&dir.join(TEXT_TEMPLATE))?;
        let html = read_template(&dir.join(HTML_TEMPLATE))?;
        Self::from_sources(&text, &html)
    }

    /// Compile templates from source strings.
    pub fn from_sources(text: &str, html: &str) -> Result<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        handlebars
            .register_template_string(TEXT, text)
            .map_err(|e| Error::Template(format!("text template: {e}")))?;
        handlebars
            .register_template_string(HTML, html)
            .map_err(|e| Error::Template(format!("HTML template: {e}")))?;
        Ok(Self { handlebars })
    }

    /// Render both bodies for `summary`.
    pub fn render(&self, summary: &ChangeSummary) -> Result<RenderedMail> {
        let text = self
            .handlebars
            .render(TEXT, summary)
            .map_err(|e| Error::Template(format!("rendering text body: {e}")))?;
        let html = self
            .handlebars
            .render(HTML, summary)
            .map_err(|e| Error::Template(format!("rendering HTML body: {e}")))?;
        Ok(RenderedMail { text, html })
    }
}

impl RenderedMail {
    /// Write `text_body` and `html_body` into `dir`, returning their paths.
    pub fn write_to(&self, dir: &Path) -> Result<(PathBuf, PathBuf)> {
        let text_path = dir.join(TEXT_BODY_FILE);
        let html_path = dir.join(HTML_BODY_FILE);
        fs::write(&text_path, &self.text).map_err(|e| Error::io(&text_path, e))?;
        fs::write(&html_path, &self.html).map_err(|e| Error::io(&html_path, e))?;
        Ok((text_path, html_path))
    }
}

fn read_template(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| Error::io(path, e))
}
