//! Display text resolution.

use std::collections::HashMap;
use std::path::Path;

use edutools_core::Text;
use tokio::fs;
use tracing::debug;

use crate::store::Result;

/// Turns opaque message keys into displayed strings.
pub trait Translator {
    /// Resolve `key` with positional `params`. Unknown keys render as the key.
    fn translate(&self, key: &str, params: &[String]) -> String;

    /// Resolve a display token.
    fn render(&self, text: &Text) -> String {
        match text {
            Text::Key { key, params } => self.translate(key, params),
            Text::Raw(raw) => raw.clone(),
        }
    }
}

/// Translator backed by a `.lang` file: one `key=value` per line, `##`
/// starts a comment. Values use `%s` for the next parameter and `%1`..`%9`
/// for a positional one.
#[derive(Debug, Clone, Default)]
pub struct LangTranslator {
    entries: HashMap<String, String>,
}

impl LangTranslator {
    /// Parse `.lang` source. Lines without `=` are skipped.
    pub fn parse(source: &str) -> Self {
        let mut entries = HashMap::new();
        for line in source.lines() {
            let line = match line.find("##") {
                Some(index) => &line[..index],
                None => line,
            };
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            if !key.is_empty() {
                entries.insert(key.to_string(), value.trim().to_string());
            }
        }
        Self { entries }
    }

    /// Load a `.lang` file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).await?;
        let translator = Self::parse(&source);
        debug!(path = %path.display(), keys = translator.len(), "loaded translations");
        Ok(translator)
    }

    /// Number of known keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no keys are known.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Translator for LangTranslator {
    fn translate(&self, key: &str, params: &[String]) -> String {
        match self.entries.get(key) {
            Some(template) => substitute(template, params),
            None => key.to_string(),
        }
    }
}

fn substitute(template: &str, params: &[String]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut next = 0;
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some('s') => {
                chars.next();
                if let Some(param) = params.get(next) {
                    out.push_str(param);
                }
                next += 1;
            }
            Some(digit @ '1'..='9') => {
                chars.next();
                let index = digit as usize - '1' as usize;
                if let Some(param) = params.get(index) {
                    out.push_str(param);
                }
            }
            Some('%') => {
                chars.next();
                out.push('%');
            }
            _ => out.push('%'),
        }
    }
    out
}
