//! Page rendering. The page is one Tera template rendered from the view
//! state; the server decides which [`PageView`] to show.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Serialize;
use tera::{try_get_value, Context, Tera, Value};

use crate::error::MatchError;
use crate::types::{Analysis, ScoredMatch};
use crate::upload;

const TITLE: &str = "StyleMatch - Find Similar Fashion Styles";

/// One ranked match as shown to the user.
#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct MatchRow {
    pub id: String,
    pub score: f32,
    pub description: String,
}

impl From<&ScoredMatch> for MatchRow {
    fn from(m: &ScoredMatch) -> Self {
        Self {
            id: m.entry.id.clone(),
            score: m.rounded_score(),
            description: m.entry.description.clone(),
        }
    }
}

impl MatchRow {
    /// `outfit_1 - Match Score: 0.87` followed by the description.
    pub fn to_text(&self) -> String {
        format!(
            "{} - Match Score: {:.2}\n{}",
            self.id, self.score, self.description
        )
    }
}

pub enum PageView {
    Upload,
    Results {
        preview: Option<String>,
        analysis: Analysis,
    },
    Failed {
        preview: Option<String>,
        code: &'static str,
        message: String,
    },
}

impl PageView {
    pub fn failed(preview: Option<String>, err: &MatchError) -> Self {
        PageView::Failed {
            preview,
            code: err.code(),
            message: err.to_string(),
        }
    }
}

/// `data:` URI for an accepted upload; `None` for anything we would not decode.
pub fn preview_data_uri(bytes: &[u8]) -> Option<String> {
    let format = upload::sniff_format(bytes).ok()?;
    Some(format!(
        "data:{};base64,{}",
        upload::mime_type(format),
        STANDARD.encode(bytes)
    ))
}

#[derive(Serialize)]
struct ShownError<'a> {
    code: &'a str,
    message: &'a str,
}

#[derive(Serialize)]
struct PageContext<'a> {
    title: &'static str,
    preview: Option<&'a str>,
    show_results: bool,
    description: &'a str,
    matches: Vec<MatchRow>,
    error: Option<ShownError<'a>>,
}

impl<'a> PageContext<'a> {
    fn new(view: &'a PageView) -> Self {
        let mut ctx = PageContext {
            title: TITLE,
            preview: None,
            show_results: false,
            description: "",
            matches: Vec::new(),
            error: None,
        };
        match view {
            PageView::Upload => {}
            PageView::Results { preview, analysis } => {
                ctx.preview = preview.as_deref();
                ctx.show_results = true;
                ctx.description = analysis.description.as_str();
                ctx.matches = analysis.matches.iter().map(MatchRow::from).collect();
            }
            PageView::Failed {
                preview,
                code,
                message,
            } => {
                ctx.preview = preview.as_deref();
                ctx.error = Some(ShownError { code, message });
            }
        }
        ctx
    }
}

/// Holds the compiled page template. Built once at startup and shared by
/// every request.
pub struct PageRenderer {
    tera: Tera,
}

impl PageRenderer {
    pub fn new() -> tera::Result<Self> {
        let mut tera = Tera::default();
        tera.register_filter("score", score_filter);
        // `.html` turns autoescaping on for every interpolated value.
        tera.add_raw_template(PAGE_TEMPLATE_NAME, PAGE_TEMPLATE)?;
        Ok(Self { tera })
    }

    pub fn render(&self, view: &PageView) -> tera::Result<String> {
        let ctx = Context::from_serialize(PageContext::new(view))?;
        self.tera.render(PAGE_TEMPLATE_NAME, &ctx)
    }
}

/// Scores always show two decimals, `1.00` included.
fn score_filter(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    let score = try_get_value!("score", "value", f64, value);
    Ok(Value::String(format!("{score:.2}")))
}

const PAGE_TEMPLATE_NAME: &str = "page.html";

// The preview is a data URI we encoded ourselves; escaping would mangle its `/`.
const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{{ title }}</title>
<style>body{font-family:sans-serif;max-width:960px;margin:2rem auto;padding:0 1rem}img{max-width:100%}.error{color:#a00;border:1px solid #a00;padding:.5rem}</style>
</head>
<body>
<h1>{{ title }}</h1>
<form method="post" action="/" enctype="multipart/form-data">
<label for="image">Upload an Outfit Image</label>
<input type="file" id="image" name="image" accept="image/jpeg,image/png" required>
<button type="submit">Find similar styles</button>
</form>
{% if preview %}<figure><img src="{{ preview | safe }}" alt="Uploaded image"><figcaption>Uploaded Image</figcaption></figure>
{% endif %}{% if error %}<div class="error" role="alert"><strong>{{ error.code }}</strong> {{ error.message }}</div>
{% endif %}{% if show_results %}<h2>Detected Fashion Description</h2>
<p class="description">{{ description }}</p>
<h2>Similar Outfits</h2>
{% if matches | length > 0 %}{% for m in matches %}<div class="match"><p><strong>{{ m.id }}</strong> - Match Score: <code>{{ m.score | score }}</code></p><p>{{ m.description }}</p></div>
<hr>
{% endfor %}{% else %}<p>No outfits in the catalog.</p>
{% endif %}{% endif %}</body>
</html>
"#;
