//! Email template system
//!
//! Templates use `{{path}}` placeholders resolved against a JSON variable
//! bag (`{{restaurant.name}}`). `{{path|fallback}}` substitutes `fallback`
//! when the value is missing. Missing values without a fallback render empty.
//! Values are HTML-escaped in the HTML body.

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// Available email templates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmailTemplate {
    Welcome,
    ReviewRequest,
    CampaignDefault,
    ReservationConfirmation,
}

impl EmailTemplate {
    pub const ALL: [EmailTemplate; 4] = [
        Self::Welcome,
        Self::ReviewRequest,
        Self::CampaignDefault,
        Self::ReservationConfirmation,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Welcome => "welcome",
            Self::ReviewRequest => "review-request",
            Self::CampaignDefault => "campaign-default",
            Self::ReservationConfirmation => "reservation-confirmation",
        }
    }

    /// Get the subject line for this template
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Welcome => "{{restaurant.name|Bienvenue}} sur Cartelia",
            Self::ReviewRequest => "{{restaurant.name|Votre restaurant}} - Votre avis compte !",
            Self::CampaignDefault => "{{restaurant.name|Votre restaurant}} a un message pour vous",
            Self::ReservationConfirmation => {
                "{{restaurant.name|Votre restaurant}} - Confirmation de réservation"
            }
        }
    }

    /// Get the HTML body template
    pub fn html_body(&self) -> &'static str {
        match self {
            Self::Welcome => WELCOME_TEMPLATE,
            Self::ReviewRequest => REVIEW_REQUEST_TEMPLATE,
            Self::CampaignDefault => CAMPAIGN_DEFAULT_TEMPLATE,
            Self::ReservationConfirmation => RESERVATION_CONFIRMATION_TEMPLATE,
        }
    }

    /// Get the plain text body template
    pub fn text_body(&self) -> &'static str {
        match self {
            Self::Welcome => WELCOME_TEMPLATE_TEXT,
            Self::ReviewRequest => REVIEW_REQUEST_TEMPLATE_TEXT,
            Self::CampaignDefault => CAMPAIGN_DEFAULT_TEMPLATE_TEXT,
            Self::ReservationConfirmation => RESERVATION_CONFIRMATION_TEMPLATE_TEXT,
        }
    }
}

impl FromStr for EmailTemplate {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| AppError::TemplateNotFound(s.to_string()))
    }
}

/// Rendered email with all variables substituted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Template rendering engine over a JSON variable bag
#[derive(Debug)]
pub struct TemplateEngine<'a> {
    variables: &'a Value,
}

impl<'a> TemplateEngine<'a> {
    pub fn new(variables: &'a Value) -> Self {
        Self { variables }
    }

    /// Render a template string; `escape_html` escapes substituted values
    pub fn render(&self, template: &str, escape_html: bool) -> String {
        let mut result = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("{{") {
            result.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else {
                result.push_str(&rest[start..]);
                return result;
            };

            let (path, fallback) = match after[..end].split_once('|') {
                Some((path, fallback)) => (path.trim(), fallback),
                None => (after[..end].trim(), ""),
            };
            let value = self.lookup(path).unwrap_or_else(|| fallback.to_string());
            if escape_html {
                result.push_str(&escape(&value));
            } else {
                result.push_str(&value);
            }

            rest = &after[end + 2..];
        }

        result.push_str(rest);
        result
    }

    /// Render a complete email template
    pub fn render_template(&self, template: EmailTemplate) -> RenderedEmail {
        RenderedEmail {
            subject: self.render(template.subject(), false),
            html: self.render(template.html_body(), true),
            text: self.render(template.text_body(), false),
        }
    }

    /// Dotted path lookup; null, empty and non-scalar values count as missing
    fn lookup(&self, path: &str) -> Option<String> {
        let value = path
            .split('.')
            .try_fold(self.variables, |current, key| current.get(key))?;

        match value {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

/// Render the named template. Unknown names fail with `TemplateNotFound`.
pub fn render(name: &str, variables: &Value) -> Result<RenderedEmail> {
    let template = EmailTemplate::from_str(name)?;
    Ok(TemplateEngine::new(variables).render_template(template))
}

fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

// ============================================================================
// Email Templates
// ============================================================================

const WELCOME_TEMPLATE: &str = r#"<p>Bienvenue <strong>{{restaurant.name}}</strong> !</p>
<p>Nous sommes ravis de vous compter parmi les restaurateurs Cartelia.</p>"#;

const WELCOME_TEMPLATE_TEXT: &str = "Bienvenue {{restaurant.name}} ! Nous sommes ravis de vous compter parmi les restaurateurs Cartelia.";

const REVIEW_REQUEST_TEMPLATE: &str = r##"<p>Bonjour {{client.name}},</p>
<p>Nous serions ravis d'avoir votre avis sur <strong>{{restaurant.name|notre établissement}}</strong>.</p>
<p><a href="{{reviewLink|#}}">Laisser un avis</a></p>
<p>Merci de votre visite !</p>"##;

const REVIEW_REQUEST_TEMPLATE_TEXT: &str = "Bonjour {{client.name}}, nous serions ravis d'avoir votre avis sur {{restaurant.name|notre établissement}}. {{reviewLink}}";

const CAMPAIGN_DEFAULT_TEMPLATE: &str = "<p>{{message|Découvrez nos nouveautés !}}</p>";

const CAMPAIGN_DEFAULT_TEMPLATE_TEXT: &str = "{{message|Découvrez nos nouveautés !}}";

const RESERVATION_CONFIRMATION_TEMPLATE: &str = r#"<p>Bonjour {{reservation.name}},</p>
<p>Votre réservation du <strong>{{reservation.date}}</strong> pour <strong>{{reservation.guests}}</strong> personnes est confirmée.</p>
<p>À très vite !</p>"#;

const RESERVATION_CONFIRMATION_TEMPLATE_TEXT: &str = "Bonjour {{reservation.name}}, votre réservation du {{reservation.date}} pour {{reservation.guests}} personnes est confirmée.";
