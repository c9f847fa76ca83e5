//! Per-channel message templates with flat `{name}` placeholders.

mod catalog;
pub mod placeholder;

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use snafu::{ensure, OptionExt, Snafu};

use crate::{
    channel::Channel,
    retry::{Classify, ErrorClass},
};

/// Variable name to substitution value.
pub type Variables = BTreeMap<String, String>;

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateCategory {
    Booking,
    Payment,
    Reminder,
    Access,
    Driver,
    Security,
    Custom,
}

/// Channel-specific body of a template, or of a rendered message.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "channel", rename_all = "lowercase")]
pub enum TemplateContent {
    Email {
        subject: String,
        html: String,
        text: String,
    },
    Sms {
        body: String,
    },
    #[serde(rename = "whatsapp")]
    WhatsApp {
        body: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        media_url: Option<String>,
    },
}

impl TemplateContent {
    #[must_use]
    pub const fn channel(&self) -> Channel {
        match self {
            Self::Email { .. } => Channel::Email,
            Self::Sms { .. } => Channel::Sms,
            Self::WhatsApp { .. } => Channel::WhatsApp,
        }
    }

    fn fields(&self) -> Vec<&str> {
        match self {
            Self::Email { subject, html, text } => vec![subject.as_str(), html.as_str(), text.as_str()],
            Self::Sms { body } => vec![body.as_str()],
            Self::WhatsApp { body, media_url } => {
                let mut fields = vec![body.as_str()];
                fields.extend(media_url.as_deref());
                fields
            }
        }
    }

    /// Substitute `variables` into every text field.
    #[must_use]
    pub fn render(&self, variables: &Variables) -> Self {
        let render = |field: &str| placeholder::render(field, variables);
        match self {
            Self::Email { subject, html, text } => {
                Self::Email { subject: render(subject), html: render(html), text: render(text) }
            }
            Self::Sms { body } => Self::Sms { body: render(body) },
            Self::WhatsApp { body, media_url } => Self::WhatsApp {
                body: render(body),
                media_url: media_url.as_deref().map(render),
            },
        }
    }

    /// Distinct placeholder names across all fields that `variables` lacks.
    #[must_use]
    pub fn missing(&self, variables: &Variables) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for field in self.fields() {
            for name in placeholder::missing(field, variables) {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Template {
    /// Fully-qualified id, `{name}_{locale}`.
    pub id: String,

    pub locale: String,

    pub category: TemplateCategory,

    #[serde(default)]
    pub required_variables: Vec<String>,

    pub content: TemplateContent,
}

impl Template {
    #[inline]
    #[must_use]
    pub const fn channel(&self) -> Channel { self.content.channel() }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum TemplateError {
    #[snafu(display("Template `{template_id}` is not registered for channel {channel}"))]
    NotFound { channel: Channel, template_id: String },

    #[snafu(display("Template `{template_id}` is missing variables: {}", missing.join(", ")))]
    MissingVariables { template_id: String, missing: Vec<String> },
}

impl Classify for TemplateError {
    fn class(&self) -> ErrorClass {
        match self {
            Self::NotFound { .. } => ErrorClass::NotFound,
            Self::MissingVariables { .. } => ErrorClass::InvalidArgument,
        }
    }
}

/// Templates keyed by channel and id.
///
/// Registering a template with an existing (channel, id) pair replaces it.
#[derive(Clone, Debug, Default)]
pub struct TemplateRegistry {
    templates: HashMap<(Channel, String), Template>,
}

impl TemplateRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// A registry preloaded with the built-in booking catalog.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.extend(catalog::templates());
        registry
    }

    /// Returns the template this one replaced, if any.
    pub fn register(&mut self, template: Template) -> Option<Template> {
        self.templates.insert((template.channel(), template.id.clone()), template)
    }

    pub fn extend<I>(&mut self, templates: I)
    where
        I: IntoIterator<Item = Template>,
    {
        for template in templates {
            drop(self.register(template));
        }
    }

    #[must_use]
    pub fn get_template(&self, channel: Channel, template_id: &str) -> Option<&Template> {
        self.templates.get(&(channel, template_id.to_string()))
    }

    #[must_use]
    pub fn len(&self) -> usize { self.templates.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.templates.is_empty() }

    #[inline]
    #[must_use]
    pub fn render(content: &str, variables: &Variables) -> String {
        placeholder::render(content, variables)
    }

    #[inline]
    #[must_use]
    pub fn validate(content: &str, variables: &Variables) -> Vec<String> {
        placeholder::missing(content, variables)
    }

    /// Look up, validate and render one template.
    ///
    /// Declared required variables are checked first, then every placeholder
    /// in the content.
    ///
    /// # Errors
    ///
    /// Returns an error if the template is unknown or any variable is missing.
    pub fn prepare(
        &self,
        channel: Channel,
        template_id: &str,
        variables: &Variables,
    ) -> Result<TemplateContent, TemplateError> {
        let template = self
            .get_template(channel, template_id)
            .context(NotFoundSnafu { channel, template_id })?;

        let mut missing: Vec<String> = template
            .required_variables
            .iter()
            .filter(|name| !variables.contains_key(name.as_str()))
            .cloned()
            .collect();
        for name in template.content.missing(variables) {
            if !missing.contains(&name) {
                missing.push(name);
            }
        }
        ensure!(missing.is_empty(), MissingVariablesSnafu { template_id, missing });

        Ok(template.content.render(variables))
    }
}
