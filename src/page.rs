use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use uuid::Uuid;

pub const STATUS_BADGE_CLASS: &str = "badge status-badge";
pub const CONNECTIVITY_BADGE_CLASS: &str = "badge connectivity-badge";
pub const LAST_UPDATED_PREFIX: &str = "Última actualización: ";

/// Identity of a rendered element, stable for the lifetime of the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(Uuid);

impl ElementId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything the server-rendered page contains that the dashboard drives
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PageDescriptor {
    #[serde(default)]
    pub cards: Vec<CardDescriptor>,
    #[serde(default)]
    pub metrics: Vec<MetricsDescriptor>,
    /// Ids of elements marked `data-bs-toggle="tooltip"`
    #[serde(default)]
    pub tooltips: Vec<String>,
    #[serde(default)]
    pub install_button: bool,
    #[serde(default)]
    pub forms: Vec<FormDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardDescriptor {
    pub tunnel_name: String,
    #[serde(default = "default_status_class")]
    pub status_class: String,
    #[serde(default)]
    pub status_text: String,
    #[serde(default = "default_connectivity_class")]
    pub connectivity_class: String,
    #[serde(default)]
    pub connectivity_text: String,
    #[serde(default)]
    pub last_updated: String,
}

impl CardDescriptor {
    pub fn new(tunnel_name: &str) -> Self {
        Self {
            tunnel_name: tunnel_name.to_string(),
            status_class: default_status_class(),
            status_text: String::new(),
            connectivity_class: default_connectivity_class(),
            connectivity_text: String::new(),
            last_updated: String::new(),
        }
    }
}

fn default_status_class() -> String {
    format!("{STATUS_BADGE_CLASS} bg-secondary")
}

fn default_connectivity_class() -> String {
    format!("{CONNECTIVITY_BADGE_CLASS} bg-secondary")
}

/// A `.tunnel-metrics` container and which canvases it holds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsDescriptor {
    pub tunnel_name: String,
    #[serde(default = "yes")]
    pub connections: bool,
    #[serde(default = "yes")]
    pub bandwidth: bool,
}

impl MetricsDescriptor {
    pub fn new(tunnel_name: &str) -> Self {
        Self {
            tunnel_name: tunnel_name.to_string(),
            connections: true,
            bandwidth: true,
        }
    }
}

fn yes() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormDescriptor {
    pub id: String,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
    #[serde(default = "default_submit_label")]
    pub submit_label: String,
}

impl FormDescriptor {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            fields: Vec::new(),
            submit_label: default_submit_label(),
        }
    }

    pub fn with_field(mut self, name: &str, value: &str) -> Self {
        self.fields.push(FieldDescriptor {
            name: name.to_string(),
            value: value.to_string(),
        });
        self
    }
}

fn default_submit_label() -> String {
    "Enviar".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

pub fn load_page<P: AsRef<Path>>(path: P) -> anyhow::Result<PageDescriptor> {
    let raw = std::fs::read_to_string(path.as_ref())?;
    let page = serde_json::from_str(&raw)?;
    Ok(page)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeVariant {
    Success,
    Danger,
    Warning,
}

impl BadgeVariant {
    pub fn class(&self) -> &'static str {
        match self {
            BadgeVariant::Success => "bg-success",
            BadgeVariant::Danger => "bg-danger",
            BadgeVariant::Warning => "bg-warning",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Badge {
    pub class_name: String,
    pub text: String,
}

impl Badge {
    /// Replace the whole class list with `base` plus exactly one variant.
    pub fn set_state(&mut self, base: &str, variant: BadgeVariant, text: &str) {
        self.class_name = format!("{} {}", base, variant.class());
        self.text = text.to_string();
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.class_name.split_whitespace().any(|c| c == class)
    }
}

/// One `.tunnel-status-card`
#[derive(Debug, Clone)]
pub struct TunnelCard {
    pub id: ElementId,
    pub tunnel_name: String,
    pub status_badge: Badge,
    pub connectivity_badge: Badge,
    pub last_updated: String,
}

impl From<CardDescriptor> for TunnelCard {
    fn from(card: CardDescriptor) -> Self {
        Self {
            id: ElementId::new(),
            tunnel_name: card.tunnel_name,
            status_badge: Badge {
                class_name: card.status_class,
                text: card.status_text,
            },
            connectivity_badge: Badge {
                class_name: card.connectivity_class,
                text: card.connectivity_text,
            },
            last_updated: card.last_updated,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TooltipTarget {
    pub element: String,
    pub active: bool,
}

/// The "install cloudflared" trigger
#[derive(Debug, Clone)]
pub struct InstallButton {
    pub label: String,
    pub spinner_visible: bool,
    pub disabled: bool,
    armed: bool,
}

impl Default for InstallButton {
    fn default() -> Self {
        Self {
            label: "Instalar cloudflared".to_string(),
            spinner_visible: false,
            disabled: false,
            armed: false,
        }
    }
}

impl InstallButton {
    pub fn arm(&mut self) {
        self.armed = true;
    }

    /// Returns true when the click switched the button into its loading state.
    pub fn click(&mut self) -> bool {
        if self.disabled || !self.armed {
            return false;
        }
        self.spinner_visible = true;
        self.label = "Instalando...".to_string();
        self.disabled = true;
        true
    }
}

#[derive(Debug, Clone)]
pub struct SubmitButton {
    pub label: String,
    pub spinner_visible: bool,
    pub disabled: bool,
}

impl SubmitButton {
    pub fn set_loading(&mut self, label: &str) {
        self.label = label.to_string();
        self.spinner_visible = true;
        self.disabled = true;
    }
}

/// The `.invalid-feedback` element that follows an input
#[derive(Debug, Clone, PartialEq)]
pub struct Feedback {
    pub id: ElementId,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputListener {
    ClearInvalid,
}

#[derive(Debug, Clone)]
pub struct InputField {
    pub name: String,
    pub value: String,
    pub invalid: bool,
    pub feedback: Option<Feedback>,
    once_listeners: Vec<InputListener>,
}

impl InputField {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            invalid: false,
            feedback: None,
            once_listeners: Vec::new(),
        }
    }

    /// Register a listener that runs on the next input and is then removed.
    pub fn add_once_listener(&mut self, listener: InputListener) {
        self.once_listeners.push(listener);
    }

    pub fn pending_listeners(&self) -> usize {
        self.once_listeners.len()
    }

    /// Simulates the user typing a new value.
    pub fn input(&mut self, value: &str) {
        self.value = value.to_string();
        for listener in std::mem::take(&mut self.once_listeners) {
            match listener {
                InputListener::ClearInvalid => self.invalid = false,
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Form {
    pub id: String,
    pub fields: Vec<InputField>,
    pub submit_button: SubmitButton,
    pub submitted: bool,
}

impl From<FormDescriptor> for Form {
    fn from(form: FormDescriptor) -> Self {
        Self {
            id: form.id,
            fields: form
                .fields
                .iter()
                .map(|f| InputField::new(&f.name, &f.value))
                .collect(),
            submit_button: SubmitButton {
                label: form.submit_label,
                spinner_visible: false,
                disabled: false,
            },
            submitted: false,
        }
    }
}

impl Form {
    pub fn field(&self, name: &str) -> Option<&InputField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut InputField> {
        self.fields.iter_mut().find(|f| f.name == name)
    }

    pub fn value(&self, name: &str) -> &str {
        self.field(name).map(|f| f.value.as_str()).unwrap_or("")
    }

    pub fn submit(&mut self) {
        self.submitted = true;
    }
}
