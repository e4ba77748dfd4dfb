use crate::page::{ElementId, Feedback, Form, InputField, InputListener};
use rfd::{MessageButtons, MessageDialog, MessageDialogResult};
use std::io::{self, BufRead, Write};
use tracing::{debug, warn};

pub const CREATE_TUNNEL_FORM: &str = "create-tunnel-form";
pub const ADD_SERVICE_FORM: &str = "add-service-form";

pub const FIELD_TUNNEL_NAME: &str = "nombre_tunel";
pub const FIELD_SERVICE_NAME: &str = "service_name";
pub const FIELD_SERVICE_PORT: &str = "service_port";
pub const FIELD_DOMAIN: &str = "domain";

/// Which validator a form gets at bootstrap time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    CreateTunnel,
    AddService,
}

impl FormKind {
    pub fn from_form_id(id: &str) -> Option<Self> {
        match id {
            CREATE_TUNNEL_FORM => Some(FormKind::CreateTunnel),
            ADD_SERVICE_FORM => Some(FormKind::AddService),
            _ => None,
        }
    }

    pub fn loading_label(&self) -> &'static str {
        match self {
            FormKind::CreateTunnel => "Creando...",
            FormKind::AddService => "Añadiendo...",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Proceed,
    Prevented,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

pub fn check_create_tunnel(tunnel_name: &str) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if tunnel_name.trim().is_empty() {
        errors.push(FieldError {
            field: FIELD_TUNNEL_NAME,
            message: "El nombre del túnel es obligatorio",
        });
    }
    errors
}

/// All failures are collected; nothing short-circuits.
pub fn check_add_service(service_name: &str, service_port: &str, domain: &str) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if service_name.trim().is_empty() {
        errors.push(FieldError {
            field: FIELD_SERVICE_NAME,
            message: "El nombre del servicio es obligatorio",
        });
    }

    if service_port.trim().is_empty() {
        errors.push(FieldError {
            field: FIELD_SERVICE_PORT,
            message: "El puerto del servicio es obligatorio",
        });
    } else if parse_port(service_port).is_none() {
        errors.push(FieldError {
            field: FIELD_SERVICE_PORT,
            message: "El puerto debe ser un número entre 1 y 65535",
        });
    }

    if domain.trim().is_empty() {
        errors.push(FieldError {
            field: FIELD_DOMAIN,
            message: "El dominio es obligatorio",
        });
    }

    errors
}

/// All-digit string in 1..=65535. Surrounding whitespace is rejected.
pub fn parse_port(raw: &str) -> Option<u16> {
    if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    match raw.parse::<u32>() {
        Ok(port @ 1..=65535) => Some(port as u16),
        _ => None,
    }
}

/// Mark the field invalid and show `message` in the single feedback element after it.
pub fn show_validation_error(field: &mut InputField, message: &str) {
    field.invalid = true;
    match field.feedback.as_mut() {
        Some(feedback) => feedback.text = message.to_string(),
        None => {
            field.feedback = Some(Feedback {
                id: ElementId::new(),
                text: message.to_string(),
            })
        }
    }
    field.add_once_listener(InputListener::ClearInvalid);
}

/// Runs the submit handler attached to a form of the given kind.
pub fn validate_submission(kind: FormKind, form: &mut Form) -> SubmitOutcome {
    let errors = match kind {
        FormKind::CreateTunnel => check_create_tunnel(form.value(FIELD_TUNNEL_NAME)),
        FormKind::AddService => check_add_service(
            form.value(FIELD_SERVICE_NAME),
            form.value(FIELD_SERVICE_PORT),
            form.value(FIELD_DOMAIN),
        ),
    };

    if errors.is_empty() {
        form.submit_button.set_loading(kind.loading_label());
        return SubmitOutcome::Proceed;
    }

    for error in &errors {
        match form.field_mut(error.field) {
            Some(field) => show_validation_error(field, error.message),
            None => warn!("Form {} has no field named {}", form.id, error.field),
        }
    }
    debug!("Form {} blocked with {} error(s)", form.id, errors.len());
    SubmitOutcome::Prevented
}

/// Native yes/no confirmation
pub trait ConfirmPrompt {
    fn confirm(&self, message: &str) -> bool;
}

/// Blocking yes/no message dialog
pub struct DialogPrompt {
    pub title: String,
}

impl Default for DialogPrompt {
    fn default() -> Self {
        Self {
            title: "Confirmar eliminación".to_string(),
        }
    }
}

impl ConfirmPrompt for DialogPrompt {
    fn confirm(&self, message: &str) -> bool {
        let result = MessageDialog::new()
            .set_title(&self.title)
            .set_description(message)
            .set_buttons(MessageButtons::YesNo)
            .show();
        result == MessageDialogResult::Yes
    }
}

/// Terminal fallback for `--no-gui`; anything but an explicit yes declines.
pub struct TerminalPrompt;

impl ConfirmPrompt for TerminalPrompt {
    fn confirm(&self, message: &str) -> bool {
        print!("{} [s/N] ", message);
        if let Err(e) = io::stdout().flush() {
            warn!("Failed to flush prompt: {}", e);
        }
        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => is_affirmative(&answer),
            Err(e) => {
                warn!("Failed to read confirmation: {}", e);
                false
            }
        }
    }
}

fn is_affirmative(answer: &str) -> bool {
    matches!(
        answer.trim().to_lowercase().as_str(),
        "s" | "si" | "sí" | "y" | "yes"
    )
}

/// Confirm, then submit the form with `form_id`. Always returns false so
/// the triggering link does not navigate.
pub fn confirm_deletion(prompt: &dyn ConfirmPrompt, forms: &mut [Form], form_id: &str, message: &str) -> bool {
    if prompt.confirm(message) {
        match forms.iter_mut().find(|f| f.id == form_id) {
            Some(form) => form.submit(),
            None => warn!("No form with id {} to submit", form_id),
        }
    }
    false
}
