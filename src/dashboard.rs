use crate::charts::ChartRegistry;
use crate::forms::{self, ConfirmPrompt, FormKind, SubmitOutcome};
use crate::metrics::StatusResponse;
use crate::page::*;
use chrono::Timelike;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Period between two status polls
pub const POLL_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Scheme and host of the dashboard backend, without trailing path
    pub base_url: String,
    pub poll_interval: Duration,
    pub request_timeout: Option<Duration>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            poll_interval: POLL_INTERVAL,
            request_timeout: None,
        }
    }
}

/// What a single status response did to its card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Updated,
    /// Backend answered `success: false`; the card is left as it was
    Ignored,
    /// Network, parse or shape failure; the card is left as it was
    Failed,
    /// The card left the page while its request was in flight
    CardGone,
}

/// Which load-time branches ran
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BootReport {
    pub tooltips_activated: usize,
    pub install_armed: bool,
    pub polling: bool,
    pub charted_tunnels: usize,
    pub validated_forms: Vec<String>,
}

/// Page controller: owns every element the dashboard drives plus the chart registry
#[derive(Debug)]
pub struct Dashboard {
    cards: Vec<TunnelCard>,
    metrics: Vec<MetricsDescriptor>,
    tooltips: Vec<TooltipTarget>,
    install_button: Option<InstallButton>,
    forms: Vec<Form>,
    validators: Vec<(String, FormKind)>,
    charts: ChartRegistry,
    polling: bool,
}

impl Dashboard {
    /// The page as rendered by the server, before any behavior is attached.
    pub fn from_descriptor(page: PageDescriptor) -> Self {
        Self {
            cards: page.cards.into_iter().map(TunnelCard::from).collect(),
            metrics: page.metrics,
            tooltips: page
                .tooltips
                .into_iter()
                .map(|element| TooltipTarget {
                    element,
                    active: false,
                })
                .collect(),
            install_button: page.install_button.then(InstallButton::default),
            forms: page.forms.into_iter().map(Form::from).collect(),
            validators: Vec::new(),
            charts: ChartRegistry::new(),
            polling: false,
        }
    }

    /// Attach all behavior. Each step only runs when its elements are present.
    pub fn bootstrap(&mut self) -> BootReport {
        let mut report = BootReport::default();

        for tooltip in &mut self.tooltips {
            tooltip.active = true;
        }
        report.tooltips_activated = self.tooltips.len();

        if let Some(button) = self.install_button.as_mut() {
            button.arm();
            report.install_armed = true;
        }

        self.polling = !self.cards.is_empty();
        report.polling = self.polling;

        for container in &self.metrics {
            self.charts.register(container);
        }
        report.charted_tunnels = self.charts.len();

        for form in &self.forms {
            if let Some(kind) = FormKind::from_form_id(&form.id) {
                self.validators.push((form.id.clone(), kind));
                report.validated_forms.push(form.id.clone());
            }
        }

        info!(
            "Dashboard ready: {} card(s), {} charted tunnel(s), {} validated form(s)",
            self.cards.len(),
            report.charted_tunnels,
            report.validated_forms.len()
        );
        report
    }

    pub fn polling_enabled(&self) -> bool {
        self.polling
    }

    pub fn cards(&self) -> &[TunnelCard] {
        &self.cards
    }

    pub fn card(&self, id: ElementId) -> Option<&TunnelCard> {
        self.cards.iter().find(|c| c.id == id)
    }

    pub fn card_by_name(&self, tunnel_name: &str) -> Option<&TunnelCard> {
        self.cards.iter().find(|c| c.tunnel_name == tunnel_name)
    }

    /// Cards rendered after load are picked up on the next poll.
    pub fn add_card(&mut self, card: CardDescriptor) -> ElementId {
        let card = TunnelCard::from(card);
        let id = card.id;
        self.cards.push(card);
        id
    }

    pub fn remove_card(&mut self, id: ElementId) -> bool {
        let before = self.cards.len();
        self.cards.retain(|c| c.id != id);
        self.cards.len() != before
    }

    /// Snapshot of the cards to poll on this tick
    pub fn poll_targets(&self) -> Vec<(ElementId, String)> {
        self.cards
            .iter()
            .map(|c| (c.id, c.tunnel_name.clone()))
            .collect()
    }

    pub fn charts(&self) -> &ChartRegistry {
        &self.charts
    }

    pub fn tooltips(&self) -> &[TooltipTarget] {
        &self.tooltips
    }

    pub fn install_button(&self) -> Option<&InstallButton> {
        self.install_button.as_ref()
    }

    pub fn click_install(&mut self) -> bool {
        self.install_button.as_mut().map_or(false, InstallButton::click)
    }

    /// Apply one status response to the card it was fetched for.
    pub fn apply_status<T: Timelike>(&mut self, card_id: ElementId, response: &StatusResponse, now: &T) -> PollOutcome {
        if !response.success {
            debug!(
                "Status request for card {} reported failure: {}",
                card_id,
                response.error.as_deref().unwrap_or("no details")
            );
            return PollOutcome::Ignored;
        }

        let Some(state) = response.status.as_ref() else {
            error!("Status response for card {} has no tunnel state", card_id);
            return PollOutcome::Failed;
        };

        let Some(card) = self.cards.iter_mut().find(|c| c.id == card_id) else {
            debug!("Card {} is no longer on the page", card_id);
            return PollOutcome::CardGone;
        };

        if state.running {
            card.status_badge
                .set_state(STATUS_BADGE_CLASS, BadgeVariant::Success, "Activo");
        } else {
            card.status_badge
                .set_state(STATUS_BADGE_CLASS, BadgeVariant::Danger, "Inactivo");
        }

        match response.connectivity {
            Some(true) => card.connectivity_badge.set_state(
                CONNECTIVITY_BADGE_CLASS,
                BadgeVariant::Success,
                "Conectado",
            ),
            Some(false) => card.connectivity_badge.set_state(
                CONNECTIVITY_BADGE_CLASS,
                BadgeVariant::Warning,
                "Problemas de conectividad",
            ),
            None => {}
        }

        card.last_updated = format!(
            "{}{:02}:{:02}:{:02}",
            LAST_UPDATED_PREFIX,
            now.hour(),
            now.minute(),
            now.second()
        );

        let tunnel_name = card.tunnel_name.clone();
        if let Some(metrics) = response.metrics.as_ref() {
            if self.charts.contains(&tunnel_name) {
                self.charts.update_charts(&tunnel_name, metrics, now);
            }
        }

        PollOutcome::Updated
    }

    pub fn forms(&self) -> &[Form] {
        &self.forms
    }

    pub fn form(&self, id: &str) -> Option<&Form> {
        self.forms.iter().find(|f| f.id == id)
    }

    /// Submit a form through its attached validator, if any.
    pub fn submit_form(&mut self, id: &str) -> Option<SubmitOutcome> {
        let kind = self
            .validators
            .iter()
            .find(|(form_id, _)| form_id == id)
            .map(|(_, kind)| *kind);
        let form = self.forms.iter_mut().find(|f| f.id == id)?;

        let outcome = match kind {
            Some(kind) => forms::validate_submission(kind, form),
            None => SubmitOutcome::Proceed,
        };
        if outcome == SubmitOutcome::Proceed {
            form.submit();
        }
        Some(outcome)
    }

    /// User typing into a field of a form.
    pub fn input(&mut self, form_id: &str, field: &str, value: &str) -> bool {
        match self
            .forms
            .iter_mut()
            .find(|f| f.id == form_id)
            .and_then(|f| f.field_mut(field))
        {
            Some(input) => {
                input.input(value);
                true
            }
            None => {
                warn!("No field {} in form {}", field, form_id);
                false
            }
        }
    }

    pub fn confirm_deletion(&mut self, prompt: &dyn ConfirmPrompt, form_id: &str, message: &str) -> bool {
        forms::confirm_deletion(prompt, &mut self.forms, form_id, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::{ADD_SERVICE_FORM, CREATE_TUNNEL_FORM};
    use crate::metrics::TunnelMetrics;
    use chrono::NaiveTime;

    fn noon() -> NaiveTime {
        NaiveTime::from_hms_opt(12, 4, 9).unwrap()
    }

    fn status_page() -> PageDescriptor {
        PageDescriptor {
            cards: vec![CardDescriptor::new("web"), CardDescriptor::new("db")],
            metrics: vec![MetricsDescriptor::new("web")],
            tooltips: vec!["help".to_string(), "docs".to_string()],
            install_button: true,
            forms: vec![
                FormDescriptor::new(CREATE_TUNNEL_FORM).with_field("nombre_tunel", ""),
                FormDescriptor::new("delete-web"),
            ],
        }
    }

    fn booted(page: PageDescriptor) -> Dashboard {
        let mut dashboard = Dashboard::from_descriptor(page);
        dashboard.bootstrap();
        dashboard
    }

    fn card_id(dashboard: &Dashboard, name: &str) -> ElementId {
        dashboard.card_by_name(name).unwrap().id
    }

    #[test]
    fn bootstrap_wires_every_present_element() {
        let mut dashboard = Dashboard::from_descriptor(status_page());
        let report = dashboard.bootstrap();
        assert_eq!(report.tooltips_activated, 2);
        assert!(dashboard.tooltips().iter().all(|t| t.active));
        assert!(report.install_armed);
        assert!(report.polling);
        assert_eq!(report.charted_tunnels, 1);
        assert_eq!(report.validated_forms, vec![CREATE_TUNNEL_FORM.to_string()]);
    }

    #[test]
    fn bootstrap_on_empty_page_does_nothing() {
        let mut dashboard = Dashboard::from_descriptor(PageDescriptor::default());
        let report = dashboard.bootstrap();
        assert_eq!(report, BootReport::default());
        assert!(!dashboard.polling_enabled());
        assert!(dashboard.charts().is_empty());
        assert!(!dashboard.click_install());
    }

    #[test]
    fn install_click_switches_to_loading_once() {
        let mut dashboard = booted(status_page());
        assert!(dashboard.click_install());
        let button = dashboard.install_button().unwrap();
        assert!(button.disabled);
        assert_eq!(button.label, "Instalando...");
        assert!(!dashboard.click_install());
    }

    #[test]
    fn running_tunnel_with_null_connectivity() {
        let mut dashboard = booted(status_page());
        let id = card_id(&dashboard, "web");
        let before = dashboard.card(id).unwrap().connectivity_badge.clone();

        let outcome = dashboard.apply_status(id, &StatusResponse::running(true), &noon());
        assert_eq!(outcome, PollOutcome::Updated);

        let card = dashboard.card(id).unwrap();
        assert_eq!(card.status_badge.text, "Activo");
        assert_eq!(card.status_badge.class_name, "badge status-badge bg-success");
        assert_eq!(card.connectivity_badge, before);
        assert_eq!(card.last_updated, "Última actualización: 12:04:09");
    }

    #[test]
    fn stopped_tunnel_with_connectivity_problems() {
        let mut dashboard = booted(status_page());
        let id = card_id(&dashboard, "db");
        let response = StatusResponse::running(false).with_connectivity(false);
        dashboard.apply_status(id, &response, &noon());

        let card = dashboard.card(id).unwrap();
        assert_eq!(card.status_badge.class_name, "badge status-badge bg-danger");
        assert_eq!(card.status_badge.text, "Inactivo");
        assert_eq!(card.connectivity_badge.class_name, "badge connectivity-badge bg-warning");
        assert_eq!(card.connectivity_badge.text, "Problemas de conectividad");
    }

    #[test]
    fn connected_tunnel_gets_success_badge() {
        let mut dashboard = booted(status_page());
        let id = card_id(&dashboard, "web");
        dashboard.apply_status(id, &StatusResponse::running(true).with_connectivity(true), &noon());
        let card = dashboard.card(id).unwrap();
        assert_eq!(card.connectivity_badge.class_name, "badge connectivity-badge bg-success");
        assert_eq!(card.connectivity_badge.text, "Conectado");
    }

    #[test]
    fn failure_response_leaves_card_untouched() {
        let mut dashboard = booted(status_page());
        let id = card_id(&dashboard, "web");
        let before = dashboard.card(id).unwrap().clone();

        let outcome = dashboard.apply_status(id, &StatusResponse::failure("boom"), &noon());
        assert_eq!(outcome, PollOutcome::Ignored);

        let after = dashboard.card(id).unwrap();
        assert_eq!(after.status_badge, before.status_badge);
        assert_eq!(after.last_updated, before.last_updated);
    }

    #[test]
    fn success_without_state_is_a_failure() {
        let mut dashboard = booted(status_page());
        let id = card_id(&dashboard, "web");
        let response = StatusResponse {
            success: true,
            ..Default::default()
        };
        assert_eq!(dashboard.apply_status(id, &response, &noon()), PollOutcome::Failed);
        assert!(dashboard.card(id).unwrap().last_updated.is_empty());
    }

    #[test]
    fn metrics_are_forwarded_to_charts() {
        let mut dashboard = booted(status_page());
        let id = card_id(&dashboard, "web");
        let response = StatusResponse::running(true).with_metrics(TunnelMetrics {
            connections: Some(4.0),
            upload: Some(2048.0),
            download: Some(1024.0),
            ..Default::default()
        });
        dashboard.apply_status(id, &response, &noon());

        let charts = dashboard.charts().get("web").unwrap();
        assert_eq!(charts.connections.as_ref().unwrap().latest(0), Some(4.0));
        let bandwidth = charts.bandwidth.as_ref().unwrap();
        assert_eq!(bandwidth.latest(0), Some(2.0));
        assert_eq!(bandwidth.latest(1), Some(1.0));
        assert_eq!(bandwidth.labels.back().map(String::as_str), Some("12:04"));
    }

    #[test]
    fn metrics_for_uncharted_tunnel_still_update_card() {
        let mut dashboard = booted(status_page());
        let id = card_id(&dashboard, "db");
        let response = StatusResponse::running(true).with_metrics(TunnelMetrics {
            connections: Some(1.0),
            ..Default::default()
        });
        assert_eq!(dashboard.apply_status(id, &response, &noon()), PollOutcome::Updated);
        assert!(dashboard.charts().get("db").is_none());
    }

    #[test]
    fn removed_card_is_reported_gone() {
        let mut dashboard = booted(status_page());
        let id = card_id(&dashboard, "db");
        assert!(dashboard.remove_card(id));
        assert_eq!(
            dashboard.apply_status(id, &StatusResponse::running(true), &noon()),
            PollOutcome::CardGone
        );
        assert_eq!(dashboard.poll_targets().len(), 1);
    }

    #[test]
    fn added_card_becomes_a_poll_target() {
        let mut dashboard = booted(status_page());
        let id = dashboard.add_card(CardDescriptor::new("cache"));
        assert!(dashboard.poll_targets().iter().any(|(card, name)| *card == id && name == "cache"));
    }

    #[test]
    fn cards_sharing_a_name_are_updated_separately() {
        let mut page = status_page();
        page.cards.push(CardDescriptor::new("web"));
        let mut dashboard = booted(page);
        let ids: Vec<ElementId> = dashboard
            .cards()
            .iter()
            .filter(|c| c.tunnel_name == "web")
            .map(|c| c.id)
            .collect();
        assert_eq!(ids.len(), 2);

        dashboard.apply_status(ids[0], &StatusResponse::running(true), &noon());
        assert_eq!(dashboard.card(ids[0]).unwrap().status_badge.text, "Activo");
        assert_eq!(dashboard.card(ids[1]).unwrap().status_badge.text, "");
    }

    #[test]
    fn invalid_creation_is_blocked_then_fixed() {
        let mut dashboard = booted(status_page());
        assert_eq!(dashboard.submit_form(CREATE_TUNNEL_FORM), Some(SubmitOutcome::Prevented));
        let form = dashboard.form(CREATE_TUNNEL_FORM).unwrap();
        assert!(!form.submitted);
        let with_feedback = form.fields.iter().filter(|f| f.feedback.is_some()).count();
        assert_eq!(with_feedback, 1);

        assert!(dashboard.input(CREATE_TUNNEL_FORM, "nombre_tunel", "web"));
        assert!(!dashboard.form(CREATE_TUNNEL_FORM).unwrap().fields[0].invalid);
        assert_eq!(dashboard.submit_form(CREATE_TUNNEL_FORM), Some(SubmitOutcome::Proceed));
        let form = dashboard.form(CREATE_TUNNEL_FORM).unwrap();
        assert!(form.submitted);
        assert_eq!(form.submit_button.label, "Creando...");
    }

    #[test]
    fn service_form_with_valid_fields_submits() {
        let page = PageDescriptor {
            forms: vec![FormDescriptor::new(ADD_SERVICE_FORM)
                .with_field("service_name", "api")
                .with_field("service_port", "8080")
                .with_field("domain", "api.example.com")],
            ..Default::default()
        };
        let mut dashboard = booted(page);
        assert_eq!(dashboard.submit_form(ADD_SERVICE_FORM), Some(SubmitOutcome::Proceed));
        let form = dashboard.form(ADD_SERVICE_FORM).unwrap();
        assert!(form.submit_button.disabled);
        assert_eq!(form.submit_button.label, "Añadiendo...");
    }

    #[test]
    fn forms_without_validator_submit_directly() {
        let mut dashboard = booted(status_page());
        assert_eq!(dashboard.submit_form("delete-web"), Some(SubmitOutcome::Proceed));
        assert_eq!(dashboard.submit_form("missing"), None);
    }

    #[test]
    fn validators_attach_only_at_bootstrap() {
        let mut dashboard = Dashboard::from_descriptor(status_page());
        assert_eq!(dashboard.submit_form(CREATE_TUNNEL_FORM), Some(SubmitOutcome::Proceed));
    }

    #[test]
    fn confirmed_deletion_submits_form() {
        struct Yes;
        impl ConfirmPrompt for Yes {
            fn confirm(&self, _message: &str) -> bool {
                true
            }
        }

        let mut dashboard = booted(status_page());
        assert!(!dashboard.confirm_deletion(&Yes, "delete-web", "¿Eliminar?"));
        assert!(dashboard.form("delete-web").unwrap().submitted);
    }
}
