use crate::dashboard::{Dashboard, DashboardConfig, PollOutcome};
use crate::metrics::StatusResponse;
use crate::page::ElementId;
use async_trait::async_trait;
use chrono::Local;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

pub type SharedDashboard = Arc<Mutex<Dashboard>>;

/// Where tunnel status comes from
#[async_trait]
pub trait StatusSource: Send + Sync + 'static {
    async fn fetch_status(&self, tunnel_name: &str) -> anyhow::Result<StatusResponse>;
}

/// `GET {base_url}/api/estado-tunel/{name}` over HTTP
pub struct HttpStatusSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpStatusSource {
    pub fn new(config: &DashboardConfig) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// The name is interpolated as-is; card names come from the server.
    pub fn status_url(&self, tunnel_name: &str) -> String {
        format!("{}/api/estado-tunel/{}", self.base_url, tunnel_name)
    }
}

#[async_trait]
impl StatusSource for HttpStatusSource {
    async fn fetch_status(&self, tunnel_name: &str) -> anyhow::Result<StatusResponse> {
        let url = self.status_url(tunnel_name);
        debug!("Fetching {}", url);
        let response = self.client.get(&url).send().await?;
        let status = response.json::<StatusResponse>().await?;
        Ok(status)
    }
}

pub struct StatusPoller<S> {
    dashboard: SharedDashboard,
    source: Arc<S>,
    interval: Duration,
}

impl<S: StatusSource> StatusPoller<S> {
    pub fn new(dashboard: SharedDashboard, source: Arc<S>, interval: Duration) -> anyhow::Result<Self> {
        if interval.is_zero() {
            anyhow::bail!("Polling interval must be greater than zero");
        }
        Ok(Self {
            dashboard,
            source,
            interval,
        })
    }

    /// Poll forever. The first poll happens one full interval after start.
    pub async fn start(self) {
        info!("Starting tunnel status polling every {:?}", self.interval);
        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let requests = self.poll_once();
            debug!("Issued {} status request(s)", requests.len());
        }
    }

    /// Fire one independent request per card currently on the page.
    ///
    /// Requests are not awaited here; a slow or failing card never holds
    /// back the others, and a request still in flight from an earlier tick
    /// is not cancelled.
    pub fn poll_once(&self) -> Vec<JoinHandle<PollOutcome>> {
        let targets = lock(&self.dashboard).poll_targets();
        targets
            .into_iter()
            .map(|(card_id, tunnel_name)| {
                let dashboard = self.dashboard.clone();
                let source = self.source.clone();
                tokio::spawn(refresh_card(dashboard, source, card_id, tunnel_name))
            })
            .collect()
    }
}

async fn refresh_card<S: StatusSource>(
    dashboard: SharedDashboard,
    source: Arc<S>,
    card_id: ElementId,
    tunnel_name: String,
) -> PollOutcome {
    match source.fetch_status(&tunnel_name).await {
        Ok(response) => {
            let mut dashboard = lock(&dashboard);
            let outcome = dashboard.apply_status(card_id, &response, &Local::now());
            if outcome == PollOutcome::Updated {
                if let Some(card) = dashboard.card(card_id) {
                    info!(
                        tunnel = %card.tunnel_name,
                        status = %card.status_badge.text,
                        connectivity = %card.connectivity_badge.text,
                        "Tunnel status refreshed"
                    );
                }
            }
            outcome
        }
        Err(e) => {
            error!("Failed to refresh tunnel status for {}: {}", tunnel_name, e);
            PollOutcome::Failed
        }
    }
}

fn lock(dashboard: &SharedDashboard) -> std::sync::MutexGuard<'_, Dashboard> {
    dashboard.lock().unwrap_or_else(PoisonError::into_inner)
}
