use serde::{Deserialize, Serialize};

/// Divisor used to turn bytes/second into kilobytes/second
pub const BYTES_PER_KB: f64 = 1024.0;

/// Body returned by `GET /api/estado-tunel/{name}`
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct StatusResponse {
    pub success: bool,
    #[serde(default)]
    pub status: Option<TunnelState>,
    /// `None` when the backend could not tell (JSON `null`)
    #[serde(default)]
    pub connectivity: Option<bool>,
    #[serde(default)]
    pub metrics: Option<TunnelMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusResponse {
    pub fn running(running: bool) -> Self {
        Self {
            success: true,
            status: Some(TunnelState { running }),
            ..Default::default()
        }
    }

    pub fn failure(error: &str) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            ..Default::default()
        }
    }

    pub fn with_connectivity(mut self, connectivity: bool) -> Self {
        self.connectivity = Some(connectivity);
        self
    }

    pub fn with_metrics(mut self, metrics: TunnelMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TunnelState {
    pub running: bool,
}

/// Live counters reported for a running tunnel. Every field may be absent.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TunnelMetrics {
    #[serde(default)]
    pub connections: Option<f64>,
    /// Bytes per second
    #[serde(default)]
    pub upload: Option<f64>,
    /// Bytes per second
    #[serde(default)]
    pub download: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_formatted: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_formatted: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl TunnelMetrics {
    /// Upload and download in KB/s, only when both are reported.
    pub fn bandwidth_kbps(&self) -> Option<(f64, f64)> {
        match (self.upload, self.download) {
            (Some(up), Some(down)) => Some((up / BYTES_PER_KB, down / BYTES_PER_KB)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_backend_payload() {
        let body = r#"{
            "success": true,
            "status": {"running": true, "pid": 4242},
            "connectivity": false,
            "metrics": {
                "connections": 3,
                "upload": 2048,
                "download": 1024,
                "upload_formatted": "2.0 KB/s",
                "download_formatted": "1.0 KB/s",
                "timestamp": "12:00:01"
            }
        }"#;
        let response: StatusResponse = serde_json::from_str(body).unwrap();
        assert!(response.success);
        assert_eq!(response.status, Some(TunnelState { running: true }));
        assert_eq!(response.connectivity, Some(false));
        let metrics = response.metrics.unwrap();
        assert_eq!(metrics.connections, Some(3.0));
        assert_eq!(metrics.bandwidth_kbps(), Some((2.0, 1.0)));
    }

    #[test]
    fn null_connectivity_and_metrics_are_absent() {
        let body = r#"{"success": true, "status": {"running": false}, "connectivity": null, "metrics": null}"#;
        let response: StatusResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.connectivity, None);
        assert_eq!(response.metrics, None);
    }

    #[test]
    fn failure_payload_keeps_error_text() {
        let body = r#"{"success": false, "error": "cloudflared not found"}"#;
        let response: StatusResponse = serde_json::from_str(body).unwrap();
        assert!(!response.success);
        assert!(response.status.is_none());
        assert_eq!(response.error.as_deref(), Some("cloudflared not found"));
    }

    #[test]
    fn bandwidth_needs_both_directions() {
        let metrics = TunnelMetrics {
            upload: Some(4096.0),
            ..Default::default()
        };
        assert_eq!(metrics.bandwidth_kbps(), None);
    }
}
