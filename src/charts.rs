use crate::metrics::TunnelMetrics;
use crate::page::MetricsDescriptor;
use chrono::Timelike;
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// Number of points every chart keeps on screen
pub const HISTORY_LEN: usize = 10;

/// "HH:MM" label for a chart point
pub fn time_label<T: Timelike>(now: &T) -> String {
    format!("{:02}:{:02}", now.hour(), now.minute())
}

#[derive(Debug, Clone)]
pub struct Dataset {
    pub label: String,
    pub border_color: String,
    pub background_color: String,
    pub data: VecDeque<f64>,
}

impl Dataset {
    fn seeded(label: &str, border_color: &str, background_color: &str) -> Self {
        Self {
            label: label.to_string(),
            border_color: border_color.to_string(),
            background_color: background_color.to_string(),
            data: std::iter::repeat(0.0).take(HISTORY_LEN).collect(),
        }
    }
}

/// A line chart with a fixed-width window of labelled points
#[derive(Debug, Clone)]
pub struct LineChart {
    pub labels: VecDeque<String>,
    pub datasets: Vec<Dataset>,
    redraws: u64,
}

impl LineChart {
    fn with_datasets(datasets: Vec<Dataset>) -> Self {
        Self {
            labels: std::iter::repeat(String::new()).take(HISTORY_LEN).collect(),
            datasets,
            redraws: 0,
        }
    }

    pub fn connections() -> Self {
        Self::with_datasets(vec![Dataset::seeded(
            "Conexiones",
            "#0d6efd",
            "rgba(13, 110, 253, 0.1)",
        )])
    }

    pub fn bandwidth() -> Self {
        Self::with_datasets(vec![
            Dataset::seeded("Subida (KB/s)", "#198754", "rgba(25, 135, 84, 0.1)"),
            Dataset::seeded("Bajada (KB/s)", "#dc3545", "rgba(220, 53, 69, 0.1)"),
        ])
    }

    /// Append one point per dataset and drop the oldest, keeping the window width.
    pub fn push_sample(&mut self, label: String, values: &[f64]) {
        debug_assert_eq!(values.len(), self.datasets.len());
        self.labels.push_back(label);
        self.labels.pop_front();
        for (dataset, value) in self.datasets.iter_mut().zip(values) {
            dataset.data.push_back(*value);
            dataset.data.pop_front();
        }
    }

    pub fn update(&mut self) {
        self.redraws += 1;
    }

    pub fn redraws(&self) -> u64 {
        self.redraws
    }

    /// Newest value of the given dataset
    pub fn latest(&self, dataset: usize) -> Option<f64> {
        self.datasets.get(dataset).and_then(|d| d.data.back().copied())
    }
}

/// Chart handles for one tunnel; either chart may be missing from the page
#[derive(Debug, Clone, Default)]
pub struct TunnelCharts {
    pub connections: Option<LineChart>,
    pub bandwidth: Option<LineChart>,
}

#[derive(Debug, Default)]
pub struct ChartRegistry {
    charts: HashMap<String, TunnelCharts>,
}

impl ChartRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the charts for one metrics container, merging into any existing entry.
    pub fn register(&mut self, container: &MetricsDescriptor) {
        if !container.connections && !container.bandwidth {
            return;
        }
        let entry = self.charts.entry(container.tunnel_name.clone()).or_default();
        if container.connections {
            entry.connections = Some(LineChart::connections());
        }
        if container.bandwidth {
            entry.bandwidth = Some(LineChart::bandwidth());
        }
        debug!("Registered charts for tunnel {}", container.tunnel_name);
    }

    pub fn get(&self, tunnel_name: &str) -> Option<&TunnelCharts> {
        self.charts.get(tunnel_name)
    }

    pub fn contains(&self, tunnel_name: &str) -> bool {
        self.charts.contains_key(tunnel_name)
    }

    pub fn len(&self) -> usize {
        self.charts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.charts.is_empty()
    }

    /// Push one tick of metrics into the tunnel's charts.
    ///
    /// Each chart is updated only when every value it plots is present;
    /// a tunnel without registered charts is ignored.
    pub fn update_charts<T: Timelike>(&mut self, tunnel_name: &str, metrics: &TunnelMetrics, now: &T) {
        let Some(charts) = self.charts.get_mut(tunnel_name) else {
            return;
        };
        let label = time_label(now);

        if let (Some(chart), Some(connections)) = (charts.connections.as_mut(), metrics.connections) {
            chart.push_sample(label.clone(), &[connections]);
            chart.update();
        }

        if let (Some(chart), Some((upload_kb, download_kb))) =
            (charts.bandwidth.as_mut(), metrics.bandwidth_kbps())
        {
            chart.push_sample(label, &[upload_kb, download_kb]);
            chart.update();
        }
    }
}
