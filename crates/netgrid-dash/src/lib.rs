pub mod bus;
pub mod config;
pub mod mediator;
pub mod query;
pub mod render;

pub use bus::{BusEvent, Filter, FilterBus, InProcessBus};
pub use config::{load_or_default, save, DashboardConfig};
pub use mediator::{Effect, GraphMediator, RebuildStats};
pub use query::{QueryDescriptor, QueryError, QueryOutcome, QueryRunner, QueryService};
pub use render::{GraphRenderer, RecordingRenderer};

use netgrid_core::{Bucketizer, NodeId};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt::try_init();
}

/// Filter id this widget owns on the bus.
const SELECTION_FILTER_ID: &str = "graph_selection";

/// One graph widget wired to its collaborators: the mediator in the middle,
/// a query service behind a last-request-wins runner, a renderer, and the
/// shared filter bus. The hosting page forwards DOM events to `on_*` and
/// drives `pump` whenever query results arrive.
pub struct Dashboard<R: GraphRenderer, B: FilterBus> {
    mediator: GraphMediator,
    renderer: R,
    bus: B,
    runner: QueryRunner,
    outcomes: mpsc::Receiver<QueryOutcome>,
    bucketizer: Box<dyn Bucketizer>,
}

impl<R: GraphRenderer, B: FilterBus> Dashboard<R, B> {
    pub fn new(
        config: &DashboardConfig,
        service: Arc<dyn QueryService>,
        renderer: R,
        bus: B,
        bucketizer: Box<dyn Bucketizer>,
    ) -> Self {
        let (tx, outcomes) = mpsc::channel(8);
        Self {
            mediator: GraphMediator::new(config.graph_options()),
            renderer,
            bus,
            runner: QueryRunner::new(service, tx),
            outcomes,
            bucketizer,
        }
    }

    pub fn mediator(&self) -> &GraphMediator {
        &self.mediator
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Issue (or re-issue) the widget's query; any in-flight request is
    /// cancelled first.
    pub fn refresh(&mut self, query: QueryDescriptor) {
        self.runner.dispatch(query);
    }

    /// Wait for the next query outcome and fold it into graph state. Stale
    /// generations are discarded. Returns false once the outcome channel is
    /// closed.
    pub async fn pump(&mut self) -> bool {
        while let Some(outcome) = self.outcomes.recv().await {
            if !self.runner.is_current(outcome.generation) {
                tracing::debug!(generation = outcome.generation, "dropping stale query outcome");
                continue;
            }
            match outcome.result {
                Ok(rows) => {
                    self.mediator.evaluate_rows(&rows, self.bucketizer.as_ref());
                    self.render();
                }
                Err(err) => {
                    tracing::warn!(error = %err, "query failed");
                }
            }
            return true;
        }
        false
    }

    /// Redraw if anything changed since the last frame.
    pub fn render(&mut self) {
        if self.mediator.take_redraw_request() {
            self.renderer.update_graph(
                self.mediator.visible_nodes(),
                self.mediator.visible_links(),
            );
        }
    }

    pub fn on_click(&mut self, key: &str) {
        let effects = self.mediator.click_node_key(key);
        self.apply_effects(effects);
    }

    pub fn on_clear_selection(&mut self) {
        let effects = self.mediator.clear_selection();
        self.apply_effects(effects);
    }

    pub fn on_hover(&mut self, key: &str) {
        let effects = self.mediator.hover_node_key(key);
        self.apply_effects(effects);
    }

    pub fn on_hover_cleared(&mut self) {
        let effects = self.mediator.clear_hover();
        self.apply_effects(effects);
    }

    pub fn on_date_bucket(&mut self, bucket: Option<usize>) {
        let effects = self
            .mediator
            .select_date_bucket(bucket, self.bucketizer.as_ref());
        self.apply_effects(effects);
    }

    /// Selection pushed from another widget over the bus.
    pub fn on_selection_restored(&mut self, ids: Vec<NodeId>) {
        self.mediator.set_selected_node_ids(ids);
        self.render();
    }

    pub fn selected_node_ids(&self) -> &[NodeId] {
        self.mediator.selected_node_ids()
    }

    pub fn node_ids_in_selected_network(&self) -> Vec<NodeId> {
        self.mediator.node_ids_in_selected_network()
    }

    fn apply_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Redraw => self.render(),
                Effect::Pulse(keys) => self.renderer.request_pulse(&keys),
                Effect::BroadcastSelection(ids) => self.broadcast_selection(ids),
            }
        }
    }

    fn broadcast_selection(&mut self, ids: Vec<NodeId>) {
        let values: Vec<String> = ids.iter().map(|id| id.0.clone()).collect();
        if values.is_empty() {
            self.bus.remove_filter(SELECTION_FILTER_ID);
        } else {
            self.bus.replace_filter(Filter {
                id: SELECTION_FILTER_ID.to_string(),
                field: self.mediator.options().node_field.clone(),
                values: values.clone(),
            });
        }
        self.bus
            .publish("graph.selection", json!({ "node_ids": values }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use netgrid_core::{NullBucketizer, Row};
    use serde_json::{json, Value};
    use std::time::Duration;

    struct FixedService {
        rows: Vec<Value>,
        delay: Duration,
    }

    #[async_trait]
    impl QueryService for FixedService {
        async fn run(&self, _query: &QueryDescriptor) -> Result<Vec<Row>, QueryError> {
            tokio::time::sleep(self.delay).await;
            Ok(self
                .rows
                .iter()
                .cloned()
                .map(|v| Row::from_value(v).expect("row"))
                .collect())
        }
    }

    fn dashboard_with(
        rows: Vec<Value>,
        delay: Duration,
    ) -> Dashboard<RecordingRenderer, InProcessBus> {
        let mut config = DashboardConfig::default();
        config.node_field = "src".to_string();
        config.linked_node_field = Some("dst".to_string());
        Dashboard::new(
            &config,
            Arc::new(FixedService { rows, delay }),
            RecordingRenderer::default(),
            InProcessBus::new(),
            Box::new(NullBucketizer),
        )
    }

    #[tokio::test]
    async fn refresh_pump_render_reaches_the_renderer() {
        let mut dash = dashboard_with(
            vec![json!({"src": "a", "dst": "b"})],
            Duration::from_millis(1),
        );

        dash.refresh(QueryDescriptor::default());
        assert!(dash.pump().await);

        assert_eq!(dash.renderer().updates, 1);
        assert_eq!(dash.renderer().last_node_keys.len(), 2);
        assert_eq!(dash.renderer().last_link_keys.len(), 1);
    }

    #[tokio::test]
    async fn clicking_a_node_replaces_the_shared_filter() {
        let mut dash = dashboard_with(
            vec![json!({"src": "a", "dst": "b"})],
            Duration::from_millis(1),
        );
        let rx = dash.bus_mut().subscribe();

        dash.refresh(QueryDescriptor::default());
        assert!(dash.pump().await);
        dash.on_click("node_a");

        let replaced = rx
            .try_iter()
            .find_map(|e| match e {
                BusEvent::FilterReplaced(f) => Some(f),
                _ => None,
            })
            .expect("filter replaced");
        assert_eq!(replaced.field, "src");
        assert_eq!(replaced.values, vec!["a".to_string()]);

        // deselect removes the filter again
        dash.on_click("node_a");
        assert!(rx
            .try_iter()
            .any(|e| matches!(e, BusEvent::FilterRemoved(id) if id == SELECTION_FILTER_ID)));
    }

    #[tokio::test]
    async fn a_second_refresh_discards_the_slow_first_response() {
        let mut dash = dashboard_with(
            vec![json!({"src": "a", "dst": "b"})],
            Duration::from_millis(150),
        );

        dash.refresh(QueryDescriptor::default());
        dash.refresh(QueryDescriptor {
            search: "newer".to_string(),
            ..QueryDescriptor::default()
        });
        assert!(dash.pump().await);

        // only the second response made it into graph state
        assert_eq!(dash.mediator().stats().rebuilds, 1);
        assert_eq!(dash.renderer().updates, 1);
    }

    #[tokio::test]
    async fn restored_selection_survives_the_next_refresh() {
        let mut dash = dashboard_with(
            vec![json!({"src": "a", "dst": "b"})],
            Duration::from_millis(1),
        );
        dash.on_selection_restored(vec![NodeId::new("a")]);

        dash.refresh(QueryDescriptor::default());
        assert!(dash.pump().await);

        assert_eq!(dash.selected_node_ids(), &[NodeId::new("a")]);
        let mut ids = dash.node_ids_in_selected_network();
        ids.sort();
        assert_eq!(ids, vec![NodeId::new("a"), NodeId::new("b")]);
    }
}
