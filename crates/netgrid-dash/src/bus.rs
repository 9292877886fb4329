use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One shared-filter entry as broadcast between dashboard widgets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub id: String,
    pub field: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BusEvent {
    FilterAdded(Filter),
    FilterReplaced(Filter),
    FilterRemoved(String),
    Published { topic: String, payload: Value },
}

/// The dashboard's filter-registry / pub-sub surface. The wire format beyond
/// these types belongs to the hosting page, not to this crate.
pub trait FilterBus {
    fn add_filter(&mut self, filter: Filter);
    /// Upserts by filter id.
    fn replace_filter(&mut self, filter: Filter);
    fn remove_filter(&mut self, id: &str);
    fn publish(&mut self, topic: &str, payload: Value);
    fn subscribe(&mut self) -> Receiver<BusEvent>;
    fn filters(&self) -> &[Filter];
}

/// In-process bus fanning events out over crossbeam channels; disconnected
/// subscribers are dropped on the next send.
#[derive(Default)]
pub struct InProcessBus {
    filters: Vec<Filter>,
    subscribers: Vec<Sender<BusEvent>>,
}

impl InProcessBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn fan_out(&mut self, event: BusEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl FilterBus for InProcessBus {
    fn add_filter(&mut self, filter: Filter) {
        self.filters.push(filter.clone());
        self.fan_out(BusEvent::FilterAdded(filter));
    }

    fn replace_filter(&mut self, filter: Filter) {
        match self.filters.iter_mut().find(|f| f.id == filter.id) {
            Some(slot) => *slot = filter.clone(),
            None => self.filters.push(filter.clone()),
        }
        self.fan_out(BusEvent::FilterReplaced(filter));
    }

    fn remove_filter(&mut self, id: &str) {
        let before = self.filters.len();
        self.filters.retain(|f| f.id != id);
        if self.filters.len() != before {
            self.fan_out(BusEvent::FilterRemoved(id.to_string()));
        }
    }

    fn publish(&mut self, topic: &str, payload: Value) {
        self.fan_out(BusEvent::Published {
            topic: topic.to_string(),
            payload,
        });
    }

    fn subscribe(&mut self) -> Receiver<BusEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    fn filters(&self) -> &[Filter] {
        &self.filters
    }
}
