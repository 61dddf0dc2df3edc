//! Publishing plot snapshots to the rendering side
//!
//! Each plot is wrapped in a [`PublishedPlot`] consumer that is the single
//! writer of its state. After every update the new snapshot is pushed into a
//! `watch` channel; HTTP and WebSocket handlers only ever hold receivers.

use std::sync::Arc;

use gnssviz_core::{Consumer, ConsumerError, DecodedRecord, MessageId, PlotSnapshot, PlotState};
use serde::Serialize;
use tokio::sync::watch;

pub struct PublishedPlot {
    plot: Box<dyn PlotState>,
    tx: watch::Sender<PlotSnapshot>,
}

impl Consumer for PublishedPlot {
    fn name(&self) -> &str {
        self.plot.id()
    }

    fn interests(&self) -> &[MessageId] {
        self.plot.messages()
    }

    fn consume(&mut self, record: &DecodedRecord) -> Result<(), ConsumerError> {
        self.plot.update(record)?;
        self.tx.send_replace(self.plot.snapshot());
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlotInfo {
    pub id: &'static str,
    pub title: &'static str,
    pub messages: Vec<MessageId>,
}

#[derive(Clone)]
struct PlotEntry {
    info: PlotInfo,
    rx: watch::Receiver<PlotSnapshot>,
}

/// Read side of every published plot
#[derive(Clone, Default)]
pub struct PlotBoard {
    entries: Arc<Vec<PlotEntry>>,
}

impl PlotBoard {
    pub fn list(&self) -> Vec<PlotInfo> {
        self.entries.iter().map(|e| e.info.clone()).collect()
    }

    pub fn subscribe(&self, id: &str) -> Option<watch::Receiver<PlotSnapshot>> {
        self.entries
            .iter()
            .find(|e| e.info.id == id)
            .map(|e| e.rx.clone())
    }

    /// Latest snapshot of plot `id`
    pub fn snapshot(&self, id: &str) -> Option<PlotSnapshot> {
        self.subscribe(id).map(|rx| rx.borrow().clone())
    }
}

/// Split plots into dispatcher consumers and a shared read side
pub fn publish(plots: Vec<Box<dyn PlotState>>) -> (Vec<PublishedPlot>, PlotBoard) {
    let mut consumers = Vec::with_capacity(plots.len());
    let mut entries = Vec::with_capacity(plots.len());

    for plot in plots {
        let (tx, rx) = watch::channel(plot.snapshot());
        entries.push(PlotEntry {
            info: PlotInfo {
                id: plot.id(),
                title: plot.title(),
                messages: plot.messages().to_vec(),
            },
            rx,
        });
        consumers.push(PublishedPlot { plot, tx });
    }

    (
        consumers,
        PlotBoard {
            entries: Arc::new(entries),
        },
    )
}
