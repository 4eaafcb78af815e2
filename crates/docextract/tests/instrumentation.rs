//! Spans and stage events emitted by the orchestrator.

use docextract::{DocumentHandle, ExtractionConfig, OcrEngineSet, Orchestrator};
use std::fmt::Debug;
use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id};
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;

#[derive(Default, Clone)]
struct Recorded {
    spans: Arc<Mutex<Vec<String>>>,
    stages: Arc<Mutex<Vec<String>>>,
}

struct Collector(Recorded);

struct StageVisitor<'a>(&'a mut Option<String>);

impl Visit for StageVisitor<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn Debug) {
        if field.name() == "stage" {
            *self.0 = Some(format!("{value:?}"));
        }
    }
}

impl<S: Subscriber + for<'a> LookupSpan<'a>> Layer<S> for Collector {
    fn on_new_span(&self, attrs: &Attributes<'_>, _id: &Id, _ctx: Context<'_, S>) {
        self.0.spans.lock().unwrap().push(attrs.metadata().name().to_string());
    }

    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut stage = None;
        event.record(&mut StageVisitor(&mut stage));
        if let Some(stage) = stage {
            self.0.stages.lock().unwrap().push(stage);
        }
    }
}

fn orchestrator() -> Orchestrator {
    Orchestrator::builder()
        .ocr_engines(OcrEngineSet::empty())
        .build()
        .unwrap()
}

fn note(text: &str) -> DocumentHandle {
    DocumentHandle::from_bytes(text.as_bytes().to_vec()).with_name("note.txt")
}

#[tokio::test]
async fn test_miss_walks_every_stage() {
    let recorded = Recorded::default();
    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(Collector(recorded.clone())));

    orchestrator()
        .extract(note("instrumented"), &ExtractionConfig::default())
        .await
        .unwrap();

    let stages = recorded.stages.lock().unwrap().clone();
    assert_eq!(
        stages,
        ["Detecting", "CacheLookup", "Selecting", "Extracting", "PostProcessing"]
    );
    assert!(recorded.spans.lock().unwrap().contains(&"run".to_string()));
}

#[tokio::test]
async fn test_hit_stops_after_lookup() {
    let orchestrator = orchestrator();
    orchestrator
        .extract(note("warm"), &ExtractionConfig::default())
        .await
        .unwrap();

    let recorded = Recorded::default();
    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(Collector(recorded.clone())));
    orchestrator
        .extract(note("warm"), &ExtractionConfig::default())
        .await
        .unwrap();

    assert_eq!(recorded.stages.lock().unwrap().clone(), ["Detecting", "CacheLookup"]);
}

#[tokio::test]
async fn test_batch_span() {
    let recorded = Recorded::default();
    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(Collector(recorded.clone())));

    let mut config = docextract::OrchestratorConfig::default();
    config.execution_mode = docextract::ExecutionMode::Cooperative;
    let orchestrator = Orchestrator::builder()
        .config(config)
        .ocr_engines(OcrEngineSet::empty())
        .build()
        .unwrap();
    orchestrator
        .extract_batch(vec![note("a"), note("b")], &ExtractionConfig::default())
        .await;

    let spans = recorded.spans.lock().unwrap();
    assert!(spans.contains(&"extract_batch".to_string()));
    assert_eq!(spans.iter().filter(|s| *s == "run").count(), 2);
}
