//! Checks the log events a layer stack emits while routing commands.

use std::sync::{Arc, Mutex};

use tabula_core::{Axis, SharedDimensions};
use tabula_layer::{Command, CommandOutcome, LayerEvent, LayerStack, StackView};
use tabula_layout::SizingConfig;
use tracing::{Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};

#[derive(Debug, Clone, PartialEq)]
struct Captured {
    level: Level,
    message: String,
}

struct Capture {
    events: Arc<Mutex<Vec<Captured>>>,
}

struct MessageVisitor {
    message: Option<String>,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_owned());
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" && self.message.is_none() {
            self.message = Some(format!("{value:?}").trim_matches('"').to_owned());
        }
    }
}

impl<S> tracing_subscriber::Layer<S> for Capture
where
    S: Subscriber + for<'lookup> tracing_subscriber::registry::LookupSpan<'lookup>,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor { message: None };
        event.record(&mut visitor);
        if let Some(message) = visitor.message {
            self.events.lock().expect("capture lock").push(Captured {
                level: *event.metadata().level(),
                message,
            });
        }
    }
}

fn capture(f: impl FnOnce()) -> Vec<Captured> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::registry().with(Capture {
        events: Arc::clone(&events),
    });
    tracing::subscriber::with_default(subscriber, f);
    let captured = events.lock().expect("capture lock").clone();
    captured
}

/// Consumes every command and asks the layer below to reset sizes.
struct Leader;

/// Handles nothing.
struct Inert;

const POSITIONS: usize = 4;

impl tabula_layer::Layer for Leader {
    fn name(&self) -> &'static str {
        "leader"
    }

    fn position_count(&self, _axis: Axis, _below: StackView<'_>) -> usize {
        POSITIONS
    }

    fn underlying_position(&self, _axis: Axis, position: usize, _below: StackView<'_>) -> Option<usize> {
        Some(position)
    }

    fn local_position(&self, _axis: Axis, underlying: usize, _below: StackView<'_>) -> Option<usize> {
        Some(underlying)
    }

    fn start_pixel(&self, _axis: Axis, position: usize, _below: StackView<'_>) -> u64 {
        position as u64 * 10
    }

    fn handle(&mut self, command: Command, _below: StackView<'_>) -> CommandOutcome {
        CommandOutcome::Consumed {
            event: None,
            follow_up: Some(Command::ResetSizes {
                axis: command.axis(),
            }),
        }
    }

    fn on_event(&mut self, event: LayerEvent, _below: StackView<'_>) -> Option<LayerEvent> {
        Some(event)
    }
}

impl tabula_layer::Layer for Inert {
    fn name(&self) -> &'static str {
        "inert"
    }

    fn position_count(&self, _axis: Axis, _below: StackView<'_>) -> usize {
        POSITIONS
    }

    fn underlying_position(&self, _axis: Axis, position: usize, _below: StackView<'_>) -> Option<usize> {
        Some(position)
    }

    fn local_position(&self, _axis: Axis, underlying: usize, _below: StackView<'_>) -> Option<usize> {
        Some(underlying)
    }

    fn start_pixel(&self, _axis: Axis, position: usize, _below: StackView<'_>) -> u64 {
        position as u64 * 10
    }

    fn handle(&mut self, _command: Command, _below: StackView<'_>) -> CommandOutcome {
        CommandOutcome::Ignored
    }

    fn on_event(&mut self, event: LayerEvent, _below: StackView<'_>) -> Option<LayerEvent> {
        Some(event)
    }
}

fn messages(events: &[Captured], level: Level) -> Vec<&str> {
    events
        .iter()
        .filter(|e| e.level == level)
        .map(|e| e.message.as_str())
        .collect()
}

#[test]
fn hide_logs_routing_and_translator_update() {
    let events = capture(|| {
        let mut stack =
            LayerStack::standard(SharedDimensions::new(5, 1), &SizingConfig::default());
        assert!(stack.execute(Command::Hide {
            axis: Axis::Column,
            positions: vec![1],
        }));
        assert_eq!(stack.position_count(Axis::Column), 4);
    });
    let debug = messages(&events, Level::DEBUG);
    assert!(debug.contains(&"stack.command"), "{events:?}");
    assert!(debug.contains(&"translator.hide"), "{events:?}");
    assert!(!debug.contains(&"stack.follow_up_unhandled"), "{events:?}");
}

#[test]
fn follow_up_ignored_below_is_logged() {
    let events = capture(|| {
        let mut stack = LayerStack::new();
        stack.push(Inert);
        stack.push(Leader);
        assert!(stack.execute(Command::ShowAll { axis: Axis::Row }));
    });
    assert!(
        messages(&events, Level::DEBUG).contains(&"stack.follow_up_unhandled"),
        "{events:?}"
    );
}

#[test]
fn follow_up_from_bottom_layer_is_logged() {
    let events = capture(|| {
        let mut stack = LayerStack::new();
        stack.push(Leader);
        assert!(stack.execute(Command::ShowAll { axis: Axis::Row }));
    });
    assert!(
        messages(&events, Level::DEBUG).contains(&"stack.follow_up_unhandled"),
        "{events:?}"
    );
}
