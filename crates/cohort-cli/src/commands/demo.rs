//! `cohort demo`: wires a small service graph and tears part of it down.

use anyhow::Result;
use cohort_registry::{
    Component, EventReceiver, Factory, Instance, InstanceRef, Properties, Registry,
    RegistrySettings, RegistrySnapshot, Requirement,
};
use colored::Colorize;
use serde_json::json;
use tracing::{debug, info};

/// A demo component that logs its lifecycle.
struct Service;

impl Component for Service {
    fn on_validate(&self, instance: &Instance) -> anyhow::Result<()> {
        info!(instance = instance.name(), "service started");
        Ok(())
    }

    fn on_invalidate(&self, instance: &Instance) -> anyhow::Result<()> {
        info!(instance = instance.name(), "service stopped");
        Ok(())
    }

    fn on_bind(&self, instance: &Instance, slot: &str, dependency: &InstanceRef) -> anyhow::Result<()> {
        debug!(
            instance = instance.name(),
            slot,
            dependency = dependency.name(),
            "dependency bound"
        );
        Ok(())
    }
}

fn props(value: serde_json::Value) -> Properties {
    match value {
        serde_json::Value::Object(map) => map,
        _ => Properties::new(),
    }
}

fn register_factories(registry: &Registry) -> Result<()> {
    registry.register_factory("store", Factory::new(|_| Ok(Service)).provides("kv"))?;
    registry.register_factory("sink", Factory::new(|_| Ok(Service)).provides("log-sink"))?;
    registry.register_factory(
        "api",
        Factory::new(|_| Ok(Service))
            .provides("http")
            .requires(
                "store",
                Requirement::from_spec("kv", false, false, Some("(backend=memory)".into()))?,
            )
            .requires("sinks", Requirement::new("log-sink").aggregate().optional()),
    )?;
    Ok(())
}

/// The phases of the demo, each followed by a snapshot.
fn phases(registry: &Registry) -> Result<Vec<(&'static str, RegistrySnapshot)>> {
    let mut out = Vec::new();

    register_factories(registry)?;
    registry.instantiate("api", "api", Properties::new())?;
    registry.instantiate("sink", "stdout-sink", Properties::new())?;
    out.push(("api created, no store yet", registry.snapshot()));

    registry.instantiate("store", "disk", props(json!({ "backend": "disk" })))?;
    registry.instantiate("store", "memory", props(json!({ "backend": "memory" })))?;
    registry.instantiate("sink", "file-sink", Properties::new())?;
    out.push(("stores and sinks added", registry.snapshot()));

    registry.unregister_factory("store")?;
    out.push(("store factory unregistered", registry.snapshot()));

    Ok(out)
}

fn drain_events(events: &mut EventReceiver) -> Vec<String> {
    let mut lines = Vec::new();
    while let Ok(event) = events.try_recv() {
        let payload = serde_json::to_string(&event.kind).unwrap_or_default();
        lines.push(format!("{:<22} {payload}", event.event_type()));
    }
    lines
}

/// Run the demo and print a snapshot after each phase.
pub(crate) fn run_demo(settings: RegistrySettings, as_json: bool, show_events: bool) -> Result<()> {
    let registry = Registry::with_settings(settings);
    let mut events = registry.subscribe();

    for (title, snapshot) in phases(&registry)? {
        if as_json {
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        } else {
            println!("{}", format!("== {title}").bold());
            println!("{snapshot}");
        }

        if show_events {
            for line in drain_events(&mut events) {
                println!("  {}", line.dimmed());
            }
            println!();
        }
    }

    Ok(())
}
