//! Scripted stand-ins for the VM runtime, the container engine, and the UI.

#![allow(clippy::unwrap_used)]

use crate::{
    CommandLine, ControllerContext, EntityHandle, EntityView, Invocation, PresentationSink,
    PresentationUpdate, ProcessInvoker, Toolchain,
};

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;

/// Upper bound for any wait in these tests.
pub(crate) const WAIT: Duration = Duration::from_secs(3);

/// Fake `colima` + `docker` pair with mutable state.
#[derive(Default)]
pub(crate) struct FakeEngine {
    pub(crate) vm_state: Mutex<String>,
    pub(crate) vm_status_fails: Mutex<bool>,
    pub(crate) containers: Mutex<HashMap<String, String>>,
    pub(crate) listing: Mutex<Option<String>>,
    pub(crate) failing_verbs: Mutex<HashSet<String>>,
    pub(crate) mutation_delay: Mutex<Duration>,
    pub(crate) calls: Mutex<Vec<String>>,
    pub(crate) spawned: Mutex<Vec<CommandLine>>,
    in_flight: Mutex<HashMap<String, usize>>,
    pub(crate) max_in_flight: Mutex<usize>,
}

impl FakeEngine {
    pub(crate) fn new() -> Arc<Self> {
        let engine = Self::default();
        *engine.vm_state.lock().unwrap() = "running".to_string();
        Arc::new(engine)
    }

    pub(crate) fn with_container(self: &Arc<Self>, name: &str, state: &str) -> Arc<Self> {
        self.containers
            .lock()
            .unwrap()
            .insert(name.to_string(), state.to_string());
        Arc::clone(self)
    }

    pub(crate) fn fail_verb(&self, verb: &str) {
        self.failing_verbs.lock().unwrap().insert(verb.to_string());
    }

    pub(crate) fn set_delay(&self, delay: Duration) {
        *self.mutation_delay.lock().unwrap() = delay;
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn position(&self, call: &str) -> Option<usize> {
        self.calls().iter().position(|c| c == call)
    }

    pub(crate) fn container_state(&self, name: &str) -> Option<String> {
        self.containers.lock().unwrap().get(name).cloned()
    }

    async fn mutate(&self, key: &str, verb: &str) -> bool {
        {
            let mut in_flight = self.in_flight.lock().unwrap();
            let count = in_flight.entry(key.to_string()).or_default();
            *count += 1;
            let mut max = self.max_in_flight.lock().unwrap();
            *max = (*max).max(*count);
        }

        let delay = *self.mutation_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(count) = self.in_flight.lock().unwrap().get_mut(key) {
            *count -= 1;
        }

        !self.failing_verbs.lock().unwrap().contains(verb)
    }
}

#[async_trait]
impl ProcessInvoker for FakeEngine {
    async fn run(&self, command: &CommandLine) -> Invocation {
        self.calls.lock().unwrap().push(command.to_string());
        let args: Vec<&str> = command.args.iter().map(String::as_str).collect();

        match (command.program.as_str(), args.as_slice()) {
            ("colima", ["status"]) => {
                if *self.vm_status_fails.lock().unwrap() {
                    return Invocation::failure("colima is not reachable");
                }
                let state = self.vm_state.lock().unwrap().clone();
                Invocation::success(format!("colima is {state}\n"))
            }
            ("colima", [verb]) => {
                if !self.mutate("colima", verb).await {
                    return Invocation::failure(format!("{verb} failed"));
                }
                let next = if *verb == "stop" { "stopped" } else { "running" };
                *self.vm_state.lock().unwrap() = next.to_string();
                Invocation::success("")
            }
            ("docker", ["ps", "-a", "--format", _]) => match self.listing.lock().unwrap().clone() {
                Some(listing) => Invocation::success(listing),
                None => Invocation::failure("Cannot connect to the Docker daemon"),
            },
            ("docker", ["inspect", "--format", _, name]) => match self.container_state(name) {
                Some(state) => Invocation::success(format!("{state}\n")),
                None => Invocation::failure(format!("Error: No such object: {name}")),
            },
            ("docker", [verb, name]) => {
                if self.container_state(name).is_none() {
                    return Invocation::failure(format!("Error: No such container: {name}"));
                }
                if !self.mutate(name, verb).await {
                    return Invocation::failure(format!("{verb} failed"));
                }
                let mut containers = self.containers.lock().unwrap();
                match *verb {
                    "rm" => {
                        containers.remove(*name);
                    }
                    "stop" => {
                        containers.insert(name.to_string(), "exited".to_string());
                    }
                    _ => {
                        containers.insert(name.to_string(), "running".to_string());
                    }
                }
                Invocation::success(format!("{name}\n"))
            }
            _ => Invocation::failure("unexpected command"),
        }
    }

    fn spawn_detached(&self, command: &CommandLine) -> bool {
        self.spawned.lock().unwrap().push(command.clone());
        true
    }
}

/// Sink that records everything it is given.
#[derive(Default)]
pub(crate) struct RecordingSink {
    pub(crate) updates: Mutex<Vec<PresentationUpdate>>,
}

impl RecordingSink {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn updates(&self) -> Vec<PresentationUpdate> {
        self.updates.lock().unwrap().clone()
    }

    pub(crate) fn entity_publishes(&self, name: &str) -> usize {
        self.updates()
            .iter()
            .filter(|u| matches!(u, PresentationUpdate::Entity(v) if v.name == name))
            .count()
    }
}

impl PresentationSink for RecordingSink {
    fn publish(&self, update: PresentationUpdate) {
        self.updates.lock().unwrap().push(update);
    }
}

pub(crate) fn context(
    engine: &Arc<FakeEngine>,
    sink: &Arc<RecordingSink>,
    poll_interval: Duration,
) -> ControllerContext {
    ControllerContext {
        invoker: Arc::clone(engine) as Arc<dyn ProcessInvoker>,
        toolchain: Arc::new(Toolchain {
            runtime: "colima".to_string(),
            engine: "docker".to_string(),
            ..Toolchain::default()
        }),
        sink: Arc::clone(sink) as Arc<dyn PresentationSink>,
        poll_interval,
        queue_depth: 8,
    }
}

/// Wait until the handle publishes a snapshot matching `pred`.
pub(crate) async fn wait_for_view(
    handle: &EntityHandle,
    pred: impl FnMut(&EntityView) -> bool,
) -> EntityView {
    let mut rx = handle.subscribe();
    tokio::time::timeout(WAIT, rx.wait_for(pred))
        .await
        .unwrap()
        .unwrap()
        .clone()
}

/// Poll `cond` until it holds.
pub(crate) async fn wait_until(mut cond: impl FnMut() -> bool) {
    tokio::time::timeout(WAIT, async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
}
