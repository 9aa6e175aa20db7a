use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use fnv::FnvHashMap;
use serde_json::{json, Value};
use url::Url;

use crate::conn::{InboundMessage, TransportFactory};
use crate::error::{FrameError, FrameLookup, Result};
use crate::handler::bootstrap::{BootstrapSnapshot, BootstrapStore};
use crate::handler::cmd::Dispatched;
use crate::handler::frame::{Frame, FrameInfo};
use crate::protocol::*;

/// The frames of one tab.
///
/// Maps content units to frames and hands out frame ids. All structural
/// changes run to completion inside a single call, the resulting events are
/// queued in the order they happened and picked up via
/// [`FrameTree::drain_events`].
#[derive(Debug)]
pub struct FrameTree {
    browser_id: BrowserId,
    main_frame: FrameId,
    frames: FnvHashMap<FrameId, Frame>,
    /// The frame each live content unit is bound to
    content_units: FnvHashMap<ContentUnitId, FrameId>,
    /// Counter for frame ids, ids are never handed out twice
    last_frame_id: u64,
    init_scripts: Vec<InitScript>,
    bindings: Vec<Binding>,
    /// Nested frames whose unit was discarded for a replace that did not
    /// attach yet, keyed by the parent unit
    replaced: FnvHashMap<ContentUnitId, VecDeque<FrameId>>,
    /// Replacing units that attached before the discard of the unit they
    /// replace, keyed by the parent unit
    replacements: FnvHashMap<ContentUnitId, VecDeque<ContentUnit>>,
    events: VecDeque<ProtocolEvent>,
    factory: Arc<dyn TransportFactory>,
    bootstrap: Arc<dyn BootstrapStore>,
    bootstrap_version: u64,
}

impl FrameTree {
    /// Creates the tree of the tab `root` belongs to, with `root` bound to its
    /// main frame.
    pub fn new(
        root: ContentUnit,
        factory: Arc<dyn TransportFactory>,
        bootstrap: Arc<dyn BootstrapStore>,
    ) -> Self {
        let mut tree = Self {
            browser_id: root.browser_id,
            main_frame: FrameId::new(""),
            frames: Default::default(),
            content_units: Default::default(),
            last_frame_id: 0,
            init_scripts: Default::default(),
            bindings: Default::default(),
            replaced: Default::default(),
            replacements: Default::default(),
            events: Default::default(),
            factory,
            bootstrap,
            bootstrap_version: 0,
        };
        let id = tree.next_frame_id();
        let frame = Frame::new(id.clone(), None, root, &*tree.factory);
        tracing::debug!(
            browser_id = %tree.browser_id,
            frame = %id,
            unit = %root.id,
            "Created main frame"
        );
        tree.events.push_back(frame.attached_event());
        tree.content_units.insert(root.id, id.clone());
        tree.frames.insert(id.clone(), frame);
        tree.main_frame = id;
        tree.publish();
        tree
    }

    fn next_frame_id(&mut self) -> FrameId {
        self.last_frame_id += 1;
        FrameId::new(format!("frame-{}", self.last_frame_id))
    }

    pub fn browser_id(&self) -> BrowserId {
        self.browser_id
    }

    pub fn main_frame(&self) -> Option<&Frame> {
        self.frames.get(&self.main_frame)
    }

    pub fn frame(&self, id: &FrameId) -> Result<&Frame> {
        self.frames
            .get(id)
            .ok_or_else(|| FrameError::FrameNotFound(FrameLookup::Id(id.clone())))
    }

    pub fn frame_mut(&mut self, id: &FrameId) -> Result<&mut Frame> {
        self.frames
            .get_mut(id)
            .ok_or_else(|| FrameError::FrameNotFound(FrameLookup::Id(id.clone())))
    }

    /// The frame `unit` is currently bound to
    pub fn frame_for_unit(&self, unit: ContentUnitId) -> Result<&Frame> {
        self.content_units
            .get(&unit)
            .and_then(|id| self.frames.get(id))
            .ok_or(FrameError::FrameNotFound(FrameLookup::ContentUnit(unit)))
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn init_scripts(&self) -> &[InitScript] {
        &self.init_scripts
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Frame ids in pre-order, parents before their children
    fn preorder(&self) -> Vec<FrameId> {
        let mut ids = Vec::with_capacity(self.frames.len());
        let mut stack = vec![self.main_frame.clone()];
        while let Some(id) = stack.pop() {
            if let Some(frame) = self.frames.get(&id) {
                stack.extend(frame.child_frames().iter().rev().cloned());
                ids.push(id);
            }
        }
        ids
    }

    /// A snapshot of all live frames, parents first
    pub fn all_frames(&self) -> Vec<FrameInfo> {
        self.preorder()
            .iter()
            .filter_map(|id| self.frames.get(id))
            .map(Frame::info)
            .collect()
    }

    /// Events that bring a new session up to date with the tree
    pub fn replay(&self) -> Vec<ProtocolEvent> {
        let mut events = Vec::new();
        for id in self.preorder() {
            if let Some(frame) = self.frames.get(&id) {
                frame.replay(&mut events);
            }
        }
        events
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = ProtocolEvent> + '_ {
        self.events.drain(..)
    }

    /// Writes the current id mapping, init scripts and bindings to the
    /// bootstrap store
    fn publish(&mut self) {
        self.bootstrap_version += 1;
        let snapshot = BootstrapSnapshot {
            version: self.bootstrap_version,
            frame_ids: self
                .content_units
                .iter()
                .map(|(unit, frame)| (*unit, frame.clone()))
                .collect(),
            init_scripts: self.init_scripts.clone(),
            bindings: self.bindings.clone(),
        };
        self.bootstrap.write(self.browser_id, snapshot);
    }

    /// A content unit of this tab was attached
    pub fn attach(&mut self, unit: ContentUnit, why: AttachReason) -> Result<()> {
        match (why, unit.parent) {
            (AttachReason::Attach, None) => {
                if self.content_units.get(&unit.id) == Some(&self.main_frame) {
                    tracing::trace!(unit = %unit.id, "Main frame already bound to unit");
                    return Ok(());
                }
                tracing::warn!(
                    browser_id = %self.browser_id,
                    unit = %unit.id,
                    "Top level attach for a tab that has a main frame, rebinding it"
                );
                let main = self.main_frame.clone();
                self.rebind(&main, unit)
            }
            (AttachReason::Replace, None) => {
                let main = self.main_frame.clone();
                self.rebind(&main, unit)
            }
            (AttachReason::Replace, Some(parent)) => {
                if let Some(id) = self.content_units.get(&unit.id).cloned() {
                    self.forget_replaced(&id);
                    return self.rebind(&id, unit);
                }
                if !self.content_units.contains_key(&parent) {
                    return Err(FrameError::OrphanFrame {
                        unit: unit.id,
                        parent,
                    });
                }
                while let Some(id) = take_first(&mut self.replaced, &parent) {
                    if self.frames.contains_key(&id) {
                        return self.rebind(&id, unit);
                    }
                }
                tracing::trace!(
                    unit = %unit.id,
                    %parent,
                    "Waiting for the discard of the replaced unit"
                );
                self.replacements.entry(parent).or_default().push_back(unit);
                Ok(())
            }
            (AttachReason::Attach, Some(parent)) => self.attach_child(unit, parent),
        }
    }

    fn attach_child(&mut self, unit: ContentUnit, parent: ContentUnitId) -> Result<()> {
        if self.content_units.contains_key(&unit.id) {
            tracing::trace!(unit = %unit.id, "Content unit already attached");
            return Ok(());
        }
        let parent_id = self
            .content_units
            .get(&parent)
            .cloned()
            .ok_or(FrameError::OrphanFrame {
                unit: unit.id,
                parent,
            })?;
        let id = self.next_frame_id();
        let frame = Frame::new(id.clone(), Some(parent_id.clone()), unit, &*self.factory);
        if let Some(parent) = self.frames.get_mut(&parent_id) {
            parent.add_child(id.clone());
        }
        tracing::debug!(frame = %id, parent = %parent_id, unit = %unit.id, "Attached frame");
        self.events.push_back(frame.attached_event());
        self.content_units.insert(unit.id, id.clone());
        self.frames.insert(id, frame);
        self.publish();
        Ok(())
    }

    fn rebind(&mut self, frame_id: &FrameId, unit: ContentUnit) -> Result<()> {
        let frame = self
            .frames
            .get_mut(frame_id)
            .ok_or_else(|| FrameError::FrameNotFound(FrameLookup::Id(frame_id.clone())))?;
        let previous = frame.content_unit().id;
        frame.rebind(unit, &*self.factory, &mut self.events);
        if self.content_units.get(&previous) == Some(frame_id) {
            self.content_units.remove(&previous);
        }
        self.content_units.insert(unit.id, frame_id.clone());
        self.publish();
        Ok(())
    }

    /// A content unit of this tab was discarded.
    ///
    /// Returns `true` if this detached the main frame, which ends the tree.
    pub fn discard(&mut self, unit: ContentUnit, why: DiscardReason) -> bool {
        let frame_id = match self.content_units.get(&unit.id) {
            Some(id) => id.clone(),
            None => {
                tracing::debug!(unit = %unit.id, "Discarded unit is not bound to a frame");
                return false;
            }
        };
        if why == DiscardReason::Replace {
            match unit.parent {
                // the main frame is rebound by the paired attach
                None => tracing::trace!(unit = %unit.id, "Ignoring discard of replaced unit"),
                Some(parent) => match take_first(&mut self.replacements, &parent) {
                    Some(replacement) => {
                        if let Err(err) = self.rebind(&frame_id, replacement) {
                            tracing::warn!(unit = %replacement.id, "{}", err);
                        }
                    }
                    None => self
                        .replaced
                        .entry(parent)
                        .or_default()
                        .push_back(frame_id),
                },
            }
            return false;
        }
        self.detach_frame(&frame_id);
        self.publish();
        frame_id == self.main_frame
    }

    /// The content unit is about to move to another content process, the
    /// frame keeps its unit
    pub fn process_switch(&mut self, unit: ContentUnit) -> Result<()> {
        let frame_id = self
            .content_units
            .get(&unit.id)
            .cloned()
            .ok_or(FrameError::FrameNotFound(FrameLookup::ContentUnit(unit.id)))?;
        tracing::debug!(frame = %frame_id, unit = %unit.id, "Process switch");
        self.rebind(&frame_id, unit)
    }

    /// Detaches the frame and its subtree, children first.
    ///
    /// Detaching a frame that is no longer part of the tree is a no-op.
    fn detach_frame(&mut self, id: &FrameId) {
        let children = match self.frames.get(id) {
            Some(frame) => frame.child_frames().to_vec(),
            None => return,
        };
        for child in &children {
            self.detach_frame(child);
        }
        if let Some(frame) = self.frames.remove(id) {
            let unit = frame.content_unit().id;
            if self.content_units.get(&unit) == Some(id) {
                self.content_units.remove(&unit);
            }
            self.replacements.remove(&unit);
            self.replaced.remove(&unit);
            self.forget_replaced(id);
            if let Some(parent) = frame.parent_frame().and_then(|p| self.frames.get_mut(p)) {
                parent.remove_child(id);
            }
            frame.detach(&mut self.events);
        }
    }

    /// Drops the frame from the frames waiting for their replacement
    fn forget_replaced(&mut self, id: &FrameId) {
        for queue in self.replaced.values_mut() {
            queue.retain(|frame| frame != id);
        }
        self.replaced.retain(|_, queue| !queue.is_empty());
    }

    /// Detaches every frame, used when the whole tab goes away
    pub fn dispose(&mut self) {
        let main = self.main_frame.clone();
        self.detach_frame(&main);
        self.bootstrap.remove(self.browser_id);
    }

    pub fn on_navigation(&mut self, notification: NavigationNotification) -> Result<()> {
        let unit = notification.unit().id;
        let frame_id = self
            .content_units
            .get(&unit)
            .cloned()
            .ok_or(FrameError::FrameNotFound(FrameLookup::ContentUnit(unit)))?;
        let frame = self
            .frames
            .get_mut(&frame_id)
            .ok_or(FrameError::FrameNotFound(FrameLookup::Id(frame_id)))?;
        match notification {
            NavigationNotification::Started {
                navigation_id, url, ..
            } => frame.on_navigation_started(navigation_id, url, &mut self.events),
            NavigationNotification::Committed { url, name, .. } => {
                frame.on_navigation_committed(url, name, &mut self.events)
            }
            NavigationNotification::Aborted { error_code, .. } => {
                frame.on_navigation_aborted(error_code, &mut self.events)
            }
            NavigationNotification::SameDocument { url, .. } => {
                frame.on_same_document_navigation(url, &mut self.events);
                Ok(())
            }
        }
    }

    /// Routes a message read from a content process to its channel
    pub fn on_inbound(&mut self, msg: InboundMessage) {
        let InboundMessage {
            channel,
            generation,
            message,
        } = msg;
        let frame = match self.frames.get_mut(&channel.frame_id) {
            Some(frame) => frame,
            None => {
                tracing::trace!(%channel, "Dropping message for unknown frame");
                return;
            }
        };
        match channel.worker_id {
            None => {
                if let Some(event) = frame.channel_mut().on_message(generation, message) {
                    let method = event.method.clone();
                    match ContentEvent::decode(event) {
                        Ok(event) => frame.on_event(event, &*self.factory, &mut self.events),
                        Err(err) => {
                            tracing::trace!(%channel, %method, "Dropping unknown event: {}", err)
                        }
                    }
                }
            }
            Some(worker_id) => {
                let worker = match frame.worker_mut(&worker_id) {
                    Some(worker) => worker,
                    None => {
                        tracing::trace!(
                            worker = %worker_id,
                            "Dropping message for unknown worker"
                        );
                        return;
                    }
                };
                if let Some(event) = worker.channel_mut().on_message(generation, message) {
                    let method = event.method.clone();
                    match WorkerEvent::decode(event) {
                        Ok(event) => worker.on_event(event, &mut self.events),
                        Err(err) => tracing::trace!(
                            worker = %worker_id,
                            %method,
                            "Dropping unknown event: {}",
                            err
                        ),
                    }
                }
            }
        }
    }

    /// Routes a command to the frame, execution context or worker it targets
    pub fn dispatch(&mut self, command: PageCommand, now: Instant) -> Result<Dispatched> {
        tracing::debug!(
            browser_id = %self.browser_id,
            method = %command.identifier(),
            "Dispatch command"
        );
        match command {
            PageCommand::Evaluate(params) => {
                let id = params.execution_context_id.clone();
                self.runtime_call(&id, "Runtime.evaluate", serde_json::to_value(params)?)
            }
            PageCommand::CallFunction(params) => {
                let id = params.execution_context_id.clone();
                self.runtime_call(&id, "Runtime.callFunction", serde_json::to_value(params)?)
            }
            PageCommand::GetObjectProperties(params) => {
                let id = params.execution_context_id.clone();
                self.runtime_call(
                    &id,
                    "Runtime.getObjectProperties",
                    serde_json::to_value(params)?,
                )
            }
            PageCommand::DisposeObject(params) => {
                let id = params.execution_context_id.clone();
                self.runtime_call(&id, "Runtime.disposeObject", serde_json::to_value(params)?)
            }
            PageCommand::Navigate(params) => {
                let frame = self.frame_mut(&params.frame_id)?;
                let url = resolve_url(frame.url(), &params.url)?;
                let mut body = json!({ "url": url });
                if let Some(referer) = params.referer {
                    body["referer"] = Value::String(referer);
                }
                Ok(navigation(frame, "Page.navigate", body, now))
            }
            PageCommand::GoBack(params) => {
                let frame = self.frame_mut(&params.frame_id)?;
                Ok(navigation(frame, "Page.goBack", json!({}), now))
            }
            PageCommand::GoForward(params) => {
                let frame = self.frame_mut(&params.frame_id)?;
                Ok(navigation(frame, "Page.goForward", json!({}), now))
            }
            PageCommand::Reload(params) => {
                let frame = self.frame_mut(&params.frame_id)?;
                Ok(navigation(frame, "Page.reload", json!({}), now))
            }
            PageCommand::SendMessageToWorker(params) => {
                let frame = self.frame_mut(&params.frame_id)?;
                let worker = frame
                    .worker_mut(&params.worker_id)
                    .ok_or(FrameError::WorkerNotFound(params.worker_id))?;
                Ok(Dispatched::Call(worker.send_message(params.message)))
            }
            PageCommand::AddBinding(params) => {
                let binding = Binding::from(params);
                let body = serde_json::to_value(&binding)?;
                match self.bindings.iter_mut().find(|b| b.name == binding.name) {
                    Some(existing) => *existing = binding,
                    None => self.bindings.push(binding),
                }
                self.publish();
                Ok(self.fan_out("Page.addBinding", body))
            }
            PageCommand::SetInitScripts(params) => {
                self.init_scripts = params.scripts;
                self.publish();
                let body = json!({ "scripts": self.init_scripts });
                Ok(self.fan_out("Page.setInitScripts", body))
            }
        }
    }

    fn runtime_call(
        &mut self,
        id: &GlobalId,
        method: &'static str,
        params: Value,
    ) -> Result<Dispatched> {
        let (frame_id, local) = id.decompose()?;
        let frame = self.frame_mut(&frame_id)?;
        frame
            .runtime_call(&local, method, params)
            .map(Dispatched::Call)
    }

    /// Sends the call to every live frame
    fn fan_out(&mut self, method: &'static str, params: Value) -> Dispatched {
        let mut calls = Vec::with_capacity(self.frames.len());
        for id in self.preorder() {
            if let Some(frame) = self.frames.get_mut(&id) {
                calls.push(frame.page_call(method, params.clone()));
            }
        }
        Dispatched::FanOut(calls)
    }

    pub fn evict_timed_out(
        &mut self,
        now: Instant,
        request_timeout: Duration,
        navigation_timeout: Duration,
    ) {
        for frame in self.frames.values_mut() {
            frame.evict_timed_out(now, request_timeout, navigation_timeout);
        }
    }
}

fn take_first<T>(
    queues: &mut FnvHashMap<ContentUnitId, VecDeque<T>>,
    key: &ContentUnitId,
) -> Option<T> {
    let queue = queues.get_mut(key)?;
    let first = queue.pop_front();
    if queue.is_empty() {
        queues.remove(key);
    }
    first
}

fn navigation(frame: &mut Frame, method: &'static str, params: Value, now: Instant) -> Dispatched {
    let started = frame.wait_for_navigation(now);
    let ack = frame.page_call(method, params);
    Dispatched::Navigation { ack, started }
}

/// Resolves `url` against the frame's current url if it is relative
fn resolve_url(base: &str, url: &str) -> Result<String> {
    match Url::parse(url) {
        Ok(url) => Ok(url.into()),
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(base)
            .and_then(|base| base.join(url))
            .map(String::from)
            .map_err(|_| FrameError::InvalidUrl(url.to_string())),
        Err(_) => Err(FrameError::InvalidUrl(url.to_string())),
    }
}
