use std::rc::Rc;

use super::*;
use crate::html::parse_html;

#[derive(Clone)]
struct Listener {
    options: ListenerOptions,
    handler: EventHandler,
}

#[derive(Default)]
struct ListenerStore {
    map: HashMap<(EventTarget, EventKind), Vec<Listener>>,
    next_id: usize,
}

impl ListenerStore {
    fn add(&mut self, target: EventTarget, kind: EventKind, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.map.entry((target, kind)).or_default().push(listener);
        id
    }

    fn get(&self, target: EventTarget, kind: EventKind) -> Vec<Listener> {
        self.map.get(&(target, kind)).cloned().unwrap_or_default()
    }

    fn count(&self, target: EventTarget, kind: EventKind) -> usize {
        self.map.get(&(target, kind)).map(Vec::len).unwrap_or(0)
    }

    fn total(&self) -> usize {
        self.map.values().map(Vec::len).sum()
    }
}

struct ScheduledTask {
    id: i64,
    due_at: i64,
    order: i64,
    callback: TimerCallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTimer {
    pub id: TimerId,
    pub due_at: i64,
    pub order: i64,
}

struct ObservedTarget {
    node: NodeId,
    // Last intersecting state handed to the callback.
    reported: Option<bool>,
}

struct Observer {
    options: IntersectionOptions,
    callback: IntersectionCallback,
    targets: Vec<ObservedTarget>,
}

/// Deterministic in-memory page.
///
/// Layout is explicit: elements get a document-relative box through
/// [`Harness::set_layout`], the viewport height is configurable and scrolling
/// only moves the viewport. Time only advances when asked to.
pub struct Harness {
    dom: Dom,
    listeners: ListenerStore,
    task_queue: Vec<ScheduledTask>,
    observers: Vec<Observer>,
    layout: HashMap<NodeId, Rect>,
    intersection_observer_supported: bool,
    document_loading: bool,
    scroll_y: f64,
    viewport_height: f64,
    scroll_requests: Vec<ScrollToOptions>,
    navigations: Vec<String>,
    native_submissions: usize,
    scroll_pending: bool,
    intersections_dirty: bool,
    dispatch_depth: usize,
    settling: bool,
    settle_step_limit: usize,
    now_ms: i64,
    timer_step_limit: usize,
    next_timer_id: i64,
    next_task_order: i64,
    trace: bool,
    trace_logs: Vec<String>,
    trace_log_limit: usize,
    trace_to_stderr: bool,
}

impl Harness {
    pub fn from_html(html: &str) -> Result<Self> {
        let dom = parse_html(html)?;
        Ok(Self {
            dom,
            listeners: ListenerStore::default(),
            task_queue: Vec::new(),
            observers: Vec::new(),
            layout: HashMap::new(),
            intersection_observer_supported: true,
            document_loading: true,
            scroll_y: 0.0,
            viewport_height: 800.0,
            scroll_requests: Vec::new(),
            navigations: Vec::new(),
            native_submissions: 0,
            scroll_pending: false,
            intersections_dirty: false,
            dispatch_depth: 0,
            settling: false,
            settle_step_limit: 1_000,
            now_ms: 0,
            timer_step_limit: 10_000,
            next_timer_id: 1,
            next_task_order: 0,
            trace: false,
            trace_logs: Vec::new(),
            trace_log_limit: 10_000,
            trace_to_stderr: true,
        })
    }

    pub fn enable_trace(&mut self, enabled: bool) {
        self.trace = enabled;
    }

    pub fn take_trace_logs(&mut self) -> Vec<String> {
        std::mem::take(&mut self.trace_logs)
    }

    pub fn set_trace_stderr(&mut self, enabled: bool) {
        self.trace_to_stderr = enabled;
    }

    pub fn set_trace_log_limit(&mut self, max_entries: usize) -> Result<()> {
        if max_entries == 0 {
            return Err(Error::Runtime(
                "set_trace_log_limit requires at least 1 entry".into(),
            ));
        }
        self.trace_log_limit = max_entries;
        if self.trace_logs.len() > max_entries {
            let excess = self.trace_logs.len() - max_entries;
            self.trace_logs.drain(..excess);
        }
        Ok(())
    }

    pub fn set_timer_step_limit(&mut self, max_steps: usize) -> Result<()> {
        if max_steps == 0 {
            return Err(Error::Runtime(
                "set_timer_step_limit requires at least 1 step".into(),
            ));
        }
        self.timer_step_limit = max_steps;
        Ok(())
    }

    /// Removes intersection observation from the page, as in older browsers.
    pub fn set_intersection_observer_supported(&mut self, supported: bool) {
        self.intersection_observer_supported = supported;
    }

    /// Changes the viewport height without dispatching `resize`.
    pub fn set_viewport_height(&mut self, height: f64) -> Result<()> {
        if !height.is_finite() || height <= 0.0 {
            return Err(Error::Runtime(format!(
                "viewport height must be positive, got {height}"
            )));
        }
        self.viewport_height = height;
        Ok(())
    }

    /// Sets the initial scroll offset without dispatching `scroll`, like a
    /// browser restoring a deep link before the page loads.
    pub fn set_initial_scroll_y(&mut self, scroll_y: f64) {
        self.scroll_y = scroll_y.max(0.0);
    }

    /// Gives the first element matching `selector` a document-relative box.
    pub fn set_layout(&mut self, selector: &str, top: f64, height: f64) -> Result<()> {
        let node = self.select_one(selector)?;
        if height < 0.0 {
            return Err(Error::Runtime(format!(
                "layout height must be non-negative, got {height}"
            )));
        }
        self.layout.insert(node, Rect { top, height });
        self.intersections_dirty = true;
        Ok(())
    }

    /// Marks the document as parsed without dispatching `DOMContentLoaded`,
    /// like a module that starts after the event has already fired.
    pub fn finish_parsing(&mut self) {
        self.document_loading = false;
    }

    /// Finishes parsing and dispatches `DOMContentLoaded` on the document.
    pub fn load(&mut self) -> Result<()> {
        self.document_loading = false;
        self.dispatch_event(EventTarget::Document, EventKind::DomContentLoaded)?;
        self.settle()
    }

    /// User scroll to an absolute offset.
    pub fn scroll_to_y(&mut self, scroll_y: f64) -> Result<()> {
        self.scroll_y = scroll_y.max(0.0);
        self.trace_event_line(format!("[scroll] user scroll_y={}", self.scroll_y));
        self.dispatch_event(EventTarget::Window, EventKind::Scroll)?;
        self.intersections_dirty = true;
        self.settle()
    }

    /// User resize of the viewport height.
    pub fn resize(&mut self, viewport_height: f64) -> Result<()> {
        self.set_viewport_height(viewport_height)?;
        self.dispatch_event(EventTarget::Window, EventKind::Resize)?;
        self.intersections_dirty = true;
        self.settle()
    }

    pub fn type_text(&mut self, selector: &str, text: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let tag = self
            .dom
            .tag_name(target)
            .ok_or_else(|| Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "input or textarea".into(),
                actual: "non-element".into(),
            })?
            .to_ascii_lowercase();

        if tag != "input" && tag != "textarea" {
            return Err(Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "input or textarea".into(),
                actual: tag,
            });
        }

        self.dom.set_value(target, text)
    }

    pub fn click(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let click = self.dispatch_event(EventTarget::Node(target), EventKind::Click)?;
        if !click.default_prevented() {
            if self.is_submit_control(target) {
                if let Some(form) = self.dom.find_ancestor_by_tag(target, "form") {
                    self.submit_form(form)?;
                }
            } else if self.dom.is_tag(target, "a") {
                if let Some(href) = self.dom.attr(target, "href") {
                    self.trace_event_line(format!("[nav] follow href={href}"));
                    self.navigations.push(href);
                }
            }
        }
        self.settle()
    }

    /// Submits the form matched by `selector`, or the form owning it.
    pub fn submit(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let form = if self.dom.is_tag(target, "form") {
            Some(target)
        } else {
            self.dom.find_ancestor_by_tag(target, "form")
        };
        if let Some(form) = form {
            self.submit_form(form)?;
        }
        self.settle()
    }

    pub fn dispatch(&mut self, selector: &str, event: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let kind = EventKind::parse(event)
            .ok_or_else(|| Error::Runtime(format!("unsupported event type: {event}")))?;
        self.dispatch_event(EventTarget::Node(target), kind)?;
        self.settle()
    }

    fn submit_form(&mut self, form: NodeId) -> Result<()> {
        let submit = self.dispatch_event(EventTarget::Node(form), EventKind::Submit)?;
        if !submit.default_prevented() {
            self.trace_event_line("[nav] native form submission".into());
            self.native_submissions += 1;
        }
        Ok(())
    }

    fn is_submit_control(&self, node: NodeId) -> bool {
        let kind = self.dom.attr(node, "type").map(|kind| kind.to_ascii_lowercase());
        if self.dom.is_tag(node, "button") {
            return matches!(kind.as_deref(), None | Some("submit"));
        }
        self.dom.is_tag(node, "input") && kind.as_deref() == Some("submit")
    }

    pub fn now_ms(&self) -> i64 {
        self.now_ms
    }

    pub fn pending_timers(&self) -> Vec<PendingTimer> {
        let mut timers = self
            .task_queue
            .iter()
            .map(|task| PendingTimer {
                id: TimerId(task.id),
                due_at: task.due_at,
                order: task.order,
            })
            .collect::<Vec<_>>();
        timers.sort_by_key(|timer| (timer.due_at, timer.order));
        timers
    }

    pub fn advance_time(&mut self, delta_ms: i64) -> Result<()> {
        if delta_ms < 0 {
            return Err(Error::Runtime(
                "advance_time requires non-negative milliseconds".into(),
            ));
        }
        let from = self.now_ms;
        let target = self.now_ms.saturating_add(delta_ms);
        let ran = self.run_timer_queue(Some(target))?;
        self.now_ms = target;
        self.trace_timer_line(format!(
            "[timer] advance delta_ms={} from={} to={} ran_due={}",
            delta_ms, from, self.now_ms, ran
        ));
        Ok(())
    }

    pub fn advance_time_to(&mut self, target_ms: i64) -> Result<()> {
        if target_ms < self.now_ms {
            return Err(Error::Runtime(format!(
                "advance_time_to requires target >= now_ms (target={target_ms}, now_ms={})",
                self.now_ms
            )));
        }
        self.advance_time(target_ms - self.now_ms)
    }

    /// Runs timers already due without moving the clock.
    pub fn run_due_timers(&mut self) -> Result<usize> {
        let ran = self.run_timer_queue(Some(self.now_ms))?;
        self.trace_timer_line(format!(
            "[timer] run_due now_ms={} ran={}",
            self.now_ms, ran
        ));
        Ok(ran)
    }

    /// Runs every queued timer, moving the clock forward as needed.
    pub fn flush(&mut self) -> Result<()> {
        let from = self.now_ms;
        let ran = self.run_timer_queue(None)?;
        self.trace_timer_line(format!(
            "[timer] flush from={} to={} ran={}",
            from, self.now_ms, ran
        ));
        Ok(())
    }

    fn run_timer_queue(&mut self, due_limit: Option<i64>) -> Result<usize> {
        let mut steps = 0usize;
        while let Some(next_idx) = self.next_task_index(due_limit) {
            steps += 1;
            if steps > self.timer_step_limit {
                return Err(Error::Runtime(format!(
                    "timer queue exceeded max steps: limit={}, now_ms={}, pending_tasks={}",
                    self.timer_step_limit,
                    self.now_ms,
                    self.task_queue.len()
                )));
            }
            let task = self.task_queue.remove(next_idx);
            if task.due_at > self.now_ms {
                self.now_ms = task.due_at;
            }
            self.trace_timer_line(format!(
                "[timer] run id={} due_at={} now_ms={}",
                task.id, task.due_at, self.now_ms
            ));
            self.dispatch_depth += 1;
            let result = (task.callback)(self);
            self.dispatch_depth -= 1;
            result?;
            self.settle()?;
        }
        Ok(steps)
    }

    fn next_task_index(&self, due_limit: Option<i64>) -> Option<usize> {
        self.task_queue
            .iter()
            .enumerate()
            .filter(|(_, task)| due_limit.is_none_or(|limit| task.due_at <= limit))
            .min_by_key(|(_, task)| (task.due_at, task.order))
            .map(|(idx, _)| idx)
    }

    /// Programmatic scroll requests made by the page, oldest first.
    pub fn scroll_requests(&self) -> &[ScrollToOptions] {
        &self.scroll_requests
    }

    /// Links followed because a click was not prevented.
    pub fn navigations(&self) -> &[String] {
        &self.navigations
    }

    /// Form submissions that were not prevented.
    pub fn native_submission_count(&self) -> usize {
        self.native_submissions
    }

    pub fn listener_count(&self, target: EventTarget, kind: EventKind) -> usize {
        self.listeners.count(target, kind)
    }

    pub fn total_listener_count(&self) -> usize {
        self.listeners.total()
    }

    /// Elements still watched by any intersection observer.
    pub fn observed_count(&self) -> usize {
        self.observers.iter().map(|observer| observer.targets.len()).sum()
    }

    pub fn node(&self, selector: &str) -> Result<NodeId> {
        self.select_one(selector)
    }

    pub fn has_class(&self, selector: &str, class_name: &str) -> Result<bool> {
        let target = self.select_one(selector)?;
        self.dom.class_contains(target, class_name)
    }

    pub fn assert_class(&self, selector: &str, class_name: &str, expected: bool) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.class_contains(target, class_name)?;
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: format!("class {class_name} present={expected}"),
                actual: format!("class {class_name} present={actual}"),
                dom_snippet: self.node_snippet(target),
            });
        }
        Ok(())
    }

    pub fn assert_text(&self, selector: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.text_content(target);
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: expected.to_string(),
                actual,
                dom_snippet: self.node_snippet(target),
            });
        }
        Ok(())
    }

    pub fn assert_value(&self, selector: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.value(target)?;
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: expected.to_string(),
                actual,
                dom_snippet: self.node_snippet(target),
            });
        }
        Ok(())
    }

    pub fn assert_exists(&self, selector: &str) -> Result<()> {
        let _ = self.select_one(selector)?;
        Ok(())
    }

    pub fn dump_dom(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        Ok(self.dom.dump_node(target))
    }

    fn select_one(&self, selector: &str) -> Result<NodeId> {
        self.dom
            .query_selector(selector)?
            .ok_or_else(|| Error::SelectorNotFound(selector.to_string()))
    }

    fn node_snippet(&self, node_id: NodeId) -> String {
        truncate_chars(&self.dom.dump_node(node_id), 200)
    }

    fn ensure_node(&self, node: NodeId) -> Result<()> {
        if self.dom.contains(node) {
            Ok(())
        } else {
            Err(Error::Runtime(format!("unknown node handle {}", node.0)))
        }
    }

    fn propagation_path(&self, target: EventTarget, kind: EventKind) -> Vec<EventTarget> {
        let mut path = vec![target];
        let bubbles = matches!(kind, EventKind::Click | EventKind::Submit);
        if let (true, EventTarget::Node(node)) = (bubbles, target) {
            let mut cursor = self.dom.parent(node);
            while let Some(current) = cursor {
                if current != self.dom.root {
                    path.push(EventTarget::Node(current));
                }
                cursor = self.dom.parent(current);
            }
            if self.dom.is_connected(node) {
                path.push(EventTarget::Document);
            }
        }
        path
    }

    fn dispatch_event(&mut self, target: EventTarget, kind: EventKind) -> Result<Event> {
        let mut outcome = Event::new(kind, target);
        for current in self.propagation_path(target, kind) {
            let listeners = self.listeners.get(current, kind);
            self.trace_event_line(format!(
                "[event] {} target={:?} current={:?} listeners={}",
                kind.as_str(),
                target,
                current,
                listeners.len()
            ));
            for listener in listeners {
                let mut event = Event::new(kind, target).with_passive(listener.options.passive);
                let Ok(mut handler) = listener.handler.try_borrow_mut() else {
                    return Err(Error::Runtime(format!(
                        "re-entrant {} dispatch to a running listener",
                        kind.as_str()
                    )));
                };
                self.dispatch_depth += 1;
                let result = (&mut *handler)(self, &mut event);
                self.dispatch_depth -= 1;
                result?;
                if event.default_prevented() {
                    outcome.prevent_default();
                }
            }
        }
        Ok(outcome)
    }

    /// Delivers queued scroll events and intersection changes until the page
    /// is quiet.
    pub fn settle(&mut self) -> Result<()> {
        if self.settling || self.dispatch_depth > 0 {
            return Ok(());
        }
        self.settling = true;
        let result = self.settle_queued_work();
        self.settling = false;
        result
    }

    fn settle_queued_work(&mut self) -> Result<()> {
        let mut steps = 0usize;
        loop {
            steps += 1;
            if steps > self.settle_step_limit {
                return Err(Error::Runtime(format!(
                    "page did not settle within {} steps",
                    self.settle_step_limit
                )));
            }
            if std::mem::take(&mut self.scroll_pending) {
                self.dispatch_event(EventTarget::Window, EventKind::Scroll)?;
                self.intersections_dirty = true;
                continue;
            }
            if std::mem::take(&mut self.intersections_dirty) {
                self.deliver_intersections()?;
                continue;
            }
            return Ok(());
        }
    }

    fn deliver_intersections(&mut self) -> Result<()> {
        for index in 0..self.observers.len() {
            let options = self.observers[index].options;
            let measured = self.observers[index]
                .targets
                .iter()
                .map(|observed| {
                    let rect = self.viewport_rect(observed.node);
                    let ratio = options.ratio(rect, self.viewport_height);
                    (observed.node, ratio, options.is_intersecting(rect, self.viewport_height))
                })
                .collect::<Vec<_>>();

            let mut entries = Vec::new();
            for (observed, (node, ratio, is_intersecting)) in self.observers[index]
                .targets
                .iter_mut()
                .zip(measured)
            {
                if observed.reported != Some(is_intersecting) {
                    observed.reported = Some(is_intersecting);
                    entries.push(IntersectionEntry {
                        target: node,
                        is_intersecting,
                        ratio,
                    });
                }
            }
            if entries.is_empty() {
                continue;
            }

            self.trace_event_line(format!(
                "[observer] deliver id={} entries={}",
                index,
                entries.len()
            ));
            let callback = Rc::clone(&self.observers[index].callback);
            let Ok(mut callback) = callback.try_borrow_mut() else {
                return Err(Error::Runtime(
                    "re-entrant intersection callback".into(),
                ));
            };
            self.dispatch_depth += 1;
            let result = (&mut *callback)(self, &entries, ObserverId(index));
            self.dispatch_depth -= 1;
            result?;
        }
        Ok(())
    }

    fn viewport_rect(&self, node: NodeId) -> Rect {
        if !self.dom.is_connected(node) {
            return Rect::default();
        }
        let rect = self.layout.get(&node).copied().unwrap_or_default();
        Rect {
            top: rect.top - self.scroll_y,
            height: rect.height,
        }
    }

    fn trace_event_line(&mut self, line: String) {
        self.trace_line(line);
    }

    fn trace_timer_line(&mut self, line: String) {
        self.trace_line(line);
    }

    fn trace_line(&mut self, line: String) {
        if self.trace {
            if self.trace_to_stderr {
                eprintln!("{line}");
            }
            if self.trace_logs.len() >= self.trace_log_limit {
                self.trace_logs.remove(0);
            }
            self.trace_logs.push(line);
        }
    }
}

impl Page for Harness {
    fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        self.dom.query_selector_all(selector)
    }

    fn query_selector_all_in(&self, scope: NodeId, selector: &str) -> Result<Vec<NodeId>> {
        self.ensure_node(scope)?;
        self.dom.query_selector_all_from(scope, selector)
    }

    fn class_add(&mut self, node: NodeId, class_name: &str) -> Result<()> {
        self.ensure_node(node)?;
        self.dom.class_add(node, class_name)
    }

    fn class_remove(&mut self, node: NodeId, class_name: &str) -> Result<()> {
        self.ensure_node(node)?;
        self.dom.class_remove(node, class_name)
    }

    fn class_contains(&self, node: NodeId, class_name: &str) -> Result<bool> {
        self.ensure_node(node)?;
        self.dom.class_contains(node, class_name)
    }

    fn attribute(&self, node: NodeId, name: &str) -> Result<Option<String>> {
        self.ensure_node(node)?;
        if self.dom.element(node).is_none() {
            return Err(Error::Runtime("getAttribute target is not an element".into()));
        }
        Ok(self.dom.attr(node, &name.to_ascii_lowercase()))
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<()> {
        self.ensure_node(node)?;
        self.dom.set_attr(node, name, value)
    }

    fn value(&self, node: NodeId) -> Result<String> {
        self.ensure_node(node)?;
        self.dom.value(node)
    }

    fn text_content(&self, node: NodeId) -> Result<String> {
        self.ensure_node(node)?;
        Ok(self.dom.text_content(node))
    }

    fn set_text_content(&mut self, node: NodeId, text: &str) -> Result<()> {
        self.ensure_node(node)?;
        self.dom.set_text_content(node, text)
    }

    fn create_element(&mut self, tag_name: &str) -> Result<NodeId> {
        if tag_name.is_empty() || !tag_name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
        {
            return Err(Error::Runtime(format!("invalid tag name: {tag_name}")));
        }
        Ok(self
            .dom
            .create_detached_element(tag_name.to_ascii_lowercase()))
    }

    fn insert_after(&mut self, anchor: NodeId, node: NodeId) -> Result<()> {
        self.ensure_node(anchor)?;
        self.ensure_node(node)?;
        self.dom.insert_after(anchor, node)?;
        self.intersections_dirty = true;
        Ok(())
    }

    fn reset_form(&mut self, form: NodeId) -> Result<()> {
        self.ensure_node(form)?;
        self.dom.reset_form(form)
    }

    fn bounding_client_rect(&self, node: NodeId) -> Result<Rect> {
        self.ensure_node(node)?;
        Ok(self.viewport_rect(node))
    }

    fn scroll_y(&self) -> f64 {
        self.scroll_y
    }

    fn inner_height(&self) -> f64 {
        self.viewport_height
    }

    fn document_is_loading(&self) -> bool {
        self.document_loading
    }

    fn scroll_to(&mut self, options: ScrollToOptions) -> Result<()> {
        self.trace_event_line(format!(
            "[scroll] scroll_to top={} behavior={:?}",
            options.top, options.behavior
        ));
        self.scroll_requests.push(options);
        // Smooth scrolling lands immediately; only the final position is observable.
        let target = options.top.max(0.0);
        if target == self.scroll_y {
            return Ok(());
        }
        self.scroll_y = target;
        self.scroll_pending = true;
        self.settle()
    }

    fn add_event_listener(
        &mut self,
        target: EventTarget,
        kind: EventKind,
        options: ListenerOptions,
        handler: EventHandler,
    ) -> Result<ListenerId> {
        if let EventTarget::Node(node) = target {
            self.ensure_node(node)?;
        }
        let id = self
            .listeners
            .add(target, kind, Listener { options, handler });
        self.trace_event_line(format!(
            "[listener] add {} target={:?} passive={}",
            kind.as_str(),
            target,
            options.passive
        ));
        Ok(id)
    }

    fn set_timeout(&mut self, delay_ms: i64, callback: TimerCallback) -> Result<TimerId> {
        let id = self.next_timer_id;
        self.next_timer_id += 1;
        let due_at = self.now_ms.saturating_add(delay_ms.max(0));
        let order = self.next_task_order;
        self.next_task_order += 1;
        self.task_queue.push(ScheduledTask {
            id,
            due_at,
            order,
            callback,
        });
        self.trace_timer_line(format!("[timer] schedule id={id} due_at={due_at}"));
        Ok(TimerId(id))
    }

    fn clear_timeout(&mut self, timer: TimerId) {
        let before = self.task_queue.len();
        self.task_queue.retain(|task| task.id != timer.0);
        if self.task_queue.len() != before {
            self.trace_timer_line(format!("[timer] clear id={}", timer.0));
        }
    }

    fn supports_intersection_observer(&self) -> bool {
        self.intersection_observer_supported
    }

    fn create_intersection_observer(
        &mut self,
        options: IntersectionOptions,
        callback: IntersectionCallback,
    ) -> Result<ObserverId> {
        if !self.intersection_observer_supported {
            return Err(Error::Runtime(
                "IntersectionObserver is not available".into(),
            ));
        }
        let id = ObserverId(self.observers.len());
        self.observers.push(Observer {
            options,
            callback,
            targets: Vec::new(),
        });
        Ok(id)
    }

    fn observe(&mut self, observer: ObserverId, node: NodeId) -> Result<()> {
        self.ensure_node(node)?;
        let observer = self
            .observers
            .get_mut(observer.0)
            .ok_or_else(|| Error::Runtime(format!("unknown observer {}", observer.0)))?;
        if !observer.targets.iter().any(|observed| observed.node == node) {
            observer.targets.push(ObservedTarget {
                node,
                reported: None,
            });
        }
        self.intersections_dirty = true;
        self.settle()
    }

    fn unobserve(&mut self, observer: ObserverId, node: NodeId) -> Result<()> {
        let observer = self
            .observers
            .get_mut(observer.0)
            .ok_or_else(|| Error::Runtime(format!("unknown observer {}", observer.0)))?;
        observer.targets.retain(|observed| observed.node != node);
        Ok(())
    }
}
