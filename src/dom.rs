use super::*;

#[derive(Debug, Clone)]
pub(crate) enum NodeType {
    Document,
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) node_type: NodeType,
}

#[derive(Debug, Clone)]
pub(crate) struct Element {
    pub(crate) tag_name: String,
    pub(crate) attrs: HashMap<String, String>,
    pub(crate) value: String,
    pub(crate) default_value: String,
}

impl Element {
    fn is_checkable_input(&self) -> bool {
        let kind = self.attrs.get("type").map(|kind| kind.to_ascii_lowercase());
        self.tag_name.eq_ignore_ascii_case("input")
            && matches!(kind.as_deref(), Some("checkbox" | "radio"))
    }

    fn new(tag_name: String, attrs: HashMap<String, String>) -> Self {
        let value = attrs.get("value").cloned().unwrap_or_default();
        Self {
            tag_name,
            attrs,
            default_value: value.clone(),
            value,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Dom {
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: NodeId,
}

impl Dom {
    pub(crate) fn new() -> Self {
        let root = Node {
            parent: None,
            children: Vec::new(),
            node_type: NodeType::Document,
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    fn create_node(&mut self, parent: Option<NodeId>, node_type: NodeType) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            node_type,
        });
        if let Some(parent_id) = parent {
            self.nodes[parent_id.0].children.push(id);
        }
        id
    }

    pub(crate) fn create_element(
        &mut self,
        parent: NodeId,
        tag_name: String,
        attrs: HashMap<String, String>,
    ) -> NodeId {
        self.create_node(Some(parent), NodeType::Element(Element::new(tag_name, attrs)))
    }

    pub(crate) fn create_detached_element(&mut self, tag_name: String) -> NodeId {
        self.create_node(None, NodeType::Element(Element::new(tag_name, HashMap::new())))
    }

    pub(crate) fn create_text(&mut self, parent: NodeId, text: String) -> NodeId {
        self.create_node(Some(parent), NodeType::Text(text))
    }

    pub(crate) fn contains(&self, node_id: NodeId) -> bool {
        node_id.0 < self.nodes.len()
    }

    pub(crate) fn element(&self, node_id: NodeId) -> Option<&Element> {
        match &self.nodes.get(node_id.0)?.node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    pub(crate) fn element_mut(&mut self, node_id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes.get_mut(node_id.0)?.node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    fn element_or_err(&self, node_id: NodeId, what: &str) -> Result<&Element> {
        self.element(node_id)
            .ok_or_else(|| Error::Runtime(format!("{what} target is not an element")))
    }

    fn element_mut_or_err(&mut self, node_id: NodeId, what: &str) -> Result<&mut Element> {
        self.element_mut(node_id)
            .ok_or_else(|| Error::Runtime(format!("{what} target is not an element")))
    }

    pub(crate) fn tag_name(&self, node_id: NodeId) -> Option<&str> {
        self.element(node_id).map(|e| e.tag_name.as_str())
    }

    pub(crate) fn is_tag(&self, node_id: NodeId, tag: &str) -> bool {
        self.tag_name(node_id)
            .map(|name| name.eq_ignore_ascii_case(tag))
            .unwrap_or(false)
    }

    pub(crate) fn parent(&self, node_id: NodeId) -> Option<NodeId> {
        self.nodes.get(node_id.0)?.parent
    }

    pub(crate) fn is_connected(&self, node_id: NodeId) -> bool {
        let mut cursor = Some(node_id);
        while let Some(current) = cursor {
            if current == self.root {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    pub(crate) fn attr(&self, node_id: NodeId, name: &str) -> Option<String> {
        self.element(node_id)
            .and_then(|element| element.attrs.get(name).cloned())
    }

    pub(crate) fn set_attr(&mut self, node_id: NodeId, name: &str, value: &str) -> Result<()> {
        let element = self.element_mut_or_err(node_id, "setAttribute")?;
        element
            .attrs
            .insert(name.to_ascii_lowercase(), value.to_string());
        if name.eq_ignore_ascii_case("value") {
            element.default_value = value.to_string();
        }
        Ok(())
    }

    pub(crate) fn find_ancestor_by_tag(&self, node_id: NodeId, tag: &str) -> Option<NodeId> {
        let mut cursor = self.parent(node_id);
        while let Some(current) = cursor {
            if self.is_tag(current, tag) {
                return Some(current);
            }
            cursor = self.parent(current);
        }
        None
    }

    pub(crate) fn text_content(&self, node_id: NodeId) -> String {
        match &self.nodes[node_id.0].node_type {
            NodeType::Document | NodeType::Element(_) => {
                let mut out = String::new();
                for child in &self.nodes[node_id.0].children {
                    out.push_str(&self.text_content(*child));
                }
                out
            }
            NodeType::Text(text) => text.clone(),
        }
    }

    pub(crate) fn set_text_content(&mut self, node_id: NodeId, value: &str) -> Result<()> {
        self.element_or_err(node_id, "textContent")?;
        let old_children = std::mem::take(&mut self.nodes[node_id.0].children);
        for child in old_children {
            self.nodes[child.0].parent = None;
        }
        if !value.is_empty() {
            self.create_text(node_id, value.to_string());
        }
        Ok(())
    }

    /// Checkboxes and radios without a `value` attribute read as `"on"`.
    pub(crate) fn value(&self, node_id: NodeId) -> Result<String> {
        let element = self.element_or_err(node_id, "value")?;
        if element.is_checkable_input() && !element.attrs.contains_key("value") {
            return Ok("on".to_string());
        }
        Ok(element.value.clone())
    }

    pub(crate) fn set_value(&mut self, node_id: NodeId, value: &str) -> Result<()> {
        let element = self.element_mut_or_err(node_id, "value")?;
        if element.is_checkable_input() {
            element.attrs.insert("value".to_string(), value.to_string());
        }
        element.value = value.to_string();
        Ok(())
    }

    /// Textarea values start from their text content.
    pub(crate) fn initialize_form_control_values(&mut self) {
        for node in self.all_element_nodes() {
            if self.is_tag(node, "textarea") {
                let text = self.text_content(node);
                if let Some(element) = self.element_mut(node) {
                    element.value = text.clone();
                    element.default_value = text;
                }
            }
        }
    }

    pub(crate) fn reset_form(&mut self, form: NodeId) -> Result<()> {
        if !self.is_tag(form, "form") {
            return Err(Error::Runtime("reset target is not a form".into()));
        }
        let mut controls = Vec::new();
        self.collect_elements_descendants_dfs(form, &mut controls);
        for control in controls {
            let is_control = self.is_tag(control, "input") || self.is_tag(control, "textarea");
            if !is_control {
                continue;
            }
            // A checkable input's value is its attribute; reset leaves it alone.
            if let Some(element) = self.element_mut(control) {
                if !element.is_checkable_input() {
                    element.value = element.default_value.clone();
                }
            }
        }
        Ok(())
    }

    pub(crate) fn insert_after(&mut self, anchor: NodeId, node: NodeId) -> Result<()> {
        if anchor == node {
            return Err(Error::Runtime("cannot insert a node after itself".into()));
        }
        let parent = self
            .parent(anchor)
            .ok_or_else(|| Error::Runtime("insert_after anchor has no parent".into()))?;
        if let Some(old_parent) = self.parent(node) {
            self.nodes[old_parent.0].children.retain(|child| *child != node);
        }
        let siblings = &mut self.nodes[parent.0].children;
        let pos = siblings
            .iter()
            .position(|child| *child == anchor)
            .ok_or_else(|| Error::Runtime("insert_after anchor is detached".into()))?;
        siblings.insert(pos + 1, node);
        self.nodes[node.0].parent = Some(parent);
        Ok(())
    }

    pub(crate) fn class_contains(&self, node_id: NodeId, class_name: &str) -> Result<bool> {
        let element = self.element_or_err(node_id, "classList")?;
        Ok(has_class(element, class_name))
    }

    pub(crate) fn class_add(&mut self, node_id: NodeId, class_name: &str) -> Result<()> {
        let element = self.element_mut_or_err(node_id, "classList")?;
        let mut classes = class_tokens(element.attrs.get("class").map(String::as_str));
        if !classes.iter().any(|name| name == class_name) {
            classes.push(class_name.to_string());
        }
        set_class_attr(element, &classes);
        Ok(())
    }

    pub(crate) fn class_remove(&mut self, node_id: NodeId, class_name: &str) -> Result<()> {
        let element = self.element_mut_or_err(node_id, "classList")?;
        let mut classes = class_tokens(element.attrs.get("class").map(String::as_str));
        classes.retain(|name| name != class_name);
        set_class_attr(element, &classes);
        Ok(())
    }

    pub(crate) fn query_selector(&self, selector: &str) -> Result<Option<NodeId>> {
        Ok(self.query_selector_all(selector)?.into_iter().next())
    }

    pub(crate) fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        let mut ids = Vec::new();
        self.collect_elements_dfs(self.root, &mut ids);
        self.filter_matching(ids, selector)
    }

    pub(crate) fn query_selector_all_from(
        &self,
        root: NodeId,
        selector: &str,
    ) -> Result<Vec<NodeId>> {
        let mut ids = Vec::new();
        self.collect_elements_descendants_dfs(root, &mut ids);
        self.filter_matching(ids, selector)
    }

    fn filter_matching(&self, candidates: Vec<NodeId>, selector: &str) -> Result<Vec<NodeId>> {
        let groups = parse_selector_groups(selector)?;
        let mut seen = HashSet::new();
        let mut matched = Vec::new();
        for candidate in candidates {
            if groups
                .iter()
                .any(|steps| self.matches_selector_chain(candidate, steps))
                && seen.insert(candidate)
            {
                matched.push(candidate);
            }
        }
        Ok(matched)
    }

    fn collect_elements_dfs(&self, node_id: NodeId, out: &mut Vec<NodeId>) {
        if matches!(self.nodes[node_id.0].node_type, NodeType::Element(_)) {
            out.push(node_id);
        }
        for child in &self.nodes[node_id.0].children {
            self.collect_elements_dfs(*child, out);
        }
    }

    fn collect_elements_descendants_dfs(&self, node_id: NodeId, out: &mut Vec<NodeId>) {
        for child in &self.nodes[node_id.0].children {
            self.collect_elements_dfs(*child, out);
        }
    }

    fn all_element_nodes(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_elements_dfs(self.root, &mut out);
        out
    }

    fn matches_selector_chain(&self, node_id: NodeId, steps: &[SelectorPart]) -> bool {
        let Some(last) = steps.last() else {
            return false;
        };
        if !self.matches_step(node_id, &last.step) {
            return false;
        }

        let mut current = node_id;
        for idx in (1..steps.len()).rev() {
            let prev_step = &steps[idx - 1].step;
            let combinator = steps[idx]
                .combinator
                .unwrap_or(SelectorCombinator::Descendant);

            let matched = match combinator {
                SelectorCombinator::Child => self
                    .parent(current)
                    .filter(|parent| self.matches_step(*parent, prev_step)),
                SelectorCombinator::Descendant => {
                    let mut cursor = self.parent(current);
                    let mut found = None;
                    while let Some(parent) = cursor {
                        if self.matches_step(parent, prev_step) {
                            found = Some(parent);
                            break;
                        }
                        cursor = self.parent(parent);
                    }
                    found
                }
            };

            let Some(matched) = matched else {
                return false;
            };
            current = matched;
        }

        true
    }

    fn matches_step(&self, node_id: NodeId, step: &SelectorStep) -> bool {
        let Some(element) = self.element(node_id) else {
            return false;
        };

        if let Some(tag) = &step.tag {
            if !element.tag_name.eq_ignore_ascii_case(tag) {
                return false;
            }
        }

        if let Some(id) = &step.id {
            if element.attrs.get("id") != Some(id) {
                return false;
            }
        }

        if step
            .classes
            .iter()
            .any(|class_name| !has_class(element, class_name))
        {
            return false;
        }

        for cond in &step.attrs {
            let matched = match cond {
                SelectorAttrCondition::Exists { key } => element.attrs.contains_key(key),
                SelectorAttrCondition::Eq { key, value } => {
                    if key == "type" {
                        element
                            .attrs
                            .get(key)
                            .is_some_and(|actual| actual.eq_ignore_ascii_case(value))
                    } else {
                        element.attrs.get(key) == Some(value)
                    }
                }
            };
            if !matched {
                return false;
            }
        }

        for pseudo in &step.pseudo_classes {
            let matched = match pseudo {
                SelectorPseudoClass::Not(groups) => !groups
                    .iter()
                    .any(|inner| self.matches_selector_chain(node_id, inner)),
            };
            if !matched {
                return false;
            }
        }

        true
    }

    pub(crate) fn dump_node(&self, node_id: NodeId) -> String {
        match &self.nodes[node_id.0].node_type {
            NodeType::Document => {
                let mut out = String::new();
                for child in &self.nodes[node_id.0].children {
                    out.push_str(&self.dump_node(*child));
                }
                out
            }
            NodeType::Text(text) => text.clone(),
            NodeType::Element(element) => {
                let mut attrs = element.attrs.iter().collect::<Vec<_>>();
                attrs.sort();
                let mut out = String::new();
                out.push('<');
                out.push_str(&element.tag_name);
                for (k, v) in attrs {
                    out.push(' ');
                    out.push_str(k);
                    out.push_str("=\"");
                    out.push_str(v);
                    out.push('"');
                }
                out.push('>');
                if html::is_void_tag(&element.tag_name) {
                    return out;
                }
                for child in &self.nodes[node_id.0].children {
                    out.push_str(&self.dump_node(*child));
                }
                out.push_str("</");
                out.push_str(&element.tag_name);
                out.push('>');
                out
            }
        }
    }
}

pub(crate) fn has_class(element: &Element, class_name: &str) -> bool {
    element
        .attrs
        .get("class")
        .map(|classes| classes.split_whitespace().any(|c| c == class_name))
        .unwrap_or(false)
}

pub(crate) fn class_tokens(class_attr: Option<&str>) -> Vec<String> {
    class_attr
        .map(|value| {
            value
                .split_whitespace()
                .filter(|token| !token.is_empty())
                .map(ToOwned::to_owned)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default()
}

pub(crate) fn set_class_attr(element: &mut Element, classes: &[String]) {
    if classes.is_empty() {
        element.attrs.remove("class");
    } else {
        element.attrs.insert("class".to_string(), classes.join(" "));
    }
}
