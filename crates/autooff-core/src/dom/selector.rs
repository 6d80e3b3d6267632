/// A single attribute condition within a compound selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrFilter {
    /// `[name]`
    Present(String),
    /// `[name="value"]`
    Equals(String, String),
    /// `[name^="value"]`
    Prefix(String, String),
}

impl AttrFilter {
    fn matches(&self, attr: &dyn Fn(&str) -> Option<String>) -> bool {
        match self {
            AttrFilter::Present(name) => attr(name).is_some(),
            AttrFilter::Equals(name, value) => attr(name).as_deref() == Some(value.as_str()),
            AttrFilter::Prefix(name, prefix) => {
                attr(name).is_some_and(|v| v.starts_with(prefix.as_str()))
            }
        }
    }

    fn to_css(&self) -> String {
        match self {
            AttrFilter::Present(name) => format!("[{}]", name),
            AttrFilter::Equals(name, value) => format!("[{}=\"{}\"]", name, escape(value)),
            AttrFilter::Prefix(name, value) => format!("[{}^=\"{}\"]", name, escape(value)),
        }
    }
}

/// Tag plus attribute conditions, e.g. `input[type="checkbox"]`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Simple {
    tag: Option<String>,
    attrs: Vec<AttrFilter>,
}

impl Simple {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn tag(tag: &str) -> Self {
        Self {
            tag: Some(tag.to_ascii_lowercase()),
            attrs: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: &str) -> Self {
        self.attrs.push(AttrFilter::Present(name.to_string()));
        self
    }

    pub fn with_attr_eq(mut self, name: &str, value: &str) -> Self {
        self.attrs
            .push(AttrFilter::Equals(name.to_string(), value.to_string()));
        self
    }

    pub fn with_attr_prefix(mut self, name: &str, prefix: &str) -> Self {
        self.attrs
            .push(AttrFilter::Prefix(name.to_string(), prefix.to_string()));
        self
    }

    /// Match against an element's lowercase tag name and an attribute lookup.
    pub fn matches(&self, tag: &str, attr: &dyn Fn(&str) -> Option<String>) -> bool {
        if let Some(expected) = &self.tag {
            if !expected.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        self.attrs.iter().all(|filter| filter.matches(attr))
    }

    pub fn to_css(&self) -> String {
        let mut css = self.tag.clone().unwrap_or_default();
        for filter in &self.attrs {
            css.push_str(&filter.to_css());
        }
        if css.is_empty() {
            css.push('*');
        }
        css
    }
}

/// A simple selector, optionally constrained by an ancestor (`h3 button`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compound {
    pub ancestor: Option<Simple>,
    pub target: Simple,
}

impl Compound {
    pub fn to_css(&self) -> String {
        match &self.ancestor {
            Some(ancestor) => format!("{} {}", ancestor.to_css(), self.target.to_css()),
            None => self.target.to_css(),
        }
    }
}

/// A selector list (`a, b, c`).
///
/// Backends either render it to CSS (`to_css`) or evaluate it against their
/// own node representation, so the automation never hand-writes CSS strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    alternatives: Vec<Compound>,
}

impl Selector {
    pub fn new(alternatives: Vec<Compound>) -> Self {
        Self { alternatives }
    }

    pub fn simple(target: Simple) -> Self {
        Self::new(vec![Compound {
            ancestor: None,
            target,
        }])
    }

    pub fn any_of(targets: impl IntoIterator<Item = Simple>) -> Self {
        Self::new(
            targets
                .into_iter()
                .map(|target| Compound {
                    ancestor: None,
                    target,
                })
                .collect(),
        )
    }

    pub fn descendant(ancestor: Simple, target: Simple) -> Self {
        Self::new(vec![Compound {
            ancestor: Some(ancestor),
            target,
        }])
    }

    pub fn alternatives(&self) -> &[Compound] {
        &self.alternatives
    }

    pub fn to_css(&self) -> String {
        self.alternatives
            .iter()
            .map(Compound::to_css)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Checkbox-like elements: native inputs, ARIA roles, ARIA state carriers
    pub fn toggles() -> Self {
        Self::any_of([
            Simple::tag("input").with_attr_eq("type", "checkbox"),
            Simple::any().with_attr_eq("role", "checkbox"),
            Simple::any().with_attr_eq("role", "switch"),
            Simple::any().with_attr("aria-checked"),
            Simple::any().with_attr("aria-pressed"),
        ])
    }

    /// The button that expands a section: `h3 button[aria-controls]`
    pub fn accordion_button() -> Self {
        Self::descendant(Simple::tag("h3"), Simple::tag("button").with_attr("aria-controls"))
    }

    pub fn region() -> Self {
        Self::simple(Simple::any().with_attr_eq("role", "region"))
    }

    pub fn label() -> Self {
        Self::simple(Simple::tag("label"))
    }

    pub fn label_for(id: &str) -> Self {
        Self::simple(Simple::tag("label").with_attr_eq("for", id))
    }

    pub fn id(id: &str) -> Self {
        Self::simple(Simple::any().with_attr_eq("id", id))
    }

    pub fn id_prefix(prefix: &str) -> Self {
        Self::simple(Simple::any().with_attr_prefix("id", prefix))
    }

    pub fn with_id() -> Self {
        Self::simple(Simple::any().with_attr("id"))
    }

    /// Containers whose text serves as a last-resort label
    pub fn card() -> Self {
        Self::any_of([
            Simple::tag("li"),
            Simple::tag("div"),
            Simple::tag("article"),
            Simple::tag("section"),
        ])
    }
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup<'a>(attrs: &'a HashMap<&'a str, &'a str>) -> impl Fn(&str) -> Option<String> + 'a {
        move |name| attrs.get(name).map(|v| v.to_string())
    }

    #[test]
    fn test_toggle_selector_css() {
        assert_eq!(
            Selector::toggles().to_css(),
            concat!(
                "input[type=\"checkbox\"], [role=\"checkbox\"], [role=\"switch\"], ",
                "[aria-checked], [aria-pressed]"
            )
        );
    }

    #[test]
    fn test_descendant_css() {
        assert_eq!(Selector::accordion_button().to_css(), "h3 button[aria-controls]");
    }

    #[test]
    fn test_quotes_are_escaped() {
        assert_eq!(
            Selector::label_for("a\"b").to_css(),
            "label[for=\"a\\\"b\"]"
        );
    }

    #[test]
    fn test_simple_matching() {
        let attrs = HashMap::from([("type", "checkbox"), ("id", "skill-rust")]);
        let checkbox = Simple::tag("input").with_attr_eq("type", "checkbox");
        assert!(checkbox.matches("input", &lookup(&attrs)));
        assert!(checkbox.matches("INPUT", &lookup(&attrs)));
        assert!(!checkbox.matches("div", &lookup(&attrs)));

        let prefix = Simple::any().with_attr_prefix("id", "skill-");
        assert!(prefix.matches("span", &lookup(&attrs)));
        assert!(!Simple::any().with_attr_prefix("id", "tool-").matches("span", &lookup(&attrs)));
        assert!(!Simple::any().with_attr("aria-checked").matches("span", &lookup(&attrs)));
    }
}
