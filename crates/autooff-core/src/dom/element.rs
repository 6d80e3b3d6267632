use serde::{Deserialize, Serialize};

/// A point-in-time read of the attributes the automation cares about.
///
/// Backends produce one of these per element read; the predicates below are
/// pure functions over it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementState {
    /// Lowercase tag name
    pub tag: String,
    #[serde(default)]
    pub input_type: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub data_id: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    /// The `checked` property, only meaningful for inputs
    #[serde(default)]
    pub checked: bool,
    #[serde(default)]
    pub aria_checked: Option<String>,
    #[serde(default)]
    pub aria_pressed: Option<String>,
    #[serde(default)]
    pub aria_expanded: Option<String>,
    #[serde(default)]
    pub aria_controls: Option<String>,
    #[serde(default)]
    pub aria_label: Option<String>,
    #[serde(default)]
    pub label_for: Option<String>,
    #[serde(default)]
    pub hidden: bool,
    /// Trimmed text content
    #[serde(default)]
    pub text: String,
}

impl ElementState {
    pub fn is_native_checkbox(&self) -> bool {
        self.tag == "input"
            && self
                .input_type
                .as_deref()
                .is_some_and(|t| t.eq_ignore_ascii_case("checkbox"))
    }

    /// `id`, falling back to `data-id`. Empty ids count as absent.
    pub fn identity(&self) -> Option<&str> {
        self.id
            .as_deref()
            .filter(|id| !id.is_empty())
            .or(self.data_id.as_deref().filter(|id| !id.is_empty()))
    }

    pub fn is_expanded(&self) -> bool {
        self.aria_expanded.as_deref() == Some("true")
    }
}

/// Whether an element is currently on.
pub fn is_checked(state: &ElementState) -> bool {
    if state.is_native_checkbox() {
        state.checked
    } else {
        state.aria_checked.as_deref() == Some("true")
            || state.aria_pressed.as_deref() == Some("true")
    }
}

/// The ways an element can behave as a toggle.
///
/// All variants share the same capability (read state, activate); the variant
/// only records how the element was recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToggleKind {
    NativeCheckbox,
    RoleCheckbox,
    RoleSwitch,
    AriaState,
}

impl ToggleKind {
    pub fn classify(state: &ElementState) -> Option<Self> {
        if state.is_native_checkbox() {
            return Some(ToggleKind::NativeCheckbox);
        }
        match state.role.as_deref() {
            Some("checkbox") => return Some(ToggleKind::RoleCheckbox),
            Some("switch") => return Some(ToggleKind::RoleSwitch),
            _ => {}
        }
        if state.aria_checked.is_some() || state.aria_pressed.is_some() {
            return Some(ToggleKind::AriaState);
        }
        None
    }

    /// Stricter test used for whole-page id scans, where a bare `aria-pressed`
    /// button is not considered a checkbox.
    pub fn is_checkbox_role(self) -> bool {
        !matches!(self, ToggleKind::AriaState)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ToggleKind::NativeCheckbox => "native-checkbox",
            ToggleKind::RoleCheckbox => "role-checkbox",
            ToggleKind::RoleSwitch => "role-switch",
            ToggleKind::AriaState => "aria-state",
        }
    }
}
