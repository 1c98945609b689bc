//! Forms rendered to actors and the host presenter boundary.

use edutools_core::{ActorId, RequestId, Text, Value};
use serde::{Deserialize, Serialize};

/// A button on an action form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    /// Button label
    pub label: Text,
    /// Optional texture path shown next to the label
    pub icon: Option<String>,
}

impl Button {
    /// A button without an icon.
    pub fn new(label: impl Into<Text>) -> Self {
        Self {
            label: label.into(),
            icon: None,
        }
    }

    /// Attach an icon.
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }
}

/// An input on a modal form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Field {
    /// Free text input
    TextField {
        /// Field label
        label: Text,
        /// Placeholder text
        placeholder: Text,
        /// Initial value
        default: String,
    },
    /// On/off switch
    Toggle {
        /// Field label
        label: Text,
        /// Initial value
        default: bool,
    },
    /// Numeric slider
    Slider {
        /// Field label
        label: Text,
        /// Lowest value
        min: f64,
        /// Highest value
        max: f64,
        /// Step size
        step: f64,
        /// Initial value
        default: f64,
    },
    /// Single choice from a list
    Dropdown {
        /// Field label
        label: Text,
        /// Choices
        options: Vec<Text>,
        /// Initially selected index
        default: usize,
    },
}

impl Field {
    fn accepts(&self, value: &Value) -> bool {
        match self {
            Field::TextField { .. } => value.is_string(),
            Field::Toggle { .. } => value.is_boolean(),
            Field::Slider { min, max, .. } => value.as_f64().is_some_and(|v| v >= *min && v <= *max),
            Field::Dropdown { options, .. } => value
                .as_u64()
                .is_some_and(|index| (index as usize) < options.len()),
        }
    }
}

/// A request rendered to an actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Form {
    /// A list of buttons
    Action {
        /// Title
        title: Text,
        /// Body text above the buttons
        body: Option<Text>,
        /// Buttons in display order
        buttons: Vec<Button>,
    },
    /// A set of input fields
    Modal {
        /// Title
        title: Text,
        /// Fields in display order
        fields: Vec<Field>,
    },
    /// A two-button prompt
    Message {
        /// Title
        title: Text,
        /// Body text
        body: Text,
        /// Confirm button label
        confirm: Text,
        /// Cancel button label
        cancel: Text,
    },
}

impl Form {
    /// Empty action form.
    pub fn action(title: impl Into<Text>) -> Self {
        Form::Action {
            title: title.into(),
            body: None,
            buttons: Vec::new(),
        }
    }

    /// Empty modal form.
    pub fn modal(title: impl Into<Text>) -> Self {
        Form::Modal {
            title: title.into(),
            fields: Vec::new(),
        }
    }

    /// Message form.
    pub fn message(
        title: impl Into<Text>,
        body: impl Into<Text>,
        confirm: impl Into<Text>,
        cancel: impl Into<Text>,
    ) -> Self {
        Form::Message {
            title: title.into(),
            body: body.into(),
            confirm: confirm.into(),
            cancel: cancel.into(),
        }
    }

    /// Set the body of an action form. Other shapes are returned unchanged.
    pub fn body(mut self, text: impl Into<Text>) -> Self {
        if let Form::Action { body, .. } = &mut self {
            *body = Some(text.into());
        }
        self
    }

    /// Append a button to an action form. Other shapes are returned unchanged.
    pub fn button(mut self, button: impl Into<Button>) -> Self {
        if let Form::Action { buttons, .. } = &mut self {
            buttons.push(button.into());
        }
        self
    }

    /// Append a field to a modal form. Other shapes are returned unchanged.
    pub fn field(mut self, field: Field) -> Self {
        if let Form::Modal { fields, .. } = &mut self {
            fields.push(field);
        }
        self
    }

    /// Form title.
    pub fn title(&self) -> &Text {
        match self {
            Form::Action { title, .. } | Form::Modal { title, .. } | Form::Message { title, .. } => title,
        }
    }

    /// Whether `response` has the shape this form can produce.
    pub fn accepts(&self, response: &Response) -> bool {
        match (self, response) {
            (Form::Action { buttons, .. }, Response::Button(index)) => *index < buttons.len(),
            (Form::Modal { fields, .. }, Response::Values(values)) => {
                values.len() == fields.len()
                    && fields.iter().zip(values).all(|(field, value)| field.accepts(value))
            }
            (Form::Message { .. }, Response::Accepted(_)) => true,
            _ => false,
        }
    }
}

impl From<Text> for Button {
    fn from(label: Text) -> Self {
        Button::new(label)
    }
}

impl From<&str> for Button {
    fn from(label: &str) -> Self {
        Button::new(label)
    }
}

/// Values submitted by the actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Response {
    /// Index of the pressed button on an action form
    Button(usize),
    /// One value per modal field, in field order
    Values(Vec<Value>),
    /// Message form: `true` for confirm, `false` for the cancel button
    Accepted(bool),
}

/// Why a form closed without a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DismissReason {
    /// The actor closed the form
    UserClosed,
    /// Another form was already open
    UserBusy,
}

/// What the host reports once a shown form resolves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FormResponse {
    /// The actor submitted the form
    Submitted(Response),
    /// The form closed without a submission
    Dismissed(DismissReason),
}

/// Result of asking the host to show a form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presentation {
    /// The form is on screen; its answer arrives later under this id
    Shown(RequestId),
    /// The actor already has a form open
    Busy,
}

/// Host side of form display.
pub trait FormPresenter {
    /// Show `form` to `actor`. Must not block.
    fn present(&mut self, actor: &ActorId, form: &Form) -> Presentation;

    /// Take down a form shown under `request`. Unknown or already answered
    /// requests are ignored.
    fn retire(&mut self, _actor: &ActorId, _request: RequestId) {}

    /// Show `form` in place of the form shown under `previous`.
    ///
    /// On `Busy` the previous form must still be on screen.
    fn replace(&mut self, actor: &ActorId, previous: RequestId, form: &Form) -> Presentation {
        let presentation = self.present(actor, form);
        if let Presentation::Shown(_) = presentation {
            self.retire(actor, previous);
        }
        presentation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_form_builder() {
        let form = Form::action("edutools.menu.title")
            .body("edutools.menu.body")
            .button("edutools.menu.teams")
            .button(Button::new("edutools.menu.settings").with_icon("textures/ui/gear"));

        match &form {
            Form::Action { body, buttons, .. } => {
                assert!(body.is_some());
                assert_eq!(buttons.len(), 2);
                assert_eq!(buttons[1].icon.as_deref(), Some("textures/ui/gear"));
            }
            other => panic!("unexpected form {other:?}"),
        }
        assert!(form.accepts(&Response::Button(1)));
        assert!(!form.accepts(&Response::Button(2)));
        assert!(!form.accepts(&Response::Accepted(true)));
    }

    #[test]
    fn test_modal_response_validation() {
        let form = Form::modal("edutools.team.edit")
            .field(Field::TextField {
                label: "edutools.team.name".into(),
                placeholder: Text::raw("Team name"),
                default: String::new(),
            })
            .field(Field::Toggle {
                label: "edutools.team.friendly_fire".into(),
                default: false,
            })
            .field(Field::Slider {
                label: "edutools.team.size".into(),
                min: 1.0,
                max: 8.0,
                step: 1.0,
                default: 4.0,
            })
            .field(Field::Dropdown {
                label: "edutools.team.color".into(),
                options: vec!["red".into(), "blue".into()],
                default: 0,
            });

        assert!(form.accepts(&Response::Values(vec![json!("Red"), json!(true), json!(3), json!(1)])));
        assert!(!form.accepts(&Response::Values(vec![json!("Red"), json!(true), json!(9), json!(1)])));
        assert!(!form.accepts(&Response::Values(vec![json!("Red"), json!(true), json!(3), json!(2)])));
        assert!(!form.accepts(&Response::Values(vec![json!("Red")])));
    }

    #[test]
    fn test_builders_ignore_mismatched_shapes() {
        let form = Form::modal("edutools.title").button("edutools.ok");
        assert_eq!(form, Form::modal("edutools.title"));
    }
}
