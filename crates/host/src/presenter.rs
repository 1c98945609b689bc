//! Text-console form presenter.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use edutools_core::{ActorId, RequestId};
use edutools_navigation::{Field, Form, FormPresenter, Presentation};

use crate::lang::{LangTranslator, Translator};

/// Shows forms as text and holds them until the console answers them.
///
/// An actor with an open form, or one marked occupied by some other UI, is
/// busy: further forms are refused until the open one is taken.
#[derive(Debug, Default)]
pub struct ConsolePresenter<T: Translator = LangTranslator> {
    translator: T,
    open: BTreeMap<ActorId, (RequestId, Form)>,
    occupied: BTreeSet<ActorId>,
    output: Vec<String>,
}

impl<T: Translator> ConsolePresenter<T> {
    /// Create a presenter.
    pub fn new(translator: T) -> Self {
        Self {
            translator,
            open: BTreeMap::new(),
            occupied: BTreeSet::new(),
            output: Vec::new(),
        }
    }

    /// Get the translator.
    pub fn translator(&self) -> &T {
        &self.translator
    }

    /// Mark the actor as having another UI open.
    pub fn set_occupied(&mut self, actor: &ActorId, occupied: bool) {
        if occupied {
            self.occupied.insert(actor.clone());
        } else {
            self.occupied.remove(actor);
        }
    }

    /// Whether the actor is marked occupied.
    pub fn is_occupied(&self, actor: &ActorId) -> bool {
        self.occupied.contains(actor)
    }

    /// Form currently open for the actor.
    pub fn open_form(&self, actor: &ActorId) -> Option<(RequestId, &Form)> {
        self.open.get(actor).map(|(request, form)| (*request, form))
    }

    /// Close the actor's open form so it can be answered.
    pub fn take(&mut self, actor: &ActorId) -> Option<(RequestId, Form)> {
        self.open.remove(actor)
    }

    /// Drop all state for a disconnected actor.
    pub fn forget(&mut self, actor: &ActorId) {
        self.open.remove(actor);
        self.occupied.remove(actor);
    }

    /// Rendered forms not yet printed.
    pub fn drain_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.output)
    }

    /// Render a form for display.
    pub fn render(&self, actor: &ActorId, form: &Form) -> String {
        let t = &self.translator;
        let mut out = format!("[{actor}] {}", t.render(form.title()));
        match form {
            Form::Action { body, buttons, .. } => {
                if let Some(body) = body {
                    let _ = write!(out, "\n  {}", t.render(body));
                }
                for (index, button) in buttons.iter().enumerate() {
                    let _ = write!(out, "\n  {index}) {}", t.render(&button.label));
                }
            }
            Form::Modal { fields, .. } => {
                for (index, field) in fields.iter().enumerate() {
                    let _ = write!(out, "\n  {index}) {}", describe_field(t, field));
                }
            }
            Form::Message { body, confirm, cancel, .. } => {
                let _ = write!(
                    out,
                    "\n  {}\n  0) {}  1) {}",
                    t.render(body),
                    t.render(confirm),
                    t.render(cancel)
                );
            }
        }
        out
    }
}

impl<T: Translator> FormPresenter for ConsolePresenter<T> {
    fn present(&mut self, actor: &ActorId, form: &Form) -> Presentation {
        if self.occupied.contains(actor) || self.open.contains_key(actor) {
            return Presentation::Busy;
        }
        let request = RequestId::new();
        let rendered = self.render(actor, form);
        self.output.push(rendered);
        self.open.insert(actor.clone(), (request, form.clone()));
        Presentation::Shown(request)
    }

    fn retire(&mut self, actor: &ActorId, request: RequestId) {
        if self.open.get(actor).is_some_and(|(open, _)| *open == request) {
            self.open.remove(actor);
        }
    }

    fn replace(&mut self, actor: &ActorId, previous: RequestId, form: &Form) -> Presentation {
        if self.occupied.contains(actor) {
            return Presentation::Busy;
        }
        self.retire(actor, previous);
        self.present(actor, form)
    }
}

fn describe_field<T: Translator>(t: &T, field: &Field) -> String {
    match field {
        Field::TextField { label, default, .. } => format!("{} [text, \"{default}\"]", t.render(label)),
        Field::Toggle { label, default } => format!("{} [toggle, {default}]", t.render(label)),
        Field::Slider { label, min, max, default, .. } => {
            format!("{} [{min}..{max}, {default}]", t.render(label))
        }
        Field::Dropdown { label, options, default } => {
            let options: Vec<String> = options.iter().map(|option| t.render(option)).collect();
            format!("{} [{}; {default}]", t.render(label), options.join(" | "))
        }
    }
}
