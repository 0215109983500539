//! Voice response markup.
//!
//! A small fixed vocabulary rendered to the provider's XML dialect. Attribute
//! order is preserved as inserted so output is stable and comparable.

use std::fmt::Write as _;

/// One markup element: `Say`, `Play`, `Pause`, `Gather`, `Record`, `Redirect` or `Hangup`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verb {
    name: &'static str,
    attributes: Vec<(&'static str, String)>,
    text: Option<String>,
    children: Vec<Verb>,
}

impl Verb {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            attributes: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    pub fn say(text: impl Into<String>, voice: impl Into<String>) -> Self {
        let mut verb = Self::new("Say").attr("voice", voice.into());
        verb.text = Some(text.into());
        verb
    }

    pub fn play(url: impl Into<String>) -> Self {
        let mut verb = Self::new("Play");
        verb.text = Some(url.into());
        verb
    }

    pub fn pause(seconds: u32) -> Self {
        Self::new("Pause").attr("length", seconds.to_string())
    }

    pub fn gather() -> Self {
        Self::new("Gather")
    }

    pub fn record() -> Self {
        Self::new("Record")
    }

    pub fn redirect(url: impl Into<String>) -> Self {
        let mut verb = Self::new("Redirect");
        verb.text = Some(url.into());
        verb
    }

    pub fn hangup() -> Self {
        Self::new("Hangup")
    }

    pub fn attr(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.attributes.push((name, value.into()));
        self
    }

    pub fn flag(self, name: &'static str, value: bool) -> Self {
        self.attr(name, if value { "true" } else { "false" })
    }

    pub fn attr_opt<V: ToString>(self, name: &'static str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.attr(name, v.to_string()),
            None => self,
        }
    }

    pub fn children(mut self, children: Vec<Verb>) -> Self {
        self.children = children;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Value of an attribute, if set.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn nested(&self) -> &[Verb] {
        &self.children
    }

    fn write_to(&self, out: &mut String) {
        let _ = write!(out, "<{}", self.name);
        for (name, value) in &self.attributes {
            let _ = write!(out, " {}=\"{}\"", name, escape(value));
        }
        match (&self.text, self.children.is_empty()) {
            (None, true) => out.push_str("/>"),
            (text, _) => {
                out.push('>');
                if let Some(text) = text {
                    out.push_str(&escape(text));
                }
                for child in &self.children {
                    child.write_to(out);
                }
                let _ = write!(out, "</{}>", self.name);
            }
        }
    }
}

/// A complete voice response document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceResponse {
    verbs: Vec<Verb>,
}

impl VoiceResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// The response sent when a request fails validation or hits a machine.
    pub fn hangup_only() -> Self {
        let mut response = Self::new();
        response.push(Verb::hangup());
        response
    }

    pub fn push(&mut self, verb: Verb) {
        self.verbs.push(verb);
    }

    pub fn extend(&mut self, verbs: impl IntoIterator<Item = Verb>) {
        self.verbs.extend(verbs);
    }

    pub fn verbs(&self) -> &[Verb] {
        &self.verbs
    }

    /// Names of the top-level verbs, in order.
    pub fn verb_names(&self) -> Vec<&'static str> {
        self.verbs.iter().map(Verb::name).collect()
    }

    pub fn ends_with_hangup(&self) -> bool {
        self.verbs.last().is_some_and(|v| v.name == "Hangup")
    }

    pub fn to_xml(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response>");
        for verb in &self.verbs {
            verb.write_to(&mut out);
        }
        out.push_str("</Response>");
        out
    }
}

fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}
