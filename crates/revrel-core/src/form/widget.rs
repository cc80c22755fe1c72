use crate::{
    db::Db,
    error::InternalError,
    form::ChoiceSet,
    traits::EntityKind,
    value::Value,
    version::VersionId,
};
use std::fmt::Write as _;

///
/// IndirectSelect
///
/// `<select>` widget whose stored value is a version pointer but whose
/// options are logical keys.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct IndirectSelect {
    name: &'static str,
}

impl IndirectSelect {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }

    /// Logical key recorded on the snapshot `pointer` names.
    pub fn format_value<T: EntityKind>(
        &self,
        db: &Db,
        pointer: Option<VersionId>,
    ) -> Result<Option<Value>, InternalError> {
        let Some(version) = pointer else {
            return Ok(None);
        };

        match db.versions().get(version)? {
            Some(snapshot) if snapshot.entity_name == T::ENTITY_NAME => {
                Ok(Some(snapshot.object_key))
            }
            _ => Err(InternalError::resolution(
                self.name,
                T::ENTITY_NAME,
                version,
            )),
        }
    }

    #[must_use]
    pub fn render(
        &self,
        choices: &ChoiceSet,
        selected: Option<&Value>,
        include_blank: bool,
    ) -> String {
        let mut html = String::new();
        let name = escape(self.name);

        let _ = writeln!(html, "<select name=\"{name}\" id=\"id_{name}\">");
        if include_blank {
            let marker = if selected.is_none() { " selected" } else { "" };
            let _ = writeln!(html, "<option value=\"\"{marker}>---------</option>");
        }

        for choice in choices {
            let marker = if selected == Some(&choice.value) {
                " selected"
            } else {
                ""
            };
            let _ = writeln!(
                html,
                "<option value=\"{}\"{marker}>{}</option>",
                escape(&choice.value.to_string()),
                escape(&choice.label)
            );
        }
        html.push_str("</select>");

        html
    }
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }

    out
}
