//! Toolbar of the edit wrapper.
//!
//! Adapters declare [`ToolbarButton`]s; this module filters them by the
//! caller's permissions and attaches the URL each one acts on.

use serde::Serialize;

use fedit_core::{Adapter, ButtonAction, ToolbarButton};

use crate::html::{attr, escape};
use crate::routes::{AdapterPath, Route};
use crate::settings::FeditSettings;

/// A button as rendered for one caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolbarItem {
    pub action: ButtonAction,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// The buttons `adapter` offers its caller, with their URLs.
pub fn toolbar_items(adapter: &dyn Adapter, settings: &FeditSettings, shared_context: &str) -> Vec<ToolbarItem> {
    let base = adapter.base();
    let path = AdapterPath::new(
        Route::Edit,
        adapter.identifier(),
        &base.object.key,
        base.field_name.as_deref(),
    );
    let prefix = settings.url_prefix.as_str();

    adapter
        .toolbar_buttons()
        .into_iter()
        .filter(|button| button.visible_to(&base.caller))
        .map(|ToolbarButton { action, label, .. }| {
            let url = match action {
                ButtonAction::Edit => path.to_url_with_query(prefix, &[("shared_context", shared_context)]),
                ButtonAction::AdminLink => format!(
                    "{}/{}/{}/edit/{}/#{}",
                    settings.admin_url_prefix,
                    base.object.key.app_label,
                    base.object.key.model_name,
                    base.object.key.pk,
                    adapter.element_id()
                ),
                ButtonAction::MoveUp => path
                    .with_route(Route::BlockMove)
                    .to_url_with_query(prefix, &[("action", "up"), ("shared_context", shared_context)]),
                ButtonAction::MoveDown => path
                    .with_route(Route::BlockMove)
                    .to_url_with_query(prefix, &[("action", "down"), ("shared_context", shared_context)]),
                ButtonAction::Add => path
                    .with_route(Route::BlockAdd)
                    .to_url_with_query(prefix, &[("shared_context", shared_context)]),
            };
            ToolbarItem {
                action,
                label,
                url: Some(url),
            }
        })
        .collect()
}

fn action_name(action: ButtonAction) -> &'static str {
    match action {
        ButtonAction::Edit => "edit",
        ButtonAction::AdminLink => "admin-link",
        ButtonAction::MoveUp => "move-up",
        ButtonAction::MoveDown => "move-down",
        ButtonAction::Add => "add",
    }
}

/// Toolbar markup; empty when there is nothing to show.
pub fn render_toolbar(items: &[ToolbarItem]) -> String {
    if items.is_empty() {
        return String::new();
    }
    let mut out = String::from("<div class=\"fedit-toolbar\">");
    for item in items {
        let name = action_name(item.action);
        match (item.action, &item.url) {
            (ButtonAction::AdminLink, Some(url)) => {
                out.push_str("<a");
                out.push_str(&attr("class", &format!("fedit-toolbar__button fedit-toolbar__{}", name)));
                out.push_str(&attr("href", url));
                out.push_str(" target=\"_blank\">");
            }
            (_, url) => {
                out.push_str("<button type=\"button\"");
                out.push_str(&attr("class", &format!("fedit-toolbar__button fedit-toolbar__{}", name)));
                out.push_str(&attr("data-action", name));
                if let Some(url) = url {
                    out.push_str(&attr("data-url", url));
                }
                out.push('>');
            }
        }
        out.push_str(&escape(&item.label));
        out.push_str(if item.action == ButtonAction::AdminLink {
            "</a>"
        } else {
            "</button>"
        });
    }
    out.push_str("</div>");
    out
}
