//! Menu permission tree returned for the signed-in user.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Checked actions of one menu.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Actions {
    pub create: bool,
    pub delete: bool,
    pub edit: bool,
    pub list: bool,
    pub read: bool,
}

impl Actions {
    pub fn any(self) -> bool {
        self.create || self.delete || self.edit || self.list || self.read
    }

    pub fn allows(self, action: Action) -> bool {
        match action {
            Action::Create => self.create,
            Action::Delete => self.delete,
            Action::Edit => self.edit,
            Action::List => self.list,
            Action::Read => self.read,
        }
    }

    /// Checked action names, in a fixed order.
    pub fn checked(self) -> Vec<Action> {
        Action::ALL
            .into_iter()
            .filter(|a| self.allows(*a))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Create,
    Delete,
    Edit,
    List,
    Read,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::Create,
        Action::Delete,
        Action::Edit,
        Action::List,
        Action::Read,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Delete => "delete",
            Action::Edit => "edit",
            Action::List => "list",
            Action::Read => "read",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown action '{s}'"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuPermission {
    pub menu_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Actions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_menus: Option<Vec<MenuPermission>>,
}

impl MenuPermission {
    fn has_checked_action(&self) -> bool {
        self.actions.is_some_and(Actions::any)
    }

    /// Route segment for this menu: lowercased, whitespace runs become `-`.
    pub fn slug(&self) -> String {
        slugify(&self.menu_name)
    }

    fn sub_menus(&self) -> &[MenuPermission] {
        self.sub_menus.as_deref().unwrap_or_default()
    }
}

pub fn slugify(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// Keeps menus with at least one checked action, directly or in a submenu.
///
/// Unchecked submenus are pruned; when pruning would leave none, the menu
/// is kept as received.
pub fn filter_checked(menus: &[MenuPermission]) -> Vec<MenuPermission> {
    menus
        .iter()
        .filter(|menu| {
            menu.has_checked_action() || menu.sub_menus().iter().any(MenuPermission::has_checked_action)
        })
        .map(|menu| {
            let kept: Vec<MenuPermission> = menu
                .sub_menus()
                .iter()
                .filter(|sub| sub.has_checked_action())
                .cloned()
                .collect();
            if kept.is_empty() {
                menu.clone()
            } else {
                MenuPermission {
                    sub_menus: Some(kept),
                    ..menu.clone()
                }
            }
        })
        .collect()
}

/// Whether `action` is allowed on `route` (`menu` or `menu/submenu`).
///
/// Listing a top-level menu that has submenus is refused; the submenu has
/// to be addressed instead.
pub fn allows(menus: &[MenuPermission], route: &str, action: Action) -> bool {
    let parts: Vec<String> = route
        .split('/')
        .filter(|p| !p.trim().is_empty())
        .map(slugify)
        .collect();

    match parts.as_slice() {
        [menu] => {
            let Some(menu) = find_menu(menus, menu) else {
                return false;
            };
            let allowed = menu.actions.is_some_and(|a| a.allows(action));
            if action == Action::List {
                allowed && menu.sub_menus().is_empty()
            } else {
                allowed
            }
        }
        [menu, sub] => find_menu(menus, menu)
            .and_then(|menu| find_menu(menu.sub_menus(), sub))
            .is_some_and(|sub| sub.actions.is_some_and(|a| a.allows(action))),
        _ => false,
    }
}

fn find_menu<'a>(menus: &'a [MenuPermission], slug: &str) -> Option<&'a MenuPermission> {
    menus.iter().find(|m| m.slug() == slug)
}
